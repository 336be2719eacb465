use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

/// CORS for the Mini App origin. Falls back to any origin if `webapp_url`
/// is not a valid header value.
pub fn webapp_cors(webapp_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match origin_of(webapp_url).and_then(|origin| HeaderValue::from_str(&origin).ok()) {
        Some(origin) => layer.allow_origin(origin),
        None => {
            tracing::warn!(webapp_url, "WEBAPP_URL has no usable origin, allowing any");
            layer.allow_origin(Any)
        }
    }
}

fn origin_of(webapp_url: &str) -> Option<String> {
    let url = url::Url::parse(webapp_url).ok()?;
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}
