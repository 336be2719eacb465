pub mod memory;
pub mod pool;
pub mod store;

use std::sync::{Arc, OnceLock};

use serde::Serialize;
use sqlx::PgPool;

use crate::config::{Config, DataSource};
use crate::error::{Error, Result};
use memory::MemoryStore;
use store::{PgStore, PostStore, UserStore};

/// Outcome of the one-time startup probe of the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum StoreStatus {
    Uninitialized,
    Ready,
    Failed(String),
}

/// Handle to the configured data source, shared through `AppState`.
#[derive(Clone)]
pub struct Backend {
    source: DataSource,
    pool: Option<PgPool>,
    users: Arc<dyn UserStore>,
    posts: Arc<dyn PostStore>,
    status: Arc<OnceLock<StoreStatus>>,
}

impl Backend {
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.data_source {
            DataSource::Live => {
                let url = config.database_url.as_deref().ok_or_else(|| {
                    Error::Config("DATABASE_URL is required for the live data source".to_string())
                })?;
                let pool = pool::create_pool(url)?;
                let store = Arc::new(PgStore::new(pool.clone()));
                Ok(Self {
                    source: DataSource::Live,
                    pool: Some(pool),
                    users: store.clone(),
                    posts: store,
                    status: Arc::new(OnceLock::new()),
                })
            }
            DataSource::Demo => Ok(Self::demo(Arc::new(MemoryStore::seeded()))),
        }
    }

    pub fn demo(store: Arc<MemoryStore>) -> Self {
        Self::with_stores(DataSource::Demo, store.clone(), store)
    }

    pub fn with_stores(
        source: DataSource,
        users: Arc<dyn UserStore>,
        posts: Arc<dyn PostStore>,
    ) -> Self {
        Self {
            source,
            pool: None,
            users,
            posts,
            status: Arc::new(OnceLock::new()),
        }
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn users(&self) -> Arc<dyn UserStore> {
        self.users.clone()
    }

    pub fn posts(&self) -> Arc<dyn PostStore> {
        self.posts.clone()
    }

    pub fn status(&self) -> StoreStatus {
        self.status
            .get()
            .cloned()
            .unwrap_or(StoreStatus::Uninitialized)
    }

    /// Probes the store and applies migrations. Runs at most once; later
    /// calls return the recorded outcome.
    pub async fn initialize(&self) -> StoreStatus {
        if let Some(status) = self.status.get() {
            return status.clone();
        }

        let outcome = match &self.pool {
            Some(pool) => match probe_and_migrate(pool).await {
                Ok(()) => StoreStatus::Ready,
                Err(e) => {
                    tracing::error!(error = %e, "store initialization failed");
                    StoreStatus::Failed(e.to_string())
                }
            },
            None => StoreStatus::Ready,
        };

        self.status.get_or_init(|| outcome).clone()
    }
}

async fn probe_and_migrate(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
