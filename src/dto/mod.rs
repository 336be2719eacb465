pub mod auth_dto;
pub mod post_dto;
pub mod user_dto;
