//! Shopcore E-commerce Backend
//!
//! Product catalog, per-user cart, transactional order placement, user
//! authentication, and an admin panel with dashboard metrics and bulk
//! product import/export.

use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod models;
pub mod routes;

pub use config::Config;
pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
    pub config: Arc<Config>,
}
