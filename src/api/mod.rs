//! The HTTP surface: a thin axum router over the store and the publisher.
//!
//! Handlers own no business logic; they translate requests into store and
//! publisher calls and map errors to status codes. The generated XML is
//! served statically from the public directory.

mod error;
mod handlers;

pub use error::{ApiError, ApiResult};

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::publish::Publisher;
use crate::store::FeedStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FeedStore>,
    pub publisher: Arc<Publisher>,
    started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<FeedStore>, publisher: Arc<Publisher>) -> Self {
        Self {
            store,
            publisher,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Build the application router: API routes plus static serving of the
/// generated artifact. CORS is permissive; the API is consumed by
/// dashboards on other origins.
pub fn create_router(state: AppState, public_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/feed/items",
            get(handlers::list_items).post(handlers::create_item),
        )
        .route(
            "/api/feed/items/{id}",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route("/api/feed/bulk", post(handlers::bulk_import))
        .route(
            "/api/feed/info",
            get(handlers::get_feed_info).put(handlers::update_feed_info),
        )
        .route("/api/feed/regenerate", post(handlers::regenerate))
        .route("/api/backup", post(handlers::backup))
        .layer(CorsLayer::permissive())
        .fallback_service(ServeDir::new(public_dir))
        .with_state(state)
}
