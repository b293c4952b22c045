use axum::{Router, http::Method, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::db::{IncidentStore, ServiceStore};

pub mod error;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<dyn ServiceStore>,
    pub incidents: Arc<dyn IncidentStore>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(
    services: Arc<dyn ServiceStore>,
    incidents: Arc<dyn IncidentStore>,
) -> Router {
    let app_state = Arc::new(AppState {
        services,
        incidents,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .merge(routes::status_routes::create_status_router())
        .layer(cors)
        .with_state(app_state)
}
