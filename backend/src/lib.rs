//! Farm Management Platform - Backend
//!
//! Planting plans, harvest recording and planned-vs-actual production
//! reconciliation for farm properties.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;

use services::ReconciliationEngine;
use store::{HarvestLedger, PlanStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub plans: Arc<dyn PlanStore>,
    pub ledger: Arc<dyn HarvestLedger>,
    /// Owns the per-plan locks; clones share them
    pub engine: ReconciliationEngine,
}

impl AppState {
    pub fn new(config: Config, plans: Arc<dyn PlanStore>, ledger: Arc<dyn HarvestLedger>) -> Self {
        let engine = ReconciliationEngine::new(plans.clone(), ledger.clone());
        Self {
            config: Arc::new(config),
            plans,
            ledger,
            engine,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Farm Management Platform API v1.0"
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
