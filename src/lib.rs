pub mod config;
pub mod db;
pub mod error;
pub mod students;
pub mod websocket;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Condition;
use actix_web::{web, HttpResponse};
use tracing::info;

pub use crate::config::{CorsConfig, Settings};
pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;

use crate::db::StudentStore;
use crate::websocket::{ConnectionRegistry, MessageLog};

/// Health check endpoint handler
/// Returns a JSON response with server status, timestamp and live connection count
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "connections": state.registry.connection_count(),
    }))
}

/// Mounts every route of the service.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/ws/{username}", web::get().to(websocket::ws_route))
        .route("/students", web::post().to(students::create_student))
        .route("/students", web::get().to(students::list_students));
}

/// CORS layer for the app. Disabled means no CORS middleware at all.
pub fn cors_middleware(config: &CorsConfig) -> Condition<Cors> {
    Condition::new(config.enabled, build_cors(config))
}

fn build_cors(config: &CorsConfig) -> Cors {
    let cors = if config.allow_any_origin {
        Cors::default().allow_any_origin()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(config.max_age as usize)
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub registry: Arc<ConnectionRegistry>,
    pub messages: Arc<MessageLog>,
    pub students: Option<Arc<dyn StudentStore>>,
}

impl AppState {
    /// Never fails: a missing or unreachable database only disables the student API.
    pub async fn new(config: Settings) -> Self {
        let students = db::init_store(&config.database).await;
        Self::with_store(config, students)
    }

    pub fn with_store(config: Settings, students: Option<Arc<dyn StudentStore>>) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(ConnectionRegistry::new()),
            messages: Arc::new(MessageLog::new()),
            students,
        }
    }

    pub async fn shutdown(&self) {
        if let Some(store) = &self.students {
            store.close().await;
            info!("Database pool closed");
        }
    }
}
