//! SyncSenta Portal Backend
//!
//! Role-based education portal service with SQLite persistence and AI tutoring.

mod ai;
mod api;
mod auth;
mod chat;
mod config;
mod dashboard;
mod db;
mod errors;
mod models;
mod storage;
mod views;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ai::{AiGateway, GatewayError};
use auth::{IdentityClient, SessionStore};
use chat::ChatRegistry;
use config::Config;
use db::Repository;
use errors::AppError;
use storage::KvStore;

/// Application state shared across all handlers.
///
/// External clients that failed to build from configuration are kept as
/// errors; the endpoints that need them answer with that config error.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub kv: KvStore,
    pub identity: Result<IdentityClient, AppError>,
    pub gateway: Result<AiGateway, GatewayError>,
    pub sessions: Arc<SessionStore>,
    pub chats: Arc<ChatRegistry>,
}

impl AppState {
    pub fn new(config: &Config, pool: SqlitePool) -> Self {
        let identity = IdentityClient::new(
            config.auth_url.as_deref(),
            config.auth_anon_key.as_deref(),
        );
        if let Err(e) = &identity {
            tracing::warn!("Sign-in is disabled: {}", e);
        }

        let gateway = AiGateway::from_config(&config.ai);
        match &gateway {
            Ok(gateway) => tracing::info!("AI gateway using the {} backend", gateway.backend_name()),
            Err(e) => tracing::warn!("AI features are disabled: {}", e),
        }

        let repo = Repository::new(pool);
        Self {
            kv: KvStore::new(repo.clone()),
            repo: Arc::new(repo),
            identity,
            gateway,
            sessions: Arc::new(SessionStore::new()),
            chats: Arc::new(ChatRegistry::new()),
        }
    }

    pub fn identity_client(&self) -> Result<&IdentityClient, AppError> {
        self.identity.as_ref().map_err(Clone::clone)
    }

    pub fn gateway(&self) -> Result<&AiGateway, AppError> {
        self.gateway.as_ref().map_err(|e| e.clone().into())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SyncSenta Portal Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;

    let bind_addr = config.bind_addr;
    let state = AppState::new(&config, pool);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Identity flows (no session required)
    let auth_routes = Router::new()
        .route("/sign-in", post(api::sign_in))
        .route("/sign-up", post(api::sign_up))
        .route("/sign-out", post(api::sign_out))
        .route("/oauth/{provider}", get(api::oauth_url))
        .route("/recover", post(api::send_password_reset))
        .route("/password", post(api::update_password))
        .route("/recovery", get(api::recovery_status));

    // School directory is used by sign-up before an account exists
    let directory_routes = Router::new().route(
        "/schools",
        get(api::list_schools).post(api::add_school),
    );

    // API routes
    let api_routes = Router::new()
        // Session
        .route("/me", get(api::get_me))
        .route("/me/profile", put(api::update_profile))
        .route("/views", get(api::get_views))
        .route("/dashboard", get(api::get_dashboard))
        // Teacher hub
        .route("/teacher/classes", get(api::list_classes))
        .route("/teacher/classes/{id}/register", get(api::get_register))
        .route("/teacher/classes/{id}/attendance", put(api::toggle_attendance))
        .route(
            "/teacher/customization",
            get(api::get_customization).put(api::save_customization),
        )
        // Student
        .route(
            "/student/settings",
            get(api::get_student_settings).put(api::save_student_settings),
        )
        .route(
            "/tutor/session",
            post(api::establish_session)
                .get(api::get_session)
                .delete(api::end_session),
        )
        .route("/tutor/session/turns", post(api::send_turn))
        .route("/tutor/session/turns/stream", post(api::stream_turn))
        // Analytics
        .route("/analysis/equity", post(api::equity))
        .route("/analysis/{kind}", post(api::analyze))
        .route("/ai/health", get(api::ai_health))
        // Apply session auth middleware
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .merge(directory_routes);

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
