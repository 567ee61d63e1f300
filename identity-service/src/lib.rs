pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::extract::State;
use axum::http::{HeaderValue, Method};
use axum::middleware as axum_middleware;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::IdentityConfig;
use crate::middleware::{authenticate, require_role};
use crate::models::Role;
use crate::services::{
    AuditRecorder, Database, IdentityService, InvitationService, JwtService,
};

/// Shared application state. Everything inside is cheap to clone; the pool
/// and audit channel are handles.
#[derive(Clone)]
pub struct AppState {
    pub config: std::sync::Arc<IdentityConfig>,
    pub db: Database,
    pub jwt: JwtService,
    pub identity: IdentityService,
    pub invitations: InvitationService,
}

impl AppState {
    pub fn new(config: IdentityConfig, pool: sqlx::PgPool) -> Self {
        let db = Database::new(pool);
        let jwt = JwtService::new(&config.jwt);
        let audit = AuditRecorder::spawn(db.clone());
        let identity = IdentityService::new(db.clone(), jwt.clone(), audit.clone());
        let invitations = InvitationService::new(db.clone(), identity.clone(), audit);

        Self {
            config: std::sync::Arc::new(config),
            db,
            jwt,
            identity,
            invitations,
        }
    }
}

/// Build the application router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/team/accept-invite", post(handlers::team::accept_invite));

    let admin_routes = Router::new()
        .route("/api/team/member/role", put(handlers::team::update_role))
        .route("/api/audit-logs", get(handlers::audit::list))
        .route_layer(axum_middleware::from_fn(
            |req: axum::extract::Request, next: axum_middleware::Next| {
                require_role(&[Role::Admin], req, next)
            },
        ));

    let manager_routes = Router::new()
        .route("/api/team/invite", post(handlers::team::invite))
        .route_layer(axum_middleware::from_fn(
            |req: axum::extract::Request, next: axum_middleware::Next| {
                require_role(&[Role::Admin, Role::Manager], req, next)
            },
        ));

    let protected_routes = Router::new()
        .route("/api/auth/verify", get(handlers::auth::verify))
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/team/members", get(handlers::team::members))
        .merge(admin_routes)
        .merge(manager_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            authenticate,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &IdentityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, service_core::error::AppError> {
    state.db.ping().await?;
    Ok(Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
