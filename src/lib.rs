pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use http::{header, HeaderValue, Method};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use tracing::info;

use crate::auth::AuthRouterExt;
use crate::config::AppConfig;
use crate::repositories::{
    AccountRepository, SqlAccountRepository, SqlTransactionRepository, TransactionRepository,
};
use crate::services::{AccountService, TransactionService, UserService};

pub use handlers::{AppServices, AppState};

/// Wires the database, auth, event channel, and domain services into a
/// shared state. The returned receiver feeds [`events::process_events`].
pub async fn build_state(
    cfg: AppConfig,
) -> anyhow::Result<(Arc<AppState>, mpsc::Receiver<events::Event>)> {
    let db = db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        db::run_migrations(&db).await?;
    }
    let db = Arc::new(db);

    let (event_sender, event_rx) = events::event_channel(cfg.event_channel_capacity);
    let auth_service = Arc::new(auth::AuthService::new(auth::AuthConfig::from_app_config(
        &cfg,
    )));

    let account_repo: Arc<dyn AccountRepository> = Arc::new(SqlAccountRepository::new(db.clone()));
    let transaction_repo: Arc<dyn TransactionRepository> =
        Arc::new(SqlTransactionRepository::new(db.clone()));

    let services = AppServices {
        users: Arc::new(UserService::new(
            db.clone(),
            auth_service.clone(),
            event_sender.clone(),
        )),
        accounts: Arc::new(AccountService::new(
            account_repo.clone(),
            transaction_repo.clone(),
            event_sender.clone(),
        )),
        transactions: Arc::new(TransactionService::new(
            account_repo,
            transaction_repo,
            event_sender.clone(),
        )),
    };

    let state = Arc::new(AppState {
        db,
        config: cfg,
        event_sender,
        auth_service,
        services,
    });

    Ok((state, event_rx))
}

/// Versioned API routes: public auth endpoints plus the bearer-protected
/// user, account, and transaction surfaces.
pub fn api_v1_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .nest("/users", handlers::users::user_routes())
        .nest("/accounts", handlers::accounts::account_routes())
        .nest("/transactions", handlers::transactions::transaction_routes())
        .with_auth(state.auth_service.clone());

    Router::new()
        .nest("/auth", handlers::auth::auth_routes())
        .merge(protected)
}

/// Builds the CORS layer from configuration. Outside development an
/// explicit origin list (or an explicit any-origin override) is required.
pub fn build_cors_layer(cfg: &AppConfig) -> anyhow::Result<CorsLayer> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        let cors = CorsLayer::new().allow_origin(origins);
        // Credentialed CORS cannot use wildcard methods or headers, so
        // list them explicitly in that mode.
        let cors = if cfg.cors_allow_credentials {
            cors.allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .allow_credentials(true)
        } else {
            cors.allow_methods(Any).allow_headers(Any)
        };
        Ok(cors)
    } else if cfg.is_development() || cfg.cors_allow_any_origin {
        info!("Using permissive CORS because explicit origins were not configured");
        Ok(CorsLayer::permissive())
    } else {
        anyhow::bail!(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
        )
    }
}

/// Assembles the complete application router with middleware applied
pub fn build_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(api_status))
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes(&state))
        .merge(openapi::swagger_ui())
        .layer(telemetry::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(axum::middleware::from_fn(
            telemetry::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
    }))
}

async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match db::check_connection(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "up" })),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": "down" })),
        ),
    }
}
