//! # stafflow_api
//!
//! HTTP API library for Stafflow's authentication core.

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use sqlx::PgPool;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use stafflow_core::auth::token::TokenService;
use stafflow_core::directory::Directory;
use stafflow_core::oauth::client::IdentityProviderClient;
use stafflow_core::oauth::linker::AccountLinker;
use stafflow_core::oauth::state::LoginStateStore;

use crate::config::ApiConfig;
use crate::handlers::{auth, domains, employees, health, oauth};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn Directory>,
    pub tokens: Arc<TokenService>,
    pub linker: Arc<AccountLinker>,
    pub providers: Arc<dyn IdentityProviderClient>,
    pub login_states: Arc<LoginStateStore>,
    pub config: ApiConfig,
}

impl AppState {
    /// Wire up state from a directory + provider client + config.
    pub fn new(
        directory: Arc<dyn Directory>,
        providers: Arc<dyn IdentityProviderClient>,
        config: ApiConfig,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(
            config.jwt_secret.clone(),
            config.access_ttl_secs,
            config.refresh_ttl_secs,
        ));
        let linker = Arc::new(AccountLinker::new(directory.clone()));
        Self {
            directory,
            tokens,
            linker,
            providers,
            login_states: Arc::new(LoginStateStore::new()),
            config,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `stafflow_core::migrate::migrate()` which owns the
/// migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    stafflow_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
///
/// The middleware stack, outermost first: cors → trace → catch-panic →
/// error envelope → authenticate → authorize → handler. Authenticate and
/// authorize are route layers so they see the matched route pattern.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/oauth2/{provider}/authorize", get(oauth::authorize))
        .route("/api/auth/oauth2/{provider}/callback", get(oauth::callback))
        .route("/api/domains", get(domains::list))
        .route("/api/domains/check", get(domains::check))
        .route("/api/employees", get(employees::list))
        .route("/api/employees/me", get(employees::me))
        .route("/api/employees/{id}", get(employees::get_one))
        .route("/api/employees/{id}/role", put(employees::set_role))
        .route_layer(axum::middleware::from_fn(policy::authorize))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .layer(axum::middleware::from_fn(error::error_envelope))
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
