// HTTP surface for bookmarks: axum router, bearer auth, error mapping
pub mod auth;
pub mod error;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use repomark_core::{config::ServerConfig, BookmarkService};
use repomark_store::BookmarkStore;

pub use auth::Claims;
pub use error::ApiError;

/// Used when no secret is configured. Only fit for local development.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

pub struct AppStateInner {
    pub bookmarks: BookmarkService,
    pub jwt_secret: String,
}

pub type AppState = Arc<AppStateInner>;

pub fn app_state(bookmarks: BookmarkService, jwt_secret: impl Into<String>) -> AppState {
    Arc::new(AppStateInner {
        bookmarks,
        jwt_secret: jwt_secret.into(),
    })
}

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/repos/bookmark", post(routes::create_bookmark))
        .route("/api/repos/bookmarks", get(routes::list_bookmarks))
        .route(
            "/api/repos/bookmark/{id}",
            delete(routes::delete_bookmark).patch(routes::update_bookmark),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ))
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health))
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Open the database named by `config` and serve until ctrl-c
pub async fn serve(config: &ServerConfig) -> anyhow::Result<()> {
    let db_path = config.database_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = BookmarkStore::open(&db_path)?;
    info!("Bookmark database at {}", db_path.display());

    let jwt_secret = match &config.jwt_secret {
        Some(secret) if !secret.is_empty() => secret.clone(),
        _ => {
            warn!("No JWT secret configured, using the development default");
            DEV_JWT_SECRET.to_string()
        }
    };

    let state = app_state(BookmarkService::new(Arc::new(store)), jwt_secret);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Repomark server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
