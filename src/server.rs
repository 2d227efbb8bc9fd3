use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers;
use crate::middleware::auth_middleware;
use crate::state::AppState;

// Room for JSON escaping and the title on top of the largest allowed content.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn app(state: AppState) -> Router {
    let body_limit = state
        .config
        .notes
        .max_content_bytes
        .saturating_mul(2)
        .saturating_add(BODY_OVERHEAD_BYTES);

    Router::new()
        // Public
        .merge(public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::public;

    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/health/ready", get(public::ready))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected;

    Router::new()
        .route(
            "/api/notes",
            get(protected::notes_list).post(protected::notes_create),
        )
        .route(
            "/api/notes/:id",
            put(protected::notes_update).delete(protected::notes_delete),
        )
        .route("/api/user/profile", get(protected::user_profile))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Credentialed CORS for the configured browser origins. With no origins
/// configured only same-origin callers are served.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = allowed_origins(&config.security.cors_origins);

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Configured origins usable with credentials. A wildcard cannot be
/// combined with credentials, so `*` is dropped along with unparsable values.
fn allowed_origins(configured: &[String]) -> Vec<HeaderValue> {
    configured
        .iter()
        .filter_map(|origin| {
            if origin.trim() == "*" {
                tracing::warn!("Ignoring wildcard CORS origin; credentials require explicit origins");
                return None;
            }
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            }
        })
        .collect()
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Notes API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
