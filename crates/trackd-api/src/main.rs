//! trackd HTTP API server.
//!
//! Routes issue CRUD requests to the document builders in `trackd-core`
//! and the PostgreSQL repository in `trackd-db`.

mod handlers;

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

use trackd_db::{log_pool_metrics, Database, PoolConfig};

use handlers::issues::{create_issue, delete_issue, list_issues, update_issue};

/// Interval between pool health log lines.
const POOL_METRICS_INTERVAL_SECS: u64 = 60;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

/// Request-id maker emitting time-ordered UUIDv7 correlation ids.
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "trackd_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trackd_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("trackd-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/trackd".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .unwrap_or(3000);

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect_with_config(&database_url, pool_config_from_env()).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Periodic pool health reporting
    let metrics_pool = db.pool().clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(POOL_METRICS_INTERVAL_SECS));
        interval.tick().await; // first tick fires immediately
        loop {
            interval.tick().await;
            log_pool_metrics(&metrics_pool);
        }
    });

    let state = AppState { db };

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/issues/:project",
            get(list_issues)
                .post(create_issue)
                .put(update_issue)
                .delete(delete_issue),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
        )
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Build the pool configuration from environment variables, falling back
/// to the defaults for anything unset or unparsable.
///
/// Environment variables:
///   DB_MAX_CONNECTIONS       - pool upper bound
///   DB_MIN_CONNECTIONS       - connections kept warm
///   DB_CONNECT_TIMEOUT_SECS  - acquire timeout in seconds
fn pool_config_from_env() -> PoolConfig {
    fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
        std::env::var(name).ok().and_then(|v| v.parse().ok())
    }

    let mut config = PoolConfig::new();
    if let Some(n) = env_parse::<u32>("DB_MAX_CONNECTIONS") {
        config = config.max_connections(n);
    }
    if let Some(n) = env_parse::<u32>("DB_MIN_CONNECTIONS") {
        config = config.min_connections(n);
    }
    if let Some(secs) = env_parse::<u64>("DB_CONNECT_TIMEOUT_SECS") {
        config = config.connect_timeout(Duration::from_secs(secs));
    }
    config
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

/// HTTP-facing wrapper over the core error taxonomy.
///
/// Validation failures become 400s, persistence failures 500s; bodies are
/// the stable plain-text messages (string equality is part of the API
/// contract, so no JSON error envelope).
#[derive(Debug)]
pub struct ApiError(trackd_core::Error);

impl From<trackd_core::Error> for ApiError {
    fn from(err: trackd_core::Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, self.0.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackd_core::Error;

    #[test]
    fn test_api_error_client_status() {
        for err in [
            Error::MissingRequiredInput,
            Error::InvalidInput,
            Error::InvalidQuery,
            Error::EmptyUpdate,
            Error::MissingId,
            Error::IdRequired,
        ] {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_pool_config_from_env() {
        std::env::set_var("DB_MAX_CONNECTIONS", "25");
        std::env::set_var("DB_MIN_CONNECTIONS", "3");
        std::env::set_var("DB_CONNECT_TIMEOUT_SECS", "5");

        let config = pool_config_from_env();
        assert_eq!(config.max_connections, 25);
        assert_eq!(config.min_connections, 3);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));

        // unparsable values fall back to the defaults
        std::env::set_var("DB_MAX_CONNECTIONS", "not-a-number");
        std::env::remove_var("DB_MIN_CONNECTIONS");
        std::env::remove_var("DB_CONNECT_TIMEOUT_SECS");
        let config = pool_config_from_env();
        assert_eq!(
            config.max_connections,
            trackd_db::pool::DEFAULT_MAX_CONNECTIONS
        );

        std::env::remove_var("DB_MAX_CONNECTIONS");
    }

    #[test]
    fn test_api_error_server_status() {
        for err in [
            Error::SaveFailed,
            Error::FetchFailed,
            Error::UpdateFailed("x".to_string()),
            Error::DeleteFailed("x".to_string()),
        ] {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
