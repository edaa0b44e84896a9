use crate::{
    config::{Config, S3Config},
    error::{Error, Result},
    handlers,
    middleware::LoggingLayer,
    storage::{ObjectStore, S3Store},
};
use axum::{
    routing::{get, post},
    Router,
};
use std::{path::Path, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{info, warn};

pub struct AppState {
    /// Normalized bucket name, empty when unconfigured.
    pub bucket: String,
    /// `None` when required configuration is missing.
    pub store: Option<Arc<dyn ObjectStore>>,
    pub missing: Vec<&'static str>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(bucket: impl Into<String>, store: Arc<dyn ObjectStore>, request_timeout: Duration) -> Self {
        Self {
            bucket: bucket.into(),
            store: Some(store),
            missing: Vec::new(),
            request_timeout,
        }
    }

    pub fn unconfigured(missing: Vec<&'static str>) -> Self {
        Self {
            bucket: String::new(),
            store: None,
            missing,
            request_timeout: Duration::ZERO,
        }
    }

    pub fn from_config(config: &S3Config) -> Result<Self> {
        let missing = config.missing();
        if !missing.is_empty() {
            return Ok(Self::unconfigured(missing));
        }

        let store = Arc::new(S3Store::new(config)?);
        Ok(Self::new(config.bucket_name(), store, config.request_timeout()))
    }

    /// The store, or the configuration error every store-touching request
    /// reports while it is unset.
    pub fn store(&self) -> Result<&dyn ObjectStore> {
        self.store.as_deref().ok_or_else(|| Error::NotConfigured {
            missing: self.missing.clone(),
        })
    }
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let s3 = &config.s3;
    let bucket = s3.bucket_name();
    if let Some(raw) = s3.bucket_raw.as_deref() {
        if raw != bucket {
            info!("Normalized BUCKET from '{}' to '{}'", raw, bucket);
        }
    }

    let state = AppState::from_config(s3)?;
    if state.store.is_some() {
        info!(
            endpoint = s3.endpoint.as_deref().unwrap_or_default(),
            region = %s3.region,
            force_path_style = s3.force_path_style,
            "S3 client configured"
        );
    } else {
        warn!(
            "Missing required env vars: {}. Server will start but S3 requests will return errors.",
            state.missing.join(", ")
        );
    }

    let app = build_app(Arc::new(state), &config.server.static_dir);

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// API routes only, without static files or middleware.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/list", get(handlers::list_objects))
        .route("/presign-upload", post(handlers::presign_upload))
        .route("/presign-download", post(handlers::presign_download))
        .route("/health", get(handlers::health_check))
}

/// Full application: API routes, the static client served from `static_dir`
/// for every other path, request logging and permissive CORS.
pub fn build_app(state: Arc<AppState>, static_dir: &Path) -> Router {
    api_routes()
        .fallback_service(ServeDir::new(static_dir))
        .layer(LoggingLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
