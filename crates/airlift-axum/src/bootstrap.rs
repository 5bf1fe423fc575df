//! Server bootstrap - the composition root.
//!
//! The only place where infrastructure is wired together: the SQLite store
//! bundle, the Cloudinary adapter, the manifest signer, and the rollout
//! selector are instantiated here and handed to the router as one shared
//! context. Both the store and the object store are optional; their absence
//! downgrades functionality without stopping the server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use airlift_cloudinary::{CloudinaryConfig, CloudinaryStore};
use airlift_core::ports::{ObjectStore, Stores};
use airlift_core::rollout::RolloutSelector;
use airlift_core::signing::ManifestSigner;
use airlift_db::{StoreFactory, setup_database};

/// Interval between keepalive self-pings.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(600);

/// Server configuration, read from the environment by the binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP server.
    pub port: u16,
    /// Public base URL used to build absolute asset URLs in manifests and
    /// to drive the keepalive self-ping. Asset URLs fall back to localhost
    /// when unset; derived-from-request URLs break behind mismatched
    /// ingress, so they are never used.
    pub hostname: Option<String>,
    /// Metadata store URI. Unset or unreachable means store-less operation.
    pub database_url: Option<String>,
    /// Object store credentials. Unset means local filesystem serving.
    pub cloudinary: Option<CloudinaryConfig>,
    /// Bearer secret for the admin surface. Empty opens the admin routes
    /// (development mode).
    pub admin_secret: String,
    /// PEM private key for manifest signing. Unset or unparseable disables
    /// signing.
    pub private_key_path: Option<PathBuf>,
    /// Directory served by the asset endpoint when no CDN is configured.
    pub updates_dir: PathBuf,
}

impl ServerConfig {
    /// The base URL manifests point asset links at.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.hostname
            .as_deref()
            .map_or_else(
                || format!("http://localhost:{}", self.port),
                |hostname| hostname.trim_end_matches('/').to_string(),
            )
    }
}

/// Application context shared by every handler.
pub struct ServerContext {
    /// Metadata store bundle; `None` when no store is connected.
    pub stores: Option<Stores>,
    /// CDN adapter; `None` means local filesystem serving.
    pub object_store: Option<Arc<dyn ObjectStore>>,
    /// Manifest signer; `None` means signing is disabled.
    pub signer: Option<ManifestSigner>,
    /// Process-wide rollout selector.
    pub rollout: RolloutSelector,
    pub config: ServerConfig,
}

impl ServerContext {
    /// The store bundle, or the 503-mapped error when not connected.
    pub fn stores(&self) -> Result<&Stores, airlift_core::ports::StoreError> {
        self.stores
            .as_ref()
            .ok_or(airlift_core::ports::StoreError::NotConnected)
    }
}

/// Bootstrap the server context from configuration.
///
/// Store and signer failures are downgraded to warnings: the server keeps
/// serving whatever previously-populated state remains reachable.
pub async fn bootstrap(config: ServerConfig) -> Result<ServerContext> {
    std::fs::create_dir_all(&config.updates_dir)?;

    let stores = match &config.database_url {
        Some(url) => match setup_database(url).await {
            Ok(pool) => Some(StoreFactory::build_stores(pool)),
            Err(e) => {
                tracing::warn!("Metadata store unavailable, continuing without it: {e}");
                None
            }
        },
        None => None,
    };

    let signer = config.private_key_path.as_ref().and_then(|path| {
        let pem = match std::fs::read_to_string(path) {
            Ok(pem) => pem,
            Err(e) => {
                tracing::warn!(
                    "Signing key unreadable at {}, signing disabled: {e}",
                    path.display()
                );
                return None;
            }
        };
        match ManifestSigner::from_pem(&pem) {
            Ok(signer) => Some(signer),
            Err(e) => {
                tracing::warn!("Signing key unparseable, signing disabled: {e}");
                None
            }
        }
    });

    let object_store: Option<Arc<dyn ObjectStore>> = config
        .cloudinary
        .clone()
        .map(|cloudinary| Arc::new(CloudinaryStore::new(cloudinary)) as Arc<dyn ObjectStore>);

    tracing::info!(
        target: "airlift.bootstrap",
        database = stores.is_some(),
        object_store = object_store.is_some(),
        signing = signer.is_some(),
        updates_dir = %config.updates_dir.display(),
        base_url = %config.base_url(),
        "Server context assembled"
    );

    Ok(ServerContext {
        stores,
        object_store,
        signer,
        rollout: RolloutSelector::new(),
        config,
    })
}

/// Start the web server on the configured port.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    use tokio::net::TcpListener;

    let port = config.port;
    let keepalive_base = config.hostname.is_some().then(|| config.base_url());

    let ctx = bootstrap(config).await?;
    let app = crate::routes::create_router(ctx);

    if let Some(base_url) = keepalive_base {
        spawn_keepalive(base_url);
    }

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("airlift update server listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodic self-ping that keeps cold-start platforms warm.
fn spawn_keepalive(base_url: String) {
    tokio::spawn(async move {
        let client = reqwest::Client::new();
        let mut interval = tokio::time::interval(KEEPALIVE_INTERVAL);
        // The first tick fires immediately; skip it
        interval.tick().await;
        loop {
            interval.tick().await;
            match client.get(format!("{base_url}/api/health")).send().await {
                Ok(response) => {
                    tracing::debug!("keepalive ping: {}", response.status());
                }
                Err(e) => tracing::warn!("keepalive ping failed: {e}"),
            }
        }
    });
}
