//! HTTP server for Trellis.
//!
//! Serves two surfaces from one axum router:
//! - the public site (`/`, `/{slug}`): composed HTML with `ETag`s and
//!   dedicated error pages
//! - the page builder API (`/admin/api/...`): JSON in a single envelope,
//!   mutating calls guarded by a CSRF token
//!
//! # Quick Start
//!
//! ```ignore
//! use trellis_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         port: 8080,
//!         seed_demo: true,
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum router (trellis-server)
//!                        │
//!                        ├─► /admin/api ──► PageBuilder ──┐
//!                        │                                ├─► Store
//!                        └─► /, /{slug} ──► TemplateComposer
//! ```

mod app;
mod envelope;
mod error;
mod extract;
mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use state::AppState;
use trellis_builder::PageBuilder;
use trellis_cache::{Cache, MemoryCache, NullCache};
use trellis_config::{Config, DiagnosticsMode};
use trellis_render::{Diagnostics, RenderOptions, TemplateComposer};
use trellis_store::{MemoryStore, Store, StoreError, seed_demo};

pub use error::ServerError;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// JSON snapshot file (`None` keeps the site in memory).
    pub store_path: Option<PathBuf>,
    /// Seed the demo site into an empty store.
    pub seed_demo: bool,
    /// Fixed CSRF token (`None` generates one per process).
    pub csrf_token: Option<String>,
    /// Rendering options.
    pub render: RenderOptions,
    /// Enable verbose output.
    pub verbose: bool,
    /// Application version (mixed into `ETag`s).
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            store_path: None,
            seed_demo: false,
            csrf_token: None,
            render: RenderOptions::default(),
            verbose: false,
            version: String::new(),
        }
    }
}

/// Open the store described by `config`, seeding the demo site when the
/// store is empty and seeding is enabled.
pub fn open_store(config: &ServerConfig) -> Result<Arc<MemoryStore>, StoreError> {
    let store = match &config.store_path {
        Some(path) => MemoryStore::open(path.clone())?,
        None => MemoryStore::new(),
    };
    if config.seed_demo && store.is_empty() {
        seed_demo(&store)?;
        tracing::info!("Seeded demo site");
    }
    Ok(Arc::new(store))
}

/// Build the application router over `store`.
pub fn build_router(store: Arc<dyn Store>, config: &ServerConfig) -> Router {
    let cache: Box<dyn Cache> = if config.render.menu_cache {
        Box::new(MemoryCache::new())
    } else {
        Box::new(NullCache)
    };
    let composer = Arc::new(TemplateComposer::new(
        store,
        cache.as_ref(),
        config.render.clone(),
    ));
    let builder = PageBuilder::new(Arc::clone(&composer));
    let csrf_token = config
        .csrf_token
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let state = Arc::new(AppState {
        composer,
        builder,
        csrf_token,
        version: config.version.clone(),
        verbose: config.verbose,
    });

    app::create_router(state)
}

/// Run the server.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the server fails to
/// start.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&config)?;
    let app = build_router(store, &config);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from Trellis config.
///
/// # Arguments
///
/// * `config` - Loaded configuration
/// * `version` - Application version
/// * `verbose` - Enable verbose output
#[must_use]
pub fn server_config_from_trellis_config(
    config: &Config,
    version: String,
    verbose: bool,
) -> ServerConfig {
    let diagnostics = match config.render.diagnostics {
        DiagnosticsMode::Verbose => Diagnostics::Verbose,
        DiagnosticsMode::Quiet => Diagnostics::Quiet,
    };
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        store_path: config.store_resolved.path.clone(),
        seed_demo: config.store_resolved.seed_demo,
        csrf_token: config.server.csrf_token.clone(),
        render: RenderOptions {
            diagnostics,
            media_base_url: config.render.media_base_url.clone(),
            site_name: config.render.site_name.clone(),
            grid_columns: config.grid.columns,
            menu_cache: config.cache.menus,
        },
        verbose,
        version,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_server_config_from_default_config() {
        let config = Config::default();

        let server = server_config_from_trellis_config(&config, "1.2.3".to_owned(), true);

        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.port, 8080);
        assert_eq!(server.store_path, None);
        assert!(server.seed_demo);
        assert_eq!(server.render.grid_columns, 12);
        assert_eq!(server.version, "1.2.3");
        assert!(server.verbose);
    }

    #[test]
    fn test_open_store_seeds_empty_store() {
        let config = ServerConfig {
            seed_demo: true,
            ..ServerConfig::default()
        };

        let store = open_store(&config).unwrap();

        assert!(store.page_by_slug("home").unwrap().is_some());
    }

    #[test]
    fn test_open_store_without_seed_is_empty() {
        let store = open_store(&ServerConfig::default()).unwrap();

        assert!(store.is_empty());
    }
}
