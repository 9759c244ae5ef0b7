//! `trellis serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use trellis_config::{CliSettings, Config};
use trellis_server::{run_server, server_config_from_trellis_config};

use super::DiagnosticsArg;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover trellis.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Store snapshot file (overrides config).
    #[arg(short, long, env = "TRELLIS_STORE")]
    store: Option<PathBuf>,

    /// Diagnostics in rendered pages (overrides config).
    #[arg(long, value_enum)]
    diagnostics: Option<DiagnosticsArg>,

    /// Enable verbose output (log render warnings).
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable the menu cache (default: enabled).
    #[arg(long)]
    cache: Option<bool>,

    /// Disable the menu cache.
    #[arg(long, conflicts_with = "cache")]
    no_cache: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        // Resolve flags before moving into CliSettings
        let menu_cache_enabled = self.resolve_cache_enabled();
        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            store_path: self.store,
            menu_cache_enabled,
            diagnostics: self.diagnostics.map(Into::into),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let server_config =
            server_config_from_trellis_config(&config, version.to_owned(), self.verbose);
        output.field(
            "Site",
            &format!("http://{}:{}/", server_config.host, server_config.port),
        );
        output.field(
            "Page builder API",
            &format!(
                "http://{}:{}/admin/api",
                server_config.host, server_config.port
            ),
        );
        match &config.store_resolved.path {
            Some(path) => output.field("Store", &path.display()),
            None => output.warning("Store: in memory, changes are lost on exit"),
        }
        output.field(
            "Menu cache",
            &if config.cache.menus { "enabled" } else { "disabled" },
        );
        output.field("Grid", &format!("{} columns", config.grid.columns));
        tracing::debug!(
            host = %server_config.host,
            port = server_config.port,
            menu_cache = config.cache.menus,
            "Starting server"
        );

        run_server(server_config)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Resolve the menu cache flag from --cache/--no-cache.
    fn resolve_cache_enabled(&self) -> Option<bool> {
        self.no_cache.then_some(false).or(self.cache)
    }
}
