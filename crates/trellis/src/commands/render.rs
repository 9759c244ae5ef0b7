//! `trellis render` command implementation.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use trellis_cache::NullCache;
use trellis_config::{CliSettings, Config};
use trellis_render::TemplateComposer;
use trellis_server::{open_store, server_config_from_trellis_config};

use super::DiagnosticsArg;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Page slug, or `/` for the site root.
    page: String,

    /// Path to configuration file (default: auto-discover trellis.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store snapshot file (overrides config).
    #[arg(short, long, env = "TRELLIS_STORE")]
    store: Option<PathBuf>,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Diagnostics in the rendered page (overrides config).
    #[arg(long, value_enum)]
    diagnostics: Option<DiagnosticsArg>,

    /// Enable verbose output (print render warnings).
    #[arg(short, long)]
    pub verbose: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the page cannot be
    /// composed.
    pub(crate) fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            store_path: self.store,
            diagnostics: self.diagnostics.map(Into::into),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let server_config = server_config_from_trellis_config(&config, version.to_owned(), false);

        let store = open_store(&server_config)?;
        let composer = TemplateComposer::new(store, &NullCache, server_config.render);
        let page = composer.render_public(Some(&self.page))?;
        tracing::debug!(
            page = %page.context.page.url(),
            warnings = page.warnings.len(),
            "Page composed"
        );

        if self.verbose {
            for warning in &page.warnings {
                output.warning(&format!("Warning: {warning}"));
            }
        }

        match &self.output {
            Some(path) => {
                std::fs::write(path, &page.html)?;
                output.success(&format!(
                    "Rendered {} to {}",
                    page.context.page.url(),
                    path.display()
                ));
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(page.html.as_bytes())?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}
