//! CLI command implementations.

pub(crate) mod render;
pub(crate) mod seed;
pub(crate) mod serve;

use clap::ValueEnum;
use trellis_config::DiagnosticsMode;

pub(crate) use render::RenderArgs;
pub(crate) use seed::SeedArgs;
pub(crate) use serve::ServeArgs;

/// How resolution problems appear in rendered pages.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum DiagnosticsArg {
    /// Visible diagnostic blocks.
    Verbose,
    /// HTML comments only.
    Quiet,
}

impl From<DiagnosticsArg> for DiagnosticsMode {
    fn from(arg: DiagnosticsArg) -> Self {
        match arg {
            DiagnosticsArg::Verbose => Self::Verbose,
            DiagnosticsArg::Quiet => Self::Quiet,
        }
    }
}
