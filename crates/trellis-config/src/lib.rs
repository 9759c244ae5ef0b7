//! Configuration management for Trellis.
//!
//! Parses `trellis.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `server.csrf_token`
//! - `render.media_base_url`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override store snapshot path.
    pub store_path: Option<PathBuf>,
    /// Override menu cache flag.
    pub menu_cache_enabled: Option<bool>,
    /// Override diagnostics verbosity.
    pub diagnostics: Option<DiagnosticsMode>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "trellis.toml";

/// Largest grid the builder accepts.
const MAX_GRID_COLUMNS: u16 = 48;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Store configuration (paths are relative strings from TOML).
    store: StoreConfigRaw,
    /// Layout grid configuration.
    pub grid: GridConfig,
    /// Rendering configuration.
    pub render: RenderConfig,
    /// Cache configuration.
    pub cache: CacheConfig,

    /// Resolved store configuration (set after loading).
    #[serde(skip)]
    pub store_resolved: StoreConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfigRaw::default(),
            grid: GridConfig::default(),
            render: RenderConfig::default(),
            cache: CacheConfig::default(),
            // Without a config file the site lives in memory, seeded with the demo site
            store_resolved: StoreConfig {
                path: None,
                seed_demo: true,
            },
            config_path: None,
        }
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Fixed CSRF token. A random token is generated per process when unset.
    pub csrf_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            csrf_token: None,
        }
    }
}

/// Raw store configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StoreConfigRaw {
    path: Option<String>,
    seed_demo: Option<bool>,
}

/// Resolved store configuration.
#[derive(Debug, Default)]
pub struct StoreConfig {
    /// JSON snapshot file. `None` keeps the site in memory only.
    pub path: Option<PathBuf>,
    /// Populate an empty store with the demo site on startup.
    pub seed_demo: bool,
}

/// Layout grid configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of grid columns.
    pub columns: u16,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { columns: 12 }
    }
}

/// How much detail resolution failures show in rendered output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticsMode {
    /// Visible diagnostic blocks with field dumps.
    #[default]
    Verbose,
    /// HTML comments only.
    Quiet,
}

/// Rendering configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Diagnostic verbosity for widget and section fallbacks.
    pub diagnostics: DiagnosticsMode,
    /// Base URL prepended to media paths.
    pub media_base_url: String,
    /// Site name used in titles and the default footer.
    pub site_name: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            diagnostics: DiagnosticsMode::default(),
            media_base_url: "/media".to_owned(),
            site_name: "Trellis".to_owned(),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache processed menus between requests.
    pub menus: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { menus: true }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.csrf_token`").
        field: String,
        /// Error message (e.g., "${`TRELLIS_CSRF`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `trellis.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(path) = &settings.store_path {
            self.store_resolved.path = Some(path.clone());
        }
        if let Some(enabled) = settings.menu_cache_enabled {
            self.cache.menus = enabled;
        }
        if let Some(diagnostics) = settings.diagnostics {
            self.render.diagnostics = diagnostics;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_grid()?;
        require_non_empty(&self.render.media_base_url, "render.media_base_url")?;
        require_non_empty(&self.render.site_name, "render.site_name")?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        if let Some(token) = &self.server.csrf_token {
            require_non_empty(token, "server.csrf_token")?;
        }

        Ok(())
    }

    /// Validate grid configuration.
    fn validate_grid(&self) -> Result<(), ConfigError> {
        let columns = self.grid.columns;
        if columns == 0 {
            return Err(ConfigError::Validation(
                "grid.columns must be greater than 0".to_owned(),
            ));
        }
        if columns > MAX_GRID_COLUMNS {
            return Err(ConfigError::Validation(format!(
                "grid.columns cannot exceed {MAX_GRID_COLUMNS}"
            )));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref token) = self.server.csrf_token {
            self.server.csrf_token = Some(expand::expand_env(token, "server.csrf_token")?);
        }

        self.render.media_base_url =
            expand::expand_env(&self.render.media_base_url, "render.media_base_url")?;

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.store_resolved = StoreConfig {
            path: self.store.path.as_deref().map(|p| config_dir.join(p)),
            seed_demo: self.store.seed_demo.unwrap_or(true),
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.csrf_token, None);
        assert_eq!(config.store_resolved.path, None);
        assert!(config.store_resolved.seed_demo);
        assert_eq!(config.grid.columns, 12);
        assert_eq!(config.render.diagnostics, DiagnosticsMode::Verbose);
        assert_eq!(config.render.media_base_url, "/media");
        assert!(config.cache.menus);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.grid.columns, 12);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 9000
csrf_token = "fixed-token"

[store]
path = "site.json"
seed_demo = false

[grid]
columns = 24

[render]
diagnostics = "quiet"
media_base_url = "https://cdn.example.com/media"
site_name = "Example"

[cache]
menus = false
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.csrf_token.as_deref(), Some("fixed-token"));
        assert_eq!(config.grid.columns, 24);
        assert_eq!(config.render.diagnostics, DiagnosticsMode::Quiet);
        assert_eq!(config.render.site_name, "Example");
        assert!(!config.cache.menus);
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[store]
path = "data/site.json"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.store_resolved.path,
            Some(PathBuf::from("/project/data/site.json"))
        );
        assert!(config.store_resolved.seed_demo);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[store]\npath = \"site.json\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.store_resolved.path, Some(dir.path().join("site.json")));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = Config::load(Some(Path::new("/nonexistent/trellis.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_validate_rejects_zero_columns() {
        let mut config = Config::default();
        config.grid.columns = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("grid.columns"));
    }

    #[test]
    fn test_validate_rejects_huge_grid() {
        let mut config = Config::default();
        config.grid.columns = 100;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_csrf_token() {
        let mut config = Config::default();
        config.server.csrf_token = Some(String::new());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.csrf_token"));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default();
        let settings = CliSettings {
            host: Some("0.0.0.0".to_owned()),
            port: Some(3000),
            store_path: Some(PathBuf::from("/tmp/site.json")),
            menu_cache_enabled: Some(false),
            diagnostics: Some(DiagnosticsMode::Quiet),
        };
        config.apply_cli_settings(&settings);

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(
            config.store_resolved.path,
            Some(PathBuf::from("/tmp/site.json"))
        );
        assert!(!config.cache.menus);
        assert_eq!(config.render.diagnostics, DiagnosticsMode::Quiet);
    }

    #[test]
    fn test_apply_cli_settings_none_keeps_values() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.server.port, 8080);
        assert!(config.cache.menus);
    }
}
