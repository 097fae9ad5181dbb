//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.charla/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.
//! The chosen theme is persisted separately in `~/.charla/theme` so a
//! toggle sticks across sessions without rewriting the config file.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CharlaConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BackendConfig {
    pub base_url: Option<String>,
    pub relay_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UiConfig {
    pub theme: Option<Theme>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_RELAY_URL: &str = "ws://localhost:5000/ws";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub backend_url: String,
    pub relay_url: String,
    pub theme: Theme,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            relay_url: DEFAULT_RELAY_URL.to_string(),
            theme: Theme::Dark,
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

fn charla_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".charla"))
}

/// Returns the path to `~/.charla/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    charla_dir().map(|d| d.join("config.toml"))
}

/// Load config from `~/.charla/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `CharlaConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<CharlaConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(CharlaConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(CharlaConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: CharlaConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &PathBuf) {
    let default_content = r#"# Charla Configuration
# All settings are optional. Defaults are used for anything left out.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [backend]
# base_url = "http://localhost:5000"   # Or set CHARLA_BACKEND_URL env var
# relay_url = "ws://localhost:5000/ws" # Or set CHARLA_RELAY_URL env var

# [ui]
# theme = "dark"                       # "dark" or "light"
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Theme Persistence
// ============================================================================

fn theme_path() -> Option<PathBuf> {
    charla_dir().map(|d| d.join("theme"))
}

/// Load the persisted theme, if any. Takes priority over the config file's
/// `[ui] theme` so the last in-session toggle wins.
pub fn load_theme() -> Option<Theme> {
    let path = theme_path()?;
    match fs::read_to_string(&path).ok()?.trim() {
        "light" => Some(Theme::Light),
        "dark" => Some(Theme::Dark),
        _ => None,
    }
}

/// Persist the theme choice.
pub fn save_theme(theme: Theme) {
    let Some(path) = theme_path() else { return };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Err(e) = fs::write(&path, theme.as_str()) {
        warn!("Failed to persist theme: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_backend` and `cli_relay` are from CLI flags (None = not specified).
pub fn resolve(
    config: &CharlaConfig,
    cli_backend: Option<&str>,
    cli_relay: Option<&str>,
) -> ResolvedConfig {
    // Backend URL: CLI → env → config → default
    let backend_url = cli_backend
        .map(|s| s.to_string())
        .or_else(|| std::env::var("CHARLA_BACKEND_URL").ok())
        .or_else(|| config.backend.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

    // Relay URL: CLI → env → config → default
    let relay_url = cli_relay
        .map(|s| s.to_string())
        .or_else(|| std::env::var("CHARLA_RELAY_URL").ok())
        .or_else(|| config.backend.relay_url.clone())
        .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string());

    // Theme: persisted toggle → config → default
    let theme = load_theme()
        .or(config.ui.theme)
        .unwrap_or_default();

    ResolvedConfig {
        backend_url,
        relay_url,
        theme,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = CharlaConfig::default();
        assert!(config.backend.base_url.is_none());
        assert!(config.ui.theme.is_none());
    }

    #[test]
    fn test_resolve_config_values_override_defaults() {
        let config = CharlaConfig {
            backend: BackendConfig {
                base_url: Some("http://example.com:8080".to_string()),
                relay_url: Some("ws://example.com:8080/ws".to_string()),
            },
            ..Default::default()
        };
        let resolved = resolve(&config, None, None);
        assert_eq!(resolved.backend_url, "http://example.com:8080");
        assert_eq!(resolved.relay_url, "ws://example.com:8080/ws");
    }

    #[test]
    fn test_resolve_cli_wins() {
        let config = CharlaConfig {
            backend: BackendConfig {
                base_url: Some("http://from-config".to_string()),
                relay_url: None,
            },
            ..Default::default()
        };
        let resolved = resolve(&config, Some("http://from-cli"), None);
        assert_eq!(resolved.backend_url, "http://from-cli");
    }

    #[test]
    fn test_sparse_toml_parses() {
        // Only override one thing, everything else stays default
        let toml_str = r#"
[backend]
base_url = "http://192.168.1.10:5000"
"#;
        let config: CharlaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.backend.base_url.as_deref(),
            Some("http://192.168.1.10:5000")
        );
        assert!(config.backend.relay_url.is_none());
        assert!(config.ui.theme.is_none());
    }

    #[test]
    fn test_theme_toml_round_trip() {
        let config: CharlaConfig = toml::from_str("[ui]\ntheme = \"light\"").unwrap();
        assert_eq!(config.ui.theme, Some(Theme::Light));
        let out = toml::to_string(&config).unwrap();
        assert!(out.contains("theme = \"light\""));
    }

    #[test]
    fn test_theme_toggle() {
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
    }
}
