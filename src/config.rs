//! Optional config file loading. Search order: ./bookcrawl.toml, then
//! $XDG_CONFIG_HOME/bookcrawl/config.toml (or ~/.config/bookcrawl/config.toml).

use serde::Deserialize;
use std::path::PathBuf;

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Site root, e.g. "https://tululu.org/".
    pub site_base: Option<String>,
    /// Base output directory. Paths are relative to CWD.
    pub download_folder: Option<PathBuf>,
    /// Manifest file name, relative to download_folder.
    pub json_folder: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Delay in seconds between requests.
    pub request_delay_secs: Option<u64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Attempts per book on connection failures (default 5).
    pub retry_count: Option<u32>,
    /// Seconds to wait before each retry (default 10).
    pub retry_backoff_secs: Option<u64>,
    /// Books acquired in parallel (default 1).
    pub workers: Option<usize>,
}

/// Search order: (1) ./bookcrawl.toml, (2) $XDG_CONFIG_HOME/bookcrawl/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("bookcrawl.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("bookcrawl").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "loaded config");
            return Ok(Some(config));
        }
    }
    Ok(None)
}
