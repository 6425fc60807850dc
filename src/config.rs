// Backend configuration
//
// Defaults work out of the box. A JSON file under the user config directory and
// a handful of environment variables can override them.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::backend::engine::EngineMode;
use crate::backend::errors::{BackendError, Result};

pub const DEFAULT_SUGGEST_URL: &str = "https://suggestqueries-clients6.youtube.com/complete/search";
pub const DEFAULT_VOTES_URL: &str = "https://returnyoutubedislikeapi.com/votes";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How to invoke yt-dlp (cli, python or auto)
    pub engine: EngineMode,
    /// Explicit yt-dlp binary; skips discovery
    pub ytdlp_path: Option<String>,
    /// Python interpreter used in python mode
    pub python: Option<String>,
    /// SOCKS5/HTTP proxy URL, used for yt-dlp and HTTP calls
    pub proxy: Option<String>,
    /// Path to cookies.txt file
    pub cookies_path: Option<String>,
    /// Browser name for `--cookies-from-browser` (e.g. "firefox")
    pub cookies_from_browser: Option<String>,
    /// yt-dlp `--socket-timeout`
    pub socket_timeout_secs: u32,
    /// Wall clock limit for a single metadata call
    pub command_timeout_secs: u64,
    /// Wall clock limit for playlist and channel listings
    pub listing_timeout_secs: u64,
    /// Videos per search page
    pub search_page_size: usize,
    /// Maximum channel/playlist search results
    pub result_limit: usize,
    pub region: String,
    pub language: String,
    pub suggest_url: String,
    pub votes_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineMode::Auto,
            ytdlp_path: None,
            python: None,
            proxy: None,
            cookies_path: None,
            cookies_from_browser: None,
            socket_timeout_secs: 30,
            command_timeout_secs: 120,
            listing_timeout_secs: 600,
            search_page_size: 20,
            result_limit: 50,
            region: "US".to_string(),
            language: "en".to_string(),
            suggest_url: DEFAULT_SUGGEST_URL.to_string(),
            votes_url: DEFAULT_VOTES_URL.to_string(),
        }
    }
}

impl Config {
    /// `<config_dir>/yt-bridge/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("yt-bridge").join("config.json"))
    }

    /// Load the default config file if present, then apply env overrides
    pub fn load() -> Result<Self> {
        let config = match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            BackendError::Config(format!("{}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "loaded config");
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.search_page_size == 0 {
            return Err(BackendError::Config("search_page_size must be positive".to_string()));
        }
        if self.result_limit == 0 {
            return Err(BackendError::Config("result_limit must be positive".to_string()));
        }
        Ok(())
    }

    /// Apply `YTDLP_PATH`, `YTDLP_PYTHON`, `YT_BRIDGE_PROXY` and `YT_BRIDGE_COOKIES`
    pub fn with_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = var("YTDLP_PATH") {
            self.ytdlp_path = Some(path);
            self.engine = EngineMode::Cli;
        }
        // Point at a venv interpreter to sidestep PEP 668 system Pythons
        if let Some(python) = var("YTDLP_PYTHON") {
            self.python = Some(python);
        }
        if let Some(proxy) = var("YT_BRIDGE_PROXY") {
            self.proxy = Some(proxy);
        }
        if let Some(cookies) = var("YT_BRIDGE_COOKIES") {
            self.cookies_path = Some(cookies);
        }
        self
    }

    pub fn with_engine(mut self, engine: EngineMode) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_ytdlp_path(mut self, path: impl Into<String>) -> Self {
        self.ytdlp_path = Some(path.into());
        self.engine = EngineMode::Cli;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_cookies_path(mut self, path: Option<String>) -> Self {
        self.cookies_path = path;
        self
    }

    pub fn with_cookies_from_browser(mut self, browser: Option<String>) -> Self {
        self.cookies_from_browser = browser;
        self
    }

    pub fn with_command_timeout(mut self, seconds: u64) -> Self {
        self.command_timeout_secs = seconds;
        self
    }

    pub fn with_search_page_size(mut self, size: usize) -> Self {
        self.search_page_size = size.max(1);
        self
    }

    pub fn with_suggest_url(mut self, url: impl Into<String>) -> Self {
        self.suggest_url = url.into();
        self
    }

    pub fn with_votes_url(mut self, url: impl Into<String>) -> Self {
        self.votes_url = url.into();
        self
    }
}
