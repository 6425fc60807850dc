// yt-dlp invocation
//
// Two ways to run the engine:
// - CLI mode: the native `yt-dlp` binary
// - Python mode: `python3 -m yt_dlp` (tracks upstream fixes faster via pip)
//
// Auto picks the binary when present and falls back to the Python module.

use std::fmt;
use std::process::Command as StdCommand;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::errors::{BackendError, Result};
use super::process::{run_output_with_timeout, run_streaming};
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    /// Native yt-dlp binary
    Cli,
    /// Python module yt_dlp
    Python,
    /// Binary first, Python module as fallback
    #[default]
    Auto,
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Python => write!(f, "python"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// What the engine resolved to, for the browser's about screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineInfo {
    pub mode: EngineMode,
    pub program: String,
    pub version: Option<String>,
}

/// A resolved yt-dlp command plus the flags every call shares
#[derive(Debug, Clone)]
pub struct Engine {
    mode: EngineMode,
    program: String,
    prefix: Vec<String>,
    common: Vec<String>,
}

impl Engine {
    pub fn from_config(config: &Config) -> Result<Self> {
        let (mode, program, prefix) = match (config.engine, &config.ytdlp_path) {
            (_, Some(path)) => (EngineMode::Cli, path.clone(), Vec::new()),
            (EngineMode::Cli, None) => (EngineMode::Cli, find_ytdlp(), Vec::new()),
            (EngineMode::Python, None) => {
                let python = config.python.clone().unwrap_or_else(find_python);
                (EngineMode::Python, python, python_prefix())
            }
            (EngineMode::Auto, None) => {
                let binary = find_ytdlp();
                let python = config.python.clone().unwrap_or_else(find_python);
                if has_ytdlp_binary(&binary) {
                    (EngineMode::Cli, binary, Vec::new())
                } else if python_has_ytdlp(&python) {
                    debug!(python = %python, "yt-dlp binary missing, using python module");
                    (EngineMode::Python, python, python_prefix())
                } else {
                    return Err(BackendError::ToolNotFound(
                        "yt-dlp (neither the binary nor the python module is installed)"
                            .to_string(),
                    ));
                }
            }
        };

        Ok(Self {
            mode,
            program,
            prefix,
            common: common_args(config),
        })
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Probe `--version`
    pub fn version(&self) -> Option<String> {
        let out = StdCommand::new(&self.program)
            .args(&self.prefix)
            .arg("--version")
            .output()
            .ok()?;
        if !out.status.success() {
            return None;
        }
        let version = String::from_utf8_lossy(&out.stdout).trim().to_string();
        (!version.is_empty()).then_some(version)
    }

    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            mode: self.mode,
            program: self.program.clone(),
            version: self.version(),
        }
    }

    fn full_args(&self, args: Vec<String>) -> Vec<String> {
        let mut full = Vec::with_capacity(self.prefix.len() + self.common.len() + args.len());
        full.extend(self.prefix.iter().cloned());
        full.extend(self.common.iter().cloned());
        full.extend(args);
        full
    }

    /// Run and require a zero exit status; stderr is classified on failure
    pub async fn run(&self, args: Vec<String>, timeout_secs: u64) -> Result<Vec<u8>> {
        let args = self.full_args(args);
        debug!(program = %self.program, args = %args.join(" "), "running yt-dlp");

        let output = run_output_with_timeout(&self.program, &args, timeout_secs).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        log_stderr(&stderr);

        if !output.status.success() {
            return Err(BackendError::from(stderr.into_owned()));
        }
        Ok(output.stdout)
    }

    /// Single JSON document (`--dump-json` on one video, `--dump-single-json`)
    pub async fn json(&self, args: Vec<String>, timeout_secs: u64) -> Result<Value> {
        let stdout = self.run(args, timeout_secs).await?;
        serde_json::from_slice(&stdout)
            .map_err(|e| BackendError::Parse(format!("Invalid JSON from yt-dlp: {}", e)))
    }

    /// One JSON document per line (`--dump-json --flat-playlist`)
    pub async fn json_lines(&self, args: Vec<String>, timeout_secs: u64) -> Result<Vec<Value>> {
        let stdout = self.run(args, timeout_secs).await?;
        parse_json_lines(&stdout)
    }

    /// Run without a deadline, streaming stdout lines; returns stdout on success
    pub async fn stream<F>(&self, args: Vec<String>, on_line: F) -> Result<Vec<String>>
    where
        F: FnMut(&str),
    {
        let args = self.full_args(args);
        debug!(program = %self.program, args = %args.join(" "), "streaming yt-dlp");

        let (status, lines, stderr) = run_streaming(&self.program, &args, on_line).await?;
        log_stderr(&stderr);

        if !status.success() {
            return Err(BackendError::from(stderr));
        }
        Ok(lines)
    }
}

pub(crate) fn parse_json_lines(stdout: &[u8]) -> Result<Vec<Value>> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            serde_json::from_str(l)
                .map_err(|e| BackendError::Parse(format!("Invalid JSON line from yt-dlp: {}", e)))
        })
        .collect()
}

/// Mirror yt-dlp's own levels: warnings are noise, errors are worth surfacing
fn log_stderr(stderr: &str) {
    for line in stderr.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("ERROR:") {
            warn!(target: "yt_bridge::ytdlp", "{}", line);
        } else {
            debug!(target: "yt_bridge::ytdlp", "{}", line);
        }
    }
}

fn common_args(config: &Config) -> Vec<String> {
    let mut args = vec![
        "--ignore-config".to_string(),
        "--no-colors".to_string(),
        "--socket-timeout".to_string(),
        config.socket_timeout_secs.to_string(),
    ];

    // Cookies
    if let Some(path) = &config.cookies_path {
        args.push("--cookies".to_string());
        args.push(path.clone());
    } else if let Some(browser) = &config.cookies_from_browser {
        args.push("--cookies-from-browser".to_string());
        args.push(browser.clone());
    }

    // Proxy
    if let Some(proxy) = &config.proxy {
        args.push("--proxy".to_string());
        args.push(proxy.clone());
    }

    args
}

fn python_prefix() -> Vec<String> {
    vec!["-m".to_string(), "yt_dlp".to_string()]
}

/// Find yt-dlp binary
fn find_ytdlp() -> String {
    let common_paths = [
        "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
        "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac
        "/usr/bin/yt-dlp",          // System installation
    ];

    for path in common_paths {
        if std::path::Path::new(path).exists() {
            return path.to_string();
        }
    }

    // pip --user installs
    if let Some(home) = dirs::home_dir() {
        let local = home.join(".local/bin/yt-dlp");
        if local.exists() {
            return local.to_string_lossy().into_owned();
        }
    }

    if let Ok(output) = StdCommand::new("which").arg("yt-dlp").output() {
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                return path;
            }
        }
    }

    "yt-dlp".to_string()
}

/// Find Python interpreter
fn find_python() -> String {
    let candidates = ["python3", "/opt/homebrew/bin/python3", "/usr/local/bin/python3"];

    for cmd in candidates {
        if let Ok(output) = StdCommand::new(cmd).arg("--version").output() {
            if output.status.success() {
                return cmd.to_string();
            }
        }
    }

    "python3".to_string()
}

fn has_ytdlp_binary(path: &str) -> bool {
    StdCommand::new(path)
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn python_has_ytdlp(python: &str) -> bool {
    StdCommand::new(python)
        .args(["-c", "import yt_dlp"])
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}
