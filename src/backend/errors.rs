// Error types for the extraction and search backends

use super::diagnostics::{diagnose_error, BlockingReason};

pub type Result<T> = std::result::Result<T, BackendError>;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Input is neither an 11 character id nor a recognized video URL
    #[error("Need 11 character video id or the URL of the video. Got {0}")]
    InvalidVideoId(String),

    /// Video info lookup failed for any reason
    #[error("Can't get video info. Video is either private or unavailable in your country.")]
    VideoUnavailable,

    /// Channel search came back empty
    #[error("No channel found for {0:?}")]
    ChannelNotFound(String),

    /// Network timeout while talking to YouTube
    #[error("Network timeout: YouTube is not responding")]
    NetworkTimeout,

    /// yt-dlp or python not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// URL rejected by yt-dlp
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse yt-dlp or HTTP JSON output
    #[error("Parse error: {0}")]
    Parse(String),

    /// Child process could not be started or waited on
    #[error("Execution error: {0}")]
    Execution(String),

    /// yt-dlp ran and reported a failure
    #[error("Extraction failed: {message}")]
    Extraction {
        message: String,
        reason: Option<BlockingReason>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Async runtime could not be built for a blocking call
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl BackendError {
    /// Blocking reason attached to an extraction failure, if any
    pub fn blocking_reason(&self) -> Option<BlockingReason> {
        match self {
            Self::Extraction { reason, .. } => *reason,
            Self::NetworkTimeout => Some(BlockingReason::NetworkTimeout),
            _ => None,
        }
    }
}

// Classify yt-dlp stderr into an error variant. Only the `ERROR:` line
// decides the variant; earlier log lines carry titles and ids.
impl From<String> for BackendError {
    fn from(s: String) -> Self {
        let message = first_error_line(&s);
        let lower = message.to_lowercase();
        let any = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

        if any(&["timed out", "timeouterror", "read timeout", "connect timeout"]) {
            return Self::NetworkTimeout;
        }

        if any(&["command not found", "no module named yt_dlp"]) {
            return Self::ToolNotFound(message);
        }

        if any(&["unsupported url", "invalid url", "incomplete youtube id"]) {
            return Self::InvalidUrl(message);
        }

        Self::Extraction {
            reason: diagnose_error(&s),
            message,
        }
    }
}

/// Pick the line yt-dlp flagged as `ERROR:`, falling back to the last non-empty line
fn first_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr.lines().map(str::trim).rev().find(|l| !l.is_empty()))
        .unwrap_or("yt-dlp failed without output")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_classified() {
        let err = BackendError::from("Timed out after 120s".to_string());
        assert!(matches!(err, BackendError::NetworkTimeout));
        assert_eq!(err.blocking_reason(), Some(BlockingReason::NetworkTimeout));
    }

    #[test]
    fn test_unsupported_url_classified() {
        let err = BackendError::from(
            "WARNING: something\nERROR: Unsupported URL: https://example.com".to_string(),
        );
        match err {
            BackendError::InvalidUrl(msg) => assert!(msg.starts_with("ERROR: Unsupported URL")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_extraction_carries_reason() {
        let err = BackendError::from(
            "[youtube] abc: Downloading webpage\nERROR: [youtube] abc: Private video. Sign in if you've been granted access".to_string(),
        );
        assert_eq!(err.blocking_reason(), Some(BlockingReason::PrivateVideo));
        assert!(err.to_string().contains("Private video"));
    }

    #[test]
    fn test_only_error_line_decides_variant() {
        let err = BackendError::from(
            "[ExtractAudio] Destination: /tmp/Song-abc.mp3\nERROR: Postprocessing: [Errno 2] No such file or directory: 'ffmpeg'".to_string(),
        );
        assert!(matches!(err, BackendError::Extraction { .. }));

        let err = BackendError::from(
            "[youtube] timeout_abc: Downloading webpage\nERROR: [youtube] timeout_abc: Video unavailable".to_string(),
        );
        assert_eq!(err.blocking_reason(), Some(BlockingReason::VideoUnavailable));

        let err = BackendError::from(
            "ERROR: Unable to download webpage: The read operation timed out".to_string(),
        );
        assert!(matches!(err, BackendError::NetworkTimeout));

        let err = BackendError::from("/usr/bin/python3: No module named yt_dlp".to_string());
        assert!(matches!(err, BackendError::ToolNotFound(_)));
    }

    #[test]
    fn test_empty_stderr_message() {
        let err = BackendError::from(String::new());
        match err {
            BackendError::Extraction { message, reason } => {
                assert_eq!(message, "yt-dlp failed without output");
                assert_eq!(reason, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
