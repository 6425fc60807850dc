// Blocking diagnostics - classifies yt-dlp failures
//
// yt-dlp reports most refusals on stderr as free text. The patterns below map
// that text to a reason the browser can show next to the error.

use serde::{Deserialize, Serialize};

/// Why YouTube refused to serve a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    /// HTTP 403 Forbidden
    Http403Forbidden,

    /// SABR streaming protection hides the usual formats
    SabrStreaming,

    /// Proof of Origin token required
    PoTokenRequired,

    AgeRestricted,

    GeoBlocked,

    /// Network timeout (often a soft IP block)
    NetworkTimeout,

    /// HTTP 429 or similar
    RateLimited,

    BotDetection,

    PrivateVideo,

    /// Deleted, removed or otherwise gone
    VideoUnavailable,

    /// DRM-protected content (Premium, Movies, rentals)
    DrmProtected,

    /// Channel membership required
    MembersOnly,

    Unknown,
}

impl BlockingReason {
    /// Check if cookies might help
    pub fn cookies_might_help(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden
                | Self::SabrStreaming
                | Self::PoTokenRequired
                | Self::AgeRestricted
                | Self::BotDetection
                | Self::PrivateVideo
                | Self::MembersOnly
        )
    }

    /// Check if a proxy might help
    pub fn proxy_might_help(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden
                | Self::GeoBlocked
                | Self::NetworkTimeout
                | Self::RateLimited
                | Self::BotDetection
        )
    }

    /// No workaround exists
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::DrmProtected | Self::VideoUnavailable)
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::SabrStreaming => "SABR streaming protection active",
            Self::PoTokenRequired => "Proof of Origin token required",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Geographic restriction",
            Self::NetworkTimeout => "Network timeout (possible IP throttling)",
            Self::RateLimited => "Rate limited by YouTube",
            Self::BotDetection => "Bot detection triggered",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::DrmProtected => "DRM-protected content",
            Self::MembersOnly => "Members-only content",
            Self::Unknown => "Unknown blocking reason",
        }
    }

    /// One line the browser can print under the error
    pub fn hint(&self) -> &'static str {
        if self.is_permanent() {
            return "This cannot be worked around.";
        }
        match (self.cookies_might_help(), self.proxy_might_help()) {
            (true, true) => "Try cookies from a logged-in browser or a proxy.",
            (true, false) => "Try cookies from a logged-in browser.",
            (false, true) => "Try a proxy or wait and retry later.",
            (false, false) => "Check the video id and try again later.",
        }
    }
}

/// Map yt-dlp error text to a blocking reason, `None` for empty text
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    if error.trim().is_empty() {
        return None;
    }
    let lower = error.to_lowercase();
    let any = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

    // Most specific first
    let reason = if any(&[
        "drm",
        "widevine",
        "playready",
        "fairplay",
        "youtube premium",
        "requires purchase",
        "rental",
        "requires payment",
    ]) {
        BlockingReason::DrmProtected
    } else if any(&["members only", "members-only", "join this channel", "available to members"]) {
        BlockingReason::MembersOnly
    } else if any(&["sabr"]) {
        BlockingReason::SabrStreaming
    } else if any(&["po token", "proof of origin"]) {
        BlockingReason::PoTokenRequired
    } else if any(&["age-restricted", "confirm your age", "age_verification"]) {
        BlockingReason::AgeRestricted
    } else if any(&["private video", "video is private", "granted access"]) {
        BlockingReason::PrivateVideo
    } else if any(&[
        "video unavailable",
        "video has been removed",
        "no longer available",
        "video is unavailable",
    ]) {
        BlockingReason::VideoUnavailable
    } else if any(&["available in your country", "blocked in your country", "geo restrict"]) {
        BlockingReason::GeoBlocked
    } else if any(&["429", "rate limit", "too many requests"]) {
        BlockingReason::RateLimited
    } else if any(&["not a bot", "captcha", "unusual traffic"]) {
        BlockingReason::BotDetection
    } else if any(&["403", "forbidden"]) {
        BlockingReason::Http403Forbidden
    } else if any(&["timeout", "timed out", "connection refused", "network unreachable"]) {
        BlockingReason::NetworkTimeout
    } else {
        BlockingReason::Unknown
    };

    Some(reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_403_detection() {
        let error = "ERROR: unable to download video data: HTTP Error 403: Forbidden";
        assert_eq!(diagnose_error(error), Some(BlockingReason::Http403Forbidden));
    }

    #[test]
    fn test_bot_detection() {
        let error = "ERROR: [youtube] x: Sign in to confirm you're not a bot";
        assert_eq!(diagnose_error(error), Some(BlockingReason::BotDetection));
    }

    #[test]
    fn test_geo_detection() {
        let error = "The uploader has not made this video available in your country";
        assert_eq!(diagnose_error(error), Some(BlockingReason::GeoBlocked));
    }

    #[test]
    fn test_age_detection() {
        let error = "Sign in to confirm your age. This video may be inappropriate for some users.";
        assert_eq!(diagnose_error(error), Some(BlockingReason::AgeRestricted));
    }

    #[test]
    fn test_unavailable_detection() {
        let error = "ERROR: [youtube] dQw4w9WgXcQ: Video unavailable";
        assert_eq!(diagnose_error(error), Some(BlockingReason::VideoUnavailable));
        assert!(BlockingReason::VideoUnavailable.is_permanent());
    }

    #[test]
    fn test_members_only_detection() {
        let error = "Join this channel to get access to members-only content like this video";
        assert_eq!(diagnose_error(error), Some(BlockingReason::MembersOnly));
    }

    #[test]
    fn test_unknown_and_empty() {
        assert_eq!(diagnose_error("something odd"), Some(BlockingReason::Unknown));
        assert_eq!(diagnose_error("   "), None);
    }

    #[test]
    fn test_hints() {
        assert_eq!(BlockingReason::DrmProtected.hint(), "This cannot be worked around.");
        assert_eq!(
            BlockingReason::GeoBlocked.hint(),
            "Try a proxy or wait and retry later."
        );
        assert_eq!(
            BlockingReason::Http403Forbidden.hint(),
            "Try cookies from a logged-in browser or a proxy."
        );
    }
}
