//! Video id normalization.
//!
//! Accepts a bare 11 character id or the usual YouTube URL shapes and returns
//! the canonical id.

use regex::Regex;
use url::Url;

use crate::backend::errors::{BackendError, Result};

lazy_static::lazy_static! {
    static ref VIDEO_ID_RE: Regex = Regex::new(r"^[\w-]{11}$").unwrap();
}

const WATCH_HOSTS: [&str; 4] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "gaming.youtube.com",
];
const SHORT_HOSTS: [&str; 2] = ["youtu.be", "www.youtu.be"];

/// Whether `s` is shaped like a video id
pub fn is_video_id(s: &str) -> bool {
    VIDEO_ID_RE.is_match(s)
}

/// Extract the video id from an id, a `watch?v=` URL or a `youtu.be` URL.
///
/// ```
/// use yt_bridge::extract_video_id;
///
/// assert_eq!(extract_video_id("https://www.youtube.com/watch?v=LDU_Txk06tM").unwrap(), "LDU_Txk06tM");
/// assert_eq!(extract_video_id("https://youtu.be/LDU_Txk06tM").unwrap(), "LDU_Txk06tM");
/// assert!(extract_video_id("http://example.com").is_err());
/// ```
pub fn extract_video_id(input: &str) -> Result<String> {
    let input = input.trim();

    if is_video_id(input) {
        return Ok(input.to_string());
    }

    let absolute = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    // Host must match exactly as written, with nothing else in the authority
    let netloc = authority(&absolute);
    let found = Url::parse(&absolute).ok().and_then(|url| {
        let host = url.host_str()?;
        if host != netloc {
            None
        } else if WATCH_HOSTS.contains(&host) {
            url.query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
        } else if SHORT_HOSTS.contains(&host) {
            url.path().rsplit('/').next().map(str::to_string)
        } else {
            None
        }
    });

    match found {
        Some(id) if is_video_id(&id) => Ok(id),
        _ => Err(BackendError::InvalidVideoId(input.to_string())),
    }
}

/// Raw `host[:port]` part between `://` and the path
fn authority(absolute: &str) -> &str {
    let rest = absolute.split_once("://").map_or(absolute, |(_, rest)| rest);
    rest.split(|c| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or(rest)
}

/// Canonical watch page for a video id
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}
