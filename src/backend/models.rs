// Plain result payloads handed back to the browser

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A downloadable stream as reported by yt-dlp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamFormat {
    /// Format ID (e.g., "137", "140")
    pub format_id: String,
    /// File extension (mp4, webm, m4a)
    pub ext: String,
    /// Format note (e.g., "1080p", "medium")
    pub format_note: Option<String>,
    /// Direct media URL
    pub url: Option<String>,
    /// Resolution string (e.g., "1920x1080", "audio only")
    pub resolution: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f32>,
    /// Video codec (avc1, vp9, av01, none)
    pub vcodec: Option<String>,
    /// Audio codec (mp4a, opus, none)
    pub acodec: Option<String>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    /// Total bitrate in kbps
    pub tbr: Option<f32>,
    pub abr: Option<f32>,
    pub vbr: Option<f32>,
    /// https, m3u8_native, mhtml
    pub protocol: Option<String>,
    pub video_only: bool,
    pub audio_only: bool,
}

impl StreamFormat {
    /// Exact size when known, otherwise the estimate
    pub fn effective_size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }

    /// Storyboard "formats" are thumbnail sheets, not media
    pub fn is_storyboard(&self) -> bool {
        self.format_note.as_deref() == Some("storyboard")
    }

    pub(crate) fn from_json(f: &Value) -> Self {
        let vcodec = f["vcodec"].as_str().map(|s| s.to_string());
        let acodec = f["acodec"].as_str().map(|s| s.to_string());

        let video_only = vcodec.as_ref().map_or(false, |v| v != "none")
            && acodec.as_ref().map_or(true, |a| a == "none");
        let audio_only = acodec.as_ref().map_or(false, |a| a != "none")
            && vcodec.as_ref().map_or(true, |v| v == "none");

        Self {
            format_id: f["format_id"].as_str().unwrap_or("").to_string(),
            ext: f["ext"].as_str().unwrap_or("").to_string(),
            format_note: f["format_note"].as_str().map(|s| s.to_string()),
            url: f["url"].as_str().map(|s| s.to_string()),
            resolution: f["resolution"].as_str().map(|s| s.to_string()),
            width: f["width"].as_u64().map(|w| w as u32),
            height: f["height"].as_u64().map(|h| h as u32),
            fps: f["fps"].as_f64().map(|fps| fps as f32),
            vcodec,
            acodec,
            filesize: f["filesize"].as_u64(),
            filesize_approx: f["filesize_approx"].as_u64(),
            tbr: f["tbr"].as_f64().map(|t| t as f32),
            abr: f["abr"].as_f64().map(|a| a as f32),
            vbr: f["vbr"].as_f64().map(|v| v as f32),
            protocol: f["protocol"].as_str().map(|s| s.to_string()),
            video_only,
            audio_only,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A video entry from a search, playlist or channel listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoResult {
    pub id: String,
    pub title: String,
    pub url: String,
    pub channel: Option<String>,
    pub channel_id: Option<String>,
    /// Length in seconds, absent for live streams
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    pub description: Option<String>,
    pub thumbnails: Vec<Thumbnail>,
}

impl VideoResult {
    /// Duration as `H:MM:SS` or `M:SS`
    pub fn duration_text(&self) -> Option<String> {
        self.duration.map(|d| format_duration(d as u64))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelResult {
    pub id: String,
    pub title: String,
    pub url: String,
    pub follower_count: Option<u64>,
    pub description: Option<String>,
    pub thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistResult {
    pub id: String,
    pub title: String,
    pub url: String,
    pub channel: Option<String>,
    pub video_count: Option<u64>,
    pub thumbnails: Vec<Thumbnail>,
}

/// A fully expanded playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub channel: Option<String>,
    pub channel_id: Option<String>,
    pub description: Option<String>,
    pub video_count: Option<u64>,
    pub videos: Vec<VideoResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub author: String,
    /// Unix timestamp, 0 when yt-dlp did not report one
    pub time: i64,
}

/// Detailed video information for the info screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    /// `YYYY-MM-DD`
    pub upload_date: Option<String>,
    pub channel: Option<String>,
    pub channel_id: Option<String>,
    pub keywords: Vec<String>,
    pub thumbnails: Vec<Thumbnail>,
    pub is_live: bool,
    pub likes: Option<u64>,
    pub dislikes: Option<u64>,
    pub average_rating: Option<f64>,
}

/// Vote counts from the public dislike API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Votes {
    pub id: String,
    pub likes: u64,
    pub dislikes: u64,
    pub rating: f64,
    #[serde(default)]
    pub view_count: Option<u64>,
}

/// Download progress information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub percent: f32,
    pub status: String,
}

/// Format seconds as `H:MM:SS`, or `M:SS` under an hour
pub fn format_duration(total: u64) -> String {
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

pub(crate) fn parse_thumbnails(json: &Value) -> Vec<Thumbnail> {
    json["thumbnails"]
        .as_array()
        .map(|thumbs| {
            thumbs
                .iter()
                .filter_map(|t| {
                    Some(Thumbnail {
                        url: t["url"].as_str()?.to_string(),
                        width: t["width"].as_u64().map(|w| w as u32),
                        height: t["height"].as_u64().map(|h| h as u32),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
