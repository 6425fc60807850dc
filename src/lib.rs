//! Bridge between a terminal media browser and YouTube.
//!
//! Extraction and downloads go through yt-dlp, run as a child process. Search
//! and listings use yt-dlp's flat-playlist mode. Suggestions and vote counts
//! come from plain HTTPS endpoints. [`YouTube`] is the async entry point,
//! [`blocking::YouTube`] the synchronous one.

pub mod backend;
pub mod blocking;
pub mod config;
pub mod logging;
pub mod video_id;
pub mod youtube;

pub use backend::errors::{BackendError, Result};
pub use backend::models::{
    ChannelResult, Comment, DownloadProgress, Playlist, PlaylistResult, StreamFormat, Thumbnail,
    VideoDetails, VideoResult, Votes,
};
pub use backend::engine::{EngineInfo, EngineMode};
pub use backend::traits::ProgressFn;
pub use config::Config;
pub use logging::init_logging;
pub use video_id::{extract_video_id, watch_url};
pub use youtube::YouTube;
