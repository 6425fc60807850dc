// Seams between the facade and the external engines

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::errors::Result;
use super::models::{
    ChannelResult, Comment, DownloadProgress, Playlist, PlaylistResult, StreamFormat,
    VideoDetails, VideoResult,
};

/// Receives download progress as yt-dlp reports it
pub type ProgressFn = dyn Fn(DownloadProgress) + Send + Sync;

/// Extraction/download engine. Every method takes a canonical video id.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// All formats, storyboards included
    async fn formats(&self, video_id: &str) -> Result<Vec<StreamFormat>>;

    /// Download into `folder`, returning the final file path
    async fn download(
        &self,
        video_id: &str,
        folder: &Path,
        audio_only: bool,
        progress: Option<&ProgressFn>,
    ) -> Result<PathBuf>;

    async fn comments(&self, video_id: &str) -> Result<Vec<Comment>>;

    /// Video metadata without vote counts
    async fn metadata(&self, video_id: &str) -> Result<VideoDetails>;

    /// Write a VTT subtitle below `<output_dir>/subtitles/`
    async fn download_subtitles(&self, video_id: &str, output_dir: &Path)
        -> Result<Option<PathBuf>>;
}

/// Search and listing client
#[async_trait]
pub trait SearchClient: Send + Sync {
    fn name(&self) -> &'static str;

    /// Results per `search_videos_page`
    fn page_size(&self) -> usize;

    /// Zero-based page of video search results
    async fn search_videos_page(&self, query: &str, page: usize) -> Result<Vec<VideoResult>>;

    async fn search_channels(&self, query: &str) -> Result<Vec<ChannelResult>>;

    async fn search_playlists(&self, query: &str) -> Result<Vec<PlaylistResult>>;

    async fn playlist(&self, playlist_id: &str) -> Result<Playlist>;

    async fn suggestions(&self, query: &str) -> Result<Vec<String>>;

    async fn channel_videos(&self, channel_id: &str) -> Result<Vec<VideoResult>>;

    async fn channel_playlists(&self, channel_id: &str) -> Result<Vec<PlaylistResult>>;

    async fn search_channel(&self, channel_id: &str, query: &str) -> Result<Vec<VideoResult>>;
}
