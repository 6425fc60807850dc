//! Synchronous facade for callers without a tokio runtime.
//!
//! Each call builds a current-thread runtime, drives the matching
//! [`crate::YouTube`] operation to completion and drops the runtime again.
//! Must not be called from inside an async context.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::backend::engine::EngineInfo;
use crate::backend::errors::{BackendError, Result};
use crate::backend::models::{
    ChannelResult, Comment, Playlist, PlaylistResult, StreamFormat, VideoDetails, VideoResult,
    Votes,
};
use crate::backend::traits::ProgressFn;
use crate::config::Config;
use crate::youtube;

pub struct YouTube {
    inner: youtube::YouTube,
}

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| BackendError::Runtime(format!("Failed to start runtime: {}", e)))?;
    Ok(runtime.block_on(future))
}

impl YouTube {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            inner: youtube::YouTube::new(config)?,
        })
    }

    pub fn from_async(inner: youtube::YouTube) -> Self {
        Self { inner }
    }

    pub fn engine_info(&self) -> Option<EngineInfo> {
        self.inner.engine_info()
    }

    pub fn video_streams(&self, video: &str) -> Result<Vec<StreamFormat>> {
        block_on(self.inner.video_streams(video))?
    }

    pub fn download_video(
        &self,
        video: &str,
        folder: impl AsRef<Path>,
        audio_only: bool,
    ) -> Result<PathBuf> {
        block_on(self.inner.download_video(video, folder, audio_only))?
    }

    pub fn download_video_with_progress(
        &self,
        video: &str,
        folder: impl AsRef<Path>,
        audio_only: bool,
        progress: &ProgressFn,
    ) -> Result<PathBuf> {
        block_on(
            self.inner
                .download_video_with_progress(video, folder, audio_only, progress),
        )?
    }

    pub fn search_videos(&self, query: &str, pages: usize) -> Result<Vec<VideoResult>> {
        block_on(self.inner.search_videos(query, pages))?
    }

    pub fn channel_search(&self, query: &str) -> Result<Vec<ChannelResult>> {
        block_on(self.inner.channel_search(query))?
    }

    pub fn playlist_search(&self, query: &str) -> Result<Vec<PlaylistResult>> {
        block_on(self.inner.playlist_search(query))?
    }

    pub fn get_playlist(&self, playlist_id: &str) -> Result<Playlist> {
        block_on(self.inner.get_playlist(playlist_id))?
    }

    pub fn suggestions(&self, query: &str) -> Result<Vec<String>> {
        block_on(self.inner.suggestions(query))?
    }

    pub fn get_video_title_suggestions(&self, query: &str) -> Result<String> {
        block_on(self.inner.get_video_title_suggestions(query))?
    }

    pub fn channel_id_from_name(&self, query: &str) -> Result<(String, String)> {
        block_on(self.inner.channel_id_from_name(query))?
    }

    pub fn all_videos_from_channel(&self, channel_id: &str) -> Result<Vec<VideoResult>> {
        block_on(self.inner.all_videos_from_channel(channel_id))?
    }

    pub fn search_videos_from_channel(
        &self,
        channel_id: &str,
        query: &str,
    ) -> Result<Vec<VideoResult>> {
        block_on(self.inner.search_videos_from_channel(channel_id, query))?
    }

    pub fn all_playlists_from_channel(&self, channel_id: &str) -> Result<Vec<PlaylistResult>> {
        block_on(self.inner.all_playlists_from_channel(channel_id))?
    }

    /// Empty when the runtime cannot start, like every other comment failure
    pub fn get_comments(&self, video: &str) -> Vec<Comment> {
        block_on(self.inner.get_comments(video)).unwrap_or_default()
    }

    pub fn get_video_info(&self, video: &str) -> Result<VideoDetails> {
        block_on(self.inner.get_video_info(video))?
    }

    pub fn return_dislikes(&self, video: &str) -> Result<Votes> {
        block_on(self.inner.return_dislikes(video))?
    }

    pub fn get_subtitles(&self, video: &str, output_dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        block_on(self.inner.get_subtitles(video, output_dir))?
    }
}
