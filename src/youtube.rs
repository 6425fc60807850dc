//! Async entry point used by the media browser.
//!
//! Every operation takes a query or an identifier, makes its calls one after
//! another and hands back plain payloads from [`crate::backend::models`].
//! Video-taking operations accept either a bare id or a watch/short URL.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::backend::engine::{Engine, EngineInfo};
use crate::backend::errors::{BackendError, Result};
use crate::backend::extractor::{find_existing_subtitle, YtDlpExtractor};
use crate::backend::models::{
    ChannelResult, Comment, Playlist, PlaylistResult, StreamFormat, VideoDetails, VideoResult,
    Votes,
};
use crate::backend::search::YtDlpSearch;
use crate::backend::traits::{MediaExtractor, ProgressFn, SearchClient};
use crate::backend::web::WebClient;
use crate::config::Config;
use crate::video_id::extract_video_id;

pub struct YouTube {
    extractor: Arc<dyn MediaExtractor>,
    search: Arc<dyn SearchClient>,
    web: WebClient,
    engine: Option<Arc<Engine>>,
}

impl YouTube {
    /// Resolve yt-dlp and build the default backends
    pub fn new(config: Config) -> Result<Self> {
        let engine = Arc::new(Engine::from_config(&config)?);
        let web = WebClient::new(&config)?;
        info!(mode = %engine.mode(), program = engine.program(), "yt-dlp engine ready");

        let extractor = Arc::new(YtDlpExtractor::new(engine.clone(), &config));
        let search = Arc::new(YtDlpSearch::new(engine.clone(), web.clone(), &config));
        let mut youtube = Self::from_parts(extractor, search, web);
        youtube.engine = Some(engine);
        Ok(youtube)
    }

    /// Assemble from custom backends
    pub fn from_parts(
        extractor: Arc<dyn MediaExtractor>,
        search: Arc<dyn SearchClient>,
        web: WebClient,
    ) -> Self {
        debug!(extractor = extractor.name(), search = search.name(), "backends assembled");
        Self {
            extractor,
            search,
            web,
            engine: None,
        }
    }

    /// Mode, program and version of the yt-dlp in use
    pub fn engine_info(&self) -> Option<EngineInfo> {
        self.engine.as_ref().map(|engine| engine.info())
    }

    /// Every media format of a video, storyboards excluded
    pub async fn video_streams(&self, video: &str) -> Result<Vec<StreamFormat>> {
        let id = extract_video_id(video)?;
        let formats = self.extractor.formats(&id).await?;
        Ok(formats.into_iter().filter(|f| !f.is_storyboard()).collect())
    }

    pub async fn download_video(
        &self,
        video: &str,
        folder: impl AsRef<Path>,
        audio_only: bool,
    ) -> Result<PathBuf> {
        let id = extract_video_id(video)?;
        self.extractor
            .download(&id, folder.as_ref(), audio_only, None)
            .await
    }

    pub async fn download_video_with_progress(
        &self,
        video: &str,
        folder: impl AsRef<Path>,
        audio_only: bool,
        progress: &ProgressFn,
    ) -> Result<PathBuf> {
        let id = extract_video_id(video)?;
        self.extractor
            .download(&id, folder.as_ref(), audio_only, Some(progress))
            .await
    }

    /// Up to `pages` pages of video results. The first page must succeed; a
    /// later failure or a short page ends the search with what was gathered.
    pub async fn search_videos(&self, query: &str, pages: usize) -> Result<Vec<VideoResult>> {
        let page_size = self.search.page_size();
        let mut videos = self.search.search_videos_page(query, 0).await?;
        let mut last_len = videos.len();

        for page in 1..pages {
            if last_len < page_size {
                debug!(query, page, "results exhausted");
                break;
            }
            match self.search.search_videos_page(query, page).await {
                Ok(batch) => {
                    last_len = batch.len();
                    videos.extend(batch);
                }
                Err(e) => {
                    warn!(query, page, error = %e, "search paging stopped");
                    break;
                }
            }
        }
        Ok(videos)
    }

    pub async fn channel_search(&self, query: &str) -> Result<Vec<ChannelResult>> {
        self.search.search_channels(query).await
    }

    pub async fn playlist_search(&self, query: &str) -> Result<Vec<PlaylistResult>> {
        self.search.search_playlists(query).await
    }

    pub async fn get_playlist(&self, playlist_id: &str) -> Result<Playlist> {
        self.search.playlist(playlist_id).await
    }

    pub async fn suggestions(&self, query: &str) -> Result<Vec<String>> {
        self.search.suggestions(query).await
    }

    /// One random suggestion for `query`, or `query` itself when there is none
    pub async fn get_video_title_suggestions(&self, query: &str) -> Result<String> {
        let suggestions = self.search.suggestions(query).await?;
        Ok(suggestions
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| query.to_string()))
    }

    /// `(id, title)` of the best channel match
    pub async fn channel_id_from_name(&self, query: &str) -> Result<(String, String)> {
        let channel = self
            .search
            .search_channels(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::ChannelNotFound(query.to_string()))?;
        Ok((channel.id, channel.title))
    }

    pub async fn all_videos_from_channel(&self, channel_id: &str) -> Result<Vec<VideoResult>> {
        self.search.channel_videos(channel_id).await
    }

    pub async fn search_videos_from_channel(
        &self,
        channel_id: &str,
        query: &str,
    ) -> Result<Vec<VideoResult>> {
        self.search.search_channel(channel_id, query).await
    }

    pub async fn all_playlists_from_channel(&self, channel_id: &str) -> Result<Vec<PlaylistResult>> {
        self.search.channel_playlists(channel_id).await
    }

    /// Comments of a video; empty on any failure
    pub async fn get_comments(&self, video: &str) -> Vec<Comment> {
        let result = match extract_video_id(video) {
            Ok(id) => self.extractor.comments(&id).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(video, error = %e, "comments unavailable");
            Vec::new()
        })
    }

    /// Metadata merged with vote counts. Every failure is reported as
    /// [`BackendError::VideoUnavailable`].
    pub async fn get_video_info(&self, video: &str) -> Result<VideoDetails> {
        self.video_info(video).await.map_err(|e| {
            warn!(video, error = %e, "video info failed");
            BackendError::VideoUnavailable
        })
    }

    async fn video_info(&self, video: &str) -> Result<VideoDetails> {
        let id = extract_video_id(video)?;
        let mut details = self.extractor.metadata(&id).await?;
        let votes = self.web.votes(&id).await?;
        details.likes = Some(votes.likes);
        details.dislikes = Some(votes.dislikes);
        details.average_rating = Some(votes.rating);
        Ok(details)
    }

    pub async fn return_dislikes(&self, video: &str) -> Result<Votes> {
        let id = extract_video_id(video)?;
        self.web.votes(&id).await
    }

    /// Path of the video's VTT subtitle under `<output_dir>/subtitles/`,
    /// downloading it only when none is there yet
    pub async fn get_subtitles(
        &self,
        video: &str,
        output_dir: impl AsRef<Path>,
    ) -> Result<Option<PathBuf>> {
        let id = extract_video_id(video)?;
        let output_dir = output_dir.as_ref();
        if let Some(existing) = find_existing_subtitle(&id, output_dir) {
            debug!(video_id = %id, path = %existing.display(), "subtitle already on disk");
            return Ok(Some(existing));
        }
        self.extractor.download_subtitles(&id, output_dir).await
    }
}
