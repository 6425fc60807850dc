// Search and listings through yt-dlp's flat-playlist mode
//
// yt-dlp already knows how to page through YouTube's search results, channel
// tabs and playlists. Flat mode stops it from resolving each entry, so a page
// of results is a single process run printing one JSON object per line.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::engine::Engine;
use super::errors::{BackendError, Result};
use super::models::{parse_thumbnails, ChannelResult, Playlist, PlaylistResult, VideoResult};
use super::traits::SearchClient;
use super::web::WebClient;
use crate::config::Config;
use crate::video_id::watch_url;

const RESULTS_URL: &str = "https://www.youtube.com/results";
/// `sp` filter values YouTube uses for "Type: Channel" and "Type: Playlist"
const CHANNEL_FILTER: &str = "EgIQAg==";
const PLAYLIST_FILTER: &str = "EgIQAw==";

pub struct YtDlpSearch {
    engine: Arc<Engine>,
    web: WebClient,
    page_size: usize,
    result_limit: usize,
    region: String,
    language: String,
    timeout_secs: u64,
    listing_timeout_secs: u64,
}

impl YtDlpSearch {
    pub fn new(engine: Arc<Engine>, web: WebClient, config: &Config) -> Self {
        Self {
            engine,
            web,
            page_size: config.search_page_size.max(1),
            result_limit: config.result_limit.max(1),
            region: config.region.clone(),
            language: config.language.clone(),
            timeout_secs: config.command_timeout_secs,
            listing_timeout_secs: config.listing_timeout_secs,
        }
    }

    fn flat_args(&self, target: String, extra: &[String]) -> Vec<String> {
        let mut args = vec![
            "--flat-playlist".to_string(),
            "--dump-json".to_string(),
            "--xff".to_string(),
            self.region.clone(),
            "--extractor-args".to_string(),
            format!("youtube:lang={}", self.language),
        ];
        args.extend(extra.iter().cloned());
        args.push(target);
        args
    }

    /// Entries of a limited search (channel/playlist filters)
    async fn filtered_search(&self, query: &str, filter: &str) -> Result<Vec<Value>> {
        let url = Url::parse_with_params(RESULTS_URL, &[("search_query", query), ("sp", filter)])
            .map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
        let args = self.flat_args(
            url.to_string(),
            &["--playlist-end".to_string(), self.result_limit.to_string()],
        );
        self.engine.json_lines(args, self.timeout_secs).await
    }

    /// Every entry of a channel tab or playlist
    async fn listing(&self, target: String) -> Result<Vec<Value>> {
        let args = self.flat_args(target, &[]);
        self.engine.json_lines(args, self.listing_timeout_secs).await
    }
}

#[async_trait]
impl SearchClient for YtDlpSearch {
    fn name(&self) -> &'static str {
        "yt-dlp-flat"
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn search_videos_page(&self, query: &str, page: usize) -> Result<Vec<VideoResult>> {
        let start = page * self.page_size + 1;
        let end = start + self.page_size - 1;
        debug!(query, page, start, end, "video search page");

        let args = self.flat_args(
            format!("ytsearch{}:{}", end, query),
            &["--playlist-items".to_string(), format!("{}:{}", start, end)],
        );
        let entries = self.engine.json_lines(args, self.timeout_secs).await?;
        Ok(videos_from_entries(&entries))
    }

    async fn search_channels(&self, query: &str) -> Result<Vec<ChannelResult>> {
        let entries = self.filtered_search(query, CHANNEL_FILTER).await?;
        Ok(entries.iter().filter_map(channel_from_entry).collect())
    }

    async fn search_playlists(&self, query: &str) -> Result<Vec<PlaylistResult>> {
        let entries = self.filtered_search(query, PLAYLIST_FILTER).await?;
        Ok(entries.iter().filter_map(playlist_from_entry).collect())
    }

    async fn playlist(&self, playlist_id: &str) -> Result<Playlist> {
        let args = vec![
            "--flat-playlist".to_string(),
            "--dump-single-json".to_string(),
            playlist_url(playlist_id),
        ];
        let json = self.engine.json(args, self.listing_timeout_secs).await?;
        Ok(parse_playlist(&json, playlist_id))
    }

    async fn suggestions(&self, query: &str) -> Result<Vec<String>> {
        self.web.suggestions(query).await
    }

    async fn channel_videos(&self, channel_id: &str) -> Result<Vec<VideoResult>> {
        let entries = self.listing(channel_tab_url(channel_id, "videos")).await?;
        Ok(videos_from_entries(&entries))
    }

    async fn channel_playlists(&self, channel_id: &str) -> Result<Vec<PlaylistResult>> {
        let entries = self.listing(channel_tab_url(channel_id, "playlists")).await?;
        Ok(entries.iter().filter_map(playlist_from_entry).collect())
    }

    async fn search_channel(&self, channel_id: &str, query: &str) -> Result<Vec<VideoResult>> {
        let mut url = Url::parse(&channel_tab_url(channel_id, "search"))
            .map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut().append_pair("query", query);
        let entries = self.listing(url.to_string()).await?;
        Ok(videos_from_entries(&entries))
    }
}

pub fn playlist_url(playlist_id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={}", playlist_id)
}

/// Channel tab URL for a `UC…` id, an `@handle` or a full channel URL
pub fn channel_tab_url(channel: &str, tab: &str) -> String {
    let channel = channel.trim();
    if channel.starts_with("http://") || channel.starts_with("https://") {
        format!("{}/{}", channel.trim_end_matches('/'), tab)
    } else if channel.starts_with('@') {
        format!("https://www.youtube.com/{}/{}", channel, tab)
    } else {
        format!("https://www.youtube.com/channel/{}/{}", channel, tab)
    }
}

fn str_field(entry: &Value, key: &str) -> Option<String> {
    entry[key].as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

/// Tab entries (channels, playlists) come back with `ie_key: YoutubeTab`
fn is_tab_entry(entry: &Value) -> bool {
    entry["ie_key"].as_str() == Some("YoutubeTab")
}

fn videos_from_entries(entries: &[Value]) -> Vec<VideoResult> {
    entries
        .iter()
        .filter(|e| !is_tab_entry(e))
        .filter_map(video_from_entry)
        .collect()
}

fn video_from_entry(entry: &Value) -> Option<VideoResult> {
    let id = str_field(entry, "id")?;
    Some(VideoResult {
        url: str_field(entry, "url").unwrap_or_else(|| watch_url(&id)),
        title: str_field(entry, "title").unwrap_or_default(),
        channel: str_field(entry, "channel").or_else(|| str_field(entry, "uploader")),
        channel_id: str_field(entry, "channel_id"),
        duration: entry["duration"].as_f64(),
        view_count: entry["view_count"].as_u64(),
        description: str_field(entry, "description"),
        thumbnails: parse_thumbnails(entry),
        id,
    })
}

fn channel_from_entry(entry: &Value) -> Option<ChannelResult> {
    if !is_tab_entry(entry) {
        return None;
    }
    let id = str_field(entry, "channel_id").or_else(|| str_field(entry, "id"))?;
    let url = str_field(entry, "url")
        .unwrap_or_else(|| format!("https://www.youtube.com/channel/{}", id));
    if url.contains("list=") {
        return None;
    }
    Some(ChannelResult {
        title: str_field(entry, "title")
            .or_else(|| str_field(entry, "channel"))
            .unwrap_or_default(),
        follower_count: entry["channel_follower_count"].as_u64(),
        description: str_field(entry, "description"),
        thumbnails: parse_thumbnails(entry),
        url,
        id,
    })
}

fn playlist_from_entry(entry: &Value) -> Option<PlaylistResult> {
    if !is_tab_entry(entry) {
        return None;
    }
    let id = str_field(entry, "id")?;
    if id.starts_with("UC") && !str_field(entry, "url").map_or(false, |u| u.contains("list=")) {
        return None;
    }
    Some(PlaylistResult {
        url: str_field(entry, "url").unwrap_or_else(|| playlist_url(&id)),
        title: str_field(entry, "title").unwrap_or_default(),
        channel: str_field(entry, "channel").or_else(|| str_field(entry, "uploader")),
        video_count: entry["playlist_count"].as_u64(),
        thumbnails: parse_thumbnails(entry),
        id,
    })
}

fn parse_playlist(json: &Value, requested_id: &str) -> Playlist {
    let videos = json["entries"]
        .as_array()
        .map(|entries| videos_from_entries(entries))
        .unwrap_or_default();

    Playlist {
        id: str_field(json, "id").unwrap_or_else(|| requested_id.to_string()),
        title: str_field(json, "title").unwrap_or_default(),
        channel: str_field(json, "channel").or_else(|| str_field(json, "uploader")),
        channel_id: str_field(json, "channel_id"),
        description: str_field(json, "description"),
        video_count: json["playlist_count"]
            .as_u64()
            .or(Some(videos.len() as u64)),
        videos,
    }
}


#[cfg(all(test, unix))]
mod engine_tests {
    use super::*;
    use crate::backend::testutil::fake_engine;

    fn search_on(dir: &std::path::Path, body: &str) -> YtDlpSearch {
        let (engine, config) = fake_engine(dir, body);
        let config = config.with_search_page_size(2);
        let web = WebClient::new(&config).unwrap();
        YtDlpSearch::new(engine, web, &config)
    }

    #[tokio::test]
    async fn test_second_page_range() {
        let dir = tempfile::tempdir().unwrap();
        let search = search_on(
            dir.path(),
            r#"echo '{"id":"aaaaaaaaaaa","title":"a"}'
echo '{"id":"bbbbbbbbbbb","title":"b"}'"#,
        );

        let page = search.search_videos_page("lofi beats", 1).await.unwrap();
        assert_eq!(page.len(), 2);

        let log = std::fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert!(log.contains("--playlist-items 3:4"));
        assert!(log.contains("ytsearch4:lofi beats"));
        assert!(log.contains("--xff US"));
    }

    #[tokio::test]
    async fn test_channel_search_url_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let search = search_on(
            dir.path(),
            r#"echo '{"ie_key":"YoutubeTab","id":"UCx","url":"https://www.youtube.com/channel/UCx","title":"X"}'"#,
        );

        let channels = search.search_channels("x & y").await.unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].title, "X");

        let log = std::fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert!(log.contains("--playlist-end 50"));
        assert!(log.contains("https://www.youtube.com/results?search_query=x+%26+y&sp=EgIQAg%3D%3D"));
    }

    #[tokio::test]
    async fn test_channel_search_within_channel() {
        let dir = tempfile::tempdir().unwrap();
        let search = search_on(dir.path(), r#"echo '{"id":"aaaaaaaaaaa","title":"hit"}'"#);

        let videos = search.search_channel("UCx", "live").await.unwrap();
        assert_eq!(videos[0].title, "hit");

        let log = std::fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert!(log.contains("https://www.youtube.com/channel/UCx/search?query=live"));
    }

    #[tokio::test]
    async fn test_playlist_search_url_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let search = search_on(
            dir.path(),
            r#"echo '{"ie_key":"YoutubeTab","id":"PLx","url":"https://www.youtube.com/playlist?list=PLx","title":"Mix","playlist_count":3}'"#,
        );

        let playlists = search.search_playlists("chill").await.unwrap();
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].video_count, Some(3));

        let log = std::fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert!(log.contains("--playlist-end 50"));
        assert!(log.contains("https://www.youtube.com/results?search_query=chill&sp=EgIQAw%3D%3D"));
    }

    #[tokio::test]
    async fn test_playlist_expanded_from_single_json() {
        let dir = tempfile::tempdir().unwrap();
        let search = search_on(
            dir.path(),
            r#"echo '{"id":"PLx","title":"Mix","channel":"Someone","entries":[{"id":"aaaaaaaaaaa","title":"one"}]}'"#,
        );

        let playlist = search.playlist("PLx").await.unwrap();
        assert_eq!(playlist.title, "Mix");
        assert_eq!(playlist.videos.len(), 1);
        assert_eq!(playlist.video_count, Some(1));

        let log = std::fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert!(log.contains("--flat-playlist --dump-single-json https://www.youtube.com/playlist?list=PLx"));
    }

    #[tokio::test]
    async fn test_channel_playlists_tab() {
        let dir = tempfile::tempdir().unwrap();
        let search = search_on(
            dir.path(),
            r#"echo '{"ie_key":"YoutubeTab","id":"PLa","url":"https://www.youtube.com/playlist?list=PLa","title":"Uploads"}'"#,
        );

        let playlists = search.channel_playlists("UCx").await.unwrap();
        assert_eq!(playlists[0].id, "PLa");

        let log = std::fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert!(log.contains("https://www.youtube.com/channel/UCx/playlists"));
        assert!(log.contains("--flat-playlist --dump-json"));
    }
}
