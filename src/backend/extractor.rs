// yt-dlp backed extraction: formats, downloads, comments, metadata, subtitles

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use time::macros::format_description;
use tracing::{debug, info, trace};

use super::engine::Engine;
use super::errors::{BackendError, Result};
use super::models::{parse_thumbnails, Comment, DownloadProgress, StreamFormat, VideoDetails};
use super::traits::{MediaExtractor, ProgressFn};
use crate::config::Config;
use crate::video_id::watch_url;

/// Language used when a video has no uploaded subtitles
const AUTO_SUBTITLE_LANG: &str = "en";

pub struct YtDlpExtractor {
    engine: Arc<Engine>,
    timeout_secs: u64,
    comments_timeout_secs: u64,
}

impl YtDlpExtractor {
    pub fn new(engine: Arc<Engine>, config: &Config) -> Self {
        Self {
            engine,
            timeout_secs: config.command_timeout_secs,
            // comment threads page through many requests
            comments_timeout_secs: config.listing_timeout_secs,
        }
    }

    async fn info_json(&self, video_id: &str, extra: &[&str], timeout_secs: u64) -> Result<Value> {
        let mut args: Vec<String> = ["--dump-json", "--no-playlist", "--skip-download"]
            .iter()
            .chain(extra)
            .map(|s| s.to_string())
            .collect();
        args.push(watch_url(video_id));
        self.engine.json(args, timeout_secs).await
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn formats(&self, video_id: &str) -> Result<Vec<StreamFormat>> {
        let info = self.info_json(video_id, &[], self.timeout_secs).await?;
        parse_formats(&info)
    }

    async fn download(
        &self,
        video_id: &str,
        folder: &Path,
        audio_only: bool,
        progress: Option<&ProgressFn>,
    ) -> Result<PathBuf> {
        let template = folder.join("%(title)s-%(id)s.%(ext)s");
        let mut args: Vec<String> = vec![
            "--no-playlist".to_string(),
            "--newline".to_string(),
            // --print implies --quiet; keep progress lines coming anyway
            "--progress".to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
        ];

        if audio_only {
            args.extend(
                [
                    "-f",
                    "bestaudio/best",
                    "-x",
                    "--audio-format",
                    "mp3",
                    "--audio-quality",
                    "192K",
                ]
                .iter()
                .map(|s| s.to_string()),
            );
        }
        args.push(watch_url(video_id));

        let lines = self
            .engine
            .stream(args, |line| {
                if let Some((percent, status)) = parse_ytdlp_progress(line) {
                    trace!(percent, "{}", status);
                    if let Some(emit) = progress {
                        emit(DownloadProgress { percent, status });
                    }
                }
            })
            .await?;

        let path = final_path(&lines).ok_or_else(|| {
            BackendError::Parse("yt-dlp did not report the downloaded file".to_string())
        })?;
        info!(video_id, path = %path.display(), audio_only, "download finished");
        Ok(path)
    }

    async fn comments(&self, video_id: &str) -> Result<Vec<Comment>> {
        let info = self
            .info_json(video_id, &["--write-comments"], self.comments_timeout_secs)
            .await?;
        Ok(parse_comments(&info))
    }

    async fn metadata(&self, video_id: &str) -> Result<VideoDetails> {
        let info = self.info_json(video_id, &[], self.timeout_secs).await?;
        parse_details(&info)
    }

    async fn download_subtitles(
        &self,
        video_id: &str,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>> {
        let info = self.info_json(video_id, &[], self.timeout_secs).await?;
        let lang = pick_subtitle_lang(&info);
        let stem = subtitle_stem(video_id, output_dir);
        debug!(video_id, lang = %lang, "fetching subtitles");

        let args = vec![
            "--skip-download".to_string(),
            "--no-playlist".to_string(),
            "--write-subs".to_string(),
            "--write-auto-subs".to_string(),
            "--sub-format".to_string(),
            "vtt".to_string(),
            "--sub-langs".to_string(),
            lang.clone(),
            "-o".to_string(),
            stem.to_string_lossy().into_owned(),
            watch_url(video_id),
        ];
        self.engine.run(args, self.timeout_secs).await?;

        let path = subtitle_path(&stem, &lang);
        Ok(path.is_file().then_some(path))
    }
}

fn parse_formats(info: &Value) -> Result<Vec<StreamFormat>> {
    let formats = info["formats"]
        .as_array()
        .ok_or_else(|| BackendError::Parse("No formats array in JSON".to_string()))?;
    Ok(formats.iter().map(StreamFormat::from_json).collect())
}

fn parse_comments(info: &Value) -> Vec<Comment> {
    info["comments"]
        .as_array()
        .map(|comments| {
            comments
                .iter()
                .map(|c| Comment {
                    text: c["text"].as_str().unwrap_or("").to_string(),
                    author: c["author"].as_str().unwrap_or("").to_string(),
                    time: c["timestamp"].as_i64().unwrap_or(0),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_details(info: &Value) -> Result<VideoDetails> {
    let id = info["id"]
        .as_str()
        .ok_or_else(|| BackendError::Parse("No id in video JSON".to_string()))?;

    Ok(VideoDetails {
        id: id.to_string(),
        title: info["title"].as_str().unwrap_or("").to_string(),
        description: info["description"].as_str().unwrap_or("").to_string(),
        duration: info["duration"].as_f64(),
        view_count: info["view_count"].as_u64(),
        upload_date: info["upload_date"].as_str().and_then(format_upload_date),
        channel: info["channel"]
            .as_str()
            .or_else(|| info["uploader"].as_str())
            .map(str::to_string),
        channel_id: info["channel_id"].as_str().map(str::to_string),
        keywords: info["tags"]
            .as_array()
            .map(|tags| tags.iter().filter_map(|t| t.as_str().map(str::to_string)).collect())
            .unwrap_or_default(),
        thumbnails: parse_thumbnails(info),
        is_live: info["is_live"].as_bool().unwrap_or(false),
        likes: info["like_count"].as_u64(),
        dislikes: None,
        average_rating: None,
    })
}

/// yt-dlp dates are `YYYYMMDD`
fn format_upload_date(raw: &str) -> Option<String> {
    time::Date::parse(raw, format_description!("[year][month][day]"))
        .ok()
        .map(|d| d.to_string())
}

/// First uploaded subtitle language in yt-dlp's order, else auto-generated English
fn pick_subtitle_lang(info: &Value) -> String {
    info["subtitles"]
        .as_object()
        .and_then(|subs| subs.keys().find(|lang| lang.as_str() != "live_chat"))
        .cloned()
        .unwrap_or_else(|| AUTO_SUBTITLE_LANG.to_string())
}

/// `<output_dir>/subtitles/<video_id>`; yt-dlp appends `.<lang>.vtt`
pub fn subtitle_stem(video_id: &str, output_dir: &Path) -> PathBuf {
    output_dir.join("subtitles").join(video_id)
}

fn subtitle_path(stem: &Path, lang: &str) -> PathBuf {
    let mut name: OsString = stem.as_os_str().to_owned();
    name.push(format!(".{}.vtt", lang));
    PathBuf::from(name)
}

/// A previously downloaded `<video_id>*.vtt`, lexicographically first
pub fn find_existing_subtitle(video_id: &str, output_dir: &Path) -> Option<PathBuf> {
    let dir = output_dir.join("subtitles");
    let mut found: Vec<PathBuf> = std::fs::read_dir(&dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with(video_id) && n.ends_with(".vtt"))
        })
        .collect();
    found.sort();
    found.into_iter().next()
}

/// The `--print after_move:filepath` line is the last one that isn't a log line
fn final_path(stdout: &[String]) -> Option<PathBuf> {
    stdout
        .iter()
        .rev()
        .map(|l| l.trim())
        .find(|l| !l.is_empty() && !l.starts_with('['))
        .map(PathBuf::from)
}

/// Parse yt-dlp progress line like:
/// [download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32 (frag 29/454)
/// Returns (percent, status_string)
fn parse_ytdlp_progress(line: &str) -> Option<(f32, String)> {
    lazy_static::lazy_static! {
        static ref PROGRESS_RE: Regex = Regex::new(
            r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)(?:\s+at\s+(\S+(?:\s*\w+/s)?))?(?:\s+ETA\s+(\S+))?(?:\s+\(frag\s+(\d+)/(\d+)\))?"
        ).unwrap();
        static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
        static ref MERGE_RE: Regex = Regex::new(r"\[Merger?\]\s+Merging").unwrap();
        static ref EXTRACT_RE: Regex = Regex::new(r"\[ExtractAudio\]\s+Destination:").unwrap();
        static ref ALREADY_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
    }

    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let size = caps.get(2).map(|m| m.as_str()).unwrap_or("?");
        let speed = caps.get(3).map(|m| m.as_str());
        let eta = caps.get(4).map(|m| m.as_str());

        let mut status = format!("{:.1}% of {}", percent, size);
        if let Some(speed) = speed {
            status.push_str(&format!(" @ {}", speed));
        }
        if let Some(eta) = eta {
            status.push_str(&format!(" ETA {}", eta));
        }
        if let (Some(fc), Some(ft)) = (caps.get(5), caps.get(6)) {
            status.push_str(&format!(" (frag {}/{})", fc.as_str(), ft.as_str()));
        }
        return Some((percent, status));
    }

    if let Some(caps) = DEST_RE.captures(line) {
        let filename = caps.get(1).map(|m| m.as_str()).unwrap_or("file");
        let short_name: String = filename
            .rsplit('/')
            .next()
            .unwrap_or(filename)
            .chars()
            .take(50)
            .collect();
        return Some((0.0, format!("Starting: {}", short_name)));
    }

    if MERGE_RE.is_match(line) {
        return Some((99.0, "Merging video and audio...".to_string()));
    }

    if EXTRACT_RE.is_match(line) {
        return Some((99.0, "Converting to mp3...".to_string()));
    }

    if ALREADY_RE.is_match(line) {
        return Some((100.0, "File already downloaded".to_string()));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_progress_with_fragments() {
        let (percent, status) = parse_ytdlp_progress(
            "[download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)",
        )
        .unwrap();
        assert_eq!(percent, 12.5);
        assert_eq!(status, "12.5% of 310.04MiB @ 374.36KiB/s ETA 11:59 (frag 56/454)");
    }

    #[test]
    fn test_progress_finished_line() {
        let (percent, status) = parse_ytdlp_progress("[download] 100% of    3.93MiB in 00:00:01 at 2.61MiB/s").unwrap();
        assert_eq!(percent, 100.0);
        assert!(status.starts_with("100.0% of 3.93MiB"));
    }

    #[test]
    fn test_progress_other_lines() {
        let (p, s) = parse_ytdlp_progress("[download] Destination: /tmp/out/Song-abc.webm").unwrap();
        assert_eq!((p, s.as_str()), (0.0, "Starting: Song-abc.webm"));
        assert_eq!(parse_ytdlp_progress("[Merger] Merging formats into \"x.mp4\"").unwrap().0, 99.0);
        assert_eq!(
            parse_ytdlp_progress("[download] /tmp/x.mp4 has already been downloaded").unwrap().0,
            100.0
        );
        assert!(parse_ytdlp_progress("[youtube] abc: Downloading webpage").is_none());
    }

    #[test]
    fn test_final_path_skips_log_lines() {
        let lines = vec![
            "[download]  50.0% of 1.00MiB".to_string(),
            "/tmp/out/Song-abc.mp3".to_string(),
            "".to_string(),
        ];
        assert_eq!(final_path(&lines), Some(PathBuf::from("/tmp/out/Song-abc.mp3")));
        assert_eq!(final_path(&["[info] nothing".to_string()]), None);
    }

    #[test]
    fn test_comments_reshaped() {
        let info = json!({"comments": [
            {"id": "c1", "text": "first", "author": "@a", "timestamp": 1700000000},
            {"id": "c2", "text": "no time"}
        ]});
        let comments = parse_comments(&info);
        assert_eq!(
            comments,
            vec![
                Comment { text: "first".into(), author: "@a".into(), time: 1700000000 },
                Comment { text: "no time".into(), author: "".into(), time: 0 },
            ]
        );
        assert!(parse_comments(&json!({})).is_empty());
    }

    #[test]
    fn test_details_mapping() {
        let details = parse_details(&json!({
            "id": "dQw4w9WgXcQ",
            "title": "Song",
            "duration": 212,
            "view_count": 10,
            "upload_date": "20091025",
            "uploader": "Rick",
            "tags": ["a", 1, "b"],
            "like_count": 7
        }))
        .unwrap();
        assert_eq!(details.upload_date.as_deref(), Some("2009-10-25"));
        assert_eq!(format_upload_date("20091325"), None);
        assert_eq!(format_upload_date("2009"), None);
        assert_eq!(details.channel.as_deref(), Some("Rick"));
        assert_eq!(details.keywords, vec!["a", "b"]);
        assert_eq!(details.duration, Some(212.0));
        assert_eq!(details.likes, Some(7));
        assert!(!details.is_live);
        assert!(parse_details(&json!({"title": "x"})).is_err());
    }

    #[test]
    fn test_subtitle_lang_choice() {
        let uploaded = json!({"subtitles": {"live_chat": [], "de": [], "en": []}});
        assert_eq!(pick_subtitle_lang(&uploaded), "de");
        assert_eq!(pick_subtitle_lang(&json!({"subtitles": {}})), "en");
        assert_eq!(pick_subtitle_lang(&json!({})), "en");
    }

    #[test]
    fn test_subtitle_paths() {
        let stem = subtitle_stem("abc", Path::new("/data/"));
        assert_eq!(stem, PathBuf::from("/data/subtitles/abc"));
        assert_eq!(subtitle_path(&stem, "en"), PathBuf::from("/data/subtitles/abc.en.vtt"));
    }

    #[test]
    fn test_find_existing_subtitle() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_existing_subtitle("abc", dir.path()), None);

        let subs = dir.path().join("subtitles");
        std::fs::create_dir_all(&subs).unwrap();
        std::fs::write(subs.join("abc.fr.vtt"), "WEBVTT").unwrap();
        std::fs::write(subs.join("abc.de.vtt"), "WEBVTT").unwrap();
        std::fs::write(subs.join("abc.en.srt"), "1").unwrap();
        std::fs::write(subs.join("xyz.en.vtt"), "WEBVTT").unwrap();

        assert_eq!(find_existing_subtitle("abc", dir.path()), Some(subs.join("abc.de.vtt")));
    }
}

#[cfg(all(test, unix))]
mod engine_tests {
    use super::*;
    use crate::backend::testutil::fake_engine;

    const INFO: &str = r#"{"id":"dQw4w9WgXcQ","title":"Song","formats":[{"format_id":"sb0","ext":"mhtml","format_note":"storyboard"},{"format_id":"18","ext":"mp4","vcodec":"avc1","acodec":"mp4a"}],"subtitles":{"fr":[]}}"#;

    #[tokio::test]
    async fn test_formats_via_engine() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, config) = fake_engine(dir.path(), &format!("echo '{}'", INFO));
        let extractor = YtDlpExtractor::new(engine, &config);

        let formats = extractor.formats("dQw4w9WgXcQ").await.unwrap();
        assert_eq!(formats.len(), 2);
        assert_eq!(formats[1].format_id, "18");
    }

    #[tokio::test]
    async fn test_engine_failure_is_classified() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, config) = fake_engine(
            dir.path(),
            "echo 'ERROR: [youtube] dQw4w9WgXcQ: Video unavailable' >&2; exit 1",
        );
        let extractor = YtDlpExtractor::new(engine, &config);

        let err = extractor.metadata("dQw4w9WgXcQ").await.unwrap_err();
        assert_eq!(
            err.blocking_reason(),
            Some(crate::backend::diagnostics::BlockingReason::VideoUnavailable)
        );
    }

    #[tokio::test]
    async fn test_download_reports_progress_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("media");
        let script = r#"
echo '[download]  50.0% of 2.00MiB at 1.00MiB/s ETA 00:01' >&2
echo '[download] 100% of 2.00MiB in 00:00:02 at 1.00MiB/s' >&2
case "$*" in
  *"-x --audio-format mp3"*) echo "$OUT_DIR/Song-dQw4w9WgXcQ.mp3" ;;
  *) echo "$OUT_DIR/Song-dQw4w9WgXcQ.mp4" ;;
esac
"#;
        let script = format!("OUT_DIR='{}'\n{}", out.display(), script);
        let (engine, config) = fake_engine(dir.path(), &script);
        let extractor = YtDlpExtractor::new(engine, &config);

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: &ProgressFn = &move |p: DownloadProgress| sink.lock().unwrap().push(p.percent);
        let path = extractor
            .download("dQw4w9WgXcQ", &out, true, Some(progress))
            .await
            .unwrap();

        assert_eq!(path, out.join("Song-dQw4w9WgXcQ.mp3"));
        assert_eq!(*seen.lock().unwrap(), vec![50.0, 100.0]);

        let log = std::fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert!(log.contains("-f bestaudio/best"));
        assert!(log.contains("--audio-quality 192K"));
        assert!(log.contains(&format!("-o {}/%(title)s-%(id)s.%(ext)s", out.display())));
        assert!(log.contains("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn test_subtitles_downloaded_for_first_language() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!(
            r#"
case "$*" in
  *--write-subs*)
    for arg; do
      if [ "$prev" = "-o" ]; then stem="$arg"; fi
      prev="$arg"
    done
    mkdir -p "$(dirname "$stem")"
    echo WEBVTT > "$stem.fr.vtt"
    ;;
  *) echo '{}' ;;
esac
"#,
            INFO
        );
        let (engine, config) = fake_engine(dir.path(), &script);
        let extractor = YtDlpExtractor::new(engine, &config);

        let path = extractor
            .download_subtitles("dQw4w9WgXcQ", dir.path())
            .await
            .unwrap();
        assert_eq!(path, Some(dir.path().join("subtitles/dQw4w9WgXcQ.fr.vtt")));

        let log = std::fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert!(log.contains("--sub-langs fr"));
    }
}
