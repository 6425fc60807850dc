// Backend layer: everything that talks to yt-dlp or the web endpoints

pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod extractor;
pub mod models;
pub mod process;
pub mod search;
pub mod traits;
pub mod web;

#[cfg(all(test, unix))]
pub(crate) mod testutil;

pub use diagnostics::{diagnose_error, BlockingReason};
pub use engine::{Engine, EngineInfo, EngineMode};
pub use errors::{BackendError, Result};
pub use extractor::YtDlpExtractor;
pub use models::{
    ChannelResult, Comment, DownloadProgress, Playlist, PlaylistResult, StreamFormat,
    Thumbnail, VideoDetails, VideoResult, Votes,
};
pub use search::YtDlpSearch;
pub use traits::{MediaExtractor, ProgressFn, SearchClient};
pub use web::WebClient;
