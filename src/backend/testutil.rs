// Fake yt-dlp for tests: a shell script that logs its argv to `calls.log`

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use super::engine::Engine;
use crate::config::Config;

/// Write `body` as a yt-dlp stand-in inside `dir` and build an engine on it
pub(crate) fn fake_engine(dir: &Path, body: &str) -> (Arc<Engine>, Config) {
    let script = dir.join("fake-yt-dlp");
    let log = dir.join("calls.log");
    let content = format!(
        "#!/bin/sh\necho \"$@\" >> '{}'\n{}\n",
        log.display(),
        body
    );
    std::fs::write(&script, content).unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();

    let config = Config::default()
        .with_ytdlp_path(script.to_string_lossy())
        .with_command_timeout(10);
    let engine = Arc::new(Engine::from_config(&config).unwrap());
    (engine, config)
}

/// Number of times the fake engine was invoked
pub(crate) fn call_count(dir: &Path) -> usize {
    std::fs::read_to_string(dir.join("calls.log"))
        .map(|log| log.lines().count())
        .unwrap_or(0)
}
