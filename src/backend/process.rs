// Child process helpers shared by the yt-dlp wrappers

use std::process::{Output, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use super::errors::{BackendError, Result};

fn spawn_error(program: &str, e: std::io::Error) -> BackendError {
    if e.kind() == std::io::ErrorKind::NotFound {
        BackendError::ToolNotFound(program.to_string())
    } else {
        BackendError::Execution(format!("Failed to start {}: {}", program, e))
    }
}

/// Run command to completion, killing it after `timeout_secs`
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<Output> {
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        BackendError::Execution(format!("Failed to capture stdout from {}", program))
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        BackendError::Execution(format!("Failed to capture stderr from {}", program))
    })?;

    // Drain both pipes while waiting so a chatty child never blocks on a full pipe
    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status) => {
            let status = status?;
            let stdout = join_pipe(stdout_task, "stdout").await?;
            let stderr = join_pipe(stderr_task, "stderr").await?;
            Ok(Output { status, stdout, stderr })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(BackendError::NetworkTimeout)
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>> {
    task.await
        .map_err(|e| BackendError::Execution(format!("{} task failed: {}", name, e)))?
        .map_err(BackendError::from)
}

/// Run command, handing every output line (stdout and stderr) to `on_line`
/// as it arrives. Returns the exit status, the stdout lines and the full stderr.
pub async fn run_streaming<F>(
    program: &str,
    args: &[String],
    mut on_line: F,
) -> Result<(std::process::ExitStatus, Vec<String>, String)>
where
    F: FnMut(&str),
{
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let stdout = child.stdout.take().ok_or_else(|| {
        BackendError::Execution(format!("Failed to capture stdout from {}", program))
    })?;
    let stderr = child.stderr.take().ok_or_else(|| {
        BackendError::Execution(format!("Failed to capture stderr from {}", program))
    })?;

    let mut out_reader = BufReader::new(stdout);
    let mut err_reader = BufReader::new(stderr);
    // Partial reads stay in these buffers if the other branch wins the select
    let (mut out_buf, mut err_buf) = (Vec::new(), Vec::new());
    let (mut out_done, mut err_done) = (false, false);
    let mut collected = Vec::new();
    let mut stderr_text = String::new();

    // yt-dlp moves progress to stderr in quiet mode, so read both.
    // Titles are not always UTF-8; decode lossily and keep draining.
    while !(out_done && err_done) {
        tokio::select! {
            read = out_reader.read_until(b'\n', &mut out_buf), if !out_done => {
                if read? == 0 {
                    out_done = true;
                } else {
                    let line = decode_line(&out_buf);
                    out_buf.clear();
                    on_line(&line);
                    collected.push(line);
                }
            }
            read = err_reader.read_until(b'\n', &mut err_buf), if !err_done => {
                if read? == 0 {
                    err_done = true;
                } else {
                    let line = decode_line(&err_buf);
                    err_buf.clear();
                    on_line(&line);
                    stderr_text.push_str(&line);
                    stderr_text.push('\n');
                }
            }
        }
    }

    let status = child.wait().await?;
    Ok((status, collected, stderr_text))
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(&['\r', '\n'][..])
        .to_string()
}
