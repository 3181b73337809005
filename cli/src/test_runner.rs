//! Runs the compiled SWF in a Flash player and collects test results over a
//! loopback socket.
//!
//! The movie is expected to connect back to us and speak a line protocol:
//! `passed <name>` and `failed <description>` per test, then `done`.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpListener;
use tokio::process::Command;
use tokio::time::timeout;

use aswatch_fcsh::CompileRequest;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const RESULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_PLAYER: &str = "flashplayer";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TestSummary {
    passed: usize,
    failures: Vec<String>,
}

impl TestSummary {
    fn successful(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run the tests and log the outcome. Test failures are reported, not
/// propagated; a broken test run never stops the watch loop.
pub async fn run(request: &CompileRequest) {
    match try_run(request).await {
        Ok(summary) if summary.successful() => {
            tracing::info!("All {} tests passed.", summary.passed);
        }
        Ok(summary) => {
            for failure in &summary.failures {
                tracing::error!("Test failed: {failure}");
            }
            tracing::warn!(
                "{} of {} tests failed.",
                summary.failures.len(),
                summary.passed + summary.failures.len()
            );
        }
        Err(error) => tracing::error!("Could not run tests: {error:#}"),
    }
}

async fn try_run(request: &CompileRequest) -> Result<TestSummary> {
    // Bind before launching so the player can't race the listener.
    let listener = TcpListener::bind(("127.0.0.1", request.test_port))
        .await
        .with_context(|| format!("cannot listen on test port {}", request.test_port))?;

    let player = std::env::var("FLASHPLAYER").unwrap_or_else(|_| DEFAULT_PLAYER.to_string());
    let mut child = Command::new(&player)
        .arg(&request.output_file)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to launch {player}"))?;

    let (socket, _) = timeout(CONNECT_TIMEOUT, listener.accept())
        .await
        .context("test run never connected back")??;
    let summary = timeout(RESULT_TIMEOUT, read_results(socket))
        .await
        .context("test run timed out")??;

    let _ = child.kill().await;
    Ok(summary)
}

/// Consume result lines until `done` or stream end.
async fn read_results<R>(stream: R) -> Result<TestSummary>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut summary = TestSummary::default();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "done" {
            break;
        }
        if line.starts_with("passed ") {
            summary.passed += 1;
        } else if let Some(description) = line.strip_prefix("failed ") {
            summary.failures.push(description.to_string());
        } else if !line.is_empty() {
            tracing::debug!("Unrecognized test result line: {line}");
        }
    }
    Ok(summary)
}
