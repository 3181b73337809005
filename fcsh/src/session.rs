//! Shell session driver — owns the fcsh process and its request/response
//! cycle.
//!
//! fcsh answers every command with free text terminated by its prompt. The
//! driver spawns the process once, merges its stdout and stderr into a single
//! ordered stream, and reads until the prompt sentinel after each command.
//! All requests are strictly sequential; the held compile id is only
//! meaningful relative to the previous request.

use std::process::Stdio;
use std::sync::LazyLock;

use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;

use crate::types::CompileRequest;

/// Fixed literal marking the end of one fcsh response.
pub const PROMPT: &str = "\n(fcsh) ";

/// Used for `compile <id>` when the target-id notice was never observed.
const DEFAULT_COMPILE_ID: u32 = 1;

const CHUNK_CHANNEL_CAPACITY: usize = 32;

static TARGET_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^fcsh: Assigned (\d+) as the compile target id").expect("valid target id regex")
});

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("{program} not found in PATH")]
    ExecutableNotFound {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The output stream ended before the prompt sentinel appeared. Carries
    /// everything read so far so the caller can report it before terminating.
    #[error("compiler shell closed its output before showing a prompt")]
    PromptNotFound { output: Vec<String> },
    #[error("i/o error talking to the compiler shell")]
    Io(#[from] std::io::Error),
}

/// A long-lived interactive fcsh process.
///
/// Owns the subprocess and both of its output streams exclusively; nothing
/// else reads or writes them.
pub struct CompilerShell {
    child: Child,
    stdin: ChildStdin,
    reader: PromptReader,
    initialized: bool,
    compile_id: Option<u32>,
}

impl CompilerShell {
    /// Launch the compiler shell and wait for its first prompt.
    pub async fn start(program: &str) -> Result<Self, ShellError> {
        let resolved =
            which::which(program).map_err(|source| ShellError::ExecutableNotFound {
                program: program.to_string(),
                source,
            })?;
        tracing::info!("Starting compiler shell ({})", resolved.display());

        let mut child = Command::new(&resolved)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ShellError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ShellError::Io(std::io::Error::other("no stdin on child")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ShellError::Io(std::io::Error::other("no stdout on child")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ShellError::Io(std::io::Error::other("no stderr on child")))?;

        let mut reader = PromptReader::new(stdout, stderr);
        reader.read_until_prompt().await?;
        tracing::debug!("Compiler shell ready");

        Ok(Self {
            child,
            stdin,
            reader,
            initialized: false,
            compile_id: None,
        })
    }

    /// Send one compile request and collect everything up to the next prompt.
    ///
    /// The first call sends the full command line and records the compile id
    /// fcsh assigns; later calls reuse it with a short `compile <id>`. The
    /// session counts as initialized from the moment the full command is on
    /// the wire — a failed compile still initializes it.
    pub async fn run_compilation(
        &mut self,
        request: &CompileRequest,
    ) -> Result<Vec<String>, ShellError> {
        if self.initialized {
            let id = self.compile_id.unwrap_or(DEFAULT_COMPILE_ID);
            self.send_line(&format!("compile {id}")).await?;
            self.reader.read_until_prompt().await
        } else {
            self.send_line(&request.command_line()).await?;
            self.initialized = true;
            let lines = self.reader.read_until_prompt().await?;
            self.compile_id = parse_compile_id(&lines);
            Ok(lines)
        }
    }

    #[must_use]
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// Tear the subprocess down. `kill_on_drop` covers the non-graceful
    /// paths; this just makes shutdown explicit.
    pub async fn shutdown(mut self) {
        let _ = self.stdin.write_all(b"quit\n").await;
        let _ = self.stdin.flush().await;
        if self.child.kill().await.is_err() {
            tracing::debug!("Compiler shell already gone");
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<(), ShellError> {
        tracing::debug!(command = line, "Sending to fcsh");
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }
}

/// Scan a response for the compile-target-id notice.
fn parse_compile_id(lines: &[String]) -> Option<u32> {
    lines
        .iter()
        .find_map(|line| TARGET_ID.captures(line))
        .and_then(|c| c[1].parse().ok())
}

/// Merges the child's stdout and stderr (fcsh writes diagnostics to both)
/// into one buffer and cuts it at the prompt sentinel.
struct PromptReader {
    chunks: mpsc::Receiver<Vec<u8>>,
    buffer: Vec<u8>,
}

impl PromptReader {
    fn new<O, E>(stdout: O, stderr: E) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, chunks) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        spawn_pump(stdout, tx.clone());
        spawn_pump(stderr, tx);
        Self {
            chunks,
            buffer: Vec::new(),
        }
    }

    /// Accumulate output until the buffer contains the prompt sentinel, then
    /// return the complete lines preceding it, terminators stripped. Stream
    /// end before the sentinel is the fatal protocol failure.
    async fn read_until_prompt(&mut self) -> Result<Vec<String>, ShellError> {
        loop {
            if let Some(position) = find_subslice(&self.buffer, PROMPT.as_bytes()) {
                let head = self.buffer[..position].to_vec();
                self.buffer.drain(..position + PROMPT.len());
                return Ok(split_lines(&head));
            }
            match self.chunks.recv().await {
                Some(chunk) => self.buffer.extend_from_slice(&chunk),
                None => {
                    return Err(ShellError::PromptNotFound {
                        output: split_lines(&self.buffer),
                    });
                }
            }
        }
    }
}

fn spawn_pump<R>(mut stream: R, tx: mpsc::Sender<Vec<u8>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 1024];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}
