//! Filesystem watcher over the compiler source paths.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Grace period after the first event; editors write files in bursts and one
/// save can touch several files.
const QUIET_PERIOD: Duration = Duration::from_millis(200);

const CHANGE_CHANNEL_CAPACITY: usize = 1;

/// Recursive watcher over the source directories, delivering one coalesced
/// signal per burst of changes.
pub struct SourceWatcher {
    rx: mpsc::Receiver<()>,
    // Dropping the watcher unregisters the OS hooks.
    _watcher: RecommendedWatcher,
}

pub fn watch(directories: &[PathBuf]) -> Result<SourceWatcher> {
    let (tx, rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
    let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
        let Ok(event) = result else { return };
        if event.paths.iter().any(|path| is_watched_source(path)) {
            // A full channel already means a pending rebuild.
            let _ = tx.try_send(());
        }
    })
    .context("failed to create filesystem watcher")?;
    for directory in directories {
        watcher
            .watch(directory, RecursiveMode::Recursive)
            .with_context(|| format!("cannot watch {}", directory.display()))?;
    }
    Ok(SourceWatcher {
        rx,
        _watcher: watcher,
    })
}

impl SourceWatcher {
    /// Wait for a source change, then absorb the burst around it. Returns
    /// `None` once the watcher callback is gone.
    pub async fn next_change(&mut self) -> Option<()> {
        self.rx.recv().await?;
        loop {
            sleep(QUIET_PERIOD).await;
            if self.rx.try_recv().is_err() {
                return Some(());
            }
            while self.rx.try_recv().is_ok() {}
        }
    }
}

/// ActionScript and MXML sources only; hidden files (editor swap and lock
/// files) never trigger rebuilds.
fn is_watched_source(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_none_or(|name| name.starts_with('.'));
    if hidden {
        return false;
    }
    matches!(
        path.extension().and_then(|extension| extension.to_str()),
        Some("as" | "mxml")
    )
}
