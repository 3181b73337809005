//! aswatch — watch ActionScript sources and recompile through a warm fcsh.

mod args;
mod reporter;
mod runner;
mod test_runner;
mod watcher;

use std::future::Future;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use aswatch_fcsh::{CompilerShell, ShellError};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let options = match args::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("aswatch: {error:#}");
            eprintln!();
            args::print_usage();
            return ExitCode::from(2);
        }
    };
    init_tracing(options.verbose);

    match run(options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

/// Latch the first interrupt into a watch flag. The listener lives for the
/// whole session, so a signal delivered while a build is in flight is kept
/// until the loop can act on it instead of killing the compile.
fn shutdown_watch<F>(interrupt: F) -> watch::Receiver<bool>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if interrupt.await.is_ok() {
            let _ = tx.send(true);
        }
    });
    rx
}

async fn run(options: args::Options) -> Result<()> {
    reporter::print_header(&options.request, options.temporary_output);

    // Installed before the first build; compiles always run to completion.
    let mut shutdown = shutdown_watch(tokio::signal::ctrl_c());

    let program = std::env::var("FCSH").unwrap_or_else(|_| "fcsh".to_string());
    let mut shell = match CompilerShell::start(&program).await {
        Ok(shell) => shell,
        Err(error) => {
            if let ShellError::PromptNotFound { output } = &error {
                for line in output {
                    eprintln!("{line}");
                }
            }
            if matches!(error, ShellError::ExecutableNotFound { .. }) {
                tracing::error!("Please make sure that fcsh is in your PATH,");
                tracing::error!("or point the FCSH environment variable at it.");
            }
            return Err(error).context("could not start the compiler shell");
        }
    };

    let mut watcher = watcher::watch(&options.request.source_directories)?;

    // First compile happens right away; later ones wait for changes.
    runner::build(
        &mut shell,
        &options.request,
        options.temporary_output,
        options.verbose,
    )
    .await?;

    loop {
        // Covers an interrupt that arrived while the previous build ran.
        if *shutdown.borrow() {
            tracing::info!("Shutting down.");
            break;
        }
        tokio::select! {
            change = watcher.next_change() => {
                if change.is_none() {
                    tracing::warn!("Filesystem watcher stopped; exiting.");
                    break;
                }
                tracing::info!("Change detected.");
                runner::build(
                    &mut shell,
                    &options.request,
                    options.temporary_output,
                    options.verbose,
                )
                .await?;
            }
            // An Err means the listener task is gone without a signal;
            // the branch is then disabled and watching continues.
            Ok(()) = shutdown.changed() => {
                tracing::info!("Shutting down.");
                break;
            }
        }
    }

    shell.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn interrupt_during_a_build_is_latched() {
        let mut shutdown = shutdown_watch(async { Ok(()) });
        // Nobody is selecting on the receiver yet, as during a build.
        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.changed().await.expect("interrupt recorded");
        assert!(*shutdown.borrow());
    }

    #[tokio::test]
    async fn failed_interrupt_listener_never_signals() {
        let mut shutdown = shutdown_watch(async {
            Err(std::io::Error::other("no signal handler"))
        });
        assert!(shutdown.changed().await.is_err());
        assert!(!*shutdown.borrow());
    }
}
