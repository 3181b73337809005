//! One build cycle: compile, parse, report, optionally test.

use std::time::Instant;

use anyhow::{Context, Result};

use aswatch_fcsh::{CompileRequest, CompilerShell, OutputParser, ParserOptions};

use crate::reporter;
use crate::test_runner;

/// Drive one compilation through the shell and report the outcome. An error
/// here means the shell itself is gone; compile problems are part of the
/// normal outcome.
pub async fn build(
    shell: &mut CompilerShell,
    request: &CompileRequest,
    temporary_output: bool,
    verbose: bool,
) -> Result<()> {
    let started = Instant::now();
    let lines = shell
        .run_compilation(request)
        .await
        .context("compiler shell died mid-compilation")?;

    let options = ParserOptions {
        typing: request.typing,
        echo_lines: verbose,
    };
    let mut outcome =
        OutputParser::new(options, request.source_directories.clone()).parse(&lines);
    outcome.set_elapsed(started.elapsed());

    let seconds = outcome.elapsed().as_secs_f64();
    if !outcome.success() {
        tracing::warn!("Compilation failed.");
    } else if outcome.bootstrap() {
        tracing::info!("Compiled in ~{seconds:.1}s.");
    } else if outcome.did_anything() {
        let count = outcome.recompiled_file_count().unwrap_or(0);
        let noun = if count == 1 { "file" } else { "files" };
        tracing::info!("Recompiled {count} {noun} in ~{seconds:.1}s.");
    } else {
        tracing::info!("Nothing to recompile.");
    }

    reporter::print_report(&outcome);

    if outcome.success() {
        if request.test {
            test_runner::run(request).await;
        }
        if temporary_output {
            if let Err(error) = std::fs::remove_file(&request.output_file) {
                tracing::debug!(
                    "Could not delete {}: {error}",
                    request.output_file.display()
                );
            }
        }
    }
    tracing::info!("Ready.");
    Ok(())
}
