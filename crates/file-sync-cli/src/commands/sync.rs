use anyhow::Result;
use file_sync::{FileSource, LocalFs, SourceSpec, SyncOptions, SyncSummary, sync_sources};

use super::format::{print_feedback, render_summary};

/// Whether a finished run should make the process exit nonzero.
pub fn should_fail(summary: &SyncSummary, fail_on_error: bool) -> bool {
    summary.all_failed || (fail_on_error && !summary.failed.is_empty())
}

/// Run a sync and print the summary to stdout, warnings to stderr.
pub async fn run(
    specs: &[SourceSpec],
    source: &dyn FileSource,
    fs: &dyn LocalFs,
    options: &SyncOptions,
    json: bool,
) -> Result<SyncSummary> {
    if !json {
        println!("Syncing files from {} source(s)...", specs.len());
    }

    let run = sync_sources(specs, source, fs, options).await?;

    print_feedback(&run.feedback);

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print!("{}", render_summary(&run.summary));
        if !run.summary.has_changes && run.summary.failed.is_empty() {
            println!("Everything is up to date.");
        }
    }

    Ok(run.summary)
}
