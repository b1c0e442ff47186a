use std::fmt::Write as _;

use file_sync::{Feedback, SyncResult, SyncStatus, SyncSummary, SyncTask, TaskOrigin};

const MAX_PATH_WIDTH: usize = 50;

/// Print feedback items to stderr.
pub fn print_feedback(feedback: &[Feedback]) {
    for item in feedback {
        eprintln!("{item}");
    }
}

/// Human-readable summary of a run, grouped by outcome.
pub fn render_summary(summary: &SyncSummary) -> String {
    let mut out = String::new();

    let groups = [
        (SyncStatus::Updated, &summary.updated),
        (SyncStatus::Created, &summary.created),
        (SyncStatus::Skipped, &summary.skipped),
        (SyncStatus::Failed, &summary.failed),
    ];

    for (status, results) in groups {
        if results.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }

        let width = path_width(results.iter().map(|r| &r.task));
        let _ = writeln!(out, "{} ({})", status_label(status), results.len());
        for result in results {
            let _ = writeln!(
                out,
                "  {:<width$}  {}",
                truncate(&result.task.local_path, width),
                detail(result),
            );
        }
    }

    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "{} files: {} updated, {} created, {} unchanged, {} failed",
        summary.total,
        summary.updated.len(),
        summary.created.len(),
        summary.skipped.len(),
        summary.failed.len(),
    );

    out
}

/// Task list shown by `plan`.
pub fn render_plan(tasks: &[SyncTask]) -> String {
    let mut out = String::new();
    let width = path_width(tasks.iter());

    for task in tasks {
        let marker = match task.origin {
            TaskOrigin::IdentityFile => ' ',
            TaskOrigin::PathPair => '>',
        };
        let _ = writeln!(
            out,
            "{marker} {:<width$}  {}",
            truncate(&task.local_path, width),
            remote_label(task),
        );
    }

    let _ = writeln!(out, "\n{} files planned", tasks.len());
    out
}

fn status_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Updated => "Updated",
        SyncStatus::Created => "Created",
        SyncStatus::Skipped => "Unchanged",
        SyncStatus::Failed => "Failed",
    }
}

fn detail(result: &SyncResult) -> String {
    match result.status {
        SyncStatus::Failed => result.error.clone().unwrap_or_default(),
        SyncStatus::Skipped => result.reason.clone().unwrap_or_default(),
        SyncStatus::Updated | SyncStatus::Created => match &result.resolved_ref {
            Some(resolved) => format!("{}@{resolved}", source_label(&result.task)),
            None => source_label(&result.task),
        },
    }
}

fn source_label(task: &SyncTask) -> String {
    if task.remote_path == task.local_path {
        task.repository.clone()
    } else {
        format!("{}:{}", task.repository, task.remote_path)
    }
}

fn remote_label(task: &SyncTask) -> String {
    let location = format!("{}:{}", task.repository, task.remote_path);
    match &task.git_ref {
        Some(git_ref) => format!("{location}@{git_ref}"),
        None => location,
    }
}

fn path_width<'a>(tasks: impl Iterator<Item = &'a SyncTask>) -> usize {
    tasks
        .map(|t| t.local_path.chars().count())
        .max()
        .unwrap_or(0)
        .min(MAX_PATH_WIDTH)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}
