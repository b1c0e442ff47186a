use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SourceSpec, validate_sources};
use crate::feedback::Feedback;
use crate::fs::LocalFs;
use crate::glob::expand_tasks;
use crate::source::FileSource;
use crate::task::{SyncTask, normalize};

/// Switches for a single run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Used for tasks whose source has no credential of its own.
    pub default_credential: Option<String>,
    /// Write files that do not exist locally yet.
    pub create_missing: bool,
    /// Stop at the first failed task.
    pub fail_fast: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            default_credential: None,
            create_missing: true,
            fail_fast: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Updated,
    Created,
    Skipped,
    Failed,
}

/// Outcome of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub task: SyncTask,
    pub status: SyncStatus,
    /// Failure message, verbatim from the failing component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Why a task was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_ref: Option<String>,
    pub is_new: bool,
}

impl SyncResult {
    fn written(task: &SyncTask, resolved_ref: String, is_new: bool) -> Self {
        Self {
            task: task.clone(),
            status: if is_new {
                SyncStatus::Created
            } else {
                SyncStatus::Updated
            },
            error: None,
            reason: None,
            resolved_ref: Some(resolved_ref),
            is_new,
        }
    }

    fn skipped(task: &SyncTask, reason: impl Into<String>, resolved_ref: Option<String>) -> Self {
        Self {
            task: task.clone(),
            status: SyncStatus::Skipped,
            error: None,
            reason: Some(reason.into()),
            resolved_ref,
            is_new: false,
        }
    }

    fn failed(task: &SyncTask, error: impl Into<String>, resolved_ref: Option<String>) -> Self {
        Self {
            task: task.clone(),
            status: SyncStatus::Failed,
            error: Some(error.into()),
            reason: None,
            resolved_ref,
            is_new: false,
        }
    }
}

/// All results of a run, partitioned by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub updated: Vec<SyncResult>,
    pub created: Vec<SyncResult>,
    pub skipped: Vec<SyncResult>,
    pub failed: Vec<SyncResult>,
    pub total: usize,
    pub has_changes: bool,
    pub all_failed: bool,
}

impl SyncSummary {
    pub fn from_results(results: Vec<SyncResult>) -> Self {
        let total = results.len();
        let mut summary = Self {
            total,
            ..Self::default()
        };

        for result in results {
            match result.status {
                SyncStatus::Updated => summary.updated.push(result),
                SyncStatus::Created => summary.created.push(result),
                SyncStatus::Skipped => summary.skipped.push(result),
                SyncStatus::Failed => summary.failed.push(result),
            }
        }

        summary.has_changes = summary.updated.len() + summary.created.len() > 0;
        summary.all_failed = total > 0 && summary.failed.len() == total;
        summary
    }
}

/// Sync every task in order and summarize the outcome.
///
/// Tasks run one at a time. Per-task failures are recorded, never returned;
/// with `fail_fast` the run stops right after the first failure and the
/// remaining tasks do not appear in the summary.
pub async fn run(
    tasks: &[SyncTask],
    source: &dyn FileSource,
    fs: &dyn LocalFs,
    options: &SyncOptions,
) -> SyncSummary {
    let mut results = Vec::with_capacity(tasks.len());
    info!(source = source.source_id(), tasks = tasks.len(), "starting sync");

    for (index, task) in tasks.iter().enumerate() {
        let result = sync_task(task, source, fs, options).await;
        let failed = result.status == SyncStatus::Failed;
        results.push(result);

        if failed && options.fail_fast {
            let remaining = tasks.len() - index - 1;
            if remaining > 0 {
                warn!(remaining, "stopping after first failure");
            }
            break;
        }
    }

    SyncSummary::from_results(results)
}

async fn sync_task(
    task: &SyncTask,
    source: &dyn FileSource,
    fs: &dyn LocalFs,
    options: &SyncOptions,
) -> SyncResult {
    let credential = task
        .credential
        .as_deref()
        .or(options.default_credential.as_deref());
    let location = source.describe(task);

    let exists = match fs.exists(&task.local_path).await {
        Ok(exists) => exists,
        Err(e) => {
            warn!(path = %task.local_path, error = %e, "local check failed");
            return SyncResult::failed(task, e.to_string(), None);
        }
    };

    if !exists && !options.create_missing {
        debug!(path = %task.local_path, "missing locally, not creating");
        return SyncResult::skipped(
            task,
            format!(
                "{} does not exist locally and creating missing files is disabled",
                task.local_path
            ),
            None,
        );
    }

    let fetched = match source.fetch(task, credential).await {
        Ok(fetched) => fetched,
        Err(e) => {
            warn!(
                source_id = source.source_id(),
                source = %location,
                error = %e,
                "fetch failed"
            );
            return SyncResult::failed(task, e.to_string(), None);
        }
    };

    let local = if exists {
        match fs.read_to_string(&task.local_path).await {
            Ok(local) => local,
            Err(e) => {
                warn!(path = %task.local_path, error = %e, "local read failed");
                return SyncResult::failed(task, e.to_string(), Some(fetched.resolved_ref));
            }
        }
    } else {
        None
    };

    if local.as_deref() == Some(fetched.content.as_str()) {
        debug!(path = %task.local_path, "unchanged");
        return SyncResult::skipped(task, "content unchanged", Some(fetched.resolved_ref));
    }

    if let Err(e) = fs.write(&task.local_path, &fetched.content).await {
        warn!(path = %task.local_path, error = %e, "write failed");
        return SyncResult::failed(task, e.to_string(), Some(fetched.resolved_ref));
    }

    let is_new = local.is_none();
    info!(
        path = %task.local_path,
        source = %location,
        git_ref = %fetched.resolved_ref,
        created = is_new,
        "synced"
    );
    SyncResult::written(task, fetched.resolved_ref, is_new)
}

/// Outcome of [`sync_sources`].
#[derive(Debug, Clone, Serialize)]
pub struct SyncRun {
    pub summary: SyncSummary,
    pub feedback: Vec<Feedback>,
}

/// Validate, normalize, expand and sync a full configuration.
///
/// Only configuration problems are returned as errors, and they are
/// reported before any file is fetched or written.
pub async fn sync_sources(
    sources: &[SourceSpec],
    source: &dyn FileSource,
    fs: &dyn LocalFs,
    options: &SyncOptions,
) -> Result<SyncRun, ConfigError> {
    let (tasks, mut feedback) = plan(sources, source, options).await?;
    let summary = run(&tasks, source, fs, options).await;

    let not_attempted = tasks.len() - summary.total;
    if not_attempted > 0 {
        feedback.push(Feedback::info(format!(
            "stopped after the first failure; {not_attempted} file(s) not attempted"
        )));
    }

    Ok(SyncRun { summary, feedback })
}

/// The tasks a run would execute, after glob expansion.
pub async fn plan(
    sources: &[SourceSpec],
    source: &dyn FileSource,
    options: &SyncOptions,
) -> Result<(Vec<SyncTask>, Vec<Feedback>), ConfigError> {
    validate_sources(sources)?;

    let tasks = normalize(sources);
    debug!(tasks = tasks.len(), "normalized configuration");

    Ok(expand_tasks(tasks, source, options.default_credential.as_deref()).await)
}
