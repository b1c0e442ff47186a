use std::sync::Arc;

use crate::task::SyncTask;

/// Errors that can occur while resolving a task against a remote source.
///
/// These are always scoped to a single task: the orchestrator records them
/// as failed results and never lets them escape a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("invalid repository '{0}': expected 'owner/name'")]
    InvalidRepository(String),

    #[error("repository {0} not found")]
    RepositoryNotFound(String),

    #[error("ref '{git_ref}' not found in {repository}")]
    RefNotFound { repository: String, git_ref: String },

    #[error("file {path} not found in {repository}")]
    NotFound { repository: String, path: String },

    #[error("{path} in {repository} is a directory, not a file")]
    IsDirectory { repository: String, path: String },

    #[error("{path} in {repository} has no content")]
    EmptyContent { repository: String, path: String },

    #[error(
        "credential rejected for {repository} ({detail}): check that the token is valid and has read access to the repository"
    )]
    Unauthorized { repository: String, detail: String },

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// True for the "nothing at this name" family of errors, which the ref
    /// fallback chain is allowed to move past.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RepositoryNotFound(_) | Self::RefNotFound { .. } | Self::NotFound { .. }
        )
    }
}

/// Remote content for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    pub content: String,
    /// The concrete ref used, e.g. the default branch when the task had none.
    pub resolved_ref: String,
    /// Content identifier reported by the remote (a blob SHA for git hosts).
    pub sha: Option<String>,
}

/// Files (never directories) present in a repository at some ref.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListing {
    pub paths: Vec<String>,
    pub resolved_ref: String,
    /// The remote cut the listing short; matches may be incomplete.
    pub truncated: bool,
}

/// A place files can be pulled from.
///
/// The orchestrator and the glob expander only ever talk to this trait, so
/// backends other than hosted git repositories can be slotted in later.
#[async_trait::async_trait]
pub trait FileSource: Send + Sync {
    /// Stable identifier for this backend, used in logs.
    fn source_id(&self) -> &str;

    /// Human-readable location of a task's remote file.
    fn describe(&self, task: &SyncTask) -> String {
        match &task.git_ref {
            Some(git_ref) => format!("{}:{}@{}", task.repository, task.remote_path, git_ref),
            None => format!("{}:{}", task.repository, task.remote_path),
        }
    }

    /// Fetch the remote content for a task using the given credential.
    async fn fetch(
        &self,
        task: &SyncTask,
        credential: Option<&str>,
    ) -> Result<FetchedContent, SourceError>;

    /// List every file in `repository` at `git_ref` (or the default branch).
    async fn list_files(
        &self,
        repository: &str,
        git_ref: Option<&str>,
        credential: Option<&str>,
    ) -> Result<FileListing, SourceError>;
}

#[async_trait::async_trait]
impl<T: FileSource + ?Sized> FileSource for Arc<T> {
    fn source_id(&self) -> &str {
        (**self).source_id()
    }

    fn describe(&self, task: &SyncTask) -> String {
        (**self).describe(task)
    }

    async fn fetch(
        &self,
        task: &SyncTask,
        credential: Option<&str>,
    ) -> Result<FetchedContent, SourceError> {
        (**self).fetch(task, credential).await
    }

    async fn list_files(
        &self,
        repository: &str,
        git_ref: Option<&str>,
        credential: Option<&str>,
    ) -> Result<FileListing, SourceError> {
        (**self).list_files(repository, git_ref, credential).await
    }
}
