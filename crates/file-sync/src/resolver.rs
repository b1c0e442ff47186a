use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::remote::{EntryKind, RefKind, RemoteFile, RemoteRepository};
use crate::repository::RepositoryId;
use crate::source::{FetchedContent, FileListing, FileSource, SourceError};
use crate::task::SyncTask;

/// Default branch per repository, filled on first use.
///
/// Entries are never invalidated automatically: a default branch renamed
/// mid-run is not picked up until [`DefaultBranchCache::clear`] is called.
#[derive(Debug, Default)]
pub struct DefaultBranchCache {
    branches: Mutex<HashMap<RepositoryId, String>>,
}

impl DefaultBranchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, repo: &RepositoryId) -> Option<String> {
        self.lock().get(repo).cloned()
    }

    pub fn insert(&self, repo: &RepositoryId, branch: impl Into<String>) {
        self.lock().insert(repo.clone(), branch.into());
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RepositoryId, String>> {
        // The map holds plain strings, so a poisoned lock still has usable data.
        self.branches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// How a user-supplied ref string should be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefSpec<'a> {
    Branch(&'a str),
    Tag(&'a str),
    /// Try branch, then tag, then treat as a commit id.
    Ambiguous(&'a str),
}

impl<'a> RefSpec<'a> {
    fn parse(raw: &'a str) -> Self {
        if let Some(branch) = raw.strip_prefix("refs/heads/") {
            Self::Branch(branch)
        } else if let Some(tag) = raw.strip_prefix("refs/tags/") {
            Self::Tag(tag)
        } else {
            Self::Ambiguous(raw)
        }
    }
}

/// Resolves tasks against a hosted git repository.
///
/// Owns the default-branch cache; create one per run (or per test) to keep
/// runs isolated while still sharing lookups between tasks of the same run.
pub struct RepositorySource<R> {
    remote: R,
    cache: DefaultBranchCache,
    id: String,
}

impl<R: RemoteRepository> RepositorySource<R> {
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            cache: DefaultBranchCache::new(),
            id: "repository".into(),
        }
    }

    /// Override the identifier reported by [`FileSource::source_id`].
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn cache(&self) -> &DefaultBranchCache {
        &self.cache
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Default branch of `repo`, served from the cache after the first lookup.
    pub async fn default_branch(
        &self,
        repo: &RepositoryId,
        credential: Option<&str>,
    ) -> Result<String, SourceError> {
        if let Some(branch) = self.cache.get(repo) {
            return Ok(branch);
        }

        let branch = self.remote.default_branch(repo, credential).await?;
        debug!(repository = %repo, branch = %branch, "resolved default branch");
        self.cache.insert(repo, branch.clone());
        Ok(branch)
    }

    /// The ref to read from: the given one, or the default branch.
    async fn effective_ref(
        &self,
        repo: &RepositoryId,
        git_ref: Option<&str>,
        credential: Option<&str>,
    ) -> Result<String, SourceError> {
        match git_ref {
            Some(git_ref) => Ok(git_ref.to_owned()),
            None => self.default_branch(repo, credential).await,
        }
    }

    /// Fetch one file. Fails on directories and on files without content.
    pub async fn fetch_file(
        &self,
        repository: &str,
        path: &str,
        git_ref: Option<&str>,
        credential: Option<&str>,
    ) -> Result<FetchedContent, SourceError> {
        let repo = RepositoryId::parse(repository)?;
        let resolved_ref = self.effective_ref(&repo, git_ref, credential).await?;

        match self.remote.file(&repo, path, &resolved_ref, credential).await? {
            RemoteFile::Directory => Err(SourceError::IsDirectory {
                repository: repo.to_string(),
                path: path.to_owned(),
            }),
            RemoteFile::File { content, sha } => match content {
                Some(content) if !content.is_empty() => Ok(FetchedContent {
                    content,
                    resolved_ref,
                    sha,
                }),
                _ => Err(SourceError::EmptyContent {
                    repository: repo.to_string(),
                    path: path.to_owned(),
                }),
            },
        }
    }

    /// Resolve a ref to something the tree endpoint accepts.
    ///
    /// Unqualified names go through branch, tag, then raw commit id; each
    /// step runs only when the previous one reported "not found".
    pub async fn resolve_tree_ish(
        &self,
        repo: &RepositoryId,
        git_ref: Option<&str>,
        credential: Option<&str>,
    ) -> Result<String, SourceError> {
        let Some(git_ref) = git_ref else {
            let branch = self.default_branch(repo, credential).await?;
            return self
                .remote
                .resolve_ref(repo, RefKind::Branch, &branch, credential)
                .await;
        };

        match RefSpec::parse(git_ref) {
            RefSpec::Branch(name) => {
                self.remote
                    .resolve_ref(repo, RefKind::Branch, name, credential)
                    .await
            }
            RefSpec::Tag(name) => {
                self.remote
                    .resolve_ref(repo, RefKind::Tag, name, credential)
                    .await
            }
            RefSpec::Ambiguous(name) => {
                for kind in [RefKind::Branch, RefKind::Tag] {
                    match self.remote.resolve_ref(repo, kind, name, credential).await {
                        Ok(sha) => return Ok(sha),
                        Err(e) if e.is_not_found() => {
                            debug!(repository = %repo, git_ref = name, %kind, "ref lookup missed");
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(name.to_owned())
            }
        }
    }

    /// Every blob in the repository at the given ref, in tree order.
    pub async fn list_blobs(
        &self,
        repository: &str,
        git_ref: Option<&str>,
        credential: Option<&str>,
    ) -> Result<FileListing, SourceError> {
        let repo = RepositoryId::parse(repository)?;
        let resolved_ref = self.effective_ref(&repo, git_ref, credential).await?;
        let tree_ish = self
            .resolve_tree_ish(&repo, Some(&resolved_ref), credential)
            .await?;
        let tree = self.remote.tree(&repo, &tree_ish, credential).await?;

        Ok(FileListing {
            paths: tree
                .entries
                .into_iter()
                .filter(|entry| entry.kind == EntryKind::Blob)
                .map(|entry| entry.path)
                .collect(),
            resolved_ref,
            truncated: tree.truncated,
        })
    }
}

#[async_trait::async_trait]
impl<R: RemoteRepository> FileSource for RepositorySource<R> {
    fn source_id(&self) -> &str {
        &self.id
    }

    async fn fetch(
        &self,
        task: &SyncTask,
        credential: Option<&str>,
    ) -> Result<FetchedContent, SourceError> {
        self.fetch_file(
            &task.repository,
            &task.remote_path,
            task.git_ref.as_deref(),
            credential,
        )
        .await
    }

    async fn list_files(
        &self,
        repository: &str,
        git_ref: Option<&str>,
        credential: Option<&str>,
    ) -> Result<FileListing, SourceError> {
        self.list_blobs(repository, git_ref, credential).await
    }
}
