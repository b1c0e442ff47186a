use std::fmt;
use std::sync::Arc;

use crate::repository::RepositoryId;
use crate::source::SourceError;

/// What the contents endpoint found at a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteFile {
    File {
        /// Decoded text, `None` when the remote returned no payload.
        content: Option<String>,
        sha: Option<String>,
    },
    Directory,
}

/// Kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Blob,
    Tree,
    /// Submodule pointer.
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Blob,
        }
    }

    pub fn tree(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Tree,
        }
    }
}

/// A recursive tree listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteTree {
    pub entries: Vec<TreeEntry>,
    pub truncated: bool,
}

/// Namespace a ref name is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Branch,
    Tag,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch => write!(f, "branch"),
            Self::Tag => write!(f, "tag"),
        }
    }
}

/// Transport-level access to a hosted git repository.
///
/// Implementations map remote failures onto [`SourceError`], keeping
/// not-found and authorization failures distinct from everything else.
#[async_trait::async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Read a single path at a concrete ref.
    async fn file(
        &self,
        repo: &RepositoryId,
        path: &str,
        git_ref: &str,
        credential: Option<&str>,
    ) -> Result<RemoteFile, SourceError>;

    /// Name of the repository's default branch.
    async fn default_branch(
        &self,
        repo: &RepositoryId,
        credential: Option<&str>,
    ) -> Result<String, SourceError>;

    /// Resolve a branch or tag name to the commit it points at.
    async fn resolve_ref(
        &self,
        repo: &RepositoryId,
        kind: RefKind,
        name: &str,
        credential: Option<&str>,
    ) -> Result<String, SourceError>;

    /// Recursive listing of the tree behind a commit or tree SHA.
    async fn tree(
        &self,
        repo: &RepositoryId,
        tree_ish: &str,
        credential: Option<&str>,
    ) -> Result<RemoteTree, SourceError>;
}

#[async_trait::async_trait]
impl<T: RemoteRepository + ?Sized> RemoteRepository for Arc<T> {
    async fn file(
        &self,
        repo: &RepositoryId,
        path: &str,
        git_ref: &str,
        credential: Option<&str>,
    ) -> Result<RemoteFile, SourceError> {
        (**self).file(repo, path, git_ref, credential).await
    }

    async fn default_branch(
        &self,
        repo: &RepositoryId,
        credential: Option<&str>,
    ) -> Result<String, SourceError> {
        (**self).default_branch(repo, credential).await
    }

    async fn resolve_ref(
        &self,
        repo: &RepositoryId,
        kind: RefKind,
        name: &str,
        credential: Option<&str>,
    ) -> Result<String, SourceError> {
        (**self).resolve_ref(repo, kind, name, credential).await
    }

    async fn tree(
        &self,
        repo: &RepositoryId,
        tree_ish: &str,
        credential: Option<&str>,
    ) -> Result<RemoteTree, SourceError> {
        (**self).tree(repo, tree_ish, credential).await
    }
}
