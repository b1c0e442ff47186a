use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::repository::RepositoryId;

/// One remote repository and the files to pull from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceSpec {
    /// `owner/name` of the remote repository.
    pub repository: String,

    /// Branch, tag or commit. `None` means the remote's default branch.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,

    /// Per-source credential; never read from or written to config files.
    #[serde(skip)]
    pub credential: Option<String>,

    /// Paths that are identical locally and remotely. May be glob patterns.
    #[serde(default, rename = "files", skip_serializing_if = "Vec::is_empty")]
    pub identity_files: Vec<String>,

    /// Explicit local/remote mappings. Always a single concrete file.
    #[serde(default, rename = "paths", skip_serializing_if = "Vec::is_empty")]
    pub path_pairs: Vec<PathPair>,
}

/// An explicit mapping from a remote path onto a local one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PathPair {
    #[serde(rename = "local")]
    pub local_path: String,

    /// Defaults to `local_path` when omitted.
    #[serde(default, rename = "remote", skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
}

impl SourceSpec {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Self::default()
        }
    }

    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Add an identity file (or pattern).
    pub fn file(mut self, path: impl Into<String>) -> Self {
        self.identity_files.push(path.into());
        self
    }

    /// Add a path pair whose remote side is `remote`, or the local path when `None`.
    pub fn pair(mut self, local: impl Into<String>, remote: Option<&str>) -> Self {
        self.path_pairs.push(PathPair {
            local_path: local.into(),
            remote_path: remote.map(|r| r.to_owned()),
        });
        self
    }

    /// Check the invariants the engine relies on. `index` is the position of
    /// this source in the configuration and is only used in messages.
    pub fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let repository = self.repository.clone();

        if RepositoryId::parse(&self.repository).is_err() {
            return Err(ConfigError::InvalidRepository { index, repository });
        }

        if self.identity_files.is_empty() && self.path_pairs.is_empty() {
            return Err(ConfigError::NoFiles { index, repository });
        }

        for file in &self.identity_files {
            check_local_path(index, &repository, file)?;
        }

        for pair in &self.path_pairs {
            check_local_path(index, &repository, &pair.local_path)?;

            let remote = pair.remote_path.as_deref().unwrap_or(&pair.local_path);
            if remote.trim().is_empty() {
                return Err(ConfigError::EmptyPath { index, repository });
            }
        }

        Ok(())
    }
}

fn check_local_path(index: usize, repository: &str, path: &str) -> Result<(), ConfigError> {
    if path.trim().is_empty() {
        return Err(ConfigError::EmptyPath {
            index,
            repository: repository.to_owned(),
        });
    }

    let escapes = Path::new(path).components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });

    if escapes {
        return Err(ConfigError::PathEscapesRoot {
            index,
            repository: repository.to_owned(),
            path: path.to_owned(),
        });
    }

    Ok(())
}

/// Validate every source, stopping at the first problem.
pub fn validate_sources(sources: &[SourceSpec]) -> Result<(), ConfigError> {
    sources
        .iter()
        .enumerate()
        .try_for_each(|(index, source)| source.validate(index))
}

/// A configuration problem. Always fatal to the run and reported before any
/// file is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("sources[{index}]: invalid repository '{repository}': expected 'owner/name'")]
    InvalidRepository { index: usize, repository: String },

    #[error("sources[{index}] ({repository}): no files listed under 'files' or 'paths'")]
    NoFiles { index: usize, repository: String },

    #[error("sources[{index}] ({repository}): empty path entry")]
    EmptyPath { index: usize, repository: String },

    #[error(
        "sources[{index}] ({repository}): local path '{path}' must be relative and stay inside the working tree"
    )]
    PathEscapesRoot {
        index: usize,
        repository: String,
        path: String,
    },
}
