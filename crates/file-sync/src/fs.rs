use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Errors from the local working tree. A missing file is not an error.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The local side of a sync: task paths are relative to some working tree.
#[async_trait::async_trait]
pub trait LocalFs: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool, FsError>;

    /// Read a file as text. `Ok(None)` when the file does not exist. Bytes
    /// that are not UTF-8 are replaced, so such a file compares unequal to
    /// any remote text instead of failing.
    async fn read_to_string(&self, path: &str) -> Result<Option<String>, FsError>;

    /// Write a file, creating parent directories as needed.
    async fn write(&self, path: &str, content: &str) -> Result<(), FsError>;
}

/// The real filesystem, rooted at a working directory.
#[derive(Debug, Clone)]
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait::async_trait]
impl LocalFs for DiskFs {
    async fn exists(&self, path: &str) -> Result<bool, FsError> {
        let full = self.resolve(path);
        tokio::fs::try_exists(&full)
            .await
            .map_err(|source| FsError::Read { path: full, source })
    }

    async fn read_to_string(&self, path: &str) -> Result<Option<String>, FsError> {
        let full = self.resolve(path);
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(FsError::Read { path: full, source }),
        }
    }

    async fn write(&self, path: &str, content: &str) -> Result<(), FsError> {
        let full = self.resolve(path);

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| FsError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&full, content)
            .await
            .map_err(|source| FsError::Write { path: full, source })
    }
}
