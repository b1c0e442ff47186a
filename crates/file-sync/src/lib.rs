pub mod config;
pub mod feedback;
pub mod fs;
pub mod glob;
pub mod remote;
pub mod repository;
pub mod resolver;
pub mod source;
pub mod sync;
pub mod task;

pub use config::{ConfigError, PathPair, SourceSpec, validate_sources};
pub use feedback::Feedback;
pub use fs::{DiskFs, FsError, LocalFs};
pub use crate::glob::{GlobMatcher, expand, expand_tasks, is_pattern};
pub use remote::{EntryKind, RefKind, RemoteFile, RemoteRepository, RemoteTree, TreeEntry};
pub use repository::RepositoryId;
pub use resolver::{DefaultBranchCache, RepositorySource};
pub use source::{FetchedContent, FileListing, FileSource, SourceError};
pub use sync::{
    SyncOptions, SyncResult, SyncRun, SyncStatus, SyncSummary, plan, run, sync_sources,
};
pub use task::{SyncTask, TaskOrigin, normalize};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
