use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::fs::{FsError, LocalFs};
use crate::remote::{RefKind, RemoteFile, RemoteRepository, RemoteTree, TreeEntry};
use crate::repository::RepositoryId;
use crate::source::SourceError;

#[derive(Debug, Default)]
struct RepoFixture {
    default_branch: String,
    files: HashMap<(String, String), RemoteFile>,
    refs: HashMap<(RefKind, String), String>,
    trees: HashMap<String, RemoteTree>,
    required_credential: Option<String>,
}

#[derive(Debug, Default)]
struct CallLog {
    file_calls: usize,
    default_branch_calls: usize,
    credentials: Vec<Option<String>>,
    ref_lookups: Vec<(RefKind, String)>,
}

/// In-memory remote for tests. Records every call so tests can assert on
/// call counts and on the credential each call received.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    repos: HashMap<String, RepoFixture>,
    calls: Mutex<CallLog>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_repository(&mut self, repository: &str, default_branch: &str) {
        self.repos.entry(repository.to_owned()).or_default().default_branch =
            default_branch.to_owned();
    }

    pub fn add_file(&mut self, repository: &str, git_ref: &str, path: &str, content: &str) {
        let sha = format!("sha-{}", content.len());
        self.fixture(repository).files.insert(
            (git_ref.to_owned(), path.to_owned()),
            RemoteFile::File {
                content: Some(content.to_owned()),
                sha: Some(sha),
            },
        );
    }

    pub fn add_directory(&mut self, repository: &str, git_ref: &str, path: &str) {
        self.fixture(repository)
            .files
            .insert((git_ref.to_owned(), path.to_owned()), RemoteFile::Directory);
    }

    pub fn add_branch(&mut self, repository: &str, name: &str, sha: &str) {
        self.fixture(repository)
            .refs
            .insert((RefKind::Branch, name.to_owned()), sha.to_owned());
    }

    pub fn add_tag(&mut self, repository: &str, name: &str, sha: &str) {
        self.fixture(repository)
            .refs
            .insert((RefKind::Tag, name.to_owned()), sha.to_owned());
    }

    pub fn add_tree(&mut self, repository: &str, sha: &str, entries: Vec<TreeEntry>) {
        self.fixture(repository).trees.insert(
            sha.to_owned(),
            RemoteTree {
                entries,
                truncated: false,
            },
        );
    }

    /// Calls against `repository` fail as unauthorized unless they carry `token`.
    pub fn require_credential(&mut self, repository: &str, token: &str) {
        self.fixture(repository).required_credential = Some(token.to_owned());
    }

    pub fn file_calls(&self) -> usize {
        self.log().file_calls
    }

    pub fn default_branch_calls(&self) -> usize {
        self.log().default_branch_calls
    }

    /// Credential passed to every call, in call order.
    pub fn credentials_seen(&self) -> Vec<Option<String>> {
        self.log().credentials.clone()
    }

    pub fn ref_lookups(&self) -> Vec<(RefKind, String)> {
        self.log().ref_lookups.clone()
    }

    fn fixture(&mut self, repository: &str) -> &mut RepoFixture {
        self.repos.entry(repository.to_owned()).or_default()
    }

    fn log(&self) -> std::sync::MutexGuard<'_, CallLog> {
        self.calls.lock().unwrap()
    }

    fn authorize(
        &self,
        repo: &RepositoryId,
        credential: Option<&str>,
    ) -> Result<&RepoFixture, SourceError> {
        self.log().credentials.push(credential.map(|c| c.to_owned()));

        let fixture = self
            .repos
            .get(&repo.to_string())
            .ok_or_else(|| SourceError::RepositoryNotFound(repo.to_string()))?;

        match &fixture.required_credential {
            Some(required) if Some(required.as_str()) != credential => {
                Err(SourceError::Unauthorized {
                    repository: repo.to_string(),
                    detail: "HTTP 401".into(),
                })
            }
            _ => Ok(fixture),
        }
    }
}

#[async_trait::async_trait]
impl RemoteRepository for InMemoryRepository {
    async fn file(
        &self,
        repo: &RepositoryId,
        path: &str,
        git_ref: &str,
        credential: Option<&str>,
    ) -> Result<RemoteFile, SourceError> {
        self.log().file_calls += 1;
        let fixture = self.authorize(repo, credential)?;

        fixture
            .files
            .get(&(git_ref.to_owned(), path.to_owned()))
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                repository: repo.to_string(),
                path: path.to_owned(),
            })
    }

    async fn default_branch(
        &self,
        repo: &RepositoryId,
        credential: Option<&str>,
    ) -> Result<String, SourceError> {
        self.log().default_branch_calls += 1;
        Ok(self.authorize(repo, credential)?.default_branch.clone())
    }

    async fn resolve_ref(
        &self,
        repo: &RepositoryId,
        kind: RefKind,
        name: &str,
        credential: Option<&str>,
    ) -> Result<String, SourceError> {
        self.log().ref_lookups.push((kind, name.to_owned()));
        let fixture = self.authorize(repo, credential)?;

        fixture
            .refs
            .get(&(kind, name.to_owned()))
            .cloned()
            .ok_or_else(|| SourceError::RefNotFound {
                repository: repo.to_string(),
                git_ref: name.to_owned(),
            })
    }

    async fn tree(
        &self,
        repo: &RepositoryId,
        tree_ish: &str,
        credential: Option<&str>,
    ) -> Result<RemoteTree, SourceError> {
        let fixture = self.authorize(repo, credential)?;

        fixture
            .trees
            .get(tree_ish)
            .cloned()
            .ok_or_else(|| SourceError::RefNotFound {
                repository: repo.to_string(),
                git_ref: tree_ish.to_owned(),
            })
    }
}

/// In-memory working tree. Counts writes so tests can prove a write never
/// happened.
#[derive(Debug, Default)]
pub struct InMemoryFs {
    files: Mutex<BTreeMap<String, String>>,
    writes: Mutex<usize>,
    read_only: bool,
}

impl InMemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// A working tree where every write fails with a permission error.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn add(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_owned(), content.to_owned());
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl LocalFs for InMemoryFs {
    async fn exists(&self, path: &str) -> Result<bool, FsError> {
        Ok(self.files.lock().unwrap().contains_key(path))
    }

    async fn read_to_string(&self, path: &str) -> Result<Option<String>, FsError> {
        Ok(self.get(path))
    }

    async fn write(&self, path: &str, content: &str) -> Result<(), FsError> {
        *self.writes.lock().unwrap() += 1;

        if self.read_only {
            return Err(FsError::Write {
                path: path.into(),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only working tree",
                ),
            });
        }

        self.add(path, content);
        Ok(())
    }
}
