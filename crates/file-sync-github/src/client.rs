use base64::Engine;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use file_sync::{
    EntryKind, RefKind, RemoteFile, RemoteRepository, RemoteTree, RepositoryId, SourceError,
    TreeEntry,
};

use crate::content::{ContentResponse, ContentsResponse};
use crate::refs::{RefResponse, RepoResponse, TagResponse};
use crate::tree::TreeResponse;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "file-sync";

/// Annotated tags can point at other tags; stop following after this many.
const MAX_TAG_DEPTH: usize = 5;

/// GitHub REST implementation of [`RemoteRepository`].
///
/// Credentials are supplied per call, so one client serves every source of a
/// run regardless of which token each source uses.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_base_url: Option<String>,
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new(None)
    }
}

impl GitHubClient {
    /// `api_base_url` overrides `https://api.github.com` (GitHub Enterprise, tests).
    pub fn new(api_base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base_url,
        }
    }

    fn api_base(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    /// `{api_base}/repos/{owner}/{repo}/{segments...}` with each segment encoded.
    fn repo_url<'a>(
        &self,
        repo: &RepositoryId,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, SourceError> {
        let mut url = Url::parse(self.api_base())
            .map_err(|e| SourceError::Other(format!("invalid API base URL: {e}")))?;

        url.path_segments_mut()
            .map_err(|_| SourceError::Other("API base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["repos", repo.owner(), repo.name()])
            .extend(segments);

        Ok(url)
    }

    fn build_request(&self, url: Url, credential: Option<&str>) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json");

        if let Some(token) = credential {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        req
    }

    /// Send a GET and decode the JSON body, mapping HTTP failures onto
    /// [`SourceError`]. `not_found` builds the error used for a 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        repo: &RepositoryId,
        url: Url,
        credential: Option<&str>,
        not_found: impl FnOnce() -> SourceError,
    ) -> Result<T, SourceError> {
        debug!(%url, "GET");

        let response = self
            .build_request(url, credential)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(not_found());
        }

        if !status.is_success() {
            let rate_limit_exhausted = response
                .headers()
                .get("x-ratelimit-remaining")
                .is_some_and(|v| v.as_bytes() == b"0");
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".into());
            return Err(classify_failure(repo, status, rate_limit_exhausted, &body));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }

    async fn dereference_tag(
        &self,
        repo: &RepositoryId,
        name: &str,
        mut sha: String,
        credential: Option<&str>,
    ) -> Result<String, SourceError> {
        for _ in 0..MAX_TAG_DEPTH {
            let url = self.repo_url(repo, ["git", "tags", sha.as_str()])?;
            let tag: TagResponse = self
                .get_json(repo, url, credential, || SourceError::RefNotFound {
                    repository: repo.to_string(),
                    git_ref: name.to_owned(),
                })
                .await?;

            if tag.object.object_type != "tag" {
                return Ok(tag.object.sha);
            }
            sha = tag.object.sha;
        }

        Err(SourceError::Parse(format!(
            "tag '{name}' in {repo} nests more than {MAX_TAG_DEPTH} levels deep"
        )))
    }
}

fn classify_failure(
    repo: &RepositoryId,
    status: StatusCode,
    rate_limit_exhausted: bool,
    body: &str,
) -> SourceError {
    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (rate_limit_exhausted || body.to_lowercase().contains("rate limit")));

    if rate_limited {
        return SourceError::RateLimited(format!("HTTP {status}: {body}"));
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Unauthorized {
            repository: repo.to_string(),
            detail: format!("HTTP {status}"),
        },
        _ => SourceError::Network(format!("HTTP {status}: {body}")),
    }
}

fn decode_content(response: &ContentResponse) -> Result<Option<String>, SourceError> {
    let Some(encoded) = response.content.as_deref() else {
        return Ok(None);
    };

    match response.encoding.as_deref() {
        Some("base64") => {}
        // Files over 1 MB come back with encoding "none" and no payload.
        Some("none") => return Ok(None),
        None => return Ok(Some(encoded.to_owned())),
        Some(other) => {
            return Err(SourceError::Parse(format!(
                "unsupported content encoding '{other}' for {}",
                response.path
            )));
        }
    }

    // GitHub returns base64 with newlines embedded
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .map_err(|e| SourceError::Parse(format!("base64 decode failed: {e}")))?;

    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| SourceError::Parse(format!("{} is not valid UTF-8: {e}", response.path)))
}

fn entry_kind(entry_type: &str) -> Option<EntryKind> {
    match entry_type {
        "blob" => Some(EntryKind::Blob),
        "tree" => Some(EntryKind::Tree),
        "commit" => Some(EntryKind::Commit),
        _ => None,
    }
}

#[async_trait::async_trait]
impl RemoteRepository for GitHubClient {
    async fn file(
        &self,
        repo: &RepositoryId,
        path: &str,
        git_ref: &str,
        credential: Option<&str>,
    ) -> Result<RemoteFile, SourceError> {
        let mut url = self.repo_url(
            repo,
            std::iter::once("contents").chain(path.split('/').filter(|s| !s.is_empty())),
        )?;
        url.query_pairs_mut().append_pair("ref", git_ref);

        let response: ContentsResponse = self
            .get_json(repo, url, credential, || SourceError::NotFound {
                repository: repo.to_string(),
                path: path.to_owned(),
            })
            .await?;

        match response {
            ContentsResponse::Directory(_) => Ok(RemoteFile::Directory),
            ContentsResponse::Item(item) if item.content_type == "dir" => Ok(RemoteFile::Directory),
            ContentsResponse::Item(item) => Ok(RemoteFile::File {
                content: decode_content(&item)?,
                sha: item.sha,
            }),
        }
    }

    async fn default_branch(
        &self,
        repo: &RepositoryId,
        credential: Option<&str>,
    ) -> Result<String, SourceError> {
        let url = self.repo_url(repo, std::iter::empty())?;
        let response: RepoResponse = self
            .get_json(repo, url, credential, || {
                SourceError::RepositoryNotFound(repo.to_string())
            })
            .await?;

        Ok(response.default_branch)
    }

    async fn resolve_ref(
        &self,
        repo: &RepositoryId,
        kind: RefKind,
        name: &str,
        credential: Option<&str>,
    ) -> Result<String, SourceError> {
        let namespace = match kind {
            RefKind::Branch => "heads",
            RefKind::Tag => "tags",
        };
        let url = self.repo_url(
            repo,
            ["git", "ref", namespace].into_iter().chain(name.split('/')),
        )?;

        let response: RefResponse = self
            .get_json(repo, url, credential, || SourceError::RefNotFound {
                repository: repo.to_string(),
                git_ref: name.to_owned(),
            })
            .await?;

        debug!(repository = %repo, git_ref = %response.name, sha = %response.object.sha, "resolved ref");

        if response.object.object_type == "tag" {
            return self
                .dereference_tag(repo, name, response.object.sha, credential)
                .await;
        }

        Ok(response.object.sha)
    }

    async fn tree(
        &self,
        repo: &RepositoryId,
        tree_ish: &str,
        credential: Option<&str>,
    ) -> Result<RemoteTree, SourceError> {
        let mut url = self.repo_url(repo, ["git", "trees", tree_ish])?;
        url.query_pairs_mut().append_pair("recursive", "1");

        let response: TreeResponse = self
            .get_json(repo, url, credential, || SourceError::RefNotFound {
                repository: repo.to_string(),
                git_ref: tree_ish.to_owned(),
            })
            .await?;

        if response.truncated {
            warn!(
                repository = %repo,
                sha = %response.sha,
                "tree response was truncated; results may be incomplete"
            );
        }

        Ok(RemoteTree {
            entries: response
                .tree
                .into_iter()
                .filter_map(|entry| {
                    Some(TreeEntry {
                        kind: entry_kind(&entry.entry_type)?,
                        path: entry.path,
                    })
                })
                .collect(),
            truncated: response.truncated,
        })
    }
}
