use serde::Deserialize;

/// `GET /repos/{owner}/{repo}`; only the fields the client needs.
#[derive(Debug, Deserialize)]
pub struct RepoResponse {
    pub default_branch: String,
}

/// `GET /repos/{owner}/{repo}/git/ref/{heads|tags}/{name}`
#[derive(Debug, Deserialize)]
pub struct RefResponse {
    #[serde(rename = "ref")]
    pub name: String,
    pub object: GitObject,
}

/// `GET /repos/{owner}/{repo}/git/tags/{sha}` for annotated tags.
#[derive(Debug, Deserialize)]
pub struct TagResponse {
    pub object: GitObject,
}

#[derive(Debug, Deserialize)]
pub struct GitObject {
    pub sha: String,
    /// `commit`, `tag` or `tree`.
    #[serde(rename = "type")]
    pub object_type: String,
}
