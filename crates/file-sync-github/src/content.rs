use serde::Deserialize;

/// Response from GitHub's Contents API.
/// `GET /repos/{owner}/{repo}/contents/{path}?ref={ref}`
///
/// A file comes back as a single object, a directory as an array of entries.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ContentsResponse {
    Directory(Vec<DirectoryEntry>),
    Item(ContentResponse),
}

#[derive(Debug, Deserialize)]
pub struct ContentResponse {
    #[serde(rename = "type")]
    pub content_type: String,
    pub path: String,
    pub sha: Option<String>,
    pub content: Option<String>,
    pub encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DirectoryEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
}
