//! Wildcard expansion of identity files against a remote tree.
//!
//! Supported syntax: `*` (within one path segment), `**` (across segments,
//! as a whole segment), `?`, `[...]` classes and `{a,b}` alternation, which
//! may be nested.

use std::collections::HashMap;

use ::glob::{MatchOptions, Pattern, PatternError};
use tracing::{debug, warn};

use crate::feedback::Feedback;
use crate::source::{FileListing, FileSource, SourceError};
use crate::task::{SyncTask, TaskOrigin};

const PATTERN_CHARS: [char; 6] = ['*', '?', '[', ']', '{', '}'];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// True if `path` contains any wildcard metacharacter.
pub fn is_pattern(path: &str) -> bool {
    path.contains(PATTERN_CHARS)
}

/// A compiled pattern. Brace alternatives compile to one glob each.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    patterns: Vec<Pattern>,
}

impl GlobMatcher {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let patterns = expand_braces(pattern)
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(path, MATCH_OPTIONS))
    }

    /// Matching paths, sorted ascending and deduplicated.
    pub fn filter<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut matched: Vec<String> = paths
            .into_iter()
            .filter(|path| self.is_match(path))
            .map(|path| path.to_owned())
            .collect();
        matched.sort();
        matched.dedup();
        matched
    }
}

/// List the files in `repository` at `git_ref` that match `pattern`.
///
/// Zero matches is not an error. Directories never match.
pub async fn expand(
    source: &dyn FileSource,
    repository: &str,
    pattern: &str,
    git_ref: Option<&str>,
    credential: Option<&str>,
) -> Result<Vec<String>, SourceError> {
    let matcher = GlobMatcher::new(pattern)
        .map_err(|e| SourceError::Other(format!("invalid glob pattern '{pattern}': {e}")))?;
    let listing = source.list_files(repository, git_ref, credential).await?;

    if listing.truncated {
        warn!(repository, git_ref = %listing.resolved_ref, "tree listing truncated");
    }

    Ok(matcher.filter(listing.paths.iter().map(String::as_str)))
}

/// Replace every identity-file task whose path is a pattern with one task
/// per matching remote file.
///
/// A pattern that matches nothing, fails to compile, or whose tree cannot
/// be listed is passed through unchanged; fetching it later fails through
/// the ordinary not-found path, so there is a single failure route.
pub async fn expand_tasks(
    tasks: Vec<SyncTask>,
    source: &dyn FileSource,
    default_credential: Option<&str>,
) -> (Vec<SyncTask>, Vec<Feedback>) {
    let mut expanded = Vec::with_capacity(tasks.len());
    let mut feedback = Vec::new();
    let mut listings: HashMap<(String, Option<String>), FileListing> = HashMap::new();

    for task in tasks {
        if task.origin != TaskOrigin::IdentityFile || !is_pattern(&task.remote_path) {
            expanded.push(task);
            continue;
        }

        let matcher = match GlobMatcher::new(&task.remote_path) {
            Ok(matcher) => matcher,
            Err(e) => {
                feedback.push(Feedback::warning(format!(
                    "invalid glob pattern '{}': {e}",
                    task.remote_path
                )));
                expanded.push(task);
                continue;
            }
        };

        let key = (task.repository.clone(), task.git_ref.clone());
        if !listings.contains_key(&key) {
            let credential = task.credential.as_deref().or(default_credential);
            match source
                .list_files(&task.repository, task.git_ref.as_deref(), credential)
                .await
            {
                Ok(listing) => {
                    if listing.truncated {
                        feedback.push(Feedback::warning(format!(
                            "file listing for {}@{} was truncated; pattern matches may be incomplete",
                            task.repository, listing.resolved_ref
                        )));
                    }
                    listings.insert(key.clone(), listing);
                }
                Err(e) => {
                    feedback.push(Feedback::warning(format!(
                        "could not list files in {} for '{}': {e}",
                        task.repository, task.remote_path
                    )));
                    expanded.push(task);
                    continue;
                }
            }
        }

        let Some(listing) = listings.get(&key) else {
            expanded.push(task);
            continue;
        };

        let matches = matcher.filter(listing.paths.iter().map(String::as_str));
        debug!(
            repository = %task.repository,
            pattern = %task.remote_path,
            matches = matches.len(),
            "expanded pattern"
        );

        if matches.is_empty() {
            feedback.push(Feedback::warning(format!(
                "pattern '{}' matched no files in {}",
                task.remote_path, task.repository
            )));
            expanded.push(task);
        } else {
            expanded.extend(matches.iter().map(|path| task.with_path(path)));
        }
    }

    (expanded, feedback)
}

/// Expand `{a,b}` groups into one pattern per alternative.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some((open, close)) = find_brace_group(pattern) else {
        return vec![pattern.to_owned()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];

    split_alternatives(&pattern[open + 1..close])
        .into_iter()
        .flat_map(|alt| expand_braces(&format!("{prefix}{alt}{suffix}")))
        .collect()
}

/// Byte offsets of the first outermost `{...}` group containing a top-level
/// comma. Groups without a comma are literal text.
fn find_brace_group(pattern: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut open = 0usize;

    for (i, c) in pattern.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    open = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 && split_alternatives(&pattern[open + 1..i]).len() > 1 {
                    return Some((open, i));
                }
            }
            _ => {}
        }
    }

    None
}

fn split_alternatives(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    parts.push(&body[start..]);
    parts
}
