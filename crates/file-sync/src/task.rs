use serde::Serialize;

use crate::config::SourceSpec;

/// Which list of a [`SourceSpec`] a task came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOrigin {
    /// From `files`; the path may be a glob pattern.
    IdentityFile,
    /// From `paths`; always names one concrete file.
    PathPair,
}

/// One concrete file operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncTask {
    pub local_path: String,
    pub remote_path: String,
    pub repository: String,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(skip)]
    pub credential: Option<String>,
    pub origin: TaskOrigin,
}

impl SyncTask {
    fn from_source(source: &SourceSpec, local: &str, remote: &str, origin: TaskOrigin) -> Self {
        Self {
            local_path: local.to_owned(),
            remote_path: remote.to_owned(),
            repository: source.repository.clone(),
            git_ref: source.git_ref.clone(),
            credential: source.credential.clone(),
            origin,
        }
    }

    /// A copy of this task pointed at a concrete path, used for glob matches.
    pub fn with_path(&self, path: &str) -> Self {
        Self {
            local_path: path.to_owned(),
            remote_path: path.to_owned(),
            ..self.clone()
        }
    }
}

/// Flatten sources into tasks.
///
/// Sources keep their listed order; within a source identity files come
/// before path pairs. Fetches, logs and summaries all follow this order.
pub fn normalize(sources: &[SourceSpec]) -> Vec<SyncTask> {
    sources
        .iter()
        .flat_map(|source| {
            let identity = source.identity_files.iter().map(move |path| {
                SyncTask::from_source(source, path, path, TaskOrigin::IdentityFile)
            });

            let pairs = source.path_pairs.iter().map(move |pair| {
                let remote = pair.remote_path.as_deref().unwrap_or(&pair.local_path);
                SyncTask::from_source(source, &pair.local_path, remote, TaskOrigin::PathPair)
            });

            identity.chain(pairs)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_source_and_entry_order() {
        let sources = vec![
            SourceSpec::new("org/a").file("a").file("b"),
            SourceSpec::new("org/b").pair("x", Some("y")),
        ];

        let tasks = normalize(&sources);
        let locals: Vec<&str> = tasks.iter().map(|t| t.local_path.as_str()).collect();

        assert_eq!(locals, vec!["a", "b", "x"]);
        assert_eq!(tasks[2].remote_path, "y");
        assert_eq!(tasks[2].repository, "org/b");
    }

    #[test]
    fn identity_files_come_before_pairs_within_a_source() {
        let mut source = SourceSpec::new("org/a").pair("pair.md", None);
        source.identity_files.push("identity.md".into());

        let tasks = normalize(&[source]);

        assert_eq!(tasks[0].local_path, "identity.md");
        assert_eq!(tasks[0].origin, TaskOrigin::IdentityFile);
        assert_eq!(tasks[1].local_path, "pair.md");
        assert_eq!(tasks[1].origin, TaskOrigin::PathPair);
    }

    #[test]
    fn pair_without_remote_uses_local_path() {
        let tasks = normalize(&[SourceSpec::new("org/a").pair(".editorconfig", None)]);
        assert_eq!(tasks[0].remote_path, tasks[0].local_path);
    }

    #[test]
    fn identity_file_maps_to_itself() {
        let tasks = normalize(&[SourceSpec::new("org/a").file("LICENSE")]);
        assert_eq!(tasks[0].local_path, "LICENSE");
        assert_eq!(tasks[0].remote_path, "LICENSE");
    }

    #[test]
    fn carries_ref_and_credential_from_source() {
        let tasks = normalize(&[
            SourceSpec::new("org/a")
                .with_ref("v1")
                .with_credential("tok")
                .file("f"),
            SourceSpec::new("org/b").file("g"),
        ]);

        assert_eq!(tasks[0].git_ref.as_deref(), Some("v1"));
        assert_eq!(tasks[0].credential.as_deref(), Some("tok"));
        assert_eq!(tasks[1].git_ref, None);
        assert_eq!(tasks[1].credential, None);
    }

    #[test]
    fn empty_input_yields_no_tasks() {
        assert!(normalize(&[]).is_empty());
    }
}
