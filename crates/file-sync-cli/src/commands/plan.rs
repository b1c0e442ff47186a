use anyhow::Result;
use file_sync::{FileSource, SourceSpec, SyncOptions, SyncTask};

use super::format::{print_feedback, render_plan};

/// Resolve and print the tasks a sync would run, without writing anything.
pub async fn run(
    specs: &[SourceSpec],
    source: &dyn FileSource,
    options: &SyncOptions,
    json: bool,
) -> Result<Vec<SyncTask>> {
    let (tasks, feedback) = file_sync::plan(specs, source, options).await?;

    print_feedback(&feedback);

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
    } else {
        print!("{}", render_plan(&tasks));
    }

    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use file_sync::test_support::InMemoryRepository;
    use file_sync::{RepositorySource, TreeEntry};

    use super::*;

    #[tokio::test]
    async fn plan_expands_patterns_without_fetching_files() {
        let mut remote = InMemoryRepository::new();
        remote.add_repository("octo/templates", "main");
        remote.add_branch("octo/templates", "main", "c1");
        remote.add_tree(
            "octo/templates",
            "c1",
            vec![
                TreeEntry::blob("docs/a.md"),
                TreeEntry::blob("docs/b.md"),
                TreeEntry::blob("docs/c.txt"),
            ],
        );
        let source = RepositorySource::new(remote);
        let specs = vec![SourceSpec::new("octo/templates").file("docs/*.md")];

        let tasks = run(&specs, &source, &SyncOptions::default(), true)
            .await
            .unwrap();

        let paths: Vec<&str> = tasks.iter().map(|t| t.local_path.as_str()).collect();
        assert_eq!(paths, vec!["docs/a.md", "docs/b.md"]);
        assert_eq!(source.remote().file_calls(), 0);
    }
}
