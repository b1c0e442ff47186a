use base64::Engine;
use file_sync::test_support::InMemoryFs;
use file_sync::{DiskFs, RepositorySource, SourceSpec, SyncOptions, SyncStatus, sync_sources};
use file_sync_github::GitHubClient;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn file_body(path: &str, content: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "file",
        "path": path,
        "sha": format!("sha-{path}"),
        "encoding": "base64",
        "content": base64::engine::general_purpose::STANDARD.encode(content),
    })
}

async fn mount_file(server: &MockServer, repo: &str, git_ref: &str, file: &str, content: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{repo}/contents/{file}")))
        .and(query_param("ref", git_ref))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_body(file, content)))
        .mount(server)
        .await;
}

async fn mount_templates_repo(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/repos/octo/templates"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "default_branch": "main" })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/templates/git/ref/heads/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ref": "refs/heads/main",
            "object": { "sha": "c1", "type": "commit" }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/templates/git/trees/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sha": "c1",
            "tree": [
                { "path": ".github/ISSUE_TEMPLATE/bug_report.md", "type": "blob" },
                { "path": ".github/ISSUE_TEMPLATE/feature_request.md", "type": "blob" },
                { "path": "LICENSE", "type": "blob" }
            ]
        })))
        .mount(server)
        .await;

    mount_file(server, "octo/templates", "main", ".github/ISSUE_TEMPLATE/bug_report.md", "bug v2").await;
    mount_file(server, "octo/templates", "main", ".github/ISSUE_TEMPLATE/feature_request.md", "feature").await;
    mount_file(server, "octo/templates", "main", "LICENSE", "MIT").await;
}

#[tokio::test]
async fn sync_writes_created_and_updated_files_to_disk() {
    let server = MockServer::start().await;
    mount_templates_repo(&server).await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".github/ISSUE_TEMPLATE")).unwrap();
    std::fs::write(dir.path().join(".github/ISSUE_TEMPLATE/bug_report.md"), "bug v1").unwrap();
    std::fs::write(dir.path().join("LICENSE"), "MIT").unwrap();

    let specs = vec![
        SourceSpec::new("octo/templates")
            .file(".github/ISSUE_TEMPLATE/*.md")
            .file("LICENSE"),
    ];
    let source = RepositorySource::new(GitHubClient::new(Some(server.uri())));
    let fs = DiskFs::new(dir.path());

    let run = sync_sources(&specs, &source, &fs, &SyncOptions::default())
        .await
        .unwrap();
    let summary = run.summary;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.updated[0].task.local_path, ".github/ISSUE_TEMPLATE/bug_report.md");
    assert_eq!(
        summary.created[0].task.local_path,
        ".github/ISSUE_TEMPLATE/feature_request.md"
    );
    assert_eq!(summary.skipped[0].task.local_path, "LICENSE");
    assert!(summary.has_changes);

    let bug = std::fs::read_to_string(dir.path().join(".github/ISSUE_TEMPLATE/bug_report.md")).unwrap();
    assert_eq!(bug, "bug v2");
    let feature =
        std::fs::read_to_string(dir.path().join(".github/ISSUE_TEMPLATE/feature_request.md"))
            .unwrap();
    assert_eq!(feature, "feature");
}

#[tokio::test]
async fn per_source_credential_reaches_the_remote() {
    let server = MockServer::start().await;
    mount_templates_repo(&server).await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/private/contents/SECURITY.md"))
        .and(query_param("ref", "v3"))
        .and(header("Authorization", "Bearer private-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_body("SECURITY.md", "report here")))
        .expect(1)
        .mount(&server)
        .await;

    let specs = vec![
        SourceSpec::new("octo/templates").pair("COPYING", Some("LICENSE")),
        SourceSpec::new("octo/private")
            .with_ref("v3")
            .with_credential("private-token")
            .pair("SECURITY.md", None),
    ];
    let source = RepositorySource::new(GitHubClient::new(Some(server.uri())));
    let fs = InMemoryFs::new();
    let options = SyncOptions {
        default_credential: Some("public-token".into()),
        ..SyncOptions::default()
    };

    let run = sync_sources(&specs, &source, &fs, &options).await.unwrap();

    assert_eq!(run.summary.created.len(), 2);
    assert_eq!(fs.get("COPYING").as_deref(), Some("MIT"));
    assert_eq!(fs.get("SECURITY.md").as_deref(), Some("report here"));
    assert_eq!(run.summary.created[1].resolved_ref.as_deref(), Some("v3"));
}

#[tokio::test]
async fn rejected_token_fails_the_task_with_a_credential_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/private/contents/SECURITY.md"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let specs = vec![
        SourceSpec::new("octo/private")
            .with_ref("main")
            .pair("SECURITY.md", None),
    ];
    let source = RepositorySource::new(GitHubClient::new(Some(server.uri())));
    let fs = InMemoryFs::new();
    let options = SyncOptions {
        default_credential: Some("revoked".into()),
        ..SyncOptions::default()
    };

    let run = sync_sources(&specs, &source, &fs, &options).await.unwrap();

    assert!(run.summary.all_failed);
    let failed = &run.summary.failed[0];
    assert_eq!(failed.status, SyncStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("credential rejected"));
    assert_eq!(fs.write_count(), 0);
}
