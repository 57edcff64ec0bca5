use std::sync::Arc;

use chrono::{DateTime, Utc};
use repo_sync::{
    Backend, ChangeData, CommitMessageTemplater, CommitOptions, CommitType, FileChange,
    RepositoryContext, Service, SyncError, User,
};
use repo_sync_gitea::GiteaBackend;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> GiteaBackend {
    let repository = RepositoryContext {
        service: Service::Gitea,
        owner: "acme".into(),
        repo: "site".into(),
        branch: Some("main".into()),
        base_url: server.uri(),
        database_name: None,
    };
    let user = User {
        login: "jane".into(),
        name: "Jane Doe".into(),
        email: "jane@example.com".into(),
    };
    GiteaBackend::new(repository, None, user)
}

async fn mount_commit(server: &MockServer, response: Value) {
    Mock::given(method("POST"))
        .and(path("/repos/acme/site/contents"))
        .respond_with(ResponseTemplate::new(201).set_body_json(response))
        .expect(1)
        .mount(server)
        .await;
}

async fn sent_payload(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "exactly one commit request");
    requests[0].body_json().unwrap()
}

#[tokio::test]
async fn delete_with_null_result() {
    let server = MockServer::start().await;
    mount_commit(
        &server,
        json!({
            "commit": { "sha": "c1", "created": "2024-01-01T00:00:00Z" },
            "files": [null]
        }),
    )
    .await;

    let results = backend_for(&server)
        .commit_changes(
            &[FileChange::delete("x.md", "s")],
            &CommitOptions::new(CommitType::Delete),
        )
        .await
        .unwrap();

    assert_eq!(results.sha, "c1");
    assert_eq!(
        results.date,
        "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
    );
    assert_eq!(results.files.len(), 1);
    assert_eq!(results.files["x.md"].sha, "");

    let payload = sent_payload(&server).await;
    assert_eq!(payload["branch"], "main");
    assert_eq!(payload["message"], "Delete x.md");
    assert_eq!(payload["files"][0]["operation"], "delete");
    assert_eq!(payload["files"][0]["path"], "x.md");
    assert_eq!(payload["files"][0]["sha"], "s");
    assert_eq!(payload["files"][0]["content"], "");
}

#[tokio::test]
async fn move_is_sent_as_update_from_previous_path() {
    let server = MockServer::start().await;
    mount_commit(
        &server,
        json!({
            "commit": { "sha": "c2", "created": "2024-02-02T10:00:00+02:00" },
            "files": [{ "path": "content/new.md", "sha": "n1" }]
        }),
    )
    .await;

    let results = backend_for(&server)
        .commit_changes(
            &[FileChange::rename(
                "content/old.md",
                "content/new.md",
                "o1",
                Some(ChangeData::Text("moved".into())),
            )],
            &CommitOptions::new(CommitType::Update),
        )
        .await
        .unwrap();

    assert_eq!(results.files["content/new.md"].sha, "n1");
    assert_eq!(
        results.date,
        "2024-02-02T08:00:00Z".parse::<DateTime<Utc>>().unwrap()
    );

    let payload = sent_payload(&server).await;
    let file = &payload["files"][0];
    assert_eq!(file["operation"], "update");
    assert_eq!(file["from_path"], "content/old.md");
    assert_eq!(file["path"], "content/new.md");
    assert_eq!(file["sha"], "o1");
    assert_eq!(file["content"], "bW92ZWQ=");
}

#[tokio::test]
async fn identity_and_timestamps_are_shared() {
    let server = MockServer::start().await;
    mount_commit(
        &server,
        json!({
            "commit": { "sha": "c3", "created": "2024-01-01T00:00:00Z" },
            "files": [{ "path": "a.md", "sha": "a1" }, { "path": "b.md", "sha": "b1" }]
        }),
    )
    .await;

    let options = CommitOptions {
        commit_type: CommitType::Create,
        summary: Some("Add two posts".into()),
    };
    backend_for(&server)
        .commit_changes(
            &[
                FileChange::create("a.md", ChangeData::Text("a".into())),
                FileChange::create("b.md", ChangeData::Text("b".into())),
            ],
            &options,
        )
        .await
        .unwrap();

    let payload = sent_payload(&server).await;
    assert_eq!(payload["author"], payload["committer"]);
    assert_eq!(payload["author"]["name"], "Jane Doe");
    assert_eq!(payload["author"]["email"], "jane@example.com");
    assert_eq!(payload["dates"]["author"], payload["dates"]["committer"]);
    assert!(payload["dates"]["author"].as_str().unwrap().ends_with('Z'));
    assert_eq!(payload["message"], "Add two posts");
    assert_eq!(payload["files"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn rejected_commit_propagates_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repos/acme/site/contents"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({ "message": "sha does not match" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = backend_for(&server)
        .commit_changes(
            &[FileChange::update("a.md", "stale", ChangeData::Text("x".into()))],
            &CommitOptions::new(CommitType::Update),
        )
        .await;

    match result {
        Err(SyncError::Api { status, message }) => {
            assert_eq!(status, 409);
            assert_eq!(message, "sha does not match");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn incomplete_changes_are_rejected_before_any_request() {
    let server = MockServer::start().await;

    let mut no_from = FileChange::rename("content/old.md", "content/new.md", "o1", None);
    no_from.previous_path = None;
    let mut no_sha = FileChange::update("a.md", "s", ChangeData::Text("x".into()));
    no_sha.previous_sha = None;
    let mut delete_no_sha = FileChange::delete("b.md", "s");
    delete_no_sha.previous_sha = None;

    let backend = backend_for(&server);
    for change in [no_from, no_sha, delete_no_sha] {
        let result = backend
            .commit_changes(&[change], &CommitOptions::new(CommitType::Update))
            .await;
        assert!(
            matches!(result, Err(SyncError::InvalidChange { .. })),
            "got {result:?}"
        );
    }

    assert!(server.received_requests().await.unwrap().is_empty());
}

struct Fixed;

impl CommitMessageTemplater for Fixed {
    fn create_commit_message(&self, changes: &[FileChange], _options: &CommitOptions) -> String {
        format!("cms: {} file(s)", changes.len())
    }
}

#[tokio::test]
async fn custom_templater_writes_the_message() {
    let server = MockServer::start().await;
    mount_commit(
        &server,
        json!({
            "commit": { "sha": "c4", "created": "2024-01-01T00:00:00Z" },
            "files": [{ "path": "a.md", "sha": "a1" }]
        }),
    )
    .await;

    backend_for(&server)
        .with_templater(Arc::new(Fixed))
        .commit_changes(
            &[FileChange::create("a.md", ChangeData::Text("a".into()))],
            &CommitOptions::new(CommitType::Create),
        )
        .await
        .unwrap();

    let payload = sent_payload(&server).await;
    assert_eq!(payload["message"], "cms: 1 file(s)");
}
