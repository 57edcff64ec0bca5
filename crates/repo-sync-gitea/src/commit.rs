use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use repo_sync::{
    ChangeAction, CommitMessageTemplater, CommitOptions, CommitResults, CommittedFile, FileChange,
    SyncError, User, encode_base64,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Author/committer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitDates {
    pub author: String,
    pub committer: String,
}

/// One element of the `files` array in a change-files request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeFileOperation {
    pub operation: &'static str,
    pub path: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// Request body for `POST /repos/{owner}/{repo}/contents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeFilesOptions {
    pub branch: String,
    pub author: Identity,
    pub committer: Identity,
    pub dates: CommitDates,
    pub message: String,
    pub files: Vec<ChangeFileOperation>,
}

/// Response from `POST /repos/{owner}/{repo}/contents`.
#[derive(Debug, Deserialize)]
pub struct FilesResponse {
    pub commit: CommitMeta,
    #[serde(default)]
    pub files: Vec<Option<FileEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct CommitMeta {
    pub sha: String,
    pub created: String,
}

#[derive(Debug, Deserialize)]
pub struct FileEntry {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub sha: Option<String>,
}

fn operation_for(action: ChangeAction) -> &'static str {
    match action {
        ChangeAction::Create => "create",
        ChangeAction::Update | ChangeAction::Move => "update",
        ChangeAction::Delete => "delete",
    }
}

/// Translate a change-set into a single change-files request.
///
/// Moves become updates with `from_path`. Every operation carries base64
/// content, empty when the change has none. Author and committer share
/// one timestamp taken from `now`.
pub fn build_payload(
    changes: &[FileChange],
    options: &CommitOptions,
    user: &User,
    branch: &str,
    templater: &dyn CommitMessageTemplater,
    now: DateTime<Utc>,
) -> ChangeFilesOptions {
    let identity = Identity {
        name: user.name.clone(),
        email: user.email.clone(),
    };
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    let files = changes
        .iter()
        .map(|change| ChangeFileOperation {
            operation: operation_for(change.action),
            path: change.path.clone(),
            content: encode_base64(change.data_bytes()),
            from_path: match change.action {
                ChangeAction::Move => change.previous_path.clone(),
                _ => None,
            },
            sha: change.previous_sha.clone(),
        })
        .collect();

    ChangeFilesOptions {
        branch: branch.to_owned(),
        author: identity.clone(),
        committer: identity,
        dates: CommitDates {
            author: timestamp.clone(),
            committer: timestamp,
        },
        message: templater.create_commit_message(changes, options),
        files,
    }
}

/// Map the commit response back onto the requested paths.
///
/// Response entries are matched to request entries by position. A `null`
/// or missing entry still yields the requested path with an empty sha.
pub fn map_response(
    payload: &ChangeFilesOptions,
    response: FilesResponse,
) -> Result<CommitResults, SyncError> {
    let date = DateTime::parse_from_rfc3339(&response.commit.created)
        .map_err(|e| {
            SyncError::Parse(format!(
                "invalid commit date {:?}: {e}",
                response.commit.created
            ))
        })?
        .with_timezone(&Utc);

    let mut returned = response.files.into_iter();
    let mut files = HashMap::with_capacity(payload.files.len());

    for operation in &payload.files {
        let entry = returned.next().flatten();

        if let Some(echoed) = entry.as_ref().and_then(|e| e.path.as_deref())
            && echoed != operation.path
        {
            warn!(
                requested = %operation.path,
                returned = %echoed,
                "commit response is out of order; keying by request path"
            );
        }

        let sha = entry.and_then(|e| e.sha).unwrap_or_default();
        files.insert(operation.path.clone(), CommittedFile { sha });
    }

    Ok(CommitResults {
        sha: response.commit.sha,
        date,
        files,
    })
}

#[cfg(test)]
mod tests {
    use repo_sync::{ChangeData, CommitType, DefaultCommitMessages};

    use super::*;

    fn user() -> User {
        User {
            login: "jane".into(),
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
        }
    }

    fn payload_for(changes: &[FileChange]) -> ChangeFilesOptions {
        build_payload(
            changes,
            &CommitOptions::new(CommitType::Update),
            &user(),
            "main",
            &DefaultCommitMessages,
            DateTime::parse_from_rfc3339("2024-05-06T07:08:09Z")
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    #[test]
    fn move_becomes_update_with_from_path() {
        let changes = vec![FileChange::rename(
            "content/old.md",
            "content/new.md",
            "abc",
            Some(ChangeData::Text("body".into())),
        )];
        let payload = payload_for(&changes);

        assert_eq!(payload.files[0].operation, "update");
        assert_eq!(payload.files[0].path, "content/new.md");
        assert_eq!(payload.files[0].from_path.as_deref(), Some("content/old.md"));
        assert_eq!(payload.files[0].sha.as_deref(), Some("abc"));
    }

    #[test]
    fn delete_sends_empty_content() {
        let payload = payload_for(&[FileChange::delete("x.md", "s")]);

        assert_eq!(payload.files[0].operation, "delete");
        assert_eq!(payload.files[0].content, "");
        assert!(payload.files[0].from_path.is_none());
    }

    #[test]
    fn create_and_update_encode_content() {
        let payload = payload_for(&[
            FileChange::create("a.md", ChangeData::Text("hello".into())),
            FileChange::update("b.png", "old", ChangeData::Binary(vec![0, 159, 146, 150])),
        ]);

        assert_eq!(payload.files[0].operation, "create");
        assert_eq!(payload.files[0].content, "aGVsbG8=");
        assert!(payload.files[0].sha.is_none());
        assert_eq!(payload.files[1].operation, "update");
        assert_eq!(payload.files[1].content, "AJ+Slg==");
    }

    #[test]
    fn identity_and_dates_are_shared() {
        let payload = payload_for(&[FileChange::delete("x.md", "s")]);

        assert_eq!(payload.author, payload.committer);
        assert_eq!(payload.author.name, "Jane Doe");
        assert_eq!(payload.dates.author, "2024-05-06T07:08:09.000Z");
        assert_eq!(payload.dates.author, payload.dates.committer);
        assert_eq!(payload.branch, "main");
        assert_eq!(payload.message, "Update x.md");
    }

    #[test]
    fn serialized_payload_omits_absent_fields() {
        let payload = payload_for(&[FileChange::create("a.md", ChangeData::Text("x".into()))]);
        let json = serde_json::to_value(&payload).unwrap();
        let file = &json["files"][0];

        assert!(file.get("from_path").is_none());
        assert!(file.get("sha").is_none());
        assert_eq!(file["operation"], "create");
    }

    #[test]
    fn null_entry_maps_to_empty_sha() {
        let payload = payload_for(&[FileChange::delete("x.md", "s")]);
        let response: FilesResponse = serde_json::from_str(
            r#"{"commit":{"sha":"c1","created":"2024-01-01T00:00:00Z"},"files":[null]}"#,
        )
        .unwrap();

        let results = map_response(&payload, response).unwrap();

        assert_eq!(results.sha, "c1");
        assert_eq!(results.date.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(results.files.len(), 1);
        assert_eq!(results.files["x.md"].sha, "");
    }

    #[test]
    fn short_response_still_covers_every_request_path() {
        let payload = payload_for(&[
            FileChange::create("a.md", ChangeData::Text("a".into())),
            FileChange::delete("b.md", "s"),
        ]);
        let response: FilesResponse = serde_json::from_str(
            r#"{"commit":{"sha":"c2","created":"2024-01-01T00:00:00Z"},"files":[{"path":"a.md","sha":"new-a"}]}"#,
        )
        .unwrap();

        let results = map_response(&payload, response).unwrap();

        assert_eq!(results.files["a.md"].sha, "new-a");
        assert_eq!(results.files["b.md"].sha, "");
    }

    #[test]
    fn results_are_keyed_by_request_path() {
        let payload = payload_for(&[FileChange::create("a.md", ChangeData::Text("a".into()))]);
        let response: FilesResponse = serde_json::from_str(
            r#"{"commit":{"sha":"c3","created":"2024-01-01T00:00:00Z"},"files":[{"path":"other.md","sha":"s1"}]}"#,
        )
        .unwrap();

        let results = map_response(&payload, response).unwrap();

        assert_eq!(results.files["a.md"].sha, "s1");
        assert!(!results.files.contains_key("other.md"));
    }

    #[test]
    fn invalid_date_is_a_parse_error() {
        let payload = payload_for(&[FileChange::delete("x.md", "s")]);
        let response: FilesResponse = serde_json::from_str(
            r#"{"commit":{"sha":"c1","created":"yesterday"},"files":[null]}"#,
        )
        .unwrap();

        assert!(matches!(map_response(&payload, response), Err(SyncError::Parse(_))));
    }
}
