use crate::change::{CommitOptions, CommitType, FileChange};

/// Produces commit messages for change-sets.
pub trait CommitMessageTemplater: Send + Sync {
    fn create_commit_message(&self, changes: &[FileChange], options: &CommitOptions) -> String;
}

/// Default English templates, one per [`CommitType`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCommitMessages;

impl CommitMessageTemplater for DefaultCommitMessages {
    fn create_commit_message(&self, changes: &[FileChange], options: &CommitOptions) -> String {
        if let Some(summary) = options.summary.as_deref().map(str::trim)
            && !summary.is_empty()
        {
            return summary.to_owned();
        }

        let verb = match options.commit_type {
            CommitType::Create => "Create",
            CommitType::Update => "Update",
            CommitType::Delete => "Delete",
            CommitType::UploadMedia => "Upload",
            CommitType::DeleteMedia => "Delete",
        };

        match changes {
            [] => format!("{verb} files"),
            [only] => format!("{verb} {}", only.path),
            [first, rest @ ..] => format!("{verb} {} (+{} more)", first.path, rest.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::change::ChangeData;

    use super::*;

    #[test]
    fn single_change_names_the_path() {
        let changes = vec![FileChange::create(
            "content/posts/hello.md",
            ChangeData::Text("hi".into()),
        )];
        let message = DefaultCommitMessages
            .create_commit_message(&changes, &CommitOptions::new(CommitType::Create));
        assert_eq!(message, "Create content/posts/hello.md");
    }

    #[test]
    fn multiple_changes_count_the_rest() {
        let changes = vec![
            FileChange::create("static/a.png", ChangeData::Binary(vec![1])),
            FileChange::create("static/b.png", ChangeData::Binary(vec![2])),
            FileChange::create("static/c.png", ChangeData::Binary(vec![3])),
        ];
        let message = DefaultCommitMessages
            .create_commit_message(&changes, &CommitOptions::new(CommitType::UploadMedia));
        assert_eq!(message, "Upload static/a.png (+2 more)");
    }

    #[test]
    fn summary_replaces_template() {
        let changes = vec![FileChange::delete("x.md", "s")];
        let options = CommitOptions {
            commit_type: CommitType::Delete,
            summary: Some("  Remove draft  ".into()),
        };
        assert_eq!(
            DefaultCommitMessages.create_commit_message(&changes, &options),
            "Remove draft"
        );
    }

    #[test]
    fn blank_summary_falls_back_to_template() {
        let changes = vec![FileChange::delete("x.md", "s")];
        let options = CommitOptions {
            commit_type: CommitType::Delete,
            summary: Some("   ".into()),
        };
        assert_eq!(
            DefaultCommitMessages.create_commit_message(&changes, &options),
            "Delete x.md"
        );
    }
}
