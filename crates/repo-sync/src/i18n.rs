/// Localization store used to build human-readable error causes.
pub trait Translator: Send + Sync {
    /// Look up `key` and substitute `{name}` placeholders from `values`.
    /// Unknown keys are returned unchanged.
    fn translate(&self, key: &str, values: &[(&str, &str)]) -> String;
}

/// Built-in English strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishStrings;

impl EnglishStrings {
    fn template(key: &str) -> Option<&'static str> {
        let template = match key {
            "branch_not_found" => "Branch “{branch}” was not found in repository {repo}.",
            "repository_not_found" => "Repository {repo} was not found or is not accessible.",
            "no_write_permission" => "You do not have write access to repository {repo}.",
            "unsupported_version" => {
                "{service} {version} is not supported. Version {minimum} or later is required."
            }
            "version_unavailable" => "The server version of {service} could not be determined.",
            "unexpected_response" => "The server returned an unexpected response: {detail}",
            "directory_unavailable" => "The local directory for {repo} is not available.",
            _ => return None,
        };
        Some(template)
    }
}

impl Translator for EnglishStrings {
    fn translate(&self, key: &str, values: &[(&str, &str)]) -> String {
        let Some(template) = Self::template(key) else {
            return key.to_owned();
        };

        values
            .iter()
            .fold(template.to_owned(), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_placeholders() {
        let text = EnglishStrings.translate(
            "branch_not_found",
            &[("branch", "main"), ("repo", "acme/site")],
        );
        assert_eq!(text, "Branch “main” was not found in repository acme/site.");
    }

    #[test]
    fn unknown_key_is_returned_verbatim() {
        assert_eq!(EnglishStrings.translate("no_such_key", &[]), "no_such_key");
    }

    #[test]
    fn missing_values_leave_placeholders() {
        let text = EnglishStrings.translate("repository_not_found", &[]);
        assert!(text.contains("{repo}"));
    }
}
