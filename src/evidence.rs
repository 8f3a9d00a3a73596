use crate::models::Evidence;
use tracing::debug;

/// Collaborator services signal failure in-band with this prefix
pub const ERROR_SENTINEL: &str = "Error:";

/// READMEs are capped before prompting to bound prompt size
const README_CHAR_LIMIT: usize = 4000;

/// Build clean judge evidence from raw collaborator output.
///
/// Collaborator stages report failure as either `None` or an
/// `"Error:"`-prefixed string; both become `None` here so that an error
/// marker is never embedded in an LLM prompt as if it were content.
/// Pure transform, always returns a value.
pub fn assemble(
    description: &str,
    transcript: Option<String>,
    readme: Option<String>,
    commit_count: Option<u64>,
    repo_url: Option<String>,
) -> Evidence {
    Evidence {
        description: description.to_string(),
        transcript: sanitize(transcript),
        readme: sanitize(readme).map(truncate_readme),
        commit_count,
        repo_url,
    }
}

/// Drop error sentinels and empty strings
fn sanitize(field: Option<String>) -> Option<String> {
    match field {
        Some(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else if trimmed.starts_with(ERROR_SENTINEL) {
                debug!(sentinel = %trimmed, "Dropping collaborator error sentinel from evidence");
                None
            } else {
                Some(text)
            }
        }
        None => None,
    }
}

fn truncate_readme(readme: String) -> String {
    if readme.chars().count() <= README_CHAR_LIMIT {
        return readme;
    }
    debug!("Truncating README to {} characters", README_CHAR_LIMIT);
    readme.chars().take(README_CHAR_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_clean_inputs() {
        let evidence = assemble(
            "A chatbot",
            Some("We built a chatbot over the weekend".to_string()),
            Some("# Chatbot\nInstall with cargo".to_string()),
            Some(42),
            Some("https://github.com/a/b".to_string()),
        );

        assert_eq!(evidence.description, "A chatbot");
        assert!(evidence.transcript.unwrap().contains("weekend"));
        assert!(evidence.readme.unwrap().starts_with("# Chatbot"));
        assert_eq!(evidence.commit_count, Some(42));
        assert_eq!(evidence.repo_url.as_deref(), Some("https://github.com/a/b"));
    }

    #[test]
    fn test_error_sentinel_becomes_none() {
        let evidence = assemble(
            "desc",
            Some("Error: timeout".to_string()),
            Some("Error: README file not found in the root directory.".to_string()),
            None,
            None,
        );

        // Sentinels are scrubbed, never forwarded as prompt content
        assert!(evidence.transcript.is_none());
        assert!(evidence.readme.is_none());
    }

    #[test]
    fn test_error_word_without_sentinel_prefix_is_kept() {
        let evidence = assemble(
            "desc",
            None,
            Some("This tool reports an Error: code on failure".to_string()),
            None,
            None,
        );
        // Only a leading "Error:" marks collaborator failure
        assert!(evidence.readme.is_some());
    }

    #[test]
    fn test_sentinel_with_leading_whitespace() {
        let evidence = assemble("desc", Some("  Error: whisper failed".to_string()), None, None, None);
        assert!(evidence.transcript.is_none());
    }

    #[test]
    fn test_empty_and_blank_strings_become_none() {
        let evidence = assemble("desc", Some("".to_string()), Some("   ".to_string()), None, None);
        assert!(evidence.transcript.is_none());
        assert!(evidence.readme.is_none());
    }

    #[test]
    fn test_missing_inputs_stay_none() {
        let evidence = assemble("desc", None, None, None, None);
        assert!(evidence.transcript.is_none());
        assert!(evidence.readme.is_none());
        assert!(evidence.commit_count.is_none());
        assert!(evidence.repo_url.is_none());
    }

    #[test]
    fn test_readme_is_truncated() {
        let long = "x".repeat(10_000);
        let evidence = assemble("desc", None, Some(long), None, None);
        assert_eq!(evidence.readme.unwrap().chars().count(), 4000);
    }

    #[test]
    fn test_short_readme_untouched() {
        let readme = "short readme".to_string();
        let evidence = assemble("desc", None, Some(readme.clone()), None, None);
        assert_eq!(evidence.readme.unwrap(), readme);
    }
}
