//! Metadata heuristics for README documents without (complete) front-matter.

use std::sync::LazyLock;

use regex::Regex;

use super::FrontMatter;
use crate::models::{Difficulty, TutorialMetadata};

static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("valid regex"));

/// Derive tutorial metadata from a README.
///
/// Front-matter wins where present. Otherwise the title comes from the first
/// level-1 heading and the description from the first prose line. Never fails:
/// unparseable front-matter is ignored.
pub fn extract_metadata_from_readme(content: &str, repository_name: &str) -> TutorialMetadata {
    let (front_matter, body) = match FrontMatter::split(content) {
        Ok(split) => split,
        Err(e) => {
            tracing::debug!("Ignoring malformed README front-matter: {}", e);
            (
                FrontMatter::default(),
                super::frontmatter::strip_front_matter(content),
            )
        }
    };

    let title = front_matter
        .string("title")
        .filter(|title| !title.is_empty())
        .or_else(|| {
            H1_RE
                .captures(body)
                .map(|caps| caps[1].trim().to_string())
        })
        .unwrap_or_else(|| repository_name.to_string());

    let description = front_matter
        .string("description")
        .filter(|description| !description.is_empty())
        .or_else(|| first_prose_line(body))
        .unwrap_or_default();

    TutorialMetadata {
        title,
        description,
        author: front_matter.string("author"),
        tags: front_matter.string_list("tags"),
        difficulty: Difficulty::parse_or_default(front_matter.string("difficulty").as_deref()),
        estimated_time: front_matter.string("estimatedTime"),
        prerequisites: front_matter.string_list("prerequisites"),
        last_updated: front_matter.string("lastUpdated"),
        formatted_last_updated: None,
    }
}

/// First non-empty line that is neither a heading nor a code fence delimiter.
fn first_prose_line(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("```"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_and_first_paragraph() {
        let readme = "# Widget\n\nA tiny widget library.\n\nMore text.";
        let metadata = extract_metadata_from_readme(readme, "widget-repo");
        assert_eq!(metadata.title, "Widget");
        assert_eq!(metadata.description, "A tiny widget library.");
        assert_eq!(metadata.difficulty, Difficulty::Intermediate);
        assert!(metadata.tags.is_empty());
    }

    #[test]
    fn test_front_matter_wins() {
        let readme = "---\ntitle: From FM\ndescription: FM desc\ndifficulty: beginner\ntags: [a]\n---\n# Heading\n\nProse";
        let metadata = extract_metadata_from_readme(readme, "repo");
        assert_eq!(metadata.title, "From FM");
        assert_eq!(metadata.description, "FM desc");
        assert_eq!(metadata.difficulty, Difficulty::Beginner);
        assert_eq!(metadata.tags, vec!["a"]);
    }

    #[test]
    fn test_falls_back_to_repository_name() {
        let metadata = extract_metadata_from_readme("## Only a subheading", "widget");
        assert_eq!(metadata.title, "widget");
        assert_eq!(metadata.description, "");
    }

    #[test]
    fn test_malformed_front_matter_is_ignored() {
        let readme = "---\ntitle: [oops\n---\n# Real Title\n\nBody";
        let metadata = extract_metadata_from_readme(readme, "repo");
        assert_eq!(metadata.title, "Real Title");
        assert_eq!(metadata.description, "Body");
    }

    #[test]
    fn test_only_fence_delimiters_are_skipped() {
        let readme = "# Widget\n\n```sh\ncargo add widget\n```\n\nA tiny widget library.\n";
        let metadata = extract_metadata_from_readme(readme, "widget");
        assert_eq!(metadata.description, "cargo add widget");
    }

    #[test]
    fn test_empty_front_matter_values_fall_through() {
        let readme = "---\ntitle: \"\"\ndescription: \"\"\n---\n# Real\n\nProse line";
        let metadata = extract_metadata_from_readme(readme, "repo");
        assert_eq!(metadata.title, "Real");
        assert_eq!(metadata.description, "Prose line");

        let metadata = extract_metadata_from_readme("---\ntitle: \"\"\n---\n", "repo");
        assert_eq!(metadata.title, "repo");
    }
}
