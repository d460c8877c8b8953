//! Markdown pipeline.
//!
//! `process` runs a tutorial document through, in order:
//!
//! 1. front-matter split,
//! 2. GitHub-flavored markdown parse (comrak),
//! 3. diagram extraction: fenced `mermaid` blocks become raw HTML placeholders,
//! 4. HTML conversion with raw HTML passthrough,
//! 5. syntax highlighting of the remaining fenced blocks (syntect, CSS classes),
//! 6. serialization,
//! 7. `./chapter.md` link rewrite, when a tutorial id is given.

pub mod diagrams;
mod frontmatter;
mod links;
mod naming;
mod readme;

pub use diagrams::{DiagramRenderer, KrokiLoader};
pub use frontmatter::{strip_front_matter, FrontMatter};
pub use links::{chapter_route, rewrite_chapter_links};
pub use naming::{generate_slug, language_from_extension};
pub use readme::extract_metadata_from_readme;

use std::sync::LazyLock;

use comrak::plugins::syntect::SyntectAdapter;
use comrak::{format_html_with_plugins, parse_document, Arena, Options, Plugins};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

/// Characters left alone by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

static HIGHLIGHTER: LazyLock<SyntectAdapter> = LazyLock::new(|| SyntectAdapter::new(None));

/// Percent-encode a path segment or attribute value.
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Any failure inside the pipeline. Deliberately opaque; the cause is logged.
#[derive(Debug, thiserror::Error)]
#[error("markdown processing failed")]
pub struct MarkdownError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl MarkdownError {
    fn failed<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let source = err.into();
        tracing::error!("Error processing markdown: {}", source);
        Self { source }
    }
}

/// Front-matter fields, passed through without validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub tags: Vec<String>,
    pub difficulty: Option<String>,
    pub estimated_time: Option<String>,
    pub prerequisites: Vec<String>,
    pub last_updated: Option<String>,
}

impl MarkdownMetadata {
    fn from_front_matter(front_matter: &FrontMatter) -> Self {
        Self {
            title: front_matter.string("title"),
            description: front_matter.string("description"),
            author: front_matter.string("author"),
            tags: front_matter.string_list("tags"),
            difficulty: front_matter.string("difficulty"),
            estimated_time: front_matter.string("estimatedTime"),
            prerequisites: front_matter.string_list("prerequisites"),
            last_updated: front_matter.string("lastUpdated"),
        }
    }
}

/// Output of [`process`].
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedMarkdown {
    pub html: String,
    pub metadata: MarkdownMetadata,
}

/// Convert a markdown document (with optional front-matter) to HTML.
///
/// When `tutorial_id` is given, `./name.md` links point at that tutorial's
/// chapter routes.
pub fn process(raw: &str, tutorial_id: Option<&str>) -> Result<ProcessedMarkdown, MarkdownError> {
    let (front_matter, body) = FrontMatter::split(raw).map_err(MarkdownError::failed)?;

    let mut html = render_html(body)?;
    if let Some(id) = tutorial_id {
        html = rewrite_chapter_links(&html, id);
    }

    Ok(ProcessedMarkdown {
        html,
        metadata: MarkdownMetadata::from_front_matter(&front_matter),
    })
}

fn render_html(body: &str) -> Result<String, MarkdownError> {
    let arena = Arena::new();

    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    // Placeholders are raw HTML nodes
    options.render.unsafe_ = true;

    let root = parse_document(&arena, body, &options);
    let diagrams = diagrams::replace_diagram_blocks(root);
    tracing::trace!("Extracted {} diagram block(s)", diagrams);

    let mut plugins = Plugins::default();
    plugins.render.codefence_syntax_highlighter = Some(&*HIGHLIGHTER);

    let mut html = Vec::new();
    format_html_with_plugins(root, &options, &mut html, &plugins).map_err(MarkdownError::failed)?;

    String::from_utf8(html).map_err(MarkdownError::failed)
}
