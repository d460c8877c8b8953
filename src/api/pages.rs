//! Bare HTML pages behind the chapter routes.
//!
//! Rewritten chapter links point at `/tutorial/{slug}/chapter/{chapter}`, so
//! those routes need to answer with something a browser can show. Layout and
//! styling live in the frontend; this is only a shell.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use super::render_markdown;
use crate::errors::AppError;
use crate::markdown::{chapter_route, diagrams::escape_html, encode_component};
use crate::AppState;

/// Renders any placeholder the server left behind.
///
/// The engine is imported lazily and a failed import is forgotten, so the next
/// pass retries it. Placeholders render independently of each other.
const MERMAID_SCRIPT: &str = r#"<script type="module">
const MERMAID_URL = "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.esm.min.mjs";
const MAX_ATTEMPTS = 5;
let engine = null;

function loadMermaid() {
  if (!engine) {
    engine = import(MERMAID_URL)
      .then(({ default: mermaid }) => {
        mermaid.initialize({ startOnLoad: false, securityLevel: "loose" });
        return mermaid;
      })
      .catch((err) => {
        engine = null;
        throw err;
      });
  }
  return engine;
}

async function renderDiagram(el) {
  const mermaid = await loadMermaid();
  try {
    const source = decodeURIComponent(el.dataset.mermaid);
    const { svg } = await mermaid.render(el.id + "-svg", source);
    el.innerHTML = svg;
  } catch (err) {
    el.innerHTML = '<div class="mermaid-error">Error rendering diagram: ' + String(err.message || err).replace(/</g, "&lt;") + "</div>";
  }
  el.removeAttribute("data-mermaid");
}

async function renderPending(attempt) {
  const pending = Array.from(document.querySelectorAll(".mermaid-diagram[data-mermaid]"));
  if (pending.length === 0) return;
  const results = await Promise.allSettled(pending.map(renderDiagram));
  if (results.some((r) => r.status === "rejected") && attempt + 1 < MAX_ATTEMPTS) {
    setTimeout(() => renderPending(attempt + 1), 1000 * 2 ** attempt);
  }
}

renderPending(0);
</script>"#;

fn shell(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<main class=\"tutorial-content\">\n{}\n</main>\n{}\n</body>\n</html>\n",
        escape_html(title),
        body,
        MERMAID_SCRIPT
    )
}

fn page_error(err: AppError) -> Response {
    let status = err.status_code();
    let message = if status == StatusCode::NOT_FOUND {
        "Not found".to_string()
    } else {
        err.message()
    };
    (
        status,
        Html(shell(&message, &format!("<h1>{}</h1>", escape_html(&message)))),
    )
        .into_response()
}

/// GET /tutorial/{slug} - Tutorial index page.
pub async fn tutorial_page(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    match build_tutorial_page(&state, &slug).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => page_error(e),
    }
}

async fn build_tutorial_page(state: &AppState, slug: &str) -> Result<String, AppError> {
    let tutorial = state
        .loader
        .load(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tutorial {} not found", slug)))?;

    let content = render_markdown(state, &tutorial.content, &tutorial.id).await?;
    let chapters = state.loader.chapters(&tutorial.id).await?;

    let mut body = format!(
        "<h1>{}</h1>\n{}\n",
        escape_html(&tutorial.metadata.title),
        content
    );
    if !chapters.is_empty() {
        body.push_str("<nav class=\"tutorial-chapters\">\n<h2>Tutorial Chapters</h2>\n<ul>\n");
        for chapter in &chapters {
            body.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                chapter_route(&tutorial.id, chapter),
                escape_html(chapter.trim_end_matches(".md"))
            ));
        }
        body.push_str("</ul>\n</nav>");
    }

    Ok(shell(&tutorial.metadata.title, &body))
}

/// GET /tutorial/{slug}/chapter/{chapter} - Chapter page.
pub async fn chapter_page(
    State(state): State<AppState>,
    Path((slug, chapter)): Path<(String, String)>,
) -> Response {
    match build_chapter_page(&state, &slug, &chapter).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => page_error(e),
    }
}

async fn build_chapter_page(state: &AppState, slug: &str, chapter: &str) -> Result<String, AppError> {
    let raw = state
        .loader
        .load_chapter(slug, chapter)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Chapter {} not found", chapter)))?;

    let content = render_markdown(state, &raw, slug).await?;
    let body = format!(
        "<p><a href=\"/tutorial/{}\">Back to tutorial</a></p>\n{}",
        encode_component(slug),
        content
    );

    Ok(shell(chapter.trim_end_matches(".md"), &body))
}
