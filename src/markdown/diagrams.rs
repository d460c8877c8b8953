//! Diagram placeholders and the render pass that resolves them.
//!
//! Fenced `mermaid` blocks never reach the HTML as code. They are swapped for a
//! placeholder element that carries the percent-encoded source and a unique id:
//!
//! ```html
//! <div class="mermaid-diagram" data-mermaid="graph%20TD%3B..." id="mermaid-6f1c...">
//!   <div class="mermaid-loading">Loading diagram...</div>
//! </div>
//! ```
//!
//! The browser (or [`DiagramRenderer`] on the server) later finds the
//! placeholders by that shape and replaces each one with rendered output.

use std::ops::Range;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use futures::future::join_all;
use percent_encoding::percent_decode_str;
use regex::Regex;
use tokio::sync::OnceCell;

use super::encode_component;

/// Fence language tag reserved for diagram source.
pub const DIAGRAM_LANGUAGE: &str = "mermaid";

/// Class carried by every placeholder and rendered diagram container.
pub const PLACEHOLDER_CLASS: &str = "mermaid-diagram";

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<div class="mermaid-diagram" data-mermaid="([^"]*)" id="([^"]*)">\s*<div class="mermaid-loading">[^<]*</div>\s*</div>"#,
    )
    .expect("valid regex")
});

/// A diagram found in processed HTML.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramPlaceholder {
    pub id: String,
    /// Decoded diagram source
    pub source: String,
    /// Byte range of the whole placeholder element
    pub span: Range<usize>,
}

/// Errors from the diagram engine.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("diagram engine unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Render(String),
}

/// Build the placeholder element for one diagram.
pub fn placeholder_html(source: &str) -> String {
    let id = format!("mermaid-{}", uuid::Uuid::new_v4().simple());
    format!(
        "<div class=\"{}\" data-mermaid=\"{}\" id=\"{}\">\n  <div class=\"mermaid-loading\">Loading diagram...</div>\n</div>\n",
        PLACEHOLDER_CLASS,
        encode_component(source),
        id
    )
}

/// Replace every fenced diagram block under `root` with a raw HTML placeholder.
/// Returns how many blocks were replaced.
pub(crate) fn replace_diagram_blocks<'a>(root: &'a AstNode<'a>) -> usize {
    let mut replaced = 0;
    for node in root.descendants() {
        let mut ast = node.data.borrow_mut();
        let placeholder = match &ast.value {
            NodeValue::CodeBlock(block) if block.fenced && is_diagram_info(&block.info) => {
                placeholder_html(&block.literal)
            }
            _ => continue,
        };
        // The code block (and its language tag) is gone; highlighting never sees it
        ast.value = NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 6,
            literal: placeholder,
        });
        replaced += 1;
    }
    replaced
}

fn is_diagram_info(info: &str) -> bool {
    info.split_whitespace().next() == Some(DIAGRAM_LANGUAGE)
}

/// Decode every placeholder in `html`, in document order.
pub fn find_placeholders(html: &str) -> Vec<DiagramPlaceholder> {
    PLACEHOLDER_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(DiagramPlaceholder {
                id: caps[2].to_string(),
                source: percent_decode_str(&caps[1]).decode_utf8_lossy().into_owned(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Something that turns diagram source into markup (usually SVG).
#[async_trait]
pub trait DiagramEngine: Send + Sync {
    async fn render(&self, id: &str, source: &str) -> Result<String, DiagramError>;
}

/// Acquires a [`DiagramEngine`]. Called at most once per successful acquisition.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn DiagramEngine>, DiagramError>;
}

/// Readiness of the lazily acquired engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => EngineState::Loading,
            2 => EngineState::Ready,
            3 => EngineState::Failed,
            _ => EngineState::Unloaded,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            EngineState::Unloaded => 0,
            EngineState::Loading => 1,
            EngineState::Ready => 2,
            EngineState::Failed => 3,
        }
    }
}

/// Server-side resolution of diagram placeholders.
///
/// The engine is acquired once and shared. Concurrent callers wait on the same
/// acquisition. A failed acquisition is not cached, so the next render retries.
pub struct DiagramRenderer {
    loader: Arc<dyn EngineLoader>,
    engine: OnceCell<Arc<dyn DiagramEngine>>,
    state: AtomicU8,
}

impl DiagramRenderer {
    pub fn new(loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            loader,
            engine: OnceCell::new(),
            state: AtomicU8::new(EngineState::Unloaded.as_u8()),
        }
    }

    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: EngineState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Wait for the engine to be ready, acquiring it if nobody has yet.
    pub async fn ready(&self) -> Result<Arc<dyn DiagramEngine>, DiagramError> {
        if self.state() == EngineState::Failed {
            tracing::info!("Retrying diagram engine acquisition");
        }
        let engine = self
            .engine
            .get_or_try_init(|| async {
                self.set_state(EngineState::Loading);
                match self.loader.load().await {
                    Ok(engine) => {
                        self.set_state(EngineState::Ready);
                        Ok(engine)
                    }
                    Err(e) => {
                        self.set_state(EngineState::Failed);
                        Err(e)
                    }
                }
            })
            .await?;
        Ok(Arc::clone(engine))
    }

    /// Replace every placeholder in `html` with rendered output.
    ///
    /// Diagrams render concurrently. A diagram that fails gets an inline error
    /// in its own container. If the engine cannot be acquired the HTML is
    /// returned unchanged so the client can still render it.
    pub async fn render(&self, html: &str) -> String {
        let placeholders = find_placeholders(html);
        if placeholders.is_empty() {
            return html.to_string();
        }

        let engine = match self.ready().await {
            Ok(engine) => engine,
            Err(e) => {
                tracing::warn!("Diagram engine not ready, leaving placeholders: {}", e);
                return html.to_string();
            }
        };

        let jobs = placeholders.iter().map(|placeholder| {
            let engine = Arc::clone(&engine);
            let id = placeholder.id.as_str();
            async move {
                match engine.render(id, &placeholder.source).await {
                    Ok(svg) => format!(
                        "<div class=\"{}\" id=\"{}\" data-rendered=\"true\">{}</div>",
                        PLACEHOLDER_CLASS, id, svg
                    ),
                    Err(e) => {
                        tracing::warn!("Diagram {} failed to render: {}", id, e);
                        format!(
                            "<div class=\"{}\" id=\"{}\"><div class=\"mermaid-error\">Error rendering diagram: {}</div></div>",
                            PLACEHOLDER_CLASS,
                            id,
                            escape_html(&e.to_string())
                        )
                    }
                }
            }
        });
        let rendered = join_all(jobs).await;

        let mut output = String::with_capacity(html.len());
        let mut last = 0;
        for (placeholder, replacement) in placeholders.iter().zip(rendered) {
            output.push_str(&html[last..placeholder.span.start]);
            output.push_str(&replacement);
            last = placeholder.span.end;
        }
        output.push_str(&html[last..]);
        output
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Loader for a Kroki-compatible HTTP renderer.
pub struct KrokiLoader {
    client: reqwest::Client,
    base_url: String,
}

impl KrokiLoader {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EngineLoader for KrokiLoader {
    async fn load(&self) -> Result<Arc<dyn DiagramEngine>, DiagramError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DiagramError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DiagramError::Unavailable(format!(
                "health check returned {}",
                response.status()
            )));
        }

        tracing::info!("Diagram engine ready at {}", self.base_url);
        Ok(Arc::new(KrokiEngine {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
        }))
    }
}

struct KrokiEngine {
    client: reqwest::Client,
    base_url: String,
}

#[async_trait]
impl DiagramEngine for KrokiEngine {
    async fn render(&self, _id: &str, source: &str) -> Result<String, DiagramError> {
        let url = format!("{}/{}/svg", self.base_url, DIAGRAM_LANGUAGE);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(source.to_string())
            .send()
            .await
            .map_err(|e| DiagramError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DiagramError::Render(e.to_string()))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(DiagramError::Render(body.trim().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Renders `<svg>{source}</svg>`, failing on sources containing "boom".
    struct EchoEngine;

    #[async_trait]
    impl DiagramEngine for EchoEngine {
        async fn render(&self, _id: &str, source: &str) -> Result<String, DiagramError> {
            if source.contains("boom") {
                Err(DiagramError::Render("Parse error on line 1".into()))
            } else {
                Ok(format!("<svg>{}</svg>", source.trim()))
            }
        }
    }

    struct CountingLoader {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl EngineLoader for CountingLoader {
        async fn load(&self) -> Result<Arc<dyn DiagramEngine>, DiagramError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail_first && call == 0 {
                return Err(DiagramError::Unavailable("script not loaded".into()));
            }
            Ok(Arc::new(EchoEngine))
        }
    }

    fn loader(fail_first: bool) -> Arc<CountingLoader> {
        Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
            fail_first,
        })
    }

    #[test]
    fn test_placeholder_round_trips_source() {
        let source = "graph TD;\n  A[\"x & y\"] --> B;";
        let html = placeholder_html(source);
        assert!(html.starts_with("<div class=\"mermaid-diagram\" data-mermaid=\""));
        assert!(!html.contains("\"x & y\""));

        let found = find_placeholders(&html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source, source);
        assert!(found[0].id.starts_with("mermaid-"));
    }

    #[test]
    fn test_placeholder_ids_are_unique() {
        let a = find_placeholders(&placeholder_html("graph TD; A-->B"));
        let b = find_placeholders(&placeholder_html("graph TD; A-->B"));
        assert_ne!(a[0].id, b[0].id);
    }

    #[tokio::test]
    async fn test_render_replaces_each_placeholder() {
        let renderer = DiagramRenderer::new(loader(false));
        let html = format!(
            "<p>before</p>\n{}<p>middle</p>\n{}<p>after</p>",
            placeholder_html("graph A"),
            placeholder_html("graph B")
        );

        let out = renderer.render(&html).await;

        assert!(out.contains("<svg>graph A</svg>"));
        assert!(out.contains("<svg>graph B</svg>"));
        assert!(out.contains("<p>before</p>"));
        assert!(out.contains("<p>middle</p>"));
        assert!(out.contains("<p>after</p>"));
        assert!(find_placeholders(&out).is_empty());
        assert_eq!(renderer.state(), EngineState::Ready);
    }

    #[tokio::test]
    async fn test_failed_diagram_does_not_affect_siblings() {
        let renderer = DiagramRenderer::new(loader(false));
        let html = format!(
            "{}{}",
            placeholder_html("graph boom"),
            placeholder_html("graph ok")
        );

        let out = renderer.render(&html).await;

        assert!(out.contains("<div class=\"mermaid-error\">Error rendering diagram: Parse error on line 1</div>"));
        assert!(out.contains("<svg>graph ok</svg>"));
    }

    #[tokio::test]
    async fn test_failed_acquisition_leaves_html_and_retries() {
        let loader = loader(true);
        let renderer = DiagramRenderer::new(loader.clone());
        assert_eq!(renderer.state(), EngineState::Unloaded);

        let html = placeholder_html("graph A");
        let first = renderer.render(&html).await;
        assert_eq!(first, html);
        assert_eq!(renderer.state(), EngineState::Failed);

        let second = renderer.render(&html).await;
        assert!(second.contains("<svg>graph A</svg>"));
        assert_eq!(renderer.state(), EngineState::Ready);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_renders_share_one_acquisition() {
        let loader = loader(false);
        let renderer = Arc::new(DiagramRenderer::new(loader.clone()));
        let html = placeholder_html("graph A");

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let renderer = Arc::clone(&renderer);
                let html = html.clone();
                tokio::spawn(async move { renderer.render(&html).await })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().contains("<svg>graph A</svg>"));
        }
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_html_without_placeholders_skips_acquisition() {
        let loader = loader(false);
        let renderer = DiagramRenderer::new(loader.clone());
        assert_eq!(renderer.render("<p>plain</p>").await, "<p>plain</p>");
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_kroki_engine() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/health"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/mermaid/svg"))
            .and(wiremock::matchers::body_string("graph TD; A-->B"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<svg>ok</svg>"))
            .mount(&server)
            .await;

        let renderer = DiagramRenderer::new(Arc::new(KrokiLoader::new(
            reqwest::Client::new(),
            server.uri(),
        )));
        let out = renderer.render(&placeholder_html("graph TD; A-->B")).await;

        assert!(out.contains("<svg>ok</svg>"));
    }

    #[tokio::test]
    async fn test_kroki_unhealthy_is_unavailable() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/health"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let renderer = DiagramRenderer::new(Arc::new(KrokiLoader::new(
            reqwest::Client::new(),
            server.uri(),
        )));

        assert!(matches!(
            renderer.ready().await,
            Err(DiagramError::Unavailable(_))
        ));
        assert_eq!(renderer.state(), EngineState::Failed);
    }
}
