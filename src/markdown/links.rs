//! Chapter link rewriting.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::encode_component;

static CHAPTER_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a href="\./([^"]+\.md)">([^<]+)</a>"#).expect("valid regex")
});

/// Route of a chapter page.
pub fn chapter_route(tutorial_id: &str, chapter: &str) -> String {
    format!("/tutorial/{}/chapter/{}", tutorial_id, encode_component(chapter))
}

/// Point `./name.md` anchors at the chapter route of `tutorial_id`.
///
/// Only same-directory relative markdown links are touched.
pub fn rewrite_chapter_links(html: &str, tutorial_id: &str) -> String {
    CHAPTER_LINK_RE
        .replace_all(html, |caps: &Captures| {
            format!(
                "<a href=\"{}\">{}</a>",
                chapter_route(tutorial_id, &caps[1]),
                &caps[2]
            )
        })
        .into_owned()
}
