//! YAML front-matter handling.
//!
//! Front-matter is a `---` fenced YAML block at the very start of a document.
//! It is kept as a loose mapping; callers pull typed values out with
//! [`FrontMatter::string`] and [`FrontMatter::string_list`].

use serde_yaml::{Mapping, Value};

/// Parsed front-matter block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    map: Mapping,
}

impl FrontMatter {
    /// Split and parse the front-matter of `raw`, returning it with the body.
    ///
    /// A document without a front-matter block yields an empty mapping and the
    /// whole text as body. Only malformed YAML is an error.
    pub fn split(raw: &str) -> Result<(Self, &str), serde_yaml::Error> {
        match split_block(raw) {
            Some((yaml, body)) => Ok((Self::parse(yaml)?, body)),
            None => Ok((Self::default(), raw)),
        }
    }

    /// Parse a YAML block. Empty or null YAML is an empty mapping.
    pub fn parse(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Null => Ok(Self::default()),
            Value::Mapping(map) => Ok(Self { map }),
            _ => Err(<serde_yaml::Error as serde::de::Error>::custom(
                "front-matter must be a mapping",
            )),
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// A scalar value as a string. Numbers and booleans are stringified.
    pub fn string(&self, key: &str) -> Option<String> {
        self.map.get(key).and_then(scalar_to_string)
    }

    /// A sequence of scalars. A lone scalar counts as a one-item list.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        match self.map.get(key) {
            Some(Value::Sequence(items)) => items.iter().filter_map(scalar_to_string).collect(),
            Some(value) => scalar_to_string(value).into_iter().collect(),
            None => Vec::new(),
        }
    }
}

/// Body of `raw` with any front-matter block removed. Never parses the YAML.
pub fn strip_front_matter(raw: &str) -> &str {
    split_block(raw).map(|(_, body)| body).unwrap_or(raw)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Locate the `---` delimited block. Returns `(yaml, body)`.
fn split_block(raw: &str) -> Option<(&str, &str)> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let first_end = text.find('\n')?;
    if text[..first_end].trim_end() != "---" {
        return None;
    }

    let yaml_start = first_end + 1;
    let mut offset = yaml_start;
    for line in text[yaml_start..].split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }

    // An opening fence with no closing fence is just a thematic break
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_with_front_matter() {
        let raw = "---\ntitle: Hello\ntags:\n  - a\n  - b\n---\n# Body\n";
        let (fm, body) = FrontMatter::split(raw).unwrap();
        assert_eq!(fm.string("title").as_deref(), Some("Hello"));
        assert_eq!(fm.string_list("tags"), vec!["a", "b"]);
        assert_eq!(body, "# Body\n");
    }

    #[test]
    fn test_empty_front_matter() {
        let (fm, body) = FrontMatter::split("---\n---\nhello").unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, "hello");
    }

    #[test]
    fn test_no_front_matter() {
        let raw = "# Title\n\nText";
        let (fm, body) = FrontMatter::split(raw).unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, raw);
    }

    #[test]
    fn test_unclosed_fence_is_body() {
        let raw = "---\nnot front matter";
        let (fm, body) = FrontMatter::split(raw).unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, raw);
    }

    #[test]
    fn test_crlf_delimiters() {
        let raw = "---\r\ntitle: Windows\r\n---\r\nbody";
        let (fm, body) = FrontMatter::split(raw).unwrap();
        assert_eq!(fm.string("title").as_deref(), Some("Windows"));
        assert_eq!(body, "body");
    }

    #[test]
    fn test_scalars_stringified() {
        let (fm, _) = FrontMatter::split("---\nestimatedTime: 30\ndraft: true\n---\n").unwrap();
        assert_eq!(fm.string("estimatedTime").as_deref(), Some("30"));
        assert_eq!(fm.string("draft").as_deref(), Some("true"));
        assert_eq!(fm.string_list("estimatedTime"), vec!["30"]);
        assert!(fm.string("missing").is_none());
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        assert!(FrontMatter::split("---\ntitle: [unclosed\n---\nbody").is_err());
        assert!(FrontMatter::split("---\n- just\n- a list\n---\nbody").is_err());
    }

    #[test]
    fn test_strip_front_matter() {
        assert_eq!(strip_front_matter("---\ntitle: x\n---\nhello"), "hello");
        assert_eq!(strip_front_matter("hello"), "hello");
    }
}
