//! Content model for documents moving through the pipeline.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Metadata block of a document: string keys to arbitrary YAML values.
pub type Meta = BTreeMap<String, Value>;

/// Documented metadata keys a page may leave out; templates see them as null.
pub const OPTIONAL_META_KEYS: [&str; 6] = ["title", "author", "summary", "date", "template", "route"];

/// One discovered document and its render state.
///
/// `content` starts as the raw markup body and is rewritten in place by each
/// stage until it holds the final HTML page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Source path; stable identity of the record
    pub filename: PathBuf,

    pub content: String,

    #[serde(default)]
    pub meta: Meta,

    /// Written file, set by the write stage
    #[serde(default)]
    pub dest_filename: Option<PathBuf>,

    /// Folder of the written file, set by the write stage
    #[serde(default)]
    pub dest_folder: Option<PathBuf>,
}

impl SourceRecord {
    pub fn new(filename: impl Into<PathBuf>, content: impl Into<String>, meta: Meta) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            meta,
            dest_filename: None,
            dest_folder: None,
        }
    }

    /// String-valued metadata entry
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }

    /// Declared route (URL path) of the page
    pub fn route(&self) -> Option<&str> {
        self.meta_str("route")
    }

    /// Explicit template reference, relative to the root folder
    pub fn template(&self) -> Option<&str> {
        self.meta_str("template")
    }

    pub fn title(&self) -> Option<&str> {
        self.meta_str("title")
    }

    /// Template living next to the source file (`post.md` -> `post.html`)
    pub fn sibling_template(&self) -> PathBuf {
        self.filename.with_extension("html")
    }

    /// Whether the page has been written to disk yet
    pub fn is_written(&self) -> bool {
        self.dest_filename.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, Value)]) -> Meta {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_meta_accessors() {
        let record = SourceRecord::new(
            "site/post.md",
            "body",
            meta(&[
                ("route", Value::from("/post")),
                ("template", Value::from("base.html")),
                ("draft", Value::from(true)),
            ]),
        );

        assert_eq!(record.route(), Some("/post"));
        assert_eq!(record.template(), Some("base.html"));
        assert_eq!(record.title(), None);
        // Non-string values are not exposed as strings
        assert_eq!(record.meta_str("draft"), None);
        assert!(!record.is_written());
    }

    #[test]
    fn test_sibling_template() {
        let record = SourceRecord::new("site/+bundle/page.md", "", Meta::new());
        assert_eq!(
            record.sibling_template(),
            PathBuf::from("site/+bundle/page.html")
        );
    }
}
