//! Discovery of source documents and the metadata/content split.
//!
//! A document is a Markdown file whose YAML metadata sits between the first
//! two lines made only of dashes:
//!
//! ```text
//! ---
//! route: /about
//! template: base.html
//! ---
//! # About
//! ```
//!
//! Anything before the first dash line is ignored.

use crate::models::{Meta, SourceRecord};
use regex::Regex;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use walkdir::WalkDir;

/// Leading character of a bundle folder name (`+post/post.md`).
pub const BUNDLE_MARKER: char = '+';

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Markdown file is wrong ({0}): expected two dash delimiter lines")]
    MalformedDocument(PathBuf),

    #[error("Invalid metadata in {path:?}: {source}")]
    InvalidMetadata {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Metadata in {0:?} is not a key-value mapping")]
    MetadataNotMapping(PathBuf),

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan {0:?}: {1}")]
    Walk(PathBuf, #[source] walkdir::Error),
}

static DELIMITER_REGEX: OnceLock<Regex> = OnceLock::new();

fn delimiter_regex() -> &'static Regex {
    DELIMITER_REGEX.get_or_init(|| Regex::new(r"(?m)^-+\r?$").expect("valid delimiter regex"))
}

/// Split raw document text into `(metadata, content)`.
///
/// Returns `None` when fewer than two delimiter lines are present. The
/// content is exactly the text following the second delimiter line.
pub fn split_document(text: &str) -> Option<(&str, &str)> {
    let mut delimiters = delimiter_regex().find_iter(text);
    let first = delimiters.next()?;
    let second = delimiters.next()?;

    let meta_start = (first.end() + 1).min(second.start());
    let meta = &text[meta_start..second.start()];

    let rest = &text[second.end()..];
    let content = rest.strip_prefix('\n').unwrap_or(rest);

    Some((meta, content))
}

/// Parse a metadata block; blank or `null` blocks yield an empty mapping.
pub fn parse_metadata(path: &Path, meta: &str) -> Result<Meta, DocumentError> {
    if meta.trim().is_empty() {
        return Ok(Meta::new());
    }

    let value: Value =
        serde_yaml::from_str(meta).map_err(|source| DocumentError::InvalidMetadata {
            path: path.to_path_buf(),
            source,
        })?;

    match value {
        Value::Null => Ok(Meta::new()),
        Value::Mapping(_) => {
            serde_yaml::from_value(value).map_err(|source| DocumentError::InvalidMetadata {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => Err(DocumentError::MetadataNotMapping(path.to_path_buf())),
    }
}

/// Build a record from already loaded document text
pub fn parse_document(path: &Path, text: &str) -> Result<SourceRecord, DocumentError> {
    let (meta, content) =
        split_document(text).ok_or_else(|| DocumentError::MalformedDocument(path.to_path_buf()))?;
    let meta = parse_metadata(path, meta)?;
    Ok(SourceRecord::new(path, content, meta))
}

/// Read and split a single document from disk
pub fn read_document(path: &Path) -> Result<SourceRecord, DocumentError> {
    let text = fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(path, &text)
}

/// Every `*.md` file directly under `root` or directly inside a bundle folder.
pub fn discover_documents(root: &Path) -> Result<Vec<PathBuf>, DocumentError> {
    discover_with_extension(root, "md")
}

/// Files with `extension` at the top level of `root` and in its bundle folders.
fn discover_with_extension(
    root: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>, DocumentError> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 1 || !e.file_type().is_dir());

    for entry in walker {
        let entry = entry.map_err(|e| DocumentError::Walk(root.to_path_buf(), e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }
        if entry.depth() == 2 && !in_bundle(entry.path()) {
            continue;
        }
        files.push(entry.into_path());
    }

    files.sort();
    Ok(files)
}

fn in_bundle(path: &Path) -> bool {
    path.parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(BUNDLE_MARKER))
}

/// Discover and read every document under `root`; the first failure aborts.
pub fn read_documents(root: &Path) -> Result<Vec<SourceRecord>, DocumentError> {
    let files = discover_documents(root)?;
    tracing::info!("Found {} markdown files", files.len());

    files
        .iter()
        .map(|path| {
            tracing::debug!("Reading {:?}", path);
            read_document(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_valid_document() {
        let text = "---\nroute: /about\ntitle: About\n---\n# About\n\nHello.\n";
        let (meta, content) = split_document(text).unwrap();
        assert_eq!(meta, "route: /about\ntitle: About\n");
        assert_eq!(content, "# About\n\nHello.\n");
    }

    #[test]
    fn test_split_ignores_leading_text() {
        let text = "preamble\n-----\nroute: /\n-\nbody";
        let (meta, content) = split_document(text).unwrap();
        assert_eq!(meta, "route: /\n");
        assert_eq!(content, "body");
    }

    #[test]
    fn test_split_crlf_delimiters() {
        let text = "---\r\nroute: /x\r\n---\r\nbody\r\n";
        let (meta, content) = split_document(text).unwrap();
        assert!(meta.contains("route: /x"));
        assert_eq!(content, "body\r\n");
    }

    #[test]
    fn test_split_keeps_later_dash_lines_in_content() {
        let text = "---\nroute: /\n---\nintro\n---\noutro\n";
        let (_, content) = split_document(text).unwrap();
        assert_eq!(content, "intro\n---\noutro\n");
    }

    #[test]
    fn test_split_empty_metadata() {
        let (meta, content) = split_document("---\n---\nbody").unwrap();
        assert_eq!(meta, "");
        assert_eq!(content, "body");
    }

    #[test]
    fn test_dashes_inside_a_line_are_not_delimiters() {
        assert!(split_document("--- route\n---\nbody").is_none());
        assert!(split_document("a -- b\n---\nbody").is_none());
    }

    #[test]
    fn test_malformed_documents() {
        for text in ["", "# Just content", "---\nroute: /\n# no end"] {
            let err = parse_document(Path::new("bad.md"), text).unwrap_err();
            match err {
                DocumentError::MalformedDocument(path) => assert_eq!(path, Path::new("bad.md")),
                other => panic!("Expected MalformedDocument, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_document_metadata() {
        let text = "---\nroute: /post\ntags:\n  - rust\ncount: 3\n---\nBody";
        let record = parse_document(Path::new("post.md"), text).unwrap();
        assert_eq!(record.route(), Some("/post"));
        assert_eq!(record.meta["count"], Value::from(3));
        assert!(record.meta["tags"].is_sequence());
        assert_eq!(record.content, "Body");
    }

    #[test]
    fn test_blank_metadata_is_empty_mapping() {
        let record = parse_document(Path::new("x.md"), "---\n\n---\nBody").unwrap();
        assert!(record.meta.is_empty());
    }

    #[test]
    fn test_scalar_metadata_is_rejected() {
        let err = parse_document(Path::new("x.md"), "---\njust a string\n---\nBody").unwrap_err();
        assert!(matches!(err, DocumentError::MetadataNotMapping(_)));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = parse_document(Path::new("x.md"), "---\nkey: [unclosed\n---\nBody").unwrap_err();
        assert!(matches!(err, DocumentError::InvalidMetadata { .. }));
    }

    #[test]
    fn test_discover_top_level_and_bundles_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("+bundle/nested")).unwrap();
        fs::create_dir_all(root.join("static")).unwrap();
        fs::write(root.join("index.md"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();
        fs::write(root.join("+bundle/post.md"), "").unwrap();
        fs::write(root.join("+bundle/nested/deep.md"), "").unwrap();
        fs::write(root.join("static/readme.md"), "").unwrap();

        let files = discover_documents(root).unwrap();
        assert_eq!(
            files,
            vec![root.join("+bundle/post.md"), root.join("index.md")]
        );
    }

    #[test]
    fn test_read_documents_aborts_on_first_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "---\nroute: /a\n---\nA").unwrap();
        fs::write(dir.path().join("b.md"), "no delimiters").unwrap();

        let err = read_documents(dir.path()).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedDocument(p) if p.ends_with("b.md")));
    }
}
