//! Heading ids and the nested table of contents.

use pulldown_cmark::{CowStr, Event, Tag, TagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// One heading of a page, with the headings nested below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub level: u32,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<TocEntry>,
}

static SEPARATOR_REGEX: OnceLock<Regex> = OnceLock::new();

fn separator_regex() -> &'static Regex {
    SEPARATOR_REGEX.get_or_init(|| Regex::new(r"[\s_\-]+").unwrap())
}

/// Convert heading text to an anchor id
///
/// ```
/// use pagesmith_core::markdown::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("C++ & Rust"), "c-rust");
/// ```
pub fn slugify(input: &str) -> String {
    let cleaned: String = input
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();

    separator_regex()
        .replace_all(cleaned.trim(), "-")
        .trim_matches('-')
        .to_string()
}

/// Give every heading an id (keeping explicit `{#id}` ones) and collect the TOC.
pub fn attach_heading_ids(mut events: Vec<Event<'static>>) -> (Vec<Event<'static>>, Vec<TocEntry>) {
    let mut flat = Vec::new();
    let mut used = HashSet::new();
    let mut open: Option<(usize, String)> = None;

    for idx in 0..events.len() {
        match &events[idx] {
            Event::Start(Tag::Heading { .. }) => open = Some((idx, String::new())),
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, ref mut name)) = open {
                    name.push_str(text);
                }
            }
            Event::End(TagEnd::Heading(level)) => {
                let Some((start, name)) = open.take() else {
                    continue;
                };
                let level = *level as u32;
                if let Event::Start(Tag::Heading { id, .. }) = &mut events[start] {
                    let anchor = match id {
                        Some(explicit) => explicit.to_string(),
                        None => unique_id(&slugify(&name), &used),
                    };
                    used.insert(anchor.clone());
                    *id = Some(CowStr::from(anchor.clone()));
                    flat.push(TocEntry {
                        level,
                        id: anchor,
                        name: name.trim().to_string(),
                        children: Vec::new(),
                    });
                }
            }
            _ => {}
        }
    }

    (events, nest(&flat))
}

fn unique_id(base: &str, used: &HashSet<String>) -> String {
    let base = if base.is_empty() { "section" } else { base };
    if !used.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

fn nest(items: &[TocEntry]) -> Vec<TocEntry> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < items.len() {
        let mut entry = items[i].clone();
        let mut end = i + 1;
        while end < items.len() && items[end].level > entry.level {
            end += 1;
        }
        entry.children = nest(&items[i + 1..end]);
        out.push(entry);
        i = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulldown_cmark::{Options, Parser};

    fn toc_of(markdown: &str) -> Vec<TocEntry> {
        let events = Parser::new_ext(markdown, Options::ENABLE_HEADING_ATTRIBUTES)
            .map(Event::into_static)
            .collect();
        attach_heading_ids(events).1
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("What's new?"), "whats-new");
        assert_eq!(slugify("snake_case  and--dashes"), "snake-case-and-dashes");
        assert_eq!(slugify("Café"), "café");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_nested_toc() {
        let toc = toc_of("# Title\n\n## One\n\n### Deep\n\n## Two\n\n# Appendix\n");
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].name, "Title");
        assert_eq!(toc[0].children.len(), 2);
        assert_eq!(toc[0].children[0].id, "one");
        assert_eq!(toc[0].children[0].children[0].name, "Deep");
        assert_eq!(toc[1].id, "appendix");
        assert!(toc[1].children.is_empty());
    }

    #[test]
    fn test_duplicate_headings_get_unique_ids() {
        let toc = toc_of("## Notes\n\n## Notes\n\n## Notes\n");
        let ids: Vec<_> = toc.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["notes", "notes-1", "notes-2"]);
    }

    #[test]
    fn test_explicit_id_is_kept() {
        let toc = toc_of("## Setup {#install}\n");
        assert_eq!(toc[0].id, "install");
        assert_eq!(toc[0].name, "Setup");
    }

    #[test]
    fn test_code_in_heading_text() {
        let toc = toc_of("## The `main` function\n");
        assert_eq!(toc[0].name, "The main function");
        assert_eq!(toc[0].id, "the-main-function");
    }
}
