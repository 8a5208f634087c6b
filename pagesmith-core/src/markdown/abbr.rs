//! Abbreviations.
//!
//! A definition line `*[HTML]: Hyper Text Markup Language` anywhere in a page
//! wraps every whole-word `HTML` of that page in
//! `<abbr title="Hyper Text Markup Language">`. Definition lines are removed
//! before parsing; code is never touched.

use super::escape_html;
use pulldown_cmark::{CowStr, Event, Tag, TagEnd};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

static DEFINITION_REGEX: OnceLock<Regex> = OnceLock::new();

fn definition_regex() -> &'static Regex {
    DEFINITION_REGEX.get_or_init(|| {
        Regex::new(r"^\*\[(?P<term>[^\]]+)\]:[ \t]*(?P<title>.*?)[ \t]*$").unwrap()
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abbreviation {
    pub term: String,
    pub title: String,
}

impl Abbreviation {
    /// Parse a `*[TERM]: title` definition line
    pub fn parse_definition(line: &str) -> Option<Self> {
        let caps = definition_regex().captures(line)?;
        Some(Self {
            term: caps.name("term")?.as_str().trim().to_string(),
            title: caps.name("title")?.as_str().to_string(),
        })
    }
}

pub fn apply_abbreviations(
    events: Vec<Event<'static>>,
    abbreviations: &[Abbreviation],
) -> Vec<Event<'static>> {
    // Later definitions of a term replace earlier ones; empty titles remove it
    let mut titles: BTreeMap<&str, &str> = BTreeMap::new();
    for abbr in abbreviations {
        if abbr.title.is_empty() {
            titles.remove(abbr.term.as_str());
        } else {
            titles.insert(&abbr.term, &abbr.title);
        }
    }
    if titles.is_empty() {
        return events;
    }

    let mut terms: Vec<&str> = titles.keys().copied().collect();
    terms.sort_by_key(|term| std::cmp::Reverse(term.len()));
    let pattern = terms
        .iter()
        .map(|term| regex::escape(term))
        .collect::<Vec<_>>()
        .join("|");
    let matcher = match Regex::new(&pattern) {
        Ok(matcher) => matcher,
        Err(e) => {
            tracing::warn!("Skipping abbreviations: {e}");
            return events;
        }
    };

    let mut out = Vec::with_capacity(events.len());
    let mut code_depth = 0usize;
    let mut image_depth = 0usize;
    let mut pending = String::new();

    for event in events {
        if let Event::Text(text) = &event {
            if code_depth == 0 && image_depth == 0 {
                pending.push_str(text);
                continue;
            }
        }
        wrap_terms(&std::mem::take(&mut pending), &matcher, &titles, &mut out);

        match &event {
            Event::Start(Tag::CodeBlock(_)) => code_depth += 1,
            Event::End(TagEnd::CodeBlock) => code_depth = code_depth.saturating_sub(1),
            Event::Start(Tag::Image { .. }) => image_depth += 1,
            Event::End(TagEnd::Image) => image_depth = image_depth.saturating_sub(1),
            _ => {}
        }
        out.push(event);
    }
    wrap_terms(&pending, &matcher, &titles, &mut out);
    out
}

fn wrap_terms(
    text: &str,
    matcher: &Regex,
    titles: &BTreeMap<&str, &str>,
    out: &mut Vec<Event<'static>>,
) {
    let mut last = 0;
    for found in matcher.find_iter(text) {
        if !is_whole_word(text, found.start(), found.end()) {
            continue;
        }
        let Some(title) = titles.get(found.as_str()) else {
            continue;
        };
        if found.start() > last {
            out.push(Event::Text(CowStr::from(text[last..found.start()].to_string())));
        }
        out.push(Event::InlineHtml(CowStr::from(format!(
            r#"<abbr title="{}">{}</abbr>"#,
            escape_html(title),
            escape_html(found.as_str())
        ))));
        last = found.end();
    }
    if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word) && !after.is_some_and(is_word)
}
