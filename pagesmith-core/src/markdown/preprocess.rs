//! Line rewrites on the raw markup, before parsing.
//!
//! - `^^text^^` becomes `<ins>text</ins>`
//! - a trailing `{: #id .class }` on an ATX heading becomes the `{#id .class}`
//!   block the heading parser understands
//! - `*[TERM]: title` abbreviation definitions are taken out of the text
//!
//! Fenced code blocks and inline code spans are copied unchanged.

use super::abbr::Abbreviation;
use super::attr_list::Attributes;
use regex::Regex;
use std::sync::OnceLock;

static INSERT_REGEX: OnceLock<Regex> = OnceLock::new();
static HEADING_ATTRS_REGEX: OnceLock<Regex> = OnceLock::new();

fn insert_regex() -> &'static Regex {
    INSERT_REGEX.get_or_init(|| Regex::new(r"\^\^(?P<text>[^\^\s](?:[^\^]*[^\^\s])?)\^\^").unwrap())
}

fn heading_attrs_regex() -> &'static Regex {
    HEADING_ATTRS_REGEX.get_or_init(|| {
        Regex::new(r"^(?P<heading>[ ]{0,3}#{1,6}[ \t].*?)[ \t]*(?P<attrs>\{:[^}]*\})[ \t]*$").unwrap()
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub markdown: String,
    pub abbreviations: Vec<Abbreviation>,
}

pub fn preprocess(markdown: &str) -> Preprocessed {
    let mut out = String::with_capacity(markdown.len());
    let mut abbreviations = Vec::new();
    let mut fence: Option<&str> = None;

    for line in markdown.lines() {
        if let Some(marker) = fence {
            if line.trim_start().starts_with(marker) {
                fence = None;
            }
            push_line(&mut out, line);
            continue;
        }
        if let Some(marker) = fence_marker(line) {
            fence = Some(marker);
            push_line(&mut out, line);
            continue;
        }
        if let Some(abbr) = Abbreviation::parse_definition(line) {
            abbreviations.push(abbr);
            continue;
        }

        let line = map_outside_code_spans(line, |text| {
            insert_regex().replace_all(text, "<ins>$text</ins>").into_owned()
        });
        push_line(&mut out, &heading_attributes(&line));
    }

    Preprocessed {
        markdown: out,
        abbreviations,
    }
}

/// Opening (or closing) fence of a fenced code block.
pub(crate) fn fence_marker(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn heading_attributes(line: &str) -> String {
    let Some(caps) = heading_attrs_regex().captures(line) else {
        return line.to_string();
    };
    let (Some(heading), Some(block)) = (caps.name("heading"), caps.name("attrs")) else {
        return line.to_string();
    };
    match Attributes::whole(block.as_str()) {
        Some(attrs) if !attrs.is_empty() => {
            format!("{} {}", heading.as_str(), attrs.to_heading_block())
        }
        _ => heading.as_str().to_string(),
    }
}

/// Apply `rewrite` to the parts of `line` outside backtick code spans.
fn map_outside_code_spans(line: &str, rewrite: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find('`') {
        let run = rest[start..].bytes().take_while(|b| *b == b'`').count();
        let after = &rest[start + run..];
        match closing_run(after, run) {
            Some(end) => {
                out.push_str(&rewrite(&rest[..start]));
                out.push_str(&rest[start..start + run + end + run]);
                rest = &after[end + run..];
            }
            None => {
                // Unmatched backticks are literal text
                out.push_str(&rewrite(&rest[..start + run]));
                rest = after;
            }
        }
    }
    out.push_str(&rewrite(rest));
    out
}

/// Offset of the next backtick run of exactly `run` ticks
fn closing_run(text: &str, run: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let len = bytes[i..].iter().take_while(|b| **b == b'`').count();
            if len == run {
                return Some(i);
            }
            i += len;
        } else {
            i += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markdown(input: &str) -> String {
        preprocess(input).markdown
    }

    #[test]
    fn test_caret_insert() {
        assert_eq!(markdown("a ^^new text^^ b"), "a <ins>new text</ins> b\n");
        assert_eq!(markdown("x^2^ and ^^ ^^"), "x^2^ and ^^ ^^\n");
    }

    #[test]
    fn test_caret_skips_code() {
        assert_eq!(
            markdown("`^^a^^` and ``^^b^^`` but ^^c^^"),
            "`^^a^^` and ``^^b^^`` but <ins>c</ins>\n"
        );
        assert_eq!(markdown("```\n^^a^^\n```"), "```\n^^a^^\n```\n");
    }

    #[test]
    fn test_heading_attributes() {
        assert_eq!(
            markdown("## Install {: #setup .wide }"),
            "## Install {#setup .wide}\n"
        );
        assert_eq!(markdown("## Empty {: }"), "## Empty\n");
        assert_eq!(markdown("Text {: .x }"), "Text {: .x }\n");
    }

    #[test]
    fn test_abbreviation_definitions_removed() {
        let out = preprocess("Uses HTML.\n\n*[HTML]: Hyper Text Markup Language\n```\n*[X]: kept\n```\n");
        assert_eq!(out.markdown, "Uses HTML.\n\n```\n*[X]: kept\n```\n");
        assert_eq!(
            out.abbreviations,
            vec![Abbreviation {
                term: "HTML".to_string(),
                title: "Hyper Text Markup Language".to_string(),
            }]
        );
    }
}
