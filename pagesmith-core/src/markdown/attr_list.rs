//! Attribute lists: `{: #id .class key="value" }`.
//!
//! A list on its own line at the end of a paragraph applies to the paragraph.
//! One written directly after a link or image applies to that element.
//! Heading lists are rewritten before parsing, see [`super::preprocess`].
//!
//! The leading colon is required so template text such as `{{ meta.title }}`
//! is never mistaken for an attribute list.

use super::escape_html;
use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};
use regex::Regex;
use std::sync::OnceLock;

static BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();
static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

fn block_regex() -> &'static Regex {
    BLOCK_REGEX.get_or_init(|| Regex::new(r"^\{:[ \t]*(?P<body>[^}\n]*?)[ \t]*\}").unwrap())
}

fn token_regex() -> &'static Regex {
    TOKEN_REGEX.get_or_init(|| {
        Regex::new(concat!(
            r"#(?P<id>[^\s#.{}]+)",
            r"|\.(?P<class>[^\s#.{}]+)",
            r#"|(?P<key>[A-Za-z_:][\w\-:.]*)=(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^\s"'}]+))"#,
        ))
        .unwrap()
    })
}

/// Parsed attribute list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub pairs: Vec<(String, String)>,
}

impl Attributes {
    /// Parse the inside of a `{: ... }` block. Later ids win; unknown tokens are skipped.
    pub fn parse(body: &str) -> Self {
        let mut attrs = Self::default();
        for caps in token_regex().captures_iter(body) {
            if let Some(id) = caps.name("id") {
                attrs.id = Some(id.as_str().to_string());
            } else if let Some(class) = caps.name("class") {
                attrs.classes.push(class.as_str().to_string());
            } else if let Some(key) = caps.name("key") {
                let value = caps
                    .name("dq")
                    .or_else(|| caps.name("sq"))
                    .or_else(|| caps.name("bare"))
                    .map_or("", |m| m.as_str());
                attrs.pairs.push((key.as_str().to_string(), value.to_string()));
            }
        }
        attrs
    }

    /// The `{: ... }` block `text` starts with, and its length in bytes
    pub fn leading(text: &str) -> Option<(Self, usize)> {
        let caps = block_regex().captures(text)?;
        let len = caps.get(0)?.end();
        Some((Self::parse(caps.name("body")?.as_str()), len))
    }

    /// `text` when it is exactly one `{: ... }` block
    pub fn whole(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let (attrs, len) = Self::leading(trimmed)?;
        (len == trimmed.len()).then_some(attrs)
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.classes.is_empty() && self.pairs.is_empty()
    }

    /// Rendered as HTML attributes, each with a leading space
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        if let Some(id) = &self.id {
            html.push_str(&format!(r#" id="{}""#, escape_html(id)));
        }
        if !self.classes.is_empty() {
            html.push_str(&format!(r#" class="{}""#, escape_html(&self.classes.join(" "))));
        }
        for (key, value) in &self.pairs {
            html.push_str(&format!(r#" {}="{}""#, key, escape_html(value)));
        }
        html
    }

    /// Rewritten as the `{#id .class key=value}` block the heading parser reads.
    ///
    /// That syntax has no quoting, so pairs whose value holds whitespace or
    /// quotes are left out.
    pub fn to_heading_block(&self) -> String {
        let mut tokens = Vec::new();
        if let Some(id) = &self.id {
            tokens.push(format!("#{id}"));
        }
        tokens.extend(self.classes.iter().map(|class| format!(".{class}")));
        for (key, value) in &self.pairs {
            if value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
                tracing::debug!("Dropping heading attribute {key}={value:?}");
                continue;
            }
            tokens.push(format!("{key}={value}"));
        }
        format!("{{{}}}", tokens.join(" "))
    }
}

/// Apply paragraph, link and image attribute lists.
pub fn apply_attr_lists(events: Vec<Event<'static>>) -> Vec<Event<'static>> {
    attach_to_paragraphs(attach_to_inline(coalesce_text(events)))
}

fn coalesce_text(events: Vec<Event<'static>>) -> Vec<Event<'static>> {
    let mut out: Vec<Event<'static>> = Vec::with_capacity(events.len());
    for event in events {
        if let Event::Text(text) = &event {
            if let Some(Event::Text(prev)) = out.last_mut() {
                let mut merged = prev.to_string();
                merged.push_str(text);
                *prev = CowStr::from(merged);
                continue;
            }
        }
        out.push(event);
    }
    out
}

fn attach_to_inline(events: Vec<Event<'static>>) -> Vec<Event<'static>> {
    let mut out: Vec<Event<'static>> = Vec::with_capacity(events.len());
    let mut open: Vec<usize> = Vec::new();
    // Start index of the link or image that closed on the previous event
    let mut closed: Option<usize> = None;

    for event in events {
        if let Some(start) = closed.take() {
            if let Event::Text(text) = &event {
                if let Some((attrs, len)) = Attributes::leading(text) {
                    rewrite_element(&mut out, start, &attrs);
                    if len < text.len() {
                        out.push(Event::Text(CowStr::from(text[len..].to_string())));
                    }
                    continue;
                }
            }
        }

        if matches!(event, Event::Start(Tag::Link { .. }) | Event::Start(Tag::Image { .. })) {
            open.push(out.len());
        } else if matches!(event, Event::End(TagEnd::Link) | Event::End(TagEnd::Image)) {
            closed = open.pop();
        }
        out.push(event);
    }
    out
}

/// Replace the element spanning `out[start..]` with raw HTML carrying `attrs`.
fn rewrite_element(out: &mut Vec<Event<'static>>, start: usize, attrs: &Attributes) {
    let mut inner: Vec<Event<'static>> = out.drain(start..).collect();
    if inner.len() < 2 {
        out.extend(inner);
        return;
    }
    let end = inner.pop();
    let first = inner.remove(0);

    match first {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            ..
        }) => {
            let href = match link_type {
                LinkType::Email if !dest_url.starts_with("mailto:") => format!("mailto:{dest_url}"),
                _ => dest_url.to_string(),
            };
            out.push(Event::InlineHtml(CowStr::from(format!(
                r#"<a href="{}"{}{}>"#,
                escape_html(&href),
                title_attr(&title),
                attrs.to_html()
            ))));
            out.extend(inner);
            out.push(Event::InlineHtml(CowStr::from("</a>")));
        }
        Event::Start(Tag::Image { dest_url, title, .. }) => {
            let alt: String = inner
                .iter()
                .filter_map(|event| match event {
                    Event::Text(text) | Event::Code(text) => Some(text.as_ref()),
                    _ => None,
                })
                .collect();
            out.push(Event::InlineHtml(CowStr::from(format!(
                r#"<img src="{}" alt="{}"{}{} />"#,
                escape_html(&dest_url),
                escape_html(&alt),
                title_attr(&title),
                attrs.to_html()
            ))));
        }
        other => {
            out.push(other);
            out.extend(inner);
            out.extend(end);
        }
    }
}

fn title_attr(title: &str) -> String {
    if title.is_empty() {
        String::new()
    } else {
        format!(r#" title="{}""#, escape_html(title))
    }
}

fn attach_to_paragraphs(events: Vec<Event<'static>>) -> Vec<Event<'static>> {
    let mut out: Vec<Event<'static>> = Vec::with_capacity(events.len());
    let mut start: Option<usize> = None;

    for event in events {
        match event {
            Event::Start(Tag::Paragraph) => {
                start = Some(out.len());
                out.push(Event::Start(Tag::Paragraph));
            }
            Event::End(TagEnd::Paragraph) => {
                let attrs = start
                    .take()
                    .and_then(|s| trailing_attributes(&out[s..]).map(|attrs| (s, attrs)));
                match attrs {
                    Some((s, attrs)) => {
                        // Drop the soft break and the attribute line
                        out.truncate(out.len() - 2);
                        out[s] = Event::Html(CowStr::from(format!("<p{}>", attrs.to_html())));
                        out.push(Event::Html(CowStr::from("</p>\n")));
                    }
                    None => out.push(Event::End(TagEnd::Paragraph)),
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn trailing_attributes(paragraph: &[Event<'static>]) -> Option<Attributes> {
    let [.., before, Event::SoftBreak, Event::Text(last)] = paragraph else {
        return None;
    };
    if matches!(before, Event::Start(Tag::Paragraph)) {
        return None;
    }
    Attributes::whole(last)
}
