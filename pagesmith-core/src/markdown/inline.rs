//! Inline syntax pulldown-cmark has no option for.
//!
//! - `++ctrl+alt+del++` renders as keyboard keys
//! - `==text==` renders as highlighted text
//! - bare `http(s)://` URLs become links
//! - `[=45% "label"]` or `[=3/4]` renders as a progress bar
//!
//! Text inside code blocks is never touched, and URLs that already sit inside
//! a link are not linked twice.

use super::escape_html;
use pulldown_cmark::{CowStr, Event, Tag, TagEnd};
use regex::{Captures, Regex};
use std::sync::OnceLock;

static INLINE_REGEX: OnceLock<Regex> = OnceLock::new();

fn inline_regex() -> &'static Regex {
    INLINE_REGEX.get_or_init(|| {
        Regex::new(concat!(
            r"\+\+(?P<keys>[\w\-]+(?:\+[\w\-]+)*)\+\+",
            r"|==(?P<mark>[^=\s](?:[^=]*[^=\s])?)==",
            r"|\[=+[ \t]*(?:(?P<percent>\d+(?:\.\d+)?)%|(?P<num>\d+(?:\.\d+)?)[ \t]*/[ \t]*(?P<den>\d+(?:\.\d+)?))",
            r#"(?:[ \t]+"(?P<label>[^"]*)")?[ \t]*\]"#,
            r#"|(?P<url>https?://[^\s<>"']*[^\s<>"'.,;:!?)\]])"#,
        ))
        .unwrap()
    })
}

#[derive(Debug, Default)]
pub struct InlineTransformer;

impl InlineTransformer {
    pub fn new() -> Self {
        Self
    }

    pub fn transform(&self, events: Vec<Event<'static>>) -> Vec<Event<'static>> {
        let mut out = Vec::with_capacity(events.len());
        let mut code_depth = 0usize;
        let mut link_depth = 0usize;
        let mut pending = String::new();

        for event in events {
            if let Event::Text(text) = &event {
                if code_depth == 0 {
                    pending.push_str(text);
                    continue;
                }
            }

            self.flush(&mut pending, link_depth > 0, &mut out);

            match &event {
                Event::Start(Tag::CodeBlock(_)) => code_depth += 1,
                Event::End(TagEnd::CodeBlock) => code_depth = code_depth.saturating_sub(1),
                Event::Start(Tag::Link { .. }) | Event::Start(Tag::Image { .. }) => link_depth += 1,
                Event::End(TagEnd::Link) | Event::End(TagEnd::Image) => {
                    link_depth = link_depth.saturating_sub(1)
                }
                _ => {}
            }
            out.push(event);
        }
        self.flush(&mut pending, link_depth > 0, &mut out);

        out
    }

    fn flush(&self, pending: &mut String, in_link: bool, out: &mut Vec<Event<'static>>) {
        if pending.is_empty() {
            return;
        }
        let text = std::mem::take(pending);
        let mut last = 0;

        for caps in inline_regex().captures_iter(&text) {
            let whole = caps.get(0).expect("group 0 always matches");
            let Some(html) = render_match(&caps, in_link) else {
                continue;
            };
            if whole.start() > last {
                out.push(Event::Text(CowStr::from(text[last..whole.start()].to_string())));
            }
            out.push(Event::InlineHtml(CowStr::from(html)));
            last = whole.end();
        }

        if last < text.len() {
            out.push(Event::Text(CowStr::from(text[last..].to_string())));
        }
    }
}

fn render_match(caps: &Captures<'_>, in_link: bool) -> Option<String> {
    if let Some(keys) = caps.name("keys") {
        return Some(render_keys(keys.as_str()));
    }
    if let Some(mark) = caps.name("mark") {
        return Some(format!("<mark>{}</mark>", escape_html(mark.as_str())));
    }
    if caps.name("percent").is_some() || caps.name("num").is_some() {
        return render_progress(caps);
    }
    let url = caps.name("url")?;
    if in_link {
        return None;
    }
    let url = escape_html(url.as_str());
    Some(format!(r#"<a href="{url}">{url}</a>"#))
}

fn render_progress(caps: &Captures<'_>) -> Option<String> {
    let number = |name: &str| caps.name(name)?.as_str().parse::<f64>().ok();
    let percent = match number("percent") {
        Some(percent) => percent,
        None => {
            let den = number("den")?;
            if den == 0.0 {
                0.0
            } else {
                number("num")? / den * 100.0
            }
        }
    };
    let percent = percent.clamp(0.0, 100.0);
    // Bars are styled in steps of 20%
    let level = (percent / 20.0).floor() as u32 * 20;
    let label = caps.name("label").map_or("", |m| m.as_str());
    Some(format!(
        r#"<div class="progress progress-{level}plus"><div class="progress-bar" style="width:{percent:.2}%"><p class="progress-label">{}</p></div></div>"#,
        escape_html(label)
    ))
}

fn render_keys(keys: &str) -> String {
    let rendered: Vec<String> = keys
        .split('+')
        .map(|key| {
            format!(
                r#"<kbd class="key-{}">{}</kbd>"#,
                escape_html(&key.to_lowercase()),
                escape_html(key)
            )
        })
        .collect();
    format!(
        r#"<span class="keys">{}</span>"#,
        rendered.join("<span>+</span>")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulldown_cmark::{html, Parser};

    fn render(markdown: &str) -> String {
        let events = Parser::new(markdown).map(Event::into_static).collect();
        let events = InlineTransformer::new().transform(events);
        let mut out = String::new();
        html::push_html(&mut out, events.into_iter());
        out
    }

    #[test]
    fn test_keys() {
        let out = render("Press ++ctrl+alt+del++ now");
        assert!(out.contains(
            r#"<span class="keys"><kbd class="key-ctrl">ctrl</kbd><span>+</span><kbd class="key-alt">alt</kbd><span>+</span><kbd class="key-del">del</kbd></span>"#
        ));
        assert!(out.contains("Press "));
        assert!(out.contains(" now"));
    }

    #[test]
    fn test_mark() {
        assert!(render("a ==highlighted bit== b").contains("<mark>highlighted bit</mark>"));
        assert!(!render("x == y").contains("<mark>"));
    }

    #[test]
    fn test_magic_link() {
        let out = render("See https://example.com/docs.");
        assert!(out.contains(r#"<a href="https://example.com/docs">https://example.com/docs</a>."#));
    }

    #[test]
    fn test_existing_link_not_relinked() {
        let out = render("[https://example.com](https://example.com)");
        assert_eq!(out.matches("<a ").count(), 1);
    }

    #[test]
    fn test_progress_bar_fraction() {
        let out = render("[=3/4]");
        assert!(out.contains(r#"<div class="progress progress-60plus"><div class="progress-bar" style="width:75.00%"><p class="progress-label"></p></div></div>"#));
    }

    #[test]
    fn test_progress_bar_clamped() {
        let out = render(r#"[=120% "Over"] and [=1/0]"#);
        assert!(out.contains(r#"progress-100plus"><div class="progress-bar" style="width:100.00%"><p class="progress-label">Over</p>"#));
        assert!(out.contains(r#"progress-0plus"><div class="progress-bar" style="width:0.00%">"#));
    }

    #[test]
    fn test_code_untouched() {
        let out = render("```\n++ctrl++ https://example.com\n```\n\n`==x==`");
        assert!(!out.contains("<kbd"));
        assert!(!out.contains("<a "));
        assert!(!out.contains("<mark>"));
    }
}
