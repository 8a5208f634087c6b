//! Math passthrough for client-side MathJax.
//!
//! TeX is left untouched inside `\( \)` / `\[ \]` delimiters and wrapped in
//! an `arithmatex` element the page script looks for.

use super::escape_html;
use pulldown_cmark::{CowStr, Event};

pub fn render_math(events: Vec<Event<'static>>) -> Vec<Event<'static>> {
    events
        .into_iter()
        .map(|event| match event {
            Event::InlineMath(math) => Event::InlineHtml(CowStr::from(wrap_inline_math(&math))),
            Event::DisplayMath(math) => Event::Html(CowStr::from(wrap_display_math(&math))),
            other => other,
        })
        .collect()
}

fn wrap_inline_math(math: &str) -> String {
    format!(r#"<span class="arithmatex">\({}\)</span>"#, escape_html(math))
}

fn wrap_display_math(math: &str) -> String {
    format!(r#"<div class="arithmatex">\[{}\]</div>"#, escape_html(math))
}
