//! Collapsible blocks.
//!
//! ```text
//! ??? note "Click to expand"
//!     Indented **markdown** body.
//! ```
//!
//! becomes a `<details class="note">` element; `???+` renders it open. This
//! runs on the raw text before parsing, so the body is still parsed as
//! Markdown.

use super::escape_html;
use super::preprocess::fence_marker;
use regex::Regex;
use std::sync::OnceLock;

static HEADER_REGEX: OnceLock<Regex> = OnceLock::new();

fn header_regex() -> &'static Regex {
    HEADER_REGEX.get_or_init(|| {
        Regex::new(r#"^\?\?\?(?P<open>\+)?(?:[ \t]+(?P<class>[\w\- ]*?))?(?:[ \t]*"(?P<title>[^"]*)")?[ \t]*$"#)
            .unwrap()
    })
}

pub fn expand_details(markdown: &str) -> String {
    if !markdown.contains("???") {
        return markdown.to_string();
    }

    let lines: Vec<&str> = markdown.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut fence: Option<&str> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(marker) = fence {
            if line.trim_start().starts_with(marker) {
                fence = None;
            }
            out.push(line.to_string());
            i += 1;
            continue;
        }
        if let Some(marker) = fence_marker(line) {
            fence = Some(marker);
            out.push(line.to_string());
            i += 1;
            continue;
        }

        let Some(caps) = header_regex().captures(line) else {
            out.push(line.to_string());
            i += 1;
            continue;
        };

        let mut body: Vec<&str> = Vec::new();
        let mut end = i + 1;
        while end < lines.len() {
            let candidate = lines[end];
            if candidate.trim().is_empty() {
                body.push("");
            } else if let Some(stripped) = candidate
                .strip_prefix("    ")
                .or_else(|| candidate.strip_prefix('\t'))
            {
                body.push(stripped);
            } else {
                break;
            }
            end += 1;
        }
        // Trailing blank lines belong to the surrounding document
        while body.last() == Some(&"") {
            body.pop();
            end -= 1;
        }

        let class = caps
            .name("class")
            .map(|m| m.as_str().trim())
            .filter(|c| !c.is_empty());
        let title = caps
            .name("title")
            .map(|m| m.as_str().to_string())
            .or_else(|| class.map(capitalize))
            .unwrap_or_else(|| "Details".to_string());

        out.push(render_details(
            class,
            &title,
            caps.name("open").is_some(),
            &expand_details(&body.join("\n")),
        ));
        i = end;
    }

    let mut result = out.join("\n");
    if markdown.ends_with('\n') {
        result.push('\n');
    }
    result
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn render_details(class: Option<&str>, title: &str, open: bool, body: &str) -> String {
    let class_attr = class
        .map(|c| format!(" class=\"{}\"", escape_html(c)))
        .unwrap_or_default();
    let open_attr = if open { " open" } else { "" };
    format!(
        "<details{class_attr}{open_attr}>\n<summary>{}</summary>\n\n{body}\n\n</details>\n",
        escape_html(title)
    )
}
