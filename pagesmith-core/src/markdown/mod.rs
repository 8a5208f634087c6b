//! Markdown to HTML conversion with the extensions the site templates expect.

pub mod abbr;
pub mod attr_list;
pub mod details;
pub mod inline;
pub mod math;
pub mod preprocess;
pub mod toc;

use preprocess::Preprocessed;
use pulldown_cmark::{html, Event, Options, Parser};

pub use inline::InlineTransformer;
pub use toc::{slugify, TocEntry};

/// Class added to every rendered `<table>`.
pub const TABLE_CLASS: &str = "table table-striped table-hover";

/// Result of converting one document body.
#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

/// Markdown processor with custom extensions
#[derive(Debug, Clone)]
pub struct MarkdownConverter {
    options: Options,
}

impl MarkdownConverter {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        options.insert(Options::ENABLE_DEFINITION_LIST);
        options.insert(Options::ENABLE_SUPERSCRIPT);
        options.insert(Options::ENABLE_SUBSCRIPT);
        options.insert(Options::ENABLE_MATH);

        Self { options }
    }

    /// Convert markdown to HTML, returning the body and its table of contents.
    ///
    /// Fenced code keeps its `language-*` class for client-side highlighting.
    pub fn convert(&self, markdown: &str) -> Converted {
        let Preprocessed {
            markdown: source,
            abbreviations,
        } = preprocess::preprocess(&details::expand_details(markdown));

        let events: Vec<Event<'static>> = Parser::new_ext(&source, self.options)
            .map(Event::into_static)
            .collect();

        let (events, toc) = toc::attach_heading_ids(events);
        let events = math::render_math(events);
        let events = attr_list::apply_attr_lists(events);
        let events = InlineTransformer::new().transform(events);
        let events = abbr::apply_abbreviations(events, &abbreviations);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Converted {
            html: postprocess_tables(&html_output),
            toc,
        }
    }
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Style tables for the site theme.
///
/// Adds [`TABLE_CLASS`] to bare `<table>` tags and turns legacy `align`
/// attributes on header cells into inline `text-align` styles.
pub fn postprocess_tables(html: &str) -> String {
    html.replace("<table>", &format!(r#"<table class="{TABLE_CLASS}">"#))
        .replace(r#"th align="center""#, r#"th style="text-align: center""#)
        .replace(r#"th align="right""#, r#"th style="text-align: right""#)
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
