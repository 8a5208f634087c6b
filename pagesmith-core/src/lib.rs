//! # pagesmith-core
//!
//! Core library for the pagesmith static site generator.
//!
//! This crate reads Markdown documents with YAML metadata, substitutes
//! config constants, converts and renders them through Tera templates in two
//! passes, and writes each page to its declared route. Extensions hook into
//! four points of that pipeline.

pub mod config;
pub mod constants;
pub mod document;
pub mod extension;
pub mod extensions;
pub mod generator;
pub mod markdown;
pub mod models;
pub mod route;
pub mod snapshot;
pub mod templates;

pub use config::{Config, ConfigError};
pub use document::DocumentError;
pub use extension::{Extension, ExtensionError, ExtensionRegistry, Hook};
pub use generator::{GenerateError, Generator, PipelineHandle};
pub use markdown::{MarkdownConverter, TocEntry};
pub use models::{Meta, SourceRecord};
pub use templates::{TemplateError, TemplateRenderer};
