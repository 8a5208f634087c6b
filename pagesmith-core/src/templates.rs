//! Tera-backed page rendering.
//!
//! Page templates are rendered from their text, not by name, so the same
//! entry point serves both render passes. Every HTML file under the root
//! folder is pre-loaded under its root-relative name, which lets a page
//! template `{% extends "layouts/base.html" %}` or include partials.
//!
//! Undefined variables are errors in Tera. The generator binds the optional
//! page keys (`title`, `author`, ...) as null when a page leaves them out, so
//! shared layouts can print them unconditionally.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to scan {path:?} for templates: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to load templates from {path:?}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: tera::Error,
    },

    #[error("Cannot bind `{key}`: {message}")]
    Binding { key: String, message: String },

    #[error("Template rendering failed for {name}: {message}")]
    Render { name: String, message: String },
}

/// Template engine shared by the pipeline and extensions.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Renderer without any named templates
    pub fn new() -> Self {
        let mut tera = Tera::default();
        // Bodies are already HTML
        tera.autoescape_on(vec![]);
        Self { tera }
    }

    /// Renderer with every template under `root` available by name.
    ///
    /// Directories in `excluded` (copied assets, the output folder) and
    /// hidden directories are not scanned.
    pub fn from_root(root: &Path, excluded: &[PathBuf]) -> Result<Self, TemplateError> {
        let mut renderer = Self::new();
        let mut named: Vec<(PathBuf, Option<String>)> = Vec::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e) && !excluded.iter().any(|x| e.path() == x));
        for entry in walker {
            let entry = entry.map_err(|source| TemplateError::Walk {
                path: root.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file()
                || entry.path().extension().and_then(|ext| ext.to_str()) != Some("html")
            {
                continue;
            }
            let name = template_name(root, entry.path());
            named.push((entry.into_path(), Some(name)));
        }
        tracing::debug!("Loading {} templates from {:?}", named.len(), root);

        renderer
            .tera
            .add_template_files(
                named
                    .iter()
                    .map(|(path, name)| (path.as_path(), name.as_deref()))
                    .collect::<Vec<_>>(),
            )
            .map_err(|source| TemplateError::Load {
                path: root.to_path_buf(),
                source,
            })?;

        Ok(renderer)
    }

    /// Names of the pre-loaded templates
    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tera.get_template_names().collect();
        names.sort_unstable();
        names
    }

    /// Render `template` text with `bindings`.
    ///
    /// `name` only identifies the template in error messages.
    pub fn render(
        &self,
        name: &str,
        template: &str,
        bindings: &Context,
    ) -> Result<String, TemplateError> {
        // render_str registers a temporary template, so work on a copy
        let mut tera = self.tera.clone();
        tera.render_str(template, bindings)
            .map_err(|e| TemplateError::Render {
                name: name.to_string(),
                message: error_chain(&e),
            })
    }
}

/// Insert `value` under `key`, reporting values Tera cannot represent
/// (such as mappings with null keys) instead of panicking.
pub fn bind<T: Serialize + ?Sized>(
    bindings: &mut Context,
    key: &str,
    value: &T,
) -> Result<(), TemplateError> {
    bindings
        .try_insert(key, value)
        .map_err(|e| TemplateError::Binding {
            key: key.to_string(),
            message: error_chain(&e),
        })
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn template_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Flatten a tera error and its causes into one line
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}
