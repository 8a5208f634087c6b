//! Build orchestration: from a source tree to a written site.

use crate::config::Config;
use crate::constants::inject_into_record;
use crate::document::{read_documents, DocumentError};
use crate::extension::{ExtensionError, ExtensionRegistry, ExtensionRunner, Hook};
use crate::markdown::{Converted, MarkdownConverter};
use crate::models::{Meta, SourceRecord, OPTIONAL_META_KEYS};
use crate::route::{write_record, RouteError};
use crate::snapshot::{write_snapshot, SnapshotError};
use crate::templates::{bind, TemplateError, TemplateRenderer};
use serde_yaml::Value;
use std::fs;
use std::io;
use std::iter;
use std::path::{Path, PathBuf};
use tera::Context;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Extension(#[from] ExtensionError),

    #[error("No template for {0:?}: set `template` or add a sibling .html file")]
    MissingTemplate(PathBuf),

    #[error("Template {0:?} does not exist")]
    TemplateReadFailure(PathBuf),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Failed to render {path:?}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl GenerateError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| GenerateError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn walk(root: &Path) -> impl FnOnce(walkdir::Error) -> Self + '_ {
        move |err| GenerateError::Io {
            path: err.path().unwrap_or(root).to_path_buf(),
            source: err.into(),
        }
    }
}

/// The converter and renderer of a run, shared with extensions so pages they
/// synthesize go through the same machinery.
#[derive(Debug, Clone, Default)]
pub struct PipelineHandle {
    converter: MarkdownConverter,
    renderer: TemplateRenderer,
}

impl PipelineHandle {
    /// Handle without pre-loaded templates
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle whose renderer knows every template under `root` outside `excluded`
    pub fn from_root(root: &Path, excluded: &[PathBuf]) -> Result<Self, TemplateError> {
        Ok(Self {
            converter: MarkdownConverter::new(),
            renderer: TemplateRenderer::from_root(root, excluded)?,
        })
    }

    pub fn convert(&self, markdown: &str) -> Converted {
        self.converter.convert(markdown)
    }

    pub fn render(
        &self,
        name: &str,
        template: &str,
        bindings: &Context,
    ) -> Result<String, TemplateError> {
        self.renderer.render(name, template, bindings)
    }
}

/// Runs the whole build for one config.
///
/// Stages run in a fixed order and each finishes for every page before the
/// next starts:
///
/// 1. clean the output folder and copy includes
/// 2. read documents, then `on_generation_start`
/// 3. substitute constants, then `preprocessing`
/// 4. convert and render twice, then `postprocessing`
/// 5. write pages, then `on_generation_end`
/// 6. save the `pages.json` snapshot
pub struct Generator {
    config: Config,
    registry: ExtensionRegistry,
    files: Vec<SourceRecord>,
}

impl Generator {
    /// Generator using the built-in extensions
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, ExtensionRegistry::builtin())
    }

    pub fn with_registry(config: Config, registry: ExtensionRegistry) -> Self {
        Self {
            config,
            registry,
            files: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Records of the last run
    pub fn files(&self) -> &[SourceRecord] {
        &self.files
    }

    pub fn into_files(self) -> Vec<SourceRecord> {
        self.files
    }

    /// Build the site, returning the final records.
    pub fn generate(&mut self) -> Result<&[SourceRecord], GenerateError> {
        let root = self.config.root_dir();
        let output = self.config.output_dir();
        tracing::info!("Generating site from {:?} into {:?}", root, output);

        let mut runner = self.registry.resolve(&self.config.extensions)?;
        if !runner.is_empty() {
            tracing::info!("Extensions: {}", runner.names().join(", "));
        }
        let excluded: Vec<PathBuf> = self
            .config
            .includes
            .iter()
            .map(|include| root.join(include))
            .chain(iter::once(output.clone()))
            .collect();
        let pipeline = PipelineHandle::from_root(&root, &excluded)?;

        clean_output(&output)?;
        copy_includes(&root, &output, &self.config.includes)?;

        self.files = read_documents(&root)?;
        self.run_hook(&mut runner, &pipeline, Hook::GenerationStart)?;

        self.inject_constants();
        self.run_hook(&mut runner, &pipeline, Hook::Preprocessing)?;

        self.convert_and_render(&pipeline, &root)?;
        self.run_hook(&mut runner, &pipeline, Hook::Postprocessing)?;

        self.write_pages(&output)?;
        self.run_hook(&mut runner, &pipeline, Hook::GenerationEnd)?;

        write_snapshot(&output, &self.files)?;
        tracing::info!("Generated {} pages", self.files.len());

        Ok(&self.files)
    }

    fn run_hook(
        &mut self,
        runner: &mut ExtensionRunner,
        pipeline: &PipelineHandle,
        hook: Hook,
    ) -> Result<(), GenerateError> {
        runner.run(hook, pipeline, &mut self.config, &mut self.files)?;
        Ok(())
    }

    fn inject_constants(&mut self) {
        let constants = self.config.constants();
        for record in &mut self.files {
            inject_into_record(&constants, record);
        }
    }

    fn convert_and_render(
        &mut self,
        pipeline: &PipelineHandle,
        root: &Path,
    ) -> Result<(), GenerateError> {
        for record in &mut self.files {
            let converted = pipeline.convert(&record.content);
            record.meta.insert(
                "toc".to_string(),
                serde_yaml::to_value(&converted.toc).unwrap_or_default(),
            );

            let template_path = select_template(record, root)?;
            let template =
                fs::read_to_string(&template_path).map_err(GenerateError::io(&template_path))?;
            let name = template_path.display().to_string();
            let render_err = |source| GenerateError::Render {
                path: record.filename.clone(),
                source,
            };

            let meta = template_meta(&record.meta);

            let mut bindings = Context::new();
            bind(&mut bindings, "body", &converted.html).map_err(render_err)?;
            bind(&mut bindings, "config", &self.config).map_err(render_err)?;
            bind(&mut bindings, "meta", &meta).map_err(render_err)?;
            let first = pipeline
                .render(&name, &template, &bindings)
                .map_err(render_err)?;

            // Second pass resolves template text that the first pass produced
            bindings.remove("body");
            let second = pipeline
                .render(&name, &first, &bindings)
                .map_err(render_err)?;

            record.content = second;
        }
        Ok(())
    }

    fn write_pages(&mut self, output: &Path) -> Result<(), GenerateError> {
        for record in &mut self.files {
            write_record(record, &self.config.base_url, output)?;
        }
        Ok(())
    }
}

/// Page metadata as templates see it: optional keys the page leaves out are
/// bound as null so `{{ meta.author }}` renders empty instead of failing.
fn template_meta(meta: &Meta) -> Meta {
    let mut meta = meta.clone();
    for key in OPTIONAL_META_KEYS {
        meta.entry(key.to_string()).or_insert(Value::Null);
    }
    meta
}

/// Template for a record: its `template` key (relative to `root`) or the
/// `.html` file next to the source.
pub fn select_template(record: &SourceRecord, root: &Path) -> Result<PathBuf, GenerateError> {
    if let Some(template) = record.template() {
        let path = root.join(template);
        if !path.is_file() {
            return Err(GenerateError::TemplateReadFailure(path));
        }
        return Ok(path);
    }

    let sibling = record.sibling_template();
    if sibling.is_file() {
        Ok(sibling)
    } else {
        Err(GenerateError::MissingTemplate(record.filename.clone()))
    }
}

/// Remove the output folder if present and recreate it empty.
pub fn clean_output(output: &Path) -> Result<(), GenerateError> {
    match fs::remove_dir_all(output) {
        Ok(()) => tracing::debug!("Removed {:?}", output),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(GenerateError::io(output)(e)),
    }
    fs::create_dir_all(output).map_err(GenerateError::io(output))
}

/// Mirror each include (file or folder, relative to `root`) into `output`.
pub fn copy_includes(root: &Path, output: &Path, includes: &[PathBuf]) -> Result<(), GenerateError> {
    for include in includes {
        let src = root.join(include);
        let dest = output.join(include);

        if src.is_dir() {
            if dest.exists() {
                tracing::warn!("Replacing existing copy of {:?}", include);
                fs::remove_dir_all(&dest).map_err(GenerateError::io(&dest))?;
            }
            copy_dir(&src, &dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(GenerateError::io(parent))?;
            }
            fs::copy(&src, &dest).map_err(GenerateError::io(&src))?;
        }
        tracing::debug!("Copied include {:?}", include);
    }
    Ok(())
}

fn copy_dir(src: &Path, dest: &Path) -> Result<(), GenerateError> {
    fs::create_dir_all(dest).map_err(GenerateError::io(dest))?;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(GenerateError::walk(src))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(GenerateError::io(parent))?;
        }
        fs::copy(entry.path(), &target).map_err(GenerateError::io(entry.path()))?;
    }
    Ok(())
}
