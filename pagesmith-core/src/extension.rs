//! Extension hooks and the registry that instantiates them.
//!
//! An extension implements any subset of the four lifecycle hooks of
//! [`Extension`]; the rest default to no-ops. Extensions are looked up by
//! identifier in an [`ExtensionRegistry`] once per run, in the order the
//! config lists them, and every hook point calls them strictly in that order.

use crate::config::Config;
use crate::extensions;
use crate::generator::PipelineHandle;
use crate::models::SourceRecord;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtensionError {
    #[error("Unknown extension: {0}")]
    UnknownExtension(String),

    #[error("Extension '{extension}' failed in {hook}: {source}")]
    Hook {
        extension: String,
        hook: Hook,
        #[source]
        source: anyhow::Error,
    },
}

/// The four points in a build where extensions run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Before constant substitution; the file list may still grow or shrink
    GenerationStart,
    /// After constant substitution, on raw markup
    Preprocessing,
    /// After both render passes, on final HTML
    Postprocessing,
    /// After every page is on disk
    GenerationEnd,
}

impl Hook {
    pub const ALL: [Hook; 4] = [
        Hook::GenerationStart,
        Hook::Preprocessing,
        Hook::Postprocessing,
        Hook::GenerationEnd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::GenerationStart => "on_generation_start",
            Hook::Preprocessing => "preprocessing",
            Hook::Postprocessing => "postprocessing",
            Hook::GenerationEnd => "on_generation_end",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle hooks an extension may implement.
///
/// Every hook gets the pipeline (for converting or rendering extra content),
/// the run's config, and the file list. Only `on_generation_start` may change
/// the number of files; later hooks get a slice.
pub trait Extension {
    fn on_generation_start(
        &mut self,
        _pipeline: &PipelineHandle,
        _config: &mut Config,
        _files: &mut Vec<SourceRecord>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn preprocessing(
        &mut self,
        _pipeline: &PipelineHandle,
        _config: &mut Config,
        _files: &mut [SourceRecord],
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn postprocessing(
        &mut self,
        _pipeline: &PipelineHandle,
        _config: &mut Config,
        _files: &mut [SourceRecord],
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_generation_end(
        &mut self,
        _pipeline: &PipelineHandle,
        _config: &mut Config,
        _files: &mut [SourceRecord],
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

type Factory = Box<dyn Fn() -> Box<dyn Extension>>;

/// Identifier to extension factory mapping.
pub struct ExtensionRegistry {
    factories: BTreeMap<String, Factory>,
}

impl ExtensionRegistry {
    /// Registry with nothing registered
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the extensions shipped in this crate
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        extensions::register_builtins(&mut registry);
        registry
    }

    /// Register (or replace) the factory for `id`
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Extension> + 'static,
    {
        self.factories.insert(id.into(), Box::new(factory));
    }

    /// Registered identifiers, sorted
    pub fn available(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Fresh instances for `ids`, in the given order
    pub fn resolve(&self, ids: &[String]) -> Result<ExtensionRunner, ExtensionError> {
        let mut extensions = Vec::with_capacity(ids.len());
        for id in ids {
            let factory = self
                .factories
                .get(id)
                .ok_or_else(|| ExtensionError::UnknownExtension(id.clone()))?;
            extensions.push((id.clone(), factory()));
        }
        Ok(ExtensionRunner { extensions })
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// The resolved extensions of one run.
pub struct ExtensionRunner {
    extensions: Vec<(String, Box<dyn Extension>)>,
}

impl ExtensionRunner {
    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Call `hook` on every extension in order; the first failure stops the run.
    pub fn run(
        &mut self,
        hook: Hook,
        pipeline: &PipelineHandle,
        config: &mut Config,
        files: &mut Vec<SourceRecord>,
    ) -> Result<(), ExtensionError> {
        for (id, extension) in &mut self.extensions {
            tracing::debug!(extension = %id, %hook, "Running extension hook");
            let result = match hook {
                Hook::GenerationStart => extension.on_generation_start(pipeline, config, files),
                Hook::Preprocessing => extension.preprocessing(pipeline, config, files),
                Hook::Postprocessing => extension.postprocessing(pipeline, config, files),
                Hook::GenerationEnd => extension.on_generation_end(pipeline, config, files),
            };
            result.map_err(|source| ExtensionError::Hook {
                extension: id.clone(),
                hook,
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
    }

    impl Recorder {
        fn record(&self, hook: Hook) {
            self.log.borrow_mut().push(format!("{}:{}", hook, self.name));
        }
    }

    impl Extension for Recorder {
        fn on_generation_start(
            &mut self,
            _: &PipelineHandle,
            _: &mut Config,
            _: &mut Vec<SourceRecord>,
        ) -> anyhow::Result<()> {
            self.record(Hook::GenerationStart);
            Ok(())
        }

        fn postprocessing(
            &mut self,
            _: &PipelineHandle,
            _: &mut Config,
            _: &mut [SourceRecord],
        ) -> anyhow::Result<()> {
            self.record(Hook::Postprocessing);
            Ok(())
        }
    }

    struct Failing;

    impl Extension for Failing {
        fn preprocessing(
            &mut self,
            _: &PipelineHandle,
            _: &mut Config,
            _: &mut [SourceRecord],
        ) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    fn registry(log: &Log) -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::empty();
        for name in ["a", "b"] {
            let log = log.clone();
            registry.register(name, move || {
                Box::new(Recorder {
                    name,
                    log: log.clone(),
                })
            });
        }
        registry.register("fail", || Box::new(Failing));
        registry
    }

    #[test]
    fn test_hooks_run_in_configured_order() {
        let log: Log = Rc::default();
        let mut runner = registry(&log)
            .resolve(&["b".to_string(), "a".to_string()])
            .unwrap();
        let pipeline = PipelineHandle::new();
        let mut config = Config::new("site", "public");
        let mut files = Vec::new();

        for hook in Hook::ALL {
            runner.run(hook, &pipeline, &mut config, &mut files).unwrap();
        }

        assert_eq!(
            *log.borrow(),
            vec![
                "on_generation_start:b",
                "on_generation_start:a",
                "postprocessing:b",
                "postprocessing:a",
            ]
        );
    }

    #[test]
    fn test_failure_stops_remaining_extensions() {
        let log: Log = Rc::default();
        let mut runner = registry(&log)
            .resolve(&["fail".to_string(), "a".to_string()])
            .unwrap();
        let pipeline = PipelineHandle::new();
        let mut config = Config::new("site", "public");

        runner
            .run(Hook::Postprocessing, &pipeline, &mut config, &mut Vec::new())
            .unwrap();
        let err = runner
            .run(Hook::Preprocessing, &pipeline, &mut config, &mut Vec::new())
            .unwrap_err();

        match err {
            ExtensionError::Hook {
                extension, hook, ..
            } => {
                assert_eq!(extension, "fail");
                assert_eq!(hook, Hook::Preprocessing);
            }
            other => panic!("Expected hook error, got {other:?}"),
        }
        assert_eq!(*log.borrow(), vec!["postprocessing:a"]);
    }

    #[test]
    fn test_unknown_extension() {
        let err = ExtensionRegistry::empty()
            .resolve(&["missing".to_string()])
            .err()
            .unwrap();
        assert!(matches!(err, ExtensionError::UnknownExtension(id) if id == "missing"));
    }

    #[test]
    fn test_builtins_registered() {
        let registry = ExtensionRegistry::builtin();
        assert_eq!(registry.available(), vec!["drafts", "reading_time", "sitemap"]);
    }
}
