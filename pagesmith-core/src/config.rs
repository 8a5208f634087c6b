//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Main configuration struct matching the pagesmith.yml schema.
///
/// Keys other than the recognized ones are kept in `extra` and are available
/// to constant substitution and template bindings under their own names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub root_folder: PathBuf,
    pub output_folder: PathBuf,

    #[serde(default)]
    pub base_url: String,

    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default)]
    pub includes: Vec<PathBuf>,

    #[serde(default)]
    pub extensions: Vec<String>,

    /// Date of the run (`YYYY-MM-DD`), stamped when the config is constructed.
    #[serde(default)]
    pub generation_time: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_protocol() -> String {
    String::from("https://")
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

impl Config {
    /// Build a config in memory, stamping the generation time.
    pub fn new(root_folder: impl Into<PathBuf>, output_folder: impl Into<PathBuf>) -> Self {
        Self {
            root_folder: root_folder.into(),
            output_folder: output_folder.into(),
            base_url: String::new(),
            protocol: default_protocol(),
            includes: Vec::new(),
            extensions: Vec::new(),
            generation_time: today(),
            extra: BTreeMap::new(),
            config_path: None,
        }
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(contents)?;
        config.generation_time = today();
        Ok(config)
    }

    /// Source tree, resolved relative to the config file
    pub fn root_dir(&self) -> PathBuf {
        self.resolve_path(&self.root_folder)
    }

    /// Output tree, resolved relative to the config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.output_folder)
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.config_path.as_deref().and_then(Path::parent) {
            Some(parent) => parent.join(path),
            None => path.to_path_buf(),
        }
    }

    /// Look up any top-level key, recognized or not
    pub fn get(&self, key: &str) -> Option<Value> {
        self.constants().remove(key)
    }

    /// Set a top-level key as it would be written in YAML.
    ///
    /// Recognized keys (`baseUrl`, `includes`, ...) update their field and
    /// must have the matching type; anything else is a pass-through key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), ConfigError> {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            "rootFolder" => self.root_folder = serde_yaml::from_value(value)?,
            "outputFolder" => self.output_folder = serde_yaml::from_value(value)?,
            "baseUrl" => self.base_url = serde_yaml::from_value(value)?,
            "protocol" => self.protocol = serde_yaml::from_value(value)?,
            "includes" => self.includes = serde_yaml::from_value(value)?,
            "extensions" => self.extensions = serde_yaml::from_value(value)?,
            "generationTime" => self.generation_time = serde_yaml::from_value(value)?,
            _ => {
                self.extra.insert(key, value);
            }
        }
        Ok(())
    }

    /// Flat view of the whole config, keyed the way it is written in YAML.
    pub fn constants(&self) -> BTreeMap<String, Value> {
        match serde_yaml::to_value(self) {
            Ok(Value::Mapping(map)) => map
                .into_iter()
                .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v)))
                .collect(),
            _ => BTreeMap::new(),
        }
    }
}
