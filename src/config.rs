//! TOML configuration for building a directory group
//!
//! ```toml
//! name = "site"
//! root = "templates"
//! delimiters = "$#"
//! encoding = "latin-1"
//! imports = ["shared", "lib/common.stg"]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::error::GroupError;
use crate::group::{GroupOptions, TemplateGroup};
use crate::name;
use crate::resource::{Encoding, ResourceRoot};
use crate::template::Delimiters;

/// Errors that can occur loading a group configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read group config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse group config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error(transparent)]
    Group(#[from] GroupError),
}

fn default_delimiters() -> String {
    Delimiters::default().to_string()
}

/// Where a group lives and how its files are read
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    /// Group name; defaults to the root path
    #[serde(default)]
    pub name: Option<String>,
    pub root: PathBuf,
    #[serde(default = "default_delimiters")]
    pub delimiters: String,
    #[serde(default)]
    pub encoding: Encoding,
    /// Directories or `.stg` files searched after the root, in order
    #[serde(default)]
    pub imports: Vec<PathBuf>,
}

impl GroupConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            root: root.into(),
            delimiters: default_delimiters(),
            encoding: Encoding::default(),
            imports: Vec::new(),
        }
    }

    /// Load from a TOML file; relative paths resolve against its directory
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.root = base.join(&config.root);
            config.imports = config
                .imports
                .iter()
                .map(|import| base.join(import))
                .collect();
        }
        Ok(config)
    }

    /// Parse from TOML text; paths are kept as written
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_delimiters(mut self, delimiters: impl Into<String>) -> Self {
        self.delimiters = delimiters.into();
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_import(mut self, import: impl Into<PathBuf>) -> Self {
        self.imports.push(import.into());
        self
    }

    /// Apply this configuration's delimiters and encoding to `base`
    pub fn options(&self, base: GroupOptions) -> Result<GroupOptions, ConfigError> {
        let delimiters = Delimiters::parse(&self.delimiters)?;
        Ok(base.with_delimiters(delimiters).with_encoding(self.encoding))
    }

    /// Build the root group with its imports attached
    pub fn build(&self, base: GroupOptions) -> Result<TemplateGroup, ConfigError> {
        let options = self.options(base)?;
        if !self.root.is_dir() {
            return Err(GroupError::NoSuchDirectory {
                name: self.root.display().to_string(),
            }
            .into());
        }
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| self.root.display().to_string());
        let group = TemplateGroup::directory_at(
            name,
            ResourceRoot::Filesystem(self.root.clone()),
            options.clone(),
        );

        for import in &self.imports {
            let is_group_file = import
                .extension()
                .is_some_and(|ext| ext == name::GROUP_FILE_EXTENSION);
            let imported = if is_group_file {
                TemplateGroup::file(import, options.clone())?
            } else {
                TemplateGroup::directory(import, options.clone())?
            };
            group.add_import(Arc::new(imported));
        }
        Ok(group)
    }
}
