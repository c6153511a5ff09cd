//! Template groups: namespaces of compiled templates
//!
//! A [`TemplateGroup`] owns a cache of compiled templates and an ordered list
//! of imported groups. On a cache miss it asks its [`TemplateLoader`] to find
//! and parse whatever artifact could define the name, then re-checks the
//! cache. Names that are still missing are searched for in the imports, in
//! the order they were added.
//!
//! # Example
//!
//! ```
//! use template_groups::{GroupOptions, TemplateGroup};
//!
//! let group = TemplateGroup::from_source(
//!     "greetings",
//!     r#"hello(name) ::= "Hello, <name>!""#,
//!     GroupOptions::default(),
//! );
//! let hello = group.lookup("hello").expect("defined");
//! assert_eq!(hello.argument_names(), vec!["name"]);
//! ```

mod directory;
mod file;
mod loading;
mod source;

pub use directory::DirectoryLoader;
pub use file::GroupFileLoader;
pub use source::SourceLoader;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::diagnostics::{ErrorListener, ErrorManager, TracingListener};
use crate::error::GroupError;
use crate::name;
use crate::resource::{Bundle, Encoding, Location, ResourceRoot};
use crate::template::{CompiledTemplate, Delimiters, Dictionary};

/// Settings shared by a group and the groups it imports from its files
#[derive(Clone)]
pub struct GroupOptions {
    delimiters: Delimiters,
    encoding: Encoding,
    listener: Arc<dyn ErrorListener>,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            encoding: Encoding::default(),
            listener: Arc::new(TracingListener),
        }
    }
}

impl GroupOptions {
    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Send diagnostics somewhere other than the `tracing` log
    pub fn with_listener(mut self, listener: Arc<dyn ErrorListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn delimiters(&self) -> Delimiters {
        self.delimiters
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl fmt::Debug for GroupOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupOptions")
            .field("delimiters", &self.delimiters)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

/// Strategy that finds and parses the artifact defining a name
///
/// Loaders register what they parse through the [`LoadSession`]; the group
/// decides afterwards whether the requested name was satisfied.
pub trait TemplateLoader: Send + Sync {
    /// Human-facing name of the group
    fn name(&self) -> &str;

    /// Last path segment of the backing storage, if it has one
    fn file_name(&self) -> Option<String>;

    /// Identity of the backing storage
    ///
    /// Two groups with the same origin are treated as the same group when
    /// deduplicating imports and breaking import cycles.
    fn origin(&self) -> String;

    /// Try to define `name` (already normalized) in the session's group
    fn load(&self, name: &str, session: &mut LoadSession<'_>);
}

/// Result of reading an artifact through a [`LoadSession`]
#[derive(Debug)]
pub enum Fetched {
    Source(String),
    /// Nothing at the location
    Absent,
    /// The artifact exists but could not be read or decoded; already reported
    Failed,
}

/// Access a loader has to its group while the group's load lock is held
pub struct LoadSession<'a> {
    group: &'a TemplateGroup,
    artifacts: &'a mut HashSet<String>,
}

impl<'a> LoadSession<'a> {
    pub fn group(&self) -> &'a TemplateGroup {
        self.group
    }

    pub fn errors(&self) -> &'a ErrorManager {
        &self.group.errors
    }

    /// Whether the artifact has already been read by this group
    pub fn is_seen(&self, artifact: &str) -> bool {
        self.artifacts.contains(artifact)
    }

    /// Remember an artifact as read; returns `false` if it already was
    pub fn mark_seen(&mut self, artifact: &str) -> bool {
        self.artifacts.insert(artifact.to_string())
    }

    /// Open and decode an artifact with the group's encoding
    pub fn fetch(&self, location: &Location) -> Fetched {
        use crate::resource::OpenError;

        match location.open() {
            Ok(bytes) => match self.group.encoding().decode(bytes) {
                Some(text) => Fetched::Source(text),
                None => {
                    self.errors().group_error(
                        self.group.name(),
                        &GroupError::Decode {
                            location: location.label(),
                            encoding: self.group.encoding().label().to_string(),
                        },
                    );
                    Fetched::Failed
                }
            },
            Err(OpenError::NotFound) => Fetched::Absent,
            Err(OpenError::Io(source)) => {
                self.errors().group_error(
                    self.group.name(),
                    &GroupError::Io {
                        location: location.label(),
                        source,
                    },
                );
                Fetched::Failed
            }
        }
    }

    /// Register a compiled template, reporting conflicting redefinitions
    pub fn register(&mut self, template: CompiledTemplate) -> Option<Arc<CompiledTemplate>> {
        match self.group.register_compiled(template) {
            Ok(template) => Some(template),
            Err(err) => {
                self.errors().group_error(self.group.name(), &err);
                None
            }
        }
    }

    pub fn register_dictionary(&mut self, dictionary: Dictionary) {
        if let Err(err) = self.group.register_dictionary(dictionary) {
            self.errors().group_error(self.group.name(), &err);
        }
    }

    /// Append an import declared by a loaded artifact
    pub fn import(&mut self, group: TemplateGroup) {
        self.group.add_import(Arc::new(group));
    }
}

/// A namespace of compiled templates with an import search order
pub struct TemplateGroup {
    options: GroupOptions,
    errors: ErrorManager,
    loader: Box<dyn TemplateLoader>,
    templates: DashMap<String, Arc<CompiledTemplate>>,
    dictionaries: RwLock<HashMap<String, Arc<Dictionary>>>,
    /// Names the loader was asked for and could not define
    misses: DashSet<String>,
    imports: RwLock<Vec<Arc<TemplateGroup>>>,
    /// Load lock; also records every artifact already read
    artifacts: Mutex<HashSet<String>>,
}

impl TemplateGroup {
    /// A group backed by a custom loader
    pub fn with_loader(loader: impl TemplateLoader + 'static, options: GroupOptions) -> Self {
        let errors = ErrorManager::new(options.listener.clone());
        Self {
            options,
            errors,
            loader: Box::new(loader),
            templates: DashMap::new(),
            dictionaries: RwLock::new(HashMap::new()),
            misses: DashSet::new(),
            imports: RwLock::new(Vec::new()),
            artifacts: Mutex::new(HashSet::new()),
        }
    }

    /// A group rooted at a filesystem directory, which must exist
    pub fn directory(path: impl AsRef<Path>, options: GroupOptions) -> Result<Self, GroupError> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(GroupError::NoSuchDirectory {
                name: path.display().to_string(),
            });
        }
        Ok(Self::directory_at(
            path.display().to_string(),
            ResourceRoot::Filesystem(path.to_path_buf()),
            options,
        ))
    }

    /// A group rooted at `dir_name` on disk, or inside `bundle` if the
    /// directory does not exist on disk
    pub fn locate_directory(
        dir_name: &str,
        bundle: Option<&'static Bundle>,
        options: GroupOptions,
    ) -> Result<Self, GroupError> {
        let root = ResourceRoot::locate(dir_name, bundle)?;
        debug!(group = dir_name, root = %root.label(), "located template directory");
        Ok(Self::directory_at(dir_name, root, options))
    }

    /// A group rooted at `base` inside an embedded bundle
    pub fn embedded_directory(
        bundle: &'static Bundle,
        base: &str,
        options: GroupOptions,
    ) -> Result<Self, GroupError> {
        let root = ResourceRoot::embedded(bundle, base)?;
        Ok(Self::directory_at(base, root, options))
    }

    /// A directory group over an already resolved root
    pub fn directory_at(
        name: impl Into<String>,
        root: ResourceRoot,
        options: GroupOptions,
    ) -> Self {
        Self::with_loader(DirectoryLoader::new(name, root), options)
    }

    /// A group defined by a single `.stg` file on disk, which must exist
    pub fn file(path: impl AsRef<Path>, options: GroupOptions) -> Result<Self, GroupError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(GroupError::Io {
                location: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such group file"),
            });
        }
        Ok(Self::file_at(
            Location::Filesystem(path.to_path_buf()),
            options,
        ))
    }

    /// A group file group; the file is read on first lookup
    pub fn file_at(location: Location, options: GroupOptions) -> Self {
        Self::with_loader(GroupFileLoader::new(location), options)
    }

    /// A group parsed from in-memory group file text
    pub fn from_source(
        name: impl Into<String>,
        source: impl Into<String>,
        options: GroupOptions,
    ) -> Self {
        Self::with_loader(SourceLoader::new(name, source), options)
    }

    /// Resolve `name` here or in an import
    ///
    /// Once a name resolves, every later lookup returns the same instance.
    pub fn lookup(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
        let name = name::normalize(name);
        if !self.check_name(name) {
            return None;
        }
        let mut visited = HashSet::new();
        self.lookup_visiting(name, &mut visited)
    }

    /// Report names that cannot map onto storage
    fn check_name(&self, name: &str) -> bool {
        match name::validate(name) {
            Ok(()) => true,
            Err(reason) => {
                self.errors
                    .group_error(self.name(), &GroupError::invalid_name(name, reason));
                false
            }
        }
    }

    fn lookup_visiting(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
    ) -> Option<Arc<CompiledTemplate>> {
        if !visited.insert(self.origin()) {
            trace!(group = %self.name(), template = name, "already searched");
            return None;
        }
        if let Some(template) = self.lookup_local(name) {
            return Some(template);
        }

        let imports = self.imports.read().clone();
        for import in imports {
            if let Some(template) = import.lookup_visiting(name, visited) {
                debug!(
                    group = %self.name(),
                    import = %import.name(),
                    template = name,
                    "resolved through import"
                );
                return Some(template);
            }
        }
        None
    }

    /// Resolve `name` in this group only, loading on first request
    fn lookup_local(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
        if let Some(template) = self.cached(name) {
            trace!(group = %self.name(), template = name, "cache hit");
            return Some(template);
        }
        if self.misses.contains(name) {
            return None;
        }

        let mut artifacts = self.artifacts.lock();
        // Another caller may have loaded it while we waited
        if let Some(template) = self.cached(name) {
            return Some(template);
        }
        if self.misses.contains(name) {
            return None;
        }

        debug!(group = %self.name(), template = name, "loading");
        let mut session = LoadSession {
            group: self,
            artifacts: &mut artifacts,
        };
        self.loader.load(name, &mut session);

        match self.cached(name) {
            Some(template) => Some(template),
            None => {
                debug!(group = %self.name(), template = name, "not defined locally");
                self.misses.insert(name.to_string());
                None
            }
        }
    }

    fn cached(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
        self.templates.get(name).map(|entry| entry.value().clone())
    }

    /// Add a template to the cache under its qualified name
    ///
    /// Registering an identical template again returns the cached instance.
    pub fn register_compiled(
        &self,
        template: CompiledTemplate,
    ) -> Result<Arc<CompiledTemplate>, GroupError> {
        let name = template.name.clone();
        let template = match self.templates.entry(name.clone()) {
            Entry::Occupied(entry) => {
                let existing = entry.get();
                if **existing == template {
                    return Ok(existing.clone());
                }
                return Err(GroupError::DuplicateDefinition {
                    name,
                    existing: existing.source.clone(),
                });
            }
            Entry::Vacant(slot) => slot.insert(Arc::new(template)).value().clone(),
        };

        self.misses.remove(&name);
        trace!(group = %self.name(), template = %name, "registered");
        Ok(template)
    }

    pub fn register_dictionary(&self, dictionary: Dictionary) -> Result<(), GroupError> {
        let mut dictionaries = self.dictionaries.write();
        if let Some(existing) = dictionaries.get(&dictionary.name) {
            if **existing == dictionary {
                return Ok(());
            }
            return Err(GroupError::DuplicateDefinition {
                name: dictionary.name,
                existing: existing.source.clone(),
            });
        }
        dictionaries.insert(dictionary.name.clone(), Arc::new(dictionary));
        Ok(())
    }

    /// Find a dictionary here or in an import
    ///
    /// Loads the artifact for the dictionary's prefix if nothing under that
    /// name is known yet.
    pub fn dictionary(&self, name: &str) -> Option<Arc<Dictionary>> {
        let name = name::normalize(name);
        if !self.check_name(name) {
            return None;
        }
        let mut visited = HashSet::new();
        self.dictionary_visiting(name, &mut visited)
    }

    fn dictionary_visiting(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
    ) -> Option<Arc<Dictionary>> {
        if !visited.insert(self.origin()) {
            return None;
        }
        let local = || self.dictionaries.read().get(name).cloned();
        if let Some(dictionary) = local() {
            return Some(dictionary);
        }
        if self.lookup_local(name).is_none() {
            if let Some(dictionary) = local() {
                return Some(dictionary);
            }
        }

        let imports = self.imports.read().clone();
        imports
            .iter()
            .find_map(|import| import.dictionary_visiting(name, visited))
    }

    /// Append a group to the search order
    ///
    /// Returns `false` if a group with the same origin is already imported
    /// or the group is this one.
    pub fn add_import(&self, group: Arc<TemplateGroup>) -> bool {
        let origin = group.origin();
        if origin == self.origin() {
            return false;
        }
        let mut imports = self.imports.write();
        if imports.iter().any(|g| g.origin() == origin) {
            return false;
        }
        debug!(group = %self.name(), import = %group.name(), "import added");
        imports.push(group);
        true
    }

    /// Imported groups in search order
    pub fn imports(&self) -> Vec<Arc<TemplateGroup>> {
        self.imports.read().clone()
    }

    /// Names currently in the cache, sorted
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .templates
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn name(&self) -> &str {
        self.loader.name()
    }

    pub fn file_name(&self) -> Option<String> {
        self.loader.file_name()
    }

    pub fn origin(&self) -> String {
        self.loader.origin()
    }

    pub fn delimiters(&self) -> Delimiters {
        self.options.delimiters
    }

    pub fn encoding(&self) -> Encoding {
        self.options.encoding
    }

    pub fn options(&self) -> &GroupOptions {
        &self.options
    }

    pub fn errors(&self) -> &ErrorManager {
        &self.errors
    }
}

impl fmt::Debug for TemplateGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateGroup")
            .field("name", &self.name())
            .field("origin", &self.origin())
            .field("templates", &self.templates.len())
            .field("imports", &self.imports.read().len())
            .finish()
    }
}
