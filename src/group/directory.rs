//! Directory-backed groups
//!
//! For a name `a/b/c` the directory loader first looks for the group file
//! `a/b.stg`. If it exists it is parsed, and whatever it defines is all the
//! prefix `a/b` will ever hold. Only when no group file exists is the loose
//! template file `a/b/c.st` tried.

use tracing::{debug, trace};

use super::loading::{load_group_source, load_template_source};
use super::{Fetched, LoadSession, TemplateLoader};
use crate::name;
use crate::resource::{Location, ResourceRoot};

/// Resolves names against a directory tree of `.stg` and `.st` files
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    name: String,
    root: ResourceRoot,
}

impl DirectoryLoader {
    pub fn new(name: impl Into<String>, root: ResourceRoot) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    fn locate(&self, relative: &str, session: &LoadSession<'_>) -> Option<Location> {
        match self.root.join(relative) {
            Ok(location) => Some(location),
            Err(err) => {
                session.errors().group_error(&self.name, &err);
                None
            }
        }
    }
}

impl TemplateLoader for DirectoryLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn file_name(&self) -> Option<String> {
        self.root.file_name()
    }

    fn origin(&self) -> String {
        format!("dir:{}", self.root.label())
    }

    fn load(&self, name: &str, session: &mut LoadSession<'_>) {
        let prefix = name::prefix_of(name);
        let leaf = name::leaf_of(name);

        if !prefix.is_empty() {
            let Some(group_file) = self.locate(&name::group_file_path(prefix), session) else {
                return;
            };
            let label = group_file.label();
            if session.is_seen(&label) {
                trace!(artifact = %label, template = name, "group file already loaded");
                return;
            }
            match session.fetch(&group_file) {
                Fetched::Source(source) => {
                    session.mark_seen(&label);
                    debug!(artifact = %label, prefix, "found group file");
                    load_group_source(session, prefix, &label, &source, Some(&self.root));
                    return;
                }
                Fetched::Failed => {
                    session.mark_seen(&label);
                    return;
                }
                Fetched::Absent => trace!(artifact = %label, "no group file"),
            }
        }

        let Some(template_file) = self.locate(&name::template_file_path(prefix, leaf), session)
        else {
            return;
        };
        let label = template_file.label();
        if session.is_seen(&label) {
            return;
        }
        match session.fetch(&template_file) {
            Fetched::Source(source) => {
                session.mark_seen(&label);
                load_template_source(session, prefix, leaf, &label, &source);
            }
            Fetched::Failed => {
                session.mark_seen(&label);
            }
            Fetched::Absent => trace!(artifact = %label, "no template file"),
        }
    }
}
