//! Groups defined by a single `.stg` file

use super::loading::load_group_source;
use super::{Fetched, LoadSession, TemplateLoader};
use crate::name;
use crate::resource::Location;

/// Loads one group file on the first lookup; its templates are top-level names
#[derive(Debug, Clone)]
pub struct GroupFileLoader {
    name: String,
    location: Location,
}

impl GroupFileLoader {
    pub fn new(location: Location) -> Self {
        let name = location
            .file_name()
            .map(|file| name::file_stem(&file).to_string())
            .unwrap_or_else(|| location.label());
        Self { name, location }
    }
}

impl TemplateLoader for GroupFileLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn file_name(&self) -> Option<String> {
        self.location.file_name()
    }

    fn origin(&self) -> String {
        format!("file:{}", self.location.label())
    }

    fn load(&self, _name: &str, session: &mut LoadSession<'_>) {
        let label = self.location.label();
        if !session.mark_seen(&label) {
            return;
        }
        match session.fetch(&self.location) {
            Fetched::Source(source) => {
                let root = self.location.parent();
                load_group_source(session, "", &label, &source, Some(&root));
            }
            Fetched::Absent => session.errors().internal_error(
                &self.name,
                format!("group file {} does not exist", label),
                None,
            ),
            Fetched::Failed => {}
        }
    }
}
