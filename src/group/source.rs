//! Groups parsed from in-memory text

use std::sync::atomic::{AtomicU64, Ordering};

use super::loading::load_group_source;
use super::{LoadSession, TemplateLoader};

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Group file text held in memory; `import` lines are not supported
#[derive(Debug)]
pub struct SourceLoader {
    id: u64,
    name: String,
    source: String,
}

impl SourceLoader {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            source: source.into(),
        }
    }

    fn label(&self) -> String {
        format!("<{}>", self.name)
    }
}

impl TemplateLoader for SourceLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn file_name(&self) -> Option<String> {
        None
    }

    fn origin(&self) -> String {
        format!("source:{}#{}", self.name, self.id)
    }

    fn load(&self, _name: &str, session: &mut LoadSession<'_>) {
        let label = self.label();
        if session.mark_seen(&label) {
            load_group_source(session, "", &label, &self.source, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingListener;
    use crate::group::{GroupOptions, TemplateGroup};
    use std::sync::Arc;

    #[test]
    fn test_same_name_sources_are_distinct_origins() {
        let a = SourceLoader::new("mem", "");
        let b = SourceLoader::new("mem", "");
        assert_ne!(a.origin(), b.origin());
    }

    #[test]
    fn test_import_without_root_is_reported() {
        let listener = Arc::new(CollectingListener::new());
        let group = TemplateGroup::from_source(
            "mem",
            "import \"shared\"\na() ::= \"x\"",
            GroupOptions::default().with_listener(listener.clone()),
        );
        assert!(group.lookup("a").is_some());
        assert!(group.imports().is_empty());
        assert!(listener.internal_errors()[0]
            .to_string()
            .contains("needs a storage root"));
    }
}
