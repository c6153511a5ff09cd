//! Concurrent lookups against a shared group

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use template_groups::{
    name, Chunk, CompiledTemplate, Delimiters, GroupOptions, LoadSession, TemplateGroup,
    TemplateLoader,
};

/// Defines every requested name, slowly, counting how often it is asked
struct CountingLoader {
    loads: Arc<AtomicUsize>,
}

impl TemplateLoader for CountingLoader {
    fn name(&self) -> &str {
        "counting"
    }

    fn file_name(&self) -> Option<String> {
        None
    }

    fn origin(&self) -> String {
        "counting".to_string()
    }

    fn load(&self, requested: &str, session: &mut LoadSession<'_>) {
        self.loads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        session.register(CompiledTemplate {
            name: requested.to_string(),
            formal_args: vec![],
            chunks: vec![Chunk::Text(name::leaf_of(requested).to_string())],
            source: "counting".to_string(),
            delimiters: None,
            compiled_with: Delimiters::default(),
        });
    }
}

#[test]
fn test_concurrent_lookups_load_once() {
    let loads = Arc::new(AtomicUsize::new(0));
    let group = TemplateGroup::with_loader(
        CountingLoader {
            loads: loads.clone(),
        },
        GroupOptions::default(),
    );

    let results: Vec<Arc<CompiledTemplate>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| group.lookup("slow/template")))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().expect("defined by loader"))
            .collect()
    });

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    for result in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], result));
    }
}

#[test]
fn test_each_name_loaded_once_across_threads() {
    let loads = Arc::new(AtomicUsize::new(0));
    let group = TemplateGroup::with_loader(
        CountingLoader {
            loads: loads.clone(),
        },
        GroupOptions::default(),
    );
    let names = ["a", "b", "c/d"];

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for name in names {
                    assert!(group.lookup(name).is_some());
                }
            });
        }
    });

    assert_eq!(loads.load(Ordering::SeqCst), names.len());
}

#[test]
fn test_concurrent_directory_lookups_share_group_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("util.stg"),
        "header() ::= \"h\"\nfooter() ::= \"f\"\n",
    )
    .unwrap();
    let group = TemplateGroup::directory(dir.path(), GroupOptions::default()).unwrap();

    let (headers, footers): (Vec<_>, Vec<_>) = thread::scope(|scope| {
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let group = &group;
                scope.spawn(move || {
                    let name = if i % 2 == 0 { "util/header" } else { "util/footer" };
                    (i % 2 == 0, group.lookup(name).expect("defined in util.stg"))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .partition(|(is_header, _)| *is_header)
    });

    for (_, header) in &headers[1..] {
        assert!(Arc::ptr_eq(&headers[0].1, header));
    }
    for (_, footer) in &footers[1..] {
        assert!(Arc::ptr_eq(&footers[0].1, footer));
    }
}
