//! Integration tests for directory group resolution

use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use template_groups::{
    Chunk, CollectingListener, Delimiters, Diagnostic, Encoding, GroupOptions, SyntaxKind,
    TemplateGroup,
};

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

fn group_with_listener(root: &Path) -> (TemplateGroup, Arc<CollectingListener>) {
    let listener = Arc::new(CollectingListener::new());
    let group = TemplateGroup::directory(
        root,
        GroupOptions::default().with_listener(listener.clone()),
    )
    .expect("root exists");
    (group, listener)
}

#[test]
fn test_group_file_wins_over_template_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "util.stg", r#"header() ::= "from util.stg""#);
    write(dir.path(), "util/header.st", r#"header() ::= "from header.st""#);
    let (group, listener) = group_with_listener(dir.path());

    let header = group.lookup("util/header").expect("Should resolve");
    assert_eq!(header.body_source(), "from util.stg");
    assert!(header.source.ends_with("util.stg"));
    assert!(listener.is_empty());
}

#[test]
fn test_group_file_names_resolve_without_template_files() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "util.stg",
        r#"
        header(title) ::= "<h1><title></h1>"
        footer() ::= "bye"
        "#,
    );
    write(dir.path(), "util/header.st", r#"header() ::= "loose""#);
    // Reading this file would report a syntax error
    write(dir.path(), "util/footer.st", "footer( ::= ");
    let (group, listener) = group_with_listener(dir.path());

    let header = group.lookup("util/header").expect("header in util.stg");
    assert_eq!(header.argument_names(), vec!["title"]);
    let footer = group.lookup("util/footer").expect("footer in util.stg");
    assert_eq!(footer.body_source(), "bye");
    assert!(listener.is_empty(), "{:?}", listener.diagnostics());
    assert_eq!(group.template_names(), vec!["util/footer", "util/header"]);
}

#[test]
fn test_template_file_when_no_group_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "widgets/button.st", r#"button(label) ::= "[<label>]""#);
    let (group, listener) = group_with_listener(dir.path());

    let button = group.lookup("widgets/button").expect("Should resolve");
    assert_eq!(button.name, "widgets/button");
    assert_eq!(button.leaf_name(), "button");
    assert_eq!(button.prefix(), "widgets");
    assert_eq!(
        button.chunks,
        vec![
            Chunk::Text("[".to_string()),
            Chunk::Expr("label".to_string()),
            Chunk::Text("]".to_string()),
        ]
    );
    assert!(button.source.ends_with("button.st"));
    assert!(listener.is_empty());
}

#[test]
fn test_cached_instance_survives_artifact_removal() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "widgets/button.st", r#"button() ::= "b""#);
    let (group, _listener) = group_with_listener(dir.path());

    let first = group.lookup("widgets/button").unwrap();
    std::fs::remove_file(dir.path().join("widgets/button.st")).unwrap();
    let second = group.lookup("/widgets/button").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_falls_through_to_imports() {
    let root = TempDir::new().unwrap();
    let shared = TempDir::new().unwrap();
    write(root.path(), "local.st", r#"local() ::= "mine""#);
    write(shared.path(), "common.st", r#"common() ::= "shared""#);
    write(shared.path(), "local.st", r#"local() ::= "theirs""#);

    let (group, listener) = group_with_listener(root.path());
    let imported = TemplateGroup::directory(shared.path(), GroupOptions::default()).unwrap();
    assert!(group.add_import(Arc::new(imported)));

    assert_eq!(group.lookup("common").unwrap().body_source(), "shared");
    assert_eq!(group.lookup("local").unwrap().body_source(), "mine");
    assert!(group.lookup("nowhere").is_none());
    assert!(group.lookup("deep/nowhere").is_none());
    assert!(listener.is_empty());
}

#[test]
fn test_malformed_body_does_not_block_other_templates() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "broken.stg",
        r#"
        x() ::= "<oops"
        y() ::= "fine"
        "#,
    );
    let (group, listener) = group_with_listener(dir.path());

    assert_eq!(group.lookup("broken/y").unwrap().body_source(), "fine");
    assert!(group.lookup("broken/x").is_none());

    let errors = listener.syntax_errors();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        Diagnostic::Syntax {
            kind,
            artifact,
            errors,
            ..
        } => {
            assert_eq!(*kind, SyntaxKind::Group);
            assert!(artifact.ends_with("broken.stg"));
            assert!(errors[0].message().contains("unterminated expression"));
        }
        other => panic!("Expected syntax diagnostic, got {:?}", other),
    }
}

#[test]
fn test_malformed_definition_does_not_block_other_templates() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "broken.stg",
        r#"
        x( ::= "no closing paren"
        y() ::= "fine"
        "#,
    );
    let (group, listener) = group_with_listener(dir.path());

    assert!(group.lookup("broken/y").is_some());
    assert!(group.lookup("broken/x").is_none());
    assert_eq!(listener.syntax_errors().len(), 1);
}

#[test]
fn test_broken_template_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "bad.st", "bad() ::= ");
    let (group, listener) = group_with_listener(dir.path());

    assert!(group.lookup("bad").is_none());
    assert!(group.lookup("bad").is_none());
    assert_eq!(listener.syntax_errors().len(), 1);
}

#[test]
fn test_illegal_name_is_internal_error() {
    let dir = TempDir::new().unwrap();
    let (group, listener) = group_with_listener(dir.path());

    assert!(group.lookup("a*b/c").is_none());
    assert!(group.lookup("ok").is_none());
    let internal = listener.internal_errors();
    assert_eq!(internal.len(), 1);
    assert!(internal[0].to_string().contains("illegal character"));
    assert!(listener.syntax_errors().is_empty());
}

#[test]
fn test_empty_segment_does_not_claim_template_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/b.st", r#"b() ::= "b""#);
    let (group, listener) = group_with_listener(dir.path());

    assert!(group.lookup("a//b").is_none());
    let internal = listener.internal_errors();
    assert_eq!(internal.len(), 1);
    assert!(internal[0].to_string().contains("empty name segment"));

    assert_eq!(group.lookup("a/b").unwrap().body_source(), "b");
    assert_eq!(group.template_names(), vec!["a/b"]);
    assert_eq!(listener.internal_errors().len(), 1);
}

#[test]
fn test_unreadable_group_file_hides_loose_files() {
    let dir = TempDir::new().unwrap();
    // A directory where util.stg should be fails to read as a file
    std::fs::create_dir_all(dir.path().join("util.stg")).unwrap();
    write(dir.path(), "util/x.st", r#"x() ::= "loose""#);
    let (group, listener) = group_with_listener(dir.path());

    assert!(group.lookup("util/x").is_none());
    let internal = listener.internal_errors();
    assert_eq!(internal.len(), 1, "{:?}", listener.diagnostics());
    assert!(internal[0].to_string().contains("util.stg"));

    assert!(group.lookup("util/y").is_none());
    assert!(group.lookup("util/x").is_none());
    assert_eq!(listener.internal_errors().len(), 1);
    assert!(listener.syntax_errors().is_empty());
    assert!(group.template_names().is_empty());
}

#[test]
fn test_template_file_registered_under_file_name() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "widgets/icon.st", r#"image() ::= "icon""#);
    let (group, listener) = group_with_listener(dir.path());

    let icon = group.lookup("widgets/icon").expect("registered under file name");
    assert_eq!(icon.name, "widgets/icon");
    assert!(group.lookup("widgets/image").is_none());

    let errors = listener.syntax_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("defines 'image'"));
}

#[test]
fn test_imports_declared_in_group_files() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "app.stg",
        r#"
        import "lib/common.stg"
        import "vendor"
        main() ::= "main"
        "#,
    );
    write(dir.path(), "lib/common.stg", r#"shared() ::= "common""#);
    write(dir.path(), "vendor/widget.st", r#"widget() ::= "vendored""#);
    let (group, listener) = group_with_listener(dir.path());

    assert!(group.lookup("app/main").is_some());
    assert_eq!(group.imports().len(), 2);
    assert_eq!(group.imports()[0].name(), "common");
    assert_eq!(group.lookup("shared").unwrap().body_source(), "common");
    assert_eq!(group.lookup("widget").unwrap().body_source(), "vendored");
    assert!(listener.is_empty(), "{:?}", listener.diagnostics());
}

#[test]
fn test_cyclic_group_file_imports_terminate() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.stg", "import \"b.stg\"\nx() ::= \"a\"");
    write(dir.path(), "b.stg", "import \"a.stg\"\ny() ::= \"b\"");

    let group = TemplateGroup::file(dir.path().join("a.stg"), GroupOptions::default()).unwrap();
    assert_eq!(group.lookup("y").unwrap().body_source(), "b");
    assert!(group.lookup("z").is_none());
}

#[test]
fn test_group_file_delimiters_override() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "html.stg",
        r##"
        delimiters "$", "#"
        bold(x) ::= "<b>$x#</b>"
        "##,
    );
    let (group, _listener) = group_with_listener(dir.path());

    let bold = group.lookup("html/bold").unwrap();
    assert_eq!(
        bold.expressions().collect::<Vec<_>>(),
        vec!["x"],
        "angle brackets are literal text under $#"
    );
    assert_eq!(bold.delimiters.map(|d| d.to_string()).as_deref(), Some("$#"));
}

#[test]
fn test_group_delimiters_used_for_printing() {
    let group = TemplateGroup::from_source(
        "mem",
        r##"t(x) ::= "a <b> $x#""##,
        GroupOptions::default().with_delimiters(Delimiters::new('$', '#').unwrap()),
    );
    let t = group.lookup("t").unwrap();
    assert_eq!(t.expressions().collect::<Vec<_>>(), vec!["x"]);
    assert_eq!(t.delimiters, None);
    assert_eq!(t.to_string(), r##"t(x) ::= "a <b> $x#""##);
}

#[test]
fn test_encoding() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("cafe.st"), b"cafe() ::= \"caf\xe9\"").unwrap();

    let latin1 = TemplateGroup::directory(
        dir.path(),
        GroupOptions::default().with_encoding(Encoding::Latin1),
    )
    .unwrap();
    assert_eq!(latin1.lookup("cafe").unwrap().body_source(), "café");

    let (utf8, listener) = group_with_listener(dir.path());
    assert!(utf8.lookup("cafe").is_none());
    assert!(listener.internal_errors()[0].to_string().contains("can't decode"));
}

#[test]
fn test_missing_root_rejected() {
    let dir = TempDir::new().unwrap();
    let err = TemplateGroup::directory(dir.path().join("absent"), GroupOptions::default())
        .unwrap_err();
    assert!(err.to_string().contains("no such directory"));
}

#[test]
fn test_printed_form() {
    let group = TemplateGroup::from_source(
        "mem",
        r#"row(cells, sep = ", ") ::= "<cells; separator=sep>""#,
        GroupOptions::default(),
    );
    let row = group.lookup("row").unwrap();
    insta::assert_snapshot!(row.to_string(), @r#"row(cells, sep=", ") ::= "<cells; separator=sep>""#);
}
