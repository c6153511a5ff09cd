//! Turning fetched artifact text into registered templates

use tracing::debug;

use super::{LoadSession, TemplateGroup};
use crate::diagnostics::SyntaxKind;
use crate::error::ParseError;
use crate::name;
use crate::parser::{self, Definition};
use crate::resource::ResourceRoot;
use crate::template::{CompiledTemplate, Delimiters, Dictionary};

/// Parse a group file and register everything it defines under `prefix`
///
/// Malformed definitions are reported and skipped. `import` lines are
/// resolved against `imports_root`; without one they are reported.
pub(crate) fn load_group_source(
    session: &mut LoadSession<'_>,
    prefix: &str,
    artifact: &str,
    source: &str,
    imports_root: Option<&ResourceRoot>,
) {
    let group = session.group();
    let (file, mut errors) = parser::parse_group_file(source);
    let Some(file) = file else {
        session
            .errors()
            .syntax_error(SyntaxKind::Group, artifact, errors, source);
        return;
    };

    let file_delimiters = match &file.delimiters {
        Some(spanned) => {
            let (start, stop) = &spanned.node;
            match Delimiters::from_strings(start, stop) {
                Ok(delimiters) => Some(delimiters),
                Err(err) => {
                    errors.push(ParseError::syntax(spanned.span.clone(), err.to_string()));
                    None
                }
            }
        }
        None => None,
    };

    for import in &file.imports {
        match imports_root {
            Some(root) => {
                if let Some(imported) = resolve_import(group, root, &import.node) {
                    session.import(imported);
                }
            }
            None => session.errors().internal_error(
                group.name(),
                format!(
                    "{}: import \"{}\" needs a storage root to resolve against",
                    artifact, import.node
                ),
                None,
            ),
        }
    }

    let mut registered = 0usize;
    for definition in &file.definitions {
        match &definition.node {
            Definition::Template(def) => {
                let qualified = name::qualify(prefix, &def.name.node);
                match CompiledTemplate::compile(
                    def,
                    qualified,
                    artifact,
                    group.delimiters(),
                    file_delimiters,
                ) {
                    Ok(template) => {
                        if session.register(template).is_some() {
                            registered += 1;
                        }
                    }
                    Err(err) => errors.push(err),
                }
            }
            Definition::Dictionary(def) => {
                let qualified = name::qualify(prefix, &def.name.node);
                session.register_dictionary(Dictionary::from_def(def, qualified, artifact));
            }
        }
    }

    debug!(
        group = %group.name(),
        artifact,
        registered,
        errors = errors.len(),
        "loaded group file"
    );
    session
        .errors()
        .syntax_error(SyntaxKind::Group, artifact, errors, source);
}

/// Parse a single-template file and register it as `prefix/leaf`
///
/// The template is registered under the name derived from the file's path
/// even if the definition inside the file spells a different name.
pub(crate) fn load_template_source(
    session: &mut LoadSession<'_>,
    prefix: &str,
    leaf: &str,
    artifact: &str,
    source: &str,
) {
    let group = session.group();
    let def = match parser::parse_template_file(source) {
        Ok(def) => def,
        Err(errors) => {
            session
                .errors()
                .syntax_error(SyntaxKind::Template, artifact, errors, source);
            return;
        }
    };

    let mut errors = Vec::new();
    if def.name.node != leaf {
        errors.push(ParseError::syntax(
            def.name.span.clone(),
            format!(
                "template file defines '{}' but is named '{}'",
                def.name.node, leaf
            ),
        ));
    }

    let qualified = name::qualify(prefix, leaf);
    match CompiledTemplate::compile(&def, qualified, artifact, group.delimiters(), None) {
        Ok(template) => {
            debug!(group = %group.name(), template = %template.name, artifact, "loaded template file");
            session.register(template);
        }
        Err(err) => errors.push(err),
    }
    session
        .errors()
        .syntax_error(SyntaxKind::Template, artifact, errors, source);
}

/// Build the group an `import` line refers to
///
/// Paths ending in `.stg` name group files; anything else names a directory.
fn resolve_import(group: &TemplateGroup, root: &ResourceRoot, path: &str) -> Option<TemplateGroup> {
    let path = name::normalize(path);
    let options = group.options().clone();
    let is_group_file = path
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext == name::GROUP_FILE_EXTENSION);
    let resolved = if is_group_file {
        root.join(path)
            .map(|location| TemplateGroup::file_at(location, options))
    } else {
        root.subdirectory(path)
            .map(|subroot| TemplateGroup::directory_at(path, subroot, options))
    };

    match resolved {
        Ok(imported) => {
            debug!(group = %group.name(), import = path, "resolved import");
            Some(imported)
        }
        Err(err) => {
            group.errors().group_error(group.name(), &err);
            None
        }
    }
}
