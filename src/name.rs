//! Splitting and joining namespaced template names
//!
//! Names are `/`-separated paths such as `util/header`. A single leading `/`
//! is accepted and ignored, so `/util/header` and `util/header` name the same
//! template.

/// Segment separator in qualified template names
pub const SEPARATOR: char = '/';

/// Extension of multi-template group files
pub const GROUP_FILE_EXTENSION: &str = "stg";

/// Extension of single-template files
pub const TEMPLATE_FILE_EXTENSION: &str = "st";

/// Strip the optional leading separator from a name
pub fn normalize(name: &str) -> &str {
    name.strip_prefix(SEPARATOR).unwrap_or(name)
}

/// All segments before the final one, or `""` if the name has only one
pub fn prefix_of(name: &str) -> &str {
    let name = normalize(name);
    match name.rfind(SEPARATOR) {
        Some(idx) => &name[..idx],
        None => "",
    }
}

/// The final segment of a name
pub fn leaf_of(name: &str) -> &str {
    let name = normalize(name);
    match name.rfind(SEPARATOR) {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Check that every segment of a normalized name is a usable path segment
pub fn validate(name: &str) -> Result<(), String> {
    for segment in normalize(name).split(SEPARATOR) {
        match segment {
            "" => return Err("empty name segment".to_string()),
            "." | ".." => return Err(format!("relative segment '{}'", segment)),
            _ => {}
        }
    }
    Ok(())
}

/// Combine a namespace prefix and a leaf name into a qualified name
pub fn qualify(prefix: &str, leaf: &str) -> String {
    let prefix = normalize(prefix);
    if prefix.is_empty() {
        leaf.to_string()
    } else {
        format!("{}{}{}", prefix, SEPARATOR, leaf)
    }
}

/// Join namespace segments into a relative storage path, skipping empty ones
pub fn join_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .map(|s| s.trim_matches(SEPARATOR))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Relative path of the group file that may define templates under `prefix`
pub fn group_file_path(prefix: &str) -> String {
    format!("{}.{}", normalize(prefix), GROUP_FILE_EXTENSION)
}

/// Relative path of the loose template file for `leaf` under `prefix`
pub fn template_file_path(prefix: &str, leaf: &str) -> String {
    let file = format!("{}.{}", leaf, TEMPLATE_FILE_EXTENSION);
    join_segments([prefix, file.as_str()])
}

/// File name without its final extension
pub fn file_stem(file_name: &str) -> &str {
    let leaf = leaf_of(file_name);
    match leaf.rfind('.') {
        Some(idx) if idx > 0 => &leaf[..idx],
        _ => leaf,
    }
}
