//! Resource resolution: turning relative paths into readable artifacts
//!
//! A [`ResourceRoot`] is either a directory on the filesystem or a directory
//! inside an embedded [`Bundle`] compiled into the binary. The choice is made
//! once, when the root is located; every artifact under it is then opened
//! through the same variant.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use include_dir::Dir;
use serde::Deserialize;

use crate::error::GroupError;

/// A directory tree embedded at compile time with `include_dir!`
pub type Bundle = Dir<'static>;

/// Characters that can never appear in a location segment
const ILLEGAL_CHARS: &[char] = &['\\', ':', '*', '?', '"', '<', '>', '|'];

/// Character encoding of template sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Encoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8", alias = "UTF-8")]
    Utf8,
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl Encoding {
    /// Decode raw bytes, or `None` if they are invalid in this encoding
    pub fn decode(&self, bytes: Vec<u8>) -> Option<String> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes).ok(),
            Encoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "latin-1",
        }
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            other => Err(format!("unsupported encoding '{}'", other)),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why an artifact could not be opened
#[derive(Debug)]
pub enum OpenError {
    /// Nothing exists at the location; expected during resolution
    NotFound,
    /// The artifact may exist but could not be read
    Io(io::Error),
}

/// A fetchable artifact location
#[derive(Clone)]
pub enum Location {
    Filesystem(PathBuf),
    Embedded {
        bundle: &'static Bundle,
        path: PathBuf,
    },
}

impl Location {
    /// Read the artifact's bytes
    pub fn open(&self) -> Result<Vec<u8>, OpenError> {
        match self {
            Location::Filesystem(path) => std::fs::read(path).map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    OpenError::NotFound
                } else {
                    OpenError::Io(e)
                }
            }),
            Location::Embedded { bundle, path } => bundle
                .get_file(path)
                .map(|file| file.contents().to_vec())
                .ok_or(OpenError::NotFound),
        }
    }

    /// Human-readable label, also used as the artifact's identity
    pub fn label(&self) -> String {
        match self {
            Location::Filesystem(path) => path.display().to_string(),
            Location::Embedded { path, .. } => format!("embedded:{}", path.display()),
        }
    }

    /// Last path segment of the location
    pub fn file_name(&self) -> Option<String> {
        let path = match self {
            Location::Filesystem(path) => path,
            Location::Embedded { path, .. } => path,
        };
        path.file_name().map(|n| n.to_string_lossy().into_owned())
    }

    /// The directory containing this location, as a root for relative lookups
    pub fn parent(&self) -> ResourceRoot {
        match self {
            Location::Filesystem(path) => ResourceRoot::Filesystem(
                path.parent().map(Path::to_path_buf).unwrap_or_default(),
            ),
            Location::Embedded { bundle, path } => ResourceRoot::Embedded {
                bundle: *bundle,
                base: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            },
        }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({})", self.label())
    }
}

/// Base of a template namespace
#[derive(Clone)]
pub enum ResourceRoot {
    Filesystem(PathBuf),
    Embedded {
        bundle: &'static Bundle,
        base: PathBuf,
    },
}

impl ResourceRoot {
    /// Find `dir_name` on the filesystem, falling back to the bundle
    ///
    /// The fallback is only consulted when `dir_name` is not an existing
    /// filesystem directory.
    pub fn locate(dir_name: &str, bundle: Option<&'static Bundle>) -> Result<Self, GroupError> {
        let path = Path::new(dir_name);
        if path.is_dir() {
            return Ok(ResourceRoot::Filesystem(path.to_path_buf()));
        }
        if let Some(bundle) = bundle {
            if let Ok(root) = Self::embedded(bundle, dir_name) {
                return Ok(root);
            }
        }
        Err(GroupError::NoSuchDirectory {
            name: dir_name.to_string(),
        })
    }

    /// A directory inside an embedded bundle; `""` names the bundle itself
    pub fn embedded(bundle: &'static Bundle, base: &str) -> Result<Self, GroupError> {
        let base = base.trim_matches('/');
        if base.is_empty() || bundle.get_dir(base).is_some() {
            Ok(ResourceRoot::Embedded {
                bundle,
                base: PathBuf::from(base),
            })
        } else {
            Err(GroupError::NoSuchDirectory {
                name: base.to_string(),
            })
        }
    }

    /// Concatenate the root and a relative path into a fetchable location
    pub fn join(&self, relative: &str) -> Result<Location, GroupError> {
        validate_relative(relative).map_err(|reason| {
            GroupError::invalid_name(format!("{}/{}", self.label(), relative), reason)
        })?;
        Ok(match self {
            ResourceRoot::Filesystem(path) => Location::Filesystem(path.join(relative)),
            ResourceRoot::Embedded { bundle, base } => Location::Embedded {
                bundle: *bundle,
                path: base.join(relative),
            },
        })
    }

    /// A nested root; the directory is not required to exist
    pub fn subdirectory(&self, relative: &str) -> Result<ResourceRoot, GroupError> {
        let relative = relative.trim_end_matches('/');
        validate_relative(relative).map_err(|reason| {
            GroupError::invalid_name(format!("{}/{}", self.label(), relative), reason)
        })?;
        Ok(match self {
            ResourceRoot::Filesystem(path) => ResourceRoot::Filesystem(path.join(relative)),
            ResourceRoot::Embedded { bundle, base } => ResourceRoot::Embedded {
                bundle: *bundle,
                base: base.join(relative),
            },
        })
    }

    pub fn label(&self) -> String {
        match self {
            ResourceRoot::Filesystem(path) => path.display().to_string(),
            ResourceRoot::Embedded { base, .. } => format!("embedded:{}", base.display()),
        }
    }

    /// Last path segment of the root
    pub fn file_name(&self) -> Option<String> {
        match self {
            ResourceRoot::Filesystem(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .or_else(|| {
                    std::fs::canonicalize(path)
                        .ok()
                        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                }),
            ResourceRoot::Embedded { base, .. } => {
                base.file_name().map(|n| n.to_string_lossy().into_owned())
            }
        }
    }
}

impl fmt::Debug for ResourceRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceRoot({})", self.label())
    }
}

/// Check that a relative path can be joined to a root
fn validate_relative(relative: &str) -> Result<(), String> {
    if relative.is_empty() {
        return Err("empty path".to_string());
    }
    for segment in relative.split('/') {
        if segment.is_empty() {
            return Err("empty path segment".to_string());
        }
        if segment == "." || segment == ".." {
            return Err(format!("relative segment '{}'", segment));
        }
        if let Some(c) = segment
            .chars()
            .find(|c| c.is_control() || ILLEGAL_CHARS.contains(c))
        {
            return Err(format!("illegal character {:?}", c));
        }
    }
    Ok(())
}
