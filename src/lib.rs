//! Template Groups - name resolution and loading for StringTemplate-style groups
//!
//! A template group maps namespaced names such as `util/header` to compiled
//! templates. Directory groups find them in `.stg` group files or `.st`
//! template files below a root, load each artifact once, and fall back to
//! imported groups for names they don't define.
//!
//! # Example
//!
//! ```rust
//! use template_groups::{GroupOptions, TemplateGroup};
//!
//! let group = TemplateGroup::from_source(
//!     "page",
//!     r#"
//!     header(title) ::= "<h1><title></h1>"
//!     footer() ::= "bye"
//!     "#,
//!     GroupOptions::default(),
//! );
//!
//! let header = group.lookup("header").unwrap();
//! assert_eq!(header.to_string(), r#"header(title) ::= "<h1><title></h1>""#);
//! assert!(group.lookup("missing").is_none());
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod group;
pub mod name;
pub mod parser;
pub mod resource;
pub mod template;

pub use config::{ConfigError, GroupConfig};
pub use diagnostics::{
    CollectingListener, Diagnostic, ErrorListener, ErrorManager, SyntaxKind, TracingListener,
};
pub use error::{GroupError, ParseError};
pub use group::{
    DirectoryLoader, Fetched, GroupFileLoader, GroupOptions, LoadSession, SourceLoader,
    TemplateGroup, TemplateLoader,
};
pub use resource::{Bundle, Encoding, Location, ResourceRoot};
pub use template::{Chunk, CompiledTemplate, Delimiters, Dictionary, FormalArgument};
