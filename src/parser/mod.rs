//! Parser for group files (`.stg`) and template files (`.st`)

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use grammar::{parse_group_file, parse_template_file};
