//! Abstract Syntax Tree types for group and template files

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Root AST node of a `.stg` file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupFile {
    /// `delimiters "X", "Y"` header, start and stop as written
    pub delimiters: Option<Spanned<(String, String)>>,
    /// `import "path"` lines in declaration order
    pub imports: Vec<Spanned<String>>,
    pub definitions: Vec<Spanned<Definition>>,
}

/// A named definition inside a group file
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Template(TemplateDef),
    Dictionary(DictionaryDef),
}

impl Definition {
    pub fn name(&self) -> &Spanned<String> {
        match self {
            Definition::Template(t) => &t.name,
            Definition::Dictionary(d) => &d.name,
        }
    }
}

/// `name(args) ::= body`
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDef {
    pub name: Spanned<String>,
    pub args: Vec<FormalArg>,
    pub body: Spanned<String>,
}

/// `name` or `name = "default"` inside a template's parameter list
#[derive(Debug, Clone, PartialEq)]
pub struct FormalArg {
    pub name: Spanned<String>,
    pub default: Option<Spanned<String>>,
}

/// `name ::= [ "key" : "value", default : "value" ]`
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryDef {
    pub name: Spanned<String>,
    pub entries: Vec<(Spanned<String>, Spanned<String>)>,
    pub default: Option<Spanned<String>>,
}

/// One entry of a dictionary literal, as parsed
#[derive(Debug, Clone, PartialEq)]
pub enum DictEntry {
    Pair(Spanned<String>, Spanned<String>),
    Default(Spanned<String>),
}

impl DictionaryDef {
    /// Build from parsed entries; a later `default` replaces an earlier one
    pub fn from_entries(name: Spanned<String>, entries: Vec<DictEntry>) -> Self {
        let mut pairs = Vec::new();
        let mut default = None;
        for entry in entries {
            match entry {
                DictEntry::Pair(k, v) => pairs.push((k, v)),
                DictEntry::Default(v) => default = Some(v),
            }
        }
        Self {
            name,
            entries: pairs,
            default,
        }
    }
}
