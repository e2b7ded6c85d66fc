//! Syntax tree for the subset of Go the generator reads: the package clause
//! and every type declaration. Other declarations are skipped by the parser.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct GoFile {
    pub package: String,
    pub types:   Vec<TypeSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
}

/// One `Name Type` entry of a `type` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub name:        String,
    pub line:        usize,
    pub column:      usize,
    pub doc:         Option<String>,
    pub is_alias:    bool,
    /// Raw text of `[T any]` on generic declarations.
    pub type_params: Option<String>,
    pub ty:          TypeExpr,
}

impl TypeSpec {
    pub fn is_generic(&self) -> bool {
        self.type_params.is_some()
    }

    pub fn struct_fields(&self) -> Option<&[FieldDecl]> {
        match &self.ty {
            TypeExpr::Struct(fields) if !self.is_generic() => Some(fields),
            _ => None,
        }
    }
}

/// One line of a struct body. `names` is empty for embedded members.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub names:  Vec<Ident>,
    pub ty:     TypeExpr,
    pub doc:    Option<String>,
    pub line:   usize,
    pub column: usize,
}

impl FieldDecl {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Named { package: Option<String>, name: String },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Array { len: String, elem: Box<TypeExpr> },
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    Chan(Box<TypeExpr>),
    Func,
    Interface,
    Struct(Vec<FieldDecl>),
    Generic { base: Box<TypeExpr>, args: Vec<TypeExpr> },
    Paren(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn named(name: &str) -> TypeExpr {
        TypeExpr::Named { package: None, name: name.to_string() }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeExpr::Named { .. }   => "named type",
            TypeExpr::Pointer(_)     => "pointer",
            TypeExpr::Slice(_)       => "slice",
            TypeExpr::Array { .. }   => "array",
            TypeExpr::Map { .. }     => "map",
            TypeExpr::Chan(_)        => "channel",
            TypeExpr::Func           => "function",
            TypeExpr::Interface      => "interface",
            TypeExpr::Struct(_)      => "anonymous struct",
            TypeExpr::Generic { .. } => "generic instantiation",
            TypeExpr::Paren(_)       => "parenthesized type",
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named { package: Some(pkg), name } => write!(f, "{}.{}", pkg, name),
            TypeExpr::Named { package: None, name } => write!(f, "{}", name),
            TypeExpr::Pointer(inner) => write!(f, "*{}", inner),
            TypeExpr::Slice(inner) => write!(f, "[]{}", inner),
            TypeExpr::Array { len, elem } => write!(f, "[{}]{}", len, elem),
            TypeExpr::Map { key, value } => write!(f, "map[{}]{}", key, value),
            TypeExpr::Chan(inner) => write!(f, "chan {}", inner),
            TypeExpr::Func => write!(f, "func(...)"),
            TypeExpr::Interface => write!(f, "interface{{...}}"),
            TypeExpr::Struct(_) => write!(f, "struct{{...}}"),
            TypeExpr::Generic { base, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}[{}]", base, args.join(", "))
            }
            TypeExpr::Paren(inner) => write!(f, "({})", inner),
        }
    }
}
