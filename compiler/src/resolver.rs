use crate::{
    ast::TypeExpr,
    types::{TypeDescriptor, TypeLayer},
};

/// A type expression with no descriptor form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsupported {
    pub kind: &'static str,
}

/// Strips pointer and container wrappers down to the named base type.
pub fn resolve(expr: &TypeExpr) -> Result<TypeDescriptor, Unsupported> {
    let mut layers  = Vec::new();
    let mut current = expr;
    loop {
        match current {
            TypeExpr::Pointer(inner) => {
                layers.push(TypeLayer::Pointer);
                current = &**inner;
            }
            TypeExpr::Slice(inner) => {
                layers.push(TypeLayer::Slice);
                current = &**inner;
            }
            TypeExpr::Array { len, elem } => {
                layers.push(TypeLayer::Array(len.clone()));
                current = &**elem;
            }
            TypeExpr::Paren(inner) => {
                current = &**inner;
            }
            TypeExpr::Named { package, name } => {
                let base_name = match package {
                    Some(pkg) => format!("{}.{}", pkg, name),
                    None => name.clone(),
                };
                return Ok(TypeDescriptor::new(base_name, layers));
            }
            TypeExpr::Map { .. }
            | TypeExpr::Chan(_)
            | TypeExpr::Func
            | TypeExpr::Interface
            | TypeExpr::Struct(_)
            | TypeExpr::Generic { .. } => {
                return Err(Unsupported { kind: current.kind_name() });
            }
        }
    }
}
