use std::collections::BTreeMap;
use serde::Serialize;

use crate::diagnostics::Diagnostic;

/// One wrapper around a field's base type, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeLayer {
    Pointer,
    Slice,
    Array(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDescriptor {
    pub base_name:       String,
    pub pointer_depth:   usize,
    pub container_depth: usize,
    pub layers:          Vec<TypeLayer>,
}

impl TypeDescriptor {
    pub fn new(base_name: impl Into<String>, layers: Vec<TypeLayer>) -> Self {
        let pointer_depth = layers.iter().filter(|l| **l == TypeLayer::Pointer).count();
        TypeDescriptor {
            base_name: base_name.into(),
            pointer_depth,
            container_depth: layers.len() - pointer_depth,
            layers,
        }
    }

    /// The Go spelling of the type, e.g. `[]*Extra`.
    pub fn go_spelling(&self) -> String {
        let mut out = String::new();
        for layer in &self.layers {
            match layer {
                TypeLayer::Pointer => out.push('*'),
                TypeLayer::Slice => out.push_str("[]"),
                TypeLayer::Array(len) => {
                    out.push('[');
                    out.push_str(len);
                    out.push(']');
                }
            }
        }
        out.push_str(&self.base_name);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Primitive {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl Primitive {
    pub fn from_go(name: &str) -> Option<Primitive> {
        let prim = match name {
            "bool" => Primitive::Bool,
            "int8" => Primitive::Int8,
            "int16" => Primitive::Int16,
            "int32" | "rune" => Primitive::Int32,
            "int64" | "int" => Primitive::Int64,
            "uint8" | "byte" => Primitive::UInt8,
            "uint16" => Primitive::UInt16,
            "uint32" => Primitive::UInt32,
            "uint64" | "uint" | "uintptr" => Primitive::UInt64,
            "float32" => Primitive::Float32,
            "float64" => Primitive::Float64,
            _ => return None,
        };
        Some(prim)
    }

    pub fn schema_name(self) -> &'static str {
        match self {
            Primitive::Bool => "Bool",
            Primitive::Int8 => "Int8",
            Primitive::Int16 => "Int16",
            Primitive::Int32 => "Int32",
            Primitive::Int64 => "Int64",
            Primitive::UInt8 => "UInt8",
            Primitive::UInt16 => "UInt16",
            Primitive::UInt32 => "UInt32",
            Primitive::UInt64 => "UInt64",
            Primitive::Float32 => "Float32",
            Primitive::Float64 => "Float64",
        }
    }

    /// The Go type the capn accessors take and return.
    pub fn runtime_type(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int8 => "int8",
            Primitive::Int16 => "int16",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::UInt8 => "uint8",
            Primitive::UInt16 => "uint16",
            Primitive::UInt32 => "uint32",
            Primitive::UInt64 => "uint64",
            Primitive::Float32 => "float32",
            Primitive::Float64 => "float64",
        }
    }

    /// The capn list type holding this primitive.
    pub fn list_type(self) -> String {
        match self {
            Primitive::Bool => "BitList".to_string(),
            other => format!("{}List", other.schema_name()),
        }
    }

    /// The segment method allocating a list of this primitive.
    pub fn list_constructor(self) -> String {
        format!("New{}", self.list_type())
    }
}

/// Names shared by a record and every field that refers to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordNames {
    pub go_name:     String,
    pub schema_name: String,
    pub suffix:      String,
}

impl RecordNames {
    pub fn encoder(&self) -> String {
        format!("{}GoTo{}", self.go_name, self.suffix)
    }

    pub fn decoder(&self) -> String {
        format!("{}ToGo", self.schema_name)
    }

    pub fn constructor(&self) -> String {
        format!("New{}", self.schema_name)
    }

    pub fn list_constructor(&self) -> String {
        format!("New{}List", self.schema_name)
    }

    /// The list type capnpc-go generates for the struct.
    pub fn list_type(&self) -> String {
        format!("{}_List", self.schema_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LayoutClass {
    /// Fixed-width values stored in the struct's data section.
    Scalar,
    /// Values reached through the pointer section.
    Pointer,
}

/// A resolved field type, as both the schema and the translator see it.
/// `go_type` keeps the Go spelling (a named alias such as `Celsius`) so the
/// translator can cast to and from the runtime type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldType {
    Scalar { prim: Primitive, go_type: String },
    Text { go_type: String },
    /// `[]byte`, or `[N]byte` when `array_len` is set.
    Data { array_len: Option<String> },
    Record { names: RecordNames, by_pointer: bool },
    /// One slice or array level around an element, which may itself be a list.
    List { elem: Box<FieldType>, array_len: Option<String> },
}

impl FieldType {
    pub fn schema_type(&self) -> String {
        match self {
            FieldType::Scalar { prim, .. } => prim.schema_name().to_string(),
            FieldType::Text { .. } => "Text".to_string(),
            FieldType::Data { .. } => "Data".to_string(),
            FieldType::Record { names, .. } => names.schema_name.clone(),
            FieldType::List { elem, .. } => format!("List({})", elem.schema_type()),
        }
    }

    pub fn layout_class(&self) -> LayoutClass {
        match self {
            FieldType::Scalar { .. } => LayoutClass::Scalar,
            _ => LayoutClass::Pointer,
        }
    }

    /// The Go spelling of a value of this type.
    pub fn go_type(&self) -> String {
        match self {
            FieldType::Scalar { go_type, .. } | FieldType::Text { go_type } => go_type.clone(),
            FieldType::Data { array_len: None } => "[]byte".to_string(),
            FieldType::Data { array_len: Some(len) } => format!("[{}]byte", len),
            FieldType::Record { names, by_pointer: false } => names.go_name.clone(),
            FieldType::Record { names, by_pointer: true } => format!("*{}", names.go_name),
            FieldType::List { elem, array_len: None } => format!("[]{}", elem.go_type()),
            FieldType::List { elem, array_len: Some(len) } => format!("[{}]{}", len, elem.go_type()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:                String,
    pub schema_name:         String,
    pub descriptor:          TypeDescriptor,
    pub field_type:          FieldType,
    pub order_of_appearance: usize,
    pub final_order:         usize,
    pub is_embedded:         bool,
    /// The comment lines directly above the field's declaration.
    pub doc_comment:         Option<String>,
    pub line:                usize,
    pub column:              usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub names:       RecordNames,
    /// Ordered by `order_of_appearance`.
    pub fields:      Vec<Field>,
    pub doc_comment: Option<String>,
    pub line:        usize,
    pub column:      usize,
}

impl Record {
    pub fn go_name(&self) -> &str {
        &self.names.go_name
    }

    pub fn schema_name(&self) -> &str {
        &self.names.schema_name
    }

    pub fn fields_by_appearance(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.order_of_appearance);
        fields
    }

    pub fn fields_by_final_order(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.final_order);
        fields
    }
}

/// Underlying type of a non-struct declaration such as `type Celsius float64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AliasTarget {
    Scalar(Primitive),
    Text,
}

/// Everything learned from one input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationContext {
    pub package:     String,
    /// In declaration order.
    pub records:     Vec<Record>,
    pub aliases:     BTreeMap<String, AliasTarget>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationContext {
    pub fn record(&self, go_name: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.go_name() == go_name)
    }

    pub fn records_by_name(&self) -> Vec<&Record> {
        let mut records: Vec<&Record> = self.records.iter().collect();
        records.sort_by(|a, b| a.go_name().cmp(b.go_name()));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_depths() {
        let desc = TypeDescriptor::new(
            "Extra",
            vec![TypeLayer::Slice, TypeLayer::Pointer, TypeLayer::Array("4".into())],
        );
        assert_eq!(desc.pointer_depth, 1);
        assert_eq!(desc.container_depth, 2);
        assert_eq!(desc.go_spelling(), "[]*[4]Extra");
    }

    #[test]
    fn test_schema_types() {
        let names = RecordNames {
            go_name:     "Extra".into(),
            schema_name: "ExtraCapn".into(),
            suffix:      "Capn".into(),
        };
        let list = FieldType::List {
            elem:      Box::new(FieldType::Record { names: names.clone(), by_pointer: true }),
            array_len: None,
        };
        assert_eq!(list.schema_type(), "List(ExtraCapn)");
        assert_eq!(list.go_type(), "[]*Extra");
        assert_eq!(list.layout_class(), LayoutClass::Pointer);
        assert_eq!(names.encoder(), "ExtraGoToCapn");
        assert_eq!(names.decoder(), "ExtraCapnToGo");

        let flag = FieldType::Scalar { prim: Primitive::Bool, go_type: "bool".into() };
        assert_eq!(flag.layout_class(), LayoutClass::Scalar);
        assert!(LayoutClass::Scalar < LayoutClass::Pointer);
        assert_eq!(Primitive::Bool.list_constructor(), "NewBitList");
        assert_eq!(Primitive::Float32.list_type(), "Float32List");
        assert_eq!(names.list_type(), "ExtraCapn_List");
        assert_eq!(Primitive::from_go("int"), Some(Primitive::Int64));
        assert_eq!(Primitive::from_go("complex128"), None);
    }
}
