//! Builds the record model from a parsed file: one `Record` per struct
//! declaration, each field resolved, classified, named and ordered.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::{
    ast::{FieldDecl, GoFile, TypeExpr, TypeSpec},
    config::GeneratorConfig,
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    resolver::resolve,
    types::{
        AliasTarget, Field, FieldType, GenerationContext, Primitive, Record, RecordNames,
        TypeDescriptor, TypeLayer,
    },
    utils::{lower_first, quote, under_to_camel_case, upper_first},
    verifier::{is_reserved_word, schema_record_name, verify_declarations},
    error::BambamError,
};

/// Suffix appended to field names that collide with a schema keyword.
pub const RESERVED_WORD_SUFFIX: &str = "Field";

pub fn build_context(file: &GoFile, config: &GeneratorConfig) -> Result<GenerationContext, BambamError> {
    verify_declarations(file, config)?;

    let mut record_names: BTreeMap<String, RecordNames> = BTreeMap::new();
    let mut aliases:      BTreeMap<String, AliasTarget> = BTreeMap::new();
    let mut diagnostics = Diagnostics::default();

    // First pass: learn every record and primitive alias, so fields can
    // refer to types declared later in the file.
    for spec in &file.types {
        if spec.is_generic() {
            diagnostics.push(Diagnostic {
                kind:    DiagnosticKind::SkippedDeclaration,
                record:  spec.name.clone(),
                field:   None,
                line:    spec.line,
                column:  spec.column,
                message: "generic type declarations are not supported".to_string(),
            });
            continue;
        }
        if spec.struct_fields().is_some() {
            record_names.insert(
                spec.name.clone(),
                RecordNames {
                    go_name:     spec.name.clone(),
                    schema_name: schema_record_name(&spec.name, &config.schema_suffix),
                    suffix:      config.schema_suffix.clone(),
                },
            );
        } else if let TypeExpr::Named { package: None, name } = &spec.ty {
            if let Some(prim) = Primitive::from_go(name) {
                aliases.insert(spec.name.clone(), AliasTarget::Scalar(prim));
            } else if name == "string" {
                aliases.insert(spec.name.clone(), AliasTarget::Text);
            }
        }
    }

    let classifier = Classifier::new(&record_names, &aliases);
    let mut records = Vec::with_capacity(record_names.len());
    for spec in &file.types {
        let (Some(decls), Some(names)) = (spec.struct_fields(), record_names.get(&spec.name)) else {
            continue;
        };
        let record = build_record(spec, names.clone(), decls, &classifier, &mut diagnostics);
        debug!(record = %record.go_name(), fields = record.fields.len(), "built record");
        records.push(record);
    }

    Ok(GenerationContext {
        package: config.package_for(&file.package),
        records,
        aliases,
        diagnostics: diagnostics.into_vec(),
    })
}

pub fn build_record(
    spec: &TypeSpec,
    names: RecordNames,
    decls: &[FieldDecl],
    classifier: &Classifier,
    diagnostics: &mut Diagnostics,
) -> Record {
    let mut fields = Vec::new();
    for decl in decls {
        build_fields(&names.go_name, decl, classifier, &mut fields, diagnostics);
    }
    assign_schema_names(&names.go_name, &mut fields, diagnostics);
    assign_final_order(&mut fields);

    Record {
        names,
        fields,
        doc_comment: spec.doc.clone(),
        line:        spec.line,
        column:      spec.column,
    }
}

/// Appends one `Field` per name in `decl`. A field whose type cannot be
/// represented is left out and reported instead.
pub fn build_fields(
    record: &str,
    decl: &FieldDecl,
    classifier: &Classifier,
    fields: &mut Vec<Field>,
    diagnostics: &mut Diagnostics,
) {
    let names: Vec<(String, usize, usize)> = if decl.is_embedded() {
        vec![(embedded_name(&decl.ty), decl.line, decl.column)]
    } else {
        decl.names
            .iter()
            .filter(|ident| ident.name != "_")
            .map(|ident| (ident.name.clone(), ident.line, ident.column))
            .collect()
    };
    if names.is_empty() {
        return;
    }

    let resolved = resolve(&decl.ty)
        .map_err(|u| format!("unsupported type {} ({})", decl.ty, u.kind))
        .and_then(|descriptor| {
            classifier
                .classify(&descriptor)
                .map(|field_type| (descriptor, field_type))
                .map_err(|reason| format!("unsupported type {} ({})", decl.ty, reason))
        });

    let (descriptor, field_type) = match resolved {
        Ok(pair) => pair,
        Err(message) => {
            for (name, line, column) in names {
                diagnostics.push(Diagnostic {
                    kind:    DiagnosticKind::UnsupportedType,
                    record:  record.to_string(),
                    field:   Some(name),
                    line,
                    column,
                    message: message.clone(),
                });
            }
            return;
        }
    };

    for (name, line, column) in names {
        fields.push(Field {
            name,
            schema_name:         String::new(),
            descriptor:          descriptor.clone(),
            field_type:          field_type.clone(),
            order_of_appearance: fields.len(),
            final_order:         fields.len(),
            is_embedded:         decl.is_embedded(),
            doc_comment:         decl.doc.clone(),
            line,
            column,
        });
    }
}

/// The implicit field name of an embedded member: its type name without
/// pointer or package qualifier.
fn embedded_name(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Pointer(inner) | TypeExpr::Paren(inner) => embedded_name(inner),
        TypeExpr::Generic { base, .. } => embedded_name(base),
        TypeExpr::Named { name, .. } => name.clone(),
        other => other.to_string(),
    }
}

/// Gives every field a lowerCamel schema name, escaping reserved words and
/// numbering repeats, in order of appearance. A name is also taken when its
/// generated accessor (`A` or `SetA`) matches one of an earlier field, so
/// fields `A` and `SetA` do not both produce a `SetA` method.
fn assign_schema_names(record: &str, fields: &mut [Field], diagnostics: &mut Diagnostics) {
    let mut taken:     BTreeSet<String> = BTreeSet::new();
    let mut accessors: BTreeSet<String> = BTreeSet::new();
    let clashes = |candidate: &str, taken: &BTreeSet<String>, accessors: &BTreeSet<String>| {
        let getter = upper_first(candidate);
        let setter = format!("Set{}", getter);
        taken.contains(candidate) || accessors.contains(&getter) || accessors.contains(&setter)
    };

    for field in fields.iter_mut() {
        let mut base = lower_first(&under_to_camel_case(&field.name));
        if base.is_empty() {
            base = "field".to_string();
        }

        if is_reserved_word(&base) {
            let escaped = format!("{}{}", base, RESERVED_WORD_SUFFIX);
            diagnostics.push(Diagnostic {
                kind:    DiagnosticKind::ReservedWord,
                record:  record.to_string(),
                field:   Some(field.name.clone()),
                line:    field.line,
                column:  field.column,
                message: format!("{} is a schema keyword, renamed to {}", quote(&base), quote(&escaped)),
            });
            base = escaped;
        }

        let mut candidate = base.clone();
        let mut n = 2;
        while clashes(&candidate, &taken, &accessors) {
            candidate = format!("{}{}", base, n);
            n += 1;
        }
        if candidate != base {
            diagnostics.push(Diagnostic {
                kind:    DiagnosticKind::NameCollision,
                record:  record.to_string(),
                field:   Some(field.name.clone()),
                line:    field.line,
                column:  field.column,
                message: format!("{} is already used, renamed to {}", quote(&base), quote(&candidate)),
            });
        }

        let getter = upper_first(&candidate);
        accessors.insert(format!("Set{}", getter));
        accessors.insert(getter);
        taken.insert(candidate.clone());
        field.schema_name = candidate;
    }
}

/// Scalars first, then pointer-section fields; appearance order within each.
fn assign_final_order(fields: &mut [Field]) {
    let mut order: Vec<usize> = (0..fields.len()).collect();
    order.sort_by_key(|&i| (fields[i].field_type.layout_class(), fields[i].order_of_appearance));
    for (final_order, index) in order.into_iter().enumerate() {
        fields[index].final_order = final_order;
    }
}

enum Base {
    Scalar { prim: Primitive, go_type: String },
    Text { go_type: String },
    Record(RecordNames),
}

impl Base {
    fn is_byte(&self) -> bool {
        matches!(self, Base::Scalar { prim: Primitive::UInt8, go_type } if go_type == "byte" || go_type == "uint8")
    }

    fn field_type(&self) -> FieldType {
        match self {
            Base::Scalar { prim, go_type } => FieldType::Scalar { prim: *prim, go_type: go_type.clone() },
            Base::Text { go_type } => FieldType::Text { go_type: go_type.clone() },
            Base::Record(names) => FieldType::Record { names: names.clone(), by_pointer: false },
        }
    }
}

/// Maps descriptors onto schema field types using the records and aliases
/// declared in the file.
pub struct Classifier<'a> {
    records: &'a BTreeMap<String, RecordNames>,
    aliases: &'a BTreeMap<String, AliasTarget>,
}

impl<'a> Classifier<'a> {
    pub fn new(
        records: &'a BTreeMap<String, RecordNames>,
        aliases: &'a BTreeMap<String, AliasTarget>,
    ) -> Self {
        Classifier { records, aliases }
    }

    fn base(&self, name: &str) -> Result<Base, String> {
        if name.contains('.') {
            return Err(format!("package-qualified type {}", name));
        }
        if let Some(prim) = Primitive::from_go(name) {
            return Ok(Base::Scalar { prim, go_type: name.to_string() });
        }
        if name == "string" {
            return Ok(Base::Text { go_type: name.to_string() });
        }
        if let Some(names) = self.records.get(name) {
            return Ok(Base::Record(names.clone()));
        }
        match self.aliases.get(name) {
            Some(AliasTarget::Scalar(prim)) => Ok(Base::Scalar { prim: *prim, go_type: name.to_string() }),
            Some(AliasTarget::Text) => Ok(Base::Text { go_type: name.to_string() }),
            None => Err(format!("{} is not a primitive or a struct declared in this file", name)),
        }
    }

    pub fn classify(&self, descriptor: &TypeDescriptor) -> Result<FieldType, String> {
        let base = self.base(&descriptor.base_name)?;
        classify_layers(&base, &descriptor.layers)
            .map_err(|reason| format!("{} in {}", reason, descriptor.go_spelling()))
    }
}

/// Peels one layer at a time, outermost first. Every slice or array level
/// becomes a list, except the innermost level over bytes which is `Data`.
fn classify_layers(base: &Base, layers: &[TypeLayer]) -> Result<FieldType, String> {
    match layers {
        [] => Ok(base.field_type()),
        [TypeLayer::Pointer] => match base {
            Base::Record(names) => Ok(FieldType::Record { names: names.clone(), by_pointer: true }),
            _ => Err("pointer to a non-struct type".to_string()),
        },
        [TypeLayer::Pointer, ..] => Err("pointer to a pointer or list".to_string()),
        [outer] if base.is_byte() => Ok(FieldType::Data { array_len: array_len(outer) }),
        [outer, rest @ ..] => Ok(FieldType::List {
            elem:      Box::new(classify_layers(base, rest)?),
            array_len: array_len(outer),
        }),
    }
}

fn array_len(layer: &TypeLayer) -> Option<String> {
    match layer {
        TypeLayer::Array(len) => Some(len.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse_go, tokenizer::tokenize_go, types::LayoutClass};

    fn context(text: &str) -> GenerationContext {
        let tokens = tokenize_go(text).unwrap();
        let file = parse_go(&tokens).unwrap();
        build_context(&file, &GeneratorConfig::default()).unwrap()
    }

    fn field<'r>(record: &'r Record, name: &str) -> &'r Field {
        record
            .fields
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("missing field {}", name))
    }

    #[test]
    fn test_extra_record() {
        let ctx = context("package main\ntype Extra struct {\n  A int\n  B int\n}\n");
        assert_eq!(ctx.package, "main");
        assert_eq!(ctx.records.len(), 1);

        let extra = &ctx.records[0];
        assert_eq!(extra.go_name(), "Extra");
        assert_eq!(extra.schema_name(), "ExtraCapn");
        assert_eq!(extra.fields.len(), 2);

        let a = field(extra, "A");
        assert_eq!(a.schema_name, "a");
        assert_eq!(a.order_of_appearance, 0);
        assert_eq!(a.final_order, 0);
        assert_eq!(a.field_type, FieldType::Scalar { prim: Primitive::Int64, go_type: "int".into() });
        assert_eq!(field(extra, "B").final_order, 1);
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn test_scalars_move_before_pointers() {
        let ctx = context(
            "package p\ntype Mixed struct {\n Name string\n Count int32\n Tags []string\n Ok bool\n Ratio float64\n}\n",
        );
        let mixed = &ctx.records[0];
        let by_final: Vec<&str> = mixed
            .fields_by_final_order()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(by_final, vec!["Count", "Ok", "Ratio", "Name", "Tags"]);

        let by_appearance: Vec<&str> = mixed
            .fields_by_appearance()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(by_appearance, vec!["Name", "Count", "Tags", "Ok", "Ratio"]);
        assert_eq!(field(mixed, "Tags").field_type.layout_class(), LayoutClass::Pointer);
    }

    #[test]
    fn test_unsupported_field_is_dropped() {
        let ctx = context(
            "package p\ntype Extra struct {\n A int\n M map[string]int\n When time.Time\n B int\n}\n",
        );
        let extra = &ctx.records[0];
        let names: Vec<&str> = extra.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(field(extra, "B").order_of_appearance, 1);

        assert_eq!(ctx.diagnostics.len(), 2);
        assert!(ctx.diagnostics.iter().all(|d| d.kind == DiagnosticKind::UnsupportedType));
        assert_eq!(ctx.diagnostics[0].field.as_deref(), Some("M"));
        assert_eq!(ctx.diagnostics[0].line, 4);
        assert!(ctx.diagnostics[1].message.contains("time.Time"));
    }

    #[test]
    fn test_nested_records_and_lists() {
        let ctx = context(
            r#"package p
type Outer struct {
	Inner   Inner
	Ptr     *Inner
	Many    []Inner
	Refs    []*Inner
	Blob    []byte
	Digest  [32]byte
	Chunks  [][]byte
	Grid    [4]float32
	Deep    [][]int
	PtrInt  *int
}

type Inner struct { V int }
"#,
        );
        let outer = ctx.record("Outer").unwrap();
        let inner_names = ctx.record("Inner").unwrap().names.clone();

        assert_eq!(
            field(outer, "Inner").field_type,
            FieldType::Record { names: inner_names.clone(), by_pointer: false }
        );
        assert_eq!(field(outer, "Ptr").field_type.schema_type(), "InnerCapn");
        assert_eq!(field(outer, "Many").field_type.schema_type(), "List(InnerCapn)");
        assert_eq!(field(outer, "Refs").field_type.go_type(), "[]*Inner");
        assert_eq!(field(outer, "Blob").field_type, FieldType::Data { array_len: None });
        assert_eq!(field(outer, "Digest").field_type, FieldType::Data { array_len: Some("32".into()) });
        assert_eq!(field(outer, "Chunks").field_type.schema_type(), "List(Data)");
        assert_eq!(field(outer, "Grid").field_type.schema_type(), "List(Float32)");
        assert_eq!(field(outer, "Deep").field_type.schema_type(), "List(List(Int64))");
        assert_eq!(field(outer, "Deep").field_type.go_type(), "[][]int");

        let dropped: Vec<&str> = ctx
            .diagnostics
            .iter()
            .filter_map(|d| d.field.as_deref())
            .collect();
        assert_eq!(dropped, vec!["PtrInt"]);
    }

    #[test]
    fn test_nested_lists_recurse() {
        let ctx = context(
            "package p\ntype Node struct {\n Words [][]string\n Kids [][]*Node\n Keys [][4]byte\n Cube [2][3][]int8\n Bad []*[]int\n}\n",
        );
        let node = &ctx.records[0];
        assert_eq!(field(node, "Words").field_type.schema_type(), "List(List(Text))");
        assert_eq!(field(node, "Kids").field_type.schema_type(), "List(List(NodeCapn))");
        assert_eq!(field(node, "Kids").field_type.go_type(), "[][]*Node");
        assert_eq!(
            field(node, "Keys").field_type,
            FieldType::List {
                elem:      Box::new(FieldType::Data { array_len: Some("4".into()) }),
                array_len: None,
            }
        );
        assert_eq!(field(node, "Cube").field_type.schema_type(), "List(List(List(Int8)))");
        assert_eq!(field(node, "Cube").field_type.go_type(), "[2][3][]int8");

        assert_eq!(ctx.diagnostics.len(), 1);
        assert_eq!(ctx.diagnostics[0].field.as_deref(), Some("Bad"));
        assert!(ctx.diagnostics[0].message.contains("pointer to a pointer or list"));
    }

    #[test]
    fn test_embedded_and_blank_fields() {
        let ctx = context(
            "package p\ntype Base struct { ID int64 }\ntype Child struct {\n Base\n _ int\n *Other\n Name string\n}\ntype Other struct{}\n",
        );
        let child = ctx.record("Child").unwrap();
        let names: Vec<(&str, bool, usize)> = child
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.is_embedded, f.order_of_appearance))
            .collect();
        assert_eq!(
            names,
            vec![("Base", true, 0), ("Other", true, 1), ("Name", false, 2)]
        );
        assert_eq!(field(child, "Base").schema_name, "base");
        assert_eq!(field(ctx.record("Base").unwrap(), "ID").schema_name, "iD");
    }

    #[test]
    fn test_reserved_words_and_collisions() {
        let ctx = context(
            "package p\ntype Doc struct {\n Text string\n Data []byte\n struct_field int\n Foo int\n foo int\n}\n",
        );
        let doc = &ctx.records[0];
        assert_eq!(field(doc, "Text").schema_name, "textField");
        assert_eq!(field(doc, "Data").schema_name, "dataField");
        assert_eq!(field(doc, "struct_field").schema_name, "structField");
        assert_eq!(field(doc, "Foo").schema_name, "foo");
        assert_eq!(field(doc, "foo").schema_name, "foo2");

        let kinds: Vec<DiagnosticKind> = ctx.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::ReservedWord,
                DiagnosticKind::ReservedWord,
                DiagnosticKind::NameCollision,
            ]
        );
    }

    #[test]
    fn test_accessor_collisions_are_renamed() {
        let ctx = context("package p\ntype Acc struct {\n A int\n SetA int\n SetB int\n B int\n}\n");
        let acc = &ctx.records[0];
        assert_eq!(field(acc, "A").schema_name, "a");
        assert_eq!(field(acc, "SetA").schema_name, "setA2");
        assert_eq!(field(acc, "SetB").schema_name, "setB");
        assert_eq!(field(acc, "B").schema_name, "b2");

        let renamed: Vec<(DiagnosticKind, Option<&str>)> = ctx
            .diagnostics
            .iter()
            .map(|d| (d.kind, d.field.as_deref()))
            .collect();
        assert_eq!(
            renamed,
            vec![
                (DiagnosticKind::NameCollision, Some("SetA")),
                (DiagnosticKind::NameCollision, Some("B")),
            ]
        );
    }

    #[test]
    fn test_aliases_resolve_to_primitives() {
        let ctx = context(
            "package p\ntype Celsius float64\ntype Label string\ntype Reading struct {\n Temp Celsius\n Tag Label\n History []Celsius\n}\n",
        );
        let reading = &ctx.records[0];
        assert_eq!(
            field(reading, "Temp").field_type,
            FieldType::Scalar { prim: Primitive::Float64, go_type: "Celsius".into() }
        );
        assert_eq!(field(reading, "Tag").field_type, FieldType::Text { go_type: "Label".into() });
        assert_eq!(field(reading, "History").field_type.schema_type(), "List(Float64)");
        assert_eq!(ctx.aliases.len(), 2);
    }

    #[test]
    fn test_generic_declaration_is_skipped() {
        let ctx = context("package p\ntype Box[T any] struct { V T }\ntype Plain struct { V int }\n");
        assert_eq!(ctx.records.len(), 1);
        assert_eq!(ctx.records[0].go_name(), "Plain");
        assert_eq!(ctx.diagnostics[0].kind, DiagnosticKind::SkippedDeclaration);
    }

    #[test]
    fn test_doc_comment_is_attached() {
        let ctx = context("package p\n\n// Point is a 2D point.\ntype Point struct { X, Y float32 }\n");
        assert_eq!(ctx.records[0].doc_comment.as_deref(), Some("// Point is a 2D point."));
        assert_eq!(ctx.records[0].fields.len(), 2);
    }
}
