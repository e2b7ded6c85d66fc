//! Go translation functions between a record and its capn struct.
//!
//! For every record two functions are generated:
//!
//! - `<Name>GoToCapn(seg, src, dest)` copies a Go value into a capn struct,
//!   allocating the struct in `seg` when `dest` is nil.
//! - `<Name>CapnToGo(src, dest)` copies a capn struct into a Go value,
//!   allocating the value when `dest` is nil.
//!
//! Fields are visited in order of appearance. Accessor names follow the
//! capnpc-go convention: `Set` + the schema name with its first letter
//! uppercased for setters, the bare uppercased name for getters.

use crate::{
    types::{Field, FieldType, Record},
    utils::{quote, upper_first},
};

pub fn emit_translator_header(package: &str, capn_import: &str, has_records: bool) -> String {
    let mut out = format!("package {}\n", package);
    if has_records {
        out.push_str(&format!("\nimport (\n\tcapn {}\n)\n", quote(capn_import)));
    }
    out
}

pub fn emit_go_to_capn(record: &Record) -> String {
    let names = &record.names;
    let mut out = String::new();
    out.push_str(&format!(
        "func {}(seg *capn.Segment, src *{}, dest *{}) *{} {{\n",
        names.encoder(),
        names.go_name,
        names.schema_name,
        names.schema_name
    ));
    out.push_str("\tif dest == nil {\n");
    out.push_str(&format!("\t\td := {}(seg)\n", names.constructor()));
    out.push_str("\t\tdest = &d\n");
    out.push_str("\t}\n");
    for field in record.fields_by_appearance() {
        encode_field(&mut out, field);
    }
    out.push_str("\treturn dest\n}\n");
    out
}

pub fn emit_capn_to_go(record: &Record) -> String {
    let names = &record.names;
    let mut out = String::new();
    out.push_str(&format!(
        "func {}(src *{}, dest *{}) *{} {{\n",
        names.decoder(),
        names.schema_name,
        names.go_name,
        names.go_name
    ));
    out.push_str("\tif dest == nil {\n");
    out.push_str(&format!("\t\tdest = &{}{{}}\n", names.go_name));
    out.push_str("\t}\n");
    for field in record.fields_by_appearance() {
        decode_field(&mut out, field);
    }
    out.push_str("\treturn dest\n}\n");
    out
}

fn setter(field: &Field) -> String {
    format!("Set{}", upper_first(&field.schema_name))
}

fn getter(field: &Field) -> String {
    upper_first(&field.schema_name)
}

/// Wraps `expr` in a conversion to `to` unless it already has that type.
fn convert(expr: &str, from: &str, to: &str) -> String {
    if canonical(from) == canonical(to) {
        expr.to_string()
    } else {
        format!("{}({})", to, expr)
    }
}

fn canonical(go_type: &str) -> &str {
    match go_type {
        "byte" => "uint8",
        "rune" => "int32",
        other => other,
    }
}

/// Go expression for one element of `src_expr` as the runtime stores it.
/// A list element is a list variable already built by `encode_list`.
fn to_runtime(field_type: &FieldType, src_expr: &str) -> String {
    match field_type {
        FieldType::Scalar { prim, go_type } => convert(src_expr, go_type, prim.runtime_type()),
        FieldType::Text { go_type } => convert(src_expr, go_type, "string"),
        FieldType::Data { array_len: None } => src_expr.to_string(),
        FieldType::Data { array_len: Some(_) } => format!("{}[:]", src_expr),
        FieldType::Record { names, by_pointer: false } => {
            format!("*{}(seg, &{}, nil)", names.encoder(), src_expr)
        }
        FieldType::Record { names, by_pointer: true } => {
            format!("*{}(seg, {}, nil)", names.encoder(), src_expr)
        }
        FieldType::List { .. } => format!("capn.Object({})", src_expr),
    }
}

fn list_constructor(elem: &FieldType, len_expr: &str) -> String {
    match elem {
        FieldType::Scalar { prim, .. } => format!("seg.{}({})", prim.list_constructor(), len_expr),
        FieldType::Text { .. } => format!("seg.NewTextList({})", len_expr),
        FieldType::Data { .. } => format!("seg.NewDataList({})", len_expr),
        FieldType::Record { names, .. } => format!("{}(seg, {})", names.list_constructor(), len_expr),
        FieldType::List { .. } => format!("seg.NewPointerList({})", len_expr),
    }
}

/// The runtime list type whose elements are `elem`.
fn runtime_list_type(elem: &FieldType) -> String {
    match elem {
        FieldType::Scalar { prim, .. } => format!("capn.{}", prim.list_type()),
        FieldType::Text { .. } => "capn.TextList".to_string(),
        FieldType::Data { .. } => "capn.DataList".to_string(),
        FieldType::Record { names, .. } => names.list_type(),
        FieldType::List { .. } => "capn.PointerList".to_string(),
    }
}

/// Names of the loop variables at each nesting level: `list`, `list1`, ...
fn nested(name: &str, depth: usize) -> String {
    if depth == 0 {
        name.to_string()
    } else {
        format!("{}{}", name, depth)
    }
}

fn encode_field(out: &mut String, field: &Field) {
    let src = format!("src.{}", field.name);
    let set = setter(field);
    match &field.field_type {
        FieldType::Record { by_pointer: true, .. } => {
            out.push_str(&format!("\tif {} != nil {{\n", src));
            out.push_str(&format!("\t\tdest.{}({})\n", set, to_runtime(&field.field_type, &src)));
            out.push_str("\t}\n");
        }
        FieldType::List { elem, .. } => {
            out.push_str("\t{\n");
            let list = encode_list(out, "\t\t", elem, &src, 0);
            out.push_str(&format!("\t\tdest.{}({})\n", set, list));
            out.push_str("\t}\n");
        }
        other => {
            out.push_str(&format!("\tdest.{}({})\n", set, to_runtime(other, &src)));
        }
    }
}

/// Statements copying the Go slice or array `src` into a new runtime list.
/// Returns the variable holding the list.
fn encode_list(out: &mut String, indent: &str, elem: &FieldType, src: &str, depth: usize) -> String {
    let list = nested("list", depth);
    let i = nested("i", depth);
    let item = format!("{}[{}]", src, i);
    let body = format!("{}\t", indent);

    out.push_str(&format!(
        "{}{} := {}\n",
        indent,
        list,
        list_constructor(elem, &format!("len({})", src))
    ));
    out.push_str(&format!("{}for {} := range {} {{\n", indent, i, src));
    match elem {
        FieldType::Record { by_pointer: true, .. } => {
            out.push_str(&format!("{}if {} != nil {{\n", body, item));
            out.push_str(&format!("{}\t{}.Set({}, {})\n", body, list, i, to_runtime(elem, &item)));
            out.push_str(&format!("{}}}\n", body));
        }
        FieldType::List { elem: inner, .. } => {
            let inner_list = encode_list(out, &body, inner, &item, depth + 1);
            out.push_str(&format!("{}{}.Set({}, {})\n", body, list, i, to_runtime(elem, &inner_list)));
        }
        other => {
            out.push_str(&format!("{}{}.Set({}, {})\n", body, list, i, to_runtime(other, &item)));
        }
    }
    out.push_str(&format!("{}}}\n", indent));
    list
}

/// Statements assigning the runtime value `value` to the Go location `target`.
fn assign_from_runtime(
    out: &mut String,
    indent: &str,
    field_type: &FieldType,
    target: &str,
    value: &str,
    depth: usize,
) {
    match field_type {
        FieldType::Scalar { prim, go_type } => {
            out.push_str(&format!(
                "{}{} = {}\n",
                indent,
                target,
                convert(value, prim.runtime_type(), go_type)
            ));
        }
        FieldType::Text { go_type } => {
            out.push_str(&format!("{}{} = {}\n", indent, target, convert(value, "string", go_type)));
        }
        FieldType::Data { array_len: None } => {
            out.push_str(&format!("{}{} = append([]byte(nil), {}...)\n", indent, target, value));
        }
        FieldType::Data { array_len: Some(_) } => {
            out.push_str(&format!("{}copy({}[:], {})\n", indent, target, value));
        }
        FieldType::Record { names, by_pointer: false } => {
            out.push_str(&format!("{}{{\n", indent));
            out.push_str(&format!("{}\tv := {}\n", indent, value));
            out.push_str(&format!("{}\t{}(&v, &{})\n", indent, names.decoder(), target));
            out.push_str(&format!("{}}}\n", indent));
        }
        FieldType::Record { names, by_pointer: true } => {
            // A null pointer decodes back to nil.
            out.push_str(&format!("{}{{\n", indent));
            out.push_str(&format!("{}\tv := {}\n", indent, value));
            out.push_str(&format!("{}\tif capn.Struct(v).Segment == nil {{\n", indent));
            out.push_str(&format!("{}\t\t{} = nil\n", indent, target));
            out.push_str(&format!("{}\t}} else {{\n", indent));
            out.push_str(&format!("{}\t\t{} = {}(&v, nil)\n", indent, target, names.decoder()));
            out.push_str(&format!("{}\t}}\n", indent));
            out.push_str(&format!("{}}}\n", indent));
        }
        FieldType::List { elem, array_len } => {
            let list = nested("list", depth);
            let n = nested("n", depth);
            let i = nested("i", depth);
            out.push_str(&format!("{}{} := {}\n", indent, list, value));
            out.push_str(&format!("{}{} := {}.Len()\n", indent, n, list));
            match array_len {
                None => {
                    out.push_str(&format!("{}{} = make({}, {})\n", indent, target, field_type.go_type(), n));
                    out.push_str(&format!("{}for {} := 0; {} < {}; {}++ {{\n", indent, i, i, n, i));
                }
                Some(_) => {
                    out.push_str(&format!(
                        "{}for {} := 0; {} < {} && {} < len({}); {}++ {{\n",
                        indent, i, i, n, i, target, i
                    ));
                }
            }
            let at = format!("{}.At({})", list, i);
            let item_value = match **elem {
                FieldType::List { elem: ref inner, .. } => format!("{}({})", runtime_list_type(inner), at),
                _ => at,
            };
            assign_from_runtime(
                out,
                &format!("{}\t", indent),
                elem,
                &format!("{}[{}]", target, i),
                &item_value,
                depth + 1,
            );
            out.push_str(&format!("{}}}\n", indent));
        }
    }
}

fn decode_field(out: &mut String, field: &Field) {
    let dest = format!("dest.{}", field.name);
    let value = format!("src.{}()", getter(field));
    match &field.field_type {
        FieldType::List { .. } => {
            out.push_str("\t{\n");
            assign_from_runtime(out, "\t\t", &field.field_type, &dest, &value, 0);
            out.push_str("\t}\n");
        }
        other => assign_from_runtime(out, "\t", other, &dest, &value, 0),
    }
}
