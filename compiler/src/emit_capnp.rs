use sha2::{Digest, Sha256};

use crate::{
    types::Record,
    utils::quote,
};

/// Cap'n Proto file ids must have the high bit set.
const FILE_ID_MARKER: u64 = 0x8000_0000_0000_0000;

/// A stable file id for a package and its set of records, so regenerating
/// unchanged input keeps the same id.
pub fn derive_file_id(package: &str, records: &[&Record]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"bambam:");
    hasher.update(package.as_bytes());
    for record in records {
        hasher.update([0u8]);
        hasher.update(record.schema_name().as_bytes());
    }
    let digest = hasher.finalize();
    let mut id = [0u8; 8];
    id.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(id) | FILE_ID_MARKER
}

pub fn emit_header(file_id: u64, package: &str, import: &str) -> String {
    format!(
        "@0x{:016x};\nusing Go = import \"go.capnp\";\n$Go.package({});\n$Go.import({});\n",
        file_id | FILE_ID_MARKER,
        quote(package),
        quote(import)
    )
}

/// Renders one record as a schema struct, fields numbered by final order.
pub fn emit_struct(record: &Record) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(doc) = &record.doc_comment {
        lines.extend(doc_lines(doc));
    }
    lines.push(format!("struct {} {{", record.schema_name()));
    for field in record.fields_by_final_order() {
        if let Some(doc) = &field.doc_comment {
            lines.extend(doc_lines(doc).into_iter().map(|line| format!("  {}", line)));
        }
        lines.push(format!(
            "  {} @{}: {};",
            field.schema_name,
            field.final_order,
            field.field_type.schema_type()
        ));
    }
    lines.push("}".to_string());

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Turns Go comment text into `#` comment lines.
fn doc_lines(doc: &str) -> Vec<String> {
    let mut lines: Vec<String> = doc
        .lines()
        .map(|line| {
            let mut body = line.trim();
            if let Some(rest) = body.strip_prefix("//") {
                body = rest;
            } else {
                body = body.strip_prefix("/*").unwrap_or(body);
                body = body.strip_suffix("*/").unwrap_or(body);
                let trimmed = body.trim_start();
                body = trimmed.strip_prefix('*').unwrap_or(body);
            }
            let body = body.trim_end();
            if body.is_empty() {
                "#".to_string()
            } else if body.starts_with(' ') {
                format!("#{}", body)
            } else {
                format!("# {}", body)
            }
        })
        .collect();

    while lines.first().map(|l| l == "#").unwrap_or(false) {
        lines.remove(0);
    }
    while lines.last().map(|l| l == "#").unwrap_or(false) {
        lines.pop();
    }
    lines
}
