use std::collections::HashMap;
use crate::{
    ast::{GoFile, TypeSpec},
    config::GeneratorConfig,
    utils::{under_to_camel_case, upper_first},
    error::BambamError,
};

pub const RESERVED_WORDS: [&str; 30] = [
    "Void", "Bool", "Int8", "Int16", "Int32", "Int64", "UInt8", "UInt16",
    "UInt32", "UInt64", "Float32", "Float64", "Text", "Data", "List",
    "struct", "union", "group", "enum", "AnyPointer", "interface", "extends",
    "const", "using", "import", "annotation", "true", "false", "inf", "nan",
];

/// Case-insensitive, so `text` and `TEXT` both count.
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(name))
}

/// Schema struct names must start uppercase and contain no underscores.
pub fn schema_record_name(go_name: &str, suffix: &str) -> String {
    format!("{}{}", upper_first(&under_to_camel_case(go_name)), suffix)
}

/// Fails on the first pair of declarations that would produce the same
/// record or schema name.
pub fn verify_declarations(file: &GoFile, config: &GeneratorConfig) -> Result<(), BambamError> {
    let mut declared: HashMap<&str, &TypeSpec> = HashMap::new();

    // 1) Check duplicate type names
    for spec in &file.types {
        if declared.contains_key(spec.name.as_str()) {
            return Err(duplicate(spec, schema_record_name(&spec.name, &config.schema_suffix)));
        }
        declared.insert(spec.name.as_str(), spec);
    }

    // 2) Check derived schema names against each other and every declared type
    let mut schema_names: HashMap<String, &TypeSpec> = HashMap::new();
    for spec in &file.types {
        if spec.struct_fields().is_none() {
            continue;
        }
        let schema_name = schema_record_name(&spec.name, &config.schema_suffix);
        if schema_names.contains_key(&schema_name) || declared.contains_key(schema_name.as_str()) {
            return Err(duplicate(spec, schema_name));
        }
        schema_names.insert(schema_name, spec);
    }

    Ok(())
}

fn duplicate(spec: &TypeSpec, schema_name: String) -> BambamError {
    BambamError::DuplicateRecordName {
        name:   spec.name.clone(),
        schema_name,
        line:   spec.line,
        column: spec.column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse_go, tokenizer::tokenize_go};

    fn verify(text: &str) -> Result<(), BambamError> {
        let tokens = tokenize_go(text).unwrap();
        let file = parse_go(&tokens).unwrap();
        verify_declarations(&file, &GeneratorConfig::default())
    }

    #[test]
    fn test_reserved_words() {
        assert!(is_reserved_word("text"));
        assert!(is_reserved_word("Struct"));
        assert!(is_reserved_word("uint8"));
        assert!(!is_reserved_word("name"));
    }

    #[test]
    fn test_schema_record_name() {
        assert_eq!(schema_record_name("Extra", "Capn"), "ExtraCapn");
        assert_eq!(schema_record_name("my_record", "Capn"), "MyRecordCapn");
    }

    #[test]
    fn test_distinct_records_pass() {
        assert!(verify("package p\ntype A struct{}\ntype B struct{}\n").is_ok());
    }

    #[test]
    fn test_duplicate_record_fails() {
        let err = verify("package p\ntype A struct{}\ntype A struct{ X int }\n").unwrap_err();
        match err {
            BambamError::DuplicateRecordName { name, line, .. } => {
                assert_eq!(name, "A");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_schema_name_collision_fails() {
        // `extra` and `Extra` both become `ExtraCapn`.
        let err = verify("package p\ntype Extra struct{}\ntype extra struct{}\n").unwrap_err();
        assert!(matches!(err, BambamError::DuplicateRecordName { ref name, .. } if name == "extra"));

        // The schema name would shadow a declared Go type.
        let err = verify("package p\ntype A struct{}\ntype ACapn int\n").unwrap_err();
        assert!(matches!(err, BambamError::DuplicateRecordName { ref schema_name, .. } if schema_name == "ACapn"));
    }
}
