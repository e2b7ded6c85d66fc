use std::fs;
use std::path::Path;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    config::GeneratorConfig,
    diagnostics::Diagnostic,
    emit_capnp::{derive_file_id, emit_header, emit_struct},
    emit_go::{emit_capn_to_go, emit_go_to_capn, emit_translator_header},
    model::build_context,
    parser::parse_go,
    tokenizer::tokenize_go,
    types::GenerationContext,
    error::BambamError,
};

/// The output of one run: the schema text, the Go translator text and
/// whatever was reported along the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generation {
    pub package:     String,
    pub schema:      String,
    pub translator:  String,
    pub diagnostics: Vec<Diagnostic>,
}

impl Generation {
    /// Schema section followed by the translator section.
    pub fn text(&self) -> String {
        format!("{}\n{}", self.schema, self.translator)
    }
}

/// Generate with the default configuration.
pub fn generate(path: impl AsRef<Path>) -> Result<Generation, BambamError> {
    generate_file(path, &GeneratorConfig::default())
}

pub fn generate_file(path: impl AsRef<Path>, config: &GeneratorConfig) -> Result<Generation, BambamError> {
    let path = path.as_ref();
    info!(input = %path.display(), "generating");
    let text = fs::read_to_string(path)?;
    generate_source(&text, config)
}

/// Tokenize, parse, model and render Go source text.
pub fn generate_source(text: &str, config: &GeneratorConfig) -> Result<Generation, BambamError> {
    let tokens = tokenize_go(text)?;
    let file = parse_go(&tokens)?;
    let ctx = build_context(&file, config)?;
    Ok(render(ctx, config))
}

/// Renders a context; records are emitted sorted by Go name.
pub fn render(ctx: GenerationContext, config: &GeneratorConfig) -> Generation {
    let records = ctx.records_by_name();

    let file_id = config
        .file_id
        .unwrap_or_else(|| derive_file_id(&ctx.package, &records));
    let import = config.import_for(&ctx.package);

    let mut schema = emit_header(file_id, &ctx.package, &import);
    for record in &records {
        schema.push('\n');
        schema.push_str(&emit_struct(record));
    }

    let mut translator = emit_translator_header(&ctx.package, &config.capn_import, !records.is_empty());
    for record in &records {
        translator.push('\n');
        translator.push_str(&emit_go_to_capn(record));
        translator.push('\n');
        translator.push_str(&emit_capn_to_go(record));
    }

    debug!(
        records = records.len(),
        diagnostics = ctx.diagnostics.len(),
        "rendered"
    );

    let package = ctx.package.clone();
    Generation {
        package,
        schema,
        translator,
        diagnostics: ctx.diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTRA: &str = "package main\n\ntype Extra struct {\n\tA int\n\tB int\n}\n";

    #[test]
    fn test_extra_generation() {
        let config = GeneratorConfig {
            file_id: Some(0x8000_0000_0000_0001),
            ..GeneratorConfig::default()
        };
        let generation = generate_source(EXTRA, &config).unwrap();
        assert_eq!(
            generation.schema,
            "@0x8000000000000001;\n\
             using Go = import \"go.capnp\";\n\
             $Go.package(\"main\");\n\
             $Go.import(\"main\");\n\
             \n\
             struct ExtraCapn {\n\
             \x20 a @0: Int64;\n\
             \x20 b @1: Int64;\n\
             }\n"
        );
        assert!(generation.translator.starts_with(
            "package main\n\nimport (\n\tcapn \"github.com/glycerine/go-capnproto\"\n)\n\nfunc ExtraGoToCapn("
        ));
        assert!(generation.translator.contains("\n\nfunc ExtraCapnToGo("));
        assert!(generation.diagnostics.is_empty());
        assert_eq!(
            generation.text(),
            format!("{}\n{}", generation.schema, generation.translator)
        );
    }

    #[test]
    fn test_empty_package_has_no_import() {
        let generation = generate_source("package empty\n", &GeneratorConfig::default()).unwrap();
        assert_eq!(generation.translator, "package empty\n");
        assert!(generation.schema.contains("$Go.package(\"empty\");"));
    }

    #[test]
    fn test_config_overrides_package_and_import() {
        let config = GeneratorConfig {
            go_package: Some("models".into()),
            go_import: Some("example.com/app/models".into()),
            schema_suffix: "Msg".into(),
            ..GeneratorConfig::default()
        };
        let generation = generate_source(EXTRA, &config).unwrap();
        assert_eq!(generation.package, "models");
        assert!(generation.schema.contains("$Go.package(\"models\");\n$Go.import(\"example.com/app/models\");"));
        assert!(generation.schema.contains("struct ExtraMsg {"));
        assert!(generation.translator.starts_with("package models\n"));
        assert!(generation.translator.contains("func ExtraGoToMsg(seg *capn.Segment, src *Extra, dest *ExtraMsg) *ExtraMsg {"));
        assert!(generation.translator.contains("func ExtraMsgToGo(src *ExtraMsg, dest *Extra) *Extra {"));
    }

    #[test]
    fn test_multiline_raw_string_before_struct() {
        let generation = generate_source(
            "package p\n\nvar q = `select *\nfrom t` + \";\"\n\ntype Extra struct {\n\tA int\n}\n",
            &GeneratorConfig::default(),
        )
        .unwrap();
        assert!(generation.schema.contains("struct ExtraCapn {\n  a @0: Int64;\n}\n"));
        assert!(generation.diagnostics.is_empty());
    }

    #[test]
    fn test_parse_error_aborts() {
        let err = generate_source("package p\ntype A struct {\n", &GeneratorConfig::default()).unwrap_err();
        assert!(matches!(err, BambamError::ParseError { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = generate("/nonexistent/bambam/input.go").unwrap_err();
        assert!(matches!(err, BambamError::Io(_)));
    }
}
