use thiserror::Error;

#[derive(Debug, Error)]
pub enum BambamError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}, column {column}: {msg}")]
    ParseError {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Duplicate record {name} (schema name {schema_name}) at line {line}, column {column}")]
    DuplicateRecordName {
        name:        String,
        schema_name: String,
        line:        usize,
        column:      usize,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
