use std::fmt;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// The field's type has no schema equivalent; the field was dropped.
    UnsupportedType,
    /// The schema name hit a reserved word and was suffixed.
    ReservedWord,
    /// The schema name was already taken in the record and was numbered.
    NameCollision,
    /// A type declaration the generator does not handle.
    SkippedDeclaration,
}

/// A recoverable condition found while modeling a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind:    DiagnosticKind,
    pub record:  String,
    pub field:   Option<String>,
    pub line:    usize,
    pub column:  usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(
                f,
                "{}:{}: {}.{}: {}",
                self.line, self.column, self.record, field, self.message
            ),
            None => write!(f, "{}:{}: {}: {}", self.line, self.column, self.record, self.message),
        }
    }
}

/// Collects diagnostics and logs each one as it arrives.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        warn!(kind = ?diagnostic.kind, "{}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
