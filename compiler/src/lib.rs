//! bambam-compiler
//!
//! Reads the struct declarations of a Go source file and generates:
//!  1) a Cap'n Proto schema with one struct per Go struct, scalar fields
//!     laid out before pointer fields,
//!  2) Go functions copying values between each struct and its capn
//!     counterpart (`<Name>GoToCapn` / `<Name>CapnToGo`).
//!
//! The pipeline is `tokenizer` → `parser` → `model` (with `resolver`,
//! `verifier`) → `emit_capnp` / `emit_go`, tied together in `compiler`.

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod ast;
pub mod parser;
pub mod resolver;
pub mod diagnostics;
pub mod config;
pub mod verifier;
pub mod model;
pub mod emit_capnp;
pub mod emit_go;
pub mod compiler;

pub use compiler::{generate, generate_file, generate_source, render, Generation};
pub use config::GeneratorConfig;
pub use error::BambamError;
pub use model::build_context;
