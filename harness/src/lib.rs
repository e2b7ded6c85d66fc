//! bambam-harness
//!
//! Runs generated output through the external tools that consume it:
//! `capnp compile` for the schema and `gofmt` for the Go translator.
//! A tool that is not installed yields `Verdict::Skipped`, so test suites
//! stay green on machines without a Go or Cap'n Proto toolchain.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

pub const CAPNP_ENV: &str = "BAMBAM_CAPNP";
pub const GOFMT_ENV: &str = "BAMBAM_GOFMT";

/// Annotation declarations the generated schema imports as `go.capnp`.
pub const GO_CAPNP: &str = r#"@0xd12a1c51fedd6c88;
annotation package(file) :Text $id(0xbea97f1023792be0);
annotation import(file) :Text $id(0xe130b601260e44b5);
"#;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{tool} failed with status {status}: {stderr}")]
    ToolFailed {
        tool:   String,
        status: String,
        stderr: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Skipped(String),
}

/// A scratch directory, removed with everything in it on drop.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> Result<Self, HarnessError> {
        let dir = tempfile::Builder::new().prefix("bambam_").tempdir()?;
        debug!(path = %dir.path().display(), "created scratch directory");
        Ok(Scratch { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf, HarnessError> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }
}

/// The external tools found on this machine.
#[derive(Debug, Clone, Default)]
pub struct Toolchain {
    pub capnp: Option<PathBuf>,
    pub gofmt: Option<PathBuf>,
}

impl Toolchain {
    /// Looks up each tool by its override variable, then by name on `PATH`.
    pub fn detect() -> Self {
        let toolchain = Toolchain {
            capnp: locate(CAPNP_ENV, "capnp"),
            gofmt: locate(GOFMT_ENV, "gofmt"),
        };
        info!(capnp = ?toolchain.capnp, gofmt = ?toolchain.gofmt, "detected toolchain");
        toolchain
    }

    /// Compiles `schema` with `capnp compile -o-`, next to a `go.capnp`.
    pub fn check_schema(&self, schema: &str) -> Result<Verdict, HarnessError> {
        let Some(capnp) = &self.capnp else {
            return Ok(Verdict::Skipped("capnp not found".to_string()));
        };
        let scratch = Scratch::new()?;
        scratch.write("go.capnp", GO_CAPNP)?;
        let schema_path = scratch.write("schema.capnp", schema)?;

        let mut cmd = Command::new(capnp);
        cmd.arg("compile")
            .arg("-o-")
            .arg("-I")
            .arg(scratch.path())
            .arg(format!("--src-prefix={}", scratch.path().display()))
            .arg(&schema_path);
        run("capnp", cmd)
    }

    /// Parses `source` with `gofmt -e -l`; formatting differences are not failures.
    pub fn check_go(&self, source: &str) -> Result<Verdict, HarnessError> {
        let Some(gofmt) = &self.gofmt else {
            return Ok(Verdict::Skipped("gofmt not found".to_string()));
        };
        let scratch = Scratch::new()?;
        let go_path = scratch.write("translate.go", source)?;

        let mut cmd = Command::new(gofmt);
        cmd.arg("-e").arg("-l").arg(&go_path);
        run("gofmt", cmd)
    }
}

fn locate(var: &str, name: &str) -> Option<PathBuf> {
    let candidate = env::var_os(var)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(name));
    // A tool that can be spawned at all is considered present.
    match Command::new(&candidate).arg("--version").output() {
        Ok(_) => Some(candidate),
        Err(_) => None,
    }
}

fn run(tool: &str, mut cmd: Command) -> Result<Verdict, HarnessError> {
    debug!(tool, command = ?cmd, "running");
    let output = cmd.output()?;
    if output.status.success() {
        Ok(Verdict::Passed)
    } else {
        Err(HarnessError::ToolFailed {
            tool:   tool.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_is_removed_on_drop() {
        let scratch = Scratch::new().unwrap();
        let file = scratch.write("a.txt", "hello").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "hello");
        let dir = scratch.path().to_path_buf();
        drop(scratch);
        assert!(!dir.exists());
    }

    #[test]
    fn test_missing_tools_skip() {
        let toolchain = Toolchain::default();
        assert!(matches!(toolchain.check_schema("@0x8000000000000001;\n").unwrap(), Verdict::Skipped(_)));
        assert!(matches!(toolchain.check_go("package p\n").unwrap(), Verdict::Skipped(_)));
    }

    #[test]
    fn test_unspawnable_tool_is_not_found() {
        assert_eq!(locate("BAMBAM_TEST_UNSET_VARIABLE", "bambam-no-such-tool"), None);
    }

    #[test]
    fn test_failing_tool_reports_status() {
        let toolchain = Toolchain::detect();
        if toolchain.gofmt.is_none() {
            return;
        }
        let err = toolchain.check_go("package p\nfunc {\n").unwrap_err();
        assert!(matches!(err, HarnessError::ToolFailed { ref tool, .. } if tool == "gofmt"));
    }
}
