use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bambam_compiler::{generate_file, BambamError, Generation, GeneratorConfig};

#[derive(Parser)]
#[command(name = "bambam")]
#[command(about = "Generate a Cap'n Proto schema and Go translation functions from Go structs", long_about = None)]
struct Cli {
    /// Input `.go` source file
    input: PathBuf,

    /// Directory for `<stem>.capnp` and `translate_<stem>.go` (if omitted, prints to stdout)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Go package of the generated code
    #[arg(short, long)]
    package: Option<String>,

    /// Value of `$Go.import` in the schema
    #[arg(short, long)]
    import: Option<String>,

    /// Suffix appended to record names in the schema
    #[arg(short, long)]
    suffix: Option<String>,

    /// Schema file id, in hex
    #[arg(long, value_parser = parse_file_id)]
    file_id: Option<u64>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Bambam(#[from] BambamError),

    #[error("Input {0} is not a .go file")]
    NotGoSource(PathBuf),

    #[error("Failed to write {path}: {source}")]
    Write {
        path:   PathBuf,
        source: std::io::Error,
    },
}

fn parse_file_id(text: &str) -> Result<u64, String> {
    let digits = text.trim_start_matches('@');
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid file id {:?}: {}", text, e))
}

impl Cli {
    /// Defaults, then the config file, then flags.
    fn generator_config(&self) -> Result<GeneratorConfig, BambamError> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load(path)?,
            None => GeneratorConfig::default(),
        };
        if let Some(package) = &self.package {
            config.go_package = Some(package.clone());
        }
        if let Some(import) = &self.import {
            config.go_import = Some(import.clone());
        }
        if let Some(suffix) = &self.suffix {
            config.schema_suffix = suffix.clone();
        }
        if self.file_id.is_some() {
            config.file_id = self.file_id;
        }
        Ok(config)
    }
}

fn output_paths(input: &Path, out_dir: &Path) -> (PathBuf, PathBuf) {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (
        out_dir.join(format!("{}.capnp", stem)),
        out_dir.join(format!("translate_{}.go", stem)),
    )
}

fn write(path: &Path, contents: &str) -> Result<(), CliError> {
    fs::write(path, contents).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.input.extension().map_or(true, |ext| ext != "go") {
        return Err(CliError::NotGoSource(cli.input.clone()));
    }

    let config = cli.generator_config()?;
    let generation: Generation = generate_file(&cli.input, &config)?;
    if !generation.diagnostics.is_empty() {
        warn!(count = generation.diagnostics.len(), "some declarations were not translated");
    }

    match &cli.out_dir {
        Some(dir) => {
            let (schema_path, go_path) = output_paths(&cli.input, dir);
            fs::create_dir_all(dir).map_err(|source| CliError::Write {
                path: dir.clone(),
                source,
            })?;
            write(&schema_path, &generation.schema)?;
            write(&go_path, &generation.translator)?;
            info!(
                schema = %schema_path.display(),
                translator = %go_path.display(),
                "wrote generated files"
            );
        }
        None => print!("{}", generation.text()),
    }
    Ok(())
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli)
}
