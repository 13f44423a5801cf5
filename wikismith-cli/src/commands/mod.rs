//! CLI command implementations.

pub mod build;
pub mod watch;

pub use build::build_site;
pub use watch::watch_site;

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use wikismith_core::{CompileReport, Compiler, Config, FsLoader, FsSaver};

/// Resolved locations for one site
#[derive(Debug, Clone)]
pub struct SitePaths {
    pub config: Option<PathBuf>,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl SitePaths {
    /// Canonicalize the input and output directories. The output may not
    /// exist yet, but must not contain the input.
    pub fn new(config: Option<PathBuf>, input: PathBuf, output: PathBuf) -> Result<Self> {
        let input = input
            .canonicalize()
            .with_context(|| format!("Input directory {:?} not found", input))?;
        if !input.is_dir() {
            bail!("Input {:?} is not a directory", input);
        }
        let output = resolve_output(&output)?;
        if input.starts_with(&output) {
            bail!(
                "Output directory {:?} would overwrite the input directory {:?}",
                output,
                input
            );
        }

        Ok(Self {
            config,
            input,
            output,
        })
    }

    /// Output location relative to the input, when it lives inside it
    pub fn output_within_input(&self) -> Option<&Path> {
        self.output.strip_prefix(&self.input).ok()
    }

    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => {
                tracing::info!("Loading config from {:?}", path);
                Config::from_file(path).context("Failed to load configuration")
            }
            None => Config::discover(&self.input).context("Failed to load configuration"),
        }
    }
}

/// Absolute output path with symlinks resolved as far as the path exists
fn resolve_output(output: &Path) -> Result<PathBuf> {
    if let Ok(path) = output.canonicalize() {
        return Ok(path);
    }
    let absolute = std::path::absolute(output)
        .with_context(|| format!("Invalid output path {:?}", output))?;
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => Ok(resolve_output(parent)?.join(name)),
        _ => Ok(absolute),
    }
}

/// Load the configuration and run one compilation
pub fn compile(site: &SitePaths) -> Result<CompileReport> {
    let config = site.load_config()?;

    let mut loader = FsLoader::new(&site.input);
    if let Some(rel) = site.output_within_input() {
        tracing::debug!("Excluding output folder {:?} from sources", rel);
        loader = loader.excluding(rel);
    }
    let saver = FsSaver::new(&site.output);

    Compiler::new(config, &loader, &saver)
        .compile()
        .context("Failed to compile wiki")
}
