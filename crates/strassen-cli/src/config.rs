//! TOML configuration deserialisation for multiplication jobs.
//!
//! ```toml
//! [input]
//! a = "data/a.csv"
//! b = "data/b.csv"      # optional, defaults to `a`
//! element = "int"       # "int" or "float"
//!
//! [compute]
//! backend = "cpu"       # "cpu" or "serial"
//! threads = 4           # optional, cpu only
//! method = "distributed"
//! verify = true
//!
//! [output]
//! directory = "./output"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub compute: ComputeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Operand files and their element type.
#[derive(Debug, Deserialize)]
pub struct InputConfig {
    pub a: PathBuf,
    /// Right operand; the left operand is squared when absent.
    #[serde(default)]
    pub b: Option<PathBuf>,
    #[serde(default)]
    pub element: ElementKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    #[default]
    Int,
    Float,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Cpu,
    Serial,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    /// Seven roles exchanging messages.
    #[default]
    Distributed,
    /// Same products and assemblies, no messaging.
    Local,
}

/// Compute parameters.
#[derive(Debug, Deserialize)]
pub struct ComputeConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Dedicated pool size for the CPU backend (default: global pool).
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub method: MethodKind,
    /// Check the result against a direct dense product (default: true).
    #[serde(default = "default_true")]
    pub verify: bool,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            threads: None,
            method: MethodKind::default(),
            verify: true,
        }
    }
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    /// Whether to save the product as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_csv: bool,
    /// Whether to also save a JSON report with the product (default: false).
    #[serde(default)]
    pub save_json: bool,
    /// Print operands and product to stdout when n is at most this (default: 8).
    #[serde(default = "default_print_limit")]
    pub print_limit: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_csv: true,
            save_json: false,
            print_limit: default_print_limit(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}
fn default_true() -> bool {
    true
}
fn default_print_limit() -> usize {
    8
}

impl JobConfig {
    /// Resolve relative input paths against the directory holding the job file.
    fn resolve_paths(&mut self, base: &Path) {
        if self.input.a.is_relative() {
            self.input.a = base.join(&self.input.a);
        }
        if let Some(b) = self.input.b.as_mut() {
            if b.is_relative() {
                *b = base.join(&*b);
            }
        }
    }
}

/// Parse a job configuration from TOML text.
pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    if config.compute.threads == Some(0) {
        anyhow::bail!("compute.threads must be at least 1");
    }
    Ok(config)
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading job file {}", path.display()))?;
    let mut config =
        parse_config(&content).with_context(|| format!("parsing job file {}", path.display()))?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let job = parse_config("[input]\na = \"m.csv\"\n").unwrap();
        assert_eq!(job.input.element, ElementKind::Int);
        assert_eq!(job.compute.backend, BackendKind::Cpu);
        assert_eq!(job.compute.method, MethodKind::Distributed);
        assert!(job.compute.verify);
        assert!(job.output.save_csv);
        assert!(!job.output.save_json);
        assert_eq!(job.input.b, None);
    }

    #[test]
    fn test_full_config() {
        let job = parse_config(
            r#"
            [input]
            a = "a.txt"
            b = "b.txt"
            element = "float"

            [compute]
            backend = "serial"
            method = "local"
            verify = false

            [output]
            directory = "out"
            save_json = true
            print_limit = 0
            "#,
        )
        .unwrap();
        assert_eq!(job.input.element, ElementKind::Float);
        assert_eq!(job.input.b.as_deref(), Some(Path::new("b.txt")));
        assert_eq!(job.compute.backend, BackendKind::Serial);
        assert_eq!(job.compute.method, MethodKind::Local);
        assert!(!job.compute.verify);
        assert_eq!(job.output.directory, PathBuf::from("out"));
        assert!(job.output.save_json);
        assert_eq!(job.output.print_limit, 0);
    }

    #[test]
    fn test_rejects_unknown_backend_and_zero_threads() {
        assert!(parse_config("[input]\na = \"m\"\n[compute]\nbackend = \"gpu\"\n").is_err());
        assert!(parse_config("[input]\na = \"m\"\n[compute]\nthreads = 0\n").is_err());
        assert!(parse_config("[compute]\nbackend = \"cpu\"\n").is_err());
    }

    #[test]
    fn test_inputs_resolve_against_job_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");
        std::fs::write(&path, "[input]\na = \"m.csv\"\nb = \"/abs/b.csv\"\n").unwrap();
        let job = load_config(&path).unwrap();
        assert_eq!(job.input.a, dir.path().join("m.csv"));
        assert_eq!(job.input.b, Some(PathBuf::from("/abs/b.csv")));
    }
}
