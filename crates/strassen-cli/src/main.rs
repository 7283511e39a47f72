//! Strassen command-line interface.
//!
//! Multiply matrices from TOML job files or directly from matrix files:
//! ```sh
//! strassen run job.toml
//! strassen multiply a.csv            # computes A·A
//! strassen multiply a.csv b.csv --element float
//! strassen validate job.toml
//! strassen topology
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use config::{
    BackendKind, ComputeConfig, ElementKind, InputConfig, JobConfig, MethodKind, OutputConfig,
};

#[derive(Parser)]
#[command(name = "strassen")]
#[command(about = "One-level Strassen multiplication over seven cooperating roles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a multiplication from a TOML job file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Multiply matrix files without a job file.
    Multiply {
        /// Left operand.
        a: PathBuf,
        /// Right operand (defaults to the left operand).
        b: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ElementKind::Int)]
        element: ElementKind,
        #[arg(long, value_enum, default_value_t = BackendKind::Cpu)]
        backend: BackendKind,
        /// Dedicated CPU thread count.
        #[arg(long)]
        threads: Option<usize>,
        #[arg(long, value_enum, default_value_t = MethodKind::Distributed)]
        method: MethodKind,
        /// Skip the reference check.
        #[arg(long)]
        no_verify: bool,
        /// Write product.csv and report.json here.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a job file and its operands without multiplying.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// Show the role table and message schedule.
    Topology {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Distributed Strassen");
            println!("====================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let out_dir = output.unwrap_or_else(|| job.output.directory.clone());
            runner::run_job(&job, &out_dir)?;
            println!("Multiplication complete.");
            Ok(())
        }
        Commands::Multiply {
            a,
            b,
            element,
            backend,
            threads,
            method,
            no_verify,
            output,
        } => {
            if threads == Some(0) {
                anyhow::bail!("--threads must be at least 1");
            }
            let save = output.is_some();
            let job = JobConfig {
                input: InputConfig { a, b, element },
                compute: ComputeConfig {
                    backend,
                    threads,
                    method,
                    verify: !no_verify,
                },
                output: OutputConfig {
                    save_csv: save,
                    save_json: save,
                    ..OutputConfig::default()
                },
            };
            let out_dir = output.unwrap_or_else(|| job.output.directory.clone());
            runner::run_job(&job, &out_dir)?;
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let n = runner::validate_job(&job)?;
            println!("Configuration is valid: {} ({}x{} operands)", config.display(), n, n);
            Ok(())
        }
        Commands::Topology { json } => {
            if json {
                println!("{}", runner::topology_json()?);
            } else {
                runner::print_topology();
            }
            Ok(())
        }
    }
}
