//! Job runner: reads operands, multiplies, verifies and writes results.

use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use strassen_compute::{ComputeBackend, CpuBackend, SerialBackend};
use strassen_core::io::{read_matrix, to_csv, to_rows, write_csv};
use strassen_core::method::{LocalStrassen, Multiplier, ReferenceMultiplier};
use strassen_core::{multiply_distributed, roles, Element, Matrix};

use crate::config::{BackendKind, ElementKind, JobConfig, MethodKind};

/// Element types the CLI can read, print and check.
pub trait CliElement: Element + FromStr + Serialize {
    /// Whether a computed entry matches the reference entry.
    fn agrees(computed: Self, reference: Self) -> bool;
}

impl CliElement for i64 {
    fn agrees(computed: Self, reference: Self) -> bool {
        computed == reference
    }
}

impl CliElement for f64 {
    fn agrees(computed: Self, reference: Self) -> bool {
        let scale = computed.abs().max(reference.abs()).max(1.0);
        (computed - reference).abs() <= 1e-9 * scale
    }
}

/// Summary of one job, also written as the JSON report.
#[derive(Debug, Serialize)]
pub struct JobReport {
    pub n: usize,
    pub element: ElementKind,
    pub method: MethodKind,
    pub backend: String,
    pub elapsed_seconds: f64,
    /// Mesh messages; absent for the local method.
    pub messages: Option<usize>,
    /// Reference check outcome; absent when verification is off.
    pub verified: Option<bool>,
}

#[derive(Serialize)]
struct JsonReport<'a, T> {
    #[serde(flatten)]
    report: &'a JobReport,
    product: Vec<Vec<T>>,
}

/// Run a job with the element type it names.
pub fn run_job(job: &JobConfig, out_dir: &Path) -> Result<JobReport> {
    match job.input.element {
        ElementKind::Int => run_typed::<i64>(job, out_dir),
        ElementKind::Float => run_typed::<f64>(job, out_dir),
    }
}

fn run_typed<T: CliElement>(job: &JobConfig, out_dir: &Path) -> Result<JobReport> {
    let (a, b) = load_operands::<T>(job)?;
    let n = a.nrows();
    let show = n <= job.output.print_limit;
    if show {
        print_matrix("A", &a);
        if job.input.b.is_some() {
            print_matrix("B", &b);
        }
    }

    let backend = create_backend::<T>(job.compute.backend, job.compute.threads)?;
    let backend_name = ComputeBackend::<T>::device_info(backend.as_ref()).name;
    println!("Backend: {}", backend_name);

    let (product, elapsed, messages) = match job.compute.method {
        MethodKind::Distributed => {
            let run = multiply_distributed(&a, &b, backend.as_ref())?;
            (run.product, run.elapsed, Some(run.messages_sent))
        }
        MethodKind::Local => {
            let local = LocalStrassen::new(backend);
            let start = Instant::now();
            let product = local.multiply(&a, &b)?;
            (product, start.elapsed(), None)
        }
    };

    if show {
        print_matrix("C", &product);
    }
    println!("Elapsed: {:.6} s", elapsed.as_secs_f64());
    if let Some(count) = messages {
        println!(
            "Messages: {} ({} quadrant fan-out)",
            count,
            roles::fan_out_count()
        );
    }

    let verified = if job.compute.verify {
        let ok = verify(&a, &b, &product)?;
        println!("Reference check: {}", if ok { "passed" } else { "FAILED" });
        Some(ok)
    } else {
        None
    };

    let report = JobReport {
        n,
        element: job.input.element,
        method: job.compute.method,
        backend: backend_name,
        elapsed_seconds: elapsed.as_secs_f64(),
        messages,
        verified,
    };

    if job.output.save_csv {
        let path = out_dir.join("product.csv");
        write_csv(&product, &path).with_context(|| format!("writing {}", path.display()))?;
        println!("Product written to: {}", path.display());
    }
    if job.output.save_json {
        let path = out_dir.join("report.json");
        write_report(&report, &product, &path)?;
        println!("Report (JSON) written to: {}", path.display());
    }

    if verified == Some(false) {
        anyhow::bail!("product does not match the reference multiplication");
    }
    Ok(report)
}

/// Read both operands; B is A when the job names no second file.
fn load_operands<T: CliElement>(job: &JobConfig) -> Result<(Matrix<T>, Matrix<T>)> {
    let a: Matrix<T> = read_matrix(&job.input.a)
        .with_context(|| format!("reading matrix {}", job.input.a.display()))?;
    let b = match &job.input.b {
        Some(path) => {
            read_matrix(path).with_context(|| format!("reading matrix {}", path.display()))?
        }
        None => a.clone(),
    };
    log::info!(
        "loaded operands {}x{} and {}x{}",
        a.nrows(),
        a.ncols(),
        b.nrows(),
        b.ncols()
    );
    Ok((a, b))
}

/// Check operands for the job without multiplying.
pub fn validate_job(job: &JobConfig) -> Result<usize> {
    match job.input.element {
        ElementKind::Int => validate_typed::<i64>(job),
        ElementKind::Float => validate_typed::<f64>(job),
    }
}

fn validate_typed<T: CliElement>(job: &JobConfig) -> Result<usize> {
    let (a, b) = load_operands::<T>(job)?;
    strassen_core::decompose::validate_inputs(&a, &b)?;
    Ok(a.nrows())
}

fn verify<T: CliElement>(a: &Matrix<T>, b: &Matrix<T>, product: &Matrix<T>) -> Result<bool> {
    let reference = ReferenceMultiplier.multiply(a, b)?;
    let mismatches = product
        .iter()
        .zip(reference.iter())
        .filter(|&(&c, &r)| !T::agrees(c, r))
        .count();
    if mismatches > 0 {
        log::error!("{} entries differ from the reference product", mismatches);
    }
    Ok(mismatches == 0 && product.dim() == reference.dim())
}

fn write_report<T: CliElement>(report: &JobReport, product: &Matrix<T>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&JsonReport {
        report,
        product: to_rows(product),
    })
    .context("serialising JSON report")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn print_matrix<T: Element>(label: &str, matrix: &Matrix<T>) {
    println!("{} =", label);
    print!("{}", to_csv(matrix));
}

/// Create a compute backend from the job's choice.
fn create_backend<T: Element>(
    kind: BackendKind,
    threads: Option<usize>,
) -> Result<Box<dyn ComputeBackend<T>>> {
    let backend: Box<dyn ComputeBackend<T>> = match (kind, threads) {
        (BackendKind::Serial, Some(_)) => {
            log::warn!("compute.threads is ignored by the serial backend");
            Box::new(SerialBackend)
        }
        (BackendKind::Serial, None) => Box::new(SerialBackend),
        (BackendKind::Cpu, Some(n)) => Box::new(CpuBackend::with_threads(n)?),
        (BackendKind::Cpu, None) => Box::new(CpuBackend::new()),
    };
    Ok(backend)
}

/// Print the role table and the per-invocation message schedule.
pub fn print_topology() {
    println!("Role table:");
    println!(
        "  {:<12} {:<9} {:<22} {:<26} {}",
        "role", "computes", "relays to", "receives", "assembles"
    );
    for spec in &roles::ROLE_TABLE {
        let relays: Vec<String> = spec.relays_to.iter().map(|r| r.to_string()).collect();
        let receives: Vec<String> = spec
            .receives
            .iter()
            .map(|(product, from)| format!("{product}<-{from}"))
            .collect();
        println!(
            "  {:<12} {:<9} {:<22} {:<26} {}",
            spec.role.to_string(),
            spec.computes.to_string(),
            relays.join(", "),
            receives.join(", "),
            spec.assembles.map(|q| q.to_string()).unwrap_or_default()
        );
    }
    println!();
    println!("Message schedule:");
    for (i, message) in roles::schedule().iter().enumerate() {
        println!(
            "  {:>2}. {:<12} -> {:<12} {}",
            i + 1,
            message.sender.to_string(),
            message.receiver.to_string(),
            message.tag
        );
    }
    println!();
    println!(
        "{} messages per multiplication ({} quadrant fan-out)",
        roles::message_count(),
        roles::fan_out_count()
    );
}

/// Role table and schedule as JSON.
pub fn topology_json() -> Result<String> {
    #[derive(Serialize)]
    struct Topology {
        roles: &'static [roles::RoleSpec],
        schedule: Vec<roles::Message>,
    }
    let topology = Topology {
        roles: &roles::ROLE_TABLE,
        schedule: roles::schedule(),
    };
    serde_json::to_string_pretty(&topology).context("serialising topology")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn job_in(dir: &Path, extra: &str) -> JobConfig {
        let mut job = parse_config(&format!("[input]\na = \"a.csv\"\n{extra}")).unwrap();
        job.input.a = dir.join("a.csv");
        job.input.b = job.input.b.take().map(|b| dir.join(b));
        job
    }

    #[test]
    fn test_squares_single_input_and_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.csv"),
            "1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16\n",
        )
        .unwrap();
        let job = job_in(dir.path(), "[output]\nsave_json = true\n");
        let out = dir.path().join("out");

        let report = run_job(&job, &out).unwrap();
        assert_eq!(report.n, 4);
        assert_eq!(report.messages, Some(32));
        assert_eq!(report.verified, Some(true));

        let csv = std::fs::read_to_string(out.join("product.csv")).unwrap();
        assert_eq!(csv.lines().next(), Some("90,100,110,120"));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("report.json")).unwrap())
                .unwrap();
        assert_eq!(json["product"][3][3], 600);
        assert_eq!(json["method"], "distributed");
    }

    #[test]
    fn test_local_float_job() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "0.5 1.5\n-2 4\n").unwrap();
        std::fs::write(dir.path().join("b.csv"), "1,0,0,1").unwrap();
        let job = job_in(
            dir.path(),
            concat!(
                "b = \"b.csv\"\nelement = \"float\"\n",
                "[compute]\nmethod = \"local\"\nbackend = \"serial\"\n",
                "[output]\nsave_csv = false\n",
            ),
        );
        let report = run_job(&job, &dir.path().join("out")).unwrap();
        assert_eq!(report.messages, None);
        assert_eq!(report.verified, Some(true));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_validate_rejects_odd_dimension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "1,2,3,4,5,6,7,8,9").unwrap();
        let job = job_in(dir.path(), "");
        let err = validate_job(&job).unwrap_err();
        assert!(err.to_string().contains("even"), "{err}");
    }

    #[test]
    fn test_overflowing_integers_fail_instead_of_wrapping() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "1,9223372036854775807,1,-1").unwrap();
        let job = job_in(dir.path(), "");
        let err = validate_job(&job).unwrap_err();
        assert!(err.to_string().contains("overflow"), "{err}");
        assert!(run_job(&job, &dir.path().join("out")).is_err());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_float_agreement_is_relative() {
        assert!(f64::agrees(1e12 + 1e-3, 1e12));
        assert!(!f64::agrees(1.0, 1.001));
        assert!(!i64::agrees(1, 2));
    }

    #[test]
    fn test_topology_json_lists_every_role() {
        let json: serde_json::Value = serde_json::from_str(&topology_json().unwrap()).unwrap();
        assert_eq!(json["roles"].as_array().map(Vec::len), Some(7));
        assert_eq!(json["schedule"].as_array().map(Vec::len), Some(32));
    }
}
