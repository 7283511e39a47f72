//! Threaded launcher: one OS thread per role over an in-process mesh.
//!
//! The mesh has one bounded link per ordered role pair that carries traffic,
//! each sized to that link's message load from the role table, so a send
//! never waits for buffer space and the only blocking points are receives.

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use strassen_compute::{ComputeBackend, Mesh};

use crate::decompose::validate_inputs;
use crate::error::StrassenError;
use crate::protocol::{run_coordinator, run_worker};
use crate::roles::link_load;
use crate::types::{Element, Matrix, Role, Tag};

/// Outcome of one distributed multiplication.
#[derive(Debug, Clone)]
pub struct DistributedRun<T> {
    /// The product C = A·B.
    pub product: Matrix<T>,
    /// Wall-clock time from fan-out to the stitched result.
    pub elapsed: Duration,
    /// Messages sent over the mesh.
    pub messages_sent: usize,
    /// Messages received over the mesh.
    pub messages_received: usize,
}

/// Multiply `a` by `b` with seven cooperating threads.
///
/// Operand shapes are validated before any thread is started. When a role
/// fails, its endpoint is dropped, which disconnects every peer waiting on
/// it; the error reported is the first one that is not merely such a
/// disconnect.
pub fn multiply_distributed<T, B>(
    a: &Matrix<T>,
    b: &Matrix<T>,
    backend: &B,
) -> Result<DistributedRun<T>, StrassenError>
where
    T: Element,
    B: ComputeBackend<T> + ?Sized,
{
    validate_inputs(a, b)?;

    let mesh = Mesh::<Tag, Matrix<T>>::new(Role::COUNT, |source, dest| {
        match (Role::from_rank(source), Role::from_rank(dest)) {
            (Some(sender), Some(receiver)) => link_load(sender, receiver),
            _ => 0,
        }
    });
    let stats = mesh.stats();
    let mut endpoints = mesh.into_endpoints().into_iter();
    let coordinator = endpoints.next().ok_or(StrassenError::Spawn {
        role: Role::Coordinator,
        message: "mesh has no endpoints".into(),
    })?;

    let start = Instant::now();
    let (outcome, elapsed) = thread::scope(|scope| {
        let mut workers = Vec::with_capacity(Role::WORKERS.len());
        let mut failures = Vec::new();

        for (role, endpoint) in Role::WORKERS.into_iter().zip(endpoints) {
            let spawned = thread::Builder::new()
                .name(role.to_string())
                .spawn_scoped(scope, move || run_worker(role, endpoint, backend));
            match spawned {
                Ok(handle) => workers.push((role, handle)),
                Err(e) => {
                    failures.push(StrassenError::Spawn {
                        role,
                        message: e.to_string(),
                    });
                    break;
                }
            }
        }

        let result = if failures.is_empty() {
            // Unwinding drops the coordinator's endpoint, releasing the workers.
            panic::catch_unwind(AssertUnwindSafe(|| {
                run_coordinator(a, b, coordinator, backend)
            }))
            .unwrap_or(Err(StrassenError::RolePanicked(Role::Coordinator)))
        } else {
            drop(coordinator);
            Err(StrassenError::Spawn {
                role: Role::Coordinator,
                message: "not all workers started".into(),
            })
        };
        let elapsed = start.elapsed();

        for (role, handle) in workers {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failures.push(e),
                Err(_) => failures.push(StrassenError::RolePanicked(role)),
            }
        }

        let outcome = match result {
            Ok(product) if failures.is_empty() => Ok(product),
            Ok(_) => Err(root_cause(failures)),
            Err(e) => {
                failures.insert(0, e);
                Err(root_cause(failures))
            }
        };
        (outcome, elapsed)
    });

    let product = outcome?;
    let run = DistributedRun {
        product,
        elapsed,
        messages_sent: stats.sent(),
        messages_received: stats.received(),
    };
    log::info!(
        "distributed multiply of {}x{} finished in {:?} ({} messages)",
        run.product.nrows(),
        run.product.ncols(),
        run.elapsed,
        run.messages_sent
    );
    Ok(run)
}

/// Pick the error that caused a failed run. `errors` must not be empty.
fn root_cause(mut errors: Vec<StrassenError>) -> StrassenError {
    for error in &errors {
        if !error.is_disconnect() {
            log::error!("role failure: {}", error);
        }
    }
    let index = errors.iter().position(|e| !e.is_disconnect()).unwrap_or(0);
    errors.swap_remove(index)
}
