//! Seven-role distributed Strassen over the in-process mesh.

use strassen_compute::ComputeBackend;

use super::Multiplier;
use crate::cluster::{multiply_distributed, DistributedRun};
use crate::error::StrassenError;
use crate::types::{Element, Matrix};

/// Distributed one-level Strassen, one thread per role.
pub struct DistributedStrassen<B> {
    pub backend: B,
}

impl<B> DistributedStrassen<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Multiply and also report timing and message counts.
    pub fn run<T>(&self, a: &Matrix<T>, b: &Matrix<T>) -> Result<DistributedRun<T>, StrassenError>
    where
        T: Element,
        B: ComputeBackend<T>,
    {
        multiply_distributed(a, b, &self.backend)
    }
}

impl<T, B> Multiplier<T> for DistributedStrassen<B>
where
    T: Element,
    B: ComputeBackend<T>,
{
    fn multiply(&self, a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>, StrassenError> {
        self.run(a, b).map(|run| run.product)
    }

    fn method_name(&self) -> &str {
        "distributed Strassen (7 roles)"
    }
}
