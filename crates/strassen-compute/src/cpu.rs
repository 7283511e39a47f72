//! CPU compute backend using Rayon for shared-memory parallelism.

use std::sync::Arc;

use ndarray::Array2;
use rayon::prelude::*;

use crate::backend::{check_shapes, BackendType, ComputeBackend, ComputeError, DeviceInfo, Element};

/// CPU backend that parallelises the output elements of a product across
/// threads via Rayon.
///
/// Every output element is a single sequential row·column dot product, so
/// results are bit-identical across runs regardless of thread count.
pub struct CpuBackend {
    num_threads: usize,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl CpuBackend {
    /// Create a new CPU backend on the global Rayon pool.
    pub fn new() -> Self {
        Self {
            num_threads: rayon::current_num_threads(),
            pool: None,
        }
    }

    /// Create a CPU backend with a dedicated pool of `num_threads` threads.
    pub fn with_threads(num_threads: usize) -> Result<Self, ComputeError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("strassen-cpu-{i}"))
            .build()
            .map_err(|e| ComputeError::Unavailable(e.to_string()))?;
        Ok(Self {
            num_threads: pool.current_num_threads(),
            pool: Some(Arc::new(pool)),
        })
    }

    fn fill<T: Element>(&self, lhs: &Array2<T>, rhs: &Array2<T>) -> Vec<T> {
        let rows = lhs.nrows();
        let cols = rhs.ncols();
        (0..rows * cols)
            .into_par_iter()
            .map(|idx| {
                let i = idx / cols;
                let j = idx % cols;
                lhs.row(i).dot(&rhs.column(j))
            })
            .collect()
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> ComputeBackend<T> for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!("CPU ({} threads)", self.num_threads),
            backend_type: BackendType::Cpu,
            compute_units: Some(self.num_threads),
        }
    }

    fn matmul(&self, lhs: &Array2<T>, rhs: &Array2<T>) -> Result<Array2<T>, ComputeError> {
        check_shapes(lhs, rhs)?;

        let data = match &self.pool {
            Some(pool) => pool.install(|| self.fill(lhs, rhs)),
            None => self.fill(lhs, rhs),
        };

        Array2::from_shape_vec((lhs.nrows(), rhs.ncols()), data)
            .map_err(|e| ComputeError::DeviceError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SerialBackend;
    use ndarray::array;

    #[test]
    fn test_matches_serial_kernel() {
        let a = Array2::from_shape_fn((5, 3), |(i, j)| (i * 3 + j) as i64 - 4);
        let b = Array2::from_shape_fn((3, 4), |(i, j)| (i as i64 + 1) * (j as i64 - 2));
        let cpu = CpuBackend::new().matmul(&a, &b).unwrap();
        let serial = SerialBackend.matmul(&a, &b).unwrap();
        assert_eq!(cpu, serial);
    }

    #[test]
    fn test_dedicated_pool() {
        let backend = CpuBackend::with_threads(2).unwrap();
        let info = <CpuBackend as ComputeBackend<f64>>::device_info(&backend);
        assert_eq!(info.compute_units, Some(2));

        let a = array![[1.5, -2.0], [0.25, 4.0]];
        let identity = array![[1.0, 0.0], [0.0, 1.0]];
        assert_eq!(backend.matmul(&a, &identity).unwrap(), a);
    }

    #[test]
    fn test_empty_product() {
        let a = Array2::<i64>::zeros((0, 0));
        let c = CpuBackend::new().matmul(&a, &a).unwrap();
        assert_eq!(c.dim(), (0, 0));
    }
}
