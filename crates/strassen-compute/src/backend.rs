//! Compute backend trait and device abstraction.
//!
//! The [`ComputeBackend`] trait abstracts over the way a dense quadrant
//! product is evaluated, so that the role logic in `strassen-core` stays
//! independent of threading and kernel choices.

use std::fmt::{Debug, Display};

use ndarray::{Array2, LinalgScalar};
use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Shape mismatch: lhs is {lhs_rows}x{lhs_cols}, rhs is {rhs_rows}x{rhs_cols}")]
    ShapeMismatch {
        lhs_rows: usize,
        lhs_cols: usize,
        rhs_rows: usize,
        rhs_cols: usize,
    },

    #[error("Device error: {0}")]
    DeviceError(String),
}

/// Numeric element that can flow through the pipeline.
///
/// Integer elements carry their range so that callers can reject operands
/// whose sums and dot products would overflow. Floating-point elements are
/// unbounded for this purpose.
pub trait Element: LinalgScalar + Send + Sync + Debug + Display {
    /// Largest representable magnitude, `None` for floating point.
    const MAX_MAGNITUDE: Option<u128>;

    /// Magnitude of this value, `None` for floating point.
    fn magnitude(self) -> Option<u128>;
}

macro_rules! int_element {
    ($($t:ty),*) => {$(
        impl Element for $t {
            const MAX_MAGNITUDE: Option<u128> = Some(<$t>::MAX as u128);

            fn magnitude(self) -> Option<u128> {
                Some(self.unsigned_abs() as u128)
            }
        }
    )*};
}

macro_rules! float_element {
    ($($t:ty),*) => {$(
        impl Element for $t {
            const MAX_MAGNITUDE: Option<u128> = None;

            fn magnitude(self) -> Option<u128> {
                None
            }
        }
    )*};
}

int_element!(i32, i64);
float_element!(f32, f64);

/// Whether `weight · m²` fits in `T` when `m` bounds every entry magnitude.
///
/// A dot product of length `k` over entries bounded by `m` stays within
/// `k · m²`; callers fold sums of operands and of products into `weight`.
pub fn accumulation_fits<T: Element>(max_magnitude: u128, weight: u128) -> bool {
    match T::MAX_MAGNITUDE {
        None => true,
        Some(limit) => max_magnitude
            .checked_mul(max_magnitude)
            .and_then(|square| square.checked_mul(weight))
            .map_or(false, |bound| bound <= limit),
    }
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub compute_units: Option<usize>,
}

/// The type of compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Rayon-parallel kernel.
    Cpu,
    /// Single-threaded `ndarray` kernel.
    Serial,
}

/// Abstraction over dense matrix product kernels.
///
/// Each role performs exactly one call to [`ComputeBackend::matmul`] per
/// invocation; everything else it does is element-wise.
pub trait ComputeBackend<T: Element>: Send + Sync {
    /// Return information about the device.
    fn device_info(&self) -> DeviceInfo;

    /// Dense product `lhs · rhs` with standard O(n³) semantics.
    fn matmul(&self, lhs: &Array2<T>, rhs: &Array2<T>) -> Result<Array2<T>, ComputeError>;
}

impl<T: Element, B: ComputeBackend<T> + ?Sized> ComputeBackend<T> for Box<B> {
    fn device_info(&self) -> DeviceInfo {
        (**self).device_info()
    }

    fn matmul(&self, lhs: &Array2<T>, rhs: &Array2<T>) -> Result<Array2<T>, ComputeError> {
        (**self).matmul(lhs, rhs)
    }
}

impl<T: Element, B: ComputeBackend<T> + ?Sized> ComputeBackend<T> for std::sync::Arc<B> {
    fn device_info(&self) -> DeviceInfo {
        (**self).device_info()
    }

    fn matmul(&self, lhs: &Array2<T>, rhs: &Array2<T>) -> Result<Array2<T>, ComputeError> {
        (**self).matmul(lhs, rhs)
    }
}

/// Check that `lhs · rhs` is defined.
pub(crate) fn check_shapes<T>(lhs: &Array2<T>, rhs: &Array2<T>) -> Result<(), ComputeError> {
    if lhs.ncols() != rhs.nrows() {
        return Err(ComputeError::ShapeMismatch {
            lhs_rows: lhs.nrows(),
            lhs_cols: lhs.ncols(),
            rhs_rows: rhs.nrows(),
            rhs_cols: rhs.ncols(),
        });
    }
    Ok(())
}

/// Single-threaded backend that defers to `ndarray`'s own dot product.
///
/// Useful when the seven roles already saturate the available cores.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialBackend;

impl SerialBackend {
    pub fn new() -> Self {
        Self
    }
}

impl<T: Element> ComputeBackend<T> for SerialBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Serial (ndarray)".into(),
            backend_type: BackendType::Serial,
            compute_units: Some(1),
        }
    }

    fn matmul(&self, lhs: &Array2<T>, rhs: &Array2<T>) -> Result<Array2<T>, ComputeError> {
        check_shapes(lhs, rhs)?;
        Ok(lhs.dot(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_serial_matmul() {
        let a = array![[1_i64, 2], [3, 4]];
        let b = array![[5_i64, 6], [7, 8]];
        let c = SerialBackend.matmul(&a, &b).unwrap();
        assert_eq!(c, array![[19, 22], [43, 50]]);
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let a = Array2::<f64>::zeros((2, 3));
        let b = Array2::<f64>::zeros((2, 2));
        let err = SerialBackend.matmul(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            ComputeError::ShapeMismatch { lhs_cols: 3, rhs_rows: 2, .. }
        ));
    }

    #[test]
    fn test_boxed_backend_delegates() {
        let backend: Box<dyn ComputeBackend<i64>> = Box::new(SerialBackend);
        let c = backend.matmul(&array![[2_i64]], &array![[21_i64]]).unwrap();
        assert_eq!(c, array![[42]]);
        let info = ComputeBackend::<i64>::device_info(&backend);
        assert_eq!(info.backend_type, BackendType::Serial);
    }

    #[test]
    fn test_integer_accumulation_bounds() {
        assert!(accumulation_fits::<i64>(1 << 20, 16));
        assert!(!accumulation_fits::<i64>(i64::MAX as u128, 1));
        assert!(!accumulation_fits::<i64>(1 << 32, 16));
        assert!(!accumulation_fits::<i32>(1 << 15, 4));
        assert!(accumulation_fits::<f64>(u128::MAX, u128::MAX));
        assert_eq!(i64::MIN.magnitude(), Some(1 << 63));
        assert_eq!(2.5_f64.magnitude(), None);
    }
}
