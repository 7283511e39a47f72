//! Direct dense product used as the sanity reference.

use super::Multiplier;
use crate::decompose::check_range;
use crate::error::{DimensionError, StrassenError};
use crate::types::{Element, Matrix};

/// `a · b` in one dense multiply, no decomposition.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceMultiplier;

impl<T: Element> Multiplier<T> for ReferenceMultiplier {
    fn multiply(&self, a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>, StrassenError> {
        if a.ncols() != b.nrows() {
            return Err(DimensionError::Mismatched {
                a_rows: a.nrows(),
                a_cols: a.ncols(),
                b_rows: b.nrows(),
                b_cols: b.ncols(),
            }
            .into());
        }
        check_range(a, b, a.ncols())?;
        Ok(a.dot(b))
    }

    fn method_name(&self) -> &str {
        "reference dense product"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rectangular_product() {
        let a = array![[1_i64, 2, 3]];
        let b = array![[1_i64], [1], [1]];
        assert_eq!(ReferenceMultiplier.multiply(&a, &b).unwrap(), array![[6]]);
        assert!(ReferenceMultiplier.multiply(&b, &b).is_err());
    }

    #[test]
    fn test_rejects_entries_that_overflow() {
        let a = array![[1_i64 << 31, 0], [0, 1]];
        assert!(matches!(
            ReferenceMultiplier.multiply(&a, &a),
            Err(StrassenError::Overflow { weight: 2, .. })
        ));
        let ok = array![[1_i64 << 30, 0], [0, 1]];
        assert!(ReferenceMultiplier.multiply(&ok, &ok).is_ok());
    }
}
