//! Quadrant decomposition and stitching.
//!
//! Quadrants are always returned as contiguous, owned copies rather than
//! views into the source matrix, so each one can be handed to another role
//! and owned there exclusively.

use ndarray::{s, Array2};
use strassen_compute::accumulation_fits;

use crate::error::{DimensionError, StrassenError};
use crate::types::{Element, Matrix, Operand, QuadrantMap, QuadrantName};

/// The four quadrants of one square matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Quadrants<T> {
    pub top_left: Matrix<T>,
    pub top_right: Matrix<T>,
    pub bottom_left: Matrix<T>,
    pub bottom_right: Matrix<T>,
}

impl<T: Element> Quadrants<T> {
    /// Quadrant at (row half, column half).
    pub fn at(&self, position: (usize, usize)) -> Option<&Matrix<T>> {
        match position {
            (0, 0) => Some(&self.top_left),
            (0, 1) => Some(&self.top_right),
            (1, 0) => Some(&self.bottom_left),
            (1, 1) => Some(&self.bottom_right),
            _ => None,
        }
    }

    /// Side length of each quadrant.
    pub fn sub_size(&self) -> usize {
        self.top_left.nrows()
    }

    /// Reassemble the full matrix.
    pub fn stitch(&self) -> Result<Matrix<T>, DimensionError> {
        stitch(
            &self.top_left,
            &self.top_right,
            &self.bottom_left,
            &self.bottom_right,
        )
    }
}

/// Side length of a square matrix with an even, non-zero dimension.
pub fn even_dimension<T>(matrix: &Matrix<T>) -> Result<usize, DimensionError> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(DimensionError::NotSquare { rows, cols });
    }
    if rows == 0 {
        return Err(DimensionError::Empty);
    }
    if rows % 2 != 0 {
        return Err(DimensionError::OddDimension(rows));
    }
    Ok(rows)
}

/// Check that A and B can go through the one-level pipeline and return the
/// quadrant side length.
pub fn validate_operands<T>(a: &Matrix<T>, b: &Matrix<T>) -> Result<usize, DimensionError> {
    if a.dim() != b.dim() {
        return Err(DimensionError::Mismatched {
            a_rows: a.nrows(),
            a_cols: a.ncols(),
            b_rows: b.nrows(),
            b_cols: b.ncols(),
        });
    }
    Ok(even_dimension(a)? / 2)
}

/// Fail when entries of A and B are large enough that `weight` accumulated
/// products of them could overflow `T`.
pub fn check_range<T: Element>(
    a: &Matrix<T>,
    b: &Matrix<T>,
    weight: usize,
) -> Result<(), StrassenError> {
    let max_magnitude = a
        .iter()
        .chain(b.iter())
        .filter_map(|v| v.magnitude())
        .max()
        .unwrap_or(0);
    if accumulation_fits::<T>(max_magnitude, weight as u128) {
        Ok(())
    } else {
        Err(StrassenError::Overflow {
            max_magnitude,
            weight,
        })
    }
}

/// Shape and range checks for one-level Strassen; returns the quadrant side.
///
/// Quadrant sums double entry magnitudes, each product is a dot product of
/// length n/2, and a result quadrant adds up to four products, so no
/// intermediate exceeds `8n · max²`.
pub fn validate_inputs<T: Element>(a: &Matrix<T>, b: &Matrix<T>) -> Result<usize, StrassenError> {
    let sub = validate_operands(a, b)?;
    check_range(a, b, 16 * sub)?;
    Ok(sub)
}

/// Split a square matrix of even dimension into four owned quadrants.
pub fn decompose<T: Element>(matrix: &Matrix<T>) -> Result<Quadrants<T>, DimensionError> {
    let sub = even_dimension(matrix)? / 2;
    Ok(Quadrants {
        top_left: matrix.slice(s![..sub, ..sub]).to_owned(),
        top_right: matrix.slice(s![..sub, sub..]).to_owned(),
        bottom_left: matrix.slice(s![sub.., ..sub]).to_owned(),
        bottom_right: matrix.slice(s![sub.., sub..]).to_owned(),
    })
}

/// Decompose both operands into the eight named quadrants `a11..b22`.
pub fn operand_quadrants<T: Element>(
    a: &Matrix<T>,
    b: &Matrix<T>,
) -> Result<QuadrantMap<T>, DimensionError> {
    validate_operands(a, b)?;
    let a = decompose(a)?;
    let b = decompose(b)?;

    let mut map = QuadrantMap::new();
    for name in QuadrantName::ALL {
        let source = match name.operand() {
            Operand::A => &a,
            Operand::B => &b,
        };
        if let Some(block) = source.at(name.position()) {
            map.insert(name, block.clone());
        }
    }
    Ok(map)
}

/// Stitch four equal square blocks into one matrix twice their size.
pub fn stitch<T: Element>(
    c11: &Matrix<T>,
    c12: &Matrix<T>,
    c21: &Matrix<T>,
    c22: &Matrix<T>,
) -> Result<Matrix<T>, DimensionError> {
    let sub = c11.nrows();
    for (name, block) in [("C11", c11), ("C12", c12), ("C21", c21), ("C22", c22)] {
        if block.dim() != (sub, sub) {
            return Err(DimensionError::BlockShape {
                name: name.to_string(),
                rows: block.nrows(),
                cols: block.ncols(),
                expected: sub,
            });
        }
    }

    let mut out = Array2::zeros((2 * sub, 2 * sub));
    out.slice_mut(s![..sub, ..sub]).assign(c11);
    out.slice_mut(s![..sub, sub..]).assign(c12);
    out.slice_mut(s![sub.., ..sub]).assign(c21);
    out.slice_mut(s![sub.., sub..]).assign(c22);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn counting(n: usize) -> Matrix<i64> {
        Array2::from_shape_fn((n, n), |(i, j)| (i * n + j + 1) as i64)
    }

    #[test]
    fn test_decompose_4x4() {
        let q = decompose(&counting(4)).unwrap();
        assert_eq!(q.top_left, array![[1, 2], [5, 6]]);
        assert_eq!(q.top_right, array![[3, 4], [7, 8]]);
        assert_eq!(q.bottom_left, array![[9, 10], [13, 14]]);
        assert_eq!(q.bottom_right, array![[11, 12], [15, 16]]);
        assert_eq!(q.sub_size(), 2);
    }

    #[test]
    fn test_quadrants_are_contiguous_copies() {
        let m = counting(6);
        let q = decompose(&m).unwrap();
        for block in [&q.top_left, &q.top_right, &q.bottom_left, &q.bottom_right] {
            assert!(block.is_standard_layout());
            assert_eq!(block.dim(), (3, 3));
        }
        drop(m);
        assert_eq!(q.bottom_right[[2, 2]], 36);
    }

    #[test]
    fn test_round_trip() {
        for n in [2, 4, 8, 10] {
            let m = counting(n);
            assert_eq!(decompose(&m).unwrap().stitch().unwrap(), m);
        }
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert_eq!(
            decompose(&counting(3)).unwrap_err(),
            DimensionError::OddDimension(3)
        );
        assert_eq!(
            decompose(&Array2::<i64>::zeros((2, 4))).unwrap_err(),
            DimensionError::NotSquare { rows: 2, cols: 4 }
        );
        assert_eq!(
            decompose(&Array2::<i64>::zeros((0, 0))).unwrap_err(),
            DimensionError::Empty
        );
    }

    #[test]
    fn test_validate_operands() {
        assert_eq!(validate_operands(&counting(4), &counting(4)), Ok(2));
        assert!(matches!(
            validate_operands(&counting(4), &counting(2)),
            Err(DimensionError::Mismatched { a_rows: 4, b_rows: 2, .. })
        ));
        assert_eq!(
            validate_operands(&counting(3), &counting(3)),
            Err(DimensionError::OddDimension(3))
        );
    }

    #[test]
    fn test_operand_quadrants_names() {
        let a = counting(4);
        let b = a.mapv(|v| -v);
        let map = operand_quadrants(&a, &b).unwrap();
        assert_eq!(map.len(), 8);
        assert_eq!(map[&QuadrantName::A12], array![[3, 4], [7, 8]]);
        assert_eq!(map[&QuadrantName::B21], array![[-9, -10], [-13, -14]]);
    }

    #[test]
    fn test_stitch_rejects_uneven_blocks() {
        let two = Array2::<i64>::zeros((2, 2));
        let three = Array2::<i64>::zeros((3, 3));
        assert!(matches!(
            stitch(&two, &two, &three, &two),
            Err(DimensionError::BlockShape { ref name, .. }) if name == "C21"
        ));
    }

    #[test]
    fn test_range_check_bounds_integer_accumulation() {
        let small = counting(4);
        assert_eq!(validate_inputs(&small, &small).unwrap(), 2);

        let big = array![[1_i64, i64::MAX], [1, -1]];
        assert!(matches!(
            validate_inputs(&big, &big),
            Err(StrassenError::Overflow { weight: 16, .. })
        ));
        let wide = array![[1_i64 << 32, 0], [0, 0]];
        assert!(matches!(
            validate_inputs(&wide, &wide),
            Err(StrassenError::Overflow { max_magnitude, .. }) if max_magnitude == 1 << 32
        ));

        // 8n·m² = 16·(2^29)² = 2^62 still fits.
        let edge = array![[1_i64 << 29, 0], [0, -(1 << 29)]];
        assert!(validate_inputs(&edge, &edge).is_ok());

        let floats = array![[f64::MAX, 1.0], [1.0, 1.0]];
        assert!(check_range(&floats, &floats, 1 << 20).is_ok());
    }
}
