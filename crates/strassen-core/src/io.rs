//! Plain-text matrix files.
//!
//! Input files hold a flat sequence of numbers separated by commas and/or
//! whitespace, on one line or many:
//! ```text
//! 1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16
//! ```
//! The tokens are reshaped row-major into an n×n matrix with
//! n = floor(sqrt(token count)); tokens beyond n² are ignored.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::types::{Element, Matrix};

/// Errors while reading or writing matrix files.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to access file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    FormatError { line: usize, message: String },

    #[error("No numeric values found")]
    Empty,
}

/// Parse a matrix from text.
pub fn parse_matrix<T>(content: &str) -> Result<Matrix<T>, ParseError>
where
    T: Element + FromStr,
{
    let mut values: Vec<T> = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let tokens = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty());
        for token in tokens {
            let value = token.parse().map_err(|_| ParseError::FormatError {
                line: idx + 1,
                message: format!("Invalid number: '{}'", token),
            })?;
            values.push(value);
        }
    }

    if values.is_empty() {
        return Err(ParseError::Empty);
    }

    let n = integer_sqrt(values.len());
    if n * n != values.len() {
        log::warn!(
            "{} values is not a perfect square; using the first {} as a {}x{} matrix",
            values.len(),
            n * n,
            n,
            n
        );
        values.truncate(n * n);
    }

    Matrix::from_shape_vec((n, n), values).map_err(|e| ParseError::FormatError {
        line: 1,
        message: e.to_string(),
    })
}

/// Read a matrix from a file.
pub fn read_matrix<T>(path: &Path) -> Result<Matrix<T>, ParseError>
where
    T: Element + FromStr,
{
    let content = fs::read_to_string(path)?;
    parse_matrix(&content)
}

/// Render a matrix as CSV, one row per line.
pub fn to_csv<T: Element>(matrix: &Matrix<T>) -> String {
    let mut out = String::new();
    for row in matrix.rows() {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// Write a matrix as CSV, creating parent directories as needed.
pub fn write_csv<T: Element>(matrix: &Matrix<T>, path: &Path) -> Result<(), ParseError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_csv(matrix))?;
    Ok(())
}

/// Matrix as nested row vectors, for serialisation.
pub fn to_rows<T: Element>(matrix: &Matrix<T>) -> Vec<Vec<T>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}

fn integer_sqrt(count: usize) -> usize {
    let mut n = (count as f64).sqrt() as usize;
    while n * n > count {
        n -= 1;
    }
    while (n + 1) * (n + 1) <= count {
        n += 1;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_parse_single_line() {
        let m: Matrix<i64> = parse_matrix("1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16\n").unwrap();
        assert_eq!(m.dim(), (4, 4));
        assert_eq!(m[[1, 0]], 5);
        assert_eq!(m[[3, 3]], 16);
    }

    #[test]
    fn test_parse_rows_and_spaces() {
        let m: Matrix<f64> = parse_matrix("1.5, 2\n-3 4e1\n").unwrap();
        assert_eq!(m, array![[1.5, 2.0], [-3.0, 40.0]]);
    }

    #[test]
    fn test_extra_tokens_are_ignored() {
        let m: Matrix<i64> = parse_matrix("1,2,3,4,5,6,7,8").unwrap();
        assert_eq!(m, array![[1, 2], [3, 4]]);
    }

    #[test]
    fn test_bad_token_reports_line() {
        let err = parse_matrix::<i64>("1,2\n3,x\n").unwrap_err();
        assert!(matches!(err, ParseError::FormatError { line: 2, .. }));
        assert!(matches!(parse_matrix::<i64>(" \n"), Err(ParseError::Empty)));
    }

    #[test]
    fn test_integer_sqrt() {
        assert_eq!(integer_sqrt(1), 1);
        assert_eq!(integer_sqrt(15), 3);
        assert_eq!(integer_sqrt(16), 4);
        assert_eq!(integer_sqrt(1 << 40), 1 << 20);
    }

    #[test]
    fn test_csv_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("c.csv");
        let m = array![[1_i64, -2], [30, 4]];
        write_csv(&m, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1,-2\n30,4\n");
        assert_eq!(read_matrix::<i64>(&path).unwrap(), m);
        assert_eq!(to_rows(&m), vec![vec![1, -2], vec![30, 4]]);
    }
}
