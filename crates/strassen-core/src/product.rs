//! Per-role arithmetic: the seven Strassen product formulas.
//!
//! Each product is an element-wise combination of quadrants on each side
//! followed by exactly one dense multiply:
//!
//! | Product | Formula |
//! |---------|---------|
//! | m1 | (a11 + a22)·(b11 + b22) |
//! | m2 | (a21 + a22)·b11 |
//! | m3 | a11·(b12 − b22) |
//! | m4 | a22·(b21 − b11) |
//! | m5 | (a11 + a12)·b22 |
//! | m6 | (a21 − a11)·(b11 + b12) |
//! | m7 | (a12 − a22)·(b21 + b22) |

use std::collections::BTreeMap;
use std::fmt::Display;

use strassen_compute::ComputeBackend;

use crate::error::{DimensionError, StrassenError};
use crate::types::{
    format_terms, Element, Matrix, Product, QuadrantMap, QuadrantName, Role, Sign, Term,
};

use QuadrantName::*;

const M1_LHS: &[Term<QuadrantName>] = &[Term::plus(A11), Term::plus(A22)];
const M1_RHS: &[Term<QuadrantName>] = &[Term::plus(B11), Term::plus(B22)];
const M2_LHS: &[Term<QuadrantName>] = &[Term::plus(A21), Term::plus(A22)];
const M2_RHS: &[Term<QuadrantName>] = &[Term::plus(B11)];
const M3_LHS: &[Term<QuadrantName>] = &[Term::plus(A11)];
const M3_RHS: &[Term<QuadrantName>] = &[Term::plus(B12), Term::minus(B22)];
const M4_LHS: &[Term<QuadrantName>] = &[Term::plus(A22)];
const M4_RHS: &[Term<QuadrantName>] = &[Term::plus(B21), Term::minus(B11)];
const M5_LHS: &[Term<QuadrantName>] = &[Term::plus(A11), Term::plus(A12)];
const M5_RHS: &[Term<QuadrantName>] = &[Term::plus(B22)];
const M6_LHS: &[Term<QuadrantName>] = &[Term::plus(A21), Term::minus(A11)];
const M6_RHS: &[Term<QuadrantName>] = &[Term::plus(B11), Term::plus(B12)];
const M7_LHS: &[Term<QuadrantName>] = &[Term::plus(A12), Term::minus(A22)];
const M7_RHS: &[Term<QuadrantName>] = &[Term::plus(B21), Term::plus(B22)];

impl Product {
    /// Left and right operand combinations of this product.
    pub fn operands(self) -> (&'static [Term<QuadrantName>], &'static [Term<QuadrantName>]) {
        match self {
            Product::M1 => (M1_LHS, M1_RHS),
            Product::M2 => (M2_LHS, M2_RHS),
            Product::M3 => (M3_LHS, M3_RHS),
            Product::M4 => (M4_LHS, M4_RHS),
            Product::M5 => (M5_LHS, M5_RHS),
            Product::M6 => (M6_LHS, M6_RHS),
            Product::M7 => (M7_LHS, M7_RHS),
        }
    }

    /// Quadrants this product reads, in `a11..b22` order.
    pub fn inputs(self) -> Vec<QuadrantName> {
        let (lhs, rhs) = self.operands();
        QuadrantName::ALL
            .into_iter()
            .filter(|name| lhs.iter().chain(rhs).any(|term| term.name == *name))
            .collect()
    }

    /// Human-readable formula, e.g. `(a21 - a11)·(b11 + b12)`.
    pub fn formula(self) -> String {
        let (lhs, rhs) = self.operands();
        let side = |terms: &[Term<QuadrantName>]| {
            if terms.len() == 1 {
                format_terms(terms)
            } else {
                format!("({})", format_terms(terms))
            }
        };
        format!("{}·{}", side(lhs), side(rhs))
    }
}

/// Evaluate a signed sum of named, equally shaped matrices.
///
/// Terms are accumulated left to right starting from zero, so every caller
/// that combines the same terms gets bit-identical results.
pub(crate) fn combine<N, T>(
    role: Role,
    terms: &[Term<N>],
    values: &BTreeMap<N, Matrix<T>>,
) -> Result<Matrix<T>, StrassenError>
where
    N: Ord + Copy + Display,
    T: Element,
{
    let first = terms
        .first()
        .and_then(|term| values.get(&term.name))
        .ok_or_else(|| StrassenError::MissingOperand {
            role,
            name: format_terms(terms),
        })?;

    let mut acc = Matrix::<T>::zeros(first.raw_dim());
    for term in terms {
        let value = values
            .get(&term.name)
            .ok_or_else(|| StrassenError::MissingOperand {
                role,
                name: term.name.to_string(),
            })?;
        if value.dim() != acc.dim() {
            return Err(DimensionError::BlockShape {
                name: term.name.to_string(),
                rows: value.nrows(),
                cols: value.ncols(),
                expected: acc.nrows(),
            }
            .into());
        }
        acc = match term.sign {
            Sign::Plus => acc + value,
            Sign::Minus => acc - value,
        };
    }
    Ok(acc)
}

/// Compute `product` from the quadrants a role holds, using one dense
/// multiply on `backend`.
pub fn compute_product<T, B>(
    role: Role,
    product: Product,
    quadrants: &QuadrantMap<T>,
    backend: &B,
) -> Result<Matrix<T>, StrassenError>
where
    T: Element,
    B: ComputeBackend<T> + ?Sized,
{
    let (lhs, rhs) = product.operands();
    let lhs = combine(role, lhs, quadrants)?;
    let rhs = combine(role, rhs, quadrants)?;
    log::debug!("{}: computing {} = {}", role, product, product.formula());
    Ok(backend.matmul(&lhs, &rhs)?)
}
