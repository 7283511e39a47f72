//! Result-quadrant assembly from Strassen products.
//!
//! ```text
//! C11 = m1 + m4 - m5 + m7
//! C12 = m3 + m5
//! C21 = m2 + m4
//! C22 = m1 - m2 + m3 + m6
//! ```

use std::collections::BTreeMap;

use crate::decompose::stitch;
use crate::error::StrassenError;
use crate::product::combine;
use crate::types::{Element, Matrix, Product, ProductMap, ResultQuadrant, Role, Term};

use Product::*;

const C11_TERMS: &[Term<Product>] = &[
    Term::plus(M1),
    Term::plus(M4),
    Term::minus(M5),
    Term::plus(M7),
];
const C12_TERMS: &[Term<Product>] = &[Term::plus(M3), Term::plus(M5)];
const C21_TERMS: &[Term<Product>] = &[Term::plus(M2), Term::plus(M4)];
const C22_TERMS: &[Term<Product>] = &[
    Term::plus(M1),
    Term::minus(M2),
    Term::plus(M3),
    Term::plus(M6),
];

impl ResultQuadrant {
    /// The fixed linear combination of products giving this quadrant.
    pub fn combination(self) -> &'static [Term<Product>] {
        match self {
            ResultQuadrant::C11 => C11_TERMS,
            ResultQuadrant::C12 => C12_TERMS,
            ResultQuadrant::C21 => C21_TERMS,
            ResultQuadrant::C22 => C22_TERMS,
        }
    }

    /// Products needed to assemble this quadrant.
    pub fn products(self) -> impl Iterator<Item = Product> {
        self.combination().iter().map(|term| term.name)
    }
}

/// Assemble `quadrant` from the products a role holds.
pub fn assemble<T: Element>(
    role: Role,
    quadrant: ResultQuadrant,
    products: &ProductMap<T>,
) -> Result<Matrix<T>, StrassenError> {
    log::debug!("{}: assembling {}", role, quadrant);
    combine(role, quadrant.combination(), products)
}

/// Stitch the four result quadrants into C.
pub fn stitch_result<T: Element>(
    role: Role,
    quadrants: &BTreeMap<ResultQuadrant, Matrix<T>>,
) -> Result<Matrix<T>, StrassenError> {
    let get = |quadrant: ResultQuadrant| {
        quadrants
            .get(&quadrant)
            .ok_or_else(|| StrassenError::MissingOperand {
                role,
                name: quadrant.to_string(),
            })
    };
    let c = stitch(
        get(ResultQuadrant::C11)?,
        get(ResultQuadrant::C12)?,
        get(ResultQuadrant::C21)?,
        get(ResultQuadrant::C22)?,
    )?;
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompose::operand_quadrants;
    use crate::product::compute_product;
    use ndarray::{array, Array2};
    use strassen_compute::SerialBackend;

    fn all_products(a: &Matrix<i64>, b: &Matrix<i64>) -> ProductMap<i64> {
        let q = operand_quadrants(a, b).unwrap();
        Product::ALL
            .into_iter()
            .map(|p| (p, compute_product(Role::Coordinator, p, &q, &SerialBackend).unwrap()))
            .collect()
    }

    #[test]
    fn test_every_product_is_used() {
        for product in Product::ALL {
            assert!(ResultQuadrant::ALL
                .iter()
                .any(|c| c.products().any(|p| p == product)));
        }
    }

    #[test]
    fn test_assembly_reproduces_block_product() {
        let a = Array2::from_shape_fn((4, 4), |(i, j)| (i * 4 + j + 1) as i64);
        let products = all_products(&a, &a);
        let mut quadrants = BTreeMap::new();
        for c in ResultQuadrant::ALL {
            quadrants.insert(c, assemble(Role::Coordinator, c, &products).unwrap());
        }
        assert_eq!(quadrants[&ResultQuadrant::C11], array![[90, 100], [202, 228]]);
        assert_eq!(quadrants[&ResultQuadrant::C22], array![[398, 440], [542, 600]]);
        assert_eq!(stitch_result(Role::Coordinator, &quadrants).unwrap(), a.dot(&a));
    }

    #[test]
    fn test_assembly_needs_all_terms() {
        let a = Array2::from_shape_fn((2, 2), |(i, j)| (i + j) as i64);
        let mut products = all_products(&a, &a);
        products.remove(&Product::M6);
        assert!(assemble(Role::Worker3, ResultQuadrant::C21, &products).is_ok());
        assert!(matches!(
            assemble(Role::Worker5, ResultQuadrant::C22, &products),
            Err(StrassenError::MissingOperand { role: Role::Worker5, .. })
        ));
    }

    #[test]
    fn test_stitch_requires_four_quadrants() {
        let mut quadrants = BTreeMap::new();
        quadrants.insert(ResultQuadrant::C11, array![[1_i64]]);
        let err = stitch_result(Role::Coordinator, &quadrants).unwrap_err();
        assert!(matches!(err, StrassenError::MissingOperand { ref name, .. } if name == "C12"));
    }
}
