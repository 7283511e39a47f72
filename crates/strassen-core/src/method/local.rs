//! Single-process Strassen: the same arithmetic as the distributed method
//! with no messaging. The seven products are computed in parallel with
//! Rayon.

use std::collections::BTreeMap;

use rayon::prelude::*;
use strassen_compute::ComputeBackend;

use super::Multiplier;
use crate::assembly::{assemble, stitch_result};
use crate::decompose::{operand_quadrants, validate_inputs};
use crate::error::StrassenError;
use crate::product::compute_product;
use crate::roles::{assembler_of, owner_of};
use crate::types::{Element, Matrix, Product, ProductMap, ResultQuadrant, Role};

/// One-level Strassen in a single process.
pub struct LocalStrassen<B> {
    pub backend: B,
}

impl<B> LocalStrassen<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// All seven products, evaluated directly on undistributed quadrants.
    pub fn products<T>(&self, a: &Matrix<T>, b: &Matrix<T>) -> Result<ProductMap<T>, StrassenError>
    where
        T: Element,
        B: ComputeBackend<T>,
    {
        validate_inputs(a, b)?;
        let quadrants = operand_quadrants(a, b)?;
        Product::ALL[..]
            .par_iter()
            .map(|&product| {
                compute_product(owner_of(product), product, &quadrants, &self.backend)
                    .map(|m| (product, m))
            })
            .collect()
    }
}

impl<T, B> Multiplier<T> for LocalStrassen<B>
where
    T: Element,
    B: ComputeBackend<T>,
{
    fn multiply(&self, a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>, StrassenError> {
        let products = self.products(a, b)?;
        let mut quadrants = BTreeMap::new();
        for quadrant in ResultQuadrant::ALL {
            let block = assemble(assembler_of(quadrant), quadrant, &products)?;
            quadrants.insert(quadrant, block);
        }
        stitch_result(Role::Coordinator, &quadrants)
    }

    fn method_name(&self) -> &str {
        "local Strassen"
    }
}
