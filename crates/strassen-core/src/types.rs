//! Core types shared across the pipeline.
//!
//! This module defines the identities that flow through the protocol: roles,
//! quadrant names, product names, result-quadrant names, and the semantic
//! message tag built from them.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use strassen_compute::Element;

/// A dense, row-major matrix.
pub type Matrix<T> = Array2<T>;

/// Independently owned quadrants, keyed by name.
pub type QuadrantMap<T> = BTreeMap<QuadrantName, Matrix<T>>;

/// Strassen products held by a role, keyed by name.
pub type ProductMap<T> = BTreeMap<Product, Matrix<T>>;

/// A participant in the seven-way computation.
///
/// The discriminant is the participant's rank on the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coordinator = 0,
    Worker1 = 1,
    Worker2 = 2,
    Worker3 = 3,
    Worker4 = 4,
    Worker5 = 5,
    Worker6 = 6,
}

impl Role {
    /// Number of participants in the topology.
    pub const COUNT: usize = 7;

    /// All roles in rank order.
    pub const ALL: [Role; Role::COUNT] = [
        Role::Coordinator,
        Role::Worker1,
        Role::Worker2,
        Role::Worker3,
        Role::Worker4,
        Role::Worker5,
        Role::Worker6,
    ];

    /// The six workers in rank order.
    pub const WORKERS: [Role; Role::COUNT - 1] = [
        Role::Worker1,
        Role::Worker2,
        Role::Worker3,
        Role::Worker4,
        Role::Worker5,
        Role::Worker6,
    ];

    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn from_rank(rank: usize) -> Option<Role> {
        Role::ALL.get(rank).copied()
    }

    pub fn is_coordinator(self) -> bool {
        self == Role::Coordinator
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Coordinator => f.write_str("coordinator"),
            worker => write!(f, "worker{}", worker.rank()),
        }
    }
}

/// Which input matrix a quadrant is cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operand {
    A,
    B,
}

/// One of the eight input quadrants, `a11` through `b22`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuadrantName {
    A11,
    A12,
    A21,
    A22,
    B11,
    B12,
    B21,
    B22,
}

impl QuadrantName {
    pub const ALL: [QuadrantName; 8] = [
        QuadrantName::A11,
        QuadrantName::A12,
        QuadrantName::A21,
        QuadrantName::A22,
        QuadrantName::B11,
        QuadrantName::B12,
        QuadrantName::B21,
        QuadrantName::B22,
    ];

    /// Build a name from its source matrix and its (row half, column half)
    /// position, each half being 0 or 1.
    pub fn new(operand: Operand, position: (usize, usize)) -> Option<Self> {
        let offset = match operand {
            Operand::A => 0,
            Operand::B => 4,
        };
        match position {
            (0, 0) | (0, 1) | (1, 0) | (1, 1) => {
                Some(Self::ALL[offset + position.0 * 2 + position.1])
            }
            _ => None,
        }
    }

    pub fn operand(self) -> Operand {
        if (self as usize) < 4 {
            Operand::A
        } else {
            Operand::B
        }
    }

    /// (row half, column half) of this quadrant within its matrix.
    pub fn position(self) -> (usize, usize) {
        let index = self as usize % 4;
        (index / 2, index % 2)
    }
}

impl fmt::Display for QuadrantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (row, col) = self.position();
        let prefix = match self.operand() {
            Operand::A => 'a',
            Operand::B => 'b',
        };
        write!(f, "{}{}{}", prefix, row + 1, col + 1)
    }
}

/// One of the seven Strassen products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    M7,
}

impl Product {
    pub const ALL: [Product; 7] = [
        Product::M1,
        Product::M2,
        Product::M3,
        Product::M4,
        Product::M5,
        Product::M6,
        Product::M7,
    ];
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", *self as usize + 1)
    }
}

/// One of the four quadrants of the result matrix C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResultQuadrant {
    C11,
    C12,
    C21,
    C22,
}

impl ResultQuadrant {
    pub const ALL: [ResultQuadrant; 4] = [
        ResultQuadrant::C11,
        ResultQuadrant::C12,
        ResultQuadrant::C21,
        ResultQuadrant::C22,
    ];

    /// (row half, column half) of this quadrant within C.
    pub fn position(self) -> (usize, usize) {
        let index = self as usize;
        (index / 2, index % 2)
    }
}

impl fmt::Display for ResultQuadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (row, col) = self.position();
        write!(f, "C{}{}", row + 1, col + 1)
    }
}

/// Sign of a term in a linear combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sign {
    Plus,
    Minus,
}

/// A signed reference to a named matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term<N> {
    pub sign: Sign,
    pub name: N,
}

impl<N> Term<N> {
    pub const fn plus(name: N) -> Self {
        Self {
            sign: Sign::Plus,
            name,
        }
    }

    pub const fn minus(name: N) -> Self {
        Self {
            sign: Sign::Minus,
            name,
        }
    }
}

/// Format a linear combination such as `a11 + a22` or `m1 - m2 + m3`.
pub fn format_terms<N: fmt::Display>(terms: &[Term<N>]) -> String {
    let mut out = String::new();
    for (i, term) in terms.iter().enumerate() {
        match (i, term.sign) {
            (0, Sign::Plus) => {}
            (0, Sign::Minus) => out.push('-'),
            (_, Sign::Plus) => out.push_str(" + "),
            (_, Sign::Minus) => out.push_str(" - "),
        }
        out.push_str(&term.name.to_string());
    }
    out
}

/// Semantic message tag. Scoped by the (sender, receiver) link, so the same
/// tag may legitimately travel on several links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Tag {
    Quadrant(QuadrantName),
    Product(Product),
    Result(ResultQuadrant),
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Quadrant(q) => write!(f, "{q}"),
            Tag::Product(p) => write!(f, "{p}"),
            Tag::Result(c) => write!(f, "{c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ranks_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_rank(role.rank()), Some(role));
        }
        assert_eq!(Role::from_rank(7), None);
        assert_eq!(Role::Coordinator.to_string(), "coordinator");
        assert_eq!(Role::Worker5.to_string(), "worker5");
    }

    #[test]
    fn test_quadrant_names() {
        assert_eq!(QuadrantName::A21.to_string(), "a21");
        assert_eq!(QuadrantName::B12.position(), (0, 1));
        assert_eq!(QuadrantName::B12.operand(), Operand::B);
        assert_eq!(QuadrantName::new(Operand::A, (1, 1)), Some(QuadrantName::A22));
        assert_eq!(QuadrantName::new(Operand::B, (2, 0)), None);
        for name in QuadrantName::ALL {
            assert_eq!(QuadrantName::new(name.operand(), name.position()), Some(name));
        }
    }

    #[test]
    fn test_display_of_tags_and_terms() {
        assert_eq!(Tag::Product(Product::M7).to_string(), "m7");
        assert_eq!(Tag::Result(ResultQuadrant::C21).to_string(), "C21");
        let terms = [
            Term::plus(Product::M1),
            Term::minus(Product::M2),
            Term::plus(Product::M3),
        ];
        assert_eq!(format_terms(&terms), "m1 - m2 + m3");
        assert_eq!(format_terms(&[Term::minus(QuadrantName::A11)]), "-a11");
    }
}
