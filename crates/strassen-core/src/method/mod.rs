//! Multiplication methods.
//!
//! The [`Multiplier`] trait gives the CLI and the tests one interface over
//! every way of forming C = A·B:
//!
//! - [`DistributedStrassen`]: seven roles exchanging messages (the primary
//!   implementation);
//! - [`LocalStrassen`]: the same seven products and four assemblies in one
//!   process, without messaging;
//! - [`ReferenceMultiplier`]: a single direct dense product, used to check
//!   the other two.

pub mod distributed;
pub mod local;
pub mod reference;

pub use distributed::DistributedStrassen;
pub use local::LocalStrassen;
pub use reference::ReferenceMultiplier;

use crate::error::StrassenError;
use crate::types::{Element, Matrix};

/// The common interface of all multiplication methods.
pub trait Multiplier<T: Element> {
    /// Compute `a · b`.
    fn multiply(&self, a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>, StrassenError>;

    /// Human-readable name of the method.
    fn method_name(&self) -> &str;
}
