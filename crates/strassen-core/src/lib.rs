//! # Strassen Core
//!
//! One level of Strassen's algorithm for C = A·B, with the seven quadrant
//! products spread over seven cooperating roles (one coordinator, six
//! workers) that share no memory and talk only through point-to-point
//! messages.
//!
//! ## Architecture
//!
//! A static [role table](roles) fixes, per role, the product it computes,
//! the quadrants it needs, where its product is relayed and which result
//! quadrant it assembles. One generic procedure, [`protocol::run_role`],
//! executes any role from its table entry; [`cluster::multiply_distributed`]
//! runs all seven on threads over an in-process mesh.
//!
//! ## Modules
//!
//! - [`types`]: roles, quadrant/product/result names, message tags.
//! - [`decompose`]: quadrant split and stitch, operand validation.
//! - [`roles`]: the role table and the message schedules derived from it.
//! - [`product`]: the seven product formulas.
//! - [`assembly`]: the four result-quadrant combinations.
//! - [`protocol`]: schedule-checked channel and the run-role procedure.
//! - [`cluster`]: threaded launcher with timing and message counts.
//! - [`method`]: distributed, local and reference multipliers.
//! - [`io`]: matrix text files.

pub mod assembly;
pub mod cluster;
pub mod decompose;
pub mod error;
pub mod io;
pub mod method;
pub mod product;
pub mod protocol;
pub mod roles;
pub mod types;

pub use cluster::{multiply_distributed, DistributedRun};
pub use error::{DimensionError, StrassenError};
pub use method::{DistributedStrassen, LocalStrassen, Multiplier, ReferenceMultiplier};
pub use types::{Element, Matrix, Product, QuadrantName, ResultQuadrant, Role, Tag};
