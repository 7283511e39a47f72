//! Error types for the Strassen pipeline.

use strassen_compute::{ChannelError, ComputeError};
use thiserror::Error;

use crate::types::{Role, Tag};

/// Input shapes that the one-level decomposition cannot handle.
///
/// Always detected before any role is started or any message is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimensionError {
    #[error("Matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("Operand shapes differ: A is {a_rows}x{a_cols}, B is {b_rows}x{b_cols}")]
    Mismatched {
        a_rows: usize,
        a_cols: usize,
        b_rows: usize,
        b_cols: usize,
    },

    #[error("Matrix dimension {0} is odd; one-level Strassen needs an even dimension")]
    OddDimension(usize),

    #[error("Matrix is empty")]
    Empty,

    #[error("Block {name} is {rows}x{cols}, expected {expected}x{expected}")]
    BlockShape {
        name: String,
        rows: usize,
        cols: usize,
        expected: usize,
    },
}

/// Errors that can occur during a Strassen multiplication.
#[derive(Debug, Error)]
pub enum StrassenError {
    #[error("Dimension error: {0}")]
    Dimension(#[from] DimensionError),

    #[error("Channel error in {role}: {source}")]
    Channel {
        role: Role,
        #[source]
        source: ChannelError,
    },

    #[error("Protocol violation in {role}: {detail}")]
    ProtocolViolation { role: Role, detail: String },

    #[error("{role} is missing operand {name}")]
    MissingOperand { role: Role, name: String },

    #[error(
        "Entries up to {max_magnitude} in magnitude may overflow the element type \
         (accumulation weight {weight})"
    )]
    Overflow { max_magnitude: u128, weight: usize },

    #[error("Compute backend error: {0}")]
    Compute(#[from] ComputeError),

    #[error("Failed to start {role}: {message}")]
    Spawn { role: Role, message: String },

    #[error("{0} panicked")]
    RolePanicked(Role),
}

impl StrassenError {
    /// Build a protocol violation for a send or receive posted out of order.
    pub(crate) fn out_of_order(
        role: Role,
        direction: &str,
        peer: Role,
        expected: Option<Tag>,
        posted: Tag,
    ) -> Self {
        let expected = match expected {
            Some(tag) => tag.to_string(),
            None => "nothing".to_string(),
        };
        StrassenError::ProtocolViolation {
            role,
            detail: format!(
                "posted {direction} of {posted} on link with {peer}, schedule expects {expected}"
            ),
        }
    }

    /// True when this error only reports that a peer went away, i.e. it is a
    /// consequence of a failure elsewhere rather than its cause.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            StrassenError::Channel {
                source: ChannelError::Disconnected { .. },
                ..
            }
        )
    }
}
