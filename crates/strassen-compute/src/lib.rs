//! # Strassen Compute
//!
//! Execution substrate for the distributed Strassen pipeline. This crate
//! provides:
//!
//! - a [`ComputeBackend`](backend::ComputeBackend) trait that isolates the
//!   dense quadrant product from threading and kernel details;
//! - a [`Channel`](channel::Channel) trait for point-to-point, keyed,
//!   blocking message passing between ranks, and an in-process
//!   [`Mesh`](mesh::Mesh) implementing it over bounded crossbeam channels.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Kernel |
//! |---------|-------------|--------|
//! | CPU (Rayon) | `cpu` (default) | parallel row·column fill |
//! | Serial | always | `ndarray` dot |

pub mod backend;
pub mod channel;
pub mod mesh;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use backend::{
    accumulation_fits, BackendType, ComputeBackend, ComputeError, DeviceInfo, Element,
    SerialBackend,
};
pub use channel::{Channel, ChannelError, MessageKey};
pub use mesh::{Endpoint, Mesh, MeshStats};

#[cfg(feature = "cpu")]
pub use cpu::CpuBackend;
