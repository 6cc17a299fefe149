//! sandbox-core: shared types, errors, and capability detection
//!
//! This crate provides the foundational types used by the other sandbox crates:
//! - Error types and Result alias
//! - Runtime capability detection (seccomp filter mode, privileges, containers)

pub mod capabilities;
pub mod error;

pub use capabilities::{is_seccomp_available, SystemCapabilities};
pub use error::{Result, SandboxError};
