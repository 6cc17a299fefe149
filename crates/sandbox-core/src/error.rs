//! Error types for policy compilation and filter installation

use std::io;
use thiserror::Error;

/// Result type for sandbox operations
pub type Result<T> = std::result::Result<T, SandboxError>;

/// Errors that can occur while compiling or installing a policy
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The kernel (or this build) has no seccomp filter mode.
    #[error("Seccomp filtering not available: {0}")]
    FacilityUnavailable(String),

    /// The caller may not install filters (no CAP_SYS_ADMIN and no_new_privs unset).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// An architecture, namespace flag, address family or filter set name was not recognized.
    #[error("Unknown {kind}: '{name}'")]
    UnknownSymbol { kind: &'static str, name: String },

    /// The filter program could not be composed.
    #[error("Failed to build filter: {0}")]
    BuildFailure(String),

    /// The kernel refused a composed filter. Earlier architectures of the same
    /// program may already be installed, so the process should not carry on.
    #[error("Seccomp error: {0}")]
    Seccomp(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SandboxError {
    pub fn unknown(kind: &'static str, name: impl Into<String>) -> Self {
        SandboxError::UnknownSymbol {
            kind,
            name: name.into(),
        }
    }

    /// Whether the failure happened before anything reached the kernel.
    ///
    /// Parse and build failures leave the process untouched, so the caller may
    /// decide to continue without that restriction.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SandboxError::UnknownSymbol { .. }
                | SandboxError::BuildFailure(_)
                | SandboxError::InvalidConfig(_)
                | SandboxError::FacilityUnavailable(_)
                | SandboxError::PermissionDenied(_)
        )
    }
}
