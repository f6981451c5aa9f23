//! # Registry Error Taxonomy
//!
//! The error kinds surfaced by registry operations. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - One variant per failure class; callers match on the variant, the
//!   message carries the specifics.
//! - Every mutating operation fails atomically: an `Err` means state is
//!   byte-for-byte unchanged.
//! - Secondary-source faults are deliberately NOT part of [`RegistryError`]:
//!   they live in [`SourceFault`], are confined to the `AttributeSource`
//!   boundary, and are recovered locally as "attribute absent" rather than
//!   surfaced to callers.

use thiserror::Error;

/// Failure classes for registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The caller lacks the role or approval the operation requires.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// A referenced validator, attribute type, or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The entity or record already exists (or the identity is reserved).
    #[error("already exists: {0}")]
    Duplicate(String),

    /// Malformed, already-consumed, or non-matching signature material.
    #[error("signature rejected: {0}")]
    Signature(String),

    /// Supplied value does not satisfy the required stake and fees.
    #[error("funds mismatch: {0}")]
    FundsMismatch(String),

    /// Canonical serialization failed while computing a digest.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical input. Quantities must
    /// be integers or decimal strings.
    #[error("float values are not permitted in canonical input: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A fault reported by an external attribute source.
///
/// Never propagated through registry queries: the resolver logs the fault
/// and treats the attribute as absent.
#[derive(Error, Debug)]
#[error("secondary source fault: {0}")]
pub struct SourceFault(pub String);

impl SourceFault {
    /// Build a fault from any displayable cause.
    pub fn new(cause: impl Into<String>) -> Self {
        Self(cause.into())
    }
}
