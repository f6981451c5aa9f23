//! # jur-registry — Permissioned Attribute Registry
//!
//! The registry state machine: a jurisdiction's validator directory,
//! attribute ledger, stake escrow, and signed-approval consumption,
//! composed into one serialized-transaction aggregate.
//!
//! ## Modules
//!
//! - **Directory** (`directory.rs`): validators, signing-key rotation,
//!   attribute type definitions with renewal commitments, and the
//!   validator approval set.
//!
//! - **Ledger** (`ledger.rs`): issued attribute records keyed by
//!   `(subject, attribute type)`. Storage only; visibility is derived
//!   from the directory at read time.
//!
//! - **Escrow** (`escrow.rs`): stake/fee arithmetic and the escrowed
//!   total. Issuance splits attached funds into stake and fees;
//!   revocation settles stake into rebate and refund.
//!
//! - **Authorization** (`authorization.rs`): signed-approval validation
//!   and the consumed-digest set that makes every approval single-use.
//!
//! - **Resolver** (`resolver.rs`): the [`AttributeSource`] collaborator
//!   trait and budgeted, fault-swallowing delegation to secondary
//!   sources.
//!
//! - **Jurisdiction** (`jurisdiction.rs`): the aggregate. Owner-gated
//!   administration, the three issuance paths, the four revocation
//!   paths, approval invalidation, and the query surface.
//!
//! - **Gate** (`gate.rs`): a dependent-consumer helper that admits an
//!   action only between attribute holders.
//!
//! ## Design
//!
//! Every mutating operation is validate-then-commit: all policy and
//! funds checks run against immutable borrows, and the commit phase
//! starts with its only fallible step (the escrow movement). A failed
//! call leaves the registry byte-for-byte unchanged, which
//! `Jurisdiction::state_digest` turns into a testable property.

pub mod authorization;
pub mod directory;
pub mod escrow;
pub mod gate;
pub mod jurisdiction;
pub mod ledger;
pub mod resolver;

// ─── Directory re-exports ───────────────────────────────────────────

pub use directory::{
    AttributeTypeDef, KeyRotation, RegistryDirectory, SecondarySource, Validator,
};

// ─── Ledger and escrow re-exports ───────────────────────────────────

pub use escrow::{
    settle_revocation, split_direct, split_signed, FundingSplit, Settlement, StakeFeeEscrow,
    REVOCATION_REBATE_UNITS,
};
pub use ledger::{AttributeLedger, AttributeRecord};

// ─── Authorization and resolver re-exports ──────────────────────────

pub use authorization::{ApprovalCheck, SignatureAuthorization};
pub use resolver::{AttributeSource, SecondarySourceResolver, DEFAULT_SOURCE_BUDGET};

// ─── Aggregate re-exports ───────────────────────────────────────────

pub use gate::TransferGate;
pub use jurisdiction::{
    CallContext, IssuanceReceipt, Jurisdiction, RevocationReceipt, Transfer, TransferReason,
};
