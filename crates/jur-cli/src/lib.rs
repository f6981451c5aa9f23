//! # jur-cli — Jurisdiction Registry Command-Line Interface
//!
//! File-backed administration of an attribute registry: the whole
//! `Jurisdiction` aggregate is persisted as one JSON state file, and
//! every command is load → operate → save.
//!
//! ## Subcommands
//!
//! - `registry` — initialize, inspect, and hand over a registry
//! - `validator` — registration, removal, and signing-key rotation
//! - `attribute-type` — type definitions, pricing, and secondary sources
//! - `approval` — validator approval grants and envelope invalidation
//! - `attribute` — issuance, revocation, and queries
//! - `key` — signing key-file generation
//! - `approval-sign` — off-line signing of approval envelopes
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from command handlers.
//! - Handlers delegate to the domain crates — no registry logic here.
//! - Exit code 0 on success, 1 on any failed precondition.

pub mod approval;
pub mod attribute;
pub mod attribute_type;
pub mod keys;
pub mod registry;
pub mod signing;
pub mod store;
pub mod validator;
