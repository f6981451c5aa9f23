//! # Attribute Ledger
//!
//! Storage for attribute records, keyed by `(subject, attribute type)`.
//!
//! ## Design
//!
//! Visibility is a derived view, never a stored flag. A record is visible
//! iff its issuing validator currently passes
//! [`RegistryDirectory::can_validate`] for the record's type. Revoking an
//! approval (or the type) hides every record that validator issued for it;
//! re-granting makes them visible again with their original values. Storing
//! a boolean would create a second source of truth that the approval
//! relation could silently contradict.
//!
//! The ledger itself is a plain map with map semantics: `insert` and
//! `remove` do not enforce policy. Uniqueness, authorization, and funding
//! checks all live in the validate phase of the registry's operations, so
//! commit-phase mutations cannot fail halfway.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use jur_core::{Address, Amount, AttributeTypeId, AttributeValue, Timestamp};

use crate::directory::RegistryDirectory;

/// One issued attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    /// The recorded value; meaning is fixed by the attribute type.
    pub value: AttributeValue,
    /// The validator whose approval makes this record visible.
    pub issuing_validator: Address,
    /// The operator that mediated issuance, if any. Only this operator may
    /// use the operator removal path.
    pub operator: Option<Address>,
    /// Stake escrowed against this record, released on revocation.
    pub stake: Amount,
    /// Who supplied the funds, and therefore who the stake returns to.
    pub funded_by: Address,
    pub issued_at: Timestamp,
}

/// All attribute records of one registry: `subject → type → record`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeLedger {
    records: BTreeMap<Address, BTreeMap<AttributeTypeId, AttributeRecord>>,
}

impl AttributeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw record, visibility ignored.
    pub fn record(&self, subject: Address, attribute_type: AttributeTypeId) -> Option<&AttributeRecord> {
        self.records.get(&subject)?.get(&attribute_type)
    }

    /// Raw existence check. Blocks re-issuance even while the record is
    /// invisible, so escrowed stake can never be silently overwritten.
    pub fn is_recorded(&self, subject: Address, attribute_type: AttributeTypeId) -> bool {
        self.record(subject, attribute_type).is_some()
    }

    /// Derived visibility: recorded AND the issuer currently validates the
    /// type.
    pub fn is_visible(
        &self,
        directory: &RegistryDirectory,
        subject: Address,
        attribute_type: AttributeTypeId,
    ) -> bool {
        self.visible_record(directory, subject, attribute_type).is_some()
    }

    pub fn visible_record(
        &self,
        directory: &RegistryDirectory,
        subject: Address,
        attribute_type: AttributeTypeId,
    ) -> Option<&AttributeRecord> {
        self.record(subject, attribute_type)
            .filter(|r| directory.can_validate(r.issuing_validator, attribute_type))
    }

    /// Map-semantics insert: returns the displaced record, if any. Callers
    /// check [`is_recorded`](Self::is_recorded) during validation.
    pub fn insert(
        &mut self,
        subject: Address,
        attribute_type: AttributeTypeId,
        record: AttributeRecord,
    ) -> Option<AttributeRecord> {
        self.records
            .entry(subject)
            .or_default()
            .insert(attribute_type, record)
    }

    /// Map-semantics remove: returns the record, if present.
    pub fn remove(
        &mut self,
        subject: Address,
        attribute_type: AttributeTypeId,
    ) -> Option<AttributeRecord> {
        let per_subject = self.records.get_mut(&subject)?;
        let removed = per_subject.remove(&attribute_type);
        if per_subject.is_empty() {
            self.records.remove(&subject);
        }
        removed
    }

    /// Subjects that currently hold at least one raw record.
    pub fn subjects(&self) -> impl Iterator<Item = Address> + '_ {
        self.records.keys().copied()
    }

    /// All raw records for one subject.
    pub fn records_for(
        &self,
        subject: Address,
    ) -> impl Iterator<Item = (AttributeTypeId, &AttributeRecord)> {
        self.records
            .get(&subject)
            .into_iter()
            .flat_map(|per_subject| per_subject.iter().map(|(id, r)| (*id, r)))
    }

    /// Total number of raw records.
    pub fn len(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
