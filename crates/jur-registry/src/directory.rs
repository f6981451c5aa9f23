//! # Registry Directory
//!
//! The authoritative metadata store: validators, attribute type
//! definitions, and the approval relation between them. Every other
//! component consults the directory; none of them mutate it.
//!
//! ## Design
//!
//! - Validator identity and signing key are separate addresses. The
//!   identity is the primary key and never changes; the signing key is
//!   rotatable, with an audit trail of every rotation.
//! - The union of all validator addresses and all current signing keys is
//!   collision-free. A signature can therefore be attributed to at most
//!   one validator.
//! - Attribute type definitions are append-only in their defining
//!   properties. The first `add` records a commitment digest over
//!   `(description, restricted)`; a later re-add after removal must match
//!   that commitment or fail. Economic fields (stake floor, fee, secondary
//!   source) stay mutable through dedicated setters.
//! - All mutations validate fully before touching state.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use jur_core::{
    sha256_digest, Address, Amount, AttributeTypeId, CanonicalBytes, ContentDigest, RegistryError,
    Timestamp,
};

// ─── Validators ──────────────────────────────────────────────────────

/// One signing-key rotation, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRotation {
    pub previous: Address,
    pub next: Address,
    pub at: Timestamp,
}

/// A registered validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Identity and primary key. Never changes.
    pub address: Address,
    /// The address whose key currently authorizes signed approvals.
    /// Starts equal to `address`.
    pub signing_key: Address,
    /// Free-form display text.
    pub description: String,
    /// Audit trail of signing-key rotations, oldest first.
    pub key_rotations: Vec<KeyRotation>,
}

impl Validator {
    fn new(address: Address, description: String) -> Self {
        Self {
            address,
            signing_key: address,
            description,
            key_rotations: Vec::new(),
        }
    }
}

// ─── Attribute types ─────────────────────────────────────────────────

/// Delegation target for lookups that miss locally: another registry and
/// the attribute type id it uses for the same claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondarySource {
    pub registry: Address,
    pub remote_type_id: AttributeTypeId,
}

/// A live attribute type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTypeDef {
    pub id: AttributeTypeId,
    /// Immutable once first defined; enforced via the commitment digest.
    pub description: String,
    /// If true, only a validator may issue or revoke; subjects may not
    /// self-issue or self-remove.
    pub restricted: bool,
    /// If true, issuance must be triggered by the subject personally;
    /// operator-mediated issuance is forbidden.
    pub only_personal: bool,
    /// Stake floor for issuance.
    pub minimum_stake: Amount,
    /// Fee paid to the registry owner on every issuance.
    pub jurisdiction_fee: Amount,
    /// Optional fall-through registry for lookups.
    pub secondary_source: Option<SecondarySource>,
}

/// The committed, immutable part of a type definition.
#[derive(Serialize)]
struct DefinitionCommitment<'a> {
    description: &'a str,
    restricted: bool,
}

fn definition_commitment(description: &str, restricted: bool) -> Result<ContentDigest, RegistryError> {
    let payload = DefinitionCommitment {
        description,
        restricted,
    };
    Ok(sha256_digest(&CanonicalBytes::new(&payload)?))
}

// ─── Directory ───────────────────────────────────────────────────────

/// Validators, attribute types, and approvals for one registry.
///
/// Ordered collections throughout, so the serialized form (and every
/// digest over it) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDirectory {
    validators: BTreeMap<Address, Validator>,
    attribute_types: BTreeMap<AttributeTypeId, AttributeTypeDef>,
    /// Commitments over `(description, restricted)` for every id ever
    /// defined. Never deleted, even when the live definition is removed.
    type_commitments: BTreeMap<AttributeTypeId, ContentDigest>,
    approvals: BTreeSet<(Address, AttributeTypeId)>,
}

impl RegistryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Validator lifecycle ──────────────────────────────────────────

    /// Register a validator. Its signing key starts as its own address.
    pub fn add_validator(
        &mut self,
        address: Address,
        description: impl Into<String>,
    ) -> Result<(), RegistryError> {
        if address.is_zero() {
            return Err(RegistryError::Duplicate(
                "the zero address is reserved".into(),
            ));
        }
        if self.identity_in_use(address) {
            return Err(RegistryError::Duplicate(format!(
                "address {address} is already a validator identity or signing key"
            )));
        }
        self.validators
            .insert(address, Validator::new(address, description.into()));
        Ok(())
    }

    /// Deregister a validator. Its approvals are deleted; re-adding the
    /// validator later does not restore them.
    pub fn remove_validator(&mut self, address: Address) -> Result<(), RegistryError> {
        if !self.validators.contains_key(&address) {
            return Err(RegistryError::NotFound(format!(
                "validator {address} is not registered"
            )));
        }
        self.validators.remove(&address);
        self.approvals.retain(|(v, _)| *v != address);
        Ok(())
    }

    /// Rotate a validator's signing key and append to its audit trail.
    ///
    /// The new key must be fresh: not the current key, not any validator
    /// address (the validator's own included), and not any other current
    /// signing key.
    pub fn rotate_signing_key(
        &mut self,
        validator: Address,
        new_key: Address,
    ) -> Result<(), RegistryError> {
        let current = match self.validators.get(&validator) {
            Some(v) => v.signing_key,
            None => {
                return Err(RegistryError::NotFound(format!(
                    "validator {validator} is not registered"
                )))
            }
        };
        if new_key.is_zero() {
            return Err(RegistryError::Duplicate(
                "the zero address is reserved".into(),
            ));
        }
        if new_key == current {
            return Err(RegistryError::Duplicate(format!(
                "signing key {new_key} is already current"
            )));
        }
        if self.identity_in_use(new_key) {
            return Err(RegistryError::Duplicate(format!(
                "address {new_key} is already a validator identity or signing key"
            )));
        }
        // Checks done; commit.
        if let Some(v) = self.validators.get_mut(&validator) {
            v.key_rotations.push(KeyRotation {
                previous: current,
                next: new_key,
                at: Timestamp::now(),
            });
            v.signing_key = new_key;
        }
        Ok(())
    }

    // ── Attribute type lifecycle ─────────────────────────────────────

    /// Define an attribute type, or renew a previously removed one.
    ///
    /// Renewal must present the same `description` and `restricted` flag
    /// as the original definition; the commitment digest recorded at first
    /// definition is the arbiter.
    pub fn add_attribute_type(&mut self, def: AttributeTypeDef) -> Result<(), RegistryError> {
        if self.attribute_types.contains_key(&def.id) {
            return Err(RegistryError::Duplicate(format!(
                "attribute type {} already exists",
                def.id
            )));
        }
        let commitment = definition_commitment(&def.description, def.restricted)?;
        if let Some(original) = self.type_commitments.get(&def.id) {
            if *original != commitment {
                return Err(RegistryError::Duplicate(format!(
                    "attribute type {} was previously defined with different properties",
                    def.id
                )));
            }
        }
        self.type_commitments.entry(def.id).or_insert(commitment);
        self.attribute_types.insert(def.id, def);
        Ok(())
    }

    /// Remove a live type definition. The commitment stays, so the id can
    /// only ever be renewed with its original properties. Approvals for
    /// the type are deleted and are not restored on renewal.
    pub fn remove_attribute_type(&mut self, id: AttributeTypeId) -> Result<(), RegistryError> {
        if self.attribute_types.remove(&id).is_none() {
            return Err(RegistryError::NotFound(format!(
                "attribute type {id} does not exist"
            )));
        }
        self.approvals.retain(|(_, t)| *t != id);
        Ok(())
    }

    pub fn set_minimum_stake(
        &mut self,
        id: AttributeTypeId,
        stake: Amount,
    ) -> Result<(), RegistryError> {
        self.attribute_type_mut(id)?.minimum_stake = stake;
        Ok(())
    }

    pub fn set_jurisdiction_fee(
        &mut self,
        id: AttributeTypeId,
        fee: Amount,
    ) -> Result<(), RegistryError> {
        self.attribute_type_mut(id)?.jurisdiction_fee = fee;
        Ok(())
    }

    pub fn set_secondary_source(
        &mut self,
        id: AttributeTypeId,
        source: Option<SecondarySource>,
    ) -> Result<(), RegistryError> {
        self.attribute_type_mut(id)?.secondary_source = source;
        Ok(())
    }

    // ── Approvals ────────────────────────────────────────────────────

    /// Grant a validator the right to assert attributes of a type.
    pub fn add_approval(
        &mut self,
        validator: Address,
        attribute_type: AttributeTypeId,
    ) -> Result<(), RegistryError> {
        if !self.validators.contains_key(&validator) {
            return Err(RegistryError::NotFound(format!(
                "validator {validator} is not registered"
            )));
        }
        if !self.attribute_types.contains_key(&attribute_type) {
            return Err(RegistryError::NotFound(format!(
                "attribute type {attribute_type} does not exist"
            )));
        }
        if !self.approvals.insert((validator, attribute_type)) {
            return Err(RegistryError::Duplicate(format!(
                "validator {validator} is already approved for type {attribute_type}"
            )));
        }
        Ok(())
    }

    pub fn remove_approval(
        &mut self,
        validator: Address,
        attribute_type: AttributeTypeId,
    ) -> Result<(), RegistryError> {
        if !self.approvals.remove(&(validator, attribute_type)) {
            return Err(RegistryError::NotFound(format!(
                "validator {validator} holds no approval for type {attribute_type}"
            )));
        }
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn validator(&self, address: Address) -> Option<&Validator> {
        self.validators.get(&address)
    }

    pub fn is_validator(&self, address: Address) -> bool {
        self.validators.contains_key(&address)
    }

    /// Find the validator whose CURRENT signing key is `key`. At most one
    /// can match, by the collision-free identity invariant.
    pub fn validator_by_signing_key(&self, key: Address) -> Option<&Validator> {
        self.validators.values().find(|v| v.signing_key == key)
    }

    pub fn validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators.values()
    }

    pub fn validator_addresses(&self) -> Vec<Address> {
        self.validators.keys().copied().collect()
    }

    pub fn attribute_type(&self, id: AttributeTypeId) -> Option<&AttributeTypeDef> {
        self.attribute_types.get(&id)
    }

    pub fn attribute_types(&self) -> impl Iterator<Item = &AttributeTypeDef> {
        self.attribute_types.values()
    }

    pub fn attribute_type_ids(&self) -> Vec<AttributeTypeId> {
        self.attribute_types.keys().copied().collect()
    }

    pub fn is_approved(&self, validator: Address, attribute_type: AttributeTypeId) -> bool {
        self.approvals.contains(&(validator, attribute_type))
    }

    /// True when `validator` is registered, the type is live, and the
    /// approval is in place. The visibility rule for ledger records.
    pub fn can_validate(&self, validator: Address, attribute_type: AttributeTypeId) -> bool {
        self.is_validator(validator)
            && self.attribute_types.contains_key(&attribute_type)
            && self.is_approved(validator, attribute_type)
    }

    pub fn approvals(&self) -> impl Iterator<Item = (Address, AttributeTypeId)> + '_ {
        self.approvals.iter().copied()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn identity_in_use(&self, address: Address) -> bool {
        self.validators.contains_key(&address)
            || self.validators.values().any(|v| v.signing_key == address)
    }

    fn attribute_type_mut(
        &mut self,
        id: AttributeTypeId,
    ) -> Result<&mut AttributeTypeDef, RegistryError> {
        self.attribute_types
            .get_mut(&id)
            .ok_or_else(|| RegistryError::NotFound(format!("attribute type {id} does not exist")))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    fn plain_type(id: u64) -> AttributeTypeDef {
        AttributeTypeDef {
            id: AttributeTypeId(id),
            description: format!("type-{id}"),
            restricted: false,
            only_personal: false,
            minimum_stake: Amount::ZERO,
            jurisdiction_fee: Amount::ZERO,
            secondary_source: None,
        }
    }

    fn directory_with_validator(v: Address) -> RegistryDirectory {
        let mut d = RegistryDirectory::new();
        d.add_validator(v, "v").unwrap();
        d
    }

    // ── Validator lifecycle ──────────────────────────────────────────

    #[test]
    fn test_add_validator_defaults_signing_key_to_identity() {
        let d = directory_with_validator(addr(1));
        let v = d.validator(addr(1)).unwrap();
        assert_eq!(v.signing_key, addr(1));
        assert!(v.key_rotations.is_empty());
    }

    #[test]
    fn test_add_validator_rejects_zero_and_duplicates() {
        let mut d = directory_with_validator(addr(1));
        assert!(matches!(
            d.add_validator(Address::ZERO, "zero"),
            Err(RegistryError::Duplicate(_))
        ));
        assert!(matches!(
            d.add_validator(addr(1), "again"),
            Err(RegistryError::Duplicate(_))
        ));
    }

    #[test]
    fn test_add_validator_rejects_collision_with_signing_key() {
        let mut d = directory_with_validator(addr(1));
        d.rotate_signing_key(addr(1), addr(5)).unwrap();
        // addr(5) is now a live signing key, so it cannot become an identity.
        assert!(matches!(
            d.add_validator(addr(5), "colliding"),
            Err(RegistryError::Duplicate(_))
        ));
    }

    #[test]
    fn test_remove_validator_deletes_approvals() {
        let mut d = directory_with_validator(addr(1));
        d.add_attribute_type(plain_type(7)).unwrap();
        d.add_approval(addr(1), AttributeTypeId(7)).unwrap();
        d.remove_validator(addr(1)).unwrap();
        assert!(!d.is_approved(addr(1), AttributeTypeId(7)));
        assert!(matches!(
            d.remove_validator(addr(1)),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_readding_validator_does_not_restore_approvals() {
        let mut d = directory_with_validator(addr(1));
        d.add_attribute_type(plain_type(7)).unwrap();
        d.add_approval(addr(1), AttributeTypeId(7)).unwrap();
        d.remove_validator(addr(1)).unwrap();
        d.add_validator(addr(1), "returned").unwrap();
        assert!(!d.is_approved(addr(1), AttributeTypeId(7)));
    }

    // ── Signing key rotation ─────────────────────────────────────────

    #[test]
    fn test_rotation_updates_key_and_audit_trail() {
        let mut d = directory_with_validator(addr(1));
        d.rotate_signing_key(addr(1), addr(8)).unwrap();
        d.rotate_signing_key(addr(1), addr(9)).unwrap();
        let v = d.validator(addr(1)).unwrap();
        assert_eq!(v.signing_key, addr(9));
        assert_eq!(v.key_rotations.len(), 2);
        assert_eq!(v.key_rotations[0].previous, addr(1));
        assert_eq!(v.key_rotations[0].next, addr(8));
        assert_eq!(v.key_rotations[1].previous, addr(8));
        assert_eq!(v.key_rotations[1].next, addr(9));
        assert_eq!(d.validator_by_signing_key(addr(9)).unwrap().address, addr(1));
        assert!(d.validator_by_signing_key(addr(8)).is_none());
    }

    #[test]
    fn test_rotation_rejects_unchanged_zero_and_collisions() {
        let mut d = directory_with_validator(addr(1));
        d.add_validator(addr(2), "other").unwrap();
        d.rotate_signing_key(addr(2), addr(6)).unwrap();

        assert!(d.rotate_signing_key(addr(1), addr(1)).is_err()); // unchanged (own address)
        assert!(d.rotate_signing_key(addr(1), Address::ZERO).is_err());
        assert!(d.rotate_signing_key(addr(1), addr(2)).is_err()); // another identity
        assert!(d.rotate_signing_key(addr(1), addr(6)).is_err()); // another signing key
        assert!(matches!(
            d.rotate_signing_key(addr(3), addr(7)),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_rotation_cannot_return_to_own_identity() {
        let mut d = directory_with_validator(addr(1));
        d.rotate_signing_key(addr(1), addr(8)).unwrap();
        // The identity address stays reserved even for its own validator.
        assert!(matches!(
            d.rotate_signing_key(addr(1), addr(1)),
            Err(RegistryError::Duplicate(_))
        ));
    }

    // ── Attribute type lifecycle ─────────────────────────────────────

    #[test]
    fn test_type_renewal_requires_identical_definition() {
        let mut d = RegistryDirectory::new();
        d.add_attribute_type(plain_type(7)).unwrap();
        d.remove_attribute_type(AttributeTypeId(7)).unwrap();

        let mut changed = plain_type(7);
        changed.description = "something else".into();
        assert!(matches!(
            d.add_attribute_type(changed),
            Err(RegistryError::Duplicate(_))
        ));

        let mut reflagged = plain_type(7);
        reflagged.restricted = true;
        assert!(d.add_attribute_type(reflagged).is_err());

        // Identical renewal succeeds, even with different economic fields.
        let mut renewed = plain_type(7);
        renewed.minimum_stake = Amount(500);
        d.add_attribute_type(renewed).unwrap();
        assert_eq!(
            d.attribute_type(AttributeTypeId(7)).unwrap().minimum_stake,
            Amount(500)
        );
    }

    #[test]
    fn test_live_type_cannot_be_redefined() {
        let mut d = RegistryDirectory::new();
        d.add_attribute_type(plain_type(7)).unwrap();
        assert!(matches!(
            d.add_attribute_type(plain_type(7)),
            Err(RegistryError::Duplicate(_))
        ));
    }

    #[test]
    fn test_remove_type_deletes_approvals_but_not_commitment() {
        let mut d = directory_with_validator(addr(1));
        d.add_attribute_type(plain_type(7)).unwrap();
        d.add_approval(addr(1), AttributeTypeId(7)).unwrap();
        d.remove_attribute_type(AttributeTypeId(7)).unwrap();

        assert!(d.attribute_type(AttributeTypeId(7)).is_none());
        assert!(!d.is_approved(addr(1), AttributeTypeId(7)));

        // Renewal still gated by the original commitment.
        let mut changed = plain_type(7);
        changed.restricted = true;
        assert!(d.add_attribute_type(changed).is_err());

        // And renewal does not restore the approval.
        d.add_attribute_type(plain_type(7)).unwrap();
        assert!(!d.is_approved(addr(1), AttributeTypeId(7)));
    }

    #[test]
    fn test_economic_setters() {
        let mut d = RegistryDirectory::new();
        d.add_attribute_type(plain_type(3)).unwrap();
        d.set_minimum_stake(AttributeTypeId(3), Amount(100)).unwrap();
        d.set_jurisdiction_fee(AttributeTypeId(3), Amount(25)).unwrap();
        let source = SecondarySource {
            registry: addr(9),
            remote_type_id: AttributeTypeId(30),
        };
        d.set_secondary_source(AttributeTypeId(3), Some(source)).unwrap();

        let def = d.attribute_type(AttributeTypeId(3)).unwrap();
        assert_eq!(def.minimum_stake, Amount(100));
        assert_eq!(def.jurisdiction_fee, Amount(25));
        assert_eq!(def.secondary_source, Some(source));

        assert!(matches!(
            d.set_minimum_stake(AttributeTypeId(4), Amount(1)),
            Err(RegistryError::NotFound(_))
        ));
    }

    // ── Approvals ────────────────────────────────────────────────────

    #[test]
    fn test_approval_requires_both_referents() {
        let mut d = directory_with_validator(addr(1));
        assert!(matches!(
            d.add_approval(addr(1), AttributeTypeId(7)),
            Err(RegistryError::NotFound(_))
        ));
        d.add_attribute_type(plain_type(7)).unwrap();
        assert!(matches!(
            d.add_approval(addr(2), AttributeTypeId(7)),
            Err(RegistryError::NotFound(_))
        ));
        d.add_approval(addr(1), AttributeTypeId(7)).unwrap();
        assert!(matches!(
            d.add_approval(addr(1), AttributeTypeId(7)),
            Err(RegistryError::Duplicate(_))
        ));
    }

    #[test]
    fn test_remove_missing_approval_fails() {
        let mut d = directory_with_validator(addr(1));
        d.add_attribute_type(plain_type(7)).unwrap();
        assert!(matches!(
            d.remove_approval(addr(1), AttributeTypeId(7)),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_can_validate_composes_all_three_conditions() {
        let mut d = directory_with_validator(addr(1));
        d.add_attribute_type(plain_type(7)).unwrap();
        assert!(!d.can_validate(addr(1), AttributeTypeId(7)));
        d.add_approval(addr(1), AttributeTypeId(7)).unwrap();
        assert!(d.can_validate(addr(1), AttributeTypeId(7)));
        d.remove_attribute_type(AttributeTypeId(7)).unwrap();
        assert!(!d.can_validate(addr(1), AttributeTypeId(7)));
    }

    #[test]
    fn test_directory_serde_round_trip() {
        let mut d = directory_with_validator(addr(1));
        d.rotate_signing_key(addr(1), addr(8)).unwrap();
        d.add_attribute_type(plain_type(7)).unwrap();
        d.add_approval(addr(1), AttributeTypeId(7)).unwrap();

        let json = serde_json::to_string(&d).unwrap();
        let back: RegistryDirectory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
