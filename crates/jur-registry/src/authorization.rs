//! # Signed-Approval Consumption
//!
//! Tracks which approval digests have been used and decides whether a
//! presented envelope may be consumed. The checks here are the
//! signature-facing half of issuance; type existence and flag policy live
//! in the registry operations that call in.
//!
//! ## Security Invariant
//!
//! A consumed digest is permanently unusable. Consumption survives
//! revocation of the attribute it created: revoke-and-replay is not a way
//! to reuse an approval.
//!
//! Check order is fixed so failures classify deterministically:
//! signature recovery, registry binding, prior consumption, signer
//! registration, validator approval, then record absence.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use jur_core::{Address, ContentDigest, RegistryError};
use jur_crypto::{ApprovalError, SignedApproval};

use crate::directory::RegistryDirectory;
use crate::ledger::AttributeLedger;

/// The result of validating an envelope: the issuing validator's identity
/// and the digest to consume on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalCheck {
    pub validator: Address,
    pub digest: ContentDigest,
}

/// The consumed-digest set for one registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureAuthorization {
    consumed: BTreeSet<ContentDigest>,
}

impl SignatureAuthorization {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_consumed(&self, digest: ContentDigest) -> bool {
        self.consumed.contains(&digest)
    }

    pub fn consumed_count(&self) -> usize {
        self.consumed.len()
    }

    /// Mark a digest consumed. Infallible set insert; callers validate
    /// through [`validate_consumption`](Self::validate_consumption) or
    /// [`authorize_invalidation`](Self::authorize_invalidation) first, so
    /// this is safe as a commit-phase mutation.
    pub fn consume(&mut self, digest: ContentDigest) {
        self.consumed.insert(digest);
    }

    /// Full consumption check for an issuance path.
    ///
    /// Verifies the signature, the registry binding, that the digest is
    /// unused, that the recovered signer is some validator's current
    /// signing key, that the validator holds the approval for the
    /// message's type, and that the subject does not already hold a
    /// record (raw existence, visibility ignored).
    pub fn validate_consumption(
        &self,
        directory: &RegistryDirectory,
        ledger: &AttributeLedger,
        registry: Address,
        approval: &SignedApproval,
    ) -> Result<ApprovalCheck, RegistryError> {
        let check = self.check_signer(directory, registry, approval)?;
        let message = &approval.message;
        if !directory.can_validate(check.validator, message.attribute_type_id) {
            return Err(RegistryError::Authorization(format!(
                "validator {} holds no approval for type {}",
                check.validator, message.attribute_type_id
            )));
        }
        if ledger.is_recorded(message.subject, message.attribute_type_id) {
            return Err(RegistryError::Duplicate(format!(
                "subject {} already holds type {}",
                message.subject, message.attribute_type_id
            )));
        }
        Ok(check)
    }

    /// Invalidation check: same signature-facing gates as consumption,
    /// without the approval and record conditions. A validator may burn
    /// an approval for a type it no longer validates.
    ///
    /// The caller-must-be-the-signing-validator rule is enforced by the
    /// registry operation, which knows the caller.
    pub fn authorize_invalidation(
        &self,
        directory: &RegistryDirectory,
        registry: Address,
        approval: &SignedApproval,
    ) -> Result<ApprovalCheck, RegistryError> {
        self.check_signer(directory, registry, approval)
    }

    fn check_signer(
        &self,
        directory: &RegistryDirectory,
        registry: Address,
        approval: &SignedApproval,
    ) -> Result<ApprovalCheck, RegistryError> {
        let origin = approval.recover().map_err(approval_error)?;
        let message = &approval.message;
        if message.registry != registry {
            return Err(RegistryError::Signature(format!(
                "approval is addressed to registry {}, not {registry}",
                message.registry
            )));
        }
        if self.is_consumed(origin.digest) {
            return Err(RegistryError::Signature(
                "approval has already been consumed".into(),
            ));
        }
        let validator = directory
            .validator_by_signing_key(origin.signer)
            .ok_or_else(|| {
                RegistryError::Signature(format!(
                    "signer {} is not a current signing key of any validator",
                    origin.signer
                ))
            })?;
        Ok(ApprovalCheck {
            validator: validator.address,
            digest: origin.digest,
        })
    }
}

fn approval_error(e: ApprovalError) -> RegistryError {
    match e {
        ApprovalError::Canonicalization(inner) => RegistryError::Canonicalization(inner),
        ApprovalError::Signature(inner) => RegistryError::Signature(inner.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::AttributeTypeDef;
    use crate::ledger::AttributeRecord;
    use jur_core::{Amount, AttributeTypeId, AttributeValue, Timestamp};
    use jur_crypto::{ApprovalMessage, SigningKeyPair};

    const REGISTRY: u8 = 0xaa;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    fn setup(keys: &SigningKeyPair) -> (RegistryDirectory, AttributeLedger) {
        let mut directory = RegistryDirectory::new();
        directory.add_validator(keys.address(), "verifier").unwrap();
        directory
            .add_attribute_type(AttributeTypeDef {
                id: AttributeTypeId(7),
                description: "kyc".into(),
                restricted: false,
                only_personal: false,
                minimum_stake: Amount::ZERO,
                jurisdiction_fee: Amount::ZERO,
                secondary_source: None,
            })
            .unwrap();
        directory.add_approval(keys.address(), AttributeTypeId(7)).unwrap();
        (directory, AttributeLedger::new())
    }

    fn message(subject: Address) -> ApprovalMessage {
        ApprovalMessage {
            registry: addr(REGISTRY),
            subject,
            operator: Address::ZERO,
            funds_required: Amount(100),
            validator_fee: Amount(10),
            attribute_type_id: AttributeTypeId(7),
            value: AttributeValue(1),
        }
    }

    #[test]
    fn test_valid_envelope_passes_all_gates() {
        let keys = SigningKeyPair::from_seed(&[1u8; 32]);
        let (directory, ledger) = setup(&keys);
        let auth = SignatureAuthorization::new();
        let envelope = SignedApproval::sign(message(addr(2)), &keys).unwrap();

        let check = auth
            .validate_consumption(&directory, &ledger, addr(REGISTRY), &envelope)
            .unwrap();
        assert_eq!(check.validator, keys.address());
        assert_eq!(check.digest, envelope.message.digest().unwrap());
    }

    #[test]
    fn test_consumed_digest_rejected() {
        let keys = SigningKeyPair::from_seed(&[1u8; 32]);
        let (directory, ledger) = setup(&keys);
        let mut auth = SignatureAuthorization::new();
        let envelope = SignedApproval::sign(message(addr(2)), &keys).unwrap();

        let check = auth
            .validate_consumption(&directory, &ledger, addr(REGISTRY), &envelope)
            .unwrap();
        auth.consume(check.digest);
        assert!(auth.is_consumed(check.digest));
        assert!(matches!(
            auth.validate_consumption(&directory, &ledger, addr(REGISTRY), &envelope),
            Err(RegistryError::Signature(_))
        ));
    }

    #[test]
    fn test_wrong_registry_rejected() {
        let keys = SigningKeyPair::from_seed(&[1u8; 32]);
        let (directory, ledger) = setup(&keys);
        let auth = SignatureAuthorization::new();
        let envelope = SignedApproval::sign(message(addr(2)), &keys).unwrap();

        assert!(matches!(
            auth.validate_consumption(&directory, &ledger, addr(0xbb), &envelope),
            Err(RegistryError::Signature(_))
        ));
    }

    #[test]
    fn test_unregistered_signer_rejected() {
        let keys = SigningKeyPair::from_seed(&[1u8; 32]);
        let stranger = SigningKeyPair::from_seed(&[2u8; 32]);
        let (directory, ledger) = setup(&keys);
        let auth = SignatureAuthorization::new();
        let envelope = SignedApproval::sign(message(addr(2)), &stranger).unwrap();

        assert!(matches!(
            auth.validate_consumption(&directory, &ledger, addr(REGISTRY), &envelope),
            Err(RegistryError::Signature(_))
        ));
    }

    #[test]
    fn test_validator_without_approval_rejected() {
        let keys = SigningKeyPair::from_seed(&[1u8; 32]);
        let (mut directory, ledger) = setup(&keys);
        directory.remove_approval(keys.address(), AttributeTypeId(7)).unwrap();
        let auth = SignatureAuthorization::new();
        let envelope = SignedApproval::sign(message(addr(2)), &keys).unwrap();

        assert!(matches!(
            auth.validate_consumption(&directory, &ledger, addr(REGISTRY), &envelope),
            Err(RegistryError::Authorization(_))
        ));
    }

    #[test]
    fn test_existing_record_rejected_even_if_invisible() {
        let keys = SigningKeyPair::from_seed(&[1u8; 32]);
        let (mut directory, mut ledger) = setup(&keys);
        ledger.insert(
            addr(2),
            AttributeTypeId(7),
            AttributeRecord {
                value: AttributeValue(9),
                issuing_validator: keys.address(),
                operator: None,
                stake: Amount(50),
                funded_by: addr(2),
                issued_at: Timestamp::now(),
            },
        );
        let auth = SignatureAuthorization::new();
        let envelope = SignedApproval::sign(message(addr(2)), &keys).unwrap();
        assert!(matches!(
            auth.validate_consumption(&directory, &ledger, addr(REGISTRY), &envelope),
            Err(RegistryError::Duplicate(_))
        ));

        // Hide the record: the raw entry still blocks, but the missing
        // approval gate fires first.
        directory.remove_approval(keys.address(), AttributeTypeId(7)).unwrap();
        assert!(!ledger.is_visible(&directory, addr(2), AttributeTypeId(7)));
        assert!(matches!(
            auth.validate_consumption(&directory, &ledger, addr(REGISTRY), &envelope),
            Err(RegistryError::Authorization(_))
        ));
    }

    #[test]
    fn test_rotation_invalidates_old_key_signatures() {
        let old_keys = SigningKeyPair::from_seed(&[1u8; 32]);
        let new_keys = SigningKeyPair::from_seed(&[9u8; 32]);
        let (mut directory, ledger) = setup(&old_keys);
        directory
            .rotate_signing_key(old_keys.address(), new_keys.address())
            .unwrap();
        let auth = SignatureAuthorization::new();

        let stale = SignedApproval::sign(message(addr(2)), &old_keys).unwrap();
        assert!(matches!(
            auth.validate_consumption(&directory, &ledger, addr(REGISTRY), &stale),
            Err(RegistryError::Signature(_))
        ));

        let fresh = SignedApproval::sign(message(addr(2)), &new_keys).unwrap();
        let check = auth
            .validate_consumption(&directory, &ledger, addr(REGISTRY), &fresh)
            .unwrap();
        assert_eq!(check.validator, old_keys.address());
    }

    #[test]
    fn test_invalidation_gates() {
        let keys = SigningKeyPair::from_seed(&[1u8; 32]);
        let (mut directory, _ledger) = setup(&keys);
        // Invalidation works even without the approval grant.
        directory.remove_approval(keys.address(), AttributeTypeId(7)).unwrap();
        let mut auth = SignatureAuthorization::new();
        let envelope = SignedApproval::sign(message(addr(2)), &keys).unwrap();

        let check = auth
            .authorize_invalidation(&directory, addr(REGISTRY), &envelope)
            .unwrap();
        assert_eq!(check.validator, keys.address());
        auth.consume(check.digest);

        // Second invalidation of the same digest is rejected.
        assert!(matches!(
            auth.authorize_invalidation(&directory, addr(REGISTRY), &envelope),
            Err(RegistryError::Signature(_))
        ));
    }
}
