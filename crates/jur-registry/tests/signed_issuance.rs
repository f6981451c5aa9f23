//! # Signed Issuance Tests
//!
//! The two signed-approval paths (subject self-issuance and
//! operator-mediated issuance) against a live registry: recovery of the
//! signing validator, single-use consumption, invalidation, and the
//! interaction with signing-key rotation.

use jur_core::{Address, Amount, AttributeTypeId, AttributeValue, RegistryError};
use jur_crypto::{ApprovalMessage, SignedApproval, SigningKeyPair};
use jur_registry::{AttributeTypeDef, CallContext, Jurisdiction, TransferReason};

const TYPE_ID: AttributeTypeId = AttributeTypeId(11111);
const VALUE: AttributeValue = AttributeValue(67890);

fn addr(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    Address::from_bytes(bytes)
}

const OWNER: u8 = 0x01;
const SUBJECT: u8 = 0x03;
const OPERATOR: u8 = 0x04;

fn registry_addr() -> Address {
    addr(0xaa)
}

fn type_def(id: AttributeTypeId, restricted: bool, only_personal: bool) -> AttributeTypeDef {
    AttributeTypeDef {
        id,
        description: format!("type-{}", id),
        restricted,
        only_personal,
        minimum_stake: Amount::ZERO,
        jurisdiction_fee: Amount::ZERO,
        secondary_source: None,
    }
}

/// A registry with one signing validator approved for `TYPE_ID`.
fn setup() -> (Jurisdiction, SigningKeyPair) {
    let owner = CallContext::new(addr(OWNER));
    let keys = SigningKeyPair::from_seed(&[7u8; 32]);
    let mut j = Jurisdiction::new(registry_addr(), addr(OWNER)).unwrap();
    j.add_validator(&owner, keys.address(), "signing validator")
        .unwrap();
    j.add_attribute_type(&owner, type_def(TYPE_ID, false, false))
        .unwrap();
    j.add_approval(&owner, keys.address(), TYPE_ID).unwrap();
    (j, keys)
}

fn approval(
    keys: &SigningKeyPair,
    subject: Address,
    operator: Address,
    funds_required: u128,
    validator_fee: u128,
    attribute_type_id: AttributeTypeId,
) -> SignedApproval {
    let message = ApprovalMessage {
        registry: registry_addr(),
        subject,
        operator,
        funds_required: Amount(funds_required),
        validator_fee: Amount(validator_fee),
        attribute_type_id,
        value: VALUE,
    };
    SignedApproval::sign(message, keys).unwrap()
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[test]
fn test_subject_self_issuance() {
    let (mut j, keys) = setup();
    let signed = approval(&keys, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);

    assert!(j.can_add_attribute(addr(SUBJECT), &signed));
    let ctx = CallContext::new(addr(SUBJECT)).with_value(Amount(100));
    let receipt = j.add_attribute(&ctx, &signed).unwrap();

    assert_eq!(receipt.staked, Amount(75));
    assert_eq!(receipt.issuing_validator, keys.address());
    assert_eq!(receipt.transfers.len(), 1);
    assert_eq!(receipt.transfers[0].to, keys.address());
    assert_eq!(receipt.transfers[0].amount, Amount(25));
    assert_eq!(receipt.transfers[0].reason, TransferReason::ValidatorFee);

    assert!(j.has_attribute(addr(SUBJECT), TYPE_ID));
    assert_eq!(j.attribute_value(addr(SUBJECT), TYPE_ID), Some(VALUE));
    let record = j.attribute_record(addr(SUBJECT), TYPE_ID).unwrap();
    assert_eq!(record.operator, None);
    assert_eq!(record.funded_by, addr(SUBJECT));
    assert_eq!(record.issuing_validator, keys.address());
    assert_eq!(j.escrowed_total(), Amount(75));
}

#[test]
fn test_operator_issuance() {
    let (mut j, keys) = setup();
    let signed = approval(&keys, addr(SUBJECT), addr(OPERATOR), 100, 25, TYPE_ID);

    assert!(j.can_add_attribute_for(addr(OPERATOR), &signed));
    let ctx = CallContext::new(addr(OPERATOR)).with_value(Amount(100));
    j.add_attribute_for(&ctx, &signed).unwrap();

    let record = j.attribute_record(addr(SUBJECT), TYPE_ID).unwrap();
    assert_eq!(record.operator, Some(addr(OPERATOR)));
    assert_eq!(record.funded_by, addr(OPERATOR));
    assert!(j.has_attribute(addr(SUBJECT), TYPE_ID));

    // The operator can later undo what it funded.
    let undo = CallContext::new(addr(OPERATOR));
    j.remove_attribute_for(&undo, addr(SUBJECT), TYPE_ID).unwrap();
    assert!(j.attribute_record(addr(SUBJECT), TYPE_ID).is_none());
    assert_eq!(j.escrowed_total(), Amount::ZERO);
}

// ---------------------------------------------------------------------------
// Caller and path binding
// ---------------------------------------------------------------------------

#[test]
fn test_only_the_named_subject_may_self_issue() {
    let (mut j, keys) = setup();
    let signed = approval(&keys, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);
    let imposter = CallContext::new(addr(9)).with_value(Amount(100));
    assert!(matches!(
        j.add_attribute(&imposter, &signed),
        Err(RegistryError::Authorization(_))
    ));
    assert!(!j.can_add_attribute(addr(9), &signed));
}

#[test]
fn test_only_the_named_operator_may_mediate() {
    let (mut j, keys) = setup();
    let signed = approval(&keys, addr(SUBJECT), addr(OPERATOR), 100, 25, TYPE_ID);
    // Not even the subject can use an operator-scoped approval.
    let subject = CallContext::new(addr(SUBJECT)).with_value(Amount(100));
    assert!(matches!(
        j.add_attribute_for(&subject, &signed),
        Err(RegistryError::Authorization(_))
    ));
}

#[test]
fn test_paths_are_not_interchangeable() {
    let (mut j, keys) = setup();

    // An operator-scoped approval cannot go through the subject path.
    let with_operator = approval(&keys, addr(SUBJECT), addr(OPERATOR), 100, 25, TYPE_ID);
    let subject = CallContext::new(addr(SUBJECT)).with_value(Amount(100));
    assert!(matches!(
        j.add_attribute(&subject, &with_operator),
        Err(RegistryError::Authorization(_))
    ));

    // A subject-scoped approval cannot go through the operator path.
    let personal = approval(&keys, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);
    let operator = CallContext::new(addr(OPERATOR)).with_value(Amount(100));
    assert!(matches!(
        j.add_attribute_for(&operator, &personal),
        Err(RegistryError::Authorization(_))
    ));
}

#[test]
fn test_type_flags_gate_the_signed_paths() {
    let (mut j, keys) = setup();
    let owner = CallContext::new(addr(OWNER));
    let restricted = AttributeTypeId(600);
    let personal = AttributeTypeId(601);
    j.add_attribute_type(&owner, type_def(restricted, true, false))
        .unwrap();
    j.add_attribute_type(&owner, type_def(personal, false, true))
        .unwrap();
    j.add_approval(&owner, keys.address(), restricted).unwrap();
    j.add_approval(&owner, keys.address(), personal).unwrap();

    // Restricted: no subject self-issuance, even with a valid approval.
    let signed = approval(&keys, addr(SUBJECT), Address::ZERO, 100, 25, restricted);
    let subject = CallContext::new(addr(SUBJECT)).with_value(Amount(100));
    assert!(matches!(
        j.add_attribute(&subject, &signed),
        Err(RegistryError::Authorization(_))
    ));

    // Personal: no operator mediation.
    let signed = approval(&keys, addr(SUBJECT), addr(OPERATOR), 100, 25, personal);
    let operator = CallContext::new(addr(OPERATOR)).with_value(Amount(100));
    assert!(matches!(
        j.add_attribute_for(&operator, &signed),
        Err(RegistryError::Authorization(_))
    ));
}

// ---------------------------------------------------------------------------
// Funds binding
// ---------------------------------------------------------------------------

#[test]
fn test_attached_funds_must_equal_funds_required() {
    let (mut j, keys) = setup();
    let signed = approval(&keys, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);
    let before = j.state_digest().unwrap();

    for wrong in [Amount(99), Amount(101), Amount::ZERO] {
        let ctx = CallContext::new(addr(SUBJECT)).with_value(wrong);
        assert!(matches!(
            j.add_attribute(&ctx, &signed),
            Err(RegistryError::FundsMismatch(_))
        ));
    }
    assert_eq!(j.state_digest().unwrap(), before);

    // The exact amount goes through.
    let ctx = CallContext::new(addr(SUBJECT)).with_value(Amount(100));
    j.add_attribute(&ctx, &signed).unwrap();
}

#[test]
fn test_funds_required_must_cover_the_floor() {
    let (mut j, keys) = setup();
    let owner = CallContext::new(addr(OWNER));
    j.set_minimum_stake(&owner, TYPE_ID, Amount(100)).unwrap();
    j.set_jurisdiction_fee(&owner, TYPE_ID, Amount(10)).unwrap();

    // floor = stake 100 + jurisdiction fee 10 + validator fee 25
    let short = approval(&keys, addr(SUBJECT), Address::ZERO, 134, 25, TYPE_ID);
    let ctx = CallContext::new(addr(SUBJECT)).with_value(Amount(134));
    assert!(matches!(
        j.add_attribute(&ctx, &short),
        Err(RegistryError::FundsMismatch(_))
    ));

    let exact = approval(&keys, addr(SUBJECT), Address::ZERO, 135, 25, TYPE_ID);
    let ctx = CallContext::new(addr(SUBJECT)).with_value(Amount(135));
    let receipt = j.add_attribute(&ctx, &exact).unwrap();
    assert_eq!(receipt.staked, Amount(100));
}

// ---------------------------------------------------------------------------
// Single use, invalidation, and rotation
// ---------------------------------------------------------------------------

#[test]
fn test_consumed_approval_never_replays() {
    let (mut j, keys) = setup();
    let signed = approval(&keys, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);
    let ctx = CallContext::new(addr(SUBJECT)).with_value(Amount(100));
    j.add_attribute(&ctx, &signed).unwrap();

    assert!(matches!(
        j.add_attribute(&ctx, &signed),
        Err(RegistryError::Signature(_))
    ));

    // Not even after the attribute is gone again.
    let validator = CallContext::new(keys.address());
    j.revoke_attribute(&validator, addr(SUBJECT), TYPE_ID).unwrap();
    assert!(!j.has_attribute(addr(SUBJECT), TYPE_ID));
    assert!(matches!(
        j.add_attribute(&ctx, &signed),
        Err(RegistryError::Signature(_))
    ));
}

#[test]
fn test_rejected_issuance_does_not_consume_the_approval() {
    let (mut j, keys) = setup();
    let validator = CallContext::new(keys.address());
    j.issue_attribute(&validator, addr(SUBJECT), TYPE_ID, VALUE)
        .unwrap();

    // Blocked by the existing record; the envelope must survive.
    let signed = approval(&keys, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);
    let ctx = CallContext::new(addr(SUBJECT)).with_value(Amount(100));
    assert!(matches!(
        j.add_attribute(&ctx, &signed),
        Err(RegistryError::Duplicate(_))
    ));

    // Once the slot clears, the same envelope still works.
    j.revoke_attribute(&validator, addr(SUBJECT), TYPE_ID).unwrap();
    j.add_attribute(&ctx, &signed).unwrap();
    assert!(j.has_attribute(addr(SUBJECT), TYPE_ID));
}

#[test]
fn test_invalidation_is_signer_only_and_permanent() {
    let (mut j, keys) = setup();
    let signed = approval(&keys, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);

    // Only the validator whose key signed it may burn it.
    assert!(matches!(
        j.invalidate_approval(&CallContext::new(addr(SUBJECT)), &signed),
        Err(RegistryError::Authorization(_))
    ));

    let validator = CallContext::new(keys.address());
    j.invalidate_approval(&validator, &signed).unwrap();

    // Burned is burned, for issuance and for re-invalidation.
    let ctx = CallContext::new(addr(SUBJECT)).with_value(Amount(100));
    assert!(matches!(
        j.add_attribute(&ctx, &signed),
        Err(RegistryError::Signature(_))
    ));
    assert!(matches!(
        j.invalidate_approval(&validator, &signed),
        Err(RegistryError::Signature(_))
    ));
}

#[test]
fn test_key_rotation_invalidates_outstanding_envelopes() {
    let (mut j, keys) = setup();
    let old_envelope = approval(&keys, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);

    let next_keys = SigningKeyPair::from_seed(&[8u8; 32]);
    let validator = CallContext::new(keys.address());
    j.set_signing_key(&validator, next_keys.address()).unwrap();

    // The old key no longer maps to any validator.
    let ctx = CallContext::new(addr(SUBJECT)).with_value(Amount(100));
    assert!(matches!(
        j.add_attribute(&ctx, &old_envelope),
        Err(RegistryError::Signature(_))
    ));

    // Approvals signed under the new key are honored, and the record
    // still names the validator's identity address.
    let fresh = approval(&next_keys, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);
    let receipt = j.add_attribute(&ctx, &fresh).unwrap();
    assert_eq!(receipt.issuing_validator, keys.address());
}

// ---------------------------------------------------------------------------
// Envelope integrity
// ---------------------------------------------------------------------------

#[test]
fn test_tampered_message_is_rejected() {
    let (mut j, keys) = setup();
    let mut signed = approval(&keys, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);
    signed.message.funds_required = Amount(1);

    let ctx = CallContext::new(addr(SUBJECT)).with_value(Amount(1));
    assert!(matches!(
        j.add_attribute(&ctx, &signed),
        Err(RegistryError::Signature(_))
    ));
}

#[test]
fn test_approval_is_bound_to_one_registry() {
    let (mut j, keys) = setup();
    let message = ApprovalMessage {
        registry: addr(0xbb),
        subject: addr(SUBJECT),
        operator: Address::ZERO,
        funds_required: Amount(100),
        validator_fee: Amount(25),
        attribute_type_id: TYPE_ID,
        value: VALUE,
    };
    let foreign = SignedApproval::sign(message, &keys).unwrap();

    let ctx = CallContext::new(addr(SUBJECT)).with_value(Amount(100));
    assert!(matches!(
        j.add_attribute(&ctx, &foreign),
        Err(RegistryError::Signature(_))
    ));
}

#[test]
fn test_signer_must_be_an_approved_validator() {
    let (mut j, keys) = setup();
    let owner = CallContext::new(addr(OWNER));

    // A well-formed envelope from an unknown key is a signature failure.
    let outsider = SigningKeyPair::from_seed(&[9u8; 32]);
    let unknown = approval(&outsider, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);
    let ctx = CallContext::new(addr(SUBJECT)).with_value(Amount(100));
    assert!(matches!(
        j.add_attribute(&ctx, &unknown),
        Err(RegistryError::Signature(_))
    ));

    // A known validator without the type approval is an authorization
    // failure.
    j.remove_approval(&owner, keys.address(), TYPE_ID).unwrap();
    let signed = approval(&keys, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);
    assert!(matches!(
        j.add_attribute(&ctx, &signed),
        Err(RegistryError::Authorization(_))
    ));
}

#[test]
fn test_failed_signed_calls_leave_state_unchanged() {
    let (mut j, keys) = setup();
    let before = j.state_digest().unwrap();

    let signed = approval(&keys, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);
    let wrong_funds = CallContext::new(addr(SUBJECT)).with_value(Amount(42));
    assert!(j.add_attribute(&wrong_funds, &signed).is_err());

    let imposter = CallContext::new(addr(9)).with_value(Amount(100));
    assert!(j.add_attribute(&imposter, &signed).is_err());

    let mut tampered = approval(&keys, addr(SUBJECT), Address::ZERO, 100, 25, TYPE_ID);
    tampered.message.value = AttributeValue(1);
    let ctx = CallContext::new(addr(SUBJECT)).with_value(Amount(100));
    assert!(j.add_attribute(&ctx, &tampered).is_err());

    assert!(j
        .invalidate_approval(&CallContext::new(addr(SUBJECT)), &signed)
        .is_err());

    assert_eq!(j.state_digest().unwrap(), before);
}
