//! # The Jurisdiction Aggregate
//!
//! One registry: directory, ledger, escrow, and approval consumption
//! behind a single operation surface. External callers (the owner,
//! validators, subjects, operators) only ever touch state through the
//! operations here.
//!
//! ## Atomicity
//!
//! Every mutating operation is validate-then-commit. The validate phase
//! borrows immutably and performs every policy, signature, and funds
//! check; the commit phase mutates. The only fallible commit step is the
//! escrow hold/release, and it always runs first, so a failure at any
//! point leaves the registry byte-for-byte unchanged —
//! [`Jurisdiction::state_digest`] makes that testable.
//!
//! ## Value Movement
//!
//! The registry holds no money. Operations account for value: attached
//! funds are declared in the [`CallContext`], and every fee, refund, and
//! rebate comes back in the receipt's [`Transfer`] list for the embedding
//! environment to execute.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use jur_core::{
    sha256_digest, Address, Amount, AttributeTypeId, AttributeValue, CanonicalBytes,
    ContentDigest, RegistryError, SourceFault, Timestamp,
};
use jur_crypto::SignedApproval;

use crate::authorization::{ApprovalCheck, SignatureAuthorization};
use crate::directory::{AttributeTypeDef, RegistryDirectory, SecondarySource, Validator};
use crate::escrow::{
    settle_revocation, split_direct, split_signed, Settlement, StakeFeeEscrow,
};
use crate::ledger::{AttributeLedger, AttributeRecord};
use crate::resolver::{AttributeSource, SecondarySourceResolver};

// ─── Call context and receipts ───────────────────────────────────────

/// Who is calling, and with what money.
///
/// `value` is the funds attached to the call; `fee_rate` is the caller's
/// per-unit transaction price, used only to size revocation rebates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub value: Amount,
    pub fee_rate: Amount,
}

impl CallContext {
    pub fn new(caller: Address) -> Self {
        Self {
            caller,
            value: Amount::ZERO,
            fee_rate: Amount::ZERO,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    pub fn with_fee_rate(mut self, fee_rate: Amount) -> Self {
        self.fee_rate = fee_rate;
        self
    }
}

/// Why a transfer appears in a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferReason {
    JurisdictionFee,
    ValidatorFee,
    StakeRefund,
    RevocationRebate,
}

/// One value movement the embedding environment must execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to: Address,
    pub amount: Amount,
    pub reason: TransferReason,
}

/// Outcome of a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceReceipt {
    pub subject: Address,
    pub attribute_type: AttributeTypeId,
    pub value: AttributeValue,
    pub issuing_validator: Address,
    pub staked: Amount,
    pub transfers: Vec<Transfer>,
}

/// Outcome of a successful revocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationReceipt {
    pub subject: Address,
    pub attribute_type: AttributeTypeId,
    pub released: Amount,
    pub transfers: Vec<Transfer>,
}

fn push_transfer(transfers: &mut Vec<Transfer>, to: Address, amount: Amount, reason: TransferReason) {
    if !amount.is_zero() {
        transfers.push(Transfer { to, amount, reason });
    }
}

/// Which signed issuance entry point is being exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignedPath {
    Subject,
    Operator,
}

// ─── Jurisdiction ────────────────────────────────────────────────────

/// A complete attribute registry.
///
/// Plain owned value, `Send + Sync`; an embedding service serializes
/// access behind one lock. Serializes to deterministic JSON — the
/// secondary-source handle table is runtime wiring and is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jurisdiction {
    address: Address,
    owner: Address,
    directory: RegistryDirectory,
    ledger: AttributeLedger,
    authorization: SignatureAuthorization,
    escrow: StakeFeeEscrow,
    #[serde(skip, default)]
    resolver: SecondarySourceResolver,
}

impl Jurisdiction {
    /// Create an empty registry identified by `address`, owned by `owner`.
    pub fn new(address: Address, owner: Address) -> Result<Self, RegistryError> {
        if address.is_zero() || owner.is_zero() {
            return Err(RegistryError::Duplicate(
                "the zero address is reserved".into(),
            ));
        }
        Ok(Self {
            address,
            owner,
            directory: RegistryDirectory::new(),
            ledger: AttributeLedger::new(),
            authorization: SignatureAuthorization::new(),
            escrow: StakeFeeEscrow::new(),
            resolver: SecondarySourceResolver::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Read-only view of the directory.
    pub fn directory(&self) -> &RegistryDirectory {
        &self.directory
    }

    /// Read-only view of the ledger.
    pub fn ledger(&self) -> &AttributeLedger {
        &self.ledger
    }

    pub fn escrowed_total(&self) -> Amount {
        self.escrow.total()
    }

    /// SHA-256 over the canonical serialization of the whole registry.
    /// Two registries with equal digests hold identical state.
    pub fn state_digest(&self) -> Result<ContentDigest, RegistryError> {
        Ok(sha256_digest(&CanonicalBytes::new(self)?))
    }

    // ── Owner-gated administration ───────────────────────────────────

    pub fn add_validator(
        &mut self,
        ctx: &CallContext,
        address: Address,
        description: impl Into<String>,
    ) -> Result<(), RegistryError> {
        Self::require_no_funds(ctx)?;
        self.require_owner(ctx.caller)?;
        self.directory.add_validator(address, description)
    }

    pub fn remove_validator(
        &mut self,
        ctx: &CallContext,
        address: Address,
    ) -> Result<(), RegistryError> {
        Self::require_no_funds(ctx)?;
        self.require_owner(ctx.caller)?;
        self.directory.remove_validator(address)
    }

    pub fn add_attribute_type(
        &mut self,
        ctx: &CallContext,
        def: AttributeTypeDef,
    ) -> Result<(), RegistryError> {
        Self::require_no_funds(ctx)?;
        self.require_owner(ctx.caller)?;
        self.directory.add_attribute_type(def)
    }

    pub fn remove_attribute_type(
        &mut self,
        ctx: &CallContext,
        id: AttributeTypeId,
    ) -> Result<(), RegistryError> {
        Self::require_no_funds(ctx)?;
        self.require_owner(ctx.caller)?;
        self.directory.remove_attribute_type(id)
    }

    pub fn set_minimum_stake(
        &mut self,
        ctx: &CallContext,
        id: AttributeTypeId,
        stake: Amount,
    ) -> Result<(), RegistryError> {
        Self::require_no_funds(ctx)?;
        self.require_owner(ctx.caller)?;
        self.directory.set_minimum_stake(id, stake)
    }

    pub fn set_jurisdiction_fee(
        &mut self,
        ctx: &CallContext,
        id: AttributeTypeId,
        fee: Amount,
    ) -> Result<(), RegistryError> {
        Self::require_no_funds(ctx)?;
        self.require_owner(ctx.caller)?;
        self.directory.set_jurisdiction_fee(id, fee)
    }

    pub fn set_secondary_source(
        &mut self,
        ctx: &CallContext,
        id: AttributeTypeId,
        source: Option<SecondarySource>,
    ) -> Result<(), RegistryError> {
        Self::require_no_funds(ctx)?;
        self.require_owner(ctx.caller)?;
        self.directory.set_secondary_source(id, source)
    }

    pub fn add_approval(
        &mut self,
        ctx: &CallContext,
        validator: Address,
        attribute_type: AttributeTypeId,
    ) -> Result<(), RegistryError> {
        Self::require_no_funds(ctx)?;
        self.require_owner(ctx.caller)?;
        self.directory.add_approval(validator, attribute_type)
    }

    pub fn remove_approval(
        &mut self,
        ctx: &CallContext,
        validator: Address,
        attribute_type: AttributeTypeId,
    ) -> Result<(), RegistryError> {
        Self::require_no_funds(ctx)?;
        self.require_owner(ctx.caller)?;
        self.directory.remove_approval(validator, attribute_type)
    }

    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        new_owner: Address,
    ) -> Result<(), RegistryError> {
        Self::require_no_funds(ctx)?;
        self.require_owner(ctx.caller)?;
        if new_owner.is_zero() {
            return Err(RegistryError::Duplicate(
                "the zero address is reserved".into(),
            ));
        }
        self.owner = new_owner;
        Ok(())
    }

    /// Validator self-service: rotate the caller's own signing key.
    pub fn set_signing_key(
        &mut self,
        ctx: &CallContext,
        new_key: Address,
    ) -> Result<(), RegistryError> {
        Self::require_no_funds(ctx)?;
        if !self.directory.is_validator(ctx.caller) {
            return Err(RegistryError::Authorization(format!(
                "caller {} is not a validator",
                ctx.caller
            )));
        }
        self.directory.rotate_signing_key(ctx.caller, new_key)
    }

    // ── Issuance ─────────────────────────────────────────────────────

    /// Direct issuance by an approved validator. No signature involved;
    /// the caller's role is the authorization.
    pub fn issue_attribute(
        &mut self,
        ctx: &CallContext,
        subject: Address,
        attribute_type: AttributeTypeId,
        value: AttributeValue,
    ) -> Result<IssuanceReceipt, RegistryError> {
        // validate
        let def = self.require_type(attribute_type)?;
        let (minimum_stake, jurisdiction_fee) = (def.minimum_stake, def.jurisdiction_fee);
        if !self.directory.can_validate(ctx.caller, attribute_type) {
            return Err(RegistryError::Authorization(format!(
                "caller {} holds no approval for type {attribute_type}",
                ctx.caller
            )));
        }
        if self.ledger.is_recorded(subject, attribute_type) {
            return Err(RegistryError::Duplicate(format!(
                "subject {subject} already holds type {attribute_type}"
            )));
        }
        let split = split_direct(ctx.value, minimum_stake, jurisdiction_fee)?;

        // commit
        self.escrow.hold(split.stake)?;
        self.ledger.insert(
            subject,
            attribute_type,
            AttributeRecord {
                value,
                issuing_validator: ctx.caller,
                operator: None,
                stake: split.stake,
                funded_by: ctx.caller,
                issued_at: Timestamp::now(),
            },
        );

        let mut transfers = Vec::new();
        push_transfer(
            &mut transfers,
            self.owner,
            split.jurisdiction_fee,
            TransferReason::JurisdictionFee,
        );
        Ok(IssuanceReceipt {
            subject,
            attribute_type,
            value,
            issuing_validator: ctx.caller,
            staked: split.stake,
            transfers,
        })
    }

    /// Self-issuance by the subject, authorized by a signed approval with
    /// no operator. Fails for `restricted` types.
    pub fn add_attribute(
        &mut self,
        ctx: &CallContext,
        approval: &SignedApproval,
    ) -> Result<IssuanceReceipt, RegistryError> {
        self.signed_issuance(ctx, approval, SignedPath::Subject)
    }

    /// Operator-mediated issuance. The caller must be the operator the
    /// approval names. Fails for `only_personal` types.
    pub fn add_attribute_for(
        &mut self,
        ctx: &CallContext,
        approval: &SignedApproval,
    ) -> Result<IssuanceReceipt, RegistryError> {
        self.signed_issuance(ctx, approval, SignedPath::Operator)
    }

    fn signed_issuance(
        &mut self,
        ctx: &CallContext,
        approval: &SignedApproval,
        path: SignedPath,
    ) -> Result<IssuanceReceipt, RegistryError> {
        // validate
        let check = self.check_signed_issuance(ctx.caller, approval, path)?;
        let message = &approval.message;
        let def = self.require_type(message.attribute_type_id)?;
        let split = split_signed(
            ctx.value,
            message.funds_required,
            message.validator_fee,
            def.minimum_stake,
            def.jurisdiction_fee,
        )?;
        let operator = match path {
            SignedPath::Subject => None,
            SignedPath::Operator => Some(ctx.caller),
        };

        // commit
        self.escrow.hold(split.stake)?;
        self.authorization.consume(check.digest);
        self.ledger.insert(
            message.subject,
            message.attribute_type_id,
            AttributeRecord {
                value: message.value,
                issuing_validator: check.validator,
                operator,
                stake: split.stake,
                funded_by: ctx.caller,
                issued_at: Timestamp::now(),
            },
        );

        let mut transfers = Vec::new();
        push_transfer(
            &mut transfers,
            self.owner,
            split.jurisdiction_fee,
            TransferReason::JurisdictionFee,
        );
        push_transfer(
            &mut transfers,
            check.validator,
            split.validator_fee,
            TransferReason::ValidatorFee,
        );
        Ok(IssuanceReceipt {
            subject: message.subject,
            attribute_type: message.attribute_type_id,
            value: message.value,
            issuing_validator: check.validator,
            staked: split.stake,
            transfers,
        })
    }

    /// Everything except the funds check, shared with the `can_*` dry
    /// runs.
    fn check_signed_issuance(
        &self,
        caller: Address,
        approval: &SignedApproval,
        path: SignedPath,
    ) -> Result<ApprovalCheck, RegistryError> {
        let message = &approval.message;
        let def = self.require_type(message.attribute_type_id)?;
        match path {
            SignedPath::Subject => {
                if def.restricted {
                    return Err(RegistryError::Authorization(format!(
                        "type {} is restricted; only a validator may issue it",
                        message.attribute_type_id
                    )));
                }
                if !message.operator.is_zero() {
                    return Err(RegistryError::Authorization(
                        "approval names an operator; use the operator path".into(),
                    ));
                }
                if message.subject != caller {
                    return Err(RegistryError::Authorization(format!(
                        "caller {caller} is not the approval's subject {}",
                        message.subject
                    )));
                }
            }
            SignedPath::Operator => {
                if def.only_personal {
                    return Err(RegistryError::Authorization(format!(
                        "type {} is personal; operator issuance is forbidden",
                        message.attribute_type_id
                    )));
                }
                if message.operator.is_zero() {
                    return Err(RegistryError::Authorization(
                        "approval names no operator".into(),
                    ));
                }
                if message.operator != caller {
                    return Err(RegistryError::Authorization(format!(
                        "caller {caller} is not the approval's operator {}",
                        message.operator
                    )));
                }
            }
        }
        self.authorization
            .validate_consumption(&self.directory, &self.ledger, self.address, approval)
    }

    // ── Revocation ───────────────────────────────────────────────────

    /// Revocation by the issuing validator or the owner. Works on
    /// invisible records too, so escrowed stake stays recoverable after
    /// approvals or types are withdrawn.
    pub fn revoke_attribute(
        &mut self,
        ctx: &CallContext,
        subject: Address,
        attribute_type: AttributeTypeId,
    ) -> Result<RevocationReceipt, RegistryError> {
        // validate
        Self::require_no_funds(ctx)?;
        let record = self.require_record(subject, attribute_type)?;
        if ctx.caller != record.issuing_validator && ctx.caller != self.owner {
            return Err(RegistryError::Authorization(format!(
                "caller {} is neither the issuing validator nor the owner",
                ctx.caller
            )));
        }
        let (stake, funded_by) = (record.stake, record.funded_by);
        let settlement = settle_revocation(stake, ctx.fee_rate, ctx.caller, funded_by);

        // commit
        self.release_record(subject, attribute_type, stake)?;
        Ok(Self::revocation_receipt(
            subject,
            attribute_type,
            stake,
            funded_by,
            ctx.caller,
            settlement,
        ))
    }

    /// Self-removal by the subject. Needs the live type definition (for
    /// the `restricted` flag) and fails on restricted types.
    pub fn remove_attribute(
        &mut self,
        ctx: &CallContext,
        attribute_type: AttributeTypeId,
    ) -> Result<RevocationReceipt, RegistryError> {
        // validate
        Self::require_no_funds(ctx)?;
        let subject = ctx.caller;
        let record = self.require_record(subject, attribute_type)?;
        let (stake, funded_by) = (record.stake, record.funded_by);
        let def = self.require_type(attribute_type)?;
        if def.restricted {
            return Err(RegistryError::Authorization(format!(
                "type {attribute_type} is restricted; the subject may not remove it"
            )));
        }
        let settlement = settle_revocation(stake, ctx.fee_rate, subject, funded_by);

        // commit
        self.release_record(subject, attribute_type, stake)?;
        Ok(Self::revocation_receipt(
            subject,
            attribute_type,
            stake,
            funded_by,
            subject,
            settlement,
        ))
    }

    /// Removal by the operator recorded at issuance.
    pub fn remove_attribute_for(
        &mut self,
        ctx: &CallContext,
        subject: Address,
        attribute_type: AttributeTypeId,
    ) -> Result<RevocationReceipt, RegistryError> {
        // validate
        Self::require_no_funds(ctx)?;
        let record = self.require_record(subject, attribute_type)?;
        if record.operator != Some(ctx.caller) {
            return Err(RegistryError::Authorization(format!(
                "caller {} is not the record's operator",
                ctx.caller
            )));
        }
        let (stake, funded_by) = (record.stake, record.funded_by);
        let settlement = settle_revocation(stake, ctx.fee_rate, ctx.caller, funded_by);

        // commit
        self.release_record(subject, attribute_type, stake)?;
        Ok(Self::revocation_receipt(
            subject,
            attribute_type,
            stake,
            funded_by,
            ctx.caller,
            settlement,
        ))
    }

    /// Burn an unconsumed approval. Only the validator whose current
    /// signing key produced the signature may do this.
    pub fn invalidate_approval(
        &mut self,
        ctx: &CallContext,
        approval: &SignedApproval,
    ) -> Result<ContentDigest, RegistryError> {
        // validate
        Self::require_no_funds(ctx)?;
        let check =
            self.authorization
                .authorize_invalidation(&self.directory, self.address, approval)?;
        if ctx.caller != check.validator {
            return Err(RegistryError::Authorization(format!(
                "caller {} did not sign this approval",
                ctx.caller
            )));
        }

        // commit
        self.authorization.consume(check.digest);
        Ok(check.digest)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Is the attribute visible for the subject, locally or through the
    /// type's secondary source?
    pub fn has_attribute(&self, subject: Address, attribute_type: AttributeTypeId) -> bool {
        if self.ledger.is_visible(&self.directory, subject, attribute_type) {
            return true;
        }
        match self
            .directory
            .attribute_type(attribute_type)
            .and_then(|def| def.secondary_source)
        {
            Some(source) => self.resolver.resolve_has(&source, subject),
            None => false,
        }
    }

    /// The visible value, locally or through the secondary source.
    pub fn attribute_value(
        &self,
        subject: Address,
        attribute_type: AttributeTypeId,
    ) -> Option<AttributeValue> {
        if let Some(record) = self.ledger.visible_record(&self.directory, subject, attribute_type)
        {
            return Some(record.value);
        }
        let source = self.directory.attribute_type(attribute_type)?.secondary_source?;
        self.resolver.resolve_value(&source, subject)
    }

    /// The raw record, visibility ignored. Inspection only.
    pub fn attribute_record(
        &self,
        subject: Address,
        attribute_type: AttributeTypeId,
    ) -> Option<&AttributeRecord> {
        self.ledger.record(subject, attribute_type)
    }

    /// Would a direct issuance by `validator` for `subject` pass its
    /// authorization and uniqueness gates?
    pub fn can_issue(
        &self,
        validator: Address,
        subject: Address,
        attribute_type: AttributeTypeId,
    ) -> bool {
        self.directory.can_validate(validator, attribute_type)
            && !self.ledger.is_recorded(subject, attribute_type)
    }

    /// Dry run of the subject self-issuance gates (funds excluded).
    pub fn can_add_attribute(&self, caller: Address, approval: &SignedApproval) -> bool {
        self.check_signed_issuance(caller, approval, SignedPath::Subject)
            .is_ok()
    }

    /// Dry run of the operator issuance gates (funds excluded).
    pub fn can_add_attribute_for(&self, caller: Address, approval: &SignedApproval) -> bool {
        self.check_signed_issuance(caller, approval, SignedPath::Operator)
            .is_ok()
    }

    pub fn validator(&self, address: Address) -> Option<&Validator> {
        self.directory.validator(address)
    }

    pub fn attribute_type(&self, id: AttributeTypeId) -> Option<&AttributeTypeDef> {
        self.directory.attribute_type(id)
    }

    pub fn is_approved(&self, validator: Address, attribute_type: AttributeTypeId) -> bool {
        self.directory.is_approved(validator, attribute_type)
    }

    // ── Secondary-source wiring (runtime, not registry state) ────────

    /// Attach a live handle for delegated lookups. Local wiring, not a
    /// registry mutation: not owner-gated, not serialized, no effect on
    /// the state digest.
    pub fn attach_source(
        &mut self,
        registry: Address,
        source: Arc<dyn AttributeSource + Send + Sync>,
    ) {
        self.resolver.attach(registry, source);
    }

    pub fn detach_source(&mut self, registry: Address) -> bool {
        self.resolver.detach(registry)
    }

    pub fn set_source_budget(&mut self, budget: Duration) {
        self.resolver.set_budget(budget);
    }

    // ── Internals ────────────────────────────────────────────────────

    fn require_owner(&self, caller: Address) -> Result<(), RegistryError> {
        if caller != self.owner {
            return Err(RegistryError::Authorization(format!(
                "caller {caller} is not the registry owner"
            )));
        }
        Ok(())
    }

    fn require_no_funds(ctx: &CallContext) -> Result<(), RegistryError> {
        if !ctx.value.is_zero() {
            return Err(RegistryError::FundsMismatch(format!(
                "operation does not accept funds, got {}",
                ctx.value
            )));
        }
        Ok(())
    }

    fn require_type(&self, id: AttributeTypeId) -> Result<&AttributeTypeDef, RegistryError> {
        self.directory
            .attribute_type(id)
            .ok_or_else(|| RegistryError::NotFound(format!("attribute type {id} does not exist")))
    }

    fn require_record(
        &self,
        subject: Address,
        attribute_type: AttributeTypeId,
    ) -> Result<&AttributeRecord, RegistryError> {
        self.ledger.record(subject, attribute_type).ok_or_else(|| {
            RegistryError::NotFound(format!(
                "subject {subject} holds no record of type {attribute_type}"
            ))
        })
    }

    /// Shared commit tail for every revocation path: release the stake,
    /// then drop the record.
    fn release_record(
        &mut self,
        subject: Address,
        attribute_type: AttributeTypeId,
        stake: Amount,
    ) -> Result<(), RegistryError> {
        self.escrow.release(stake)?;
        self.ledger.remove(subject, attribute_type);
        Ok(())
    }

    fn revocation_receipt(
        subject: Address,
        attribute_type: AttributeTypeId,
        released: Amount,
        funded_by: Address,
        revoker: Address,
        settlement: Settlement,
    ) -> RevocationReceipt {
        let mut transfers = Vec::new();
        push_transfer(
            &mut transfers,
            revoker,
            settlement.rebate,
            TransferReason::RevocationRebate,
        );
        push_transfer(
            &mut transfers,
            funded_by,
            settlement.refund,
            TransferReason::StakeRefund,
        );
        RevocationReceipt {
            subject,
            attribute_type,
            released,
            transfers,
        }
    }
}

impl AttributeSource for Jurisdiction {
    fn has_attribute(
        &self,
        subject: Address,
        attribute_type: AttributeTypeId,
    ) -> Result<bool, SourceFault> {
        Ok(Jurisdiction::has_attribute(self, subject, attribute_type))
    }

    fn attribute_value(
        &self,
        subject: Address,
        attribute_type: AttributeTypeId,
    ) -> Result<Option<AttributeValue>, SourceFault> {
        Ok(Jurisdiction::attribute_value(self, subject, attribute_type))
    }
}
