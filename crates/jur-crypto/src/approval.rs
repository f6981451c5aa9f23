//! # Signed Issuance Approvals
//!
//! The portable authorization a validator hands to a subject after off-chain
//! verification succeeds. The subject later presents the envelope to the
//! registry, which verifies the signature, recovers the signing validator's
//! address, and records the attribute without the validator being online.
//!
//! ## Replay Protection
//!
//! An approval authorizes exactly one issuance. The registry remembers the
//! digest of every consumed approval and refuses a second presentation.
//! Because the message names the target registry, the subject, and the full
//! funding terms, the same envelope cannot be replayed against another
//! registry, another subject, or with cheaper funding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use jur_core::{
    sha256_digest, Address, Amount, AttributeTypeId, AttributeValue, CanonicalBytes,
    CanonicalizationError, ContentDigest,
};

use crate::keys::{verify, KeyError, SignatureBytes, SigningKeyPair, SigningPublicKey};

/// Error verifying a signed approval.
#[derive(Error, Debug)]
pub enum ApprovalError {
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
    #[error("approval signature invalid: {0}")]
    Signature(#[from] KeyError),
}

/// The statement a validator signs: one attribute issuance, fully priced.
///
/// Every field participates in the digest, so none can be renegotiated
/// after signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalMessage {
    /// The registry this approval is addressed to.
    pub registry: Address,
    /// The subject the attribute will be recorded for.
    pub subject: Address,
    /// Delegated operator for the record; the zero address means none.
    pub operator: Address,
    /// Total funds the subject must attach when presenting the approval.
    pub funds_required: Amount,
    /// The slice of `funds_required` owed to the signing validator.
    pub validator_fee: Amount,
    /// The attribute type being issued.
    pub attribute_type_id: AttributeTypeId,
    /// The value to record.
    pub value: AttributeValue,
}

impl ApprovalMessage {
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }

    /// The approval digest: the identity under which consumption is tracked.
    pub fn digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&self.canonical_bytes()?))
    }
}

/// A signed approval envelope: the message, the signer's public key, and
/// the signature over the message's canonical bytes.
///
/// The envelope is self-contained. Verification needs no key lookup; the
/// registry recovers the signer's address from the embedded key and then
/// decides whether that address is a validator it trusts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedApproval {
    pub message: ApprovalMessage,
    pub public_key: SigningPublicKey,
    pub signature: SignatureBytes,
}

/// The outcome of verifying a [`SignedApproval`]: who signed it, and the
/// digest under which it is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalOrigin {
    pub signer: Address,
    pub digest: ContentDigest,
}

impl SignedApproval {
    /// Sign a message, producing the envelope the subject will carry.
    pub fn sign(
        message: ApprovalMessage,
        keys: &SigningKeyPair,
    ) -> Result<Self, CanonicalizationError> {
        let bytes = message.canonical_bytes()?;
        let signature = keys.sign(&bytes);
        Ok(Self {
            message,
            public_key: keys.public_key(),
            signature,
        })
    }

    /// Verify the signature and recover the signer.
    ///
    /// On success the signature is known to cover exactly `self.message`
    /// under `self.public_key`, and the returned origin carries the address
    /// that key controls plus the consumption digest.
    pub fn recover(&self) -> Result<ApprovalOrigin, ApprovalError> {
        let bytes = self.message.canonical_bytes()?;
        verify(&bytes, &self.signature, &self.public_key)?;
        Ok(ApprovalOrigin {
            signer: self.public_key.derive_address(),
            digest: sha256_digest(&bytes),
        })
    }
}
