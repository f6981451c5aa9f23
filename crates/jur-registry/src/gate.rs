//! # Transfer Gate
//!
//! The dependent-consumer pattern: an asset or service that admits an
//! action only between parties holding a required attribute. The gate
//! owns no registry state; it asks an [`AttributeSource`] at decision
//! time, so approval withdrawals and revocations take effect on the next
//! query.
//!
//! ## Security Invariant
//!
//! The gate fails closed. A source fault is indistinguishable from "does
//! not hold the attribute": `permits` only returns `true` on a positive
//! answer from the source for **both** parties.

use std::fmt;
use std::sync::Arc;

use jur_core::{Address, AttributeTypeId};

use crate::resolver::AttributeSource;

/// Gates an action on both parties holding one attribute type.
#[derive(Clone)]
pub struct TransferGate {
    source: Arc<dyn AttributeSource + Send + Sync>,
    required: AttributeTypeId,
}

impl TransferGate {
    pub fn new(source: Arc<dyn AttributeSource + Send + Sync>, required: AttributeTypeId) -> Self {
        Self { source, required }
    }

    pub fn required_attribute(&self) -> AttributeTypeId {
        self.required
    }

    /// Does `party` visibly hold the required attribute right now?
    pub fn permits_party(&self, party: Address) -> bool {
        self.source
            .has_attribute(party, self.required)
            .unwrap_or(false)
    }

    /// May value move from `from` to `to`? True only when both parties
    /// hold the required attribute.
    pub fn permits(&self, from: Address, to: Address) -> bool {
        self.permits_party(from) && self.permits_party(to)
    }
}

impl fmt::Debug for TransferGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferGate")
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::AttributeTypeDef;
    use crate::jurisdiction::{CallContext, Jurisdiction};
    use jur_core::{Amount, AttributeValue, SourceFault};
    use std::collections::BTreeSet;

    struct FixedHolders {
        holders: BTreeSet<Address>,
        faulting: bool,
    }

    impl AttributeSource for FixedHolders {
        fn has_attribute(
            &self,
            subject: Address,
            _attribute_type: AttributeTypeId,
        ) -> Result<bool, SourceFault> {
            if self.faulting {
                return Err(SourceFault::new("backend offline"));
            }
            Ok(self.holders.contains(&subject))
        }

        fn attribute_value(
            &self,
            subject: Address,
            attribute_type: AttributeTypeId,
        ) -> Result<Option<AttributeValue>, SourceFault> {
            self.has_attribute(subject, attribute_type)
                .map(|held| held.then_some(AttributeValue(1)))
        }
    }

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

    #[test]
    fn test_permits_requires_both_parties() {
        let source = Arc::new(FixedHolders {
            holders: [addr(1), addr(2)].into_iter().collect(),
            faulting: false,
        });
        let gate = TransferGate::new(source, AttributeTypeId(7));

        assert!(gate.permits(addr(1), addr(2)));
        assert!(gate.permits(addr(2), addr(1)));
        assert!(!gate.permits(addr(1), addr(3)));
        assert!(!gate.permits(addr(3), addr(2)));
        assert!(!gate.permits(addr(3), addr(4)));
    }

    #[test]
    fn test_faulting_source_forbids_everything() {
        let source = Arc::new(FixedHolders {
            holders: [addr(1), addr(2)].into_iter().collect(),
            faulting: true,
        });
        let gate = TransferGate::new(source, AttributeTypeId(7));
        assert!(!gate.permits(addr(1), addr(2)));
        assert!(!gate.permits_party(addr(1)));
    }

    #[test]
    fn test_gate_over_a_live_registry_follows_visibility() {
        let owner = CallContext::new(addr(1));
        let mut j = Jurisdiction::new(addr(0xaa), addr(1)).unwrap();
        j.add_validator(&owner, addr(2), "v").unwrap();
        j.add_attribute_type(&owner, plain_type(7)).unwrap();
        j.add_approval(&owner, addr(2), AttributeTypeId(7)).unwrap();
        let validator = CallContext::new(addr(2));
        j.issue_attribute(&validator, addr(3), AttributeTypeId(7), AttributeValue(1))
            .unwrap();
        j.issue_attribute(&validator, addr(4), AttributeTypeId(7), AttributeValue(1))
            .unwrap();

        let shared = Arc::new(j);
        let gate = TransferGate::new(shared.clone(), AttributeTypeId(7));
        assert!(gate.permits(addr(3), addr(4)));
        assert!(!gate.permits(addr(3), addr(5)));
    }
}
