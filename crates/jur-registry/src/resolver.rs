//! # Secondary-Source Resolution
//!
//! When a lookup misses locally and the attribute type names a secondary
//! source, the query falls through to that external registry. External
//! registries are untrusted collaborators: any fault they raise, any
//! missing handle, and any budget overrun degrades to "attribute absent"
//! instead of failing the caller.
//!
//! ## Fault Containment
//!
//! [`SourceFault`] stops here. It is logged at `warn` and converted to
//! absence; no registry query ever surfaces it. Local visible records
//! always win, so a hostile or broken secondary source can suppress only
//! answers it would itself have provided.
//!
//! The handle table is runtime wiring, not registry state: handles are
//! never serialized, and a freshly loaded registry answers "absent" for
//! delegated lookups until its embedder re-attaches sources.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jur_core::{Address, AttributeTypeId, AttributeValue, SourceFault};

use crate::directory::SecondarySource;

/// The capability an external registry must expose to serve as a
/// secondary source. Both calls are read-only.
pub trait AttributeSource {
    fn has_attribute(
        &self,
        subject: Address,
        attribute_type: AttributeTypeId,
    ) -> Result<bool, SourceFault>;

    /// `Ok(None)` means cleanly absent; `Err` means the source faulted.
    fn attribute_value(
        &self,
        subject: Address,
        attribute_type: AttributeTypeId,
    ) -> Result<Option<AttributeValue>, SourceFault>;
}

/// Default wall-clock budget for one delegated call.
pub const DEFAULT_SOURCE_BUDGET: Duration = Duration::from_millis(50);

type SourceHandle = Arc<dyn AttributeSource + Send + Sync>;

/// Handle table plus query budget for delegated lookups.
#[derive(Clone)]
pub struct SecondarySourceResolver {
    handles: BTreeMap<Address, SourceHandle>,
    budget: Duration,
}

impl Default for SecondarySourceResolver {
    fn default() -> Self {
        Self {
            handles: BTreeMap::new(),
            budget: DEFAULT_SOURCE_BUDGET,
        }
    }
}

impl std::fmt::Debug for SecondarySourceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondarySourceResolver")
            .field("attached", &self.handles.keys().collect::<Vec<_>>())
            .field("budget", &self.budget)
            .finish()
    }
}

impl SecondarySourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a live handle for the registry at `address`. Replaces any
    /// previous handle for the same address.
    pub fn attach(&mut self, address: Address, source: SourceHandle) {
        self.handles.insert(address, source);
    }

    /// Detach the handle for `address`. Returns whether one was attached.
    pub fn detach(&mut self, address: Address) -> bool {
        self.handles.remove(&address).is_some()
    }

    pub fn is_attached(&self, address: Address) -> bool {
        self.handles.contains_key(&address)
    }

    pub fn attached(&self) -> Vec<Address> {
        self.handles.keys().copied().collect()
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn set_budget(&mut self, budget: Duration) {
        self.budget = budget;
    }

    /// Delegated `has_attribute`. Absence on any fault, missing handle,
    /// or budget overrun.
    pub fn resolve_has(&self, source: &SecondarySource, subject: Address) -> bool {
        self.guarded(source, |handle| handle.has_attribute(subject, source.remote_type_id))
            .unwrap_or(false)
    }

    /// Delegated value lookup. `None` on absence, fault, missing handle,
    /// or budget overrun.
    pub fn resolve_value(&self, source: &SecondarySource, subject: Address) -> Option<AttributeValue> {
        self.guarded(source, |handle| handle.attribute_value(subject, source.remote_type_id))
            .flatten()
    }

    /// Run one delegated call under the budget. The call itself is
    /// synchronous and runs to completion; a result that arrives after
    /// the budget is discarded as stale rather than trusted.
    fn guarded<T>(
        &self,
        source: &SecondarySource,
        call: impl FnOnce(&SourceHandle) -> Result<T, SourceFault>,
    ) -> Option<T> {
        let handle = match self.handles.get(&source.registry) {
            Some(handle) => handle,
            None => {
                tracing::warn!(
                    registry = %source.registry,
                    "no handle attached for secondary source; treating as absent"
                );
                return None;
            }
        };
        let started = Instant::now();
        let outcome = call(handle);
        let elapsed = started.elapsed();
        if elapsed > self.budget {
            tracing::warn!(
                registry = %source.registry,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.budget.as_millis() as u64,
                "secondary source exceeded its budget; treating as absent"
            );
            return None;
        }
        match outcome {
            Ok(value) => Some(value),
            Err(fault) => {
                tracing::warn!(
                    registry = %source.registry,
                    %fault,
                    "secondary source faulted; treating as absent"
                );
                None
            }
        }
    }
}
