//! Two-phase move of one binding to another address.

use crate::binding::{BindingRef, BindingStore, VariableMove};
use dsgen_common::CellAddress;

/// Pending-move state. At most one relocation is armed at a time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Relocation {
    #[default]
    Idle,
    Armed(BindingRef),
}

/// What [`Relocation::commit`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelocationOutcome {
    /// Nothing was armed.
    NotArmed,
    /// Target equals the source; treated as cancel.
    Unchanged,
    Moved { from: CellAddress, to: CellAddress },
    /// VARIABLE target already mapped for the key; the source mapping was dropped.
    Merged { from: CellAddress, to: CellAddress },
    /// The armed binding disappeared before commit.
    Stale,
}

impl Relocation {
    pub fn is_armed(&self) -> bool {
        matches!(self, Relocation::Armed(_))
    }

    pub fn armed(&self) -> Option<&BindingRef> {
        match self {
            Relocation::Armed(binding) => Some(binding),
            Relocation::Idle => None,
        }
    }

    /// Arm `binding` if it exists in `store`, replacing any earlier arm.
    ///
    /// Returns `false` and leaves the state unchanged when it does not exist.
    pub fn arm(&mut self, store: &BindingStore, binding: BindingRef) -> bool {
        if !store.contains(&binding) {
            return false;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(source = %binding.address(), "relocation armed");
        *self = Relocation::Armed(binding);
        true
    }

    pub fn cancel(&mut self) {
        *self = Relocation::Idle;
    }

    /// Apply the armed move against `target`. Always returns to `Idle`.
    pub fn commit(&mut self, store: &mut BindingStore, target: CellAddress) -> RelocationOutcome {
        let Relocation::Armed(binding) = std::mem::take(self) else {
            return RelocationOutcome::NotArmed;
        };
        let from = binding.address().clone();
        if from == target {
            return RelocationOutcome::Unchanged;
        }
        let outcome = match &binding {
            BindingRef::Global(_) => {
                if store.relocate_global(&from, target.clone()) {
                    RelocationOutcome::Moved { from, to: target }
                } else {
                    RelocationOutcome::Stale
                }
            }
            BindingRef::Variable { key, .. } => {
                match store.relocate_variable(key, &from, target.clone()) {
                    VariableMove::Moved => RelocationOutcome::Moved { from, to: target },
                    VariableMove::Merged => RelocationOutcome::Merged { from, to: target },
                    VariableMove::Missing => RelocationOutcome::Stale,
                }
            }
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(?outcome, "relocation committed");
        outcome
    }
}
