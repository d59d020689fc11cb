//! Append-only map of deployed step outputs.

use alloy_core::primitives::Address;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{RegistryError, StepName};

/// Addresses produced by the steps of one plan run, in deployment order.
///
/// Entries are only ever appended; a key that is set is never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressRegistry {
    entries: IndexMap<StepName, Address>,
}

impl AddressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the address deployed by `step`.
    pub fn insert(&mut self, step: StepName, address: Address) -> Result<(), RegistryError> {
        if self.entries.contains_key(&step) {
            return Err(RegistryError(step));
        }
        self.entries.insert(step, address);
        Ok(())
    }

    pub fn get(&self, step: &StepName) -> Option<Address> {
        self.entries.get(step).copied()
    }

    pub fn contains(&self, step: &StepName) -> bool {
        self.entries.contains_key(step)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Step names in the order they were deployed.
    pub fn steps(&self) -> impl Iterator<Item = &StepName> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StepName, &Address)> {
        self.entries.iter()
    }
}
