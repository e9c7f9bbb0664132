//! Existence index
//!
//! Snapshot of the internal identities already stored for one entity type,
//! taken once before that type's records are processed and extended as
//! inserts succeed. Owned by a single upload task, so no locking.

use std::collections::HashSet;
use tracing::debug;

use crate::store::{ElementKind, GraphStore, StoreError};

#[derive(Debug, Default, Clone)]
pub struct ExistenceIndex {
    identities: HashSet<String>,
}

impl ExistenceIndex {
    /// Fetch the stored identities for elements carrying `label`
    pub async fn build<S>(store: &S, kind: ElementKind, label: &str) -> Result<Self, StoreError>
    where
        S: GraphStore + ?Sized,
    {
        let identities: HashSet<String> = store
            .existing_identities(kind, label)
            .await?
            .into_iter()
            .collect();

        debug!(
            label = %label,
            kind = kind.noun(),
            existing = identities.len(),
            "Built existence index"
        );

        Ok(Self { identities })
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.identities.contains(identity)
    }

    /// Record a newly inserted identity; returns false if it was already present
    pub fn insert(&mut self, identity: impl Into<String>) -> bool {
        self.identities.insert(identity.into())
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
