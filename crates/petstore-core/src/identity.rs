//! Identity registry
//!
//! Binds backend-issued surrogate keys to entities and keeps a journal of
//! every binding made during one call, so a failed cascade can take all of
//! them back. Entity equality itself lives on the model types.

use std::collections::BTreeMap;

use crate::errors::{PetStoreError, Result};
use crate::model::{EntityId, EntityKind, EntityRef};
use crate::ops::Graph;

/// Per-call journal of identity bindings
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    journal: Vec<EntityRef>,
    last_issued: BTreeMap<EntityKind, EntityId>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `issued` to `entity`
    ///
    /// An entity already holding `issued` is left alone and the id is
    /// returned. Nothing is journaled in that case.
    ///
    /// # Errors
    ///
    /// * `EntityNotFound` - If the key is unknown to the graph
    /// * `IdentityAlreadyAssigned` - If the entity holds a different id
    /// * `DuplicateIdentity` - If another entity of the same kind holds `issued`
    /// * `NonMonotonicIdentity` - If `issued` is lower than an id bound
    ///   earlier in this call for the same kind
    pub fn assign_identity(
        &mut self,
        graph: &mut Graph,
        entity: EntityRef,
        issued: EntityId,
    ) -> Result<EntityId> {
        match graph.identity_of(entity)? {
            Some(existing) if existing == issued => return Ok(existing),
            Some(existing) => {
                return Err(PetStoreError::IdentityAlreadyAssigned {
                    entity: graph.describe(entity),
                    existing: existing.value(),
                    attempted: issued.value(),
                })
            }
            None => {}
        }

        let kind = entity.kind();
        if let Some(holder) = graph.find_by_id(kind, issued) {
            return Err(PetStoreError::DuplicateIdentity {
                entity: graph.describe(entity),
                holder: graph.describe(holder),
                id: issued.value(),
            });
        }
        if let Some(last) = self.last_issued.get(&kind) {
            if issued < *last {
                return Err(PetStoreError::NonMonotonicIdentity {
                    entity: graph.describe(entity),
                    last: last.value(),
                    attempted: issued.value(),
                });
            }
        }

        graph.set_identity(entity, Some(issued))?;
        self.journal.push(entity);
        self.last_issued.insert(kind, issued);

        tracing::debug!(kind = %kind, slot = entity.slot(), id = issued.value(), "identity bound");
        Ok(issued)
    }

    /// Entities bound during this call, in binding order
    pub fn assigned(&self) -> &[EntityRef] {
        &self.journal
    }

    /// Take back every binding made during this call
    ///
    /// Returns how many entities lost their identity.
    pub fn discard(&mut self, graph: &mut Graph) -> usize {
        let mut cleared = 0;
        for entity in self.journal.drain(..).rev() {
            // journaled keys were checked on bind
            if graph.set_identity(entity, None).is_ok() {
                cleared += 1;
            }
        }
        self.last_issued.clear();
        if cleared > 0 {
            tracing::debug!(cleared, "identity bindings discarded");
        }
        cleared
    }

    /// Keep every binding and forget the journal
    pub fn commit(&mut self) -> Vec<EntityRef> {
        self.last_issued.clear();
        std::mem::take(&mut self.journal)
    }
}
