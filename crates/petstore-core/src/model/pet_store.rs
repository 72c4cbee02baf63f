use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::keys::{AddressKey, AnimalKey, EntityId, ProductKey};

/// A pet store
///
/// Owns its address and its animals; shares products with other stores.
/// Collections start empty and are only changed through the association
/// operations in [`crate::ops::association`].
#[derive(Debug, Clone, Serialize)]
pub struct PetStore {
    pub(crate) id: Option<EntityId>,
    pub name: String,
    pub manager_name: String,
    #[serde(skip)]
    pub(crate) address: Option<AddressKey>,
    #[serde(skip)]
    pub(crate) animals: Vec<AnimalKey>,
    #[serde(skip)]
    pub(crate) products: Vec<ProductKey>,
    /// Links as last committed: `store.address_id` and the join rows
    #[serde(skip)]
    pub(crate) persisted_address: Option<AddressKey>,
    #[serde(skip)]
    pub(crate) persisted_products: Vec<ProductKey>,
}

impl PetStore {
    pub fn new(name: impl Into<String>, manager_name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            manager_name: manager_name.into(),
            address: None,
            animals: Vec::new(),
            products: Vec::new(),
            persisted_address: None,
            persisted_products: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn address(&self) -> Option<AddressKey> {
        self.address
    }

    /// Animals kept by this store, in insertion order
    pub fn animals(&self) -> &[AnimalKey] {
        &self.animals
    }

    /// Products sold by this store, in link order
    pub fn products(&self) -> &[ProductKey] {
        &self.products
    }

    /// Compare declared fields, ignoring identity and relationships
    pub fn same_fields(&self, other: &Self) -> bool {
        self.name == other.name && self.manager_name == other.manager_name
    }
}

impl PartialEq for PetStore {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.same_fields(other),
            _ => false,
        }
    }
}

impl Eq for PetStore {}

impl Hash for PetStore {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.id {
            Some(id) => id.hash(state),
            None => {
                self.name.hash(state);
                self.manager_name.hash(state);
            }
        }
    }
}
