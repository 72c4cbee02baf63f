use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::keys::{EntityId, StoreKey};

/// Postal address of a store
///
/// Owned by at most one store. The back-pointer is maintained by the
/// association operations and is read-only from the outside.
#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub(crate) id: Option<EntityId>,
    pub number: String,
    pub street: String,
    pub zip_code: String,
    pub city: String,
    #[serde(skip)]
    pub(crate) store: Option<StoreKey>,
}

impl Address {
    pub fn new(
        number: impl Into<String>,
        street: impl Into<String>,
        zip_code: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            number: number.into(),
            street: street.into(),
            zip_code: zip_code.into(),
            city: city.into(),
            store: None,
        }
    }

    /// Surrogate identity, `None` until first persisted
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Store that owns this address
    pub fn store(&self) -> Option<StoreKey> {
        self.store
    }

    /// Compare declared fields, ignoring identity and relationships
    pub fn same_fields(&self, other: &Self) -> bool {
        self.number == other.number
            && self.street == other.street
            && self.zip_code == other.zip_code
            && self.city == other.city
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.same_fields(other),
            _ => false,
        }
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.id {
            Some(id) => id.hash(state),
            None => {
                self.number.hash(state);
                self.street.hash(state);
                self.zip_code.hash(state);
                self.city.hash(state);
            }
        }
    }
}
