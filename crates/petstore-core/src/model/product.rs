use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::category::ProductType;
use super::keys::{EntityId, StoreKey};

/// A product sold by one or more stores
///
/// Holds the inverse side of the store/product association.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub(crate) id: Option<EntityId>,
    pub code: String,
    pub label: String,
    pub product_type: ProductType,
    pub price: f64,
    #[serde(skip)]
    pub(crate) stores: Vec<StoreKey>,
}

impl Product {
    pub fn new(
        code: impl Into<String>,
        label: impl Into<String>,
        product_type: ProductType,
        price: f64,
    ) -> Self {
        Self {
            id: None,
            code: code.into(),
            label: label.into(),
            product_type,
            price,
            stores: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Stores selling this product, in link order
    pub fn stores(&self) -> &[StoreKey] {
        &self.stores
    }

    /// Compare declared fields, ignoring identity and relationships
    ///
    /// Prices compare bit for bit so the relation stays reflexive.
    pub fn same_fields(&self, other: &Self) -> bool {
        self.code == other.code
            && self.label == other.label
            && self.product_type == other.product_type
            && self.price.to_bits() == other.price.to_bits()
    }
}

impl PartialEq for Product {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.same_fields(other),
            _ => false,
        }
    }
}

impl Eq for Product {}

impl Hash for Product {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.id {
            Some(id) => id.hash(state),
            None => {
                self.code.hash(state);
                self.label.hash(state);
                self.product_type.hash(state);
                self.price.to_bits().hash(state);
            }
        }
    }
}
