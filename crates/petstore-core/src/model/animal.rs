use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::Serialize;

use super::category::LivingEnv;
use super::keys::{EntityId, StoreKey};

/// Concrete animal kind, the discriminator of the joined-table hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Cat,
    Fish,
}

impl VariantKind {
    pub const ALL: [VariantKind; 2] = [VariantKind::Cat, VariantKind::Fish];

    pub fn as_str(self) -> &'static str {
        match self {
            VariantKind::Cat => "cat",
            VariantKind::Fish => "fish",
        }
    }
}

/// Variant-specific payload of an [`Animal`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnimalVariant {
    Cat { chip_id: String },
    Fish { living_env: LivingEnv },
}

impl AnimalVariant {
    pub fn kind(&self) -> VariantKind {
        match self {
            AnimalVariant::Cat { .. } => VariantKind::Cat,
            AnimalVariant::Fish { .. } => VariantKind::Fish,
        }
    }
}

/// An animal kept by a store
///
/// Base fields are shared by every variant; the variant payload is additive.
#[derive(Debug, Clone, Serialize)]
pub struct Animal {
    pub(crate) id: Option<EntityId>,
    pub birth_date: NaiveDate,
    pub color: String,
    pub variant: AnimalVariant,
    #[serde(skip)]
    pub(crate) store: Option<StoreKey>,
    /// `store_id` as last committed
    #[serde(skip)]
    pub(crate) persisted_store: Option<StoreKey>,
}

impl Animal {
    pub fn new(birth_date: NaiveDate, color: impl Into<String>, variant: AnimalVariant) -> Self {
        Self {
            id: None,
            birth_date,
            color: color.into(),
            variant,
            store: None,
            persisted_store: None,
        }
    }

    pub fn cat(birth_date: NaiveDate, color: impl Into<String>, chip_id: impl Into<String>) -> Self {
        Self::new(
            birth_date,
            color,
            AnimalVariant::Cat {
                chip_id: chip_id.into(),
            },
        )
    }

    pub fn fish(birth_date: NaiveDate, color: impl Into<String>, living_env: LivingEnv) -> Self {
        Self::new(birth_date, color, AnimalVariant::Fish { living_env })
    }

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Store currently keeping this animal
    pub fn store(&self) -> Option<StoreKey> {
        self.store
    }

    pub fn kind(&self) -> VariantKind {
        self.variant.kind()
    }

    /// Compare declared fields, ignoring identity and relationships
    pub fn same_fields(&self, other: &Self) -> bool {
        self.birth_date == other.birth_date
            && self.color == other.color
            && self.variant == other.variant
    }
}

impl PartialEq for Animal {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.same_fields(other),
            _ => false,
        }
    }
}

impl Eq for Animal {}

impl Hash for Animal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.id {
            Some(id) => id.hash(state),
            None => {
                self.birth_date.hash(state);
                self.color.hash(state);
                self.variant.hash(state);
            }
        }
    }
}
