//! Arena keys and surrogate identities
//!
//! Entities never point at each other directly. A relationship is stored as
//! the typed key of the other side, issued by the owning `Graph` when the
//! entity is added. A key carries the stamp of the graph that issued it, so
//! it never resolves inside another graph. The surrogate identity
//! (`EntityId`) is a separate value that only exists once the entity has
//! been written.

use serde::Serialize;

/// Surrogate primary key assigned on first successful insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl EntityId {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four entity families of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Address,
    Store,
    Animal,
    Product,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Address => "address",
            EntityKind::Store => "store",
            EntityKind::Animal => "animal",
            EntityKind::Product => "product",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! keys {
    ($($(#[$meta:meta])* $name:ident => $variant:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
            pub struct $name {
                pub(crate) graph: u32,
                pub(crate) slot: u64,
            }

            impl $name {
                pub const KIND: EntityKind = EntityKind::$variant;

                pub(crate) fn new(graph: u32, slot: u64) -> Self {
                    Self { graph, slot }
                }

                /// Raw arena slot, only meaningful within the issuing graph
                pub fn slot(self) -> u64 {
                    self.slot
                }

                /// Stamp of the graph that issued the key
                pub fn graph(self) -> u32 {
                    self.graph
                }
            }

            impl From<$name> for EntityRef {
                fn from(key: $name) -> Self {
                    EntityRef::$variant(key)
                }
            }
        )*
    };
}

keys! {
    /// Arena key of an [`Address`](super::Address)
    AddressKey => Address;
    /// Arena key of a [`PetStore`](super::PetStore)
    StoreKey => Store;
    /// Arena key of an [`Animal`](super::Animal)
    AnimalKey => Animal;
    /// Arena key of a [`Product`](super::Product)
    ProductKey => Product;
}

/// Any entity in a graph, tagged by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum EntityRef {
    Address(AddressKey),
    Store(StoreKey),
    Animal(AnimalKey),
    Product(ProductKey),
}

impl EntityRef {
    pub fn kind(self) -> EntityKind {
        match self {
            EntityRef::Address(_) => EntityKind::Address,
            EntityRef::Store(_) => EntityKind::Store,
            EntityRef::Animal(_) => EntityKind::Animal,
            EntityRef::Product(_) => EntityKind::Product,
        }
    }

    pub fn slot(self) -> u64 {
        match self {
            EntityRef::Address(k) => k.slot,
            EntityRef::Store(k) => k.slot,
            EntityRef::Animal(k) => k.slot,
            EntityRef::Product(k) => k.slot,
        }
    }

    pub fn graph(self) -> u32 {
        match self {
            EntityRef::Address(k) => k.graph,
            EntityRef::Store(k) => k.graph,
            EntityRef::Animal(k) => k.graph,
            EntityRef::Product(k) => k.graph,
        }
    }
}
