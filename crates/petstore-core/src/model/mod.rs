pub mod address;
pub mod animal;
pub mod category;
pub mod keys;
pub mod pet_store;
pub mod product;

pub use address::Address;
pub use animal::{Animal, AnimalVariant, VariantKind};
pub use category::{LivingEnv, ProductType};
pub use keys::{AddressKey, AnimalKey, EntityId, EntityKind, EntityRef, ProductKey, StoreKey};
pub use pet_store::PetStore;
pub use product::Product;
