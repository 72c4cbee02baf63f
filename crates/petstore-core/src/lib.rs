//! Pet store core: entity graph, association rules and persistence mapping
//!
//! - Arena-backed entity graph with typed keys (`Graph`)
//! - Association operations keeping both sides of every link in step
//! - Identity registry binding backend-issued keys
//! - Joined-table mapping of the animal hierarchy
//! - Cascading, ordered, all-or-nothing save behind a `UnitOfWork` seam
//!
//! ```
//! use chrono::NaiveDate;
//! use petstore_core::model::{Animal, LivingEnv, PetStore};
//! use petstore_core::ops::{set_animal_store, Graph};
//! use petstore_core::persist::{load_graph, persist, MemoryDatabase};
//!
//! let mut graph = Graph::new();
//! let store = graph.add_store(PetStore::new("Baba", "Dialo"));
//! let fish = graph.add_animal(Animal::fish(
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     "bleu",
//!     LivingEnv::FreshWater,
//! ));
//! set_animal_store(&mut graph, fish, Some(store)).unwrap();
//!
//! let mut db = MemoryDatabase::new();
//! let report = persist(&mut graph, &mut db, &[store.into()]).unwrap();
//! assert_eq!(report.rows_in("fish"), 1);
//!
//! let reloaded = load_graph(&db).unwrap();
//! assert_eq!(reloaded.stores().count(), 1);
//! ```

pub use petstore_core_types as core_types;

pub mod errors;
pub mod identity;
pub mod logging_facility;
pub mod mapping;
pub mod model;
pub mod ops;
pub mod persist;
pub mod rules;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, PetStoreError, Result};
pub use identity::IdentityRegistry;
pub use model::{
    Address, AddressKey, Animal, AnimalKey, AnimalVariant, EntityId, EntityKind, EntityRef,
    LivingEnv, PetStore, Product, ProductKey, ProductType, StoreKey, VariantKind,
};
pub use ops::Graph;
pub use persist::{load_graph, persist, CascadeReport, MemoryDatabase, RowSource, UnitOfWork};
