use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::errors::{PetStoreError, Result};
use crate::model::{
    Address, AddressKey, Animal, AnimalKey, EntityId, EntityKind, EntityRef, PetStore, Product,
    ProductKey, StoreKey,
};

static NEXT_GRAPH: AtomicU32 = AtomicU32::new(1);

/// Arena owning every entity of one object graph
///
/// Entities are addressed by typed keys issued here; relationships are key
/// sets kept consistent by [`crate::ops::association`]. Every key carries
/// the stamp of its graph, so a key from another graph is never found here
/// even when its slot is. Maps are ordered by key, and keys are issued
/// monotonically, so iteration follows insertion order. Not thread-safe;
/// callers serialize access.
#[derive(Debug, Clone)]
pub struct Graph {
    stamp: u32,
    next_slot: u64,
    pub(crate) addresses: BTreeMap<AddressKey, Address>,
    pub(crate) stores: BTreeMap<StoreKey, PetStore>,
    pub(crate) animals: BTreeMap<AnimalKey, Animal>,
    pub(crate) products: BTreeMap<ProductKey, Product>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            stamp: NEXT_GRAPH.fetch_add(1, Ordering::Relaxed),
            next_slot: 0,
            addresses: BTreeMap::new(),
            stores: BTreeMap::new(),
            animals: BTreeMap::new(),
            products: BTreeMap::new(),
        }
    }

    /// Stamp carried by every key this graph issues
    pub fn stamp(&self) -> u32 {
        self.stamp
    }

    fn issue_slot(&mut self) -> (u32, u64) {
        let slot = self.next_slot;
        self.next_slot += 1;
        (self.stamp, slot)
    }

    fn owns(&self, entity: EntityRef) -> bool {
        entity.graph() == self.stamp
    }

    /// Add an address to the graph
    ///
    /// Identity and relationship fields of the value are reset: identity is
    /// only ever bound by a persistence call, links only by association ops.
    pub fn add_address(&mut self, mut address: Address) -> AddressKey {
        address.id = None;
        address.store = None;
        let (graph, slot) = self.issue_slot();
        let key = AddressKey::new(graph, slot);
        self.addresses.insert(key, address);
        key
    }

    /// Add a store to the graph, detached from everything
    pub fn add_store(&mut self, mut store: PetStore) -> StoreKey {
        store.id = None;
        store.address = None;
        store.animals.clear();
        store.products.clear();
        store.persisted_address = None;
        store.persisted_products.clear();
        let (graph, slot) = self.issue_slot();
        let key = StoreKey::new(graph, slot);
        self.stores.insert(key, store);
        key
    }

    /// Add an animal to the graph, not kept by any store
    pub fn add_animal(&mut self, mut animal: Animal) -> AnimalKey {
        animal.id = None;
        animal.store = None;
        animal.persisted_store = None;
        let (graph, slot) = self.issue_slot();
        let key = AnimalKey::new(graph, slot);
        self.animals.insert(key, animal);
        key
    }

    /// Add a product to the graph, sold nowhere
    pub fn add_product(&mut self, mut product: Product) -> ProductKey {
        product.id = None;
        product.stores.clear();
        let (graph, slot) = self.issue_slot();
        let key = ProductKey::new(graph, slot);
        self.products.insert(key, product);
        key
    }

    /// Get an address by key
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the key was not issued by this graph.
    pub fn address(&self, key: AddressKey) -> Result<&Address> {
        self.check_owned(key.into())?;
        self.addresses
            .get(&key)
            .ok_or_else(|| self.not_found(key.into()))
    }

    /// Mutable access to an address's declared fields
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the key was not issued by this graph.
    pub fn address_mut(&mut self, key: AddressKey) -> Result<&mut Address> {
        self.check_owned(key.into())?;
        let missing = self.not_found(key.into());
        self.addresses.get_mut(&key).ok_or(missing)
    }

    /// # Errors
    ///
    /// Returns `EntityNotFound` if the key was not issued by this graph.
    pub fn store(&self, key: StoreKey) -> Result<&PetStore> {
        self.check_owned(key.into())?;
        self.stores
            .get(&key)
            .ok_or_else(|| self.not_found(key.into()))
    }

    /// # Errors
    ///
    /// Returns `EntityNotFound` if the key was not issued by this graph.
    pub fn store_mut(&mut self, key: StoreKey) -> Result<&mut PetStore> {
        self.check_owned(key.into())?;
        let missing = self.not_found(key.into());
        self.stores.get_mut(&key).ok_or(missing)
    }

    /// # Errors
    ///
    /// Returns `EntityNotFound` if the key was not issued by this graph.
    pub fn animal(&self, key: AnimalKey) -> Result<&Animal> {
        self.check_owned(key.into())?;
        self.animals
            .get(&key)
            .ok_or_else(|| self.not_found(key.into()))
    }

    /// # Errors
    ///
    /// Returns `EntityNotFound` if the key was not issued by this graph.
    pub fn animal_mut(&mut self, key: AnimalKey) -> Result<&mut Animal> {
        self.check_owned(key.into())?;
        let missing = self.not_found(key.into());
        self.animals.get_mut(&key).ok_or(missing)
    }

    /// # Errors
    ///
    /// Returns `EntityNotFound` if the key was not issued by this graph.
    pub fn product(&self, key: ProductKey) -> Result<&Product> {
        self.check_owned(key.into())?;
        self.products
            .get(&key)
            .ok_or_else(|| self.not_found(key.into()))
    }

    /// # Errors
    ///
    /// Returns `EntityNotFound` if the key was not issued by this graph.
    pub fn product_mut(&mut self, key: ProductKey) -> Result<&mut Product> {
        self.check_owned(key.into())?;
        let missing = self.not_found(key.into());
        self.products.get_mut(&key).ok_or(missing)
    }

    pub fn addresses(&self) -> impl Iterator<Item = (AddressKey, &Address)> {
        self.addresses.iter().map(|(k, v)| (*k, v))
    }

    pub fn stores(&self) -> impl Iterator<Item = (StoreKey, &PetStore)> {
        self.stores.iter().map(|(k, v)| (*k, v))
    }

    pub fn animals(&self) -> impl Iterator<Item = (AnimalKey, &Animal)> {
        self.animals.iter().map(|(k, v)| (*k, v))
    }

    pub fn products(&self) -> impl Iterator<Item = (ProductKey, &Product)> {
        self.products.iter().map(|(k, v)| (*k, v))
    }

    /// Check whether the key was issued by this graph
    pub fn contains(&self, entity: EntityRef) -> bool {
        if !self.owns(entity) {
            return false;
        }
        match entity {
            EntityRef::Address(k) => self.addresses.contains_key(&k),
            EntityRef::Store(k) => self.stores.contains_key(&k),
            EntityRef::Animal(k) => self.animals.contains_key(&k),
            EntityRef::Product(k) => self.products.contains_key(&k),
        }
    }

    /// Identity of an entity, `None` while unsaved
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the key was not issued by this graph.
    pub fn identity_of(&self, entity: EntityRef) -> Result<Option<EntityId>> {
        match entity {
            EntityRef::Address(k) => self.address(k).map(|e| e.id),
            EntityRef::Store(k) => self.store(k).map(|e| e.id),
            EntityRef::Animal(k) => self.animal(k).map(|e| e.id),
            EntityRef::Product(k) => self.product(k).map(|e| e.id),
        }
    }

    /// Entity of the given kind holding `id`
    pub fn find_by_id(&self, kind: EntityKind, id: EntityId) -> Option<EntityRef> {
        let wanted = Some(id);
        match kind {
            EntityKind::Address => self
                .addresses
                .iter()
                .find(|(_, e)| e.id == wanted)
                .map(|(k, _)| EntityRef::Address(*k)),
            EntityKind::Store => self
                .stores
                .iter()
                .find(|(_, e)| e.id == wanted)
                .map(|(k, _)| EntityRef::Store(*k)),
            EntityKind::Animal => self
                .animals
                .iter()
                .find(|(_, e)| e.id == wanted)
                .map(|(k, _)| EntityRef::Animal(*k)),
            EntityKind::Product => self
                .products
                .iter()
                .find(|(_, e)| e.id == wanted)
                .map(|(k, _)| EntityRef::Product(*k)),
        }
    }

    pub fn find_store_by_id(&self, id: EntityId) -> Option<StoreKey> {
        match self.find_by_id(EntityKind::Store, id) {
            Some(EntityRef::Store(k)) => Some(k),
            _ => None,
        }
    }

    pub fn find_animal_by_id(&self, id: EntityId) -> Option<AnimalKey> {
        match self.find_by_id(EntityKind::Animal, id) {
            Some(EntityRef::Animal(k)) => Some(k),
            _ => None,
        }
    }

    pub fn find_product_by_id(&self, id: EntityId) -> Option<ProductKey> {
        match self.find_by_id(EntityKind::Product, id) {
            Some(EntityRef::Product(k)) => Some(k),
            _ => None,
        }
    }

    pub fn find_address_by_id(&self, id: EntityId) -> Option<AddressKey> {
        match self.find_by_id(EntityKind::Address, id) {
            Some(EntityRef::Address(k)) => Some(k),
            _ => None,
        }
    }

    /// Human-readable label used in logs and error reports
    pub fn describe(&self, entity: EntityRef) -> String {
        if !self.owns(entity) {
            return format!(
                "{} slot {} of graph {}",
                entity.kind(),
                entity.slot(),
                entity.graph()
            );
        }
        let (label, id) = match entity {
            EntityRef::Address(k) => match self.addresses.get(&k) {
                Some(a) => (format!("address '{} {}'", a.number, a.street), a.id),
                None => return format!("address slot {}", k.slot()),
            },
            EntityRef::Store(k) => match self.stores.get(&k) {
                Some(s) => (format!("store '{}'", s.name), s.id),
                None => return format!("store slot {}", k.slot()),
            },
            EntityRef::Animal(k) => match self.animals.get(&k) {
                Some(a) => (format!("{} '{}'", a.kind().as_str(), a.color), a.id),
                None => return format!("animal slot {}", k.slot()),
            },
            EntityRef::Product(k) => match self.products.get(&k) {
                Some(p) => (format!("product '{}'", p.code), p.id),
                None => return format!("product slot {}", k.slot()),
            },
        };
        match id {
            Some(id) => format!("{} (#{})", label, id),
            None => format!("{} (unsaved)", label),
        }
    }

    fn check_owned(&self, entity: EntityRef) -> Result<()> {
        if self.owns(entity) {
            Ok(())
        } else {
            Err(self.not_found(entity))
        }
    }

    fn not_found(&self, entity: EntityRef) -> PetStoreError {
        PetStoreError::EntityNotFound {
            entity: self.describe(entity),
        }
    }

    /// Bind an identity; only the identity registry calls this
    pub(crate) fn set_identity(&mut self, entity: EntityRef, id: Option<EntityId>) -> Result<()> {
        match entity {
            EntityRef::Address(k) => self.address_mut(k)?.id = id,
            EntityRef::Store(k) => self.store_mut(k)?.id = id,
            EntityRef::Animal(k) => self.animal_mut(k)?.id = id,
            EntityRef::Product(k) => self.product_mut(k)?.id = id,
        }
        Ok(())
    }

    /// Record the entity's current links as the committed ones
    ///
    /// Called once its rows match the graph: after a commit, or on load.
    pub(crate) fn mark_persisted(&mut self, entity: EntityRef) -> Result<()> {
        match entity {
            EntityRef::Store(k) => {
                let store = self.store_mut(k)?;
                store.persisted_address = store.address;
                store.persisted_products = store.products.clone();
            }
            EntityRef::Animal(k) => {
                let animal = self.animal_mut(k)?;
                animal.persisted_store = animal.store;
            }
            EntityRef::Address(_) | EntityRef::Product(_) => {}
        }
        Ok(())
    }

    /// Entities whose committed rows still link to `entity` but whose
    /// current links no longer do
    pub(crate) fn departed(&self, entity: EntityRef) -> Vec<EntityRef> {
        match entity {
            EntityRef::Address(k) => self
                .stores
                .iter()
                .filter(|(_, s)| s.persisted_address == Some(k) && s.address != Some(k))
                .map(|(key, _)| EntityRef::Store(*key))
                .collect(),
            EntityRef::Store(k) => {
                let mut out: Vec<EntityRef> = self
                    .animals
                    .iter()
                    .filter(|(_, a)| a.persisted_store == Some(k) && a.store != Some(k))
                    .map(|(key, _)| EntityRef::Animal(*key))
                    .collect();
                if let Some(store) = self.stores.get(&k) {
                    out.extend(
                        store
                            .persisted_products
                            .iter()
                            .filter(|p| !store.products.contains(p))
                            .map(|p| EntityRef::Product(*p)),
                    );
                }
                out
            }
            EntityRef::Animal(_) => Vec::new(),
            EntityRef::Product(k) => self
                .stores
                .iter()
                .filter(|(_, s)| s.persisted_products.contains(&k) && !s.products.contains(&k))
                .map(|(key, _)| EntityRef::Store(*key))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
            && self.stores.is_empty()
            && self.animals.is_empty()
            && self.products.is_empty()
    }
}
