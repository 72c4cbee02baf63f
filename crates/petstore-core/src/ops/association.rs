//! Association operations
//!
//! The only way to change a relationship field. Every operation validates
//! its keys and the current reciprocal state first, then updates both sides
//! of the link, so a rejected call leaves the graph untouched and a
//! successful one never leaves only one side reflecting the link.

use crate::errors::{PetStoreError, Result};
use crate::model::{AddressKey, AnimalKey, EntityRef, ProductKey, StoreKey};

use super::graph::Graph;

fn out_of_sync(graph: &Graph, entity: impl Into<EntityRef>, reason: String) -> PetStoreError {
    PetStoreError::InvariantViolation {
        entity: graph.describe(entity.into()),
        reason,
    }
}

/// Move an animal to `store`, or release it with `None`
///
/// The animal leaves its current store's set before joining the new one.
/// Calling with the animal's current store is a no-op.
///
/// # Errors
///
/// * `EntityNotFound` - If either key is unknown to the graph
/// * `InvariantViolation` - If the current store does not list the animal
pub fn set_animal_store(graph: &mut Graph, animal: AnimalKey, store: Option<StoreKey>) -> Result<()> {
    let current = graph.animal(animal)?.store;
    if let Some(new_store) = store {
        graph.store(new_store)?;
    }

    if current == store {
        return Ok(());
    }

    if let Some(old_store) = current {
        let listed = graph.store(old_store)?.animals.contains(&animal);
        if !listed {
            return Err(out_of_sync(
                graph,
                animal,
                format!(
                    "points at {} which does not list it",
                    graph.describe(old_store.into())
                ),
            ));
        }
    }
    if let Some(new_store) = store {
        if graph.store(new_store)?.animals.contains(&animal) {
            return Err(out_of_sync(
                graph,
                new_store,
                format!(
                    "lists {} whose back-reference points elsewhere",
                    graph.describe(animal.into())
                ),
            ));
        }
    }

    if let Some(old_store) = current {
        graph.store_mut(old_store)?.animals.retain(|a| *a != animal);
    }
    graph.animal_mut(animal)?.store = store;
    if let Some(new_store) = store {
        graph.store_mut(new_store)?.animals.push(animal);
    }

    tracing::debug!(
        animal = animal.slot(),
        from = ?current.map(StoreKey::slot),
        to = ?store.map(StoreKey::slot),
        "animal store changed"
    );
    Ok(())
}

/// Link a store and a product on both sides
///
/// Linking an already-linked pair, or passing no product, is a no-op.
///
/// # Errors
///
/// * `EntityNotFound` - If either key is unknown to the graph
/// * `InvariantViolation` - If exactly one side already records the link
pub fn link_store_product(graph: &mut Graph, store: StoreKey, product: Option<ProductKey>) -> Result<()> {
    graph.store(store)?;
    let Some(product) = product else {
        return Ok(());
    };

    match link_state(graph, store, product)? {
        (true, true) => return Ok(()),
        (false, false) => {}
        _ => return Err(half_link(graph, store, product)),
    }

    graph.store_mut(store)?.products.push(product);
    graph.product_mut(product)?.stores.push(store);

    tracing::debug!(store = store.slot(), product = product.slot(), "store/product linked");
    Ok(())
}

/// Remove the link between a store and a product on both sides
///
/// Unlinking a pair that is not linked, or passing no product, is a no-op.
///
/// # Errors
///
/// * `EntityNotFound` - If either key is unknown to the graph
/// * `InvariantViolation` - If exactly one side records the link
pub fn unlink_store_product(graph: &mut Graph, store: StoreKey, product: Option<ProductKey>) -> Result<()> {
    graph.store(store)?;
    let Some(product) = product else {
        return Ok(());
    };

    match link_state(graph, store, product)? {
        (false, false) => return Ok(()),
        (true, true) => {}
        _ => return Err(half_link(graph, store, product)),
    }

    graph.store_mut(store)?.products.retain(|p| *p != product);
    graph.product_mut(product)?.stores.retain(|s| *s != store);

    tracing::debug!(store = store.slot(), product = product.slot(), "store/product unlinked");
    Ok(())
}

fn link_state(graph: &Graph, store: StoreKey, product: ProductKey) -> Result<(bool, bool)> {
    let in_store = graph.store(store)?.products.contains(&product);
    let in_product = graph.product(product)?.stores.contains(&store);
    Ok((in_store, in_product))
}

fn half_link(graph: &Graph, store: StoreKey, product: ProductKey) -> PetStoreError {
    out_of_sync(
        graph,
        store,
        format!(
            "link with {} is recorded on one side only",
            graph.describe(product.into())
        ),
    )
}

/// Give a store its address, or remove it with `None`
///
/// The store is the owning side. An address already owned by another store
/// is taken from it; the store's previous address loses its back-pointer.
/// Setting the current address again is a no-op.
///
/// # Errors
///
/// * `EntityNotFound` - If either key is unknown to the graph
/// * `InvariantViolation` - If an existing link is only recorded on one side
pub fn set_store_address(graph: &mut Graph, store: StoreKey, address: Option<AddressKey>) -> Result<()> {
    let current = graph.store(store)?.address;
    let previous_owner = match address {
        Some(a) => graph.address(a)?.store,
        None => None,
    };

    if current == address {
        return Ok(());
    }

    if let Some(old_address) = current {
        if graph.address(old_address)?.store != Some(store) {
            return Err(out_of_sync(
                graph,
                store,
                format!(
                    "owns {} whose back-pointer points elsewhere",
                    graph.describe(old_address.into())
                ),
            ));
        }
    }
    if let (Some(new_address), Some(owner)) = (address, previous_owner) {
        if graph.store(owner)?.address != Some(new_address) {
            return Err(out_of_sync(
                graph,
                new_address,
                format!(
                    "points at {} which does not own it",
                    graph.describe(owner.into())
                ),
            ));
        }
    }

    if let Some(old_address) = current {
        graph.address_mut(old_address)?.store = None;
    }
    if let (Some(_), Some(owner)) = (address, previous_owner) {
        graph.store_mut(owner)?.address = None;
    }
    graph.store_mut(store)?.address = address;
    if let Some(new_address) = address {
        graph.address_mut(new_address)?.store = Some(store);
    }

    tracing::debug!(
        store = store.slot(),
        address = ?address.map(AddressKey::slot),
        taken_from = ?previous_owner.map(StoreKey::slot),
        "store address changed"
    );
    Ok(())
}
