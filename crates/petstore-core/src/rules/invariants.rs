use std::collections::HashMap;

use crate::errors::{PetStoreError, Result};
use crate::model::{AddressKey, AnimalKey, EntityRef, ProductKey, StoreKey};
use crate::ops::Graph;

/// Find animals whose store back-reference and the store's set disagree
///
/// Covers both directions: an animal pointing at a store that does not list
/// it, and a store listing an animal that points elsewhere (or nowhere).
///
/// Returns list of (animal, store) pairs
pub fn find_animal_store_mismatches(graph: &Graph) -> Vec<(AnimalKey, StoreKey)> {
    let mut mismatches = Vec::new();

    for (animal_key, animal) in graph.animals() {
        if let Some(store_key) = animal.store() {
            let listed = match graph.store(store_key) {
                Ok(store) => store.animals().contains(&animal_key),
                Err(_) => continue, // Missing store - handled by find_dangling_keys
            };
            if !listed {
                mismatches.push((animal_key, store_key));
            }
        }
    }

    for (store_key, store) in graph.stores() {
        for animal_key in store.animals() {
            let back = match graph.animal(*animal_key) {
                Ok(animal) => animal.store(),
                Err(_) => continue,
            };
            if back != Some(store_key) {
                mismatches.push((*animal_key, store_key));
            }
        }
    }

    mismatches
}

/// Find store/product links recorded on one side only
///
/// Returns list of (store, product) pairs
pub fn find_store_product_asymmetries(graph: &Graph) -> Vec<(StoreKey, ProductKey)> {
    let mut asymmetries = Vec::new();

    for (store_key, store) in graph.stores() {
        for product_key in store.products() {
            let reciprocal = match graph.product(*product_key) {
                Ok(product) => product.stores().contains(&store_key),
                Err(_) => continue,
            };
            if !reciprocal {
                asymmetries.push((store_key, *product_key));
            }
        }
    }

    for (product_key, product) in graph.products() {
        for store_key in product.stores() {
            let reciprocal = match graph.store(*store_key) {
                Ok(store) => store.products().contains(&product_key),
                Err(_) => continue,
            };
            if !reciprocal {
                asymmetries.push((*store_key, product_key));
            }
        }
    }

    asymmetries
}

/// Find addresses owned by several stores, or whose back-pointer disagrees
/// with the owning store
///
/// Returns list of (address, stores involved) tuples
pub fn find_address_conflicts(graph: &Graph) -> Vec<(AddressKey, Vec<StoreKey>)> {
    let mut owners: HashMap<AddressKey, Vec<StoreKey>> = HashMap::new();
    for (store_key, store) in graph.stores() {
        if let Some(address_key) = store.address() {
            owners.entry(address_key).or_default().push(store_key);
        }
    }

    let mut conflicts = Vec::new();
    for (address_key, address) in graph.addresses() {
        let owning = owners.remove(&address_key).unwrap_or_default();
        let consistent = match (owning.as_slice(), address.store()) {
            ([], None) => true,
            ([only], Some(back)) => *only == back,
            _ => false,
        };
        if !consistent {
            let mut involved = owning;
            if let Some(back) = address.store() {
                if !involved.contains(&back) {
                    involved.push(back);
                }
            }
            conflicts.push((address_key, involved));
        }
    }

    conflicts
}

/// Find relationship keys that point at entities missing from the graph
///
/// Returns list of (holder, missing target) tuples
pub fn find_dangling_keys(graph: &Graph) -> Vec<(EntityRef, EntityRef)> {
    let mut dangling = Vec::new();
    let mut check = |holder: EntityRef, target: EntityRef| {
        if !graph.contains(target) {
            dangling.push((holder, target));
        }
    };

    for (key, address) in graph.addresses() {
        if let Some(store) = address.store() {
            check(key.into(), store.into());
        }
    }
    for (key, store) in graph.stores() {
        if let Some(address) = store.address() {
            check(key.into(), address.into());
        }
        for animal in store.animals() {
            check(key.into(), (*animal).into());
        }
        for product in store.products() {
            check(key.into(), (*product).into());
        }
    }
    for (key, animal) in graph.animals() {
        if let Some(store) = animal.store() {
            check(key.into(), store.into());
        }
    }
    for (key, product) in graph.products() {
        for store in product.stores() {
            check(key.into(), (*store).into());
        }
    }

    dangling
}

/// Check every association invariant, reporting the first violation
///
/// # Errors
///
/// Returns `InvariantViolation` naming the offending entity. The graph is
/// never repaired.
pub fn validate_graph(graph: &Graph) -> Result<()> {
    if let Some((holder, target)) = find_dangling_keys(graph).into_iter().next() {
        return Err(PetStoreError::InvariantViolation {
            entity: graph.describe(holder),
            reason: format!("references {} which is not in the graph", graph.describe(target)),
        });
    }

    if let Some((animal, store)) = find_animal_store_mismatches(graph).into_iter().next() {
        return Err(PetStoreError::InvariantViolation {
            entity: graph.describe(animal.into()),
            reason: format!(
                "store membership disagrees with {}",
                graph.describe(store.into())
            ),
        });
    }

    if let Some((store, product)) = find_store_product_asymmetries(graph).into_iter().next() {
        return Err(PetStoreError::InvariantViolation {
            entity: graph.describe(store.into()),
            reason: format!(
                "link with {} is recorded on one side only",
                graph.describe(product.into())
            ),
        });
    }

    if let Some((address, stores)) = find_address_conflicts(graph).into_iter().next() {
        let names: Vec<String> = stores.iter().map(|s| graph.describe((*s).into())).collect();
        return Err(PetStoreError::InvariantViolation {
            entity: graph.describe(address.into()),
            reason: format!("ownership disagrees between [{}]", names.join(", ")),
        });
    }

    Ok(())
}
