//! Rebuilding a graph from stored rows

use std::collections::HashMap;
use std::time::Instant;

use crate::errors::{PetStoreError, Result};
use crate::identity::IdentityRegistry;
use crate::mapping::hierarchy::{decode_animal, VARIANT_TABLES};
use crate::mapping::tables::{
    decode_address, decode_product, decode_store, decode_store_product, ADDRESS, ANIMAL, PRODUCT,
    STORE, STORE_PRODUCT,
};
use crate::mapping::{Row, TableDef};
use crate::model::{AddressKey, EntityId, EntityRef, ProductKey, StoreKey};
use crate::ops::{link_store_product, set_animal_store, set_store_address, Graph};
use crate::rules::validate_graph;
use crate::{log_op_end, log_op_error, log_op_start};

use super::unit_of_work::RowSource;

fn dangling(table: &str, column: &str, target: &str, id: EntityId) -> PetStoreError {
    PetStoreError::DanglingReference {
        table: table.to_string(),
        column: column.to_string(),
        target: target.to_string(),
        id: id.value(),
    }
}

/// Rows of `table` sorted by key, so identities bind in ascending order
fn fetch_sorted<S: RowSource + ?Sized>(source: &S, table: &TableDef) -> Result<Vec<Row>> {
    let rows = source.fetch_all(table)?;
    let mut keyed = Vec::with_capacity(rows.len());
    for row in rows {
        keyed.push((row.id()?, row));
    }
    keyed.sort_by_key(|(id, _)| *id);
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

/// Rebuild the whole stored graph
///
/// Every entity comes back with its stored identity and every foreign key
/// becomes an association made through the association operations. The
/// result is checked with [`validate_graph`] before it is returned.
///
/// # Errors
///
/// * `DanglingReference` - If a foreign key names a missing row
/// * `VariantMismatch` - If an animal has zero or several variant rows
/// * `InvalidColumn` / `Codec` - If a row cannot be decoded
/// * `InvariantViolation` - If the rows describe an inconsistent graph
/// * `Backend` - If the source cannot be read
pub fn load_graph<S: RowSource + ?Sized>(source: &S) -> Result<Graph> {
    let start = Instant::now();
    log_op_start!("load_graph");

    match rebuild(source) {
        Ok(graph) => {
            log_op_end!(
                "load_graph",
                duration_ms = start.elapsed().as_millis() as u64,
                stores = graph.stores().count(),
                animals = graph.animals().count()
            );
            Ok(graph)
        }
        Err(err) => {
            log_op_error!(
                "load_graph",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            Err(err)
        }
    }
}

fn rebuild<S: RowSource + ?Sized>(source: &S) -> Result<Graph> {
    let mut graph = Graph::new();
    let mut registry = IdentityRegistry::new();

    let mut addresses: HashMap<EntityId, AddressKey> = HashMap::new();
    for row in fetch_sorted(source, &ADDRESS)? {
        let (id, address) = decode_address(&row)?;
        let key = graph.add_address(address);
        registry.assign_identity(&mut graph, key.into(), id)?;
        addresses.insert(id, key);
    }

    let mut stores: HashMap<EntityId, StoreKey> = HashMap::new();
    for row in fetch_sorted(source, &STORE)? {
        let (id, store, address_id) = decode_store(&row)?;
        let key = graph.add_store(store);
        registry.assign_identity(&mut graph, key.into(), id)?;
        if let Some(address_id) = address_id {
            let address = *addresses
                .get(&address_id)
                .ok_or_else(|| dangling(STORE.name, "address_id", ADDRESS.name, address_id))?;
            if let Some(owner) = graph.address(address)?.store() {
                return Err(PetStoreError::InvariantViolation {
                    entity: graph.describe(address.into()),
                    reason: format!(
                        "claimed by both {} and {}",
                        graph.describe(owner.into()),
                        graph.describe(key.into())
                    ),
                });
            }
            set_store_address(&mut graph, key, Some(address))?;
        }
        stores.insert(id, key);
    }

    let mut variant_rows: HashMap<EntityId, Vec<Row>> = HashMap::new();
    for variant in VARIANT_TABLES.iter() {
        for row in source.fetch_all(&variant.table)? {
            variant_rows.entry(row.id()?).or_default().push(row);
        }
    }

    for base in fetch_sorted(source, &ANIMAL)? {
        let id = base.id()?;
        let matches = variant_rows.remove(&id).unwrap_or_default();
        let refs: Vec<&Row> = matches.iter().collect();
        let (id, animal, store_id) = decode_animal(&base, &refs)?;
        let key = graph.add_animal(animal);
        registry.assign_identity(&mut graph, key.into(), id)?;
        if let Some(store_id) = store_id {
            let store = *stores
                .get(&store_id)
                .ok_or_else(|| dangling(ANIMAL.name, "store_id", STORE.name, store_id))?;
            set_animal_store(&mut graph, key, Some(store))?;
        }
    }

    // variant rows left over have no base row
    if let Some((id, rows)) = variant_rows.iter().min_by_key(|(id, _)| **id) {
        let table = rows.first().map_or(ANIMAL.name, |r| r.table);
        return Err(dangling(table, "id", ANIMAL.name, *id));
    }

    let mut products: HashMap<EntityId, ProductKey> = HashMap::new();
    for row in fetch_sorted(source, &PRODUCT)? {
        let (id, product) = decode_product(&row)?;
        let key = graph.add_product(product);
        registry.assign_identity(&mut graph, key.into(), id)?;
        products.insert(id, key);
    }

    for row in source.fetch_all(&STORE_PRODUCT)? {
        let (store_id, product_id) = decode_store_product(&row)?;
        let store = *stores
            .get(&store_id)
            .ok_or_else(|| dangling(STORE_PRODUCT.name, "store_id", STORE.name, store_id))?;
        let product = *products
            .get(&product_id)
            .ok_or_else(|| dangling(STORE_PRODUCT.name, "product_id", PRODUCT.name, product_id))?;
        link_store_product(&mut graph, store, Some(product))?;
    }

    registry.commit();
    validate_graph(&graph)?;

    // the rows just read are the committed state
    let keepers: Vec<EntityRef> = graph
        .stores()
        .map(|(k, _)| EntityRef::from(k))
        .chain(graph.animals().map(|(k, _)| EntityRef::from(k)))
        .collect();
    for entity in keepers {
        graph.mark_persisted(entity)?;
    }
    Ok(graph)
}
