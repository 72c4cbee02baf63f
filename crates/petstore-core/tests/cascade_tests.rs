//! Cascading save
//!
//! ## Scenarios Covered
//!
//! 1. Write ordering for a store with an address and two animals
//! 2. The single-store "Baba" scenario, row by row
//! 3. All-or-nothing behaviour when the address write fails
//! 4. Later cascades leave earlier identities untouched
//! 5. Caller errors are refused before anything is written
//! 6. Saved entities whose links changed get their rows rewritten

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{baba, date, three_stores};
use petstore_core::errors::PetStoreError;
use petstore_core::mapping::Row;
use petstore_core::model::{Address, Animal, EntityRef, LivingEnv, PetStore};
use petstore_core::ops::{
    link_store_product, set_animal_store, set_store_address, unlink_store_product, Graph,
};
use petstore_core::persist::{load_graph, persist, MemoryDatabase, UnitOfWork, WriteLog, WriteStep};

fn ids_assigned(graph: &Graph) -> usize {
    graph.addresses().filter(|(_, e)| e.id().is_some()).count()
        + graph.stores().filter(|(_, e)| e.id().is_some()).count()
        + graph.animals().filter(|(_, e)| e.id().is_some()).count()
        + graph.products().filter(|(_, e)| e.id().is_some()).count()
}

fn find<'a>(rows: &'a [Row], column: &str, value: i64) -> Vec<&'a Row> {
    rows.iter()
        .filter(|r| r.opt_integer(column).ok().flatten() == Some(value))
        .collect()
}

#[test]
fn test_address_before_store_and_base_before_variant() {
    // GIVEN a fresh store with a fresh address, a cat and a fish
    let mut graph = Graph::new();
    let store = graph.add_store(PetStore::new("Sam", "Sauvage"));
    let address = graph.add_address(Address::new("50", "rue de paris", "75000", "Paris"));
    set_store_address(&mut graph, store, Some(address)).unwrap();
    let cat = graph.add_animal(Animal::cat(date(2022, 11, 20), "white", "Inconnu"));
    let fish = graph.add_animal(Animal::fish(date(2024, 1, 5), "bleu", LivingEnv::FreshWater));
    set_animal_store(&mut graph, cat, Some(store)).unwrap();
    set_animal_store(&mut graph, fish, Some(store)).unwrap();

    // WHEN the store is persisted
    let mut db = MemoryDatabase::new();
    let report = persist(&mut graph, &mut db, &[store.into()]).unwrap();

    // THEN rows went out in dependency order
    assert_eq!(
        db.insert_order(),
        vec!["address", "store", "animal", "cat", "animal", "fish"]
    );
    assert_eq!(report.steps.len(), 6);
    assert_eq!(report.rows_in("animal"), 2);

    // AND every foreign key points at an assigned identity
    let store_id = graph.store(store).unwrap().id().unwrap();
    let address_id = graph.address(address).unwrap().id().unwrap();
    assert_eq!(db.rows("store")[0].integer("address_id").unwrap(), address_id.value());
    for row in db.rows("animal") {
        assert_eq!(row.integer("store_id").unwrap(), store_id.value());
    }
    let cat_id = graph.animal(cat).unwrap().id().unwrap();
    assert_eq!(db.rows("cat")[0].integer("id").unwrap(), cat_id.value());
}

#[test]
fn test_baba_scenario_rows() {
    let mut graph = Graph::new();
    let keys = baba(&mut graph);
    let mut db = MemoryDatabase::new();

    persist(&mut graph, &mut db, &[keys.store.into()]).unwrap();

    // store row has a non-null address_id
    let store_row = &db.rows("store")[0];
    assert!(store_row.opt_integer("address_id").unwrap().is_some());

    // exactly one fish row, matching an animal row of this store
    let store_id = store_row.integer("id").unwrap();
    assert_eq!(db.row_count("fish"), 1);
    let fish_id = db.rows("fish")[0].integer("id").unwrap();
    let animal = find(db.rows("animal"), "id", fish_id);
    assert_eq!(animal.len(), 1);
    assert_eq!(animal[0].integer("store_id").unwrap(), store_id);
    assert_eq!(animal[0].text("color").unwrap(), "bleu");
    assert_eq!(db.rows("fish")[0].text("living_env").unwrap(), "fresh_water");

    // exactly one join row for this pair
    let product_id = graph.product(keys.product).unwrap().id().unwrap().value();
    let joins = find(db.rows("store_product"), "store_id", store_id);
    assert_eq!(joins.len(), 1);
    assert_eq!(joins[0].integer("product_id").unwrap(), product_id);

    assert_eq!(db.rows("product")[0].real("price").unwrap(), 29.99);
    assert_eq!(db.rows("product")[0].text("type").unwrap(), "accessory");
}

#[test]
fn test_failed_address_write_leaves_nothing() {
    // GIVEN the Baba graph and a backend that rejects address rows
    let mut graph = Graph::new();
    let keys = baba(&mut graph);
    let mut db = MemoryDatabase::new();
    db.fail_inserts_into("address");

    // WHEN the cascade runs
    let err = persist(&mut graph, &mut db, &[keys.store.into()]).unwrap_err();

    // THEN it reports the address write
    match &err {
        PetStoreError::WriteFailed { entity, table, .. } => {
            assert_eq!(table, "address");
            assert!(entity.contains("Impasse des moutons"), "entity: {entity}");
        }
        other => panic!("expected WriteFailed, got {other:?}"),
    }

    // AND no row and no identity survived
    for table in ["address", "store", "animal", "fish", "product", "store_product"] {
        assert_eq!(db.row_count(table), 0, "table {table}");
    }
    assert_eq!(ids_assigned(&graph), 0);
    assert!(!db.in_transaction());
    assert_eq!(db.log().last(), Some(&WriteLog::Rollback));
}

#[test]
fn test_failure_midway_clears_identities_bound_earlier_in_the_call() {
    let mut graph = Graph::new();
    let keys = baba(&mut graph);
    let mut db = MemoryDatabase::new();
    db.fail_inserts_into("store_product");

    let err = persist(&mut graph, &mut db, &[keys.store.into()]).unwrap_err();

    assert!(matches!(err, PetStoreError::WriteFailed { ref table, .. } if table == "store_product"));
    assert_eq!(ids_assigned(&graph), 0);
    assert_eq!(db.row_count("store"), 0);
    assert_eq!(db.row_count("fish"), 0);
}

#[test]
fn test_retry_after_failure_succeeds() {
    let mut graph = Graph::new();
    let keys = baba(&mut graph);
    let mut db = MemoryDatabase::new();
    db.fail_inserts_into("fish");
    assert!(persist(&mut graph, &mut db, &[keys.store.into()]).is_err());

    db.clear_failure();
    let report = persist(&mut graph, &mut db, &[keys.store.into()]).unwrap();

    assert_eq!(report.total_rows(), 6);
    assert_eq!(ids_assigned(&graph), 4);
}

#[test]
fn test_second_cascade_keeps_earlier_identities() {
    // GIVEN a store saved in an earlier call
    let mut graph = Graph::new();
    let keys = baba(&mut graph);
    let mut db = MemoryDatabase::new();
    persist(&mut graph, &mut db, &[keys.store.into()]).unwrap();
    let store_id = graph.store(keys.store).unwrap().id();

    // WHEN a new animal joins it and the next cascade fails
    let cat = graph.add_animal(Animal::cat(date(2023, 3, 14), "black", "Inconnu"));
    set_animal_store(&mut graph, cat, Some(keys.store)).unwrap();
    db.fail_inserts_into("cat");
    assert!(persist(&mut graph, &mut db, &[keys.store.into()]).is_err());

    // THEN the earlier identities are intact and the cat has none
    assert_eq!(graph.store(keys.store).unwrap().id(), store_id);
    assert!(graph.animal(keys.fish).unwrap().id().is_some());
    assert!(graph.animal(cat).unwrap().id().is_none());
    assert_eq!(db.row_count("animal"), 1);

    // AND a clean retry writes only the new animal
    db.clear_failure();
    let report = persist(&mut graph, &mut db, &[keys.store.into()]).unwrap();
    assert_eq!(
        report.steps,
        vec![
            WriteStep::AnimalBase { animal: cat },
            WriteStep::AnimalVariant {
                animal: cat,
                variant: petstore_core::model::VariantKind::Cat
            },
        ]
    );
}

#[test]
fn test_persisting_saved_graph_writes_nothing() {
    let mut graph = Graph::new();
    let keys = baba(&mut graph);
    let mut db = MemoryDatabase::new();
    persist(&mut graph, &mut db, &[keys.store.into()]).unwrap();
    let log_len = db.log().len();

    let report = persist(&mut graph, &mut db, &[keys.store.into()]).unwrap();

    assert!(report.steps.is_empty());
    assert_eq!(db.log().len(), log_len);
}

#[test]
fn test_saved_animal_moved_to_new_store_is_updated() {
    let mut graph = Graph::new();
    let keys = baba(&mut graph);
    let mut db = MemoryDatabase::new();
    persist(&mut graph, &mut db, &[keys.store.into()]).unwrap();

    let new_store = graph.add_store(PetStore::new("Bob", "L'Eponge"));
    set_animal_store(&mut graph, keys.fish, Some(new_store)).unwrap();
    persist(&mut graph, &mut db, &[new_store.into()]).unwrap();

    let new_id = graph.store(new_store).unwrap().id().unwrap().value();
    assert_eq!(db.rows("animal")[0].integer("store_id").unwrap(), new_id);
    assert!(db
        .log()
        .iter()
        .any(|e| matches!(e, WriteLog::Update { table: "animal", .. })));
}

/// Name of the store keeping the animal of `color`, read back from rows
fn reloaded_keeper(db: &MemoryDatabase, color: &str) -> Option<String> {
    let loaded = load_graph(db).unwrap();
    let (_, animal) = loaded.animals().find(|(_, a)| a.color == color).unwrap();
    animal.store().map(|s| loaded.store(s).unwrap().name.clone())
}

#[test]
fn test_saved_animal_moved_between_saved_stores_is_updated() {
    // GIVEN stores A and B saved together, the cat kept by A
    let mut graph = Graph::new();
    let a = graph.add_store(PetStore::new("A", "Dialo"));
    let b = graph.add_store(PetStore::new("B", "Sauvage"));
    let cat = graph.add_animal(Animal::cat(date(2023, 3, 14), "black", "Inconnu"));
    set_animal_store(&mut graph, cat, Some(a)).unwrap();
    let mut db = MemoryDatabase::new();
    persist(&mut graph, &mut db, &[a.into(), b.into()]).unwrap();

    // WHEN the cat moves to B and only B is persisted
    set_animal_store(&mut graph, cat, Some(b)).unwrap();
    let report = persist(&mut graph, &mut db, &[b.into()]).unwrap();

    // THEN the animal row follows
    assert_eq!(report.steps, vec![WriteStep::AnimalRehome { animal: cat, store: Some(b) }]);
    assert_eq!(report.rows_in("animal"), 1);
    assert_eq!(reloaded_keeper(&db, "black").as_deref(), Some("B"));

    // AND a further call has nothing left to write
    assert_eq!(persist(&mut graph, &mut db, &[b.into()]).unwrap().total_rows(), 0);
}

#[test]
fn test_released_animal_is_cleared_from_its_old_store() {
    // GIVEN the saved Baba graph
    let mut graph = Graph::new();
    let keys = baba(&mut graph);
    let mut db = MemoryDatabase::new();
    persist(&mut graph, &mut db, &[keys.store.into()]).unwrap();

    // WHEN the fish leaves every store and the old store is persisted
    set_animal_store(&mut graph, keys.fish, None).unwrap();
    let report = persist(&mut graph, &mut db, &[keys.store.into()]).unwrap();

    // THEN its store_id is cleared
    assert_eq!(report.total_rows(), 1);
    assert_eq!(db.rows("animal")[0].opt_integer("store_id").unwrap(), None);
    assert_eq!(reloaded_keeper(&db, "bleu"), None);
}

#[test]
fn test_links_between_saved_stores_and_products_are_written() {
    // GIVEN two saved stores each selling its own saved product
    let mut graph = Graph::new();
    let stores = three_stores(&mut graph);
    let roots: Vec<EntityRef> = stores.iter().map(|s| (*s).into()).collect();
    let mut db = MemoryDatabase::new();
    persist(&mut graph, &mut db, &roots).unwrap();
    let eco = graph.store(stores[0]).unwrap().products()[0];

    // WHEN Bob starts selling eco and Baba stops
    link_store_product(&mut graph, stores[1], Some(eco)).unwrap();
    unlink_store_product(&mut graph, stores[0], Some(eco)).unwrap();
    let report = persist(&mut graph, &mut db, &[stores[1].into()]).unwrap();

    // THEN one join row is removed and one added
    assert_eq!(report.rows_in("store_product"), 2);
    assert!(db
        .log()
        .iter()
        .any(|e| matches!(e, WriteLog::Delete { table: "store_product" })));
    let loaded = load_graph(&db).unwrap();
    let sellers: Vec<&str> = loaded
        .products()
        .find(|(_, p)| p.code == "1")
        .map(|(_, p)| p.stores().iter().map(|s| loaded.store(*s).unwrap().name.as_str()).collect())
        .unwrap();
    assert_eq!(sellers, vec!["Bob"]);
}

#[test]
fn test_failed_cascade_keeps_pending_moves() {
    // GIVEN saved stores A and B, the fish kept by A
    let mut graph = Graph::new();
    let a = graph.add_store(PetStore::new("A", "Dialo"));
    let b = graph.add_store(PetStore::new("B", "Sauvage"));
    let fish = graph.add_animal(Animal::fish(date(2024, 1, 5), "bleu", LivingEnv::FreshWater));
    set_animal_store(&mut graph, fish, Some(a)).unwrap();
    let mut db = MemoryDatabase::new();
    persist(&mut graph, &mut db, &[a.into(), b.into()]).unwrap();

    // WHEN the fish moves to B alongside a new cat whose write fails
    set_animal_store(&mut graph, fish, Some(b)).unwrap();
    let cat = graph.add_animal(Animal::cat(date(2023, 3, 14), "black", "Inconnu"));
    set_animal_store(&mut graph, cat, Some(b)).unwrap();
    db.fail_inserts_into("cat");
    assert!(persist(&mut graph, &mut db, &[b.into()]).is_err());

    // THEN the move is still pending and lands on retry
    assert_eq!(reloaded_keeper(&db, "bleu").as_deref(), Some("A"));
    db.clear_failure();
    let report = persist(&mut graph, &mut db, &[b.into()]).unwrap();
    assert!(report.steps.contains(&WriteStep::AnimalRehome { animal: fish, store: Some(b) }));
    assert_eq!(reloaded_keeper(&db, "bleu").as_deref(), Some("B"));
}

#[test]
fn test_saved_stores_swap_addresses() {
    // GIVEN two saved stores with their own addresses
    let mut graph = Graph::new();
    let stores = three_stores(&mut graph);
    let roots: Vec<EntityRef> = stores.iter().map(|s| (*s).into()).collect();
    let mut db = MemoryDatabase::new();
    persist(&mut graph, &mut db, &roots).unwrap();
    let first = graph.store(stores[0]).unwrap().address().unwrap();
    let second = graph.store(stores[1]).unwrap().address().unwrap();

    // WHEN they exchange addresses
    set_store_address(&mut graph, stores[0], None).unwrap();
    set_store_address(&mut graph, stores[1], Some(first)).unwrap();
    set_store_address(&mut graph, stores[0], Some(second)).unwrap();
    let report = persist(&mut graph, &mut db, &[stores[0].into()]).unwrap();

    // THEN the unique address_id never clashes and the rows follow
    assert_eq!(report.rows_in("store"), 4);
    let loaded = load_graph(&db).unwrap();
    let city_of = |name: &str| {
        let (_, store) = loaded.stores().find(|(_, s)| s.name == name).unwrap();
        loaded.address(store.address().unwrap()).unwrap().city.clone()
    };
    assert_eq!(city_of("Baba"), "L'enfer");
    assert_eq!(city_of("Bob"), "La Seyne sur Mer");
}

#[test]
fn test_three_stores_in_one_cascade() {
    let mut graph = Graph::new();
    let stores = three_stores(&mut graph);
    let roots: Vec<EntityRef> = stores.iter().map(|s| (*s).into()).collect();
    let mut db = MemoryDatabase::new();

    let report = persist(&mut graph, &mut db, &roots).unwrap();

    assert_eq!(report.rows_in("address"), 3);
    assert_eq!(report.rows_in("store"), 3);
    assert_eq!(report.rows_in("animal"), 4);
    assert_eq!(report.rows_in("fish"), 2);
    assert_eq!(report.rows_in("cat"), 2);
    assert_eq!(report.rows_in("product"), 3);
    assert_eq!(report.rows_in("store_product"), 3);

    // stores keep root order
    let names: Vec<&str> = db.rows("store").iter().map(|r| r.text("name").unwrap()).collect();
    assert_eq!(names, vec!["Baba", "Bob", "Sam"]);
}

#[test]
fn test_unknown_root_is_refused_before_writing() {
    // GIVEN the Baba graph and a root key issued by another graph
    let mut graph = Graph::new();
    let keys = baba(&mut graph);
    let mut db = MemoryDatabase::new();

    let mut other = Graph::new();
    other.add_address(Address::new("1", "x", "y", "z"));
    let stranger = other.add_store(PetStore::new("z", "z"));
    assert_eq!(stranger.slot(), keys.store.slot());

    // WHEN both are passed as roots
    let err = persist(&mut graph, &mut db, &[keys.store.into(), stranger.into()]).unwrap_err();

    // THEN the call fails without touching the backend
    assert!(matches!(err, PetStoreError::EntityNotFound { .. }));
    assert!(db.log().is_empty());
    assert_eq!(ids_assigned(&graph), 0);
}

#[test]
fn test_backend_refusing_to_begin_is_reported() {
    let mut graph = Graph::new();
    let keys = baba(&mut graph);
    let mut db = MemoryDatabase::new();
    db.begin().unwrap();

    let err = persist(&mut graph, &mut db, &[keys.store.into()]).unwrap_err();

    assert!(matches!(err, PetStoreError::Backend { ref op, .. } if op == "begin"));
    assert_eq!(ids_assigned(&graph), 0);
}
