//! Association operations
//!
//! Both sides of every link agree after each call, moves never leave an
//! animal in two stores or none, and repeated calls change nothing.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::date;
use petstore_core::errors::PetStoreError;
use petstore_core::model::{Animal, LivingEnv, PetStore, Product, ProductType};
use petstore_core::ops::{
    link_store_product, set_animal_store, set_store_address, unlink_store_product, Graph,
};
use petstore_core::rules::invariants;
use petstore_core::rules::validate_graph;
use proptest::prelude::*;

#[test]
fn test_set_animal_store_then_release() {
    // GIVEN a store and a cat
    let mut graph = Graph::new();
    let store = graph.add_store(PetStore::new("Sam", "Sauvage"));
    let cat = graph.add_animal(Animal::cat(date(2022, 11, 20), "white", "Inconnu"));

    // WHEN the cat joins the store
    set_animal_store(&mut graph, cat, Some(store)).unwrap();

    // THEN both sides reflect it
    assert_eq!(graph.animal(cat).unwrap().store(), Some(store));
    assert!(graph.store(store).unwrap().animals().contains(&cat));

    // WHEN the cat is released
    set_animal_store(&mut graph, cat, None).unwrap();

    // THEN no store lists it
    assert_eq!(graph.animal(cat).unwrap().store(), None);
    assert!(graph.stores().all(|(_, s)| !s.animals().contains(&cat)));
}

#[test]
fn test_move_between_stores_leaves_animal_in_exactly_one() {
    let mut graph = Graph::new();
    let a = graph.add_store(PetStore::new("Baba", "Dialo"));
    let b = graph.add_store(PetStore::new("Bob", "L'Eponge"));
    let fish = graph.add_animal(Animal::fish(date(2024, 2, 9), "pink", LivingEnv::SeaWater));

    set_animal_store(&mut graph, fish, Some(a)).unwrap();
    set_animal_store(&mut graph, fish, Some(b)).unwrap();

    let holders: Vec<_> = graph
        .stores()
        .filter(|(_, s)| s.animals().contains(&fish))
        .map(|(k, _)| k)
        .collect();
    assert_eq!(holders, vec![b]);
}

#[test]
fn test_link_twice_equals_link_once() {
    let mut graph = Graph::new();
    let store = graph.add_store(PetStore::new("Baba", "Dialo"));
    let product = graph.add_product(Product::new("1", "eco", ProductType::Accessory, 29.99));

    link_store_product(&mut graph, store, Some(product)).unwrap();
    let once = graph.clone();
    link_store_product(&mut graph, store, Some(product)).unwrap();

    assert_eq!(
        graph.store(store).unwrap().products(),
        once.store(store).unwrap().products()
    );
    assert_eq!(
        graph.product(product).unwrap().stores(),
        once.product(product).unwrap().stores()
    );
}

#[test]
fn test_unlink_clears_both_sides() {
    let mut graph = Graph::new();
    let store = graph.add_store(PetStore::new("Baba", "Dialo"));
    let product = graph.add_product(Product::new("2", "bio", ProductType::Food, 30.99));
    link_store_product(&mut graph, store, Some(product)).unwrap();

    unlink_store_product(&mut graph, store, Some(product)).unwrap();

    assert!(!graph.store(store).unwrap().products().contains(&product));
    assert!(!graph.product(product).unwrap().stores().contains(&store));
}

#[test]
fn test_key_from_another_graph_is_rejected() {
    // GIVEN two graphs that each issued a store at slot 0
    let mut other = Graph::new();
    let foreign = other.add_store(PetStore::new("Bob", "L'Eponge"));
    let foreign_product = other.add_product(Product::new("9", "ailleurs", ProductType::Food, 1.0));

    let mut graph = Graph::new();
    let mine = graph.add_store(PetStore::new("Mine", "Dialo"));
    let cat = graph.add_animal(Animal::cat(date(2023, 3, 14), "black", "Inconnu"));
    assert_eq!(mine.slot(), foreign.slot());

    // WHEN the foreign key is used here
    let err = set_animal_store(&mut graph, cat, Some(foreign)).unwrap_err();

    // THEN the call is refused and the store sharing its slot is untouched
    assert!(matches!(err, PetStoreError::EntityNotFound { .. }));
    assert_eq!(graph.animal(cat).unwrap().store(), None);
    assert!(graph.store(mine).unwrap().animals().is_empty());

    // AND the other association operations refuse it too
    assert!(link_store_product(&mut graph, mine, Some(foreign_product)).is_err());
    assert!(graph.store(mine).unwrap().products().is_empty());
    assert!(link_store_product(&mut graph, foreign, None).is_err());
    assert!(set_store_address(&mut graph, foreign, None).is_err());
}

#[derive(Debug, Clone)]
enum Mutation {
    Move { animal: usize, store: Option<usize> },
    Link { store: usize, product: usize },
    Unlink { store: usize, product: usize },
}

fn mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        (0..6usize, proptest::option::of(0..3usize))
            .prop_map(|(animal, store)| Mutation::Move { animal, store }),
        (0..3usize, 0..4usize).prop_map(|(store, product)| Mutation::Link { store, product }),
        (0..3usize, 0..4usize).prop_map(|(store, product)| Mutation::Unlink { store, product }),
    ]
}

proptest! {
    #[test]
    fn prop_random_mutations_keep_graph_consistent(ops in proptest::collection::vec(mutation(), 0..60)) {
        let mut graph = Graph::new();
        let stores: Vec<_> = (0..3)
            .map(|i| graph.add_store(PetStore::new(format!("store {i}"), "manager")))
            .collect();
        let animals: Vec<_> = (0..6)
            .map(|i| graph.add_animal(Animal::cat(date(2020, 1, 1), format!("c{i}"), "chip")))
            .collect();
        let products: Vec<_> = (0..4)
            .map(|i| graph.add_product(Product::new(i.to_string(), "p", ProductType::Food, 1.0)))
            .collect();

        for op in ops {
            match op {
                Mutation::Move { animal, store } => {
                    set_animal_store(&mut graph, animals[animal], store.map(|s| stores[s])).unwrap();
                    let held = graph
                        .stores()
                        .filter(|(_, s)| s.animals().contains(&animals[animal]))
                        .count();
                    prop_assert_eq!(held, usize::from(store.is_some()));
                }
                Mutation::Link { store, product } => {
                    link_store_product(&mut graph, stores[store], Some(products[product])).unwrap();
                    prop_assert!(graph.product(products[product]).unwrap().stores().contains(&stores[store]));
                }
                Mutation::Unlink { store, product } => {
                    unlink_store_product(&mut graph, stores[store], Some(products[product])).unwrap();
                    prop_assert!(!graph.store(stores[store]).unwrap().products().contains(&products[product]));
                }
            }
            prop_assert!(invariants::find_animal_store_mismatches(&graph).is_empty());
            prop_assert!(invariants::find_store_product_asymmetries(&graph).is_empty());
        }
        prop_assert!(validate_graph(&graph).is_ok());

        // no duplicates in any set
        for (_, store) in graph.stores() {
            let mut seen = store.products().to_vec();
            seen.sort();
            seen.dedup();
            prop_assert_eq!(seen.len(), store.products().len());
        }
    }
}
