//! Demo command: three stores, their addresses, animals and products

use std::path::Path;

use chrono::NaiveDate;
use petstore_core::errors::{PetStoreError, Result};
use petstore_core::model::{Address, Animal, EntityRef, LivingEnv, PetStore, Product, ProductType, StoreKey};
use petstore_core::ops::{link_store_product, set_animal_store, set_store_address, Graph};
use petstore_store::{db, migrations, save_graph};

use super::CommandResult;

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| PetStoreError::InvalidInput {
        reason: format!("invalid date {}-{}-{}", year, month, day),
    })
}

/// Build the sample graph; returns the store keys in creation order
pub fn build_demo_graph(graph: &mut Graph) -> Result<Vec<StoreKey>> {
    let sites = [
        (("3B", "Impasse des moutons", "83500", "La Seyne sur Mer"), ("Baba", "Dialo")),
        (("666", "rue du paradis", "66666", "L'enfer"), ("Bob", "L'Eponge")),
        (("50", "rue de paris", "75000", "Paris"), ("Sam", "Sauvage")),
    ];
    let products = [
        Product::new("1", "eco", ProductType::Accessory, 29.99),
        Product::new("2", "bio", ProductType::Food, 30.99),
        Product::new("3", "toxic", ProductType::Cleaning, 30.8),
    ];

    let mut stores = Vec::with_capacity(sites.len());
    for (((number, street, zip_code, city), (name, manager)), product) in sites.into_iter().zip(products) {
        let address = graph.add_address(Address::new(number, street, zip_code, city));
        let store = graph.add_store(PetStore::new(name, manager));
        set_store_address(graph, store, Some(address))?;
        let product = graph.add_product(product);
        link_store_product(graph, store, Some(product))?;
        stores.push(store);
    }

    let animals = [
        (Animal::fish(date(2024, 1, 5)?, "bleu", LivingEnv::FreshWater), 0),
        (Animal::fish(date(2024, 2, 9)?, "pink", LivingEnv::SeaWater), 1),
        (Animal::cat(date(2022, 11, 20)?, "white", "Inconnu"), 2),
        (Animal::cat(date(2023, 3, 14)?, "black", "Inconnu"), 2),
    ];
    for (animal, store) in animals {
        let key = graph.add_animal(animal);
        set_animal_store(graph, key, Some(stores[store]))?;
    }

    Ok(stores)
}

pub fn execute(db_path: &Path) -> CommandResult {
    let mut conn = db::open(db_path)?;
    migrations::apply_migrations(&mut conn)?;

    let mut graph = Graph::new();
    let roots: Vec<EntityRef> = build_demo_graph(&mut graph)?
        .into_iter()
        .map(EntityRef::from)
        .collect();
    let report = save_graph(&conn, &mut graph, &roots)?;

    println!(
        "Saved {} stores in one transaction (request {})",
        roots.len(),
        report.request_id
    );
    for (table, rows) in &report.rows_written {
        println!("  {:<14} {}", table, rows);
    }
    Ok(())
}
