//! Show command: load the graph and print every store

use std::path::Path;

use clap::Args;
use petstore_core::errors::Result;
use petstore_core::model::{Address, Animal, AnimalVariant, PetStore, Product};
use petstore_core::ops::Graph;
use petstore_store::{db, load_graph};
use serde::Serialize;

use super::CommandResult;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// One store with everything it links to
#[derive(Debug, Serialize)]
pub struct StoreView<'g> {
    #[serde(flatten)]
    pub store: &'g PetStore,
    pub address: Option<&'g Address>,
    pub animals: Vec<&'g Animal>,
    pub products: Vec<&'g Product>,
}

fn store_view<'g>(graph: &'g Graph, store: &'g PetStore) -> Result<StoreView<'g>> {
    Ok(StoreView {
        store,
        address: store.address().map(|k| graph.address(k)).transpose()?,
        animals: store
            .animals()
            .iter()
            .map(|k| graph.animal(*k))
            .collect::<Result<_>>()?,
        products: store
            .products()
            .iter()
            .map(|k| graph.product(*k))
            .collect::<Result<_>>()?,
    })
}

/// Stores in key order, each with its address, animals and products
pub fn store_views(graph: &Graph) -> Result<Vec<StoreView<'_>>> {
    graph
        .stores()
        .map(|(_, store)| store_view(graph, store))
        .collect()
}

fn print_text(views: &[StoreView<'_>]) {
    if views.is_empty() {
        println!("No stores saved");
        return;
    }
    for view in views {
        let id = view.store.id().map_or_else(|| "?".to_string(), |id| id.to_string());
        println!("Store #{} {} (manager {})", id, view.store.name, view.store.manager_name);
        if let Some(a) = view.address {
            println!("  address: {} {}, {} {}", a.number, a.street, a.zip_code, a.city);
        }
        for animal in &view.animals {
            let detail = match &animal.variant {
                AnimalVariant::Cat { chip_id } => format!("cat, chip {}", chip_id),
                AnimalVariant::Fish { living_env } => format!("fish, {}", living_env.as_code()),
            };
            println!("  {} born {} ({})", animal.color, animal.birth_date, detail);
        }
        for product in &view.products {
            println!(
                "  product {} {} [{}] {:.2}",
                product.code,
                product.label,
                product.product_type.as_code(),
                product.price
            );
        }
    }
}

pub fn execute(db_path: &Path, args: ShowArgs) -> CommandResult {
    let conn = db::open(db_path)?;
    let graph = load_graph(&conn)?;
    let views = store_views(&graph)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&views)?);
    } else {
        print_text(&views);
    }
    Ok(())
}
