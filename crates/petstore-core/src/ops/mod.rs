pub mod association;
pub mod graph;

pub use association::{link_store_product, set_animal_store, set_store_address, unlink_store_product};
pub use graph::Graph;
