pub mod invariants;

pub use invariants::validate_graph;
