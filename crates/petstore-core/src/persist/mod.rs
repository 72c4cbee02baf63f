//! Persisting graphs through a unit of work and reading them back

pub mod coordinator;
pub mod load;
pub mod memory;
pub mod plan;
pub mod unit_of_work;

pub use coordinator::{persist, CascadeReport};
pub use load::load_graph;
pub use memory::{MemoryDatabase, WriteLog};
pub use plan::{plan_cascade, WritePlan, WriteStep};
pub use unit_of_work::{RowSource, TransactionScope, UnitOfWork};
