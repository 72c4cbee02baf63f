//! Cascading, all-or-nothing save of an entity graph

use std::collections::BTreeMap;
use std::time::Instant;

use petstore_core_types::RequestId;
use serde::Serialize;

use crate::errors::{PetStoreError, Result};
use crate::identity::IdentityRegistry;
use crate::mapping::hierarchy::{base_row, variant_row};
use crate::mapping::tables::{address_row, product_row, store_product_row, store_row};
use crate::mapping::SqlValue;
use crate::model::{AddressKey, EntityId, EntityRef, StoreKey};
use crate::ops::Graph;
use crate::rules::validate_graph;
use crate::{log_op_end, log_op_error, log_op_start};

use super::plan::{plan_cascade, WriteStep};
use super::unit_of_work::{TransactionScope, UnitOfWork};

/// Outcome of a successful cascade
#[derive(Debug, Clone, Serialize)]
pub struct CascadeReport {
    pub request_id: RequestId,
    /// Writes performed, in order
    pub steps: Vec<WriteStep>,
    /// Rows inserted, updated or removed per table
    pub rows_written: BTreeMap<&'static str, usize>,
}

impl CascadeReport {
    fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            steps: Vec::new(),
            rows_written: BTreeMap::new(),
        }
    }

    pub fn rows_in(&self, table: &str) -> usize {
        self.rows_written.get(table).copied().unwrap_or(0)
    }

    pub fn total_rows(&self) -> usize {
        self.rows_written.values().sum()
    }
}

/// Persist everything reachable from `roots` in one transaction
///
/// New entities are inserted; saved ones whose links changed since their
/// last commit get their foreign keys and join rows rewritten. Rows are
/// written in dependency order and each new entity receives its identity
/// right after its row is written. If any write fails the transaction is
/// rolled back, every identity bound during this call is cleared again, and
/// the committed links recorded on the graph are left as they were.
///
/// # Errors
///
/// * `InvariantViolation` - If the graph is inconsistent before writing
/// * `EntityNotFound` - If a root is not part of the graph
/// * `WriteFailed` - If the backend rejects a row; names the entity and table
/// * `Backend` - If the transaction cannot be opened or committed
/// * Identity errors - If the backend issues a key the registry refuses
pub fn persist<U>(graph: &mut Graph, uow: &mut U, roots: &[EntityRef]) -> Result<CascadeReport>
where
    U: UnitOfWork + ?Sized,
{
    let request_id = RequestId::new();
    let start = Instant::now();
    log_op_start!("persist", request_id = %request_id, root_count = roots.len());

    match run_cascade(graph, uow, roots, request_id.clone()) {
        Ok(report) => {
            log_op_end!(
                "persist",
                duration_ms = start.elapsed().as_millis() as u64,
                request_id = %request_id,
                rows_written = report.total_rows()
            );
            Ok(report)
        }
        Err(err) => {
            log_op_error!(
                "persist",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                request_id = %request_id
            );
            Err(err)
        }
    }
}

fn run_cascade<U>(
    graph: &mut Graph,
    uow: &mut U,
    roots: &[EntityRef],
    request_id: RequestId,
) -> Result<CascadeReport>
where
    U: UnitOfWork + ?Sized,
{
    validate_graph(graph)?;
    let plan = plan_cascade(graph, roots)?;
    let mut report = CascadeReport::new(request_id);
    if plan.is_empty() {
        return Ok(report);
    }

    let mut registry = IdentityRegistry::new();
    let mut scope = TransactionScope::begin(uow)?;

    for step in plan.steps() {
        if let Err(err) = execute_step(graph, scope.uow(), &mut registry, *step) {
            let err = attribute_failure(graph, *step, err);
            registry.discard(graph);
            if let Err(rollback_err) = scope.rollback() {
                tracing::warn!(error = %rollback_err, "rollback after failed write also failed");
            }
            return Err(err);
        }
        *report.rows_written.entry(step.table()).or_insert(0) += 1;
        report.steps.push(*step);
    }

    if let Err(err) = scope.commit() {
        registry.discard(graph);
        return Err(err);
    }
    registry.commit();
    for entity in plan.closure() {
        graph.mark_persisted(*entity)?;
    }
    Ok(report)
}

/// Backend rejections become `WriteFailed` naming what was being written
fn attribute_failure(graph: &Graph, step: WriteStep, err: PetStoreError) -> PetStoreError {
    match err {
        PetStoreError::Backend { message, .. } => PetStoreError::WriteFailed {
            entity: graph.describe(step.entity()),
            table: step.table().to_string(),
            reason: message,
        },
        other => other,
    }
}

fn require_id(graph: &Graph, holder: EntityRef, target: EntityRef) -> Result<EntityId> {
    graph
        .identity_of(target)?
        .ok_or_else(|| PetStoreError::UnresolvedReference {
            entity: graph.describe(holder),
            target: graph.describe(target),
        })
}

fn address_fk(graph: &Graph, store: StoreKey, address: Option<AddressKey>) -> Result<Option<EntityId>> {
    address
        .map(|a| require_id(graph, store.into(), a.into()))
        .transpose()
}

fn store_fk(graph: &Graph, holder: EntityRef, store: Option<StoreKey>) -> Result<Option<EntityId>> {
    store.map(|s| require_id(graph, holder, s.into())).transpose()
}

fn execute_step<U>(
    graph: &mut Graph,
    uow: &mut U,
    registry: &mut IdentityRegistry,
    step: WriteStep,
) -> Result<()>
where
    U: UnitOfWork + ?Sized,
{
    let entity = step.entity();
    match step {
        WriteStep::Address { address } => {
            let row = address_row(graph.address(address)?);
            let id = uow.insert(&row)?;
            registry.assign_identity(graph, entity, id)?;
        }
        WriteStep::Store { store } => {
            let value = graph.store(store)?;
            let address_id = address_fk(graph, store, value.address())?;
            let row = store_row(value, address_id);
            let id = uow.insert(&row)?;
            registry.assign_identity(graph, entity, id)?;
        }
        WriteStep::AnimalBase { animal } => {
            let value = graph.animal(animal)?;
            let store_id = store_fk(graph, entity, value.store())?;
            let row = base_row(value, store_id);
            let id = uow.insert(&row)?;
            registry.assign_identity(graph, entity, id)?;
        }
        WriteStep::AnimalVariant { animal, .. } => {
            let id = require_id(graph, entity, entity)?;
            let row = variant_row(graph.animal(animal)?, id);
            uow.insert(&row)?;
        }
        WriteStep::Product { product } => {
            let row = product_row(graph.product(product)?)?;
            let id = uow.insert(&row)?;
            registry.assign_identity(graph, entity, id)?;
        }
        WriteStep::AnimalRehome { store, .. } => {
            let id = require_id(graph, entity, entity)?;
            let store_id = store_fk(graph, entity, store)?;
            uow.update(step.table(), id, &[("store_id", SqlValue::from(store_id))])?;
        }
        WriteStep::StoreRelocate { store, address } => {
            let id = require_id(graph, entity, entity)?;
            let address_id = address_fk(graph, store, address)?;
            uow.update(step.table(), id, &[("address_id", SqlValue::from(address_id))])?;
        }
        WriteStep::StoreProduct { store, product } => {
            let store_id = require_id(graph, store.into(), store.into())?;
            let product_id = require_id(graph, store.into(), product.into())?;
            uow.insert(&store_product_row(store_id, product_id))?;
        }
        WriteStep::StoreProductUnlink { store, product } => {
            let store_id = require_id(graph, store.into(), store.into())?;
            let product_id = require_id(graph, store.into(), product.into())?;
            uow.delete(&store_product_row(store_id, product_id))?;
        }
    }

    tracing::debug!(
        table = step.table(),
        entity = %graph.describe(entity),
        "row written"
    );
    Ok(())
}
