//! Cascade planning
//!
//! Computes, without touching any backend, the ordered list of row writes
//! that persists everything reachable from a set of roots: inserts for new
//! entities, and updates or join-row removals for saved entities whose
//! links changed since their last commit.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::errors::{PetStoreError, Result};
use crate::mapping::hierarchy::variant_table;
use crate::mapping::tables::{ADDRESS, ANIMAL, PRODUCT, STORE, STORE_PRODUCT};
use crate::model::{AddressKey, AnimalKey, EntityRef, ProductKey, StoreKey, VariantKind};
use crate::ops::Graph;

/// One row write of a cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum WriteStep {
    /// Insert a new address
    Address { address: AddressKey },
    /// Insert a new store
    Store { store: StoreKey },
    /// Insert the base row of a new animal
    AnimalBase { animal: AnimalKey },
    /// Insert the variant row of a new animal
    AnimalVariant { animal: AnimalKey, variant: VariantKind },
    /// Insert a new product
    Product { product: ProductKey },
    /// Point a saved animal at the store now keeping it, or at none
    AnimalRehome { animal: AnimalKey, store: Option<StoreKey> },
    /// Point a saved store at its current address, or at none
    StoreRelocate { store: StoreKey, address: Option<AddressKey> },
    /// Insert a store/product join row
    StoreProduct { store: StoreKey, product: ProductKey },
    /// Remove the join row of a saved pair that was unlinked
    StoreProductUnlink { store: StoreKey, product: ProductKey },
}

impl WriteStep {
    /// Table the step writes to
    pub fn table(&self) -> &'static str {
        match self {
            WriteStep::Address { .. } => ADDRESS.name,
            WriteStep::Store { .. } | WriteStep::StoreRelocate { .. } => STORE.name,
            WriteStep::AnimalBase { .. } | WriteStep::AnimalRehome { .. } => ANIMAL.name,
            WriteStep::AnimalVariant { variant, .. } => variant_table(*variant).name,
            WriteStep::Product { .. } => PRODUCT.name,
            WriteStep::StoreProduct { .. } | WriteStep::StoreProductUnlink { .. } => STORE_PRODUCT.name,
        }
    }

    /// Entity the written row belongs to
    pub fn entity(&self) -> EntityRef {
        match *self {
            WriteStep::Address { address } => address.into(),
            WriteStep::Store { store }
            | WriteStep::StoreRelocate { store, .. }
            | WriteStep::StoreProduct { store, .. }
            | WriteStep::StoreProductUnlink { store, .. } => store.into(),
            WriteStep::AnimalBase { animal }
            | WriteStep::AnimalVariant { animal, .. }
            | WriteStep::AnimalRehome { animal, .. } => animal.into(),
            WriteStep::Product { product } => product.into(),
        }
    }

    /// Whether the step inserts a row rather than updating or removing one
    pub fn is_insert(&self) -> bool {
        !matches!(
            self,
            WriteStep::AnimalRehome { .. }
                | WriteStep::StoreRelocate { .. }
                | WriteStep::StoreProductUnlink { .. }
        )
    }
}

/// Ordered writes of one cascade
#[derive(Debug, Clone, Default)]
pub struct WritePlan {
    closure: Vec<EntityRef>,
    steps: Vec<WriteStep>,
}

impl WritePlan {
    /// Every entity reachable from the roots, in discovery order
    pub fn closure(&self) -> &[EntityRef] {
        &self.closure
    }

    /// Writes in execution order
    pub fn steps(&self) -> &[WriteStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn neighbours(graph: &Graph, entity: EntityRef) -> Result<Vec<EntityRef>> {
    let mut out = Vec::new();
    match entity {
        EntityRef::Address(k) => out.extend(graph.address(k)?.store().map(EntityRef::from)),
        EntityRef::Store(k) => {
            let store = graph.store(k)?;
            out.extend(store.address().map(EntityRef::from));
            out.extend(store.animals().iter().map(|a| EntityRef::from(*a)));
            out.extend(store.products().iter().map(|p| EntityRef::from(*p)));
        }
        EntityRef::Animal(k) => out.extend(graph.animal(k)?.store().map(EntityRef::from)),
        EntityRef::Product(k) => out.extend(graph.product(k)?.stores().iter().map(|s| EntityRef::from(*s))),
    }
    out.extend(graph.departed(entity));
    Ok(out)
}

/// Entities reachable from `roots`, breadth first
///
/// Roots are visited in the order given; each store yields its address,
/// then its animals and products in set order. Links dropped since the
/// last commit are followed too, so the rows still holding them are
/// rewritten.
fn collect_closure(graph: &Graph, roots: &[EntityRef]) -> Result<Vec<EntityRef>> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();

    for root in roots {
        if !seen.insert(*root) {
            continue;
        }
        // validates the root key
        graph.identity_of(*root)?;
        let mut queue = VecDeque::from([*root]);
        while let Some(entity) = queue.pop_front() {
            order.push(entity);
            for next in neighbours(graph, entity)? {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }

    Ok(order)
}

/// Plan the writes that persist every entity reachable from `roots`
///
/// New entities are inserted. A saved animal or store whose store or
/// address differs from its last committed one is updated, and join rows
/// are inserted or removed for every store/product pair linked or unlinked
/// since then.
///
/// Dependencies: an address before the store referencing it, a store before
/// the animals it keeps, an animal's base row before its variant row, and
/// both store and product before their join row. A store taking an address
/// another saved store held waits until that store has let go of it. Among
/// writes whose dependencies are met, the one generated first runs first,
/// so the order follows root order and then each store's animal order.
///
/// # Errors
///
/// * `EntityNotFound` - If a root or a linked key is not in the graph
/// * `Internal` - If the dependency graph has a cycle
pub fn plan_cascade(graph: &Graph, roots: &[EntityRef]) -> Result<WritePlan> {
    let closure = collect_closure(graph, roots)?;

    let mut releases: Vec<WriteStep> = Vec::new();
    let mut steps: Vec<WriteStep> = Vec::new();
    let mut unlinks: Vec<WriteStep> = Vec::new();
    let mut links: Vec<WriteStep> = Vec::new();

    for entity in &closure {
        match *entity {
            EntityRef::Address(address) => {
                if graph.address(address)?.id().is_none() {
                    steps.push(WriteStep::Address { address });
                }
            }
            EntityRef::Store(store) => {
                let value = graph.store(store)?;
                if value.id().is_none() {
                    steps.push(WriteStep::Store { store });
                } else if value.address != value.persisted_address {
                    if let Some(release) = release_before_relocation(graph, store)? {
                        releases.push(release);
                    }
                    steps.push(WriteStep::StoreRelocate {
                        store,
                        address: value.address,
                    });
                }
                for product in value.products.iter().filter(|p| !value.persisted_products.contains(p)) {
                    links.push(WriteStep::StoreProduct {
                        store,
                        product: *product,
                    });
                }
                for product in value.persisted_products.iter().filter(|p| !value.products.contains(p)) {
                    unlinks.push(WriteStep::StoreProductUnlink {
                        store,
                        product: *product,
                    });
                }
            }
            EntityRef::Animal(animal) => {
                let value = graph.animal(animal)?;
                if value.id().is_none() {
                    steps.push(WriteStep::AnimalBase { animal });
                    steps.push(WriteStep::AnimalVariant {
                        animal,
                        variant: value.kind(),
                    });
                } else if value.store != value.persisted_store {
                    steps.push(WriteStep::AnimalRehome {
                        animal,
                        store: value.store,
                    });
                }
            }
            EntityRef::Product(product) => {
                if graph.product(product)?.id().is_none() {
                    steps.push(WriteStep::Product { product });
                }
            }
        }
    }
    let steps: Vec<WriteStep> = releases.into_iter().chain(steps).chain(unlinks).chain(links).collect();

    let ordered = order_steps(graph, &steps)?;
    tracing::debug!(
        closure = closure.len(),
        steps = ordered.len(),
        "cascade planned"
    );
    Ok(WritePlan {
        closure,
        steps: ordered,
    })
}

/// Clear a relocating store's committed address first when another store
/// now holds it, so the unique `address_id` is never claimed twice
fn release_before_relocation(graph: &Graph, store: StoreKey) -> Result<Option<WriteStep>> {
    let value = graph.store(store)?;
    let (Some(old), Some(_)) = (value.persisted_address, value.address) else {
        return Ok(None);
    };
    let claimed = graph.address(old)?.store().is_some_and(|owner| owner != store);
    Ok(claimed.then_some(WriteStep::StoreRelocate { store, address: None }))
}

/// Saved store whose committed row still holds `address`, other than `store`
fn previous_holder(graph: &Graph, address: AddressKey, store: StoreKey) -> Option<WriteStep> {
    graph
        .stores()
        .find(|(key, s)| *key != store && s.persisted_address == Some(address))
        .map(|(holder, _)| WriteStep::StoreRelocate {
            store: holder,
            address: None,
        })
}

/// Steps that must run before `step`, among those in the plan
fn prerequisites(graph: &Graph, step: WriteStep) -> Result<Vec<WriteStep>> {
    let mut deps = Vec::new();
    match step {
        WriteStep::Address { .. } | WriteStep::Product { .. } => {}
        WriteStep::Store { store } => {
            if let Some(address) = graph.store(store)?.address() {
                deps.push(WriteStep::Address { address });
                deps.extend(previous_holder(graph, address, store));
            }
        }
        WriteStep::AnimalBase { animal } => {
            if let Some(store) = graph.animal(animal)?.store() {
                deps.push(WriteStep::Store { store });
            }
        }
        WriteStep::AnimalVariant { animal, .. } => deps.push(WriteStep::AnimalBase { animal }),
        WriteStep::AnimalRehome { store, .. } => {
            deps.extend(store.map(|store| WriteStep::Store { store }));
        }
        WriteStep::StoreRelocate { store, address } => {
            if let Some(address) = address {
                deps.push(WriteStep::Address { address });
                deps.extend(previous_holder(graph, address, store));
            }
        }
        WriteStep::StoreProduct { store, product } => {
            deps.push(WriteStep::Store { store });
            deps.push(WriteStep::Product { product });
        }
        WriteStep::StoreProductUnlink { .. } => {}
    }
    Ok(deps)
}

/// Kahn's algorithm; ready steps leave in generation order
fn order_steps(graph: &Graph, steps: &[WriteStep]) -> Result<Vec<WriteStep>> {
    let position: HashMap<WriteStep, usize> = steps.iter().enumerate().map(|(i, s)| (*s, i)).collect();

    let mut pending = vec![0usize; steps.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];
    for (i, step) in steps.iter().enumerate() {
        for dep in prerequisites(graph, *step)? {
            // already-saved prerequisites are not in the plan
            if let Some(&j) = position.get(&dep) {
                pending[i] += 1;
                dependents[j].push(i);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = pending
        .iter()
        .enumerate()
        .filter(|(_, n)| **n == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut ordered = Vec::with_capacity(steps.len());
    while let Some(Reverse(i)) = ready.pop() {
        ordered.push(steps[i]);
        for &d in &dependents[i] {
            pending[d] -= 1;
            if pending[d] == 0 {
                ready.push(Reverse(d));
            }
        }
    }

    if ordered.len() != steps.len() {
        return Err(PetStoreError::Internal {
            message: format!(
                "write dependencies form a cycle ({} of {} steps ordered)",
                ordered.len(),
                steps.len()
            ),
        });
    }
    Ok(ordered)
}
