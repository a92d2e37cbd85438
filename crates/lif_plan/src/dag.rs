//! Synthesis ordering and dependency edges.
//!
//! Data stores are materialized first: their credentials must exist before
//! any compute unit resolves a reference to them. Compute units may in turn
//! reference each other, so they are ordered topologically over the
//! references discovered in their fields.

use crate::graph::{ComputeUnitSpec, ResourceGraph};
use indexmap::{IndexMap, IndexSet};
use lif_core::{CoreError, CoreResult, ResourceId, ResourceKind};
use serde::{Deserialize, Serialize};

/// Startup condition of a dependency edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyCondition {
    /// Producer must report healthy
    ServiceHealthy,
    /// Producer must have started
    ServiceStarted,
}

impl DependencyCondition {
    /// Condition used for a producer of the given kind
    #[must_use]
    pub const fn for_producer(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::DataStore => Self::ServiceHealthy,
            ResourceKind::ComputeUnit => Self::ServiceStarted,
        }
    }
}

/// A startup dependency from a consumer on a producer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Resource that must wait
    pub consumer: ResourceId,
    /// Resource waited on
    pub producer: ResourceId,
    /// Condition the producer must reach
    pub condition: DependencyCondition,
}

/// Order in which resources are synthesized
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisOrder {
    /// Data stores, in declaration order
    pub data_stores: Vec<ResourceId>,
    /// Compute units, producers before consumers
    pub compute_units: Vec<ResourceId>,
}

impl SynthesisOrder {
    /// All resources in synthesis order
    pub fn iter(&self) -> impl Iterator<Item = &ResourceId> {
        self.data_stores.iter().chain(self.compute_units.iter())
    }
}

/// Orders synthesis and derives dependency edges
pub struct DependencyOrderer;

impl DependencyOrderer {
    /// Compute the synthesis order of a graph
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CyclicReference`] if compute units reference
    /// each other in a cycle
    pub fn order(graph: &ResourceGraph) -> CoreResult<SynthesisOrder> {
        let data_stores: Vec<ResourceId> = graph.data_stores().cloned().collect();

        // Compute-unit producers of each compute unit; dangling references
        // are left to the resolver.
        let mut pending: IndexMap<&ResourceId, IndexSet<ResourceId>> = graph
            .compute_units()
            .map(|(id, spec)| {
                let producers = spec
                    .references()
                    .filter_map(|r| graph.get(&r.target))
                    .filter(|decl| decl.kind() == ResourceKind::ComputeUnit)
                    .map(|decl| decl.id.clone())
                    .collect();
                (id, producers)
            })
            .collect();

        let mut compute_units = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let ready = pending
                .iter()
                .position(|(_, producers)| producers.is_empty());
            let Some(index) = ready else {
                return Err(CoreError::CyclicReference {
                    cycle: find_cycle(&pending),
                });
            };
            let Some((id, _)) = pending.shift_remove_index(index) else {
                break;
            };
            for producers in pending.values_mut() {
                producers.shift_remove(id);
            }
            compute_units.push(id.clone());
        }

        Ok(SynthesisOrder {
            data_stores,
            compute_units,
        })
    }

    /// Dependency edges of one compute unit, one per producer
    #[must_use]
    pub fn edges_for(
        graph: &ResourceGraph,
        consumer: &ResourceId,
        spec: &ComputeUnitSpec,
    ) -> Vec<DependencyEdge> {
        let mut seen = IndexSet::new();
        spec.references()
            .filter_map(|r| graph.get(&r.target))
            .filter(|decl| seen.insert(decl.id.clone()))
            .map(|decl| DependencyEdge {
                consumer: consumer.clone(),
                producer: decl.id.clone(),
                condition: DependencyCondition::for_producer(decl.kind()),
            })
            .collect()
    }
}

/// Walk unresolved producers from the first pending unit until one repeats
fn find_cycle(pending: &IndexMap<&ResourceId, IndexSet<ResourceId>>) -> Vec<String> {
    let mut path: Vec<&ResourceId> = Vec::new();
    let mut current = pending.keys().next().copied();
    while let Some(id) = current {
        if let Some(start) = path.iter().position(|p| *p == id) {
            let mut cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
            cycle.push(id.to_string());
            return cycle;
        }
        path.push(id);
        current = pending
            .get(id)
            .and_then(|producers| producers.first())
            .and_then(|next| pending.get_key_value(next).map(|(k, _)| *k));
    }
    path.iter().map(ToString::to_string).collect()
}
