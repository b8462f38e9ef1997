// SPDX-License-Identifier: MIT

//! Dependency graph over the units of one run
//!
//! Building the graph rejects duplicate ids, blank ids and self-edges.
//! Edges to unknown ids and cycles are accepted here; the engine notices
//! them when nothing is ready and finalizes the affected units.

use crate::adk::error::ValidationError;
use crate::flow::types::{UnitId, WorkUnit};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Ids in registration order
    order: Vec<UnitId>,
    position: HashMap<UnitId, usize>,
    dependencies: HashMap<UnitId, Vec<UnitId>>,
    /// Reverse edges, including edges from unknown ids
    dependents: HashMap<UnitId, Vec<UnitId>>,
}

impl DependencyGraph {
    pub fn build(units: &[WorkUnit]) -> Result<Self, ValidationError> {
        let mut graph = Self::default();

        for (i, unit) in units.iter().enumerate() {
            if unit.id.trim().is_empty() {
                return Err(ValidationError::EmptyId { position: i + 1 });
            }
            if graph.position.insert(unit.id.clone(), i).is_some() {
                return Err(ValidationError::DuplicateId(unit.id.clone()));
            }
            graph.order.push(unit.id.clone());
        }

        for unit in units {
            let mut seen = HashSet::new();
            let mut deps = Vec::with_capacity(unit.dependencies.len());
            for dep in &unit.dependencies {
                if *dep == unit.id {
                    return Err(ValidationError::SelfDependency(unit.id.clone()));
                }
                if seen.insert(dep.as_str()) {
                    deps.push(dep.clone());
                    graph
                        .dependents
                        .entry(dep.clone())
                        .or_default()
                        .push(unit.id.clone());
                }
            }
            graph.dependencies.insert(unit.id.clone(), deps);
        }

        Ok(graph)
    }

    pub fn all_ids(&self) -> &[UnitId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position.contains_key(id)
    }

    /// 0-based registration index
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.position.get(id).copied()
    }

    /// Direct dependencies, de-duplicated, in declaration order
    pub fn dependencies_of(&self, id: &str) -> &[UnitId] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Units that list `id` as a direct dependency, in registration order
    pub fn dependents_of(&self, id: &str) -> &[UnitId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every unit that transitively depends on `id`, in registration order
    ///
    /// `id` itself is never included, even when it sits on a cycle.
    pub fn descendants_of(&self, id: &str) -> Vec<UnitId> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents_of(current) {
                if dependent != id && visited.insert(dependent.as_str()) {
                    queue.push_back(dependent.as_str());
                }
            }
        }

        self.order
            .iter()
            .filter(|u| visited.contains(u.as_str()))
            .cloned()
            .collect()
    }

    /// Dependencies of `id` that are not units of this graph
    pub fn missing_dependencies_of(&self, id: &str) -> Vec<UnitId> {
        self.dependencies_of(id)
            .iter()
            .filter(|d| !self.contains(d))
            .cloned()
            .collect()
    }

    /// Units with no dependencies
    pub fn roots(&self) -> Vec<UnitId> {
        self.order
            .iter()
            .filter(|id| self.dependencies_of(id).is_empty())
            .cloned()
            .collect()
    }
}
