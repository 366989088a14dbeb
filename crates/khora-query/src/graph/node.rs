// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Node records stored in the [`QueryGraph`](super::QueryGraph) arena.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::graph::filter::EntityTest;
use crate::store::{EntityId, Tick};

/// The set of entities currently passing a node.
pub type Snapshot = BTreeSet<EntityId>;

/// Identifies a node in a [`QueryGraph`](super::QueryGraph).
///
/// Ids are indices into the graph's arena; they are stable and never reused
/// while the graph is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: u32) -> Self {
        NodeId(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a complex node combines the snapshots of its two inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// Entities passing both inputs (logical AND). Used by every cursor.
    Intersection,
    /// Entities passing either input (logical OR).
    Union,
}

impl Combinator {
    /// Combines the cached results of the two inputs for one entity.
    #[inline]
    pub fn apply(self, left: bool, right: bool) -> bool {
        match self {
            Combinator::Intersection => left && right,
            Combinator::Union => left || right,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Combinator::Intersection => "and",
            Combinator::Union => "or",
        }
    }
}

/// Everything needed to register a leaf node.
pub struct InputNode {
    /// Human-readable description, for debugging only.
    pub name: String,
    /// The predicate evaluated per entity.
    pub test: EntityTest,
    /// Component names the test reads. Changes to these trigger re-testing.
    pub dependencies: Vec<String>,
}

impl fmt::Debug for InputNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputNode")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

pub(crate) enum NodeKind {
    Input(EntityTest),
    Complex {
        left: NodeId,
        right: NodeId,
        combinator: Combinator,
    },
}

/// A registered filter node.
///
/// Everything but the memoization state is fixed at registration.
pub struct FilterNode {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) dependencies: Vec<String>,
    /// Last computed result per entity.
    pub(crate) last_values: HashMap<EntityId, bool>,
    /// Entities whose last value is `true`.
    pub(crate) snapshot: Snapshot,
    pub(crate) evaluated_at: Option<Tick>,
    pub(crate) tests_run: u64,
}

impl FilterNode {
    pub(crate) fn input(id: NodeId, spec: InputNode) -> Self {
        Self::with_kind(id, spec.name, NodeKind::Input(spec.test), spec.dependencies)
    }

    pub(crate) fn complex(
        id: NodeId,
        left: &FilterNode,
        right: &FilterNode,
        combinator: Combinator,
    ) -> Self {
        let mut dependencies = left.dependencies.clone();
        for dependency in &right.dependencies {
            if !dependencies.contains(dependency) {
                dependencies.push(dependency.clone());
            }
        }

        Self::with_kind(
            id,
            format!("{}({}, {})", combinator.keyword(), left.id, right.id),
            NodeKind::Complex {
                left: left.id,
                right: right.id,
                combinator,
            },
            dependencies,
        )
    }

    fn with_kind(id: NodeId, name: String, kind: NodeKind, dependencies: Vec<String>) -> Self {
        Self {
            id,
            name,
            kind,
            dependencies,
            last_values: HashMap::new(),
            snapshot: Snapshot::new(),
            evaluated_at: None,
            tests_run: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Component names this node's result depends on.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Returns the two inputs of a complex node, or `None` for a leaf.
    pub fn inputs(&self) -> Option<(NodeId, NodeId, Combinator)> {
        match self.kind {
            NodeKind::Input(_) => None,
            NodeKind::Complex {
                left,
                right,
                combinator,
            } => Some((left, right, combinator)),
        }
    }

    /// The cached result for one entity, if it has been computed.
    pub fn last_value(&self, entity: EntityId) -> Option<bool> {
        self.last_values.get(&entity).copied()
    }

    /// The snapshot as of the last evaluation. Not refreshed by this call.
    pub fn cached_snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// The store tick this node was last brought up to date with.
    pub fn evaluated_at(&self) -> Option<Tick> {
        self.evaluated_at
    }

    /// Total number of per-entity tests (or combinations) this node has run.
    pub fn tests_run(&self) -> u64 {
        self.tests_run
    }

    pub(crate) fn passes(&self, entity: EntityId) -> bool {
        self.last_values.get(&entity).copied().unwrap_or(false)
    }

    /// Stores a freshly computed result, keeping the snapshot in sync.
    pub(crate) fn store_value(&mut self, entity: EntityId, value: bool) {
        self.last_values.insert(entity, value);
        if value {
            self.snapshot.insert(entity);
        } else {
            self.snapshot.remove(&entity);
        }
    }

    pub(crate) fn forget(&mut self, entity: EntityId) {
        self.last_values.remove(&entity);
        self.snapshot.remove(&entity);
    }

    pub(crate) fn reset(&mut self) {
        self.last_values.clear();
        self.snapshot.clear();
    }
}

impl fmt::Debug for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("snapshot", &self.snapshot)
            .field("evaluated_at", &self.evaluated_at)
            .finish_non_exhaustive()
    }
}

/// A detached, clonable view of a node's metadata and cached state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub id: NodeId,
    pub name: String,
    pub dependencies: Vec<String>,
    pub inputs: Option<(NodeId, NodeId, Combinator)>,
    /// Snapshot as of the last evaluation.
    pub snapshot: Snapshot,
    pub evaluated_at: Option<Tick>,
    pub tests_run: u64,
}

impl From<&FilterNode> for NodeSummary {
    fn from(node: &FilterNode) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
            dependencies: node.dependencies.clone(),
            inputs: node.inputs(),
            snapshot: node.snapshot.clone(),
            evaluated_at: node.evaluated_at,
            tests_run: node.tests_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinators_follow_boolean_logic() {
        assert!(Combinator::Intersection.apply(true, true));
        assert!(!Combinator::Intersection.apply(true, false));
        assert!(Combinator::Union.apply(false, true));
        assert!(!Combinator::Union.apply(false, false));
    }

    #[test]
    fn store_value_keeps_snapshot_in_sync() {
        let test: EntityTest = Box::new(|_, _| true);
        let mut node = FilterNode::input(
            NodeId::new(0),
            InputNode {
                name: "always".into(),
                test,
                dependencies: vec![],
            },
        );

        node.store_value(EntityId(1), true);
        node.store_value(EntityId(2), false);
        assert_eq!(node.cached_snapshot(), &Snapshot::from([EntityId(1)]));
        assert_eq!(node.last_value(EntityId(2)), Some(false));

        node.store_value(EntityId(1), false);
        assert!(node.cached_snapshot().is_empty());

        node.forget(EntityId(2));
        assert_eq!(node.last_value(EntityId(2)), None);
    }
}
