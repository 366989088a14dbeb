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

use std::collections::BTreeSet;

use crate::config::QueryConfig;
use crate::error::{QueryError, QueryResult};
use crate::graph::{Combinator, FilterNode, InputNode, NodeId, NodeKind, Snapshot};
use crate::store::{ComponentStore, EntityId, Tick};

/// The arena owning every filter node.
///
/// Nodes are never removed: cursors and accessors only hold [`NodeId`]s, so a
/// node's memoized results are shared by every query chain that reaches it.
#[derive(Debug, Default)]
pub struct QueryGraph {
    nodes: Vec<FilterNode>,
    config: QueryConfig,
}

impl QueryGraph {
    /// Creates an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty graph using `config` for evaluation decisions.
    pub fn with_config(config: QueryConfig) -> Self {
        Self {
            nodes: Vec::new(),
            config,
        }
    }

    /// Returns the number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node has been registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Registers a leaf node with an empty cache.
    ///
    /// No deduplication is performed: registering the same condition twice
    /// yields two independent nodes.
    pub fn add_input_node(&mut self, spec: InputNode) -> NodeId {
        let id = self.next_id();
        let node = FilterNode::input(id, spec);
        log::debug!("Registered filter node {id}: {}", node.name);
        self.nodes.push(node);
        id
    }

    /// Registers a node combining two existing nodes.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownNode`] if either id was not issued by this graph.
    pub fn add_complex_node(
        &mut self,
        left: NodeId,
        right: NodeId,
        combinator: Combinator,
    ) -> QueryResult<NodeId> {
        self.node(left)?;
        self.node(right)?;
        Ok(self.combine(left, right, combinator))
    }

    /// Registers a complex node over ids already known to be valid.
    pub(crate) fn combine(&mut self, left: NodeId, right: NodeId, combinator: Combinator) -> NodeId {
        let id = self.next_id();
        let node = FilterNode::complex(
            id,
            &self.nodes[left.index()],
            &self.nodes[right.index()],
            combinator,
        );
        log::debug!("Registered filter node {id}: {}", node.name);
        self.nodes.push(node);
        id
    }

    /// Looks up a node by id.
    pub fn node(&self, id: NodeId) -> QueryResult<&FilterNode> {
        self.nodes.get(id.index()).ok_or(QueryError::UnknownNode(id))
    }

    /// Brings a node (and, for complex nodes, its inputs) up to date with the
    /// store and returns its snapshot.
    ///
    /// Only entities whose declared dependencies changed since the node's last
    /// evaluation are re-tested; everything else is served from the cache.
    pub fn evaluate(&mut self, id: NodeId, store: &dyn ComponentStore) -> QueryResult<&Snapshot> {
        self.node(id)?;
        let now = store.current_tick();

        // Post-order walk so inputs are refreshed before the nodes combining them.
        let mut stack = vec![(id, false)];
        while let Some((current, inputs_ready)) = stack.pop() {
            let node = &self.nodes[current.index()];
            if node.evaluated_at == Some(now) {
                continue;
            }
            match (node.inputs(), inputs_ready) {
                (Some((left, right, _)), false) => {
                    stack.push((current, true));
                    stack.push((right, false));
                    stack.push((left, false));
                }
                _ => self.refresh(current, store, now),
            }
        }

        Ok(&self.nodes[id.index()].snapshot)
    }

    fn refresh(&mut self, id: NodeId, store: &dyn ComponentStore, now: Tick) {
        let node = &self.nodes[id.index()];
        let dirty = node
            .evaluated_at
            .and_then(|since| Self::dirty_entities(node, store, since))
            .filter(|dirty| dirty.len() <= self.config.rescan_threshold(store.len()));

        let full_rescan = dirty.is_none();
        let candidates = match dirty {
            Some(dirty) => dirty.into_iter().collect(),
            None => store.entities(),
        };

        // `None` marks an entity that is gone from the store.
        let outcomes: Vec<(EntityId, Option<bool>)> = candidates
            .into_iter()
            .map(|entity| {
                let outcome = store
                    .contains(entity)
                    .then(|| self.compute(node, store, entity));
                (entity, outcome)
            })
            .collect();

        let node = &mut self.nodes[id.index()];
        if full_rescan {
            node.reset();
        }
        let mut tested = 0;
        for (entity, outcome) in outcomes {
            match outcome {
                Some(value) => {
                    node.store_value(entity, value);
                    tested += 1;
                }
                None => node.forget(entity),
            }
        }
        node.tests_run += tested;
        node.evaluated_at = Some(now);

        log::trace!(
            "Evaluated filter node {id} at tick {}: {tested} entities tested{}, {} passing.",
            now.0,
            if full_rescan { " (full rescan)" } else { "" },
            node.snapshot.len()
        );
    }

    fn compute(&self, node: &FilterNode, store: &dyn ComponentStore, entity: EntityId) -> bool {
        match &node.kind {
            NodeKind::Input(test) => test(store, entity),
            NodeKind::Complex {
                left,
                right,
                combinator,
            } => combinator.apply(
                self.nodes[left.index()].passes(entity),
                self.nodes[right.index()].passes(entity),
            ),
        }
    }

    /// Entities that may have changed result since `since`, or `None` if the
    /// store no longer remembers that far back.
    fn dirty_entities(
        node: &FilterNode,
        store: &dyn ComponentStore,
        since: Tick,
    ) -> Option<BTreeSet<EntityId>> {
        let mut dirty = store.structural_changes_since(since)?;
        for dependency in &node.dependencies {
            dirty.extend(store.changed_since(dependency, since)?);
        }
        Some(dirty)
    }

    fn next_id(&self) -> NodeId {
        NodeId::new(self.nodes.len() as u32)
    }
}
