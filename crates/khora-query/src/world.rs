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

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::config::QueryConfig;
use crate::cursor::QueryCursor;
use crate::error::QueryResult;
use crate::graph::{Combinator, InputNode, NodeId, NodeSummary, QueryGraph, Snapshot};
use crate::store::{ComponentStore, EntityId, EntityStore};

#[derive(Debug)]
pub(crate) struct WorldState {
    pub(crate) store: EntityStore,
    pub(crate) graph: QueryGraph,
}

/// A shared handle to an entity store and the query graph built over it.
///
/// Cloning a `World` is cheap and yields another handle to the same state. The
/// graph lives exactly as long as the last handle, cursor or accessor referring
/// to it; nodes are never torn down individually.
///
/// All access goes through an internal lock. Evaluation mutates node caches, so
/// concurrent queries against the same world are serialized.
#[derive(Debug, Clone)]
pub struct World {
    state: Arc<RwLock<WorldState>>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates an empty world with the default configuration.
    pub fn new() -> Self {
        Self::with_config(QueryConfig::default())
    }

    /// Creates an empty world tuned by `config`.
    pub fn with_config(config: QueryConfig) -> Self {
        let state = WorldState {
            store: EntityStore::with_change_log_limit(config.change_log_limit),
            graph: QueryGraph::with_config(config),
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Returns a root cursor: a query with no condition applied yet.
    pub fn query(&self) -> QueryCursor {
        QueryCursor::root(self.clone())
    }

    // --- Store ---

    /// Spawns an entity with the given components.
    pub fn spawn<I, S>(&self, components: I) -> EntityId
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        self.write().store.spawn(components)
    }

    /// Spawns an entity with no components.
    pub fn spawn_empty(&self) -> EntityId {
        self.write().store.spawn_empty()
    }

    /// Removes an entity. Returns `false` if it was not alive.
    pub fn despawn(&self, entity: EntityId) -> bool {
        self.write().store.despawn(entity)
    }

    /// Inserts or overwrites a component. Returns `false` if the entity is not alive.
    pub fn set_component(
        &self,
        entity: EntityId,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> bool {
        self.write().store.insert(entity, name, value.into())
    }

    /// Removes a component, returning its previous value.
    pub fn remove_component(&self, entity: EntityId, name: &str) -> Option<Value> {
        self.write().store.remove(entity, name)
    }

    /// Returns a copy of a component value.
    pub fn component(&self, entity: EntityId, name: &str) -> Option<Value> {
        self.read().store.component(entity, name).cloned()
    }

    pub fn has_entity(&self, entity: EntityId) -> bool {
        self.read().store.contains(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.read().store.len()
    }

    /// Drops the store's change history. Nodes evaluated before this call
    /// rescan on their next evaluation.
    pub fn compact_change_log(&self) {
        self.write().store.compact();
    }

    // --- Graph ---

    /// See [`QueryGraph::add_input_node`].
    pub fn add_input_node(&self, spec: InputNode) -> NodeId {
        self.write().graph.add_input_node(spec)
    }

    /// See [`QueryGraph::add_complex_node`].
    pub fn add_complex_node(
        &self,
        left: NodeId,
        right: NodeId,
        combinator: Combinator,
    ) -> QueryResult<NodeId> {
        self.write().graph.add_complex_node(left, right, combinator)
    }

    /// Returns a summary of a node's metadata and cached state.
    pub fn node(&self, id: NodeId) -> QueryResult<NodeSummary> {
        self.read().graph.node(id).map(NodeSummary::from)
    }

    /// Evaluates a node against the current store contents.
    pub fn evaluate(&self, id: NodeId) -> QueryResult<Snapshot> {
        let mut state = self.write();
        let WorldState { store, graph } = &mut *state;
        graph.evaluate(id, &*store).cloned()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, WorldState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, WorldState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FilterSpec, Presence};
    use serde_json::json;

    #[test]
    fn clones_share_state() {
        let world = World::new();
        let other = world.clone();
        let id = world.spawn([("health", json!(3))]);

        assert!(other.has_entity(id));
        assert_eq!(other.component(id, "health"), Some(json!(3)));
        assert_eq!(other.entity_count(), 1);
    }

    #[test]
    fn component_mutations() {
        let world = World::new();
        let id = world.spawn_empty();

        assert!(world.set_component(id, "name", "orc"));
        assert_eq!(world.component(id, "name"), Some(json!("orc")));
        assert_eq!(world.remove_component(id, "name"), Some(json!("orc")));
        assert!(world.despawn(id));
        assert!(!world.set_component(id, "name", "ghost"));
    }

    #[test]
    fn registry_operations_through_the_handle() {
        let world = World::new();
        let a = world.spawn([("health", json!(1)), ("armor", json!(2))]);
        world.spawn([("health", json!(1))]);

        let health = world.add_input_node(Presence.input_node("health"));
        let armor = world.add_input_node(Presence.input_node("armor"));
        let both = world
            .add_complex_node(health, armor, Combinator::Intersection)
            .unwrap();

        assert_eq!(world.evaluate(both).unwrap(), Snapshot::from([a]));
        let summary = world.node(both).unwrap();
        assert_eq!(summary.inputs, Some((health, armor, Combinator::Intersection)));
        assert_eq!(summary.snapshot, Snapshot::from([a]));
    }

    #[test]
    fn configured_change_log_limit_applies_to_the_store() {
        let world = World::with_config(QueryConfig {
            change_log_limit: 1,
            ..Default::default()
        });
        world.spawn([("health", json!(1))]);
        assert_eq!(world.read().store.change_log_len(), 0);

        world.compact_change_log();
        assert_eq!(world.read().store.change_log_len(), 0);
    }

    #[test]
    fn queries_and_mutations_from_several_threads() {
        fn assert_shareable<T: Send + Sync>() {}
        assert_shareable::<World>();
        assert_shareable::<QueryCursor>();

        // --- 1. SETUP ---
        let world = World::new();
        let ids: Vec<_> = (0..20)
            .map(|i| {
                let team = if i % 2 == 0 { "red" } else { "blue" };
                world.spawn([("health", json!(i + 1)), ("team", json!(team))])
            })
            .collect();
        let alive = world.query().flag(["health"]).filter("health", "!=", 0);
        let red_alive = alive.filter("team", "==", "red");

        // --- 2. ACTION ---
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for &id in &ids[..10] {
                    world.set_component(id, "health", 0);
                }
            });
            for (cursor, range) in [(&alive, 10..=20), (&red_alive, 5..=10)] {
                scope.spawn(move || {
                    for _ in 0..50 {
                        let passing = cursor.evaluate().unwrap().len();
                        assert!(range.contains(&passing), "{passing} outside {range:?}");
                    }
                });
            }
        });

        // --- 3. ASSERTIONS ---
        let survivors: Snapshot = ids[10..].iter().copied().collect();
        assert_eq!(alive.evaluate().unwrap(), survivors);
        let red_survivors: Snapshot = ids[10..].iter().copied().step_by(2).collect();
        assert_eq!(red_alive.evaluate().unwrap(), red_survivors);
        assert_eq!(alive.snapshot(), survivors);
    }
}
