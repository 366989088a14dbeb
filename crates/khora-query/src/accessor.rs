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

use serde::de::DeserializeOwned;

use crate::error::{QueryError, QueryResult};
use crate::graph::{NodeId, Snapshot};
use crate::store::{ComponentStore, EntityId};
use crate::world::{World, WorldState};

/// Typed read access to the components of the entities passing one node.
///
/// Every read evaluates the bound node first, so results always reflect the
/// current store contents.
#[derive(Debug)]
pub struct ComponentAccessor {
    world: World,
    node: NodeId,
}

impl ComponentAccessor {
    pub(crate) fn new(world: World, node: NodeId) -> Self {
        Self { world, node }
    }

    /// The node this accessor reads through.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The entities currently passing the bound node.
    pub fn entities(&self) -> QueryResult<Snapshot> {
        self.world.evaluate(self.node)
    }

    /// The number of entities currently passing the bound node.
    pub fn count(&self) -> QueryResult<usize> {
        Ok(self.entities()?.len())
    }

    /// Reads `component` for every matching entity, in ascending entity order.
    ///
    /// Matching entities without the component are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Decode`] on the first value that does not decode as `T`.
    pub fn read<T: DeserializeOwned>(&self, component: &str) -> QueryResult<Vec<(EntityId, T)>> {
        let mut state = self.world.write();
        let WorldState { store, graph } = &mut *state;
        let snapshot = graph.evaluate(self.node, &*store)?;

        snapshot
            .iter()
            .filter_map(|&entity| store.component(entity, component).map(|value| (entity, value)))
            .map(|(entity, value)| {
                T::deserialize(value)
                    .map(|decoded| (entity, decoded))
                    .map_err(|source| QueryError::Decode {
                        entity,
                        component: component.to_owned(),
                        source,
                    })
            })
            .collect()
    }

    /// Reads `component` for a single entity.
    ///
    /// Returns `Ok(None)` if the entity does not pass the node or lacks the component.
    pub fn read_one<T: DeserializeOwned>(
        &self,
        entity: EntityId,
        component: &str,
    ) -> QueryResult<Option<T>> {
        let mut state = self.world.write();
        let WorldState { store, graph } = &mut *state;
        if !graph.evaluate(self.node, &*store)?.contains(&entity) {
            return Ok(None);
        }

        store
            .component(entity, component)
            .map(|value| {
                T::deserialize(value).map_err(|source| QueryError::Decode {
                    entity,
                    component: component.to_owned(),
                    source,
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Position {
        x: i32,
        y: i32,
    }

    #[test]
    fn reads_typed_components_of_matching_entities() {
        let world = World::new();
        let a = world.spawn([("pos", json!({"x": 1, "y": 2})), ("tag", json!(true))]);
        world.spawn([("pos", json!({"x": 3, "y": 4}))]);
        let c = world.spawn([("tag", json!(true))]);

        let cursor = world.query().flag(["tag"]);
        let components = cursor.get().unwrap();

        assert_eq!(components.count().unwrap(), 2);
        assert_eq!(
            components.read::<Position>("pos").unwrap(),
            vec![(a, Position { x: 1, y: 2 })]
        );
        assert_eq!(components.read::<bool>("tag").unwrap(), vec![(a, true), (c, true)]);
    }

    #[test]
    fn reads_track_store_mutations() {
        let world = World::new();
        let a = world.spawn([("hp", json!(5))]);
        let components = world.query().filter("hp", "!=", 0);
        let components = components.get().unwrap();

        assert_eq!(components.read_one::<u32>(a, "hp").unwrap(), Some(5));
        world.set_component(a, "hp", 0);
        assert_eq!(components.read_one::<u32>(a, "hp").unwrap(), None);
        assert!(components.entities().unwrap().is_empty());
    }

    #[test]
    fn decode_failures_name_the_entity() {
        let world = World::new();
        let a = world.spawn([("hp", json!("lots"))]);
        let cursor = world.query().flag(["hp"]);

        let err = cursor.get().unwrap().read::<u32>("hp").unwrap_err();
        match err {
            QueryError::Decode {
                entity, component, ..
            } => {
                assert_eq!(entity, a);
                assert_eq!(component, "hp");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
