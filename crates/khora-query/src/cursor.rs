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

//! The caller-facing query builder.

use std::sync::OnceLock;

use serde_json::Value;

use crate::accessor::ComponentAccessor;
use crate::error::{QueryError, QueryResult};
use crate::graph::{
    Combinator, Comparison, FilterSpec, InputNode, NodeId, Operator, Presence, Snapshot,
};
use crate::world::World;

/// A handle on "the query so far".
///
/// Every chaining call registers new nodes in the world's [`QueryGraph`](crate::QueryGraph)
/// and returns a *new* cursor; the receiver is left untouched and stays usable.
/// Chaining only ever narrows: each call ANDs its conditions with the node the
/// cursor already represents.
///
/// ```rust
/// # fn main() -> khora_query::QueryResult<()> {
/// use khora_query::World;
/// use serde_json::json;
///
/// let world = World::new();
/// world.spawn([("health", json!(0)), ("name", json!("ghost"))]);
/// let orc = world.spawn([("health", json!(10)), ("name", json!("orc"))]);
///
/// let alive = world.query().flag(["health"]).filter("health", "!=", 0);
/// let names = alive.get()?.read::<String>("name")?;
/// assert_eq!(names, vec![(orc, "orc".to_string())]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct QueryCursor {
    world: World,
    parent: Option<NodeId>,
    components: OnceLock<ComponentAccessor>,
}

impl Clone for QueryCursor {
    /// The clone represents the same node but builds its own accessor.
    fn clone(&self) -> Self {
        Self {
            world: self.world.clone(),
            parent: self.parent,
            components: OnceLock::new(),
        }
    }
}

impl QueryCursor {
    pub(crate) fn root(world: World) -> Self {
        Self {
            world,
            parent: None,
            components: OnceLock::new(),
        }
    }

    /// Keeps entities whose `component` compares to `value` with `operator`.
    ///
    /// Operators other than `==` and `!=` are accepted but never exclude anything.
    pub fn filter(
        &self,
        component: &str,
        operator: impl Into<Operator>,
        value: impl Into<Value>,
    ) -> QueryCursor {
        self.pipe(&Comparison::new(operator, value), [component])
    }

    /// Keeps entities that have every one of `components`.
    pub fn flag<I, S>(&self, components: I) -> QueryCursor
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.pipe(&Presence, components)
    }

    /// Registers one leaf node per component using `filter`, then ANDs them
    /// together with this cursor's node, left to right.
    ///
    /// With no components on a root cursor, this returns an equivalent root cursor.
    pub fn pipe<F, I, S>(&self, filter: &F, components: I) -> QueryCursor
    where
        F: FilterSpec + ?Sized,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Filters may read the world while they build, so nothing is locked yet.
        let inputs: Vec<InputNode> = components
            .into_iter()
            .map(|component| filter.input_node(component.as_ref()))
            .collect();

        let mut state = self.world.write();
        let graph = &mut state.graph;

        let mut ids: Vec<NodeId> = inputs
            .into_iter()
            .map(|input| graph.add_input_node(input))
            .collect();

        if let Some(parent) = self.parent {
            if !ids.contains(&parent) {
                ids.push(parent);
            }
        }

        let Some((&first, rest)) = ids.split_first() else {
            drop(state);
            return self.clone();
        };

        let node = rest.iter().fold(first, |combined, &next| {
            graph.combine(combined, next, Combinator::Intersection)
        });
        drop(state);

        QueryCursor {
            world: self.world.clone(),
            parent: Some(node),
            components: OnceLock::new(),
        }
    }

    /// Returns the component accessor bound to this cursor's node.
    ///
    /// The accessor is created on first call and reused afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NoParent`] on a root cursor.
    pub fn get(&self) -> QueryResult<&ComponentAccessor> {
        let parent = self.parent.ok_or(QueryError::NoParent)?;
        Ok(self
            .components
            .get_or_init(|| ComponentAccessor::new(self.world.clone(), parent)))
    }

    /// The node this cursor represents, `None` for a root cursor.
    pub fn node(&self) -> Option<NodeId> {
        self.parent
    }

    /// The node's snapshot as of its last evaluation, without evaluating it.
    /// A root cursor has an empty snapshot.
    ///
    /// Use [`evaluate`](Self::evaluate) for an up-to-date result.
    pub fn snapshot(&self) -> Snapshot {
        self.parent
            .and_then(|node| self.world.node(node).ok())
            .map(|summary| summary.snapshot)
            .unwrap_or_default()
    }

    /// Evaluates the cursor's node against the current store contents.
    /// A root cursor always yields an empty snapshot.
    pub fn evaluate(&self) -> QueryResult<Snapshot> {
        match self.parent {
            Some(node) => self.world.evaluate(node),
            None => Ok(Snapshot::new()),
        }
    }

    /// The world this cursor queries.
    pub fn world(&self) -> &World {
        &self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chaining_leaves_the_receiver_untouched() {
        let world = World::new();
        let root = world.query();
        let flagged = root.flag(["health"]);

        assert!(root.node().is_none());
        assert!(flagged.node().is_some());
        assert_ne!(flagged.filter("health", "==", 1).node(), flagged.node());
        assert!(flagged.node().is_some());
    }

    #[test]
    fn single_condition_wraps_the_leaf_directly() {
        let world = World::new();
        let cursor = world.query().flag(["health"]);
        let summary = world.node(cursor.node().unwrap()).unwrap();

        assert_eq!(summary.name, "flag(health)");
        assert!(summary.inputs.is_none());
    }

    #[test]
    fn chained_conditions_include_the_parent() {
        let world = World::new();
        let first = world.query().flag(["health"]);
        let second = first.filter("health", "!=", 0);

        let summary = world.node(second.node().unwrap()).unwrap();
        let (left, right, combinator) = summary.inputs.unwrap();
        assert_eq!(combinator, Combinator::Intersection);
        assert_eq!(right, first.node().unwrap());
        assert_eq!(world.node(left).unwrap().name, "where health != 0");
    }

    #[test]
    fn multiple_components_fold_left_to_right() {
        let world = World::new();
        let cursor = world.query().flag(["a", "b", "c"]);

        // a, b, c, and(a, b), and(and(a, b), c)
        let top = world.node(cursor.node().unwrap()).unwrap();
        let (ab, c, _) = top.inputs.unwrap();
        assert_eq!(world.node(c).unwrap().name, "flag(c)");
        let (a, b, _) = world.node(ab).unwrap().inputs.unwrap();
        assert_eq!(world.node(a).unwrap().name, "flag(a)");
        assert_eq!(world.node(b).unwrap().name, "flag(b)");
        assert_eq!(top.dependencies, ["a", "b", "c"]);
    }

    #[test]
    fn empty_condition_lists() {
        let world = World::new();
        let root = world.query().flag(Vec::<&str>::new());
        assert!(root.node().is_none());

        let flagged = world.query().flag(["health"]);
        let same = flagged.flag(Vec::<&str>::new());
        assert_eq!(same.node(), flagged.node());
    }

    #[test]
    fn snapshot_follows_the_node_cache() {
        let world = World::new();
        let a = world.spawn([("health", json!(1))]);
        let cursor = world.query().flag(["health"]);
        assert!(cursor.snapshot().is_empty(), "Nothing has been evaluated yet");
        assert!(world.query().snapshot().is_empty());

        let evaluated = cursor.evaluate().unwrap();
        assert_eq!(evaluated, Snapshot::from([a]));
        assert_eq!(cursor.snapshot(), evaluated);

        // Reading the cached surface does not re-evaluate.
        let b = world.spawn([("health", json!(2))]);
        assert_eq!(cursor.snapshot(), Snapshot::from([a]));
        assert_eq!(cursor.evaluate().unwrap(), Snapshot::from([a, b]));
        assert_eq!(cursor.snapshot(), Snapshot::from([a, b]));
    }

    /// A filter that inspects the world while it is being built.
    struct PopulationAware(World);

    impl FilterSpec for PopulationAware {
        fn describe(&self, component: &str) -> String {
            format!("{component} among {}", self.0.entity_count())
        }

        fn test(&self, component: &str) -> crate::graph::EntityTest {
            Presence.test(component)
        }
    }

    #[test]
    fn filters_may_read_the_world_while_building() {
        let world = World::new();
        let a = world.spawn([("health", json!(1))]);
        world.spawn_empty();

        let cursor = world
            .query()
            .pipe(&PopulationAware(world.clone()), ["health"]);

        let summary = world.node(cursor.node().unwrap()).unwrap();
        assert_eq!(summary.name, "health among 2");
        assert_eq!(cursor.evaluate().unwrap(), Snapshot::from([a]));
    }

    #[test]
    fn get_requires_a_parent() {
        let world = World::new();
        assert!(matches!(world.query().get(), Err(QueryError::NoParent)));
    }

    #[test]
    fn get_is_memoized_per_cursor() {
        let world = World::new();
        let cursor = world.query().flag(["health"]);
        let first = cursor.get().unwrap();
        let second = cursor.get().unwrap();

        assert!(std::ptr::eq(first, second));
        assert_eq!(first.node(), cursor.node().unwrap());
    }
}
