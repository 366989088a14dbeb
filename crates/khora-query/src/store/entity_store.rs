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

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;

use crate::store::change_log::ChangeLog;
use crate::store::{EntityId, Tick};

/// Read access to entities and their components, plus the change queries the
/// query graph needs to decide which entities to re-test.
pub trait ComponentStore {
    /// Returns `true` if the entity is currently alive.
    fn contains(&self, entity: EntityId) -> bool;

    /// Returns the value of a named component, if the entity is alive and has it.
    fn component(&self, entity: EntityId, name: &str) -> Option<&Value>;

    /// Returns every live entity, in ascending id order.
    fn entities(&self) -> Vec<EntityId>;

    /// Returns the number of live entities.
    fn len(&self) -> usize;

    /// Returns `true` if no entity is alive.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the tick of the most recent mutation.
    fn current_tick(&self) -> Tick;

    /// Returns entities whose `component` was inserted, overwritten or removed
    /// after `since`, or `None` if that history is no longer available.
    fn changed_since(&self, component: &str, since: Tick) -> Option<BTreeSet<EntityId>>;

    /// Returns entities spawned or despawned after `since`, or `None` if that
    /// history is no longer available.
    fn structural_changes_since(&self, since: Tick) -> Option<BTreeSet<EntityId>>;
}

/// An in-memory entity store keeping dynamically typed components.
#[derive(Debug, Clone)]
pub struct EntityStore {
    /// Live entities and their components, ordered by id.
    entities: BTreeMap<EntityId, HashMap<String, Value>>,
    /// Next id to hand out. Ids are never recycled.
    next_id: u32,
    tick: Tick,
    changes: ChangeLog,
    change_log_limit: usize,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    /// Creates a new, empty `EntityStore` with an unbounded change log.
    pub fn new() -> Self {
        Self::with_change_log_limit(usize::MAX)
    }

    /// Creates an empty store that compacts its change log once it holds more
    /// than `limit` entries.
    pub fn with_change_log_limit(limit: usize) -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 0,
            tick: Tick::default(),
            changes: ChangeLog::default(),
            change_log_limit: limit,
        }
    }

    /// Spawns a new entity with the given components and returns its id.
    pub fn spawn<I, S>(&mut self, components: I) -> EntityId
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let id = EntityId(self.next_id);
        self.next_id += 1;

        let components: HashMap<String, Value> = components
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();

        self.tick = self.tick.next();
        self.changes.record_structural(self.tick, id);
        for name in components.keys() {
            self.changes.record(self.tick, id, name);
        }
        self.entities.insert(id, components);
        self.enforce_change_log_limit();
        id
    }

    /// Spawns an entity with no components.
    pub fn spawn_empty(&mut self) -> EntityId {
        self.spawn(std::iter::empty::<(String, Value)>())
    }

    /// Removes an entity and all of its components.
    ///
    /// Returns `false` if the entity was not alive.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        let Some(components) = self.entities.remove(&entity) else {
            return false;
        };

        self.tick = self.tick.next();
        self.changes.record_structural(self.tick, entity);
        for name in components.keys() {
            self.changes.record(self.tick, entity, name);
        }
        self.enforce_change_log_limit();
        true
    }

    /// Inserts or overwrites a component on a live entity.
    ///
    /// Returns `false` (and changes nothing) if the entity is not alive.
    pub fn insert(&mut self, entity: EntityId, name: impl Into<String>, value: Value) -> bool {
        let Some(components) = self.entities.get_mut(&entity) else {
            return false;
        };

        let name = name.into();
        self.tick = self.tick.next();
        self.changes.record(self.tick, entity, &name);
        components.insert(name, value);
        self.enforce_change_log_limit();
        true
    }

    /// Removes a component from a live entity, returning its previous value.
    pub fn remove(&mut self, entity: EntityId, name: &str) -> Option<Value> {
        let previous = self.entities.get_mut(&entity)?.remove(name)?;

        self.tick = self.tick.next();
        self.changes.record(self.tick, entity, name);
        self.enforce_change_log_limit();
        Some(previous)
    }

    /// Discards the whole change log.
    ///
    /// Anything evaluated before this point has to rescan on its next evaluation.
    pub fn compact(&mut self) {
        log::debug!(
            "Compacting change log: dropping {} entries at tick {}.",
            self.changes.len(),
            self.tick.0
        );
        self.changes.compact(self.tick);
    }

    /// Returns the number of entries currently held in the change log.
    pub fn change_log_len(&self) -> usize {
        self.changes.len()
    }

    fn enforce_change_log_limit(&mut self) {
        if self.changes.len() > self.change_log_limit {
            self.compact();
        }
    }
}

impl ComponentStore for EntityStore {
    fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    fn component(&self, entity: EntityId, name: &str) -> Option<&Value> {
        self.entities.get(&entity)?.get(name)
    }

    fn entities(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    fn len(&self) -> usize {
        self.entities.len()
    }

    fn current_tick(&self) -> Tick {
        self.tick
    }

    fn changed_since(&self, component: &str, since: Tick) -> Option<BTreeSet<EntityId>> {
        self.changes.since(component, since)
    }

    fn structural_changes_since(&self, since: Tick) -> Option<BTreeSet<EntityId>> {
        self.changes.structural_since(since)
    }
}
