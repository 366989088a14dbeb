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

use std::collections::{BTreeSet, HashMap};

use crate::store::{EntityId, Tick};

/// Append-only record of which entities changed, keyed by component name.
///
/// Entries are pushed in tick order, so every per-key list stays sorted and
/// "changed since" lookups are a binary search plus a scan of the tail.
#[derive(Debug, Default, Clone)]
pub(crate) struct ChangeLog {
    by_component: HashMap<String, Vec<(Tick, EntityId)>>,
    /// Spawns and despawns.
    structural: Vec<(Tick, EntityId)>,
    /// Ticks at or below the floor have been discarded.
    floor: Tick,
    len: usize,
}

impl ChangeLog {
    pub fn record(&mut self, tick: Tick, entity: EntityId, component: &str) {
        match self.by_component.get_mut(component) {
            Some(entries) => entries.push((tick, entity)),
            None => {
                self.by_component
                    .insert(component.to_owned(), vec![(tick, entity)]);
            }
        }
        self.len += 1;
    }

    pub fn record_structural(&mut self, tick: Tick, entity: EntityId) {
        self.structural.push((tick, entity));
        self.len += 1;
    }

    /// Entities whose `component` changed strictly after `tick`.
    ///
    /// Returns `None` if that range has already been compacted away.
    pub fn since(&self, component: &str, tick: Tick) -> Option<BTreeSet<EntityId>> {
        if tick < self.floor {
            return None;
        }
        Some(
            self.by_component
                .get(component)
                .map(|entries| Self::tail(entries, tick))
                .unwrap_or_default(),
        )
    }

    pub fn structural_since(&self, tick: Tick) -> Option<BTreeSet<EntityId>> {
        if tick < self.floor {
            return None;
        }
        Some(Self::tail(&self.structural, tick))
    }

    /// Drops every entry and moves the floor up to `tick`.
    pub fn compact(&mut self, tick: Tick) {
        self.by_component.clear();
        self.structural.clear();
        self.floor = tick;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    fn tail(entries: &[(Tick, EntityId)], tick: Tick) -> BTreeSet<EntityId> {
        let start = entries.partition_point(|(t, _)| *t <= tick);
        entries[start..].iter().map(|(_, entity)| *entity).collect()
    }
}
