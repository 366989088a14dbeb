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

//! The entity/component store the query graph reads from.
//!
//! The graph only depends on the [`ComponentStore`] trait: component lookup by
//! entity and name, plus per-component change queries used for dirty tracking.
//! [`EntityStore`] is the in-memory implementation owned by a [`World`](crate::World).

mod change_log;
mod entity;
mod entity_store;

pub use entity::{EntityId, Tick};
pub use entity_store::{ComponentStore, EntityStore};
