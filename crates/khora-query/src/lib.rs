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

//! # Khora Query
//!
//! Composable, incrementally evaluated entity filters.
//!
//! Queries are built by chaining calls on a [`QueryCursor`]. Each call registers
//! filter nodes in the world's [`QueryGraph`], an arena shared by every query
//! over the same [`World`]. Nodes memoize their per-entity results, so asking
//! for a snapshot again only re-tests the entities whose relevant components
//! changed in the [`EntityStore`] since the last evaluation.
//!
//! ```rust
//! # fn main() -> khora_query::QueryResult<()> {
//! use khora_query::World;
//! use serde_json::json;
//!
//! let world = World::new();
//! let orc = world.spawn([("health", json!(10))]);
//! world.spawn([("health", json!(0))]);
//!
//! let alive = world.query().flag(["health"]).filter("health", "!=", 0);
//! assert_eq!(alive.get()?.read::<u32>("health")?, vec![(orc, 10)]);
//! # Ok(())
//! # }
//! ```

mod accessor;
mod config;
mod cursor;
mod error;
pub mod graph;
pub mod store;
mod world;

pub use accessor::ComponentAccessor;
pub use config::QueryConfig;
pub use cursor::QueryCursor;
pub use error::{QueryError, QueryResult};
pub use graph::{
    Combinator, Comparison, FilterSpec, InputNode, NodeId, NodeSummary, Operator, Presence,
    QueryGraph, Snapshot,
};
pub use store::{ComponentStore, EntityId, EntityStore, Tick};
pub use world::World;
