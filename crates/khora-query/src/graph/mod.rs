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

//! The query graph: a registry of filter nodes and their memoized results.
//!
//! Leaf ("input") nodes wrap a per-entity predicate built from a [`FilterSpec`].
//! Complex nodes combine two existing nodes with a [`Combinator`]. Every node
//! keeps the last boolean it computed for each entity, and evaluation only
//! re-tests entities whose declared dependencies changed in the store since the
//! node was last brought up to date.

mod filter;
mod node;
mod registry;

pub use filter::{Comparison, EntityTest, FilterSpec, Operator, Presence};
pub use node::{Combinator, FilterNode, InputNode, NodeId, NodeSummary, Snapshot};
pub(crate) use node::NodeKind;
pub use registry::QueryGraph;
