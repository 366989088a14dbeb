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

//! Error types shared by the query graph, cursors and accessors.

use crate::graph::NodeId;
use crate::store::EntityId;

/// A specialized `Result` type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// An error that can occur while building or reading a query.
///
/// Missing entities and missing components are never errors: filters treat them
/// as a failed test so that evaluation over a partially populated store simply
/// excludes them.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Components were requested from a cursor that has no filter applied yet.
    #[error("cannot get components on a query with no parent filter")]
    NoParent,
    /// The graph was handed a node id it never issued.
    #[error("unknown filter node {0}")]
    UnknownNode(NodeId),
    /// A component value could not be decoded into the requested type.
    #[error("failed to decode component `{component}` of entity {entity}: {source}")]
    Decode {
        /// The entity whose component failed to decode.
        entity: EntityId,
        /// The name of the component.
        component: String,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
    /// A configuration document could not be parsed.
    #[error("invalid query configuration: {0}")]
    Config(#[from] ron::error::SpannedError),
}
