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

//! Tuning knobs for incremental evaluation.

use serde::Deserialize;

use crate::error::QueryResult;

/// Configuration for a [`World`](crate::World) and its query graph.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Fraction of live entities above which a dirty set is discarded in favour of
    /// a full rescan of the node.
    pub rescan_ratio: f32,
    /// Maximum number of change-log entries kept by the store.
    /// Once exceeded, the log is compacted and stale nodes rescan on next evaluation.
    pub change_log_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            rescan_ratio: 0.5,
            change_log_limit: 65_536,
        }
    }
}

impl QueryConfig {
    /// Parses a configuration from a RON document.
    ///
    /// Missing fields fall back to their default values.
    pub fn from_ron_str(source: &str) -> QueryResult<Self> {
        Ok(ron::from_str(source)?)
    }

    /// Returns the largest dirty set that is still worth evaluating incrementally
    /// for a store holding `live_entities` entities.
    pub(crate) fn rescan_threshold(&self, live_entities: usize) -> usize {
        (live_entities as f32 * self.rescan_ratio.max(0.0)) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;

    #[test]
    fn partial_documents_keep_defaults() {
        let config = QueryConfig::from_ron_str("(rescan_ratio: 0.25)").unwrap();
        assert_eq!(config.rescan_ratio, 0.25);
        assert_eq!(config.change_log_limit, QueryConfig::default().change_log_limit);
    }

    #[test]
    fn malformed_documents_are_config_errors() {
        let err = QueryConfig::from_ron_str("(rescan_ratio: \"lots\")").unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
    }

    #[test]
    fn threshold_scales_with_population() {
        let config = QueryConfig {
            rescan_ratio: 0.5,
            ..Default::default()
        };
        assert_eq!(config.rescan_threshold(10), 5);
        assert_eq!(config.rescan_threshold(0), 0);
    }
}
