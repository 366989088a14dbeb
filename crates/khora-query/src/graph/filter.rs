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

//! Leaf filters: the declarative conditions that become input nodes.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::graph::InputNode;
use crate::store::{ComponentStore, EntityId};

/// A per-entity predicate. It must only read the components it declares as
/// dependencies, otherwise cached results can go stale.
pub type EntityTest = Box<dyn Fn(&dyn ComponentStore, EntityId) -> bool + Send + Sync>;

/// A family of leaf filters, instantiated once per component name.
///
/// This is what [`QueryCursor::pipe`](crate::QueryCursor::pipe) takes; the
/// built-in [`Comparison`] and [`Presence`] filters are implemented on top of it.
pub trait FilterSpec {
    /// A human-readable description of the filter applied to `component`.
    fn describe(&self, component: &str) -> String;

    /// Builds the predicate for `component`.
    fn test(&self, component: &str) -> EntityTest;

    /// Builds the input node registered for `component`.
    ///
    /// The node depends on `component` alone.
    fn input_node(&self, component: &str) -> InputNode {
        InputNode {
            name: self.describe(component),
            test: self.test(component),
            dependencies: vec![component.to_owned()],
        }
    }
}

/// A comparison operator for [`Comparison`] filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Strict equality (`==`).
    Eq,
    /// Strict inequality (`!=`).
    Ne,
    /// Any other operator text. Filters built with it never exclude an entity.
    Unrecognized(String),
}

impl FromStr for Operator {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "==" => Operator::Eq,
            "!=" => Operator::Ne,
            other => Operator::Unrecognized(other.to_owned()),
        })
    }
}

impl From<&str> for Operator {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(operator) => operator,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eq => f.write_str("=="),
            Operator::Ne => f.write_str("!="),
            Operator::Unrecognized(text) => f.write_str(text),
        }
    }
}

/// Compares a component against a fixed value.
///
/// An entity that does not have the component fails both `==` and `!=`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub operator: Operator,
    pub value: Value,
}

impl Comparison {
    pub fn new(operator: impl Into<Operator>, value: impl Into<Value>) -> Self {
        Self {
            operator: operator.into(),
            value: value.into(),
        }
    }
}

impl FilterSpec for Comparison {
    fn describe(&self, component: &str) -> String {
        format!("where {component} {} {}", self.operator, self.value)
    }

    fn test(&self, component: &str) -> EntityTest {
        let component = component.to_owned();
        let value = self.value.clone();

        match &self.operator {
            Operator::Eq => Box::new(move |store, entity| {
                store
                    .component(entity, &component)
                    .is_some_and(|current| *current == value)
            }),
            Operator::Ne => Box::new(move |store, entity| {
                store
                    .component(entity, &component)
                    .is_some_and(|current| *current != value)
            }),
            Operator::Unrecognized(text) => {
                log::warn!(
                    "Operator `{text}` on component `{component}` is not recognised; \
                     the filter accepts every entity."
                );
                Box::new(|_, _| true)
            }
        }
    }
}

/// Passes entities that currently have the component, whatever its value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Presence;

impl FilterSpec for Presence {
    fn describe(&self, component: &str) -> String {
        format!("flag({component})")
    }

    fn test(&self, component: &str) -> EntityTest {
        let component = component.to_owned();
        Box::new(move |store, entity| store.component(entity, &component).is_some())
    }
}
