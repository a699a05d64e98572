// Copyright 2022 The Matrix.org Foundation C.I.C.
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

//! Builtins for reasoning about graphs expressed as adjacency objects

use std::collections::{HashSet, VecDeque};

use anyhow::{Context, Result};
use serde_json::Value;

/// Computes the set of nodes reachable from a root, for each root, given a
/// `graph` object mapping each node to the array of its direct neighbours.
/// For example, given
/// `graph.reachable_paths({"a": ["b"], "b": ["c"], "c": []}, {"a"})`,
/// this returns `{"a": ["a", "b", "c"]}`.
#[tracing::instrument(name = "graph.reachable_paths", err)]
pub fn reachable_paths(graph: Value, roots: HashSet<String>) -> Result<Value> {
    let graph = graph.as_object().context("graph must be an object")?;

    let mut result = serde_json::Map::with_capacity(roots.len());
    for root in roots {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(root.clone());
        visited.insert(root.clone());

        while let Some(node) = queue.pop_front() {
            let Some(neighbours) = graph.get(&node) else {
                continue;
            };
            let neighbours = neighbours
                .as_array()
                .with_context(|| format!("neighbours of {node:?} must be an array"))?;

            for neighbour in neighbours {
                let neighbour = neighbour
                    .as_str()
                    .context("neighbour must be a string")?
                    .to_owned();
                if visited.insert(neighbour.clone()) {
                    queue.push_back(neighbour);
                }
            }
        }

        let mut visited: Vec<_> = visited.into_iter().collect();
        visited.sort_unstable();
        result.insert(root, Value::Array(visited.into_iter().map(Value::String).collect()));
    }

    Ok(Value::Object(result))
}
