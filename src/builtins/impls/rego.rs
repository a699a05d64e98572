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

//! Builtins for inspecting Rego source at evaluation time

use anyhow::{bail, Result};

/// Returns an AST for the Rego module defined by the input string. Parsing a
/// full Rego module requires shipping the Rego grammar and compiler, which is
/// out of scope for a Wasm evaluation host.
#[tracing::instrument(name = "rego.parse_module", err)]
pub fn parse_module(filename: String, rego: String) -> Result<serde_json::Value> {
    bail!("not implemented");
}
