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

//! Builtins for hex encoding and decoding

use anyhow::Result;

/// Decodes a hex-encoded string into raw bytes, returned as the equivalent
/// Latin-1 string (matching the Go implementation's `string(decoded)`).
#[tracing::instrument(name = "hex.decode", err)]
pub fn decode(x: String) -> Result<String> {
    let bytes = hex::decode(x)?;
    Ok(bytes.into_iter().map(char::from).collect())
}

/// Serializes the input string into hex encoding.
#[tracing::instrument(name = "hex.encode")]
pub fn encode(x: String) -> String {
    hex::encode(x)
}
