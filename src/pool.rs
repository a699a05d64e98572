// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
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

//! Placeholder for a pool of pre-instantiated [`crate::Vm`]s.
//!
//! A single [`crate::Vm`] already serializes concurrent evaluations
//! behind an internal mutex, which is enough for a request handler that
//! can tolerate queueing. A deployment that needs several independent
//! instances of the *same* policy evaluating in parallel — to avoid that
//! queueing under load — would keep a small set of pre-warmed `Vm`s per
//! policy name and hand out whichever is free.
//!
//! That scheduling policy (how many instances to keep warm, how to grow
//! or shrink the pool, what to do when all instances are busy) is
//! deliberately left unspecified here; this type only reserves the name
//! and the shape callers would build against.

/// Reserved for a future pool of pre-warmed [`crate::Vm`]s. Carries no
/// behavior yet.
pub struct Pool;
