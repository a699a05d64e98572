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

//! A named collection of [`Vm`]s, replacing the process-global mutable
//! `VM` variable the source host used.
//!
//! `Vm` already serializes its own evaluations behind an internal mutex
//! (see [`crate::vm`]), so the registry only needs to protect the
//! *membership* of the map — handing out a cloned `Arc<Vm<C>>` lets two
//! request handlers evaluate two different named policies concurrently
//! while still queuing up behind the same VM if they happen to name the
//! same one.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{builtins::context::DefaultContext, error::Error, vm::Vm, EvaluationContext};

/// Owns a named set of [`Vm`]s.
///
/// # Errors
///
/// Most methods return [`Error::Closed`] when asked to operate on a name
/// that isn't registered — there is no separate "not found" variant, and
/// an absent VM is, from the caller's point of view, indistinguishable
/// from a closed one.
pub struct VmRegistry<C = DefaultContext> {
    /// Registered VMs, keyed by policy name.
    vms: RwLock<HashMap<String, Arc<Vm<C>>>>,
}

impl<C> Default for VmRegistry<C> {
    fn default() -> Self {
        Self {
            vms: RwLock::new(HashMap::new()),
        }
    }
}

impl<C> VmRegistry<C>
where
    C: EvaluationContext,
{
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `vm` under `name`, replacing and dropping whatever was
    /// previously registered there.
    pub async fn insert(&self, name: impl Into<String>, vm: Vm<C>) {
        self.vms.write().await.insert(name.into(), Arc::new(vm));
    }

    /// Look up the VM registered under `name`.
    #[must_use]
    pub async fn get(&self, name: &str) -> Option<Arc<Vm<C>>> {
        self.vms.read().await.get(name).cloned()
    }

    /// Remove and close the VM registered under `name`, if any.
    pub async fn remove(&self, name: &str) -> Option<Arc<Vm<C>>> {
        let vm = self.vms.write().await.remove(name);
        if let Some(vm) = &vm {
            vm.close().await;
        }
        vm
    }

    /// The names currently registered.
    #[must_use]
    pub async fn names(&self) -> Vec<String> {
        self.vms.read().await.keys().cloned().collect()
    }

    /// Look up the VM registered under `name`, failing with
    /// [`Error::Closed`] if it is not present.
    pub async fn require(&self, name: &str) -> Result<Arc<Vm<C>>, Error> {
        self.get(name).await.ok_or(Error::Closed)
    }
}
