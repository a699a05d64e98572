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

//! Builds the `env` module a policy instance imports: linear memory,
//! `opa_abort`, `opa_println`, and the `opa_builtin0..4` trampolines
//!.
//!
//! Every closure registered here captures only a [`Memory`] and a
//! handle to the not-yet-constructed [`BuiltinTable`] — never the `Vm`
//! that owns this linker, which would create a reference cycle between
//! the instance and its own host state.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::OnceCell;
use wasmtime::{AsContextMut, Caller, Linker, Memory, MemoryType};

use crate::{abi::NulStr, builtin_table::BuiltinTable, error::AbortSignal, EvaluationContext};

/// Allocate the linear memory a fresh instance imports (2 pages minimum,
/// growable, matching the OPA wasm ABI's expectations).
pub(crate) async fn new_memory<T: Send>(mut store: impl AsContextMut<Data = T>) -> Result<Memory> {
    let ty = MemoryType::new(2, None);
    Memory::new_async(&mut store, ty).await
}

fn read_message<T>(caller: &Caller<'_, T>, memory: &Memory, addr: i32) -> Result<String> {
    let addr = NulStr(addr);
    let msg = addr.read(caller, memory)?;
    Ok(msg.to_string_lossy().into_owned())
}

/// Register the `env` namespace on `linker`: memory, `opa_abort`,
/// `opa_println`, and the builtin trampolines. `table` starts empty and
/// is filled in by the caller right after instantiation, once
/// `builtins()` has been read back from the instance — the trampolines
/// only need it once a builtin is actually called during `eval`.
pub(crate) fn register<T: Send, C: EvaluationContext>(
    mut store: impl AsContextMut<Data = T>,
    linker: &mut Linker<T>,
    memory: Memory,
    table: Arc<OnceCell<BuiltinTable<C>>>,
) -> Result<()> {
    linker.define(&mut store, "env", "memory", memory)?;

    linker.func_wrap(
        "env",
        "opa_abort",
        move |caller: Caller<'_, T>, addr: i32| -> Result<(), anyhow::Error> {
            let msg = read_message(&caller, &memory, addr)?;
            tracing::error!("opa_abort: {}", msg);
            Err(AbortSignal(msg).into())
        },
    )?;

    linker.func_wrap(
        "env",
        "opa_println",
        move |caller: Caller<'_, T>, addr: i32| -> Result<(), anyhow::Error> {
            let msg = read_message(&caller, &memory, addr)?;
            tracing::info!("opa_println: {}", msg);
            Ok(())
        },
    )?;

    macro_rules! builtin_trampoline {
        ($wrap:ident, $name:literal, [$($param:ident),*]) => {{
            let table = table.clone();
            linker.$wrap(
                "env",
                $name,
                move |caller: Caller<'_, T>, builtin_id: i32, _ctx: i32, $($param: i32),*| {
                    let table = table.clone();
                    Box::new(async move {
                        table
                            .get()
                            .expect("builtin table not initialized before first eval")
                            .dispatch(caller, &memory, builtin_id, [$($param),*])
                            .await
                    })
                },
            )?;
        }};
    }

    builtin_trampoline!(func_wrap2_async, "opa_builtin0", []);
    builtin_trampoline!(func_wrap3_async, "opa_builtin1", [param1]);
    builtin_trampoline!(func_wrap4_async, "opa_builtin2", [param1, param2]);
    builtin_trampoline!(func_wrap5_async, "opa_builtin3", [param1, param2, param3]);
    builtin_trampoline!(
        func_wrap6_async,
        "opa_builtin4",
        [param1, param2, param3, param4]
    );

    Ok(())
}
