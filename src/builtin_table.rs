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

//! Maps the builtin ids a policy instance reports through `builtins()`
//! to host-side [`Builtin`] implementations, and dispatches calls made
//! through the `opa_builtin0..4` imports.

use std::{collections::HashMap, ffi::CString, fmt};

use anyhow::{Context as _, Result};
use tokio::sync::Mutex;
use tracing::Instrument;
use wasmtime::{AsContextMut, Caller, Memory};

use crate::{
    abi::{Heap, Value},
    builtins::{context::CancelToken, traits::Builtin},
    error::{BuiltinError, Error, HaltSignal},
    funcs::{self, Func},
    EvaluationContext,
};

/// Allocate `value.len()` bytes via the instance's `opa_malloc` and copy
/// a NUL-terminated version of `value` into them. Used to hand a
/// builtin's JSON result back to `opa_json_parse`.
async fn alloc_str<T: Send>(
    opa_malloc: &funcs::OpaMalloc,
    mut caller: impl AsContextMut<Data = T>,
    memory: &Memory,
    value: Vec<u8>,
) -> Result<Heap> {
    let value = CString::new(value)?;
    let value = value.as_bytes_with_nul();
    let heap = opa_malloc.call(&mut caller, value.len()).await?;
    memory.write(
        &mut caller,
        heap.ptr
            .try_into()
            .context("opa_malloc returned an invalid pointer value")?,
        value,
    )?;
    Ok(heap)
}

/// Resolved builtins for one policy instance, plus the per-VM evaluation
/// context they are dispatched against.
pub(crate) struct BuiltinTable<C> {
    builtins: HashMap<i32, (String, Box<dyn Builtin<C>>)>,
    context: Mutex<C>,
}

impl<C> fmt::Debug for BuiltinTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinTable")
            .field("builtins", &self.builtins.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<C> BuiltinTable<C>
where
    C: EvaluationContext,
{
    /// Resolve every `{name: id}` pair reported by the instance's
    /// `builtins()` export. Fails with [`Error::UnknownBuiltin`] on the
    /// first name this harness has no host-side implementation for.
    pub(crate) fn new(map: HashMap<String, i32>, context: C) -> Result<Self, Error> {
        let builtins = map
            .into_iter()
            .map(|(name, id)| {
                let builtin = crate::builtins::resolve(&name)
                    .map_err(|_| Error::UnknownBuiltin(name.clone()))?;
                Ok((id, (name, builtin)))
            })
            .collect::<Result<_, Error>>()?;

        Ok(Self {
            builtins,
            context: Mutex::new(context),
        })
    }

    /// Reseed the evaluation context for a fresh `eval` call and return
    /// the cancel token armed for it, so the caller can wire up a
    /// deadline or propagate an external cancellation request.
    pub(crate) async fn evaluation_start(&self) -> CancelToken {
        self.context.lock().await.evaluation_start()
    }

    /// Dispatch one `opa_builtinN` call: read back each argument as JSON
    /// via `opa_json_dump`, run the host builtin, and write the result
    /// back via `opa_json_parse`.
    ///
    /// A [`BuiltinError::Halt`] or [`BuiltinError::Cancelled`] is
    /// propagated as a hard error, aborting the whole evaluation. Any
    /// other error degrades to address `0` (undefined), per the OPA
    /// wasm non-strict eval contract — the policy sees the builtin call
    /// as simply undefined, not a crash.
    #[tracing::instrument(skip_all, fields(builtin_id))]
    pub(crate) async fn dispatch<T: Send, const N: usize>(
        &self,
        mut caller: Caller<'_, T>,
        memory: &Memory,
        builtin_id: i32,
        args: [i32; N],
    ) -> Result<i32, anyhow::Error> {
        let (name, builtin) = self
            .builtins
            .get(&builtin_id)
            .with_context(|| format!("unknown builtin id {builtin_id}"))?;

        let span = tracing::info_span!("builtin", %name);
        let _enter = span.enter();

        let opa_json_dump = funcs::OpaJsonDump::from_caller(&mut caller)?;
        let opa_json_parse = funcs::OpaJsonParse::from_caller(&mut caller)?;
        let opa_malloc = funcs::OpaMalloc::from_caller(&mut caller)?;
        let opa_free = funcs::OpaFree::from_caller(&mut caller)?;

        let mut args_json = Vec::with_capacity(N);
        for arg in args {
            args_json.push(opa_json_dump.call(&mut caller, &Value(arg)).await?);
        }

        let mut mapped_args = Vec::with_capacity(N);
        for arg_json in &args_json {
            let arg = arg_json.read(&caller, memory)?;
            mapped_args.push(arg.to_bytes());
        }

        let mut ctx = self.context.lock().await;
        let result = (async move { builtin.call(&mut ctx, &mapped_args).await })
            .instrument(tracing::info_span!("builtin.call"))
            .await;

        let ret = match result {
            Ok(bytes) => bytes,
            Err(BuiltinError::Halt(err)) => return Err(HaltSignal(err).into()),
            Err(BuiltinError::Cancelled) => return Err(HaltSignal(anyhow::anyhow!("evaluation cancelled")).into()),
            Err(BuiltinError::Undefined(err)) => {
                tracing::debug!(error = %err, "builtin returned undefined");
                return Ok(0);
            }
        };

        let heap = alloc_str(&opa_malloc, &mut caller, memory, ret).await?;
        let data = opa_json_parse.call(&mut caller, &heap).await?;
        opa_free.call(&mut caller, heap).await?;

        Ok(data.0)
    }
}
