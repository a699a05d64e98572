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

//! The policy VM: ties the [`Arena`], [`BuiltinTable`] and typed ABI
//! wrappers together into the construct/eval/patch/close lifecycle
//!.

use std::{collections::HashMap, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, OnceCell};
use wasmtime::{AsContextMut, Linker, Module};

use crate::{
    abi::{AbiVersion, Addr, EntrypointId, Heap, Value},
    arena::Arena,
    builtin_table::BuiltinTable,
    error::{Error, OpaErrorCode},
    funcs::{self, Func},
    host_imports, DefaultContext, EvaluationContext,
};

/// Construction-time configuration for a [`Vm`].
#[derive(Debug, Clone, Copy, Default)]
pub struct VmOptions<'a> {
    /// Initial `data` document. `None` evaluates against an empty object.
    pub data: Option<&'a serde_json::Value>,
}

/// Everything that is rebuilt whenever the underlying policy module is
/// swapped out: the instantiated module's imports/exports and its
/// current data tree.
struct Instance<C> {
    version: AbiVersion,
    arena: Arena,
    table: Arc<OnceCell<BuiltinTable<C>>>,
    entrypoints: HashMap<String, EntrypointId>,

    eval_func: funcs::Eval,
    opa_eval_ctx_new_func: funcs::OpaEvalCtxNew,
    opa_eval_ctx_set_input_func: funcs::OpaEvalCtxSetInput,
    opa_eval_ctx_set_data_func: funcs::OpaEvalCtxSetData,
    opa_eval_ctx_set_entrypoint_func: funcs::OpaEvalCtxSetEntrypoint,
    opa_eval_ctx_get_result_func: funcs::OpaEvalCtxGetResult,
    opa_json_parse_func: funcs::OpaJsonParse,
    opa_json_dump_func: funcs::OpaJsonDump,
    opa_value_parse_func: funcs::OpaValueParse,
    opa_value_add_path_func: funcs::OpaValueAddPath,
    opa_value_remove_path_func: funcs::OpaValueRemovePath,
    opa_eval_func: Option<funcs::OpaEval>,

    data: Value,
    base_heap_ptr: Addr,
    eval_heap_ptr: Addr,
}

impl<C> Instance<C>
where
    C: EvaluationContext,
{
    async fn new<T: Send>(
        mut store: impl AsContextMut<Data = T>,
        module: &Module,
        opts: VmOptions<'_>,
        context: C,
    ) -> Result<Self, Error> {
        let memory = host_imports::new_memory(&mut store)
            .await
            .map_err(Error::InstantiationFailed)?;

        let table = Arc::new(OnceCell::<BuiltinTable<C>>::new());

        let mut linker = Linker::new(store.as_context_mut().engine());
        host_imports::register(&mut store, &mut linker, memory, table.clone())
            .map_err(Error::InstantiationFailed)?;

        let instance = linker
            .instantiate_async(&mut store, module)
            .await
            .map_err(Error::InstantiationFailed)?;

        let version =
            AbiVersion::from_instance(&mut store, &instance).map_err(Error::InstantiationFailed)?;
        tracing::debug!(%version, "instantiated policy module");

        let arena =
            Arena::new(&mut store, memory, &instance).map_err(|err| Error::InstantiationFailed(err.into()))?;

        let opa_json_dump_func = funcs::OpaJsonDump::from_instance(&mut store, &instance)
            .map_err(Error::InstantiationFailed)?;
        let opa_json_parse_func = funcs::OpaJsonParse::from_instance(&mut store, &instance)
            .map_err(Error::InstantiationFailed)?;
        let opa_value_parse_func = funcs::OpaValueParse::from_instance(&mut store, &instance)
            .map_err(Error::InstantiationFailed)?;

        let builtins_value = funcs::Builtins::from_instance(&mut store, &instance)
            .map_err(Error::InstantiationFailed)?
            .call(&mut store)
            .await
            .map_err(Error::InstantiationFailed)?;
        let builtins: HashMap<String, i32> = opa_json_dump_func
            .decode(&mut store, arena.memory(), &builtins_value)
            .await
            .map_err(Error::InstantiationFailed)?;
        table.set(BuiltinTable::new(builtins, context)?).ok();

        let entrypoints_value = funcs::Entrypoints::from_instance(&mut store, &instance)
            .map_err(Error::InstantiationFailed)?
            .call(&mut store)
            .await
            .map_err(Error::InstantiationFailed)?;
        let entrypoints = opa_json_dump_func
            .decode(&mut store, arena.memory(), &entrypoints_value)
            .await
            .map_err(Error::InstantiationFailed)?;

        let opa_eval_func = if version.has_eval_fastpath() {
            Some(
                funcs::OpaEval::from_instance(&mut store, &instance)
                    .map_err(Error::InstantiationFailed)?,
            )
        } else {
            None
        };

        let mut this = Self {
            version,
            arena,
            table,
            entrypoints,

            eval_func: funcs::Eval::from_instance(&mut store, &instance)
                .map_err(Error::InstantiationFailed)?,
            opa_eval_ctx_new_func: funcs::OpaEvalCtxNew::from_instance(&mut store, &instance)
                .map_err(Error::InstantiationFailed)?,
            opa_eval_ctx_set_input_func: funcs::OpaEvalCtxSetInput::from_instance(
                &mut store, &instance,
            )
            .map_err(Error::InstantiationFailed)?,
            opa_eval_ctx_set_data_func: funcs::OpaEvalCtxSetData::from_instance(
                &mut store, &instance,
            )
            .map_err(Error::InstantiationFailed)?,
            opa_eval_ctx_set_entrypoint_func: funcs::OpaEvalCtxSetEntrypoint::from_instance(
                &mut store, &instance,
            )
            .map_err(Error::InstantiationFailed)?,
            opa_eval_ctx_get_result_func: funcs::OpaEvalCtxGetResult::from_instance(
                &mut store, &instance,
            )
            .map_err(Error::InstantiationFailed)?,
            opa_json_parse_func,
            opa_json_dump_func,
            opa_value_parse_func,
            opa_value_add_path_func: funcs::OpaValueAddPath::from_instance(&mut store, &instance)
                .map_err(Error::InstantiationFailed)?,
            opa_value_remove_path_func: funcs::OpaValueRemovePath::from_instance(
                &mut store, &instance,
            )
            .map_err(Error::InstantiationFailed)?,
            opa_eval_func,

            data: Value(0),
            base_heap_ptr: Addr(0),
            eval_heap_ptr: Addr(0),
        };

        // Establish the allocator's resting state before recording the
        // base heap pointer every future reset rewinds to.
        let bootstrap = this
            .arena
            .write(&mut store, &[])
            .await
            .map_err(|err| Error::InstantiationFailed(err.into()))?;
        this.arena
            .free(&mut store, bootstrap)
            .await
            .map_err(|err| Error::InstantiationFailed(err.into()))?;
        this.base_heap_ptr = this
            .arena
            .heap_ptr_get(&mut store)
            .await
            .map_err(|err| Error::InstantiationFailed(err.into()))?;

        this.load_data(&mut store, opts.data).await?;

        Ok(this)
    }

    async fn parse_value<V: Serialize, T: Send>(
        &self,
        mut store: impl AsContextMut<Data = T>,
        value: &V,
    ) -> Result<Value, Error> {
        let json = serde_json::to_vec(value).map_err(|err| Error::Trap(err.into()))?;
        let heap = self.arena.write_cstring(&mut store, json).await?;
        let value = self
            .opa_value_parse_func
            .call(&mut store, &heap)
            .await
            .map_err(Error::Trap)?;
        self.arena.free(&mut store, heap).await?;
        Ok(value)
    }

    /// Reset the heap to its base state and (re)load `data`, an empty
    /// object if `None`. Called at construction and by [`Vm::set_data`].
    async fn load_data<T: Send>(
        &mut self,
        mut store: impl AsContextMut<Data = T>,
        data: Option<&serde_json::Value>,
    ) -> Result<(), Error> {
        self.arena
            .heap_ptr_set(&mut store, &self.base_heap_ptr)
            .await?;

        let empty = serde_json::Value::Object(serde_json::Map::new());
        let data = data.unwrap_or(&empty);
        self.data = self.parse_value(&mut store, data).await?;
        self.eval_heap_ptr = self.arena.heap_ptr_get(&mut store).await?;
        Ok(())
    }
}

/// A running policy instance. Construction, evaluation, incremental data
/// patches and teardown are all async since they all cross the Wasm
/// boundary at least once.
///
/// `Vm` carries its own interior mutability: [`Vm::set_data`] may need
/// to rebuild the instance entirely (a policy swap), so every method
/// locks an internal mutex rather than taking `&mut self`.
pub struct Vm<C> {
    inner: Mutex<Option<Instance<C>>>,
}

impl Vm<DefaultContext> {
    /// Build a [`Vm`] with the default evaluation context.
    ///
    /// # Errors
    ///
    /// See [`Vm::new_with_context`].
    pub async fn new<T: Send>(
        store: impl AsContextMut<Data = T>,
        module: &Module,
        opts: VmOptions<'_>,
    ) -> Result<Self, Error> {
        Self::new_with_context(store, module, opts, DefaultContext::default()).await
    }
}

impl<C> Vm<C>
where
    C: EvaluationContext,
{
    /// Build a [`Vm`] with a caller-supplied evaluation context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InstantiationFailed`] if the module is malformed,
    /// built against a different [`wasmtime::Engine`], or missing an
    /// export this harness requires.
    pub async fn new_with_context<T: Send>(
        mut store: impl AsContextMut<Data = T>,
        module: &Module,
        opts: VmOptions<'_>,
        context: C,
    ) -> Result<Self, Error> {
        let instance = Instance::new(&mut store, module, opts, context).await?;
        Ok(Self {
            inner: Mutex::new(Some(instance)),
        })
    }

    async fn with_ready<R>(&self, f: impl FnOnce(&mut Instance<C>) -> R) -> Result<R, Error> {
        let mut guard = self.inner.lock().await;
        let instance = guard.as_mut().ok_or(Error::Closed)?;
        Ok(f(instance))
    }

    /// The entrypoints this policy module exports, keyed by their Rego
    /// package path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the VM was already closed.
    pub async fn entrypoints(&self) -> Result<HashMap<String, EntrypointId>, Error> {
        self.with_ready(|i| i.entrypoints.clone()).await
    }

    /// The ABI version negotiated with the module.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the VM was already closed.
    pub async fn abi_version(&self) -> Result<AbiVersion, Error> {
        self.with_ready(|i| i.version).await
    }

    /// Evaluate `entrypoint` against `input`, with no deadline.
    ///
    /// # Errors
    ///
    /// See [`Vm::eval_with_deadline`].
    pub async fn eval<V, R, T>(
        &self,
        store: impl AsContextMut<Data = T>,
        entrypoint: &str,
        input: Option<&V>,
    ) -> Result<R, Error>
    where
        V: Serialize,
        R: DeserializeOwned,
        T: Send,
    {
        self.eval_with_deadline(store, entrypoint, input, None)
            .await
    }

    /// Evaluate `entrypoint` against `input`. If `deadline` is set, the
    /// evaluation context's cancel token is armed at the start of the
    /// call and tripped by a background timer once `deadline` elapses;
    /// cooperating builtins observing [`EvaluationContext::cancel_token`]
    /// then fail with [`crate::BuiltinError::Cancelled`], which is
    /// treated as a halt and surfaces as [`Error::PolicyBuiltinHalt`].
    /// The Wasm computation itself cannot be preempted, so a deadline
    /// only takes effect at a builtin call boundary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the VM is closed, or any ABI-level
    /// error surfaced during evaluation (trap, builtin halt, policy
    /// abort, malformed result JSON).
    pub async fn eval_with_deadline<V, R, T>(
        &self,
        mut store: impl AsContextMut<Data = T>,
        entrypoint: &str,
        input: Option<&V>,
        deadline: Option<std::time::Duration>,
    ) -> Result<R, Error>
    where
        V: Serialize,
        R: DeserializeOwned,
        T: Send,
    {
        let mut guard = self.inner.lock().await;
        let instance = guard.as_mut().ok_or(Error::Closed)?;

        let entrypoint_id = instance
            .entrypoints
            .get(entrypoint)
            .cloned()
            .ok_or_else(|| Error::Trap(anyhow::anyhow!("unknown entrypoint {entrypoint}")))?;

        let cancel = instance
            .table
            .get()
            .expect("builtin table initialized during construction")
            .evaluation_start()
            .await;

        if let Some(deadline) = deadline {
            std::thread::spawn(move || {
                std::thread::sleep(deadline);
                cancel.cancel();
            });
        }

        if let Some(opa_eval) = &instance.opa_eval_func {
            // §4.5 fast path: no input means `input_addr = 0, input_len
            // = 0`, and the heap pointer handed to `opa_eval` is left at
            // `eval_heap_ptr` since nothing was written past it.
            let (input_heap, heap_ptr) = match input {
                Some(input) => {
                    let input_bytes =
                        serde_json::to_vec(input).map_err(|err| Error::Trap(err.into()))?;

                    let input_heap = Heap {
                        ptr: instance.eval_heap_ptr.0,
                        len: input_bytes
                            .len()
                            .try_into()
                            .map_err(|_| Error::OutOfMemory(None))?,
                        freed: true,
                    };

                    let current_pages = instance.arena.memory().size(&store);
                    let needed_pages = input_heap.pages();
                    if current_pages < needed_pages {
                        instance
                            .arena
                            .memory()
                            .grow_async(&mut store, needed_pages - current_pages)
                            .await
                            .map_err(|err| Error::OutOfMemory(Some(err)))?;
                    }

                    instance
                        .arena
                        .memory()
                        .write(
                            &mut store,
                            input_heap
                                .ptr
                                .try_into()
                                .map_err(|_| Error::OutOfRange)?,
                            &input_bytes,
                        )
                        .map_err(|_| Error::OutOfRange)?;

                    let heap_ptr = Addr(input_heap.end());
                    (input_heap, heap_ptr)
                }
                None => {
                    let input_heap = Heap {
                        ptr: 0,
                        len: 0,
                        freed: true,
                    };
                    let heap_ptr = Addr(instance.eval_heap_ptr.0);
                    (input_heap, heap_ptr)
                }
            };

            let result = opa_eval
                .call(&mut store, &entrypoint_id, &instance.data, &input_heap, &heap_ptr)
                .await
                .map_err(Error::from_eval_trap)?;

            let result = instance
                .arena
                .read_cstring(&store, &result)
                .map_err(Error::from)?;
            serde_json::from_slice(&result).map_err(|err| Error::Trap(err.into()))
        } else {
            instance
                .arena
                .heap_ptr_set(&mut store, &instance.eval_heap_ptr)
                .await?;

            let input_value = match input {
                Some(input) => instance.parse_value(&mut store, input).await?,
                None => instance.parse_value(&mut store, &serde_json::Value::Null).await?,
            };

            let ctx = instance
                .opa_eval_ctx_new_func
                .call(&mut store)
                .await
                .map_err(Error::Trap)?;

            instance
                .opa_eval_ctx_set_data_func
                .call(&mut store, &ctx, &instance.data)
                .await
                .map_err(Error::Trap)?;
            instance
                .opa_eval_ctx_set_input_func
                .call(&mut store, &ctx, &input_value)
                .await
                .map_err(Error::Trap)?;
            instance
                .opa_eval_ctx_set_entrypoint_func
                .call(&mut store, &ctx, &entrypoint_id)
                .await
                .map_err(Error::Trap)?;

            instance
                .eval_func
                .call(&mut store, &ctx)
                .await
                .map_err(Error::from_eval_trap)?;

            let result = instance
                .opa_eval_ctx_get_result_func
                .call(&mut store, &ctx)
                .await
                .map_err(Error::Trap)?;

            instance
                .opa_json_dump_func
                .decode(&mut store, instance.arena.memory(), &result)
                .await
                .map_err(Error::Trap)
        }
    }

    /// Replace the whole `data` document, discarding everything
    /// previously patched in with [`Vm::set_path`]/[`Vm::remove_path`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the VM is closed.
    pub async fn set_data<V: Serialize, T: Send>(
        &self,
        mut store: impl AsContextMut<Data = T>,
        data: &V,
    ) -> Result<(), Error> {
        let data = serde_json::to_value(data).map_err(|err| Error::Trap(err.into()))?;
        let mut guard = self.inner.lock().await;
        let instance = guard.as_mut().ok_or(Error::Closed)?;
        instance.load_data(&mut store, Some(&data)).await
    }

    /// Set the value at `path` in the current data document, growing any
    /// intermediate objects as needed (`opa_value_add_path`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPatch`] if the path or value is rejected
    /// by the policy's own value representation, or [`Error::Closed`].
    pub async fn set_path<V: Serialize, T: Send>(
        &self,
        mut store: impl AsContextMut<Data = T>,
        path: &[&str],
        value: &V,
    ) -> Result<(), Error> {
        let mut guard = self.inner.lock().await;
        let instance = guard.as_mut().ok_or(Error::Closed)?;

        instance
            .arena
            .heap_ptr_set(&mut store, &instance.eval_heap_ptr)
            .await?;

        let value_addr = instance.parse_value(&mut store, value).await?;
        let path_addr = instance.parse_value(&mut store, &path).await?;

        let code = instance
            .opa_value_add_path_func
            .call(&mut store, &instance.data, &path_addr, &value_addr)
            .await
            .map_err(Error::Trap)?;

        // `value_addr` is donated into the data tree either way (on
        // success structurally, on failure as unreferenced garbage the
        // policy's own allocator still owns); `path_addr` is only used
        // for navigation during the call and must be freed ourselves.
        instance.arena.free(&mut store, path_addr.into_heap()).await?;
        instance.eval_heap_ptr = instance.arena.heap_ptr_get(&mut store).await?;

        OpaErrorCode::from_code(code).map_err(Error::InvalidPatch)
    }

    /// Remove the value at `path` from the current data document
    /// (`opa_value_remove_path`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPatch`] if the path does not resolve, or
    /// [`Error::Closed`].
    pub async fn remove_path<T: Send>(
        &self,
        mut store: impl AsContextMut<Data = T>,
        path: &[&str],
    ) -> Result<(), Error> {
        let mut guard = self.inner.lock().await;
        let instance = guard.as_mut().ok_or(Error::Closed)?;

        instance
            .arena
            .heap_ptr_set(&mut store, &instance.eval_heap_ptr)
            .await?;

        let path_addr = instance.parse_value(&mut store, &path).await?;

        let code = instance
            .opa_value_remove_path_func
            .call(&mut store, &instance.data, &path_addr)
            .await
            .map_err(Error::Trap)?;

        instance.arena.free(&mut store, path_addr.into_heap()).await?;
        instance.eval_heap_ptr = instance.arena.heap_ptr_get(&mut store).await?;

        OpaErrorCode::from_code(code).map_err(Error::InvalidPatch)
    }

    /// Swap in a new compiled policy module, optionally with a fresh
    /// `data` document. The previous instance is dropped once the new
    /// one is fully constructed; if construction fails the `Vm`
    /// transitions to [`Error::Closed`] rather than being left half-built.
    ///
    /// # Errors
    ///
    /// Returns whatever [`Vm::new_with_context`] would for the new
    /// module. On failure the `Vm` is left closed — callers must treat a
    /// failed `set_policy` as destructive.
    pub async fn set_policy<T: Send>(
        &self,
        mut store: impl AsContextMut<Data = T>,
        module: &Module,
        opts: VmOptions<'_>,
        context: C,
    ) -> Result<(), Error> {
        let mut guard = self.inner.lock().await;
        guard.take().ok_or(Error::Closed)?;

        match Instance::new(&mut store, module, opts, context).await {
            Ok(instance) => {
                *guard = Some(instance);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Tear down the VM. Idempotent.
    pub async fn close(&self) {
        self.inner.lock().await.take();
    }
}
