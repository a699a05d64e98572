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

//! The linear-memory arena: the only component that understands
//! byte-level layout of a policy instance's memory.
//!
//! Everything else in this crate addresses the instance's memory only
//! through [`Addr`]/[`Value`]/[`Heap`] offsets; JSON/AST interpretation
//! of those bytes lives in [`crate::vm`] and [`crate::builtin_table`].

use std::ffi::CString;

use wasmtime::{AsContextMut, Memory};

use crate::{
    abi::{Addr, Heap, NulStr},
    error::Error,
    funcs::{Func, OpaFree, OpaHeapPtrGet, OpaHeapPtrSet, OpaMalloc},
};

/// A view onto an instance's linear memory plus its `opa_malloc`/
/// `opa_free`/`opa_heap_ptr_*` exports.
#[derive(Debug, Clone)]
pub(crate) struct Arena {
    memory: Memory,
    malloc: OpaMalloc,
    free: OpaFree,
    heap_ptr_get: OpaHeapPtrGet,
    heap_ptr_set: OpaHeapPtrSet,
}

impl Arena {
    pub(crate) fn new<T: Send>(
        mut store: impl AsContextMut<Data = T>,
        memory: Memory,
        instance: &wasmtime::Instance,
    ) -> Result<Self, Error> {
        Ok(Self {
            memory,
            malloc: OpaMalloc::from_instance(&mut store, instance)
                .map_err(Error::InstantiationFailed)?,
            free: OpaFree::from_instance(&mut store, instance)
                .map_err(Error::InstantiationFailed)?,
            heap_ptr_get: OpaHeapPtrGet::from_instance(&mut store, instance)
                .map_err(Error::InstantiationFailed)?,
            heap_ptr_set: OpaHeapPtrSet::from_instance(&mut store, instance)
                .map_err(Error::InstantiationFailed)?,
        })
    }

    pub(crate) const fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Read `length` bytes starting at `offset`.
    pub(crate) fn read<T>(
        &self,
        store: impl wasmtime::AsContext<Data = T>,
        offset: i32,
        length: usize,
    ) -> Result<Vec<u8>, Error> {
        let start: usize = offset.try_into().map_err(|_| Error::OutOfRange)?;
        let end = start.checked_add(length).ok_or(Error::OutOfRange)?;
        let data = self.memory.data(store);
        data.get(start..end)
            .map(<[u8]>::to_vec)
            .ok_or(Error::OutOfRange)
    }

    /// Read a single byte at `offset`.
    pub(crate) fn read_byte<T>(
        &self,
        store: impl wasmtime::AsContext<Data = T>,
        offset: i32,
    ) -> Result<u8, Error> {
        let start: usize = offset.try_into().map_err(|_| Error::OutOfRange)?;
        self.memory
            .data(store)
            .get(start)
            .copied()
            .ok_or(Error::OutOfRange)
    }

    /// Scan forward from `addr` until the first NUL byte. Policy-owned
    /// memory is assumed to contain a terminator; if none is found
    /// before the end of memory this is [`Error::UnterminatedString`],
    /// not an out-of-range read.
    pub(crate) fn read_cstring<T>(
        &self,
        store: impl wasmtime::AsContext<Data = T>,
        addr: &NulStr,
    ) -> Result<Vec<u8>, Error> {
        let start: usize = addr.0.try_into().map_err(|_| Error::OutOfRange)?;
        let data = self.memory.data(store);
        let tail = data.get(start..).ok_or(Error::OutOfRange)?;
        let nul = tail
            .iter()
            .position(|b| *b == 0)
            .ok_or(Error::UnterminatedString)?;
        Ok(tail[..nul].to_vec())
    }

    /// Allocate `bytes.len()` bytes via the policy's `opa_malloc` and
    /// write them there. Returns the allocation's address.
    pub(crate) async fn write<T: Send>(
        &self,
        mut store: impl AsContextMut<Data = T>,
        bytes: &[u8],
    ) -> Result<Heap, Error> {
        let heap = self
            .malloc
            .call(&mut store, bytes.len())
            .await
            .map_err(|err| Error::OutOfMemory(Some(err)))?;
        let ptr: usize = heap.ptr.try_into().map_err(|_| Error::OutOfMemory(None))?;
        self.memory
            .write(&mut store, ptr, bytes)
            .map_err(|_| Error::OutOfRange)?;
        Ok(heap)
    }

    /// Write a NUL-terminated copy of `bytes` via `opa_malloc`, the form
    /// OPA's `opa_json_parse`/`opa_value_parse` expect as input strings.
    pub(crate) async fn write_cstring<T: Send>(
        &self,
        mut store: impl AsContextMut<Data = T>,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<Heap, Error> {
        let value = CString::new(bytes).map_err(|err| Error::OutOfMemory(Some(err.into())))?;
        self.write(&mut store, value.as_bytes_with_nul()).await
    }

    pub(crate) async fn free<T: Send>(
        &self,
        store: impl AsContextMut<Data = T>,
        heap: Heap,
    ) -> Result<(), Error> {
        self.free
            .call(store, heap)
            .await
            .map_err(Error::Trap)
    }

    pub(crate) async fn heap_ptr_get<T: Send>(
        &self,
        store: impl AsContextMut<Data = T>,
    ) -> Result<Addr, Error> {
        self.heap_ptr_get.call(store).await.map_err(Error::Trap)
    }

    pub(crate) async fn heap_ptr_set<T: Send>(
        &self,
        store: impl AsContextMut<Data = T>,
        addr: &Addr,
    ) -> Result<(), Error> {
        self.heap_ptr_set
            .call(store, addr)
            .await
            .map_err(Error::Trap)
    }
}
