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

//! Typed error taxonomy for the VM harness.
//!
//! A single bad evaluation must never take down the host process, so
//! every fallible ABI interaction returns one of these variants instead
//! of panicking.

/// The non-zero error codes returned by `opa_value_add_path` and
/// `opa_value_remove_path`.
#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum OpaErrorCode {
    /// Unrecoverable internal error (code 1).
    #[error("unrecoverable internal error")]
    Internal,

    /// Invalid value type was encountered (code 2).
    #[error("invalid value type")]
    InvalidType,

    /// Invalid object path reference (code 3).
    #[error("invalid object path")]
    InvalidPath,

    /// Any other, unrecognized error code.
    #[error("unrecognized error code: {0}")]
    Other(i32),
}

impl OpaErrorCode {
    /// Decode a raw `opa_value_add_path`/`opa_value_remove_path` return
    /// code. `0` means success.
    pub(crate) fn from_code(code: i32) -> Result<(), Self> {
        match code {
            0 => Ok(()),
            1 => Err(Self::Internal),
            2 => Err(Self::InvalidType),
            3 => Err(Self::InvalidPath),
            x => Err(Self::Other(x)),
        }
    }
}

/// Errors surfaced by the VM harness.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine rejected the module: malformed bytes, or the module is
    /// missing an export the harness requires.
    #[error("failed to instantiate policy module")]
    InstantiationFailed(#[source] anyhow::Error),

    /// The policy references a builtin with no host-side implementation.
    #[error("unknown builtin: {0}")]
    UnknownBuiltin(String),

    /// `opa_malloc` returned a null pointer or trapped.
    #[error("out of memory")]
    OutOfMemory(#[source] Option<anyhow::Error>),

    /// A memory access fell outside the instance's linear memory.
    #[error("memory access out of range")]
    OutOfRange,

    /// Expected a NUL terminator before the end of linear memory.
    #[error("unterminated string in linear memory")]
    UnterminatedString,

    /// The policy called `opa_abort`.
    #[error("policy aborted: {0}")]
    PolicyAborted(String),

    /// A halt-class builtin error propagated out of evaluation.
    #[error("builtin raised a halt error: {0}")]
    PolicyBuiltinHalt(#[source] anyhow::Error),

    /// `opa_value_add_path`/`opa_value_remove_path` returned a non-zero
    /// code; the data tree is guaranteed unchanged.
    #[error("invalid patch: {0}")]
    InvalidPatch(#[source] OpaErrorCode),

    /// Evaluation was cancelled externally (deadline or explicit cancel).
    #[error("evaluation cancelled")]
    Cancelled,

    /// Any other Wasm trap.
    #[error("wasm trap: {0}")]
    Trap(#[source] anyhow::Error),

    /// The VM was already closed (explicitly, or implicitly after a
    /// failed policy swap in `SetData`). Not part of spec.md's builtin
    /// taxonomy, but required by the Uninitialized/Ready/Closed state
    /// machine in §4.5 — operating on a dead VM is a distinct, typed
    /// failure rather than a reused variant.
    #[error("VM is closed")]
    Closed,
}

/// Marks a trap that originated from the policy calling `opa_abort`, so it
/// can be told apart from an ordinary trap once it bubbles up out of
/// wasmtime as an opaque `anyhow::Error`.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub(crate) struct AbortSignal(pub(crate) String);

/// Marks a trap that originated from a halt-class builtin error, carrying
/// the original cause through the same opaque trap path.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub(crate) struct HaltSignal(#[source] pub(crate) anyhow::Error);

impl Error {
    /// Turn a trap bubbled up from a call into `eval`/`opa_eval` into the
    /// right typed variant: [`Self::PolicyAborted`] if it came from
    /// `opa_abort`, [`Self::PolicyBuiltinHalt`] if it came from a
    /// halt-class builtin error, [`Self::Trap`] otherwise.
    pub(crate) fn from_eval_trap(err: anyhow::Error) -> Self {
        match err.downcast::<AbortSignal>() {
            Ok(AbortSignal(msg)) => return Self::PolicyAborted(msg),
            Err(err) => match err.downcast::<HaltSignal>() {
                Ok(HaltSignal(cause)) => return Self::PolicyBuiltinHalt(cause),
                Err(err) => Self::Trap(err),
            },
        }
    }
}

/// Errors a host builtin implementation can return from [`crate::builtins::Builtin::call`].
///
/// Only [`BuiltinError::Halt`] terminates the surrounding evaluation.
/// Every other variant degrades to *undefined* (address `0`) inside the
/// dispatch trampoline — this is required by the OPA wasm non-strict
/// eval contract.
#[derive(Debug, thiserror::Error)]
pub enum BuiltinError {
    /// A halt-class error: stop the whole evaluation.
    #[error("halt: {0}")]
    Halt(#[source] anyhow::Error),

    /// The request was cancelled while the builtin was running. Treated
    /// as a halt by the dispatcher.
    #[error("cancelled")]
    Cancelled,

    /// Any other error: type mismatch, missing key, parse failure, etc.
    /// Degrades to an undefined result, never aborts evaluation.
    #[error("undefined: {0}")]
    Undefined(#[source] anyhow::Error),
}

impl From<anyhow::Error> for BuiltinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Undefined(err)
    }
}

impl BuiltinError {
    /// Build a halt-class error out of any displayable cause.
    pub fn halt(err: impl Into<anyhow::Error>) -> Self {
        Self::Halt(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::OpaErrorCode;

    #[test]
    fn zero_is_success() {
        assert!(OpaErrorCode::from_code(0).is_ok());
    }

    #[test]
    fn known_codes_map_to_named_variants() {
        assert!(matches!(
            OpaErrorCode::from_code(1),
            Err(OpaErrorCode::Internal)
        ));
        assert!(matches!(
            OpaErrorCode::from_code(2),
            Err(OpaErrorCode::InvalidType)
        ));
        assert!(matches!(
            OpaErrorCode::from_code(3),
            Err(OpaErrorCode::InvalidPath)
        ));
    }

    #[test]
    fn unknown_codes_are_preserved() {
        assert!(matches!(
            OpaErrorCode::from_code(42),
            Err(OpaErrorCode::Other(42))
        ));
    }
}
