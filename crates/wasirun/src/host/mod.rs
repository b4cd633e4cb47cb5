//! # Host functions implemented natively
//!
//! A host function is a closure tagged with an explicit `FunctionSignature`.
//! Host functions are collected into a `HostTable` keyed by
//! (namespace, name), which an `InstanceBuilder` offers to the module.
//!
//! Host modules (currently only `Wasi`) populate a table through the
//! `HostModule` trait, each implemented in its own file under `src/host/`.

pub mod memory;
pub mod wasi;

pub use memory::GuestMemory;
pub use wasi::Wasi;

use std::sync::Arc;

use wasmtime::Caller;
use wasmtime::Val;

use crate::context::HostCtx;
use crate::signature::FunctionSignature;

type Callback =
    dyn Fn(Caller<'_, HostCtx>, &[Val], &mut [Val]) -> wasmtime::Result<()> + Send + Sync;

/// A host-implemented function with a checked signature.
#[derive(Clone)]
pub struct HostFunc {
    signature: FunctionSignature,
    callback: Arc<Callback>,
}

impl HostFunc {
    /// Wraps `f`, which the engine will only ever call with `params` and
    /// `results` shaped like `signature`.
    pub fn new<F>(signature: FunctionSignature, f: F) -> Self
    where
        F: Fn(Caller<'_, HostCtx>, &[Val], &mut [Val]) -> wasmtime::Result<()>
            + Send
            + Sync
            + 'static,
    {
        Self {
            signature,
            callback: Arc::new(f),
        }
    }

    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    pub(crate) fn call(
        &self,
        caller: Caller<'_, HostCtx>,
        params: &[Val],
        results: &mut [Val],
    ) -> wasmtime::Result<()> {
        (self.callback)(caller, params, results)
    }
}

impl std::fmt::Debug for HostFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostFunc")
            .field("signature", &self.signature.to_string())
            .finish_non_exhaustive()
    }
}

/// One named entry of a `HostTable`.
#[derive(Clone, Debug)]
pub struct HostEntry {
    pub namespace: String,
    pub name: String,
    pub func: HostFunc,
}

/// A catalogue of host functions keyed by (namespace, name).
///
/// Inserting an existing key replaces the earlier function.
#[derive(Clone, Debug, Default)]
pub struct HostTable {
    entries: Vec<HostEntry>,
}

impl HostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The WASI preview1 subset implemented by `Wasi`.
    pub fn wasi() -> Self {
        let mut table = Self::new();
        Wasi::new().install(&mut table);
        table
    }

    pub fn insert(&mut self, namespace: impl Into<String>, name: impl Into<String>, func: HostFunc) {
        let namespace = namespace.into();
        let name = name.into();

        match self
            .entries
            .iter_mut()
            .find(|e| e.namespace == namespace && e.name == name)
        {
            Some(entry) => entry.func = func,
            None => self.entries.push(HostEntry { namespace, name, func }),
        }
    }

    /// Fluent form of `insert`.
    pub fn with(mut self, namespace: impl Into<String>, name: impl Into<String>, func: HostFunc) -> Self {
        self.insert(namespace, name, func);
        self
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<&HostFunc> {
        self.entries
            .iter()
            .find(|e| e.namespace == namespace && e.name == name)
            .map(|e| &e.func)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HostEntry> {
        self.entries.iter()
    }
}

impl IntoIterator for HostTable {
    type Item = HostEntry;
    type IntoIter = std::vec::IntoIter<HostEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A native module that contributes host functions to a table.
pub trait HostModule {
    fn install(&self, table: &mut HostTable);
}

/// Reads parameter `index` as an `i32`.
pub fn param_i32(params: &[Val], index: usize) -> wasmtime::Result<i32> {
    params
        .get(index)
        .and_then(Val::i32)
        .ok_or_else(|| wasmtime::Error::msg(format!("expected i32 parameter at {}", index)))
}

/// Reads parameter `index` as an `i64`.
pub fn param_i64(params: &[Val], index: usize) -> wasmtime::Result<i64> {
    params
        .get(index)
        .and_then(Val::i64)
        .ok_or_else(|| wasmtime::Error::msg(format!("expected i64 parameter at {}", index)))
}

/// Stores `val` into result slot `index`.
pub fn set_result(results: &mut [Val], index: usize, val: Val) -> wasmtime::Result<()> {
    let slot = results
        .get_mut(index)
        .ok_or_else(|| wasmtime::Error::msg(format!("no result slot at {}", index)))?;
    *slot = val;
    Ok(())
}
