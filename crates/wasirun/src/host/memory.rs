//! # Guest memory access
//!
//! Little-endian reads and writes into the calling module's exported linear
//! memory. Every access is bounds-checked against the current memory size
//! before any host buffer is allocated; failures are reported as
//! `OutOfBounds`, which WASI functions turn into `EFAULT` rather than trapping.

use wasmtime::AsContext;
use wasmtime::AsContextMut;
use wasmtime::Caller;
use wasmtime::Extern;
use wasmtime::Memory;

/// Name of the export WASI modules provide their memory under.
pub const MEMORY_EXPORT: &str = "memory";

/// A guest pointer range that does not fit in linear memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutOfBounds {
    pub ptr: u32,
    pub len: u64,
}

impl std::fmt::Display for OutOfBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Out of bounds: {} bytes at {:#x}", self.len, self.ptr)
    }
}

impl std::error::Error for OutOfBounds {}

pub type Result<T> = std::result::Result<T, OutOfBounds>;

/// View of the caller's linear memory.
#[derive(Clone, Copy, Debug)]
pub struct GuestMemory {
    memory: Memory,
}

impl GuestMemory {
    /// Finds the caller's `memory` export. A module that imports functions
    /// needing memory but exports none cannot be serviced, so this is a hard
    /// error for the call.
    pub fn of<T>(caller: &mut Caller<'_, T>) -> wasmtime::Result<Self> {
        caller
            .get_export(MEMORY_EXPORT)
            .and_then(Extern::into_memory)
            .map(|memory| Self { memory })
            .ok_or_else(|| wasmtime::Error::msg("module does not export its memory"))
    }

    /// Fails unless `len` bytes starting at `ptr` lie inside the memory.
    pub fn check(&self, store: impl AsContext, ptr: u32, len: u64) -> Result<()> {
        let size = self.memory.data_size(store) as u64;
        match u64::from(ptr).checked_add(len) {
            Some(end) if end <= size => Ok(()),
            _ => Err(OutOfBounds { ptr, len }),
        }
    }

    pub fn read(&self, store: impl AsContext, ptr: u32, len: u32) -> Result<Vec<u8>> {
        let store = store.as_context();
        self.check(&store, ptr, u64::from(len))?;

        let mut buf = vec![0u8; len as usize];
        self.memory
            .read(&store, ptr as usize, &mut buf)
            .map_err(|_| OutOfBounds { ptr, len: u64::from(len) })?;
        Ok(buf)
    }

    pub fn read_u32(&self, store: impl AsContext, ptr: u32) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.memory
            .read(store, ptr as usize, &mut buf)
            .map_err(|_| OutOfBounds { ptr, len: 4 })?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn write(&self, store: impl AsContextMut, ptr: u32, bytes: &[u8]) -> Result<()> {
        self.memory
            .write(store, ptr as usize, bytes)
            .map_err(|_| OutOfBounds { ptr, len: bytes.len() as u64 })
    }

    pub fn write_u32(&self, store: impl AsContextMut, ptr: u32, value: u32) -> Result<()> {
        self.write(store, ptr, &value.to_le_bytes())
    }

    pub fn write_u64(&self, store: impl AsContextMut, ptr: u32, value: u64) -> Result<()> {
        self.write(store, ptr, &value.to_le_bytes())
    }
}
