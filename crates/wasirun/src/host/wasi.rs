//! # WASI preview1 host module
//!
//! A small, self-contained subset of `wasi_snapshot_preview1`: process exit,
//! clocks, arguments, environment, output to stdout/stderr, and randomness.
//! Every function except `proc_exit` returns a WASI errno as its `i32` result.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rand::RngCore;
use tracing::debug;
use tracing::trace;
use tracing::warn;
use wasmtime::Caller;
use wasmtime::Val;

use crate::context::HostCtx;
use crate::exit::ExitSignal;
use crate::host::GuestMemory;
use crate::host::HostFunc;
use crate::host::HostModule;
use crate::host::HostTable;
use crate::host::memory::OutOfBounds;
use crate::host::param_i32;
use crate::host::param_i64;
use crate::host::set_result;
use crate::signature::FunctionSignature;
use crate::signature::ValueKind;
use crate::signature::ValueKind::I32;
use crate::signature::ValueKind::I64;

pub const NAMESPACE: &str = "wasi_snapshot_preview1";

const CLOCK_REALTIME: i32 = 0;
const CLOCK_MONOTONIC: i32 = 1;
const CLOCK_PROCESS_CPUTIME: i32 = 2;
const CLOCK_THREAD_CPUTIME: i32 = 3;

/// WASI error numbers returned by this module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum Errno {
    Success = 0,
    Badf = 8,
    Fault = 21,
    Inval = 28,
    Io = 29,
    Notsup = 58,
}

impl From<OutOfBounds> for Errno {
    fn from(_: OutOfBounds) -> Self {
        Self::Fault
    }
}

type Syscall = std::result::Result<(), Errno>;

/// The preview1 host module.
#[derive(Clone, Debug, Default)]
pub struct Wasi;

impl Wasi {
    pub fn new() -> Self {
        Self
    }
}

impl HostModule for Wasi {
    fn install(&self, table: &mut HostTable) {
        let entries = [
            ("proc_exit", func(&[I32], &[], proc_exit)),
            ("clock_time_get", syscall(&[I32, I64, I32], clock_time_get)),
            ("clock_res_get", syscall(&[I32, I32], clock_res_get)),
            ("args_sizes_get", syscall(&[I32, I32], args_sizes_get)),
            ("args_get", syscall(&[I32, I32], args_get)),
            ("environ_sizes_get", syscall(&[I32, I32], environ_sizes_get)),
            ("environ_get", syscall(&[I32, I32], environ_get)),
            ("fd_write", syscall(&[I32, I32, I32, I32], fd_write)),
            ("random_get", syscall(&[I32, I32], random_get)),
            ("sched_yield", syscall(&[], sched_yield)),
        ];

        for (name, func) in entries {
            table.insert(NAMESPACE, name, func);
        }
    }
}

fn func<F>(params: &[ValueKind], results: &[ValueKind], f: F) -> HostFunc
where
    F: Fn(Caller<'_, HostCtx>, &[Val], &mut [Val]) -> wasmtime::Result<()> + Send + Sync + 'static,
{
    let signature = FunctionSignature::new(params.iter().copied(), results.iter().copied());
    HostFunc::new(signature, f)
}

/// Adapts an errno-returning implementation to the `(...) -> i32` shape.
fn syscall<F>(params: &[ValueKind], f: F) -> HostFunc
where
    F: Fn(&mut Caller<'_, HostCtx>, &[Val]) -> wasmtime::Result<Syscall> + Send + Sync + 'static,
{
    func(params, &[I32], move |mut caller, args, results| {
        let errno = match f(&mut caller, args)? {
            Ok(()) => Errno::Success,
            Err(errno) => errno,
        };
        set_result(results, 0, Val::I32(errno as i32))
    })
}

fn ptr(params: &[Val], index: usize) -> wasmtime::Result<u32> {
    param_i32(params, index).map(|p| p as u32)
}

fn proc_exit(_caller: Caller<'_, HostCtx>, params: &[Val], _results: &mut [Val]) -> wasmtime::Result<()> {
    let code = param_i32(params, 0)?;
    debug!(code, "proc_exit");
    Err(ExitSignal::new(code).raise())
}

fn clock_time_get(caller: &mut Caller<'_, HostCtx>, params: &[Val]) -> wasmtime::Result<Syscall> {
    let id = param_i32(params, 0)?;
    let _precision = param_i64(params, 1)?;
    let out = ptr(params, 2)?;

    let nanos = match id {
        CLOCK_REALTIME => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos(),
        CLOCK_MONOTONIC => caller.data().epoch().elapsed().as_nanos(),
        CLOCK_PROCESS_CPUTIME | CLOCK_THREAD_CPUTIME => return Ok(Err(Errno::Notsup)),
        _ => return Ok(Err(Errno::Inval)),
    };
    let nanos = u64::try_from(nanos).unwrap_or(u64::MAX);

    let memory = GuestMemory::of(caller)?;
    Ok(memory.write_u64(caller, out, nanos).map_err(Errno::from))
}

fn clock_res_get(caller: &mut Caller<'_, HostCtx>, params: &[Val]) -> wasmtime::Result<Syscall> {
    let id = param_i32(params, 0)?;
    let out = ptr(params, 1)?;

    match id {
        CLOCK_REALTIME | CLOCK_MONOTONIC => {}
        CLOCK_PROCESS_CPUTIME | CLOCK_THREAD_CPUTIME => return Ok(Err(Errno::Notsup)),
        _ => return Ok(Err(Errno::Inval)),
    }

    let memory = GuestMemory::of(caller)?;
    Ok(memory.write_u64(caller, out, 1).map_err(Errno::from))
}

fn args_sizes_get(caller: &mut Caller<'_, HostCtx>, params: &[Val]) -> wasmtime::Result<Syscall> {
    let Some(strings) = arg_strings(caller.data()) else {
        return Ok(Err(Errno::Inval));
    };
    string_sizes(caller, params, &strings)
}

fn args_get(caller: &mut Caller<'_, HostCtx>, params: &[Val]) -> wasmtime::Result<Syscall> {
    let Some(strings) = arg_strings(caller.data()) else {
        return Ok(Err(Errno::Inval));
    };
    write_strings(caller, params, &strings)
}

fn environ_sizes_get(caller: &mut Caller<'_, HostCtx>, params: &[Val]) -> wasmtime::Result<Syscall> {
    let Some(strings) = env_strings(caller.data()) else {
        return Ok(Err(Errno::Inval));
    };
    string_sizes(caller, params, &strings)
}

fn environ_get(caller: &mut Caller<'_, HostCtx>, params: &[Val]) -> wasmtime::Result<Syscall> {
    let Some(strings) = env_strings(caller.data()) else {
        return Ok(Err(Errno::Inval));
    };
    write_strings(caller, params, &strings)
}

/// `None` if any argument has an interior NUL and cannot be terminated.
fn arg_strings(ctx: &HostCtx) -> Option<Vec<Vec<u8>>> {
    ctx.args().iter().map(|a| nul_terminated(a)).collect()
}

fn env_strings(ctx: &HostCtx) -> Option<Vec<Vec<u8>>> {
    ctx.env()
        .iter()
        .map(|(k, v)| nul_terminated(&format!("{}={}", k, v)))
        .collect()
}

fn nul_terminated(s: &str) -> Option<Vec<u8>> {
    if s.contains('\0') {
        warn!(len = s.len(), "string with interior NUL withheld from guest");
        return None;
    }
    let mut bytes = Vec::with_capacity(s.len() + 1);
    bytes.extend_from_slice(s.as_bytes());
    bytes.push(0);
    Some(bytes)
}

/// Writes the string count and total buffer size (NULs included).
fn string_sizes(caller: &mut Caller<'_, HostCtx>, params: &[Val], strings: &[Vec<u8>]) -> wasmtime::Result<Syscall> {
    let count_out = ptr(params, 0)?;
    let size_out = ptr(params, 1)?;

    let (Ok(count), Ok(size)) = (
        u32::try_from(strings.len()),
        u32::try_from(strings.iter().map(Vec::len).sum::<usize>()),
    ) else {
        return Ok(Err(Errno::Inval));
    };

    let memory = GuestMemory::of(caller)?;
    let written = memory
        .write_u32(&mut *caller, count_out, count)
        .and_then(|()| memory.write_u32(&mut *caller, size_out, size));
    Ok(written.map_err(Errno::from))
}

/// Fills a pointer array and the buffer the pointers point into.
fn write_strings(caller: &mut Caller<'_, HostCtx>, params: &[Val], strings: &[Vec<u8>]) -> wasmtime::Result<Syscall> {
    let mut list = ptr(params, 0)?;
    let mut buf = ptr(params, 1)?;

    let memory = GuestMemory::of(caller)?;
    for s in strings {
        if let Err(e) = memory.write_u32(&mut *caller, list, buf) {
            return Ok(Err(e.into()));
        }
        if let Err(e) = memory.write(&mut *caller, buf, s) {
            return Ok(Err(e.into()));
        }
        list = list.wrapping_add(4);
        buf = buf.wrapping_add(s.len() as u32);
    }
    Ok(Ok(()))
}

fn fd_write(caller: &mut Caller<'_, HostCtx>, params: &[Val]) -> wasmtime::Result<Syscall> {
    let fd = param_i32(params, 0)? as u32;
    let iovs = ptr(params, 1)?;
    let iovs_len = ptr(params, 2)?;
    let nwritten_out = ptr(params, 3)?;

    let Some(output) = caller.data().output(fd).cloned() else {
        return Ok(Err(Errno::Badf));
    };

    let memory = GuestMemory::of(caller)?;
    let gathered = (0..iovs_len).try_fold(Vec::new(), |mut acc, i| {
        let iov = iovs.wrapping_add(i.wrapping_mul(8));
        let base = memory.read_u32(&*caller, iov)?;
        let len = memory.read_u32(&*caller, iov.wrapping_add(4))?;
        acc.extend(memory.read(&*caller, base, len)?);
        Ok::<_, OutOfBounds>(acc)
    });
    let bytes = match gathered {
        Ok(bytes) => bytes,
        Err(e) => return Ok(Err(e.into())),
    };

    trace!(fd, len = bytes.len(), "fd_write");
    if output.write_all(fd, &bytes).is_err() {
        return Ok(Err(Errno::Io));
    }

    let Ok(nwritten) = u32::try_from(bytes.len()) else {
        return Ok(Err(Errno::Inval));
    };
    Ok(memory.write_u32(caller, nwritten_out, nwritten).map_err(Errno::from))
}

fn random_get(caller: &mut Caller<'_, HostCtx>, params: &[Val]) -> wasmtime::Result<Syscall> {
    let buf = ptr(params, 0)?;
    let len = ptr(params, 1)?;

    let memory = GuestMemory::of(caller)?;
    if let Err(e) = memory.check(&*caller, buf, u64::from(len)) {
        return Ok(Err(e.into()));
    }

    let mut bytes = vec![0u8; len as usize];
    rand::thread_rng().fill_bytes(&mut bytes);
    Ok(memory.write(caller, buf, &bytes).map_err(Errno::from))
}

fn sched_yield(_caller: &mut Caller<'_, HostCtx>, _params: &[Val]) -> wasmtime::Result<Syscall> {
    std::thread::yield_now();
    Ok(Ok(()))
}
