//! Shared helpers for the integration tests.

#![allow(dead_code)]

use wasirun::ModuleSource;

/// Installs a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A module written in the text format.
pub fn wat(source: &str) -> ModuleSource {
    ModuleSource::bytes(source.as_bytes().to_vec())
}

/// Minimal WASI command whose `_start` calls `proc_exit(code)`.
pub fn exits_with(code: i32) -> String {
    format!(
        r#"(module
            (import "wasi_snapshot_preview1" "proc_exit" (func $exit (param i32)))
            (memory (export "memory") 1)
            (func (export "_start") (call $exit (i32.const {code})) unreachable))"#
    )
}
