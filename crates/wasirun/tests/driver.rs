//! Running `_start` end to end and mapping the result to an exit status.

mod common;

use common::exits_with;
use common::init_tracing;
use wasirun::Budget;
use wasirun::Capture;
use wasirun::Driver;
use wasirun::DriverError;
use wasirun::HostTable;
use wasirun::InvokeError;
use wasirun::Output;
use wasirun::Runtime;
use wasirun::Status;

fn driver(module: &str) -> Driver {
    init_tracing();
    Driver::new(module.as_bytes().to_vec())
}

const HELLO: &str = r#"(module
    (import "wasi_snapshot_preview1" "fd_write" (func $fd_write (param i32 i32 i32 i32) (result i32)))
    (memory (export "memory") 1)
    (data (i32.const 64) "hello\n")
    (func (export "_start")
        (i32.store (i32.const 0) (i32.const 64))
        (i32.store (i32.const 4) (i32.const 6))
        (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 8)))))"#;

#[test]
fn test_normal_return_is_status_zero() -> anyhow::Result<()> {
    let stdout = Capture::new();
    let status = driver(HELLO).stdout(Output::Capture(stdout.clone())).run()?;

    assert_eq!(status, Status::Returned);
    assert_eq!(status.code(), 0);
    assert_eq!(stdout.to_string_lossy(), "hello\n");
    Ok(())
}

#[test]
fn test_proc_exit_code_is_the_status() -> anyhow::Result<()> {
    let status = driver(&exits_with(42)).run()?;
    assert_eq!(status, Status::Exited(42));
    assert_eq!(status.code(), 42);
    Ok(())
}

#[test]
fn test_exit_zero_is_distinct_from_return() -> anyhow::Result<()> {
    let status = driver(&exits_with(0)).run()?;
    assert_eq!(status, Status::Exited(0));
    assert_ne!(status, Status::Returned);
    assert_eq!(status.code(), 0);
    Ok(())
}

#[test]
fn test_args_reach_the_guest() -> anyhow::Result<()> {
    // Exits with argc.
    let module = r#"(module
        (import "wasi_snapshot_preview1" "args_sizes_get" (func $sizes (param i32 i32) (result i32)))
        (import "wasi_snapshot_preview1" "proc_exit" (func $exit (param i32)))
        (memory (export "memory") 1)
        (func (export "_start")
            (drop (call $sizes (i32.const 0) (i32.const 4)))
            (call $exit (i32.load (i32.const 0)))))"#;

    let status = driver(module).args(["prog", "one", "two"]).run()?;
    assert_eq!(status, Status::Exited(3));
    Ok(())
}

#[test]
fn test_missing_entry_point() {
    let module = r#"(module (func (export "main")))"#;

    let err = driver(module).run().unwrap_err();
    assert!(matches!(
        err,
        DriverError::Invoke(InvokeError::ExportNotFound(ref name)) if name == "_start"
    ));
    assert_eq!(err.exit_code(), 127);
}

#[test]
fn test_entry_point_with_wrong_signature() {
    let module = r#"(module (func (export "_start") (result i32) i32.const 0))"#;

    let err = driver(module).run().unwrap_err();
    assert!(matches!(err, DriverError::Invoke(InvokeError::SignatureMismatch { .. })));
    assert_eq!(err.exit_code(), 127);
}

#[test]
fn test_trap_maps_to_fault_status() {
    let module = r#"(module (func (export "_start") unreachable))"#;

    let err = driver(module).run().unwrap_err();
    assert!(matches!(err, DriverError::Invoke(InvokeError::ExecutionFault(_))));
    assert_eq!(err.exit_code(), 134);
}

#[test]
fn test_unresolved_import_maps_to_build_status() {
    let module = r#"(module
        (import "env" "nope" (func))
        (func (export "_start")))"#;

    let err = driver(module).run().unwrap_err();
    assert!(matches!(err, DriverError::Build(_)));
    assert_eq!(err.exit_code(), 126);
}

#[test]
fn test_custom_host_table_replaces_wasi() {
    let err = driver(&exits_with(1))
        .host_table(HostTable::new())
        .run()
        .unwrap_err();
    assert!(matches!(err, DriverError::Build(wasirun::BuildError::UnresolvedImport { .. })));
}

#[test]
fn test_budget_applies_to_entry_point() {
    let module = r#"(module (func (export "_start") (loop $l (br $l))))"#;

    let err = driver(module).budget(Budget::fuel(5_000)).run().unwrap_err();
    assert_eq!(err.exit_code(), 134);
}

#[test]
fn test_checksum_and_shared_runtime() -> anyhow::Result<()> {
    let module = exits_with(5);
    let checksum = adler::adler32(module.as_bytes());
    let rt = Runtime::new()?;

    let status = driver(&module)
        .runtime(rt.clone())
        .expect_checksum(checksum)
        .run()?;
    assert_eq!(status, Status::Exited(5));

    let err = driver(&module)
        .runtime(rt)
        .expect_checksum(checksum.wrapping_add(1))
        .run()
        .unwrap_err();
    assert!(matches!(err, DriverError::Build(wasirun::BuildError::ChecksumMismatch { .. })));
    Ok(())
}

#[test]
fn test_run_from_file() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("exit.wat");

    // Exits with the length of argv[0].
    let module = r#"(module
        (import "wasi_snapshot_preview1" "args_sizes_get" (func $sizes (param i32 i32) (result i32)))
        (import "wasi_snapshot_preview1" "proc_exit" (func $exit (param i32)))
        (memory (export "memory") 1)
        (func (export "_start")
            (drop (call $sizes (i32.const 0) (i32.const 4)))
            (call $exit (i32.sub (i32.load (i32.const 4)) (i32.const 1)))))"#;
    std::fs::write(&path, module)?;

    let status = wasirun::run(&path)?;
    let expected = path.display().to_string().len() as i32;
    assert_eq!(status, Status::Exited(expected));
    Ok(())
}

#[test]
fn test_run_missing_file() {
    let err = wasirun::run("/no/such/dir/app.wasm").unwrap_err();
    assert!(matches!(err, DriverError::Build(wasirun::BuildError::Source(_))));
    assert_eq!(err.exit_code(), 126);
}
