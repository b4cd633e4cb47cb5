//! # wasirun
//!
//! A minimal WebAssembly embedding harness: build an instance whose imports
//! are satisfied from a table of host functions, call its exports with typed
//! parameters, and turn a guest's `proc_exit` into an exit status.

pub mod builder;
pub mod context;
pub mod driver;
pub mod exit;
pub mod host;
pub mod instance;
pub mod runtime;
pub mod signature;
pub mod source;
pub mod value;

pub use builder::Error as BuildError;
pub use builder::InstanceBuilder;
pub use context::Budget;
pub use context::Capture;
pub use context::ContextBuilder;
pub use context::HostCtx;
pub use context::Output;
pub use driver::Driver;
pub use driver::Error as DriverError;
pub use driver::Status;
pub use driver::run;
pub use exit::ExitSignal;
pub use exit::Outcome;
pub use host::HostFunc;
pub use host::HostModule;
pub use host::HostTable;
pub use host::Wasi;
pub use instance::Callee;
pub use instance::Error as InvokeError;
pub use instance::Instance;
pub use runtime::Runtime;
pub use signature::FunctionSignature;
pub use signature::ValueKind;
pub use source::ModuleSource;
pub use value::Params;
pub use value::Results;
pub use value::WasmValue;
