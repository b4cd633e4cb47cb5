//! # Entry-point driver
//!
//! Builds an instance with the WASI host table, invokes `_start`, and reduces
//! what happened to a process exit status.
//!
//! The driver moves through `Building`, then `Invoking`, and ends in one of
//! `Returned`, `Exited` or `Faulted`. Each state is a tracing span or event.
//!
//! ```rust,no_run
//! use std::process::ExitCode;
//! use std::process::Termination;
//!
//! fn main() -> ExitCode {
//!     match wasirun::run("hello.wasm") {
//!         Ok(status) => status.report(),
//!         Err(e) => e.report(),
//!     }
//! }
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::process::Termination;

use tracing::debug;
use tracing::info;
use tracing::info_span;
use tracing::warn;

use crate::builder;
use crate::context::Budget;
use crate::context::Output;
use crate::exit::Outcome;
use crate::host::HostTable;
use crate::instance;
use crate::runtime;
use crate::runtime::Runtime;
use crate::source::ModuleSource;

/// Name of the export the driver calls.
pub const ENTRY_POINT: &str = "_start";

// A guest may `proc_exit` with any of the codes below itself. The process
// status alone does not tell the two apart; `Status` and `Error` do.

/// Exit status for a module that could not be built.
pub const EXIT_BUILD_FAILED: u8 = 126;
/// Exit status for a module without a usable entry point.
pub const EXIT_NO_ENTRY: u8 = 127;
/// Exit status for a guest that faulted while running.
pub const EXIT_FAULTED: u8 = 134;

/// How a successful run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// `_start` returned normally.
    Returned,
    /// The guest called `proc_exit` with this code.
    Exited(i32),
}

impl Status {
    pub fn code(&self) -> i32 {
        match self {
            Self::Returned => 0,
            Self::Exited(code) => *code,
        }
    }
}

impl Termination for Status {
    fn report(self) -> ExitCode {
        // Out-of-range codes must not wrap around into a success status.
        match u8::try_from(self.code()) {
            Ok(code) => ExitCode::from(code),
            Err(_) => ExitCode::FAILURE,
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Runtime(runtime::Error),
    Build(builder::Error),
    Invoke(instance::Error),
}

impl Error {
    /// The process exit status this failure maps to.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Runtime(_) | Self::Build(_) => EXIT_BUILD_FAILED,
            Self::Invoke(instance::Error::ExecutionFault(_)) => EXIT_FAULTED,
            Self::Invoke(_) => EXIT_NO_ENTRY,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Runtime(e) => write!(f, "Runtime error: {}", e),
            Self::Build(e) => write!(f, "Build error: {}", e),
            Self::Invoke(e) => write!(f, "Invoke error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Runtime(e) => Some(e),
            Self::Build(e) => Some(e),
            Self::Invoke(e) => Some(e),
        }
    }
}

impl From<runtime::Error> for Error {
    fn from(e: runtime::Error) -> Self {
        Self::Runtime(e)
    }
}

impl From<builder::Error> for Error {
    fn from(e: builder::Error) -> Self {
        Self::Build(e)
    }
}

impl From<instance::Error> for Error {
    fn from(e: instance::Error) -> Self {
        Self::Invoke(e)
    }
}

impl Termination for Error {
    fn report(self) -> ExitCode {
        eprintln!("Error: {}", self);
        ExitCode::from(self.exit_code())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Runs a module's `_start` with the WASI host table.
pub struct Driver {
    source: ModuleSource,
    runtime: Option<Runtime>,
    args: Vec<String>,
    env: Vec<(String, String)>,
    budget: Budget,
    stdout: Output,
    stderr: Output,
    host_table: Option<HostTable>,
    expected_checksum: Option<u32>,
}

impl Driver {
    pub fn new(source: impl Into<ModuleSource>) -> Self {
        Self {
            source: source.into(),
            runtime: None,
            args: Vec::new(),
            env: Vec::new(),
            budget: Budget::unlimited(),
            stdout: Output::Inherit,
            stderr: Output::Inherit,
            host_table: None,
            expected_checksum: None,
        }
    }

    /// Uses an existing runtime instead of creating one per run.
    pub fn runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Program arguments, `argv[0]` included.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn stdout(mut self, output: Output) -> Self {
        self.stdout = output;
        self
    }

    pub fn stderr(mut self, output: Output) -> Self {
        self.stderr = output;
        self
    }

    /// Replaces the default WASI host table.
    pub fn host_table(mut self, table: HostTable) -> Self {
        self.host_table = Some(table);
        self
    }

    pub fn expect_checksum(mut self, checksum: u32) -> Self {
        self.expected_checksum = Some(checksum);
        self
    }

    pub fn run(self) -> Result<Status> {
        let span = info_span!("run", source = %self.source);
        let _enter = span.enter();

        let result = self.run_inner();
        match &result {
            Ok(status) => info!(code = status.code(), "finished"),
            Err(e) => warn!(error = %e, exit_code = e.exit_code(), "faulted"),
        }
        result
    }

    fn run_inner(self) -> Result<Status> {
        let mut instance = {
            let _building = info_span!("building").entered();

            let runtime = match self.runtime {
                Some(runtime) => runtime,
                None => Runtime::new()?,
            };
            let table = self.host_table.unwrap_or_else(HostTable::wasi);

            let (args, env, stdout, stderr) = (self.args, self.env, self.stdout, self.stderr);
            let mut builder = runtime
                .instantiate(self.source)
                .host_table(table)
                .budget(self.budget)
                .context(|cx| {
                    cx.args(args).stdout(stdout).stderr(stderr);
                    for (key, value) in env {
                        cx.env(key, value);
                    }
                });
            if let Some(checksum) = self.expected_checksum {
                builder = builder.expect_checksum(checksum);
            }
            builder.build()?
        };

        let _invoking = info_span!("invoking", entry = ENTRY_POINT).entered();
        let mut entry = instance.get_function(ENTRY_POINT)?;
        let status = match entry.invoke::<(), ()>(())? {
            Outcome::Returned(()) => {
                debug!("returned");
                Status::Returned
            }
            Outcome::Exited(signal) => {
                debug!(code = signal.code(), "exited");
                Status::Exited(signal.code())
            }
        };
        Ok(status)
    }
}

/// Runs the module at `path` with default settings and `argv[0] = path`.
pub fn run(path: impl AsRef<Path>) -> Result<Status> {
    let path = path.as_ref();
    Driver::new(path)
        .args([path.display().to_string()])
        .run()
}
