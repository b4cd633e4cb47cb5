//! # Instance Builder
//!
//! Collects host-function bindings keyed by (namespace, name) and resolves
//! them against the module's declared imports.
//!
//! Bindings are offers: a binding the module never asks for is ignored. Every
//! import the module does declare must be satisfied by a binding whose
//! signature matches the import slot exactly, and all of this is checked
//! before any guest code runs.
//!
//! # Example
//!
//! ```rust,no_run
//! # use wasirun::{HostTable, ModuleSource, Runtime};
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let rt = Runtime::new()?;
//! let mut instance = rt
//!     .instantiate(ModuleSource::file("app.wasm"))
//!     .host_table(HostTable::wasi())
//!     .context(|cx| {
//!         cx.arg("app.wasm");
//!     })
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::collections::HashSet;

use tracing::debug;
use tracing::trace;
use wasmtime::ExternType;
use wasmtime::Linker;
use wasmtime::Module;
use wasmtime::Store;

use crate::context::Budget;
use crate::context::ContextBuilder;
use crate::context::HostCtx;
use crate::host::HostFunc;
use crate::host::HostTable;
use crate::instance::Instance;
use crate::runtime::Runtime;
use crate::signature::FunctionSignature;
use crate::source::ModuleSource;

/// Construction failures. Each is fatal to the build and leaves no instance.
#[derive(Debug)]
pub enum Error {
    /// The module source could not be read.
    Source(std::io::Error),
    /// The module bytes do not have the expected Adler-32.
    ChecksumMismatch { expected: u32, actual: u32 },
    /// The engine rejected the module bytes.
    MalformedModule(wasmtime::Error),
    /// The module declares an import no binding satisfies.
    UnresolvedImport { namespace: String, name: String },
    /// A binding's signature disagrees with the import slot it targets.
    SignatureMismatch {
        namespace: String,
        name: String,
        expected: String,
        found: FunctionSignature,
    },
    /// The fuel budget could not be applied to the store.
    Fuel(wasmtime::Error),
    /// Linking or running the module's start function failed.
    Instantiate(wasmtime::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(e) => write!(f, "Source error: {}", e),
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "Checksum mismatch: expected {:#010x}, module has {:#010x}",
                expected, actual
            ),
            Self::MalformedModule(e) => write!(f, "Malformed module: {}", e),
            Self::UnresolvedImport { namespace, name } => {
                write!(f, "Unresolved import: {}::{}", namespace, name)
            }
            Self::SignatureMismatch { namespace, name, expected, found } => write!(
                f,
                "Signature mismatch for import {}::{}: module declares {}, binding provides {}",
                namespace, name, expected, found
            ),
            Self::Fuel(e) => write!(f, "Fuel error: {}", e),
            Self::Instantiate(e) => write!(f, "Instantiate error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Source(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Source(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Single-use builder: `build` consumes it together with its bindings.
pub struct InstanceBuilder {
    runtime: Runtime,
    source: ModuleSource,
    bindings: HashMap<(String, String), HostFunc>,
    context_builder: ContextBuilder,
    budget: Budget,
    expected_checksum: Option<u32>,
}

impl InstanceBuilder {
    pub fn new(runtime: &Runtime, source: ModuleSource) -> Self {
        Self {
            runtime: runtime.clone(),
            source,
            bindings: HashMap::new(),
            context_builder: ContextBuilder::new(),
            budget: Budget::unlimited(),
            expected_checksum: None,
        }
    }

    /// Offers `func` for the import `namespace::name`.
    ///
    /// Never fails: a binding for an import the module does not declare is
    /// simply unused. Offering the same key twice keeps the later binding.
    pub fn try_import(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        func: HostFunc,
    ) -> Self {
        self.bindings.insert((namespace.into(), name.into()), func);
        self
    }

    /// Offers every entry of `table`.
    pub fn host_table(self, table: HostTable) -> Self {
        table
            .into_iter()
            .fold(self, |builder, entry| builder.try_import(entry.namespace, entry.name, entry.func))
    }

    /// Configures the host context (arguments, environment, output sinks).
    pub fn context(mut self, f: impl FnOnce(&mut ContextBuilder)) -> Self {
        f(&mut self.context_builder);
        self
    }

    pub fn budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    /// Requires the module bytes to have this Adler-32.
    pub fn expect_checksum(mut self, checksum: u32) -> Self {
        self.expected_checksum = Some(checksum);
        self
    }

    /// Loads, verifies, links and instantiates the module.
    pub fn build(self) -> Result<Instance> {
        let engine = self.runtime.engine();

        let loaded = self.source.load()?;
        debug!(
            source = %self.source,
            len = loaded.bytes.len(),
            checksum = loaded.checksum,
            "loaded module"
        );
        if let Some(expected) = self.expected_checksum {
            if expected != loaded.checksum {
                return Err(Error::ChecksumMismatch { expected, actual: loaded.checksum });
            }
        }

        let module = Module::new(engine, &loaded.bytes).map_err(Error::MalformedModule)?;

        let mut linker = Linker::<HostCtx>::new(engine);
        let bindings = self.bindings;
        let mut used = HashSet::new();

        for import in module.imports() {
            let namespace = import.module();
            let name = import.name();
            let key = (namespace.to_string(), name.to_string());

            let Some(func) = bindings.get(&key).cloned() else {
                return Err(unresolved(namespace, name));
            };
            let ExternType::Func(slot_ty) = import.ty() else {
                // Only functions can be bound; a memory/table/global import
                // is never satisfied by a host function.
                return Err(unresolved(namespace, name));
            };

            let slot = FunctionSignature::from_func_type(&slot_ty);
            if slot.as_ref().ok() != Some(func.signature()) {
                return Err(Error::SignatureMismatch {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    expected: match slot {
                        Ok(sig) => sig.to_string(),
                        Err(e) => e.to_string(),
                    },
                    found: func.signature().clone(),
                });
            }

            // A module may declare the same import more than once.
            if !used.insert(key) {
                continue;
            }

            trace!(namespace, name, signature = %func.signature(), "binding host import");
            linker
                .func_new(namespace, name, slot_ty, move |caller, params, results| {
                    func.call(caller, params, results)
                })
                .map_err(Error::Instantiate)?;
        }

        let unused = bindings.len() - used.len();
        if unused > 0 {
            debug!(unused, "module ignored offered bindings");
        }

        let ctx = self.context_builder.build();
        let mut store = Store::new(engine, ctx);
        store
            .set_fuel(self.budget.fuel_or_max())
            .map_err(Error::Fuel)?;

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(Error::Instantiate)?;

        Ok(Instance::new(store, instance))
    }
}

fn unresolved(namespace: &str, name: &str) -> Error {
    Error::UnresolvedImport {
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}
