//! # Instance and Callee
//!
//! An `Instance` owns the engine store and the instantiated module. Exported
//! functions are reached through a `Callee`, which mutably borrows its
//! instance: it cannot outlive it, and only one call can be in flight.

use tracing::debug;
use wasmtime::Func;
use wasmtime::Store;
use wasmtime::Val;
use wasmtime::ValType;

use crate::context::HostCtx;
use crate::exit::ExitSignal;
use crate::exit::Outcome;
use crate::signature::FunctionSignature;
use crate::value::Params;
use crate::value::Results;

/// Invocation failures. Fatal to the call; nothing is retried.
#[derive(Debug)]
pub enum Error {
    /// No function is exported under this name.
    ExportNotFound(String),
    /// The requested parameter or result kinds disagree with the export.
    SignatureMismatch {
        export: String,
        expected: String,
        found: FunctionSignature,
    },
    /// The guest trapped, or a host function failed, for any reason other
    /// than a requested exit.
    ExecutionFault(wasmtime::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExportNotFound(name) => write!(f, "Export not found: {}", name),
            Self::SignatureMismatch { export, expected, found } => write!(
                f,
                "Signature mismatch for export {}: export is {}, call requested {}",
                export, expected, found
            ),
            Self::ExecutionFault(e) => write!(f, "Execution fault: {:?}", e),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// An instantiated module with its own store.
pub struct Instance {
    store: Store<HostCtx>,
    instance: wasmtime::Instance,
}

impl Instance {
    pub(crate) fn new(store: Store<HostCtx>, instance: wasmtime::Instance) -> Self {
        Self { store, instance }
    }

    /// Looks up an exported function.
    pub fn get_function(&mut self, name: &str) -> Result<Callee<'_>> {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| Error::ExportNotFound(name.to_string()))?;

        Ok(Callee {
            name: name.to_string(),
            func,
            instance: self,
        })
    }

    pub fn has_export(&mut self, name: &str) -> bool {
        self.instance.get_func(&mut self.store, name).is_some()
    }

    pub fn context(&self) -> &HostCtx {
        self.store.data()
    }

    pub fn context_mut(&mut self) -> &mut HostCtx {
        self.store.data_mut()
    }

    /// Fuel left in the store's budget.
    pub fn fuel_remaining(&self) -> Option<u64> {
        self.store.get_fuel().ok()
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("context", self.store.data())
            .finish_non_exhaustive()
    }
}

/// A borrowed handle to one exported function.
pub struct Callee<'a> {
    name: String,
    func: Func,
    instance: &'a mut Instance,
}

impl Callee<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The export's declared signature, or an error naming the first value
    /// type that cannot cross the host boundary.
    pub fn signature(&self) -> std::result::Result<FunctionSignature, crate::signature::Error> {
        FunctionSignature::from_func_type(&self.func.ty(&self.instance.store))
    }

    /// Calls the export with typed parameters and results.
    ///
    /// `P` and `R` must describe the export's signature exactly; this is
    /// checked before the call. An `ExitSignal` raised while the guest runs
    /// comes back as `Outcome::Exited`, never as an error.
    pub fn invoke<P, R>(&mut self, params: P) -> Result<Outcome<R>>
    where
        P: Params,
        R: Results,
    {
        let ty = self.func.ty(&self.instance.store);
        let requested = FunctionSignature::new(P::kinds(), R::kinds());
        let declared = FunctionSignature::from_func_type(&ty);

        if declared.as_ref().ok() != Some(&requested) {
            return Err(Error::SignatureMismatch {
                export: self.name.clone(),
                expected: match declared {
                    Ok(sig) => sig.to_string(),
                    Err(e) => e.to_string(),
                },
                found: requested,
            });
        }

        let args = params.into_vals();
        let mut results: Vec<Val> = ty.results().map(|t| default_val(&t)).collect();

        debug!(export = %self.name, "invoking");
        match self.func.call(&mut self.instance.store, &args, &mut results) {
            Ok(()) => R::from_vals(&results).map(Outcome::Returned).ok_or_else(|| {
                Error::ExecutionFault(wasmtime::Error::msg(format!(
                    "export {} produced results of the wrong kind",
                    self.name
                )))
            }),
            Err(e) => match ExitSignal::caught(&e) {
                Some(signal) => {
                    debug!(export = %self.name, code = signal.code(), "guest exited");
                    Ok(Outcome::Exited(signal))
                }
                None => Err(Error::ExecutionFault(e)),
            },
        }
    }
}

fn default_val(ty: &ValType) -> Val {
    match ty {
        ValType::I64 => Val::I64(0),
        ValType::F32 => Val::F32(0),
        ValType::F64 => Val::F64(0),
        _ => Val::I32(0),
    }
}
