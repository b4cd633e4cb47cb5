//! # Runtime
//!
//! Owns the configured engine. Every instance built from one `Runtime` shares
//! its compilation settings; the runtime itself holds no per-instance state.

use wasmtime::Config;
use wasmtime::Engine;

use crate::builder::InstanceBuilder;
use crate::source::ModuleSource;

#[derive(Debug)]
pub enum Error {
    Engine(wasmtime::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine(e) => write!(f, "Engine error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Shared engine handle. Cloning is cheap.
#[derive(Clone)]
pub struct Runtime {
    engine: Engine,
}

impl Runtime {
    /// Creates a runtime with the default configuration: synchronous
    /// execution with fuel metering enabled, so a `Budget` can be applied.
    pub fn new() -> Result<Self> {
        let mut config = Config::new();
        config.consume_fuel(true);

        let engine = Engine::new(&config).map_err(Error::Engine)?;
        Ok(Self { engine })
    }

    /// Creates a runtime around a caller-configured engine.
    ///
    /// The engine must have fuel metering enabled, and must not have async
    /// support enabled.
    pub fn with_engine(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Starts building an instance of `source`.
    pub fn instantiate(&self, source: impl Into<ModuleSource>) -> InstanceBuilder {
        InstanceBuilder::new(self, source.into())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}
