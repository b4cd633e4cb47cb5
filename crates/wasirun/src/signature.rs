//! # Function signatures
//!
//! The structural type contract shared by import slots, host functions, and
//! exports. Only the four numeric value kinds cross the host boundary; vector
//! and reference types have no `ValueKind` and can never be bound or invoked.

use wasmtime::FuncType;
use wasmtime::ValType;

#[derive(Debug, Clone)]
pub enum Error {
    /// The engine type has no host-side counterpart.
    UnsupportedType(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedType(ty) => write!(f, "unsupported value type: {}", ty),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// A numeric WebAssembly value kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    I32,
    I64,
    F32,
    F64,
}

impl ValueKind {
    pub fn from_val_type(ty: &ValType) -> Result<Self> {
        match ty {
            ValType::I32 => Ok(Self::I32),
            ValType::I64 => Ok(Self::I64),
            ValType::F32 => Ok(Self::F32),
            ValType::F64 => Ok(Self::F64),
            other => Err(Error::UnsupportedType(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered parameter kinds and result kinds. An empty `results` is void.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    pub params: Vec<ValueKind>,
    pub results: Vec<ValueKind>,
}

impl FunctionSignature {
    pub fn new(
        params: impl IntoIterator<Item = ValueKind>,
        results: impl IntoIterator<Item = ValueKind>,
    ) -> Self {
        Self {
            params: params.into_iter().collect(),
            results: results.into_iter().collect(),
        }
    }

    /// Converts an engine function type, failing on the first kind that has
    /// no `ValueKind`.
    pub fn from_func_type(ty: &FuncType) -> Result<Self> {
        let params = ty
            .params()
            .map(|p| ValueKind::from_val_type(&p))
            .collect::<Result<Vec<_>>>()?;
        let results = ty
            .results()
            .map(|r| ValueKind::from_val_type(&r))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { params, results })
    }
}

impl std::fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn list(f: &mut std::fmt::Formatter<'_>, kinds: &[ValueKind]) -> std::fmt::Result {
            f.write_str("(")?;
            for (i, kind) in kinds.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", kind)?;
            }
            f.write_str(")")
        }

        list(f, &self.params)?;
        f.write_str(" -> ")?;
        list(f, &self.results)
    }
}
