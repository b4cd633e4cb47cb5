//! # Typed values
//!
//! Static descriptions of argument and result lists for typed invocation.
//! A `Params` or `Results` type knows its own `ValueKind` list, which is
//! compared against the export's signature before any call is made.

use wasmtime::Val;

use crate::signature::ValueKind;

/// A single numeric value that maps one-to-one onto a `ValueKind`.
pub trait WasmValue: Sized {
    const KIND: ValueKind;

    fn into_val(self) -> Val;

    fn from_val(val: &Val) -> Option<Self>;
}

/// Argument list accepted by `Callee::invoke`.
pub trait Params {
    fn kinds() -> Vec<ValueKind>;

    fn into_vals(self) -> Vec<Val>;
}

/// Result list produced by `Callee::invoke`.
pub trait Results: Sized {
    fn kinds() -> Vec<ValueKind>;

    /// Returns `None` if the values disagree with `kinds()` in count or kind.
    fn from_vals(vals: &[Val]) -> Option<Self>;
}

macro_rules! scalar {
    ($ty:ty, $kind:ident, $getter:ident) => {
        impl WasmValue for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn into_val(self) -> Val {
                Val::from(self)
            }

            fn from_val(val: &Val) -> Option<Self> {
                val.$getter()
            }
        }

        impl Params for $ty {
            fn kinds() -> Vec<ValueKind> {
                vec![ValueKind::$kind]
            }

            fn into_vals(self) -> Vec<Val> {
                vec![Val::from(self)]
            }
        }

        impl Results for $ty {
            fn kinds() -> Vec<ValueKind> {
                vec![ValueKind::$kind]
            }

            fn from_vals(vals: &[Val]) -> Option<Self> {
                match vals {
                    [val] => val.$getter(),
                    _ => None,
                }
            }
        }
    };
}

scalar!(i32, I32, i32);
scalar!(i64, I64, i64);
scalar!(f32, F32, f32);
scalar!(f64, F64, f64);

impl Params for () {
    fn kinds() -> Vec<ValueKind> {
        Vec::new()
    }

    fn into_vals(self) -> Vec<Val> {
        Vec::new()
    }
}

impl Results for () {
    fn kinds() -> Vec<ValueKind> {
        Vec::new()
    }

    fn from_vals(vals: &[Val]) -> Option<Self> {
        vals.is_empty().then_some(())
    }
}

macro_rules! tuple_params {
    ($($t:ident),+) => {
        impl<$($t: WasmValue),+> Params for ($($t,)+) {
            fn kinds() -> Vec<ValueKind> {
                vec![$($t::KIND),+]
            }

            #[allow(non_snake_case)]
            fn into_vals(self) -> Vec<Val> {
                let ($($t,)+) = self;
                vec![$($t.into_val()),+]
            }
        }
    };
}

macro_rules! tuple_results {
    ($($t:ident),+) => {
        impl<$($t: WasmValue),+> Results for ($($t,)+) {
            fn kinds() -> Vec<ValueKind> {
                vec![$($t::KIND),+]
            }

            fn from_vals(vals: &[Val]) -> Option<Self> {
                let mut iter = vals.iter();
                let out = ($($t::from_val(iter.next()?)?,)+);
                match iter.next() {
                    Some(_) => None,
                    None => Some(out),
                }
            }
        }
    };
}

tuple_params!(A);
tuple_params!(A, B);
tuple_params!(A, B, C);
tuple_params!(A, B, C, D);
tuple_params!(A, B, C, D, E);
tuple_params!(A, B, C, D, E, F);

tuple_results!(A);
tuple_results!(A, B);
tuple_results!(A, B, C);
tuple_results!(A, B, C, D);
