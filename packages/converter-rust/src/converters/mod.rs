//! Builtin converter sets.
//!
//! - [`core`]: text, numeric, byte and JSON conversions between builtins
//! - [`fallbacks`]: the to-string and enum-by-name fallbacks every engine
//!   installs
//! - [`json`]: serde-backed bindings for domain types

pub mod core;
pub mod fallbacks;
pub mod json;

use std::any::{type_name, Any};

use conduit_core::{ConversionCall, ConverterError};

pub use self::core::CoreConverterLoader;
pub use fallbacks::{EnumFallback, ToStringFallback};
pub use json::JsonBinding;

/// Typed payload of the value being converted.
///
/// # Errors
///
/// `Failed` when the payload is not a `T`, which means the value was
/// tagged with a type whose converters expect another payload.
pub fn payload<'c, T: Any>(call: &'c ConversionCall<'_>) -> Result<&'c T, ConverterError> {
    call.value.downcast_ref::<T>().ok_or_else(|| {
        ConverterError::msg(format!(
            "{} value does not carry a {} payload",
            call.value.type_descriptor(),
            type_name::<T>()
        ))
    })
}
