//! Error taxonomy for conversions and registration.

use crate::descriptor::TypeDescriptor;
use crate::key::TypeKey;

/// Errors surfaced by the conversion entry points and the registration API.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// No direct, resolved, or fallback converter exists for the pair.
    /// Only `mandatory_convert` raises this.
    #[error("no type converter available to convert from type: {from_type} to the required type: {target} with value {value}")]
    NoConversionAvailable {
        value: String,
        from_type: String,
        target: TypeDescriptor,
    },
    /// A conversion function failed for this specific value.
    #[error("error during type conversion from type: {from_type} to the required type: {target} with value {value}: {cause}")]
    ConversionFailed {
        value: String,
        from_type: String,
        target: TypeDescriptor,
        #[source]
        cause: anyhow::Error,
    },
    /// A conversion was attempted while the engine is not started.
    #[error("type converter engine is not started (state: {state})")]
    EngineNotStarted { state: &'static str },
    /// A converter already exists for the key and the engine is configured
    /// to reject duplicates.
    #[error("type converter already registered for {key}")]
    ConverterExists { key: TypeKey },
    /// A registration could not be applied (unknown type name, failing loader).
    #[error("misconfigured converter registration: {reason}")]
    Misconfigured { reason: String },
}

impl ConversionError {
    /// Whether this is the structural "no conversion" failure.
    #[must_use]
    pub fn is_no_conversion(&self) -> bool {
        matches!(self, Self::NoConversionAvailable { .. })
    }

    /// Whether a conversion function failed.
    #[must_use]
    pub fn is_conversion_failed(&self) -> bool {
        matches!(self, Self::ConversionFailed { .. })
    }
}

/// Failure signalled by a conversion function.
#[derive(Debug, thiserror::Error)]
pub enum ConverterError {
    /// Application-level failure for this value (e.g. malformed input).
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
    /// The value could not be produced, but this is not a failure worth
    /// surfacing; callers see "no conversion".
    #[error("no value produced: {0}")]
    NoValue(String),
}

impl ConverterError {
    /// Wraps any error as an application failure.
    pub fn failed(err: impl Into<anyhow::Error>) -> Self {
        Self::Failed(err.into())
    }

    /// Application failure from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(anyhow::Error::msg(message.into()))
    }
}
