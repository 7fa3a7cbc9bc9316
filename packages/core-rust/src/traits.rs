use std::fmt;
use std::sync::Arc;

use crate::context::ConversionContext;
use crate::descriptor::TypeDescriptor;
use crate::error::{ConversionError, ConverterError};
use crate::value::{Typed, Value};

/// Result of a single conversion function invocation.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The value was converted.
    Converted(Value),
    /// This function does not know how to convert the value; try the next
    /// strategy.
    Pass,
    /// This specific value cannot be converted. Stops the fallback chain
    /// without marking the type pair as a miss.
    Reject,
    /// The type pair can never be converted. Stops the fallback chain and
    /// marks the pair as a miss.
    Impossible,
}

impl Outcome {
    /// Converted outcome for a payload that maps to a builtin type.
    pub fn value<T: Typed>(payload: T) -> Self {
        Self::Converted(Value::of(payload))
    }

    #[must_use]
    pub fn is_converted(&self) -> bool {
        matches!(self, Self::Converted(_))
    }

    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Converted(value) => Some(value),
            Self::Pass | Self::Reject | Self::Impossible => None,
        }
    }
}

/// Arguments of a conversion function invocation.
///
/// `converter` is the engine performing the conversion, so functions can
/// convert nested values recursively.
pub struct ConversionCall<'a> {
    pub target: &'a TypeDescriptor,
    pub context: &'a ConversionContext,
    pub value: &'a Value,
    pub converter: &'a dyn TypeConverter,
}

/// A conversion function registered with an engine.
///
/// Implementations are expected to be fast, synchronous and free of side
/// effects. Shared as [`ConverterRef`].
pub trait Converter: Send + Sync {
    /// Convert `call.value` to `call.target`.
    ///
    /// # Errors
    ///
    /// [`ConverterError::Failed`] for application failures,
    /// [`ConverterError::NoValue`] when nothing could be produced.
    fn convert(&self, call: &ConversionCall<'_>) -> Result<Outcome, ConverterError>;

    /// Human-readable name used in logs.
    fn name(&self) -> &str;
}

pub type ConverterRef = Arc<dyn Converter>;

/// Adapts a closure into a [`Converter`].
pub struct FnConverter<F> {
    name: String,
    func: F,
}

impl<F> FnConverter<F> {
    pub fn new(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&ConversionCall<'_>) -> Result<Outcome, ConverterError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Converter for FnConverter<F>
where
    F: Fn(&ConversionCall<'_>) -> Result<Outcome, ConverterError> + Send + Sync + 'static,
{
    fn convert(&self, call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
        (self.func)(call)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnConverter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConverter").field("name", &self.name).finish()
    }
}

/// Shorthand for a shared closure converter.
pub fn converter_fn<F>(name: impl Into<String>, func: F) -> ConverterRef
where
    F: Fn(&ConversionCall<'_>) -> Result<Outcome, ConverterError> + Send + Sync + 'static,
{
    Arc::new(FnConverter::new(name, func))
}

/// Query interface exposed to the routing engine and to conversion
/// functions themselves.
pub trait TypeConverter: Send + Sync {
    /// Converts `value` to `target`; `Ok(None)` when no conversion exists.
    ///
    /// # Errors
    ///
    /// `ConversionFailed` when a conversion function fails,
    /// `EngineNotStarted` before the engine is started.
    fn convert(
        &self,
        target: &TypeDescriptor,
        ctx: &ConversionContext,
        value: Option<&Value>,
    ) -> Result<Option<Value>, ConversionError>;

    /// Like [`TypeConverter::convert`] but a missing conversion is an error.
    ///
    /// # Errors
    ///
    /// `NoConversionAvailable` in addition to the errors of `convert`.
    fn mandatory_convert(
        &self,
        target: &TypeDescriptor,
        ctx: &ConversionContext,
        value: Option<&Value>,
    ) -> Result<Value, ConversionError>;

    /// Best-effort probe; never fails.
    fn try_convert(
        &self,
        target: &TypeDescriptor,
        ctx: &ConversionContext,
        value: Option<&Value>,
    ) -> Option<Value>;

    /// Resolves the conversion function for a type pair without invoking it.
    fn lookup(&self, target: &TypeDescriptor, source: &TypeDescriptor) -> Option<ConverterRef>;
}

/// Typed helpers over any [`TypeConverter`].
pub trait TypeConverterExt: TypeConverter {
    /// Converts to the builtin type of `T` and extracts the payload.
    ///
    /// # Errors
    ///
    /// As [`TypeConverter::convert`]; also `ConversionFailed` if the
    /// converter produced a payload that is not a `T`.
    fn convert_to<T: Typed + Clone>(
        &self,
        ctx: &ConversionContext,
        value: &Value,
    ) -> Result<Option<T>, ConversionError> {
        let target = T::descriptor();
        match self.convert(&target, ctx, Some(value))? {
            Some(converted) => extract::<T>(&target, ctx, value, &converted).map(Some),
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// As [`TypeConverter::mandatory_convert`].
    fn mandatory_convert_to<T: Typed + Clone>(
        &self,
        ctx: &ConversionContext,
        value: &Value,
    ) -> Result<T, ConversionError> {
        let target = T::descriptor();
        let converted = self.mandatory_convert(&target, ctx, Some(value))?;
        extract::<T>(&target, ctx, value, &converted)
    }

    fn try_convert_to<T: Typed + Clone>(&self, ctx: &ConversionContext, value: &Value) -> Option<T> {
        self.try_convert(&T::descriptor(), ctx, Some(value))
            .and_then(|converted| converted.downcast_ref::<T>().cloned())
    }
}

impl<C: TypeConverter + ?Sized> TypeConverterExt for C {}

fn extract<T: Typed + Clone>(
    target: &TypeDescriptor,
    ctx: &ConversionContext,
    original: &Value,
    converted: &Value,
) -> Result<T, ConversionError> {
    converted
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| ConversionError::ConversionFailed {
            value: original.describe(ctx.max_logged_chars),
            from_type: original.type_descriptor().name().to_string(),
            target: target.clone(),
            cause: anyhow::anyhow!(
                "converter produced a {} payload that is not a {}",
                converted.type_descriptor(),
                std::any::type_name::<T>()
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;

    /// Minimal converter that only knows string -> integer parsing.
    struct ParsingConverter;

    impl TypeConverter for ParsingConverter {
        fn convert(
            &self,
            target: &TypeDescriptor,
            ctx: &ConversionContext,
            value: Option<&Value>,
        ) -> Result<Option<Value>, ConversionError> {
            let Some(value) = value else { return Ok(None) };
            if *target != builtin::integer() {
                return Ok(None);
            }
            let text = value.downcast_ref::<String>().cloned().unwrap_or_default();
            text.parse::<i32>()
                .map(|n| Some(Value::of(n)))
                .map_err(|e| ConversionError::ConversionFailed {
                    value: value.describe(ctx.max_logged_chars),
                    from_type: value.type_descriptor().name().to_string(),
                    target: target.clone(),
                    cause: e.into(),
                })
        }

        fn mandatory_convert(
            &self,
            target: &TypeDescriptor,
            ctx: &ConversionContext,
            value: Option<&Value>,
        ) -> Result<Value, ConversionError> {
            self.convert(target, ctx, value)?
                .ok_or_else(|| ConversionError::NoConversionAvailable {
                    value: "null".to_string(),
                    from_type: "null".to_string(),
                    target: target.clone(),
                })
        }

        fn try_convert(
            &self,
            target: &TypeDescriptor,
            ctx: &ConversionContext,
            value: Option<&Value>,
        ) -> Option<Value> {
            self.convert(target, ctx, value).ok().flatten()
        }

        fn lookup(&self, _target: &TypeDescriptor, _source: &TypeDescriptor) -> Option<ConverterRef> {
            None
        }
    }

    #[test]
    fn fn_converter_invokes_closure() {
        let upper = converter_fn("upper", |call: &ConversionCall<'_>| {
            let text = call.value.downcast_ref::<String>().ok_or_else(|| ConverterError::msg("not text"))?;
            Ok(Outcome::value(text.to_uppercase()))
        });
        let ctx = ConversionContext::default();
        let value = Value::of("abc".to_string());
        let call = ConversionCall {
            target: &builtin::string(),
            context: &ctx,
            value: &value,
            converter: &ParsingConverter,
        };
        let out = upper.convert(&call).unwrap().into_value().unwrap();
        assert_eq!(out.downcast_ref::<String>().map(String::as_str), Some("ABC"));
        assert_eq!(upper.name(), "upper");
    }

    #[test]
    fn outcome_into_value_only_for_converted() {
        assert!(Outcome::value(1i32).is_converted());
        assert!(Outcome::Pass.into_value().is_none());
        assert!(Outcome::Reject.into_value().is_none());
        assert!(Outcome::Impossible.into_value().is_none());
    }

    #[test]
    fn typed_helpers_extract_payload() {
        let ctx = ConversionContext::default();
        let conv = ParsingConverter;
        let value = Value::of("42".to_string());

        assert_eq!(conv.convert_to::<i32>(&ctx, &value).unwrap(), Some(42));
        assert_eq!(conv.mandatory_convert_to::<i32>(&ctx, &value).unwrap(), 42);
        assert_eq!(conv.try_convert_to::<i32>(&ctx, &Value::of("x".to_string())), None);
        assert_eq!(conv.convert_to::<String>(&ctx, &value).unwrap(), None);
    }

    #[test]
    fn typed_helper_rejects_mismatched_payload() {
        struct Liar;
        impl TypeConverter for Liar {
            fn convert(
                &self,
                _target: &TypeDescriptor,
                _ctx: &ConversionContext,
                _value: Option<&Value>,
            ) -> Result<Option<Value>, ConversionError> {
                Ok(Some(Value::new(builtin::integer(), "not an i32")))
            }
            fn mandatory_convert(
                &self,
                target: &TypeDescriptor,
                ctx: &ConversionContext,
                value: Option<&Value>,
            ) -> Result<Value, ConversionError> {
                self.convert(target, ctx, value).map(|v| v.expect("always some"))
            }
            fn try_convert(
                &self,
                target: &TypeDescriptor,
                ctx: &ConversionContext,
                value: Option<&Value>,
            ) -> Option<Value> {
                self.convert(target, ctx, value).ok().flatten()
            }
            fn lookup(&self, _: &TypeDescriptor, _: &TypeDescriptor) -> Option<ConverterRef> {
                None
            }
        }

        let err = Liar
            .convert_to::<i32>(&ConversionContext::default(), &Value::of(1i64))
            .unwrap_err();
        assert!(err.is_conversion_failed());
    }
}
