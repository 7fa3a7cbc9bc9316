use anyhow::anyhow;

use conduit_core::{
    builtin, ConversionCall, Converter, ConverterError, Outcome, Value,
};

/// Renders any value with a display hook as text.
///
/// Installed first so it is tried last. Never promoted.
#[derive(Debug, Default)]
pub struct ToStringFallback;

impl Converter for ToStringFallback {
    fn convert(&self, call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
        if !call.target.is_assignable_from(&builtin::string()) {
            return Ok(Outcome::Pass);
        }
        Ok(call.value.render().map_or(Outcome::Pass, Outcome::value))
    }

    fn name(&self) -> &str {
        "to-string"
    }
}

/// Resolves text to a constant of the target enumeration.
///
/// Names match exactly first, then ignoring ASCII case, then with `-`
/// read as `_` (so `"dark-red"` finds `DARK_RED`).
#[derive(Debug, Default)]
pub struct EnumFallback;

impl EnumFallback {
    fn find<'c>(constants: &'c [String], text: &str) -> Option<&'c str> {
        let underscored = text.replace('-', "_");
        constants
            .iter()
            .find(|c| *c == text)
            .or_else(|| constants.iter().find(|c| c.eq_ignore_ascii_case(text)))
            .or_else(|| constants.iter().find(|c| c.eq_ignore_ascii_case(&underscored)))
            .map(String::as_str)
    }
}

impl Converter for EnumFallback {
    fn convert(&self, call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
        if !call.target.is_enumeration() {
            return Ok(Outcome::Pass);
        }
        let Some(text) = call.value.downcast_ref::<String>() else {
            return Ok(Outcome::Pass);
        };
        let name = Self::find(call.target.constants(), text.trim())
            .ok_or_else(|| anyhow!("{text:?} is not a constant of {}", call.target))?;
        Value::enum_constant(call.target, name)
            .map(Outcome::Converted)
            .ok_or_else(|| ConverterError::msg(format!("{name} vanished from {}", call.target)))
    }

    fn name(&self) -> &str {
        "enum"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use conduit_core::{ConversionContext, EnumConstant, TypeDescriptor};

    use crate::config::ConverterConfig;
    use crate::engine::ConversionEngine;

    use super::*;

    fn engine() -> ConversionEngine {
        let engine = ConversionEngine::new(Arc::new(ConverterConfig::default()));
        engine.start().unwrap();
        engine
    }

    fn constant_of(value: &Value) -> Option<&EnumConstant> {
        value.downcast_ref::<EnumConstant>()
    }

    fn color() -> TypeDescriptor {
        TypeDescriptor::enumeration("acme.Color", ["RED", "DARK_RED", "green"]).build()
    }

    #[test]
    fn to_string_uses_display_hooks() {
        let engine = engine();
        let ctx = ConversionContext::default();
        let out = engine
            .convert(&builtin::string(), &ctx, Some(&Value::of(17i32)))
            .unwrap()
            .unwrap();
        assert_eq!(out.downcast_ref::<String>().map(String::as_str), Some("17"));

        let seq = engine
            .convert(&builtin::char_sequence(), &ctx, Some(&Value::of(true)))
            .unwrap()
            .unwrap();
        assert_eq!(seq.downcast_ref::<String>().map(String::as_str), Some("true"));
    }

    #[test]
    fn to_string_passes_on_opaque_values_and_is_never_promoted() {
        let engine = engine();
        let ctx = ConversionContext::default();
        let opaque = TypeDescriptor::class("acme.Blob").build();
        let blob = Value::new(opaque.clone(), vec![1u8, 2]);
        assert!(engine.convert(&builtin::string(), &ctx, Some(&blob)).unwrap().is_none());

        engine
            .convert(&builtin::string(), &ctx, Some(&Value::of(1i64)))
            .unwrap();
        assert!(engine.lookup(&builtin::string(), &builtin::long()).is_none());
    }

    #[test]
    fn enum_names_match_leniently() {
        let engine = engine();
        let ctx = ConversionContext::default();
        let color = color();
        for (input, expected) in [
            ("RED", "RED"),
            ("red", "RED"),
            ("dark-red", "DARK_RED"),
            (" DARK_RED ", "DARK_RED"),
            ("green", "green"),
            ("GREEN", "green"),
        ] {
            let value = engine
                .mandatory_convert(&color, &ctx, Some(&Value::of(input.to_string())))
                .unwrap();
            assert_eq!(constant_of(&value).map(|c| c.name.as_str()), Some(expected), "{input}");
        }
        assert_eq!(
            constant_of(&Value::enum_constant(&color, "green").unwrap()).map(|c| c.ordinal),
            Some(2)
        );
    }

    #[test]
    fn unknown_constant_is_a_failure_and_success_is_promoted() {
        let engine = engine();
        let ctx = ConversionContext::default();
        let color = color();
        let err = engine
            .convert(&color, &ctx, Some(&Value::of("blue".to_string())))
            .unwrap_err();
        assert!(err.is_conversion_failed());

        engine
            .convert(&color, &ctx, Some(&Value::of("red".to_string())))
            .unwrap();
        let promoted = engine.lookup(&color, &builtin::string()).unwrap();
        assert_eq!(promoted.name(), "enum");
    }

    #[test]
    fn enum_fallback_ignores_other_targets() {
        let engine = engine();
        let ctx = ConversionContext::default();
        let plain = TypeDescriptor::class("acme.Plain").build();
        assert!(engine
            .convert(&plain, &ctx, Some(&Value::of("RED".to_string())))
            .unwrap()
            .is_none());
    }
}
