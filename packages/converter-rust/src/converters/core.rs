use bytes::Bytes;

use conduit_core::{builtin, converter_fn, ConversionCall, ConverterError, Outcome};

use super::payload;
use crate::loader::{ConverterLoader, Registrar};

/// Conversions between the builtin types.
///
/// Conversions to `string` are not registered here; the to-string fallback
/// covers every type with a display hook.
pub struct CoreConverterLoader;

impl ConverterLoader for CoreConverterLoader {
    fn name(&self) -> &str {
        "core"
    }

    fn load(&self, registrar: &mut Registrar<'_>) -> anyhow::Result<()> {
        let string = builtin::string();
        let integer = builtin::integer();
        let long = builtin::long();
        let double = builtin::double();
        let boolean = builtin::boolean();
        let bytes = builtin::bytes();
        let json = builtin::json();

        // text
        registrar.register_converter(&string, &integer, converter_fn("string-to-integer", string_to_integer))?;
        registrar.register_converter(&string, &long, converter_fn("string-to-long", string_to_long))?;
        registrar.register_converter(&string, &double, converter_fn("string-to-double", string_to_double))?;
        registrar.register_converter(&string, &boolean, converter_fn("string-to-boolean", string_to_boolean))?;
        registrar.register_converter(
            &string,
            &builtin::character(),
            converter_fn("string-to-character", string_to_character),
        )?;

        // numeric
        registrar.register_converter(&integer, &long, converter_fn("integer-to-long", integer_to_long))?;
        registrar.register_converter(&integer, &double, converter_fn("integer-to-double", integer_to_double))?;
        registrar.register_converter(&long, &integer, converter_fn("long-to-integer", long_to_integer))?;
        registrar.register_converter(&long, &double, converter_fn("long-to-double", long_to_double))?;

        // bytes
        registrar.register_converter(&bytes, &string, converter_fn("bytes-to-string", bytes_to_string))?;
        registrar.register_converter(&string, &bytes, converter_fn("string-to-bytes", string_to_bytes))?;

        // json
        registrar.register_converter(&string, &json, converter_fn("string-to-json", string_to_json))?;
        registrar.register_converter(&json, &string, converter_fn("json-to-string", json_to_string))?;
        registrar.register_converter(&bytes, &json, converter_fn("bytes-to-json", bytes_to_json))?;
        registrar.register_converter(&json, &bytes, converter_fn("json-to-bytes", json_to_bytes))?;
        registrar.register_converter(&json, &long, converter_fn("json-to-long", json_to_long))?;
        registrar.register_converter(&json, &double, converter_fn("json-to-double", json_to_double))?;
        registrar.register_converter(&json, &boolean, converter_fn("json-to-boolean", json_to_boolean))?;
        Ok(())
    }
}

fn string_to_integer(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    let text = payload::<String>(call)?;
    text.parse::<i32>().map(Outcome::value).map_err(ConverterError::failed)
}

fn string_to_long(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    let text = payload::<String>(call)?;
    text.parse::<i64>().map(Outcome::value).map_err(ConverterError::failed)
}

fn string_to_double(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    let text = payload::<String>(call)?;
    text.parse::<f64>().map(Outcome::value).map_err(ConverterError::failed)
}

/// Case-insensitive `true`/`false`; any other text is rejected.
fn string_to_boolean(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    let text = payload::<String>(call)?;
    Ok(if text.eq_ignore_ascii_case("true") {
        Outcome::value(true)
    } else if text.eq_ignore_ascii_case("false") {
        Outcome::value(false)
    } else {
        Outcome::Reject
    })
}

fn string_to_character(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    let text = payload::<String>(call)?;
    let mut chars = text.chars();
    Ok(match (chars.next(), chars.next()) {
        (Some(c), None) => Outcome::value(c),
        _ => Outcome::Reject,
    })
}

fn integer_to_long(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    Ok(Outcome::value(i64::from(*payload::<i32>(call)?)))
}

fn integer_to_double(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    Ok(Outcome::value(f64::from(*payload::<i32>(call)?)))
}

fn long_to_integer(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    i32::try_from(*payload::<i64>(call)?)
        .map(Outcome::value)
        .map_err(ConverterError::failed)
}

#[allow(clippy::cast_precision_loss)]
fn long_to_double(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    Ok(Outcome::value(*payload::<i64>(call)? as f64))
}

fn bytes_to_string(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    let raw = payload::<Bytes>(call)?;
    String::from_utf8(raw.to_vec())
        .map(Outcome::value)
        .map_err(ConverterError::failed)
}

fn string_to_bytes(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    Ok(Outcome::value(Bytes::from(payload::<String>(call)?.clone())))
}

fn string_to_json(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    serde_json::from_str::<serde_json::Value>(payload::<String>(call)?)
        .map(Outcome::value)
        .map_err(ConverterError::failed)
}

fn json_to_string(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    serde_json::to_string(payload::<serde_json::Value>(call)?)
        .map(Outcome::value)
        .map_err(ConverterError::failed)
}

fn bytes_to_json(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    serde_json::from_slice::<serde_json::Value>(payload::<Bytes>(call)?)
        .map(Outcome::value)
        .map_err(ConverterError::failed)
}

fn json_to_bytes(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    serde_json::to_vec(payload::<serde_json::Value>(call)?)
        .map(|raw| Outcome::value(Bytes::from(raw)))
        .map_err(ConverterError::failed)
}

fn json_to_long(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    let doc = payload::<serde_json::Value>(call)?;
    Ok(doc.as_i64().map_or(Outcome::Reject, Outcome::value))
}

fn json_to_double(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    let doc = payload::<serde_json::Value>(call)?;
    Ok(doc.as_f64().map_or(Outcome::Reject, Outcome::value))
}

fn json_to_boolean(call: &ConversionCall<'_>) -> Result<Outcome, ConverterError> {
    let doc = payload::<serde_json::Value>(call)?;
    Ok(doc.as_bool().map_or(Outcome::Reject, Outcome::value))
}
