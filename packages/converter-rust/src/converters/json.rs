use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use conduit_core::{builtin, converter_fn, ConversionCall, ConverterError, Outcome, TypeDescriptor, Value};

use super::payload;
use crate::loader::{ConverterLoader, Registrar};

/// Binds a serde type to a descriptor and converts it to and from JSON
/// documents, JSON text and JSON bytes.
///
/// Values of the bound type carry a `T` payload.
pub struct JsonBinding<T> {
    name: String,
    ty: TypeDescriptor,
    _payload: PhantomData<fn() -> T>,
}

impl<T> JsonBinding<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(ty: TypeDescriptor) -> Self {
        Self {
            name: format!("json-binding:{}", ty.name()),
            ty,
            _payload: PhantomData,
        }
    }

    #[must_use]
    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.ty
    }

    /// Wraps `payload` as a value of the bound type.
    #[must_use]
    pub fn value(&self, payload: T) -> Value {
        Value::new(self.ty.clone(), payload)
    }
}

impl<T> ConverterLoader for JsonBinding<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, registrar: &mut Registrar<'_>) -> anyhow::Result<()> {
        registrar.register_type(&self.ty)?;
        let name = self.ty.name();

        let ty = self.ty.clone();
        registrar.register_converter(
            &builtin::json(),
            &self.ty,
            converter_fn(format!("json-to-{name}"), move |call: &ConversionCall<'_>| {
                let doc = payload::<serde_json::Value>(call)?;
                T::deserialize(doc)
                    .map(|decoded| Outcome::Converted(Value::new(ty.clone(), decoded)))
                    .map_err(ConverterError::failed)
            }),
        )?;

        let ty = self.ty.clone();
        registrar.register_converter(
            &builtin::string(),
            &self.ty,
            converter_fn(format!("string-to-{name}"), move |call: &ConversionCall<'_>| {
                serde_json::from_str::<T>(payload::<String>(call)?)
                    .map(|decoded| Outcome::Converted(Value::new(ty.clone(), decoded)))
                    .map_err(ConverterError::failed)
            }),
        )?;

        let ty = self.ty.clone();
        registrar.register_converter(
            &builtin::bytes(),
            &self.ty,
            converter_fn(format!("bytes-to-{name}"), move |call: &ConversionCall<'_>| {
                serde_json::from_slice::<T>(payload::<Bytes>(call)?)
                    .map(|decoded| Outcome::Converted(Value::new(ty.clone(), decoded)))
                    .map_err(ConverterError::failed)
            }),
        )?;

        registrar.register_converter(
            &self.ty,
            &builtin::json(),
            converter_fn(format!("{name}-to-json"), |call: &ConversionCall<'_>| {
                serde_json::to_value(payload::<T>(call)?)
                    .map(Outcome::value)
                    .map_err(ConverterError::failed)
            }),
        )?;
        registrar.register_converter(
            &self.ty,
            &builtin::string(),
            converter_fn(format!("{name}-to-string"), |call: &ConversionCall<'_>| {
                serde_json::to_string(payload::<T>(call)?)
                    .map(Outcome::value)
                    .map_err(ConverterError::failed)
            }),
        )?;
        registrar.register_converter(
            &self.ty,
            &builtin::bytes(),
            converter_fn(format!("{name}-to-bytes"), |call: &ConversionCall<'_>| {
                serde_json::to_vec(payload::<T>(call)?)
                    .map(|raw| Outcome::value(Bytes::from(raw)))
                    .map_err(ConverterError::failed)
            }),
        )?;
        Ok(())
    }
}
