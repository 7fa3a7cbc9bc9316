//! Dynamically typed values flowing through conversions.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::builtin;
use crate::descriptor::TypeDescriptor;

/// Reference-counted payload tagged with its runtime type.
///
/// Cloning shares the payload, so the identity shortcut in the engine can
/// hand back the caller's own value (observable via [`Value::ptr_eq`]).
#[derive(Clone)]
pub struct Value {
    ty: TypeDescriptor,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Value {
    /// Wraps `payload` under an explicit runtime type.
    ///
    /// The descriptor is trusted: nothing checks that `payload` is the Rust
    /// type the descriptor's converters expect.
    pub fn new<T: Any + Send + Sync>(ty: TypeDescriptor, payload: T) -> Self {
        Self {
            ty,
            payload: Arc::new(payload),
        }
    }

    /// Wraps a payload whose Rust type maps to a builtin descriptor.
    pub fn of<T: Typed>(payload: T) -> Self {
        Self::new(T::descriptor(), payload)
    }

    /// Wraps an already shared payload.
    #[must_use]
    pub fn from_shared(ty: TypeDescriptor, payload: Arc<dyn Any + Send + Sync>) -> Self {
        Self { ty, payload }
    }

    /// Builds a constant of an enumeration type, or `None` if `name` is not
    /// one of its constants.
    #[must_use]
    pub fn enum_constant(ty: &TypeDescriptor, name: &str) -> Option<Self> {
        let ordinal = ty.constants().iter().position(|c| c == name)?;
        Some(Self::new(
            ty.clone(),
            EnumConstant {
                name: name.to_string(),
                ordinal,
            },
        ))
    }

    /// Runtime type of this value.
    #[must_use]
    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.ty
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Shared handle to the raw payload.
    #[must_use]
    pub fn payload(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.payload
    }

    /// Whether this value is an instance of `ty` (same type or subtype).
    #[must_use]
    pub fn is_instance_of(&self, ty: &TypeDescriptor) -> bool {
        ty.is_assignable_from(&self.ty)
    }

    /// Whether both values share the same payload allocation.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.payload, &b.payload)
    }

    /// Text rendering through the runtime type's display hook.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.ty.render(self.payload.as_ref())
    }

    /// Bounded description for logs and error messages: the rendered text
    /// cut to `limit` characters, or the type name when the value has no
    /// text form.
    #[must_use]
    pub fn describe(&self, limit: usize) -> String {
        match self.render() {
            Some(text) if text.chars().count() > limit => {
                let cut: String = text.chars().take(limit).collect();
                format!("{cut}... [{} chars]", text.chars().count())
            }
            Some(text) => text,
            None => format!("<{}>", self.ty.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.ty.name())
            .field("text", &self.render())
            .finish()
    }
}

/// Maps a Rust payload type to the builtin descriptor values are tagged with.
pub trait Typed: Any + Send + Sync + Sized {
    fn descriptor() -> TypeDescriptor;
}

impl Typed for String {
    fn descriptor() -> TypeDescriptor {
        builtin::string()
    }
}

impl Typed for i32 {
    fn descriptor() -> TypeDescriptor {
        builtin::integer()
    }
}

impl Typed for i64 {
    fn descriptor() -> TypeDescriptor {
        builtin::long()
    }
}

impl Typed for f64 {
    fn descriptor() -> TypeDescriptor {
        builtin::double()
    }
}

impl Typed for bool {
    fn descriptor() -> TypeDescriptor {
        builtin::boolean()
    }
}

impl Typed for char {
    fn descriptor() -> TypeDescriptor {
        builtin::character()
    }
}

impl Typed for Bytes {
    fn descriptor() -> TypeDescriptor {
        builtin::bytes()
    }
}

impl Typed for serde_json::Value {
    fn descriptor() -> TypeDescriptor {
        builtin::json()
    }
}

/// Payload of enumeration values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumConstant {
    /// Constant name as declared on the enumeration type.
    pub name: String,
    /// Zero-based declaration index.
    pub ordinal: usize,
}

impl fmt::Display for EnumConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
