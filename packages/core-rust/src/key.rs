use std::fmt;

use crate::builtin;
use crate::descriptor::TypeDescriptor;

/// Lookup key for the conversion table: `(target, source)`.
///
/// A `None` source denotes the null value. Using [`builtin::object`] as the
/// source registers a converter for any source type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeKey {
    target: TypeDescriptor,
    source: Option<TypeDescriptor>,
}

impl TypeKey {
    #[must_use]
    pub fn new(target: TypeDescriptor, source: TypeDescriptor) -> Self {
        Self {
            target,
            source: Some(source),
        }
    }

    /// Key for converting the null value to `target`.
    #[must_use]
    pub fn null_source(target: TypeDescriptor) -> Self {
        Self {
            target,
            source: None,
        }
    }

    /// Key matching every source type.
    #[must_use]
    pub fn any_source(target: TypeDescriptor) -> Self {
        Self::new(target, builtin::object())
    }

    #[must_use]
    pub fn target(&self) -> &TypeDescriptor {
        &self.target
    }

    #[must_use]
    pub fn source(&self) -> Option<&TypeDescriptor> {
        self.source.as_ref()
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "[{source}=>{}]", self.target),
            None => write!(f, "[null=>{}]", self.target),
        }
    }
}
