use dashmap::DashMap;

use conduit_core::{builtin, ConversionError, TypeDescriptor};

/// Name-to-descriptor registry used by loaders that describe converters by
/// type name. Pre-populated with every builtin type.
pub struct TypeCatalog {
    by_name: DashMap<String, TypeDescriptor>,
}

impl TypeCatalog {
    #[must_use]
    pub fn new() -> Self {
        let by_name = DashMap::new();
        for ty in builtin::all() {
            by_name.insert(ty.name().to_string(), ty);
        }
        Self { by_name }
    }

    /// Registers `ty` under its own name.
    ///
    /// Re-registering the same descriptor is a no-op.
    ///
    /// # Errors
    ///
    /// `Misconfigured` if a different type already uses the name.
    pub fn register(&self, ty: &TypeDescriptor) -> Result<(), ConversionError> {
        let existing = self
            .by_name
            .entry(ty.name().to_string())
            .or_insert_with(|| ty.clone());
        if *existing == *ty {
            Ok(())
        } else {
            Err(ConversionError::Misconfigured {
                reason: format!("type name {} is already bound to another type", ty.name()),
            })
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<TypeDescriptor> {
        self.by_name.get(name).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_preregistered() {
        let catalog = TypeCatalog::new();
        assert_eq!(catalog.get("string"), Some(builtin::string()));
        assert_eq!(catalog.get("i32"), Some(builtin::int()));
        assert!(catalog.contains("json"));
        assert_eq!(catalog.names().len(), builtin::all().len());
    }

    #[test]
    fn register_rejects_name_collisions() {
        let catalog = TypeCatalog::new();
        let order = TypeDescriptor::class("acme.Order").build();
        catalog.register(&order).unwrap();
        catalog.register(&order).unwrap();
        assert_eq!(catalog.get("acme.Order"), Some(order));

        let impostor = TypeDescriptor::class("acme.Order").build();
        let err = catalog.register(&impostor).unwrap_err();
        assert!(matches!(err, ConversionError::Misconfigured { .. }));
    }
}
