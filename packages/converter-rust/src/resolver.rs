//! Converter resolution over the source type's lattice.
//!
//! Precedence, for a requested `(target, source)`:
//!
//! 1. the exact `(target, source)` entry;
//! 2. `(target, interface)` for each interface `source` directly
//!    implements, in declaration order;
//! 3. steps 1-3 again for the superclass, unless it is `object`;
//! 4. on the originally requested source only (never a superclass):
//!    the earliest-registered entry whose target is `target` or a subtype
//!    of it and whose source is a non-`object` supertype of `source`,
//!    then the `(target, object)` entry.

use conduit_core::{ConverterRef, TypeDescriptor, TypeKey};

use crate::table::ConversionTable;

/// Read-only lookup over a [`ConversionTable`]. Never mutates the table.
pub struct Resolver<'a> {
    table: &'a ConversionTable,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(table: &'a ConversionTable) -> Self {
        Self { table }
    }

    #[must_use]
    pub fn resolve(
        &self,
        target: &TypeDescriptor,
        source: Option<&TypeDescriptor>,
    ) -> Option<ConverterRef> {
        self.find(target, source, false)
    }

    fn find(
        &self,
        target: &TypeDescriptor,
        source: Option<&TypeDescriptor>,
        is_super: bool,
    ) -> Option<ConverterRef> {
        if let Some(source) = source {
            if let Some(found) = self.table.get(target, source) {
                return Some(found);
            }
            for iface in source.interfaces() {
                if let Some(found) = self.table.get(target, iface) {
                    return Some(found);
                }
            }
            if let Some(parent) = source.superclass().filter(|parent| !parent.is_object()) {
                if let Some(found) = self.find(target, Some(parent), true) {
                    return Some(found);
                }
            }
        }

        if is_super {
            return None;
        }
        let source = source.filter(|source| !source.is_object())?;

        let covariant = self.table.find_first(|key| {
            target.is_assignable_from(key.target())
                && key
                    .source()
                    .is_some_and(|from| !from.is_object() && from.is_assignable_from(source))
        });
        if covariant.is_some() {
            return covariant;
        }

        self.table.get_key(&TypeKey::any_source(target.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use conduit_core::{builtin, converter_fn, ConversionCall, Outcome};

    use super::*;

    fn resolve(
        table: &ConversionTable,
        target: &TypeDescriptor,
        source: &TypeDescriptor,
    ) -> Option<ConverterRef> {
        Resolver::new(table).resolve(target, Some(source))
    }

    fn conv(name: &str) -> ConverterRef {
        converter_fn(name, |_call: &ConversionCall<'_>| Ok(Outcome::Pass))
    }

    struct Lattice {
        auditable: TypeDescriptor,
        named: TypeDescriptor,
        base: TypeDescriptor,
        order: TypeDescriptor,
        rush_order: TypeDescriptor,
    }

    /// `RushOrder -> Order -> Entity -> object`; `Entity: Auditable`,
    /// `Order: Named`.
    fn lattice() -> Lattice {
        let auditable = TypeDescriptor::interface("Auditable").build();
        let named = TypeDescriptor::interface("Named").build();
        let base = TypeDescriptor::class("Entity").implements(&auditable).build();
        let order = TypeDescriptor::class("Order")
            .extends(&base)
            .implements(&named)
            .build();
        let rush_order = TypeDescriptor::class("RushOrder").extends(&order).build();
        Lattice {
            auditable,
            named,
            base,
            order,
            rush_order,
        }
    }

    fn put(table: &ConversionTable, target: &TypeDescriptor, source: &TypeDescriptor, c: &ConverterRef) {
        table.put(TypeKey::new(target.clone(), source.clone()), c.clone());
    }

    fn resolved(table: &ConversionTable, target: &TypeDescriptor, source: &TypeDescriptor) -> Option<String> {
        resolve(table, target, source).map(|c| c.name().to_string())
    }

    #[test]
    fn exact_match_beats_everything() {
        let l = lattice();
        let table = ConversionTable::new();
        let string = builtin::string();
        put(&table, &string, &builtin::object(), &conv("object"));
        put(&table, &string, &l.base, &conv("base"));
        put(&table, &string, &l.named, &conv("named"));
        put(&table, &string, &l.order, &conv("order"));

        assert_eq!(resolved(&table, &string, &l.order).as_deref(), Some("order"));
    }

    #[test]
    fn interfaces_beat_superclasses() {
        let l = lattice();
        let table = ConversionTable::new();
        let string = builtin::string();
        put(&table, &string, &l.base, &conv("base"));
        put(&table, &string, &l.named, &conv("named"));

        assert_eq!(resolved(&table, &string, &l.order).as_deref(), Some("named"));
    }

    #[test]
    fn superclass_chain_is_walked_with_its_interfaces() {
        let l = lattice();
        let table = ConversionTable::new();
        let string = builtin::string();
        put(&table, &string, &l.auditable, &conv("auditable"));

        // RushOrder -> Order (Named: no entry) -> Entity (Auditable: hit)
        assert_eq!(resolved(&table, &string, &l.rush_order).as_deref(), Some("auditable"));

        put(&table, &string, &l.base, &conv("base"));
        assert_eq!(resolved(&table, &string, &l.rush_order).as_deref(), Some("base"));
    }

    #[test]
    fn covariant_target_scan_precedes_object_source() {
        let l = lattice();
        let table = ConversionTable::new();
        put(&table, &builtin::number(), &builtin::object(), &conv("object"));
        put(&table, &builtin::integer(), &l.base, &conv("integer-from-base"));

        // number is not registered for Entity, but integer is a number.
        assert_eq!(
            resolved(&table, &builtin::number(), &l.order).as_deref(),
            Some("integer-from-base")
        );
    }

    #[test]
    fn covariant_scan_ignores_broader_targets() {
        let l = lattice();
        let table = ConversionTable::new();
        put(&table, &builtin::number(), &l.base, &conv("number-from-base"));
        put(&table, &builtin::integer(), &builtin::object(), &conv("object"));

        // A number converter does not necessarily produce an integer.
        assert_eq!(
            resolved(&table, &builtin::integer(), &l.order).as_deref(),
            Some("object")
        );
    }

    #[test]
    fn covariant_scan_picks_earliest_registration() {
        let l = lattice();
        let table = ConversionTable::new();
        let target = TypeDescriptor::interface("Text").build();
        let plain = TypeDescriptor::class("Plain").implements(&target).build();
        let rich = TypeDescriptor::class("Rich").implements(&target).build();
        put(&table, &plain, &l.auditable, &conv("plain"));
        put(&table, &rich, &l.base, &conv("rich"));

        for _ in 0..8 {
            assert_eq!(resolved(&table, &target, &l.order).as_deref(), Some("plain"));
        }
    }

    #[test]
    fn object_source_is_last_resort() {
        let l = lattice();
        let table = ConversionTable::new();
        let string = builtin::string();
        let any = conv("any");
        put(&table, &string, &builtin::object(), &any);

        let found = resolve(&table, &string, &l.rush_order).unwrap();
        assert!(Arc::ptr_eq(&found, &any));
        assert!(resolve(&table, &builtin::integer(), &l.rush_order).is_none());
    }

    #[test]
    fn object_and_absent_sources_skip_the_scan() {
        let l = lattice();
        let table = ConversionTable::new();
        let string = builtin::string();
        put(&table, &string, &l.base, &conv("base"));

        // object is not assignable to Entity, and the wildcard key is absent.
        assert!(resolve(&table, &string, &builtin::object()).is_none());
        assert!(Resolver::new(&table).resolve(&string, None).is_none());
    }

    #[test]
    fn scan_matches_supertypes_of_the_requested_source() {
        let l = lattice();
        let table = ConversionTable::new();
        // Only reachable through the scan from RushOrder itself.
        put(&table, &builtin::integer(), &l.order, &conv("order-to-integer"));

        assert_eq!(
            resolved(&table, &builtin::number(), &l.rush_order).as_deref(),
            Some("order-to-integer")
        );
        assert!(resolve(&table, &builtin::number(), &l.auditable).is_none());
    }
}
