//! Builtin type descriptors shared by every engine in the process.
//!
//! Wrapper classes carry the Rust payload noted on each accessor. The
//! primitive descriptors (`i32`, `i64`, `f64`, `bool`, `char`) are used only
//! as conversion targets; values are always tagged with the wrapper.

use std::sync::LazyLock;

use crate::descriptor::TypeDescriptor;

static OBJECT: LazyLock<TypeDescriptor> = LazyLock::new(|| TypeDescriptor::root("object"));

static CHAR_SEQUENCE: LazyLock<TypeDescriptor> =
    LazyLock::new(|| TypeDescriptor::interface("char-sequence").build());

static STRING: LazyLock<TypeDescriptor> = LazyLock::new(|| {
    TypeDescriptor::class("string")
        .implements(&CHAR_SEQUENCE)
        .displays::<String>()
        .build()
});

static NUMBER: LazyLock<TypeDescriptor> =
    LazyLock::new(|| TypeDescriptor::class("number").build());

static INTEGER: LazyLock<TypeDescriptor> = LazyLock::new(|| {
    TypeDescriptor::class("integer")
        .extends(&NUMBER)
        .displays::<i32>()
        .build()
});

static LONG: LazyLock<TypeDescriptor> = LazyLock::new(|| {
    TypeDescriptor::class("long")
        .extends(&NUMBER)
        .displays::<i64>()
        .build()
});

static DOUBLE: LazyLock<TypeDescriptor> = LazyLock::new(|| {
    TypeDescriptor::class("double")
        .extends(&NUMBER)
        .displays::<f64>()
        .build()
});

static BOOLEAN: LazyLock<TypeDescriptor> =
    LazyLock::new(|| TypeDescriptor::class("boolean").displays::<bool>().build());

static CHARACTER: LazyLock<TypeDescriptor> =
    LazyLock::new(|| TypeDescriptor::class("character").displays::<char>().build());

static BYTES: LazyLock<TypeDescriptor> = LazyLock::new(|| TypeDescriptor::class("bytes").build());

static JSON: LazyLock<TypeDescriptor> = LazyLock::new(|| {
    TypeDescriptor::class("json")
        .displays::<serde_json::Value>()
        .build()
});

static INT: LazyLock<TypeDescriptor> = LazyLock::new(|| TypeDescriptor::primitive("i32", &INTEGER));
static PRIM_LONG: LazyLock<TypeDescriptor> =
    LazyLock::new(|| TypeDescriptor::primitive("i64", &LONG));
static PRIM_DOUBLE: LazyLock<TypeDescriptor> =
    LazyLock::new(|| TypeDescriptor::primitive("f64", &DOUBLE));
static PRIM_BOOL: LazyLock<TypeDescriptor> =
    LazyLock::new(|| TypeDescriptor::primitive("bool", &BOOLEAN));
static PRIM_CHAR: LazyLock<TypeDescriptor> =
    LazyLock::new(|| TypeDescriptor::primitive("char", &CHARACTER));

/// Universal base type. Every class descends from it; used as a key source
/// it is the wildcard that matches any source type.
#[must_use]
pub fn object() -> TypeDescriptor {
    OBJECT.clone()
}

/// Interface implemented by textual types.
#[must_use]
pub fn char_sequence() -> TypeDescriptor {
    CHAR_SEQUENCE.clone()
}

/// `String` payload.
#[must_use]
pub fn string() -> TypeDescriptor {
    STRING.clone()
}

/// Abstract numeric base class.
#[must_use]
pub fn number() -> TypeDescriptor {
    NUMBER.clone()
}

/// `i32` payload.
#[must_use]
pub fn integer() -> TypeDescriptor {
    INTEGER.clone()
}

/// `i64` payload.
#[must_use]
pub fn long() -> TypeDescriptor {
    LONG.clone()
}

/// `f64` payload.
#[must_use]
pub fn double() -> TypeDescriptor {
    DOUBLE.clone()
}

/// `bool` payload.
#[must_use]
pub fn boolean() -> TypeDescriptor {
    BOOLEAN.clone()
}

/// `char` payload.
#[must_use]
pub fn character() -> TypeDescriptor {
    CHARACTER.clone()
}

/// [`bytes::Bytes`] payload.
#[must_use]
pub fn bytes() -> TypeDescriptor {
    BYTES.clone()
}

/// `serde_json::Value` payload.
#[must_use]
pub fn json() -> TypeDescriptor {
    JSON.clone()
}

#[must_use]
pub fn int() -> TypeDescriptor {
    INT.clone()
}

#[must_use]
pub fn prim_long() -> TypeDescriptor {
    PRIM_LONG.clone()
}

#[must_use]
pub fn prim_double() -> TypeDescriptor {
    PRIM_DOUBLE.clone()
}

#[must_use]
pub fn prim_bool() -> TypeDescriptor {
    PRIM_BOOL.clone()
}

#[must_use]
pub fn prim_char() -> TypeDescriptor {
    PRIM_CHAR.clone()
}

/// Every builtin descriptor, wrappers before primitives.
#[must_use]
pub fn all() -> Vec<TypeDescriptor> {
    vec![
        object(),
        char_sequence(),
        string(),
        number(),
        integer(),
        long(),
        double(),
        boolean(),
        character(),
        bytes(),
        json(),
        int(),
        prim_long(),
        prim_double(),
        prim_bool(),
        prim_char(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_return_the_same_identity() {
        assert_eq!(string(), string());
        assert_eq!(object().id(), object().id());
        assert_ne!(integer(), long());
    }

    #[test]
    fn numeric_wrappers_extend_number() {
        for ty in [integer(), long(), double()] {
            assert_eq!(ty.superclass(), Some(&number()));
            assert!(number().is_assignable_from(&ty));
        }
    }

    #[test]
    fn primitives_map_to_wrappers() {
        let pairs = [
            (int(), integer()),
            (prim_long(), long()),
            (prim_double(), double()),
            (prim_bool(), boolean()),
            (prim_char(), character()),
        ];
        for (prim, wrapper) in pairs {
            assert!(prim.is_primitive());
            assert_eq!(prim.wrapper(), Some(&wrapper));
        }
    }

    #[test]
    fn string_is_a_char_sequence() {
        assert!(char_sequence().is_assignable_from(&string()));
        assert_eq!(string().render(&"hi".to_string()), Some("hi".to_string()));
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<String> = all().iter().map(|t| t.name().to_string()).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
