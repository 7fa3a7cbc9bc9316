//! Runtime type descriptors and the subtype lattice queried by the resolver.
//!
//! A [`TypeDescriptor`] is a cheap, reference-counted handle to an immutable
//! [`TypeInfo`]. Identity is a process-unique id assigned at construction,
//! so equality and hashing are O(1) and never depend on the type's name.
//!
//! The lattice mirrors a single-inheritance class model: every class has at
//! most one superclass (implicitly [`builtin::object`](crate::builtin::object))
//! and any number of directly implemented interfaces. Primitives sit outside
//! the lattice and carry a link to their wrapper class instead.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::builtin;
use crate::value::EnumConstant;

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Renders a payload of the described type as text, or `None` when the
/// payload is not of the expected Rust type.
pub type DisplayHook = fn(&(dyn Any + Send + Sync)) -> Option<String>;

/// Structural category of a described type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Concrete or abstract class participating in single inheritance.
    Class,
    /// Interface; may extend other interfaces.
    Interface,
    /// Primitive value type with a boxed wrapper counterpart.
    Primitive,
    /// Class whose values are a fixed, named set of constants.
    Enumeration,
}

/// Immutable metadata behind a [`TypeDescriptor`].
pub struct TypeInfo {
    id: u64,
    name: String,
    kind: TypeKind,
    superclass: Option<TypeDescriptor>,
    interfaces: Vec<TypeDescriptor>,
    wrapper: Option<TypeDescriptor>,
    constants: Vec<String>,
    display: Option<DisplayHook>,
}

/// Handle to a runtime type.
///
/// Two descriptors are equal iff they were produced by the same
/// construction call (or are clones of one another).
#[derive(Clone)]
pub struct TypeDescriptor(Arc<TypeInfo>);

impl TypeDescriptor {
    /// Starts building a class. Without [`TypeBuilder::extends`] the
    /// superclass is the universal base type.
    #[must_use]
    pub fn class(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name.into(), TypeKind::Class)
    }

    /// Starts building an interface.
    #[must_use]
    pub fn interface(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name.into(), TypeKind::Interface)
    }

    /// Starts building an enumeration with the given constant names, in
    /// ordinal order.
    #[must_use]
    pub fn enumeration<I, S>(name: impl Into<String>, constants: I) -> TypeBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = TypeBuilder::new(name.into(), TypeKind::Enumeration);
        builder.constants = constants.into_iter().map(Into::into).collect();
        builder.display = Some(render_display::<EnumConstant>);
        builder
    }

    /// Creates a primitive type whose boxed counterpart is `wrapper`.
    #[must_use]
    pub fn primitive(name: impl Into<String>, wrapper: &TypeDescriptor) -> Self {
        Self::from_info(
            name.into(),
            TypeKind::Primitive,
            None,
            Vec::new(),
            Some(wrapper.clone()),
            Vec::new(),
            wrapper.0.display,
        )
    }

    /// Creates the root of the lattice. Only [`builtin::object`] calls this.
    pub(crate) fn root(name: &str) -> Self {
        Self::from_info(
            name.to_string(),
            TypeKind::Class,
            None,
            Vec::new(),
            None,
            Vec::new(),
            None,
        )
    }

    fn from_info(
        name: String,
        kind: TypeKind,
        superclass: Option<TypeDescriptor>,
        interfaces: Vec<TypeDescriptor>,
        wrapper: Option<TypeDescriptor>,
        constants: Vec<String>,
        display: Option<DisplayHook>,
    ) -> Self {
        Self(Arc::new(TypeInfo {
            id: NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed),
            name,
            kind,
            superclass,
            interfaces,
            wrapper,
            constants,
            display,
        }))
    }

    /// Process-unique identity of this type.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn kind(&self) -> TypeKind {
        self.0.kind
    }

    /// Direct superclass, or `None` for the root, interfaces and primitives.
    #[must_use]
    pub fn superclass(&self) -> Option<&TypeDescriptor> {
        self.0.superclass.as_ref()
    }

    /// Directly implemented (or, for interfaces, extended) interfaces in
    /// declaration order.
    #[must_use]
    pub fn interfaces(&self) -> &[TypeDescriptor] {
        &self.0.interfaces
    }

    /// Boxed counterpart of a primitive type.
    #[must_use]
    pub fn wrapper(&self) -> Option<&TypeDescriptor> {
        self.0.wrapper.as_ref()
    }

    /// Constant names of an enumeration, in ordinal order.
    #[must_use]
    pub fn constants(&self) -> &[String] {
        &self.0.constants
    }

    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.0.kind == TypeKind::Primitive
    }

    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.0.kind == TypeKind::Interface
    }

    #[must_use]
    pub fn is_enumeration(&self) -> bool {
        self.0.kind == TypeKind::Enumeration
    }

    /// Whether this is the universal base type.
    #[must_use]
    pub fn is_object(&self) -> bool {
        *self == builtin::object()
    }

    /// Returns `true` if a value of type `other` is also a value of `self`:
    /// the same type, or `self` is a superclass or (transitively) an
    /// implemented interface of `other`.
    ///
    /// Primitives are only assignable from themselves.
    #[must_use]
    pub fn is_assignable_from(&self, other: &TypeDescriptor) -> bool {
        if self == other {
            return true;
        }
        if self.is_primitive() || other.is_primitive() {
            return false;
        }
        if self.is_object() {
            return true;
        }
        other
            .interfaces()
            .iter()
            .any(|iface| self.is_assignable_from(iface))
            || other
                .superclass()
                .is_some_and(|sup| self.is_assignable_from(sup))
    }

    /// Renders a payload through this type's display hook.
    #[must_use]
    pub fn render(&self, payload: &(dyn Any + Send + Sync)) -> Option<String> {
        self.0.display.and_then(|hook| hook(payload))
    }

    /// Whether values of this type can be rendered as text.
    #[must_use]
    pub fn has_display(&self) -> bool {
        self.0.display.is_some()
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({}#{})", self.0.name, self.0.id)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

fn render_display<T: fmt::Display + 'static>(payload: &(dyn Any + Send + Sync)) -> Option<String> {
    payload.downcast_ref::<T>().map(ToString::to_string)
}

/// Builder for class, interface and enumeration descriptors.
pub struct TypeBuilder {
    name: String,
    kind: TypeKind,
    superclass: Option<TypeDescriptor>,
    interfaces: Vec<TypeDescriptor>,
    constants: Vec<String>,
    display: Option<DisplayHook>,
}

impl TypeBuilder {
    fn new(name: String, kind: TypeKind) -> Self {
        Self {
            name,
            kind,
            superclass: None,
            interfaces: Vec::new(),
            constants: Vec::new(),
            display: None,
        }
    }

    /// Sets the superclass of a class, or adds an extended interface when
    /// building an interface.
    #[must_use]
    pub fn extends(mut self, parent: &TypeDescriptor) -> Self {
        if self.kind == TypeKind::Interface {
            self.interfaces.push(parent.clone());
        } else {
            self.superclass = Some(parent.clone());
        }
        self
    }

    /// Adds a directly implemented interface.
    #[must_use]
    pub fn implements(mut self, iface: &TypeDescriptor) -> Self {
        self.interfaces.push(iface.clone());
        self
    }

    /// Renders payloads of Rust type `T` through its `Display` impl.
    #[must_use]
    pub fn displays<T: fmt::Display + 'static>(mut self) -> Self {
        self.display = Some(render_display::<T>);
        self
    }

    /// Installs a custom display hook.
    #[must_use]
    pub fn display_with(mut self, hook: DisplayHook) -> Self {
        self.display = Some(hook);
        self
    }

    #[must_use]
    pub fn build(self) -> TypeDescriptor {
        let superclass = match self.kind {
            TypeKind::Interface | TypeKind::Primitive => None,
            TypeKind::Class | TypeKind::Enumeration => {
                Some(self.superclass.unwrap_or_else(builtin::object))
            }
        };
        TypeDescriptor::from_info(
            self.name,
            self.kind,
            superclass,
            self.interfaces,
            None,
            self.constants,
            self.display,
        )
    }
}
