//! Conduit Core — type descriptors, dynamic values, conversion keys and the
//! converter contract shared by registry implementations.

pub mod builtin;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod key;
pub mod traits;
pub mod value;

pub use context::ConversionContext;
pub use descriptor::{TypeBuilder, TypeDescriptor, TypeKind};
pub use error::{ConversionError, ConverterError};
pub use key::TypeKey;
pub use traits::{
    converter_fn, ConversionCall, Converter, ConverterRef, FnConverter, Outcome, TypeConverter,
    TypeConverterExt,
};
pub use value::{EnumConstant, Typed, Value};
