//! Kronicable sample types.
//!
//! A sample type declares its fields once as a [`RecordShape`]. Each declared
//! [`FieldType`] is classified into a [`TypeDescriptor`]; a shape whose fields
//! all classify as valid becomes a [`SampleType`], from which the wire schema
//! and rows are derived.
//!
//! | Declared type | Valid when | Schema label |
//! |---------------|------------|--------------|
//! | primitive | always | its own label |
//! | `Optional[T]` | `T` is valid | label of `T` |
//! | record | every field is valid | `str` |
//! | `list[T]` | `T` is a primitive or valid record | `list` |
//! | `dict[str, T]` | `T` is a primitive or valid record | `dict` |
//! | union of two or more non-null types | never | |

mod sample;
mod types;

pub use sample::{FieldDecl, KronicableSample, RecordShape, SampleType};
pub use types::{classify, ElementKind, FieldType, TypeDescriptor};
