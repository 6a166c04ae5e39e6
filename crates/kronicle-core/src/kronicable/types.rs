use std::fmt::{Display, Formatter};

use crate::ColumnType;

use super::RecordShape;

/// Declared type of one sample field.
///
/// This is the static description a sample author writes down; it may describe
/// shapes the wire schema cannot carry. [`classify`] decides.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Primitive(ColumnType),
    /// A named wrapper around a primitive, e.g. a domain timestamp type.
    Named { name: String, base: ColumnType },
    /// A nested structured record.
    Record(RecordShape),
    Optional(Box<FieldType>),
    ListOf(Box<FieldType>),
    MapOf { key: Box<FieldType>, value: Box<FieldType> },
    Union(Vec<FieldType>),
    Null,
    /// Any type outside the supported set.
    Other(String),
}

impl FieldType {
    pub const fn str() -> Self {
        Self::Primitive(ColumnType::Str)
    }

    pub const fn int() -> Self {
        Self::Primitive(ColumnType::Int)
    }

    pub const fn float() -> Self {
        Self::Primitive(ColumnType::Float)
    }

    pub const fn bool() -> Self {
        Self::Primitive(ColumnType::Bool)
    }

    pub const fn datetime() -> Self {
        Self::Primitive(ColumnType::Datetime)
    }

    pub const fn dict() -> Self {
        Self::Primitive(ColumnType::Dict)
    }

    pub const fn list() -> Self {
        Self::Primitive(ColumnType::List)
    }

    pub fn optional(inner: FieldType) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn list_of(element: FieldType) -> Self {
        Self::ListOf(Box::new(element))
    }

    /// `map[str, value]`.
    pub fn map_of(value: FieldType) -> Self {
        Self::map(Self::str(), value)
    }

    pub fn map(key: FieldType, value: FieldType) -> Self {
        Self::MapOf {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn record(shape: RecordShape) -> Self {
        Self::Record(shape)
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::Named { name, .. } => f.write_str(name),
            Self::Record(shape) => f.write_str(shape.name()),
            Self::Optional(inner) => write!(f, "Optional[{inner}]"),
            Self::ListOf(element) => write!(f, "list[{element}]"),
            Self::MapOf { key, value } => write!(f, "dict[{key}, {value}]"),
            Self::Union(members) => {
                let members = members
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" | ");
                f.write_str(&members)
            }
            Self::Null => f.write_str("None"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Element of a homogeneous list or string-keyed map.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Primitive(ColumnType),
    Model(String),
}

impl ElementKind {
    pub const fn is_model(&self) -> bool {
        matches!(self, Self::Model(_))
    }
}

/// Classification of a [`FieldType`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Primitive(ColumnType),
    Optional(Box<TypeDescriptor>),
    /// A valid nested record, by name.
    Model(String),
    ListOf(ElementKind),
    MapOf(ElementKind),
    Invalid(String),
}

impl TypeDescriptor {
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid(_))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// Whether values are serialized to a JSON string inside a row.
    pub fn is_model_like(&self) -> bool {
        match self {
            Self::Model(_) => true,
            Self::ListOf(element) | Self::MapOf(element) => element.is_model(),
            Self::Optional(inner) => inner.is_model_like(),
            Self::Primitive(_) | Self::Invalid(_) => false,
        }
    }

    /// Wire schema label, `None` for invalid types.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Self::Primitive(kind) => Some(*kind),
            Self::Optional(inner) => inner.column_type(),
            // Records travel as JSON strings.
            Self::Model(_) => Some(ColumnType::Str),
            Self::ListOf(_) => Some(ColumnType::List),
            Self::MapOf(_) => Some(ColumnType::Dict),
            Self::Invalid(_) => None,
        }
    }
}

/// Classify a declared field type.
///
/// Valid shapes are primitives (and named wrappers of them), records whose
/// fields are all valid, `Optional[T]` of a valid `T`, and `list[T]` /
/// `dict[str, T]` where `T` is a primitive or a valid record. A union reduces
/// to its single non-null member; anything else is invalid.
pub fn classify(ty: &FieldType) -> TypeDescriptor {
    match ty {
        FieldType::Primitive(kind) | FieldType::Named { base: kind, .. } => {
            TypeDescriptor::Primitive(*kind)
        }
        FieldType::Record(shape) => match shape.first_invalid_field() {
            None => TypeDescriptor::Model(shape.name().to_owned()),
            Some((field, reason)) => TypeDescriptor::Invalid(format!(
                "record {} has invalid field \"{field}\": {reason}",
                shape.name()
            )),
        },
        FieldType::Optional(inner) => optional_of(inner),
        FieldType::ListOf(element) => match element_kind(element) {
            Some(kind) => TypeDescriptor::ListOf(kind),
            None => TypeDescriptor::Invalid(ty.to_string()),
        },
        FieldType::MapOf { key, value } => {
            if **key != FieldType::str() {
                return TypeDescriptor::Invalid(ty.to_string());
            }
            match element_kind(value) {
                Some(kind) => TypeDescriptor::MapOf(kind),
                None => TypeDescriptor::Invalid(ty.to_string()),
            }
        }
        FieldType::Union(members) => {
            let nullable = members.iter().any(|member| *member == FieldType::Null);
            let concrete: Vec<&FieldType> = members
                .iter()
                .filter(|member| **member != FieldType::Null)
                .collect();
            match (concrete.as_slice(), nullable) {
                ([single], true) => optional_of(single),
                ([single], false) => classify(single),
                _ => TypeDescriptor::Invalid(ty.to_string()),
            }
        }
        FieldType::Null | FieldType::Other(_) => TypeDescriptor::Invalid(ty.to_string()),
    }
}

fn optional_of(inner: &FieldType) -> TypeDescriptor {
    match classify(inner) {
        TypeDescriptor::Invalid(reason) => TypeDescriptor::Invalid(reason),
        optional @ TypeDescriptor::Optional(_) => optional,
        descriptor => TypeDescriptor::Optional(Box::new(descriptor)),
    }
}

fn element_kind(element: &FieldType) -> Option<ElementKind> {
    match element {
        FieldType::Primitive(kind) | FieldType::Named { base: kind, .. } => {
            Some(ElementKind::Primitive(*kind))
        }
        FieldType::Record(shape) if shape.first_invalid_field().is_none() => {
            Some(ElementKind::Model(shape.name().to_owned()))
        }
        _ => None,
    }
}
