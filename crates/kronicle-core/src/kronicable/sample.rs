use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{KronicleError, KroniclePayload, Row, SensorId, SensorSchema, ValidationError};

use super::{classify, FieldType, TypeDescriptor};

/// One declared field of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: FieldType,
    /// Derived from other fields rather than stored.
    pub computed: bool,
}

/// Static field declarations of a structured record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordShape {
    name: String,
    fields: Vec<FieldDecl>,
}

impl RecordShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty,
            computed: false,
        });
        self
    }

    /// Declare a field whose value comes from [`KronicableSample::computed_values`].
    pub fn computed(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty,
            computed: true,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub(crate) fn first_invalid_field(&self) -> Option<(&str, String)> {
        self.fields.iter().find_map(|field| match classify(&field.ty) {
            TypeDescriptor::Invalid(reason) => Some((field.name.as_str(), reason)),
            _ => None,
        })
    }
}

/// A record shape whose every field has been classified as valid.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleType {
    name: String,
    fields: Vec<(FieldDecl, TypeDescriptor)>,
}

impl SampleType {
    /// Classify every field of `shape`, failing on the first unsupported one.
    pub fn define(shape: RecordShape) -> Result<Self, ValidationError> {
        let RecordShape { name, fields } = shape;
        let fields = fields
            .into_iter()
            .map(|field| match classify(&field.ty) {
                TypeDescriptor::Invalid(description) => Err(ValidationError::UnsupportedFieldType {
                    field: field.name.clone(),
                    description,
                }),
                descriptor => Ok((field, descriptor)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { name, fields })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self, field: &str) -> Option<&TypeDescriptor> {
        self.fields
            .iter()
            .find(|(decl, _)| decl.name == field)
            .map(|(_, descriptor)| descriptor)
    }

    /// Field name to wire label, stored and computed fields alike.
    pub fn sensor_schema(&self) -> SensorSchema {
        self.fields
            .iter()
            .filter_map(|(decl, descriptor)| {
                descriptor
                    .column_type()
                    .map(|kind| (decl.name.clone(), kind))
            })
            .collect()
    }

    /// Build a row from a sample's serialized values.
    ///
    /// Absent optional fields are left out; absent required fields are an
    /// error. Records and collections of records become JSON strings.
    pub fn to_row(
        &self,
        values: &Map<String, Value>,
        include_fields: Option<&[&str]>,
    ) -> Result<Row, ValidationError> {
        let selected: Vec<&(FieldDecl, TypeDescriptor)> = match include_fields {
            None => self.fields.iter().collect(),
            Some(names) => names
                .iter()
                .map(|name| {
                    self.fields
                        .iter()
                        .find(|(decl, _)| decl.name == *name)
                        .ok_or_else(|| ValidationError::UnknownField {
                            field: (*name).to_owned(),
                            sample: self.name.clone(),
                        })
                })
                .collect::<Result<_, _>>()?,
        };

        let mut row = Row::new();
        for (decl, descriptor) in selected {
            let value = values.get(&decl.name).filter(|value| !value.is_null());
            let Some(value) = value else {
                if descriptor.is_optional() {
                    continue;
                }
                return Err(ValidationError::RequiredFieldMissing {
                    field: decl.name.clone(),
                });
            };

            let cell = if descriptor.is_model_like() && (value.is_object() || value.is_array()) {
                Value::String(value.to_string())
            } else {
                value.clone()
            };
            row.insert(decl.name.clone(), cell);
        }
        Ok(row)
    }
}

/// A caller-defined sample type that can be pushed to Kronicle as rows.
///
/// ```rust,ignore
/// #[derive(Serialize)]
/// struct TransferMetrics {
///     start_time: IsoDateTime,
///     bytes_received: i64,
///     error: Option<String>,
/// }
///
/// impl KronicableSample for TransferMetrics {
///     fn shape() -> RecordShape {
///         RecordShape::new("TransferMetrics")
///             .field("start_time", FieldType::datetime())
///             .field("bytes_received", FieldType::int())
///             .field("error", FieldType::optional(FieldType::str()))
///             .computed("success", FieldType::bool())
///     }
///
///     fn computed_values(&self) -> Map<String, Value> {
///         Map::from_iter([("success".into(), Value::Bool(self.error.is_none()))])
///     }
/// }
/// ```
type Definition = Result<Arc<SampleType>, ValidationError>;

/// Sample types already defined, keyed by the implementing Rust type.
static SAMPLE_TYPES: OnceLock<RwLock<HashMap<TypeId, Definition>>> = OnceLock::new();

/// Defines the sample type for `T` once and hands out the stored outcome afterwards.
fn defined_sample_type<T: KronicableSample + ?Sized>() -> Definition {
    let registry = SAMPLE_TYPES.get_or_init(|| RwLock::new(HashMap::new()));
    let key = TypeId::of::<T>();
    if let Some(defined) = registry
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return defined.clone();
    }
    registry
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert_with(|| SampleType::define(T::shape()).map(Arc::new))
        .clone()
}

pub trait KronicableSample: Serialize + 'static {
    /// Declared fields, including computed ones.
    fn shape() -> RecordShape;

    /// Values of the fields declared with [`RecordShape::computed`].
    fn computed_values(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Validated type of this sample; fails on any unsupported field.
    ///
    /// The shape is checked on first use and the outcome is reused for the
    /// lifetime of the process.
    fn sample_type() -> Result<Arc<SampleType>, ValidationError> {
        defined_sample_type::<Self>()
    }

    fn sensor_schema() -> Result<SensorSchema, ValidationError> {
        Ok(Self::sample_type()?.sensor_schema())
    }

    fn to_row(&self, include_fields: Option<&[&str]>) -> Result<Row, KronicleError> {
        let sample_type = Self::sample_type()?;
        let mut values = match serde_json::to_value(self)? {
            Value::Object(values) => values,
            other => {
                return Err(KronicleError::Serialization(serde::ser::Error::custom(
                    format!("sample {} must serialize to an object, got {other}", sample_type.name()),
                )))
            }
        };
        values.extend(self.computed_values());
        Ok(sample_type.to_row(&values, include_fields)?)
    }

    /// Payload carrying the derived schema and this sample as its only row.
    fn to_payload(
        &self,
        sensor_id: SensorId,
        sensor_name: Option<String>,
    ) -> Result<KroniclePayload, KronicleError> {
        Ok(KroniclePayload {
            sensor_id: Some(sensor_id),
            sensor_name,
            sensor_schema: Some(Self::sensor_schema()?),
            rows: Some(vec![self.to_row(None)?]),
            ..KroniclePayload::default()
        })
    }
}
