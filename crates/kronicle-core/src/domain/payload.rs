use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    ColumnType, DataFrame, IsoDateTime, KronicleError, SensorId, SensorSchema, ValidationError,
};

/// One record-oriented sample.
pub type Row = Map<String, Value>;

/// Value allowed in a payload's tag set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

/// Data-transfer object for every request to and response from Kronicle.
///
/// Instances built from wire data (`from_map`, `from_value`, `from_json`,
/// `from_csv`, or serde) are validated: schema labels must belong to the
/// fixed [`ColumnType`] set, and `available_rows` is derived from
/// `op_details.available_rows` once every other field is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPayload")]
pub struct KroniclePayload {
    pub sensor_id: Option<SensorId>,
    pub sensor_schema: Option<SensorSchema>,
    pub sensor_name: Option<String>,
    pub metadata: Option<Map<String, Value>>,
    pub tags: Option<IndexMap<String, TagValue>>,
    pub rows: Option<Vec<Row>>,
    pub columns: Option<IndexMap<String, Vec<Value>>>,
    pub received_at: Option<IsoDateTime>,
    pub available_data: Option<u64>,
    pub op_status: Option<String>,
    pub op_details: Option<Map<String, Value>>,
    pub available_rows: u64,
}

/// Wire shape before schema labels are checked.
#[derive(Debug, Deserialize)]
struct RawPayload {
    sensor_id: Option<SensorId>,
    sensor_schema: Option<IndexMap<String, String>>,
    sensor_name: Option<String>,
    metadata: Option<Map<String, Value>>,
    tags: Option<IndexMap<String, TagValue>>,
    rows: Option<Vec<Row>>,
    columns: Option<IndexMap<String, Vec<Value>>>,
    received_at: Option<IsoDateTime>,
    available_data: Option<u64>,
    op_status: Option<String>,
    op_details: Option<Map<String, Value>>,
    #[serde(default)]
    available_rows: u64,
}

impl TryFrom<RawPayload> for KroniclePayload {
    type Error = ValidationError;

    fn try_from(raw: RawPayload) -> Result<Self, Self::Error> {
        let sensor_schema = raw.sensor_schema.map(validate_schema).transpose()?;

        let mut payload = Self {
            sensor_id: raw.sensor_id,
            sensor_schema,
            sensor_name: raw.sensor_name,
            metadata: raw.metadata,
            tags: raw.tags,
            rows: raw.rows,
            columns: raw.columns,
            received_at: raw.received_at,
            available_data: raw.available_data,
            op_status: raw.op_status,
            op_details: raw.op_details,
            available_rows: raw.available_rows,
        };
        payload.refresh_available_rows();
        Ok(payload)
    }
}

fn validate_schema(schema: IndexMap<String, String>) -> Result<SensorSchema, ValidationError> {
    let mut validated = SensorSchema::with_capacity(schema.len());
    let mut invalid = Vec::new();

    for (name, label) in schema {
        match ColumnType::parse(&label) {
            Ok(kind) => {
                validated.insert(name, kind);
            }
            Err(_) => invalid.push((name, label)),
        }
    }

    if invalid.is_empty() {
        Ok(validated)
    } else {
        Err(ValidationError::InvalidSchemaTypes { invalid })
    }
}

impl KroniclePayload {
    pub fn from_value(value: Value) -> Result<Self, KronicleError> {
        let raw: RawPayload = serde_json::from_value(value)?;
        Ok(Self::try_from(raw)?)
    }

    pub fn from_map(map: Map<String, Value>) -> Result<Self, KronicleError> {
        Self::from_value(Value::Object(map))
    }

    /// Parse a payload from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, KronicleError> {
        let raw: RawPayload = serde_json::from_str(json)?;
        Ok(Self::try_from(raw)?)
    }

    /// Load `columns` from a CSV file, one column per header.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, KronicleError> {
        let text = std::fs::read_to_string(path)?;
        let columns = DataFrame::parse_csv(&text)?;
        Ok(Self {
            columns: Some(columns),
            ..Self::default()
        })
    }

    /// Re-derive `available_rows` from `op_details.available_rows`.
    ///
    /// A missing or zero entry leaves the current value untouched.
    pub fn refresh_available_rows(&mut self) {
        let derived = self
            .op_details
            .as_ref()
            .and_then(|details| details.get("available_rows"))
            .and_then(Value::as_u64)
            .filter(|rows| *rows > 0);
        if let Some(rows) = derived {
            self.available_rows = rows;
        }
    }

    pub fn ensure_has_id(&self) -> Result<SensorId, ValidationError> {
        self.sensor_id.ok_or(ValidationError::MissingSensorId)
    }

    /// True when no field carries information.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// JSON object with every field; `omit_none` drops the absent ones.
    pub fn to_value(&self, omit_none: bool) -> Result<Value, KronicleError> {
        let mut value = serde_json::to_value(self)?;
        if omit_none {
            if let Value::Object(map) = &mut value {
                map.retain(|_, field| !field.is_null());
            }
        }
        Ok(value)
    }

    /// Pretty-printed JSON document.
    pub fn to_json(&self, omit_none: bool) -> Result<String, KronicleError> {
        Ok(serde_json::to_string_pretty(&self.to_value(omit_none)?)?)
    }

    /// Tabular view of `columns`, `None` when there are no columns.
    pub fn data_frame(&self) -> Result<Option<DataFrame>, ValidationError> {
        self.columns.as_ref().map(DataFrame::from_columns).transpose()
    }

    /// CSV text of the tabular view.
    pub fn to_csv(&self) -> Result<Option<String>, KronicleError> {
        Ok(self.data_frame()?.map(|frame| frame.to_csv()))
    }

    /// Write the tabular view as CSV. Returns `false` when there was nothing to write.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<bool, KronicleError> {
        let Some(frame) = self.data_frame()? else {
            return Ok(false);
        };
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        frame.write_csv(&mut writer)?;
        Ok(true)
    }
}

impl FromStr for KroniclePayload {
    type Err = KronicleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

impl Display for KroniclePayload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let json = self.to_json(true).map_err(|_| std::fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_unknown_schema_label() {
        let err = KroniclePayload::from_value(json!({
            "sensor_schema": {"time": "datetime", "temp": "unknown_type"}
        }))
        .expect_err("must fail");

        match err {
            KronicleError::Validation(ValidationError::InvalidSchemaTypes { invalid }) => {
                assert_eq!(
                    invalid,
                    vec![(String::from("temp"), String::from("unknown_type"))]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn schema_keeps_declaration_order() {
        let payload = KroniclePayload::from_value(json!({
            "sensor_schema": {"time": "datetime", "temperature": "float", "ok": "bool"}
        }))
        .expect("valid payload");

        let schema = payload.sensor_schema.expect("schema");
        let names: Vec<&str> = schema.keys().map(String::as_str).collect();
        assert_eq!(names, ["time", "temperature", "ok"]);
        assert_eq!(schema["ok"], ColumnType::Bool);
    }

    #[test]
    fn derives_available_rows_from_op_details() {
        let payload = KroniclePayload::from_value(json!({
            "op_details": {"available_rows": 42}
        }))
        .expect("valid payload");
        assert_eq!(payload.available_rows, 42);

        let payload = KroniclePayload::from_value(json!({"op_status": "success"}))
            .expect("valid payload");
        assert_eq!(payload.available_rows, 0);
    }

    #[test]
    fn display_omits_absent_fields() {
        let payload = KroniclePayload {
            sensor_name: Some(String::from("thermo")),
            ..KroniclePayload::default()
        };

        let rendered = payload.to_string();
        assert!(rendered.contains("\"sensor_name\": \"thermo\""));
        assert!(!rendered.contains("sensor_id"));

        let full = payload.to_json(false).expect("serialize");
        assert!(full.contains("\"sensor_id\": null"));
    }

    #[test]
    fn tags_accept_scalars_and_lists() {
        let payload = KroniclePayload::from_value(json!({
            "tags": {"site": "lab", "floor": 2, "ratio": 0.5, "test": true, "zones": ["a", "b"]}
        }))
        .expect("valid payload");

        let tags = payload.tags.expect("tags");
        assert_eq!(tags["site"], TagValue::Str(String::from("lab")));
        assert_eq!(tags["floor"], TagValue::Int(2));
        assert_eq!(tags["ratio"], TagValue::Float(0.5));
        assert_eq!(tags["test"], TagValue::Bool(true));
        assert!(matches!(tags["zones"], TagValue::List(_)));
    }

    #[test]
    fn missing_id_is_reported() {
        let err = KroniclePayload::default()
            .ensure_has_id()
            .expect_err("must fail");
        assert_eq!(err, ValidationError::MissingSensorId);
        assert!(KroniclePayload::default().is_empty());
    }
}
