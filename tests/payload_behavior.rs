//! Behavior-driven tests for the payload model
//!
//! These tests verify WHAT a payload accepts from the wire, HOW it derives
//! its row count, and HOW it moves through JSON and CSV.

use std::str::FromStr;

use kronicle_core::{
    ColumnType, DataFrame, KronicleError, KroniclePayload, SensorId, TagValue, ValidationError,
};
use serde_json::json;

const ID: &str = "0b8f5d2a-1c3e-4a5b-8c7d-9e0f1a2b3c4d";

// =============================================================================
// Validation
// =============================================================================

#[test]
fn when_schema_has_unknown_labels_every_offender_is_reported() {
    // Given: Two bad labels among good ones
    let raw = json!({
        "sensor_schema": {
            "time": "datetime",
            "temp": "unknown_type",
            "flag": "boolean",
            "tags": "dict"
        }
    });

    // When: The payload is decoded
    let error = KroniclePayload::from_value(raw).expect_err("invalid schema");

    // Then: Both pairs are listed along with the allowed labels
    match error {
        KronicleError::Validation(error @ ValidationError::InvalidSchemaTypes { .. }) => {
            let message = error.to_string();
            assert!(message.contains("'temp': 'unknown_type'"), "{message}");
            assert!(message.contains("'flag': 'boolean'"), "{message}");
            assert!(message.contains("str, int, float, bool, datetime, dict, list"), "{message}");
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn when_schema_is_valid_labels_are_kept_in_order() {
    let payload = KroniclePayload::from_value(json!({
        "sensor_id": ID,
        "sensor_schema": {"time": "datetime", "temp": "float", "ok": "bool"}
    }))
    .expect("valid payload");

    let schema: Vec<(&str, ColumnType)> = payload
        .sensor_schema
        .as_ref()
        .expect("schema")
        .iter()
        .map(|(name, kind)| (name.as_str(), *kind))
        .collect();
    assert_eq!(
        schema,
        [
            ("time", ColumnType::Datetime),
            ("temp", ColumnType::Float),
            ("ok", ColumnType::Bool)
        ]
    );
}

#[test]
fn caller_built_sensor_ids_must_be_uuid_v4() {
    // A v1 UUID and free text are both rejected.
    for raw in ["c232ab00-9414-11ec-b3c8-9e6bdeced846", "sensor-1"] {
        assert!(SensorId::parse(raw).is_err(), "{raw} should be rejected");
    }
    assert_eq!(SensorId::parse(ID).expect("v4").to_string(), ID);
}

#[test]
fn decoded_payloads_accept_any_uuid_version() {
    // Given: A v1 identifier as the service might return it
    let v1 = "c232ab00-9414-11ec-b3c8-9e6bdeced846";

    // When: The payload is decoded
    let payload = KroniclePayload::from_value(json!({"sensor_id": v1})).expect("opaque id");

    // Then: The identifier is kept; free text is still rejected
    let id = payload.ensure_has_id().expect("id present");
    assert_eq!(id.to_string(), v1);
    assert!(!id.is_v4());
    assert!(KroniclePayload::from_value(json!({"sensor_id": "sensor-1"})).is_err());
}

#[test]
fn missing_id_is_reported_by_ensure_has_id() {
    let payload = KroniclePayload::default();

    assert!(payload.is_empty());
    assert_eq!(
        payload.ensure_has_id(),
        Err(ValidationError::MissingSensorId)
    );
}

// =============================================================================
// Derived Row Count
// =============================================================================

#[test]
fn available_rows_follows_op_details() {
    let reported = KroniclePayload::from_value(json!({"op_details": {"available_rows": 12}}))
        .expect("valid payload");
    let zero = KroniclePayload::from_value(json!({"op_details": {"available_rows": 0}}))
        .expect("valid payload");
    let absent = KroniclePayload::from_value(json!({"op_details": {"other": 1}}))
        .expect("valid payload");

    assert_eq!(reported.available_rows, 12);
    assert_eq!(zero.available_rows, 0);
    assert_eq!(absent.available_rows, 0);
}

// =============================================================================
// JSON
// =============================================================================

#[test]
fn json_text_survives_a_round_trip() {
    // Given: A payload with tags of every kind and metadata
    let text = json!({
        "sensor_id": ID,
        "sensor_name": "boiler",
        "sensor_schema": {"time": "datetime", "temp": "float"},
        "metadata": {"site": "north"},
        "tags": {"floor": 2, "indoor": true, "gain": 1.5, "unit": "C", "zones": ["a", "b"]},
        "received_at": "2024-03-01T12:00:00Z",
        "rows": [{"time": "2024-03-01T12:00:00Z", "temp": 61.5}]
    })
    .to_string();

    // When: It is parsed and re-parsed from its own rendering
    let payload = KroniclePayload::from_str(&text).expect("valid payload");
    let again = KroniclePayload::from_str(&payload.to_json(false).expect("json"))
        .expect("valid rendering");

    // Then: Nothing is lost
    assert_eq!(payload, again);
    let tags = payload.tags.as_ref().expect("tags");
    assert_eq!(tags["floor"], TagValue::Int(2));
    assert_eq!(tags["indoor"], TagValue::Bool(true));
    assert_eq!(tags["gain"], TagValue::Float(1.5));
    assert_eq!(tags["unit"], TagValue::Str(String::from("C")));
    assert!(matches!(tags["zones"], TagValue::List(_)));
}

#[test]
fn display_omits_absent_fields_but_full_json_keeps_them() {
    let payload = KroniclePayload {
        sensor_name: Some(String::from("boiler")),
        ..KroniclePayload::default()
    };

    let shown = payload.to_string();
    let full = payload.to_value(false).expect("json");

    assert!(shown.contains("\"sensor_name\": \"boiler\""), "{shown}");
    assert!(!shown.contains("null"), "{shown}");
    assert!(full.get("sensor_id").is_some_and(serde_json::Value::is_null));
}

// =============================================================================
// Tabular View and CSV
// =============================================================================

#[test]
fn columns_with_time_become_an_indexed_frame() {
    let payload = KroniclePayload::from_value(json!({
        "columns": {
            "time": ["2024-01-01T00:00:00Z", "2024-01-01T00:01:00Z"],
            "temp": [20.5, 21.25],
            "status": ["ok", "warn"]
        }
    }))
    .expect("valid payload");

    let frame = payload.data_frame().expect("consistent").expect("has columns");

    assert_eq!(frame.len(), 2);
    assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["temp", "status"]);
    let table = frame.to_string();
    let header = table.lines().next().expect("header line");
    assert!(header.starts_with("time"), "{table}");
    assert!(header.contains("status"), "{table}");
}

#[test]
fn ragged_columns_are_rejected() {
    let payload = KroniclePayload::from_value(json!({
        "columns": {"a": [1, 2, 3], "b": [1]}
    }))
    .expect("valid payload");

    let error = payload.data_frame().expect_err("ragged");

    assert!(matches!(
        error,
        ValidationError::InconsistentColumnLengths { .. }
    ));
}

#[test]
fn payload_without_columns_writes_no_csv() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("empty.csv");

    let written = KroniclePayload::default().write_csv(&path).expect("no io error");

    assert!(!written);
    assert!(!path.exists());
}

#[test]
fn csv_file_round_trip_keeps_column_types_and_quoting() {
    // Given: Columns with timestamps, floats, integers, booleans and a comma
    let payload = KroniclePayload::from_value(json!({
        "columns": {
            "time": ["2024-01-01T00:00:00Z", "2024-01-01T00:01:00Z"],
            "temp": [20.5, 21.25],
            "count": [3, 4],
            "ok": [true, false],
            "note": ["plain", "a,b"]
        }
    }))
    .expect("valid payload");
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("channel.csv");

    // When: It is written to disk and read back
    assert!(payload.write_csv(&path).expect("written"));
    let loaded = KroniclePayload::from_csv(&path).expect("readable csv");

    // Then: Each column keeps its inferred type
    let columns = loaded.columns.expect("columns");
    assert_eq!(
        columns.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["time", "temp", "count", "ok", "note"]
    );
    assert_eq!(columns["temp"], vec![json!(20.5), json!(21.25)]);
    assert_eq!(columns["count"], vec![json!(3), json!(4)]);
    assert_eq!(columns["ok"], vec![json!(true), json!(false)]);
    assert_eq!(columns["note"], vec![json!("plain"), json!("a,b")]);
    assert_eq!(
        columns["time"],
        vec![json!("2024-01-01T00:00:00Z"), json!("2024-01-01T00:01:00Z")]
    );
}

#[test]
fn malformed_csv_names_the_offending_line() {
    let error = DataFrame::parse_csv("a,b\n1,2\n3\n").expect_err("ragged row");

    assert_eq!(
        error,
        ValidationError::MalformedCsv {
            line: 3,
            reason: String::from("expected 2 fields, found 1"),
        }
    );
}
