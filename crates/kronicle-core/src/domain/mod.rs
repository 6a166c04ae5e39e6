//! # Domain Models
//!
//! Canonical data-transfer types exchanged with the Kronicle service.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`KroniclePayload`] | Request/response payload for every connector call |
//! | [`DataFrame`] | Tabular view over a payload's `columns` |
//! | [`ColumnType`] | Fixed set of schema type labels |
//! | [`SensorId`] | UUID channel identifier, v4 when built by callers |
//! | [`IsoDateTime`] | ISO 8601 timestamp |
//! | [`DataFormat`] | Presentation of fetched rows/columns |
//!
//! ## Validation
//!
//! Payloads are validated when they are built from wire data:
//!
//! ```rust,ignore
//! use kronicle_core::{KroniclePayload, KronicleError};
//!
//! let err = KroniclePayload::from_str(r#"{"sensor_schema": {"temp": "unknown_type"}}"#);
//! assert!(matches!(err, Err(KronicleError::Validation(_))));
//! ```

mod column_type;
mod frame;
mod payload;
mod sensor_id;
mod timestamp;

pub use column_type::{ColumnType, SensorSchema};
pub use frame::{ChannelData, DataFormat, DataFrame};
pub use payload::{KroniclePayload, Row, TagValue};
pub use sensor_id::SensorId;
pub use timestamp::IsoDateTime;
