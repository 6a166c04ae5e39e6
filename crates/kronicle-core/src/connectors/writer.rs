use serde_json::Value;

use crate::connector::{Body, ConnectorRole, KronicleConnector, KronicleResponse};
use crate::{KronicleError, KroniclePayload, Row, SensorId};

/// Roles allowed to push rows.
pub trait WriteRole: ConnectorRole {}

/// Row ingestion on the data routes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriterRoutes;

impl ConnectorRole for WriterRoutes {
    fn prefix(&self) -> &'static str {
        "data/v1"
    }
}

impl WriteRole for WriterRoutes {}

pub type KronicleWriter = KronicleConnector<WriterRoutes>;

impl<R: WriteRole> KronicleConnector<R> {
    /// Column type labels accepted by the server, as raw JSON.
    pub fn column_types(&self) -> Result<Value, KronicleError> {
        self.get_raw("schemas/columns/types")
    }

    /// Create the channel if needed and append the body's rows.
    pub fn insert_rows_and_upsert_channel(
        &mut self,
        body: impl Into<Body>,
    ) -> Result<KronicleResponse, KronicleError> {
        let payload = body.into().into_payload()?;
        payload.ensure_has_id()?;
        self.post("channels", Some(payload.into()))
    }

    pub fn add_row(&mut self, body: impl Into<Body>) -> Result<KronicleResponse, KronicleError> {
        self.insert_rows_and_upsert_channel(body)
    }

    /// Append rows to an existing channel.
    pub fn insert_rows(
        &mut self,
        id: SensorId,
        rows: Vec<Row>,
    ) -> Result<KronicleResponse, KronicleError> {
        let payload = KroniclePayload {
            sensor_id: Some(id),
            rows: Some(rows),
            ..KroniclePayload::default()
        };
        self.post(&format!("channels/{id}/rows"), Some(payload.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationError;

    #[test]
    fn upsert_requires_sensor_id() {
        let mut writer = KronicleWriter::new("http://127.0.0.1:1");
        let body = KroniclePayload {
            sensor_name: Some(String::from("orphan")),
            ..KroniclePayload::default()
        };

        let err = writer
            .insert_rows_and_upsert_channel(body)
            .expect_err("must fail before any request");
        assert!(matches!(
            err,
            KronicleError::Validation(ValidationError::MissingSensorId)
        ));
    }
}
