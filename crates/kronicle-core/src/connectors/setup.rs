use tracing::{info, warn};

use crate::connector::{Body, ConnectorRole, KronicleConnector, KronicleResponse};
use crate::{KronicleError, SensorId};

use super::WriteRole;

/// Channel lifecycle on the setup routes; also ingests rows.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SetupRoutes;

impl ConnectorRole for SetupRoutes {
    fn prefix(&self) -> &'static str {
        "setup/v1"
    }
}

impl WriteRole for SetupRoutes {}

pub type KronicleSetup = KronicleConnector<SetupRoutes>;

impl KronicleConnector<SetupRoutes> {
    pub fn create_channel(
        &mut self,
        body: impl Into<Body>,
    ) -> Result<KronicleResponse, KronicleError> {
        let payload = body.into().into_payload()?;
        payload.ensure_has_id()?;
        self.post("channels", Some(payload.into()))
    }

    pub fn upsert_channel(
        &mut self,
        body: impl Into<Body>,
    ) -> Result<KronicleResponse, KronicleError> {
        let payload = body.into().into_payload()?;
        payload.ensure_has_id()?;
        self.put("channels", payload.into())
    }

    pub fn update_channel(
        &mut self,
        body: impl Into<Body>,
    ) -> Result<KronicleResponse, KronicleError> {
        let payload = body.into().into_payload()?;
        let id = payload.ensure_has_id()?;
        self.patch(&format!("channels/{id}"), payload.into())
    }

    /// Delete a channel that the server currently reports.
    pub fn delete_channel(&mut self, id: &SensorId) -> Result<KronicleResponse, KronicleError> {
        let Some(channel) = self.get_channel(id)? else {
            return Err(KronicleError::operation(format!(
                "no sensor found with id {id} on {}",
                self.url()
            )));
        };
        let id = channel.sensor_id.unwrap_or(*id);
        self.delete(&format!("channels/{id}"))
    }

    /// Delete every channel in the directory, skipping individual failures.
    ///
    /// Returns the identifiers that were actually deleted.
    pub fn delete_all_channels(&mut self) -> Result<Vec<SensorId>, KronicleError> {
        let ids = self.all_ids()?;
        let mut deleted = Vec::with_capacity(ids.len());
        for id in ids {
            match self.delete_channel(&id) {
                Ok(_) => {
                    info!(sensor_id = %id, "deleted channel");
                    deleted.push(id);
                }
                Err(error) => {
                    warn!(sensor_id = %id, code = error.code(), %error, "could not delete channel");
                }
            }
        }
        Ok(deleted)
    }

    /// Clone a channel, optionally overriding fields with `body`.
    pub fn clone_channel(
        &mut self,
        id: &SensorId,
        body: Option<Body>,
    ) -> Result<KronicleResponse, KronicleError> {
        let body = body.filter(|body| !body.is_empty());
        self.post(&format!("channels/{id}/clone"), body)
    }
}
