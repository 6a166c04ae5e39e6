use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::{Uuid, Version};

use crate::ValidationError;

/// Channel identifier.
///
/// Identifiers built by callers ([`SensorId::parse`], [`SensorId::new_v4`])
/// must be UUID v4. Identifiers decoded from service responses are opaque and
/// may carry any UUID version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct SensorId(Uuid);

impl SensorId {
    /// Generate a fresh random identifier.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidSensorId {
            value: input.to_owned(),
        };
        let uuid = Uuid::parse_str(input.trim()).map_err(|_| invalid())?;
        Self::from_uuid(uuid).map_err(|_| invalid())
    }

    pub fn from_uuid(uuid: Uuid) -> Result<Self, ValidationError> {
        if uuid.get_version() != Some(Version::Random) {
            return Err(ValidationError::InvalidSensorId {
                value: uuid.to_string(),
            });
        }
        Ok(Self(uuid))
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn is_v4(&self) -> bool {
        self.0.get_version() == Some(Version::Random)
    }
}

impl Display for SensorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for SensorId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SensorId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for SensorId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SensorId> for String {
    fn from(value: SensorId) -> Self {
        value.to_string()
    }
}

impl<'de> Deserialize<'de> for SensorId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| serde::de::Error::custom(format!("sensor id is not a UUID: '{raw}'")))
    }
}
