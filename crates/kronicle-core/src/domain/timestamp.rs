use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::ValidationError;

/// ISO 8601 timestamp. Values without an offset are taken as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoDateTime(OffsetDateTime);

impl IsoDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
            return Ok(Self(parsed));
        }
        if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Iso8601::DEFAULT) {
            return Ok(Self(parsed));
        }
        // `2024-01-01 12:00:00` is accepted alongside the `T` separator.
        let normalized = trimmed.replacen(' ', "T", 1);
        if let Ok(parsed) = OffsetDateTime::parse(&normalized, &Iso8601::DEFAULT) {
            return Ok(Self(parsed));
        }
        PrimitiveDateTime::parse(&normalized, &Iso8601::DEFAULT)
            .map(|naive| Self(naive.assume_utc()))
            .map_err(|_| ValidationError::InvalidTimestamp {
                value: input.to_owned(),
            })
    }

    pub const fn from_offset_datetime(value: OffsetDateTime) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn format_rfc3339(self) -> String {
        // Every OffsetDateTime with a four-digit year is RFC 3339 formattable.
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.0.to_string())
    }
}

impl Display for IsoDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for IsoDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for IsoDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}
