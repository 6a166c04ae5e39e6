use std::fmt::{Display, Formatter};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Ordered mapping from column name to its type label.
pub type SensorSchema = IndexMap<String, ColumnType>;

/// Type label accepted in a channel schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Str,
    Int,
    Float,
    Bool,
    Datetime,
    Dict,
    List,
}

impl ColumnType {
    pub const ALL: [ColumnType; 7] = [
        Self::Str,
        Self::Int,
        Self::Float,
        Self::Bool,
        Self::Datetime,
        Self::Dict,
        Self::List,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Datetime => "datetime",
            Self::Dict => "dict",
            Self::List => "list",
        }
    }

    /// All labels, in declaration order.
    pub fn labels() -> [&'static str; 7] {
        Self::ALL.map(Self::as_str)
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == input)
            .ok_or_else(|| ValidationError::UnknownColumnType {
                value: input.to_owned(),
            })
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
