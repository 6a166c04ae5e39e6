use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::str::FromStr;

use indexmap::IndexMap;
use serde_json::{Number, Value};

use crate::{IsoDateTime, Row, ValidationError};

/// Column promoted to the row index when present.
pub const TIME_COLUMN: &str = "time";

/// Tabular view over column-oriented channel data.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    index: Option<Vec<IsoDateTime>>,
    columns: IndexMap<String, Vec<Value>>,
    len: usize,
}

impl DataFrame {
    /// Build a frame from equal-length columns.
    ///
    /// A `time` column leaves the data body and becomes the row index.
    pub fn from_columns(columns: &IndexMap<String, Vec<Value>>) -> Result<Self, ValidationError> {
        let lengths: BTreeSet<usize> = columns.values().map(Vec::len).collect();
        if lengths.len() > 1 {
            return Err(ValidationError::InconsistentColumnLengths { lengths });
        }
        let len = lengths.into_iter().next().unwrap_or(0);

        let mut data = columns.clone();
        let index = data
            .shift_remove(TIME_COLUMN)
            .map(|values| values.iter().map(parse_time_cell).collect::<Result<Vec<_>, _>>())
            .transpose()?;

        Ok(Self {
            index,
            columns: data,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Timestamps taken from the `time` column.
    pub fn index(&self) -> Option<&[IsoDateTime]> {
        self.index.as_deref()
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn columns(&self) -> &IndexMap<String, Vec<Value>> {
        &self.columns
    }

    fn header(&self) -> Vec<String> {
        self.index
            .as_ref()
            .map(|_| String::from(TIME_COLUMN))
            .into_iter()
            .chain(self.columns.keys().cloned())
            .collect()
    }

    fn record(&self, row: usize, render: fn(&Value) -> String) -> Vec<String> {
        self.index
            .as_ref()
            .map(|index| index[row].format_rfc3339())
            .into_iter()
            .chain(self.columns.values().map(|values| render(&values[row])))
            .collect()
    }

    /// Render as CSV text. The index, if any, is written first under `time`.
    pub fn to_csv(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_csv(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    pub fn write_csv<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        let header = self.header();
        if header.is_empty() {
            return writer.flush();
        }
        write_csv_line(&mut writer, header.iter().map(String::as_str))?;
        for row in 0..self.len {
            let cells = self.record(row, csv_cell);
            write_csv_line(&mut writer, cells.iter().map(String::as_str))?;
        }
        writer.flush()
    }

    /// Parse CSV text into ordered columns, inferring one type per column.
    pub fn parse_csv(text: &str) -> Result<IndexMap<String, Vec<Value>>, ValidationError> {
        let mut records = split_csv_records(text)?.into_iter();
        let Some((_, header)) = records.next() else {
            return Ok(IndexMap::new());
        };

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); header.len()];
        for (line, record) in records {
            if record.len() != header.len() {
                return Err(ValidationError::MalformedCsv {
                    line,
                    reason: format!("expected {} fields, found {}", header.len(), record.len()),
                });
            }
            for (column, cell) in cells.iter_mut().zip(record) {
                column.push(cell);
            }
        }

        Ok(header
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| (name, infer_column(raw)))
            .collect())
    }
}

impl Display for DataFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let header = self.header();
        let body: Vec<Vec<String>> = (0..self.len)
            .map(|row| self.record(row, display_cell))
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|name| name.chars().count()).collect();
        for record in &body {
            for (width, cell) in widths.iter_mut().zip(record) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
        };

        writeln!(f, "{}", line(&header).trim_end())?;
        for record in &body {
            writeln!(f, "{}", line(record).trim_end())?;
        }
        Ok(())
    }
}

/// Presentation requested for a channel's rows or columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    #[default]
    List,
    Dict,
    Frame,
    Str,
}

impl DataFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Dict => "dict",
            Self::Frame => "df",
            Self::Str => "str",
        }
    }
}

impl FromStr for DataFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "list" => Ok(Self::List),
            "dict" => Ok(Self::Dict),
            "df" => Ok(Self::Frame),
            "str" => Ok(Self::Str),
            other => Err(ValidationError::UnknownDataFormat {
                value: other.to_owned(),
            }),
        }
    }
}

/// Channel rows or columns in the requested [`DataFormat`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData {
    Rows(Vec<Row>),
    Columns(IndexMap<String, Vec<Value>>),
    Frame(Option<DataFrame>),
    Text(String),
}

fn parse_time_cell(value: &Value) -> Result<IsoDateTime, ValidationError> {
    match value {
        Value::String(text) => {
            IsoDateTime::parse(text).map_err(|error| ValidationError::InvalidTimeColumn {
                reason: error.to_string(),
            })
        }
        other => Err(ValidationError::InvalidTimeColumn {
            reason: format!("expected an ISO 8601 string, got {other}"),
        }),
    }
}

fn display_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        nested => nested.to_string(),
    }
}

fn write_csv_line<'a, W: Write>(
    writer: &mut W,
    cells: impl Iterator<Item = &'a str>,
) -> std::io::Result<()> {
    let line = cells
        .map(|cell| {
            if cell.contains([',', '"', '\n', '\r']) {
                format!("\"{}\"", cell.replace('"', "\"\""))
            } else {
                cell.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "{line}")
}

/// Split CSV text into records, tagging each with its 1-based starting line.
fn split_csv_records(text: &str) -> Result<Vec<(usize, Vec<String>)>, ValidationError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => record.push(std::mem::take(&mut field)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push((record_line, std::mem::take(&mut record)));
                }
                record.clear();
                line += 1;
                record_line = line;
            }
            other => {
                if other == '\n' {
                    line += 1;
                }
                field.push(other);
            }
        }
    }

    if in_quotes {
        return Err(ValidationError::MalformedCsv {
            line: record_line,
            reason: String::from("unterminated quoted field"),
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push((record_line, record));
    }
    Ok(records)
}

fn infer_column(raw: Vec<String>) -> Vec<Value> {
    let filled = || raw.iter().filter(|cell| !cell.is_empty());

    if filled().all(|cell| cell.parse::<i64>().is_ok()) {
        return raw
            .iter()
            .map(|cell| cell.parse::<i64>().map_or(Value::Null, Value::from))
            .collect();
    }
    if filled().all(|cell| cell.parse::<f64>().is_ok_and(f64::is_finite)) {
        return raw
            .iter()
            .map(|cell| {
                cell.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            })
            .collect();
    }
    if filled().all(|cell| parse_bool(cell).is_some()) {
        return raw
            .iter()
            .map(|cell| parse_bool(cell).map_or(Value::Null, Value::Bool))
            .collect();
    }
    raw.into_iter()
        .map(|cell| {
            if cell.is_empty() {
                Value::Null
            } else {
                Value::String(cell)
            }
        })
        .collect()
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns(value: Value) -> IndexMap<String, Vec<Value>> {
        serde_json::from_value(value).expect("columns")
    }

    #[test]
    fn rejects_inconsistent_lengths() {
        let err = DataFrame::from_columns(&columns(json!({"a": [1, 2], "b": [1, 2, 3]})))
            .expect_err("must fail");

        assert_eq!(
            err,
            ValidationError::InconsistentColumnLengths {
                lengths: BTreeSet::from([2, 3])
            }
        );
    }

    #[test]
    fn time_column_becomes_index() {
        let frame = DataFrame::from_columns(&columns(json!({
            "time": ["2024-01-01T00:00:00Z", "2024-01-01T00:01:00Z"],
            "temperature": [21.5, 22.3]
        })))
        .expect("valid frame");

        assert_eq!(frame.len(), 2);
        assert!(frame.column("time").is_none());
        assert_eq!(frame.column_names().collect::<Vec<_>>(), ["temperature"]);
        let index = frame.index().expect("time index");
        assert_eq!(index[1].format_rfc3339(), "2024-01-01T00:01:00Z");
    }

    #[test]
    fn unparsable_time_column_fails() {
        let err = DataFrame::from_columns(&columns(json!({"time": ["soon"], "v": [1]})))
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidTimeColumn { .. }));
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        let frame = DataFrame::from_columns(&columns(json!({
            "name": ["plain", "with, comma", "say \"hi\""],
            "value": [1, null, 3]
        })))
        .expect("valid frame");

        assert_eq!(
            frame.to_csv(),
            "name,value\nplain,1\n\"with, comma\",\n\"say \"\"hi\"\"\",3\n"
        );
    }

    #[test]
    fn parse_csv_infers_column_types() {
        let parsed = DataFrame::parse_csv(
            "time,count,ratio,ok,label\n\
             2024-01-01T00:00:00Z,1,0.5,true,a\n\
             2024-01-01T00:01:00Z,2,1,False,\"b, c\"\n",
        )
        .expect("valid csv");

        assert_eq!(parsed["count"], vec![json!(1), json!(2)]);
        assert_eq!(parsed["ratio"], vec![json!(0.5), json!(1.0)]);
        assert_eq!(parsed["ok"], vec![json!(true), json!(false)]);
        assert_eq!(parsed["label"], vec![json!("a"), json!("b, c")]);
        assert_eq!(parsed["time"][0], json!("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn parse_csv_reports_ragged_records() {
        let err = DataFrame::parse_csv("a,b\n1,2\n3\n").expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::MalformedCsv {
                line: 3,
                reason: String::from("expected 2 fields, found 1"),
            }
        );
    }

    #[test]
    fn display_aligns_columns() {
        let frame = DataFrame::from_columns(&columns(json!({"sensor": ["a", "bbbbbbb"], "v": [1, 22]})))
            .expect("valid frame");

        assert_eq!(frame.to_string(), "sensor   v\na        1\nbbbbbbb  22\n");
    }

    #[test]
    fn data_format_parses_known_values() {
        assert_eq!("df".parse::<DataFormat>(), Ok(DataFormat::Frame));
        assert_eq!("dict".parse::<DataFormat>(), Ok(DataFormat::Dict));
        assert!(matches!(
            "xml".parse::<DataFormat>(),
            Err(ValidationError::UnknownDataFormat { .. })
        ));
    }
}
