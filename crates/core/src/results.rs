use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

pub type CellValue = serde_json::Value;

/// One result row as ordered `column -> value` pairs, in result-set column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, CellValue)>,
}

impl Record {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    fn has_keys(&self, keys: &[String]) -> bool {
        self.fields.len() == keys.len() && self.keys().zip(keys).all(|(left, right)| left == right)
    }

    fn into_values(self) -> Vec<CellValue> {
        self.fields.into_iter().map(|(_, value)| value).collect()
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgement {
    pub affected_rows: u64,
    pub last_insert_id: Option<u64>,
}

/// What the engine handed back for one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome {
    Records(RecordSet),
    Acknowledged(Acknowledgement),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TabularResult {
    pub headers: Vec<String>,
    #[serde(rename = "data")]
    pub rows: Vec<Vec<CellValue>>,
}

/// Decided once per result: either nothing matched and the declared columns
/// provide the headers, or the first record's keys do.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultShape {
    Empty {
        declared_headers: Vec<String>,
    },
    Rows {
        headers: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    },
}

impl ResultShape {
    pub fn classify<S: AsRef<str>>(records: Vec<Record>, declared_columns: &[S]) -> Self {
        let Some(first) = records.first() else {
            return Self::Empty {
                declared_headers: declared_columns
                    .iter()
                    .map(|column| format_header(column.as_ref()))
                    .collect(),
            };
        };

        let keys = first.keys().map(str::to_string).collect::<Vec<_>>();
        let headers = keys.iter().map(|key| format_header(key)).collect();
        let rows = records
            .into_iter()
            .map(|record| project(record, &keys))
            .collect();

        Self::Rows { headers, rows }
    }

    #[must_use]
    pub fn into_tabular(self) -> TabularResult {
        match self {
            Self::Empty { declared_headers } => TabularResult {
                headers: declared_headers,
                rows: Vec::new(),
            },
            Self::Rows { headers, rows } => TabularResult { headers, rows },
        }
    }
}

pub fn normalize<S: AsRef<str>>(records: Vec<Record>, declared_columns: &[S]) -> TabularResult {
    ResultShape::classify(records, declared_columns).into_tabular()
}

/// Upper-cases a column key and turns its first underscore into a space:
/// `table_schema_name` becomes `TABLE SCHEMA_NAME`.
#[must_use]
pub fn format_header(key: &str) -> String {
    key.to_uppercase().replacen('_', " ", 1)
}

fn project(record: Record, keys: &[String]) -> Vec<CellValue> {
    if record.has_keys(keys) {
        return record.into_values();
    }

    keys.iter()
        .map(|key| record.get(key).cloned().unwrap_or(CellValue::Null))
        .collect()
}
