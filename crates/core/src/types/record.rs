//! User record type and payload normalization.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::column::Column;

/// A single user row loaded from the remote sheet.
///
/// Every field is a string. Missing or `null` values normalize to `""`;
/// numbers and booleans keep their JSON text (`1` becomes `"1"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub first_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gender: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country_code: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub street_address: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub photo: String,
}

/// Outcome of normalizing a remote payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    /// Records that were recovered from the payload.
    pub records: Vec<UserRecord>,
    /// Number of entries that were dropped because they were not rows.
    pub skipped: usize,
}

impl UserRecord {
    /// Normalize a JSON array of objects into records.
    ///
    /// Anything other than an array yields zero records. Array entries that
    /// are not objects are skipped and counted.
    #[must_use]
    pub fn from_json_rows(payload: &Value) -> Normalized {
        let Some(items) = payload.as_array() else {
            return Normalized::default();
        };

        let mut normalized = Normalized::default();
        for item in items {
            if !item.is_object() {
                normalized.skipped += 1;
                continue;
            }
            match Self::deserialize(item) {
                Ok(record) => normalized.records.push(record),
                Err(_) => normalized.skipped += 1,
            }
        }
        normalized
    }

    /// Normalize a 2-D array of cells whose first row is a header.
    ///
    /// Cells map onto [`Column::ALL`] by position; short rows are padded with
    /// empty strings and extra cells are ignored.
    #[must_use]
    pub fn from_sheet_values(values: &[Vec<Value>]) -> Vec<Self> {
        values
            .iter()
            .skip(1)
            .map(|row| {
                let mut record = Self::default();
                for (column, cell) in Column::ALL.into_iter().zip(row) {
                    *column.value_mut(&mut record) = cell_to_string(cell);
                }
                record
            })
            .collect()
    }
}

/// Render a JSON cell as display text.
#[must_use]
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(cell_to_string(&value))
}
