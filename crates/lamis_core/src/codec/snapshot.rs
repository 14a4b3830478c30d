//! Exchange envelope encoding and import validation.
//!
//! Envelope layout (pretty-printed JSON):
//!
//! ```text
//! exportDate  RFC 3339 timestamp, millisecond precision, UTC
//! appVersion  APP_VERSION
//! dataType    DATA_TYPE
//! totalRows   ROW_COUNT
//! filename    LAMIS_Data_<YYYY-MM-DD>_<HH-MM-SS>.json
//! data        grid mapping (`row_<N>` -> {L,A,M,I,S})
//! ```
//!
//! Import validation only requires `data` to be a mapping and, when a
//! `dataType` tag is present, that it matches. Row entries are read leniently.

use crate::model::grid::{json_kind, GridState, ROW_COUNT};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const APP_VERSION: &str = "1.0";
pub const DATA_TYPE: &str = "LAMIS_CHECKBOX_DATA";

const FILENAME_PREFIX: &str = "LAMIS_Data_";
const FILENAME_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Reason an import payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Text is not parseable JSON.
    MalformedPayload(String),
    /// `data` is absent or not a mapping.
    MissingDataField,
    /// `dataType` is present but names another kind of data.
    WrongDataKind { found: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedPayload(detail) => write!(f, "payload is not valid JSON: {detail}"),
            Self::MissingDataField => write!(f, "payload has no `data` mapping"),
            Self::WrongDataKind { found } => {
                write!(f, "payload data type is `{found}`, expected `{DATA_TYPE}`")
            }
        }
    }
}

impl Error for ValidationError {}

/// Exported or imported grid snapshot plus metadata.
///
/// Envelopes built by [`ExchangeEnvelope::encode`] carry every metadata
/// field. Decoded envelopes keep whatever metadata the payload had; only
/// `data` is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    export_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    data: GridState,
}

impl ExchangeEnvelope {
    /// Builds an export envelope for `state` stamped with `now`.
    pub fn encode(state: &GridState, now: DateTime<Utc>) -> Self {
        Self {
            export_date: Some(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            app_version: Some(APP_VERSION.to_string()),
            data_type: Some(DATA_TYPE.to_string()),
            total_rows: Some(u64::from(ROW_COUNT)),
            filename: Some(export_filename(now)),
            data: state.clone(),
        }
    }

    /// Parses and validates pasted text.
    ///
    /// Checks run in order: JSON syntax, `data` mapping, `dataType` tag.
    pub fn decode(raw: &str) -> Result<Self, ValidationError> {
        let root: Value = serde_json::from_str(raw)
            .map_err(|err| ValidationError::MalformedPayload(err.to_string()))?;

        let data = match root.get("data") {
            Some(Value::Object(data)) => data,
            _ => return Err(ValidationError::MissingDataField),
        };

        let data_type = match root.get("dataType") {
            None | Some(Value::Null) => None,
            Some(Value::String(tag)) if tag.is_empty() => None,
            Some(Value::String(tag)) if tag == DATA_TYPE => Some(tag.clone()),
            Some(Value::String(tag)) => {
                return Err(ValidationError::WrongDataKind { found: tag.clone() })
            }
            Some(other) => {
                return Err(ValidationError::WrongDataKind {
                    found: json_kind(other).to_string(),
                })
            }
        };

        Ok(Self {
            export_date: string_member(&root, "exportDate"),
            app_version: string_member(&root, "appVersion"),
            data_type,
            total_rows: root.get("totalRows").and_then(Value::as_u64),
            filename: string_member(&root, "filename"),
            data: GridState::from_json_object(data),
        })
    }

    /// Pretty-printed JSON text for the transfer channel.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn export_date(&self) -> Option<&str> {
        self.export_date.as_deref()
    }

    pub fn app_version(&self) -> Option<&str> {
        self.app_version.as_deref()
    }

    pub fn data_type(&self) -> Option<&str> {
        self.data_type.as_deref()
    }

    pub fn total_rows(&self) -> Option<u64> {
        self.total_rows
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn data(&self) -> &GridState {
        &self.data
    }

    pub fn into_data(self) -> GridState {
        self.data
    }
}

/// Informational file name hint for an export taken at `now`.
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("{FILENAME_PREFIX}{}.json", now.format(FILENAME_TIME_FORMAT))
}

fn string_member(root: &Value, name: &str) -> Option<String> {
    root.get(name).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{export_filename, ExchangeEnvelope, ValidationError};
    use chrono::{TimeZone, Utc};

    #[test]
    fn filename_uses_dashes_for_time() {
        let now = Utc.with_ymd_and_hms(2031, 12, 1, 9, 5, 7).unwrap();
        assert_eq!(export_filename(now), "LAMIS_Data_2031-12-01_09-05-07.json");
    }

    #[test]
    fn non_string_data_type_is_a_mismatch() {
        let err = ExchangeEnvelope::decode(r#"{"dataType": 3, "data": {}}"#).unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongDataKind {
                found: "number".to_string()
            }
        );
    }

    #[test]
    fn null_or_empty_data_type_counts_as_absent() {
        let envelope = ExchangeEnvelope::decode(r#"{"dataType": null, "data": {}}"#).unwrap();
        assert_eq!(envelope.data_type(), None);
        let envelope = ExchangeEnvelope::decode(r#"{"dataType": "", "data": {}}"#).unwrap();
        assert_eq!(envelope.data_type(), None);
    }

    #[test]
    fn data_must_be_a_mapping() {
        for raw in [r#"{"data": []}"#, r#"{"data": 1}"#, r#"{"data": null}"#, "[]", "7"] {
            assert_eq!(
                ExchangeEnvelope::decode(raw).unwrap_err(),
                ValidationError::MissingDataField,
                "input: {raw}"
            );
        }
    }

    #[test]
    fn missing_data_wins_over_wrong_kind() {
        let err = ExchangeEnvelope::decode(r#"{"dataType": "OTHER"}"#).unwrap_err();
        assert_eq!(err, ValidationError::MissingDataField);
    }
}
