//! JSON shapes of the Firestore v1 REST API used by the vote store.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Reads an integer field. `None` when the field is absent.
    pub fn integer(&self, field: &str) -> Result<Option<i64>, String> {
        let Some(value) = self.fields.get(field) else { return Ok(None) };

        if let Some(raw) = value.get("integerValue") {
            return match raw {
                Value::String(s) => s.parse().map(Some).map_err(|e| format!("{field}: {e}")),
                Value::Number(n) => n.as_i64().map(Some).ok_or_else(|| format!("{field}: {n} out of range")),
                other => Err(format!("{field}: unexpected integerValue {other}")),
            };
        }
        if let Some(raw) = value.get("doubleValue") {
            return raw
                .as_f64()
                .and_then(whole_count)
                .map(Some)
                .ok_or_else(|| format!("{field}: doubleValue {raw} is not a whole count"));
        }
        if value.get("nullValue").is_some() {
            return Ok(None);
        }
        Err(format!("{field} is not a number"))
    }

    pub fn timestamp(&self, field: &str) -> Option<OffsetDateTime> {
        self.fields
            .get(field)
            .and_then(|v| v.get("timestampValue"))
            .and_then(Value::as_str)
            .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
    }
}

/// Accepts a double only when it is a finite, non-negative whole number
/// that fits in an `i64`.
fn whole_count(raw: f64) -> Option<i64> {
    // 2^63 is the first double past i64::MAX.
    if raw.is_finite() && raw >= 0.0 && raw.fract() == 0.0 && raw < 9_223_372_036_854_775_808.0 {
        Some(raw as i64)
    } else {
        None
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginTransactionRequest {
    pub options: TransactionOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOptions {
    pub read_write: ReadWrite,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_transaction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BeginTransactionResponse {
    pub transaction: String,
}

#[derive(Debug, Serialize)]
pub struct BatchGetRequest<'a> {
    pub documents: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<&'a str>,
}

/// One element of the `batchGet` response array. Absent documents come back
/// as `missing` entries and are simply skipped.
#[derive(Debug, Deserialize)]
pub struct BatchGetItem {
    pub found: Option<Document>,
}

#[derive(Debug, Serialize)]
pub struct CommitRequest<'a> {
    pub writes: Vec<Write>,
    pub transaction: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RollbackRequest<'a> {
    pub transaction: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    pub update: WriteDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_mask: Option<DocumentMask>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub update_transforms: Vec<FieldTransform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_document: Option<Precondition>,
}

#[derive(Debug, Serialize)]
pub struct WriteDocument {
    pub name: String,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMask {
    pub field_paths: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTransform {
    pub field_path: String,
    pub set_to_server_value: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Precondition {
    pub exists: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: ErrorStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorStatus {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

pub fn integer_value(value: i64) -> Value {
    json!({ "integerValue": value.to_string() })
}

pub fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}
