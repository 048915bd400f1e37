//! Firestore REST client for the history collection.
//!
//! Inserts go through `documents:commit` so the `createdAt` field can be
//! filled with the server's request time; reads use `documents:runQuery`
//! ordered by that field, newest first.

use crate::config::RemoteConfig;
use crate::models::HistoryEntry;
use crate::remote::{DocumentStore, RemoteError, RemoteRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::debug;

const CREATED_AT_FIELD: &str = "createdAt";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct FirestoreStore {
    client: Client,
    base_url: String,
    api_key: String,
    documents_root: String,
}

impl FirestoreStore {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(concat!("coffee_to_code/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            documents_root: format!(
                "projects/{}/databases/(default)/documents",
                config.project_id
            ),
        })
    }

    async fn post(&self, action: &str, body: &Value) -> Result<reqwest::Response, RemoteError> {
        let url = format!("{}/v1/{}:{action}", self.base_url, self.documents_root);
        let mut request = self.client.post(url).json(body);
        if !self.api_key.is_empty() {
            request = request.query(&[("key", self.api_key.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn insert(
        &self,
        collection: &str,
        entry: &HistoryEntry,
    ) -> Result<RemoteRecord, RemoteError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let body = json!({
            "writes": [{
                "update": {
                    "name": format!("{}/{collection}/{id}", self.documents_root),
                    "fields": encode_fields(entry),
                },
                "updateTransforms": [{
                    "fieldPath": CREATED_AT_FIELD,
                    "setToServerValue": "REQUEST_TIME",
                }],
                "currentDocument": { "exists": false },
            }]
        });

        let response: CommitResponse = self
            .post("commit", &body)
            .await?
            .json()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))?;
        debug!(%id, "history entry committed");

        let created_at = response
            .write_results
            .first()
            .and_then(|result| result.transform_results.first())
            .and_then(|value| value.get("timestampValue"))
            .and_then(Value::as_str)
            .or(response.commit_time.as_deref())
            .and_then(parse_timestamp);

        Ok(RemoteRecord {
            id: Some(id),
            date: Some(entry.date.clone()),
            created_at,
            cups: Some(entry.cups),
            coding_minutes: Some(entry.coding_minutes),
            mood: Some(entry.mood.clone()),
            notes: Some(entry.notes.clone()),
        })
    }

    async fn list_newest_first(&self, collection: &str) -> Result<Vec<RemoteRecord>, RemoteError> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "orderBy": [{
                    "field": { "fieldPath": CREATED_AT_FIELD },
                    "direction": "DESCENDING",
                }],
            }
        });

        let rows: Vec<QueryRow> = self
            .post("runQuery", &body)
            .await?
            .json()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.document)
            .map(decode_document)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    #[serde(default)]
    write_results: Vec<WriteResult>,
    commit_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteResult {
    #[serde(default)]
    transform_results: Vec<Value>,
}

/// One element of a runQuery stream; rows that only carry `readTime`
/// have no document.
#[derive(Debug, Deserialize)]
struct QueryRow {
    document: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

fn encode_fields(entry: &HistoryEntry) -> Value {
    json!({
        "date": { "stringValue": entry.date },
        "cups": { "doubleValue": entry.cups },
        "codingMinutes": { "integerValue": entry.coding_minutes.to_string() },
        "mood": { "stringValue": entry.mood },
        "notes": { "stringValue": entry.notes },
    })
}

fn decode_document(document: Document) -> RemoteRecord {
    let fields = &document.fields;
    let id = document
        .name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let date = string_field(fields, "date").or_else(|| {
        fields
            .get("date")
            .and_then(|value| value.get("timestampValue"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    RemoteRecord {
        id,
        date,
        created_at: fields
            .get(CREATED_AT_FIELD)
            .and_then(|value| value.get("timestampValue"))
            .and_then(Value::as_str)
            .and_then(parse_timestamp),
        cups: number_field(fields, "cups"),
        coding_minutes: number_field(fields, "codingMinutes").map(|value| value.max(0.0).round() as u64),
        mood: string_field(fields, "mood"),
        notes: string_field(fields, "notes"),
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)?
        .get("stringValue")?
        .as_str()
        .map(str::to_string)
}

/// Firestore sends integers as decimal strings and doubles as numbers.
fn number_field(fields: &Map<String, Value>, name: &str) -> Option<f64> {
    let value = fields.get(name)?;
    if let Some(double) = value.get("doubleValue").and_then(Value::as_f64) {
        return Some(double);
    }
    match value.get("integerValue")? {
        Value::String(text) => text.parse::<i64>().ok().map(|n| n as f64),
        other => other.as_f64(),
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(fields: Value) -> Document {
        Document {
            name: "projects/p/databases/(default)/documents/history/abc123".to_string(),
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn decodes_typed_fields() {
        let record = decode_document(document(json!({
            "date": { "stringValue": "2026-01-05T20:00:00.000Z" },
            "cups": { "doubleValue": 2.5 },
            "codingMinutes": { "integerValue": "90" },
            "mood": { "stringValue": "🙂" },
            "createdAt": { "timestampValue": "2026-01-05T20:00:01.5Z" },
        })));

        assert_eq!(record.id.as_deref(), Some("abc123"));
        assert_eq!(record.date.as_deref(), Some("2026-01-05T20:00:00.000Z"));
        assert_eq!(record.cups, Some(2.5));
        assert_eq!(record.coding_minutes, Some(90));
        assert_eq!(record.mood.as_deref(), Some("🙂"));
        assert_eq!(record.notes, None);
        assert!(record.created_at.is_some());
    }

    #[test]
    fn integer_cups_and_missing_fields() {
        let record = decode_document(document(json!({
            "cups": { "integerValue": "2" },
            "date": { "nullValue": null },
        })));
        assert_eq!(record.cups, Some(2.0));
        assert_eq!(record.date, None);
        assert_eq!(record.coding_minutes, None);
        assert_eq!(record.created_at, None);
    }

    #[test]
    fn encodes_minutes_as_integer_string() {
        let entry = HistoryEntry {
            id: None,
            date: "2026-01-05T20:00:00.000Z".to_string(),
            cups: 1.5,
            coding_minutes: 45,
            mood: "😐".to_string(),
            notes: String::new(),
        };
        let fields = encode_fields(&entry);
        assert_eq!(fields["codingMinutes"]["integerValue"], "45");
        assert_eq!(fields["cups"]["doubleValue"], 1.5);
        assert_eq!(fields["notes"]["stringValue"], "");
    }
}
