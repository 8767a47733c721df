//! Destination table access.
//!
//! [`SpotStore`] is the seam the pipeline writes through. [`SupabaseStore`]
//! implements it against a Supabase project's PostgREST endpoint
//! (`{SUPABASE_URL}/rest/v1/{table}`).
//!
//! # Responses
//!
//! | Response | Outcome |
//! |----------|---------|
//! | 2xx with a non-empty JSON array | [`InsertOutcome::Inserted`] |
//! | 409 or Postgres code `23505` | [`InsertOutcome::Duplicate`] |
//! | anything else | [`InsertOutcome::Rejected`] with the returned detail |

use crate::models::{ExistingSpot, SpotRecord};
use crate::utils::truncate_for_log;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, InvalidHeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

const STORE_TIMEOUT: Duration = Duration::from_secs(30);
const UNIQUE_VIOLATION: &str = "23505";

/// Failures talking to the destination store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store url: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid access key: {0}")]
    Key(#[from] InvalidHeaderValue),
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected store payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("store returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },
}

/// Result of one insert call that reached the store.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The row was written and echoed back.
    Inserted,
    /// The store's uniqueness constraint rejected the row.
    Duplicate,
    /// The store answered without data; carries whatever detail it gave.
    Rejected(String),
}

/// The spots table, as seen by the pipeline.
pub trait SpotStore {
    /// `select(name, country)` over the whole table.
    async fn existing_spots(&self) -> Result<Vec<ExistingSpot>, StoreError>;

    /// Insert one row.
    async fn insert(&self, record: &SpotRecord) -> Result<InsertOutcome, StoreError>;
}

/// PostgREST error body.
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl PostgrestError {
    fn detail(&self, raw: &str) -> String {
        match (&self.message, &self.details) {
            (Some(message), Some(details)) => format!("{message} ({details})"),
            (Some(message), None) => message.clone(),
            _ => truncate_for_log(raw, 300),
        }
    }
}

/// Supabase table client.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    client: Client,
    endpoint: Url,
}

impl SupabaseStore {
    /// Create a client for `table` in the project at `base_url`.
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self, StoreError> {
        let endpoint = table_endpoint(base_url, table)?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(api_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(STORE_TIMEOUT)
            .default_headers(headers)
            .build()?;
        Ok(Self { client, endpoint })
    }
}

fn table_endpoint(base_url: &str, table: &str) -> Result<Url, url::ParseError> {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base)?.join(&format!("rest/v1/{table}"))
}

/// Map an insert response onto an [`InsertOutcome`].
fn classify_insert(status: StatusCode, body: &str) -> InsertOutcome {
    if status.is_success() {
        return match serde_json::from_str::<Vec<serde_json::Value>>(body) {
            Ok(rows) if !rows.is_empty() => InsertOutcome::Inserted,
            _ => InsertOutcome::Rejected(format!(
                "no data returned ({})",
                truncate_for_log(body, 300)
            )),
        };
    }

    let error: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    if status == StatusCode::CONFLICT || error.code.as_deref() == Some(UNIQUE_VIOLATION) {
        InsertOutcome::Duplicate
    } else {
        InsertOutcome::Rejected(format!("{status}: {}", error.detail(body)))
    }
}

impl SpotStore for SupabaseStore {
    #[instrument(level = "info", skip(self), fields(endpoint = %self.endpoint))]
    async fn existing_spots(&self) -> Result<Vec<ExistingSpot>, StoreError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("select", "name,country");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let error: PostgrestError = serde_json::from_str(&body).unwrap_or_default();
            return Err(StoreError::Status {
                status,
                detail: error.detail(&body),
            });
        }

        let rows: Vec<ExistingSpot> = serde_json::from_str(&body)?;
        debug!(count = rows.len(), "Read existing spots");
        Ok(rows)
    }

    #[instrument(level = "info", skip_all, fields(name = %record.name))]
    async fn insert(&self, record: &SpotRecord) -> Result<InsertOutcome, StoreError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Prefer", "return=representation")
            .body(serde_json::to_string(record)?)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(classify_insert(status, &body))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store double recording every insert call.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub existing: Vec<ExistingSpot>,
        pub fail_seed: bool,
        pub reject_inserts: bool,
        pub inserted: Mutex<Vec<SpotRecord>>,
    }

    impl MemoryStore {
        pub(crate) fn inserted(&self) -> Vec<SpotRecord> {
            self.inserted.lock().unwrap().clone()
        }
    }

    impl SpotStore for MemoryStore {
        async fn existing_spots(&self) -> Result<Vec<ExistingSpot>, StoreError> {
            if self.fail_seed {
                return Err(StoreError::Status {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    detail: "unavailable".to_string(),
                });
            }
            Ok(self.existing.clone())
        }

        async fn insert(&self, record: &SpotRecord) -> Result<InsertOutcome, StoreError> {
            if self.reject_inserts {
                return Ok(InsertOutcome::Rejected("permission denied".to_string()));
            }
            self.inserted.lock().unwrap().push(record.clone());
            Ok(InsertOutcome::Inserted)
        }
    }

    #[test]
    fn test_table_endpoint() {
        assert_eq!(
            table_endpoint("https://abc.supabase.co", "kitespots").unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/kitespots"
        );
        assert_eq!(
            table_endpoint("https://abc.supabase.co/", "kitespots").unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/kitespots"
        );
        assert!(table_endpoint("not a url", "kitespots").is_err());
    }

    #[test]
    fn test_classify_inserted() {
        let outcome = classify_insert(StatusCode::CREATED, r#"[{"id":1,"name":"Tarifa"}]"#);
        assert_eq!(outcome, InsertOutcome::Inserted);
    }

    #[test]
    fn test_classify_success_without_data_is_rejected() {
        let outcome = classify_insert(StatusCode::CREATED, "[]");
        assert!(matches!(outcome, InsertOutcome::Rejected(_)));
    }

    #[test]
    fn test_classify_unique_violation() {
        let body = r#"{"code":"23505","details":"Key (spot_key)=(tarifa_spain) already exists.","hint":null,"message":"duplicate key value violates unique constraint"}"#;
        assert_eq!(
            classify_insert(StatusCode::CONFLICT, body),
            InsertOutcome::Duplicate
        );
        assert_eq!(
            classify_insert(StatusCode::BAD_REQUEST, body),
            InsertOutcome::Duplicate
        );
    }

    #[test]
    fn test_classify_other_error_keeps_detail() {
        let body = r#"{"code":"42501","details":null,"hint":null,"message":"permission denied for table kitespots"}"#;
        match classify_insert(StatusCode::UNAUTHORIZED, body) {
            InsertOutcome::Rejected(detail) => {
                assert!(detail.contains("permission denied for table kitespots"))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_classify_non_json_error() {
        match classify_insert(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") {
            InsertOutcome::Rejected(detail) => assert!(detail.contains("bad gateway")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_new_rejects_bad_key() {
        assert!(matches!(
            SupabaseStore::new("https://abc.supabase.co", "bad\nkey", "kitespots"),
            Err(StoreError::Key(_))
        ));
    }
}
