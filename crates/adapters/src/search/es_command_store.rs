use std::time::Duration;

use domain::command::entity::{CommandDocument, CommandRecord};
use domain::command::error::CommandError;
use domain::command::query::{FilterMap, Window};
use domain::command::search::build_query_body;
use infrastructure::config::SearchBackendConfig;
use ports::secondary::command_store::{BulkOutcome, CommandStore};
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Blocking HTTP adapter for the search backend's command index.
///
/// Speaks the `_search` / `_count` / `_bulk` REST API and the per-type
/// document endpoint. Read/write errors propagate as domain errors with
/// no retry; only `ping` swallows failures.
#[derive(Debug)]
pub struct EsCommandStore {
    client: reqwest::blocking::Client,
    base_url: String,
    index: String,
    doc_type: String,
}

// ── Response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_source")]
    source: CommandDocument,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<Value>,
}

impl EsCommandStore {
    pub fn new(config: &SearchBackendConfig) -> Result<Self, CommandError> {
        let base_url = config.hosts.first().cloned().ok_or_else(|| {
            CommandError::BackendUnavailable("no search backend hosts configured".to_string())
        })?;

        let timeout_secs = config
            .other
            .get("timeout_secs")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                CommandError::BackendUnavailable(format!("HTTP client init failed: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: config.effective_index().to_string(),
            doc_type: config.effective_doc_type().to_string(),
        })
    }

    /// Request-level `from` / `size` / `sort` parameters, emitted only
    /// when present.
    fn search_params(window: Option<Window>, sort: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(window) = window {
            params.push(("from", window.offset.to_string()));
            params.push(("size", window.size.to_string()));
        }
        if let Some(sort) = sort {
            params.push(("sort", sort.to_string()));
        }
        params
    }

    /// NDJSON body for the bulk endpoint: one action line and one source
    /// line per record.
    fn bulk_body(&self, records: &[CommandRecord]) -> Result<String, CommandError> {
        let mut body = String::new();
        for record in records {
            let document = CommandDocument::from_record(record)?;
            let action = json!({ "index": { "_index": self.index, "_type": self.doc_type } });
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(
                &serde_json::to_string(&document)
                    .map_err(|e| CommandError::WriteFailed(format!("serialize: {e}")))?,
            );
            body.push('\n');
        }
        Ok(body)
    }

    /// Reported failure reason for one bulk response item, if it failed.
    fn item_error(item: &Value) -> Option<String> {
        let error = item.get("index")?.get("error")?;
        if error.is_null() {
            return None;
        }
        Some(
            error
                .get("reason")
                .and_then(Value::as_str)
                .map_or_else(|| error.to_string(), str::to_string),
        )
    }

    fn bulk_outcome(
        response: &BulkResponse,
        total: usize,
        raise_on_error: bool,
    ) -> Result<BulkOutcome, CommandError> {
        let errors: Vec<String> = response.items.iter().filter_map(Self::item_error).collect();
        if raise_on_error && (response.errors || !errors.is_empty()) {
            return Err(CommandError::BulkRejected {
                failed: errors.len().max(1),
                total,
            });
        }
        Ok(BulkOutcome {
            succeeded: total.saturating_sub(errors.len()),
            errors,
        })
    }
}

impl CommandStore for EsCommandStore {
    fn filter(
        &self,
        filters: &FilterMap,
        window: Option<Window>,
        sort: Option<&str>,
    ) -> Result<Vec<CommandRecord>, CommandError> {
        let url = format!("{}/{}/_search", self.base_url, self.index);
        let response = self
            .client
            .post(&url)
            .query(&Self::search_params(window, sort))
            .json(&build_query_body(filters))
            .send()
            .map_err(|e| CommandError::QueryFailed(format!("search request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CommandError::QueryFailed(format!(
                "search returned HTTP {}",
                response.status()
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .map_err(|e| CommandError::QueryFailed(format!("search response parse: {e}")))?;

        Ok(parsed
            .hits
            .hits
            .into_iter()
            .map(|hit| hit.source.into_record())
            .collect())
    }

    fn count(&self, filters: &FilterMap) -> Result<u64, CommandError> {
        let url = format!("{}/{}/_count", self.base_url, self.index);
        let response = self
            .client
            .post(&url)
            .json(&build_query_body(filters))
            .send()
            .map_err(|e| CommandError::QueryFailed(format!("count request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CommandError::QueryFailed(format!(
                "count returned HTTP {}",
                response.status()
            )));
        }

        let parsed: CountResponse = response
            .json()
            .map_err(|e| CommandError::QueryFailed(format!("count response parse: {e}")))?;
        Ok(parsed.count)
    }

    fn save(&self, record: &CommandRecord) -> Result<(), CommandError> {
        let document = CommandDocument::from_record(record)?;
        let url = format!("{}/{}/{}", self.base_url, self.index, self.doc_type);
        let response = self
            .client
            .post(&url)
            .json(&document)
            .send()
            .map_err(|e| CommandError::WriteFailed(format!("index request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CommandError::WriteFailed(format!(
                "index returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn bulk_save(
        &self,
        records: &[CommandRecord],
        raise_on_error: bool,
    ) -> Result<BulkOutcome, CommandError> {
        let url = format!("{}/_bulk", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(self.bulk_body(records)?)
            .send()
            .map_err(|e| CommandError::WriteFailed(format!("bulk request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CommandError::WriteFailed(format!(
                "bulk returned HTTP {}",
                response.status()
            )));
        }

        let parsed: BulkResponse = response
            .json()
            .map_err(|e| CommandError::WriteFailed(format!("bulk response parse: {e}")))?;
        Self::bulk_outcome(&parsed, records.len(), raise_on_error)
    }

    fn ping(&self) -> bool {
        self.client
            .get(&self.base_url)
            .send()
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }
}
