//! In-memory `CommandStore` for use in tests.

use std::cmp::Ordering;
use std::sync::Mutex;

use domain::command::entity::CommandRecord;
use domain::command::error::CommandError;
use domain::command::query::{FilterMap, Window};
use serde_json::Value;

use crate::secondary::command_store::{BulkOutcome, CommandStore};

/// Mutex-guarded Vec applying the same observable filter semantics as the
/// real search backend: exact equality for term fields, substring
/// containment for text fields, org-scope exclusion for an empty
/// `org_id`, and a timestamp range only when both bounds are present.
#[derive(Default)]
pub struct InMemoryCommandStore {
    records: Mutex<Vec<CommandRecord>>,
}

impl InMemoryCommandStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<CommandRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matches(record: &CommandRecord, filters: &FilterMap) -> bool {
        for (key, value) in filters {
            let matched = match key.as_str() {
                "user" => Some(record.user.as_str()) == value.as_str(),
                "asset" => Some(record.asset.as_str()) == value.as_str(),
                "system_user" => Some(record.system_user.as_str()) == value.as_str(),
                "session" => contains(&record.session, value),
                "input" => contains(&record.input, value),
                "org_id" => match value.as_str() {
                    Some("") => record.org_id.is_empty(),
                    Some(org) => record.org_id.contains(org),
                    None => true,
                },
                "risk_level" => value
                    .as_u64()
                    .map_or(true, |level| u64::from(record.risk_level.level()) == level),
                // Range applies only when both bounds are present.
                "date_from" => match (value.as_i64(), filters.get("date_to")) {
                    (Some(from), Some(_)) => record.timestamp >= from,
                    _ => true,
                },
                "date_to" => match (value.as_i64(), filters.get("date_from")) {
                    (Some(to), Some(_)) => record.timestamp <= to,
                    _ => true,
                },
                // Unrecognized keys never constrain.
                _ => true,
            };
            if !matched {
                return false;
            }
        }
        true
    }

    fn compare(a: &CommandRecord, b: &CommandRecord, field: &str) -> Ordering {
        match field {
            "timestamp" => a.timestamp.cmp(&b.timestamp),
            "user" => a.user.cmp(&b.user),
            "asset" => a.asset.cmp(&b.asset),
            "system_user" => a.system_user.cmp(&b.system_user),
            "session" => a.session.cmp(&b.session),
            "risk_level" => a.risk_level.level().cmp(&b.risk_level.level()),
            _ => Ordering::Equal,
        }
    }
}

fn contains(haystack: &str, value: &Value) -> bool {
    value.as_str().map_or(true, |needle| haystack.contains(needle))
}

impl CommandStore for InMemoryCommandStore {
    fn filter(
        &self,
        filters: &FilterMap,
        window: Option<Window>,
        sort: Option<&str>,
    ) -> Result<Vec<CommandRecord>, CommandError> {
        let records = self
            .records
            .lock()
            .map_err(|e| CommandError::QueryFailed(format!("lock poisoned: {e}")))?;

        let mut hits: Vec<CommandRecord> = records
            .iter()
            .filter(|r| Self::matches(r, filters))
            .cloned()
            .collect();

        if let Some(spec) = sort {
            if let Some((field, direction)) = spec.split_once(':') {
                hits.sort_by(|a, b| {
                    let ordering = Self::compare(a, b, field);
                    if direction == "desc" {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                });
            }
        }

        if let Some(window) = window {
            let start = window.offset.min(hits.len());
            let end = (window.offset + window.size).min(hits.len());
            hits = hits[start..end].to_vec();
        }

        Ok(hits)
    }

    fn count(&self, filters: &FilterMap) -> Result<u64, CommandError> {
        let records = self
            .records
            .lock()
            .map_err(|e| CommandError::QueryFailed(format!("lock poisoned: {e}")))?;
        Ok(records.iter().filter(|r| Self::matches(r, filters)).count() as u64)
    }

    fn save(&self, record: &CommandRecord) -> Result<(), CommandError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| CommandError::WriteFailed(format!("lock poisoned: {e}")))?;
        records.push(record.clone());
        Ok(())
    }

    fn bulk_save(
        &self,
        records: &[CommandRecord],
        _raise_on_error: bool,
    ) -> Result<BulkOutcome, CommandError> {
        for record in records {
            self.save(record)?;
        }
        Ok(BulkOutcome {
            succeeded: records.len(),
            errors: vec![],
        })
    }

    fn ping(&self) -> bool {
        true
    }
}
