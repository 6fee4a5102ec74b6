use std::sync::Arc;

use domain::command::entity::CommandRecord;
use domain::command::error::CommandError;
use ports::secondary::command_store::{BulkOutcome, CommandStore};

use crate::queryset::CommandQuerySet;

/// Application-layer facade over a pluggable [`CommandStore`].
///
/// Hands out deferred query chains for the audit API and records command
/// events as sessions produce them. Read/write errors propagate to the
/// caller; only the liveness probe swallows failures.
pub struct CommandAuditService {
    store: Arc<dyn CommandStore>,
}

impl CommandAuditService {
    pub fn new(store: Arc<dyn CommandStore>) -> Self {
        Self { store }
    }

    /// A fresh, empty query chain bound to this service's store.
    pub fn queryset(&self) -> CommandQuerySet {
        CommandQuerySet::new(Arc::clone(&self.store))
    }

    /// Persist a single command event.
    pub fn record(&self, record: &CommandRecord) -> Result<(), CommandError> {
        self.store.save(record)
    }

    /// Persist a batch of command events. With `raise_on_error`, any
    /// per-item failure fails the whole batch.
    pub fn record_batch(
        &self,
        records: &[CommandRecord],
        raise_on_error: bool,
    ) -> Result<BulkOutcome, CommandError> {
        let outcome = self.store.bulk_save(records, raise_on_error)?;
        if !outcome.is_complete() {
            tracing::warn!(
                failed = outcome.failed(),
                total = records.len(),
                "bulk save reported partial failure"
            );
        }
        Ok(outcome)
    }

    /// Backend liveness. Never errors; transport failures are `false`.
    pub fn is_alive(&self) -> bool {
        self.store.ping()
    }
}
