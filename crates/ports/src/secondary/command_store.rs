use domain::command::entity::CommandRecord;
use domain::command::error::CommandError;
use domain::command::query::{FilterMap, Window};

/// Per-batch outcome of a bulk write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Number of commands accepted by the backend.
    pub succeeded: usize,
    /// Backend-reported reasons for each rejected command.
    pub errors: Vec<String>,
}

impl BulkOutcome {
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Pluggable command event store for persisting and querying recorded
/// session commands.
///
/// This is the minimal surface the query engine consumes; implementations
/// must not expose the full backend client. Read/write errors propagate
/// unmodified (fail loud, no retry); `ping` is the single exception and
/// never errors.
pub trait CommandStore: Send + Sync {
    /// Execute a translated, paginated, sorted search and deserialize the
    /// hits, preserving backend-returned order.
    ///
    /// `sort` is the rendered `"<field>:<asc|desc>"` spec; `None` leaves
    /// backend default ordering.
    fn filter(
        &self,
        filters: &FilterMap,
        window: Option<Window>,
        sort: Option<&str>,
    ) -> Result<Vec<CommandRecord>, CommandError>;

    /// Count matches for a filter-only query (sort and pagination never
    /// apply to counts).
    fn count(&self, filters: &FilterMap) -> Result<u64, CommandError>;

    /// Persist a single command, deriving its stored `date` field from
    /// the record timestamp.
    fn save(&self, record: &CommandRecord) -> Result<(), CommandError>;

    /// Persist a batch. With `raise_on_error` any per-item failure fails
    /// the whole batch; otherwise partial success is reported in the
    /// outcome without raising.
    fn bulk_save(
        &self,
        records: &[CommandRecord],
        raise_on_error: bool,
    ) -> Result<BulkOutcome, CommandError>;

    /// Liveness probe. Implementations convert every transport or
    /// backend error into `false`.
    fn ping(&self) -> bool;

    /// Fetch everything, unfiltered and unpaginated. Refused by default:
    /// unbounded scans would hand the backend an arbitrarily large
    /// result set.
    fn all(&self) -> Result<Vec<CommandRecord>, CommandError> {
        Err(CommandError::UnboundedScan)
    }
}
