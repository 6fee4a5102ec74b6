//! The deferred query chain over a [`CommandStore`].
//!
//! A `CommandQuerySet` records chained operations without touching the
//! backend; a terminal operation (`fetch`, `iter`, `get`, `count`)
//! collapses the log into one translated request and executes it. Results
//! are never memoized: each terminal call is its own backend round trip.

use std::ops::RangeBounds;
use std::sync::{Arc, OnceLock};

use domain::command::entity::CommandRecord;
use domain::command::error::CommandError;
use domain::command::query::{merge_filters, resolve_sort, FilterMap, QueryOp, Window};
use ports::secondary::command_store::CommandStore;
use serde_json::Value;

/// Immutable deferred query chain. Every chaining call returns a new
/// value with the operation appended; the receiver is never mutated, so
/// a query set may be shared freely across threads.
#[derive(Clone)]
pub struct CommandQuerySet {
    store: Arc<dyn CommandStore>,
    ops: Vec<QueryOp>,
    window: Option<Window>,
    // Derived state, memoized per instance. Chained calls build fresh
    // instances with empty cells, so there is nothing to invalidate.
    merged: OnceLock<FilterMap>,
    sort: OnceLock<Option<String>>,
}

impl CommandQuerySet {
    pub fn new(store: Arc<dyn CommandStore>) -> Self {
        Self {
            store,
            ops: Vec::new(),
            window: None,
            merged: OnceLock::new(),
            sort: OnceLock::new(),
        }
    }

    fn derive(&self, ops: Vec<QueryOp>, window: Option<Window>) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ops,
            window,
            merged: OnceLock::new(),
            sort: OnceLock::new(),
        }
    }

    fn with_op(&self, op: QueryOp) -> Self {
        let mut ops = self.ops.clone();
        ops.push(op);
        self.derive(ops, self.window)
    }

    /// Append filter constraints. Calls accumulate; on merge, later calls
    /// override earlier ones per key, and a `"<field>__exact"` key is
    /// treated as `"<field>"`.
    pub fn filter<I, K, V>(&self, kwargs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let kwargs = kwargs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.with_op(QueryOp::Filter(kwargs))
    }

    /// Append an ordering request. Only the last `order_by` call (and
    /// within it the last field) determines the sort; `-field` sorts
    /// descending.
    pub fn order_by<I, S>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_op(QueryOp::OrderBy(
            fields.into_iter().map(Into::into).collect(),
        ))
    }

    /// Set the pagination window from a range: `slice(5..15)` requests
    /// offset 5, size 10; an open stop (`slice(5..)`) uses the default
    /// page size. The window may be set once per chain; a repeated slice
    /// leaves the backend-bound pagination unchanged.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Self {
        if self.window.is_some() {
            tracing::warn!("pagination window already set, ignoring repeated slice");
            return self.clone();
        }
        self.derive(self.ops.clone(), Some(Window::from_range(range)))
    }

    /// The pagination window, if one has been set.
    pub fn window(&self) -> Option<Window> {
        self.window
    }

    fn merged_filters(&self) -> &FilterMap {
        self.merged.get_or_init(|| merge_filters(&self.ops))
    }

    fn resolved_sort(&self) -> Option<&str> {
        self.sort.get_or_init(|| resolve_sort(&self.ops)).as_deref()
    }

    /// Terminal: collapse the chain into one search request and execute
    /// it, mapping hits back to records in backend order.
    pub fn fetch(&self) -> Result<Vec<CommandRecord>, CommandError> {
        self.store
            .filter(self.merged_filters(), self.window, self.resolved_sort())
    }

    /// Terminal: fetch and iterate the materialized records.
    pub fn iter(&self) -> Result<std::vec::IntoIter<CommandRecord>, CommandError> {
        Ok(self.fetch()?.into_iter())
    }

    /// Terminal: fetch and return the record at `index` within the
    /// materialized window, if any.
    pub fn get(&self, index: usize) -> Result<Option<CommandRecord>, CommandError> {
        Ok(self.fetch()?.into_iter().nth(index))
    }

    /// Terminal: count matches using only the merged filter map; any
    /// ordering or slicing on the chain is ignored.
    pub fn count(&self) -> Result<u64, CommandError> {
        self.store.count(self.merged_filters())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::command::entity::RiskLevel;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Filter {
            filters: FilterMap,
            window: Option<Window>,
            sort: Option<String>,
        },
        Count {
            filters: FilterMap,
        },
    }

    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<Call>>,
        results: Vec<CommandRecord>,
    }

    impl RecordingStore {
        fn with_results(results: Vec<CommandRecord>) -> Self {
            Self {
                calls: Mutex::new(vec![]),
                results,
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandStore for RecordingStore {
        fn filter(
            &self,
            filters: &FilterMap,
            window: Option<Window>,
            sort: Option<&str>,
        ) -> Result<Vec<CommandRecord>, CommandError> {
            self.calls.lock().unwrap().push(Call::Filter {
                filters: filters.clone(),
                window,
                sort: sort.map(str::to_string),
            });
            Ok(self.results.clone())
        }

        fn count(&self, filters: &FilterMap) -> Result<u64, CommandError> {
            self.calls.lock().unwrap().push(Call::Count {
                filters: filters.clone(),
            });
            Ok(self.results.len() as u64)
        }

        fn save(&self, _record: &CommandRecord) -> Result<(), CommandError> {
            Ok(())
        }

        fn bulk_save(
            &self,
            _records: &[CommandRecord],
            _raise_on_error: bool,
        ) -> Result<ports::secondary::command_store::BulkOutcome, CommandError> {
            Ok(ports::secondary::command_store::BulkOutcome::default())
        }

        fn ping(&self) -> bool {
            true
        }
    }

    fn record(user: &str, timestamp: i64) -> CommandRecord {
        CommandRecord {
            user: user.to_string(),
            asset: "web-01".to_string(),
            system_user: "root".to_string(),
            input: "uptime".to_string(),
            output: String::new(),
            risk_level: RiskLevel::Ordinary,
            session: "s-1".to_string(),
            timestamp,
            org_id: String::new(),
        }
    }

    fn queryset(store: &Arc<RecordingStore>) -> CommandQuerySet {
        CommandQuerySet::new(Arc::clone(store) as Arc<dyn CommandStore>)
    }

    #[test]
    fn chaining_never_touches_the_store() {
        let store = Arc::new(RecordingStore::default());
        let _chain = queryset(&store)
            .filter([("user", json!("alice"))])
            .order_by(["-timestamp"])
            .slice(0..20);
        assert!(store.calls().is_empty());
    }

    #[test]
    fn chaining_leaves_the_parent_untouched() {
        let store = Arc::new(RecordingStore::default());
        let parent = queryset(&store);
        let _child = parent.filter([("user", json!("alice"))]).slice(5..15);

        parent.fetch().unwrap();
        assert_eq!(
            store.calls(),
            vec![Call::Filter {
                filters: FilterMap::new(),
                window: None,
                sort: None,
            }]
        );
        assert_eq!(parent.window(), None);
    }

    #[test]
    fn full_chain_collapses_into_one_request() {
        let store = Arc::new(RecordingStore::default());
        queryset(&store)
            .filter([("user", json!("alice"))])
            .filter([("risk_level", json!(5))])
            .order_by(["-timestamp"])
            .slice(0..20)
            .fetch()
            .unwrap();

        let mut expected = FilterMap::new();
        expected.insert("user".to_string(), json!("alice"));
        expected.insert("risk_level".to_string(), json!(5));
        assert_eq!(
            store.calls(),
            vec![Call::Filter {
                filters: expected,
                window: Some(Window { offset: 0, size: 20 }),
                sort: Some("timestamp:desc".to_string()),
            }]
        );
    }

    #[test]
    fn later_filter_overrides_earlier_key() {
        let store = Arc::new(RecordingStore::default());
        queryset(&store)
            .filter([("user", json!("a"))])
            .filter([("user", json!("b"))])
            .fetch()
            .unwrap();

        match &store.calls()[0] {
            Call::Filter { filters, .. } => {
                assert_eq!(filters.get("user"), Some(&json!("b")));
                assert_eq!(filters.len(), 1);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn exact_suffix_is_stripped_before_dispatch() {
        let store = Arc::new(RecordingStore::default());
        queryset(&store)
            .filter([("user__exact", json!("alice"))])
            .fetch()
            .unwrap();

        match &store.calls()[0] {
            Call::Filter { filters, .. } => {
                assert_eq!(filters.get("user"), Some(&json!("alice")));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn open_slice_uses_default_page_size() {
        let store = Arc::new(RecordingStore::default());
        let chain = queryset(&store).slice(5..);
        assert_eq!(chain.window(), Some(Window { offset: 5, size: 10 }));
    }

    #[test]
    fn repeated_slice_keeps_first_window() {
        let store = Arc::new(RecordingStore::default());
        let chain = queryset(&store).slice(5..15).slice(50..100);
        assert_eq!(chain.window(), Some(Window { offset: 5, size: 10 }));

        chain.fetch().unwrap();
        match &store.calls()[0] {
            Call::Filter { window, .. } => {
                assert_eq!(*window, Some(Window { offset: 5, size: 10 }));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn count_uses_only_the_filter_map() {
        let store = Arc::new(RecordingStore::default());
        queryset(&store)
            .filter([("asset", json!("web-01"))])
            .order_by(["-timestamp"])
            .slice(0..5)
            .count()
            .unwrap();

        let mut expected = FilterMap::new();
        expected.insert("asset".to_string(), json!("web-01"));
        assert_eq!(store.calls(), vec![Call::Count { filters: expected }]);
    }

    #[test]
    fn each_terminal_call_reexecutes() {
        let store = Arc::new(RecordingStore::default());
        let chain = queryset(&store).filter([("user", json!("alice"))]);
        chain.fetch().unwrap();
        chain.fetch().unwrap();
        chain.count().unwrap();
        assert_eq!(store.calls().len(), 3);
    }

    #[test]
    fn get_indexes_into_the_materialized_window() {
        let store = Arc::new(RecordingStore::with_results(vec![
            record("alice", 100),
            record("bob", 200),
        ]));
        let chain = queryset(&store);
        assert_eq!(chain.get(1).unwrap().unwrap().user, "bob");
        assert_eq!(chain.get(2).unwrap(), None);
    }

    #[test]
    fn iter_yields_backend_order() {
        let store = Arc::new(RecordingStore::with_results(vec![
            record("alice", 100),
            record("bob", 200),
        ]));
        let users: Vec<String> = queryset(&store).iter().unwrap().map(|r| r.user).collect();
        assert_eq!(users, vec!["alice", "bob"]);
    }
}
