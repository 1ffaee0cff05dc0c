//! Per-client stub queues.
//!
//! One queue per operation. A queue with more than one entry is consumed in
//! order; its last entry is never removed, so it keeps answering. An empty
//! or missing queue answers with a generated default.

use crate::error::Result;
use crate::generator::StubGenerator;
use crate::model::ServiceModel;
use crate::stub::StubEntry;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Stub queues of one client instance.
pub struct StubStore {
    model: Arc<ServiceModel>,
    queues: Mutex<HashMap<String, VecDeque<StubEntry>>>,
}

impl StubStore {
    pub fn new(model: Arc<ServiceModel>) -> Self {
        Self {
            model,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the queue for `operation`.
    pub fn configure(&self, operation: &str, entries: Vec<StubEntry>) {
        let mut queues = self.queues.lock();
        debug!(operation = %operation, entries = entries.len(), "Configured stubs");
        queues.insert(operation.to_string(), entries.into());
    }

    /// The entry to serve for the next invocation of `operation`.
    pub fn next(&self, operation: &str) -> Result<StubEntry> {
        let mut queues = self.queues.lock();

        if let Some(queue) = queues.get_mut(operation) {
            let entry = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            if let Some(entry) = entry {
                return Ok(entry);
            }
        }

        let data = StubGenerator::new(&self.model).stub_operation(operation, None)?;
        Ok(StubEntry::Data(data))
    }

    /// Number of entries queued for `operation`.
    pub fn queued(&self, operation: &str) -> usize {
        self.queues
            .lock()
            .get(operation)
            .map(VecDeque::len)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::storage_model;
    use serde_json::json;

    fn store() -> StubStore {
        StubStore::new(Arc::new(storage_model()))
    }

    fn data(entry: StubEntry) -> serde_json::Value {
        match entry {
            StubEntry::Data(v) => v,
            other => panic!("Expected data entry, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_queue_generates_default() {
        let store = store();
        for _ in 0..3 {
            let stub = data(store.next("HeadObject").unwrap());
            assert_eq!(stub["content_length"], 0);
        }
        assert_eq!(store.queued("HeadObject"), 0);
    }

    #[test]
    fn test_single_entry_repeats() {
        let store = store();
        store.configure("HeadObject", vec![StubEntry::Data(json!({"n": 1}))]);

        for _ in 0..5 {
            assert_eq!(data(store.next("HeadObject").unwrap()), json!({"n": 1}));
        }
        assert_eq!(store.queued("HeadObject"), 1);
    }

    #[test]
    fn test_multiple_entries_advance_then_repeat_last() {
        let store = store();
        store.configure(
            "HeadObject",
            (1..=3).map(|n| StubEntry::Data(json!({ "n": n }))).collect(),
        );

        let served: Vec<_> = (0..6)
            .map(|_| data(store.next("HeadObject").unwrap())["n"].as_i64().unwrap())
            .collect();
        assert_eq!(served, vec![1, 2, 3, 3, 3, 3]);
    }

    #[test]
    fn test_configure_replaces_queue() {
        let store = store();
        store.configure(
            "HeadObject",
            vec![StubEntry::Data(json!(1)), StubEntry::Data(json!(2))],
        );
        store.configure("HeadObject", vec![StubEntry::Data(json!(9))]);

        assert_eq!(data(store.next("HeadObject").unwrap()), json!(9));
        assert_eq!(store.queued("HeadObject"), 1);
    }

    #[test]
    fn test_empty_configure_falls_back_to_default() {
        let store = store();
        store.configure("HeadObject", Vec::new());
        let stub = data(store.next("HeadObject").unwrap());
        assert_eq!(stub["ETag"], "ETag");
    }

    #[test]
    fn test_queues_are_per_operation() {
        let store = store();
        store.configure("ListBuckets", vec![StubEntry::Data(json!({"Buckets": []}))]);
        assert!(data(store.next("HeadObject").unwrap()).get("content_length").is_some());
    }

    #[test]
    fn test_unknown_operation() {
        assert!(store().next("Nope").is_err());
    }

    #[test]
    fn test_concurrent_next_serves_each_entry_once() {
        let store = Arc::new(store());
        store.configure(
            "HeadObject",
            (0..101).map(|n| StubEntry::Data(json!(n))).collect(),
        );

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| data(store.next("HeadObject").unwrap()).as_i64().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut served: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        served.sort_unstable();
        assert_eq!(served, (0..100).collect::<Vec<_>>());
        assert_eq!(data(store.next("HeadObject").unwrap()), json!(100));
    }
}
