use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::thread::ThreadRecord;

/// Where the relay remembers which remote thread ids it has handed out.
///
/// The registry is append-only for the life of the process and stores no
/// transcript. It exists behind a trait so a shared cache can replace
/// the in-memory map without touching the relay.
pub trait ThreadStore: Send + Sync {
    /// Register a thread, replacing any record with the same id.
    fn insert(&self, record: ThreadRecord);

    /// Look up a registered thread.
    fn get(&self, id: &str) -> Option<ThreadRecord>;

    fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `ThreadStore` over a mutex-guarded map, the default for a single
/// process.
#[derive(Debug, Default)]
pub struct InMemoryThreadStore {
    threads: Mutex<HashMap<String, ThreadRecord>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThreadStore for InMemoryThreadStore {
    fn insert(&self, record: ThreadRecord) {
        self.threads
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    fn get(&self, id: &str) -> Option<ThreadRecord> {
        self.threads.lock().unwrap().get(id).cloned()
    }

    fn len(&self) -> usize {
        self.threads.lock().unwrap().len()
    }
}
