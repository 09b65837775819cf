//! Bounded FIFO of recent requests.
//!
//! A fixed-capacity ring: an append that would exceed capacity drops the
//! oldest record first, so memory stays bounded and reset is O(capacity).
//! Records are appended in handler-completion order, which is what the
//! replay endpoint needs.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One captured request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    /// Request ID, either client-supplied or counter-assigned.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    /// Raw query string, undecoded.
    pub query: String,
    pub remote_addr: String,
    pub headers: HashMap<String, Vec<String>>,
    /// Bounded body snippet (full body only when body logging is on).
    pub body_snippet: String,
    /// Final response status.
    pub status_code: u16,
}

/// Mutex-guarded bounded request history.
pub struct HistoryBuffer {
    records: Mutex<VecDeque<RequestRecord>>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a record, evicting the oldest when full.
    pub fn record(&self, record: RequestRecord) {
        let mut records = self.records.lock().expect("history mutex poisoned");
        while records.len() >= self.capacity && !records.is_empty() {
            records.pop_front();
        }
        if self.capacity > 0 {
            records.push_back(record);
        }
    }

    /// Copy of the buffer, oldest first.
    pub fn snapshot(&self) -> Vec<RequestRecord> {
        self.records
            .lock()
            .expect("history mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Find a record by request ID.
    pub fn find(&self, id: &str) -> Option<RequestRecord> {
        self.records
            .lock()
            .expect("history mutex poisoned")
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn clear(&self) {
        self.records.lock().expect("history mutex poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("history mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
