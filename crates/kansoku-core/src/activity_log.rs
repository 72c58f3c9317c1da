use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::engine::ActivityEvent;

/// Maximum number of events retained.
const ACTIVITY_LOG_CAPACITY: usize = 200;

/// A timestamped activity entry.
pub type ActivityEntry = (DateTime<Utc>, ActivityEvent);

/// Bounded ring buffer of recently emitted activity.
#[derive(Debug)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(ACTIVITY_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Push an event, evicting the oldest if at capacity.
    pub fn push(&mut self, event: ActivityEvent) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((Utc::now(), event));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, newest last.
    pub fn snapshot(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }
}

/// Thread-safe handle to the activity log.
pub type SharedActivityLog = Arc<Mutex<ActivityLog>>;

pub fn shared_activity_log() -> SharedActivityLog {
    Arc::new(Mutex::new(ActivityLog::new()))
}
