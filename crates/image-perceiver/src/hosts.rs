use dashmap::DashMap;
use lazyscope_core_types::{HostId, RecordKey};

/// Record key to overlay host lookup, so a renderer can find the element it
/// decorated for a record without walking the document.
#[derive(Debug, Default)]
pub struct HostIndex {
    entries: DashMap<RecordKey, HostId>,
}

impl HostIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, key: RecordKey, host: HostId) -> Option<HostId> {
        self.entries.insert(key, host)
    }

    pub fn host_for(&self, key: RecordKey) -> Option<HostId> {
        self.entries.get(&key).map(|entry| entry.value().clone())
    }

    pub fn unbind(&self, key: RecordKey) -> Option<HostId> {
        self.entries.remove(&key).map(|(_, host)| host)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
