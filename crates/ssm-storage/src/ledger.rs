use std::collections::HashSet;

/// Record of opportunity identifiers already published in this process.
///
/// Callers own the ledger exclusively; implementations need no interior locking.
/// A durable implementation can stand in for [`InMemoryLedger`] without the
/// monitor noticing.
pub trait SeenLedger: Send {
    fn has_seen(&self, id: &str) -> bool;
    fn mark_seen(&mut self, id: &str);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime seen set. Starts empty on every launch and never evicts.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedger {
    ids: HashSet<String>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeenLedger for InMemoryLedger {
    fn has_seen(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn mark_seen(&mut self, id: &str) {
        if !self.ids.contains(id) {
            self.ids.insert(id.to_string());
        }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}
