//! Status bookkeeping.
//!
//! Each source object accumulates at most one [`Status`] per build. An
//! invalid object never aborts the build — it's dropped from the DAG and
//! its reason recorded so the debug surface and, eventually, the upstream
//! status subresource can report it.

use std::collections::HashMap;

use crate::dag::types::Status;
use crate::domain::ObjectKey;

#[derive(Default)]
pub struct StatusBook {
    entries: HashMap<ObjectKey, Status>,
}

impl StatusBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: ObjectKey, status: Status) {
        self.entries.insert(key, status);
    }

    pub fn valid(&mut self, key: ObjectKey) {
        self.set(key, Status::Valid);
    }

    pub fn invalid(&mut self, key: ObjectKey, reason: impl Into<String>) {
        self.set(key, Status::Invalid(reason.into()));
    }

    /// Any observed object not already carrying a status is orphaned: it
    /// was never reachable from a root virtual host.
    pub fn mark_remaining_orphaned(&mut self, observed: impl IntoIterator<Item = ObjectKey>) {
        for key in observed {
            self.entries.entry(key).or_insert(Status::Orphaned);
        }
    }

    pub fn into_vec(self) -> Vec<(ObjectKey, Status)> {
        self.entries.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_objects_become_orphaned() {
        let mut book = StatusBook::new();
        book.valid(ObjectKey::new("default", "a"));
        book.mark_remaining_orphaned(vec![ObjectKey::new("default", "a"), ObjectKey::new("default", "b")]);
        let entries: HashMap<_, _> = book.into_vec().into_iter().collect();
        assert_eq!(entries[&ObjectKey::new("default", "a")], Status::Valid);
        assert_eq!(entries[&ObjectKey::new("default", "b")], Status::Orphaned);
    }
}
