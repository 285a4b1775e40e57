//! In-memory registry of every button the session has observed

use parking_lot::Mutex;
use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;

use presslink_core::prelude::*;
use presslink_core::{Button, ConnectionState};

#[derive(Debug, Clone)]
struct Entry {
    button: Button,
    /// Monotonic observation counter, used for most-recent-wins lookups
    seen: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    observations: u64,
}

/// Registry of observed buttons, keyed by driver uuid
///
/// One coarse lock guards the map. Every read hands out a snapshot clone,
/// never a live view, and the lock is never held across an await point.
/// Absence is `None`, not an error; the session layer decides what missing
/// means for each operation.
#[derive(Debug, Default)]
pub struct ButtonRegistry {
    inner: Mutex<Inner>,
}

impl ButtonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation: insert a new button, or fold the update into
    /// the existing record (uuid is identity and never changes)
    pub fn upsert(&self, button: Button) {
        let mut inner = self.inner.lock();
        inner.observations += 1;
        let seen = inner.observations;
        match inner.entries.entry(button.uuid.clone()) {
            MapEntry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.button.merge_from(button);
                entry.seen = seen;
            }
            MapEntry::Vacant(vacant) => {
                trace!("registering button {}", button.uuid);
                vacant.insert(Entry { button, seen });
            }
        }
    }

    pub fn get(&self, uuid: &str) -> Option<Button> {
        self.inner
            .lock()
            .entries
            .get(uuid)
            .map(|entry| entry.button.clone())
    }

    /// Most recently observed button carrying this transport address
    ///
    /// Addresses are not unique over time: re-pairing can hand the same
    /// address to a different uuid, so the freshest observation wins.
    pub fn get_by_address(&self, bd_addr: &str) -> Option<Button> {
        let inner = self.inner.lock();
        inner
            .entries
            .values()
            .filter(|entry| entry.button.bd_addr == bd_addr)
            .max_by_key(|entry| entry.seen)
            .map(|entry| entry.button.clone())
    }

    /// Forget a button; returns the removed record, `None` if absent
    pub fn remove(&self, uuid: &str) -> Option<Button> {
        self.inner
            .lock()
            .entries
            .remove(uuid)
            .map(|entry| entry.button)
    }

    /// Snapshot of every known button, oldest observation first
    pub fn list(&self) -> Vec<Button> {
        let inner = self.inner.lock();
        let mut entries: Vec<&Entry> = inner.entries.values().collect();
        entries.sort_by_key(|entry| entry.seen);
        entries.into_iter().map(|entry| entry.button.clone()).collect()
    }

    /// Overwrite the connection state; `false` when the uuid is unknown
    pub fn set_connection_state(&self, uuid: &str, state: ConnectionState) -> bool {
        match self.inner.lock().entries.get_mut(uuid) {
            Some(entry) => {
                entry.button.connection_state = state;
                true
            }
            None => false,
        }
    }

    /// Move a Disconnected button to Connecting, leaving other states alone
    ///
    /// Connect requests against a button that is already connecting or
    /// connected must not regress its state.
    pub fn mark_connecting(&self, uuid: &str) -> bool {
        match self.inner.lock().entries.get_mut(uuid) {
            Some(entry) if entry.button.connection_state == ConnectionState::Disconnected => {
                entry.button.connection_state = ConnectionState::Connecting;
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.inner.lock().entries.contains_key(uuid)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample_button(uuid: &str, bd_addr: &str) -> Button {
        Button {
            name: Some(format!("button {uuid}")),
            press_count: 1,
            ..Button::new(uuid, bd_addr)
        }
    }

    #[test]
    fn test_upsert_twice_keeps_one_entry() {
        let registry = ButtonRegistry::new();
        registry.upsert(sample_button("uuid-1", "80:e4:da:70:00:01"));
        registry.upsert(Button {
            press_count: 7,
            ..Button::new("uuid-1", "80:e4:da:70:00:01")
        });

        assert_eq!(registry.len(), 1);
        let button = registry.get("uuid-1").unwrap();
        assert_eq!(button.press_count, 7);
        // Bare update carried no name; the known one survives the merge
        assert_eq!(button.name.as_deref(), Some("button uuid-1"));
    }

    #[test]
    fn test_get_unknown_is_none() {
        let registry = ButtonRegistry::new();
        assert!(registry.get("missing").is_none());
        assert!(registry.get_by_address("80:e4:da:70:00:01").is_none());
    }

    #[test]
    fn test_get_by_address_prefers_most_recent_observation() {
        let registry = ButtonRegistry::new();
        // Same transport address observed under two identities, as happens
        // after an unpair/re-pair cycle
        registry.upsert(sample_button("uuid-old", "80:e4:da:70:00:09"));
        registry.upsert(sample_button("uuid-new", "80:e4:da:70:00:09"));

        let hit = registry.get_by_address("80:e4:da:70:00:09").unwrap();
        assert_eq!(hit.uuid, "uuid-new");

        // A fresh observation of the old identity makes it the answer again
        registry.upsert(sample_button("uuid-old", "80:e4:da:70:00:09"));
        let hit = registry.get_by_address("80:e4:da:70:00:09").unwrap();
        assert_eq!(hit.uuid, "uuid-old");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = ButtonRegistry::new();
        registry.upsert(sample_button("uuid-1", "80:e4:da:70:00:01"));

        assert!(registry.remove("uuid-1").is_some());
        assert!(registry.remove("uuid-1").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_is_a_snapshot_in_observation_order() {
        let registry = ButtonRegistry::new();
        registry.upsert(sample_button("uuid-a", "80:e4:da:70:00:01"));
        registry.upsert(sample_button("uuid-b", "80:e4:da:70:00:02"));

        let listed = registry.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].uuid, "uuid-a");
        assert_eq!(listed[1].uuid, "uuid-b");

        // Mutating the snapshot does not touch the registry
        let mut listed = listed;
        listed[0].press_count = 999;
        assert_eq!(registry.get("uuid-a").unwrap().press_count, 1);
    }

    #[test]
    fn test_set_connection_state_unknown_uuid() {
        let registry = ButtonRegistry::new();
        assert!(!registry.set_connection_state("missing", ConnectionState::Connected));
    }

    #[test]
    fn test_mark_connecting_only_from_disconnected() {
        let registry = ButtonRegistry::new();
        registry.upsert(sample_button("uuid-1", "80:e4:da:70:00:01"));

        assert!(registry.mark_connecting("uuid-1"));
        assert_eq!(
            registry.get("uuid-1").unwrap().connection_state,
            ConnectionState::Connecting
        );

        // Already connecting: no transition
        assert!(!registry.mark_connecting("uuid-1"));

        registry.set_connection_state("uuid-1", ConnectionState::Connected);
        assert!(!registry.mark_connecting("uuid-1"));
        assert_eq!(
            registry.get("uuid-1").unwrap().connection_state,
            ConnectionState::Connected
        );
    }

    #[test]
    fn test_concurrent_upserts_converge_to_one_entry() {
        let registry = Arc::new(ButtonRegistry::new());
        let mut handles = Vec::new();

        for thread in 0..4 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    registry.upsert(Button {
                        press_count: thread * 100 + i,
                        ..Button::new("uuid-shared", "80:e4:da:70:00:01")
                    });
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 1);
        assert!(registry.get("uuid-shared").is_some());
    }
}
