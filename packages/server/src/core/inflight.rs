//! In-flight Set (§4.C): a fixed-length array of `max_threads` slots, each
//! holding either the id a worker currently holds or nothing. Protects
//! `delete`/`clear`/`force_clear` from destroying a row a worker is mid-attempt
//! on (invariant 6).

use std::sync::Mutex;

pub struct InFlightSet {
    slots: Mutex<Vec<Option<String>>>,
}

impl InFlightSet {
    pub fn new(max_threads: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; max_threads]),
        }
    }

    /// Record `id` as held by worker `slot`. Called under the claim lock.
    pub fn set(&self, slot: usize, id: String) {
        let mut slots = self.slots.lock().expect("inflight mutex poisoned");
        slots[slot] = Some(id);
    }

    /// Release worker `slot`. Called under the (separate, uncontended)
    /// completion lock implicit in this mutex — no risk of re-dispatch since
    /// the worker has already consumed the row.
    pub fn clear(&self, slot: usize) {
        let mut slots = self.slots.lock().expect("inflight mutex poisoned");
        slots[slot] = None;
    }

    /// Advisory snapshot of currently-held ids. A row that leaves the set an
    /// instant after this snapshot is taken may still be (harmlessly)
    /// protected from an in-flight `clear`.
    pub fn list(&self) -> Vec<String> {
        let slots = self.slots.lock().expect("inflight mutex poisoned");
        slots.iter().filter_map(|s| s.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_only_reports_occupied_slots() {
        let set = InFlightSet::new(3);
        assert!(set.list().is_empty());

        set.set(0, "a".into());
        set.set(2, "c".into());
        let mut ids = set.list();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);

        set.clear(0);
        assert_eq!(set.list(), vec!["c".to_string()]);
    }
}
