//! Persistent multi-select state keyed by row name.
//!
//! The store is independent of paging, search and sort: hiding a row never
//! deselects it. Only [`SelectionStore::reconcile`] against a replacement row
//! set removes names.

use crate::observable::{ListenerId, Listeners};
use crate::row::RowSet;
use indexmap::IndexSet;

#[derive(Debug, Default)]
pub struct SelectionStore {
    selected: IndexSet<String>,
    listeners: Listeners<IndexSet<String>>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of `name`. Returns the new state.
    pub fn toggle(&mut self, name: &str) -> bool {
        let now_selected = if self.selected.shift_remove(name) {
            false
        } else {
            self.selected.insert(name.to_string());
            true
        };
        self.notify();
        now_selected
    }

    /// Selects or deselects exactly the given names; everything else is untouched.
    pub fn set_many<'a>(&mut self, names: impl IntoIterator<Item = &'a str>, selected: bool) -> usize {
        let mut changed = 0;
        for name in names {
            let did_change = if selected {
                self.selected.insert(name.to_string())
            } else {
                self.selected.shift_remove(name)
            };
            if did_change {
                changed += 1;
            }
        }
        if changed > 0 {
            self.notify();
        }
        changed
    }

    pub fn has(&self, name: &str) -> bool {
        self.selected.contains(name)
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected names in the order they were first selected.
    pub fn snapshot(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    pub fn selected(&self) -> &IndexSet<String> {
        &self.selected
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&IndexSet<String>) + Send + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Drops names that no longer exist in `rows`. Returns how many were removed.
    pub fn reconcile(&mut self, rows: &RowSet) -> usize {
        let before = self.selected.len();
        self.selected.retain(|name| rows.contains(name));
        let removed = before - self.selected.len();
        if removed > 0 {
            self.notify();
        }
        removed
    }

    pub fn clear(&mut self) {
        if self.selected.is_empty() {
            return;
        }
        self.selected.clear();
        self.notify();
    }

    fn notify(&mut self) {
        self.listeners.notify(&self.selected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;
    use crate::view::{ViewParams, compute_view};
    use std::sync::{Arc, Mutex};

    fn rows(names: &[&str]) -> RowSet {
        RowSet::new(names.iter().map(|name| Row::column(*name, None)))
    }

    #[test]
    fn toggle_flips_membership() {
        let mut store = SelectionStore::new();
        assert!(store.toggle("a"));
        assert!(store.has("a"));
        assert!(!store.toggle("a"));
        assert!(!store.has("a"));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn selection_survives_changing_search() {
        let set = rows(&["alpha", "beta", "gamma"]);
        let mut store = SelectionStore::new();
        store.toggle("alpha");

        let hidden = compute_view(&set, &ViewParams::search("beta"));
        let visible: Vec<&str> = hidden.names(&set).collect();
        store.set_many(visible, true);

        let cleared = compute_view(&set, &ViewParams::default());
        assert_eq!(cleared.len(), 3);
        assert!(store.has("alpha"));
        assert!(store.has("beta"));
        assert!(!store.has("gamma"));
    }

    #[test]
    fn set_many_only_touches_given_names() {
        let mut store = SelectionStore::new();
        store.set_many(["a", "b", "c"], true);
        let changed = store.set_many(["b", "z"], false);

        assert_eq!(changed, 1);
        assert_eq!(store.snapshot(), ["a", "c"]);
    }

    #[test]
    fn reconcile_prunes_names_missing_from_new_rows() {
        let mut store = SelectionStore::new();
        store.set_many(["keep", "gone"], true);

        let removed = store.reconcile(&rows(&["keep", "new"]));

        assert_eq!(removed, 1);
        assert_eq!(store.snapshot(), ["keep"]);
    }

    #[test]
    fn listeners_fire_only_on_change() {
        let counts = Arc::new(Mutex::new(Vec::new()));
        let mut store = SelectionStore::new();
        let id = store.subscribe({
            let counts = counts.clone();
            move |selected| counts.lock().unwrap().push(selected.len())
        });

        store.toggle("a");
        store.set_many(["a"], true);
        store.reconcile(&rows(&["a"]));
        store.set_many(["b", "c"], true);
        store.clear();
        store.clear();
        store.unsubscribe(id);
        store.toggle("x");

        assert_eq!(*counts.lock().unwrap(), vec![1, 3, 0]);
    }

    #[test]
    fn snapshot_keeps_selection_order() {
        let mut store = SelectionStore::new();
        store.toggle("z");
        store.toggle("a");
        store.toggle("m");
        assert_eq!(store.snapshot(), ["z", "a", "m"]);
    }
}
