//! Observable value cell and the listener registry shared with the selection store.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// Registered change callbacks, invoked synchronously in registration order.
pub struct Listeners<T: ?Sized> {
    next_id: u64,
    entries: Vec<(ListenerId, Callback<T>)>,
}

impl<T: ?Sized> Listeners<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, listener: impl FnMut(&T) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` when the id was not registered (already removed).
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn notify(&mut self, value: &T) {
        for (_, listener) in self.entries.iter_mut() {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners").field("count", &self.entries.len()).finish()
    }
}

/// Single mutable value with change notification.
///
/// Holds the file picker's chosen name. Listeners see every write, including the
/// reset to `None` on reopen; the columns domain is told through the picker's
/// confirm callback instead.
#[derive(Debug, Default)]
pub struct Observable<T> {
    value: T,
    listeners: Listeners<T>,
}

impl<T> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            listeners: Listeners::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Stores the value and notifies every listener, even if it is unchanged.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.listeners.notify(&self.value);
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&T) + Send + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl<T: PartialEq> Observable<T> {
    /// Stores and notifies only when the value differs.
    pub fn set_neq(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.set(value);
        true
    }
}
