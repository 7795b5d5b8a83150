//! Typed listener registry.

use std::fmt;

/// Handle returned by [`Listeners::add`], used to unregister the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry<K, E> {
    id: ListenerId,
    kind: K,
    callback: Box<dyn FnMut(&E)>,
}

/// Listeners of events of type `E`, grouped by kind `K`.
///
/// Listeners of one kind run synchronously in registration order.
pub struct Listeners<K, E> {
    entries: Vec<Entry<K, E>>,
    next_id: u64,
}

impl<K: Copy + PartialEq, E> Listeners<K, E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    pub fn add(&mut self, kind: K, callback: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            kind,
            callback: Box::new(callback),
        });
        id
    }

    /// Unregisters a listener. Returns `false` if it was already gone.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let len = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != len
    }

    pub fn emit(&mut self, kind: K, event: &E) {
        for entry in &mut self.entries {
            if entry.kind == kind {
                (entry.callback)(event);
            }
        }
    }

    pub fn has_listeners(&self, kind: K) -> bool {
        self.entries.iter().any(|entry| entry.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Copy + PartialEq, E> Default for Listeners<K, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, E> fmt::Debug for Listeners<K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| (entry.id, &entry.kind)))
            .finish()
    }
}
