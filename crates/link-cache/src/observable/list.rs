use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::trace;

use super::{DEFAULT_OPERATION_CAPACITY, ListOperation};

/// Ordered list that emits an operation for every membership change.
pub struct ObservableList<T> {
    items: Mutex<Vec<T>>,
    operations: broadcast::Sender<ListOperation<T>>,
}

impl<T> ObservableList<T>
where
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_OPERATION_CAPACITY)
    }

    /// `capacity` is the number of operations buffered per lagging subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        let (operations, _) = broadcast::channel(capacity.max(1));
        Self {
            items: Mutex::new(Vec::new()),
            operations,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListOperation<T>> {
        self.operations.subscribe()
    }

    fn emit(&self, operation: ListOperation<T>) {
        // No subscribers is not an error.
        let _ = self.operations.send(operation);
    }

    pub fn add(&self, item: T) {
        let mut items = self.items.lock();
        items.push(item.clone());
        self.emit(ListOperation::Add(item));
        trace!(len = items.len(), "list item added");
    }

    /// Removes every item matching `predicate` and returns them.
    pub fn remove_if<F>(&self, mut predicate: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut items = self.items.lock();
        let mut removed = Vec::new();
        let mut index = 0;
        while index < items.len() {
            if predicate(&items[index]) {
                removed.push(items.remove(index));
            } else {
                index += 1;
            }
        }
        for item in &removed {
            self.emit(ListOperation::Remove(item.clone()));
        }
        removed
    }

    /// Replaces the item at `index` in place, returning the previous one.
    pub fn replace_at(&self, index: usize, item: T) -> Option<T> {
        let mut items = self.items.lock();
        items
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, item))
    }

    /// Moves the item at `from` so it ends up at `to`.
    pub fn move_item(&self, from: usize, to: usize) -> bool {
        let mut items = self.items.lock();
        if from >= items.len() || to >= items.len() {
            return false;
        }
        let item = items.remove(from);
        items.insert(to, item);
        true
    }

    /// Empties the list, emitting a `Remove` for every item.
    pub fn clear(&self) {
        let mut items = self.items.lock();
        for item in items.drain(..) {
            self.emit(ListOperation::Remove(item));
        }
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T> Default for ObservableList<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
