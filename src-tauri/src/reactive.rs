use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifies a subscription so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Cell<T> {
    value: Mutex<T>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber<T>)>>,
    next_id: AtomicU64,
}

/// A shared observable value.
///
/// Clones are handles to the same cell. Subscribers run on the thread that
/// performed the write, after the value lock has been released, and only
/// when the new value differs from the old one.
pub struct Observable<T> {
    cell: Arc<Cell<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Default + Clone + PartialEq + Send + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + Send + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        Self {
            cell: Arc::new(Cell {
                value: Mutex::new(initial),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.cell.value.lock().clone()
    }

    /// Replace the value. Returns whether it changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.cell.value.lock();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.notify(&value);
        true
    }

    pub fn subscribe<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.cell.next_id.fetch_add(1, Ordering::Relaxed));
        self.cell.subscribers.lock().push((id, Arc::new(f)));
        id
    }

    #[allow(dead_code)]
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.cell.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    fn notify(&self, value: &T) {
        // Snapshot so a subscriber may (un)subscribe without deadlocking.
        let subscribers: Vec<Subscriber<T>> = self
            .cell
            .subscribers
            .lock()
            .iter()
            .map(|(_, f)| Arc::clone(f))
            .collect();
        for f in subscribers {
            f(value);
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Observable")
            .field(&*self.cell.value.lock())
            .finish()
    }
}
