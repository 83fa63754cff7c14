//! Handle-based multi-subscriber callback lists.
//!
//! Each subscription gets an opaque, process-unique [`Handle`]. Invocation
//! fires the subscribers present at the start of the call, in insertion
//! order; subscriptions made during an invocation are deferred to the next
//! one, and unsubscriptions take effect immediately (including a callback
//! unsubscribing itself).

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Opaque subscription token, unique across every list in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    pub(crate) fn next() -> Self {
        Handle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

type Callback<A> = Box<dyn FnMut(A) + Send>;

struct Entry<A> {
    handle: Handle,
    /// Taken out while the callback runs so the lock can be released.
    cb: Option<Callback<A>>,
}

/// An ordered set of `(Handle, callback)` pairs.
pub struct CallbackList<A> {
    entries: Mutex<Vec<Entry<A>>>,
}

impl<A: Clone> CallbackList<A> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Add a subscriber and return its handle.
    pub fn subscribe(&self, f: impl FnMut(A) + Send + 'static) -> Handle {
        let handle = Handle::next();
        let mut entries = self.entries.lock().unwrap();
        entries.push(Entry {
            handle,
            cb: Some(Box::new(f)),
        });
        handle
    }

    /// Remove a subscriber. Returns false if the handle was not found
    /// (already removed, or belonging to another list).
    pub fn unsubscribe(&self, handle: Handle) -> bool {
        let mut entries = self.entries.lock().unwrap();
        match entries.iter().position(|e| e.handle == handle) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// True if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Fire all current subscribers in insertion order.
    pub fn invoke(&self, arg: A) {
        let snapshot: Vec<Handle> = {
            let entries = self.entries.lock().unwrap();
            entries.iter().map(|e| e.handle).collect()
        };

        for handle in snapshot {
            // Take the callback out so it runs without the lock held;
            // re-entrant subscribe/unsubscribe from inside it is then safe.
            let mut cb = {
                let mut entries = self.entries.lock().unwrap();
                match entries.iter_mut().find(|e| e.handle == handle) {
                    Some(entry) => match entry.cb.take() {
                        Some(cb) => cb,
                        None => continue,
                    },
                    None => continue, // unsubscribed by an earlier callback
                }
            };

            cb(arg.clone());

            let mut entries = self.entries.lock().unwrap();
            if let Some(entry) = entries.iter_mut().find(|e| e.handle == handle) {
                entry.cb = Some(cb);
            }
            // else: unsubscribed while running; the callback is dropped here
        }
    }
}

impl<A: Clone> Default for CallbackList<A> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
