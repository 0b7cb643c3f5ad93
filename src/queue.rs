//! Multi-producer pending queue between `record` and the owning-thread drain.
//!
//! Interior mutability ([`Mutex`]) keeps [`push()`](PendingQueue::push)
//! callable from `&self` on any thread. The enqueue path never touches the
//! committed undo/redo lists; only the drain call, made from the stack's
//! owning thread, does.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;

use crate::record::UndoRecord;

/// One enqueued-but-not-yet-committed record.
pub(crate) struct PendingEntry<C> {
    pub record: Box<dyn UndoRecord<C>>,
    pub description: String,
    pub group_id: u64,
}

/// Thread-safe FIFO buffer for records awaiting commit.
pub(crate) struct PendingQueue<C> {
    entries: Mutex<VecDeque<PendingEntry<C>>>,
}

impl<C> PendingQueue<C> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Enqueues an entry. Never blocks beyond the queue mutex itself.
    pub fn push(&self, entry: PendingEntry<C>) {
        self.entries.lock().push_back(entry);
    }

    /// Removes and returns every entry present at the time of the call, in
    /// FIFO order. Entries enqueued concurrently with the drain land in the
    /// next one.
    pub fn drain(&self) -> VecDeque<PendingEntry<C>> {
        std::mem::take(&mut *self.entries.lock())
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl<C> fmt::Debug for PendingQueue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingQueue")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Add {
        amount: i32,
    }

    impl UndoRecord<i32> for Add {
        fn undo(&mut self, context: &mut i32) {
            *context -= self.amount;
        }

        fn redo(&mut self, context: &mut i32) {
            *context += self.amount;
        }
    }

    fn entry(amount: i32, group_id: u64) -> PendingEntry<i32> {
        PendingEntry {
            record: Box::new(Add { amount }),
            description: String::new(),
            group_id,
        }
    }

    #[test]
    fn drain_preserves_fifo_order() {
        let queue = PendingQueue::<i32>::new();
        queue.push(entry(1, 1));
        queue.push(entry(2, 2));
        queue.push(entry(3, 3));

        let drained = queue.drain();
        let groups: Vec<u64> = drained.iter().map(|e| e.group_id).collect();
        assert_eq!(groups, vec![1, 2, 3]);
    }

    #[test]
    fn drain_empties_queue() {
        let queue = PendingQueue::<i32>::new();
        queue.push(entry(1, 1));
        assert_eq!(queue.len(), 1);
        let _ = queue.drain();
        assert_eq!(queue.len(), 0);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn clear_drops_entries() {
        let queue = PendingQueue::<i32>::new();
        queue.push(entry(1, 1));
        queue.push(entry(2, 1));
        queue.clear();
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn push_from_many_threads() {
        let queue = std::sync::Arc::new(PendingQueue::<i32>::new());
        let mut joins = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            joins.push(std::thread::spawn(move || {
                for i in 0..100 {
                    queue.push(entry(i, i as u64));
                }
            }));
        }
        for join in joins {
            join.join().unwrap();
        }
        assert_eq!(queue.drain().len(), 400);
    }
}
