//! Reversible operation records and their commit metadata.
//!
//! An [`UndoRecord`] is an opaque command (Command pattern): it captures at
//! creation time whatever data it needs to reverse and replay one edit, and
//! mutates nothing but the context it is applied to. The engine never
//! interprets what a record does — it only moves records between lists.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates the next process-wide operation id.
pub(crate) fn next_operation_id() -> u64 {
    NEXT_OPERATION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Metadata stamped onto a record when it is committed into a stack.
///
/// `timestamp` is the commit instant (when the pending queue was drained),
/// not the enqueue instant. Cross-stack ordering is reconstructed from these
/// timestamps by [`ResolvePolicy::TimestampPriority`](crate::ResolvePolicy).
#[derive(Debug, Clone)]
pub struct OperationInfo {
    /// Process-wide monotonically increasing id.
    pub id: u64,
    /// Commit instant.
    pub timestamp: Instant,
    /// Human-readable description for edit menus and history panels.
    pub description: String,
    /// Id of the stack that owns the record.
    pub stack_id: String,
    /// Records sharing a group id undo and redo as one atomic unit.
    pub group_id: u64,
}

/// A reversible edit operation bound to one context type.
///
/// `redo` and `undo` must be exact inverses: `redo(ctx); undo(ctx)` leaves
/// `ctx` observably identical to before the `redo` call, and vice versa.
/// Both are only invoked while the record resides in the corresponding list,
/// so implementations may assume strict alternation.
///
/// Records must execute synchronously and must not block.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug)]
/// struct MoveVertex {
///     index: usize,
///     from: [f32; 3],
///     to: [f32; 3],
/// }
///
/// impl UndoRecord<MeshBuffer> for MoveVertex {
///     fn redo(&mut self, mesh: &mut MeshBuffer) {
///         mesh.set_position(self.index, self.to);
///     }
///
///     fn undo(&mut self, mesh: &mut MeshBuffer) {
///         mesh.set_position(self.index, self.from);
///     }
/// }
/// ```
pub trait UndoRecord<C>: fmt::Debug + Send {
    /// Reverses the edit (undo direction).
    fn undo(&mut self, context: &mut C);

    /// Applies the edit forward (redo direction).
    fn redo(&mut self, context: &mut C);
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

    #[test]
    fn record_is_dyn_compatible() {
        let mut value = 0;
        let mut boxed: Box<dyn UndoRecord<i32>> = Box::new(Add { amount: 3 });
        boxed.redo(&mut value);
        assert_eq!(value, 3);
        boxed.undo(&mut value);
        assert_eq!(value, 0);
    }

    #[test]
    fn redo_then_undo_round_trips() {
        let mut value = 10;
        let mut record = Add { amount: 7 };
        record.redo(&mut value);
        record.undo(&mut value);
        assert_eq!(value, 10);
    }

    #[test]
    fn operation_ids_are_monotonic() {
        let a = next_operation_id();
        let b = next_operation_id();
        let c = next_operation_id();
        assert!(a < b && b < c);
    }
}
