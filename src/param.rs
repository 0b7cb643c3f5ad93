//! Drag-gesture parameter editing on top of a history stack.
//!
//! [`ParamEditor`] turns "snapshot at drag-start, compare at drag-end"
//! parameter editing into discrete undo records, so a whole slider drag
//! coalesces into one history entry. The wrapped stack's context is the
//! last committed parameter snapshot; undoing or redoing pushes the
//! restored snapshot back into the live UI through the `on_restore`
//! callback supplied at attach time.
//!
//! The helper is built for panels that close and reopen: `attach` adopts an
//! existing same-id stack (restoring its snapshot) instead of starting
//! fresh, and `detach` leaves the stack and its snapshot in the tree.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::HistoryError;
use crate::events::SubscriberId;
use crate::group::HistoryGroup;
use crate::record::{OperationInfo, UndoRecord};
use crate::stack::HistoryStack;

/// Before/after snapshot pair committed at gesture end.
struct ParamDiff<P> {
    before: P,
    after: P,
}

impl<P: Clone + Send + 'static> UndoRecord<P> for ParamDiff<P> {
    fn undo(&mut self, context: &mut P) {
        *context = self.before.clone();
    }

    fn redo(&mut self, context: &mut P) {
        *context = self.after.clone();
    }
}

impl<P> fmt::Debug for ParamDiff<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ParamDiff")
    }
}

/// Gesture-based editor for one parameter snapshot type.
pub struct ParamEditor<P: Clone + PartialEq + Send + 'static> {
    stack: Arc<HistoryStack<P>>,
    gesture_start: Mutex<Option<P>>,
    undo_sub: SubscriberId,
    redo_sub: SubscriberId,
}

impl<P: Clone + PartialEq + Send + 'static> ParamEditor<P> {
    /// Attaches to `group`, adopting an existing stack with the same id or
    /// creating a fresh one with `initial` as its snapshot.
    ///
    /// When an existing stack is adopted, its last-known snapshot is pushed
    /// through `on_restore` immediately so the reopened panel shows the
    /// state it had when it closed. `on_restore` also fires after every
    /// undo/redo on the stack, with the then-current snapshot.
    ///
    /// An existing node with the same id but a different context type is a
    /// wiring bug and reported as
    /// [`HistoryError::ContextTypeMismatch`].
    pub fn attach(
        group: &HistoryGroup,
        id: &str,
        name: &str,
        initial: P,
        on_restore: impl Fn(&P) + Send + Sync + 'static,
    ) -> Result<Self, HistoryError> {
        let on_restore: Arc<dyn Fn(&P) + Send + Sync> = Arc::new(on_restore);

        let stack = match group.find_by_id(id) {
            Some(node) => {
                let stack = node
                    .as_any_arc()
                    .downcast::<HistoryStack<P>>()
                    .map_err(|_| HistoryError::ContextTypeMismatch(id.to_string()))?;
                if let Some(snapshot) = stack.context_snapshot() {
                    on_restore(&snapshot);
                }
                stack
            }
            None => {
                let stack = HistoryStack::new(id, name, Some(initial));
                group.add_child(stack.clone())?;
                stack
            }
        };

        let restore = {
            let weak = Arc::downgrade(&stack);
            let on_restore = on_restore.clone();
            move |_: &OperationInfo| {
                if let Some(stack) = weak.upgrade() {
                    if let Some(snapshot) = stack.context_snapshot() {
                        on_restore(&snapshot);
                    }
                }
            }
        };
        let undo_sub = stack.on_undone().subscribe(restore.clone());
        let redo_sub = stack.on_redone().subscribe(restore);

        Ok(Self {
            stack,
            gesture_start: Mutex::new(None),
            undo_sub,
            redo_sub,
        })
    }

    /// Captures the gesture-start snapshot (interaction start, e.g. a
    /// slider grab).
    pub fn begin_gesture(&self) {
        *self.gesture_start.lock() = self.stack.context_snapshot();
    }

    /// Closes the gesture with the live parameter value. Commits one
    /// before/after record when the value actually changed; returns whether
    /// a record was made.
    pub fn end_gesture(&self, live: P, description: impl Into<String>) -> bool {
        let Some(before) = self.gesture_start.lock().take() else {
            return false;
        };
        if before == live {
            return false;
        }
        self.commit(before, live, description);
        true
    }

    /// Records a discrete (non-drag) change such as a button click.
    /// Returns `false` when `live` equals the current snapshot.
    pub fn record_immediate(&self, live: P, description: impl Into<String>) -> bool {
        let Some(before) = self.stack.context_snapshot() else {
            return false;
        };
        if before == live {
            return false;
        }
        self.commit(before, live, description);
        true
    }

    fn commit(&self, before: P, after: P, description: impl Into<String>) {
        self.stack.set_context(after.clone());
        self.stack
            .record(Box::new(ParamDiff { before, after }), description);
    }

    /// The current parameter snapshot.
    pub fn current(&self) -> Option<P> {
        self.stack.context_snapshot()
    }

    /// The wrapped stack, e.g. for direct undo/redo calls from the panel.
    pub fn stack(&self) -> &Arc<HistoryStack<P>> {
        &self.stack
    }

    /// Unsubscribes the restore handlers. The stack and its snapshot stay
    /// in the tree for the next attach.
    pub fn detach(self) {}
}

impl<P: Clone + PartialEq + Send + 'static> Drop for ParamEditor<P> {
    fn drop(&mut self) {
        self.stack.on_undone().unsubscribe(self.undo_sub);
        self.stack.on_redone().unsubscribe(self.redo_sub);
    }
}

impl<P: Clone + PartialEq + Send + 'static> fmt::Debug for ParamEditor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamEditor")
            .field("stack", &self.stack.id())
            .field("gesture_open", &self.gesture_start.lock().is_some())
            .finish()
    }
}
