//! Type-erased capability trait for history tree nodes.
//!
//! Each [`HistoryStack`](crate::HistoryStack) is generic over its own context
//! type, yet a [`HistoryGroup`](crate::HistoryGroup) must hold children of
//! mixed concrete types. [`UndoNode`] erases the type parameter at the tree
//! level: groups store `Arc<dyn UndoNode>` children and route global
//! undo/redo through this interface, while each stack stays statically typed
//! internally.

use std::any::Any;
use std::sync::Arc;

use crate::group::HistoryGroup;
use crate::record::OperationInfo;

/// Helper trait for downcasting trait objects to concrete types.
///
/// Automatically implemented for all `'static` types.
pub trait AsAny: 'static {
    /// Returns a reference to `self` as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T: 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A node in the history tree: either a leaf stack or a composite group.
///
/// All methods take `&self`; nodes are internally synchronized so they can
/// be shared across threads behind `Arc`. Mutation of committed state is
/// still single-consumer by contract — see the crate docs.
pub trait UndoNode: AsAny + Send + Sync {
    /// Unique id within the owning group; also a focus-path segment.
    fn id(&self) -> &str;

    /// Display name for menus and panels.
    fn name(&self) -> &str;

    /// `true` if a `perform_undo` call would do work right now.
    /// Queued-but-unprocessed records do not count.
    fn can_undo(&self) -> bool;

    /// `true` if a `perform_redo` call would do work right now.
    fn can_redo(&self) -> bool;

    /// Committed undo entries (summed over descendants for groups).
    fn undo_count(&self) -> usize;

    /// Committed redo entries (summed over descendants for groups).
    fn redo_count(&self) -> usize;

    /// Metadata of the newest committed undo entry, if any. For groups,
    /// the newest across all descendants.
    fn newest_undo(&self) -> Option<OperationInfo>;

    /// Metadata of the entry the next `perform_redo` would replay first,
    /// if any. For groups, the chronologically oldest across descendants.
    fn next_redo(&self) -> Option<OperationInfo>;

    /// Undoes the most recent committed group of operations.
    /// Returns `false` when there is nothing to undo (not an error).
    fn perform_undo(&self) -> bool;

    /// Replays the most recently undone group of operations.
    /// Returns `false` when there is nothing to redo (not an error).
    fn perform_redo(&self) -> bool;

    /// Drains pending queues (recursively for groups) into committed undo
    /// lists. Must be called from the owning thread. Returns the number of
    /// records committed.
    fn process_pending(&self) -> usize;

    /// Drops pending, undo and redo state (recursively for groups).
    fn clear(&self);

    /// Claims this node for a parent group. Returns `false` if the node
    /// already has a parent. Called by [`HistoryGroup::add_child`].
    fn mark_attached(&self) -> bool;

    /// Releases the parent claim. Called by [`HistoryGroup::remove_child`].
    fn mark_detached(&self);

    /// Downcast hook used when descending focus paths.
    fn as_group(&self) -> Option<&HistoryGroup> {
        None
    }

    /// Owned downcast hook; lets callers recover a concretely typed
    /// `Arc<HistoryStack<C>>` from a tree lookup.
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
