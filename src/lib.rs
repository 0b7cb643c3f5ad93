//! # histree
//!
//! Hierarchical undo/redo engine for editors with many independently
//! editable sub-contexts (documents, parameter panels, geometry buffers)
//! sharing a single global Undo/Redo gesture.
//!
//! The history tree has two node kinds. A [`HistoryStack`] is a leaf that
//! owns one typed editing context and its undo/redo lists; collaborators
//! record opaque [`UndoRecord`]s against it from any thread through a
//! pending queue. A [`HistoryGroup`] composes stacks and sub-groups and
//! arbitrates, by [`ResolvePolicy`], which child services a global
//! undo/redo when several have pending history. The [`HistoryRoot`] sits on
//! top with path-based focus and keyboard-shortcut dispatch.
//!
//! # Threading contract
//!
//! [`HistoryStack::record`] is thread-safe and non-blocking: it enqueues
//! into the stack's pending FIFO and never touches the committed lists.
//! One designated owner thread (typically the UI thread, on its frame tick)
//! calls [`HistoryStack::process_pending`] /
//! [`HistoryRoot::process_all_queues`] to drain queues into the undo lists.
//! Undo/redo calls flush pending queues first, so a record enqueued
//! microseconds earlier is visible to the very next undo.
//!
//! # Example
//!
//! ```ignore
//! let root = HistoryRoot::new();
//! let mesh = root.create_stack("mesh", "Mesh buffer", Some(MeshBuffer::new()))?;
//!
//! // Any thread, whenever an edit is made:
//! mesh.record(Box::new(MoveVertex { .. }), "Move vertex");
//!
//! // Owner thread, once per frame:
//! root.process_all_queues();
//!
//! // Global gesture:
//! if root.handle_shortcut(&key_event) {
//!     // consumed; stop propagation
//! }
//! ```

pub mod error;
pub mod events;
pub mod group;
pub mod input;
pub mod node;
pub mod param;
mod queue;
pub mod record;
pub mod root;
pub mod stack;

pub use error::HistoryError;
pub use events::{EventDispatcher, SubscriberId};
pub use group::{HistoryGroup, ResolvePolicy};
pub use input::{KeyCode, KeyEvent, Modifiers};
pub use node::{AsAny, UndoNode};
pub use param::ParamEditor;
pub use record::{OperationInfo, UndoRecord};
pub use root::{HistoryRoot, ROOT_ID};
pub use stack::{HistoryStack, DEFAULT_MAX_SIZE};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
