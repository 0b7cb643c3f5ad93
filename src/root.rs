//! Process-wide history root.
//!
//! [`HistoryRoot`] is a [`HistoryGroup`] with a fixed id plus the
//! convenience surface a host application wires up once: stack/group
//! creation, slash-path focus assignment, and keyboard-shortcut dispatch.
//! A shared instance is available through [`HistoryRoot::global`] for
//! production use, but roots are freely constructible so tests (and
//! embedded tools) get isolated state.

use std::sync::Arc;
use std::sync::OnceLock;

use crate::error::HistoryError;
use crate::group::HistoryGroup;
use crate::input::KeyEvent;
use crate::node::UndoNode;
use crate::stack::HistoryStack;

/// Id of every [`HistoryRoot`]'s underlying group.
pub const ROOT_ID: &str = "root";

static GLOBAL: OnceLock<HistoryRoot> = OnceLock::new();

/// The top-level history group of an application.
pub struct HistoryRoot {
    group: Arc<HistoryGroup>,
}

impl HistoryRoot {
    /// Creates an isolated root.
    pub fn new() -> Self {
        Self {
            group: HistoryGroup::new(ROOT_ID, "History root"),
        }
    }

    /// The shared process-wide root, created on first use and never torn
    /// down. Children are disposed explicitly by their owners.
    pub fn global() -> &'static HistoryRoot {
        GLOBAL.get_or_init(Self::new)
    }

    /// The underlying group, for direct tree manipulation.
    pub fn group(&self) -> &Arc<HistoryGroup> {
        &self.group
    }

    /// Creates a stack and attaches it to the root.
    pub fn create_stack<C: Send + 'static>(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        context: Option<C>,
    ) -> Result<Arc<HistoryStack<C>>, HistoryError> {
        let stack = HistoryStack::new(id, name, context);
        self.group.add_child(stack.clone())?;
        Ok(stack)
    }

    /// Creates a sub-group and attaches it to the root.
    pub fn create_group(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Arc<HistoryGroup>, HistoryError> {
        let group = HistoryGroup::new(id, name);
        self.group.add_child(group.clone())?;
        Ok(group)
    }

    /// Recursive lookup anywhere in the tree.
    pub fn find_by_id(&self, id: &str) -> Option<Arc<dyn UndoNode>> {
        self.group.find_by_id(id)
    }

    /// Assigns focus along a slash-separated path, e.g. `"geometry/mesh-3"`.
    ///
    /// Every group along the path gets the next segment as its focused
    /// child, so focus-driven resolution descends the whole chain. An empty
    /// path clears the root's focus. On an unresolvable segment a warning
    /// is logged and `false` returned; segments already applied stay
    /// applied.
    pub fn set_focus(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            self.group.set_focus(None);
            return true;
        }

        let mut current = self.group.clone();
        for (index, &segment) in segments.iter().enumerate() {
            let Some(child) = current
                .children()
                .into_iter()
                .find(|c| c.id() == segment)
            else {
                log::warn!(
                    "focus path `{path}`: no child `{segment}` under `{}`",
                    current.id()
                );
                return false;
            };
            current.set_focus(Some(segment));

            if index + 1 == segments.len() {
                break;
            }
            match child.as_any_arc().downcast::<HistoryGroup>() {
                Ok(group) => current = group,
                Err(_) => {
                    log::warn!("focus path `{path}`: `{segment}` is not a group");
                    return false;
                }
            }
        }
        true
    }

    /// Dispatches a platform-neutral keyboard event.
    ///
    /// Returns `true` only when the event matched an undo/redo chord *and*
    /// the operation actually ran, so the host input system stops
    /// propagation only when something happened. A failed global undo/redo
    /// is silently a no-op.
    pub fn handle_shortcut(&self, event: &KeyEvent) -> bool {
        if event.is_undo_chord() {
            self.perform_undo()
        } else if event.is_redo_chord() {
            self.perform_redo()
        } else {
            false
        }
    }

    /// Flushes every pending queue in the tree. Call from the owning thread
    /// at a bounded interval (e.g. every UI frame).
    pub fn process_all_queues(&self) -> usize {
        self.group.process_pending()
    }

    pub fn perform_undo(&self) -> bool {
        self.group.perform_undo()
    }

    pub fn perform_redo(&self) -> bool {
        self.group.perform_redo()
    }

    pub fn can_undo(&self) -> bool {
        self.group.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.group.can_redo()
    }

    pub fn clear(&self) {
        self.group.clear();
    }
}

impl Default for HistoryRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HistoryRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryRoot")
            .field("group", &self.group)
            .finish()
    }
}
