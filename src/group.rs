//! Composite history node: groups of stacks and sub-groups.
//!
//! A [`HistoryGroup`] aggregates capability queries over its children and
//! routes a global undo/redo to a single child via its [`ResolvePolicy`].
//! The tree is heterogeneous: children are `Arc<dyn UndoNode>`, so stacks
//! with different context types live side by side.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::HistoryError;
use crate::events::EventDispatcher;
use crate::node::UndoNode;
use crate::record::OperationInfo;
use crate::stack::HistoryStack;

/// Rule for picking which eligible child services a global undo/redo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// Strict: the focused child or nothing, even when other children are
    /// eligible.
    FocusPriority,
    /// For undo, the child whose newest committed operation is newest; for
    /// redo, the child whose next redo operation is oldest, so a global
    /// redo replays history in original chronological order across
    /// contexts.
    TimestampPriority,
    /// Focus first, timestamps as fallback.
    #[default]
    FocusThenTimestamp,
}

#[derive(Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

struct GroupState {
    children: Vec<Arc<dyn UndoNode>>,
    focused: Option<String>,
    policy: ResolvePolicy,
}

/// A composite node owning an ordered list of distinct-id children.
pub struct HistoryGroup {
    id: String,
    name: String,
    state: Mutex<GroupState>,
    attached: AtomicBool,
    on_focus_changed: EventDispatcher<Option<String>>,
}

impl HistoryGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            name: name.into(),
            state: Mutex::new(GroupState {
                children: Vec::new(),
                focused: None,
                policy: ResolvePolicy::default(),
            }),
            attached: AtomicBool::new(false),
            on_focus_changed: EventDispatcher::new(),
        })
    }

    /// Attaches a child node.
    ///
    /// A duplicate id or a node that already has a parent is a wiring bug
    /// and reported as an error (the tree is a tree, not a DAG).
    pub fn add_child(&self, child: Arc<dyn UndoNode>) -> Result<(), HistoryError> {
        if child.id().is_empty() {
            return Err(HistoryError::EmptyId);
        }
        let mut state = self.state.lock();
        if state.children.iter().any(|c| c.id() == child.id()) {
            return Err(HistoryError::DuplicateChildId(child.id().to_string()));
        }
        if !child.mark_attached() {
            return Err(HistoryError::AlreadyAttached(child.id().to_string()));
        }
        state.children.push(child);
        Ok(())
    }

    /// Detaches the child with the given id. Returns `false` when absent.
    /// Clears focus if the removed child was focused.
    pub fn remove_child(&self, id: &str) -> bool {
        let (removed, focus_cleared) = {
            let mut state = self.state.lock();
            let Some(index) = state.children.iter().position(|c| c.id() == id) else {
                return false;
            };
            let child = state.children.remove(index);
            child.mark_detached();
            let focus_cleared = state.focused.as_deref() == Some(id);
            if focus_cleared {
                state.focused = None;
            }
            (true, focus_cleared)
        };
        if focus_cleared {
            self.on_focus_changed.emit(&None);
        }
        removed
    }

    /// Recursive depth-first lookup. `None` when absent — "not found" is an
    /// expected outcome for speculative lookups.
    pub fn find_by_id(&self, id: &str) -> Option<Arc<dyn UndoNode>> {
        for child in self.children() {
            if child.id() == id {
                return Some(child);
            }
            if let Some(group) = child.as_group() {
                if let Some(found) = group.find_by_id(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Typed lookup of a descendant stack. `None` when the id is absent or
    /// names a node of a different kind or context type.
    pub fn find_stack<C: Send + 'static>(&self, id: &str) -> Option<Arc<HistoryStack<C>>> {
        self.find_by_id(id)
            .and_then(|node| node.as_any_arc().downcast::<HistoryStack<C>>().ok())
    }

    /// Snapshot of the child list.
    pub fn children(&self) -> Vec<Arc<dyn UndoNode>> {
        self.state.lock().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.state.lock().children.len()
    }

    /// Sets or clears the focused child. Returns `false` (with a warning)
    /// when the id names no direct child.
    pub fn set_focus(&self, id: Option<&str>) -> bool {
        let focus = {
            let mut state = self.state.lock();
            if let Some(id) = id {
                if !state.children.iter().any(|c| c.id() == id) {
                    log::warn!("group `{}`: cannot focus unknown child `{id}`", self.id);
                    return false;
                }
            }
            let focus = id.map(str::to_string);
            if state.focused == focus {
                return true;
            }
            state.focused = focus.clone();
            focus
        };
        self.on_focus_changed.emit(&focus);
        true
    }

    pub fn focused(&self) -> Option<String> {
        self.state.lock().focused.clone()
    }

    pub fn set_policy(&self, policy: ResolvePolicy) {
        self.state.lock().policy = policy;
    }

    pub fn policy(&self) -> ResolvePolicy {
        self.state.lock().policy
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fired when the focused child changes (including clears).
    pub fn on_focus_changed(&self) -> &EventDispatcher<Option<String>> {
        &self.on_focus_changed
    }

    /// Flushes every descendant pending queue. Owning thread only.
    pub fn process_pending(&self) -> usize {
        self.children()
            .iter()
            .map(|child| child.process_pending())
            .sum()
    }

    /// Globally flushes, then resolves one child by policy and delegates.
    /// Returns `false` when no child is eligible.
    pub fn perform_undo(&self) -> bool {
        self.process_pending();
        match self.resolve(Direction::Undo) {
            Some(child) => child.perform_undo(),
            None => false,
        }
    }

    /// Symmetric to [`perform_undo`](Self::perform_undo).
    pub fn perform_redo(&self) -> bool {
        self.process_pending();
        match self.resolve(Direction::Redo) {
            Some(child) => child.perform_redo(),
            None => false,
        }
    }

    /// Recursively clears all descendants.
    pub fn clear(&self) {
        for child in self.children() {
            child.clear();
        }
    }

    pub fn can_undo(&self) -> bool {
        self.children().iter().any(|child| child.can_undo())
    }

    pub fn can_redo(&self) -> bool {
        self.children().iter().any(|child| child.can_redo())
    }

    pub fn undo_count(&self) -> usize {
        self.children().iter().map(|child| child.undo_count()).sum()
    }

    pub fn redo_count(&self) -> usize {
        self.children().iter().map(|child| child.redo_count()).sum()
    }

    /// Newest committed operation across all descendants.
    pub fn newest_undo(&self) -> Option<OperationInfo> {
        self.children()
            .iter()
            .filter_map(|child| child.newest_undo())
            .max_by_key(|info| info.timestamp)
    }

    /// Chronologically oldest next-redo operation across all descendants.
    pub fn next_redo(&self) -> Option<OperationInfo> {
        self.children()
            .iter()
            .filter_map(|child| child.next_redo())
            .min_by_key(|info| info.timestamp)
    }

    fn resolve(&self, direction: Direction) -> Option<Arc<dyn UndoNode>> {
        let eligible: Vec<Arc<dyn UndoNode>> = self
            .children()
            .into_iter()
            .filter(|child| match direction {
                Direction::Undo => child.can_undo(),
                Direction::Redo => child.can_redo(),
            })
            .collect();
        if eligible.is_empty() {
            return None;
        }

        let (policy, focused) = {
            let state = self.state.lock();
            (state.policy, state.focused.clone())
        };

        let by_focus = || {
            focused
                .as_deref()
                .and_then(|id| eligible.iter().find(|c| c.id() == id).cloned())
        };
        let by_timestamp = || match direction {
            // Undo reverses the most recently performed global action.
            Direction::Undo => eligible
                .iter()
                .filter_map(|c| c.newest_undo().map(|info| (info.timestamp, c.clone())))
                .max_by_key(|(timestamp, _)| *timestamp)
                .map(|(_, child)| child),
            // Redo replays global actions in original chronological order.
            Direction::Redo => eligible
                .iter()
                .filter_map(|c| c.next_redo().map(|info| (info.timestamp, c.clone())))
                .min_by_key(|(timestamp, _)| *timestamp)
                .map(|(_, child)| child),
        };

        match policy {
            ResolvePolicy::FocusPriority => by_focus(),
            ResolvePolicy::TimestampPriority => by_timestamp(),
            ResolvePolicy::FocusThenTimestamp => by_focus().or_else(by_timestamp),
        }
    }
}

impl UndoNode for HistoryGroup {
    fn id(&self) -> &str {
        HistoryGroup::id(self)
    }

    fn name(&self) -> &str {
        HistoryGroup::name(self)
    }

    fn can_undo(&self) -> bool {
        HistoryGroup::can_undo(self)
    }

    fn can_redo(&self) -> bool {
        HistoryGroup::can_redo(self)
    }

    fn undo_count(&self) -> usize {
        HistoryGroup::undo_count(self)
    }

    fn redo_count(&self) -> usize {
        HistoryGroup::redo_count(self)
    }

    fn newest_undo(&self) -> Option<OperationInfo> {
        HistoryGroup::newest_undo(self)
    }

    fn next_redo(&self) -> Option<OperationInfo> {
        HistoryGroup::next_redo(self)
    }

    fn perform_undo(&self) -> bool {
        HistoryGroup::perform_undo(self)
    }

    fn perform_redo(&self) -> bool {
        HistoryGroup::perform_redo(self)
    }

    fn process_pending(&self) -> usize {
        HistoryGroup::process_pending(self)
    }

    fn clear(&self) {
        HistoryGroup::clear(self)
    }

    fn mark_attached(&self) -> bool {
        !self.attached.swap(true, Ordering::AcqRel)
    }

    fn mark_detached(&self) {
        self.attached.store(false, Ordering::Release);
    }

    fn as_group(&self) -> Option<&HistoryGroup> {
        Some(self)
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl std::fmt::Debug for HistoryGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HistoryGroup")
            .field("id", &self.id)
            .field("children", &state.children.len())
            .field("focused", &state.focused)
            .field("policy", &state.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::UndoRecord;
    use std::thread::sleep;
    use std::time::Duration;

    #[derive(Debug)]
    struct Set {
        from: i32,
        to: i32,
    }

    impl UndoRecord<i32> for Set {
        fn undo(&mut self, context: &mut i32) {
            *context = self.from;
        }

        fn redo(&mut self, context: &mut i32) {
            *context = self.to;
        }
    }

    /// Applies the edit to the stack context, records it, and commits.
    fn commit_set(stack: &HistoryStack<i32>, to: i32, description: &str) {
        let from = stack.context_snapshot().unwrap();
        stack.set_context(to);
        stack.record(Box::new(Set { from, to }), description);
        stack.process_pending();
    }

    fn make_pair() -> (Arc<HistoryGroup>, Arc<HistoryStack<i32>>, Arc<HistoryStack<i32>>) {
        let group = HistoryGroup::new("g", "Group");
        let a = HistoryStack::new("a", "Stack A", Some(0));
        let b = HistoryStack::new("b", "Stack B", Some(0));
        group.add_child(a.clone()).unwrap();
        group.add_child(b.clone()).unwrap();
        (group, a, b)
    }

    #[test]
    fn duplicate_child_id_is_an_error() {
        let group = HistoryGroup::new("g", "Group");
        group
            .add_child(HistoryStack::<i32>::new("a", "A", None))
            .unwrap();
        let result = group.add_child(HistoryStack::<i32>::new("a", "Other A", None));
        assert_eq!(result, Err(HistoryError::DuplicateChildId("a".into())));
    }

    #[test]
    fn attaching_a_node_twice_is_an_error() {
        let g1 = HistoryGroup::new("g1", "G1");
        let g2 = HistoryGroup::new("g2", "G2");
        let stack = HistoryStack::<i32>::new("a", "A", None);
        g1.add_child(stack.clone()).unwrap();
        let result = g2.add_child(stack);
        assert_eq!(result, Err(HistoryError::AlreadyAttached("a".into())));
    }

    #[test]
    fn removed_child_can_be_reattached() {
        let g1 = HistoryGroup::new("g1", "G1");
        let g2 = HistoryGroup::new("g2", "G2");
        let stack = HistoryStack::<i32>::new("a", "A", None);
        g1.add_child(stack.clone()).unwrap();
        assert!(g1.remove_child("a"));
        g2.add_child(stack).unwrap();
    }

    #[test]
    fn empty_child_id_is_an_error() {
        let group = HistoryGroup::new("g", "Group");
        let result = group.add_child(HistoryStack::<i32>::new("", "Anon", None));
        assert_eq!(result, Err(HistoryError::EmptyId));
    }

    #[test]
    fn remove_unknown_child_returns_false() {
        let group = HistoryGroup::new("g", "Group");
        assert!(!group.remove_child("ghost"));
    }

    #[test]
    fn remove_focused_child_clears_focus() {
        let (group, _a, _b) = make_pair();
        assert!(group.set_focus(Some("a")));
        assert!(group.remove_child("a"));
        assert_eq!(group.focused(), None);
    }

    #[test]
    fn find_by_id_searches_recursively() {
        let root = HistoryGroup::new("root", "Root");
        let inner = HistoryGroup::new("inner", "Inner");
        let stack = HistoryStack::<i32>::new("deep", "Deep", None);
        inner.add_child(stack).unwrap();
        root.add_child(inner).unwrap();

        assert!(root.find_by_id("deep").is_some());
        assert!(root.find_by_id("inner").is_some());
        assert!(root.find_by_id("ghost").is_none());
    }

    #[test]
    fn find_stack_checks_context_type() {
        let group = HistoryGroup::new("g", "Group");
        group
            .add_child(HistoryStack::<i32>::new("nums", "Numbers", None))
            .unwrap();

        assert!(group.find_stack::<i32>("nums").is_some());
        assert!(group.find_stack::<String>("nums").is_none());
    }

    #[test]
    fn focus_on_unknown_child_warns_and_fails() {
        let (group, _a, _b) = make_pair();
        assert!(!group.set_focus(Some("ghost")));
        assert_eq!(group.focused(), None);
    }

    #[test]
    fn focus_change_fires_event() {
        let (group, _a, _b) = make_pair();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            group.on_focus_changed().subscribe(move |focus| {
                seen.lock().push(focus.clone());
            });
        }

        group.set_focus(Some("a"));
        group.set_focus(Some("a")); // no change, no event
        group.set_focus(None);

        assert_eq!(
            seen.lock().as_slice(),
            [Some("a".to_string()), None]
        );
    }

    #[test]
    fn focus_then_timestamp_prefers_focus() {
        let (group, a, b) = make_pair();
        commit_set(&a, 1, "set a");
        sleep(Duration::from_millis(2));
        commit_set(&b, 2, "set b"); // newer than a's latest op

        group.set_focus(Some("a"));
        assert!(group.perform_undo());
        // A undone, B untouched.
        assert_eq!(a.context_snapshot().unwrap(), 0);
        assert_eq!(b.context_snapshot().unwrap(), 2);
    }

    #[test]
    fn focus_then_timestamp_falls_back_without_focus() {
        let (group, a, b) = make_pair();
        commit_set(&a, 1, "set a");
        sleep(Duration::from_millis(2));
        commit_set(&b, 2, "set b");

        assert!(group.perform_undo());
        assert_eq!(b.context_snapshot().unwrap(), 0);
        assert_eq!(a.context_snapshot().unwrap(), 1);
    }

    #[test]
    fn focus_priority_is_strict() {
        let (group, _a, b) = make_pair();
        group.set_policy(ResolvePolicy::FocusPriority);
        commit_set(&b, 2, "set b");

        // No focus set: the global call fails even though B is eligible.
        assert!(!group.perform_undo());

        // Focused child has nothing to undo: still fails.
        group.set_focus(Some("a"));
        assert!(!group.perform_undo());
        assert_eq!(b.context_snapshot().unwrap(), 2);
    }

    #[test]
    fn timestamp_priority_undoes_newest() {
        let (group, a, b) = make_pair();
        group.set_policy(ResolvePolicy::TimestampPriority);
        group.set_focus(Some("a")); // ignored by this policy
        commit_set(&a, 1, "set a");
        sleep(Duration::from_millis(2));
        commit_set(&b, 2, "set b");

        assert!(group.perform_undo());
        assert_eq!(b.context_snapshot().unwrap(), 0);
        assert_eq!(a.context_snapshot().unwrap(), 1);
    }

    #[test]
    fn global_redo_replays_in_chronological_order() {
        let (group, a, b) = make_pair();
        group.set_policy(ResolvePolicy::TimestampPriority);

        // Interleave edits across contexts: a=1, b=7, a=2.
        commit_set(&a, 1, "a=1");
        sleep(Duration::from_millis(2));
        commit_set(&b, 7, "b=7");
        sleep(Duration::from_millis(2));
        commit_set(&a, 2, "a=2");

        // Three global undos reverse everything, newest first.
        assert!(group.perform_undo()); // a=2 undone
        assert_eq!(a.context_snapshot().unwrap(), 1);
        assert!(group.perform_undo()); // b=7 undone
        assert_eq!(b.context_snapshot().unwrap(), 0);
        assert!(group.perform_undo()); // a=1 undone
        assert_eq!(a.context_snapshot().unwrap(), 0);

        // Global redos replay in the original order: a=1, b=7, a=2.
        assert!(group.perform_redo());
        assert_eq!((a.context_snapshot().unwrap(), b.context_snapshot().unwrap()), (1, 0));
        assert!(group.perform_redo());
        assert_eq!((a.context_snapshot().unwrap(), b.context_snapshot().unwrap()), (1, 7));
        assert!(group.perform_redo());
        assert_eq!((a.context_snapshot().unwrap(), b.context_snapshot().unwrap()), (2, 7));
        assert!(!group.perform_redo());
    }

    #[test]
    fn group_undo_flushes_descendant_queues_first() {
        let (group, a, _b) = make_pair();
        a.record(
            Box::new(Set { from: 0, to: 5 }),
            "queued, never explicitly drained",
        );
        a.set_context(5);

        // The enqueued record must be visible to the very next global undo.
        assert!(group.perform_undo());
        assert_eq!(a.context_snapshot().unwrap(), 0);
    }

    #[test]
    fn nested_groups_participate_in_resolution() {
        let root = HistoryGroup::new("root", "Root");
        let inner = HistoryGroup::new("inner", "Inner");
        let a = HistoryStack::new("a", "A", Some(0));
        let b = HistoryStack::new("b", "B", Some(0));
        inner.add_child(b.clone()).unwrap();
        root.add_child(a.clone()).unwrap();
        root.add_child(inner.clone()).unwrap();
        root.set_policy(ResolvePolicy::TimestampPriority);
        inner.set_policy(ResolvePolicy::TimestampPriority);

        commit_set(&a, 1, "a=1");
        sleep(Duration::from_millis(2));
        commit_set(&b, 2, "b=2"); // newest, one level down

        assert!(root.perform_undo());
        assert_eq!(b.context_snapshot().unwrap(), 0);
        assert_eq!(a.context_snapshot().unwrap(), 1);
    }

    #[test]
    fn aggregates_sum_over_children() {
        let (group, a, b) = make_pair();
        commit_set(&a, 1, "a");
        commit_set(&b, 2, "b");
        b.perform_undo();

        assert!(group.can_undo());
        assert!(group.can_redo());
        assert_eq!(group.undo_count(), 1);
        assert_eq!(group.redo_count(), 1);
    }

    #[test]
    fn clear_is_recursive() {
        let root = HistoryGroup::new("root", "Root");
        let inner = HistoryGroup::new("inner", "Inner");
        let a = HistoryStack::new("a", "A", Some(0));
        let b = HistoryStack::new("b", "B", Some(0));
        root.add_child(a.clone()).unwrap();
        inner.add_child(b.clone()).unwrap();
        root.add_child(inner).unwrap();

        commit_set(&a, 1, "a");
        commit_set(&b, 2, "b");
        root.clear();

        assert_eq!(a.undo_count(), 0);
        assert_eq!(b.undo_count(), 0);
        assert!(!root.can_undo());
    }

    #[test]
    fn undo_with_no_eligible_children_returns_false() {
        let (group, _a, _b) = make_pair();
        assert!(!group.perform_undo());
        assert!(!group.perform_redo());
    }
}
