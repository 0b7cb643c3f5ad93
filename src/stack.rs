//! Leaf history stack owning one typed editing context.
//!
//! [`HistoryStack`] accepts records from any thread through its pending
//! queue and commits them into the undo list only when
//! [`process_pending`](HistoryStack::process_pending) runs on the stack's
//! owning thread. Undo and redo operate on whole groups: a contiguous
//! trailing run of entries sharing one group id moves between the lists as
//! a single atomic unit.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::events::EventDispatcher;
use crate::node::UndoNode;
use crate::queue::{PendingEntry, PendingQueue};
use crate::record::{next_operation_id, OperationInfo, UndoRecord};

/// Default maximum number of committed undo entries per stack.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// A committed record with its metadata.
struct Committed<C> {
    record: Box<dyn UndoRecord<C>>,
    info: OperationInfo,
}

/// Context plus both committed lists. Single-writer: only the owning
/// thread mutates this (the mutex makes cross-thread queries sound).
struct StackState<C> {
    context: Option<C>,
    /// Oldest → newest.
    undo: Vec<Committed<C>>,
    /// Popped from the end; a trailing same-group run is the next redo unit.
    redo: Vec<Committed<C>>,
}

struct ActiveGroup {
    id: u64,
    name: String,
}

/// Group-id allocation state. Guarded separately from [`StackState`] so
/// `record` never contends with the committed lists.
struct GroupScope {
    next_group_id: u64,
    active: Option<ActiveGroup>,
}

/// A leaf history node owning one editing context of type `C`.
///
/// # Threading
///
/// [`record`](Self::record), [`begin_group`](Self::begin_group) and
/// [`end_group`](Self::end_group) may be called from any thread and never
/// block beyond two short critical sections. Everything that mutates the
/// committed lists — [`process_pending`](Self::process_pending),
/// [`perform_undo`](Self::perform_undo), [`perform_redo`](Self::perform_redo),
/// [`clear`](Self::clear) — must run on the stack's designated owning
/// thread. Group scoping (`begin_group`/`end_group`) is additionally
/// single-writer per stack: overlapping calls from different threads
/// interleave unpredictably and must be serialized by the caller.
///
/// # Capacity
///
/// The undo list is capped at `max_size`; the oldest entries are evicted on
/// commit. The redo list is deliberately uncapped — it can never outgrow
/// what the undo list held, because every commit clears it.
pub struct HistoryStack<C> {
    id: String,
    name: String,
    max_size: usize,
    pending: PendingQueue<C>,
    scope: Mutex<GroupScope>,
    state: Mutex<StackState<C>>,
    attached: AtomicBool,
    on_recorded: EventDispatcher<OperationInfo>,
    on_undone: EventDispatcher<OperationInfo>,
    on_redone: EventDispatcher<OperationInfo>,
    on_processed: EventDispatcher<usize>,
}

impl<C: Send + 'static> HistoryStack<C> {
    /// Creates a stack with [`DEFAULT_MAX_SIZE`] capacity.
    ///
    /// `context` may be `None` for a stack whose panel is not open yet;
    /// records are accepted either way, but undo/redo are no-ops until a
    /// context is attached.
    pub fn new(id: impl Into<String>, name: impl Into<String>, context: Option<C>) -> Arc<Self> {
        Self::with_max_size(id, name, context, DEFAULT_MAX_SIZE)
    }

    /// Creates a stack with an explicit undo capacity.
    pub fn with_max_size(
        id: impl Into<String>,
        name: impl Into<String>,
        context: Option<C>,
        max_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            name: name.into(),
            max_size,
            pending: PendingQueue::new(),
            scope: Mutex::new(GroupScope {
                next_group_id: 0,
                active: None,
            }),
            state: Mutex::new(StackState {
                context,
                undo: Vec::new(),
                redo: Vec::new(),
            }),
            attached: AtomicBool::new(false),
            on_recorded: EventDispatcher::new(),
            on_undone: EventDispatcher::new(),
            on_redone: EventDispatcher::new(),
            on_processed: EventDispatcher::new(),
        })
    }

    /// Enqueues a record. Callable from any thread; never blocks and never
    /// touches the committed lists.
    ///
    /// The record receives the currently active group id, or a freshly
    /// incremented one when no group is open. An empty description defaults
    /// to the active group's name.
    pub fn record(&self, record: Box<dyn UndoRecord<C>>, description: impl Into<String>) {
        let mut description = description.into();
        let group_id = {
            let mut scope = self.scope.lock();
            match &scope.active {
                Some(active) => {
                    if description.is_empty() {
                        description = active.name.clone();
                    }
                    active.id
                }
                None => {
                    scope.next_group_id += 1;
                    scope.next_group_id
                }
            }
        };
        self.pending.push(PendingEntry {
            record,
            description,
            group_id,
        });
    }

    /// Opens a group: subsequent [`record`](Self::record) calls share one
    /// group id and will undo/redo as a single unit. Returns the group id.
    ///
    /// Group scoping is single-writer per stack; a `begin_group` while a
    /// group is already open replaces it.
    pub fn begin_group(&self, name: impl Into<String>) -> u64 {
        let mut scope = self.scope.lock();
        scope.next_group_id += 1;
        let id = scope.next_group_id;
        scope.active = Some(ActiveGroup {
            id,
            name: name.into(),
        });
        id
    }

    /// Closes the active group, if any.
    pub fn end_group(&self) {
        self.scope.lock().active = None;
    }

    /// Drains the pending queue into the undo list. Owning thread only.
    ///
    /// Each drained entry is stamped with commit metadata (the timestamp is
    /// the commit instant, not the enqueue instant) and appended in FIFO
    /// order. Any commit clears the redo list and evicts the oldest undo
    /// entries past `max_size`. Returns the number of records committed.
    pub fn process_pending(&self) -> usize {
        let drained = self.pending.drain();
        if drained.is_empty() {
            return 0;
        }

        let count = drained.len();
        let mut infos = Vec::with_capacity(count);
        {
            let mut state = self.state.lock();
            state.redo.clear();
            for entry in drained {
                let info = OperationInfo {
                    id: next_operation_id(),
                    timestamp: Instant::now(),
                    description: entry.description,
                    stack_id: self.id.clone(),
                    group_id: entry.group_id,
                };
                infos.push(info.clone());
                state.undo.push(Committed {
                    record: entry.record,
                    info,
                });
            }
            let excess = state.undo.len().saturating_sub(self.max_size);
            if excess > 0 {
                state.undo.drain(..excess);
                log::debug!("stack `{}`: evicted {excess} oldest undo entries", self.id);
            }
        }

        for info in &infos {
            self.on_recorded.emit(info);
        }
        self.on_processed.emit(&count);
        count
    }

    /// Undoes the most recent committed group. Owning thread only.
    ///
    /// Flushes the pending queue first, so a just-recorded edit is
    /// immediately undoable. Returns `false` when the undo list is empty or
    /// no context is attached.
    pub fn perform_undo(&self) -> bool {
        self.process_pending();

        let info = {
            let mut state = self.state.lock();
            if state.context.is_none() {
                return false;
            }
            let Some(group_id) = state.undo.last().map(|e| e.info.group_id) else {
                return false;
            };

            // Contiguous trailing run sharing the group id, newest first.
            let mut run = Vec::new();
            while state.undo.last().is_some_and(|e| e.info.group_id == group_id) {
                if let Some(entry) = state.undo.pop() {
                    run.push(entry);
                }
            }

            let StackState { context, redo, .. } = &mut *state;
            let Some(context) = context.as_mut() else {
                return false;
            };
            for entry in run.iter_mut() {
                entry.record.undo(context);
            }
            let info = run.first().map(|e| e.info.clone());
            // Re-insert oldest-first so a later redo replays forward.
            for entry in run.into_iter().rev() {
                redo.push(entry);
            }
            info
        };

        match info {
            Some(info) => {
                self.on_undone.emit(&info);
                true
            }
            None => false,
        }
    }

    /// Replays the most recently undone group. Owning thread only.
    ///
    /// Symmetric to [`perform_undo`](Self::perform_undo): flushes the
    /// pending queue, pops the trailing same-group run off the redo list,
    /// replays oldest → newest, and pushes the run back onto the undo list.
    pub fn perform_redo(&self) -> bool {
        self.process_pending();

        let info = {
            let mut state = self.state.lock();
            if state.context.is_none() {
                return false;
            }
            let Some(group_id) = state.redo.last().map(|e| e.info.group_id) else {
                return false;
            };

            let mut run = Vec::new();
            while state.redo.last().is_some_and(|e| e.info.group_id == group_id) {
                if let Some(entry) = state.redo.pop() {
                    run.push(entry);
                }
            }

            let StackState { context, undo, .. } = &mut *state;
            let Some(context) = context.as_mut() else {
                return false;
            };
            // `run` is newest-first; replay in original order.
            for entry in run.iter_mut().rev() {
                entry.record.redo(context);
            }
            let info = run.first().map(|e| e.info.clone());
            for entry in run.into_iter().rev() {
                undo.push(entry);
            }
            info
        };

        match info {
            Some(info) => {
                self.on_redone.emit(&info);
                true
            }
            None => false,
        }
    }

    /// Drops pending, undo and redo state and resets group allocation.
    /// Used on context detach, not as a normal operation.
    pub fn clear(&self) {
        self.pending.clear();
        {
            let mut state = self.state.lock();
            state.undo.clear();
            state.redo.clear();
        }
        let mut scope = self.scope.lock();
        scope.next_group_id = 0;
        scope.active = None;
    }

    /// `true` when the undo list is non-empty and a context is attached.
    pub fn can_undo(&self) -> bool {
        let state = self.state.lock();
        state.context.is_some() && !state.undo.is_empty()
    }

    /// `true` when the redo list is non-empty and a context is attached.
    pub fn can_redo(&self) -> bool {
        let state = self.state.lock();
        state.context.is_some() && !state.redo.is_empty()
    }

    /// Number of committed undo entries. Queued records do not count.
    pub fn undo_count(&self) -> usize {
        self.state.lock().undo.len()
    }

    /// Number of committed redo entries.
    pub fn redo_count(&self) -> usize {
        self.state.lock().redo.len()
    }

    /// Records awaiting commit.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Metadata of the newest committed undo entry.
    pub fn newest_undo(&self) -> Option<OperationInfo> {
        self.state.lock().undo.last().map(|e| e.info.clone())
    }

    /// Metadata of the entry the next redo would replay first.
    pub fn next_redo(&self) -> Option<OperationInfo> {
        self.state.lock().redo.last().map(|e| e.info.clone())
    }

    /// Undo entry descriptions, most recent first.
    pub fn undo_descriptions(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .undo
            .iter()
            .rev()
            .map(|e| e.info.description.clone())
            .collect()
    }

    /// Redo entry descriptions, next-to-redo first.
    pub fn redo_descriptions(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .redo
            .iter()
            .rev()
            .map(|e| e.info.description.clone())
            .collect()
    }

    /// Attaches or swaps the context, returning the previous one.
    pub fn set_context(&self, context: C) -> Option<C> {
        self.state.lock().context.replace(context)
    }

    /// Detaches the context. History is kept; undo/redo become no-ops.
    pub fn take_context(&self) -> Option<C> {
        self.state.lock().context.take()
    }

    pub fn has_context(&self) -> bool {
        self.state.lock().context.is_some()
    }

    /// Runs `f` against the context, if attached.
    pub fn with_context<R>(&self, f: impl FnOnce(&C) -> R) -> Option<R> {
        self.state.lock().context.as_ref().map(f)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fired once per record at commit time.
    pub fn on_recorded(&self) -> &EventDispatcher<OperationInfo> {
        &self.on_recorded
    }

    /// Fired after an undo, with the group's representative metadata.
    pub fn on_undone(&self) -> &EventDispatcher<OperationInfo> {
        &self.on_undone
    }

    /// Fired after a redo, with the group's representative metadata.
    pub fn on_redone(&self) -> &EventDispatcher<OperationInfo> {
        &self.on_redone
    }

    /// Fired after a non-empty drain, with the commit count.
    pub fn on_processed(&self) -> &EventDispatcher<usize> {
        &self.on_processed
    }
}

impl<C: Clone + Send + 'static> HistoryStack<C> {
    /// Clones the current context, if attached.
    pub fn context_snapshot(&self) -> Option<C> {
        self.state.lock().context.clone()
    }
}

impl<C: Send + 'static> UndoNode for HistoryStack<C> {
    fn id(&self) -> &str {
        HistoryStack::id(self)
    }

    fn name(&self) -> &str {
        HistoryStack::name(self)
    }

    fn can_undo(&self) -> bool {
        HistoryStack::can_undo(self)
    }

    fn can_redo(&self) -> bool {
        HistoryStack::can_redo(self)
    }

    fn undo_count(&self) -> usize {
        HistoryStack::undo_count(self)
    }

    fn redo_count(&self) -> usize {
        HistoryStack::redo_count(self)
    }

    fn newest_undo(&self) -> Option<OperationInfo> {
        HistoryStack::newest_undo(self)
    }

    fn next_redo(&self) -> Option<OperationInfo> {
        HistoryStack::next_redo(self)
    }

    fn perform_undo(&self) -> bool {
        HistoryStack::perform_undo(self)
    }

    fn perform_redo(&self) -> bool {
        HistoryStack::perform_redo(self)
    }

    fn process_pending(&self) -> usize {
        HistoryStack::process_pending(self)
    }

    fn clear(&self) {
        HistoryStack::clear(self)
    }

    fn mark_attached(&self) -> bool {
        !self.attached.swap(true, Ordering::AcqRel)
    }

    fn mark_detached(&self) {
        self.attached.store(false, Ordering::Release);
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<C> std::fmt::Debug for HistoryStack<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HistoryStack")
            .field("id", &self.id)
            .field("undo_count", &state.undo.len())
            .field("redo_count", &state.redo.len())
            .field("pending", &self.pending.len())
            .field("max_size", &self.max_size)
            .finish()
    }
}
