//! Host applier contract - the boundary where commands become surface
//! mutations.
//!
//! A host provides four operations: create a node, update it in place,
//! remove it, insert it under a parent. Commands must be applied in the
//! order the reconciler emitted them; the applier never reorders or
//! coalesces - the reconciler is the single source of ordering decisions.
//!
//! The in-crate host is [`RecordingHost`], the test harness applier.
//! Display adapters (DOM, native views) live outside the engine.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::arena::{ArenaKind, SeqClear};
use crate::reconcile::{AttrDelta, AttrSnapshot};
use crate::style::StyleHandle;
use crate::tree::NodeId;
use crate::types::ElementKind;

// =============================================================================
// Handles and errors
// =============================================================================

/// Opaque handle a host returns for a created node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostHandle(pub u64);

impl HostHandle {
    /// The display surface's root container.
    pub const ROOT: HostHandle = HostHandle(0);
}

/// Failure reported by a host operation. The driver marks the retained
/// tree inconsistent and schedules a full replace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("host {op} failed: {detail}")]
pub struct ApplyError {
    pub op: &'static str,
    pub detail: String,
}

// =============================================================================
// Applier contract
// =============================================================================

/// The four operations a display surface must implement.
pub trait HostApplier {
    /// Create a node of `kind` with its initial attributes and style.
    fn create(
        &mut self,
        kind: ElementKind,
        attrs: &AttrSnapshot,
        style: StyleHandle,
    ) -> Result<HostHandle, ApplyError>;

    /// Apply an attribute delta and the new style to an existing node.
    fn apply_update(
        &mut self,
        handle: HostHandle,
        delta: &AttrDelta,
        new_style: StyleHandle,
    ) -> Result<(), ApplyError>;

    /// Remove a node and its subtree from the surface.
    fn remove(&mut self, handle: HostHandle) -> Result<(), ApplyError>;

    /// Insert (or move) `child` under `parent` at `index`.
    fn insert(
        &mut self,
        child: HostHandle,
        parent: HostHandle,
        index: u32,
    ) -> Result<(), ApplyError>;

    /// The surface root everything top-level inserts under.
    fn root(&mut self) -> HostHandle {
        HostHandle::ROOT
    }
}

// =============================================================================
// Recording host (test harness)
// =============================================================================

/// One operation as the recording host saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum AppliedOp {
    Create {
        handle: HostHandle,
        kind: ElementKind,
        attrs: AttrSnapshot,
        style: StyleHandle,
    },
    Update {
        handle: HostHandle,
        delta: AttrDelta,
        new_style: StyleHandle,
    },
    Remove {
        handle: HostHandle,
    },
    Insert {
        child: HostHandle,
        parent: HostHandle,
        index: u32,
    },
}

struct RecordingState {
    next_handle: u64,
    log: Vec<AppliedOp>,
    applied: usize,
    fail_at: Option<usize>,
}

/// The test-harness applier: records the command stream verbatim.
///
/// Cloning shares the underlying log, so tests keep one clone and hand
/// the other to `mount`. `fail_at` makes the Nth operation fail, for
/// exercising host-failure recovery.
#[derive(Clone)]
pub struct RecordingHost {
    state: Rc<RefCell<RecordingState>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(RecordingState {
                next_handle: 1,
                log: Vec::new(),
                applied: 0,
                fail_at: None,
            })),
        }
    }

    /// Snapshot of every operation applied so far.
    pub fn ops(&self) -> Vec<AppliedOp> {
        self.state.borrow().log.clone()
    }

    /// Operations applied since the last `clear`.
    pub fn len(&self) -> usize {
        self.state.borrow().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().log.is_empty()
    }

    /// Forget recorded operations (handle counter keeps running).
    pub fn clear(&self) {
        self.state.borrow_mut().log.clear();
    }

    /// Make the Nth operation from now fail (0 = the very next one).
    pub fn fail_at(&self, nth: usize) {
        let mut state = self.state.borrow_mut();
        let applied = state.applied;
        state.fail_at = Some(applied + nth);
    }

    fn step(&self, op: &'static str) -> Result<(), ApplyError> {
        let mut state = self.state.borrow_mut();
        let at = state.applied;
        state.applied += 1;
        if state.fail_at == Some(at) {
            state.fail_at = None;
            return Err(ApplyError {
                op,
                detail: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostApplier for RecordingHost {
    fn create(
        &mut self,
        kind: ElementKind,
        attrs: &AttrSnapshot,
        style: StyleHandle,
    ) -> Result<HostHandle, ApplyError> {
        self.step("create")?;
        let mut state = self.state.borrow_mut();
        let handle = HostHandle(state.next_handle);
        state.next_handle += 1;
        state.log.push(AppliedOp::Create {
            handle,
            kind,
            attrs: attrs.clone(),
            style,
        });
        Ok(handle)
    }

    fn apply_update(
        &mut self,
        handle: HostHandle,
        delta: &AttrDelta,
        new_style: StyleHandle,
    ) -> Result<(), ApplyError> {
        self.step("update")?;
        self.state.borrow_mut().log.push(AppliedOp::Update {
            handle,
            delta: delta.clone(),
            new_style,
        });
        Ok(())
    }

    fn remove(&mut self, handle: HostHandle) -> Result<(), ApplyError> {
        self.step("remove")?;
        self.state
            .borrow_mut()
            .log
            .push(AppliedOp::Remove { handle });
        Ok(())
    }

    fn insert(
        &mut self,
        child: HostHandle,
        parent: HostHandle,
        index: u32,
    ) -> Result<(), ApplyError> {
        self.step("insert")?;
        self.state.borrow_mut().log.push(AppliedOp::Insert {
            child,
            parent,
            index,
        });
        Ok(())
    }
}

// =============================================================================
// Bound element references
// =============================================================================

struct BoundRefCell {
    target: Cell<Option<NodeId>>,
}

impl SeqClear for BoundRefCell {
    fn clear(&self) {
        self.target.set(None);
    }
}

/// Opaque element reference bridging user code to a retained-tree node
/// identity across passes.
///
/// Scoped to the view or persist arena: a view-scoped ref is cleared when
/// the router crosses a route boundary. Obtain via
/// [`crate::engine::bound_ref`], attach with [`crate::builder::Element::bind`].
#[derive(Clone)]
pub struct BoundRef {
    kind: ArenaKind,
    cell: Rc<BoundRefCell>,
}

impl BoundRef {
    pub(crate) fn new(kind: ArenaKind) -> (Self, Weak<dyn SeqClear>) {
        let cell = Rc::new(BoundRefCell {
            target: Cell::new(None),
        });
        let erased: Rc<dyn SeqClear> = cell.clone();
        (Self { kind, cell }, Rc::downgrade(&erased))
    }

    /// The node identity this ref currently points at.
    pub fn get(&self) -> Option<NodeId> {
        self.cell.target.get()
    }

    pub(crate) fn set(&self, id: NodeId) {
        self.cell.target.set(Some(id));
    }

    /// The arena lifetime this ref is scoped to.
    pub fn kind(&self) -> ArenaKind {
        self.kind
    }
}

// =============================================================================
// Tests
// =============================================================================
