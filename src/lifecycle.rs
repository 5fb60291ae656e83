//! Lifecycle stack - the open/configure/close protocol.
//!
//! Tree construction happens through a global LIFO stack of currently-open
//! nodes: `open` pushes a node whose parent is the stack top, `configure`
//! updates the top in place, `close` pops it and seals its child list. The
//! stack's depth always equals the tree depth at which the next `open`
//! would attach.
//!
//! Faults never unwind through builder calls. The first violation is
//! recorded, subsequent operations become no-ops, and the driver discards
//! the pass when `finish_pass` reports the fault.

use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};

use crate::builder::handlers::HandlerBinding;
use crate::error::{EngineError, LifecycleFault};
use crate::style::StyleHandle;
use crate::tree::{node_identity, AttrPayload, NodeId, Phase, SourceSalt, TreeStore, UiNode};
use crate::types::{ElementKind, EventKind};

// =============================================================================
// Open frames
// =============================================================================

struct OpenFrame {
    node: NodeId,
    children: SmallVec<[NodeId; 4]>,
    /// Occurrence counters keyed by (kind, salt, key) triple hash.
    occurrences: FxHashMap<u64, u32>,
    /// Count of children opened under this frame so far (position source).
    opened: u32,
}

impl OpenFrame {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            children: SmallVec::new(),
            occurrences: FxHashMap::default(),
            opened: 0,
        }
    }
}

fn triple_hash(kind: ElementKind, salt: SourceSalt, key: Option<&str>) -> u64 {
    let mut hasher = FxHasher::default();
    (kind as u8).hash(&mut hasher);
    salt.raw().hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish()
}

// =============================================================================
// LifecycleStack
// =============================================================================

/// The global builder stack for the pass in flight.
pub struct LifecycleStack {
    frames: Vec<OpenFrame>,
    fault: Option<EngineError>,
}

impl LifecycleStack {
    pub fn new() -> Self {
        Self {
            frames: vec![OpenFrame::new(NodeId::ROOT)],
            fault: None,
        }
    }

    /// Reset for a fresh pass: only the root frame, no fault.
    pub fn begin_pass(&mut self) {
        self.frames.clear();
        self.frames.push(OpenFrame::new(NodeId::ROOT));
        self.fault = None;
    }

    /// Open depth above the root frame.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// The first fault recorded this pass, if any.
    pub fn fault(&self) -> Option<&EngineError> {
        self.fault.as_ref()
    }

    fn record_fault(&mut self, error: EngineError) {
        if self.fault.is_none() {
            log::error!("render pass fault: {error}");
            self.fault = Some(error);
        }
    }

    /// Record a fault raised outside the stack itself (allocation or
    /// interning failure at a commit point).
    pub(crate) fn fault_with(&mut self, error: EngineError) {
        self.record_fault(error);
    }

    /// Push a new node under the current stack top.
    ///
    /// Returns the assigned identity, or None once the pass has faulted.
    pub fn open(
        &mut self,
        store: &mut TreeStore,
        kind: ElementKind,
        salt: SourceSalt,
        key: Option<&str>,
    ) -> Option<NodeId> {
        if self.fault.is_some() {
            return None;
        }

        let frame = self.frames.last_mut().expect("root frame always present");
        let parent = frame.node;
        let position = frame.opened;
        frame.opened += 1;

        let occurrence = {
            let counter = frame.occurrences.entry(triple_hash(kind, salt, key)).or_insert(0);
            let occ = *counter;
            *counter += 1;
            occ
        };
        if occurrence > 0 && key.is_some() {
            log::warn!(
                "sibling collision under {parent:?}: duplicate ({kind:?}, key {key:?}) \
                 disambiguated by occurrence {occurrence}; keying may degrade to positional"
            );
        }

        // Deterministic sibling-index disambiguation: bump the occurrence
        // until the identity is unique under this parent.
        let mut occ_try = occurrence;
        let id = loop {
            let candidate = node_identity(parent, kind, salt, key, occ_try, position);
            if !store.contains(candidate) {
                break candidate;
            }
            occ_try += 1;
        };

        let key_span = match key {
            Some(k) => match store.alloc_str(k) {
                Ok(span) => Some(span),
                Err(err) => {
                    self.record_fault(err);
                    return None;
                }
            },
            None => None,
        };

        let node = UiNode {
            id,
            kind,
            style: StyleHandle::UNSET,
            attrs: AttrPayload::seed(kind),
            key: key_span,
            children: SmallVec::new(),
            parent,
            phase: Phase::Open,
            handlers: SmallVec::new(),
        };
        if let Err(err) = store.insert(node) {
            self.record_fault(err);
            return None;
        }

        self.frames.push(OpenFrame::new(id));
        Some(id)
    }

    /// Configure the top-of-stack node: style handle, attribute payload,
    /// handler bindings. Only legal while the node is still open.
    pub fn configure(
        &mut self,
        store: &mut TreeStore,
        style: StyleHandle,
        attrs: AttrPayload,
        handlers: SmallVec<[(EventKind, HandlerBinding); 2]>,
    ) {
        if self.fault.is_some() {
            return;
        }
        if self.frames.len() == 1 {
            self.record_fault(EngineError::LifecycleImbalance(
                LifecycleFault::ConfigureAfterSeal,
            ));
            return;
        }
        let id = self.frames.last().expect("checked above").node;
        let Some(node) = store.get_mut(id) else {
            self.record_fault(EngineError::ReconcilerInconsistency);
            return;
        };
        if node.phase != Phase::Open {
            self.record_fault(EngineError::LifecycleImbalance(
                LifecycleFault::ConfigureAfterSeal,
            ));
            return;
        }
        node.style = style;
        node.attrs = attrs;
        node.handlers = handlers;
        node.phase = Phase::Configured;
    }

    /// Pop the top of the stack, sealing its child list to the nodes
    /// opened and closed while it was the top.
    pub fn close(&mut self, store: &mut TreeStore) -> Option<NodeId> {
        if self.fault.is_some() {
            return None;
        }
        if self.frames.len() == 1 {
            self.record_fault(EngineError::LifecycleImbalance(LifecycleFault::CloseOnEmpty));
            return None;
        }
        let frame = self.frames.pop().expect("checked above");
        let id = frame.node;
        if let Some(node) = store.get_mut(id) {
            node.children = frame.children;
            node.phase = Phase::Closed;
        }
        self.frames
            .last_mut()
            .expect("root frame always present")
            .children
            .push(id);
        Some(id)
    }

    /// End the pass: the stack must be balanced back to the root frame.
    /// Seals the root's child list and returns the first recorded fault,
    /// if any.
    pub fn finish_pass(&mut self, store: &mut TreeStore) -> Result<(), EngineError> {
        if let Some(fault) = self.fault.take() {
            return Err(fault);
        }
        if self.frames.len() != 1 {
            let depth = self.depth();
            return Err(EngineError::LifecycleImbalance(
                LifecycleFault::StackNotEmpty { depth },
            ));
        }
        let frame = self.frames.last_mut().expect("root frame always present");
        let children = std::mem::take(&mut frame.children);
        if let Some(root) = store.get_mut(NodeId::ROOT) {
            root.children = children;
        }
        Ok(())
    }
}

impl Default for LifecycleStack {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
