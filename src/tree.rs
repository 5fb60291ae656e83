//! UI nodes, stable identity, and the double-buffered tree store.
//!
//! Nodes are addressed by a deterministic [`NodeId`] - the join key the
//! reconciler uses to correlate nodes between passes. Node records live in
//! a slab; their string payloads live as spans in a store-owned arena so a
//! whole tree is discarded with two bulk clears.
//!
//! Two stores double-buffer: the working store is built during a pass in
//! frame lifetime, the retained store holds the last reconciled tree.
//! On a successful pass they swap, which promotes the working tree without
//! copying a byte.

use std::hash::{Hash, Hasher};
use std::panic::Location;

use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;

use crate::arena::{Arena, ArenaKind, Span};
use crate::builder::handlers::HandlerBinding;
use crate::error::EngineError;
use crate::style::StyleHandle;
use crate::types::{ElementKind, EventKind};

// =============================================================================
// Identity
// =============================================================================

/// Stable node identity.
///
/// Deterministic given the node's path: parent identity, element kind, the
/// builder call site's source salt, the user key (with a per-parent
/// occurrence index for colliding triples) or, when unkeyed, the position
/// among siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// The root sentinel every pass attaches top-level nodes to.
    pub const ROOT: NodeId = NodeId(0);

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Source-location salt provided by the builder call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSalt(u64);

impl SourceSalt {
    /// Salt for the caller's source location.
    #[track_caller]
    pub fn here() -> Self {
        let loc = Location::caller();
        let mut hasher = FxHasher::default();
        loc.file().hash(&mut hasher);
        loc.line().hash(&mut hasher);
        loc.column().hash(&mut hasher);
        Self(hasher.finish())
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Compute a node's stable identity.
///
/// A user key replaces the position in the hash, so keyed siblings keep
/// their identity when the list around them shifts; `occurrence`
/// disambiguates siblings that collide on the full (kind, salt, key)
/// triple.
pub fn node_identity(
    parent: NodeId,
    kind: ElementKind,
    salt: SourceSalt,
    key: Option<&str>,
    occurrence: u32,
    position: u32,
) -> NodeId {
    let mut hasher = FxHasher::default();
    parent.0.hash(&mut hasher);
    (kind as u8).hash(&mut hasher);
    salt.0.hash(&mut hasher);
    match key {
        Some(key) => {
            1u8.hash(&mut hasher);
            key.hash(&mut hasher);
            occurrence.hash(&mut hasher);
        }
        None => {
            0u8.hash(&mut hasher);
            position.hash(&mut hasher);
        }
    }
    NodeId(hasher.finish())
}

// =============================================================================
// Node
// =============================================================================

/// Lifecycle phase; transitions are strictly monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Open,
    Configured,
    Closed,
}

/// Kind-specific attribute payload. String data is spans into the owning
/// store's payload arena.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrPayload {
    Container,
    Text {
        content: Span,
    },
    Image {
        source: Span,
        alt: Option<Span>,
    },
    Button {
        label: Span,
    },
    Input {
        value: Span,
        placeholder: Option<Span>,
    },
    Select {
        options: SmallVec<[Span; 4]>,
        selected: Option<u32>,
    },
    Progress {
        /// Completed fraction in thousandths (0..=1000).
        fraction_milli: u16,
    },
    Link {
        target: Span,
    },
}

impl AttrPayload {
    /// The default payload for a freshly opened node of `kind`.
    pub fn seed(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Container => Self::Container,
            ElementKind::Text => Self::Text { content: Span::EMPTY },
            ElementKind::Image => Self::Image {
                source: Span::EMPTY,
                alt: None,
            },
            ElementKind::Button => Self::Button { label: Span::EMPTY },
            ElementKind::Input => Self::Input {
                value: Span::EMPTY,
                placeholder: None,
            },
            ElementKind::Select => Self::Select {
                options: SmallVec::new(),
                selected: None,
            },
            ElementKind::Progress => Self::Progress { fraction_milli: 0 },
            ElementKind::Link => Self::Link { target: Span::EMPTY },
        }
    }
}

/// One node of a virtual tree.
///
/// The parent link is an identity, not a pointer: upward navigation goes
/// through the store's index, which keeps the ownership graph acyclic.
#[derive(Debug, Clone)]
pub struct UiNode {
    pub id: NodeId,
    pub kind: ElementKind,
    pub style: StyleHandle,
    pub attrs: AttrPayload,
    pub key: Option<Span>,
    pub children: SmallVec<[NodeId; 4]>,
    pub parent: NodeId,
    pub phase: Phase,
    pub handlers: SmallVec<[(EventKind, HandlerBinding); 2]>,
}

impl UiNode {
    fn root() -> Self {
        Self {
            id: NodeId::ROOT,
            kind: ElementKind::Container,
            style: StyleHandle::UNSET,
            attrs: AttrPayload::Container,
            key: None,
            children: SmallVec::new(),
            parent: NodeId::ROOT,
            phase: Phase::Closed,
            handlers: SmallVec::new(),
        }
    }

    /// Handler binding for an event kind, if any.
    pub fn handler(&self, kind: EventKind) -> Option<&HandlerBinding> {
        self.handlers
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, b)| b)
    }
}

// =============================================================================
// TreeStore
// =============================================================================

/// One buffer of the double-buffered tree pair: a node slab, an identity
/// index, and the arena holding node string payloads.
pub struct TreeStore {
    nodes: Vec<UiNode>,
    index: FxHashMap<NodeId, u32>,
    payload: Arena,
}

impl TreeStore {
    pub fn new() -> Self {
        let mut store = Self {
            nodes: Vec::new(),
            index: FxHashMap::default(),
            payload: Arena::new(ArenaKind::Frame),
        };
        store.install_root();
        store
    }

    fn install_root(&mut self) {
        self.nodes.push(UiNode::root());
        self.index.insert(NodeId::ROOT, 0);
    }

    /// Discard every node and payload byte, leaving only a fresh root.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.payload.reset();
        self.install_root();
    }

    /// Insert a node, charging the payload arena for the record.
    ///
    /// The caller (the lifecycle stack) is responsible for occurrence
    /// disambiguation; a duplicate identity reaching the store is the
    /// unresolved-collision error.
    pub fn insert(&mut self, node: UiNode) -> Result<(), EngineError> {
        if self.index.contains_key(&node.id) {
            return Err(EngineError::IdentityCollision {
                parent: node.parent,
            });
        }
        self.payload.charge(std::mem::size_of::<UiNode>())?;
        let slot = self.nodes.len() as u32;
        self.index.insert(node.id, slot);
        self.nodes.push(node);
        Ok(())
    }

    pub fn get(&self, id: NodeId) -> Option<&UiNode> {
        self.index
            .get(&id)
            .map(|&slot| &self.nodes[slot as usize])
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut UiNode> {
        match self.index.get(&id) {
            Some(&slot) => Some(&mut self.nodes[slot as usize]),
            None => None,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Child identities of a node; empty if absent.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Duplicate a string into this store's payload arena.
    pub fn alloc_str(&mut self, s: &str) -> Result<Span, EngineError> {
        self.payload.alloc_str(s)
    }

    pub fn str_at(&self, span: Span) -> &str {
        self.payload.str_at(span)
    }

    pub fn opt_str(&self, span: Option<Span>) -> Option<&str> {
        span.map(|s| self.payload.str_at(s))
    }

    /// A node's user key as a string, if it has one.
    pub fn key_of(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| self.opt_str(n.key))
    }

    /// Node count including the root sentinel.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Bytes used by node records and payloads this pass.
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Install or clear the frame byte budget for this store.
    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.payload.set_limit(limit);
    }

    /// Check that the identity index matches the structure: every index
    /// entry points at a node carrying that identity, and every child
    /// reference resolves. The reconciler runs this before trusting the
    /// retained tree.
    pub fn verify_index(&self) -> bool {
        if self.index.len() != self.nodes.len() {
            return false;
        }
        for (&id, &slot) in &self.index {
            match self.nodes.get(slot as usize) {
                Some(node) if node.id == id => {}
                _ => return false,
            }
        }
        for node in &self.nodes {
            for child in &node.children {
                if !self.index.contains_key(child) {
                    return false;
                }
            }
        }
        true
    }

    /// All descendants of a node (the node itself excluded), depth-first.
    pub fn descendants_of(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children_of(id).to_vec();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend_from_slice(self.children_of(current));
        }
        out
    }

    /// Test hook: corrupt the index to exercise the reconciler fallback.
    #[cfg(test)]
    pub(crate) fn corrupt_index_for_test(&mut self) {
        self.index.insert(NodeId(u64::MAX), 9999);
    }
}

impl Default for TreeStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
