//! Command records - the output vocabulary of the reconciler.
//!
//! A pass produces three disjoint arrays: removes, updates, adds. The
//! host applies them in exactly that order, each array in emission order;
//! the reconciler is the single source of ordering decisions.

use crate::style::StyleHandle;
use crate::tree::NodeId;
use crate::types::{ElementKind, EventKind};

// =============================================================================
// Node specs
// =============================================================================

/// Owned, span-free attribute data, safe to hand across the host boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrSnapshot {
    Container,
    Text {
        content: String,
    },
    Image {
        source: String,
        alt: Option<String>,
    },
    Button {
        label: String,
    },
    Input {
        value: String,
        placeholder: Option<String>,
    },
    Select {
        options: Vec<String>,
        selected: Option<u32>,
    },
    Progress {
        fraction_milli: u16,
    },
    Link {
        target: String,
    },
}

/// Full spec of one node and its subtree, carried by an add command.
/// One add covers a whole unmatched subtree; descendants appear only
/// inside the payload, never as separate commands.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub id: NodeId,
    pub kind: ElementKind,
    pub style: StyleHandle,
    pub attrs: AttrSnapshot,
    pub key: Option<String>,
    /// Handler bindings as (event kind, diff-stable handler identity).
    pub handlers: Vec<(EventKind, u64)>,
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    /// Nodes in this spec including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeSpec::node_count).sum::<usize>()
    }

    fn collect_ids(&self, out: &mut Vec<NodeId>) {
        out.push(self.id);
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}

// =============================================================================
// Attribute deltas
// =============================================================================

/// One changed attribute on a matched node.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrChange {
    Text { from: String, to: String },
    Source { from: String, to: String },
    Alt { from: Option<String>, to: Option<String> },
    Label { from: String, to: String },
    Value { from: String, to: String },
    Placeholder { from: Option<String>, to: Option<String> },
    Options { from: Vec<String>, to: Vec<String> },
    Selected { from: Option<u32>, to: Option<u32> },
    Fraction { from: u16, to: u16 },
    Target { from: String, to: String },
    Handlers {
        from: Vec<(EventKind, u64)>,
        to: Vec<(EventKind, u64)>,
    },
}

/// Per-field diff of a matched node's kind-specific attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttrDelta {
    pub changes: Vec<AttrChange>,
}

impl AttrDelta {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn push(&mut self, change: AttrChange) {
        self.changes.push(change);
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Insert a new subtree under `parent` at `index` in its child list.
#[derive(Debug, Clone, PartialEq)]
pub struct AddCommand {
    pub parent: NodeId,
    pub index: u32,
    pub spec: NodeSpec,
}

/// Remove the node (and implicitly its subtree) from the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveCommand {
    pub node: NodeId,
}

/// In-place update of a matched node.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCommand {
    /// The identity the host knows (the retained-tree side of the match).
    pub node: NodeId,
    pub parent: NodeId,
    pub delta: AttrDelta,
    pub old_style: StyleHandle,
    pub new_style: StyleHandle,
    /// Reorder hint: the node's new index among its parent's children.
    pub move_to: Option<u32>,
    /// When the pair was matched by key or position rather than identity,
    /// the identity the node carries from this pass on.
    pub migrate: Option<NodeId>,
}

impl UpdateCommand {
    /// Whether this update changes anything the host can observe.
    pub fn is_effective(&self) -> bool {
        !self.delta.is_empty()
            || self.old_style != self.new_style
            || self.move_to.is_some()
            || self.migrate.is_some()
    }
}

/// The reconciler's output for one pass: three disjoint command arrays,
/// applied removes first, then updates, then adds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSet {
    pub removes: Vec<RemoveCommand>,
    pub updates: Vec<UpdateCommand>,
    pub adds: Vec<AddCommand>,
}

impl CommandSet {
    pub fn is_empty(&self) -> bool {
        self.removes.is_empty() && self.updates.is_empty() && self.adds.is_empty()
    }

    /// Total command count across the three arrays.
    pub fn len(&self) -> usize {
        self.removes.len() + self.updates.len() + self.adds.len()
    }

    /// Check the disjointness invariant: no node identity appears in more
    /// than one of the three sets (added subtree payloads included).
    pub fn is_disjoint(&self) -> bool {
        let mut seen = rustc_hash::FxHashSet::default();
        for remove in &self.removes {
            if !seen.insert(remove.node) {
                return false;
            }
        }
        for update in &self.updates {
            if !seen.insert(update.node) {
                return false;
            }
        }
        let mut added = Vec::new();
        for add in &self.adds {
            add.spec.collect_ids(&mut added);
        }
        for id in added {
            if !seen.insert(id) {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// Tests
// =============================================================================
