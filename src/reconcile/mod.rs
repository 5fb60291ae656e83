//! Reconciler - diffs two virtual trees into three command arrays.
//!
//! Both trees are walked breadth-first in lockstep. At each matched
//! parent, children pair by stable identity first, then user key, then
//! position. Unmatched new children become adds (one command per
//! subtree), unmatched retained children become removes, matched pairs
//! produce at most one update each and recurse.
//!
//! When the matched subset of a parent's children is a permutation of the
//! retained subset, moved nodes get reorder hints on their updates
//! instead of remove/add pairs; the stationary subset is the longest
//! increasing subsequence of retained positions, so hint count is minimal
//! and the keyed-reorder cost is O(k log k) per parent.

pub mod command;

pub use command::{
    AddCommand, AttrChange, AttrDelta, AttrSnapshot, CommandSet, NodeSpec, RemoveCommand,
    UpdateCommand,
};

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::error::EngineError;
use crate::tree::{AttrPayload, NodeId, TreeStore, UiNode};
use crate::types::EventKind;

// =============================================================================
// Entry points
// =============================================================================

/// Diff the just-built tree against the retained tree.
///
/// Fails with [`EngineError::ReconcilerInconsistency`] when the retained
/// tree's identity index does not match its structure; the driver then
/// falls back to [`full_replace`].
pub fn reconcile(new: &TreeStore, retained: &TreeStore) -> Result<CommandSet, EngineError> {
    if !retained.verify_index() {
        return Err(EngineError::ReconcilerInconsistency);
    }

    let mut set = CommandSet::default();
    let mut queue = VecDeque::new();
    queue.push_back((NodeId::ROOT, NodeId::ROOT));
    while let Some((new_parent, ret_parent)) = queue.pop_front() {
        pair_children(new, retained, new_parent, ret_parent, &mut set, &mut queue);
    }
    Ok(set)
}

/// Remove everything retained and add everything new: the recovery path
/// for an inconsistent retained tree or an invalidated host surface.
pub fn full_replace(new: &TreeStore, retained: &TreeStore) -> CommandSet {
    let mut set = CommandSet::default();
    for &old_root in retained.children_of(NodeId::ROOT) {
        set.removes.push(RemoveCommand { node: old_root });
    }
    for (index, &new_root) in new.children_of(NodeId::ROOT).iter().enumerate() {
        set.adds.push(AddCommand {
            parent: NodeId::ROOT,
            index: index as u32,
            spec: build_spec(new, new_root),
        });
    }
    set
}

// =============================================================================
// Child pairing
// =============================================================================

fn pair_children(
    new: &TreeStore,
    retained: &TreeStore,
    new_parent: NodeId,
    ret_parent: NodeId,
    set: &mut CommandSet,
    queue: &mut VecDeque<(NodeId, NodeId)>,
) {
    let new_children = new.children_of(new_parent);
    let ret_children = retained.children_of(ret_parent);

    let ret_pos: FxHashMap<NodeId, usize> = ret_children
        .iter()
        .enumerate()
        .map(|(j, &id)| (id, j))
        .collect();
    let mut ret_used = vec![false; ret_children.len()];
    let mut matched: Vec<Option<usize>> = vec![None; new_children.len()];

    // Pass 1: stable identity.
    for (i, nc) in new_children.iter().enumerate() {
        if let Some(&j) = ret_pos.get(nc) {
            if !ret_used[j] {
                matched[i] = Some(j);
                ret_used[j] = true;
            }
        }
    }

    // Pass 2: user key (same kind required).
    let mut ret_by_key: FxHashMap<(&str, u8), VecDeque<usize>> = FxHashMap::default();
    for (j, &rc) in ret_children.iter().enumerate() {
        if ret_used[j] {
            continue;
        }
        if let Some(key) = retained.key_of(rc) {
            let kind = retained.get(rc).map(|n| n.kind as u8).unwrap_or(0);
            ret_by_key.entry((key, kind)).or_default().push_back(j);
        }
    }
    for (i, &nc) in new_children.iter().enumerate() {
        if matched[i].is_some() {
            continue;
        }
        let Some(key) = new.key_of(nc) else { continue };
        let kind = new.get(nc).map(|n| n.kind as u8).unwrap_or(0);
        if let Some(bucket) = ret_by_key.get_mut(&(key, kind)) {
            if let Some(j) = bucket.pop_front() {
                matched[i] = Some(j);
                ret_used[j] = true;
            }
        }
    }

    // Pass 3: position (same kind required); greedy in order.
    let mut cursor = 0usize;
    for (i, &nc) in new_children.iter().enumerate() {
        if matched[i].is_some() {
            continue;
        }
        let kind = new.get(nc).map(|n| n.kind);
        while cursor < ret_children.len() {
            let j = cursor;
            cursor += 1;
            if ret_used[j] {
                continue;
            }
            // Keyed leftovers stay unmatched so their removal is explicit.
            if retained.key_of(ret_children[j]).is_some() {
                continue;
            }
            if retained.get(ret_children[j]).map(|n| n.kind) == kind {
                matched[i] = Some(j);
                ret_used[j] = true;
                break;
            }
        }
    }

    // Removes: unmatched retained children, one command per subtree.
    for (j, &rc) in ret_children.iter().enumerate() {
        if !ret_used[j] {
            set.removes.push(RemoveCommand { node: rc });
        }
    }

    // Updates: matched pairs, with reorder hints off the LIS of retained
    // positions.
    let pairs: Vec<(usize, usize)> = matched
        .iter()
        .enumerate()
        .filter_map(|(i, m)| m.map(|j| (i, j)))
        .collect();
    let retained_order: Vec<usize> = pairs.iter().map(|&(_, j)| j).collect();
    let stationary = lis_mask(&retained_order);

    for (pair_idx, &(i, j)) in pairs.iter().enumerate() {
        let nc = new_children[i];
        let rc = ret_children[j];
        let (Some(n_node), Some(r_node)) = (new.get(nc), retained.get(rc)) else {
            continue;
        };

        let delta = diff_attrs(new, n_node, retained, r_node);
        let migrate = (nc != rc).then_some(nc);
        let move_to = (!stationary[pair_idx]).then_some(i as u32);
        let update = UpdateCommand {
            node: rc,
            parent: new_parent,
            delta,
            old_style: r_node.style,
            new_style: n_node.style,
            move_to,
            migrate,
        };
        if update.is_effective() {
            set.updates.push(update);
        }
        queue.push_back((nc, rc));
    }

    // Adds: unmatched new children at their new-tree index.
    for (i, &nc) in new_children.iter().enumerate() {
        if matched[i].is_none() {
            set.adds.push(AddCommand {
                parent: new_parent,
                index: i as u32,
                spec: build_spec(new, nc),
            });
        }
    }
}

/// Boolean mask of one longest strictly-increasing subsequence of `seq`.
/// Elements outside the mask are the ones that moved.
fn lis_mask(seq: &[usize]) -> Vec<bool> {
    let n = seq.len();
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        let pos = tails.partition_point(|&t| seq[t] < seq[i]);
        if pos > 0 {
            prev[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }
    let mut mask = vec![false; n];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        mask[i] = true;
        cursor = prev[i];
    }
    mask
}

// =============================================================================
// Attribute diffing and specs
// =============================================================================

fn handler_ids(node: &UiNode) -> Vec<(EventKind, u64)> {
    node.handlers.iter().map(|(k, b)| (*k, b.id())).collect()
}

fn diff_attrs(new: &TreeStore, n: &UiNode, retained: &TreeStore, r: &UiNode) -> AttrDelta {
    let mut delta = AttrDelta::default();

    match (&r.attrs, &n.attrs) {
        (AttrPayload::Container, AttrPayload::Container) => {}
        (AttrPayload::Text { content: rc }, AttrPayload::Text { content: nc }) => {
            let from = retained.str_at(*rc);
            let to = new.str_at(*nc);
            if from != to {
                delta.push(AttrChange::Text {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
        }
        (
            AttrPayload::Image {
                source: rs,
                alt: ra,
            },
            AttrPayload::Image {
                source: ns,
                alt: na,
            },
        ) => {
            let from = retained.str_at(*rs);
            let to = new.str_at(*ns);
            if from != to {
                delta.push(AttrChange::Source {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
            let from_alt = retained.opt_str(*ra).map(String::from);
            let to_alt = new.opt_str(*na).map(String::from);
            if from_alt != to_alt {
                delta.push(AttrChange::Alt {
                    from: from_alt,
                    to: to_alt,
                });
            }
        }
        (AttrPayload::Button { label: rl }, AttrPayload::Button { label: nl }) => {
            let from = retained.str_at(*rl);
            let to = new.str_at(*nl);
            if from != to {
                delta.push(AttrChange::Label {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
        }
        (
            AttrPayload::Input {
                value: rv,
                placeholder: rp,
            },
            AttrPayload::Input {
                value: nv,
                placeholder: np,
            },
        ) => {
            let from = retained.str_at(*rv);
            let to = new.str_at(*nv);
            if from != to {
                delta.push(AttrChange::Value {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
            let from_ph = retained.opt_str(*rp).map(String::from);
            let to_ph = new.opt_str(*np).map(String::from);
            if from_ph != to_ph {
                delta.push(AttrChange::Placeholder {
                    from: from_ph,
                    to: to_ph,
                });
            }
        }
        (
            AttrPayload::Select {
                options: ro,
                selected: rsel,
            },
            AttrPayload::Select {
                options: no,
                selected: nsel,
            },
        ) => {
            let from: Vec<String> = ro.iter().map(|&s| retained.str_at(s).to_string()).collect();
            let to: Vec<String> = no.iter().map(|&s| new.str_at(s).to_string()).collect();
            if from != to {
                delta.push(AttrChange::Options { from, to });
            }
            if rsel != nsel {
                delta.push(AttrChange::Selected {
                    from: *rsel,
                    to: *nsel,
                });
            }
        }
        (
            AttrPayload::Progress { fraction_milli: rf },
            AttrPayload::Progress { fraction_milli: nf },
        ) => {
            if rf != nf {
                delta.push(AttrChange::Fraction { from: *rf, to: *nf });
            }
        }
        (AttrPayload::Link { target: rt }, AttrPayload::Link { target: nt }) => {
            let from = retained.str_at(*rt);
            let to = new.str_at(*nt);
            if from != to {
                delta.push(AttrChange::Target {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
        }
        // Kind mismatches never reach here: pairing requires equal kinds.
        _ => {}
    }

    let from_handlers = handler_ids(r);
    let to_handlers = handler_ids(n);
    if from_handlers != to_handlers {
        delta.push(AttrChange::Handlers {
            from: from_handlers,
            to: to_handlers,
        });
    }

    delta
}

/// Owned snapshot of a node's attributes, spans resolved.
pub(crate) fn snapshot_attrs(store: &TreeStore, node: &UiNode) -> AttrSnapshot {
    match &node.attrs {
        AttrPayload::Container => AttrSnapshot::Container,
        AttrPayload::Text { content } => AttrSnapshot::Text {
            content: store.str_at(*content).to_string(),
        },
        AttrPayload::Image { source, alt } => AttrSnapshot::Image {
            source: store.str_at(*source).to_string(),
            alt: store.opt_str(*alt).map(String::from),
        },
        AttrPayload::Button { label } => AttrSnapshot::Button {
            label: store.str_at(*label).to_string(),
        },
        AttrPayload::Input { value, placeholder } => AttrSnapshot::Input {
            value: store.str_at(*value).to_string(),
            placeholder: store.opt_str(*placeholder).map(String::from),
        },
        AttrPayload::Select { options, selected } => AttrSnapshot::Select {
            options: options.iter().map(|&s| store.str_at(s).to_string()).collect(),
            selected: *selected,
        },
        AttrPayload::Progress { fraction_milli } => AttrSnapshot::Progress {
            fraction_milli: *fraction_milli,
        },
        AttrPayload::Link { target } => AttrSnapshot::Link {
            target: store.str_at(*target).to_string(),
        },
    }
}

/// Full spec of a subtree, for add commands.
pub(crate) fn build_spec(store: &TreeStore, id: NodeId) -> NodeSpec {
    let node = store.get(id).expect("spec id resolves in its own store");
    NodeSpec {
        id,
        kind: node.kind,
        style: node.style,
        attrs: snapshot_attrs(store, node),
        key: store.key_of(id).map(String::from),
        handlers: handler_ids(node),
        children: node
            .children
            .iter()
            .map(|&child| build_spec(store, child))
            .collect(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleHandle;
    use crate::tree::{node_identity, Phase, SourceSalt, UiNode};
    use crate::types::ElementKind;
    use smallvec::SmallVec;

    fn push_node(
        store: &mut TreeStore,
        parent: NodeId,
        kind: ElementKind,
        salt: SourceSalt,
        key: Option<&str>,
        content: Option<&str>,
        style: StyleHandle,
    ) -> NodeId {
        let position = store.children_of(parent).len() as u32;
        let id = node_identity(parent, kind, salt, key, 0, position);
        let key_span = key.map(|k| store.alloc_str(k).unwrap());
        let attrs = match (kind, content) {
            (ElementKind::Text, Some(text)) => AttrPayload::Text {
                content: store.alloc_str(text).unwrap(),
            },
            _ => AttrPayload::seed(kind),
        };
        store
            .insert(UiNode {
                id,
                kind,
                style,
                attrs,
                key: key_span,
                children: SmallVec::new(),
                parent,
                phase: Phase::Closed,
                handlers: SmallVec::new(),
            })
            .unwrap();
        store.get_mut(parent).unwrap().children.push(id);
        id
    }

    #[test]
    fn test_identical_trees_emit_nothing() {
        let salt = SourceSalt::here();
        let mut a = TreeStore::new();
        let mut b = TreeStore::new();
        for store in [&mut a, &mut b] {
            let c = push_node(
                store,
                NodeId::ROOT,
                ElementKind::Container,
                salt,
                None,
                None,
                StyleHandle::UNSET,
            );
            push_node(
                store,
                c,
                ElementKind::Text,
                salt,
                None,
                Some("0"),
                StyleHandle::UNSET,
            );
        }

        let set = reconcile(&a, &b).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_text_change_is_one_update() {
        let salt_c = SourceSalt::here();
        let salt_t = SourceSalt::here();

        let mut retained = TreeStore::new();
        let c = push_node(
            &mut retained,
            NodeId::ROOT,
            ElementKind::Container,
            salt_c,
            None,
            None,
            StyleHandle::UNSET,
        );
        let text_id = push_node(
            &mut retained,
            c,
            ElementKind::Text,
            salt_t,
            None,
            Some("0"),
            StyleHandle::UNSET,
        );

        let mut new = TreeStore::new();
        let c2 = push_node(
            &mut new,
            NodeId::ROOT,
            ElementKind::Container,
            salt_c,
            None,
            None,
            StyleHandle::UNSET,
        );
        push_node(
            &mut new,
            c2,
            ElementKind::Text,
            salt_t,
            None,
            Some("1"),
            StyleHandle::UNSET,
        );

        let set = reconcile(&new, &retained).unwrap();
        assert!(set.removes.is_empty());
        assert!(set.adds.is_empty());
        assert_eq!(set.updates.len(), 1);

        let update = &set.updates[0];
        assert_eq!(update.node, text_id);
        assert_eq!(
            update.delta.changes,
            vec![AttrChange::Text {
                from: "0".to_string(),
                to: "1".to_string()
            }]
        );
        assert!(set.is_disjoint());
    }

    #[test]
    fn test_keyed_head_insertion_is_one_add() {
        let salt_list = SourceSalt::here();
        let salt_item = SourceSalt::here();

        let mut retained = TreeStore::new();
        let list = push_node(
            &mut retained,
            NodeId::ROOT,
            ElementKind::Container,
            salt_list,
            None,
            None,
            StyleHandle::UNSET,
        );
        for key in ["b", "c", "d"] {
            push_node(
                &mut retained,
                list,
                ElementKind::Container,
                salt_item,
                Some(key),
                None,
                StyleHandle::UNSET,
            );
        }

        let mut new = TreeStore::new();
        let list2 = push_node(
            &mut new,
            NodeId::ROOT,
            ElementKind::Container,
            salt_list,
            None,
            None,
            StyleHandle::UNSET,
        );
        for key in ["a", "b", "c", "d"] {
            push_node(
                &mut new,
                list2,
                ElementKind::Container,
                salt_item,
                Some(key),
                None,
                StyleHandle::UNSET,
            );
        }

        let set = reconcile(&new, &retained).unwrap();
        assert!(set.removes.is_empty());
        assert!(set.updates.is_empty(), "updates: {:?}", set.updates);
        assert_eq!(set.adds.len(), 1);
        assert_eq!(set.adds[0].index, 0);
        assert_eq!(set.adds[0].spec.key.as_deref(), Some("a"));
        assert_eq!(set.adds[0].parent, list);
    }

    #[test]
    fn test_keyed_reorder_emits_move_hints_only() {
        let salt_list = SourceSalt::here();
        let salt_item = SourceSalt::here();

        let build = |keys: &[&str]| {
            let mut store = TreeStore::new();
            let list = push_node(
                &mut store,
                NodeId::ROOT,
                ElementKind::Container,
                salt_list,
                None,
                None,
                StyleHandle::UNSET,
            );
            for key in keys {
                push_node(
                    &mut store,
                    list,
                    ElementKind::Container,
                    salt_item,
                    Some(key),
                    None,
                    StyleHandle::UNSET,
                );
            }
            store
        };

        let retained = build(&["a", "b", "c"]);
        let new = build(&["c", "a", "b"]);

        let set = reconcile(&new, &retained).unwrap();
        assert!(set.adds.is_empty());
        assert!(set.removes.is_empty());
        assert!(!set.updates.is_empty());
        // Moving "c" to the front is the minimal hint set.
        assert_eq!(set.updates.len(), 1);
        assert_eq!(set.updates[0].move_to, Some(0));
        assert!(set.is_disjoint());
    }

    #[test]
    fn test_removed_subtree_is_one_remove() {
        let salt_c = SourceSalt::here();
        let salt_inner = SourceSalt::here();
        let salt_t = SourceSalt::here();

        let mut retained = TreeStore::new();
        let keep = push_node(
            &mut retained,
            NodeId::ROOT,
            ElementKind::Container,
            salt_c,
            Some("keep"),
            None,
            StyleHandle::UNSET,
        );
        let gone = push_node(
            &mut retained,
            NodeId::ROOT,
            ElementKind::Container,
            salt_c,
            Some("gone"),
            None,
            StyleHandle::UNSET,
        );
        let inner = push_node(
            &mut retained,
            gone,
            ElementKind::Container,
            salt_inner,
            None,
            None,
            StyleHandle::UNSET,
        );
        push_node(
            &mut retained,
            inner,
            ElementKind::Text,
            salt_t,
            None,
            Some("deep"),
            StyleHandle::UNSET,
        );

        let mut new = TreeStore::new();
        push_node(
            &mut new,
            NodeId::ROOT,
            ElementKind::Container,
            salt_c,
            Some("keep"),
            None,
            StyleHandle::UNSET,
        );

        let set = reconcile(&new, &retained).unwrap();
        assert_eq!(set.removes, vec![RemoveCommand { node: gone }]);
        assert!(set.adds.is_empty());
        assert!(set.updates.is_empty());
        let _ = keep;
    }

    #[test]
    fn test_kind_change_is_remove_plus_add() {
        let salt = SourceSalt::here();

        let mut retained = TreeStore::new();
        let old = push_node(
            &mut retained,
            NodeId::ROOT,
            ElementKind::Text,
            salt,
            None,
            Some("was text"),
            StyleHandle::UNSET,
        );

        let mut new = TreeStore::new();
        push_node(
            &mut new,
            NodeId::ROOT,
            ElementKind::Container,
            salt,
            None,
            None,
            StyleHandle::UNSET,
        );

        let set = reconcile(&new, &retained).unwrap();
        assert_eq!(set.removes, vec![RemoveCommand { node: old }]);
        assert_eq!(set.adds.len(), 1);
        assert!(set.updates.is_empty());
        assert!(set.is_disjoint());
    }

    #[test]
    fn test_positional_match_migrates_identity() {
        // The same position rendered from a different call site (say, the
        // other branch of a conditional): identity differs, no keys, so
        // the pair matches positionally and the identity migrates.
        let salt_old = SourceSalt::here();
        let salt_new = SourceSalt::here();

        let mut retained = TreeStore::new();
        let old = push_node(
            &mut retained,
            NodeId::ROOT,
            ElementKind::Text,
            salt_old,
            None,
            Some("same"),
            StyleHandle::UNSET,
        );

        let mut new = TreeStore::new();
        let fresh = push_node(
            &mut new,
            NodeId::ROOT,
            ElementKind::Text,
            salt_new,
            None,
            Some("same"),
            StyleHandle::UNSET,
        );
        assert_ne!(old, fresh);

        let set = reconcile(&new, &retained).unwrap();
        assert!(set.removes.is_empty());
        assert!(set.adds.is_empty());
        assert_eq!(set.updates.len(), 1);
        let update = &set.updates[0];
        assert_eq!(update.node, old);
        assert_eq!(update.migrate, Some(fresh));
        // Content is identical; only the identity migrated.
        assert!(update.delta.is_empty());
    }

    #[test]
    fn test_style_handle_change_is_update() {
        let salt = SourceSalt::here();
        let styled = StyleHandle::UNSET;

        let mut retained = TreeStore::new();
        push_node(
            &mut retained,
            NodeId::ROOT,
            ElementKind::Text,
            salt,
            None,
            Some("same"),
            styled,
        );

        let mut new = TreeStore::new();
        // Different interner handle for the new pass.
        let other = {
            use crate::arena::{Arena, ArenaKind};
            use crate::style::{StyleInterner, StyleValue};
            let mut interner = StyleInterner::new();
            let mut persist = Arena::new(ArenaKind::Persist);
            let mut v = StyleValue::empty();
            v.opacity = Some(100);
            interner.intern(v, &mut persist).unwrap()
        };
        push_node(
            &mut new,
            NodeId::ROOT,
            ElementKind::Text,
            salt,
            None,
            Some("same"),
            other,
        );

        let set = reconcile(&new, &retained).unwrap();
        assert_eq!(set.updates.len(), 1);
        assert_eq!(set.updates[0].old_style, styled);
        assert_eq!(set.updates[0].new_style, other);
        assert!(set.updates[0].delta.is_empty());
    }

    #[test]
    fn test_inconsistent_retained_index_errors() {
        let mut retained = TreeStore::new();
        retained.corrupt_index_for_test();
        let new = TreeStore::new();
        assert!(matches!(
            reconcile(&new, &retained),
            Err(EngineError::ReconcilerInconsistency)
        ));
    }

    #[test]
    fn test_full_replace_shape() {
        let salt = SourceSalt::here();
        let mut retained = TreeStore::new();
        let old = push_node(
            &mut retained,
            NodeId::ROOT,
            ElementKind::Container,
            salt,
            None,
            None,
            StyleHandle::UNSET,
        );

        let mut new = TreeStore::new();
        let fresh = push_node(
            &mut new,
            NodeId::ROOT,
            ElementKind::Container,
            salt,
            Some("fresh"),
            None,
            StyleHandle::UNSET,
        );

        let set = full_replace(&new, &retained);
        assert_eq!(set.removes, vec![RemoveCommand { node: old }]);
        assert_eq!(set.adds.len(), 1);
        assert_eq!(set.adds[0].spec.id, fresh);
    }

    #[test]
    fn test_add_then_remove_restores_prior_state() {
        let salt_keep = SourceSalt::here();
        let salt_extra = SourceSalt::here();

        let base = |with_extra: bool| {
            let mut store = TreeStore::new();
            push_node(
                &mut store,
                NodeId::ROOT,
                ElementKind::Text,
                salt_keep,
                Some("keep"),
                Some("stays"),
                StyleHandle::UNSET,
            );
            if with_extra {
                push_node(
                    &mut store,
                    NodeId::ROOT,
                    ElementKind::Container,
                    salt_extra,
                    Some("extra"),
                    None,
                    StyleHandle::UNSET,
                );
            }
            store
        };

        let pass_before = base(false);
        let pass_with = base(true);
        let pass_after = base(false);

        let added = reconcile(&pass_with, &pass_before).unwrap();
        assert_eq!(added.adds.len(), 1);
        let removed = reconcile(&pass_after, &pass_with).unwrap();
        assert_eq!(removed.removes.len(), 1);
        assert_eq!(removed.removes[0].node, added.adds[0].spec.id);

        // Back to the original: surviving identities unchanged, no
        // commands left to emit.
        let settled = reconcile(&pass_after, &pass_before).unwrap();
        assert!(settled.is_empty());
    }

    #[test]
    fn test_lis_mask() {
        // 2,0,1: the increasing run 0,1 stays; 2 moves.
        assert_eq!(lis_mask(&[2, 0, 1]), vec![false, true, true]);
        // Already sorted: nothing moves.
        assert_eq!(lis_mask(&[0, 1, 2]), vec![true, true, true]);
        assert_eq!(lis_mask(&[]), Vec::<bool>::new());
    }
}
