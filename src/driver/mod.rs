//! Reactivity driver - decides when a render pass runs and owns the pass
//! lifecycle.
//!
//! One logical tick: drain queued events, run the render root through the
//! lifecycle stack, reconcile against the retained tree, dispatch the
//! command arrays to the host, swap trees, reset the frame arena. At most
//! one pass is in flight at any time and it always runs to completion;
//! events arriving mid-pass coalesce into exactly one follow-up pass.
//!
//! Three modes:
//! - **Atomic** (default): one pass per externally-originated event.
//! - **Immediate**: one pass per displayable frame tick.
//! - **Retained**: passes only on [`cycle`] or a [`Signal`] write.

pub mod signal;

pub use signal::Signal;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::engine;
use crate::error::EngineError;
use crate::host::{HostApplier, HostHandle};
use crate::reconcile::{self, CommandSet, NodeSpec};
use crate::tree::NodeId;
use crate::types::{EventKind, EventPayload, GlobalEventKind, RenderMode};

// =============================================================================
// Events and stats
// =============================================================================

/// An externally-originated event entering the driver queue.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Event targeted at a node's handler binding.
    Node {
        node: NodeId,
        kind: EventKind,
        payload: EventPayload,
    },
    /// Process-wide event delivered to registered listeners.
    Global {
        kind: GlobalEventKind,
        payload: EventPayload,
    },
}

/// Timing/size numbers handed to the pass-commit hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    /// Passes committed since init.
    pub pass: u64,
    /// Commands dispatched this pass.
    pub commands: usize,
    /// Nodes in the tree after the pass (root sentinel excluded).
    pub nodes: usize,
}

// =============================================================================
// Driver state (owned by the engine instance)
// =============================================================================

pub(crate) struct DriverState {
    pub queue: std::collections::VecDeque<EngineEvent>,
    pub cycle_requested: bool,
    pub in_pass: bool,
    pub pumping: bool,
    /// Next pass ignores the retained tree and emits a full replace.
    pub force_full_replace: bool,
    /// The surface no longer matches the retained tree; treated like
    /// `force_full_replace` until a pass commits cleanly.
    pub host_inconsistent: bool,
    pub listeners: Vec<(GlobalEventKind, Rc<dyn Fn(&EventPayload)>)>,
    pub on_start: Option<Rc<dyn Fn()>>,
    pub on_commit: Option<Rc<dyn Fn(&PassStats)>>,
    pub diagnostic: Option<Rc<dyn Fn(&EngineError)>>,
    pub handle_map: FxHashMap<NodeId, HostHandle>,
    pub pass_count: u64,
}

impl DriverState {
    pub fn new() -> Self {
        Self {
            queue: std::collections::VecDeque::new(),
            cycle_requested: false,
            in_pass: false,
            pumping: false,
            force_full_replace: false,
            host_inconsistent: false,
            listeners: Vec::new(),
            on_start: None,
            on_commit: None,
            diagnostic: None,
            handle_map: FxHashMap::default(),
            pass_count: 0,
        }
    }
}

// =============================================================================
// Public surface
// =============================================================================

/// Force a render pass. In atomic and retained modes this is the explicit
/// "something changed" notification.
pub fn cycle() {
    let start_now = engine::with_engine(|e| {
        e.driver.cycle_requested = true;
        !(e.driver.pumping || e.driver.in_pass)
    })
    .unwrap_or(false);
    if start_now {
        pump();
    }
}

/// Deliver an event from the host's event source. FIFO order is
/// preserved; events arriving while a pass is in flight coalesce into one
/// follow-up pass.
pub fn dispatch_event(event: EngineEvent) {
    let start_now = engine::with_engine(|e| {
        e.driver.queue.push_back(event);
        !(e.driver.pumping || e.driver.in_pass)
    })
    .unwrap_or(false);
    if start_now {
        pump();
    }
}

/// Displayable frame tick. Drives a pass in immediate mode; in the other
/// modes it only drains pending work.
pub fn frame_tick() {
    let start_now = engine::with_engine(|e| {
        if e.mode == RenderMode::Immediate {
            e.driver.cycle_requested = true;
        }
        !(e.driver.pumping || e.driver.in_pass)
    })
    .unwrap_or(false);
    if start_now {
        pump();
    }
}

/// Register a process-wide listener for a global event kind. Listeners
/// run before any render pass the event triggers.
pub fn event_listener(kind: GlobalEventKind, f: impl Fn(&EventPayload) + 'static) {
    if engine::with_engine(|e| e.driver.listeners.push((kind, Rc::new(f)))).is_none() {
        log::error!("event_listener before init");
    }
}

/// Hook invoked when a pass starts.
pub fn on_pass_start(f: impl Fn() + 'static) {
    engine::with_engine(|e| e.driver.on_start = Some(Rc::new(f)));
}

/// Hook invoked when a pass commits, with its stats.
pub fn on_pass_commit(f: impl Fn(&PassStats) + 'static) {
    engine::with_engine(|e| e.driver.on_commit = Some(Rc::new(f)));
}

/// Hook receiving every recovered error. User code sees failures here,
/// never as panics out of builder calls.
pub fn set_diagnostic_hook(f: impl Fn(&EngineError) + 'static) {
    engine::with_engine(|e| e.driver.diagnostic = Some(Rc::new(f)));
}

// =============================================================================
// Mount / tick / run
// =============================================================================

/// Handle returned by [`mount`] that allows stopping and unmounting.
pub struct MountHandle {
    running: Rc<std::cell::Cell<bool>>,
}

impl MountHandle {
    /// Check if still running.
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Stop the application loop. Use this to trigger graceful shutdown
    /// from handlers.
    pub fn stop(&self) {
        self.running.set(false);
    }

    /// Stop and detach the host applier. The engine itself stays
    /// initialized; `teardown` disposes it.
    pub fn unmount(self) {
        self.running.set(false);
        engine::with_engine(|e| {
            e.host = None;
            e.driver.handle_map.clear();
        });
    }
}

/// Install the host applier and run the initial pass.
///
/// The surface is assumed fresh: the retained tree is discarded and the
/// first pass is a full add.
pub fn mount(mut host: Box<dyn HostApplier>) -> Result<MountHandle, EngineError> {
    let root_handle = host.root();
    engine::with_engine(move |e| {
        e.retained.clear();
        e.driver.handle_map.clear();
        e.driver.handle_map.insert(NodeId::ROOT, root_handle);
        e.driver.host_inconsistent = false;
        e.driver.force_full_replace = true;
        e.host = Some(host);
    })
    .ok_or(EngineError::NotInitialized)?;

    let handle = MountHandle {
        running: Rc::new(std::cell::Cell::new(true)),
    };
    cycle();
    Ok(handle)
}

/// Run one iteration of the event loop (non-blocking).
///
/// Returns false once the application should stop.
pub fn tick(handle: &MountHandle) -> bool {
    if !handle.is_running() {
        return false;
    }
    frame_tick();
    handle.is_running()
}

/// Run the event loop until [`MountHandle::stop`] is called.
pub fn run(handle: &MountHandle) {
    while tick(handle) {
        // ~60fps cadence between ticks.
        std::thread::sleep(Duration::from_millis(16));
    }
}

// =============================================================================
// Pump - event drain and pass scheduling
// =============================================================================

/// Drain the event queue and run passes until quiescent. Re-entrant
/// calls (from handlers or render code) fall through; the outer pump
/// picks their work up.
pub(crate) fn pump() {
    let proceed = engine::with_engine(|e| {
        if e.driver.pumping || e.driver.in_pass {
            false
        } else {
            e.driver.pumping = true;
            true
        }
    })
    .unwrap_or(false);
    if !proceed {
        return;
    }

    loop {
        let events: Vec<EngineEvent> = engine::with_engine(|e| {
            e.driver.queue.drain(..).collect::<Vec<_>>()
        })
        .unwrap_or_default();
        let mut delivered = 0;
        for event in events {
            if deliver_event(event) {
                delivered += 1;
            }
        }

        let should_render = engine::with_engine(|e| {
            let requested = e.driver.cycle_requested;
            e.driver.cycle_requested = false;
            requested || (e.mode == RenderMode::Atomic && delivered > 0)
        })
        .unwrap_or(false);

        if should_render {
            run_pass();
        }

        let more_work = engine::with_engine(|e| {
            !e.driver.queue.is_empty() || e.driver.cycle_requested
        })
        .unwrap_or(false);
        if !more_work {
            break;
        }
    }

    engine::with_engine(|e| e.driver.pumping = false);
}

/// Deliver one event. Returns whether the event counts toward the atomic
/// pass trigger: dropped events and panicked handlers do not force a
/// pass.
fn deliver_event(event: EngineEvent) -> bool {
    match event {
        EngineEvent::Node {
            node,
            kind,
            payload,
        } => {
            let handler = engine::with_engine(|e| {
                e.retained
                    .get(node)
                    .and_then(|n| n.handler(kind))
                    .map(|b| b.callable())
            })
            .flatten();
            let Some(handler) = handler else {
                log::debug!("no {kind:?} handler on node {node:?}; event dropped");
                return false;
            };
            if catch_unwind(AssertUnwindSafe(|| handler(&payload))).is_err() {
                report(&EngineError::HandlerPanic { node });
                return false;
            }
            true
        }
        EngineEvent::Global { kind, payload } => {
            let listeners: Vec<Rc<dyn Fn(&EventPayload)>> = engine::with_engine(|e| {
                e.driver
                    .listeners
                    .iter()
                    .filter(|(k, _)| *k == kind)
                    .map(|(_, f)| Rc::clone(f))
                    .collect()
            })
            .unwrap_or_default();
            let mut any_ran = false;
            for listener in listeners {
                if catch_unwind(AssertUnwindSafe(|| listener(&payload))).is_err() {
                    report(&EngineError::HandlerPanic {
                        node: NodeId::ROOT,
                    });
                } else {
                    any_ran = true;
                }
            }
            any_ran
        }
    }
}

/// Report a recovered error through the log and the diagnostic hook.
pub(crate) fn report(error: &EngineError) {
    log::error!("{error}");
    let hook = engine::with_engine(|e| e.driver.diagnostic.clone()).flatten();
    if let Some(hook) = hook {
        hook(error);
    }
}

// =============================================================================
// The render pass
// =============================================================================

enum PassOutcome {
    /// The pass faulted while building; retained stays authoritative.
    Discard(EngineError),
    /// Commands ready for dispatch, plus descendant identities of each
    /// removed subtree (for handle-map purging).
    Apply {
        set: CommandSet,
        purge: FxHashMap<NodeId, Vec<NodeId>>,
        recovered: Option<EngineError>,
    },
}

fn run_pass() {
    // Setup: clear the working store, reset the stack, fetch the root.
    let setup = engine::with_engine(|e| {
        debug_assert!(!e.driver.in_pass, "a pass is already in flight");
        e.driver.in_pass = true;
        e.working.clear();
        e.stack.begin_pass();
        (e.router.composed_root(), e.driver.on_start.clone())
    });
    let Some((root, on_start)) = setup else { return };

    if let Some(hook) = on_start {
        hook();
    }

    // The render root runs outside any engine borrow; builder calls
    // borrow briefly per operation.
    if let Some(root) = &root {
        root();
    }

    // Seal the pass and reconcile.
    let outcome = engine::with_engine(|e| match e.stack.finish_pass(&mut e.working) {
        Err(error) => {
            e.working.clear();
            e.driver.in_pass = false;
            PassOutcome::Discard(error)
        }
        Ok(()) => {
            let mut recovered = None;
            let set = if e.driver.force_full_replace || e.driver.host_inconsistent {
                reconcile::full_replace(&e.working, &e.retained)
            } else {
                match reconcile::reconcile(&e.working, &e.retained) {
                    Ok(set) => set,
                    Err(error) => {
                        recovered = Some(error);
                        reconcile::full_replace(&e.working, &e.retained)
                    }
                }
            };
            let purge = set
                .removes
                .iter()
                .map(|r| (r.node, e.retained.descendants_of(r.node)))
                .collect();
            PassOutcome::Apply {
                set,
                purge,
                recovered,
            }
        }
    })
    .expect("engine cannot disappear mid-pass");

    let (set, purge, recovered) = match outcome {
        PassOutcome::Discard(error) => {
            report(&error);
            return;
        }
        PassOutcome::Apply {
            set,
            purge,
            recovered,
        } => (set, purge, recovered),
    };
    if let Some(error) = recovered {
        report(&error);
    }

    // Dispatch outside the engine borrow; the host must not call back
    // into builder APIs while applying.
    let (host, mut map) = engine::with_engine(|e| {
        (e.host.take(), std::mem::take(&mut e.driver.handle_map))
    })
    .expect("engine cannot disappear mid-pass");

    let commands = set.len();
    let apply_result = match host {
        Some(mut h) => {
            let result = apply_commands(h.as_mut(), &mut map, &set, &purge);
            (Some(h), result)
        }
        None => (None, Ok(())),
    };
    let (host, apply_result) = apply_result;

    // Commit or invalidate.
    let commit = engine::with_engine(|e| {
        e.host = host;
        e.driver.handle_map = map;
        match &apply_result {
            Ok(()) => {
                std::mem::swap(&mut e.working, &mut e.retained);
                e.working.clear();
                e.apply_frame_limit();
                e.reset_arena(crate::arena::ArenaKind::Frame);
                e.driver.force_full_replace = false;
                e.driver.host_inconsistent = false;
                e.driver.pass_count += 1;
                let stats = PassStats {
                    pass: e.driver.pass_count,
                    commands,
                    nodes: e.retained.len().saturating_sub(1),
                };
                e.driver.in_pass = false;
                (Some(stats), e.driver.on_commit.clone())
            }
            Err(_) => {
                e.driver.host_inconsistent = true;
                e.working.clear();
                e.driver.in_pass = false;
                (None, None)
            }
        }
    })
    .expect("engine cannot disappear mid-pass");

    if let Err(error) = apply_result {
        report(&error);
    }
    if let (Some(stats), Some(hook)) = commit {
        hook(&stats);
    }
}

// =============================================================================
// Command application
// =============================================================================

fn apply_commands(
    host: &mut dyn HostApplier,
    map: &mut FxHashMap<NodeId, HostHandle>,
    set: &CommandSet,
    purge: &FxHashMap<NodeId, Vec<NodeId>>,
) -> Result<(), EngineError> {
    fn host_err(e: crate::host::ApplyError) -> EngineError {
        EngineError::HostApplyFailure {
            op: e.op,
            detail: e.detail,
        }
    }

    // Removes first: one host call per subtree root, descendants purged
    // from the handle map. A missing handle can only follow an earlier
    // host failure; the node never reached the surface, so skip it.
    for remove in &set.removes {
        let handle = map.remove(&remove.node);
        if let Some(descendants) = purge.get(&remove.node) {
            for id in descendants {
                map.remove(id);
            }
        }
        match handle {
            Some(handle) => host.remove(handle).map_err(host_err)?,
            None => log::warn!("remove: no handle for node {:?}; skipped", remove.node),
        }
    }

    // Updates next, in emission order (parents precede children, so
    // identity migrations are visible to child moves).
    for update in &set.updates {
        let Some(&handle) = map.get(&update.node) else {
            return Err(EngineError::HostApplyFailure {
                op: "update",
                detail: format!("no handle for node {:?}", update.node),
            });
        };
        if let Some(new_id) = update.migrate {
            map.remove(&update.node);
            map.insert(new_id, handle);
        }
        if !update.delta.is_empty() || update.old_style != update.new_style {
            host.apply_update(handle, &update.delta, update.new_style)
                .map_err(host_err)?;
        }
        if let Some(index) = update.move_to {
            let parent = lookup_parent(map, update.parent)?;
            host.insert(handle, parent, index).map_err(host_err)?;
        }
    }

    // Adds last: one command per subtree, created parent-first.
    for add in &set.adds {
        let parent = lookup_parent(map, add.parent)?;
        apply_add(host, map, &add.spec, parent, add.index)?;
    }

    Ok(())
}

fn lookup_parent(
    map: &FxHashMap<NodeId, HostHandle>,
    parent: NodeId,
) -> Result<HostHandle, EngineError> {
    map.get(&parent)
        .copied()
        .ok_or_else(|| EngineError::HostApplyFailure {
            op: "insert",
            detail: format!("no handle for parent {parent:?}"),
        })
}

fn apply_add(
    host: &mut dyn HostApplier,
    map: &mut FxHashMap<NodeId, HostHandle>,
    spec: &NodeSpec,
    parent: HostHandle,
    index: u32,
) -> Result<(), EngineError> {
    let handle = host
        .create(spec.kind, &spec.attrs, spec.style)
        .map_err(|e| EngineError::HostApplyFailure {
            op: e.op,
            detail: e.detail,
        })?;
    map.insert(spec.id, handle);
    host.insert(handle, parent, index)
        .map_err(|e| EngineError::HostApplyFailure {
            op: e.op,
            detail: e.detail,
        })?;
    for (child_index, child) in spec.children.iter().enumerate() {
        apply_add(host, map, child, handle, child_index as u32)?;
    }
    Ok(())
}

// =============================================================================
// Tests - end-to-end scenarios against the recording host
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    use crate::arena::ArenaKind;
    use crate::builder::{button, container, keyed, text};
    use crate::engine::{self, EngineConfig};
    use crate::host::{AppliedOp, RecordingHost};
    use crate::reconcile::AttrChange;
    use crate::router::{navigate, register_layout, register_page};
    use crate::types::{ElementKind, Rgba};

    fn setup(config: EngineConfig) -> RecordingHost {
        engine::teardown();
        engine::init(config).unwrap();
        RecordingHost::new()
    }

    fn collect_errors() -> Rc<RefCell<Vec<EngineError>>> {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        set_diagnostic_hook(move |e| sink.borrow_mut().push(e.clone()));
        errors
    }

    fn update_ops(host: &RecordingHost) -> Vec<AppliedOp> {
        host.ops()
            .into_iter()
            .filter(|op| matches!(op, AppliedOp::Update { .. }))
            .collect()
    }

    #[test]
    fn test_counter_increment_is_single_update() {
        let host = setup(EngineConfig::default());
        let count = Rc::new(Cell::new(0));
        let btn = engine::bound_ref(ArenaKind::Persist).unwrap();

        let count_render = count.clone();
        let btn_render = btn.clone();
        register_page(
            "/",
            move || {
                let count = count_render.clone();
                let btn = btn_render.clone();
                container().children(move || {
                    text(count.get().to_string()).end();
                    let count = count.clone();
                    button("+1")
                        .bind(&btn)
                        .on_press(move |_| count.set(count.get() + 1))
                        .end();
                });
            },
            None,
        );
        navigate("/");
        let _handle = mount(Box::new(host.clone())).unwrap();

        // Initial mount: container + text + button, created and inserted.
        let creates = host
            .ops()
            .iter()
            .filter(|op| matches!(op, AppliedOp::Create { .. }))
            .count();
        assert_eq!(creates, 3);
        host.clear();

        dispatch_event(EngineEvent::Node {
            node: btn.get().unwrap(),
            kind: EventKind::Press,
            payload: EventPayload::Empty,
        });

        // Exactly one update; no adds, no removes.
        let ops = host.ops();
        assert_eq!(ops.len(), 1, "ops: {ops:?}");
        match &ops[0] {
            AppliedOp::Update { delta, .. } => {
                assert_eq!(
                    delta.changes,
                    vec![AttrChange::Text {
                        from: "0".to_string(),
                        to: "1".to_string()
                    }]
                );
            }
            other => panic!("expected update, got {other:?}"),
        }
        engine::teardown();
    }

    #[test]
    fn test_keyed_head_insertion_end_to_end() {
        let host = setup(EngineConfig::default());
        let items: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(
            ["b", "c", "d"].iter().map(|s| s.to_string()).collect(),
        ));

        let items_render = items.clone();
        register_page(
            "/",
            move || {
                let snapshot = items_render.borrow().clone();
                container().children(move || {
                    for item in &snapshot {
                        keyed(item.clone(), || {
                            container().end();
                        });
                    }
                });
            },
            None,
        );
        navigate("/");
        let _handle = mount(Box::new(host.clone())).unwrap();
        host.clear();

        items.borrow_mut().insert(0, "a".to_string());
        cycle();

        let ops = host.ops();
        // One created subtree, inserted at the head; survivors untouched.
        assert_eq!(ops.len(), 2, "ops: {ops:?}");
        assert!(matches!(ops[0], AppliedOp::Create { .. }));
        assert!(matches!(ops[1], AppliedOp::Insert { index: 0, .. }));
        engine::teardown();
    }

    #[test]
    fn test_style_dedup_across_nodes() {
        let host = setup(EngineConfig::default());

        register_page(
            "/",
            || {
                container().children(|| {
                    // Field write order differs between the two nodes.
                    text("first").fg(Rgba::RED).font_size(13u16).end();
                    text("second").font_size(13u16).fg(Rgba::RED).end();
                });
            },
            None,
        );
        navigate("/");
        let _handle = mount(Box::new(host.clone())).unwrap();

        let styles: Vec<_> = host
            .ops()
            .iter()
            .filter_map(|op| match op {
                AppliedOp::Create {
                    kind: ElementKind::Text,
                    style,
                    ..
                } => Some(*style),
                _ => None,
            })
            .collect();
        assert_eq!(styles.len(), 2);
        assert_eq!(styles[0], styles[1]);
        engine::teardown();
    }

    #[test]
    fn test_allocation_failure_aborts_pass_and_keeps_retained() {
        let host = setup(EngineConfig::default());
        let errors = collect_errors();
        let big = Rc::new(Cell::new(false));

        let big_render = big.clone();
        register_page(
            "/",
            move || {
                let content = if big_render.get() {
                    "x".repeat(64 * 1024)
                } else {
                    "small".to_string()
                };
                container().children(move || {
                    text(content).end();
                });
            },
            None,
        );
        navigate("/");
        let _handle = mount(Box::new(host.clone())).unwrap();
        let passes_before = engine::pass_count();
        host.clear();

        engine::set_frame_limit(Some(4096));
        big.set(true);
        cycle();

        // Pass aborted: nothing dispatched, no pass committed.
        assert!(host.is_empty(), "ops: {:?}", host.ops());
        assert_eq!(engine::pass_count(), passes_before);
        assert!(errors
            .borrow()
            .iter()
            .any(|e| matches!(e, EngineError::ArenaExhausted { .. })));

        // Retained survived: rendering the old content again is a no-op.
        engine::set_frame_limit(None);
        big.set(false);
        cycle();
        assert!(host.is_empty(), "ops: {:?}", host.ops());
        engine::teardown();
    }

    #[test]
    fn test_route_change_with_layout_is_full_replace() {
        let host = setup(EngineConfig::default());
        let destroyed = Rc::new(Cell::new(false));

        let destroyed_hook = destroyed.clone();
        register_page(
            "/a",
            || {
                container().children(|| {
                    text("page a").end();
                });
            },
            Some(Box::new(move || destroyed_hook.set(true))),
        );
        register_page(
            "/b",
            || {
                text("page b").end();
            },
            None,
        );
        register_layout(
            "/a",
            |inner| {
                container().children(|| inner());
            },
            false,
        );
        register_layout(
            "/b",
            |inner| {
                container().children(|| inner());
            },
            true,
        );

        navigate("/a");
        let _handle = mount(Box::new(host.clone())).unwrap();

        // View-scoped state, to observe the boundary reset.
        let breadcrumbs = engine::arena_seq::<String>(ArenaKind::View).unwrap();
        breadcrumbs.push("visited /a".to_string());
        host.clear();

        navigate("/b");

        assert!(destroyed.get(), "destroy hook of the outgoing page runs");
        assert!(breadcrumbs.is_empty(), "view arena state is discarded");

        let ops = host.ops();
        // Single full replace: the old root removed first, then the new
        // subtree created.
        assert!(matches!(ops[0], AppliedOp::Remove { .. }), "ops: {ops:?}");
        let removes = ops
            .iter()
            .filter(|op| matches!(op, AppliedOp::Remove { .. }))
            .count();
        assert_eq!(removes, 1);
        let creates = ops
            .iter()
            .filter(|op| matches!(op, AppliedOp::Create { .. }))
            .count();
        assert_eq!(creates, 2, "layout container + page text");
        engine::teardown();
    }

    #[test]
    fn test_atomic_coalescing_of_mid_pass_events() {
        let host = setup(EngineConfig::default());
        let count = Rc::new(Cell::new(0));
        let btn = engine::bound_ref(ArenaKind::Persist).unwrap();

        let count_render = count.clone();
        let btn_render = btn.clone();
        register_page(
            "/",
            move || {
                let count = count_render.clone();
                let btn = btn_render.clone();
                container().children(move || {
                    text(count.get().to_string()).end();
                    let count = count.clone();
                    let btn_for_handler = btn.clone();
                    button("+1")
                        .bind(&btn)
                        .on_press(move |_| {
                            let first = count.get() == 0;
                            count.set(count.get() + 1);
                            // Two more events arrive while this tick is
                            // still being processed.
                            if first {
                                for _ in 0..2 {
                                    dispatch_event(EngineEvent::Node {
                                        node: btn_for_handler.get().unwrap(),
                                        kind: EventKind::Press,
                                        payload: EventPayload::Empty,
                                    });
                                }
                            }
                        })
                        .end();
                });
            },
            None,
        );
        navigate("/");
        let _handle = mount(Box::new(host.clone())).unwrap();
        host.clear();

        dispatch_event(EngineEvent::Node {
            node: btn.get().unwrap(),
            kind: EventKind::Press,
            payload: EventPayload::Empty,
        });

        // The two queued events coalesce into exactly one follow-up pass:
        // "0" -> "1", then "1" -> "3" in a single update.
        let updates = update_ops(&host);
        assert_eq!(updates.len(), 2, "updates: {updates:?}");
        let texts: Vec<(String, String)> = updates
            .iter()
            .filter_map(|op| match op {
                AppliedOp::Update { delta, .. } => delta.changes.iter().find_map(|c| match c {
                    AttrChange::Text { from, to } => Some((from.clone(), to.clone())),
                    _ => None,
                }),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                ("0".to_string(), "1".to_string()),
                ("1".to_string(), "3".to_string())
            ]
        );
        assert_eq!(count.get(), 3);
        engine::teardown();
    }

    #[test]
    fn test_retained_mode_renders_only_on_cycle() {
        let host = setup(EngineConfig {
            mode: RenderMode::Retained,
            ..Default::default()
        });
        let count = Rc::new(Cell::new(0));
        let btn = engine::bound_ref(ArenaKind::Persist).unwrap();

        let count_render = count.clone();
        let btn_render = btn.clone();
        register_page(
            "/",
            move || {
                let count = count_render.clone();
                let btn = btn_render.clone();
                container().children(move || {
                    text(count.get().to_string()).end();
                    let count = count.clone();
                    button("+1")
                        .bind(&btn)
                        .on_press(move |_| count.set(count.get() + 1))
                        .end();
                });
            },
            None,
        );
        navigate("/");
        // navigate requests a pass explicitly, so mount renders once.
        let _handle = mount(Box::new(host.clone())).unwrap();
        host.clear();

        // An event runs its handler but does not trigger a pass.
        dispatch_event(EngineEvent::Node {
            node: btn.get().unwrap(),
            kind: EventKind::Press,
            payload: EventPayload::Empty,
        });
        assert_eq!(count.get(), 1);
        assert!(host.is_empty(), "ops: {:?}", host.ops());

        // cycle() renders the pending state change.
        cycle();
        assert_eq!(update_ops(&host).len(), 1);
        engine::teardown();
    }

    #[test]
    fn test_signal_write_triggers_pass_in_retained_mode() {
        let host = setup(EngineConfig {
            mode: RenderMode::Retained,
            ..Default::default()
        });
        let label = Signal::new("before".to_string());

        let label_render = label.clone();
        register_page(
            "/",
            move || {
                text(label_render.get()).end();
            },
            None,
        );
        navigate("/");
        let _handle = mount(Box::new(host.clone())).unwrap();
        host.clear();

        label.set("after".to_string());

        let updates = update_ops(&host);
        assert_eq!(updates.len(), 1, "ops: {:?}", host.ops());
        engine::teardown();
    }

    #[test]
    fn test_immediate_mode_renders_each_tick() {
        let host = setup(EngineConfig {
            mode: RenderMode::Immediate,
            ..Default::default()
        });
        register_page(
            "/",
            || {
                text("frame").end();
            },
            None,
        );
        navigate("/");
        let _handle = mount(Box::new(host.clone())).unwrap();
        let before = engine::pass_count();

        frame_tick();
        frame_tick();
        assert_eq!(engine::pass_count(), before + 2);
        // Identical frames reconcile to zero commands.
        host.clear();
        frame_tick();
        assert!(host.is_empty());
        engine::teardown();
    }

    #[test]
    fn test_handler_panic_is_swallowed_and_reported() {
        let host = setup(EngineConfig::default());
        let errors = collect_errors();
        let btn = engine::bound_ref(ArenaKind::Persist).unwrap();

        let btn_render = btn.clone();
        register_page(
            "/",
            move || {
                let btn = btn_render.clone();
                container().children(move || {
                    button("boom")
                        .bind(&btn)
                        .on_press(|_| panic!("handler exploded"))
                        .end();
                });
            },
            None,
        );
        navigate("/");
        let _handle = mount(Box::new(host.clone())).unwrap();
        let passes_before = engine::pass_count();

        dispatch_event(EngineEvent::Node {
            node: btn.get().unwrap(),
            kind: EventKind::Press,
            payload: EventPayload::Empty,
        });

        assert!(errors
            .borrow()
            .iter()
            .any(|e| matches!(e, EngineError::HandlerPanic { .. })));
        // A panicked handler forces no pass of its own.
        assert_eq!(engine::pass_count(), passes_before);
        // The engine is still alive and renders on request.
        cycle();
        assert_eq!(engine::pass_count(), passes_before + 1);
        engine::teardown();
    }

    #[test]
    fn test_host_failure_forces_full_replace() {
        let host = setup(EngineConfig::default());
        let errors = collect_errors();
        let label = Rc::new(RefCell::new("one".to_string()));

        let label_render = label.clone();
        register_page(
            "/",
            move || {
                text(label_render.borrow().clone()).end();
            },
            None,
        );
        navigate("/");
        let _handle = mount(Box::new(host.clone())).unwrap();
        host.clear();

        // The next operation (the text update) fails at the host.
        host.fail_at(0);
        *label.borrow_mut() = "two".to_string();
        cycle();
        assert!(errors
            .borrow()
            .iter()
            .any(|e| matches!(e, EngineError::HostApplyFailure { .. })));

        // Recovery: the following pass replaces the whole tree.
        host.clear();
        cycle();
        let ops = host.ops();
        assert!(
            ops.iter().any(|op| matches!(op, AppliedOp::Remove { .. })),
            "ops: {ops:?}"
        );
        assert!(ops.iter().any(|op| matches!(op, AppliedOp::Create { .. })));
        engine::teardown();
    }

    #[test]
    fn test_global_event_listener() {
        let host = setup(EngineConfig::default());
        let seen = Rc::new(Cell::new((0u32, 0u32)));

        register_page("/", || text("x").end(), None);
        navigate("/");
        let _handle = mount(Box::new(host.clone())).unwrap();

        let sink = seen.clone();
        event_listener(GlobalEventKind::Resize, move |payload| {
            if let EventPayload::Size { width, height } = payload {
                sink.set((*width, *height));
            }
        });

        dispatch_event(EngineEvent::Global {
            kind: GlobalEventKind::Resize,
            payload: EventPayload::Size {
                width: 800,
                height: 600,
            },
        });
        assert_eq!(seen.get(), (800, 600));
        engine::teardown();
    }

    #[test]
    fn test_pass_hooks_fire() {
        let host = setup(EngineConfig::default());
        let started = Rc::new(Cell::new(0));
        let committed: Rc<RefCell<Vec<PassStats>>> = Rc::new(RefCell::new(Vec::new()));

        register_page("/", || text("hooked").end(), None);

        let s = started.clone();
        on_pass_start(move || s.set(s.get() + 1));
        let c = committed.clone();
        on_pass_commit(move |stats| c.borrow_mut().push(*stats));

        navigate("/");
        let _handle = mount(Box::new(host.clone())).unwrap();

        assert!(started.get() >= 1);
        let stats = committed.borrow();
        let last = stats.last().unwrap();
        assert_eq!(last.nodes, 1);
        assert!(last.commands >= 1);
        engine::teardown();
    }

    #[test]
    fn test_unmount_detaches_host() {
        let host = setup(EngineConfig::default());
        register_page("/", || text("x").end(), None);
        navigate("/");
        let handle = mount(Box::new(host.clone())).unwrap();
        host.clear();

        handle.unmount();
        // Passes still run, but nothing reaches the detached host.
        cycle();
        assert!(host.is_empty());
        engine::teardown();
    }
}
