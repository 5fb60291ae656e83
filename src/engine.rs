//! Engine instance - the globally-visible state behind the flat API.
//!
//! The lifecycle stack, style table, tree pair, arena set, router, theme
//! registry, and driver state are process-wide. They live in one engine
//! instance created by [`init`] and destroyed by [`teardown`], threaded
//! implicitly through builder calls via a thread-local slot. Single
//! writer by construction: the engine is single-threaded cooperative.

use std::cell::RefCell;

use smallvec::SmallVec;

use crate::arena::{Arena, ArenaKind, ArenaSeq, SeqRegistry};
use crate::builder::handlers::HandlerBinding;
use crate::builder::AttrSeed;
use crate::driver::DriverState;
use crate::error::EngineError;
use crate::host::{BoundRef, HostApplier};
use crate::lifecycle::LifecycleStack;
use crate::router::Router;
use crate::style::{StyleHandle, StyleInterner, StyleValue};
use crate::theme::{Theme, ThemeRegistry};
use crate::tree::{AttrPayload, NodeId, SourceSalt, TreeStore};
use crate::types::{ElementKind, EventKind, RenderMode};

// =============================================================================
// Config
// =============================================================================

/// Configuration handed to [`init`].
pub struct EngineConfig {
    /// Reactivity mode (see [`RenderMode`]).
    pub mode: RenderMode,
    /// Themes to register, each with a make-default flag.
    pub themes: Vec<(Theme, bool)>,
    /// Icon registrations: (name, glyph or source).
    pub icons: Vec<(String, String)>,
    /// Byte budget for each render pass's tree data. None = unlimited.
    pub frame_limit: Option<usize>,
    /// Byte budget for the session (persist) arena. None = unlimited.
    pub persist_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::Atomic,
            themes: Vec::new(),
            icons: Vec::new(),
            frame_limit: None,
            persist_limit: None,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

pub(crate) struct Engine {
    pub mode: RenderMode,
    pub arenas: [Arena; 4],
    pub seqs: SeqRegistry,
    pub interner: StyleInterner,
    pub working: TreeStore,
    pub retained: TreeStore,
    pub stack: LifecycleStack,
    pub pending_key: Option<String>,
    pub frame_limit: Option<usize>,
    pub router: Router,
    pub themes: ThemeRegistry,
    pub driver: DriverState,
    pub host: Option<Box<dyn HostApplier>>,
}

impl Engine {
    fn new(config: EngineConfig) -> Self {
        let mut arenas = [
            Arena::new(ArenaKind::Frame),
            Arena::new(ArenaKind::View),
            Arena::new(ArenaKind::Persist),
            Arena::new(ArenaKind::Scratch),
        ];
        arenas[ArenaKind::Frame as usize].set_limit(config.frame_limit);
        arenas[ArenaKind::Persist as usize].set_limit(config.persist_limit);

        let mut themes = ThemeRegistry::new();
        for (theme, make_default) in config.themes {
            themes.register(theme, make_default);
        }
        for (name, glyph) in &config.icons {
            themes.register_icon(name, glyph);
        }

        let mut working = TreeStore::new();
        working.set_limit(config.frame_limit);

        Self {
            mode: config.mode,
            arenas,
            seqs: SeqRegistry::new(),
            interner: StyleInterner::new(),
            working,
            retained: TreeStore::new(),
            stack: LifecycleStack::new(),
            pending_key: None,
            frame_limit: config.frame_limit,
            router: Router::new(),
            themes,
            driver: DriverState::new(),
            host: None,
        }
    }

    pub fn arena(&mut self, kind: ArenaKind) -> &mut Arena {
        &mut self.arenas[kind as usize]
    }

    /// Reset one arena and every sequence/ref registered against it.
    pub fn reset_arena(&mut self, kind: ArenaKind) {
        self.arenas[kind as usize].reset();
        self.seqs.clear_kind(kind);
    }

    /// Re-apply the frame budget to the store that just became working.
    pub fn apply_frame_limit(&mut self) {
        self.working.set_limit(self.frame_limit);
    }
}

thread_local! {
    static ENGINE: RefCell<Option<Engine>> = const { RefCell::new(None) };
}

/// Run a closure against the engine instance. None before init.
pub(crate) fn with_engine<R>(f: impl FnOnce(&mut Engine) -> R) -> Option<R> {
    ENGINE.with(|slot| slot.borrow_mut().as_mut().map(f))
}

// =============================================================================
// Init / teardown
// =============================================================================

/// Initialize the engine. Fails if an instance already exists.
pub fn init(config: EngineConfig) -> Result<(), EngineError> {
    ENGINE.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }
        *slot = Some(Engine::new(config));
        Ok(())
    })
}

/// Destroy the engine instance. The persist arena's lifetime ends here.
/// Idempotent; refused (with an error log) while a pass is in flight.
pub fn teardown() {
    ENGINE.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(engine) = slot.as_ref() {
            if engine.driver.in_pass || engine.driver.pumping {
                log::error!("teardown called during a render pass; ignored");
                return;
            }
        }
        *slot = None;
    });
}

pub fn is_initialized() -> bool {
    ENGINE.with(|slot| slot.borrow().is_some())
}

// =============================================================================
// Builder internals
// =============================================================================

pub(crate) fn open_element(kind: ElementKind, salt: SourceSalt) -> Option<NodeId> {
    let opened = with_engine(|e| {
        let key = e.pending_key.take();
        e.stack.open(&mut e.working, kind, salt, key.as_deref())
    });
    match opened {
        Some(id) => id,
        None => {
            log::error!("element constructed before init; ignored");
            None
        }
    }
}

pub(crate) fn set_pending_key(key: String) {
    with_engine(|e| e.pending_key = Some(key));
}

pub(crate) fn clear_pending_key() {
    with_engine(|e| e.pending_key = None);
}

fn seed_to_payload(store: &mut TreeStore, seed: AttrSeed) -> Result<AttrPayload, EngineError> {
    Ok(match seed {
        AttrSeed::Container => AttrPayload::Container,
        AttrSeed::Text { content } => AttrPayload::Text {
            content: store.alloc_str(&content)?,
        },
        AttrSeed::Image { source, alt } => AttrPayload::Image {
            source: store.alloc_str(&source)?,
            alt: match alt {
                Some(alt) => Some(store.alloc_str(&alt)?),
                None => None,
            },
        },
        AttrSeed::Button { label } => AttrPayload::Button {
            label: store.alloc_str(&label)?,
        },
        AttrSeed::Input { value, placeholder } => AttrPayload::Input {
            value: store.alloc_str(&value)?,
            placeholder: match placeholder {
                Some(text) => Some(store.alloc_str(&text)?),
                None => None,
            },
        },
        AttrSeed::Select { options, selected } => {
            let mut spans = SmallVec::new();
            for option in &options {
                spans.push(store.alloc_str(option)?);
            }
            AttrPayload::Select {
                options: spans,
                selected,
            }
        }
        AttrSeed::Progress { fraction_milli } => AttrPayload::Progress { fraction_milli },
        AttrSeed::Link { target } => AttrPayload::Link {
            target: store.alloc_str(&target)?,
        },
    })
}

/// Configure and close the current node: the shared tail of every commit
/// point.
pub(crate) fn commit_element(
    precomposed: Option<StyleHandle>,
    style: StyleValue,
    attrs: AttrSeed,
    handlers: SmallVec<[(EventKind, HandlerBinding); 2]>,
) {
    let committed = with_engine(|e| {
        let handle = match precomposed {
            Some(handle) => handle,
            None if style.is_empty() => StyleHandle::UNSET,
            None => {
                match e
                    .interner
                    .intern(style, &mut e.arenas[ArenaKind::Persist as usize])
                {
                    Ok(handle) => handle,
                    Err(error) => {
                        e.stack.fault_with(error);
                        return;
                    }
                }
            }
        };
        let payload = match seed_to_payload(&mut e.working, attrs) {
            Ok(payload) => payload,
            Err(error) => {
                e.stack.fault_with(error);
                return;
            }
        };
        e.stack.configure(&mut e.working, handle, payload, handlers);
        e.stack.close(&mut e.working);
    });
    if committed.is_none() {
        log::error!("commit before init; ignored");
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Intern a style value, for use with [`crate::builder::Element::styled`].
pub fn intern_style(value: StyleValue) -> Result<StyleHandle, EngineError> {
    with_engine(|e| {
        e.interner
            .intern(value, &mut e.arenas[ArenaKind::Persist as usize])
    })
    .unwrap_or(Err(EngineError::NotInitialized))
}

/// The canonical style value behind a handle. Empty before init.
pub fn resolve_style(handle: StyleHandle) -> StyleValue {
    with_engine(|e| e.interner.resolve(handle).clone()).unwrap_or_default()
}

/// Run a closure against a named arena. Scratch is the only arena user
/// code should reset; the engine owns the frame and view boundaries.
pub fn with_arena<R>(kind: ArenaKind, f: impl FnOnce(&mut Arena) -> R) -> Result<R, EngineError> {
    with_engine(|e| f(e.arena(kind))).ok_or(EngineError::NotInitialized)
}

/// A growing sequence whose contents are cleared when the named arena
/// resets.
pub fn arena_seq<T: 'static>(kind: ArenaKind) -> Result<ArenaSeq<T>, EngineError> {
    with_engine(|e| {
        let (seq, weak) = ArenaSeq::new(kind);
        e.seqs.register(kind, weak);
        seq
    })
    .ok_or(EngineError::NotInitialized)
}

/// A bound element reference scoped to the view or persist arena.
pub fn bound_ref(kind: ArenaKind) -> Result<BoundRef, EngineError> {
    with_engine(|e| {
        let (bound, weak) = BoundRef::new(kind);
        e.seqs.register(kind, weak);
        bound
    })
    .ok_or(EngineError::NotInitialized)
}

/// Install or clear the per-pass tree byte budget.
pub fn set_frame_limit(limit: Option<usize>) {
    with_engine(|e| {
        e.frame_limit = limit;
        e.apply_frame_limit();
        e.arenas[ArenaKind::Frame as usize].set_limit(limit);
    });
}

/// (bytes used, byte limit) for a named arena.
pub fn arena_stats(kind: ArenaKind) -> Option<(usize, Option<usize>)> {
    with_engine(|e| {
        let arena = e.arena(kind);
        (arena.len(), arena.limit())
    })
}

/// Render passes committed since init.
pub fn pass_count() -> u64 {
    with_engine(|e| e.driver.pass_count).unwrap_or(0)
}

// =============================================================================
// Test plumbing
// =============================================================================

#[cfg(test)]
pub(crate) fn begin_test_pass() {
    with_engine(|e| {
        e.working.clear();
        e.stack.begin_pass();
    });
}

#[cfg(test)]
pub(crate) fn end_test_pass() -> Result<(), EngineError> {
    with_engine(|e| e.stack.finish_pass(&mut e.working))
        .unwrap_or(Err(EngineError::NotInitialized))
}

#[cfg(test)]
pub(crate) fn with_working<R>(f: impl FnOnce(&TreeStore) -> R) -> R {
    with_engine(|e| f(&e.working)).expect("engine initialized in tests")
}

// =============================================================================
// Tests
// =============================================================================
