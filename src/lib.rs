//! # vapor-ui
//!
//! Compiled UI engine that treats the display surface as a thin graphics
//! driver. Interfaces are described in ordinary imperative code through a
//! builder API; each render pass compiles into a virtual tree, the
//! reconciler diffs it against the prior tree, and three disjoint command
//! arrays (adds, removes, updates) are handed to a host adapter that
//! mutates the surface.
//!
//! ## Architecture
//!
//! The pipeline per tick:
//! ```text
//! event source -> driver -> render root -> lifecycle stack -> new tree
//!     -> reconciler -> command arrays -> host applier -> frame reset
//! ```
//!
//! Memory is arena-scoped: `frame` resets every pass, `view` resets on
//! route change, `persist` lives for the session, `scratch` belongs to
//! the caller. Styles are value types deduplicated by a session interner,
//! so the reconciler compares styles by integer handle.
//!
//! ## Example
//!
//! ```ignore
//! use vapor_ui::prelude::*;
//!
//! let count = Signal::new(0);
//!
//! init(EngineConfig::default())?;
//! register_page("/", {
//!     let count = count.clone();
//!     move || {
//!         let count = count.clone();
//!         container().gap(8).children(move || {
//!             text(count.get().to_string()).end();
//!             let count = count.clone();
//!             button("+1").on_press(move |_| count.update(|n| *n += 1)).end();
//!         });
//!     }
//! }, None);
//! navigate("/");
//! let handle = mount(Box::new(my_host))?;
//! run(&handle);
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Foundation types (colors, dimensions, element kinds)
//! - [`arena`] - The four named arenas and arena-scoped sequences
//! - [`style`] - Style values and the session interner
//! - [`tree`] - Stable identity, UI nodes, the double-buffered store
//! - [`lifecycle`] - The open/configure/close stack
//! - [`builder`] - Element constructors and fluent accessors
//! - [`reconcile`] - The diff engine and command records
//! - [`host`] - The applier contract and the recording test host
//! - [`driver`] - Reactivity modes, event queue, the pass lifecycle
//! - [`router`] - Routes, layouts, the view boundary
//! - [`theme`] - Theme/icon registries and token resolution
//! - [`form`] - The form compiler
//! - [`markdown`] - The markdown compiler

pub mod arena;
pub mod builder;
pub mod driver;
pub mod engine;
pub mod error;
pub mod form;
pub mod host;
pub mod lifecycle;
pub mod markdown;
pub mod reconcile;
pub mod router;
pub mod style;
pub mod theme;
pub mod tree;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use arena::{Arena, ArenaKind, ArenaSeq, Span};

pub use builder::{
    button, container, image, input, keyed, link, progress, select, text, Element,
    HandlerBinding,
};

pub use driver::{
    cycle, dispatch_event, event_listener, frame_tick, mount, on_pass_commit, on_pass_start,
    run, set_diagnostic_hook, tick, EngineEvent, MountHandle, PassStats, Signal,
};

pub use engine::{
    arena_seq, arena_stats, bound_ref, init, intern_style, is_initialized, pass_count,
    resolve_style, set_frame_limit, teardown, with_arena, EngineConfig,
};

pub use error::{EngineError, LifecycleFault};

pub use form::{form, FieldKind, FieldSpec, FieldValue, FormData, FormSpec, FormState};

pub use host::{AppliedOp, ApplyError, BoundRef, HostApplier, HostHandle, RecordingHost};

pub use markdown::{markdown, markdown_with};

pub use reconcile::{
    AddCommand, AttrChange, AttrDelta, AttrSnapshot, CommandSet, NodeSpec, RemoveCommand,
    UpdateCommand,
};

pub use router::{current_path, navigate, register_layout, register_page, route_param};

pub use style::{ColorValue, Shadow, StyleHandle, StyleValue, Transition};

pub use theme::{
    active_theme, get_preset, icon, midnight, paper, preset_names, register_icon,
    register_theme, resolve_color, resolve_token, set_storage_hook, set_theme, MemoryStore,
    StorageHook, Theme, ThemeColor, ThemeToken,
};

pub use tree::{NodeId, SourceSalt};

/// Everything an application typically needs.
pub mod prelude {
    pub use crate::builder::{
        button, container, image, input, keyed, link, progress, select, text,
    };
    pub use crate::driver::{cycle, dispatch_event, mount, run, tick, EngineEvent, Signal};
    pub use crate::engine::{init, teardown, EngineConfig};
    pub use crate::router::{navigate, register_layout, register_page, route_param};
    pub use crate::theme::{set_theme, ThemeToken};
    pub use crate::types::*;
}
