//! Builder surface - fluent element construction.
//!
//! An element constructor opens a node on the lifecycle stack immediately
//! and returns a builder value. Fluent accessors accumulate style fields
//! and attributes on the value; they never touch the tree. Tree mutation
//! happens only at the commit points:
//!
//! - [`Element::end`] for leaves,
//! - [`Element::children`] for containers (the child block runs first,
//!   then the node is configured and closed - Rust's rendition of the
//!   evaluate-argument-first ordering contract),
//! - [`Element::styled`] for containers styled by a precomposed handle.
//!
//! # Example
//!
//! ```ignore
//! container().direction(FlexDirection::Row).gap(8).children(|| {
//!     text("count:").end();
//!     text(count.to_string()).fg(Rgba::WHITE).end();
//!     button("+1").on_press(move |_| increment()).end();
//! });
//! ```

pub mod handlers;

pub use handlers::HandlerBinding;

use smallvec::SmallVec;

use crate::engine;
use crate::style::{ColorValue, Shadow, StyleHandle, StyleValue, Transition};
use crate::tree::{NodeId, SourceSalt};
use crate::types::{
    AlignItems, AlignSelf, Arity, Attr, BorderLine, Dimension, Edges, ElementKind, EventKind,
    EventPayload, FlexDirection, FlexWrap, JustifyContent, Overflow, Position, TextAlign,
    TextWrap,
};

// =============================================================================
// Attribute seeds
// =============================================================================

/// Owned attribute data accumulated on a builder before commit copies it
/// into the working store's arena.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AttrSeed {
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

// =============================================================================
// Element constructors
// =============================================================================

/// A UI element under construction.
///
/// Created by an element constructor (which has already opened the node),
/// consumed by a commit point. Dropping a builder without committing
/// leaves the node open and is reported as a lifecycle imbalance at the
/// end of the pass.
#[must_use = "builders must be committed with end(), children(..) or styled(..)"]
pub struct Element {
    kind: ElementKind,
    id: Option<NodeId>,
    style: StyleValue,
    attrs: AttrSeed,
    handlers: SmallVec<[(EventKind, HandlerBinding); 2]>,
}

fn open(kind: ElementKind, salt: SourceSalt, attrs: AttrSeed) -> Element {
    let id = engine::open_element(kind, salt);
    Element {
        kind,
        id,
        style: StyleValue::empty(),
        attrs,
        handlers: SmallVec::new(),
    }
}

/// Open a container element.
#[track_caller]
pub fn container() -> Element {
    open(ElementKind::Container, SourceSalt::here(), AttrSeed::Container)
}

/// Open a text element.
#[track_caller]
pub fn text(content: impl Into<String>) -> Element {
    open(
        ElementKind::Text,
        SourceSalt::here(),
        AttrSeed::Text {
            content: content.into(),
        },
    )
}

/// Open an image element.
#[track_caller]
pub fn image(source: impl Into<String>) -> Element {
    open(
        ElementKind::Image,
        SourceSalt::here(),
        AttrSeed::Image {
            source: source.into(),
            alt: None,
        },
    )
}

/// Open a button element.
#[track_caller]
pub fn button(label: impl Into<String>) -> Element {
    open(
        ElementKind::Button,
        SourceSalt::here(),
        AttrSeed::Button {
            label: label.into(),
        },
    )
}

/// Open a single-line input element.
#[track_caller]
pub fn input(value: impl Into<String>) -> Element {
    open(
        ElementKind::Input,
        SourceSalt::here(),
        AttrSeed::Input {
            value: value.into(),
            placeholder: None,
        },
    )
}

/// Open a select element with its option labels.
#[track_caller]
pub fn select<I, S>(options: I) -> Element
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    open(
        ElementKind::Select,
        SourceSalt::here(),
        AttrSeed::Select {
            options: options.into_iter().map(Into::into).collect(),
            selected: None,
        },
    )
}

/// Open a progress element. `fraction_milli` is thousandths (0..=1000).
#[track_caller]
pub fn progress(fraction_milli: u16) -> Element {
    open(
        ElementKind::Progress,
        SourceSalt::here(),
        AttrSeed::Progress {
            fraction_milli: fraction_milli.min(1000),
        },
    )
}

/// Open a link element wrapping exactly one child.
#[track_caller]
pub fn link(target: impl Into<String>) -> Element {
    open(
        ElementKind::Link,
        SourceSalt::here(),
        AttrSeed::Link {
            target: target.into(),
        },
    )
}

/// Give the next element constructed inside `block` a user key.
///
/// Keys make sibling identity independent of position, which is what
/// keeps list items stable when the list around them shifts.
pub fn keyed<R>(key: impl Into<String>, block: impl FnOnce() -> R) -> R {
    engine::set_pending_key(key.into());
    let out = block();
    engine::clear_pending_key();
    out
}

// =============================================================================
// Fluent accessors
// =============================================================================

macro_rules! style_accessor {
    ($(#[$doc:meta])* $name:ident: $ty:ty) => {
        $(#[$doc])*
        pub fn $name(mut self, value: impl Into<$ty>) -> Self {
            self.style.$name = Some(value.into());
            self
        }
    };
}

impl Element {
    /// The identity assigned at open, if the engine accepted the node.
    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    // Layout - container
    style_accessor!(direction: FlexDirection);
    style_accessor!(wrap: FlexWrap);
    style_accessor!(justify: JustifyContent);
    style_accessor!(align_items: AlignItems);
    style_accessor!(
        /// Gap between children, in surface pixels.
        gap: u16
    );

    // Layout - item
    style_accessor!(align_self: AlignSelf);
    style_accessor!(grow: u16);
    style_accessor!(shrink: u16);
    style_accessor!(position: Position);
    style_accessor!(overflow: Overflow);

    // Sizing
    style_accessor!(width: Dimension);
    style_accessor!(height: Dimension);
    style_accessor!(min_width: Dimension);
    style_accessor!(min_height: Dimension);
    style_accessor!(max_width: Dimension);
    style_accessor!(max_height: Dimension);

    // Spacing
    style_accessor!(padding: Edges);
    style_accessor!(margin: Edges);

    // Typography
    style_accessor!(font_size: u16);
    style_accessor!(font_weight: u16);
    style_accessor!(line_height: u16);
    style_accessor!(text_align: TextAlign);
    style_accessor!(text_wrap: TextWrap);
    style_accessor!(attrs: Attr);

    // Visual
    style_accessor!(fg: ColorValue);
    style_accessor!(bg: ColorValue);
    style_accessor!(opacity: u8);
    style_accessor!(z_index: i16);

    // Border
    style_accessor!(border_line: BorderLine);
    style_accessor!(border_width: u16);
    style_accessor!(border_color: ColorValue);
    style_accessor!(radius: u16);

    // Shadow and motion
    style_accessor!(shadow: Shadow);
    style_accessor!(transition: Transition);

    /// Bind a host-registered animation by name.
    pub fn animation(mut self, name: impl Into<String>) -> Self {
        self.style.animation = Some(name.into());
        self
    }

    /// Style applied while the pointer hovers the element.
    pub fn hover(mut self, style: StyleValue) -> Self {
        self.style.hover = Some(Box::new(style));
        self
    }

    /// Style applied while the element holds focus.
    pub fn focus(mut self, style: StyleValue) -> Self {
        self.style.focus = Some(Box::new(style));
        self
    }

    /// Merge a precomposed style value into the accumulated fields
    /// (the value's set fields win).
    pub fn style_merge(mut self, value: &StyleValue) -> Self {
        self.style = self.style.merge(value);
        self
    }

    /// Point a bound element reference at this node, bridging user code
    /// to the node's identity across passes.
    pub fn bind(self, bound: &crate::host::BoundRef) -> Self {
        if let Some(id) = self.id {
            bound.set(id);
        }
        self
    }

    // =========================================================================
    // Kind-gated attribute accessors
    // =========================================================================

    fn gate(&self, accessor: &str, allowed: &[ElementKind]) -> bool {
        if allowed.contains(&self.kind) {
            true
        } else {
            log::warn!(
                "accessor `{accessor}` is not valid on a {} element; ignored",
                self.kind.name()
            );
            false
        }
    }

    /// Placeholder text shown while an input is empty.
    pub fn placeholder(mut self, value: impl Into<String>) -> Self {
        if self.gate("placeholder", &[ElementKind::Input]) {
            if let AttrSeed::Input { placeholder, .. } = &mut self.attrs {
                *placeholder = Some(value.into());
            }
        }
        self
    }

    /// Alternative text for an image.
    pub fn alt(mut self, value: impl Into<String>) -> Self {
        if self.gate("alt", &[ElementKind::Image]) {
            if let AttrSeed::Image { alt, .. } = &mut self.attrs {
                *alt = Some(value.into());
            }
        }
        self
    }

    /// Index of the selected option.
    pub fn selected(mut self, index: u32) -> Self {
        if self.gate("selected", &[ElementKind::Select]) {
            if let AttrSeed::Select { selected, .. } = &mut self.attrs {
                *selected = Some(index);
            }
        }
        self
    }

    // =========================================================================
    // Handler bindings
    // =========================================================================

    /// Bind a press handler (buttons only).
    #[track_caller]
    pub fn on_press(mut self, f: impl Fn(&EventPayload) + 'static) -> Self {
        if self.gate("on_press", &[ElementKind::Button]) {
            self.handlers.push((EventKind::Press, HandlerBinding::new(f)));
        }
        self
    }

    /// Bind a press handler with a precomposed context value.
    #[track_caller]
    pub fn on_press_with<C>(mut self, f: impl Fn(&C, &EventPayload) + 'static, ctx: C) -> Self
    where
        C: std::hash::Hash + 'static,
    {
        if self.gate("on_press_with", &[ElementKind::Button]) {
            self.handlers
                .push((EventKind::Press, HandlerBinding::with_ctx(f, ctx)));
        }
        self
    }

    /// Bind a change handler (inputs and selects).
    #[track_caller]
    pub fn on_change(mut self, f: impl Fn(&EventPayload) + 'static) -> Self {
        if self.gate("on_change", &[ElementKind::Input, ElementKind::Select]) {
            self.handlers
                .push((EventKind::Change, HandlerBinding::new(f)));
        }
        self
    }

    /// Bind a submit handler (inputs).
    #[track_caller]
    pub fn on_submit(mut self, f: impl Fn(&EventPayload) + 'static) -> Self {
        if self.gate("on_submit", &[ElementKind::Input]) {
            self.handlers
                .push((EventKind::Submit, HandlerBinding::new(f)));
        }
        self
    }

    /// Bind a handler for any element-level event kind.
    #[track_caller]
    pub fn on_event(mut self, kind: EventKind, f: impl Fn(&EventPayload) + 'static) -> Self {
        self.handlers.push((kind, HandlerBinding::new(f)));
        self
    }

    /// Bind a handler for any event kind with a precomposed context value.
    #[track_caller]
    pub fn on_event_ctx<C>(
        mut self,
        kind: EventKind,
        f: impl Fn(&C, &EventPayload) + 'static,
        ctx: C,
    ) -> Self
    where
        C: std::hash::Hash + 'static,
    {
        self.handlers.push((kind, HandlerBinding::with_ctx(f, ctx)));
        self
    }

    // =========================================================================
    // Commit points
    // =========================================================================

    /// Commit a leaf: configure with the accumulated style and attributes,
    /// then close.
    pub fn end(self) {
        engine::commit_element(None, self.style, self.attrs, self.handlers);
    }

    /// Commit a container: run the child block first (children opened
    /// inside attach under this node), then configure and close.
    pub fn children(self, block: impl FnOnce()) {
        self.check_arity("children");
        block();
        engine::commit_element(None, self.style, self.attrs, self.handlers);
    }

    /// Commit a container styled by a precomposed interned handle. The
    /// handle replaces any accumulated fluent fields.
    pub fn styled(self, handle: StyleHandle, block: impl FnOnce()) {
        self.check_arity("styled");
        if !self.style.is_empty() {
            log::warn!("styled() discards fluent style fields accumulated on the builder");
        }
        block();
        engine::commit_element(Some(handle), StyleValue::empty(), self.attrs, self.handlers);
    }

    fn check_arity(&self, commit: &str) {
        if matches!(self.kind.arity(), Arity::None) {
            log::warn!(
                "{commit}() on a {} element, which permits no children",
                self.kind.name()
            );
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{self, EngineConfig};
    use crate::tree::AttrPayload;

    fn setup() {
        engine::teardown();
        engine::init(EngineConfig::default()).unwrap();
    }

    #[test]
    fn test_constructor_opens_commit_closes() {
        setup();

        engine::begin_test_pass();
        container().children(|| {
            text("hello").end();
        });
        engine::end_test_pass().unwrap();

        engine::with_working(|store| {
            let root_children = store.children_of(crate::tree::NodeId::ROOT).to_vec();
            assert_eq!(root_children.len(), 1);
            let outer = store.get(root_children[0]).unwrap();
            assert_eq!(outer.kind, ElementKind::Container);
            assert_eq!(outer.children.len(), 1);
            let inner = store.get(outer.children[0]).unwrap();
            match inner.attrs {
                AttrPayload::Text { content } => assert_eq!(store.str_at(content), "hello"),
                _ => panic!("wrong payload"),
            }
        });
        engine::teardown();
    }

    #[test]
    fn test_fluent_accessors_accumulate_style() {
        setup();

        engine::begin_test_pass();
        text("styled")
            .font_size(14u16)
            .fg(crate::types::Rgba::WHITE)
            .padding(4u16)
            .end();
        engine::end_test_pass().unwrap();

        let handle = engine::with_working(|store| {
            let id = store.children_of(crate::tree::NodeId::ROOT)[0];
            store.get(id).unwrap().style
        });
        let style = engine::resolve_style(handle);
        assert_eq!(style.font_size, Some(14));
        assert_eq!(style.padding, Some(Edges::all(4)));
        engine::teardown();
    }

    #[test]
    fn test_equal_styles_share_handle() {
        setup();

        engine::begin_test_pass();
        // Field write order differs; the interned value is the same.
        text("a").fg(crate::types::Rgba::RED).font_size(12u16).end();
        text("b").font_size(12u16).fg(crate::types::Rgba::RED).end();
        engine::end_test_pass().unwrap();

        engine::with_working(|store| {
            let children = store.children_of(crate::tree::NodeId::ROOT).to_vec();
            let a = store.get(children[0]).unwrap();
            let b = store.get(children[1]).unwrap();
            assert_eq!(a.style, b.style);
        });
        engine::teardown();
    }

    #[test]
    fn test_kind_gated_accessor_is_ignored() {
        setup();

        engine::begin_test_pass();
        // `placeholder` is input-only; on text it must be a no-op.
        text("not an input").placeholder("ignored").end();
        engine::end_test_pass().unwrap();

        engine::with_working(|store| {
            let id = store.children_of(crate::tree::NodeId::ROOT)[0];
            assert!(matches!(
                store.get(id).unwrap().attrs,
                AttrPayload::Text { .. }
            ));
        });
        engine::teardown();
    }

    #[test]
    fn test_keyed_assigns_user_key() {
        setup();

        engine::begin_test_pass();
        keyed("row-1", || {
            container().children(|| {});
        });
        engine::end_test_pass().unwrap();

        engine::with_working(|store| {
            let id = store.children_of(crate::tree::NodeId::ROOT)[0];
            assert_eq!(store.key_of(id), Some("row-1"));
        });
        engine::teardown();
    }

    #[test]
    fn test_handlers_recorded_on_node() {
        setup();

        engine::begin_test_pass();
        button("go").on_press(|_| {}).end();
        engine::end_test_pass().unwrap();

        engine::with_working(|store| {
            let id = store.children_of(crate::tree::NodeId::ROOT)[0];
            let node = store.get(id).unwrap();
            assert!(node.handler(EventKind::Press).is_some());
        });
        engine::teardown();
    }
}
