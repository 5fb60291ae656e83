//! Style values - the visual vocabulary of the engine.
//!
//! A [`StyleValue`] is a plain value: every field defaults to unset, merging
//! is field-wise with the extension winning, and two values compare equal
//! iff all fields compare equal. Styles are never parsed from text.
//!
//! All numeric fields use integer units so equality and hashing are exact
//! (same reasoning as [`crate::types::Rgba`]); the interner depends on that.

pub mod interner;

pub use interner::{StyleHandle, StyleInterner};

use crate::theme::ThemeToken;
use crate::types::{
    AlignItems, AlignSelf, Attr, BorderLine, Dimension, Edges, FlexDirection, FlexWrap,
    JustifyContent, Overflow, Position, Rgba, TextAlign, TextWrap,
};

// =============================================================================
// Color fields
// =============================================================================

/// A color style field: either a concrete color or a semantic theme token
/// resolved against the active theme when commands are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorValue {
    Rgba(Rgba),
    Token(ThemeToken),
}

impl From<Rgba> for ColorValue {
    fn from(color: Rgba) -> Self {
        Self::Rgba(color)
    }
}

impl From<ThemeToken> for ColorValue {
    fn from(token: ThemeToken) -> Self {
        Self::Token(token)
    }
}

// =============================================================================
// Compound fields
// =============================================================================

/// Drop shadow, offsets in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shadow {
    pub dx: i16,
    pub dy: i16,
    pub blur: u16,
    pub spread: u16,
    pub color: ColorValue,
}

/// Which property group a transition animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TransitionProperty {
    #[default]
    All = 0,
    Color = 1,
    Background = 2,
    Opacity = 3,
    Size = 4,
}

/// Easing curve for transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Easing {
    #[default]
    Linear = 0,
    EaseIn = 1,
    EaseOut = 2,
    EaseInOut = 3,
}

/// Transition binding for a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    pub property: TransitionProperty,
    pub duration_ms: u16,
    pub easing: Easing,
}

// =============================================================================
// StyleValue
// =============================================================================

/// A value-typed record of visual, layout, sizing, spacing, typography,
/// border, shadow, interactive, transition, and animation-binding fields.
///
/// All fields default to unset. Merging is field-wise, last-writer-wins,
/// and shallow: a set `hover` sub-style on the extension replaces the
/// base's wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StyleValue {
    // Layout - container
    pub direction: Option<FlexDirection>,
    pub wrap: Option<FlexWrap>,
    pub justify: Option<JustifyContent>,
    pub align_items: Option<AlignItems>,
    pub gap: Option<u16>,

    // Layout - item
    pub align_self: Option<AlignSelf>,
    pub grow: Option<u16>,
    pub shrink: Option<u16>,
    pub position: Option<Position>,
    pub overflow: Option<Overflow>,

    // Sizing
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub min_width: Option<Dimension>,
    pub min_height: Option<Dimension>,
    pub max_width: Option<Dimension>,
    pub max_height: Option<Dimension>,

    // Spacing
    pub padding: Option<Edges>,
    pub margin: Option<Edges>,

    // Typography
    pub font_size: Option<u16>,
    pub font_weight: Option<u16>,
    pub line_height: Option<u16>,
    pub text_align: Option<TextAlign>,
    pub text_wrap: Option<TextWrap>,
    pub attrs: Option<Attr>,

    // Visual
    pub fg: Option<ColorValue>,
    pub bg: Option<ColorValue>,
    pub opacity: Option<u8>,
    pub z_index: Option<i16>,

    // Border
    pub border_line: Option<BorderLine>,
    pub border_width: Option<u16>,
    pub border_color: Option<ColorValue>,
    pub radius: Option<u16>,

    // Shadow
    pub shadow: Option<Shadow>,

    // Interactive sub-styles
    pub hover: Option<Box<StyleValue>>,
    pub focus: Option<Box<StyleValue>>,

    // Motion
    pub transition: Option<Transition>,
    /// Name of a host-registered animation this style binds to.
    pub animation: Option<String>,
}

macro_rules! merge_fields {
    ($out:ident, $ext:ident, $($field:ident),+ $(,)?) => {
        $(
            if $ext.$field.is_some() {
                $out.$field = $ext.$field.clone();
            }
        )+
    };
}

impl StyleValue {
    /// The style with every field unset.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether every field is unset.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Field-wise merge: the result takes `ext`'s field wherever set, else
    /// this value's. Not commutative. `a.merge(&empty) == a` and
    /// `empty.merge(&a) == a`.
    pub fn merge(&self, ext: &StyleValue) -> StyleValue {
        let mut out = self.clone();
        merge_fields!(
            out, ext, direction, wrap, justify, align_items, gap, align_self, grow, shrink,
            position, overflow, width, height, min_width, min_height, max_width, max_height,
            padding, margin, font_size, font_weight, line_height, text_align, text_wrap, attrs,
            fg, bg, opacity, z_index, border_line, border_width, border_color, radius, shadow,
            hover, focus, transition, animation,
        );
        out
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_a() -> StyleValue {
        StyleValue {
            width: Some(Dimension::Px(100)),
            fg: Some(Rgba::WHITE.into()),
            padding: Some(Edges::all(4)),
            ..Default::default()
        }
    }

    fn sample_b() -> StyleValue {
        StyleValue {
            width: Some(Dimension::Px(200)),
            bg: Some(Rgba::BLACK.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_extension_wins() {
        let merged = sample_a().merge(&sample_b());
        assert_eq!(merged.width, Some(Dimension::Px(200)));
        assert_eq!(merged.fg, Some(Rgba::WHITE.into()));
        assert_eq!(merged.bg, Some(Rgba::BLACK.into()));
        assert_eq!(merged.padding, Some(Edges::all(4)));
    }

    #[test]
    fn test_merge_not_commutative() {
        let ab = sample_a().merge(&sample_b());
        let ba = sample_b().merge(&sample_a());
        assert_ne!(ab.width, ba.width);
    }

    #[test]
    fn test_merge_empty_identity() {
        let a = sample_a();
        assert_eq!(a.merge(&StyleValue::empty()), a);
        assert_eq!(StyleValue::empty().merge(&a), a);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let a = sample_a();
        let b = sample_b();
        assert_eq!(a.merge(&b), a.merge(&b));
    }

    #[test]
    fn test_merge_hover_is_shallow() {
        let base = StyleValue {
            hover: Some(Box::new(sample_a())),
            ..Default::default()
        };
        let ext = StyleValue {
            hover: Some(Box::new(sample_b())),
            ..Default::default()
        };
        let merged = base.merge(&ext);
        // The extension's hover replaces the base's wholesale.
        assert_eq!(merged.hover, Some(Box::new(sample_b())));
    }

    #[test]
    fn test_field_order_irrelevant_for_equality() {
        // Two styles written in different accessor orders are the same value.
        let mut first = StyleValue::empty();
        first.fg = Some(Rgba::RED.into());
        first.width = Some(Dimension::Px(10));

        let mut second = StyleValue::empty();
        second.width = Some(Dimension::Px(10));
        second.fg = Some(Rgba::RED.into());

        assert_eq!(first, second);
    }

    #[test]
    fn test_is_empty() {
        assert!(StyleValue::empty().is_empty());
        assert!(!sample_a().is_empty());
    }
}
