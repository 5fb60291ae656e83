//! Core types for vapor-ui.
//!
//! These types define the foundation that everything builds on.
//! They flow through the builder surface, the reconciler, and the
//! command stream the host applier consumes.

// =============================================================================
// Color
// =============================================================================

/// RGBA color with 8-bit channels (0-255).
///
/// Using integers for exact comparison - no floating point epsilon needed.
/// Alpha 255 = fully opaque, 0 = fully transparent.
/// Special value: r=-1 means "surface default" (let the host surface pick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: i16,
    pub g: i16,
    pub b: i16,
    pub a: i16,
}

impl Rgba {
    /// Create a new RGBA color.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as i16,
            g: g as i16,
            b: b as i16,
            a: a as i16,
        }
    }

    /// Create an opaque RGB color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Surface default color (let the host surface decide).
    pub const SURFACE_DEFAULT: Self = Self {
        r: -1,
        g: -1,
        b: -1,
        a: -1,
    };

    /// Transparent color.
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    // Standard colors
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const MAGENTA: Self = Self::rgb(255, 0, 255);
    pub const GRAY: Self = Self::rgb(128, 128, 128);

    /// Check if this is the surface default color.
    #[inline]
    pub const fn is_surface_default(&self) -> bool {
        self.r == -1
    }

    /// Check if color is fully transparent.
    #[inline]
    pub const fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Create from 0xRRGGBB integer format.
    ///
    /// # Examples
    ///
    /// ```
    /// use vapor_ui::types::Rgba;
    ///
    /// let red = Rgba::from_rgb_int(0xff0000);
    /// assert_eq!(red, Rgba::rgb(255, 0, 0));
    /// ```
    pub const fn from_rgb_int(rgb: u32) -> Self {
        Self::rgb(
            ((rgb >> 16) & 0xFF) as u8,
            ((rgb >> 8) & 0xFF) as u8,
            (rgb & 0xFF) as u8,
        )
    }

    /// Parse hex color string (#RGB, #RRGGBB, #RRGGBBAA).
    ///
    /// Returns None for invalid format.
    ///
    /// # Examples
    ///
    /// ```
    /// use vapor_ui::types::Rgba;
    ///
    /// let red = Rgba::from_hex("#ff0000").unwrap();
    /// assert_eq!(red, Rgba::rgb(255, 0, 0));
    ///
    /// // #RGB shorthand (expands each digit)
    /// let white = Rgba::from_hex("#fff").unwrap();
    /// assert_eq!(white, Rgba::rgb(255, 255, 255));
    ///
    /// // Without # prefix also works
    /// let blue = Rgba::from_hex("0000ff").unwrap();
    /// assert_eq!(blue, Rgba::rgb(0, 0, 255));
    ///
    /// assert!(Rgba::from_hex("#gg0000").is_none());
    /// ```
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');

        fn hex_digit(c: u8) -> Option<u8> {
            match c {
                b'0'..=b'9' => Some(c - b'0'),
                b'a'..=b'f' => Some(c - b'a' + 10),
                b'A'..=b'F' => Some(c - b'A' + 10),
                _ => None,
            }
        }

        fn hex_byte(s: &[u8], i: usize) -> Option<u8> {
            let high = hex_digit(s[i])?;
            let low = hex_digit(s[i + 1])?;
            Some((high << 4) | low)
        }

        let bytes = hex.as_bytes();
        match bytes.len() {
            // #RGB -> expand to #RRGGBB
            3 => {
                let r = hex_digit(bytes[0])?;
                let g = hex_digit(bytes[1])?;
                let b = hex_digit(bytes[2])?;
                Some(Self::rgb((r << 4) | r, (g << 4) | g, (b << 4) | b))
            }
            // #RRGGBB
            6 => {
                let r = hex_byte(bytes, 0)?;
                let g = hex_byte(bytes, 2)?;
                let b = hex_byte(bytes, 4)?;
                Some(Self::rgb(r, g, b))
            }
            // #RRGGBBAA
            8 => {
                let r = hex_byte(bytes, 0)?;
                let g = hex_byte(bytes, 2)?;
                let b = hex_byte(bytes, 4)?;
                let a = hex_byte(bytes, 6)?;
                Some(Self::new(r, g, b, a))
            }
            _ => None,
        }
    }

    /// Parse any supported color format.
    ///
    /// Supports:
    /// - hex (#RGB, #RRGGBB, #RRGGBBAA)
    /// - "transparent" keyword
    /// - "default" or "inherit" for the surface default
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        match input.to_ascii_lowercase().as_str() {
            "transparent" => return Some(Self::TRANSPARENT),
            "default" | "inherit" | "initial" => return Some(Self::SURFACE_DEFAULT),
            _ => {}
        }

        if input.starts_with('#') || input.bytes().all(|c| c.is_ascii_hexdigit()) {
            return Self::from_hex(input);
        }

        None
    }
}

// =============================================================================
// Dimension - Supports absolute and percentage values
// =============================================================================

/// A dimension value that can be absolute (pixels) or percentage.
///
/// - `Auto`: Auto-size based on content
/// - `Px(n)`: Absolute value in surface pixels
/// - `Percent(n)`: Percentage of parent (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dimension {
    /// Auto-size based on content.
    #[default]
    Auto,
    /// Absolute size in surface pixels.
    Px(u16),
    /// Percentage of parent size (0-100).
    Percent(u16),
}

impl From<u16> for Dimension {
    fn from(value: u16) -> Self {
        if value == 0 {
            Self::Auto
        } else {
            Self::Px(value)
        }
    }
}

impl From<i32> for Dimension {
    fn from(value: i32) -> Self {
        if value <= 0 {
            Self::Auto
        } else {
            Self::Px(value as u16)
        }
    }
}

// =============================================================================
// Text Attributes (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Text attributes as a bitfield for efficient storage and comparison.
    ///
    /// Combine with bitwise OR: `Attr::BOLD | Attr::ITALIC`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attr: u8 {
        const NONE = 0;
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const STRIKETHROUGH = 1 << 4;
        const MONOSPACE = 1 << 5;
    }
}

// =============================================================================
// Element Kinds
// =============================================================================

/// The closed set of display primitives the engine understands.
///
/// Each kind knows its permitted child arity; kind-gated builder
/// accessors consult the kind at configure time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ElementKind {
    #[default]
    Container = 0,
    Text = 1,
    Image = 2,
    Button = 3,
    Input = 4,
    Select = 5,
    Progress = 6,
    Link = 7,
}

/// Permitted number of children for an element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// No children permitted.
    None,
    /// Exactly one child.
    One,
    /// Any number of children.
    Many,
}

impl ElementKind {
    /// Permitted child arity for this kind.
    pub const fn arity(&self) -> Arity {
        match self {
            Self::Container | Self::Button => Arity::Many,
            Self::Link => Arity::One,
            Self::Text | Self::Image | Self::Input | Self::Select | Self::Progress => Arity::None,
        }
    }

    /// Whether children may be attached at all.
    pub const fn is_container(&self) -> bool {
        !matches!(self.arity(), Arity::None)
    }

    /// Stable display name, used in diagnostics and the command stream.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Text => "text",
            Self::Image => "image",
            Self::Button => "button",
            Self::Input => "input",
            Self::Select => "select",
            Self::Progress => "progress",
            Self::Link => "link",
        }
    }
}

impl From<u8> for ElementKind {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Text,
            2 => Self::Image,
            3 => Self::Button,
            4 => Self::Input,
            5 => Self::Select,
            6 => Self::Progress,
            7 => Self::Link,
            _ => Self::Container,
        }
    }
}

// =============================================================================
// Layout Enums - Style field values
// =============================================================================

/// Flex direction for container layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum FlexDirection {
    #[default]
    Column = 0,
    Row = 1,
    ColumnReverse = 2,
    RowReverse = 3,
}

impl FlexDirection {
    /// Check if this is a row direction (Row or RowReverse).
    pub const fn is_row(&self) -> bool {
        matches!(self, Self::Row | Self::RowReverse)
    }
}

/// Flex wrap behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum FlexWrap {
    #[default]
    NoWrap = 0,
    Wrap = 1,
    WrapReverse = 2,
}

/// Justify content (main axis alignment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum JustifyContent {
    #[default]
    FlexStart = 0,
    Center = 1,
    FlexEnd = 2,
    SpaceBetween = 3,
    SpaceAround = 4,
    SpaceEvenly = 5,
}

/// Align items (cross axis alignment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum AlignItems {
    #[default]
    Stretch = 0,
    FlexStart = 1,
    Center = 2,
    FlexEnd = 3,
    Baseline = 4,
}

/// Align self (item override for align items).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum AlignSelf {
    #[default]
    Auto = 0,
    Stretch = 1,
    FlexStart = 2,
    Center = 3,
    FlexEnd = 4,
}

/// Overflow behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Overflow {
    #[default]
    Visible = 0,
    Hidden = 1,
    Scroll = 2,
    Auto = 3,
}

/// Position type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Position {
    #[default]
    Relative = 0,
    Absolute = 1,
}

/// Text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TextAlign {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// Text wrap mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TextWrap {
    NoWrap = 0,
    #[default]
    Wrap = 1,
    Truncate = 2,
}

/// Border line style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BorderLine {
    #[default]
    None = 0,
    Solid = 1,
    Dashed = 2,
    Dotted = 3,
}

// =============================================================================
// Edges - Per-side spacing
// =============================================================================

/// Spacing applied per side, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Edges {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

impl Edges {
    /// The same value on all four sides.
    pub const fn all(value: u16) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Symmetric horizontal/vertical spacing.
    pub const fn symmetric(horizontal: u16, vertical: u16) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }
}

impl From<u16> for Edges {
    fn from(value: u16) -> Self {
        Self::all(value)
    }
}

// =============================================================================
// Events
// =============================================================================

/// Element-level event kinds a node handler can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    Press = 0,
    Change = 1,
    Submit = 2,
    Cancel = 3,
    Focus = 4,
    Blur = 5,
    KeyDown = 6,
    PointerEnter = 7,
    PointerLeave = 8,
}

/// Process-wide event kinds for `event_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalEventKind {
    /// The display surface was resized.
    Resize,
    /// A key went down anywhere on the surface.
    KeyDown,
    /// The surface became visible or hidden.
    Visibility,
}

/// Event value the host delivers; passed to handlers as the final argument.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventPayload {
    #[default]
    Empty,
    /// New text value (input change, submit).
    Text(String),
    /// Toggle state.
    Toggle(bool),
    /// Key code plus modifier bits.
    Key { code: u32, modifiers: u8 },
    /// Pointer position in surface coordinates.
    Pointer { x: i32, y: i32 },
    /// Surface size.
    Size { width: u32, height: u32 },
}

impl EventPayload {
    /// Text content, if this payload carries any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

// =============================================================================
// Render Mode
// =============================================================================

/// Policy deciding when the driver reruns the render root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// One pass per externally-originated event; mid-pass events coalesce
    /// into a single follow-up pass.
    #[default]
    Atomic,
    /// One pass per displayable frame tick.
    Immediate,
    /// Passes only on `cycle()` or a signal write.
    Retained,
}

// =============================================================================
// Tests
// =============================================================================
