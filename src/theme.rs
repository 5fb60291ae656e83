//! Theme and icon registries.
//!
//! Persist-backed mappings from semantic tokens to concrete values.
//! Style color fields may carry a [`ThemeToken`] instead of a concrete
//! color; resolution consults the active theme when commands are applied.
//!
//! # Example
//!
//! ```ignore
//! use vapor_ui::theme::{midnight, set_theme};
//!
//! set_theme("midnight");
//! text("hello").fg(ThemeToken::Primary).end();
//! ```

use rustc_hash::FxHashMap;

use crate::engine;
use crate::style::ColorValue;
use crate::types::Rgba;

// =============================================================================
// Tokens
// =============================================================================

/// Semantic color tokens resolvable against the active theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ThemeToken {
    Primary = 0,
    Secondary = 1,
    Accent = 2,
    Success = 3,
    Warning = 4,
    Error = 5,
    Info = 6,
    Text = 7,
    TextMuted = 8,
    Background = 9,
    Surface = 10,
    Border = 11,
    BorderFocus = 12,
}

// =============================================================================
// ThemeColor
// =============================================================================

/// Theme color can be:
/// - `Default`: the surface's default color
/// - `Rgb(rgba)`: explicit RGB color
/// - `Str(s)`: string to be parsed (hex, keywords)
#[derive(Debug, Clone, PartialEq)]
pub enum ThemeColor {
    /// Use the surface's default color.
    Default,
    /// Explicit RGB color.
    Rgb(Rgba),
    /// String to be parsed (hex, keywords).
    Str(String),
}

impl ThemeColor {
    /// Resolve to Rgba. Parses string if needed.
    ///
    /// - `Default` returns `Rgba::SURFACE_DEFAULT`
    /// - `Rgb(c)` returns the color directly
    /// - `Str(s)` parses the string, returning magenta on parse failure
    pub fn resolve(&self) -> Rgba {
        match self {
            Self::Default => Rgba::SURFACE_DEFAULT,
            Self::Rgb(c) => *c,
            Self::Str(s) => Rgba::parse(s).unwrap_or(Rgba::MAGENTA),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl Default for ThemeColor {
    fn default() -> Self {
        Self::Default
    }
}

/// `()` means the surface default.
impl From<()> for ThemeColor {
    fn from(_: ()) -> Self {
        Self::Default
    }
}

impl From<Rgba> for ThemeColor {
    fn from(color: Rgba) -> Self {
        Self::Rgb(color)
    }
}

impl From<&str> for ThemeColor {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

/// `u32` is an RGB integer (0xRRGGBB).
impl From<u32> for ThemeColor {
    fn from(rgb: u32) -> Self {
        Self::Rgb(Rgba::from_rgb_int(rgb))
    }
}

// =============================================================================
// Theme
// =============================================================================

/// Theme definition with all semantic color slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    /// Theme name (e.g., "midnight").
    pub name: String,
    /// Theme description.
    pub description: String,

    pub primary: ThemeColor,
    pub secondary: ThemeColor,
    pub accent: ThemeColor,
    pub success: ThemeColor,
    pub warning: ThemeColor,
    pub error: ThemeColor,
    pub info: ThemeColor,
    pub text: ThemeColor,
    pub text_muted: ThemeColor,
    pub background: ThemeColor,
    pub surface: ThemeColor,
    pub border: ThemeColor,
    pub border_focus: ThemeColor,
}

impl Theme {
    /// Create a new theme with every slot on the surface default.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            primary: ThemeColor::Default,
            secondary: ThemeColor::Default,
            accent: ThemeColor::Default,
            success: ThemeColor::Default,
            warning: ThemeColor::Default,
            error: ThemeColor::Default,
            info: ThemeColor::Default,
            text: ThemeColor::Default,
            text_muted: ThemeColor::Default,
            background: ThemeColor::Default,
            surface: ThemeColor::Default,
            border: ThemeColor::Default,
            border_focus: ThemeColor::Default,
        }
    }

    /// The slot a token names.
    pub fn slot(&self, token: ThemeToken) -> &ThemeColor {
        match token {
            ThemeToken::Primary => &self.primary,
            ThemeToken::Secondary => &self.secondary,
            ThemeToken::Accent => &self.accent,
            ThemeToken::Success => &self.success,
            ThemeToken::Warning => &self.warning,
            ThemeToken::Error => &self.error,
            ThemeToken::Info => &self.info,
            ThemeToken::Text => &self.text,
            ThemeToken::TextMuted => &self.text_muted,
            ThemeToken::Background => &self.background,
            ThemeToken::Surface => &self.surface,
            ThemeToken::Border => &self.border,
            ThemeToken::BorderFocus => &self.border_focus,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        midnight()
    }
}

// =============================================================================
// Presets
// =============================================================================

/// Dark preset.
pub fn midnight() -> Theme {
    Theme {
        primary: 0x7c8cf8u32.into(),
        secondary: 0x56b6c2u32.into(),
        accent: 0xc678ddu32.into(),
        success: 0x98c379u32.into(),
        warning: 0xe5c07bu32.into(),
        error: 0xe06c75u32.into(),
        info: 0x61afefu32.into(),
        text: 0xdcdfe4u32.into(),
        text_muted: 0x7f848eu32.into(),
        background: 0x1e222au32.into(),
        surface: 0x282c34u32.into(),
        border: 0x3e4451u32.into(),
        border_focus: 0x7c8cf8u32.into(),
        ..Theme::new("midnight", "Dark theme with muted blues")
    }
}

/// Light preset.
pub fn paper() -> Theme {
    Theme {
        primary: 0x4055c8u32.into(),
        secondary: 0x0f7f8bu32.into(),
        accent: 0x9333eau32.into(),
        success: 0x447024u32.into(),
        warning: 0x9a6700u32.into(),
        error: 0xc02424u32.into(),
        info: 0x1f6feau32.into(),
        text: 0x24292fu32.into(),
        text_muted: 0x6e7781u32.into(),
        background: 0xfafbfcu32.into(),
        surface: 0xffffffu32.into(),
        border: 0xd0d7deu32.into(),
        border_focus: 0x4055c8u32.into(),
        ..Theme::new("paper", "Light theme on warm white")
    }
}

/// Built-in preset by name.
pub fn get_preset(name: &str) -> Option<Theme> {
    match name {
        "midnight" => Some(midnight()),
        "paper" => Some(paper()),
        _ => None,
    }
}

/// Names of the built-in presets.
pub fn preset_names() -> &'static [&'static str] {
    &["midnight", "paper"]
}

// =============================================================================
// Storage hook
// =============================================================================

/// Key the registry persists the theme choice under.
pub const THEME_STORAGE_KEY: &str = "vapor.theme";

/// Host-implemented persistence for small key/value state. The core
/// requires none; the registry uses it to remember the theme choice.
pub trait StorageHook {
    fn store(&self, key: &str, value: &str);
    fn load(&self, key: &str) -> Option<String>;
}

/// In-memory storage hook for tests and hosts without persistence.
#[derive(Default, Clone)]
pub struct MemoryStore {
    values: std::rc::Rc<std::cell::RefCell<FxHashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageHook for MemoryStore {
    fn store(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn load(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

// =============================================================================
// Registry
// =============================================================================

pub(crate) struct ThemeRegistry {
    themes: Vec<Theme>,
    active: usize,
    icons: FxHashMap<String, String>,
    storage: Option<Box<dyn StorageHook>>,
}

impl ThemeRegistry {
    pub fn new() -> Self {
        Self {
            themes: vec![midnight()],
            active: 0,
            icons: FxHashMap::default(),
            storage: None,
        }
    }

    pub fn register(&mut self, theme: Theme, make_default: bool) {
        let position = self.themes.iter().position(|t| t.name == theme.name);
        let idx = match position {
            Some(idx) => {
                self.themes[idx] = theme;
                idx
            }
            None => {
                self.themes.push(theme);
                self.themes.len() - 1
            }
        };
        if make_default {
            self.active = idx;
        }
    }

    pub fn set_active(&mut self, name: &str) -> bool {
        match self.themes.iter().position(|t| t.name == name) {
            Some(idx) => {
                self.active = idx;
                if let Some(storage) = &self.storage {
                    storage.store(THEME_STORAGE_KEY, name);
                }
                true
            }
            None => false,
        }
    }

    pub fn active(&self) -> &Theme {
        &self.themes[self.active]
    }

    pub fn names(&self) -> Vec<String> {
        self.themes.iter().map(|t| t.name.clone()).collect()
    }

    pub fn install_storage(&mut self, storage: Box<dyn StorageHook>) {
        if let Some(saved) = storage.load(THEME_STORAGE_KEY) {
            if let Some(idx) = self.themes.iter().position(|t| t.name == saved) {
                self.active = idx;
            }
        }
        self.storage = Some(storage);
    }

    pub fn register_icon(&mut self, name: &str, glyph: &str) {
        self.icons.insert(name.to_string(), glyph.to_string());
    }

    pub fn icon(&self, name: &str) -> Option<String> {
        self.icons.get(name).cloned()
    }
}

// =============================================================================
// Public surface
// =============================================================================

/// Register a theme with the engine; `make_default` activates it.
pub fn register_theme(theme: Theme, make_default: bool) {
    if engine::with_engine(|e| e.themes.register(theme.clone(), make_default)).is_none() {
        log::error!("register_theme before init");
    }
}

/// Activate a registered theme by name. Persists the choice when a
/// storage hook is installed.
pub fn set_theme(name: &str) -> bool {
    engine::with_engine(|e| e.themes.set_active(name)).unwrap_or(false)
}

/// Clone of the active theme.
pub fn active_theme() -> Option<Theme> {
    engine::with_engine(|e| e.themes.active().clone())
}

/// Resolve a semantic token against the active theme.
pub fn resolve_token(token: ThemeToken) -> Rgba {
    engine::with_engine(|e| e.themes.active().slot(token).resolve())
        .unwrap_or(Rgba::SURFACE_DEFAULT)
}

/// Resolve any color style field against the active theme.
pub fn resolve_color(color: ColorValue) -> Rgba {
    match color {
        ColorValue::Rgba(rgba) => rgba,
        ColorValue::Token(token) => resolve_token(token),
    }
}

/// Install the host's storage hook. A stored theme choice is applied
/// immediately if it names a registered theme.
pub fn set_storage_hook(storage: Box<dyn StorageHook>) {
    if engine::with_engine(|e| e.themes.install_storage(storage)).is_none() {
        log::error!("set_storage_hook before init");
    }
}

/// Register an icon glyph (or source) under a semantic name.
pub fn register_icon(name: &str, glyph: &str) {
    if engine::with_engine(|e| e.themes.register_icon(name, glyph)).is_none() {
        log::error!("register_icon before init");
    }
}

/// Look up a registered icon.
pub fn icon(name: &str) -> Option<String> {
    engine::with_engine(|e| e.themes.icon(name)).flatten()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_color_resolve() {
        assert!(ThemeColor::Default.resolve().is_surface_default());
        assert_eq!(
            ThemeColor::Rgb(Rgba::rgb(1, 2, 3)).resolve(),
            Rgba::rgb(1, 2, 3)
        );
        assert_eq!(
            ThemeColor::Str("#ff0000".into()).resolve(),
            Rgba::rgb(255, 0, 0)
        );
        // Parse failure falls back to magenta.
        assert_eq!(ThemeColor::Str("bogus".into()).resolve(), Rgba::MAGENTA);
    }

    #[test]
    fn test_theme_color_from() {
        let c: ThemeColor = ().into();
        assert!(c.is_default());
        let c: ThemeColor = 0xff0000u32.into();
        assert_eq!(c, ThemeColor::Rgb(Rgba::rgb(255, 0, 0)));
        let c: ThemeColor = "#00ff00".into();
        assert_eq!(c.resolve(), Rgba::rgb(0, 255, 0));
    }

    #[test]
    fn test_presets() {
        let dark = get_preset("midnight").unwrap();
        assert_eq!(dark.name, "midnight");
        assert!(get_preset("nope").is_none());
        for name in preset_names() {
            assert!(get_preset(name).is_some());
        }
    }

    #[test]
    fn test_registry_register_and_activate() {
        let mut registry = ThemeRegistry::new();
        registry.register(paper(), false);
        assert_eq!(registry.active().name, "midnight");

        assert!(registry.set_active("paper"));
        assert_eq!(registry.active().name, "paper");
        assert!(!registry.set_active("unknown"));
        assert_eq!(registry.active().name, "paper");
    }

    #[test]
    fn test_registry_reregister_replaces() {
        let mut registry = ThemeRegistry::new();
        let mut custom = paper();
        custom.primary = 0x123456u32.into();
        registry.register(paper(), false);
        registry.register(custom.clone(), false);
        assert!(registry.set_active("paper"));
        assert_eq!(registry.active().primary, custom.primary);
    }

    #[test]
    fn test_storage_round_trip() {
        let store = MemoryStore::new();
        store.store(THEME_STORAGE_KEY, "paper");

        let mut registry = ThemeRegistry::new();
        registry.register(paper(), false);
        registry.install_storage(Box::new(store.clone()));
        // The stored choice is applied on install.
        assert_eq!(registry.active().name, "paper");

        registry.set_active("midnight");
        assert_eq!(store.load(THEME_STORAGE_KEY).as_deref(), Some("midnight"));
    }

    #[test]
    fn test_icons() {
        let mut registry = ThemeRegistry::new();
        registry.register_icon("close", "\u{2715}");
        assert_eq!(registry.icon("close").as_deref(), Some("\u{2715}"));
        assert!(registry.icon("open").is_none());
    }

    #[test]
    fn test_token_slots() {
        let theme = midnight();
        assert_eq!(theme.slot(ThemeToken::Primary), &theme.primary);
        assert_eq!(theme.slot(ThemeToken::Border), &theme.border);
    }
}
