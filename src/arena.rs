//! Arena allocation for frame, view, session, and caller-scoped data.
//!
//! The engine owns four named arenas with distinct lifetimes. Allocations
//! are identified by offset-based [`Span`]s rather than pointers, so spans
//! stay `Copy` and the borrow checker never sees a self-reference; a
//! generation counter makes stale spans detectable after a reset.
//!
//! Lifetimes:
//! - `frame` is reset at the end of every render pass, after commands are
//!   emitted and dispatched.
//! - `view` is reset when the router crosses a route boundary.
//! - `persist` is reset only at teardown.
//! - `scratch` is reset at caller discretion; never by the engine.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::EngineError;

// =============================================================================
// Arena Kind
// =============================================================================

/// The four arena lifetimes the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArenaKind {
    /// Reset after every render pass.
    Frame = 0,
    /// Reset on route change.
    View = 1,
    /// Reset only at teardown.
    Persist = 2,
    /// Reset at caller discretion only.
    Scratch = 3,
}

impl ArenaKind {
    pub const ALL: [ArenaKind; 4] = [Self::Frame, Self::View, Self::Persist, Self::Scratch];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Frame => "frame",
            Self::View => "view",
            Self::Persist => "persist",
            Self::Scratch => "scratch",
        }
    }
}

impl std::fmt::Display for ArenaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Span
// =============================================================================

/// An offset run inside one arena.
///
/// A span is only meaningful against the arena that produced it, and only
/// until that arena's next reset; the generation field catches violations
/// in debug builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    offset: u32,
    len: u32,
    generation: u32,
}

impl Span {
    /// The empty span, valid against any arena in any generation.
    pub const EMPTY: Span = Span {
        offset: 0,
        len: 0,
        generation: 0,
    };

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// =============================================================================
// Arena
// =============================================================================

/// A bump region over one owned byte buffer.
///
/// Supports only `alloc` and `reset`; individual frees do not exist.
/// An optional byte limit turns exhaustion into a recoverable
/// [`EngineError::ArenaExhausted`] instead of unbounded growth.
pub struct Arena {
    kind: ArenaKind,
    buf: Vec<u8>,
    limit: Option<usize>,
    generation: u32,
}

impl Arena {
    /// Create an unlimited arena of the given kind.
    pub fn new(kind: ArenaKind) -> Self {
        Self {
            kind,
            buf: Vec::new(),
            limit: None,
            generation: 1,
        }
    }

    /// Create an arena that fails allocations past `limit` bytes.
    pub fn with_limit(kind: ArenaKind, limit: usize) -> Self {
        Self {
            kind,
            buf: Vec::new(),
            limit: Some(limit),
            generation: 1,
        }
    }

    /// Reserve a run of `len` bytes at the given alignment.
    pub fn alloc(&mut self, len: usize, align: usize) -> Result<Span, EngineError> {
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");
        let offset = (self.buf.len() + align - 1) & !(align - 1);
        let end = offset + len;
        if let Some(limit) = self.limit {
            if end > limit {
                return Err(EngineError::ArenaExhausted {
                    kind: self.kind,
                    requested: len,
                    available: limit.saturating_sub(self.buf.len()),
                });
            }
        }
        if end > u32::MAX as usize {
            return Err(EngineError::ArenaExhausted {
                kind: self.kind,
                requested: len,
                available: u32::MAX as usize - self.buf.len(),
            });
        }
        self.buf.resize(end, 0);
        Ok(Span {
            offset: offset as u32,
            len: len as u32,
            generation: self.generation,
        })
    }

    /// Duplicate a byte slice into the arena.
    pub fn alloc_bytes(&mut self, data: &[u8]) -> Result<Span, EngineError> {
        let span = self.alloc(data.len(), 1)?;
        let start = span.offset as usize;
        self.buf[start..start + data.len()].copy_from_slice(data);
        Ok(span)
    }

    /// Duplicate a string into the arena.
    pub fn alloc_str(&mut self, s: &str) -> Result<Span, EngineError> {
        self.alloc_bytes(s.as_bytes())
    }

    /// Account for storage held by an arena-lifetime structure without
    /// handing out a span (session tables own their typed storage but
    /// draw on the arena's byte budget).
    pub fn charge(&mut self, len: usize) -> Result<(), EngineError> {
        self.alloc(len, 1).map(|_| ())
    }

    /// Resolve a span to its bytes.
    pub fn bytes(&self, span: Span) -> &[u8] {
        if span.is_empty() {
            return &[];
        }
        debug_assert_eq!(
            span.generation, self.generation,
            "span outlived an arena reset"
        );
        let start = span.offset as usize;
        &self.buf[start..start + span.len as usize]
    }

    /// Resolve a span produced by [`Arena::alloc_str`] back to a string.
    pub fn str_at(&self, span: Span) -> &str {
        std::str::from_utf8(self.bytes(span)).expect("span does not cover a UTF-8 run")
    }

    /// Reset to empty. All outstanding spans become stale.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.generation += 1;
    }

    /// Bytes currently allocated.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current byte budget, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Install or clear the byte budget. Takes effect on the next alloc.
    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    /// Reset-generation counter; bumps on every [`Arena::reset`].
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn kind(&self) -> ArenaKind {
        self.kind
    }
}

// =============================================================================
// Arena-scoped sequences
// =============================================================================

/// Type-erased clear hook so the engine can wipe registered sequences when
/// their arena resets.
pub(crate) trait SeqClear {
    fn clear(&self);
}

struct SeqCell<T> {
    values: RefCell<Vec<T>>,
}

impl<T> SeqClear for SeqCell<T> {
    fn clear(&self) {
        self.values.borrow_mut().clear();
    }
}

/// A growing ordered sequence whose contents live as long as the named
/// arena: when the engine resets that arena, every sequence registered
/// against it is cleared too.
///
/// # Example
///
/// ```ignore
/// let log: ArenaSeq<String> = arena_seq(ArenaKind::View);
/// log.push("visited".to_string());
/// // cleared automatically on the next route change
/// ```
pub struct ArenaSeq<T> {
    kind: ArenaKind,
    cell: Rc<SeqCell<T>>,
}

impl<T> Clone for ArenaSeq<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: 'static> ArenaSeq<T> {
    pub(crate) fn new(kind: ArenaKind) -> (Self, Weak<dyn SeqClear>) {
        let cell = Rc::new(SeqCell {
            values: RefCell::new(Vec::new()),
        });
        let erased: Rc<dyn SeqClear> = cell.clone();
        (Self { kind, cell }, Rc::downgrade(&erased))
    }

    pub fn push(&self, value: T) {
        self.cell.values.borrow_mut().push(value);
    }

    pub fn len(&self) -> usize {
        self.cell.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell.values.borrow().is_empty()
    }

    /// Read the sequence contents under a closure.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.cell.values.borrow())
    }

    /// Mutate the sequence contents under a closure.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        f(&mut self.cell.values.borrow_mut())
    }

    pub fn clear(&self) {
        self.cell.values.borrow_mut().clear();
    }

    /// The arena lifetime this sequence is scoped to.
    pub fn kind(&self) -> ArenaKind {
        self.kind
    }
}

impl<T: Clone + 'static> ArenaSeq<T> {
    /// Snapshot the contents into an owned vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.cell.values.borrow().clone()
    }
}

/// Per-kind registry of live sequences, pruned lazily.
pub(crate) struct SeqRegistry {
    entries: [Vec<Weak<dyn SeqClear>>; 4],
}

impl SeqRegistry {
    pub fn new() -> Self {
        Self {
            entries: [Vec::new(), Vec::new(), Vec::new(), Vec::new()],
        }
    }

    pub fn register(&mut self, kind: ArenaKind, weak: Weak<dyn SeqClear>) {
        self.entries[kind as usize].push(weak);
    }

    /// Clear every live sequence scoped to `kind` and drop dead entries.
    pub fn clear_kind(&mut self, kind: ArenaKind) {
        self.entries[kind as usize].retain(|weak| match weak.upgrade() {
            Some(cell) => {
                cell.clear();
                true
            }
            None => false,
        });
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_read_back() {
        let mut arena = Arena::new(ArenaKind::Frame);
        let a = arena.alloc_str("hello").unwrap();
        let b = arena.alloc_str("world").unwrap();
        assert_eq!(arena.str_at(a), "hello");
        assert_eq!(arena.str_at(b), "world");
    }

    #[test]
    fn test_allocations_never_overlap() {
        let mut arena = Arena::new(ArenaKind::Scratch);
        let a = arena.alloc(16, 8).unwrap();
        let b = arena.alloc(16, 8).unwrap();
        assert!(a.offset + a.len <= b.offset);
    }

    #[test]
    fn test_alignment() {
        let mut arena = Arena::new(ArenaKind::Scratch);
        arena.alloc(3, 1).unwrap();
        let aligned = arena.alloc(8, 8).unwrap();
        assert_eq!(aligned.offset % 8, 0);
    }

    #[test]
    fn test_limit_exhaustion() {
        let mut arena = Arena::with_limit(ArenaKind::Frame, 8);
        arena.alloc(4, 1).unwrap();
        let err = arena.alloc(16, 1).unwrap_err();
        match err {
            EngineError::ArenaExhausted {
                kind, requested, ..
            } => {
                assert_eq!(kind, ArenaKind::Frame);
                assert_eq!(requested, 16);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // A failing alloc must not grow the arena.
        assert_eq!(arena.len(), 4);
    }

    #[test]
    fn test_reset_bumps_generation() {
        let mut arena = Arena::new(ArenaKind::View);
        let gen_before = arena.generation();
        arena.alloc_str("data").unwrap();
        arena.reset();
        assert_eq!(arena.len(), 0);
        assert_eq!(arena.generation(), gen_before + 1);
    }

    #[test]
    fn test_empty_span_is_stable() {
        let mut arena = Arena::new(ArenaKind::Frame);
        let empty = arena.alloc_str("").unwrap();
        arena.reset();
        // Zero-length spans survive resets.
        assert_eq!(arena.str_at(Span::EMPTY), "");
        assert_eq!(empty.len(), 0);
    }

    #[test]
    fn test_charge_counts_against_limit() {
        let mut arena = Arena::with_limit(ArenaKind::Persist, 64);
        arena.charge(32).unwrap();
        arena.charge(32).unwrap();
        assert!(arena.charge(1).is_err());
    }

    #[test]
    fn test_seq_registry_clears_scoped_sequences() {
        let mut registry = SeqRegistry::new();
        let (seq, weak) = ArenaSeq::<i32>::new(ArenaKind::View);
        registry.register(ArenaKind::View, weak);

        seq.push(1);
        seq.push(2);
        assert_eq!(seq.len(), 2);

        // Clearing a different kind leaves the sequence alone.
        registry.clear_kind(ArenaKind::Frame);
        assert_eq!(seq.len(), 2);

        registry.clear_kind(ArenaKind::View);
        assert!(seq.is_empty());
    }

    #[test]
    fn test_seq_registry_prunes_dead_entries() {
        let mut registry = SeqRegistry::new();
        {
            let (_seq, weak) = ArenaSeq::<u8>::new(ArenaKind::Frame);
            registry.register(ArenaKind::Frame, weak);
        }
        registry.clear_kind(ArenaKind::Frame);
        assert!(registry.entries[ArenaKind::Frame as usize].is_empty());
    }
}
