//! Style interning - content-addressed deduplication of style values.
//!
//! Every distinct style value is stored once for the session and named by
//! a stable [`StyleHandle`]. Equal values collapse to equal handles no
//! matter the order they were submitted, which turns style comparison in
//! the reconciler into an integer compare.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;

use crate::arena::Arena;
use crate::error::EngineError;
use crate::style::StyleValue;

// =============================================================================
// StyleHandle
// =============================================================================

/// Opaque integer naming an interned style value. Stable for the session;
/// never freed individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleHandle(u32);

impl StyleHandle {
    /// The handle of the all-unset style, pre-interned at table creation.
    pub const UNSET: StyleHandle = StyleHandle(0);

    /// Raw table index, for the host command stream.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

// =============================================================================
// StyleInterner
// =============================================================================

/// The session style table.
///
/// Buckets map a value hash to candidate handles; a candidate is reused
/// only after an exact equality probe, so hash collisions cannot alias
/// distinct styles. Canonical values sit in a parallel vector indexed by
/// handle. Table growth draws on the persist arena's byte budget.
pub struct StyleInterner {
    buckets: FxHashMap<u64, SmallVec<[StyleHandle; 2]>>,
    canon: Vec<StyleValue>,
}

fn value_hash(value: &StyleValue) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

impl StyleInterner {
    pub fn new() -> Self {
        let mut interner = Self {
            buckets: FxHashMap::default(),
            canon: Vec::new(),
        };
        // Handle 0 is always the empty style; no arena charge for it.
        let empty = StyleValue::empty();
        let hash = value_hash(&empty);
        interner.canon.push(empty);
        interner
            .buckets
            .insert(hash, smallvec::smallvec![StyleHandle::UNSET]);
        interner
    }

    /// Intern a style value, returning its stable handle.
    ///
    /// Charges the persist arena for new entries; an exhausted persist
    /// arena is a fatal configuration error for the running pass.
    pub fn intern(
        &mut self,
        value: StyleValue,
        persist: &mut Arena,
    ) -> Result<StyleHandle, EngineError> {
        let hash = value_hash(&value);
        if let Some(bucket) = self.buckets.get(&hash) {
            for &handle in bucket {
                if self.canon[handle.0 as usize] == value {
                    return Ok(handle);
                }
            }
        }

        persist.charge(std::mem::size_of::<StyleValue>())?;
        let handle = StyleHandle(self.canon.len() as u32);
        self.canon.push(value);
        self.buckets.entry(hash).or_default().push(handle);
        Ok(handle)
    }

    /// The canonical value for a handle.
    pub fn resolve(&self, handle: StyleHandle) -> &StyleValue {
        &self.canon[handle.0 as usize]
    }

    /// Number of distinct styles interned this session. At least 1: the
    /// empty style is always present.
    pub fn len(&self) -> usize {
        self.canon.len()
    }
}

impl Default for StyleInterner {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaKind;
    use crate::types::{Dimension, Rgba};

    fn persist() -> Arena {
        Arena::new(ArenaKind::Persist)
    }

    #[test]
    fn test_equal_values_collapse() {
        let mut interner = StyleInterner::new();
        let mut arena = persist();

        let mut a = StyleValue::empty();
        a.fg = Some(Rgba::RED.into());
        a.width = Some(Dimension::Px(10));

        // Same fields written in the opposite order.
        let mut b = StyleValue::empty();
        b.width = Some(Dimension::Px(10));
        b.fg = Some(Rgba::RED.into());

        let ha = interner.intern(a, &mut arena).unwrap();
        let hb = interner.intern(b, &mut arena).unwrap();
        assert_eq!(ha, hb);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_distinct_values_distinct_handles() {
        let mut interner = StyleInterner::new();
        let mut arena = persist();

        let mut a = StyleValue::empty();
        a.opacity = Some(128);
        let mut b = StyleValue::empty();
        b.opacity = Some(129);

        let ha = interner.intern(a.clone(), &mut arena).unwrap();
        let hb = interner.intern(b, &mut arena).unwrap();
        assert_ne!(ha, hb);
        assert_eq!(interner.resolve(ha), &a);
    }

    #[test]
    fn test_empty_style_is_unset_handle() {
        let mut interner = StyleInterner::new();
        let mut arena = persist();
        let h = interner.intern(StyleValue::empty(), &mut arena).unwrap();
        assert_eq!(h, StyleHandle::UNSET);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_handles_stable_across_reintern() {
        let mut interner = StyleInterner::new();
        let mut arena = persist();

        let mut v = StyleValue::empty();
        v.gap = Some(8);
        let first = interner.intern(v.clone(), &mut arena).unwrap();
        for _ in 0..10 {
            assert_eq!(interner.intern(v.clone(), &mut arena).unwrap(), first);
        }
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_persist_exhaustion_is_reported() {
        let mut interner = StyleInterner::new();
        let mut arena = Arena::with_limit(ArenaKind::Persist, 1);

        let mut v = StyleValue::empty();
        v.gap = Some(1);
        let err = interner.intern(v, &mut arena).unwrap_err();
        assert!(matches!(err, EngineError::ArenaExhausted { .. }));
        // Failed interns must not leave a half-registered entry.
        assert_eq!(interner.len(), 1);
    }
}
