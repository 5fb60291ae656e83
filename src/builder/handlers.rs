//! Event-handler bindings.
//!
//! Bindings come in two forms: a zero-argument function, and a function
//! with a precomposed context value captured by value. At dispatch time
//! the host-delivered event payload arrives as the final argument.
//!
//! Rust closures have no stable function address, so handler identity for
//! update diffing is the hash of (registration call site, context hash).
//! Two handlers registered at the same call site with equal context
//! compare equal across passes.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::FxHasher;

use crate::tree::SourceSalt;
use crate::types::EventPayload;

/// A callable bound to a node event, with a diff-stable identity.
#[derive(Clone)]
pub struct HandlerBinding {
    id: u64,
    f: Rc<dyn Fn(&EventPayload)>,
}

impl HandlerBinding {
    /// Bind a zero-argument handler. The event payload is still passed at
    /// dispatch; zero-argument here means no precomposed context.
    #[track_caller]
    pub fn new(f: impl Fn(&EventPayload) + 'static) -> Self {
        let salt = SourceSalt::here();
        let mut hasher = FxHasher::default();
        salt.raw().hash(&mut hasher);
        0u64.hash(&mut hasher);
        Self {
            id: hasher.finish(),
            f: Rc::new(f),
        }
    }

    /// Bind a handler with a precomposed context value. The context is
    /// captured by value; dispatch calls `f(&ctx, payload)`.
    #[track_caller]
    pub fn with_ctx<C>(f: impl Fn(&C, &EventPayload) + 'static, ctx: C) -> Self
    where
        C: Hash + 'static,
    {
        let salt = SourceSalt::here();
        let mut ctx_hasher = FxHasher::default();
        ctx.hash(&mut ctx_hasher);
        let ctx_hash = ctx_hasher.finish();

        let mut hasher = FxHasher::default();
        salt.raw().hash(&mut hasher);
        ctx_hash.hash(&mut hasher);
        Self {
            id: hasher.finish(),
            f: Rc::new(move |payload: &EventPayload| f(&ctx, payload)),
        }
    }

    /// Diff-stable identity: hash of (call-site salt, context hash).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Invoke the handler with the host-delivered payload.
    pub fn invoke(&self, payload: &EventPayload) {
        (self.f)(payload);
    }

    /// The callable, for dispatch outside engine borrows.
    pub(crate) fn callable(&self) -> Rc<dyn Fn(&EventPayload)> {
        Rc::clone(&self.f)
    }
}

impl PartialEq for HandlerBinding {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HandlerBinding {}

impl std::fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_invoke_passes_payload() {
        let seen = Rc::new(Cell::new(false));
        let seen_clone = seen.clone();
        let binding = HandlerBinding::new(move |payload| {
            seen_clone.set(payload.as_text() == Some("hi"));
        });
        binding.invoke(&EventPayload::Text("hi".to_string()));
        assert!(seen.get());
    }

    #[test]
    fn test_ctx_is_precomposed() {
        let sum = Rc::new(Cell::new(0));
        let sum_clone = sum.clone();
        let binding = HandlerBinding::with_ctx(
            move |ctx: &(i32, i32), _payload| {
                sum_clone.set(ctx.0 + ctx.1);
            },
            (2, 40),
        );
        binding.invoke(&EventPayload::Empty);
        assert_eq!(sum.get(), 42);
    }

    #[test]
    fn test_identity_differs_by_ctx() {
        fn make(n: i32) -> HandlerBinding {
            HandlerBinding::with_ctx(|_: &i32, _| {}, n)
        }
        // Same call site, different context.
        let a = make(1);
        let b = make(2);
        assert_ne!(a.id(), b.id());

        // Same call site, same context: identical across constructions.
        let c = make(1);
        assert_eq!(a.id(), c.id());
    }

    #[test]
    fn test_identity_differs_by_call_site() {
        let a = HandlerBinding::new(|_| {});
        let b = HandlerBinding::new(|_| {});
        assert_ne!(a.id(), b.id());
    }
}
