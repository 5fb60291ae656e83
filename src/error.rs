//! Engine error taxonomy.
//!
//! Errors never unwind through builder calls: builders return values, not
//! results. Commit points and reconciliation surface errors to the driver,
//! which owns recovery. User code observes failures through the diagnostic
//! hook, never as panics disrupting UI declaration.

use crate::arena::ArenaKind;
use crate::tree::NodeId;

/// Everything the core can fail with, and how the driver recovers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// An arena could not satisfy an allocation. The in-flight pass is
    /// aborted cleanly; the retained tree and prior frame state stay intact
    /// and no partial commands are dispatched.
    #[error("arena `{kind}` exhausted: requested {requested} bytes, {available} available")]
    ArenaExhausted {
        kind: ArenaKind,
        requested: usize,
        available: usize,
    },

    /// The lifecycle stack protocol was violated. The pass is discarded and
    /// the retained tree kept.
    #[error("lifecycle imbalance: {0}")]
    LifecycleImbalance(LifecycleFault),

    /// Two siblings stayed indistinguishable after disambiguation. The
    /// reconciler degrades to positional matching within that parent.
    #[error("unresolved identity collision under parent {parent:?}")]
    IdentityCollision { parent: NodeId },

    /// The retained tree's identity index does not match its structure.
    /// The reconciler falls back to a full replace of the entire tree.
    #[error("retained tree identity index is inconsistent")]
    ReconcilerInconsistency,

    /// The host applier reported a failure. The retained tree is marked
    /// inconsistent and the next pass is a full replace.
    #[error("host failed to apply {op} command: {detail}")]
    HostApplyFailure { op: &'static str, detail: String },

    /// A user event handler panicked. Swallowed at the driver boundary;
    /// processing continues with the next event.
    #[error("event handler panicked for node {node:?}")]
    HandlerPanic { node: NodeId },

    /// An engine call was made before `init` or after `teardown`.
    #[error("engine is not initialized")]
    NotInitialized,

    /// `init` was called while an engine instance already exists.
    #[error("engine is already initialized")]
    AlreadyInitialized,
}

/// The specific lifecycle protocol violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleFault {
    /// The pass ended with open nodes still on the stack.
    StackNotEmpty { depth: usize },
    /// `close` was called with nothing open.
    CloseOnEmpty,
    /// `configure` reached a node no longer in the open phase.
    ConfigureAfterSeal,
}

impl std::fmt::Display for LifecycleFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StackNotEmpty { depth } => {
                write!(f, "pass ended with {depth} node(s) still open")
            }
            Self::CloseOnEmpty => write!(f, "close called on an empty stack"),
            Self::ConfigureAfterSeal => write!(f, "configure called after the node was sealed"),
        }
    }
}

impl EngineError {
    /// Whether the driver keeps the retained tree when recovering.
    ///
    /// Only a host apply failure invalidates it (the surface may have been
    /// partially mutated); everything else discards the in-flight pass and
    /// leaves the retained tree authoritative.
    pub fn retains_tree(&self) -> bool {
        !matches!(self, Self::HostApplyFailure { .. })
    }
}
