//! Error Types
//!
//! Every failure in the reconciler is a programmer or structural error, never
//! a transient one, so nothing here is retried. The first error in a pass is
//! returned to the caller and halts the reconciler (see [`ReconcileError::Halted`]).

use thiserror::Error;

use crate::instance::InstanceId;

/// A declared tree that cannot be applied to its kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// A single-slot container received more than one resolved child widget.
    #[error("`{kind}` slot `{slot}` holds at most one child, got {count}")]
    TooManyChildren {
        kind: String,
        slot: String,
        count: usize,
    },

    /// A childless kind received resolved child widgets.
    #[error("`{kind}` does not accept children in `{slot}`, got {count}")]
    ChildrenNotAllowed {
        kind: String,
        slot: String,
        count: usize,
    },

    /// Two siblings derived the same key.
    #[error("duplicate sibling key `{key}`")]
    DuplicateKey { key: String },

    /// A `children` or inflatable prop held something other than a node list.
    #[error("`{kind}` slot `{slot}` must hold a list of nodes")]
    NotANodeList { kind: String, slot: String },

    /// A node list was passed under a prop the kind does not declare as a slot.
    #[error("`{kind}` has no slot `{slot}`")]
    UnknownSlot { kind: String, slot: String },
}

/// Errors produced while reconciling a tree.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// The backend could not build a widget for this kind.
    #[error("cannot construct `{kind}`: {reason}")]
    Construction { kind: String, reason: String },

    /// An update was requested while a pass was running and the
    /// configured policy rejects re-entrant updates.
    #[error("re-entrant update of instance {id} during a render pass")]
    Reentrant { id: InstanceId },

    /// The toolkit binding rejected an operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// A caller-initiated pass was started while another pass was running.
    #[error("reconciler is already running a pass")]
    Busy,

    /// Draining queued re-renders did not settle.
    #[error("queued re-renders did not settle after {limit} iterations")]
    RenderLoop { limit: usize },

    /// The id does not name a live instance.
    #[error("no live instance {0}")]
    UnknownInstance(InstanceId),

    /// An earlier pass failed; the tree is in an unknown state.
    #[error("reconciler halted after an earlier failure")]
    Halted,
}

impl ReconcileError {
    /// Shorthand for a [`ReconcileError::Construction`] error.
    pub fn construction(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Construction {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

/// Invalid configuration input.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_convert() {
        let err: ReconcileError = StructuralError::DuplicateKey { key: "0.Label#3".into() }.into();
        assert!(matches!(err, ReconcileError::Structural(_)));
        assert_eq!(err.to_string(), "duplicate sibling key `0.Label#3`");
    }

    #[test]
    fn construction_message_names_kind() {
        let err = ReconcileError::construction("Spinner", "not registered");
        assert_eq!(err.to_string(), "cannot construct `Spinner`: not registered");
    }
}
