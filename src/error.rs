// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error taxonomy surfaced by the operation algebra, wrapped operations, and
//! the client state machine.

use thiserror::Error;

/// Errors raised by `synctext`. Raised at the point of detection; never
/// caught or retried internally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OtError {
    /// A builder call (`retain`/`insert`/`delete`) received an argument of
    /// the wrong kind (e.g. a negative length that isn't a valid count).
    #[error("builder received an argument of the wrong kind: {0}")]
    BuilderTypeError(String),

    /// `apply`: the input string's length didn't match the operation's
    /// `base_len`.
    #[error("apply: expected a string of length {expected}, got {actual}")]
    BaseLengthMismatch { expected: usize, actual: usize },

    /// `apply`: a `retain` ran past the end of the input string.
    #[error("apply: retain({n}) at offset {offset} overflows input of length {len}")]
    RetainOverflow { offset: usize, n: usize, len: usize },

    /// `apply`: the operation did not consume the whole input string.
    #[error("apply: operation did not consume the whole input (consumed {consumed} of {len})")]
    IncompleteApply { consumed: usize, len: usize },

    /// `compose(A, B)`: `A.target_len != B.base_len`.
    #[error("compose: A.target_len ({a_target}) != B.base_len ({b_base})")]
    ComposeLengthMismatch { a_target: usize, b_base: usize },

    /// `compose`: one side was exhausted while the other still had actions
    /// left, or vice versa — a malformed operation pair.
    #[error("compose: operand sequences are structurally incompatible")]
    ComposeStructural,

    /// `transform(A, B)`: `A.base_len != B.base_len`.
    #[error("transform: A.base_len ({a_base}) != B.base_len ({b_base})")]
    TransformLengthMismatch { a_base: usize, b_base: usize },

    /// `transform`: reached an action-kind pairing that cannot occur for
    /// `{retain, insert, delete}` operations (defensive; see DESIGN.md).
    #[error("transform: operations aren't compatible")]
    TransformIncompatible,

    /// Deserialization: the record's declared `base_length`/`target_length`
    /// didn't match what the rebuilt operation actually computes.
    #[error(
        "deserialization: declared lengths ({declared_base}, {declared_target}) don't match computed ({computed_base}, {computed_target})"
    )]
    DeserializationMismatch {
        declared_base: usize,
        declared_target: usize,
        computed_base: usize,
        computed_target: usize,
    },

    /// Deserialization: an action record's tag wasn't `retain`/`insert`/
    /// `delete`, or a required field was missing.
    #[error("deserialization: unknown action tag {0:?}")]
    UnknownAction(String),

    /// `server_ack` arrived while the client was `Synchronized` — indicates
    /// server/client desynchronization.
    #[error("received serverAck while Synchronized (no pending ack)")]
    NoPendingAck,

    /// `apply_server`: the incoming operation's `base_len` didn't match the
    /// length of the document the state machine expected it to apply to.
    #[error("applyServer: incoming operation base_len ({incoming}) != expected ({expected})")]
    RevisionDesync { expected: usize, incoming: usize },

    /// An adapter hook (`EditorAdapter`/`TransportAdapter`) was invoked but
    /// the consumer never overrode it.
    #[error("adapter hook {0} not implemented")]
    NotImplemented(&'static str),
}

pub type Result<T> = std::result::Result<T, OtError>;
