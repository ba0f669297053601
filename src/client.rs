// SPDX-License-Identifier: AGPL-3.0-or-later

//! The client-side synchronization state machine: mediates local edits,
//! remote edits and server acknowledgements so that the client's document
//! always equals the server's document once all pending operations are
//! applied.
//!
//! Buffering (rather than pipelining a second outstanding operation) keeps
//! the server's per-client in-flight count at one, and keeps the transform
//! chain a constant two operations deep no matter how many local edits pile
//! up while waiting for an ack — the same reason `ethersync`'s `OTServer`
//! (`daemon/src/ot.rs`) keeps an `editor_queue` instead of sending
//! operations one at a time and waiting.

use tracing::{debug, error, trace};

use crate::adapter::{EditorAdapter, TransportAdapter};
use crate::error::{OtError, Result};
use crate::wrapped::WrappedOperation;

/// The three states a [`Client`] can be in with respect to its own pending
/// edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// No local operation in flight.
    Synchronized,
    /// One operation sent, awaiting acknowledgement.
    AwaitingConfirm(WrappedOperation),
    /// One operation in flight, plus further local edits buffered behind it.
    AwaitingWithBuffer(WrappedOperation, WrappedOperation),
}

/// Drives `state` through its event table. Owns `revision` (the
/// server revision this client expects to see next) and the length of the
/// document at that revision frontier, which is all the bookkeeping needed
/// to detect `RevisionDesync` without the core owning the document itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    revision: u64,
    state: State,
    /// Length of the document as of `revision` — i.e. the base length the
    /// *next* incoming server operation must match. Equal to
    /// `outstanding.base_len()` whenever a `state` has an outstanding
    /// operation; tracked separately only so `Synchronized` (which has no
    /// outstanding operation) can still validate incoming ops.
    base_doc_len: usize,
}

impl Client {
    #[must_use]
    pub fn new(revision: u64, initial_doc_len: usize) -> Self {
        Self {
            revision,
            state: State::Synchronized,
            base_doc_len: initial_doc_len,
        }
    }

    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub const fn state(&self) -> &State {
        &self.state
    }

    /// A local edit was made. Synchronized: sends immediately and starts
    /// waiting. AwaitingConfirm: buffers (does not send — at most one
    /// operation per client may be in flight). AwaitingWithBuffer: composes
    /// onto the existing buffer.
    pub fn apply_client(
        &mut self,
        op: WrappedOperation,
        transport: &mut impl TransportAdapter,
    ) -> Result<()> {
        // Matched by reference and committed to `self.state` only at the
        // end: every fallible call below runs before `self.state` is
        // touched, so a `?` that bails leaves the original state in place
        // instead of stranding it behind a `Synchronized` placeholder.
        let new_state = match &self.state {
            State::Synchronized => {
                debug!(revision = self.revision, "applyClient: Synchronized -> AwaitingConfirm");
                transport.send_operation(self.revision, &op)?;
                State::AwaitingConfirm(op)
            }
            State::AwaitingConfirm(outstanding) => {
                debug!("applyClient: AwaitingConfirm -> AwaitingWithBuffer");
                State::AwaitingWithBuffer(outstanding.clone(), op)
            }
            State::AwaitingWithBuffer(outstanding, buffer) => {
                trace!("applyClient: AwaitingWithBuffer -> AwaitingWithBuffer (composing buffer)");
                let buffer = buffer.compose(&op)?;
                State::AwaitingWithBuffer(outstanding.clone(), buffer)
            }
        };
        self.state = new_state;
        Ok(())
    }

    /// A remote operation arrived from the server at the current
    /// `revision`. Transforms it against any outstanding/buffered local
    /// operations, applies the remainder to the editor, and advances
    /// `revision`.
    pub fn apply_server(
        &mut self,
        op: WrappedOperation,
        editor: &mut impl EditorAdapter,
    ) -> Result<()> {
        let expected_len = match &self.state {
            State::Synchronized => self.base_doc_len,
            State::AwaitingConfirm(outstanding) => outstanding.base_len(),
            State::AwaitingWithBuffer(outstanding, _) => outstanding.base_len(),
        };
        if op.base_len() != expected_len {
            error!(
                expected = expected_len,
                incoming = op.base_len(),
                "applyServer: revision desync"
            );
            return Err(OtError::RevisionDesync {
                expected: expected_len,
                incoming: op.base_len(),
            });
        }

        // As in `apply_client`: computed from `&self.state` and only
        // committed once every fallible step below has succeeded, so a `?`
        // never strands `self.state` at a placeholder.
        let (new_state, new_base_len) = match &self.state {
            State::Synchronized => {
                debug!("applyServer: Synchronized, applying remote op directly");
                editor.apply_operation(&op)?;
                (State::Synchronized, op.target_len())
            }
            State::AwaitingConfirm(outstanding) => {
                debug!("applyServer: AwaitingConfirm, transforming against outstanding");
                let (outstanding_prime, op_prime) = outstanding.transform(&op)?;
                editor.apply_operation(&op_prime)?;
                let base_len = outstanding_prime.base_len();
                (State::AwaitingConfirm(outstanding_prime), base_len)
            }
            State::AwaitingWithBuffer(outstanding, buffer) => {
                debug!("applyServer: AwaitingWithBuffer, double-transforming");
                // Reconcile three concurrent edits: our outstanding op, our
                // buffered op, and the incoming remote op. Order matters:
                // first resolve outstanding-vs-remote, then buffer-vs-(the
                // already-transformed remote).
                let (outstanding_prime, t1) = outstanding.transform(&op)?;
                let (buffer_prime, op_prime) = buffer.transform(&t1)?;
                editor.apply_operation(&op_prime)?;
                let base_len = buffer_prime.base_len();
                (State::AwaitingWithBuffer(outstanding_prime, buffer_prime), base_len)
            }
        };
        self.state = new_state;
        self.base_doc_len = new_base_len;
        self.revision += 1;
        Ok(())
    }

    /// The server acknowledged this client's outstanding operation.
    /// Synchronized: fatal, there was nothing to acknowledge.
    pub fn server_ack(&mut self, transport: &mut impl TransportAdapter) -> Result<()> {
        let (new_state, new_base_len) = match &self.state {
            State::Synchronized => {
                error!("serverAck received while Synchronized");
                return Err(OtError::NoPendingAck);
            }
            State::AwaitingConfirm(outstanding) => {
                debug!("serverAck: AwaitingConfirm -> Synchronized");
                (State::Synchronized, outstanding.target_len())
            }
            State::AwaitingWithBuffer(outstanding, buffer) => {
                debug!("serverAck: AwaitingWithBuffer -> AwaitingConfirm, sending buffer");
                let base_len = outstanding.target_len();
                transport.send_operation(self.revision, buffer)?;
                (State::AwaitingConfirm(buffer.clone()), base_len)
            }
        };
        self.state = new_state;
        self.base_doc_len = new_base_len;
        self.revision += 1;
        Ok(())
    }

    /// Discard all local state and return to `Synchronized` at `revision`,
    /// with the document assumed to be `doc_len` characters long. The
    /// mechanical half of the resync-from-server recovery path for
    /// protocol-violation errors; reloading the document itself is the
    /// adapter's job.
    pub fn reset(&mut self, revision: u64, doc_len: usize) {
        self.revision = revision;
        self.state = State::Synchronized;
        self.base_doc_len = doc_len;
    }
}
