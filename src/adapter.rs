// SPDX-License-Identifier: AGPL-3.0-or-later

//! The editor and transport adapters the [`crate::client::Client`] state
//! machine calls into. These are external collaborators: the core only
//! declares the interface. Every hook has a default body that
//! returns [`OtError::NotImplemented`], so an embedder only has to override
//! the hooks it actually uses.

use crate::error::{OtError, Result};
use crate::wrapped::WrappedOperation;

/// Consumed by [`crate::client::Client`] to apply remote edits to the
/// editor's live document and to query cursor/selection state. Change
/// notifications flow the other way, from the editor into
/// [`crate::client::Client::apply_client`] — they are not part of this
/// trait.
pub trait EditorAdapter {
    /// Apply `op` to the editor's document. Called whenever the state
    /// machine has a remote (or remote-derived) operation ready to show the
    /// user.
    fn apply_operation(&mut self, _op: &WrappedOperation) -> Result<()> {
        Err(OtError::NotImplemented("EditorAdapter::apply_operation"))
    }

    /// The zero-based character index of the editor's current cursor.
    fn cursor_position(&self) -> Result<usize> {
        Err(OtError::NotImplemented("EditorAdapter::cursor_position"))
    }

    /// The zero-based character index of the end of the current selection
    /// (equal to `cursor_position` when there is no selection).
    fn selection_end(&self) -> Result<usize> {
        Err(OtError::NotImplemented("EditorAdapter::selection_end"))
    }
}

/// Consumed by [`crate::client::Client`] to submit this client's pending
/// operation. Inbound transport events (`operation`, `ack`) are delivered
/// by the embedder calling [`crate::client::Client::apply_server`] /
/// [`crate::client::Client::server_ack`] directly; they are not callbacks
/// on this trait.
pub trait TransportAdapter {
    /// Submit `op`, built against `revision`, to the server.
    fn send_operation(&mut self, _revision: u64, _op: &WrappedOperation) -> Result<()> {
        Err(OtError::NotImplemented("TransportAdapter::send_operation"))
    }
}
