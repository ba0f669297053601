// SPDX-License-Identifier: AGPL-3.0-or-later

//! Operational-transformation core for collaborative plain-text editing:
//! the operation algebra, a metadata-carrying wrapper around it, and the
//! client-side reconciliation state machine that keeps a client's document
//! converging with the server's. Editor and transport integration, server
//! history and undo/redo are deliberately out of scope; see [`adapter`].

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod operation;
pub mod wrapped;

pub use client::{Client, State};
pub use error::{OtError, Result};
pub use operation::Operation;
pub use wrapped::{MetaValue, Metadata, WrappedOperation};
