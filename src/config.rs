// SPDX-License-Identifier: AGPL-3.0-or-later

//! Engine-wide tunables that don't belong on any single operation or
//! client: how aggressively to debounce cursor metadata, and how large a
//! client's buffered operation is allowed to grow before it's treated as a
//! protocol violation. Loaded from an INI file the same way the rest of
//! this codebase's ambient config is.

use std::path::Path;

use ini::Ini;
use tracing::warn;

/// Tunables for an embedding application. Every field has a default, so a
/// missing config file (or a missing key within one) is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Minimum milliseconds between cursor-position metadata updates sent
    /// to the transport. The cadence is left to the embedder; this is that
    /// knob.
    pub cursor_debounce_ms: u64,
    /// Upper bound on how many actions a buffered operation
    /// (`State::AwaitingWithBuffer`) may accumulate before
    /// `Client::apply_client` should be treated as a caller error rather
    /// than silently composed. Not enforced by `Client` itself — callers
    /// that care consult it before composing.
    pub max_buffer_ops: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cursor_debounce_ms: 50,
            max_buffer_ops: 1_000,
        }
    }
}

impl EngineConfig {
    /// Load overrides from `config_file`'s `[general]`/default section. A
    /// missing file is not an error: returns the defaults unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the file exists but isn't valid INI, or if a present key
    /// doesn't parse as the expected type — mirrors how the rest of this
    /// codebase treats a malformed config file as unrecoverable rather than
    /// silently ignored.
    #[must_use]
    pub fn from_ini_file(config_file: &Path) -> Self {
        let mut config = Self::default();
        if !config_file.exists() {
            return config;
        }

        let conf = Ini::load_from_file(config_file)
            .expect("could not access config file, even though it exists");
        let section = conf.general_section();

        if let Some(v) = section.get("cursor_debounce_ms") {
            config.cursor_debounce_ms = v
                .parse()
                .expect("failed to parse config parameter `cursor_debounce_ms` as u64");
        }
        if let Some(v) = section.get("max_buffer_ops") {
            config.max_buffer_ops = v
                .parse()
                .expect("failed to parse config parameter `max_buffer_ops` as usize");
        }
        if config.max_buffer_ops == 0 {
            warn!("max_buffer_ops configured to 0; buffered operations will never compose");
        }
        config
    }
}
