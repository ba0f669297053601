// SPDX-License-Identifier: AGPL-3.0-or-later

//! Opt-in `tracing` initialization. The library never installs a subscriber
//! on its own — linking it must not have side effects — so embedders call
//! [`init`] themselves if they want the `debug!`/`trace!` output the client
//! state machine and operation algebra emit.

use tracing_subscriber::fmt;

/// Install a global `fmt` subscriber with an `hour:minute:second` timer.
/// `verbose` selects `DEBUG` (state transitions, transform steps) over the
/// default `INFO`.
///
/// # Panics
///
/// Panics if a global subscriber is already installed, or if the time
/// format description fails to parse (it never does; the format is a
/// fixed literal).
pub fn init(verbose: bool) {
    let timer = time::format_description::parse("[hour]:[minute]:[second]")
        .expect("Could not create time format description");
    let time_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let timer = fmt::time::OffsetTime::new(time_offset, timer);

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let subscriber = fmt::Subscriber::builder()
        .with_max_level(level)
        .with_thread_ids(true)
        .with_timer(timer)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default log subscriber failed");
}
