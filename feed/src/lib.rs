// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Route feed processing.
//!
//! A speaker writes one JSON event per line. Each line is repaired, decoded
//! into an [`event::Event`] and dispatched against the route table, one line
//! at a time.

pub mod decode;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod event;
pub mod log;

#[cfg(test)]
mod test;

pub use dispatch::{Action, Dispatcher};
pub use driver::{Driver, StreamStats, Termination};

pub const COMPONENT_FEED: &str = "feed";
pub const MOD_DISPATCH: &str = "dispatch";
pub const MOD_DRIVER: &str = "driver";
