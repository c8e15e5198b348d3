// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod db;
pub mod sink;
pub mod table;
pub mod types;

pub use db::Db;
pub use sink::RouteSink;
pub use table::RouteTable;
pub use types::*;
pub mod error;
pub mod log;

#[cfg(test)]
mod proptest;

pub const COMPONENT_RDB: &str = "rdb";
pub const MOD_DB: &str = "database";
pub const MOD_TABLE: &str = "table";
