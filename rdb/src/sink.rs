// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The durable side of the route table.
//!
//! A sink mirrors route table transitions. Calls are issued one at a time in
//! the order the table mutates and are never batched or reordered. A failed
//! call is reported to the caller but the in-memory mutation it mirrors is
//! kept, so the sink is a best-effort copy.

use crate::error::Error;
use crate::types::Asn;

pub trait RouteSink {
    /// Record that `peer_asn` advertises `subnet`. Inserting a route that is
    /// already present must succeed.
    fn insert_route(
        &self,
        peer_asn: Asn,
        subnet: &str,
        as_path: &[Asn],
    ) -> Result<(), Error>;

    /// Forget that `peer_asn` advertises `subnet`. Deleting a route that is
    /// not present must succeed.
    fn delete_route(&self, peer_asn: Asn, subnet: &str) -> Result<(), Error>;

    /// Forget every route.
    fn truncate_routes(&self) -> Result<(), Error>;
}
