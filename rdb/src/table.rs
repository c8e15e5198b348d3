// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The in-memory route table.
//!
//! This is the authoritative view of which peers currently advertise which
//! subnets. Every mutation is mirrored to a [`RouteSink`] as it happens. Sink
//! failures are logged and otherwise ignored: the table is never rolled back
//! to match the sink.

use crate::log::rdb_log;
use crate::sink::RouteSink;
use crate::types::Asn;
use slog::Logger;
use std::collections::{BTreeMap, BTreeSet};

pub type Routes = BTreeMap<String, BTreeSet<Asn>>;

pub struct RouteTable<S> {
    /// Subnet to advertising peers. An entry is present iff its peer set is
    /// non-empty.
    routes: Routes,

    sink: S,

    log: Logger,
}

impl<S: RouteSink> RouteTable<S> {
    pub fn new(sink: S, log: Logger) -> Self {
        Self {
            routes: Routes::new(),
            sink,
            log,
        }
    }

    /// Add `peer` to the peers advertising `subnet`. Returns true if the pair
    /// was not already present.
    ///
    /// The sink insert is issued even for a redundant add, since the sink may
    /// have lost the row on an earlier failure.
    pub fn add(&mut self, subnet: &str, peer: Asn, as_path: &[Asn]) -> bool {
        let added = self
            .routes
            .entry(subnet.to_owned())
            .or_default()
            .insert(peer);

        if added {
            rdb_log!(self, debug, "route added";
                "subnet" => subnet,
                "peer_asn" => peer
            );
        }

        if let Err(e) = self.sink.insert_route(peer, subnet, as_path) {
            rdb_log!(self, error, "sink insert failed: {e}";
                "statement" => "insert_route",
                "peer_asn" => peer,
                "subnet" => subnet,
                "as_path" => format!("{as_path:?}"),
                "error" => format!("{e}")
            );
        }

        added
    }

    /// Remove `peer` from the peers advertising `subnet`, dropping the subnet
    /// entirely once no peer is left. Removing a route the table does not
    /// track is a no-op and returns false.
    ///
    /// The sink delete is issued unconditionally, mirroring [`Self::add`].
    pub fn remove(&mut self, subnet: &str, peer: Asn) -> bool {
        let removed = match self.routes.get_mut(subnet) {
            None => false,
            Some(peers) => {
                let removed = peers.remove(&peer);
                if peers.is_empty() {
                    self.routes.remove(subnet);
                }
                removed
            }
        };

        if removed {
            rdb_log!(self, debug, "route removed";
                "subnet" => subnet,
                "peer_asn" => peer
            );
        }

        if let Err(e) = self.sink.delete_route(peer, subnet) {
            rdb_log!(self, error, "sink delete failed: {e}";
                "statement" => "delete_route",
                "peer_asn" => peer,
                "subnet" => subnet,
                "error" => format!("{e}")
            );
        }

        removed
    }

    /// Remove `peer` from every subnet it advertises. Returns the number of
    /// routes removed.
    pub fn remove_all_for_peer(&mut self, peer: Asn) -> usize {
        let subnets: Vec<String> = self
            .routes
            .iter()
            .filter(|(_, peers)| peers.contains(&peer))
            .map(|(subnet, _)| subnet.clone())
            .collect();

        for subnet in &subnets {
            self.remove(subnet, peer);
        }

        rdb_log!(self, info, "removed all routes for peer";
            "peer_asn" => peer,
            "count" => subnets.len()
        );

        subnets.len()
    }

    /// Empty the table and truncate the sink with a single call.
    pub fn clear(&mut self) {
        let count = self.routes.len();
        self.routes.clear();

        if let Err(e) = self.sink.truncate_routes() {
            rdb_log!(self, error, "sink truncate failed: {e}";
                "statement" => "truncate_routes",
                "error" => format!("{e}")
            );
        }

        rdb_log!(self, info, "route table cleared"; "count" => count);
    }

    /// The number of distinct subnets tracked.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn peers(&self, subnet: &str) -> Option<&BTreeSet<Asn>> {
        self.routes.get(subnet)
    }

    pub fn contains(&self, subnet: &str, peer: Asn) -> bool {
        self.routes
            .get(subnet)
            .is_some_and(|peers| peers.contains(&peer))
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
