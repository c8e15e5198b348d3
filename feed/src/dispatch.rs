// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event dispatch.
//!
//! Each event is handled on its own against the current route table. The
//! dispatcher owns the table but keeps no state of its own.
//!
//! | event        | condition                | action                      |
//! |--------------|--------------------------|-----------------------------|
//! | update       | not received             | ignore                      |
//! | update       | received                 | withdraw, then announce     |
//! | state        | down                     | remove all routes of peer   |
//! | state        | anything else            | ignore                      |
//! | notification | shutdown                 | clear table, stop stream    |
//! | notification | anything else            | ignore                      |
//! | unknown      |                          | ignore                      |

use crate::event::*;
use crate::log::dispatch_log;
use rdb::{RouteSink, RouteTable};
use slog::Logger;

/// What the driver should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Shutdown,
}

pub struct Dispatcher<S> {
    table: RouteTable<S>,
    log: Logger,
}

impl<S: RouteSink> Dispatcher<S> {
    pub fn new(table: RouteTable<S>, log: Logger) -> Self {
        Self { table, log }
    }

    pub fn table(&self) -> &RouteTable<S> {
        &self.table
    }

    pub fn into_table(self) -> RouteTable<S> {
        self.table
    }

    pub fn dispatch(&mut self, event: &Event) -> Action {
        match event {
            Event::Update(u) => {
                self.update(u);
                Action::Continue
            }
            Event::State(s) => {
                self.state(s);
                Action::Continue
            }
            Event::Notification(n) => self.notification(n),
            Event::Unknown(u) => {
                dispatch_log!(self, info, "ignoring unknown event";
                    "type" => u.kind.as_deref().unwrap_or("<none>"),
                    "raw" => &u.raw
                );
                Action::Continue
            }
        }
    }

    fn update(&mut self, u: &Update) {
        let peer = u.neighbor.peer_asn;

        if !u.is_received() {
            dispatch_log!(self, debug, "ignoring update not received from peer";
                "peer_asn" => peer,
                "direction" => u.direction
                    .as_ref()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "<none>".into())
            );
            return;
        }

        for family in &u.skipped_families {
            dispatch_log!(self, info, "skipping address family {family}";
                "peer_asn" => peer
            );
        }

        // Withdrawals go first so a route withdrawn and re-announced in the
        // same update ends up present.
        for w in &u.withdrawals {
            if self.table.remove(&w.subnet, peer) {
                dispatch_log!(self, info, "withdraw {}", w.subnet;
                    "peer_asn" => peer,
                    "family" => &w.family
                );
            } else {
                dispatch_log!(self, info, "withdraw for untracked route {}",
                    w.subnet;
                    "peer_asn" => peer,
                    "family" => &w.family
                );
            }
        }

        for a in &u.announcements {
            self.table.add(&a.subnet, peer, &a.as_path);
            dispatch_log!(self, info, "announce {}", a.subnet;
                "peer_asn" => peer,
                "family" => &a.family,
                "nexthop" => &a.nexthop,
                "as_path" => format!("{:?}", a.as_path)
            );
        }

        if !u.withdrawals.is_empty() || !u.announcements.is_empty() {
            dispatch_log!(self, info, "route table size {}", self.table.len());
        }
    }

    fn state(&mut self, s: &State) {
        let peer = s.neighbor.peer_asn;
        match s.state {
            PeerState::Down => {
                let removed = self.table.remove_all_for_peer(peer);
                dispatch_log!(self, info, "peer down, removed {removed} routes";
                    "peer_asn" => peer,
                    "peer_address" => s.neighbor.peer_address.clone(),
                    "reason" => s.reason.clone()
                );
                dispatch_log!(self, info, "route table size {}",
                    self.table.len());
            }
            ref other => {
                dispatch_log!(self, info, "peer state {other}";
                    "peer_asn" => peer,
                    "peer_address" => s.neighbor.peer_address.clone()
                );
            }
        }
    }

    fn notification(&mut self, n: &Notification) -> Action {
        if n.is_shutdown() {
            dispatch_log!(self, info, "shutdown notification, clearing routes";
                "routes" => self.table.len()
            );
            self.table.clear();
            dispatch_log!(self, info, "route table size {}", self.table.len());
            return Action::Shutdown;
        }
        dispatch_log!(self, info, "ignoring notification";
            "reason" => &n.reason
        );
        Action::Continue
    }
}
