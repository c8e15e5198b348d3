// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// An autonomous system number.
pub type Asn = u32;

/// Identity of a persisted route: one row per advertising peer and subnet.
///
/// Subnets are opaque strings. Two subnets are the same route iff their
/// string forms are equal.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RouteRowKey {
    pub peer_asn: Asn,
    pub subnet: String,
}

impl RouteRowKey {
    pub fn new(peer_asn: Asn, subnet: &str) -> Self {
        Self {
            peer_asn,
            subnet: subnet.to_owned(),
        }
    }

    pub fn db_key(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_db_key(v: &[u8]) -> Result<Self, Error> {
        let s = String::from_utf8_lossy(v);
        serde_json::from_str(&s)
            .map_err(|e| Error::DbKey(format!("route key {s}: {e}")))
    }
}

impl Display for RouteRowKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} via AS{}", self.subnet, self.peer_asn)
    }
}

/// A route as it is held in the durable store. The AS path is carried as
/// metadata and is not part of the route identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRow {
    pub peer_asn: Asn,
    pub subnet: String,
    pub as_path: Vec<Asn>,
    pub updated: DateTime<Utc>,
}

impl RouteRow {
    pub fn new(peer_asn: Asn, subnet: &str, as_path: &[Asn]) -> Self {
        Self {
            peer_asn,
            subnet: subnet.to_owned(),
            as_path: as_path.to_vec(),
            updated: Utc::now(),
        }
    }

    pub fn key(&self) -> RouteRowKey {
        RouteRowKey::new(self.peer_asn, &self.subnet)
    }
}
