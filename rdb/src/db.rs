// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The durable route store.
//!
//! Routes are kept in a sled key-value tree, one row per (peer, subnet)
//! pair. Every statement opens the tree, applies a single change and flushes
//! before returning so nothing is held open between calls, including when a
//! statement fails.
use crate::error::Error;
use crate::sink::RouteSink;
use crate::types::*;
use crate::log::db_log;
use slog::Logger;

/// The handle used to open a persistent key-value tree for routes.
const ROUTES: &str = "routes";

#[derive(Clone)]
pub struct Db {
    /// A sled database handle where the route rows are stored.
    persistent: sled::Db,

    log: Logger,
}

impl Db {
    /// Open (or create) a route store at `path`.
    pub fn new(path: &str, log: Logger) -> Result<Self, Error> {
        Ok(Self {
            persistent: sled::open(path)?,
            log,
        })
    }

    /// All readable rows, ordered by key. Rows that fail to decode are logged
    /// and skipped.
    pub fn routes(&self) -> Result<Vec<RouteRow>, Error> {
        let tree = self.persistent.open_tree(ROUTES)?;
        let result = tree
            .scan_prefix(vec![])
            .filter_map(|item| {
                let (key, value) = match item {
                    Ok(item) => item,
                    Err(e) => {
                        db_log!(self, error, "error fetching route entry";
                            "error" => format!("{e}")
                        );
                        return None;
                    }
                };
                if let Err(e) = RouteRowKey::from_db_key(&key) {
                    db_log!(self, error, "error parsing route entry key";
                        "key" => String::from_utf8_lossy(&key).into_owned(),
                        "error" => format!("{e}")
                    );
                    return None;
                }
                let value = String::from_utf8_lossy(&value);
                match serde_json::from_str::<RouteRow>(&value) {
                    Ok(row) => Some(row),
                    Err(e) => {
                        db_log!(self, error, "error parsing route entry value";
                            "value" => value.to_string(),
                            "error" => format!("{e}")
                        );
                        None
                    }
                }
            })
            .collect();
        Ok(result)
    }

    pub fn get_route(
        &self,
        key: &RouteRowKey,
    ) -> Result<Option<RouteRow>, Error> {
        let tree = self.persistent.open_tree(ROUTES)?;
        let value = match tree.get(key.db_key()?)? {
            Some(value) => value,
            None => return Ok(None),
        };
        let value = String::from_utf8_lossy(&value);
        let row = serde_json::from_str(&value)
            .map_err(|e| Error::DbValue(format!("route {key}: {e}")))?;
        Ok(Some(row))
    }

    pub fn route_count(&self) -> Result<usize, Error> {
        let tree = self.persistent.open_tree(ROUTES)?;
        Ok(tree.len())
    }
}

impl RouteSink for Db {
    fn insert_route(
        &self,
        peer_asn: Asn,
        subnet: &str,
        as_path: &[Asn],
    ) -> Result<(), Error> {
        let tree = self.persistent.open_tree(ROUTES)?;
        let row = RouteRow::new(peer_asn, subnet, as_path);
        let key = row.key().db_key()?;
        let value = serde_json::to_string(&row)?;
        tree.insert(key.as_str(), value.as_str())?;
        tree.flush()?;
        Ok(())
    }

    fn delete_route(&self, peer_asn: Asn, subnet: &str) -> Result<(), Error> {
        let tree = self.persistent.open_tree(ROUTES)?;
        let key = RouteRowKey::new(peer_asn, subnet).db_key()?;
        tree.remove(key.as_str())?;
        tree.flush()?;
        Ok(())
    }

    fn truncate_routes(&self) -> Result<(), Error> {
        let tree = self.persistent.open_tree(ROUTES)?;
        tree.clear()?;
        tree.flush()?;
        Ok(())
    }
}
