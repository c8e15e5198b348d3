// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line decoding.
//!
//! Decoding happens in two steps. [`repair`] first rewrites known defects in
//! the speaker's hand-rolled JSON, then [`parse`] does a generic JSON parse
//! and pulls the fields of interest out into an [`Event`].
//!
//! Required fields (the peer ASN of updates and state changes, the new state,
//! the notification reason) reject the event when missing. Everything else
//! defaults to empty.

use crate::error::Error;
use crate::event::*;
use rdb::Asn;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// A textual fix for one known producer defect.
#[derive(Debug, Clone, Copy)]
pub struct Repair {
    pub name: &'static str,
    pub pattern: &'static str,
    pub replacement: &'static str,
}

/// Repairs are applied in this order, each to every occurrence of its
/// pattern. New producer defects get a new entry here.
pub const REPAIRS: &[Repair] = &[
    Repair {
        name: "unquoted-shutdown-reason",
        pattern: r#""notification": shutdown"#,
        replacement: r#""notification": "shutdown""#,
    },
    Repair {
        name: "unquoted-shutdown-reason-compact",
        pattern: r#""notification":shutdown"#,
        replacement: r#""notification":"shutdown""#,
    },
    Repair {
        name: "python-none",
        pattern: ": None",
        replacement: ": null",
    },
    Repair {
        name: "python-none-compact",
        pattern: ":None",
        replacement: ":null",
    },
    Repair {
        name: "python-true",
        pattern: ": True",
        replacement: ": true",
    },
    Repair {
        name: "python-true-compact",
        pattern: ":True",
        replacement: ":true",
    },
    Repair {
        name: "python-false",
        pattern: ": False",
        replacement: ": false",
    },
    Repair {
        name: "python-false-compact",
        pattern: ":False",
        replacement: ":false",
    },
];

#[derive(Debug)]
pub struct Repaired<'a> {
    pub text: Cow<'a, str>,
    /// Names of the repairs that fired, in application order.
    pub applied: Vec<&'static str>,
}

impl Repaired<'_> {
    pub fn is_repaired(&self) -> bool {
        !self.applied.is_empty()
    }
}

pub fn repair(line: &str) -> Repaired<'_> {
    let mut text = Cow::Borrowed(line);
    let mut applied = Vec::new();
    for r in REPAIRS {
        if text.contains(r.pattern) {
            text = Cow::Owned(text.replace(r.pattern, r.replacement));
            applied.push(r.name);
        }
    }
    Repaired { text, applied }
}

/// Repair and parse a single line.
pub fn decode(line: &str) -> Result<Event, Error> {
    decode_repaired(line, &repair(line))
}

/// Parse the repaired form of `line`. Unknown events keep `line` itself as
/// their raw text.
pub fn decode_repaired(
    line: &str,
    repaired: &Repaired<'_>,
) -> Result<Event, Error> {
    parse_with_raw(&repaired.text, line)
}

/// Parse an already repaired line.
pub fn parse(text: &str) -> Result<Event, Error> {
    parse_with_raw(text, text)
}

fn parse_with_raw(text: &str, raw: &str) -> Result<Event, Error> {
    let value: Value = serde_json::from_str(text)?;
    let obj = value.as_object().ok_or(Error::NotAnObject)?;

    match obj.get("type").and_then(Value::as_str) {
        Some("update") => Ok(Event::Update(update(obj)?)),
        Some("state") => Ok(Event::State(state(obj)?)),
        Some("notification") => Ok(Event::Notification(notification(obj)?)),
        kind => Ok(Event::Unknown(Unknown {
            kind: kind.map(str::to_owned),
            raw: raw.to_owned(),
        })),
    }
}

fn neighbor(obj: &Map<String, Value>) -> Result<(&Value, Neighbor), Error> {
    let nbr = obj
        .get("neighbor")
        .filter(|n| n.is_object())
        .ok_or(Error::MissingField("neighbor"))?;

    let address = nbr.get("address");
    let asn = nbr.get("asn");

    let peer_asn = asn
        .and_then(|a| a.get("peer"))
        .ok_or(Error::MissingField("neighbor.asn.peer"))?;
    let peer_asn = parse_asn(peer_asn).ok_or_else(|| Error::InvalidField {
        field: "neighbor.asn.peer",
        value: peer_asn.to_string(),
    })?;

    let address_of = |side: &str| {
        address
            .and_then(|a| a.get(side))
            .and_then(Value::as_str)
            .map(str::to_owned)
    };

    Ok((
        nbr,
        Neighbor {
            local_address: address_of("local"),
            peer_address: address_of("peer"),
            local_asn: asn.and_then(|a| a.get("local")).and_then(parse_asn),
            peer_asn,
        },
    ))
}

fn update(obj: &Map<String, Value>) -> Result<Update, Error> {
    let (nbr, neighbor) = neighbor(obj)?;

    let direction = nbr
        .get("direction")
        .and_then(Value::as_str)
        .map(Direction::from);

    let message = nbr.get("message").and_then(|m| m.get("update"));

    let attributes = message.and_then(|m| m.get("attribute")).map(|a| {
        let mut as_path = Vec::new();
        if let Some(p) = a.get("as-path") {
            flatten_asns(p, &mut as_path);
        }
        Attributes { as_path }
    });
    let as_path = attributes
        .as_ref()
        .map(|a| a.as_path.clone())
        .unwrap_or_default();

    let mut skipped_families = Vec::new();

    let mut withdrawals = Vec::new();
    let withdraw = message
        .and_then(|m| m.get("withdraw"))
        .and_then(Value::as_object);
    for (family, nlris) in withdraw.into_iter().flatten() {
        if !is_unicast(family) {
            skipped_families.push(family.clone());
            continue;
        }
        for nlri in nlris.as_array().into_iter().flatten() {
            if let Some(subnet) = nlri_subnet(nlri) {
                withdrawals.push(Withdrawal {
                    family: family.clone(),
                    subnet,
                });
            }
        }
    }

    let mut announcements = Vec::new();
    let announce = message
        .and_then(|m| m.get("announce"))
        .and_then(Value::as_object);
    for (family, nexthops) in announce.into_iter().flatten() {
        if !is_unicast(family) {
            if !skipped_families.contains(family) {
                skipped_families.push(family.clone());
            }
            continue;
        }
        for (nexthop, nlris) in nexthops.as_object().into_iter().flatten() {
            for nlri in nlris.as_array().into_iter().flatten() {
                if let Some(subnet) = nlri_subnet(nlri) {
                    announcements.push(Announcement {
                        family: family.clone(),
                        subnet,
                        nexthop: nexthop.clone(),
                        as_path: as_path.clone(),
                    });
                }
            }
        }
    }

    Ok(Update {
        neighbor,
        direction,
        attributes,
        announcements,
        withdrawals,
        skipped_families,
    })
}

fn state(obj: &Map<String, Value>) -> Result<State, Error> {
    let (nbr, neighbor) = neighbor(obj)?;
    let state = nbr
        .get("state")
        .and_then(Value::as_str)
        .ok_or(Error::MissingField("neighbor.state"))?;
    Ok(State {
        neighbor,
        state: PeerState::from(state),
        reason: nbr
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_owned),
    })
}

fn notification(obj: &Map<String, Value>) -> Result<Notification, Error> {
    let reason = obj
        .get("notification")
        .or_else(|| {
            obj.get("neighbor")
                .and_then(|n| n.get("message"))
                .and_then(|m| m.get("notification"))
        })
        .ok_or(Error::MissingField("notification"))?;
    let reason = match reason {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(Notification { reason })
}

fn is_unicast(family: &str) -> bool {
    family.ends_with("unicast")
}

/// The subnet of one NLRI entry. Entries are objects keyed by route type,
/// `nlri` is preferred when an entry carries more than one string member
/// (as with add-path). Bare strings are accepted as well.
fn nlri_subnet(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Object(m) => m
            .get("nlri")
            .and_then(Value::as_str)
            .or_else(|| m.values().find_map(Value::as_str))
            .map(str::to_owned),
        _ => None,
    }
}

/// Collect every ASN in an AS path, in order. Segments may be nested arrays
/// (sets) or objects carrying their members under `value`.
fn flatten_asns(v: &Value, out: &mut Vec<Asn>) {
    match v {
        Value::Array(items) => {
            for item in items {
                flatten_asns(item, out);
            }
        }
        Value::Object(m) => match m.get("value") {
            Some(inner) => flatten_asns(inner, out),
            None => {
                for item in m.values() {
                    flatten_asns(item, out);
                }
            }
        },
        other => {
            if let Some(asn) = parse_asn(other) {
                out.push(asn);
            }
        }
    }
}

fn parse_asn(v: &Value) -> Option<Asn> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| Asn::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
