// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded speaker events.

use rdb::Asn;
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Update(Update),
    State(State),
    Notification(Notification),
    Unknown(Unknown),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Update(_) => "update",
            Self::State(_) => "state",
            Self::Notification(_) => "notification",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// The session an update or state event belongs to. Only the peer ASN is
/// required, it is the identity routes are tracked by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    pub local_address: Option<String>,
    pub peer_address: Option<String>,
    pub local_asn: Option<Asn>,
    pub peer_asn: Asn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Direction {
    Receive,
    Send,
    Other(String),
}

impl From<&str> for Direction {
    fn from(value: &str) -> Self {
        match value {
            "receive" => Self::Receive,
            "send" => Self::Send,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Receive => write!(f, "receive"),
            Self::Send => write!(f, "send"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Path attributes of an update. Only the AS path is carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub as_path: Vec<Asn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub family: String,
    pub subnet: String,
    pub nexthop: String,
    pub as_path: Vec<Asn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    pub family: String,
    pub subnet: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub neighbor: Neighbor,
    /// `None` when the speaker did not say which way the update travelled.
    pub direction: Option<Direction>,
    pub attributes: Option<Attributes>,
    pub announcements: Vec<Announcement>,
    pub withdrawals: Vec<Withdrawal>,
    /// Address families present in the update that are not unicast.
    pub skipped_families: Vec<String>,
}

impl Update {
    pub fn is_received(&self) -> bool {
        self.direction == Some(Direction::Receive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerState {
    Up,
    Down,
    Connected,
    Other(String),
}

impl From<&str> for PeerState {
    fn from(value: &str) -> Self {
        match value {
            "up" => Self::Up,
            "down" => Self::Down,
            "connected" => Self::Connected,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl Display for PeerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
            Self::Connected => write!(f, "connected"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub neighbor: Neighbor,
    pub state: PeerState,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub reason: String,
}

impl Notification {
    pub fn is_shutdown(&self) -> bool {
        self.reason == "shutdown"
    }
}

/// An event with an unrecognized or absent `type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unknown {
    pub kind: Option<String>,
    pub raw: String,
}
