// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("malformed json: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("event is not a json object")]
    NotAnObject,

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("invalid field {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("read failed after line {line}: {source}")]
    Read { line: u64, source: std::io::Error },

    #[error("processing aborted at line {line}: {reason}")]
    Aborted {
        line: u64,
        content: String,
        reason: String,
    },
}

impl Error {
    /// Fatal errors end the stream. Everything else costs one line.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Aborted { .. })
    }
}
