// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The stream driver: read a line, decode it, dispatch it, repeat.
//!
//! Lines are processed strictly one after another. A line that cannot be
//! decoded is logged and skipped. The loop ends when input runs out, when a
//! shutdown notification is dispatched, or when a line could not be
//! processed at all (a read failure or a panic while handling it).

use crate::decode;
use crate::dispatch::{Action, Dispatcher};
use crate::error::Error;
use crate::event::Event;
use crate::log::driver_log;
use rdb::{RouteSink, RouteTable};
use slog::Logger;
use std::any::Any;
use std::io::BufRead;
use std::panic::{self, AssertUnwindSafe};

/// Why a stream ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The input was exhausted.
    EndOfStream,
    /// The speaker announced a shutdown.
    Shutdown,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    /// Lines read, blank ones included.
    pub lines: u64,
    pub decoded: u64,
    pub repaired: u64,
    pub failed: u64,
    pub unknown: u64,
}

pub struct Driver<R, S> {
    input: R,
    dispatcher: Dispatcher<S>,
    stats: StreamStats,
    log: Logger,
}

impl<R: BufRead, S: RouteSink> Driver<R, S> {
    pub fn new(input: R, dispatcher: Dispatcher<S>, log: Logger) -> Self {
        Self {
            input,
            dispatcher,
            stats: StreamStats::default(),
            log,
        }
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    pub fn table(&self) -> &RouteTable<S> {
        self.dispatcher.table()
    }

    pub fn into_dispatcher(self) -> Dispatcher<S> {
        self.dispatcher
    }

    pub fn run(&mut self) -> Result<Termination, Error> {
        let mut buf = Vec::new();
        let result = loop {
            buf.clear();
            let n = match self.input.read_until(b'\n', &mut buf) {
                Ok(n) => n,
                Err(source) => {
                    break Err(Error::Read {
                        line: self.stats.lines,
                        source,
                    })
                }
            };
            if n == 0 {
                break Ok(Termination::EndOfStream);
            }
            self.stats.lines += 1;

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let number = self.stats.lines;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.process_line(number, line)
            }));
            match outcome {
                Ok(Action::Continue) => {}
                Ok(Action::Shutdown) => break Ok(Termination::Shutdown),
                Err(payload) => {
                    break Err(Error::Aborted {
                        line: number,
                        content: line.to_owned(),
                        reason: panic_message(payload.as_ref()),
                    })
                }
            }
        };

        let s = self.stats;
        match &result {
            Ok(termination) => {
                driver_log!(self.log, info, "stream ended: {termination:?}";
                    "lines" => s.lines,
                    "decoded" => s.decoded,
                    "repaired" => s.repaired,
                    "failed" => s.failed,
                    "unknown" => s.unknown,
                    "routes" => self.table().len()
                );
            }
            Err(e) => {
                let content = match e {
                    Error::Aborted { content, .. } => content.clone(),
                    _ => String::new(),
                };
                driver_log!(self.log, error, "stream aborted: {e}";
                    "error" => format!("{e}"),
                    "content" => content,
                    "lines" => s.lines,
                    "decoded" => s.decoded,
                    "failed" => s.failed,
                    "routes" => self.table().len()
                );
            }
        }

        result
    }

    /// Decode and dispatch one line. Decode failures are logged and cost
    /// only this line.
    pub fn process_line(&mut self, number: u64, line: &str) -> Action {
        driver_log!(self.log, debug, "input line";
            "line" => number,
            "raw" => line
        );

        let repaired = decode::repair(line);
        if repaired.is_repaired() {
            self.stats.repaired += 1;
            driver_log!(self.log, warn, "corrected input line";
                "line" => number,
                "repairs" => repaired.applied.join(","),
                "corrected" => &*repaired.text
            );
        }

        let event = match decode::decode_repaired(line, &repaired) {
            Ok(event) => event,
            Err(e) => {
                self.stats.failed += 1;
                driver_log!(self.log, error, "skipping line: {e}";
                    "line" => number,
                    "raw" => line,
                    "error" => format!("{e}")
                );
                return Action::Continue;
            }
        };

        self.stats.decoded += 1;
        if let Event::Unknown(_) = event {
            self.stats.unknown += 1;
        }
        driver_log!(self.log, debug, "dispatching {} event", event.kind();
            "line" => number
        );
        self.dispatcher.dispatch(&event)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
