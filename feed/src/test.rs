// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End to end tests running event streams through the driver.

use crate::error::Error;
use crate::{Action, Dispatcher, Driver, StreamStats, Termination};
use mirror_common::log::init_file_logger;
use pretty_assertions::assert_eq;
use rdb::test::{get_test_db, RecordingSink, SinkCall};
use rdb::{Asn, RouteRowKey, RouteSink, RouteTable};
use std::collections::BTreeSet;
use std::io::{BufRead, Cursor, Read};

const ANNOUNCE: &str = r#"{"type":"update","neighbor":{"address":{"local":"192.168.3.97","peer":"192.168.3.254"},"asn":{"local":65001,"peer":64570},"direction":"receive","message":{"update":{"attribute":{"as-path":[64570]},"announce":{"ipv4 unicast":{"192.168.3.254":[{"nlri":"10.10.132.242/32"}]}}}}}}"#;

const DOWN: &str = r#"{"type":"state","neighbor":{"address":{"local":"192.168.3.97","peer":"192.168.3.254"},"asn":{"local":65001,"peer":64570},"state":"down"}}"#;

const SHUTDOWN: &str = r#"{"type":"notification","notification":"shutdown"}"#;

const SEND: &str = r#"{"type":"update","neighbor":{"address":{"local":"192.168.3.97","peer":"192.168.3.254"},"asn":{"local":65001,"peer":64570},"direction":"send","message":{"update":{"attribute":{"as-path":[65001]},"announce":{"ipv4 unicast":{"192.168.3.97":[{"nlri":"10.99.0.0/16"}]}}}}}}"#;

fn driver<S: RouteSink>(
    name: &str,
    sink: S,
    lines: &[&str],
) -> Driver<Cursor<Vec<u8>>, S> {
    let log = init_file_logger(format!("{name}.log")).expect("test log");
    let table = RouteTable::new(sink, log.clone());
    let dispatcher = Dispatcher::new(table, log.clone());
    let input = lines.join("\n").into_bytes();
    Driver::new(Cursor::new(input), dispatcher, log)
}

fn peers(asns: &[Asn]) -> BTreeSet<Asn> {
    asns.iter().copied().collect()
}

#[test]
fn scenario_announce() {
    let mut d = driver("e2e_announce", RecordingSink::default(), &[ANNOUNCE]);

    assert_eq!(d.run().expect("run"), Termination::EndOfStream);

    assert_eq!(d.table().len(), 1);
    assert_eq!(d.table().peers("10.10.132.242/32"), Some(&peers(&[64570])));
    assert_eq!(
        d.table().sink().calls(),
        vec![SinkCall::insert(64570, "10.10.132.242/32", &[64570])]
    );
}

#[test]
fn scenario_peer_down() {
    let mut d =
        driver("e2e_peer_down", RecordingSink::default(), &[ANNOUNCE, DOWN]);

    assert_eq!(d.run().expect("run"), Termination::EndOfStream);

    assert!(d.table().is_empty());
    assert_eq!(
        d.table().sink().calls()[1..].to_vec(),
        vec![SinkCall::delete(64570, "10.10.132.242/32")]
    );
}

#[test]
fn scenario_shutdown() {
    let mut d = driver(
        "e2e_shutdown",
        RecordingSink::default(),
        &[ANNOUNCE, SHUTDOWN, DOWN],
    );

    assert_eq!(d.run().expect("run"), Termination::Shutdown);

    assert!(d.table().is_empty());
    assert_eq!(
        d.table().sink().calls(),
        vec![
            SinkCall::insert(64570, "10.10.132.242/32", &[64570]),
            SinkCall::Truncate,
        ]
    );
    // The line after the shutdown is never read.
    assert_eq!(d.stats().lines, 2);
}

#[test]
fn scenario_sent_update() {
    let mut d = driver("e2e_send", RecordingSink::default(), &[SEND]);

    assert_eq!(d.run().expect("run"), Termination::EndOfStream);

    assert!(d.table().is_empty());
    assert!(d.table().sink().calls().is_empty());
}

#[test]
fn malformed_lines_are_skipped() {
    let mut d = driver(
        "e2e_malformed",
        RecordingSink::default(),
        &[
            r#"{"type":"update","neighbor":"#,
            "",
            r#"{"type":"keepalive"}"#,
            r#"{"type":"state","neighbor":{"state":"down"}}"#,
            ANNOUNCE,
        ],
    );

    assert_eq!(d.run().expect("run"), Termination::EndOfStream);

    assert!(d.table().contains("10.10.132.242/32", 64570));
    assert_eq!(
        d.stats(),
        StreamStats {
            lines: 5,
            decoded: 2,
            repaired: 0,
            failed: 2,
            unknown: 1,
        }
    );
}

#[test]
fn unquoted_shutdown_is_repaired_and_honored() {
    let mut d = driver(
        "e2e_repaired_shutdown",
        RecordingSink::default(),
        &[
            ANNOUNCE,
            r#"{ "exabgp": "4.0.1", "type": "notification", "notification": shutdown}"#,
        ],
    );

    assert_eq!(d.run().expect("run"), Termination::Shutdown);
    assert_eq!(d.stats().repaired, 1);
    assert!(d.table().is_empty());
}

fn log_records(path: &std::path::Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .expect("read log")
        .lines()
        .map(|l| serde_json::from_str(l).expect("bunyan record"))
        .collect()
}

#[test]
fn corrections_and_stream_summary_are_logged() {
    let path = std::env::temp_dir()
        .join(format!("e2e_logged_{}.log", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let log = init_file_logger(&path).expect("test log");
    let table = RouteTable::new(RecordingSink::default(), log.clone());
    let dispatcher = Dispatcher::new(table, log.clone());
    let input = format!(
        "{ANNOUNCE}\n{}\n",
        r#"{"type":"notification","notification": shutdown}"#
    );
    let mut d = Driver::new(Cursor::new(input.into_bytes()), dispatcher, log);
    assert_eq!(d.run().expect("run"), Termination::Shutdown);
    drop(d);

    let records = log_records(&path);
    let corrected = records
        .iter()
        .find(|r| r["msg"] == "corrected input line")
        .expect("correction logged");
    assert_eq!(corrected["level"], 40);
    assert_eq!(corrected["component"], "feed");
    assert_eq!(corrected["module"], "driver");
    assert_eq!(corrected["line"], 2);
    assert_eq!(corrected["repairs"], "unquoted-shutdown-reason");
    assert_eq!(
        corrected["corrected"],
        r#"{"type":"notification","notification": "shutdown"}"#
    );

    let summary = records
        .iter()
        .find(|r| r["msg"] == "stream ended: Shutdown")
        .expect("summary logged");
    assert_eq!(summary["lines"], 2);
    assert_eq!(summary["decoded"], 2);
    assert_eq!(summary["repaired"], 1);
    assert_eq!(summary["failed"], 0);
    assert_eq!(summary["routes"], 0);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn invalid_utf8_costs_one_line() {
    let log = init_file_logger("e2e_utf8.log").expect("test log");
    let table = RouteTable::new(RecordingSink::default(), log.clone());
    let dispatcher = Dispatcher::new(table, log.clone());
    let mut input = b"{\"type\":\"upd\xffate\"}\n".to_vec();
    input.extend_from_slice(ANNOUNCE.as_bytes());
    let mut d = Driver::new(Cursor::new(input), dispatcher, log);

    assert_eq!(d.run().expect("run"), Termination::EndOfStream);
    assert_eq!(d.stats().unknown, 1);
    assert!(d.table().contains("10.10.132.242/32", 64570));
}

#[test]
fn sink_failures_do_not_stop_the_stream() {
    let sink = RecordingSink::default();
    sink.set_failing(true);
    let mut d = driver("e2e_sink_failure", sink, &[ANNOUNCE, DOWN, ANNOUNCE]);

    assert_eq!(d.run().expect("run"), Termination::EndOfStream);

    assert!(d.table().contains("10.10.132.242/32", 64570));
    assert_eq!(d.table().sink().calls().len(), 3);
}

#[test]
fn scenarios_against_sled() {
    let log = init_file_logger("e2e_sled.log").expect("test log");
    let db = get_test_db("e2e_sled", log).expect("create db");

    let mut d = driver("e2e_sled", db.db().clone(), &[ANNOUNCE]);
    assert_eq!(d.run().expect("run"), Termination::EndOfStream);
    let key = RouteRowKey::new(64570, "10.10.132.242/32");
    let row = db.get_route(&key).expect("get").expect("row present");
    assert_eq!(row.as_path, vec![64570]);

    let mut d = driver("e2e_sled", db.db().clone(), &[ANNOUNCE, DOWN]);
    assert_eq!(d.run().expect("run"), Termination::EndOfStream);
    assert_eq!(db.route_count().expect("count"), 0);

    let mut d = driver("e2e_sled", db.db().clone(), &[ANNOUNCE, SHUTDOWN]);
    assert_eq!(d.run().expect("run"), Termination::Shutdown);
    assert!(db.routes().expect("routes").is_empty());
}

/// A reader that fails after its first line.
struct FailingReader {
    inner: Cursor<Vec<u8>>,
    served: bool,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for FailingReader {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        if self.served && self.inner.position() > 0 {
            return Err(std::io::Error::other("stream reset"));
        }
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.served = true;
        self.inner.consume(amt)
    }
}

#[test]
fn read_failure_is_fatal() {
    let log = init_file_logger("e2e_read_failure.log").expect("test log");
    let table = RouteTable::new(RecordingSink::default(), log.clone());
    let dispatcher = Dispatcher::new(table, log.clone());
    let input = FailingReader {
        inner: Cursor::new(format!("{ANNOUNCE}\n{DOWN}\n").into_bytes()),
        served: false,
    };
    let mut d = Driver::new(input, dispatcher, log);

    let err = d.run().expect_err("read failure");
    assert!(err.is_fatal());
    assert!(matches!(err, Error::Read { line: 1, .. }));
    assert!(d.table().contains("10.10.132.242/32", 64570));
}

/// A sink that panics on delete.
struct PanickingSink;

impl RouteSink for PanickingSink {
    fn insert_route(
        &self,
        _peer_asn: Asn,
        _subnet: &str,
        _as_path: &[Asn],
    ) -> Result<(), rdb::error::Error> {
        Ok(())
    }

    fn delete_route(
        &self,
        _peer_asn: Asn,
        _subnet: &str,
    ) -> Result<(), rdb::error::Error> {
        panic!("delete exploded");
    }

    fn truncate_routes(&self) -> Result<(), rdb::error::Error> {
        Ok(())
    }
}

#[test]
fn panic_while_processing_aborts_with_context() {
    let mut d = driver("e2e_panic", PanickingSink, &[ANNOUNCE, DOWN, ANNOUNCE]);

    let err = d.run().expect_err("aborted");
    assert!(err.is_fatal());
    match err {
        Error::Aborted {
            line,
            content,
            reason,
        } => {
            assert_eq!(line, 2);
            assert_eq!(content, DOWN);
            assert_eq!(reason, "delete exploded");
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(d.stats().lines, 2);
}

#[test]
fn process_line_reports_shutdown() {
    let mut d = driver("e2e_process_line", RecordingSink::default(), &[]);
    assert_eq!(d.process_line(1, ANNOUNCE), Action::Continue);
    assert_eq!(d.process_line(2, SHUTDOWN), Action::Shutdown);
    assert!(d.into_dispatcher().into_table().is_empty());
}
