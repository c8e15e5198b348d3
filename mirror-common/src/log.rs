// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use slog::{Drain, Logger};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// A bunyan logger appending to `path`. The file is created if it does not
/// exist yet.
pub fn init_file_logger<P: AsRef<Path>>(path: P) -> std::io::Result<Logger> {
    Ok(build_logger(open_log_file(path)?))
}

pub fn open_log_file<P: AsRef<Path>>(path: P) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Bunyan records already carry `time`, `hostname` and `pid`.
pub fn build_logger<W: Write + Send + 'static>(w: W) -> Logger {
    let drain = slog_bunyan::new(w).build().fuse();
    let drain = slog_async::Async::new(drain)
        .chan_size(0x8000)
        .build()
        .fuse();
    slog::Logger::root(drain, slog::o!())
}

/// Human readable records at debug and above, narrowed by `RUST_LOG` when it
/// is set.
pub fn build_term_logger<W: Write + Send + 'static>(w: W) -> Logger {
    build_filtered_term_logger(w, std::env::var("RUST_LOG").ok().as_deref())
}

/// Human readable records at debug and above, narrowed by `filters` in
/// `RUST_LOG` syntax.
pub fn build_filtered_term_logger<W: Write + Send + 'static>(
    w: W,
    filters: Option<&str>,
) -> Logger {
    let decorator = slog_term::PlainDecorator::new(w);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let mut builder = slog_envlogger::LogBuilder::new(drain)
        .filter(None, slog::FilterLevel::Debug);
    if let Some(filters) = filters {
        builder = builder.parse(filters);
    }
    let drain = builder.build().fuse();
    let drain = slog_async::Async::new(drain)
        .chan_size(0x2000)
        .build()
        .fuse();
    slog::Logger::root(drain, slog::o!("pid" => std::process::id()))
}
