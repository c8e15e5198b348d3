// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use feed::{Dispatcher, Driver, Termination};
use mirror_common::log::{build_logger, build_term_logger, open_log_file};
use rdb::{Db, RouteSink, RouteTable};
use slog::{error, info, Logger};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror a speaker's route feed into the route store.
    Run(Run),
    /// Print the routes held in the route store.
    Dump(Dump),
}

#[derive(Args, Debug)]
struct Run {
    /// Event feed to read, one JSON event per line. Standard input when
    /// omitted.
    input: Option<PathBuf>,

    /// Route store location.
    #[arg(long, env = "MIRRORD_DB", default_value = "mirrord.db")]
    db: String,

    /// Log file, opened for appending.
    #[arg(long, env = "MIRRORD_LOG_FILE", default_value = "mirrord.log")]
    log_file: PathBuf,

    #[arg(long, env = "MIRRORD_LOG_FORMAT", value_enum, default_value_t)]
    log_format: LogFormat,

    /// Drop every stored route before reading the feed.
    #[arg(long)]
    truncate_on_start: bool,
}

#[derive(Args, Debug)]
struct Dump {
    /// Route store location.
    #[arg(long, env = "MIRRORD_DB", default_value = "mirrord.db")]
    db: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Bunyan records.
    #[default]
    Json,
    /// Terminal style records, filtered by RUST_LOG.
    Human,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    let result = match args.command {
        Commands::Run(r) => run(r),
        Commands::Dump(d) => dump(d),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("mirrord: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logger(run: &Run) -> Result<Logger> {
    let file = open_log_file(&run.log_file).with_context(|| {
        format!("open log file {}", run.log_file.display())
    })?;
    Ok(match run.log_format {
        LogFormat::Json => build_logger(file),
        LogFormat::Human => build_term_logger(file),
    })
}

fn run(run: Run) -> Result<ExitCode> {
    // The speaker reads our stdout, so the startup marker goes to stderr.
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    eprintln!("mirrord {} started in {cwd}", env!("CARGO_PKG_VERSION"));

    let log = init_logger(&run)?;
    info!(log, "starting route mirror";
        "db" => &run.db,
        "input" => run
            .input
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<stdin>".into())
    );

    let db = Db::new(&run.db, log.clone())
        .with_context(|| format!("open route store {}", run.db))?;

    if run.truncate_on_start {
        if let Err(e) = db.truncate_routes() {
            error!(log, "truncate on start failed: {e}");
        }
    }

    let input: Box<dyn BufRead> = match &run.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("open input {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    let table = RouteTable::new(db, log.clone());
    let dispatcher = Dispatcher::new(table, log.clone());
    let mut driver = Driver::new(input, dispatcher, log.clone());

    install_panic_hook(log.clone());
    let result = driver.run();
    remove_panic_hook();

    Ok(exit_code(result, &log))
}

/// Send panic reports to the log. Stderr carries only the startup marker.
fn install_panic_hook(log: Logger) {
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        error!(log, "panic: {info}"; "location" => location);
    }));
}

/// Reinstate the default hook. This drops the hook's logger so the log
/// drain can flush on exit.
fn remove_panic_hook() {
    drop(std::panic::take_hook());
}

fn exit_code(
    result: Result<Termination, feed::error::Error>,
    log: &Logger,
) -> ExitCode {
    match result {
        Ok(Termination::Shutdown) => {
            info!(log, "exiting on shutdown notification");
            ExitCode::SUCCESS
        }
        Ok(Termination::EndOfStream) => {
            info!(log, "exiting on end of input");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(log, "exiting on unhandled error: {e}";
                "error" => format!("{e:?}")
            );
            ExitCode::FAILURE
        }
    }
}

fn dump(dump: Dump) -> Result<ExitCode> {
    let log = Logger::root(slog::Discard, slog::o!());
    let db = Db::new(&dump.db, log)
        .with_context(|| format!("open route store {}", dump.db))?;
    let routes = db.routes()?;
    println!("{}", serde_json::to_string_pretty(&routes)?);
    Ok(ExitCode::SUCCESS)
}
