//! Interactive terminal front end for the LAMIS tracker.
//!
//! # Responsibility
//! - Wire CLI arguments to logging, storage and one tracker session.
//! - Hand stdin/stdout to the command shell.

use clap::Parser;
use lamis_core::db::open_db;
use lamis_core::{default_log_level, init_logging, SqliteGridRepository, TrackerService};
use log::info;
use std::io;

mod cli;
mod shell;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, &log_dir.to_string_lossy()) {
            eprintln!("error: failed to initialize logging: {err}");
            std::process::exit(1);
        }
    }

    let conn = match open_db(&cli.db) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("error: cannot open `{}`: {err}", cli.db.display());
            std::process::exit(1);
        }
    };
    let mut service = match TrackerService::open(SqliteGridRepository::new(conn)) {
        Ok(service) => service,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    info!(
        "event=cli_start module=cli status=ok rows={} db={}",
        service.state().len(),
        cli.db.display()
    );

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout().lock();
    if let Err(err) = shell::run(&mut service, &mut input, &mut output) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
