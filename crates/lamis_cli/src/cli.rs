//! Command-line arguments for the interactive tracker shell.

use clap::Parser;
use lamis_core::DEFAULT_DB_FILE_NAME;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "lamis",
    version,
    about = "Interactive LAMIS checkbox tracker",
    long_about = "Track the 60 x 5 LAMIS checkbox grid from a terminal.\n\n\
                  Changes stay in memory until saved; export/import move the whole\n\
                  grid between devices as a JSON file."
)]
pub struct Cli {
    /// SQLite database holding the saved grid.
    #[arg(long, env = "LAMIS_DB", value_name = "PATH", default_value = DEFAULT_DB_FILE_NAME)]
    pub db: PathBuf,

    /// Absolute directory for rolling log files; logging is off when unset.
    #[arg(long = "log-dir", env = "LAMIS_LOG_DIR", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,
}
