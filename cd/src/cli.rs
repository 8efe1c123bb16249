//! CLI flag definitions
//!
//! Administration of tasks is an in-process API on the coordinator; the
//! binary only takes flags that shape how the daemon boots.

use clap::Parser;
use std::path::PathBuf;

/// CronDaemon - durable cron task daemon
#[derive(Debug, Parser)]
#[command(
    name = "crondaemon",
    about = "Runs durable recurring tasks from a SQLite store",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Override the task database path from config
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Override the timezone from config (IANA name, e.g. Asia/Shanghai)
    #[arg(long, value_name = "TZ")]
    pub timezone: Option<String>,

    /// Enable verbose output
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::parse_from(["cd"]);
        assert!(cli.config.is_none());
        assert!(cli.db.is_none());
        assert!(cli.timezone.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::parse_from(["cd", "--db", "/tmp/t.db", "--timezone", "Asia/Shanghai", "-v"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/t.db")));
        assert_eq!(cli.timezone.as_deref(), Some("Asia/Shanghai"));
        assert!(cli.verbose);
    }
}
