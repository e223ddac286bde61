//! Dated log file setup for the binary.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use env_logger::{Builder, Env, Target};

/// Environment variable holding the log filter (`env_logger` syntax).
pub const LOG_ENV: &str = "RUNWA_LOG";

/// `<dir>/<YYYY-MM-DD>.log`
pub fn log_file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.log", date.format("%Y-%m-%d")))
}

/// `<directory of the running executable>/log`
pub fn default_log_dir() -> io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(dir.join("log"))
}

/// Install a global logger appending to today's file in `dir`.
///
/// Creates `dir` if needed and returns the log file path.
pub fn init(dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = log_file_path(dir, Local::now().date_naive());
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    Builder::from_env(Env::default().filter_or(LOG_ENV, "info"))
        .target(Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {} [{}:{}] {}",
                Local::now().format("%Y/%m/%d %H:%M:%S"),
                record.level(),
                record.file().unwrap_or("?"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .try_init()?;

    Ok(path)
}
