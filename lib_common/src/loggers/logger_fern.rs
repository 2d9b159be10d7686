use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Number of earlier log files left in the directory when a new one is started.
const KEEP_PREVIOUS_LOGS: usize = 1;

/// Installs the global logger.
///
/// Lines go to stdout and, when `log_dir` is given, to `<app_name>_<timestamp>.log` in that
/// directory. Only the newest earlier `.log` file survives in the directory.
pub fn setup_logging(app_name: &str, log_dir: Option<&Path>, log_level: &str) -> Result<()> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(parse_level(log_level))
        .chain(std::io::stdout());

    if let Some(log_dir) = log_dir {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir).with_context(|| format!("creating log directory {}", log_dir.display()))?;
        }
        cleanup_old_logs(log_dir, KEEP_PREVIOUS_LOGS)?;

        let log_path = log_dir.join(format!(
            "{}_{}.log",
            app_name,
            chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
        ));
        dispatch = dispatch.chain(fern::log_file(&log_path).with_context(|| format!("opening {}", log_path.display()))?);
    }

    dispatch.apply().context("a global logger is already installed")?;
    Ok(())
}

/// Unknown names fall back to `Info`.
pub fn parse_level(log_level: &str) -> log::LevelFilter {
    match log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    }
}

/// Deletes all but the `keep` most recently modified `.log` files in `log_dir`.
///
/// Files whose metadata cannot be read sort as oldest. A failed delete is reported on
/// stderr and skipped, since the logger is not up yet.
pub fn cleanup_old_logs(log_dir: &Path, keep: usize) -> Result<()> {
    let mut entries: Vec<(SystemTime, PathBuf)> = fs::read_dir(log_dir)?
        .filter_map(|res| res.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "log"))
        .map(|p| {
            let modified = fs::metadata(&p)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, p)
        })
        .collect();

    // Newest first
    entries.sort_by(|a, b| b.0.cmp(&a.0));

    for (_, path) in entries.iter().skip(keep) {
        if let Err(e) = fs::remove_file(path) {
            eprintln!("Failed to delete old log file {:?}: {}", path, e);
        }
    }

    Ok(())
}
