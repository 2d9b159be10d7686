/// `fern` dispatch to stdout and an optional timestamped log file.
pub mod logger_fern;

pub use logger_fern::{cleanup_old_logs, parse_level, setup_logging};
