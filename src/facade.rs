//! `log` facade adapter.
//!
//! Routes `log::error!` and friends into the process-wide pipeline so
//! application crates do not need to know about it. The target's last path
//! segment becomes the module tag.

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};

use crate::pipeline::global;
use crate::record::Severity;

struct PipelineLogger;

static LOGGER: PipelineLogger = PipelineLogger;

/// Install the adapter. Install the global pipeline first; records emitted
/// before that are discarded by the adapter.
pub fn install(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(max_level))
}

fn severity_for(level: Level) -> Severity {
    match level {
        Level::Error => Severity::Error,
        Level::Warn => Severity::Warning,
        Level::Info => Severity::Info,
        Level::Debug | Level::Trace => Severity::Detail,
    }
}

fn short_target(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

impl log::Log for PipelineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(pipeline) = global() {
            pipeline.emit_tagged(
                short_target(record.target()),
                severity_for(record.level()),
                *record.args(),
            );
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(severity_for(Level::Error), Severity::Error);
        assert_eq!(severity_for(Level::Warn), Severity::Warning);
        assert_eq!(severity_for(Level::Info), Severity::Info);
        assert_eq!(severity_for(Level::Debug), Severity::Detail);
        assert_eq!(severity_for(Level::Trace), Severity::Detail);
    }

    #[test]
    fn test_short_target_takes_last_segment() {
        assert_eq!(short_target("firmware::wifi::assoc"), "assoc");
        assert_eq!(short_target("main"), "main");
    }
}
