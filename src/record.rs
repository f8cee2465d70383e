//! Bounded log records and severity policy.
//!
//! A record is one formatted log line:
//!
//! ```text
//! <error > [DL] association timed out
//! ────┬─── ──┬─ ─────────┬──────────
//!  prefix   tag    user message
//! ```
//!
//! Records are fixed-capacity byte strings. Composition truncates, never
//! overflows: the writer stops at capacity and the byte after the message is
//! always the terminator. Truncation is silent.
//!
//! Formatting is independent of delivery; routing lives in [`crate::pipeline`].

use core::fmt::{self, Write};

/// Platform-wide maximum size of one formatted record, terminator included.
pub const LOG_ITEM_SIZE: usize = 256;

/// Smallest record capacity that still fits a severity prefix and a tag.
pub const MIN_RECORD_CAPACITY: usize = 16;

#[cfg(not(feature = "color"))]
mod prefix {
    pub const ERROR: &str = "<error > ";
    pub const WARN: &str = "<warn  > ";
    pub const INFO: &str = "<info  > ";
    pub const DETAIL: &str = "<detail> ";
    pub const SYSTEM: &str = "<system> ";
}

#[cfg(feature = "color")]
mod prefix {
    pub const ERROR: &str = "\x1b[1;31m<error >\x1b[0m ";
    pub const WARN: &str = "\x1b[1;33m<warn  >\x1b[0m ";
    pub const INFO: &str = "\x1b[0m<info  > ";
    pub const DETAIL: &str = "\x1b[1;34m<detail>\x1b[0m ";
    pub const SYSTEM: &str = "\x1b[0m<system> ";
}

/// Priority class of a record.
///
/// Each severity maps to exactly one (prefix, timeout-policy) pair; see
/// [`crate::pipeline::PipelineConfig::timeout_for`]. There is no priority
/// reordering anywhere downstream; severity only decides how long the
/// producer is willing to wait for queue admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    Error = 0,
    Warning = 1,
    Info = 2,
    Detail = 3,
    /// Platform-internal diagnostics. Not an application category: exempt
    /// from the severity filter and never starved by application volume.
    Platform = 4,
}

impl Severity {
    /// Prefix string written ahead of every record of this severity.
    pub fn prefix(self) -> &'static str {
        match self {
            Severity::Error => prefix::ERROR,
            Severity::Warning => prefix::WARN,
            Severity::Info => prefix::INFO,
            Severity::Detail => prefix::DETAIL,
            Severity::Platform => prefix::SYSTEM,
        }
    }

    /// True for the platform-internal class.
    pub fn is_platform(self) -> bool {
        self == Severity::Platform
    }
}

/// Network-stack log levels, mapped onto the four application severities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NetLogLevel {
    Critical = 0,
    Warning = 1,
    Note = 2,
    Info = 3,
    Debug = 4,
}

impl NetLogLevel {
    /// Severity a net-stack message is delivered as.
    ///
    /// Only `Critical` earns the never-drop policy; everything else is
    /// best-effort like ordinary application chatter.
    pub fn severity(self) -> Severity {
        match self {
            NetLogLevel::Critical => Severity::Error,
            NetLogLevel::Warning => Severity::Warning,
            NetLogLevel::Note | NetLogLevel::Info => Severity::Info,
            NetLogLevel::Debug => Severity::Detail,
        }
    }
}

/// Identifier of the subsystem that produced a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuleId(pub u8);

/// Well-known module identifiers.
pub mod modules {
    use super::ModuleId;

    pub const DEVICE_LAYER: ModuleId = ModuleId(1);
    pub const NETWORK: ModuleId = ModuleId(2);
    pub const SECURITY: ModuleId = ModuleId(3);
    pub const DATA_MGMT: ModuleId = ModuleId(4);
}

/// Resolver producing a short display tag for a module identifier.
pub type ModuleResolver = fn(ModuleId) -> &'static str;

/// Generic tag resolver used when the pipeline does not special-case a
/// module itself.
pub fn default_module_tag(module: ModuleId) -> &'static str {
    match module {
        modules::DEVICE_LAYER => "DL",
        modules::NETWORK => "NET",
        modules::SECURITY => "SEC",
        modules::DATA_MGMT => "DM",
        _ => "---",
    }
}

/// A single bounded, formatted log line.
///
/// Invariants: `len < CAP` and `buf[len] == 0`. A message that would not fit
/// is cut at `CAP - 1` bytes; the terminator is always written.
#[derive(Clone, Copy)]
pub struct LogRecord<const CAP: usize = LOG_ITEM_SIZE> {
    buf: [u8; CAP],
    len: usize,
}

impl<const CAP: usize> LogRecord<CAP> {
    /// Create an empty record.
    pub const fn empty() -> Self {
        assert!(CAP >= MIN_RECORD_CAPACITY, "record capacity too small");

        Self {
            buf: [0; CAP],
            len: 0,
        }
    }

    /// Compose a record: `[prefix][tag-in-brackets][formatted message]`.
    ///
    /// Truncation is deterministic and silent; the result is always
    /// terminated.
    pub fn compose(severity: Severity, tag: Option<&str>, args: fmt::Arguments<'_>) -> Self {
        let mut record = Self::empty();
        let mut writer = RecordWriter {
            buf: &mut record.buf,
            pos: 0,
        };

        let _ = writer.write_str(severity.prefix());
        if let Some(tag) = tag {
            let _ = writer.write_str("[");
            let _ = writer.write_str(tag);
            let _ = writer.write_str("] ");
        }
        let _ = fmt::write(&mut writer, args);

        record.len = writer.pos;
        record.buf[record.len] = 0;
        record
    }

    /// Build a record from pre-formatted text, without prefix or tag.
    pub fn from_text(text: &str) -> Self {
        let mut record = Self::empty();
        let take = text.len().min(CAP - 1);
        record.buf[..take].copy_from_slice(&text.as_bytes()[..take]);
        record.len = take;
        record.buf[record.len] = 0;
        record
    }

    /// Message bytes, terminator excluded.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Message length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the record carries no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Message as text, for display and tests.
    pub fn text(&self) -> &str {
        core::str::from_utf8(self.bytes()).unwrap_or("<invalid utf8>")
    }

    /// Invariant check: the byte after the message is the terminator.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.len < CAP && self.buf[self.len] == 0
    }
}

impl<const CAP: usize> Default for LogRecord<CAP> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const CAP: usize> fmt::Debug for LogRecord<CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogRecord")
            .field("len", &self.len)
            .field("text", &self.text())
            .finish()
    }
}

/// Bounded writer: reserves the final byte for the terminator and discards
/// everything past capacity.
struct RecordWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Write for RecordWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let capacity = self.buf.len() - 1;
        let remaining = capacity - self.pos;
        let to_write = bytes.len().min(remaining);
        self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
        self.pos += to_write;
        Ok(())
    }
}
