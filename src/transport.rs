//! Transport sinks: the synchronous write primitive at the end of the
//! pipeline.
//!
//! A sink must be callable from both task context and degraded contexts
//! (early boot, fault handlers). Its write status is never acted upon:
//! serial output has no flow-control feedback contract in this design, so
//! delivery to the wire is best-effort.

use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Error raised while configuring a sink.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Synchronous byte sink for the physical channel (UART, RTT, ...).
pub trait Sink: Send {
    /// One-time channel setup. `buffer_len` is the transport buffer size
    /// from the pipeline configuration; sinks without an internal buffer
    /// ignore it.
    fn configure(&mut self, _buffer_len: usize) -> Result<(), SinkError> {
        Ok(())
    }

    /// Write raw bytes. Failures are swallowed by the caller.
    fn write(&mut self, bytes: &[u8]);
}

/// Sink shared between the spooler task and degraded-mode direct writers.
///
/// During normal operation the spooler is effectively the only lock-taker.
/// Direct writers contend only under degraded conditions, where interleaved
/// output is tolerated; the process is already terminating.
pub(crate) type SharedSink = Arc<Mutex<Box<dyn Sink>>>;

/// Host-side capture sink backed by a shared byte buffer.
///
/// Clones observe the same buffer, so a test can keep one handle while the
/// pipeline owns the other.
#[derive(Clone, Default)]
pub struct MemorySink {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }

    /// Everything written so far, as text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    /// Number of bytes written so far.
    pub fn byte_count(&self) -> usize {
        self.data.lock().unwrap().len()
    }
}

impl Sink for MemorySink {
    fn configure(&mut self, buffer_len: usize) -> Result<(), SinkError> {
        self.data.lock().unwrap().reserve(buffer_len);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) {
        self.data.lock().unwrap().extend_from_slice(bytes);
    }
}
