//! # LogSpool
//!
//! Queue-backed serial log spooling for ESP32-class targets.
//!
//! ```text
//! Producers                 RecordQueue            Spooler task
//! ─────────                 ───────────            ────────────
//!
//! emit() / log::info!() ──▶ [r0][r1][r2] ────────▶ UART / RTT
//! platform_log!()            bounded, FIFO          blocking ok
//!        │                                              ▲
//!        └─────── direct write (boot / fault) ──────────┘
//! ```
//!
//! Severity decides the admission timeout, never queue position: error and
//! platform records block until a slot frees, everything else drops when
//! the queue is full. Before initialization and after a fault the queue is
//! bypassed entirely and records go straight to the transport sink.
//!
//! See [`pipeline::LogPipeline`] for the producer-facing API and
//! [`facade::install`] for the `log` crate adapter.

pub mod entropy;
pub mod facade;
pub mod fault;
pub mod pipeline;
pub mod queue;
pub mod record;
mod spooler;
pub mod transport;

#[cfg(target_os = "espidf")]
pub mod esp;

pub use pipeline::{
    global, install_global, InitError, LogPipeline, PipelineConfig, PipelineState,
};
pub use queue::{EnqueueResult, RecordQueue, Timeout};
pub use record::{LogRecord, ModuleId, NetLogLevel, Severity};
pub use transport::{MemorySink, Sink, SinkError};
