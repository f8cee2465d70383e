//! Pipeline lifecycle and the producer-facing emitter.
//!
//! ```text
//! emit() ──format──▶ RecordQueue ──▶ spooler task ──▶ Sink
//!    │                                                 ▲
//!    └───────── direct write (boot / fault) ───────────┘
//! ```
//!
//! Routing: while the pipeline is Running and the scheduler probe reports a
//! consumer-capable environment, records go through the queue. Before
//! initialization, after a fault, or without a live scheduler, records are
//! written synchronously to the sink instead. Queued and direct-write
//! records have no total ordering between them; output may interleave during
//! a fault. That inconsistency is accepted, not hidden.

use core::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use thiserror::Error;

use crate::queue::{EnqueueResult, RecordQueue, Timeout};
use crate::record::{
    default_module_tag, modules, LogRecord, ModuleId, ModuleResolver, NetLogLevel, Severity,
    LOG_ITEM_SIZE,
};
use crate::spooler;
use crate::transport::{SharedSink, Sink, SinkError};

/// Default number of slots in the record queue.
pub const LOG_QUEUE_DEPTH: usize = 50;

/// Default transport buffer size handed to [`Sink::configure`].
pub const TRANSPORT_BUFFER_SIZE: usize = 256;

/// Default spooler task stack size in bytes.
pub const SPOOLER_STACK_SIZE: usize = 4096;

/// Pipeline lifecycle. `Faulted` is terminal: there is no recovery path
/// within a process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    Uninitialized = 0,
    Running = 1,
    Faulted = 2,
}

/// Capability check injected at the boundary: "can the concurrent path be
/// used right now?". Keeps the core portable: no scheduler internals are
/// inspected here.
pub type SchedulerProbe = fn() -> bool;

/// Observer invoked after each successfully delivered record. Lets a host
/// application wake an idle output task without the pipeline depending on
/// that collaborator's existence.
pub type OutputHook = fn();

#[cfg(not(target_os = "espidf"))]
fn scheduler_always_running() -> bool {
    true
}

fn no_output_hook() {}

/// Build-time pipeline configuration. Fixed once `init` has run; the
/// severity filter on [`LogPipeline`] is the only runtime knob.
pub struct PipelineConfig {
    /// Record queue depth in slots.
    pub queue_depth: usize,
    /// Transport buffer size handed to the sink during configuration.
    pub transport_buffer: usize,
    /// Spooler task stack size in bytes.
    pub spooler_stack: usize,
    /// Admission timeout for error-severity records.
    pub error_timeout: Timeout,
    /// Admission timeout for platform-internal records. Independent of the
    /// error class so platform diagnostics are never starved by application
    /// log volume.
    pub platform_timeout: Timeout,
    /// Admission timeout for everything else.
    pub default_timeout: Timeout,
    /// Execution-context capability check.
    pub scheduler_probe: SchedulerProbe,
    /// Post-emit observer.
    pub on_output: OutputHook,
    /// Fallback module-tag resolver.
    pub module_resolver: ModuleResolver,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_depth: LOG_QUEUE_DEPTH,
            transport_buffer: TRANSPORT_BUFFER_SIZE,
            spooler_stack: SPOOLER_STACK_SIZE,
            error_timeout: Timeout::Forever,
            platform_timeout: Timeout::Forever,
            default_timeout: Timeout::Immediate,
            #[cfg(target_os = "espidf")]
            scheduler_probe: crate::esp::scheduler_running,
            #[cfg(not(target_os = "espidf"))]
            scheduler_probe: scheduler_always_running,
            on_output: no_output_hook,
            module_resolver: default_module_tag,
        }
    }
}

impl PipelineConfig {
    /// Admission timeout for a severity class.
    pub fn timeout_for(&self, severity: Severity) -> Timeout {
        match severity {
            Severity::Error => self.error_timeout,
            Severity::Platform => self.platform_timeout,
            _ => self.default_timeout,
        }
    }
}

/// Initialization failure, one variant per failing step. The caller may
/// continue operating on the degraded direct-write path after any of these.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("transport sink configuration failed")]
    Sink(#[from] SinkError),
    #[error("record queue creation failed (depth {0})")]
    Queue(usize),
    #[error("spooler task creation failed")]
    Task(#[from] io::Error),
}

/// The log pipeline: queue, spooler, lifecycle flags and emitter API.
///
/// Created once, destroyed never; process-lifetime state on an embedded
/// target. All emit paths are callable from any task; delivery failures are
/// never propagated, logging must not perturb the caller's control flow.
pub struct LogPipeline<const CAP: usize = LOG_ITEM_SIZE> {
    config: PipelineConfig,
    sink: SharedSink,
    queue: OnceLock<Arc<RecordQueue<CAP>>>,
    initialized: AtomicBool,
    faulted: AtomicBool,
    max_severity: AtomicU8,
}

impl<const CAP: usize> LogPipeline<CAP> {
    /// Create an uninitialized pipeline around `sink`.
    ///
    /// Usable immediately: until [`init`](Self::init) succeeds every emit
    /// falls back to a direct synchronous write.
    pub fn new(sink: Box<dyn Sink>, config: PipelineConfig) -> Self {
        Self {
            config,
            sink: Arc::new(Mutex::new(sink)),
            queue: OnceLock::new(),
            initialized: AtomicBool::new(false),
            faulted: AtomicBool::new(false),
            max_severity: AtomicU8::new(Severity::Detail as u8),
        }
    }

    /// Configure the sink, create the record queue and start the spooler.
    ///
    /// Each step reports its own failure; on any failure the pipeline stays
    /// Uninitialized and the direct-write path remains available. Calling
    /// `init` on a Running pipeline is a no-op.
    pub fn init(&self) -> Result<(), InitError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        self.sink
            .lock()
            .unwrap()
            .configure(self.config.transport_buffer)?;

        let queue = Arc::new(
            RecordQueue::new(self.config.queue_depth)
                .ok_or(InitError::Queue(self.config.queue_depth))?,
        );

        spooler::spawn(
            Arc::clone(&queue),
            Arc::clone(&self.sink),
            self.config.spooler_stack,
        )?;

        let _ = self.queue.set(queue);
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        if self.faulted.load(Ordering::Acquire) {
            PipelineState::Faulted
        } else if self.initialized.load(Ordering::Acquire) {
            PipelineState::Running
        } else {
            PipelineState::Uninitialized
        }
    }

    /// Enter fault mode. Irreversible.
    ///
    /// Force-marks the pipeline initialized so the direct-write bypass
    /// activates even when `init` was never reached; fault handlers run in
    /// an environment where task scheduling is meaningless.
    pub fn enter_fault_mode(&self) {
        self.initialized.store(true, Ordering::Release);
        self.faulted.store(true, Ordering::Release);
    }

    /// Set the most verbose application severity that is still delivered.
    /// `Platform` records are exempt from this filter.
    pub fn set_max_severity(&self, severity: Severity) {
        self.max_severity.store(severity as u8, Ordering::Relaxed);
    }

    fn category_enabled(&self, severity: Severity) -> bool {
        severity.is_platform() || (severity as u8) <= self.max_severity.load(Ordering::Relaxed)
    }

    /// Application log entry point.
    ///
    /// Disabled categories return before any formatting work. Error records
    /// block until admitted; everything else is dropped when the queue is
    /// full.
    pub fn emit(&self, module: ModuleId, severity: Severity, args: fmt::Arguments<'_>) {
        self.emit_tagged(self.module_tag(module), severity, args);
    }

    /// Emit with an explicit module tag (used by the `log` facade adapter).
    pub fn emit_tagged(&self, tag: &str, severity: Severity, args: fmt::Arguments<'_>) {
        if !self.category_enabled(severity) {
            return;
        }
        let record = LogRecord::compose(severity, Some(tag), args);
        if self.deliver(record, self.config.timeout_for(severity)) {
            (self.config.on_output)();
        }
    }

    /// Emit without a module tag (fault dumps, boot banners).
    pub fn emit_untagged(&self, severity: Severity, args: fmt::Arguments<'_>) {
        if !self.category_enabled(severity) {
            return;
        }
        let record = LogRecord::compose(severity, None, args);
        let _ = self.deliver(record, self.config.timeout_for(severity));
    }

    /// Platform-internal entry point (see the [`platform_log!`] macro).
    ///
    /// No module tag, no category filter, and its own indefinite admission
    /// timeout. Does not fire the post-emit hook.
    ///
    /// [`platform_log!`]: crate::platform_log
    pub fn platform_log(&self, args: fmt::Arguments<'_>) {
        let record = LogRecord::compose(Severity::Platform, None, args);
        let _ = self.deliver(record, self.config.platform_timeout);
    }

    /// Network-stack entry point. Levels map onto the application
    /// severities; only `Critical` earns the never-drop policy.
    pub fn net_log(&self, level: NetLogLevel, args: fmt::Arguments<'_>) {
        let severity = level.severity();
        if !self.category_enabled(severity) {
            return;
        }
        let record = LogRecord::compose(severity, Some("net"), args);
        if self.deliver(record, self.config.timeout_for(severity)) {
            (self.config.on_output)();
        }
    }

    fn module_tag(&self, module: ModuleId) -> &'static str {
        // Device layer is special-cased; everything else goes through the
        // configured resolver.
        if module == modules::DEVICE_LAYER {
            "DL"
        } else {
            (self.config.module_resolver)(module)
        }
    }

    /// Hand a record to the queue or, in a degraded context, straight to
    /// the sink. Returns whether the record was delivered.
    fn deliver(&self, record: LogRecord<CAP>, timeout: Timeout) -> bool {
        if self.use_queue() {
            if let Some(queue) = self.queue.get() {
                return queue.enqueue(record, timeout) == EnqueueResult::Accepted;
            }
        }
        self.direct_write(&record);
        true
    }

    /// Queue records only while Running with a live scheduler. Early boot
    /// (Uninitialized) and fault mode both take the direct path so
    /// diagnostics keep flowing when the spooler cannot run.
    fn use_queue(&self) -> bool {
        self.state() == PipelineState::Running && (self.config.scheduler_probe)()
    }

    /// Synchronous bypass write, line terminator included. Never suspends
    /// the caller beyond the sink lock; under fault conditions output may
    /// interleave with the spooler's.
    fn direct_write(&self, record: &LogRecord<CAP>) {
        let mut sink = self.sink.lock().unwrap();
        sink.write(record.bytes());
        sink.write(spooler::LINE_TERMINATOR);
    }
}

static GLOBAL: OnceLock<LogPipeline> = OnceLock::new();

/// Install the process-wide pipeline. The first install wins; later calls
/// drop their argument and return the existing pipeline.
pub fn install_global(pipeline: LogPipeline) -> &'static LogPipeline {
    GLOBAL.get_or_init(move || pipeline)
}

/// The process-wide pipeline, if one has been installed.
pub fn global() -> Option<&'static LogPipeline> {
    GLOBAL.get()
}

/// Log through the process-wide pipeline's platform-internal entry point.
///
/// A no-op until [`install_global`](crate::pipeline::install_global) has
/// run.
#[macro_export]
macro_rules! platform_log {
    ($($arg:tt)*) => {{
        if let Some(pipeline) = $crate::pipeline::global() {
            pipeline.platform_log(format_args!($($arg)*));
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemorySink;

    fn pipeline_with_sink(config: PipelineConfig) -> (LogPipeline, MemorySink) {
        let sink = MemorySink::new();
        let pipeline = LogPipeline::new(Box::new(sink.clone()), config);
        (pipeline, sink)
    }

    #[test]
    fn test_state_transitions() {
        let (pipeline, _sink) = pipeline_with_sink(PipelineConfig::default());
        assert_eq!(pipeline.state(), PipelineState::Uninitialized);

        pipeline.init().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Running);

        pipeline.enter_fault_mode();
        assert_eq!(pipeline.state(), PipelineState::Faulted);
    }

    #[test]
    fn test_fault_mode_without_init_marks_initialized() {
        let (pipeline, sink) = pipeline_with_sink(PipelineConfig::default());

        pipeline.enter_fault_mode();
        assert_eq!(pipeline.state(), PipelineState::Faulted);

        // Bypass works even though init() never ran.
        pipeline.emit(modules::DEVICE_LAYER, Severity::Error, format_args!("dead"));
        assert!(sink.text().contains("<error > [DL] dead"));
    }

    #[test]
    fn test_uninitialized_emit_writes_directly() {
        let (pipeline, sink) = pipeline_with_sink(PipelineConfig::default());

        pipeline.emit(modules::NETWORK, Severity::Warning, format_args!("early"));

        assert_eq!(sink.text(), "<warn  > [NET] early\r\n");
    }

    #[test]
    fn test_init_is_idempotent() {
        let (pipeline, _sink) = pipeline_with_sink(PipelineConfig::default());
        pipeline.init().unwrap();
        pipeline.init().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Running);
    }

    #[test]
    fn test_zero_depth_queue_reports_queue_step() {
        let (pipeline, _sink) = pipeline_with_sink(PipelineConfig {
            queue_depth: 0,
            ..PipelineConfig::default()
        });

        match pipeline.init() {
            Err(InitError::Queue(0)) => {}
            other => panic!("expected queue-creation failure, got {other:?}"),
        }
        assert_eq!(pipeline.state(), PipelineState::Uninitialized);
    }

    #[test]
    fn test_disabled_category_is_filtered_before_formatting() {
        let (pipeline, sink) = pipeline_with_sink(PipelineConfig::default());
        pipeline.set_max_severity(Severity::Warning);

        pipeline.emit(modules::DEVICE_LAYER, Severity::Info, format_args!("chatty"));
        pipeline.emit(modules::DEVICE_LAYER, Severity::Warning, format_args!("kept"));

        let text = sink.text();
        assert!(!text.contains("chatty"));
        assert!(text.contains("kept"));
    }

    #[test]
    fn test_platform_log_ignores_severity_filter() {
        let (pipeline, sink) = pipeline_with_sink(PipelineConfig::default());
        pipeline.set_max_severity(Severity::Error);

        pipeline.platform_log(format_args!("boot reason {}", 7));

        assert!(sink.text().contains("<system> boot reason 7"));
    }

    #[test]
    fn test_net_log_maps_levels() {
        let (pipeline, sink) = pipeline_with_sink(PipelineConfig::default());

        pipeline.net_log(NetLogLevel::Critical, format_args!("link down"));
        pipeline.net_log(NetLogLevel::Debug, format_args!("probe sent"));

        let text = sink.text();
        assert!(text.contains("<error > [net] link down"));
        assert!(text.contains("<detail> [net] probe sent"));
    }

    #[test]
    fn test_scheduler_probe_forces_direct_path() {
        fn probe_off() -> bool {
            false
        }

        let (pipeline, sink) = pipeline_with_sink(PipelineConfig {
            scheduler_probe: probe_off,
            ..PipelineConfig::default()
        });
        pipeline.init().unwrap();

        pipeline.emit(modules::DEVICE_LAYER, Severity::Info, format_args!("no sched"));

        // Direct write is synchronous, so the bytes are visible immediately.
        assert!(sink.text().contains("<info  > [DL] no sched"));
    }
}
