//! Fault-mode diagnostics.
//!
//! Once a hard fault is underway the scheduler can no longer be trusted, so
//! the pipeline is switched to the direct-write path and the dump goes
//! straight to the sink. Halting or resetting afterwards stays with the
//! caller; no recovery code path exists here.

use crate::pipeline::LogPipeline;
use crate::record::Severity;

/// Snapshot of machine state captured on entry to a fault handler.
pub struct FaultDump<'a> {
    /// Short reason line, e.g. `"HardFault"`.
    pub reason: &'a str,
    /// Named 32-bit register values to print, in order.
    pub registers: &'a [(&'static str, u32)],
}

/// Switch `pipeline` into fault mode and write the dump over the direct
/// path. Irreversible; the caller is expected to halt or reset afterwards.
pub fn report<const CAP: usize>(pipeline: &LogPipeline<CAP>, dump: &FaultDump<'_>) {
    pipeline.enter_fault_mode();

    pipeline.emit_untagged(Severity::Error, format_args!("{}:", dump.reason));
    for (name, value) in dump.registers {
        pipeline.emit_untagged(Severity::Error, format_args!("{name:<12}0x{value:08x}"));
    }
}
