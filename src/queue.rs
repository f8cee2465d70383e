//! Bounded multi-producer, single-consumer record queue.
//!
//! ```text
//! Producers ──enqueue(timeout)──▶ [r0][r1]..[rN] ──recv()──▶ Spooler
//!                                  fixed depth
//! ```
//!
//! Admission is plain FIFO: no priority reordering inside the queue.
//! Severity differentiation happens entirely through the timeout a producer
//! applies before admission: a non-blocking attempt drops on a full queue,
//! an indefinite one waits for a slot. Depth is fixed at creation and never
//! resized.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::record::{LogRecord, LOG_ITEM_SIZE};

/// How long a producer is willing to wait for a free slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timeout {
    /// Try once, never block.
    Immediate,
    /// Block up to the given duration.
    Bounded(Duration),
    /// Block until a slot frees. Reserved for records that must not drop.
    Forever,
}

/// Outcome of an enqueue attempt. Never escalated to the caller's own error
/// path; a timed-out record is simply lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueResult {
    Accepted,
    TimedOut,
}

/// Fixed-depth hand-off buffer between log producers and the spooler.
///
/// Producers may call [`enqueue`](Self::enqueue) from any task; exactly one
/// consumer calls [`recv`](Self::recv). Records from a single producer keep
/// their relative order; records from different producers interleave in
/// arrival order at the queue.
pub struct RecordQueue<const CAP: usize = LOG_ITEM_SIZE> {
    slots: Mutex<VecDeque<LogRecord<CAP>>>,
    not_full: Condvar,
    not_empty: Condvar,
    depth: usize,
}

impl<const CAP: usize> RecordQueue<CAP> {
    /// Create a queue with `depth` slots. Returns `None` for a zero depth.
    pub fn new(depth: usize) -> Option<Self> {
        if depth == 0 {
            return None;
        }

        Some(Self {
            slots: Mutex::new(VecDeque::with_capacity(depth)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            depth,
        })
    }

    /// Enqueue a record, waiting up to `timeout` for a free slot.
    ///
    /// Blocks the calling task only as long as the timeout allows.
    /// `Timeout::Immediate` never suspends the caller.
    pub fn enqueue(&self, record: LogRecord<CAP>, timeout: Timeout) -> EnqueueResult {
        let mut slots = self.slots.lock().unwrap();

        if slots.len() == self.depth {
            match timeout {
                Timeout::Immediate => return EnqueueResult::TimedOut,
                Timeout::Forever => {
                    while slots.len() == self.depth {
                        slots = self.not_full.wait(slots).unwrap();
                    }
                }
                Timeout::Bounded(limit) => {
                    let deadline = Instant::now() + limit;
                    while slots.len() == self.depth {
                        let now = Instant::now();
                        if now >= deadline {
                            return EnqueueResult::TimedOut;
                        }
                        let (guard, _) = self.not_full.wait_timeout(slots, deadline - now).unwrap();
                        slots = guard;
                    }
                }
            }
        }

        slots.push_back(record);
        self.not_empty.notify_one();
        EnqueueResult::Accepted
    }

    /// Take the next record, blocking indefinitely until one arrives.
    ///
    /// Single-consumer: only the spooler task calls this.
    pub fn recv(&self) -> LogRecord<CAP> {
        let mut slots = self.slots.lock().unwrap();

        loop {
            if let Some(record) = slots.pop_front() {
                self.not_full.notify_one();
                return record;
            }
            slots = self.not_empty.wait(slots).unwrap();
        }
    }

    /// Take the next record if one is immediately available.
    pub fn try_recv(&self) -> Option<LogRecord<CAP>> {
        let record = self.slots.lock().unwrap().pop_front();
        if record.is_some() {
            self.not_full.notify_one();
        }
        record
    }

    /// Number of records currently queued.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    /// True when no records are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.len() == self.depth
    }

    /// Configured slot count.
    pub fn depth(&self) -> usize {
        self.depth
    }
}
