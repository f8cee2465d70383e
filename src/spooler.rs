//! The spooler task: sole consumer of the record queue.
//!
//! Runs once initialization succeeds and never exits. Each record is written
//! to the transport sink followed by a line terminator. A transport write
//! failure is neither retried nor reported upward; the spooler is
//! diagnostic-only and must never become a source of deadlock or
//! backpressure on application logic.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::queue::RecordQueue;
use crate::transport::SharedSink;

/// Terminator appended after every record on the wire.
pub(crate) const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Spawn the spooler thread. On ESP-IDF a `std` thread is a FreeRTOS task.
pub(crate) fn spawn<const CAP: usize>(
    queue: Arc<RecordQueue<CAP>>,
    sink: SharedSink,
    stack_size: usize,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("logspool".into())
        .stack_size(stack_size)
        .spawn(move || spool(queue, sink))
}

fn spool<const CAP: usize>(queue: Arc<RecordQueue<CAP>>, sink: SharedSink) {
    loop {
        let record = queue.recv();
        let mut sink = sink.lock().unwrap();
        sink.write(record.bytes());
        sink.write(LINE_TERMINATOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use crate::queue::Timeout;
    use crate::record::LogRecord;
    use crate::transport::{MemorySink, Sink};

    #[test]
    fn test_spooler_drains_queue_to_sink() {
        let queue = Arc::new(RecordQueue::<64>::new(8).unwrap());
        let capture = MemorySink::new();
        let sink: SharedSink = Arc::new(Mutex::new(Box::new(capture.clone()) as Box<dyn Sink>));

        spawn(Arc::clone(&queue), sink, 64 * 1024).unwrap();

        queue.enqueue(LogRecord::from_text("alpha"), Timeout::Forever);
        queue.enqueue(LogRecord::from_text("beta"), Timeout::Forever);

        let deadline = Instant::now() + Duration::from_secs(2);
        while capture.text() != "alpha\r\nbeta\r\n" && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(capture.text(), "alpha\r\nbeta\r\n");
    }
}
