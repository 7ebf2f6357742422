use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dirsim_types::{OscValue, OutboundMessage};

use super::sink::{OscSink, UdpSink};
use super::DispatchError;

/// How long the idle sender waits before re-checking the queue when no
/// enqueue wakes it.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

struct QueueState {
    pending: VecDeque<OutboundMessage>,
    sink: Arc<dyn OscSink>,
    running: bool,
    in_flight: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    /// Signalled on enqueue and shutdown.
    wake: Condvar,
    /// Signalled when the queue drains.
    idle: Condvar,
    sent: AtomicU64,
    failed: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, msg: OutboundMessage) {
        let mut state = self.lock();
        if !state.running {
            log::debug!(target: "dispatch", "queue shut down, dropping {}", msg);
            return;
        }
        state.pending.push_back(msg);
        drop(state);
        self.wake.notify_one();
    }
}

/// Enqueue-only handle to a [`DispatchQueue`].
#[derive(Clone)]
pub struct QueueProducer {
    shared: Arc<Shared>,
}

impl QueueProducer {
    pub fn push(&self, msg: OutboundMessage) {
        self.shared.push(msg);
    }
}

/// FIFO of outbound messages with a dedicated sender thread.
///
/// One lock guards both the pending messages and the sink handle. It is held
/// only to push, pop or swap; the send itself happens outside it.
pub struct DispatchQueue {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl DispatchQueue {
    pub fn spawn(sink: Arc<dyn OscSink>, poll_interval: Duration) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                sink,
                running: true,
                in_flight: false,
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
            sent: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("osc-sender".into())
            .spawn(move || sender_loop(thread_shared, poll_interval))?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Queue `address value`. Never blocks on the network.
    pub fn enqueue(&self, address: impl Into<String>, value: impl Into<OscValue>) {
        self.push(OutboundMessage::new(address, value));
    }

    pub fn push(&self, msg: OutboundMessage) {
        self.shared.push(msg);
    }

    /// A cloneable producer handle for other threads (e.g. a MIDI callback).
    pub fn producer(&self) -> QueueProducer {
        QueueProducer {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Swap the transport. Messages already queued go to the new sink.
    pub fn set_sink(&self, sink: Arc<dyn OscSink>) {
        let mut state = self.shared.lock();
        log::info!(target: "dispatch", "sink {} -> {}", state.sink.describe(), sink.describe());
        state.sink = sink;
    }

    /// Point the queue at a new UDP host/port.
    pub fn retarget(&self, host: &str, port: u16) -> Result<(), DispatchError> {
        let sink = UdpSink::connect(host, port)?;
        self.set_sink(Arc::new(sink));
        Ok(())
    }

    /// Messages waiting to be sent.
    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn sent_count(&self) -> u64 {
        self.shared.sent.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> u64 {
        self.shared.failed.load(Ordering::Relaxed)
    }

    /// Block until every queued message has been attempted, or `timeout`
    /// passes. Returns `true` if the queue drained.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        while !state.pending.is_empty() || state.in_flight {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .shared
                .idle
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            state = guard;
        }
        true
    }

    /// Stop accepting messages, let the sender drain what is queued, and
    /// join it.
    pub fn shutdown(&mut self) {
        {
            let mut state = self.shared.lock();
            state.running = false;
        }
        self.shared.wake.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!(target: "dispatch", "sender thread panicked");
            }
        }
    }
}

impl Drop for DispatchQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sender_loop(shared: Arc<Shared>, poll_interval: Duration) {
    loop {
        let (msg, sink) = {
            let mut state = shared.lock();
            loop {
                if let Some(msg) = state.pending.pop_front() {
                    state.in_flight = true;
                    break (msg, Arc::clone(&state.sink));
                }
                if !state.running {
                    return;
                }
                let (guard, _) = shared
                    .wake
                    .wait_timeout(state, poll_interval)
                    .unwrap_or_else(|e| e.into_inner());
                state = guard;
            }
        };

        match sink.send(&msg) {
            Ok(()) => {
                shared.sent.fetch_add(1, Ordering::Relaxed);
                log::trace!(target: "dispatch", "sent {}", msg);
            }
            Err(e) => {
                shared.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!(target: "dispatch", "dropped {} ({}): {}", msg, sink.describe(), e);
            }
        }

        let mut state = shared.lock();
        state.in_flight = false;
        if state.pending.is_empty() {
            shared.idle.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::MemorySink;

    const WAIT: Duration = Duration::from_secs(2);

    #[test]
    fn test_order_preserved_under_failure() {
        let sink = Arc::new(MemorySink::failing());
        let queue = DispatchQueue::spawn(sink.clone(), DEFAULT_POLL_INTERVAL).unwrap();
        queue.enqueue("/a", 1);
        queue.enqueue("/b", 2);
        queue.enqueue("/c", 3);
        assert!(queue.flush(WAIT));
        assert_eq!(sink.addresses(), vec!["/a", "/b", "/c"]);
        assert_eq!(queue.failed_count(), 3);
        assert_eq!(queue.sent_count(), 0);
    }

    #[test]
    fn test_sink_swap_keeps_order() {
        let first = Arc::new(MemorySink::new());
        let second = Arc::new(MemorySink::new());
        let queue = DispatchQueue::spawn(first.clone(), DEFAULT_POLL_INTERVAL).unwrap();
        queue.enqueue("/one", 1);
        assert!(queue.flush(WAIT));
        queue.set_sink(second.clone());
        queue.enqueue("/two", 2);
        queue.enqueue("/three", 3);
        assert!(queue.flush(WAIT));
        assert_eq!(first.addresses(), vec!["/one"]);
        assert_eq!(second.addresses(), vec!["/two", "/three"]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_shutdown_drains_then_rejects() {
        let sink = Arc::new(MemorySink::new());
        let mut queue = DispatchQueue::spawn(sink.clone(), DEFAULT_POLL_INTERVAL).unwrap();
        for i in 0..20 {
            queue.enqueue("/n", i);
        }
        queue.shutdown();
        assert_eq!(sink.attempted().len(), 20);
        queue.enqueue("/late", 0);
        assert_eq!(queue.pending(), 0);
        assert_eq!(sink.attempted().len(), 20);
    }

    #[test]
    fn test_producer_from_another_thread() {
        let sink = Arc::new(MemorySink::new());
        let queue = DispatchQueue::spawn(sink.clone(), DEFAULT_POLL_INTERVAL).unwrap();
        let producer = queue.producer();
        let worker = thread::spawn(move || {
            for i in 0..5 {
                producer.push(OutboundMessage::new("/midi/1", i));
            }
        });
        worker.join().unwrap();
        assert!(queue.flush(WAIT));
        let values: Vec<_> = sink.attempted().into_iter().map(|m| m.args[0].clone()).collect();
        assert_eq!(values, (0..5).map(OscValue::Int).collect::<Vec<_>>());
    }
}
