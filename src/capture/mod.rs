//! Capture engine: one worker thread per run that reads, dissects and
//! batches frames from a [`source::PacketSource`].

pub mod batch;
pub mod interfaces;
pub mod savefile;
pub mod source;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, trace, warn};

use crate::config::CaptureConfig;
use crate::dissect::{dissect, PacketRecord};
use crate::error::CaptureError;
use batch::Batcher;
use source::{PacketSource, SourceRead};

pub use interfaces::{list_interfaces, InterfaceInfo};
pub use savefile::save_pcap;

/// Sleep between checks while paused.
const PAUSE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// What the worker hands to its consumer.
#[derive(Debug)]
pub enum CaptureEvent {
    Batch(Vec<PacketRecord>),
    /// The source reached end of file.
    Finished,
    /// A read failed mid-run; the worker has exited.
    Failed(String),
}

#[derive(Debug, Clone, Copy)]
pub struct BatchPolicy {
    pub size: usize,
    pub interval: Option<Duration>,
}

impl From<&CaptureConfig> for BatchPolicy {
    fn from(config: &CaptureConfig) -> Self {
        Self { size: config.batch_size(), interval: config.batch_interval() }
    }
}

pub struct CaptureEngine {
    state: Arc<Mutex<CaptureState>>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    interrupt: Option<pcap::BreakLoop>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CaptureEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CaptureState::Idle)),
            running: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            interrupt: None,
            handle: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        *self.state.lock().unwrap()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Opens the configured source and starts the worker. Open and filter
    /// failures are returned here, before any thread is spawned. A run that
    /// is already active is stopped first.
    pub fn start(&mut self, config: &CaptureConfig, tx: SyncSender<CaptureEvent>) -> Result<(), CaptureError> {
        if self.state() != CaptureState::Idle {
            self.stop();
        }
        let opened = source::open(config)?;
        info!(source = %config.source.name(), filter = ?config.bpf_filter, "capture starting");
        self.spawn(opened.source, opened.interrupt, BatchPolicy::from(config), tx);
        Ok(())
    }

    /// Starts the worker over an already opened source.
    pub fn start_with_source(
        &mut self,
        source: Box<dyn PacketSource>,
        policy: BatchPolicy,
        tx: SyncSender<CaptureEvent>,
    ) {
        if self.state() != CaptureState::Idle {
            self.stop();
        }
        self.spawn(source, None, policy, tx);
    }

    fn spawn(
        &mut self,
        source: Box<dyn PacketSource>,
        interrupt: Option<pcap::BreakLoop>,
        policy: BatchPolicy,
        tx: SyncSender<CaptureEvent>,
    ) {
        self.running.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        *self.state.lock().unwrap() = CaptureState::Running;
        self.interrupt = interrupt;

        let worker = Worker {
            source,
            policy,
            tx,
            running: Arc::clone(&self.running),
            paused: Arc::clone(&self.paused),
        };
        let state = Arc::clone(&self.state);
        let running = Arc::clone(&self.running);
        self.handle = Some(thread::spawn(move || {
            worker.run();
            running.store(false, Ordering::SeqCst);
            *state.lock().unwrap() = CaptureState::Stopped;
        }));
    }

    pub fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == CaptureState::Running {
            self.paused.store(true, Ordering::SeqCst);
            *state = CaptureState::Paused;
            debug!("capture paused");
        }
    }

    pub fn resume(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == CaptureState::Paused {
            self.paused.store(false, Ordering::SeqCst);
            *state = CaptureState::Running;
            debug!("capture resumed");
        }
    }

    /// Signals the worker, breaks any blocking read and waits for the worker
    /// to exit. No batch is sent after this returns.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        if let Some(interrupt) = self.interrupt.take() {
            interrupt.breakloop();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("capture worker panicked");
            }
        }
        let mut state = self.state.lock().unwrap();
        if *state != CaptureState::Idle {
            *state = CaptureState::Stopped;
        }
    }
}

impl Default for CaptureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

enum Exit {
    Stopped,
    Finished,
    Failed(String),
    Disconnected,
}

struct Worker {
    source: Box<dyn PacketSource>,
    policy: BatchPolicy,
    tx: SyncSender<CaptureEvent>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl Worker {
    fn run(mut self) {
        let mut batcher = Batcher::new(self.policy.size, self.policy.interval, Instant::now());
        let mut number: u64 = 0;

        let exit = loop {
            if !self.running.load(Ordering::Relaxed) {
                break Exit::Stopped;
            }
            if self.paused.load(Ordering::Relaxed) {
                thread::sleep(PAUSE_POLL);
                continue;
            }
            match self.source.next_frame() {
                Ok(SourceRead::Frame(raw)) => {
                    number += 1;
                    batcher.push(dissect(number, &raw.to_frame()));
                }
                Ok(SourceRead::Timeout) => {}
                Ok(SourceRead::Exhausted) => {
                    break if self.running.load(Ordering::Relaxed) { Exit::Finished } else { Exit::Stopped };
                }
                Err(e) => break Exit::Failed(e.to_string()),
            }
            let now = Instant::now();
            if batcher.is_due(now) {
                let batch = batcher.take(now);
                trace!(packets = batch.len(), "flushing batch");
                if self.tx.send(CaptureEvent::Batch(batch)).is_err() {
                    break Exit::Disconnected;
                }
            }
        };

        if !batcher.is_empty() {
            let _ = self.tx.send(CaptureEvent::Batch(batcher.take(Instant::now())));
        }
        match exit {
            Exit::Finished => {
                info!(packets = number, "capture source exhausted");
                let _ = self.tx.send(CaptureEvent::Finished);
            }
            Exit::Failed(reason) => {
                error!(%reason, "capture worker stopped on read error");
                let _ = self.tx.send(CaptureEvent::Failed(reason));
            }
            Exit::Disconnected => warn!("capture consumer went away"),
            Exit::Stopped => debug!(packets = number, "capture worker stopped"),
        }
    }
}
