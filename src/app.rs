//! A capture session: the engine, the consumer that tracks, stores and
//! filters batches, and the notification channel to the presentation side.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;

use tracing::{debug, info, warn};

use crate::capture::source::PacketSource;
use crate::capture::{save_pcap, BatchPolicy, CaptureEngine, CaptureEvent, CaptureState};
use crate::config::CaptureConfig;
use crate::conversation::{ConversationTracker, StreamState};
use crate::dissect::PacketRecord;
use crate::error::{CaptureError, FilterError};
use crate::event::CoreEvent;
use crate::filter::DisplayFilter;
use crate::store::PacketStore;

/// Notifications are sent on `events`; the receiving side must keep draining
/// it, since a full channel holds up the consumer and then the capture worker.
/// Store and filter access stay available while it lags.
pub struct Session {
    engine: CaptureEngine,
    consumer: Option<thread::JoinHandle<()>>,
    store: PacketStore,
    tracker: Arc<Mutex<ConversationTracker>>,
    filter: Arc<RwLock<DisplayFilter>>,
    /// Bumped on every filter change so a slow re-filter never overwrites a
    /// newer one.
    generation: Arc<AtomicU64>,
    /// Held while a batch is stored and announced, or while a re-filter reads
    /// and sends, so the two never interleave. No store or filter lock is held
    /// across a send.
    publish: Arc<Mutex<()>>,
    events: SyncSender<CoreEvent>,
}

impl Session {
    pub fn new(events: SyncSender<CoreEvent>) -> Self {
        Self {
            engine: CaptureEngine::new(),
            consumer: None,
            store: PacketStore::new(),
            tracker: Arc::new(Mutex::new(ConversationTracker::new())),
            filter: Arc::new(RwLock::new(DisplayFilter::default())),
            generation: Arc::new(AtomicU64::new(0)),
            publish: Arc::new(Mutex::new(())),
            events,
        }
    }

    /// Starts a fresh capture. Anything still running is stopped and the
    /// previous packets and flows are discarded.
    pub fn start(&mut self, config: &CaptureConfig) -> Result<(), CaptureError> {
        self.clear();
        let (tx, rx) = sync_channel(config.channel_depth.max(1));
        self.engine.start(config, tx)?;
        self.spawn_consumer(rx);
        Ok(())
    }

    /// Like [`Self::start`], over a source that is already open.
    pub fn start_with_source(&mut self, source: Box<dyn PacketSource>, policy: BatchPolicy, channel_depth: usize) {
        self.clear();
        let (tx, rx) = sync_channel(channel_depth.max(1));
        self.engine.start_with_source(source, policy, tx);
        self.spawn_consumer(rx);
    }

    fn spawn_consumer(&mut self, rx: Receiver<CaptureEvent>) {
        let consumer = Consumer {
            rx,
            tracker: Arc::clone(&self.tracker),
            store: self.store.clone(),
            filter: Arc::clone(&self.filter),
            publish: Arc::clone(&self.publish),
            events: self.events.clone(),
        };
        self.consumer = Some(thread::spawn(move || consumer.run()));
    }

    pub fn pause(&self) {
        self.engine.pause();
    }

    pub fn resume(&self) {
        self.engine.resume();
    }

    pub fn state(&self) -> CaptureState {
        self.engine.state()
    }

    /// Stops the worker and waits until every batch it produced has been
    /// tracked and stored.
    pub fn stop(&mut self) {
        self.engine.stop();
        if let Some(handle) = self.consumer.take() {
            if handle.join().is_err() {
                warn!("session consumer panicked");
            }
        }
    }

    /// Stops any capture, drops all packets and flow state and notifies
    /// [`CoreEvent::Cleared`].
    pub fn clear(&mut self) {
        self.stop();
        self.store.clear();
        self.tracker.lock().unwrap().clear();
        let _ = self.events.send(CoreEvent::Cleared);
    }

    /// Compiles and applies a display filter, then re-filters the stored
    /// packets on a worker thread and sends the result as
    /// [`CoreEvent::Filtered`]. A filter that does not compile clears the
    /// active filter and is reported as [`CoreEvent::FilterError`] as well
    /// as returned.
    pub fn apply_filter(&self, text: &str) -> Result<(), FilterError> {
        let result = {
            let mut filter = self.filter.write().unwrap();
            let result = filter.set(text);
            if result.is_err() {
                filter.clear();
            }
            result
        };
        if let Err(e) = &result {
            warn!(filter = text, error = %e, "display filter rejected");
            let _ = self.events.send(CoreEvent::FilterError(e.to_string()));
        } else {
            debug!(filter = text, "display filter applied");
        }

        let expression = self.filter.read().unwrap().expression().cloned();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let store = self.store.clone();
        let publish = Arc::clone(&self.publish);
        let events = self.events.clone();
        thread::spawn(move || {
            let _publishing = publish.lock().unwrap();
            if latest.load(Ordering::SeqCst) != generation {
                return;
            }
            let matching = store.filtered(expression.as_ref());
            let _ = events.send(CoreEvent::Filtered(matching));
        });
        result
    }

    pub fn filter_text(&self) -> String {
        self.filter.read().unwrap().text().to_string()
    }

    /// Synchronous match against the active display filter.
    pub fn matches(&self, pkt: &PacketRecord) -> bool {
        self.filter.read().unwrap().matches(pkt)
    }

    pub fn store(&self) -> &PacketStore {
        &self.store
    }

    /// Stored packet by its 1-based frame number.
    pub fn packet(&self, number: u64) -> Option<PacketRecord> {
        self.store.get(number)
    }

    /// Flow table in stream index order.
    pub fn streams(&self) -> Vec<StreamState> {
        self.tracker.lock().unwrap().streams().to_vec()
    }

    /// Writes every stored packet to `path` as a pcap file.
    pub fn save(&self, path: &Path) -> Result<usize, CaptureError> {
        let packets = self.store.snapshot();
        let written = save_pcap(path, &packets)?;
        info!(path = %path.display(), packets = written, "capture saved");
        Ok(written)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Consumer {
    rx: Receiver<CaptureEvent>,
    tracker: Arc<Mutex<ConversationTracker>>,
    store: PacketStore,
    filter: Arc<RwLock<DisplayFilter>>,
    publish: Arc<Mutex<()>>,
    events: SyncSender<CoreEvent>,
}

impl Consumer {
    /// Runs until the worker drops its sender.
    fn run(self) {
        let mut listening = true;
        for event in self.rx.iter() {
            let sent = match event {
                CaptureEvent::Batch(mut batch) => {
                    self.tracker.lock().unwrap().process_batch(&mut batch);
                    let _publishing = self.publish.lock().unwrap();
                    let matching: Vec<PacketRecord> = {
                        let filter = self.filter.read().unwrap();
                        batch.iter().filter(|p| filter.matches(p)).cloned().collect()
                    };
                    self.store.append(batch);
                    matching.is_empty() || !listening || self.events.send(CoreEvent::Packets(matching)).is_ok()
                }
                CaptureEvent::Finished => self.events.send(CoreEvent::CaptureFinished).is_ok(),
                CaptureEvent::Failed(reason) => self.events.send(CoreEvent::CaptureFailed(reason)).is_ok(),
            };
            if !sent && listening {
                warn!("event receiver dropped; packets are still stored");
                listening = false;
            }
        }
        debug!(packets = self.store.len(), "session consumer finished");
    }
}
