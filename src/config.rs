use std::path::PathBuf;
use std::time::Duration;

/// Live capture batch threshold.
pub const LIVE_BATCH_SIZE: usize = 200;
/// Offline capture batch threshold.
pub const FILE_BATCH_SIZE: usize = 1000;

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    Live { interface: String },
    File { path: PathBuf },
}

impl CaptureSource {
    pub fn is_live(&self) -> bool {
        matches!(self, CaptureSource::Live { .. })
    }

    pub fn name(&self) -> String {
        match self {
            CaptureSource::Live { interface } => interface.clone(),
            CaptureSource::File { path } => path.display().to_string(),
        }
    }
}

/// Configuration for one capture run
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub source: CaptureSource,

    /// BPF expression applied by libpcap before dissection
    pub bpf_filter: Option<String>,

    /// Bytes kept per frame
    pub snaplen: i32,

    pub promiscuous: bool,

    /// Bounded read timeout; also the worst-case pause/stop latency
    pub read_timeout: Duration,

    /// Live batch flush threshold
    pub live_batch_size: usize,

    /// Offline batch flush threshold
    pub file_batch_size: usize,

    /// Live batches are flushed at least this often
    pub flush_interval: Duration,

    /// Bounded depth of the worker → consumer channel, in batches
    pub channel_depth: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: CaptureSource::Live { interface: String::new() },
            bpf_filter: None,
            snaplen: 65535,
            promiscuous: true,
            read_timeout: Duration::from_millis(250),
            live_batch_size: LIVE_BATCH_SIZE,
            file_batch_size: FILE_BATCH_SIZE,
            flush_interval: Duration::from_millis(100),
            channel_depth: 64,
        }
    }
}

impl CaptureConfig {
    pub fn live(interface: impl Into<String>) -> Self {
        Self { source: CaptureSource::Live { interface: interface.into() }, ..Self::default() }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { source: CaptureSource::File { path: path.into() }, ..Self::default() }
    }

    pub fn with_bpf_filter(mut self, filter: Option<String>) -> Self {
        self.bpf_filter = filter.filter(|f| !f.trim().is_empty());
        self
    }

    /// Batch threshold for the configured source.
    pub fn batch_size(&self) -> usize {
        if self.source.is_live() { self.live_batch_size } else { self.file_batch_size }
    }

    /// Offline reads batch by size only.
    pub fn batch_interval(&self) -> Option<Duration> {
        self.source.is_live().then_some(self.flush_interval)
    }
}
