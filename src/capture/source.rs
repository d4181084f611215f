use chrono::{DateTime, Utc};
use pcap::{Activated, Capture, Linktype};
use tracing::{debug, warn};

use super::interfaces::resolve_device_name;
use crate::config::{CaptureConfig, CaptureSource};
use crate::dissect::Frame;
use crate::error::CaptureError;

/// One frame as read from a source, with its pcap record header fields.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    pub ts_sec: i64,
    pub ts_usec: i64,
    pub wire_length: u32,
    pub data: &'a [u8],
}

impl<'a> RawFrame<'a> {
    pub fn timestamp(&self) -> DateTime<Utc> {
        let nanos = (self.ts_usec.clamp(0, 999_999) * 1000) as u32;
        DateTime::<Utc>::from_timestamp(self.ts_sec, nanos).unwrap_or_default()
    }

    pub fn to_frame(&self) -> Frame<'a> {
        Frame { timestamp: self.timestamp(), data: self.data, wire_length: self.wire_length }
    }
}

#[derive(Debug)]
pub enum SourceRead<'a> {
    Frame(RawFrame<'a>),
    /// Bounded read expired with nothing to deliver.
    Timeout,
    /// End of file, or the read was broken off.
    Exhausted,
}

/// A live or offline origin of frames, driven by the capture worker.
pub trait PacketSource: Send {
    fn next_frame(&mut self) -> Result<SourceRead<'_>, CaptureError>;
}

/// A libpcap handle, live or offline.
pub struct PcapSource<T: Activated> {
    cap: Capture<T>,
}

impl<T: Activated> PacketSource for PcapSource<T>
where
    Capture<T>: Send,
{
    fn next_frame(&mut self) -> Result<SourceRead<'_>, CaptureError> {
        match self.cap.next_packet() {
            Ok(packet) => Ok(SourceRead::Frame(RawFrame {
                ts_sec: packet.header.ts.tv_sec as i64,
                ts_usec: packet.header.ts.tv_usec as i64,
                wire_length: packet.header.len,
                data: packet.data,
            })),
            Err(pcap::Error::TimeoutExpired) => Ok(SourceRead::Timeout),
            Err(pcap::Error::NoMorePackets) => Ok(SourceRead::Exhausted),
            Err(e) => Err(CaptureError::Read(e.to_string())),
        }
    }
}

/// An opened source plus the handle that unblocks its pending read.
pub struct OpenedSource {
    pub source: Box<dyn PacketSource>,
    pub interrupt: Option<pcap::BreakLoop>,
}

/// Opens the configured source and applies the capture-time filter.
pub fn open(config: &CaptureConfig) -> Result<OpenedSource, CaptureError> {
    match &config.source {
        CaptureSource::Live { interface } => {
            let cap = open_live(interface, config)?;
            let mut cap = apply_filter(cap, config.bpf_filter.as_deref())?;
            let interrupt = cap.breakloop_handle();
            Ok(OpenedSource { source: Box::new(PcapSource { cap }), interrupt: Some(interrupt) })
        }
        CaptureSource::File { path } => {
            let cap = Capture::from_file(path).map_err(|e| CaptureError::SourceOpen {
                source_name: path.display().to_string(),
                reason: e.to_string(),
            })?;
            let mut cap = apply_filter(cap, config.bpf_filter.as_deref())?;
            check_link_type(cap.get_datalink());
            let interrupt = cap.breakloop_handle();
            Ok(OpenedSource { source: Box::new(PcapSource { cap }), interrupt: Some(interrupt) })
        }
    }
}

fn open_live(interface: &str, config: &CaptureConfig) -> Result<Capture<pcap::Active>, CaptureError> {
    let device = resolve_device_name(interface);
    let timeout_ms = config.read_timeout.as_millis().min(i32::MAX as u128) as i32;
    let attempt = |promisc: bool| {
        Capture::from_device(device.as_str())
            .and_then(|c| c.promisc(promisc).snaplen(config.snaplen).timeout(timeout_ms).open())
    };

    // Some interfaces (loopback on macOS) refuse promiscuous mode.
    let cap = attempt(config.promiscuous).or_else(|e| {
        if config.promiscuous {
            warn!(interface = %device, error = %e, "promiscuous open failed, retrying without");
            attempt(false)
        } else {
            Err(e)
        }
    });

    let cap = cap.map_err(|e| {
        let reason = if e.to_string().contains("Permission denied") {
            "permission denied (capture needs elevated privileges)".to_string()
        } else {
            e.to_string()
        };
        CaptureError::SourceOpen { source_name: device.clone(), reason }
    })?;
    check_link_type(cap.get_datalink());
    debug!(interface = %device, snaplen = config.snaplen, timeout_ms, "live capture opened");
    Ok(cap)
}

/// On failure the handle is dropped, closing it, before the error is returned.
fn apply_filter<T: Activated>(mut cap: Capture<T>, filter: Option<&str>) -> Result<Capture<T>, CaptureError> {
    let Some(filter) = filter else { return Ok(cap) };
    if let Err(e) = cap.filter(filter, true) {
        drop(cap);
        return Err(CaptureError::FilterCompile { filter: filter.to_string(), reason: e.to_string() });
    }
    debug!(filter, "capture filter applied");
    Ok(cap)
}

fn check_link_type(link: Linktype) {
    if link != Linktype::ETHERNET {
        warn!(?link, "link type is not Ethernet; frames will likely be reported malformed");
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::save_pcap;
    use crate::dissect::testutil::{record, tcp_frame, udp_frame};

    fn drain(opened: &mut OpenedSource) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        loop {
            match opened.source.next_frame().unwrap() {
                SourceRead::Frame(raw) => frames.push(raw.data.to_vec()),
                SourceRead::Timeout => continue,
                SourceRead::Exhausted => return frames,
            }
        }
    }

    fn mixed_capture(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("mixed.pcap");
        let records = vec![
            record(1, &tcp_frame(51000, 80, 0x02, b"")),
            record(2, &udp_frame(40000, 53, b"query")),
            record(3, &tcp_frame(80, 51000, 0x12, b"")),
            record(4, &udp_frame(40001, 123, b"ntp")),
        ];
        save_pcap(&path, &records).unwrap();
        path
    }

    #[test]
    fn test_raw_frame_timestamp() {
        let raw = RawFrame { ts_sec: 1_700_000_000, ts_usec: 123_456, wire_length: 60, data: &[] };
        let ts = raw.timestamp();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_micros(), 123_456);
    }

    #[test]
    fn test_missing_file_is_source_open_error() {
        let cfg = CaptureConfig::file("/nonexistent/wiresift/none.pcap");
        match open(&cfg) {
            Err(CaptureError::SourceOpen { source_name, .. }) => assert!(source_name.ends_with("none.pcap")),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("open should fail"),
        }
    }

    #[test]
    fn test_bad_capture_filter_is_filter_compile_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CaptureConfig::file(mixed_capture(&dir)).with_bpf_filter(Some("(( not bpf".into()));
        match open(&cfg) {
            Err(CaptureError::FilterCompile { filter, .. }) => assert_eq!(filter, "(( not bpf"),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("open should fail"),
        }
    }

    #[test]
    fn test_capture_filter_drops_frames_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = mixed_capture(&dir);

        let mut all = open(&CaptureConfig::file(&path)).unwrap();
        assert_eq!(drain(&mut all).len(), 4);

        let mut udp_only = open(&CaptureConfig::file(&path).with_bpf_filter(Some("udp".into()))).unwrap();
        let frames = drain(&mut udp_only);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|data| record(1, data).udp().is_some()));
    }
}
