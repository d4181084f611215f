use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::dissect::PacketRecord;
use crate::error::CaptureError;

pub const PCAP_MAGIC: u32 = 0xa1b2c3d4;
/// Snaplen written when every record fits under it.
pub const PCAP_SNAPLEN: u32 = 65535;
pub const LINKTYPE_ETHERNET: u32 = 1;

/// Writes `records` as a classic little-endian pcap file (v2.4, Ethernet).
/// Returns the number of records written.
pub fn save_pcap(path: &Path, records: &[PacketRecord]) -> Result<usize, CaptureError> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    let count = write_pcap(&mut out, records)?;
    out.flush()?;
    Ok(count)
}

pub fn write_pcap<W: Write>(out: &mut W, records: &[PacketRecord]) -> Result<usize, CaptureError> {
    let snaplen = records.iter().map(|p| p.data.len() as u32).fold(PCAP_SNAPLEN, u32::max);
    let mut global = Vec::with_capacity(24);
    global.extend_from_slice(&PCAP_MAGIC.to_le_bytes());
    global.extend_from_slice(&2u16.to_le_bytes());
    global.extend_from_slice(&4u16.to_le_bytes());
    global.extend_from_slice(&0i32.to_le_bytes()); // thiszone
    global.extend_from_slice(&0u32.to_le_bytes()); // sigfigs
    global.extend_from_slice(&snaplen.to_le_bytes());
    global.extend_from_slice(&LINKTYPE_ETHERNET.to_le_bytes());
    out.write_all(&global)?;

    for pkt in records {
        let mut header = [0u8; 16];
        header[0..4].copy_from_slice(&(pkt.timestamp.timestamp() as u32).to_le_bytes());
        header[4..8].copy_from_slice(&pkt.timestamp.timestamp_subsec_micros().to_le_bytes());
        header[8..12].copy_from_slice(&(pkt.data.len() as u32).to_le_bytes());
        header[12..16].copy_from_slice(&pkt.wire_length.to_le_bytes());
        out.write_all(&header)?;
        out.write_all(&pkt.data)?;
    }
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::source::{self, SourceRead};
    use crate::config::CaptureConfig;
    use crate::dissect::testutil::{record, tcp_frame, udp_frame};
    use crate::dissect::dissect;

    #[test]
    fn test_global_header_bytes() {
        let mut buf = Vec::new();
        assert_eq!(write_pcap(&mut buf, &[]).unwrap(), 0);
        assert_eq!(
            buf,
            vec![
                0xd4, 0xc3, 0xb2, 0xa1, 0x02, 0x00, 0x04, 0x00, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 0x00, 0x00,
                0x01, 0x00, 0x00, 0x00,
            ]
        );
    }

    #[test]
    fn test_record_header_uses_cap_and_wire_lengths() {
        let data = udp_frame(5000, 53, b"abc");
        let mut pkt = record(1, &data);
        pkt.wire_length = 1514;
        let mut buf = Vec::new();
        write_pcap(&mut buf, &[pkt.clone()]).unwrap();
        let rec = &buf[24..];
        assert_eq!(u32::from_le_bytes(rec[0..4].try_into().unwrap()), pkt.timestamp.timestamp() as u32);
        assert_eq!(u32::from_le_bytes(rec[8..12].try_into().unwrap()), data.len() as u32);
        assert_eq!(u32::from_le_bytes(rec[12..16].try_into().unwrap()), 1514);
        assert_eq!(&rec[16..], &data[..]);
    }

    #[test]
    fn test_snaplen_covers_jumbo_records() {
        let mut data = udp_frame(5000, 9999, &[]);
        data.resize(70_000, 0xaa);
        let pkt = record(1, &data);
        let mut buf = Vec::new();
        write_pcap(&mut buf, &[pkt]).unwrap();
        assert_eq!(u32::from_le_bytes(buf[16..20].try_into().unwrap()), 70_000);
    }

    #[test]
    fn test_save_and_reopen_is_lossless() {
        let frames = vec![
            tcp_frame(51000, 80, 0x02, b""),
            udp_frame(40000, 53, &[0x12, 0x34, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 1]),
            tcp_frame(51000, 80, 0x18, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")[..40].to_vec(),
        ];
        let mut originals: Vec<PacketRecord> =
            frames.iter().enumerate().map(|(i, f)| record(i as u64 + 1, f)).collect();
        originals[2].wire_length = 200;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.pcap");
        assert_eq!(save_pcap(&path, &originals).unwrap(), 3);

        let mut opened = source::open(&CaptureConfig::file(&path)).unwrap();
        let mut reread = Vec::new();
        loop {
            match opened.source.next_frame().unwrap() {
                SourceRead::Frame(raw) => {
                    let n = reread.len() as u64 + 1;
                    reread.push(dissect(n, &raw.to_frame()));
                }
                SourceRead::Exhausted => break,
                SourceRead::Timeout => continue,
            }
        }

        assert_eq!(reread.len(), originals.len());
        for (a, b) in originals.iter().zip(&reread) {
            assert_eq!(a.cap_length, b.cap_length);
            assert_eq!(a.wire_length, b.wire_length);
            assert_eq!(&a.data[..], &b.data[..]);
            assert_eq!(a.timestamp, b.timestamp);
            assert_eq!(a.protocol_label(), b.protocol_label());
        }
        assert!(reread[2].is_malformed());
    }
}
