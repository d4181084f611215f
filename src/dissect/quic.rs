use super::cursor::read_u32;
use super::format::push_section;
use super::packet::{QuicHeader, QuicLongType};

pub const SHORT_HEADER_INFO: &str = "Protected Payload (Short Header)";

/// Classifies a UDP/443 payload by its first byte.
///
/// Long headers need the version and DCID length to be present. A zero
/// version is Version Negotiation and is not treated as QUIC.
pub fn parse_quic(payload: &[u8]) -> Option<QuicHeader> {
    let first = *payload.first()?;
    if first & 0x80 != 0 {
        let version = read_u32(payload, 1)?;
        if version == 0 {
            return None;
        }
        let dcid_len = *payload.get(5)?;
        let scid_len = payload.get(6 + dcid_len as usize).copied();
        Some(QuicHeader::Long {
            packet_type: QuicLongType::from_bits(first >> 4),
            version,
            dcid_len,
            scid_len,
        })
    } else if first & 0xc0 == 0x40 {
        Some(QuicHeader::Short)
    } else {
        None
    }
}

pub fn quic_info(header: &QuicHeader) -> String {
    match header {
        QuicHeader::Long { packet_type, version, dcid_len, scid_len } => {
            let mut info = format!("{}, Version 0x{:08x}, DCID len={}", packet_type.as_str(), version, dcid_len);
            if let Some(scid) = scid_len {
                info.push_str(&format!(", SCID len={}", scid));
            }
            info
        }
        QuicHeader::Short => SHORT_HEADER_INFO.to_string(),
    }
}

pub fn describe_quic(header: &QuicHeader, details: &mut Vec<String>) {
    match header {
        QuicHeader::Long { packet_type, version, dcid_len, scid_len } => push_section(
            details,
            "QUIC IETF",
            [
                "Header Form: Long Header (1)".to_string(),
                format!("Packet Type: {}", packet_type.as_str()),
                format!("Version: 0x{:08x}", version),
                format!("Destination Connection ID Length: {}", dcid_len),
                match scid_len {
                    Some(len) => format!("Source Connection ID Length: {}", len),
                    None => "Source Connection ID Length: (truncated)".to_string(),
                },
            ],
        ),
        QuicHeader::Short => push_section(
            details,
            "QUIC IETF",
            ["Header Form: Short Header (0)".to_string(), SHORT_HEADER_INFO.to_string()],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_header_initial() {
        let mut p = vec![0xc3, 0, 0, 0, 1, 8];
        p.extend_from_slice(&[0xaa; 8]);
        p.push(0);
        let h = parse_quic(&p).unwrap();
        assert_eq!(
            h,
            QuicHeader::Long { packet_type: QuicLongType::Initial, version: 1, dcid_len: 8, scid_len: Some(0) }
        );
        assert_eq!(quic_info(&h), "Initial, Version 0x00000001, DCID len=8, SCID len=0");
    }

    #[test]
    fn test_long_header_handshake_type() {
        let p = [0xe0, 0, 0, 0, 1, 0, 0];
        match parse_quic(&p).unwrap() {
            QuicHeader::Long { packet_type, .. } => assert_eq!(packet_type, QuicLongType::Handshake),
            QuicHeader::Short => panic!("expected long header"),
        }
    }

    #[test]
    fn test_version_negotiation_is_not_quic() {
        let p = [0x80, 0, 0, 0, 0, 8, 1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(parse_quic(&p), None);
    }

    #[test]
    fn test_short_header() {
        assert_eq!(parse_quic(&[0x41, 1, 2, 3]), Some(QuicHeader::Short));
    }

    #[test]
    fn test_fixed_bit_clear_is_not_quic() {
        assert_eq!(parse_quic(&[0x01, 2, 3]), None);
        assert_eq!(parse_quic(&[]), None);
    }

    #[test]
    fn test_long_header_too_short() {
        assert_eq!(parse_quic(&[0xc0, 0, 0]), None);
    }
}
