//! Layered frame dissection.
//!
//! [`dissect`] runs the cascade Ethernet → VLAN → IPv4/IPv6/ARP →
//! TCP/UDP/ICMP → application heuristics over one captured frame. Each stage
//! consumes a prefix through a bounds-checked [`cursor::Cursor`]; a stage that
//! runs out of bytes marks the record malformed and stops the cascade while
//! the layers decoded so far stay on the record.

pub mod application;
pub mod cursor;
pub mod dns;
pub mod format;
pub mod link;
pub mod network;
pub mod packet;
pub mod quic;
pub mod transport;

use chrono::{DateTime, Utc};

use application::Carrier;
use cursor::Cursor;

pub use packet::*;

/// Stacked tags read before giving up on a frame (QinQ uses two).
const MAX_VLAN_TAGS: usize = 4;

/// One frame as handed over by a packet source.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub timestamp: DateTime<Utc>,
    pub data: &'a [u8],
    pub wire_length: u32,
}

/// Dissects `frame` into a record numbered `number`. Never panics on short
/// or hostile input.
pub fn dissect(number: u64, frame: &Frame<'_>) -> PacketRecord {
    let mut record = PacketRecord::new(number, frame.timestamp, frame.data, frame.wire_length);
    record.details.push(format!(
        "Frame {}: {} bytes on wire, {} bytes captured",
        number, frame.wire_length, record.cap_length
    ));
    let mut cursor = Cursor::new(frame.data);
    if let Err(malformed) = dissect_layers(&mut record, &mut cursor) {
        tracing::trace!(number, %malformed, "malformed frame");
        record.details.push(format!("[Malformed Packet: {}]", malformed));
        record.malformed = Some(malformed);
    }
    record
}

fn dissect_layers(record: &mut PacketRecord, cursor: &mut Cursor<'_>) -> Result<(), Malformed> {
    let eth = link::parse_ethernet(cursor)?;
    link::describe_ethernet(&eth, &mut record.details);
    let mut ether_type = eth.ether_type;
    record.ethernet = Some(eth);
    record.consumed = cursor.position();

    // The outermost tag is the one kept on the record.
    let mut tags = 0;
    while link::is_vlan_tpid(ether_type) && tags < MAX_VLAN_TAGS {
        let tag = link::parse_vlan(ether_type, cursor)?;
        link::describe_vlan(&tag, &mut record.details);
        ether_type = tag.ether_type;
        record.vlan.get_or_insert(tag);
        record.consumed = cursor.position();
        tags += 1;
    }

    let protocol = match ether_type {
        ETHERTYPE_IPV4 => {
            let ip = network::parse_ipv4(cursor)?;
            network::describe_ipv4(&ip, &mut record.details);
            let protocol = ip.protocol;
            record.network = Some(NetworkLayer::Ipv4(ip));
            protocol
        }
        ETHERTYPE_IPV6 => {
            let ip = network::parse_ipv6(cursor)?;
            network::describe_ipv6(&ip, &mut record.details);
            let protocol = ip.next_header;
            record.network = Some(NetworkLayer::Ipv6(ip));
            protocol
        }
        ETHERTYPE_ARP => {
            if let Some(arp) = network::parse_arp(cursor)? {
                network::describe_arp(&arp, &mut record.details);
                record.network = Some(NetworkLayer::Arp(arp));
                record.consumed = cursor.position();
            }
            return Ok(());
        }
        _ => return Ok(()),
    };
    record.consumed = cursor.position();

    let (transport, carrier) = match protocol {
        IPPROTO_TCP => (TransportLayer::Tcp(transport::parse_tcp(cursor)?), Some(Carrier::Tcp)),
        IPPROTO_UDP => (TransportLayer::Udp(transport::parse_udp(cursor)?), Some(Carrier::Udp)),
        IPPROTO_ICMP => (TransportLayer::Icmp(transport::parse_icmp(cursor, IcmpVersion::V4)?), None),
        IPPROTO_ICMPV6 => (TransportLayer::Icmp(transport::parse_icmp(cursor, IcmpVersion::V6)?), None),
        _ => return Ok(()),
    };
    record.consumed = cursor.position();
    let payload = cursor.rest();
    match &transport {
        TransportLayer::Tcp(tcp) => transport::describe_tcp(tcp, payload.len(), &mut record.details),
        TransportLayer::Udp(udp) => transport::describe_udp(udp, &mut record.details),
        TransportLayer::Icmp(icmp) => transport::describe_icmp(icmp, &mut record.details),
    }

    if let (Some(carrier), Some((src, dst))) = (carrier, transport.ports()) {
        if let Some(app) = application::dissect_application(carrier, src, dst, payload) {
            application::describe_application(&app, &mut record.details);
            record.app = Some(app);
        }
    }
    record.transport = Some(transport);
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Synthetic frame builders shared by the crate's tests.

    use chrono::{TimeZone, Utc};

    use super::{dissect, Frame, PacketRecord};

    pub const MAC_A: [u8; 6] = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
    pub const MAC_B: [u8; 6] = [0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb];

    pub fn ethernet(ether_type: u16) -> Vec<u8> {
        let mut f = MAC_B.to_vec();
        f.extend_from_slice(&MAC_A);
        f.extend_from_slice(&ether_type.to_be_bytes());
        f
    }

    pub fn ipv4(protocol: u8, src: [u8; 4], dst: [u8; 4], payload_len: usize) -> Vec<u8> {
        let mut h = vec![0x45, 0, 0, 0, 0x12, 0x34, 0x40, 0x00, 64, protocol, 0, 0];
        let total = (20 + payload_len) as u16;
        h[2..4].copy_from_slice(&total.to_be_bytes());
        h.extend_from_slice(&src);
        h.extend_from_slice(&dst);
        h
    }

    pub fn ipv6(next: u8, src_last: u8, dst_last: u8, payload_len: usize) -> Vec<u8> {
        let mut h = vec![0x60, 0, 0, 0];
        h.extend_from_slice(&(payload_len as u16).to_be_bytes());
        h.push(next);
        h.push(64);
        let mut src = [0u8; 16];
        src[0] = 0xfe;
        src[1] = 0x80;
        src[15] = src_last;
        let mut dst = src;
        dst[15] = dst_last;
        h.extend_from_slice(&src);
        h.extend_from_slice(&dst);
        h
    }

    pub fn tcp(src_port: u16, dst_port: u16, flags: u8) -> Vec<u8> {
        let mut h = vec![0u8; 20];
        h[0..2].copy_from_slice(&src_port.to_be_bytes());
        h[2..4].copy_from_slice(&dst_port.to_be_bytes());
        h[4..8].copy_from_slice(&100u32.to_be_bytes());
        h[12] = 0x50;
        h[13] = flags;
        h[14..16].copy_from_slice(&8192u16.to_be_bytes());
        h
    }

    pub fn udp(src_port: u16, dst_port: u16, payload_len: usize) -> Vec<u8> {
        let mut h = Vec::with_capacity(8);
        h.extend_from_slice(&src_port.to_be_bytes());
        h.extend_from_slice(&dst_port.to_be_bytes());
        h.extend_from_slice(&((8 + payload_len) as u16).to_be_bytes());
        h.extend_from_slice(&[0, 0]);
        h
    }

    /// Ethernet + IPv4 + TCP frame between 10.0.0.1 and 10.0.0.2.
    pub fn tcp_frame(src_port: u16, dst_port: u16, flags: u8, payload: &[u8]) -> Vec<u8> {
        let (src, dst) = if src_port >= dst_port {
            ([10, 0, 0, 1], [10, 0, 0, 2])
        } else {
            ([10, 0, 0, 2], [10, 0, 0, 1])
        };
        let mut f = ethernet(0x0800);
        f.extend(ipv4(6, src, dst, 20 + payload.len()));
        f.extend(tcp(src_port, dst_port, flags));
        f.extend_from_slice(payload);
        f
    }

    /// Ethernet + IPv4 + UDP frame; addresses follow the same client/server
    /// convention as [`tcp_frame`].
    pub fn udp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let (src, dst) = if src_port >= dst_port {
            ([10, 0, 0, 1], [10, 0, 0, 2])
        } else {
            ([10, 0, 0, 2], [10, 0, 0, 1])
        };
        let mut f = ethernet(0x0800);
        f.extend(ipv4(17, src, dst, 8 + payload.len()));
        f.extend(udp(src_port, dst_port, payload.len()));
        f.extend_from_slice(payload);
        f
    }

    pub fn record(number: u64, data: &[u8]) -> PacketRecord {
        let timestamp = Utc.timestamp_opt(1_700_000_000 + number as i64, 0).unwrap();
        dissect(number, &Frame { timestamp, data, wire_length: data.len() as u32 })
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;

    #[test]
    fn test_tcp_offsets() {
        let data = tcp_frame(51000, 80, 0x18, b"hello");
        let pkt = record(1, &data);
        assert!(!pkt.is_malformed());
        assert_eq!(pkt.consumed, 14 + 20 + 20);
        assert_eq!(pkt.payload(), b"hello");
        assert_eq!(pkt.protocol_label(), "TCP");
        assert_eq!(pkt.source(), "10.0.0.1");
        assert_eq!(pkt.ports(), Some((51000, 80)));
    }

    #[test]
    fn test_vlan_ipv4_tcp_offsets_with_options() {
        let mut data = ethernet(0x8100);
        data.extend_from_slice(&[0x00, 0x64, 0x08, 0x00]);
        let mut ip = ipv4(6, [192, 168, 0, 1], [192, 168, 0, 2], 32);
        ip[0] = 0x46;
        ip.extend_from_slice(&[1, 1, 1, 0]);
        data.extend(ip);
        let mut tcp_hdr = tcp(40000, 22, 0x10);
        tcp_hdr[12] = 0x80;
        tcp_hdr.extend_from_slice(&[1, 1, 8, 10, 0, 0, 0, 5, 0, 0, 0, 6]);
        data.extend(tcp_hdr);

        let pkt = record(1, &data);
        assert!(!pkt.is_malformed());
        assert_eq!(pkt.vlan.map(|v| v.vlan_id()), Some(100));
        assert_eq!(pkt.consumed, 14 + 4 + 6 * 4 + 8 * 4);
        assert!(pkt.consumed <= pkt.cap_length as usize);
        let ts = pkt.tcp().unwrap().timestamp.unwrap();
        assert_eq!((ts.value, ts.echo_reply), (5, 6));
    }

    #[test]
    fn test_qinq_ipv4_udp_offsets() {
        let mut data = ethernet(0x88a8);
        data.extend_from_slice(&[0x00, 0x64, 0x81, 0x00]);
        data.extend_from_slice(&[0x00, 0x0a, 0x08, 0x00]);
        data.extend(ipv4(17, [10, 1, 0, 1], [10, 1, 0, 2], 8 + 3));
        data.extend(udp(40000, 9999, 3));
        data.extend_from_slice(b"abc");

        let pkt = record(1, &data);
        assert!(!pkt.is_malformed());
        let outer = pkt.vlan.unwrap();
        assert_eq!((outer.tpid, outer.vlan_id()), (0x88a8, 100));
        assert_eq!(pkt.details.iter().filter(|l| l.starts_with("802.1Q")).count(), 2);
        assert!(pkt.ipv4().is_some());
        assert_eq!(pkt.protocol_label(), "UDP");
        assert_eq!(pkt.ports(), Some((40000, 9999)));
        assert_eq!(pkt.consumed, 14 + 4 + 4 + 20 + 8);
        assert_eq!(pkt.payload(), b"abc");
    }

    #[test]
    fn test_ipv6_udp_dns() {
        let mut dns = vec![0xab, 0xcd, 0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        dns.extend_from_slice(&[3, b'f', b'o', b'o', 0, 0x00, 0x1c, 0x00, 0x01]);
        let mut data = ethernet(0x86dd);
        data.extend(ipv6(17, 1, 2, 8 + dns.len()));
        data.extend(udp(5555, 53, dns.len()));
        data.extend_from_slice(&dns);

        let pkt = record(3, &data);
        assert_eq!(pkt.ipv6().unwrap().next_header, 17);
        assert_eq!(pkt.protocol_label(), "DNS");
        assert_eq!(pkt.info(), "Standard query 0xabcd AAAA foo");
        assert_eq!(pkt.source(), "fe80::1");
    }

    #[test]
    fn test_ipv6_hop_by_hop_icmpv6() {
        let mut data = ethernet(0x86dd);
        data.extend(ipv6(0, 1, 2, 16));
        data.extend_from_slice(&[58, 0, 5, 2, 0, 0, 1, 0]);
        data.extend_from_slice(&[128, 0, 0, 0, 0, 7, 0, 1]);
        let pkt = record(1, &data);
        let ip = pkt.ipv6().unwrap();
        assert_eq!(ip.next_header, 58);
        assert_eq!(ip.extensions, vec![0]);
        assert_eq!(pkt.protocol_label(), "ICMPv6");
        assert_eq!(pkt.info(), "Echo Request, id=7, seq=1");
        assert_eq!(pkt.consumed, 14 + 40 + 8 + 8);
    }

    #[test]
    fn test_arp_frame() {
        let mut data = ethernet(0x0806);
        data.extend_from_slice(&[0x00, 0x01, 0x08, 0x00, 6, 4, 0x00, 0x01]);
        data.extend_from_slice(&MAC_A);
        data.extend_from_slice(&[192, 168, 1, 1]);
        data.extend_from_slice(&[0u8; 6]);
        data.extend_from_slice(&[192, 168, 1, 2]);
        let pkt = record(1, &data);
        assert_eq!(pkt.protocol_label(), "ARP");
        assert_eq!(pkt.info(), "Who has 192.168.1.2? Tell 192.168.1.1");
        assert!(pkt.transport.is_none());
    }

    #[test]
    fn test_unknown_ether_type_is_valid() {
        let mut data = ethernet(0x88cc);
        data.extend_from_slice(&[0u8; 30]);
        let pkt = record(1, &data);
        assert!(!pkt.is_malformed());
        assert!(pkt.network.is_none());
        assert_eq!(pkt.protocol_label(), "Ethernet");
        assert_eq!(pkt.consumed, 14);
    }

    #[test]
    fn test_truncated_tcp_keeps_earlier_layers() {
        let data = tcp_frame(51000, 80, 0x02, b"");
        let cut = &data[..14 + 20 + 10];
        let pkt = record(9, cut);
        assert!(pkt.is_malformed());
        assert_eq!(pkt.malformed.as_ref().map(|m| m.layer), Some("TCP"));
        assert!(pkt.ipv4().is_some());
        assert!(pkt.transport.is_none());
        assert_eq!(pkt.consumed, 34);
        assert_eq!(pkt.data.len(), cut.len());
        assert_eq!(pkt.protocol_label(), "IPv4");
        assert!(pkt.info().ends_with("[Malformed TCP]"));
    }

    #[test]
    fn test_runt_frame() {
        let pkt = record(1, &[0xff; 6]);
        assert!(pkt.is_malformed());
        assert!(pkt.ethernet.is_none());
        assert_eq!(pkt.consumed, 0);
    }

    #[test]
    fn test_quic_short_header_is_udp_until_tracked() {
        let data = udp_frame(51000, 443, &[0x40, 1, 2, 3, 4]);
        let pkt = record(1, &data);
        assert_eq!(pkt.protocol_label(), "UDP");
        assert!(pkt.app.as_ref().and_then(|a| a.quic()).is_some());
    }

    #[test]
    fn test_detail_tree_layers() {
        let data = tcp_frame(51000, 80, 0x18, b"GET / HTTP/1.1\r\nHost: a\r\n\r\n");
        let pkt = record(1, &data);
        let titles: Vec<&String> = pkt.details.iter().filter(|l| !l.starts_with(' ')).collect();
        assert_eq!(titles.len(), 5);
        assert!(titles[0].starts_with("Frame 1:"));
        assert!(titles[1].starts_with("Ethernet II"));
        assert!(titles[2].starts_with("Internet Protocol Version 4"));
        assert!(titles[3].starts_with("Transmission Control Protocol"));
        assert_eq!(titles[4], "Hypertext Transfer Protocol");
    }

    #[test]
    fn test_adversarial_input_does_not_panic() {
        let base = tcp_frame(51000, 443, 0x18, &[22, 3, 1, 0, 200, 1, 0, 0, 196, 3, 3]);
        for len in 0..base.len() {
            let _ = record(1, &base[..len]);
        }
        let mut noisy = ethernet(0x86dd);
        noisy.extend(std::iter::repeat(0x60).take(80));
        let _ = record(2, &noisy);
    }
}
