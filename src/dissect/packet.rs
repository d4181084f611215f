use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::format::{format_mac, icmp_type_name, icmpv6_type_name, tcp_flags};

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETHERTYPE_IPV6: u16 = 0x86DD;
pub const ETHERTYPE_VLAN: u16 = 0x8100;
pub const ETHERTYPE_QINQ: u16 = 0x88A8;
pub const ETHERTYPE_VLAN_LEGACY: u16 = 0x9100;

pub const IPPROTO_ICMP: u8 = 1;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;
pub const IPPROTO_ICMPV6: u8 = 58;

// ── Link layer ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_mac(&self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ether_type: u16,
}

/// 802.1Q tag. `ether_type` is the encapsulated type used for layer-3 dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanTag {
    pub tpid: u16,
    pub tci: u16,
    pub ether_type: u16,
}

impl VlanTag {
    pub fn priority(&self) -> u8 {
        (self.tci >> 13) as u8
    }

    pub fn drop_eligible(&self) -> bool {
        self.tci & 0x1000 != 0
    }

    pub fn vlan_id(&self) -> u16 {
        self.tci & 0x0FFF
    }
}

// ── Network layer ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    pub ihl: u8,
    pub tos: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags_fragment: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub options: Vec<u8>,
}

impl Ipv4Header {
    pub fn header_len(&self) -> usize {
        self.ihl as usize * 4
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Header {
    pub traffic_class: u8,
    pub flow_label: u32,
    pub payload_length: u16,
    /// Terminal next-header value after the extension chain was walked.
    pub next_header: u8,
    /// Extension header types in the order they were skipped.
    pub extensions: Vec<u8>,
    pub hop_limit: u8,
    pub src: Ipv6Addr,
    pub dst: Ipv6Addr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpHeader {
    pub hardware_type: u16,
    pub protocol_type: u16,
    pub hardware_size: u8,
    pub protocol_size: u8,
    pub opcode: u16,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkLayer {
    Ipv4(Ipv4Header),
    Ipv6(Ipv6Header),
    Arp(ArpHeader),
}

// ── Transport layer ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpTimestamp {
    pub value: u32,
    pub echo_reply: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub data_offset: u8,
    pub flags: u8,
    pub window: u16,
    pub checksum: u16,
    pub urgent_pointer: u16,
    pub options: Vec<u8>,
    pub timestamp: Option<TcpTimestamp>,
    pub mss: Option<u16>,
    pub window_scale: Option<u8>,
    pub sack_permitted: bool,
}

impl TcpHeader {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;

    pub fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    pub fn header_len(&self) -> usize {
        self.data_offset as usize * 4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub checksum: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpVersion {
    V4,
    V6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpEcho {
    pub identifier: u16,
    pub sequence: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub version: IcmpVersion,
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub echo: Option<IcmpEcho>,
}

impl IcmpHeader {
    pub fn type_name(&self) -> String {
        match self.version {
            IcmpVersion::V4 => icmp_type_name(self.icmp_type, self.code),
            IcmpVersion::V6 => icmpv6_type_name(self.icmp_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportLayer {
    Tcp(TcpHeader),
    Udp(UdpHeader),
    Icmp(IcmpHeader),
}

impl TransportLayer {
    pub fn ports(&self) -> Option<(u16, u16)> {
        match self {
            TransportLayer::Tcp(tcp) => Some((tcp.src_port, tcp.dst_port)),
            TransportLayer::Udp(udp) => Some((udp.src_port, udp.dst_port)),
            TransportLayer::Icmp(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransportLayer::Tcp(_) => "TCP",
            TransportLayer::Udp(_) => "UDP",
            TransportLayer::Icmp(icmp) => match icmp.version {
                IcmpVersion::V4 => "ICMP",
                IcmpVersion::V6 => "ICMPv6",
            },
        }
    }
}

// ── Application layer ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppProtocol {
    Http,
    Dns,
    Mdns,
    Ssdp,
    Tls,
    Quic,
}

impl AppProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppProtocol::Http => "HTTP",
            AppProtocol::Dns => "DNS",
            AppProtocol::Mdns => "MDNS",
            AppProtocol::Ssdp => "SSDP",
            AppProtocol::Tls => "TLS",
            AppProtocol::Quic => "QUIC",
        }
    }
}

impl fmt::Display for AppProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMessage {
    Request {
        method: String,
        path: String,
        version: String,
        host: Option<String>,
    },
    Response {
        version: String,
        status: u16,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsMessage {
    pub id: u16,
    pub is_query: bool,
    pub rcode: u8,
    pub questions: u16,
    pub answers: u16,
    pub name: Option<String>,
    pub qtype: Option<u16>,
    pub qclass: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsdpMessage {
    pub start_line: String,
    pub search_target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsRecord {
    pub content_type: u8,
    pub version: (u8, u8),
    pub handshake_type: Option<u8>,
    pub sni: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuicLongType {
    Initial,
    ZeroRtt,
    Handshake,
    Retry,
}

impl QuicLongType {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => QuicLongType::Initial,
            1 => QuicLongType::ZeroRtt,
            2 => QuicLongType::Handshake,
            _ => QuicLongType::Retry,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuicLongType::Initial => "Initial",
            QuicLongType::ZeroRtt => "0-RTT",
            QuicLongType::Handshake => "Handshake",
            QuicLongType::Retry => "Retry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuicHeader {
    Long {
        packet_type: QuicLongType,
        version: u32,
        dcid_len: u8,
        scid_len: Option<u8>,
    },
    Short,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppDetail {
    Http(HttpMessage),
    Dns(DnsMessage),
    Ssdp(SsdpMessage),
    /// `None` when the segment continues a record started earlier.
    Tls(Option<TlsRecord>),
    Quic(QuicHeader),
}

/// Application summary. `protocol` is `None` while a heuristic has not yet
/// been confirmed (QUIC headers waiting on the conversation tracker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLayer {
    pub protocol: Option<AppProtocol>,
    pub info: String,
    pub detail: AppDetail,
}

impl AppLayer {
    pub fn quic(&self) -> Option<&QuicHeader> {
        match &self.detail {
            AppDetail::Quic(q) => Some(q),
            _ => None,
        }
    }
}

// ── Diagnostics ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    Truncated { needed: usize, available: usize },
    InvalidHeaderLength(usize),
    InvalidVersion(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed {
    pub layer: &'static str,
    pub reason: MalformedReason,
}

impl Malformed {
    pub fn truncated(layer: &'static str, needed: usize, available: usize) -> Self {
        Self { layer, reason: MalformedReason::Truncated { needed, available } }
    }
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            MalformedReason::Truncated { needed, available } => {
                write!(f, "{}: truncated (need {} bytes, have {})", self.layer, needed, available)
            }
            MalformedReason::InvalidHeaderLength(len) => {
                write!(f, "{}: invalid header length {}", self.layer, len)
            }
            MalformedReason::InvalidVersion(v) => write!(f, "{}: invalid version {}", self.layer, v),
        }
    }
}

// ── Packet record ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PacketRecord {
    pub number: u64,
    pub timestamp: DateTime<Utc>,
    pub cap_length: u32,
    pub wire_length: u32,
    pub data: Arc<[u8]>,
    pub ethernet: Option<EthernetHeader>,
    pub vlan: Option<VlanTag>,
    pub network: Option<NetworkLayer>,
    pub transport: Option<TransportLayer>,
    pub app: Option<AppLayer>,
    pub stream_index: Option<u32>,
    pub malformed: Option<Malformed>,
    /// Offset just past the last header that was parsed.
    pub consumed: usize,
    pub details: Vec<String>,
}

impl PacketRecord {
    pub fn new(number: u64, timestamp: DateTime<Utc>, data: &[u8], wire_length: u32) -> Self {
        Self {
            number,
            timestamp,
            cap_length: data.len() as u32,
            wire_length,
            data: Arc::from(data),
            ethernet: None,
            vlan: None,
            network: None,
            transport: None,
            app: None,
            stream_index: None,
            malformed: None,
            consumed: 0,
            details: Vec::new(),
        }
    }

    pub fn ipv4(&self) -> Option<&Ipv4Header> {
        match &self.network {
            Some(NetworkLayer::Ipv4(h)) => Some(h),
            _ => None,
        }
    }

    pub fn ipv6(&self) -> Option<&Ipv6Header> {
        match &self.network {
            Some(NetworkLayer::Ipv6(h)) => Some(h),
            _ => None,
        }
    }

    pub fn arp(&self) -> Option<&ArpHeader> {
        match &self.network {
            Some(NetworkLayer::Arp(h)) => Some(h),
            _ => None,
        }
    }

    pub fn tcp(&self) -> Option<&TcpHeader> {
        match &self.transport {
            Some(TransportLayer::Tcp(h)) => Some(h),
            _ => None,
        }
    }

    pub fn udp(&self) -> Option<&UdpHeader> {
        match &self.transport {
            Some(TransportLayer::Udp(h)) => Some(h),
            _ => None,
        }
    }

    pub fn icmp(&self) -> Option<&IcmpHeader> {
        match &self.transport {
            Some(TransportLayer::Icmp(h)) => Some(h),
            _ => None,
        }
    }

    pub fn ports(&self) -> Option<(u16, u16)> {
        self.transport.as_ref().and_then(TransportLayer::ports)
    }

    pub fn is_malformed(&self) -> bool {
        self.malformed.is_some()
    }

    /// Bytes past the last parsed header.
    pub fn payload(&self) -> &[u8] {
        self.data.get(self.consumed..).unwrap_or(&[])
    }

    /// Application label if confirmed, else the deepest decoded layer.
    pub fn protocol_label(&self) -> &'static str {
        if let Some(proto) = self.app.as_ref().and_then(|a| a.protocol) {
            return proto.as_str();
        }
        if let Some(t) = &self.transport {
            return t.label();
        }
        match &self.network {
            Some(NetworkLayer::Ipv4(_)) => "IPv4",
            Some(NetworkLayer::Ipv6(_)) => "IPv6",
            Some(NetworkLayer::Arp(_)) => "ARP",
            None if self.ethernet.is_some() => "Ethernet",
            None => "Unknown",
        }
    }

    pub fn source(&self) -> String {
        match &self.network {
            Some(NetworkLayer::Ipv4(h)) => h.src.to_string(),
            Some(NetworkLayer::Ipv6(h)) => h.src.to_string(),
            Some(NetworkLayer::Arp(h)) => h.sender_mac.to_string(),
            None => self.ethernet.as_ref().map(|e| e.src.to_string()).unwrap_or_else(|| "—".into()),
        }
    }

    pub fn destination(&self) -> String {
        match &self.network {
            Some(NetworkLayer::Ipv4(h)) => h.dst.to_string(),
            Some(NetworkLayer::Ipv6(h)) => h.dst.to_string(),
            Some(NetworkLayer::Arp(_)) => "Broadcast".into(),
            None => self.ethernet.as_ref().map(|e| e.dst.to_string()).unwrap_or_else(|| "—".into()),
        }
    }

    /// One-line summary for the packet list.
    pub fn info(&self) -> String {
        let mut info = if let Some(app) = self.app.as_ref().filter(|a| a.protocol.is_some()) {
            app.info.clone()
        } else if let Some(t) = &self.transport {
            match t {
                TransportLayer::Tcp(tcp) => {
                    let mut s = format!(
                        "{} → {} [{}] Seq={}",
                        tcp.src_port, tcp.dst_port, tcp_flags(tcp.flags), tcp.seq
                    );
                    if tcp.has(TcpHeader::ACK) {
                        s.push_str(&format!(" Ack={}", tcp.ack));
                    }
                    s.push_str(&format!(" Win={} Len={}", tcp.window, self.payload().len()));
                    s
                }
                TransportLayer::Udp(udp) => {
                    format!("{} → {} Len={}", udp.src_port, udp.dst_port, self.payload().len())
                }
                TransportLayer::Icmp(icmp) => {
                    let mut s = icmp.type_name();
                    if let Some(echo) = icmp.echo {
                        s.push_str(&format!(", id={}, seq={}", echo.identifier, echo.sequence));
                    }
                    s
                }
            }
        } else {
            match &self.network {
                Some(NetworkLayer::Arp(arp)) => match arp.opcode {
                    1 => format!("Who has {}? Tell {}", arp.target_ip, arp.sender_ip),
                    2 => format!("{} is at {}", arp.sender_ip, arp.sender_mac),
                    op => format!("ARP op={}", op),
                },
                Some(NetworkLayer::Ipv4(h)) => super::format::ip_protocol_name(h.protocol),
                Some(NetworkLayer::Ipv6(h)) => super::format::ip_protocol_name(h.next_header),
                None => match (&self.vlan, &self.ethernet) {
                    (Some(tag), _) => format!("EtherType 0x{:04x}", tag.ether_type),
                    (None, Some(eth)) => format!("EtherType 0x{:04x}", eth.ether_type),
                    (None, None) => String::new(),
                },
            }
        };
        if let Some(m) = &self.malformed {
            if !info.is_empty() {
                info.push(' ');
            }
            info.push_str(&format!("[Malformed {}]", m.layer));
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_record() -> PacketRecord {
        PacketRecord::new(1, Utc::now(), &[0u8; 60], 60)
    }

    #[test]
    fn test_vlan_tci_fields() {
        let tag = VlanTag { tpid: ETHERTYPE_VLAN, tci: 0xB064, ether_type: ETHERTYPE_IPV4 };
        assert_eq!(tag.priority(), 5);
        assert!(tag.drop_eligible());
        assert_eq!(tag.vlan_id(), 0x064);
    }

    #[test]
    fn test_quic_long_type_bits() {
        assert_eq!(QuicLongType::from_bits(0), QuicLongType::Initial);
        assert_eq!(QuicLongType::from_bits(1), QuicLongType::ZeroRtt);
        assert_eq!(QuicLongType::from_bits(2), QuicLongType::Handshake);
        assert_eq!(QuicLongType::from_bits(3), QuicLongType::Retry);
    }

    #[test]
    fn test_label_falls_back_to_transport() {
        let mut pkt = bare_record();
        pkt.transport = Some(TransportLayer::Udp(UdpHeader {
            src_port: 5000,
            dst_port: 443,
            length: 8,
            checksum: 0,
        }));
        pkt.app = Some(AppLayer {
            protocol: None,
            info: "short".into(),
            detail: AppDetail::Quic(QuicHeader::Short),
        });
        assert_eq!(pkt.protocol_label(), "UDP");
        assert!(pkt.info().starts_with("5000 → 443"));

        pkt.app.as_mut().unwrap().protocol = Some(AppProtocol::Quic);
        assert_eq!(pkt.protocol_label(), "QUIC");
        assert_eq!(pkt.info(), "short");
    }

    #[test]
    fn test_label_without_layers() {
        let pkt = bare_record();
        assert_eq!(pkt.protocol_label(), "Unknown");
        assert_eq!(pkt.source(), "—");
    }

    #[test]
    fn test_malformed_display() {
        let m = Malformed::truncated("TCP", 20, 7);
        assert_eq!(m.to_string(), "TCP: truncated (need 20 bytes, have 7)");
    }

    #[test]
    fn test_payload_past_consumed() {
        let mut pkt = PacketRecord::new(1, Utc::now(), &[1, 2, 3, 4], 4);
        pkt.consumed = 2;
        assert_eq!(pkt.payload(), &[3, 4]);
        pkt.consumed = 9;
        assert!(pkt.payload().is_empty());
    }
}
