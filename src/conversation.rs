//! Flow identity and per-flow state.
//!
//! The tracker assigns every TCP/UDP packet a stream index, runs a small TCP
//! handshake state machine and decides whether QUIC-looking UDP/443 traffic
//! is attributed to QUIC.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};

use crate::dissect::{AppProtocol, NetworkLayer, PacketRecord, QuicHeader, TcpHeader, TransportLayer};
use crate::dissect::{IPPROTO_TCP, IPPROTO_UDP};

/// Direction-independent flow identity. IPv4 addresses are stored as
/// IPv4-compatible IPv6 (twelve zero bytes, then the four octets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamKey {
    pub protocol: u8,
    pub addr_a: [u8; 16],
    pub port_a: u16,
    pub addr_b: [u8; 16],
    pub port_b: u16,
}

impl StreamKey {
    pub fn new(protocol: u8, src: IpAddr, src_port: u16, dst: IpAddr, dst_port: u16) -> Self {
        let a = (to_bytes(src), src_port);
        let b = (to_bytes(dst), dst_port);
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        Self { protocol, addr_a: a.0, port_a: a.1, addr_b: b.0, port_b: b.1 }
    }

    /// `None` for anything that is not TCP or UDP over IPv4/IPv6.
    pub fn from_packet(pkt: &PacketRecord) -> Option<Self> {
        let (src, dst) = ip_pair(pkt)?;
        let (protocol, sp, dp) = match pkt.transport.as_ref()? {
            TransportLayer::Tcp(tcp) => (IPPROTO_TCP, tcp.src_port, tcp.dst_port),
            TransportLayer::Udp(udp) => (IPPROTO_UDP, udp.src_port, udp.dst_port),
            TransportLayer::Icmp(_) => return None,
        };
        Some(Self::new(protocol, src, sp, dst, dp))
    }

    fn is_a(&self, ip: IpAddr, port: u16) -> bool {
        self.addr_a == to_bytes(ip) && self.port_a == port
    }
}

fn to_bytes(ip: IpAddr) -> [u8; 16] {
    match ip {
        IpAddr::V4(v4) => v4.to_ipv6_compatible().octets(),
        IpAddr::V6(v6) => v6.octets(),
    }
}

fn ip_pair(pkt: &PacketRecord) -> Option<(IpAddr, IpAddr)> {
    match pkt.network.as_ref()? {
        NetworkLayer::Ipv4(ip) => Some((IpAddr::V4(ip.src), IpAddr::V4(ip.dst))),
        NetworkLayer::Ipv6(ip) => Some((IpAddr::V6(ip.src), IpAddr::V6(ip.dst))),
        NetworkLayer::Arp(_) => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub addr: IpAddr,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr {
            IpAddr::V4(a) => write!(f, "{}:{}", a, self.port),
            IpAddr::V6(a) => write!(f, "[{}]:{}", a, self.port),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    None,
    SynSent,
    SynRcvd,
    Established,
    FinWait,
    Closed,
}

#[derive(Debug, Clone)]
pub struct TcpHandshake {
    pub syn: DateTime<Utc>,
    pub syn_ack: Option<DateTime<Utc>>,
    pub ack: Option<DateTime<Utc>>,
}

fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_microseconds().unwrap_or(0).max(0) as f64 / 1000.0
}

impl TcpHandshake {
    pub fn syn_to_syn_ack_ms(&self) -> Option<f64> {
        self.syn_ack.map(|sa| millis_between(self.syn, sa))
    }

    pub fn syn_ack_to_ack_ms(&self) -> Option<f64> {
        match (self.syn_ack, self.ack) {
            (Some(sa), Some(a)) => Some(millis_between(sa, a)),
            _ => None,
        }
    }

    pub fn total_ms(&self) -> Option<f64> {
        self.ack.map(|a| millis_between(self.syn, a))
    }
}

#[derive(Debug, Clone)]
pub struct StreamState {
    pub index: u32,
    pub key: StreamKey,
    pub packet_count: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub tcp_state: TcpState,
    pub saw_syn: bool,
    pub saw_syn_ack: bool,
    pub quic_confirmed: bool,
    /// Sender of the first packet seen, or of the SYN when one was seen.
    pub initiator: Endpoint,
    pub bytes_a_to_b: u64,
    pub bytes_b_to_a: u64,
    pub handshake: Option<TcpHandshake>,
}

impl StreamState {
    fn new(index: u32, key: StreamKey, initiator: Endpoint, ts: DateTime<Utc>) -> Self {
        Self {
            index,
            key,
            packet_count: 0,
            first_seen: ts,
            last_seen: ts,
            tcp_state: TcpState::None,
            saw_syn: false,
            saw_syn_ack: false,
            quic_confirmed: false,
            initiator,
            bytes_a_to_b: 0,
            bytes_b_to_a: 0,
            handshake: None,
        }
    }

    fn on_tcp(&mut self, tcp: &TcpHeader, src: Endpoint, ts: DateTime<Utc>) {
        let syn = tcp.has(TcpHeader::SYN);
        let ack = tcp.has(TcpHeader::ACK);

        if tcp.has(TcpHeader::RST) {
            self.tcp_state = TcpState::Closed;
            return;
        }
        if syn && !ack {
            self.saw_syn = true;
            self.tcp_state = TcpState::SynSent;
            self.initiator = src;
            self.handshake.get_or_insert(TcpHandshake { syn: ts, syn_ack: None, ack: None });
        } else if syn && ack {
            self.saw_syn_ack = true;
            if self.tcp_state == TcpState::SynSent {
                self.tcp_state = TcpState::SynRcvd;
            }
            if let Some(hs) = self.handshake.as_mut() {
                hs.syn_ack.get_or_insert(ts);
            }
        } else if ack && self.tcp_state == TcpState::SynRcvd && self.saw_syn && self.saw_syn_ack {
            self.tcp_state = TcpState::Established;
            if let Some(hs) = self.handshake.as_mut() {
                hs.ack.get_or_insert(ts);
            }
        }
        if tcp.has(TcpHeader::FIN) {
            self.tcp_state = TcpState::FinWait;
        }
    }
}

#[derive(Debug, Default)]
pub struct ConversationTracker {
    index: HashMap<StreamKey, u32>,
    streams: Vec<StreamState>,
}

impl ConversationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies [`Self::process_packet`] to each packet in arrival order.
    pub fn process_batch(&mut self, batch: &mut [PacketRecord]) {
        for pkt in batch.iter_mut() {
            self.process_packet(pkt);
        }
    }

    /// Stamps the stream index and relabels QUIC traffic. Returns the index,
    /// or `None` for packets that carry no flow.
    pub fn process_packet(&mut self, pkt: &mut PacketRecord) -> Option<u32> {
        let key = StreamKey::from_packet(pkt)?;
        let (src_ip, _) = ip_pair(pkt)?;
        let (src_port, _) = pkt.ports()?;
        let src = Endpoint { addr: src_ip, port: src_port };
        let ts = pkt.timestamp;

        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.streams.len() as u32;
                self.index.insert(key, idx);
                self.streams.push(StreamState::new(idx, key, src, ts));
                idx
            }
        };
        let state = &mut self.streams[idx as usize];
        state.packet_count += 1;
        state.last_seen = ts;
        let payload = pkt.payload().len() as u64;
        if key.is_a(src.addr, src.port) {
            state.bytes_a_to_b += payload;
        } else {
            state.bytes_b_to_a += payload;
        }

        match &pkt.transport {
            Some(TransportLayer::Tcp(tcp)) => state.on_tcp(tcp, src, ts),
            Some(TransportLayer::Udp(_)) => {
                if let Some(app) = pkt.app.as_mut() {
                    let long = match app.quic() {
                        Some(QuicHeader::Long { .. }) => Some(true),
                        Some(QuicHeader::Short) => Some(false),
                        None => None,
                    };
                    if long == Some(true) {
                        state.quic_confirmed = true;
                    }
                    if long.is_some() && state.quic_confirmed {
                        app.protocol = Some(AppProtocol::Quic);
                    }
                }
            }
            _ => {}
        }

        pkt.stream_index = Some(idx);
        Some(idx)
    }

    pub fn get_stream(&self, index: u32) -> Option<&StreamState> {
        self.streams.get(index as usize)
    }

    pub fn get(&self, key: &StreamKey) -> Option<&StreamState> {
        self.index.get(key).and_then(|&i| self.get_stream(i))
    }

    /// Streams in index order.
    pub fn streams(&self) -> &[StreamState] {
        &self.streams
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Drops all flow state; indices start again at 0.
    pub fn clear(&mut self) {
        self.index.clear();
        self.streams.clear();
    }
}
