//! Display filters.
//!
//! A filter is an OR of AND-groups of conditions:
//!
//! ```text
//! expr      := and_group ('||' and_group)*
//! and_group := condition ('&&' condition)*
//! condition := protocol_name | field operator value
//! ```
//!
//! Filters are compiled once and then evaluated against every packet, so all
//! value parsing happens in [`FilterExpression::compile`].

use std::cmp::Ordering;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::dissect::{AppDetail, HttpMessage, NetworkLayer, PacketRecord, TransportLayer};
use crate::error::FilterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

impl Op {
    /// Longest match first so `>=` is never read as `>` followed by `=`.
    const TOKENS: [(&'static str, Op); 7] = [
        ("==", Op::Eq),
        ("!=", Op::Ne),
        (">=", Op::Ge),
        ("<=", Op::Le),
        (">", Op::Gt),
        ("<", Op::Lt),
        ("=", Op::Eq),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Ge => ">=",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Lt => "<",
        }
    }

    fn holds(&self, ord: Ordering) -> bool {
        match self {
            Op::Eq => ord == Ordering::Equal,
            Op::Ne => ord != Ordering::Equal,
            Op::Ge => ord != Ordering::Less,
            Op::Le => ord != Ordering::Greater,
            Op::Gt => ord == Ordering::Greater,
            Op::Lt => ord == Ordering::Less,
        }
    }

    fn compare<T: Ord>(&self, actual: T, wanted: T) -> bool {
        self.holds(actual.cmp(&wanted))
    }

    fn is_equality(&self) -> bool {
        matches!(self, Op::Eq | Op::Ne)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ProtocolTest {
    Tcp,
    Udp,
    Icmp,
    Arp,
    Ip,
    Ipv6,
    Vlan,
    Eth,
    /// Compared against the packet's resolved protocol label.
    Label(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Src,
    Dst,
    Either,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortScope {
    Tcp,
    Udp,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Counter {
    FrameLen,
    FrameNumber,
    Stream,
    VlanId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    HttpHost,
    HttpMethod,
    DnsQueryName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Protocol(ProtocolTest),
    Ipv4 { side: Side, op: Op, addr: Ipv4Addr },
    Ipv6 { side: Side, op: Op, addr: Ipv6Addr },
    Port { scope: PortScope, side: Side, op: Op, port: u16 },
    Number { counter: Counter, op: Op, value: u64 },
    Text { field: TextField, op: Op, value: String },
}

/// A compiled display filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpression {
    groups: Vec<Vec<Condition>>,
}

impl FilterExpression {
    /// Compiles `text`. Blank text compiles to `None`, which matches
    /// everything.
    pub fn compile(text: &str) -> Result<Option<Self>, FilterError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let mut groups = Vec::new();
        for group in split_outside_quotes(text, "||")? {
            let conditions = split_outside_quotes(group, "&&")?
                .into_iter()
                .map(parse_condition)
                .collect::<Result<Vec<_>, _>>()?;
            groups.push(conditions);
        }
        Ok(Some(Self { groups }))
    }

    pub fn matches(&self, pkt: &PacketRecord) -> bool {
        self.groups.iter().any(|group| group.iter().all(|c| c.matches(pkt)))
    }
}

/// Filter state kept by a session: the text and its compiled form.
#[derive(Debug, Clone, Default)]
pub struct DisplayFilter {
    text: String,
    active: Option<FilterExpression>,
}

impl DisplayFilter {
    /// Replaces the active filter. On error the previous filter stays.
    pub fn set(&mut self, text: &str) -> Result<(), FilterError> {
        let compiled = FilterExpression::compile(text)?;
        self.text = text.trim().to_string();
        self.active = compiled;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.active = None;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expression(&self) -> Option<&FilterExpression> {
        self.active.as_ref()
    }

    pub fn matches(&self, pkt: &PacketRecord) -> bool {
        self.active.as_ref().map_or(true, |f| f.matches(pkt))
    }
}

// ── Parsing ─────────────────────────────────────────────────

fn split_outside_quotes<'a>(text: &'a str, sep: &str) -> Result<Vec<&'a str>, FilterError> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut iter = text.char_indices();
    while let Some((i, ch)) = iter.next() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if text[i..].starts_with(sep) => {
                parts.push(&text[start..i]);
                start = i + sep.len();
                // separators are ASCII; skip the rest of this one
                for _ in 1..sep.len() {
                    iter.next();
                }
            }
            None => {}
        }
    }
    if quote.is_some() {
        return Err(FilterError::UnbalancedQuote);
    }
    parts.push(&text[start..]);
    Ok(parts)
}

/// Position and operator of the first comparison outside quotes.
fn find_operator(text: &str) -> Option<(usize, &'static str, Op)> {
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None => {
                if let Some((tok, op)) = Op::TOKENS.iter().find(|(tok, _)| text[i..].starts_with(tok)) {
                    return Some((i, *tok, *op));
                }
            }
        }
    }
    None
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0] {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn is_name(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

fn parse_condition(text: &str) -> Result<Condition, FilterError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(FilterError::EmptyCondition);
    }

    let Some((at, tok, op)) = find_operator(text) else {
        return parse_protocol(text);
    };
    let field = text[..at].trim().to_ascii_lowercase();
    let raw = text[at + tok.len()..].trim();
    if field.is_empty() || !is_name(&field) {
        return Err(FilterError::InvalidCondition(text.to_string()));
    }
    let value = unquote(raw);
    if value.is_empty() {
        return Err(FilterError::MissingValue { field, op: op.as_str().to_string() });
    }

    let invalid = |reason: &str| FilterError::InvalidValue {
        field: field.clone(),
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let equality_only = || {
        if op.is_equality() {
            Ok(())
        } else {
            Err(FilterError::UnsupportedOperator { field: field.clone(), op: op.as_str().to_string() })
        }
    };
    let number = || value.parse::<u64>().map_err(|_| invalid("expected a non-negative integer"));
    let port = || value.parse::<u16>().map_err(|_| invalid("expected a port number (0-65535)"));

    let side = match field.rsplit('.').next() {
        Some("src") | Some("srcport") => Side::Src,
        Some("dst") | Some("dstport") => Side::Dst,
        _ => Side::Either,
    };

    let condition = match field.as_str() {
        "ip.src" | "ip.dst" | "ip.addr" => {
            equality_only()?;
            let addr = value.parse().map_err(|_| invalid("expected an IPv4 address"))?;
            Condition::Ipv4 { side, op, addr }
        }
        "ipv6.src" | "ipv6.dst" | "ipv6.addr" => {
            equality_only()?;
            let addr = value.parse().map_err(|_| invalid("expected an IPv6 address"))?;
            Condition::Ipv6 { side, op, addr }
        }
        "tcp.port" | "tcp.srcport" | "tcp.dstport" => {
            Condition::Port { scope: PortScope::Tcp, side, op, port: port()? }
        }
        "udp.port" | "udp.srcport" | "udp.dstport" => {
            Condition::Port { scope: PortScope::Udp, side, op, port: port()? }
        }
        "port" => Condition::Port { scope: PortScope::Any, side: Side::Either, op, port: port()? },
        "frame.len" | "length" => Condition::Number { counter: Counter::FrameLen, op, value: number()? },
        "frame.number" => Condition::Number { counter: Counter::FrameNumber, op, value: number()? },
        "stream" | "tcp.stream" | "udp.stream" => {
            Condition::Number { counter: Counter::Stream, op, value: number()? }
        }
        "vlan.id" => Condition::Number { counter: Counter::VlanId, op, value: number()? },
        "http.host" | "http.request.method" | "dns.qry.name" => {
            equality_only()?;
            let text_field = match field.as_str() {
                "http.host" => TextField::HttpHost,
                "http.request.method" => TextField::HttpMethod,
                _ => TextField::DnsQueryName,
            };
            Condition::Text { field: text_field, op, value: value.to_string() }
        }
        _ => return Err(FilterError::UnknownField(field.clone())),
    };
    Ok(condition)
}

fn parse_protocol(token: &str) -> Result<Condition, FilterError> {
    if !is_name(token) {
        return Err(FilterError::InvalidCondition(token.to_string()));
    }
    let name = token.to_ascii_lowercase();
    let test = match name.as_str() {
        "tcp" => ProtocolTest::Tcp,
        "udp" => ProtocolTest::Udp,
        "icmp" => ProtocolTest::Icmp,
        "arp" => ProtocolTest::Arp,
        "ip" => ProtocolTest::Ip,
        "ipv6" => ProtocolTest::Ipv6,
        "vlan" => ProtocolTest::Vlan,
        "eth" => ProtocolTest::Eth,
        // a field name on its own is missing its comparison
        "port" | "length" | "stream" => return Err(FilterError::InvalidCondition(token.to_string())),
        _ if name.contains('.') => return Err(FilterError::InvalidCondition(token.to_string())),
        _ => ProtocolTest::Label(name),
    };
    Ok(Condition::Protocol(test))
}

// ── Evaluation ──────────────────────────────────────────────

impl Condition {
    fn matches(&self, pkt: &PacketRecord) -> bool {
        match self {
            Condition::Protocol(test) => test.matches(pkt),
            Condition::Ipv4 { side, op, addr } => match pkt.ipv4() {
                Some(ip) => endpoints_match(*side, *op, ip.src == *addr, ip.dst == *addr),
                None => false,
            },
            Condition::Ipv6 { side, op, addr } => match pkt.ipv6() {
                Some(ip) => endpoints_match(*side, *op, ip.src == *addr, ip.dst == *addr),
                None => false,
            },
            Condition::Port { scope, side, op, port } => {
                let ports = match (scope, pkt.transport.as_ref()) {
                    (PortScope::Tcp, Some(TransportLayer::Tcp(t))) => Some((t.src_port, t.dst_port)),
                    (PortScope::Udp, Some(TransportLayer::Udp(u))) => Some((u.src_port, u.dst_port)),
                    (PortScope::Any, _) => pkt.ports(),
                    _ => None,
                };
                let Some((sp, dp)) = ports else { return false };
                match side {
                    Side::Src => op.compare(sp, *port),
                    Side::Dst => op.compare(dp, *port),
                    // "!=" means the port is not involved at all
                    Side::Either if *op == Op::Ne => sp != *port && dp != *port,
                    Side::Either => op.compare(sp, *port) || op.compare(dp, *port),
                }
            }
            Condition::Number { counter, op, value } => {
                let actual = match counter {
                    Counter::FrameLen => Some(pkt.wire_length as u64),
                    Counter::FrameNumber => Some(pkt.number),
                    Counter::Stream => pkt.stream_index.map(u64::from),
                    Counter::VlanId => pkt.vlan.as_ref().map(|v| v.vlan_id() as u64),
                };
                actual.is_some_and(|a| op.compare(a, *value))
            }
            Condition::Text { field, op, value } => match text_field(pkt, *field) {
                Some(actual) => actual.eq_ignore_ascii_case(value) == (*op == Op::Eq),
                None => false,
            },
        }
    }
}

/// Address equality per endpoint. For `Either`, `!=` requires neither
/// endpoint to match.
fn endpoints_match(side: Side, op: Op, src_eq: bool, dst_eq: bool) -> bool {
    let eq = op == Op::Eq;
    match side {
        Side::Src => src_eq == eq,
        Side::Dst => dst_eq == eq,
        Side::Either if eq => src_eq || dst_eq,
        Side::Either => !src_eq && !dst_eq,
    }
}

fn text_field(pkt: &PacketRecord, field: TextField) -> Option<&str> {
    match (field, &pkt.app.as_ref()?.detail) {
        (TextField::HttpHost, AppDetail::Http(HttpMessage::Request { host, .. })) => host.as_deref(),
        (TextField::HttpMethod, AppDetail::Http(HttpMessage::Request { method, .. })) => Some(method.as_str()),
        (TextField::DnsQueryName, AppDetail::Dns(dns)) => dns.name.as_deref(),
        _ => None,
    }
}

impl ProtocolTest {
    fn matches(&self, pkt: &PacketRecord) -> bool {
        match self {
            ProtocolTest::Tcp => pkt.tcp().is_some(),
            ProtocolTest::Udp => pkt.udp().is_some(),
            ProtocolTest::Icmp => pkt.icmp().is_some(),
            ProtocolTest::Arp => pkt.arp().is_some(),
            ProtocolTest::Ip => matches!(pkt.network, Some(NetworkLayer::Ipv4(_))),
            ProtocolTest::Ipv6 => matches!(pkt.network, Some(NetworkLayer::Ipv6(_))),
            ProtocolTest::Vlan => pkt.vlan.is_some(),
            ProtocolTest::Eth => pkt.ethernet.is_some(),
            ProtocolTest::Label(name) => pkt.protocol_label().eq_ignore_ascii_case(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ConversationTracker;
    use crate::dissect::testutil::{ethernet, ipv4, ipv6, record, tcp_frame, udp, udp_frame};

    fn compile(text: &str) -> FilterExpression {
        FilterExpression::compile(text).unwrap().unwrap()
    }

    fn matches(text: &str, pkt: &PacketRecord) -> bool {
        compile(text).matches(pkt)
    }

    fn tcp80() -> PacketRecord {
        record(1, &tcp_frame(51000, 80, 0x02, b""))
    }

    fn udp53() -> PacketRecord {
        record(2, &udp_frame(40000, 53, b""))
    }

    fn udp80() -> PacketRecord {
        record(3, &udp_frame(40000, 80, b""))
    }

    fn arp() -> PacketRecord {
        let mut f = ethernet(0x0806);
        f.extend_from_slice(&[0, 1, 8, 0, 6, 4, 0, 1]);
        f.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 10, 0, 0, 1]);
        f.extend_from_slice(&[0, 0, 0, 0, 0, 0, 10, 0, 0, 2]);
        record(4, &f)
    }

    // ── compile ─────────────────────────────────────────────
    #[test]
    fn test_blank_filter_is_none() {
        assert_eq!(FilterExpression::compile(""), Ok(None));
        assert_eq!(FilterExpression::compile("   "), Ok(None));
    }

    #[test]
    fn test_unknown_field_is_error() {
        assert_eq!(
            FilterExpression::compile("foo.bar == 1"),
            Err(FilterError::UnknownField("foo.bar".into()))
        );
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(FilterExpression::compile("tcp &&"), Err(FilterError::EmptyCondition));
        assert!(matches!(
            FilterExpression::compile("tcp.port =="),
            Err(FilterError::MissingValue { .. })
        ));
        assert!(matches!(
            FilterExpression::compile("tcp.port == http"),
            Err(FilterError::InvalidValue { .. })
        ));
        assert!(matches!(
            FilterExpression::compile("ip.src > 10.0.0.1"),
            Err(FilterError::UnsupportedOperator { .. })
        ));
        assert_eq!(FilterExpression::compile("http.host == \"x"), Err(FilterError::UnbalancedQuote));
        assert!(matches!(FilterExpression::compile("tcp port"), Err(FilterError::InvalidCondition(_))));
        assert!(matches!(FilterExpression::compile("stream"), Err(FilterError::InvalidCondition(_))));
    }

    #[test]
    fn test_single_equals_and_case() {
        assert_eq!(compile("TCP.Port = 80"), compile("tcp.port == 80"));
    }

    #[test]
    fn test_longest_operator_wins() {
        let pkt = tcp80();
        assert!(matches("tcp.dstport >= 80", &pkt));
        assert!(!matches("tcp.dstport > 80", &pkt));
        assert!(matches("tcp.dstport <= 80", &pkt));
        assert!(!matches("tcp.dstport < 80", &pkt));
    }

    // ── protocol names ──────────────────────────────────────
    #[test]
    fn test_bare_tcp_matches_only_tcp() {
        assert!(matches("tcp", &tcp80()));
        assert!(!matches("tcp", &udp53()));
        assert!(!matches("tcp", &arp()));
        let http = record(5, &tcp_frame(51000, 80, 0x18, b"GET / HTTP/1.1\r\nHost: a\r\n\r\n"));
        assert_eq!(http.protocol_label(), "HTTP");
        assert!(matches("tcp", &http));
        assert!(matches("http", &http));
    }

    #[test]
    fn test_layer_presence_names() {
        assert!(matches("arp", &arp()));
        assert!(matches("eth", &arp()));
        assert!(!matches("ip", &arp()));
        assert!(matches("ip", &tcp80()));
        assert!(!matches("ipv6", &tcp80()));
    }

    #[test]
    fn test_icmp_covers_icmpv6() {
        let mut f = ethernet(0x86dd);
        f.extend(ipv6(58, 1, 2, 8));
        f.extend_from_slice(&[128, 0, 0, 0, 0, 1, 0, 1]);
        let pkt = record(1, &f);
        assert!(matches("icmp", &pkt));
        assert!(matches("icmpv6", &pkt));
        assert!(matches("ipv6", &pkt));
    }

    #[test]
    fn test_unknown_label_never_matches() {
        assert!(!matches("gopher", &tcp80()));
        assert!(!matches("gopher", &arp()));
    }

    // ── addresses ───────────────────────────────────────────
    #[test]
    fn test_ip_fields() {
        let pkt = tcp80(); // 10.0.0.1 -> 10.0.0.2
        assert!(matches("ip.src == 10.0.0.1", &pkt));
        assert!(matches("ip.dst == '10.0.0.2'", &pkt));
        assert!(matches("ip.addr == 10.0.0.2", &pkt));
        assert!(!matches("ip.addr != 10.0.0.2", &pkt));
        assert!(matches("ip.addr != 8.8.8.8", &pkt));
        assert!(matches("ip.src != 10.0.0.2", &pkt));
        assert!(!matches("ip.addr == 10.0.0.1", &arp()));
    }

    #[test]
    fn test_ipv6_fields_skip_ipv4() {
        let mut f = ethernet(0x86dd);
        f.extend(ipv6(17, 1, 2, 8));
        f.extend(udp(5000, 53, 0));
        let pkt = record(1, &f);
        assert!(matches("ipv6.src == fe80::1", &pkt));
        assert!(matches("ipv6.addr == fe80::2", &pkt));
        assert!(!matches("ip.addr != 1.2.3.4", &pkt));
        assert!(!matches("ipv6.addr == fe80::1", &tcp80()));
    }

    // ── ports ───────────────────────────────────────────────
    #[test]
    fn test_port_or_across_transports() {
        let f = compile("tcp.port == 80 || udp.port == 53");
        assert!(f.matches(&tcp80()));
        assert!(f.matches(&udp53()));
        assert!(!f.matches(&udp80()));
    }

    #[test]
    fn test_port_not_equal_excludes_either_endpoint() {
        assert!(!matches("port != 80", &tcp80()));
        assert!(!matches("port != 80", &record(9, &tcp_frame(80, 51000, 0x12, b""))));
        assert!(matches("port != 80", &udp53()));
        assert!(!matches("port != 80", &arp()));
    }

    #[test]
    fn test_directional_ports() {
        let pkt = tcp80();
        assert!(matches("tcp.srcport == 51000", &pkt));
        assert!(!matches("tcp.srcport == 80", &pkt));
        assert!(!matches("udp.dstport == 80", &pkt));
        assert!(matches("udp.dstport == 80", &udp80()));
    }

    #[test]
    fn test_and_short_circuit_and_precedence() {
        let f = compile("udp && port == 53 || tcp && port == 80");
        assert!(f.matches(&tcp80()));
        assert!(f.matches(&udp53()));
        assert!(!f.matches(&udp80()));
    }

    // ── counters ────────────────────────────────────────────
    #[test]
    fn test_frame_len_and_number() {
        let pkt = tcp80();
        assert!(matches("frame.len == 54", &pkt));
        assert!(matches("length < 60", &pkt));
        assert!(matches("frame.number == 1", &pkt));
        assert!(!matches("frame.number > 1", &pkt));
    }

    #[test]
    fn test_stream_requires_assignment() {
        let mut tracker = ConversationTracker::new();
        let mut batch = vec![tcp80(), udp53(), record(3, &tcp_frame(80, 51000, 0x12, b"")), arp()];
        tracker.process_batch(&mut batch);
        let f = compile("stream == 0");
        let hits: Vec<u64> = batch.iter().filter(|p| f.matches(p)).map(|p| p.number).collect();
        assert_eq!(hits, vec![1, 3]);
        assert!(!matches("stream != 0", &batch[3]));
        assert!(!matches("stream == 0", &tcp80()));
    }

    #[test]
    fn test_vlan_id() {
        let mut f = ethernet(0x8100);
        f.extend_from_slice(&[0x00, 0x64, 0x08, 0x00]);
        f.extend(ipv4(17, [10, 0, 0, 1], [10, 0, 0, 2], 8));
        f.extend(udp(5000, 53, 0));
        let pkt = record(1, &f);
        assert!(matches("vlan", &pkt));
        assert!(matches("vlan.id == 100", &pkt));
        assert!(!matches("vlan.id == 100", &udp53()));
    }

    // ── application fields ──────────────────────────────────
    #[test]
    fn test_http_fields() {
        let pkt = record(1, &tcp_frame(51000, 80, 0x18, b"GET /a HTTP/1.1\r\nHost: Example.com\r\n\r\n"));
        assert!(matches("http.host == example.com", &pkt));
        assert!(matches("http.request.method == \"GET\"", &pkt));
        assert!(matches("http.host != other.org", &pkt));
        assert!(!matches("http.host != other.org", &tcp80()));
    }

    #[test]
    fn test_quoted_separators_are_values() {
        let pkt = record(1, &tcp_frame(51000, 80, 0x18, b"GET /a HTTP/1.1\r\nHost: a&&b\r\n\r\n"));
        assert!(matches("http.host == 'a&&b'", &pkt));
        assert!(matches("udp || http.host == \"a&&b\"", &pkt));
    }

    #[test]
    fn test_dns_query_name() {
        let mut msg = vec![0x12, 0x34, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0];
        msg.extend_from_slice(b"\x07example\x03com\x00\x00\x01\x00\x01");
        let pkt = record(1, &udp_frame(40000, 53, &msg));
        assert!(matches("dns", &pkt));
        assert!(matches("dns.qry.name == example.com", &pkt));
    }

    // ── DisplayFilter ───────────────────────────────────────
    #[test]
    fn test_display_filter_keeps_previous_on_error() {
        let mut df = DisplayFilter::default();
        assert!(df.matches(&udp53()));
        df.set("tcp").unwrap();
        assert!(df.set("bogus.field == 1").is_err());
        assert_eq!(df.text(), "tcp");
        assert!(!df.matches(&udp53()));
        df.clear();
        assert!(df.expression().is_none());
        assert!(df.matches(&udp53()));
    }
}
