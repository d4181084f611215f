use super::cursor::read_u16;
use super::dns::{describe_dns, dns_info, parse_dns};
use super::format::{push_section, tls_handshake_name, tls_version_name};
use super::packet::{AppDetail, AppLayer, AppProtocol, HttpMessage, SsdpMessage, TlsRecord};
use super::quic::{describe_quic, parse_quic, quic_info};

pub const HTTP_PORT: u16 = 80;
pub const DNS_PORT: u16 = 53;
pub const MDNS_PORT: u16 = 5353;
pub const SSDP_PORT: u16 = 1900;
pub const HTTPS_PORT: u16 = 443;

const HTTP_MIN_LEN: usize = 10;
const HTTP_METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Carrier {
    Tcp,
    Udp,
}

/// Port-driven heuristics over the payload past the transport header.
///
/// The first port rule that matches decides; a failed parse under that rule
/// yields no application layer rather than trying the next rule.
pub fn dissect_application(carrier: Carrier, src_port: u16, dst_port: u16, payload: &[u8]) -> Option<AppLayer> {
    let on = |port: u16| src_port == port || dst_port == port;

    if carrier == Carrier::Udp && on(SSDP_PORT) {
        let ssdp = parse_ssdp(payload)?;
        return Some(AppLayer {
            protocol: Some(AppProtocol::Ssdp),
            info: ssdp.start_line.clone(),
            detail: AppDetail::Ssdp(ssdp),
        });
    }
    if carrier == Carrier::Tcp && on(HTTP_PORT) && !payload.is_empty() {
        let http = parse_http(payload)?;
        return Some(AppLayer { protocol: Some(AppProtocol::Http), info: http_info(&http), detail: AppDetail::Http(http) });
    }
    if carrier == Carrier::Udp && on(DNS_PORT) && !payload.is_empty() {
        let dns = parse_dns(payload)?;
        return Some(AppLayer { protocol: Some(AppProtocol::Dns), info: dns_info(&dns), detail: AppDetail::Dns(dns) });
    }
    if carrier == Carrier::Udp && on(MDNS_PORT) {
        let dns = parse_dns(payload)?;
        return Some(AppLayer { protocol: Some(AppProtocol::Mdns), info: dns_info(&dns), detail: AppDetail::Dns(dns) });
    }
    if on(HTTPS_PORT) {
        return match carrier {
            Carrier::Tcp if !payload.is_empty() => {
                let record = parse_tls_record(payload);
                Some(AppLayer {
                    protocol: Some(AppProtocol::Tls),
                    info: tls_info(record.as_ref()),
                    detail: AppDetail::Tls(record),
                })
            }
            Carrier::Tcp => None,
            // Attribution to QUIC is left to the conversation tracker.
            Carrier::Udp => parse_quic(payload).map(|header| AppLayer {
                protocol: None,
                info: quic_info(&header),
                detail: AppDetail::Quic(header),
            }),
        };
    }
    None
}

pub fn describe_application(app: &AppLayer, details: &mut Vec<String>) {
    match &app.detail {
        AppDetail::Http(http) => {
            let mut fields = Vec::new();
            match http {
                HttpMessage::Request { method, path, version, host } => {
                    fields.push(format!("Request Method: {}", method));
                    fields.push(format!("Request URI: {}", path));
                    fields.push(format!("Request Version: {}", version));
                    if let Some(host) = host {
                        fields.push(format!("Host: {}", host));
                    }
                }
                HttpMessage::Response { version, status, reason } => {
                    fields.push(format!("Response Version: {}", version));
                    fields.push(format!("Status Code: {}", status));
                    fields.push(format!("Response Phrase: {}", reason));
                }
            }
            push_section(details, "Hypertext Transfer Protocol", fields);
        }
        AppDetail::Dns(dns) => {
            let title = match app.protocol {
                Some(AppProtocol::Mdns) => "Multicast Domain Name System",
                _ => "Domain Name System",
            };
            describe_dns(title, dns, details);
        }
        AppDetail::Ssdp(ssdp) => {
            let mut fields = vec![ssdp.start_line.clone()];
            if let Some(st) = &ssdp.search_target {
                fields.push(format!("Search Target: {}", st));
            }
            push_section(details, "Simple Service Discovery Protocol", fields);
        }
        AppDetail::Tls(Some(record)) => {
            let mut fields = vec![
                format!("Content Type: {} ({})", content_type_name(record.content_type), record.content_type),
                format!("Version: {}", tls_version_name(record.version.0, record.version.1)),
            ];
            if let Some(hs) = record.handshake_type {
                fields.push(format!("Handshake Type: {} ({})", tls_handshake_name(hs), hs));
            }
            if let Some(sni) = &record.sni {
                fields.push(format!("Server Name: {}", sni));
            }
            push_section(details, "Transport Layer Security", fields);
        }
        AppDetail::Tls(None) => {
            push_section(details, "Transport Layer Security", ["Continuation Data".to_string()]);
        }
        AppDetail::Quic(header) => describe_quic(header, details),
    }
}

// ── HTTP ────────────────────────────────────────────────────

pub fn parse_http(payload: &[u8]) -> Option<HttpMessage> {
    if payload.len() < HTTP_MIN_LEN {
        return None;
    }
    let text = String::from_utf8_lossy(payload);
    let (first_line, rest) = text.split_once("\r\n")?;
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    let head = *parts.first()?;

    if HTTP_METHODS.contains(&head) {
        if parts.len() < 3 {
            return None;
        }
        return Some(HttpMessage::Request {
            method: head.to_string(),
            path: parts[1].to_string(),
            version: parts[2].to_string(),
            host: header_value(rest, "host"),
        });
    }
    if head.starts_with("HTTP/") {
        let status = parts.get(1)?.parse::<u16>().ok()?;
        return Some(HttpMessage::Response {
            version: head.to_string(),
            status,
            reason: parts.get(2..).map(|r| r.join(" ")).unwrap_or_default(),
        });
    }
    None
}

fn header_value(headers: &str, name: &str) -> Option<String> {
    headers
        .split("\r\n")
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim().to_string())
}

pub fn http_info(http: &HttpMessage) -> String {
    match http {
        HttpMessage::Request { method, path, version, host } => match host {
            Some(host) => format!("{} {}{} {}", method, host, path, version),
            None => format!("{} {} {}", method, path, version),
        },
        HttpMessage::Response { version, status, reason } => format!("{} {} {}", version, status, reason).trim_end().to_string(),
    }
}

// ── SSDP ────────────────────────────────────────────────────

pub fn parse_ssdp(payload: &[u8]) -> Option<SsdpMessage> {
    let text = String::from_utf8_lossy(payload);
    let mut lines = text.lines();
    let start_line = lines.next()?.trim().to_string();
    if start_line.is_empty() {
        return None;
    }
    let rest: Vec<&str> = lines.collect();
    let search_target = rest
        .iter()
        .take_while(|line| !line.trim().is_empty())
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| {
            let key = key.trim();
            key.eq_ignore_ascii_case("st") || key.eq_ignore_ascii_case("nt")
        })
        .map(|(_, value)| value.trim().to_string());
    Some(SsdpMessage { start_line, search_target })
}

// ── TLS ─────────────────────────────────────────────────────

const TLS_HANDSHAKE: u8 = 22;
const TLS_RECORD_HEADER_LEN: usize = 5;

fn content_type_name(content_type: u8) -> &'static str {
    match content_type {
        20 => "Change Cipher Spec",
        21 => "Alert",
        22 => "Handshake",
        23 => "Application Data",
        _ => "Unknown",
    }
}

/// Decodes a record header when the segment starts on a record boundary.
pub fn parse_tls_record(payload: &[u8]) -> Option<TlsRecord> {
    if payload.len() < TLS_RECORD_HEADER_LEN {
        return None;
    }
    let content_type = payload[0];
    if !(20..=23).contains(&content_type) || payload[1] != 3 || payload[2] > 4 {
        return None;
    }
    let mut record = TlsRecord {
        content_type,
        version: (payload[1], payload[2]),
        handshake_type: None,
        sni: None,
    };
    if content_type == TLS_HANDSHAKE {
        let handshake = &payload[TLS_RECORD_HEADER_LEN..];
        record.handshake_type = handshake.first().copied();
        if record.handshake_type == Some(1) {
            record.sni = extract_sni(handshake);
        }
    }
    Some(record)
}

/// Walks a ClientHello (starting at the handshake type byte) to the
/// server_name extension.
fn extract_sni(handshake: &[u8]) -> Option<String> {
    // type(1) + length(3) + client_version(2) + random(32)
    let mut pos = 38;
    let sid_len = *handshake.get(pos)? as usize;
    pos += 1 + sid_len;
    let cs_len = read_u16(handshake, pos)? as usize;
    pos += 2 + cs_len;
    let cm_len = *handshake.get(pos)? as usize;
    pos += 1 + cm_len;
    let ext_len = read_u16(handshake, pos)? as usize;
    pos += 2;
    let ext_end = (pos + ext_len).min(handshake.len());

    while pos + 4 <= ext_end {
        let ext_type = read_u16(handshake, pos)?;
        let ext_data_len = read_u16(handshake, pos + 2)? as usize;
        pos += 4;
        if ext_type == 0 {
            // list length(2) + name type(1) + name length(2)
            let name_len = read_u16(handshake, pos + 3)? as usize;
            let name = handshake.get(pos + 5..pos + 5 + name_len)?;
            return Some(String::from_utf8_lossy(name).into_owned());
        }
        pos += ext_data_len;
    }
    None
}

fn tls_info(record: Option<&TlsRecord>) -> String {
    let Some(record) = record else {
        return "Continuation Data".to_string();
    };
    let version = tls_version_name(record.version.0, record.version.1);
    match (record.handshake_type, &record.sni) {
        (Some(1), Some(sni)) => format!("Client Hello ({}), SNI: {}", version, sni),
        (Some(hs), _) => format!("{} ({})", tls_handshake_name(hs), version),
        (None, _) => format!("{} ({})", content_type_name(record.content_type), version),
    }
}
