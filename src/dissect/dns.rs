use super::cursor::read_u16;
use super::format::{dns_type_name, push_section};
use super::packet::DnsMessage;

pub const DNS_HEADER_LEN: usize = 12;

/// Compression pointers followed before a name is rejected.
pub const MAX_COMPRESSION_JUMPS: usize = 16;

const MAX_NAME_LEN: usize = 255;

/// Decodes the header and first question. Returns `None` when the payload is
/// not plausibly DNS (short header or undecodable question name).
pub fn parse_dns(msg: &[u8]) -> Option<DnsMessage> {
    if msg.len() < DNS_HEADER_LEN {
        return None;
    }
    let id = read_u16(msg, 0)?;
    let flags = read_u16(msg, 2)?;
    let questions = read_u16(msg, 4)?;
    let answers = read_u16(msg, 6)?;

    let mut dns = DnsMessage {
        id,
        is_query: flags & 0x8000 == 0,
        rcode: (flags & 0x000f) as u8,
        questions,
        answers,
        name: None,
        qtype: None,
        qclass: None,
    };
    if questions > 0 {
        let (name, end) = read_name(msg, DNS_HEADER_LEN)?;
        dns.name = Some(name);
        dns.qtype = read_u16(msg, end);
        dns.qclass = read_u16(msg, end + 2);
    }
    Some(dns)
}

/// Reads a possibly compressed name starting at `start`. Returns the dotted
/// name and the offset just past the name in the original position.
pub fn read_name(msg: &[u8], start: usize) -> Option<(String, usize)> {
    let mut labels: Vec<String> = Vec::new();
    let mut pos = start;
    let mut resume = None;
    let mut jumps = 0;
    let mut total = 0;
    loop {
        let len = *msg.get(pos)?;
        match len & 0xc0 {
            0x00 if len == 0 => {
                pos += 1;
                break;
            }
            0x00 => {
                let len = len as usize;
                let label = msg.get(pos + 1..pos + 1 + len)?;
                total += len + 1;
                if total > MAX_NAME_LEN {
                    return None;
                }
                labels.push(String::from_utf8_lossy(label).into_owned());
                pos += 1 + len;
            }
            0xc0 => {
                let low = *msg.get(pos + 1)?;
                jumps += 1;
                if jumps > MAX_COMPRESSION_JUMPS {
                    return None;
                }
                resume.get_or_insert(pos + 2);
                pos = (((len & 0x3f) as usize) << 8) | low as usize;
            }
            _ => return None,
        }
    }
    let name = if labels.is_empty() { "<Root>".to_string() } else { labels.join(".") };
    Some((name, resume.unwrap_or(pos)))
}

fn rcode_name(rcode: u8) -> &'static str {
    match rcode {
        0 => "No error",
        1 => "Format error",
        2 => "Server failure",
        3 => "No such name",
        4 => "Not implemented",
        5 => "Refused",
        _ => "Unknown",
    }
}

pub fn dns_info(dns: &DnsMessage) -> String {
    let mut info = if dns.is_query {
        format!("Standard query 0x{:04x}", dns.id)
    } else {
        format!("Standard query response 0x{:04x}", dns.id)
    };
    if let Some(qtype) = dns.qtype {
        info.push(' ');
        info.push_str(dns_type_name(qtype));
    }
    if let Some(name) = &dns.name {
        info.push(' ');
        info.push_str(name);
    }
    if !dns.is_query && dns.rcode != 0 {
        info.push_str(&format!(", {}", rcode_name(dns.rcode)));
    }
    info
}

pub fn describe_dns(title: &str, dns: &DnsMessage, details: &mut Vec<String>) {
    let mut fields = vec![
        format!("Transaction ID: 0x{:04x}", dns.id),
        format!("Flags: {}", if dns.is_query { "Standard query" } else { "Standard query response" }),
        format!("Questions: {}", dns.questions),
        format!("Answer RRs: {}", dns.answers),
    ];
    if !dns.is_query {
        fields.push(format!("Reply code: {} ({})", rcode_name(dns.rcode), dns.rcode));
    }
    if let Some(name) = &dns.name {
        let qtype = dns.qtype.map(dns_type_name).unwrap_or("?");
        let class = match dns.qclass.map(|c| c & 0x7fff) {
            Some(1) => "IN".to_string(),
            Some(c) => format!("{}", c),
            None => "?".to_string(),
        };
        fields.push(format!("Query: {}: type {}, class {}", name, qtype, class));
    }
    push_section(details, title, fields);
}
