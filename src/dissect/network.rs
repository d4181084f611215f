use std::net::{Ipv4Addr, Ipv6Addr};

use super::cursor::{be_u16, be_u32, Cursor};
use super::format::{ip_protocol_name, push_section};
use super::packet::{ArpHeader, Ipv4Header, Ipv6Header, MacAddr, Malformed, MalformedReason};

pub const IPV4_MIN_HEADER_LEN: usize = 20;
pub const IPV6_HEADER_LEN: usize = 40;
pub const ARP_LEN: usize = 28;

const EXT_HOP_BY_HOP: u8 = 0;
const EXT_ROUTING: u8 = 43;
const EXT_FRAGMENT: u8 = 44;
const EXT_DEST_OPTS: u8 = 60;

// ── IPv4 ────────────────────────────────────────────────────

pub fn parse_ipv4(cursor: &mut Cursor<'_>) -> Result<Ipv4Header, Malformed> {
    cursor.require("IPv4", IPV4_MIN_HEADER_LEN)?;
    let fixed = cursor.rest();
    let version = fixed[0] >> 4;
    if version != 4 {
        return Err(Malformed { layer: "IPv4", reason: MalformedReason::InvalidVersion(version) });
    }
    let ihl = fixed[0] & 0x0f;
    let header_len = ihl as usize * 4;
    if ihl < 5 {
        return Err(Malformed { layer: "IPv4", reason: MalformedReason::InvalidHeaderLength(header_len) });
    }
    let b = cursor.take_for("IPv4", header_len)?;
    Ok(Ipv4Header {
        ihl,
        tos: b[1],
        total_length: be_u16(b, 2),
        identification: be_u16(b, 4),
        flags_fragment: be_u16(b, 6),
        ttl: b[8],
        protocol: b[9],
        checksum: be_u16(b, 10),
        src: Ipv4Addr::new(b[12], b[13], b[14], b[15]),
        dst: Ipv4Addr::new(b[16], b[17], b[18], b[19]),
        options: b[IPV4_MIN_HEADER_LEN..].to_vec(),
    })
}

pub fn describe_ipv4(ip: &Ipv4Header, details: &mut Vec<String>) {
    let flags = ip.flags_fragment >> 13;
    let mut fields = vec![
        format!("Header Length: {} bytes ({})", ip.header_len(), ip.ihl),
        format!("Differentiated Services: 0x{:02x}", ip.tos),
        format!("Total Length: {}", ip.total_length),
        format!("Identification: 0x{:04x} ({})", ip.identification, ip.identification),
        format!(
            "Flags: 0x{:x}{}{}",
            flags,
            if flags & 0x2 != 0 { ", Don't fragment" } else { "" },
            if flags & 0x1 != 0 { ", More fragments" } else { "" },
        ),
        format!("Fragment Offset: {}", (ip.flags_fragment & 0x1fff) as u32 * 8),
        format!("Time to Live: {}", ip.ttl),
        format!("Protocol: {} ({})", ip_protocol_name(ip.protocol), ip.protocol),
        format!("Header Checksum: 0x{:04x}", ip.checksum),
        format!("Source Address: {}", ip.src),
        format!("Destination Address: {}", ip.dst),
    ];
    if !ip.options.is_empty() {
        fields.push(format!("Options: {} bytes", ip.options.len()));
    }
    push_section(details, format!("Internet Protocol Version 4, Src: {}, Dst: {}", ip.src, ip.dst), fields);
}

// ── IPv6 ────────────────────────────────────────────────────

/// Parses the fixed header and skips extension headers. On return the cursor
/// sits on the first byte of the header named by `next_header`.
pub fn parse_ipv6(cursor: &mut Cursor<'_>) -> Result<Ipv6Header, Malformed> {
    let b = cursor.take_for("IPv6", IPV6_HEADER_LEN)?;
    let version = b[0] >> 4;
    if version != 6 {
        return Err(Malformed { layer: "IPv6", reason: MalformedReason::InvalidVersion(version) });
    }
    let word = be_u32(b, 0);
    let mut src = [0u8; 16];
    let mut dst = [0u8; 16];
    src.copy_from_slice(&b[8..24]);
    dst.copy_from_slice(&b[24..40]);

    let mut next_header = b[6];
    let mut extensions = Vec::new();
    loop {
        let len = match next_header {
            EXT_HOP_BY_HOP | EXT_ROUTING | EXT_DEST_OPTS => {
                cursor.require("IPv6 extension", 2)?;
                (cursor.rest()[1] as usize + 1) * 8
            }
            EXT_FRAGMENT => 8,
            _ => break,
        };
        let ext = cursor.take_for("IPv6 extension", len)?;
        extensions.push(next_header);
        next_header = ext[0];
    }

    Ok(Ipv6Header {
        traffic_class: ((word >> 20) & 0xff) as u8,
        flow_label: word & 0x000f_ffff,
        payload_length: be_u16(b, 4),
        next_header,
        extensions,
        hop_limit: b[7],
        src: Ipv6Addr::from(src),
        dst: Ipv6Addr::from(dst),
    })
}

pub fn describe_ipv6(ip: &Ipv6Header, details: &mut Vec<String>) {
    let mut fields = vec![
        format!("Traffic Class: 0x{:02x}", ip.traffic_class),
        format!("Flow Label: 0x{:05x}", ip.flow_label),
        format!("Payload Length: {}", ip.payload_length),
        format!("Hop Limit: {}", ip.hop_limit),
        format!("Source Address: {}", ip.src),
        format!("Destination Address: {}", ip.dst),
    ];
    for ext in &ip.extensions {
        fields.push(format!("Extension Header: {} ({})", ip_protocol_name(*ext), ext));
    }
    fields.push(format!("Next Header: {} ({})", ip_protocol_name(ip.next_header), ip.next_header));
    push_section(details, format!("Internet Protocol Version 6, Src: {}, Dst: {}", ip.src, ip.dst), fields);
}

// ── ARP ─────────────────────────────────────────────────────

/// Ethernet/IPv4 ARP only. Any other hardware/protocol combination yields
/// `Ok(None)` and leaves the cursor in place.
pub fn parse_arp(cursor: &mut Cursor<'_>) -> Result<Option<ArpHeader>, Malformed> {
    cursor.require("ARP", ARP_LEN)?;
    let b = cursor.rest();
    let hardware_type = be_u16(b, 0);
    let protocol_type = be_u16(b, 2);
    if hardware_type != 1 || protocol_type != 0x0800 || b[4] != 6 || b[5] != 4 {
        return Ok(None);
    }
    let b = cursor.take_for("ARP", ARP_LEN)?;
    let mac = |at: usize| {
        let mut m = [0u8; 6];
        m.copy_from_slice(&b[at..at + 6]);
        MacAddr(m)
    };
    Ok(Some(ArpHeader {
        hardware_type,
        protocol_type,
        hardware_size: b[4],
        protocol_size: b[5],
        opcode: be_u16(b, 6),
        sender_mac: mac(8),
        sender_ip: Ipv4Addr::new(b[14], b[15], b[16], b[17]),
        target_mac: mac(18),
        target_ip: Ipv4Addr::new(b[24], b[25], b[26], b[27]),
    }))
}

pub fn describe_arp(arp: &ArpHeader, details: &mut Vec<String>) {
    let op = match arp.opcode {
        1 => "request",
        2 => "reply",
        _ => "unknown",
    };
    push_section(
        details,
        format!("Address Resolution Protocol ({})", op),
        [
            format!("Hardware type: Ethernet ({})", arp.hardware_type),
            format!("Protocol type: IPv4 (0x{:04x})", arp.protocol_type),
            format!("Hardware size: {}", arp.hardware_size),
            format!("Protocol size: {}", arp.protocol_size),
            format!("Opcode: {} ({})", op, arp.opcode),
            format!("Sender MAC address: {}", arp.sender_mac),
            format!("Sender IP address: {}", arp.sender_ip),
            format!("Target MAC address: {}", arp.target_mac),
            format!("Target IP address: {}", arp.target_ip),
        ],
    );
}
