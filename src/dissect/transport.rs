use super::cursor::{be_u16, be_u32, Cursor};
use super::format::{port_label, push_section, tcp_flags};
use super::packet::{
    IcmpEcho, IcmpHeader, IcmpVersion, Malformed, MalformedReason, TcpHeader, TcpTimestamp, UdpHeader,
};

pub const TCP_MIN_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;
pub const ICMP_MIN_LEN: usize = 4;
pub const ICMP_ECHO_LEN: usize = 8;

const OPT_EOL: u8 = 0;
const OPT_NOP: u8 = 1;
const OPT_MSS: u8 = 2;
const OPT_WINDOW_SCALE: u8 = 3;
const OPT_SACK_PERMITTED: u8 = 4;
const OPT_TIMESTAMP: u8 = 8;

// ── TCP ─────────────────────────────────────────────────────

pub fn parse_tcp(cursor: &mut Cursor<'_>) -> Result<TcpHeader, Malformed> {
    cursor.require("TCP", TCP_MIN_HEADER_LEN)?;
    let data_offset = cursor.rest()[12] >> 4;
    let header_len = data_offset as usize * 4;
    if data_offset < 5 {
        return Err(Malformed { layer: "TCP", reason: MalformedReason::InvalidHeaderLength(header_len) });
    }
    let b = cursor.take_for("TCP", header_len)?;
    let mut tcp = TcpHeader {
        src_port: be_u16(b, 0),
        dst_port: be_u16(b, 2),
        seq: be_u32(b, 4),
        ack: be_u32(b, 8),
        data_offset,
        flags: b[13],
        window: be_u16(b, 14),
        checksum: be_u16(b, 16),
        urgent_pointer: be_u16(b, 18),
        options: b[TCP_MIN_HEADER_LEN..].to_vec(),
        timestamp: None,
        mss: None,
        window_scale: None,
        sack_permitted: false,
    };
    walk_options(&mut tcp);
    Ok(tcp)
}

/// EOL ends the list, NOP is a single byte, everything else is
/// kind/length/value. A length under 2 or past the option area stops the walk.
fn walk_options(tcp: &mut TcpHeader) {
    let opts = std::mem::take(&mut tcp.options);
    let mut i = 0;
    while i < opts.len() {
        let kind = opts[i];
        match kind {
            OPT_EOL => break,
            OPT_NOP => {
                i += 1;
                continue;
            }
            _ => {}
        }
        let Some(&len) = opts.get(i + 1) else { break };
        let len = len as usize;
        if len < 2 || i + len > opts.len() {
            break;
        }
        let body = &opts[i + 2..i + len];
        match (kind, len) {
            (OPT_MSS, 4) => tcp.mss = Some(be_u16(body, 0)),
            (OPT_WINDOW_SCALE, 3) => tcp.window_scale = Some(body[0]),
            (OPT_SACK_PERMITTED, 2) => tcp.sack_permitted = true,
            (OPT_TIMESTAMP, 10) => {
                tcp.timestamp = Some(TcpTimestamp { value: be_u32(body, 0), echo_reply: be_u32(body, 4) })
            }
            _ => {}
        }
        i += len;
    }
    tcp.options = opts;
}

pub fn describe_tcp(tcp: &TcpHeader, payload_len: usize, details: &mut Vec<String>) {
    let mut fields = vec![
        format!("Source Port: {} ({})", tcp.src_port, port_label(tcp.src_port)),
        format!("Destination Port: {} ({})", tcp.dst_port, port_label(tcp.dst_port)),
        format!("Sequence Number: {}", tcp.seq),
        format!("Acknowledgment Number: {}", tcp.ack),
        format!("Header Length: {} bytes ({})", tcp.header_len(), tcp.data_offset),
        format!("Flags: 0x{:03x} ({})", tcp.flags, tcp_flags(tcp.flags)),
        format!("Window: {}", tcp.window),
        format!("Checksum: 0x{:04x}", tcp.checksum),
        format!("Urgent Pointer: {}", tcp.urgent_pointer),
    ];
    if !tcp.options.is_empty() {
        fields.push(format!("Options: {} bytes", tcp.options.len()));
    }
    if let Some(mss) = tcp.mss {
        fields.push(format!("  Maximum segment size: {} bytes", mss));
    }
    if let Some(ws) = tcp.window_scale {
        fields.push(format!("  Window scale: {} (multiply by {})", ws, 1u32 << ws.min(14)));
    }
    if tcp.sack_permitted {
        fields.push("  SACK permitted".to_string());
    }
    if let Some(ts) = tcp.timestamp {
        fields.push(format!("  Timestamps: TSval {}, TSecr {}", ts.value, ts.echo_reply));
    }
    fields.push(format!("TCP payload: {} bytes", payload_len));
    push_section(
        details,
        format!("Transmission Control Protocol, Src Port: {}, Dst Port: {}", tcp.src_port, tcp.dst_port),
        fields,
    );
}

// ── UDP ─────────────────────────────────────────────────────

pub fn parse_udp(cursor: &mut Cursor<'_>) -> Result<UdpHeader, Malformed> {
    let b = cursor.take_for("UDP", UDP_HEADER_LEN)?;
    Ok(UdpHeader {
        src_port: be_u16(b, 0),
        dst_port: be_u16(b, 2),
        length: be_u16(b, 4),
        checksum: be_u16(b, 6),
    })
}

pub fn describe_udp(udp: &UdpHeader, details: &mut Vec<String>) {
    push_section(
        details,
        format!("User Datagram Protocol, Src Port: {}, Dst Port: {}", udp.src_port, udp.dst_port),
        [
            format!("Source Port: {} ({})", udp.src_port, port_label(udp.src_port)),
            format!("Destination Port: {} ({})", udp.dst_port, port_label(udp.dst_port)),
            format!("Length: {}", udp.length),
            format!("Checksum: 0x{:04x}", udp.checksum),
        ],
    );
}

// ── ICMP / ICMPv6 ───────────────────────────────────────────

fn is_echo(version: IcmpVersion, icmp_type: u8) -> bool {
    match version {
        IcmpVersion::V4 => matches!(icmp_type, 0 | 8),
        IcmpVersion::V6 => matches!(icmp_type, 128 | 129),
    }
}

pub fn parse_icmp(cursor: &mut Cursor<'_>, version: IcmpVersion) -> Result<IcmpHeader, Malformed> {
    let layer = match version {
        IcmpVersion::V4 => "ICMP",
        IcmpVersion::V6 => "ICMPv6",
    };
    cursor.require(layer, ICMP_MIN_LEN)?;
    let icmp_type = cursor.rest()[0];
    let echo = is_echo(version, icmp_type);
    let b = cursor.take_for(layer, if echo { ICMP_ECHO_LEN } else { ICMP_MIN_LEN })?;
    Ok(IcmpHeader {
        version,
        icmp_type,
        code: b[1],
        checksum: be_u16(b, 2),
        echo: echo.then(|| IcmpEcho { identifier: be_u16(b, 4), sequence: be_u16(b, 6) }),
    })
}

pub fn describe_icmp(icmp: &IcmpHeader, details: &mut Vec<String>) {
    let title = match icmp.version {
        IcmpVersion::V4 => "Internet Control Message Protocol",
        IcmpVersion::V6 => "Internet Control Message Protocol v6",
    };
    let mut fields = vec![
        format!("Type: {} ({})", icmp.icmp_type, icmp.type_name()),
        format!("Code: {}", icmp.code),
        format!("Checksum: 0x{:04x}", icmp.checksum),
    ];
    if let Some(echo) = icmp.echo {
        fields.push(format!("Identifier: {} (0x{:04x})", echo.identifier, echo.identifier));
        fields.push(format!("Sequence Number: {}", echo.sequence));
    }
    push_section(details, title, fields);
}
