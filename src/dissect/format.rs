pub fn format_mac(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

pub fn tcp_flags(flags: u8) -> String {
    const NAMES: [(u8, &str); 6] = [
        (0x01, "FIN"),
        (0x02, "SYN"),
        (0x04, "RST"),
        (0x08, "PSH"),
        (0x10, "ACK"),
        (0x20, "URG"),
    ];
    let set: Vec<&str> = NAMES.iter().filter(|(bit, _)| flags & bit != 0).map(|(_, n)| *n).collect();
    if set.is_empty() { "NONE".into() } else { set.join(",") }
}

pub fn ip_protocol_name(proto: u8) -> String {
    match proto {
        0 => "Hop-by-Hop".into(),
        1 => "ICMP".into(),
        2 => "IGMP".into(),
        6 => "TCP".into(),
        17 => "UDP".into(),
        41 => "IPv6-encap".into(),
        43 => "IPv6-Route".into(),
        44 => "IPv6-Frag".into(),
        47 => "GRE".into(),
        50 => "ESP".into(),
        51 => "AH".into(),
        58 => "ICMPv6".into(),
        59 => "No Next Header".into(),
        60 => "IPv6-Opts".into(),
        89 => "OSPF".into(),
        132 => "SCTP".into(),
        _ => format!("Proto({})", proto),
    }
}

pub fn port_label(port: u16) -> &'static str {
    match port {
        20 => "FTP-Data",
        21 => "FTP",
        22 => "SSH",
        25 => "SMTP",
        53 => "DNS",
        67 => "DHCP-S",
        68 => "DHCP-C",
        80 => "HTTP",
        123 => "NTP",
        443 => "HTTPS",
        1900 => "SSDP",
        3306 => "MySQL",
        5353 => "mDNS",
        5432 => "PostgreSQL",
        6379 => "Redis",
        8080 => "HTTP-Alt",
        _ => "—",
    }
}

pub fn ether_type_name(ether_type: u16) -> &'static str {
    match ether_type {
        0x0800 => "IPv4",
        0x0806 => "ARP",
        0x86DD => "IPv6",
        0x8100 => "802.1Q",
        0x88A8 => "802.1ad",
        0x9100 => "802.1Q (legacy QinQ)",
        0x88CC => "LLDP",
        0x8863 | 0x8864 => "PPPoE",
        _ => "Unknown",
    }
}

pub fn icmp_type_name(icmp_type: u8, code: u8) -> String {
    match icmp_type {
        0 => "Echo Reply".into(),
        3 => {
            let reason = match code {
                0 => "Network Unreachable",
                1 => "Host Unreachable",
                2 => "Protocol Unreachable",
                3 => "Port Unreachable",
                4 => "Fragmentation Needed",
                13 => "Administratively Prohibited",
                _ => "Unreachable",
            };
            format!("Dest Unreachable: {}", reason)
        }
        5 => "Redirect".into(),
        8 => "Echo Request".into(),
        11 => {
            let reason = if code == 0 { "TTL Exceeded" } else { "Fragment Reassembly Exceeded" };
            format!("Time Exceeded: {}", reason)
        }
        _ => format!("Type {} Code {}", icmp_type, code),
    }
}

pub fn icmpv6_type_name(icmp_type: u8) -> String {
    match icmp_type {
        1 => "Dest Unreachable".into(),
        2 => "Packet Too Big".into(),
        3 => "Time Exceeded".into(),
        128 => "Echo Request".into(),
        129 => "Echo Reply".into(),
        133 => "Router Solicitation".into(),
        134 => "Router Advertisement".into(),
        135 => "Neighbor Solicitation".into(),
        136 => "Neighbor Advertisement".into(),
        _ => format!("Type {}", icmp_type),
    }
}

pub fn dns_type_name(qtype: u16) -> &'static str {
    match qtype {
        1 => "A",
        2 => "NS",
        5 => "CNAME",
        6 => "SOA",
        12 => "PTR",
        15 => "MX",
        16 => "TXT",
        28 => "AAAA",
        33 => "SRV",
        65 => "HTTPS",
        255 => "ANY",
        _ => "?",
    }
}

pub fn tls_version_name(major: u8, minor: u8) -> &'static str {
    match (major, minor) {
        (3, 0) => "SSL 3.0",
        (3, 1) => "TLS 1.0",
        (3, 2) => "TLS 1.1",
        (3, 3) => "TLS 1.2",
        (3, 4) => "TLS 1.3",
        _ => "TLS",
    }
}

pub fn tls_handshake_name(handshake_type: u8) -> String {
    match handshake_type {
        1 => "Client Hello".into(),
        2 => "Server Hello".into(),
        4 => "New Session Ticket".into(),
        8 => "Encrypted Extensions".into(),
        11 => "Certificate".into(),
        12 => "Server Key Exchange".into(),
        14 => "Server Hello Done".into(),
        16 => "Client Key Exchange".into(),
        20 => "Finished".into(),
        t => format!("Handshake type {}", t),
    }
}

/// Appends a titled section with indented field lines to a detail tree.
pub fn push_section<I>(details: &mut Vec<String>, title: impl Into<String>, fields: I)
where
    I: IntoIterator<Item = String>,
{
    details.push(title.into());
    details.extend(fields.into_iter().map(|f| format!("  {f}")));
}
