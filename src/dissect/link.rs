use super::cursor::{be_u16, Cursor};
use super::format::{ether_type_name, push_section};
use super::packet::{
    EthernetHeader, MacAddr, Malformed, VlanTag, ETHERTYPE_QINQ, ETHERTYPE_VLAN, ETHERTYPE_VLAN_LEGACY,
};

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const VLAN_TAG_LEN: usize = 4;

pub fn is_vlan_tpid(ether_type: u16) -> bool {
    matches!(ether_type, ETHERTYPE_VLAN | ETHERTYPE_QINQ | ETHERTYPE_VLAN_LEGACY)
}

pub fn parse_ethernet(cursor: &mut Cursor<'_>) -> Result<EthernetHeader, Malformed> {
    let b = cursor.take_for("Ethernet", ETHERNET_HEADER_LEN)?;
    let mut dst = [0u8; 6];
    let mut src = [0u8; 6];
    dst.copy_from_slice(&b[0..6]);
    src.copy_from_slice(&b[6..12]);
    Ok(EthernetHeader { dst: MacAddr(dst), src: MacAddr(src), ether_type: be_u16(b, 12) })
}

/// Reads the tag that follows an outer EtherType of `tpid`.
pub fn parse_vlan(tpid: u16, cursor: &mut Cursor<'_>) -> Result<VlanTag, Malformed> {
    let b = cursor.take_for("VLAN", VLAN_TAG_LEN)?;
    Ok(VlanTag { tpid, tci: be_u16(b, 0), ether_type: be_u16(b, 2) })
}

pub fn describe_ethernet(eth: &EthernetHeader, details: &mut Vec<String>) {
    push_section(
        details,
        format!("Ethernet II, Src: {}, Dst: {}", eth.src, eth.dst),
        [
            format!("Destination: {}", eth.dst),
            format!("Source: {}", eth.src),
            format!("Type: {} (0x{:04x})", ether_type_name(eth.ether_type), eth.ether_type),
        ],
    );
}

pub fn describe_vlan(tag: &VlanTag, details: &mut Vec<String>) {
    push_section(
        details,
        format!("802.1Q Virtual LAN, PRI: {}, ID: {}", tag.priority(), tag.vlan_id()),
        [
            format!("Priority: {}", tag.priority()),
            format!("DEI: {}", u8::from(tag.drop_eligible())),
            format!("ID: {}", tag.vlan_id()),
            format!("Type: {} (0x{:04x})", ether_type_name(tag.ether_type), tag.ether_type),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ethernet_fields() {
        let mut frame = vec![0xff; 6];
        frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        frame.extend_from_slice(&[0x08, 0x06]);
        let mut c = Cursor::new(&frame);
        let eth = parse_ethernet(&mut c).unwrap();
        assert_eq!(eth.dst.to_string(), "ff:ff:ff:ff:ff:ff");
        assert_eq!(eth.src.to_string(), "00:11:22:33:44:55");
        assert_eq!(eth.ether_type, 0x0806);
        assert_eq!(c.position(), ETHERNET_HEADER_LEN);
    }

    #[test]
    fn test_parse_ethernet_truncated() {
        let frame = [0u8; 13];
        let mut c = Cursor::new(&frame);
        assert_eq!(parse_ethernet(&mut c).unwrap_err(), Malformed::truncated("Ethernet", 14, 13));
    }

    #[test]
    fn test_vlan_tpids() {
        assert!(is_vlan_tpid(0x8100));
        assert!(is_vlan_tpid(0x88A8));
        assert!(is_vlan_tpid(0x9100));
        assert!(!is_vlan_tpid(0x0800));
    }

    #[test]
    fn test_parse_vlan() {
        let tag_bytes = [0x20, 0x0a, 0x86, 0xdd];
        let mut c = Cursor::new(&tag_bytes);
        let tag = parse_vlan(0x8100, &mut c).unwrap();
        assert_eq!(tag.priority(), 1);
        assert_eq!(tag.vlan_id(), 10);
        assert_eq!(tag.ether_type, 0x86dd);
    }
}
