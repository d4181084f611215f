use crate::error::CaptureError;

pub const NO_DESCRIPTION: &str = "(No description)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub description: String,
}

/// Capture-capable devices in libpcap's order.
pub fn list_interfaces() -> Result<Vec<InterfaceInfo>, CaptureError> {
    let devices = pcap::Device::list().map_err(|e| CaptureError::DeviceList(e.to_string()))?;
    Ok(devices
        .into_iter()
        .map(|dev| InterfaceInfo { name: dev.name, description: describe(dev.desc) })
        .collect())
}

fn describe(desc: Option<String>) -> String {
    desc.filter(|d| !d.trim().is_empty()).unwrap_or_else(|| NO_DESCRIPTION.to_string())
}

/// On Windows, pcap needs the `\Device\NPF_{GUID}` name rather than the
/// friendly name ("Ethernet", "Wi-Fi") that ipconfig reports. Friendly names
/// are matched against device descriptions. Elsewhere this is the identity.
pub fn resolve_device_name(friendly: &str) -> String {
    #[cfg(not(target_os = "windows"))]
    {
        friendly.to_string()
    }

    #[cfg(target_os = "windows")]
    {
        if friendly.starts_with("\\Device\\") || friendly.starts_with("\\\\") {
            return friendly.to_string();
        }
        let Ok(devices) = pcap::Device::list() else {
            return friendly.to_string();
        };
        let wanted = friendly.to_lowercase();
        devices
            .into_iter()
            .find(|dev| dev.desc.as_deref().is_some_and(|d| d.to_lowercase().contains(&wanted)))
            .map(|dev| dev.name)
            .unwrap_or_else(|| friendly.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_description_defaults() {
        assert_eq!(describe(None), NO_DESCRIPTION);
        assert_eq!(describe(Some("   ".into())), NO_DESCRIPTION);
        assert_eq!(describe(Some("Loopback".into())), "Loopback");
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_resolve_is_identity_off_windows() {
        assert_eq!(resolve_device_name("eth0"), "eth0");
    }
}
