fn main() {
    #[cfg(target_os = "windows")]
    npcap::link_search();
}

/// Windows builds link against wpcap.lib from the Npcap SDK. Elsewhere the
/// pcap crate finds the system libpcap on its own.
#[cfg(target_os = "windows")]
mod npcap {
    use std::path::PathBuf;

    pub fn link_search() {
        println!("cargo:rerun-if-env-changed=LIBPCAP_LIBDIR");
        println!("cargo:rerun-if-env-changed=NPCAP_SDK");

        // The pcap crate handles an explicit LIBPCAP_LIBDIR itself.
        if std::env::var_os("LIBPCAP_LIBDIR").is_some() {
            return;
        }

        let arch = match std::env::var("CARGO_CFG_TARGET_ARCH").as_deref() {
            Ok("x86") => "x86",
            Ok("aarch64") => "ARM64",
            _ => "x64",
        };

        let mut candidates = Vec::new();
        if let Some(sdk) = std::env::var_os("NPCAP_SDK") {
            candidates.push(PathBuf::from(sdk).join("Lib").join(arch));
        }
        candidates.push(PathBuf::from(format!("C:\\Npcap SDK\\Lib\\{arch}")));
        candidates.push(PathBuf::from(format!("C:\\npcap-sdk\\Lib\\{arch}")));
        if let Some(home) = std::env::var_os("USERPROFILE") {
            candidates.push(PathBuf::from(home).join("npcap-sdk").join("Lib").join(arch));
        }

        match candidates.iter().find(|dir| dir.join("wpcap.lib").exists()) {
            Some(dir) => println!("cargo:rustc-link-search=native={}", dir.display()),
            None => println!(
                "cargo:warning=Npcap SDK not found; install it from https://npcap.com/#download \
                 and set NPCAP_SDK to the extracted directory"
            ),
        }
    }
}
