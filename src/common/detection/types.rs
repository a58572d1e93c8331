//! Package kind enumeration.

use crate::ole::consts::{CLSID_MSI_DATABASE, CLSID_MSI_PATCH, CLSID_MSI_TRANSFORM};
use crate::ole::Clsid;

/// Windows Installer package flavours, told apart by the root storage CLSID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// Installer database (.msi) or merge module (.msm)
    Installer,
    /// Patch package (.msp)
    Patch,
    /// Database transform (.mst)
    Transform,
    /// Any other compound file
    Other,
}

impl PackageKind {
    pub fn from_clsid(clsid: &Clsid) -> Self {
        let text = clsid.to_string();
        match text.as_str() {
            CLSID_MSI_DATABASE => PackageKind::Installer,
            CLSID_MSI_PATCH => PackageKind::Patch,
            CLSID_MSI_TRANSFORM => PackageKind::Transform,
            _ => PackageKind::Other,
        }
    }

    /// Customary file extension, without the dot.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            PackageKind::Installer => Some("msi"),
            PackageKind::Patch => Some("msp"),
            PackageKind::Transform => Some("mst"),
            PackageKind::Other => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clsid(first: u32) -> Clsid {
        let mut bytes = [0u8; 16];
        bytes[..4].copy_from_slice(&first.to_le_bytes());
        bytes[8] = 0xC0;
        bytes[15] = 0x46;
        Clsid::from_bytes(bytes)
    }

    #[test]
    fn test_from_clsid() {
        assert_eq!(PackageKind::from_clsid(&clsid(0x000C1084)), PackageKind::Installer);
        assert_eq!(PackageKind::from_clsid(&clsid(0x000C1086)), PackageKind::Patch);
        assert_eq!(PackageKind::from_clsid(&clsid(0x000C1082)), PackageKind::Transform);
        assert_eq!(PackageKind::from_clsid(&Clsid::default()), PackageKind::Other);
    }

    #[test]
    fn test_extension() {
        assert_eq!(PackageKind::Patch.extension(), Some("msp"));
        assert_eq!(PackageKind::Other.extension(), None);
    }
}
