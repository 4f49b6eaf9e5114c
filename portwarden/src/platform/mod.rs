//! Platform dialects, classification, and command profiles.
//!
//! A device's dialect is decided once per session from its `show version`
//! banner. The [`ProfileRegistry`] then maps the dialect to the diagnostic
//! command, interface grammar, and remediation sequence to use.

mod profile;
pub mod vendors;

pub use profile::{
    CommandProfile, Intent, LineTemplate, ProfileOverride, ProfileRegistry, RemediationPolicy,
};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Command used to read the banner fed to [`classify`].
pub const VERSION_COMMAND: &str = "show version";

/// Vendor dialect a device speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Cisco IOS / IOS-XE.
    Ios,
    /// Cisco NX-OS.
    Nxos,
    /// Dell Networking OS9 (FTOS).
    DellOs9,
    /// No known marker matched.
    Unknown,
}

impl Platform {
    /// All platforms that have a command profile.
    pub const SUPPORTED: [Platform; 3] = [Platform::Ios, Platform::Nxos, Platform::DellOs9];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Nxos => "nxos",
            Platform::DellOs9 => "dellos9",
            Platform::Unknown => "unknown",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Platform::Unknown)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "ios" | "iosxe" | "ciscoios" | "ciscoiosxe" => Ok(Platform::Ios),
            "nxos" | "cisconxos" => Ok(Platform::Nxos),
            "dellos9" | "ftos" | "dellforce10" => Ok(Platform::DellOs9),
            "unknown" => Ok(Platform::Unknown),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// Banner markers in priority order.
///
/// NX-OS banners mention "BIOS" and sometimes "IOS", so NX-OS is tested first
/// and every marker must stand as a whole word.
const MARKERS: &[(Platform, &[&str])] = &[
    // IOS XR shares the IOS marker but not its command dialect.
    (Platform::Unknown, &["IOS XR", "IOS-XR"]),
    (Platform::Nxos, &["NX-OS", "Nexus Operating System"]),
    (
        Platform::DellOs9,
        &[
            "Dell Networking OS",
            "Dell Operating System",
            "Dell Application Software",
            "Force10",
            "FTOS",
        ],
    ),
    (Platform::Ios, &["IOS", "IOS-XE"]),
];

/// Determine the dialect from raw `show version` output.
///
/// Returns [`Platform::Unknown`] when nothing matches. That is a normal
/// outcome, not an error: the caller skips the device.
pub fn classify(version_output: &str) -> Platform {
    MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| contains_word(version_output, m)))
        .map(|(platform, _)| *platform)
        .unwrap_or(Platform::Unknown)
}

/// Substring search that refuses matches glued to surrounding alphanumerics.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) const IOS_BANNER: &str = "\
Cisco IOS XE Software, Version 16.12.04
Cisco IOS Software [Gibraltar], Catalyst L3 Switch Software (CAT9K_IOSXE), Version 16.12.4, RELEASE SOFTWARE (fc5)
Technical Support: http://www.cisco.com/techsupport
ROM: IOS-XE ROMMON
BOOTLDR: System Bootstrap, Version 16.12.2r, RELEASE SOFTWARE (P)
sw-access-01 uptime is 12 weeks, 3 days, 2 hours, 11 minutes";

    pub(crate) const NXOS_BANNER: &str = "\
Cisco Nexus Operating System (NX-OS) Software
TAC support: http://www.cisco.com/tac
Software
  BIOS: version 07.69
  NXOS: version 9.3(8)
Hardware
  cisco Nexus9000 C93180YC-EX chassis";

    pub(crate) const DELL_BANNER: &str = "\
Dell Real Time Operating System Software
Dell Operating System Version: 2.0
Dell Application Software Version: 9.14(2.4)
Copyright (c) 1999-2019 by Dell Inc. All Rights Reserved.
Build Time: Thu Nov 7 04:26:02 2019
System Type: S4048-ON";

    #[test]
    fn test_classify_ios() {
        assert_eq!(classify(IOS_BANNER), Platform::Ios);
    }

    #[test]
    fn test_classify_nxos_before_ios() {
        // NX-OS banners carry "BIOS" and may carry "IOS"
        let banner = format!("{NXOS_BANNER}\n  IOS compatibility: none");
        assert_eq!(classify(&banner), Platform::Nxos);
        assert_eq!(classify(NXOS_BANNER), Platform::Nxos);
    }

    #[test]
    fn test_classify_dell_os9() {
        assert_eq!(classify(DELL_BANNER), Platform::DellOs9);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify(""), Platform::Unknown);
        assert_eq!(
            classify("Arista DCS-7050SX3-48YC8\nSoftware image version: 4.28.3M"),
            Platform::Unknown
        );
        // BIOS alone is not IOS
        assert_eq!(classify("BIOS version 1.2.3"), Platform::Unknown);
    }

    #[test]
    fn test_classify_ios_xr_unknown() {
        let banner = "\
Cisco IOS XR Software, Version 7.3.2
Copyright (c) 2013-2021 by Cisco Systems, Inc.
cisco ASR9K () processor";
        assert_eq!(classify(banner), Platform::Unknown);
        assert_eq!(classify("Cisco IOS-XR Software"), Platform::Unknown);
        assert_eq!(classify(IOS_BANNER), Platform::Ios);
    }

    #[test]
    fn test_platform_from_str() {
        assert_eq!("cisco-ios".parse::<Platform>(), Ok(Platform::Ios));
        assert_eq!("NX-OS".parse::<Platform>(), Ok(Platform::Nxos));
        assert_eq!("dellos9".parse::<Platform>(), Ok(Platform::DellOs9));
        assert!("junos".parse::<Platform>().is_err());
    }

    #[test]
    fn test_supported_platforms() {
        assert!(Platform::SUPPORTED.iter().all(Platform::is_supported));
        assert!(!Platform::Unknown.is_supported());
    }
}
