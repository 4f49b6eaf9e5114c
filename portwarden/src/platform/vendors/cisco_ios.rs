//! Cisco IOS / IOS-XE command profile.
//!
//! # Diagnostic Output Examples
//!
//! ```text
//! sw-access-01#show interfaces status | include err-disabled
//! Gi1/0/3   Printer-3F         err-disabled 20           auto   auto 10/100/1000BaseTX
//! Gi1/0/17                     err-disabled 20           auto   auto 10/100/1000BaseTX
//!
//! sw-access-01#show interfaces status | include notconnect
//! Gi1/0/5                      notconnect   20           auto   auto 10/100/1000BaseTX
//! Te1/1/2                      notconnect   1            full    10G Not Present
//! ```

use crate::error::ConfigError;
use crate::extract::InterfacePattern;
use crate::platform::{CommandProfile, Intent, LineTemplate, Platform, RemediationPolicy};

/// Long (`GigabitEthernet1/0/3`) or short (`Gi1/0/3`) names, optional subinterface.
pub const INTERFACE_PATTERN: &str = r"\b[A-Z][A-Za-z]*\d+(?:/\d+)+(?:\.\d+)?";

/// Create the IOS profile.
pub fn profile(policy: &RemediationPolicy) -> Result<CommandProfile, ConfigError> {
    let (diagnostic, sequence) = match policy.intent {
        Intent::Recover => (
            "show interfaces status | include err-disabled",
            vec![
                LineTemplate::new("interface {interface}"),
                LineTemplate::new("shutdown"),
                LineTemplate::new("no shutdown"),
            ],
        ),
        Intent::Harden => (
            "show interfaces status | include notconnect",
            vec![
                LineTemplate::new("interface {interface}"),
                LineTemplate::new(format!("description {}", policy.description_tag)),
                LineTemplate::new("shutdown"),
            ],
        ),
    };

    let profile = CommandProfile::new(
        Platform::Ios,
        diagnostic,
        InterfacePattern::new(INTERFACE_PATTERN)?,
        sequence,
    )?;

    Ok(if policy.verify {
        profile.with_verify("show interfaces {interface} status")
    } else {
        profile
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;

    fn harden() -> RemediationPolicy {
        RemediationPolicy {
            intent: Intent::Harden,
            description_tag: "LIVRE".to_string(),
            verify: false,
        }
    }

    #[test]
    fn test_recover_sequence() {
        let profile = profile(&RemediationPolicy::default()).unwrap();
        assert_eq!(profile.platform, Platform::Ios);
        assert!(profile.diagnostic_command.contains("err-disabled"));
        assert_eq!(
            profile.remediation_lines("Gi1/0/3"),
            vec!["interface Gi1/0/3", "shutdown", "no shutdown"]
        );
        assert_eq!(
            profile.verify_line("Gi1/0/3").as_deref(),
            Some("show interfaces Gi1/0/3 status")
        );
    }

    #[test]
    fn test_harden_sequence() {
        let profile = profile(&harden()).unwrap();
        assert!(profile.diagnostic_command.contains("notconnect"));
        assert_eq!(
            profile.remediation_lines("GigabitEthernet1/0/5"),
            vec![
                "interface GigabitEthernet1/0/5",
                "description LIVRE",
                "shutdown"
            ]
        );
        assert!(profile.verify_command.is_none());
    }

    #[test]
    fn test_pattern_on_status_output() {
        let profile = profile(&harden()).unwrap();
        let output = "\
Gi1/0/5                      notconnect   20           auto   auto 10/100/1000BaseTX
Te1/1/2                      notconnect   1            full    10G Not Present
Gi1/0/9   Uplink-to-Gi2/0/1  notconnect   20           auto   auto 10/100/1000BaseTX";

        let found = extract(output, &profile.interface_pattern);
        assert_eq!(found.to_vec(), ["Gi1/0/5", "Te1/1/2", "Gi1/0/9"]);
    }

    #[test]
    fn test_pattern_rejects_near_misses() {
        let profile = profile(&harden()).unwrap();
        let pattern = &profile.interface_pattern;

        assert!(extract("notconnect", pattern).is_empty());
        assert!(extract("10/100/1000BaseTX 1/0/3 5/min", pattern).is_empty());
        assert_eq!(
            extract("GigabitEthernet1/0/3   notconnect", pattern).to_vec(),
            ["GigabitEthernet1/0/3"]
        );
    }

    #[test]
    fn test_pattern_on_interface_detail_output() {
        let profile = profile(&RemediationPolicy::default()).unwrap();
        let output = "\
GigabitEthernet1/0/3 is down, line protocol is down (err-disabled)
GigabitEthernet1/0/12.100 is down, line protocol is down (err-disabled)";

        let found = extract(output, &profile.interface_pattern);
        assert_eq!(
            found.to_vec(),
            ["GigabitEthernet1/0/3", "GigabitEthernet1/0/12.100"]
        );
    }
}
