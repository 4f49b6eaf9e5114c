//! Cisco NX-OS command profile.
//!
//! # Diagnostic Output Examples
//!
//! ```text
//! leaf-01# show interface status | include xcvrAbsen
//! Eth1/5        --                 xcvrAbsen 1       auto    auto    --
//! Eth1/49       --                 xcvrAbsen routed  auto    auto    --
//! ```

use crate::error::ConfigError;
use crate::extract::InterfacePattern;
use crate::platform::{CommandProfile, Intent, LineTemplate, Platform, RemediationPolicy};

/// `Ethernet1/1`, `Eth1/1`, breakout `Eth1/49/2`, optional subinterface.
pub const INTERFACE_PATTERN: &str = r"\b[A-Z][A-Za-z]*\d+(?:/\d+)+(?:\.\d+)?";

/// Create the NX-OS profile.
pub fn profile(policy: &RemediationPolicy) -> Result<CommandProfile, ConfigError> {
    let (diagnostic, sequence) = match policy.intent {
        Intent::Recover => (
            "show interface status | include err-disabled",
            vec![
                LineTemplate::new("interface {interface}"),
                LineTemplate::new("shutdown"),
                LineTemplate::new("no shutdown"),
            ],
        ),
        Intent::Harden => (
            "show interface status | include xcvrAbsen",
            vec![
                LineTemplate::new("interface {interface}"),
                LineTemplate::new(format!("description {}", policy.description_tag)),
                LineTemplate::new("shutdown"),
            ],
        ),
    };

    let profile = CommandProfile::new(
        Platform::Nxos,
        diagnostic,
        InterfacePattern::new(INTERFACE_PATTERN)?,
        sequence,
    )?;

    Ok(if policy.verify {
        profile.with_verify("show interface {interface} status")
    } else {
        profile
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;

    #[test]
    fn test_harden_targets_absent_transceivers() {
        let policy = RemediationPolicy {
            intent: Intent::Harden,
            ..Default::default()
        };
        let profile = profile(&policy).unwrap();
        assert_eq!(profile.platform, Platform::Nxos);
        assert!(profile.diagnostic_command.ends_with("xcvrAbsen"));
        assert_eq!(
            profile.remediation_lines("Eth1/5"),
            vec!["interface Eth1/5", "description UNUSED", "shutdown"]
        );
    }

    #[test]
    fn test_pattern_on_status_output() {
        let profile = profile(&RemediationPolicy::default()).unwrap();
        let output = "\
Eth1/5        --                 xcvrAbsen 1       auto    auto    --
Eth1/49/2     --                 xcvrAbsen routed  auto    auto    --
Eth1/5        --                 xcvrAbsen 1       auto    auto    --";

        let found = extract(output, &profile.interface_pattern);
        assert_eq!(found.to_vec(), ["Eth1/5", "Eth1/49/2"]);
    }

    #[test]
    fn test_pattern_ignores_counters_and_words() {
        let profile = profile(&RemediationPolicy::default()).unwrap();
        let output = "mgmt0  --  connected  routed  full  1000  --\n 30 seconds input rate 0 bits/sec";
        assert!(extract(output, &profile.interface_pattern).is_empty());
    }
}
