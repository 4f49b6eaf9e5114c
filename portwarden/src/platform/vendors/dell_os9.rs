//! Dell Networking OS9 (FTOS) command profile.
//!
//! OS9 separates the interface type from its slot/port with a space, and the
//! same spelling is accepted back in `interface` configuration lines.
//!
//! # Diagnostic Output Examples
//!
//! ```text
//! leaf1-1#show interfaces | grep "line protocol is down"
//! TenGigabitEthernet 1/4 is down, line protocol is down
//! fortyGigE 1/49 is down, line protocol is down
//! ```

use crate::error::ConfigError;
use crate::extract::InterfacePattern;
use crate::platform::{CommandProfile, Intent, LineTemplate, Platform, RemediationPolicy};

/// `TenGigabitEthernet 1/4`, `fortyGigE 1/49`, `Te 0/1`.
pub const INTERFACE_PATTERN: &str = r"\b[A-Za-z][A-Za-z]* ?\d+(?:/\d+)+(?:\.\d+)?";

/// Create the OS9 profile.
pub fn profile(policy: &RemediationPolicy) -> Result<CommandProfile, ConfigError> {
    let (diagnostic, sequence) = match policy.intent {
        Intent::Recover => (
            r#"show interfaces | grep "error-disabled""#,
            vec![
                LineTemplate::new("interface {interface}"),
                LineTemplate::new("shutdown"),
                LineTemplate::new("no shutdown"),
            ],
        ),
        Intent::Harden => (
            r#"show interfaces | grep "line protocol is down""#,
            vec![
                LineTemplate::new("interface {interface}"),
                LineTemplate::new(format!("description {}", policy.description_tag)),
                LineTemplate::new("shutdown"),
            ],
        ),
    };

    let profile = CommandProfile::new(
        Platform::DellOs9,
        diagnostic,
        InterfacePattern::new(INTERFACE_PATTERN)?,
        sequence,
    )?;

    Ok(if policy.verify {
        profile.with_verify("show interfaces {interface} brief")
    } else {
        profile
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;

    #[test]
    fn test_spaced_interface_names() {
        let profile = profile(&RemediationPolicy::default()).unwrap();
        let output = "\
TenGigabitEthernet 1/4 is down, line protocol is down
fortyGigE 1/49 is down, line protocol is down
TenGigabitEthernet 1/4 is down, line protocol is down";

        let found = extract(output, &profile.interface_pattern);
        assert_eq!(found.to_vec(), ["TenGigabitEthernet 1/4", "fortyGigE 1/49"]);
        assert_eq!(
            profile.remediation_lines("fortyGigE 1/49")[0],
            "interface fortyGigE 1/49"
        );
    }

    #[test]
    fn test_recover_sequence() {
        let profile = profile(&RemediationPolicy::default()).unwrap();
        assert_eq!(profile.platform, Platform::DellOs9);
        assert_eq!(
            profile.remediation_lines("Te 0/1"),
            vec!["interface Te 0/1", "shutdown", "no shutdown"]
        );
    }
}
