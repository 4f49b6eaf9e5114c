//! Built-in vendor command profiles.
//!
//! Each module returns the [`CommandProfile`](super::CommandProfile) for one
//! dialect under a given [`RemediationPolicy`](super::RemediationPolicy).
//! New dialects are added here and wired into the registry.

pub mod cisco_ios;
pub mod cisco_nxos;
pub mod dell_os9;
