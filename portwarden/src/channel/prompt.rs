//! Prompt detection and output cleanup for Cisco-family CLIs.
//!
//! IOS, NX-OS, and OS9 share the same prompt shape:
//!
//! ```text
//! sw1>                     # user exec
//! sw1#                     # privileged exec
//! sw1(config)#             # global configuration
//! sw1(config-if)#          # interface configuration
//! ```

use memchr::{memchr, memrchr};
use regex::bytes::Regex;

/// Any exec or configuration prompt at the end of a line.
pub const PROMPT_PATTERN: &str = r"(?m)^[\w.\-@/: ]{1,63}(?:\([\w.\-@/:+]{0,63}\))?[>#]\s?$";

/// Password prompt shown by `enable`.
pub const PASSWORD_PATTERN: &str = r"(?mi)^\s*password:\s?$";

/// Text the devices print when they refuse a line.
const FAILURE_MARKERS: &[&str] = &[
    "% Invalid input",
    "% Invalid command",
    "% Incomplete command",
    "% Ambiguous command",
    "% Error",
    "% Bad parameter",
    "% Permission denied",
];

/// Compiled prompt patterns.
#[derive(Debug, Clone)]
pub struct PromptPatterns {
    pub prompt: Regex,
    pub password: Regex,
}

impl PromptPatterns {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            prompt: Regex::new(PROMPT_PATTERN)?,
            password: Regex::new(PASSWORD_PATTERN)?,
        })
    }
}

/// True for a `host>` user-exec prompt.
pub fn is_user_exec(prompt: &str) -> bool {
    prompt.trim_end().ends_with('>')
}

/// Last line of `raw`, which holds the prompt after a completed read.
pub fn last_line(raw: &[u8]) -> String {
    let trimmed = trim_trailing_newlines(raw);
    let start = memrchr(b'\n', trimmed).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&trimmed[start..]).trim().to_string()
}

/// Strip the command echo and the trailing prompt from a command response.
pub fn normalize_output(raw: &[u8], command: &str) -> String {
    let mut body = trim_trailing_newlines(raw);

    // Drop the prompt line
    body = match memrchr(b'\n', body) {
        Some(pos) => &body[..pos],
        None => &[],
    };

    // Drop the echoed command line
    if let Some(pos) = memchr(b'\n', body) {
        let first = String::from_utf8_lossy(&body[..pos]);
        if first.trim_end().ends_with(command.trim()) {
            body = &body[pos + 1..];
        }
    } else if String::from_utf8_lossy(body).trim_end().ends_with(command.trim()) {
        body = &[];
    }

    String::from_utf8_lossy(body)
        .replace('\r', "")
        .trim_end()
        .to_string()
}

/// First device error marker found in `output`.
pub fn detect_failure(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| FAILURE_MARKERS.iter().any(|m| line.starts_with(m)))
        .map(str::to_string)
}

fn trim_trailing_newlines(raw: &[u8]) -> &[u8] {
    let end = raw
        .iter()
        .rposition(|&b| !matches!(b, b'\r' | b'\n' | b' '))
        .map_or(0, |i| i + 1);
    &raw[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_shapes() {
        let patterns = PromptPatterns::new().unwrap();
        for prompt in [
            "sw-access-01>",
            "sw-access-01#",
            "sw-access-01(config)#",
            "leaf-01(config-if)# ",
            "leaf1-1(conf-if-te-1/4)#",
        ] {
            assert!(patterns.prompt.is_match(prompt.as_bytes()), "{prompt}");
        }
        assert!(!patterns.prompt.is_match(b"Gi1/0/3  err-disabled 20  auto"));
    }

    #[test]
    fn test_prompt_found_after_output() {
        let patterns = PromptPatterns::new().unwrap();
        let raw = b"show clock\r\n*10:02:11.123 UTC Mon Oct 19 2026\r\nsw1#";
        assert!(patterns.prompt.is_match(raw));
        assert_eq!(last_line(raw), "sw1#");
    }

    #[test]
    fn test_password_prompt() {
        let patterns = PromptPatterns::new().unwrap();
        assert!(patterns.password.is_match(b"enable\r\nPassword: "));
    }

    #[test]
    fn test_user_exec() {
        assert!(is_user_exec("sw1>"));
        assert!(!is_user_exec("sw1#"));
    }

    #[test]
    fn test_normalize_strips_echo_and_prompt() {
        let raw = b"show interfaces status | include err-disabled\r\n\
Gi1/0/3                      err-disabled 20  auto  auto 10/100/1000BaseTX\r\n\
sw1#";
        let out = normalize_output(raw, "show interfaces status | include err-disabled");
        assert_eq!(
            out,
            "Gi1/0/3                      err-disabled 20  auto  auto 10/100/1000BaseTX"
        );
    }

    #[test]
    fn test_normalize_empty_result() {
        let raw = b"show interfaces status | include err-disabled\r\nsw1#";
        assert_eq!(
            normalize_output(raw, "show interfaces status | include err-disabled"),
            ""
        );
    }

    #[test]
    fn test_detect_failure() {
        let output = "interface Gi1/0/99\n          ^\n% Invalid input detected at '^' marker.";
        assert_eq!(
            detect_failure(output).as_deref(),
            Some("% Invalid input detected at '^' marker.")
        );
        assert!(detect_failure("Gi1/0/3 err-disabled").is_none());
    }
}
