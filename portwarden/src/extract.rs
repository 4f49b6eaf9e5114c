//! Interface extraction from free-text diagnostic output.
//!
//! Extraction is total: output with no qualifying names yields an empty
//! [`InterfaceSet`], which means the device is clean. Only session failures
//! travel on the error channel.

use std::fmt;

use indexmap::IndexSet;
use regex::Regex;
use serde::{Serialize, Serializer};

/// Compiled interface-name grammar with token anchoring.
///
/// A regex hit only counts when it is a whole token: the characters on either
/// side must be line edges, whitespace, or list punctuation. This keeps
/// `Uplink-to-Gi1/0/1` or `x/Gi1/0/1` from yielding `Gi1/0/1`.
#[derive(Clone)]
pub struct InterfacePattern {
    regex: Regex,
}

impl InterfacePattern {
    /// Compile a pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// The source pattern.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Iterate over anchored interface tokens in `text`.
    pub fn find_iter<'t>(&'t self, text: &'t str) -> impl Iterator<Item = &'t str> + 't {
        self.regex
            .find_iter(text)
            .filter(move |m| {
                let before = text[..m.start()].chars().next_back();
                let after = text[m.end()..].chars().next();
                before.is_none_or(opens_token) && after.is_none_or(closes_token)
            })
            .map(|m| m.as_str())
    }
}

impl fmt::Debug for InterfacePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InterfacePattern")
            .field(&self.regex.as_str())
            .finish()
    }
}

fn opens_token(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | ';' | '(' | '[' | '"' | '\'' | '|')
}

fn closes_token(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | ';' | ')' | ']' | '"' | '\'' | '|' | ':')
}

/// Distinct interface names in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct InterfaceSet {
    names: IndexSet<String>,
}

impl InterfaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name; returns `false` if it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}

// Order matters: two sets with the same names in a different order differ.
impl PartialEq for InterfaceSet {
    fn eq(&self, other: &Self) -> bool {
        self.names.iter().eq(other.names.iter())
    }
}

impl Eq for InterfaceSet {}

impl<'a> IntoIterator for &'a InterfaceSet {
    type Item = &'a String;
    type IntoIter = indexmap::set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for InterfaceSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

impl Serialize for InterfaceSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names.iter())
    }
}

/// Collect every interface token in `output`, de-duplicated in first-seen order.
pub fn extract(output: &str, pattern: &InterfacePattern) -> InterfaceSet {
    pattern.find_iter(output).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ios() -> InterfacePattern {
        InterfacePattern::new(crate::platform::vendors::cisco_ios::INTERFACE_PATTERN).unwrap()
    }

    #[test]
    fn test_empty_output_is_empty_set() {
        assert!(extract("", &ios()).is_empty());
        assert!(extract("\n\n   \n", &ios()).is_empty());
    }

    #[test]
    fn test_notconnect_alone_yields_nothing() {
        assert!(extract("notconnect", &ios()).is_empty());
        assert_eq!(
            extract("GigabitEthernet1/0/3   notconnect", &ios()).to_vec(),
            ["GigabitEthernet1/0/3"]
        );
    }

    #[test]
    fn test_duplicates_removed_in_first_seen_order() {
        let output = "\
Gi1/0/7   err-disabled
Gi1/0/3   err-disabled
Gi1/0/7   err-disabled
Gi1/0/3   err-disabled
Gi1/0/1   err-disabled";

        let found = extract(output, &ios());
        assert_eq!(found.len(), 3);
        assert_eq!(found.to_vec(), ["Gi1/0/7", "Gi1/0/3", "Gi1/0/1"]);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let output = "Te1/1/4 notconnect\nGi2/0/9 notconnect\nTe1/1/4 notconnect";
        let first = extract(output, &ios());
        for _ in 0..5 {
            assert_eq!(extract(output, &ios()), first);
        }
    }

    #[test]
    fn test_tokens_glued_to_other_text_rejected() {
        let output = "x/Gi1/0/1 Uplink-to-Gi1/0/2 Gi1/0/3abc (Gi1/0/4) Gi1/0/5,Gi1/0/6";
        assert_eq!(
            extract(output, &ios()).to_vec(),
            ["Gi1/0/4", "Gi1/0/5", "Gi1/0/6"]
        );
    }

    #[test]
    fn test_garbled_input_is_not_an_error() {
        let output = "\u{1b}[7m--More--\u{1b}[m \u{0}\u{0} %%%% 1/ /1 Gi/0";
        assert!(extract(output, &ios()).is_empty());
    }

    #[test]
    fn test_set_serializes_as_list() {
        let set: InterfaceSet = ["Eth1/1", "Eth1/2", "Eth1/1"].into_iter().collect();
        assert_eq!(
            serde_json::to_string(&set).unwrap(),
            r#"["Eth1/1","Eth1/2"]"#
        );
    }
}
