//! Line-oriented merge of desired preferences into a preference file
//!
//! A recognized line has the shape `KEYWORD("<key>", <value>);`, optionally
//! surrounded by blanks or tabs. A trailing carriage return is tolerated so
//! CRLF files are recognized. Anything else is passed through untouched.

use std::collections::HashSet;

use regex::Regex;

use super::value::{PrefValue, PreferenceSet};
use crate::error::{PortalError, Result};

/// Format one assignment line
pub fn format_assignment(keyword: &str, key: &str, value: &PrefValue) -> String {
    format!("{}(\"{}\", {});", keyword, key, value)
}

/// Recognizes assignment lines for one keyword
#[derive(Debug, Clone)]
pub struct LineMatcher {
    keyword: String,
    pattern: Regex,
}

impl LineMatcher {
    pub fn new(keyword: &str) -> Result<Self> {
        if !is_identifier(keyword) {
            return Err(PortalError::InvalidPreference(format!(
                "keyword {:?} is not an identifier",
                keyword
            )));
        }
        let pattern = Regex::new(&format!(r#"^[ \t]*{}\("([^"]*)",[ \t]*.*\);[ \t\r]*$"#, keyword))
            .map_err(|e| PortalError::InvalidPreference(e.to_string()))?;

        Ok(Self {
            keyword: keyword.to_string(),
            pattern,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// The key of a recognized line
    pub fn key_of<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Merge `desired` into `content`.
///
/// Desired keys are rewritten where they already appear; later duplicates of
/// a rewritten key are dropped; missing keys are appended in set order.
/// Every output line ends with a newline.
pub fn merge_preferences(content: &str, matcher: &LineMatcher, desired: &PreferenceSet) -> String {
    let mut out = String::with_capacity(content.len() + desired.len() * 48);
    let mut seen: HashSet<&str> = HashSet::new();

    for line in content.split_terminator('\n') {
        if let Some(key) = matcher.key_of(line) {
            if let Some(value) = desired.get(key) {
                if seen.insert(key) {
                    out.push_str(&format_assignment(matcher.keyword(), key, value));
                    out.push('\n');
                }
                continue;
            }
        }
        out.push_str(line);
        out.push('\n');
    }

    for (key, value) in desired.iter() {
        if !seen.contains(key) {
            out.push_str(&format_assignment(matcher.keyword(), key, value));
            out.push('\n');
        }
    }

    out
}
