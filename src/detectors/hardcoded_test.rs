//! Hardcoded Test Value Rule
//!
//! Placeholder literals ("test", "foo", "asdf", 12345...) that were typed in
//! while trying a function out and never replaced with real data.

use crate::detectors::base::TraitRule;
use crate::detectors::masking::MaskedSource;
use crate::models::{Issue, IssueKind};
use regex::Regex;
use std::sync::OnceLock;

const PLACEHOLDER_STRINGS: &[&str] = &[
    "test",
    "testing",
    "test123",
    "dummy",
    "foo",
    "bar",
    "baz",
    "foobar",
    "asdf",
    "qwerty",
    "placeholder",
    "changeme",
    "fake",
    "john doe",
    "test@test.com",
    "test@example.com",
    "password123",
];

static PLACEHOLDER_NUMBER: OnceLock<Regex> = OnceLock::new();

fn placeholder_number() -> &'static Regex {
    PLACEHOLDER_NUMBER.get_or_init(|| {
        Regex::new(r"(^|[^\w$.])(12345|123456|1234567|99999|999999)\b").expect("valid regex")
    })
}

/// Whether a string literal's contents look like placeholder data
pub fn is_placeholder(literal: &str) -> bool {
    let value = literal.trim().to_lowercase();
    if value.is_empty() {
        return false;
    }
    PLACEHOLDER_STRINGS.contains(&value.as_str())
        || value.starts_with("lorem ipsum")
        || (value.len() >= 3 && value.chars().all(|c| c == 'x'))
}

pub struct HardcodedTestRule;

impl TraitRule for HardcodedTestRule {
    fn kind(&self) -> IssueKind {
        IssueKind::HardcodedTest
    }

    fn check(&self, source: &MaskedSource<'_>, out: &mut Vec<Issue>) {
        for line in &source.lines {
            let literal = line
                .literals
                .iter()
                .find(|l| is_placeholder(l))
                .map(|l| format!("\"{}\"", l.trim()));
            let number = || {
                placeholder_number()
                    .captures(&line.code)
                    .map(|caps| caps[2].to_string())
            };
            if let Some(value) = literal.or_else(number) {
                out.push(Issue::new(
                    self.kind(),
                    line.number,
                    format!("{} looks like test data", value),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::masking::mask_source;

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder("test"));
        assert!(is_placeholder(" FOO "));
        assert!(is_placeholder("xxxx"));
        assert!(is_placeholder("Lorem ipsum dolor"));
        assert!(!is_placeholder("temperature"));
        assert!(!is_placeholder(""));
    }

    #[test]
    fn test_one_issue_per_line() {
        let src = "msg.user = 'test'; msg.name = 'foo';\nmsg.id = 12345;\nmsg.port = 1883;";
        let mut out = Vec::new();
        HardcodedTestRule.check(&mask_source(src), &mut out);
        assert_eq!(out.len(), 2);
        assert!(out[0].message.contains("\"test\""));
        assert!(out[1].message.contains("12345"));
    }
}
