//! Console Logging Rule
//!
//! Flags `console.*` output calls left in a unit. Matches run against the
//! masked code, so text inside strings and comments never triggers.

use crate::detectors::base::TraitRule;
use crate::detectors::masking::MaskedSource;
use crate::models::{Issue, IssueKind};
use regex::Regex;
use std::sync::OnceLock;

static CONSOLE_CALL: OnceLock<Regex> = OnceLock::new();

fn console_call() -> &'static Regex {
    CONSOLE_CALL.get_or_init(|| {
        Regex::new(r"\bconsole\s*\.\s*(log|info|debug|warn|error|trace|dir|table)\s*\(")
            .expect("valid regex")
    })
}

pub struct ConsoleLogRule;

impl TraitRule for ConsoleLogRule {
    fn kind(&self) -> IssueKind {
        IssueKind::ConsoleLog
    }

    fn check(&self, source: &MaskedSource<'_>, out: &mut Vec<Issue>) {
        for line in &source.lines {
            for caps in console_call().captures_iter(&line.code) {
                out.push(Issue::new(
                    self.kind(),
                    line.number,
                    format!("remove console.{}() before deploying", &caps[1]),
                ));
            }
        }
    }
}
