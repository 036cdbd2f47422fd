//! Debugger Statement Rule

use crate::detectors::base::TraitRule;
use crate::detectors::masking::MaskedSource;
use crate::models::{Issue, IssueKind};
use regex::Regex;
use std::sync::OnceLock;

static DEBUGGER: OnceLock<Regex> = OnceLock::new();

fn debugger() -> &'static Regex {
    DEBUGGER.get_or_init(|| Regex::new(r"(^|[^\w$.])debugger\b").expect("valid regex"))
}

pub struct DebuggerStatementRule;

impl TraitRule for DebuggerStatementRule {
    fn kind(&self) -> IssueKind {
        IssueKind::DebuggerStatement
    }

    fn check(&self, source: &MaskedSource<'_>, out: &mut Vec<Issue>) {
        for line in &source.lines {
            if debugger().is_match(&line.code) {
                out.push(Issue::new(
                    self.kind(),
                    line.number,
                    "remove the debugger statement",
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
    fn test_flags_debugger_keyword_only() {
        let mut out = Vec::new();
        DebuggerStatementRule.check(
            &mask_source("debugger;\nlet debuggerEnabled = true;\nconfig.debugger = 1;\n// debugger"),
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].line, Some(1));
    }
}
