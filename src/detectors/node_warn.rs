//! Host Debug Call Rule
//!
//! Flags `node.warn()`, `node.debug()` and `node.trace()`: calls that push
//! messages into the host's debug sidebar and are usually leftovers from
//! troubleshooting a flow.

use crate::detectors::base::TraitRule;
use crate::detectors::masking::MaskedSource;
use crate::models::{Issue, IssueKind};
use regex::Regex;
use std::sync::OnceLock;

static HOST_DEBUG_CALL: OnceLock<Regex> = OnceLock::new();

fn host_debug_call() -> &'static Regex {
    HOST_DEBUG_CALL.get_or_init(|| {
        Regex::new(r"\bnode\s*\.\s*(warn|debug|trace)\s*\(").expect("valid regex")
    })
}

pub struct NodeWarnRule;

impl TraitRule for NodeWarnRule {
    fn kind(&self) -> IssueKind {
        IssueKind::NodeWarn
    }

    fn check(&self, source: &MaskedSource<'_>, out: &mut Vec<Issue>) {
        for line in &source.lines {
            for caps in host_debug_call().captures_iter(&line.code) {
                out.push(Issue::new(
                    self.kind(),
                    line.number,
                    format!("node.{}() left in function", &caps[1]),
                ));
            }
        }
    }
}
