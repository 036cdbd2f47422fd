//! TODO/FIXME Comment Rule
//!
//! Only comment text is searched, so identifiers such as `todoList` and
//! strings mentioning "TODO" are ignored.

use crate::detectors::base::TraitRule;
use crate::detectors::masking::MaskedSource;
use crate::models::{Issue, IssueKind};
use regex::Regex;
use std::sync::OnceLock;

static MARKER: OnceLock<Regex> = OnceLock::new();

fn marker() -> &'static Regex {
    MARKER.get_or_init(|| Regex::new(r"\b(?i:todo|fixme)\b|\b(XXX|HACK)\b").expect("valid regex"))
}

/// Longest comment excerpt carried into the issue message
const MAX_EXCERPT: usize = 60;

pub struct TodoCommentRule;

impl TraitRule for TodoCommentRule {
    fn kind(&self) -> IssueKind {
        IssueKind::TodoComment
    }

    fn check(&self, source: &MaskedSource<'_>, out: &mut Vec<Issue>) {
        for line in &source.lines {
            if line.comment.is_empty() || !marker().is_match(&line.comment) {
                continue;
            }
            let text = line.comment.trim().trim_start_matches('*').trim();
            let excerpt: String = text.chars().take(MAX_EXCERPT).collect();
            out.push(Issue::new(self.kind(), line.number, excerpt));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::masking::mask_source;

    #[test]
    fn test_flags_markers_in_comments() {
        let src = "// TODO: handle errors\nlet todoList = [];\n/* fixme later */\nlet s = 'TODO';";
        let mut out = Vec::new();
        TodoCommentRule.check(&mask_source(src), &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].line, Some(1));
        assert!(out[0].message.contains("handle errors"));
        assert_eq!(out[1].line, Some(3));
    }
}
