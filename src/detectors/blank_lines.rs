//! Multiple Empty Lines Rule

use crate::detectors::base::TraitRule;
use crate::detectors::masking::MaskedSource;
use crate::models::{Issue, IssueKind};

/// Shortest run of blank lines that is reported
const MIN_RUN: usize = 2;

pub struct BlankLinesRule;

impl TraitRule for BlankLinesRule {
    fn kind(&self) -> IssueKind {
        IssueKind::MultipleEmptyLines
    }

    fn check(&self, source: &MaskedSource<'_>, out: &mut Vec<Issue>) {
        let mut run_start: Option<u32> = None;
        let mut run_len = 0usize;

        let flush = |start: Option<u32>, len: usize, out: &mut Vec<Issue>| {
            if let Some(start) = start {
                if len >= MIN_RUN {
                    out.push(Issue::new(
                        self.kind(),
                        start,
                        format!("{} consecutive empty lines", len),
                    ));
                }
            }
        };

        for line in &source.lines {
            if line.is_blank() {
                run_start.get_or_insert(line.number);
                run_len += 1;
            } else {
                flush(run_start.take(), run_len, &mut *out);
                run_len = 0;
            }
        }
        flush(run_start, run_len, &mut *out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::masking::mask_source;

    #[test]
    fn test_reports_runs_at_their_first_line() {
        let src = "a();\n\nb();\n\n\n\nc();\n\n\n";
        let mut out = Vec::new();
        BlankLinesRule.check(&mask_source(src), &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].line, Some(4));
        assert!(out[0].message.contains("3 consecutive"));
        assert_eq!(out[1].line, Some(8));
    }
}
