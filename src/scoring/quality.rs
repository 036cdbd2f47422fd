//! Per-unit complexity and quality scores

use crate::detectors::mask_source;
use crate::models::{Issue, IssueKind, Severity};
use regex::Regex;
use std::sync::OnceLock;

/// Weight of the deepest brace nesting in the complexity score
const NESTING_WEIGHT: f64 = 2.0;
/// Weight of √(non-blank lines) in the complexity score
const SIZE_WEIGHT: f64 = 0.5;

const CRITICAL_PENALTY: f64 = 30.0;
const WARNING_PENALTY: f64 = 10.0;
const WARNING_CAP: f64 = 50.0;
const INFO_PENALTY: f64 = 2.0;
const INFO_CAP: f64 = 20.0;
/// Units this long get the largest size discount
const SIZE_DISCOUNT_LOC: f64 = 1000.0;
const MIN_SIZE_FACTOR: f64 = 0.5;

static DECISION_KEYWORD: OnceLock<Regex> = OnceLock::new();

fn decision_keyword() -> &'static Regex {
    DECISION_KEYWORD.get_or_init(|| {
        Regex::new(r"(^|[^\w$.])(if|for|while|do|case|catch)\b").expect("valid regex")
    })
}

/// Issue severity; total over the catalog
pub fn severity_of(kind: IssueKind) -> Severity {
    kind.severity()
}

/// Structural complexity of a unit of source.
///
/// Counts decision points in code (strings and comments excluded), adds the
/// deepest brace nesting and a sub-linear size term. Always ≥ 0; adding a
/// branch or a nesting level never lowers it.
pub fn complexity_score(source: &str) -> f64 {
    let masked = mask_source(source);

    let mut decisions = 0usize;
    let mut max_depth = 0usize;
    let mut non_blank = 0usize;

    for line in &masked.lines {
        if line.is_blank() {
            continue;
        }
        non_blank += 1;
        decisions += decision_keyword().find_iter(&line.code).count();
        decisions += count_operators(&line.code);
        // braces opened and closed on the same line still nest
        let mut depth = line.depth;
        for ch in line.code.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    max_depth = max_depth.max(depth);
                }
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }

    if non_blank == 0 {
        return 0.0;
    }

    decisions as f64 + NESTING_WEIGHT * max_depth as f64 + SIZE_WEIGHT * (non_blank as f64).sqrt()
}

/// `&&`, `||`, `??` and the ternary `?` (not `?.` or `??`)
fn count_operators(code: &str) -> usize {
    let bytes = code.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1).copied()) {
            (b'&', Some(b'&')) | (b'|', Some(b'|')) | (b'?', Some(b'?')) => {
                count += 1;
                i += 2;
                // `&&=`, `||=` and `??=` are still one decision
                if bytes.get(i) == Some(&b'=') {
                    i += 1;
                }
                continue;
            }
            (b'?', Some(b'.')) => {
                i += 2;
                continue;
            }
            (b'?', _) => count += 1,
            _ => {}
        }
        i += 1;
    }
    count
}

/// Quality of one unit, 0..=100, from its issues and size.
pub fn node_quality_score(issues: &[Issue], lines_of_code: usize) -> f64 {
    let mut critical = 0usize;
    let mut warning = 0usize;
    let mut info = 0usize;
    for issue in issues {
        match issue.severity() {
            Severity::Critical => critical += 1,
            Severity::Warning => warning += 1,
            Severity::Info => info += 1,
        }
    }

    let size_factor = (1.0 - lines_of_code as f64 / SIZE_DISCOUNT_LOC).clamp(MIN_SIZE_FACTOR, 1.0);
    let penalty = critical as f64 * CRITICAL_PENALTY
        + (warning as f64 * WARNING_PENALTY).min(WARNING_CAP) * size_factor
        + (info as f64 * INFO_PENALTY).min(INFO_CAP) * size_factor;

    (100.0 - penalty).clamp(0.0, 100.0)
}
