//! Debugging-trait detection
//!
//! `detect` maps (source text, detection level) to an ordered issue list.
//! It is pure, total and deterministic: malformed source yields fewer
//! issues, never an error.
//!
//! # Catalog
//!
//! | Level | Rule                  | Severity |
//! |-------|-----------------------|----------|
//! | 1     | top-level-return      | critical |
//! | 2     | console-log           | warning  |
//! | 2     | node-warn             | warning  |
//! | 2     | debugger-statement    | critical |
//! | 2     | todo-comment          | warning  |
//! | 3     | unused-variable       | info     |
//! | 3     | hardcoded-test        | info     |
//! | 3     | multiple-empty-lines  | info     |
//!
//! Higher levels only add rules, so the issues found at a lower level are
//! always a subset of those found at a higher one.

mod base;
mod blank_lines;
mod console_log;
mod debugger_statement;
mod hardcoded_test;
pub mod masking;
mod node_warn;
mod todo_comment;
mod top_level_return;
mod unused_variable;

pub use base::TraitRule;
pub use masking::{mask_source, MaskedLine, MaskedSource};

use crate::models::{DetectionLevel, Issue};
use std::sync::OnceLock;

static RULES: OnceLock<Vec<Box<dyn TraitRule>>> = OnceLock::new();

/// All rules, in catalog order
pub fn default_rules() -> &'static [Box<dyn TraitRule>] {
    RULES.get_or_init(|| {
        vec![
            Box::new(top_level_return::TopLevelReturnRule),
            Box::new(console_log::ConsoleLogRule),
            Box::new(node_warn::NodeWarnRule),
            Box::new(debugger_statement::DebuggerStatementRule),
            Box::new(todo_comment::TodoCommentRule),
            Box::new(unused_variable::UnusedVariableRule),
            Box::new(hardcoded_test::HardcodedTestRule),
            Box::new(blank_lines::BlankLinesRule),
        ]
    })
}

/// Detect debugging traits in one unit of source.
///
/// Issues are ordered by line, then by catalog order within a line.
pub fn detect(source: &str, level: DetectionLevel) -> Vec<Issue> {
    if source.trim().is_empty() {
        return Vec::new();
    }

    let masked = mask_source(source);
    let mut issues = Vec::new();
    for rule in default_rules().iter().filter(|r| r.enabled_at(level)) {
        rule.check(&masked, &mut issues);
    }

    // Stable sort keeps catalog order for issues sharing a line
    issues.sort_by_key(|issue| issue.line.unwrap_or(u32::MAX));
    issues
}

/// Number of lines in a unit, counted the way the host editor shows them
pub fn lines_of_code(source: &str) -> usize {
    source.split('\n').count()
}
