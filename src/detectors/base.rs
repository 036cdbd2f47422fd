//! Base rule trait
//!
//! Every trait in the issue catalog is found by one `TraitRule`. Rules see
//! the masked source of a single unit and append the issues they find; the
//! detector decides which rules run for a given detection level and orders
//! the combined output.

use crate::detectors::masking::MaskedSource;
use crate::models::{DetectionLevel, Issue, IssueKind};

/// Trait for all debugging-trait rules
///
/// # Example Implementation
///
/// ```ignore
/// pub struct MyRule;
///
/// impl TraitRule for MyRule {
///     fn kind(&self) -> IssueKind {
///         IssueKind::ConsoleLog
///     }
///
///     fn check(&self, source: &MaskedSource<'_>, out: &mut Vec<Issue>) {
///         for line in &source.lines {
///             if line.code.contains("console.log(") {
///                 out.push(Issue::new(self.kind(), line.number, "console.log"));
///             }
///         }
///     }
/// }
/// ```
pub trait TraitRule: Send + Sync {
    /// The catalog entry this rule reports
    fn kind(&self) -> IssueKind;

    /// Scan the unit and push any issues found.
    ///
    /// Must not fail: lines the rule cannot make sense of yield nothing.
    fn check(&self, source: &MaskedSource<'_>, out: &mut Vec<Issue>);

    /// Whether this rule runs at the given detection level
    fn enabled_at(&self, level: DetectionLevel) -> bool {
        level >= self.kind().min_level()
    }
}

/// Identifier characters in script source (`$` and `_` included)
pub fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}
