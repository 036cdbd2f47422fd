//! Unused Variable Rule
//!
//! A `let`/`const`/`var` binding whose name never appears again in the
//! unit's code. Property accesses (`obj.name`) do not count as uses;
//! template interpolations do. Destructuring patterns are skipped, and
//! names with a leading underscore are treated as intentionally unused.

use crate::detectors::base::{is_ident_char, TraitRule};
use crate::detectors::masking::MaskedSource;
use crate::models::{Issue, IssueKind};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

static DECLARATION: OnceLock<Regex> = OnceLock::new();

fn declaration() -> &'static Regex {
    DECLARATION.get_or_init(|| {
        Regex::new(r"(?:^|[^\w$.])(?:let|const|var)\s+([A-Za-z_$][\w$]*)").expect("valid regex")
    })
}

pub struct UnusedVariableRule;

impl TraitRule for UnusedVariableRule {
    fn kind(&self) -> IssueKind {
        IssueKind::UnusedVariable
    }

    fn check(&self, source: &MaskedSource<'_>, out: &mut Vec<Issue>) {
        let mut references: HashMap<&str, usize> = HashMap::new();
        for line in &source.lines {
            for ident in identifiers(&line.code) {
                *references.entry(ident).or_default() += 1;
            }
        }

        for line in &source.lines {
            for caps in declaration().captures_iter(&line.code) {
                let name = &caps[1];
                if name.starts_with('_') {
                    continue;
                }
                if references.get(name).copied().unwrap_or(0) <= 1 {
                    out.push(Issue::new(
                        self.kind(),
                        line.number,
                        format!("'{}' is declared but never used", name),
                    ));
                }
            }
        }
    }
}

/// Identifier tokens in a line of masked code, excluding property names
fn identifiers(code: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut chars = code.char_indices().peekable();
    let mut prev_significant: Option<char> = None;
    let mut prev_prev: Option<char> = None;

    while let Some((start, ch)) = chars.next() {
        if is_ident_char(ch) {
            let mut end = start + ch.len_utf8();
            while let Some(&(i, c)) = chars.peek() {
                if !is_ident_char(c) {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            let token = &code[start..end];
            let is_property = prev_significant == Some('.') && prev_prev != Some('.');
            let is_number = ch.is_ascii_digit();
            if !is_property && !is_number {
                found.push(token);
            }
            prev_prev = prev_significant;
            prev_significant = token.chars().last();
        } else if !ch.is_whitespace() {
            prev_prev = prev_significant;
            prev_significant = Some(ch);
        }
    }
    found
}
