//! Top-level Return Rule
//!
//! A valueless `return` at the unit's outermost scope cuts the handler
//! short: everything after it never runs. Returns inside nested blocks or
//! inner functions, returns that hand back a value, and returns forming the
//! body of a braceless `if`/`else`/`for`/`while`/`do` are left alone.

use crate::detectors::base::{is_ident_char, TraitRule};
use crate::detectors::masking::MaskedSource;
use crate::models::{Issue, IssueKind};
use regex::Regex;
use std::sync::OnceLock;

static BARE_RETURN: OnceLock<Regex> = OnceLock::new();

/// A valueless return opening a statement
fn bare_return() -> &'static Regex {
    BARE_RETURN
        .get_or_init(|| Regex::new(r"(?:^|[;{}])\s*(return)\s*(?:;|\}|$)").expect("valid regex"))
}

/// `s` with a leading keyword removed, if it starts with that whole word
fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    s.strip_prefix(keyword)
        .filter(|rest| !rest.starts_with(is_ident_char))
}

fn paren_balance(code: &str) -> i32 {
    code.chars().fold(0, |balance, ch| match ch {
        '(' => balance + 1,
        ')' => balance - 1,
        _ => balance,
    })
}

/// Tracks control headers whose single-statement body starts on a later line
#[derive(Debug, Default)]
struct BracelessBody {
    /// Paren balance of a condition still open at the end of a line
    open_condition: Option<i32>,
    /// The next statement is the body of the previous header
    pending: bool,
}

impl BracelessBody {
    /// Feed one line of code that is not blank
    fn advance(&mut self, code: &str) {
        let code = code.trim();
        self.pending = false;

        if let Some(balance) = self.open_condition.take() {
            let balance = balance + paren_balance(code);
            if balance > 0 {
                self.open_condition = Some(balance);
            } else {
                self.pending = code.ends_with(')');
            }
            return;
        }

        let mut rest = code.trim_start_matches('}').trim_start();
        if let Some(after) = strip_keyword(rest, "else") {
            rest = after.trim_start();
            if rest.is_empty() {
                self.pending = true;
                return;
            }
        }
        if strip_keyword(rest, "do").is_some_and(|after| after.trim().is_empty()) {
            self.pending = true;
            return;
        }

        let is_header = ["if", "for", "while"].iter().any(|keyword| {
            strip_keyword(rest, keyword).is_some_and(|after| after.trim_start().starts_with('('))
        });
        if !is_header {
            return;
        }
        let balance = paren_balance(rest);
        if balance > 0 {
            self.open_condition = Some(balance);
        } else {
            self.pending = rest.ends_with(')');
        }
    }
}

pub struct TopLevelReturnRule;

impl TraitRule for TopLevelReturnRule {
    fn kind(&self) -> IssueKind {
        IssueKind::TopLevelReturn
    }

    fn check(&self, source: &MaskedSource<'_>, out: &mut Vec<Issue>) {
        let mut body = BracelessBody::default();
        for line in &source.lines {
            if line.code.trim().is_empty() {
                continue;
            }

            for caps in bare_return().captures_iter(&line.code) {
                let Some(keyword) = caps.get(1) else {
                    continue;
                };
                let offset = keyword.start();
                let opens_line = line.code[..offset].trim().is_empty();
                if opens_line && body.pending {
                    continue;
                }
                if line.depth_at(offset) == 0 {
                    out.push(Issue::new(
                        self.kind(),
                        line.number,
                        "remove this return, the code after it never runs",
                    ));
                    break;
                }
            }

            body.advance(&line.code);
        }
    }
}
