//! Quality scoring for units and groups
//!
//! # Scoring Formula
//!
//! ```text
//! complexity = decisions + 2 × max_depth + 0.5 × √(non-blank lines)
//!
//! unit quality = max(0, 100 − critical − warning − info)
//!   critical = 30 per issue (uncapped)
//!   warning  = min(10 per issue, 50) × size factor
//!   info     = min(2 per issue, 20)  × size factor
//!   size factor = clamp(1 − LOC / 1000, 0.5, 1.0)
//!
//! group quality = mean(unit quality), capped at 50 when any unit
//!                 carries a critical issue
//! ```
//!
//! Large units get a gentler non-critical penalty: three `console.log`
//! calls in a 600-line function say less than three in a 10-line one.
//! Critical traits are never discounted.

mod aggregate;
mod grade;
mod quality;

pub use aggregate::{aggregate_group, CRITICAL_GROUP_CAP};
pub use grade::{Grade, GradeBands};
pub use quality::{complexity_score, node_quality_score, severity_of};
