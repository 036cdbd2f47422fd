//! Core data models for flowsentry
//!
//! These models are shared by the detector, the scorers, the telemetry
//! engine and the store. Records are append-only: a new scan or sample
//! produces a new record rather than mutating an old one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Severity classes for detected issues
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// How much of the issue catalog a scan surfaces (1..=3).
///
/// Higher levels only ever add issue kinds, never remove them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct DetectionLevel(u8);

impl DetectionLevel {
    /// Top-level returns only
    pub const BASIC: DetectionLevel = DetectionLevel(1);
    /// Adds logging, debugger and TODO markers
    pub const STANDARD: DetectionLevel = DetectionLevel(2);
    /// Adds unused bindings, placeholder literals and blank-line runs
    pub const STRICT: DetectionLevel = DetectionLevel(3);

    /// Build a level, clamping out-of-range input into 1..=3
    pub fn new(level: i64) -> Self {
        Self(level.clamp(1, 3) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for DetectionLevel {
    fn default() -> Self {
        Self::BASIC
    }
}

impl From<i64> for DetectionLevel {
    fn from(level: i64) -> Self {
        Self::new(level)
    }
}

impl From<DetectionLevel> for u8 {
    fn from(level: DetectionLevel) -> Self {
        level.0
    }
}

impl std::fmt::Display for DetectionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed catalog of debugging traits and quality defects.
///
/// Each kind carries its severity, the detection level that enables it and
/// its headline, so the detector, scorer and status hints agree on one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    TopLevelReturn,
    ConsoleLog,
    NodeWarn,
    DebuggerStatement,
    TodoComment,
    UnusedVariable,
    HardcodedTest,
    MultipleEmptyLines,
}

impl IssueKind {
    /// Catalog order; also the detection order for issues on the same line
    pub const ALL: [IssueKind; 8] = [
        IssueKind::TopLevelReturn,
        IssueKind::ConsoleLog,
        IssueKind::NodeWarn,
        IssueKind::DebuggerStatement,
        IssueKind::TodoComment,
        IssueKind::UnusedVariable,
        IssueKind::HardcodedTest,
        IssueKind::MultipleEmptyLines,
    ];

    pub fn severity(self) -> Severity {
        match self {
            IssueKind::TopLevelReturn | IssueKind::DebuggerStatement => Severity::Critical,
            IssueKind::ConsoleLog | IssueKind::NodeWarn | IssueKind::TodoComment => {
                Severity::Warning
            }
            IssueKind::UnusedVariable | IssueKind::HardcodedTest | IssueKind::MultipleEmptyLines => {
                Severity::Info
            }
        }
    }

    /// Lowest detection level that surfaces this kind
    pub fn min_level(self) -> DetectionLevel {
        match self {
            IssueKind::TopLevelReturn => DetectionLevel::BASIC,
            IssueKind::ConsoleLog
            | IssueKind::NodeWarn
            | IssueKind::DebuggerStatement
            | IssueKind::TodoComment => DetectionLevel::STANDARD,
            IssueKind::UnusedVariable | IssueKind::HardcodedTest | IssueKind::MultipleEmptyLines => {
                DetectionLevel::STRICT
            }
        }
    }

    /// Stable tag, identical to the serialized form
    pub fn tag(self) -> &'static str {
        match self {
            IssueKind::TopLevelReturn => "top-level-return",
            IssueKind::ConsoleLog => "console-log",
            IssueKind::NodeWarn => "node-warn",
            IssueKind::DebuggerStatement => "debugger-statement",
            IssueKind::TodoComment => "todo-comment",
            IssueKind::UnusedVariable => "unused-variable",
            IssueKind::HardcodedTest => "hardcoded-test",
            IssueKind::MultipleEmptyLines => "multiple-empty-lines",
        }
    }

    /// Short human headline used as the prefix of every issue message
    pub fn headline(self) -> &'static str {
        match self {
            IssueKind::TopLevelReturn => "Top-level return statement",
            IssueKind::ConsoleLog => "Console logging call",
            IssueKind::NodeWarn => "Debug/warn call",
            IssueKind::DebuggerStatement => "Debugger breakpoint",
            IssueKind::TodoComment => "TODO/FIXME marker",
            IssueKind::UnusedVariable => "Unused variable",
            IssueKind::HardcodedTest => "Hardcoded test value",
            IssueKind::MultipleEmptyLines => "Multiple empty lines",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A single detected trait in one unit of source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub message: String,
    /// 1-based line number
    #[serde(default)]
    pub line: Option<u32>,
}

impl Issue {
    /// Build an issue whose message is "<headline>: <detail>"
    pub fn new(kind: IssueKind, line: u32, detail: impl AsRef<str>) -> Self {
        let detail = detail.as_ref();
        let message = if detail.is_empty() {
            kind.headline().to_string()
        } else {
            format!("{}: {}", kind.headline(), detail)
        };
        Self {
            kind,
            message,
            line: Some(line),
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

/// Issue counts by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
    pub total: usize,
}

impl IssueSummary {
    pub fn from_issues(issues: &[Issue]) -> Self {
        let mut summary = Self::default();
        for issue in issues {
            match issue.severity() {
                Severity::Critical => summary.critical += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Info => summary.info += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

/// Scored result for one unit of source in one scan pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRecord {
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub lines_of_code: usize,
    pub complexity_score: f64,
    pub quality_score: f64,
    pub issues: Vec<Issue>,
    pub created_at: DateTime<Utc>,
}

impl UnitRecord {
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    pub fn has_critical(&self) -> bool {
        self.issues.iter().any(|i| i.severity() == Severity::Critical)
    }
}

/// Aggregate for one group of units, derived entirely from its unit records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub id: String,
    pub name: String,
    pub total_issues: usize,
    pub nodes_with_issues: usize,
    pub nodes_with_critical_issues: usize,
    pub total_units: usize,
    #[serde(default)]
    pub issue_types: BTreeMap<IssueKind, usize>,
    pub quality_score: f64,
    pub complexity_score: f64,
    pub created_at: DateTime<Utc>,
}

/// The three sampled host-health metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    Cpu,
    Memory,
    EventLoop,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [MetricKind::Cpu, MetricKind::Memory, MetricKind::EventLoop];

    /// Read this metric out of a sample
    pub fn value_of(self, sample: &MetricSample) -> f64 {
        match self {
            MetricKind::Cpu => sample.cpu_percent,
            MetricKind::Memory => sample.memory_percent,
            MetricKind::EventLoop => sample.event_loop_lag_ms,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MetricKind::Cpu | MetricKind::Memory => "%",
            MetricKind::EventLoop => "ms",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Cpu => write!(f, "cpu"),
            MetricKind::Memory => write!(f, "memory"),
            MetricKind::EventLoop => write!(f, "eventLoop"),
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(MetricKind::Cpu),
            "memory" | "mem" => Ok(MetricKind::Memory),
            "eventloop" | "event-loop" | "event_loop" | "lag" => Ok(MetricKind::EventLoop),
            other => Err(format!(
                "Unknown metric '{}'. Valid metrics: cpu, memory, eventLoop",
                other
            )),
        }
    }
}

/// One process-health sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_rss_bytes: u64,
    pub event_loop_lag_ms: f64,
}

/// A recorded sustained-threshold violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub metric_type: MetricKind,
    pub threshold_value: f64,
    pub actual_value: f64,
    pub duration_minutes: f64,
    pub created_at: DateTime<Utc>,
}

/// Presentation color for a unit's status badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Red,
    Yellow,
    Blue,
    None,
}

/// Status feedback for a scored unit, a pure function of its issue severities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHint {
    pub color: StatusColor,
    pub text: String,
}

impl StatusHint {
    pub fn from_issues(issues: &[Issue]) -> Self {
        let worst = issues.iter().map(Issue::severity).max();
        let (color, text) = match worst {
            Some(Severity::Critical) => (StatusColor::Red, "Severe debugging traits"),
            Some(Severity::Warning) => (StatusColor::Yellow, "Important debugging traits"),
            Some(Severity::Info) => (StatusColor::Blue, "Minor debug traits noticed"),
            None => (StatusColor::None, ""),
        };
        Self {
            color,
            text: text.to_string(),
        }
    }
}

/// Round to two decimals, the precision scores are persisted with
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
