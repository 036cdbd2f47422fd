//! Text (terminal) reporter with colors and formatting

use crate::models::{Severity, StatusColor};
use crate::reports::{
    AlertListing, AlertView, GroupDetail, IssueView, PerformanceHistory, PerformanceSummary,
    QualityHistory, QualitySummary, ScanView, StoreStatus, TickView, UnitAnalysis,
};
use crate::scoring::Grade;
use crate::store::PruneCounts;
use crate::telemetry::{AlertSeverity, Trend};
use console::style;
use std::fmt::Write;

const RULE: &str = "──────────────────────────────────────";

/// Terminal rendering of a report
pub trait TextReport {
    fn render_text(&self) -> String;
}

fn grade(grade: Grade) -> String {
    let s = style(grade.to_string()).bold();
    let s = match grade {
        Grade::A => s.green(),
        Grade::B => s.green().dim(),
        Grade::C => s.yellow(),
        Grade::D => s.red().dim(),
        Grade::F => s.red(),
    };
    s.to_string()
}

fn severity_tag(severity: Severity) -> String {
    match severity {
        Severity::Critical => style("[C]").red().to_string(),
        Severity::Warning => style("[W]").yellow().to_string(),
        Severity::Info => style("[I]").blue().to_string(),
    }
}

fn alert_tag(severity: AlertSeverity) -> String {
    match severity {
        AlertSeverity::Critical => style("critical").red().bold().to_string(),
        AlertSeverity::Warning => style("warning").yellow().to_string(),
        AlertSeverity::Info => style("info").blue().to_string(),
    }
}

fn trend(trend: Trend) -> String {
    match trend {
        Trend::Increasing => style("increasing ↑").red().to_string(),
        Trend::Decreasing => style("decreasing ↓").green().to_string(),
        Trend::Stable => style("stable").dim().to_string(),
        Trend::InsufficientData => style("insufficient data").dim().to_string(),
    }
}

fn header(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", style(title).bold());
    let _ = writeln!(out, "{}", style(RULE).dim());
}

fn issue_line(out: &mut String, indent: &str, issue: &IssueView) {
    let line = issue
        .line
        .map(|l| format!("L{l}"))
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(
        out,
        "{indent}{} {:>5}  {}",
        severity_tag(issue.severity),
        style(line).dim(),
        issue.message
    );
}

fn alert_line(out: &mut String, alert: &AlertView) {
    let _ = writeln!(
        out,
        "  {}  {:<9} {:>8.2}{} over {}{} for {:.1} min  {}",
        style(alert.created_at.format("%Y-%m-%d %H:%M:%S")).dim(),
        alert.metric_type.to_string(),
        alert.actual_value,
        alert.metric_type.unit(),
        alert.threshold_value,
        alert.metric_type.unit(),
        alert.duration_minutes,
        alert_tag(alert.severity),
    );
}

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

impl TextReport for QualitySummary {
    fn render_text(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;
        header(&mut out, "Code Quality Summary");
        let _ = writeln!(
            out,
            "Score: {}  Grade: {}  Flows: {}  Function nodes: {}",
            style(format!("{:.1}/100", s.average_quality_score)).bold(),
            grade(s.quality_grade),
            s.total_flows,
            s.total_function_nodes
        );
        let _ = writeln!(
            out,
            "Issues: {}  Nodes with issues: {}  Critical nodes: {}  Debt ratio: {:.3}",
            s.total_issues,
            s.nodes_with_issues,
            style(s.critical_issues).red(),
            s.technical_debt_ratio
        );

        if self.flows.is_empty() {
            let _ = writeln!(
                out,
                "\n{}",
                style("No scans recorded yet. Run `flowsentry scan <flows.json>`.").dim()
            );
            return out;
        }

        let _ = writeln!(out);
        for flow in &self.flows {
            let _ = writeln!(
                out,
                "  {} {:<28} {:>6.1}  {:>3} issues  {:>3} nodes  {}",
                grade(flow.quality_grade),
                flow.name,
                flow.quality_score,
                flow.total_issues,
                flow.total_units,
                style(&flow.id).dim()
            );
        }
        out
    }
}

impl TextReport for QualityHistory {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, &format!("Quality History (last {}h)", self.hours));
        if self.history.is_empty() {
            let _ = writeln!(out, "{}", style("No data in this period.").dim());
            return out;
        }
        for point in &self.history {
            let _ = writeln!(
                out,
                "  {}  quality {:>6.1}  issues {:>4}  nodes {:>4}  flows {:>3}",
                style(point.hour.format("%Y-%m-%d %H:00")).dim(),
                point.quality_score,
                point.total_issues,
                point.total_nodes,
                point.active_flows
            );
        }
        out
    }
}

impl TextReport for GroupDetail {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, &format!("Flow {}", self.name));
        let _ = writeln!(
            out,
            "Score: {}  Grade: {}  Complexity: {:.1}  Issues: {}  Nodes: {}",
            style(format!("{:.1}/100", self.quality_score)).bold(),
            grade(self.quality_grade),
            self.complexity_score,
            self.total_issues,
            self.total_units
        );
        let _ = writeln!(
            out,
            "Last updated: {}",
            style(self.last_updated.format("%Y-%m-%d %H:%M:%S UTC")).dim()
        );

        if !self.issue_types.is_empty() {
            let _ = writeln!(out);
            for (kind, count) in &self.issue_types {
                let _ = writeln!(out, "  {:<22} {}", kind.tag(), count);
            }
        }

        for unit in &self.units {
            let _ = writeln!(
                out,
                "\n  {} {}  quality {:.1}  complexity {:.1}  {} lines",
                style(&unit.name).bold(),
                style(&unit.id).dim(),
                unit.quality_score,
                unit.complexity_score,
                unit.lines_of_code
            );
            for issue in &unit.issues {
                issue_line(&mut out, "    ", issue);
            }
        }
        out
    }
}

impl TextReport for UnitAnalysis {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, &format!("Function Node {}", self.name));
        let _ = writeln!(
            out,
            "Score: {}  Grade: {}  Complexity: {:.1}  Lines: {}",
            style(format!("{:.1}/100", self.quality_score)).bold(),
            grade(self.quality_grade),
            self.complexity_score,
            self.lines_of_code
        );
        let by = &self.issues_by_severity;
        let _ = writeln!(
            out,
            "Issues: {} ({} critical, {} warning, {} info)",
            by.total,
            style(by.critical).red(),
            style(by.warning).yellow(),
            style(by.info).blue()
        );
        if !self.status.text.is_empty() {
            let text = style(&self.status.text);
            let text = match self.status.color {
                StatusColor::Red => text.red(),
                StatusColor::Yellow => text.yellow(),
                StatusColor::Blue => text.blue(),
                StatusColor::None => text,
            };
            let _ = writeln!(out, "Status: {}", text);
        }
        if !self.issues.is_empty() {
            let _ = writeln!(out);
        }
        for issue in &self.issues {
            issue_line(&mut out, "  ", issue);
        }
        out
    }
}

impl TextReport for PerformanceSummary {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, "Performance Summary");
        let settings = &self.settings;
        let _ = writeln!(
            out,
            "Monitoring: {}  Interval: {}s  Thresholds: cpu {}%  memory {}%  event loop {}ms",
            if settings.enabled {
                style("enabled").green()
            } else {
                style("disabled").dim()
            },
            settings.interval_seconds,
            settings.cpu_threshold,
            settings.memory_threshold,
            settings.event_loop_threshold
        );

        match &self.current {
            Some(sample) => {
                let _ = writeln!(
                    out,
                    "Current:    cpu {:>6.2}%  memory {:>6.2}% ({:.1} MB)  event loop {:>6.2}ms",
                    sample.cpu_percent,
                    sample.memory_percent,
                    megabytes(sample.memory_rss_bytes),
                    sample.event_loop_lag_ms
                );
            }
            None => {
                let _ = writeln!(out, "{}", style("No samples recorded yet.").dim());
            }
        }
        let _ = writeln!(
            out,
            "10-min avg: cpu {:>6.2}%  memory {:>6.2}%  event loop {:>6.2}ms",
            self.averages.cpu, self.averages.memory, self.averages.event_loop
        );
        let _ = writeln!(
            out,
            "Trends:     cpu {}  memory {}  event loop {}",
            trend(self.trends.cpu),
            trend(self.trends.memory),
            trend(self.trends.event_loop)
        );

        let stats = &self.statistics;
        let _ = write!(out, "Samples:    {}", stats.total_samples);
        if let (Some(oldest), Some(newest)) = (stats.oldest_sample, stats.newest_sample) {
            let _ = write!(
                out,
                "  {}",
                style(format!(
                    "{} .. {}",
                    oldest.format("%Y-%m-%d %H:%M"),
                    newest.format("%Y-%m-%d %H:%M")
                ))
                .dim()
            );
        }
        let _ = writeln!(out);

        if !self.recent_alerts.is_empty() {
            let _ = writeln!(out, "\n{}", style("Recent alerts").bold());
            for alert in &self.recent_alerts {
                alert_line(&mut out, alert);
            }
        }
        out
    }
}

impl TextReport for PerformanceHistory {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, &format!("Performance History ({} samples)", self.count));
        for sample in &self.samples {
            let _ = writeln!(
                out,
                "  {}  cpu {:>6.2}%  memory {:>6.2}%  rss {:>7.1} MB  event loop {:>6.2}ms",
                style(sample.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
                sample.cpu_percent,
                sample.memory_percent,
                megabytes(sample.memory_rss_bytes),
                sample.event_loop_lag_ms
            );
        }
        out
    }
}

impl TextReport for AlertListing {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, &format!("Alerts ({})", self.count));
        if self.alerts.is_empty() {
            let _ = writeln!(out, "{}", style("No alerts recorded.").dim());
        }
        for alert in &self.alerts {
            alert_line(&mut out, alert);
        }
        out
    }
}

impl TextReport for StoreStatus {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, "flowsentry Status");
        match &self.database {
            Some(path) => {
                let _ = writeln!(out, "  Database: {}", style(path.display()).cyan());
            }
            None => {
                let _ = writeln!(out, "  Database: {}", style("in-memory").dim());
            }
        }
        let c = &self.counts;
        let _ = writeln!(
            out,
            "  Records:  {} units, {} flows, {} samples, {} alerts",
            style(c.units).cyan(),
            style(c.groups).cyan(),
            style(c.samples).cyan(),
            style(c.alerts).cyan()
        );
        if self.config_problems.is_empty() {
            let _ = writeln!(out, "  {} Configuration valid", style("[OK]").green());
        }
        for problem in &self.config_problems {
            let _ = writeln!(out, "  {} {}", style("[!!]").yellow(), problem);
        }
        out
    }
}

impl TextReport for PruneCounts {
    fn render_text(&self) -> String {
        format!(
            "{} Pruned {} samples and {} alerts",
            style("✓").green(),
            self.samples,
            self.alerts
        )
    }
}

impl TextReport for ScanView {
    fn render_text(&self) -> String {
        let mut out = String::new();
        header(&mut out, "Scan Complete");
        let _ = writeln!(
            out,
            "Level {}  Flows: {}  Function nodes: {}  Issues: {}  {}",
            self.detection_level,
            self.groups.len(),
            self.units_analyzed,
            style(self.total_issues).bold(),
            style(format!("{}ms", self.duration_ms)).dim()
        );

        for unit in self.units.iter().filter(|u| u.issues > 0) {
            let tag = match unit.status.color {
                StatusColor::Red => style("●").red(),
                StatusColor::Yellow => style("●").yellow(),
                StatusColor::Blue => style("●").blue(),
                StatusColor::None => style("○").dim(),
            };
            let _ = writeln!(
                out,
                "  {} {:<28} {:>6.1}  {} issues  {}",
                tag,
                unit.name,
                unit.quality_score,
                unit.issues,
                style(&unit.status.text).dim()
            );
        }

        if self.orphaned_units > 0 {
            let _ = writeln!(
                out,
                "  {} {} function nodes outside any flow were skipped",
                style("[--]").dim(),
                self.orphaned_units
            );
        }
        for failed in &self.failed_units {
            let _ = writeln!(out, "  {} {}: {}", style("[!!]").red(), failed.id, failed.reason);
        }
        if self.persist_failures > 0 {
            let _ = writeln!(
                out,
                "  {} {} records could not be saved",
                style("[!!]").yellow(),
                self.persist_failures
            );
        }
        out
    }
}

impl TextReport for TickView {
    fn render_text(&self) -> String {
        let mut out = String::new();
        match &self.sample {
            Some(s) => {
                let _ = write!(
                    out,
                    "{} #{:<4} cpu {:>6.2}%  memory {:>6.2}%  event loop {:>6.2}ms",
                    style(s.timestamp.format("%H:%M:%S")).dim(),
                    self.tick,
                    s.cpu_percent,
                    s.memory_percent,
                    s.event_loop_lag_ms
                );
            }
            None => {
                let _ = write!(out, "#{:<4} {}", self.tick, style("no reading").dim());
            }
        }
        for alert in &self.alerts {
            let _ = write!(
                out,
                "\n  {} {} sustained at {:.2}{} (threshold {}{})",
                alert_tag(alert.severity),
                alert.metric_type,
                alert.actual_value,
                alert.metric_type.unit(),
                alert.threshold_value,
                alert.metric_type.unit()
            );
        }
        if let Some(pruned) = &self.pruned {
            if pruned.samples + pruned.alerts > 0 {
                let _ = write!(
                    out,
                    "\n  {}",
                    style(format!(
                        "pruned {} samples, {} alerts",
                        pruned.samples, pruned.alerts
                    ))
                    .dim()
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Alert, MetricKind};
    use crate::reports::{alert_listing, quality_summary, unit_analysis};
    use crate::scan::UnitSource;
    use crate::scoring::GradeBands;
    use crate::store::{MemoryStore, MetricsStore};
    use chrono::Utc;

    #[test]
    fn test_empty_summary_hints_at_scan() {
        let report = quality_summary(&MemoryStore::new(), &GradeBands::default()).unwrap();
        let text = report.render_text();
        assert!(text.contains("Code Quality Summary"));
        assert!(text.contains("No scans recorded yet"));
    }

    #[test]
    fn test_unit_analysis_lists_issues_with_lines() {
        let unit = UnitSource {
            group_id: "g".into(),
            id: "n".into(),
            name: "Debugging".into(),
            source: "console.log(msg);\nreturn;".into(),
        };
        let text = unit_analysis(&unit, &GradeBands::default(), Utc::now()).render_text();
        assert!(text.contains("Function Node Debugging"));
        assert!(text.contains("L1"));
        assert!(text.contains("L2"));
    }

    #[test]
    fn test_alert_listing_text() {
        let store = MemoryStore::new();
        store
            .insert_alert(&Alert {
                metric_type: MetricKind::EventLoop,
                threshold_value: 20.0,
                actual_value: 45.0,
                duration_minutes: 5.0,
                created_at: Utc::now(),
            })
            .unwrap();
        let text = alert_listing(&store, 10).unwrap().render_text();
        assert!(text.contains("Alerts (1)"));
        assert!(text.contains("eventLoop"));
        assert!(text.contains("critical"));
    }
}
