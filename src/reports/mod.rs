//! Read models over the store
//!
//! Each report is a plain serializable struct built from persisted records
//! (or, for unit analysis, from fresh source). Rendering lives in
//! `reporters`.

mod activity;
mod performance;
mod quality;

pub use activity::{FailedUnit, ScanView, ScannedUnit, TickView};
pub use performance::{
    alert_listing, performance_history, performance_summary, AlertListing, AlertView,
    MonitoringSettings, PerformanceHistory, PerformanceSummary, SampleStatistics, Trends,
};
pub use quality::{
    group_detail, quality_history, quality_summary, unit_analysis, GroupDetail, GroupRow,
    HistoryPoint, IssueView, QualityHistory, QualityOverview, QualitySummary, UnitAnalysis,
    UnitDetail,
};

use crate::store::StoreCounts;
use serde::Serialize;
use std::path::PathBuf;

/// Store location and row counts
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub database: Option<PathBuf>,
    pub counts: StoreCounts,
    pub config_problems: Vec<String>,
}
