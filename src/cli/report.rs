//! Quality report commands

use super::Session;
use crate::reports::{group_detail, quality_history, quality_summary};
use anyhow::{bail, Result};
use chrono::Utc;

pub fn summary(session: &Session) -> Result<()> {
    let report = quality_summary(&*session.store, &session.settings.grade_bands)?;
    session.emit(&report)
}

pub fn history(session: &Session, hours: u32) -> Result<()> {
    let report = quality_history(&*session.store, i64::from(hours), Utc::now())?;
    session.emit(&report)
}

pub fn group(session: &Session, id: &str) -> Result<()> {
    match group_detail(&*session.store, id, &session.settings.grade_bands)? {
        Some(detail) => session.emit(&detail),
        None => bail!("No scan records for flow '{}'. Run `flowsentry scan` first.", id),
    }
}
