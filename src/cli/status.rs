//! Status and clear commands

use super::Session;
use crate::reports::StoreStatus;
use anyhow::{bail, Result};
use console::style;

/// Run the status command
pub fn run(session: &Session) -> Result<()> {
    session.emit(&StoreStatus {
        database: session.database.clone(),
        counts: session.store.counts()?,
        config_problems: session.config_problems.clone(),
    })
}

/// Run the clear command
pub fn clear(session: &Session, yes: bool) -> Result<()> {
    if !yes {
        bail!("Refusing to delete every record without --yes");
    }
    let total = session.store.counts()?.total();
    session.store.clear()?;
    println!("{} Deleted {} records", style("✓").green(), total);
    Ok(())
}
