//! Single-flight guard for scan passes

use super::ScanError;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    /// Units are scored; group aggregation is in progress
    Completing,
}

/// Owns the scan state; a second start while busy is refused
#[derive(Debug)]
pub struct ScanScheduler {
    state: Mutex<ScanState>,
}

impl Default for ScanScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanScheduler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScanState::Idle),
        }
    }

    // The state is a plain enum, so a poisoned lock still holds a usable value
    fn lock(&self) -> MutexGuard<'_, ScanState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> ScanState {
        *self.lock()
    }

    /// Move Idle → Scanning, or fail with `AlreadyRunning`.
    ///
    /// The returned guard puts the scheduler back to Idle when dropped, so
    /// an aborted or panicking pass never leaves it stuck.
    pub fn try_start(&self) -> Result<ScanGuard<'_>, ScanError> {
        let mut state = self.lock();
        if *state != ScanState::Idle {
            return Err(ScanError::AlreadyRunning);
        }
        *state = ScanState::Scanning;
        Ok(ScanGuard { scheduler: self })
    }
}

/// Proof that a scan is in flight
#[derive(Debug)]
pub struct ScanGuard<'a> {
    scheduler: &'a ScanScheduler,
}

impl ScanGuard<'_> {
    /// Scanning → Completing
    pub fn completing(&self) {
        *self.scheduler.lock() = ScanState::Completing;
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        *self.scheduler.lock() = ScanState::Idle;
    }
}
