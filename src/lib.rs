//! flowsentry - debugging-trait detection and runtime telemetry
//!
//! Scans the function nodes of flow exports for leftover debugging
//! (stray returns, console logging, `debugger`, TODO markers and more),
//! scores each node and flow, and keeps a rolling record of process health
//! with sustained-threshold alerts.

pub mod cli;
pub mod config;
pub mod detectors;
pub mod models;
pub mod reporters;
pub mod reports;
pub mod scan;
pub mod scoring;
pub mod store;
pub mod telemetry;
