//! Wiring and scheduling for the `packet-scanner-job` binary.
//!
//! The binary itself only parses arguments; everything it runs lives here so
//! that the scheduling loop and adapter wiring can be exercised from tests.

pub mod cli;
pub mod infra;

pub use infra::{
    app_context::AppContext,
    scheduler::{CycleScheduler, ScheduleSummary},
};
