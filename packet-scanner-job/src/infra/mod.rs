/// Adapter wiring.
pub mod app_context;
/// Startup connectivity checks.
pub mod preflight;
/// Interval mode.
pub mod scheduler;
/// Tracing setup.
pub mod telemetry;
