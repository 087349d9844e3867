//! Frequency measurement through two interrupt-driven paths.
//!
//! * A capture timer in pulse-width/period mode, fed by an external interrupt line routed through
//!   the event system. Its interrupt handler snapshots the capture channels and hands the
//!   measurement to a waiting task once three events have been seen.
//! * A frequency meter peripheral that counts a measured clock against a fixed number of
//!   reference clock cycles and raises one completion interrupt.
//!
//! Each path owns a dedicated [`Handoff`](freqsense_sync::Handoff). Waits are bounded by a
//! [`Monotonic`](rtic_time::Monotonic) timeout, and the [`Orchestrator`] turns raw counts into
//! frequencies.
//!
//! Register-level peripheral setup is provided by the application through the
//! [`CaptureBackend`], [`FreqMeterBackend`] and [`EventSystem`] traits.

#![no_std]
#![deny(missing_docs)]

// This must go first so the logging macros are visible to the other modules.
#[macro_use]
mod fmt;

pub mod capture;
pub mod config;
pub mod edge;
mod error;
pub mod freqm;
pub mod orchestrator;

pub use capture::{
    compute_frequency, CaptureBackend, CaptureFrequencies, CaptureSample, CaptureState,
    CaptureTimer, COMPLETION_THRESHOLD,
};
pub use config::{CaptureConfig, EdgeSourceConfig, EventRouteConfig, FreqMeterConfig};
pub use edge::{EdgeEventSource, EventSystem};
pub use error::{ConfigError, Error, TimeoutKind};
pub use freqm::{FreqMeter, FreqMeterBackend, FreqMeterReading, FreqMeterResult, FreqMeterState};
pub use orchestrator::Orchestrator;

pub use freqsense_sync;
pub use rtic_time::Monotonic;

#[cfg(test)]
#[macro_use]
extern crate std;
