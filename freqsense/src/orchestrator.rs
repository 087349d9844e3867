//! Measurement Orchestrator: arm, wait with a bound, snapshot, convert.
//!
//! Every operation takes `&mut self`, so at most one measurement is outstanding. Tasks that
//! need to share one orchestrator have to serialize access themselves.
//!
//! Example usage:
//!
//! ```rust,ignore
//! let mut orchestrator = Orchestrator::<Mono, _, _>::new(capture, freq_meter);
//!
//! loop {
//!     match orchestrator.measure_capture(10.millis()).await {
//!         Ok(frequencies) => defmt::info!("{}", frequencies),
//!         Err(e) => defmt::warn!("{}", e),
//!     }
//!     Mono::delay(1.secs()).await;
//! }
//! ```

use core::marker::PhantomData;

use rtic_time::Monotonic;

use crate::capture::{self, CaptureBackend, CaptureFrequencies, CaptureSample, CaptureTimer};
use crate::error::{Error, TimeoutKind};
use crate::freqm::{FreqMeter, FreqMeterBackend, FreqMeterResult};

/// Wait bound of the reference design, in monotonic ticks.
///
/// Short on purpose: a signal is expected to be present, and a disconnected input should fail
/// fast rather than stall the caller.
pub const DEFAULT_WAIT_TICKS: u64 = 10;

/// Drives both measurement paths from task context.
pub struct Orchestrator<M, C, F>
where
    M: Monotonic,
    C: CaptureBackend,
    F: FreqMeterBackend,
{
    capture: CaptureTimer<C>,
    freq_meter: FreqMeter<F>,
    _mono: PhantomData<fn() -> M>,
}

impl<M, C, F> Orchestrator<M, C, F>
where
    M: Monotonic,
    C: CaptureBackend,
    F: FreqMeterBackend,
{
    /// Take ownership of both configured paths.
    pub fn new(capture: CaptureTimer<C>, freq_meter: FreqMeter<F>) -> Self {
        Self {
            capture,
            freq_meter,
            _mono: PhantomData,
        }
    }

    /// Reset the edge counter and enable the capture completion interrupt.
    pub fn arm_capture_measurement(&mut self) {
        self.capture.arm();
    }

    /// Wait at most `timeout` for the capture interrupt to report a complete measurement.
    ///
    /// The completion interrupt is disabled afterwards on both outcomes. On timeout the sample
    /// is discarded and [`Error::Timeout`] is returned; the wait does not re-arm.
    pub async fn wait_for_capture(&mut self, timeout: M::Duration) -> Result<CaptureSample, Error> {
        let outcome = M::timeout_after(timeout, self.capture.receiver().wait()).await;

        let sample = self.capture.disarm_and_snapshot();

        match outcome {
            Ok(()) => {
                trace!(
                    "capture: cc0 = {}, cc1 = {}",
                    sample.first_edge,
                    sample.second_edge
                );
                Ok(sample)
            }
            Err(_) => {
                warn!("frequency measurement timed out");
                Err(Error::Timeout(TimeoutKind::Capture))
            }
        }
    }

    /// Convert a sample using the capture timer's tick rate.
    pub fn compute_frequency(&self, sample: &CaptureSample) -> Result<CaptureFrequencies, Error> {
        capture::compute_frequency(sample, self.capture.tick_rate_hz())
    }

    /// Arm, wait and convert in one go.
    pub async fn measure_capture(
        &mut self,
        timeout: M::Duration,
    ) -> Result<CaptureFrequencies, Error> {
        self.arm_capture_measurement();
        let sample = self.wait_for_capture(timeout).await?;
        let frequencies = self.compute_frequency(&sample)?;

        info!(
            "freq0 = {} Hz, freq1 = {} Hz",
            frequencies.from_first, frequencies.from_second
        );

        Ok(frequencies)
    }

    /// Start a frequency meter measurement.
    pub fn arm_freq_meter(&mut self) {
        self.freq_meter.arm();
    }

    /// Wait at most `timeout` for the frequency meter to complete and read its result.
    pub async fn wait_freq_meter(&mut self, timeout: M::Duration) -> Result<FreqMeterResult, Error> {
        let outcome = M::timeout_after(timeout, self.freq_meter.receiver().wait()).await;

        if outcome.is_err() {
            warn!("frequency meter measurement timed out");
            return Err(Error::Timeout(TimeoutKind::FreqMeter));
        }

        self.freq_meter.result(F::read())
    }

    /// Arm the frequency meter, wait and read in one go.
    pub async fn measure_freq_meter(
        &mut self,
        timeout: M::Duration,
    ) -> Result<FreqMeterResult, Error> {
        self.arm_freq_meter();
        let result = self.wait_freq_meter(timeout).await?;

        info!("freqm = {} Hz", result.frequency_hz);

        Ok(result)
    }

    /// The capture path.
    pub fn capture(&self) -> &CaptureTimer<C> {
        &self.capture
    }

    /// The frequency meter path.
    pub fn freq_meter(&self) -> &FreqMeter<F> {
        &self.freq_meter
    }

    /// Give back both paths.
    pub fn into_parts(self) -> (CaptureTimer<C>, FreqMeter<F>) {
        (self.capture, self.freq_meter)
    }
}
