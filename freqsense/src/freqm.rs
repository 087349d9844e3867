//! Frequency-Meter path.
//!
//! The meter counts cycles of the measured clock while a gate of `gate_cycles` reference cycles
//! is open, then raises its completion interrupt. The frequency is
//! `value * reference_hz / gate_cycles`.
//!
//! Enabling the meter synchronizes the measured clock channel, which never finishes if no
//! clock is present. [`FreqMeter::new`] bounds that wait and reports
//! [`TimeoutKind::ClockSync`] instead of hanging.

use core::fmt;
use core::future::poll_fn;
use core::marker::PhantomData;
use core::task::Poll;

use freqsense_sync::{Handoff, HandoffReceiver};
use rtic_time::Monotonic;

use crate::config::FreqMeterConfig;
use crate::error::{Error, TimeoutKind};

/// Raw view of the meter's result and status registers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FreqMeterReading {
    /// Measured clock cycles counted during the gate.
    pub value: u32,
    /// The counter overflowed during the gate.
    pub overflow: bool,
}

/// Register-level access to the frequency meter.
pub trait FreqMeterBackend: 'static + Sized {
    /// Select reference and measured clocks and the gate length.
    fn configure(config: &FreqMeterConfig);

    /// Whether the measured clock channel is still synchronizing.
    fn is_syncing() -> bool;

    /// Enable the peripheral.
    fn enable();

    /// Start one measurement.
    fn start();

    /// Read the result and status registers, clearing the overflow flag.
    fn read() -> FreqMeterReading;

    /// Enable the measurement-done interrupt.
    fn enable_interrupt();

    /// Disable the measurement-done interrupt.
    fn disable_interrupt();

    /// The state shared with the interrupt handler.
    fn state() -> &'static FreqMeterState;
}

/// Data shared between the meter's interrupt and the task.
pub struct FreqMeterState {
    handoff: Handoff,
}

impl Default for FreqMeterState {
    fn default() -> Self {
        Self::new()
    }
}

impl FreqMeterState {
    /// Create the state, usually in a `static`.
    pub const fn new() -> Self {
        Self {
            handoff: Handoff::new(),
        }
    }

    /// Call this in the meter's measurement-done interrupt handler.
    ///
    /// # Safety
    ///
    /// It's always safe to call, but it must only be called from the frequency meter interrupt
    /// for correct operation.
    pub unsafe fn on_interrupt(&self) {
        self.handoff.signal();
    }

    /// The handoff signaled on completion.
    pub fn handoff(&self) -> &Handoff {
        &self.handoff
    }
}

/// A completed frequency meter measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FreqMeterResult {
    /// Raw count of measured cycles per gate.
    pub ratio: u32,
    /// Frequency of the measured clock.
    pub frequency_hz: u32,
}

impl fmt::Display for FreqMeterResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "freqm = {} Hz", self.frequency_hz)
    }
}

/// Owner of a configured frequency meter.
pub struct FreqMeter<B: FreqMeterBackend> {
    config: FreqMeterConfig,
    receiver: HandoffReceiver<'static>,
    _backend: PhantomData<B>,
}

impl<B: FreqMeterBackend> FreqMeter<B> {
    /// Configure the meter and wait at most `sync_timeout` for the measured clock to
    /// synchronize.
    pub async fn new<M: Monotonic>(
        config: FreqMeterConfig,
        sync_timeout: M::Duration,
    ) -> Result<Self, Error> {
        config.validate()?;

        let receiver = B::state().handoff.claim().map_err(|e| {
            error!("frequency meter handoff already claimed");
            e
        })?;

        B::configure(&config);

        let synced = M::timeout_after(
            sync_timeout,
            poll_fn(|cx| {
                if B::is_syncing() {
                    // No interrupt reports the end of synchronization, so keep getting polled.
                    cx.waker().wake_by_ref();
                    Poll::Pending
                } else {
                    Poll::Ready(())
                }
            }),
        )
        .await;

        if synced.is_err() {
            warn!("frequency meter: measured clock did not synchronize, no signal?");
            return Err(Error::Timeout(TimeoutKind::ClockSync));
        }

        B::enable_interrupt();
        debug!("frequency meter: gate of {} reference cycles", config.gate_cycles);

        Ok(Self {
            config,
            receiver,
            _backend: PhantomData,
        })
    }

    /// Drop a stale completion and start a measurement.
    pub fn arm(&mut self) {
        B::state().handoff.clear();
        B::enable();
        B::start();
    }

    /// Convert a register reading into a frequency.
    pub fn result(&self, reading: FreqMeterReading) -> Result<FreqMeterResult, Error> {
        if reading.overflow {
            warn!("frequency meter: counter overflow");
            return Err(Error::CounterOverflow);
        }

        let hz = u64::from(reading.value) * u64::from(self.config.reference_hz.raw())
            / u64::from(self.config.gate_cycles);

        Ok(FreqMeterResult {
            ratio: reading.value,
            frequency_hz: u32::try_from(hz).unwrap_or(u32::MAX),
        })
    }

    pub(crate) fn receiver(&mut self) -> &mut HandoffReceiver<'static> {
        &mut self.receiver
    }

    /// Active configuration.
    pub fn config(&self) -> &FreqMeterConfig {
        &self.config
    }
}

impl<B: FreqMeterBackend> Drop for FreqMeter<B> {
    fn drop(&mut self) {
        B::disable_interrupt();
    }
}
