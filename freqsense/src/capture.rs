//! Capture Timer Controller.
//!
//! The timer runs a free-running 16-bit counter in pulse-width/period mode: the first event of a
//! cycle resets the counter, the next two latch it into capture channels 0 and 1. Every captured
//! event raises the channel interrupt, whose handler is [`CaptureState::on_interrupt`].
//!
//! # Sharing
//!
//! The sample and the edge counter live in a [`CaptureState`] that the interrupt handler writes
//! and the task reads. Both sides go through a critical section, so a reader never sees channel
//! values from two different interrupts.

use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;

use critical_section::{CriticalSection, Mutex};
use freqsense_sync::{Handoff, HandoffReceiver};

use crate::config::CaptureConfig;
use crate::edge::EdgeEventSource;
use crate::error::Error;

/// Interrupts needed for one measurement: the reset edge plus two captured edges.
pub const COMPLETION_THRESHOLD: u32 = 3;

/// A capture channel of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureChannel {
    /// Channel 0, latched on the second event of a cycle.
    Cc0,
    /// Channel 1, latched on the third event of a cycle.
    Cc1,
}

/// Counter values latched on the second and third event of a cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureSample {
    /// Channel 0.
    pub first_edge: u16,
    /// Channel 1.
    pub second_edge: u16,
}

/// Register-level access to the capture timer.
///
/// Implementations are zero-sized and reach the peripheral through its fixed address, like a
/// `TimerQueueBackend`. [`CaptureBackend::state`] returns the `static` shared with the interrupt
/// handler.
pub trait CaptureBackend: 'static + Sized {
    /// Apply counter width, clock, prescaler, event action and channel enables, then enable the
    /// timer. The counter does not run until the first event resets it.
    fn configure(config: &CaptureConfig);

    /// Read a capture channel register.
    fn read_channel(channel: CaptureChannel) -> u16;

    /// Enable the channel 1 capture interrupt.
    fn enable_interrupt();

    /// Disable the channel 1 capture interrupt. Must be harmless if already disabled.
    fn disable_interrupt();

    /// The state shared with the interrupt handler.
    fn state() -> &'static CaptureState;
}

#[derive(Clone, Copy)]
struct Shared {
    sample: CaptureSample,
    edges: u32,
}

/// Data written by the capture interrupt and read by the task.
pub struct CaptureState {
    shared: Mutex<Cell<Shared>>,
    handoff: Handoff,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureState {
    /// Create the state, usually in a `static`.
    pub const fn new() -> Self {
        Self {
            shared: Mutex::new(Cell::new(Shared {
                sample: CaptureSample {
                    first_edge: 0,
                    second_edge: 0,
                },
                edges: 0,
            })),
            handoff: Handoff::new(),
        }
    }

    /// Call this in the capture interrupt handler of the timer behind `B`.
    ///
    /// Snapshots both channels, counts the event and signals the handoff when the count reaches
    /// [`COMPLETION_THRESHOLD`]. Events past the threshold are counted but leave the completed
    /// sample untouched until the next arm. It never blocks and never disables its own interrupt.
    ///
    /// # Safety
    ///
    /// It's always safe to call, but it must only be called from the capture interrupt for
    /// correct operation.
    pub unsafe fn on_interrupt<B: CaptureBackend>(&self) {
        let edges = critical_section::with(|cs| {
            let cell = self.shared.borrow(cs);
            let mut shared = cell.get();

            // Reading the channels acknowledges the capture, so it happens on every event.
            let sample = CaptureSample {
                first_edge: B::read_channel(CaptureChannel::Cc0),
                second_edge: B::read_channel(CaptureChannel::Cc1),
            };
            // The sample is frozen once the completing event has been stored.
            if shared.edges < COMPLETION_THRESHOLD {
                shared.sample = sample;
            }
            shared.edges = shared.edges.saturating_add(1);
            cell.set(shared);

            shared.edges
        });

        if edges == COMPLETION_THRESHOLD {
            self.handoff.signal();
        }
    }

    /// Events counted since the last arm.
    pub fn edge_count(&self) -> u32 {
        critical_section::with(|cs| self.shared.borrow(cs).get().edges)
    }

    /// Copy of the latest sample.
    pub fn snapshot(&self) -> CaptureSample {
        critical_section::with(|cs| self.snapshot_in(cs))
    }

    fn snapshot_in(&self, cs: CriticalSection<'_>) -> CaptureSample {
        self.shared.borrow(cs).get().sample
    }

    fn reset_edges(&self, cs: CriticalSection<'_>) {
        let cell = self.shared.borrow(cs);
        let mut shared = cell.get();
        shared.edges = 0;
        cell.set(shared);
    }

    /// The handoff signaled on completion.
    pub fn handoff(&self) -> &Handoff {
        &self.handoff
    }
}

/// Owner of a configured capture timer and its routed edge source.
pub struct CaptureTimer<B: CaptureBackend> {
    config: CaptureConfig,
    source: EdgeEventSource,
    receiver: HandoffReceiver<'static>,
    _backend: PhantomData<B>,
}

impl<B: CaptureBackend> CaptureTimer<B> {
    /// Configure the timer to capture events from `source`.
    ///
    /// The completion interrupt is left disabled until [`CaptureTimer::arm`].
    pub fn new(config: CaptureConfig, source: EdgeEventSource) -> Result<Self, Error> {
        config.validate()?;

        let receiver = B::state().handoff.claim().map_err(|e| {
            error!("capture handoff already claimed");
            e
        })?;

        B::disable_interrupt();
        B::configure(&config);

        debug!(
            "capture timer: {} Hz tick, floor {} Hz",
            config.tick_rate_hz(),
            config.min_frequency_hz()
        );

        Ok(Self {
            config,
            source,
            receiver,
            _backend: PhantomData,
        })
    }

    /// Start a new measurement cycle.
    ///
    /// Resets the edge counter and drops a stale signal with interrupts masked, then enables the
    /// completion interrupt.
    pub fn arm(&mut self) {
        critical_section::with(|cs| {
            let state = B::state();
            state.reset_edges(cs);
            state.handoff.clear();
            B::enable_interrupt();
        });
    }

    /// Disable the completion interrupt.
    pub fn disarm(&mut self) {
        B::disable_interrupt();
    }

    /// Disable the completion interrupt and copy the sample in one critical section.
    pub(crate) fn disarm_and_snapshot(&mut self) -> CaptureSample {
        critical_section::with(|cs| {
            B::disable_interrupt();
            B::state().snapshot_in(cs)
        })
    }

    pub(crate) fn receiver(&mut self) -> &mut HandoffReceiver<'static> {
        &mut self.receiver
    }

    /// Events counted since the last arm.
    pub fn edge_count(&self) -> u32 {
        B::state().edge_count()
    }

    /// Counter tick rate.
    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz()
    }

    /// Active configuration.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// The edge source feeding the timer.
    pub fn source(&self) -> &EdgeEventSource {
        &self.source
    }
}

impl<B: CaptureBackend> Drop for CaptureTimer<B> {
    fn drop(&mut self) {
        B::disable_interrupt();
    }
}

/// Frequencies derived from both channels of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureFrequencies {
    /// From channel 0.
    pub from_first: u32,
    /// From channel 1.
    pub from_second: u32,
}

impl fmt::Display for CaptureFrequencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "freq0 = {} Hz\r\nfreq1 = {} Hz",
            self.from_first, self.from_second
        )
    }
}

/// Convert both captured counts to `tick_rate_hz / count`.
///
/// A zero count means the counter wrapped or the signal is degenerate and yields
/// [`Error::InvalidSample`].
pub fn compute_frequency(
    sample: &CaptureSample,
    tick_rate_hz: u32,
) -> Result<CaptureFrequencies, Error> {
    if sample.first_edge == 0 || sample.second_edge == 0 {
        warn!(
            "invalid capture sample: cc0 = {}, cc1 = {}",
            sample.first_edge, sample.second_edge
        );
        return Err(Error::InvalidSample);
    }

    if sample.first_edge == u16::MAX || sample.second_edge == u16::MAX {
        warn!("capture counter saturated, signal is at or below the frequency floor");
    }

    Ok(CaptureFrequencies {
        from_first: tick_rate_hz / u32::from(sample.first_edge),
        from_second: tick_rate_hz / u32::from(sample.second_edge),
    })
}
