//! Configuration values handed to the peripheral backends.
//!
//! Defaults reproduce the reference board: a 1 MHz capture tick derived from generator 2, a
//! frequency meter gated by 48 cycles of the 6 MHz generator 1, and external interrupt line 2
//! detecting rising edges.

use fugit::{HertzU32, RateExtU32};

use crate::error::ConfigError;

/// Number of external interrupt lines on the event controller.
pub const EXTINT_LINES: u8 = 16;

/// A generic clock generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockGenerator(pub u8);

impl ClockGenerator {
    /// Main clock generator.
    pub const GCLK0: Self = Self(0);
    /// Default frequency meter reference.
    pub const GCLK1: Self = Self(1);
    /// Default capture timer clock.
    pub const GCLK2: Self = Self(2);
    /// Generator fed from the signal input pin.
    pub const GCLK4: Self = Self(4);
}

/// Counter width of the capture timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CounterWidth {
    /// 8-bit counter.
    Bits8,
    /// 16-bit counter.
    Bits16,
    /// 32-bit counter (two chained timers).
    Bits32,
}

impl CounterWidth {
    /// Largest value the counter can hold.
    pub const fn max_count(self) -> u32 {
        match self {
            CounterWidth::Bits8 => u8::MAX as u32,
            CounterWidth::Bits16 => u16::MAX as u32,
            CounterWidth::Bits32 => u32::MAX,
        }
    }
}

/// Timer clock prescaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum Prescaler {
    Div1,
    Div2,
    Div4,
    Div8,
    Div16,
    Div64,
    Div256,
    Div1024,
}

impl Prescaler {
    /// The division factor.
    pub const fn divisor(self) -> u32 {
        match self {
            Prescaler::Div1 => 1,
            Prescaler::Div2 => 2,
            Prescaler::Div4 => 4,
            Prescaler::Div8 => 8,
            Prescaler::Div16 => 16,
            Prescaler::Div64 => 64,
            Prescaler::Div256 => 256,
            Prescaler::Div1024 => 1024,
        }
    }
}

/// What the timer does when an event arrives on its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventAction {
    /// Ignore events.
    Off,
    /// Restart the counter.
    Retrigger,
    /// Count events.
    Count,
    /// Start the counter.
    Start,
    /// Reset on the first event, then capture pulse width into channel 0 and period into
    /// channel 1.
    PulseWidthPeriod,
    /// Reset on the first event, then capture period into channel 0 and pulse width into
    /// channel 1.
    PeriodPulseWidth,
}

impl EventAction {
    /// Whether the first event of a cycle resets the counter and the next two are captured.
    pub const fn resets_then_captures(self) -> bool {
        matches!(
            self,
            EventAction::PulseWidthPeriod | EventAction::PeriodPulseWidth
        )
    }
}

/// Capture timer setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct CaptureConfig {
    /// Counter width. Capture requires [`CounterWidth::Bits16`].
    pub counter_width: CounterWidth,
    /// Generator clocking the timer.
    pub generator: ClockGenerator,
    /// Frequency of `generator`.
    pub generator_hz: HertzU32,
    /// Prescaler between the generator and the counter.
    pub prescaler: Prescaler,
    /// Reaction to input events.
    pub event_action: EventAction,
    /// Invert the event input before it reaches the timer.
    pub invert_event_input: bool,
    /// Capture enable per channel.
    pub capture_channels: [bool; 2],
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            counter_width: CounterWidth::Bits16,
            generator: ClockGenerator::GCLK2,
            generator_hz: 2.MHz(),
            prescaler: Prescaler::Div2,
            event_action: EventAction::PulseWidthPeriod,
            invert_event_input: true,
            capture_channels: [true, true],
        }
    }
}

impl CaptureConfig {
    /// Counter tick rate after prescaling.
    pub fn tick_rate_hz(&self) -> u32 {
        self.generator_hz.raw() / self.prescaler.divisor()
    }

    /// Lowest frequency that fits in one counter period.
    ///
    /// Slower signals saturate the counter; the timer does not flag this.
    pub fn min_frequency_hz(&self) -> u32 {
        self.tick_rate_hz() / self.counter_width.max_count()
    }

    /// Check the configuration against what the capture path supports.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.counter_width != CounterWidth::Bits16 {
            return Err(ConfigError::UnsupportedCounterWidth);
        }
        if !self.event_action.resets_then_captures() {
            return Err(ConfigError::UnsupportedEventAction);
        }
        if !self.capture_channels.iter().all(|&enabled| enabled) {
            return Err(ConfigError::CaptureChannelDisabled);
        }
        if self.tick_rate_hz() == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        Ok(())
    }
}

/// Clock measured by the frequency meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasuredClock {
    /// The main clock, generator 0.
    Internal,
    /// The signal input pin, routed in through generator 4.
    External,
}

impl MeasuredClock {
    /// Generator the meter is connected to.
    pub const fn generator(self) -> ClockGenerator {
        match self {
            MeasuredClock::Internal => ClockGenerator::GCLK0,
            MeasuredClock::External => ClockGenerator::GCLK4,
        }
    }
}

/// Frequency meter setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct FreqMeterConfig {
    /// Generator providing the reference clock.
    pub reference: ClockGenerator,
    /// Frequency of `reference`.
    pub reference_hz: HertzU32,
    /// Clock under measurement.
    pub measured: MeasuredClock,
    /// Number of reference cycles the measurement is gated by.
    pub gate_cycles: u8,
}

impl Default for FreqMeterConfig {
    fn default() -> Self {
        Self {
            reference: ClockGenerator::GCLK1,
            reference_hz: 6.MHz(),
            measured: MeasuredClock::Internal,
            gate_cycles: 48,
        }
    }
}

impl FreqMeterConfig {
    /// Same configuration measuring `measured` instead.
    pub fn with_measured(mut self, measured: MeasuredClock) -> Self {
        self.measured = measured;
        self
    }

    /// Check the configuration against what the meter supports.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gate_cycles == 0 {
            return Err(ConfigError::ZeroGateCycles);
        }
        if self.reference_hz.raw() == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        Ok(())
    }
}

/// Input pull resistor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    /// Floating input.
    None,
    /// Pull-up.
    Up,
    /// Pull-down.
    Down,
}

/// What the external interrupt controller detects on its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Detection {
    /// Rising edges. With pulse-width/period capture this yields pulse width then period.
    Rising,
    /// Falling edges.
    Falling,
    /// Both edges.
    Both,
    /// High level. Capture then reports the period twice.
    High,
    /// Low level.
    Low,
}

impl Detection {
    /// Whether this is edge rather than level detection.
    pub const fn is_edge(self) -> bool {
        matches!(self, Detection::Rising | Detection::Falling | Detection::Both)
    }
}

/// Pin and detector setup of the edge source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct EdgeSourceConfig {
    /// GPIO pin multiplexed to the external interrupt controller.
    pub pin: u32,
    /// External interrupt line the pin is wired to.
    pub line: u8,
    /// Pull configuration of the pin.
    pub pull: Pull,
    /// Detection criteria.
    pub detection: Detection,
}

impl Default for EdgeSourceConfig {
    fn default() -> Self {
        Self {
            pin: 2,
            line: 2,
            pull: Pull::None,
            detection: Detection::Rising,
        }
    }
}

impl EdgeSourceConfig {
    /// Source on `pin`, wired to external interrupt `line`, with default pull and detection.
    pub fn new(pin: u32, line: u8) -> Self {
        Self {
            pin,
            line,
            ..Self::default()
        }
    }

    /// Same configuration with another detection criteria.
    pub fn with_detection(mut self, detection: Detection) -> Self {
        self.detection = detection;
        self
    }

    /// Same configuration with another pull setting.
    pub fn with_pull(mut self, pull: Pull) -> Self {
        self.pull = pull;
        self
    }

    /// Check the line exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.line >= EXTINT_LINES {
            return Err(ConfigError::ExtIntLineOutOfRange);
        }
        Ok(())
    }
}

/// Peripheral producing events into the event system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventGenerator {
    /// An external interrupt line.
    ExtInt(u8),
}

/// Peripheral consuming events from the event system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventUser {
    /// Event input of timer/counter `n`.
    TimerEvent(u8),
}

/// Edge selection on an event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum EventEdge {
    None,
    Rising,
    Falling,
    Both,
}

/// Event channel path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum EventPath {
    Synchronous,
    Resynchronized,
    Asynchronous,
}

/// Route from the edge source to the capture timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct EventRouteConfig {
    /// Event producer.
    pub generator: EventGenerator,
    /// Event consumer.
    pub user: EventUser,
    /// Edge selection.
    pub edge_detect: EventEdge,
    /// Channel path.
    pub path: EventPath,
}

impl Default for EventRouteConfig {
    fn default() -> Self {
        Self::for_source(&EdgeSourceConfig::default())
    }
}

impl EventRouteConfig {
    /// Route the line of `source` to the event input of timer 0.
    pub fn for_source(source: &EdgeSourceConfig) -> Self {
        let edge_detect = match source.detection {
            Detection::Rising | Detection::High => EventEdge::Rising,
            Detection::Falling | Detection::Low => EventEdge::Falling,
            Detection::Both => EventEdge::Both,
        };

        Self {
            generator: EventGenerator::ExtInt(source.line),
            user: EventUser::TimerEvent(0),
            edge_detect,
            path: EventPath::Asynchronous,
        }
    }

    /// Same route delivered to timer `timer` instead.
    pub fn with_timer(mut self, timer: u8) -> Self {
        self.user = EventUser::TimerEvent(timer);
        self
    }
}
