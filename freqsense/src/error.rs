use core::fmt;

use freqsense_sync::AlreadyClaimed;

/// Which bounded wait ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutKind {
    /// The capture timer did not see enough edges.
    Capture,
    /// The frequency meter did not report completion.
    FreqMeter,
    /// The frequency meter's measured clock never synchronized, usually because no signal is
    /// present on its input.
    ClockSync,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutKind::Capture => f.write_str("frequency measurement timed out"),
            TimeoutKind::FreqMeter => f.write_str("frequency meter measurement timed out"),
            TimeoutKind::ClockSync => f.write_str("frequency meter clock synchronization timed out"),
        }
    }
}

/// A configuration value the hardware cannot honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum ConfigError {
    /// The frequency meter gate must span at least one reference cycle.
    ZeroGateCycles,
    /// A clock feeding a counter runs at 0 Hz.
    ZeroTickRate,
    /// The external interrupt line does not exist.
    ExtIntLineOutOfRange,
    /// Pulse-width/period capture needs both capture channels.
    CaptureChannelDisabled,
    /// Only the 16-bit counter mode is supported for capture.
    UnsupportedCounterWidth,
    /// The timer must reset on the first event and capture the next two.
    UnsupportedEventAction,
    /// The event system has no free channel for the route.
    NoEventChannel,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ConfigError::ZeroGateCycles => "gate cycle count is zero",
            ConfigError::ZeroTickRate => "counter clock rate is zero",
            ConfigError::ExtIntLineOutOfRange => "external interrupt line out of range",
            ConfigError::CaptureChannelDisabled => "capture channel disabled",
            ConfigError::UnsupportedCounterWidth => "unsupported counter width",
            ConfigError::UnsupportedEventAction => "unsupported timer event action",
            ConfigError::NoEventChannel => "no free event channel",
        };
        f.write_str(msg)
    }
}

/// Errors surfaced by the measurement paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// A bounded wait expired. The captured registers must not be trusted.
    Timeout(TimeoutKind),
    /// A captured count was zero, so no frequency can be derived from it.
    InvalidSample,
    /// The frequency meter's counter overflowed during the gate time.
    CounterOverflow,
    /// The handoff for this path already has a receiver.
    ResourceExhausted,
    /// Rejected configuration.
    Config(ConfigError),
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<AlreadyClaimed> for Error {
    fn from(_: AlreadyClaimed) -> Self {
        Error::ResourceExhausted
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timeout(kind) => fmt::Display::fmt(kind, f),
            Error::InvalidSample => f.write_str("invalid capture sample"),
            Error::CounterOverflow => f.write_str("frequency meter counter overflow"),
            Error::ResourceExhausted => f.write_str("measurement handoff not available"),
            Error::Config(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}
