//! Edge-Event Source: an external interrupt line that emits events instead of interrupts.
//!
//! The detector is bound to one pin and routed through the event system to the capture timer's
//! event input. Nothing here interrupts the CPU: on a fast signal an interrupt per edge would eat
//! the whole core, so the capture timer consumes the events directly.
//!
//! Routing is permanent. To change the pin or polarity, drop the capture timer that owns the
//! [`EdgeEventSource`] and route a new one.

use crate::config::{Detection, EdgeSourceConfig, EventRouteConfig, EventUser};
use crate::error::{ConfigError, Error};

/// Handle to an allocated event system channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventChannel(pub u8);

/// Register-level access to the event system and the external interrupt controller.
pub trait EventSystem {
    /// Allocate a channel carrying events from `route.generator`. `None` if all channels are in
    /// use.
    fn allocate_channel(&mut self, route: &EventRouteConfig) -> Option<EventChannel>;

    /// Connect `user` to the output of `channel`.
    fn attach_user(&mut self, channel: EventChannel, user: EventUser);

    /// Apply pin multiplexing, pull and detection criteria for `config.line`.
    fn configure_line(&mut self, config: &EdgeSourceConfig);

    /// Make `line` generate an event on detection. The line's CPU interrupt stays disabled.
    fn enable_line_event(&mut self, line: u8);
}

/// A routed edge source. Owning one means events from its line reach the capture timer.
#[derive(Debug)]
pub struct EdgeEventSource {
    config: EdgeSourceConfig,
    route: EventRouteConfig,
    channel: EventChannel,
}

impl EdgeEventSource {
    /// Wire `config`'s line through the event system along `route`.
    pub fn route<S: EventSystem>(
        events: &mut S,
        config: EdgeSourceConfig,
        route: EventRouteConfig,
    ) -> Result<Self, Error> {
        config.validate()?;

        let channel = events
            .allocate_channel(&route)
            .ok_or(ConfigError::NoEventChannel)?;
        events.attach_user(channel, route.user);
        events.configure_line(&config);
        events.enable_line_event(config.line);

        debug!(
            "edge source: pin {} on line {} routed over event channel {}",
            config.pin, config.line, channel.0
        );

        Ok(Self {
            config,
            route,
            channel,
        })
    }

    /// Route `config` to timer 0 over the default path.
    pub fn route_default<S: EventSystem>(
        events: &mut S,
        config: EdgeSourceConfig,
    ) -> Result<Self, Error> {
        let route = EventRouteConfig::for_source(&config);
        Self::route(events, config, route)
    }

    /// External interrupt line in use.
    pub fn line(&self) -> u8 {
        self.config.line
    }

    /// Allocated event channel.
    pub fn channel(&self) -> EventChannel {
        self.channel
    }

    /// Detection criteria of the line.
    pub fn detection(&self) -> Detection {
        self.config.detection
    }

    /// Full pin configuration.
    pub fn config(&self) -> &EdgeSourceConfig {
        &self.config
    }

    /// The route the events take.
    pub fn event_route(&self) -> &EventRouteConfig {
        &self.route
    }
}
