//! Edge-capture channels
//!
//! A channel owns a free-running counter that latches its value and restarts whenever the
//! selected edge appears on the channel input, then raises an interrupt. The bound handler,
//! [`on_edge_captured`], moves the latched interval into the channel's watch slot and
//! re-arms the channel before the next edge arrives.
//!
//! ```text
//! Unconfigured -> Armed -> (edge) Latched -> (interrupt) Read and re-armed -> Armed
//! ```
//!
//! No overrun detection is done. An edge that lands before the handler ran is folded into
//! the next measurement, which then spans two intervals.

use crate::clocks::Hertz;
use crate::measurement::Measurements;

#[cfg(feature = "_mimxrt685s")]
pub mod ctimer;

/// Number of capture channels.
pub const CHANNEL_COUNT: usize = 6;

/// Capture channel, numbered 1 to 6.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelId {
    /// PCB A temperature PWM input
    Ch1,
    /// PCB B temperature PWM input
    Ch2,
    /// PCB C temperature PWM input
    Ch3,
    /// MOSFET A temperature PWM input
    Ch4,
    /// MOSFET B temperature PWM input
    Ch5,
    /// MOSFET C temperature PWM input
    Ch6,
}

impl ChannelId {
    /// All channels in order.
    pub const ALL: [ChannelId; CHANNEL_COUNT] = [
        ChannelId::Ch1,
        ChannelId::Ch2,
        ChannelId::Ch3,
        ChannelId::Ch4,
        ChannelId::Ch5,
        ChannelId::Ch6,
    ];

    /// Zero-based slot index.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Channel number, 1 to 6.
    pub const fn number(self) -> u8 {
        self as u8 + 1
    }

    /// Channel with number `n`, if there is one.
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1..=6 => Some(Self::ALL[n as usize - 1]),
            _ => None,
        }
    }

    /// Board signal wired to this channel.
    pub const fn label(self) -> &'static str {
        match self {
            ChannelId::Ch1 => "pcb-a-temp",
            ChannelId::Ch2 => "pcb-b-temp",
            ChannelId::Ch3 => "pcb-c-temp",
            ChannelId::Ch4 => "mosfet-a-temp",
            ChannelId::Ch5 => "mosfet-b-temp",
            ChannelId::Ch6 => "mosfet-c-temp",
        }
    }
}

/// Edge that triggers a capture.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Low to high
    Rising,
    /// High to low
    Falling,
    /// Both edges
    Both,
}

/// Capture channel configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Triggering edge.
    pub edge: Edge,
    /// Restart the interval on every captured edge, so each measurement is the time since
    /// the previous edge. When cleared, the latched value is the raw counter.
    pub reset_on_event: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            edge: Edge::Rising,
            reset_on_event: true,
        }
    }
}

/// Register-level operations of one capture channel.
///
/// Implementations touch only the hardware of their own channel, except for flags that
/// are shared by construction (a peripheral-level summary flag, a shared counter start).
pub trait CaptureHw {
    /// Stops edge detection, latching and the channel interrupt.
    fn halt(&mut self);

    /// Clears the channel interrupt flag together with any peripheral-level summary flag.
    fn clear_pending(&mut self);

    /// Selects the edge that latches the counter.
    fn set_edge(&mut self, edge: Edge);

    /// Enables or disables restarting the interval on every captured edge.
    fn set_reset_on_event(&mut self, enable: bool);

    /// Routes input `input` of the peripheral input multiplexer to this channel.
    fn select_input(&mut self, input: u32);

    /// Starts the free-running counter and enables latching.
    fn start(&mut self);

    /// Arms the channel for the next capture.
    fn rearm(&mut self);

    /// Unmasks the capture interrupt.
    fn enable_interrupt(&mut self);

    /// Reads the interval latched by the last capture, in counter ticks.
    fn latched(&mut self) -> u32;
}

/// Acknowledge step of the interrupt controller shared by several channels.
pub trait GroupAck {
    /// Lets the other sources of the group interrupt again.
    fn acknowledge(&self);
}

/// Capture interrupt body for channel `id`.
///
/// The latched value is read before anything clears or re-arms the channel.
pub fn on_edge_captured<H: CaptureHw, A: GroupAck>(id: ChannelId, hw: &mut H, group: &A, watch: &Measurements) {
    let ticks = hw.latched();
    watch.record(id, ticks);

    hw.clear_pending();
    hw.rearm();
    group.acknowledge();

    trace!("capture {:?}: {} ticks", id, ticks);
}

/// Configured capture channel.
pub struct EdgeCapture<'w, H: CaptureHw> {
    id: ChannelId,
    hw: H,
    watch: &'w Measurements,
}

impl<'w, H: CaptureHw> EdgeCapture<'w, H> {
    /// Binds channel `id` to input `input` and leaves it armed with its interrupt enabled.
    pub fn new(id: ChannelId, mut hw: H, input: u32, config: Config, watch: &'w Measurements) -> Self {
        hw.halt();
        hw.clear_pending();

        hw.set_edge(config.edge);
        hw.set_reset_on_event(config.reset_on_event);
        hw.select_input(input);

        hw.start();
        hw.rearm();
        hw.enable_interrupt();

        debug!("capture {:?} ({}) armed on input {}", id, id.label(), input);

        Self { id, hw, watch }
    }

    /// Channel id.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Latest interval measured by this channel.
    pub fn latest(&self) -> u32 {
        self.watch.latest(self.id)
    }

    /// Waits for the next capture and returns its interval.
    pub async fn next_interval(&self) -> u32 {
        self.watch.wait(self.id).await
    }

    /// Runs the capture interrupt body for this channel.
    ///
    /// For dispatch schemes where the driver itself is reachable from the interrupt.
    pub fn on_interrupt<A: GroupAck>(&mut self, group: &A) {
        on_edge_captured(self.id, &mut self.hw, group, self.watch);
    }

    /// Stops the channel and returns its hardware.
    pub fn release(mut self) -> H {
        self.hw.halt();
        self.hw
    }
}

/// Interval reported for a capture of a free-running counter.
///
/// `previous` is the counter value latched by the previous capture of the same channel, or
/// the counter value when the channel started. The counter wraps at `u32::MAX`.
pub const fn counter_interval(previous: u32, raw: u32, reset_on_event: bool) -> u32 {
    if reset_on_event {
        raw.wrapping_sub(previous)
    } else {
        raw
    }
}

/// Converts an interval in ticks of a `tick_rate` counter to microseconds, saturating.
pub fn ticks_to_micros(ticks: u32, tick_rate: Hertz) -> u32 {
    if tick_rate.0 == 0 {
        return 0;
    }
    let us = u64::from(ticks) * 1_000_000 / u64::from(tick_rate.0);
    u32::try_from(us).unwrap_or(u32::MAX)
}
