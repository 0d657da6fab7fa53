//! Clock configuration for the RT600
//!
//! Only the rates the capture and signal drivers depend on are tracked here. Nothing is
//! reprogrammed in the clock tree; the values describe how the boot ROM left it.

use core::sync::atomic::{AtomicU32, Ordering};

/// Rate of the 16 MHz free-running oscillator feeding the CTIMERs.
pub const SFRO_HZ: u32 = 16_000_000;

/// Main clock rate after boot.
pub const MAIN_HZ: u32 = 12_000_000;

/// Rate of the 48 MHz free-running oscillator.
pub const FFRO_HZ: u32 = 48_000_000;

static SFRO: AtomicU32 = AtomicU32::new(SFRO_HZ);
static MAIN: AtomicU32 = AtomicU32::new(MAIN_HZ);

/// units per second
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hertz(pub u32);

/// 1^(-6) seconds
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MicroSeconds(pub u32);

impl Hertz {
    /// `mhz` megahertz, saturating at `u32::MAX` Hz.
    pub const fn mhz(mhz: u32) -> Self {
        Self(mhz.saturating_mul(1_000_000))
    }
}

/// A zero period has no frequency and converts to `Hertz(0)`.
impl From<MicroSeconds> for Hertz {
    fn from(value: MicroSeconds) -> Self {
        // 1us = 1 MHz, 2us = 500 kHz, etc.
        Hertz(1_000_000u32.checked_div(value.0).unwrap_or(0))
    }
}

/// Clock configuration;
#[non_exhaustive]
pub struct ClockConfig {
    /// External crystal.
    pub crystal: Hertz,
    /// SFRO, the CTIMER function clock.
    pub sfro: Hertz,
    /// Main clock, the SCTimer function clock.
    pub main: Hertz,
}

impl ClockConfig {
    /// Clock configuration derived from external crystal.
    pub fn crystal(crystal_hz: u32) -> Self {
        Self {
            crystal: Hertz(crystal_hz),
            sfro: Hertz(SFRO_HZ),
            main: Hertz(MAIN_HZ),
        }
    }
}

/// Current CTIMER tick rate.
pub fn sfro() -> Hertz {
    Hertz(SFRO.load(Ordering::Relaxed))
}

/// Current main clock rate.
pub fn main_clock() -> Hertz {
    Hertz(MAIN.load(Ordering::Relaxed))
}

/// safety: must be called exactly once at bootup
#[cfg_attr(not(feature = "_mimxrt685s"), allow(dead_code))]
pub(crate) unsafe fn init(config: ClockConfig) {
    SFRO.store(config.sfro.0, Ordering::Relaxed);
    MAIN.store(config.main.0, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_to_rate() {
        assert_eq!(Hertz::from(MicroSeconds(1)), Hertz::mhz(1));
        assert_eq!(Hertz::from(MicroSeconds(1000)), Hertz(1_000));
        assert_eq!(Hertz::from(MicroSeconds(0)), Hertz(0));
    }

    #[test]
    fn megahertz_saturates() {
        assert_eq!(Hertz::mhz(4294), Hertz(4_294_000_000));
        assert_eq!(Hertz::mhz(4295), Hertz(u32::MAX));
    }

    #[test]
    fn boot_rates() {
        let config = ClockConfig::crystal(24_000_000);
        assert_eq!(config.sfro, Hertz::mhz(16));
        assert_eq!(config.main, Hertz::mhz(12));
        assert_eq!(sfro(), Hertz(SFRO_HZ));
    }
}
