//! Test-signal generator
// =====
// A timebase counts up from zero to the configured period and wraps. Every wrap toggles one
// output, so the output is a square wave with half period equal to the timebase period.
// It only exists to feed the capture channels a known interval through an external loopback
// wire; nothing in the measurement path depends on it.
//
// Up-down mode counts back to zero after reaching the period and toggles only at the top,
// doubling the interval between toggles.

use crate::clocks::Hertz;

#[cfg(feature = "_mimxrt685s")]
pub mod sct;

/// Period programmed by [`Config::default`], in ticks.
pub const DEFAULT_PERIOD: u32 = 1000;

/// Largest clock divider.
pub const MAX_DIVIDER: u16 = 256;

/// Signal generator error
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Period outside of the configured range
    PeriodOutOfRange,
    /// Divider is zero or above [`MAX_DIVIDER`]
    InvalidDivider,
    /// Range is empty or admits a zero period
    InvalidRange,
}

/// Counting direction of the timebase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CounterMode {
    /// Count up to the period, then wrap to zero
    Up,
    /// Count up to the period, then back down to zero
    UpDown,
}

/// Inclusive bounds for the period, in ticks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeriodRange {
    /// Shortest period
    pub min: u32,
    /// Longest period
    pub max: u32,
}

impl PeriodRange {
    /// 1000 to 8000 ticks.
    pub const DEFAULT: PeriodRange = PeriodRange { min: 1000, max: 8000 };

    /// Whether `ticks` lies in the range.
    pub fn contains(&self, ticks: u32) -> bool {
        (self.min..=self.max).contains(&ticks)
    }

    /// Non-empty and bounded away from zero.
    pub fn is_valid(&self) -> bool {
        self.min > 0 && self.min <= self.max
    }
}

/// Signal generator configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Timebase period in ticks.
    pub period: u32,
    /// Bounds for `period` and for later [`SignalGenerator::set_period`] calls.
    pub range: PeriodRange,
    /// Counting direction.
    pub mode: CounterMode,
    /// Input clock divider, 1 to [`MAX_DIVIDER`].
    pub divider: u16,
    /// Timebase output that toggles.
    pub output: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            range: PeriodRange::DEFAULT,
            mode: CounterMode::Up,
            divider: 1,
            output: 0,
        }
    }
}

impl Config {
    fn validate(&self) -> Result<(), Error> {
        if self.divider == 0 || self.divider > MAX_DIVIDER {
            return Err(Error::InvalidDivider);
        }
        if !self.range.is_valid() {
            return Err(Error::InvalidRange);
        }
        if !self.range.contains(self.period) {
            return Err(Error::PeriodOutOfRange);
        }
        Ok(())
    }
}

/// Register-level operations of a counting timebase.
pub trait TimeBase {
    /// Stops the counter clock so the timebase can be reprogrammed.
    fn freeze(&mut self);

    /// Selects the counting direction.
    fn set_counter_mode(&mut self, mode: CounterMode);

    /// Sets the period in ticks.
    fn set_period(&mut self, ticks: u32);

    /// Loads the counter with `ticks`.
    fn set_phase(&mut self, ticks: u32);

    /// Makes `output` toggle whenever the counter reaches the period.
    fn toggle_on_period(&mut self, output: u8);

    /// Divides the input clock by `divider`.
    fn set_divider(&mut self, divider: u16);

    /// Restarts the counter clock.
    fn release(&mut self);
}

/// Square-wave generator built on a [`TimeBase`].
pub struct SignalGenerator<T: TimeBase> {
    timebase: T,
    config: Config,
}

impl<T: TimeBase> SignalGenerator<T> {
    /// Programs `timebase` according to `config` and starts it.
    pub fn new(mut timebase: T, config: Config) -> Result<Self, Error> {
        config.validate()?;

        timebase.freeze();
        timebase.set_counter_mode(config.mode);
        timebase.set_period(config.period);
        timebase.set_phase(0);
        timebase.toggle_on_period(config.output);
        timebase.set_divider(config.divider);
        timebase.release();

        info!(
            "signal generator: period {} ticks, divider {}, output {}",
            config.period,
            config.divider,
            config.output
        );

        Ok(Self { timebase, config })
    }

    /// Current period in ticks.
    pub fn period(&self) -> u32 {
        self.config.period
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Changes the period. The timebase is frozen while it is reprogrammed.
    pub fn set_period(&mut self, ticks: u32) -> Result<(), Error> {
        if !self.config.range.contains(ticks) {
            warn!("period {} outside {}..={}", ticks, self.config.range.min, self.config.range.max);
            return Err(Error::PeriodOutOfRange);
        }

        self.timebase.freeze();
        self.timebase.set_period(ticks);
        self.timebase.release();
        self.config.period = ticks;
        Ok(())
    }

    /// Divided ticks between two output toggles.
    pub fn rollover_ticks(&self) -> u64 {
        let period = u64::from(self.config.period);
        match self.config.mode {
            CounterMode::Up => period,
            CounterMode::UpDown => period * 2,
        }
    }

    /// Frequency of the output square wave for a timebase fed with `clock`.
    pub fn output_frequency(&self, clock: Hertz) -> Hertz {
        let ticks_per_cycle = 2 * self.rollover_ticks() * u64::from(self.config.divider);
        let hz = u64::from(clock.0).checked_div(ticks_per_cycle).unwrap_or(0);
        Hertz(hz as u32)
    }

    /// Timebase.
    pub fn timebase(&self) -> &T {
        &self.timebase
    }

    /// Timebase, for operations the generator does not cover.
    pub fn timebase_mut(&mut self) -> &mut T {
        &mut self.timebase
    }

    /// Stops the generator and returns its timebase.
    pub fn free(mut self) -> T {
        self.timebase.freeze();
        self.timebase
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::vec::Vec;

    use super::*;

    /// Simulated timebase stepping one input clock at a time.
    #[derive(Default)]
    pub(crate) struct SimTimeBase {
        pub(crate) ops: Vec<&'static str>,
        frozen: bool,
        up_down: bool,
        period: u32,
        divider: u16,
        output: Option<u8>,
        prescale: u16,
        count: u32,
        falling: bool,
        elapsed: u64,
        pub(crate) level: bool,
        pub(crate) toggles: Vec<u64>,
    }

    impl SimTimeBase {
        /// Feeds `clocks` input clock cycles.
        pub(crate) fn run(&mut self, clocks: u32) {
            if self.frozen {
                return;
            }
            for _ in 0..clocks {
                self.prescale += 1;
                if self.prescale < self.divider {
                    continue;
                }
                self.prescale = 0;
                self.elapsed += 1;
                self.step();
            }
        }

        fn step(&mut self) {
            if self.up_down {
                if self.falling {
                    self.count -= 1;
                    if self.count == 0 {
                        self.falling = false;
                    }
                } else {
                    self.count += 1;
                    if self.count == self.period {
                        self.falling = true;
                        self.toggle();
                    }
                }
            } else {
                self.count += 1;
                if self.count == self.period {
                    self.count = 0;
                    self.toggle();
                }
            }
        }

        fn toggle(&mut self) {
            if self.output.is_some() {
                self.level = !self.level;
                self.toggles.push(self.elapsed);
            }
        }
    }

    impl TimeBase for SimTimeBase {
        fn freeze(&mut self) {
            self.frozen = true;
            self.ops.push("freeze");
        }

        fn set_counter_mode(&mut self, mode: CounterMode) {
            self.up_down = mode == CounterMode::UpDown;
            self.ops.push("mode");
        }

        fn set_period(&mut self, ticks: u32) {
            self.period = ticks;
            self.ops.push("period");
        }

        fn set_phase(&mut self, ticks: u32) {
            self.count = ticks;
            self.ops.push("phase");
        }

        fn toggle_on_period(&mut self, output: u8) {
            self.output = Some(output);
            self.ops.push("toggle");
        }

        fn set_divider(&mut self, divider: u16) {
            self.divider = divider;
            self.ops.push("divider");
        }

        fn release(&mut self) {
            self.frozen = false;
            self.ops.push("release");
        }
    }

    #[test]
    fn programming_order() {
        let generator = SignalGenerator::new(SimTimeBase::default(), Config::default()).unwrap();
        let tb = generator.free();

        assert_eq!(
            tb.ops,
            ["freeze", "mode", "period", "phase", "toggle", "divider", "release", "freeze"]
        );
    }

    #[test]
    fn toggles_once_per_period() {
        let mut generator = SignalGenerator::new(SimTimeBase::default(), Config::default()).unwrap();
        generator.timebase_mut().run(10_500);

        let tb = generator.timebase_mut();
        assert_eq!(tb.toggles, [1000, 2000, 3000, 4000, 5000, 6000, 7000, 8000, 9000, 10_000]);
        assert!(!tb.level);
    }

    #[test]
    fn divider_stretches_ticks() {
        let config = Config {
            divider: 2,
            ..Default::default()
        };
        let mut generator = SignalGenerator::new(SimTimeBase::default(), config).unwrap();
        generator.timebase_mut().run(10_000);

        assert_eq!(generator.timebase_mut().toggles.len(), 5);
    }

    #[test]
    fn up_down_toggles_at_the_top() {
        let config = Config {
            mode: CounterMode::UpDown,
            ..Default::default()
        };
        let mut generator = SignalGenerator::new(SimTimeBase::default(), config).unwrap();
        generator.timebase_mut().run(6000);

        assert_eq!(generator.rollover_ticks(), 2000);
        assert_eq!(generator.timebase_mut().toggles, [1000, 3000, 5000]);
    }

    #[test]
    fn rejects_bad_config() {
        let config = Config {
            period: 999,
            ..Default::default()
        };
        assert_eq!(
            SignalGenerator::new(SimTimeBase::default(), config).err(),
            Some(Error::PeriodOutOfRange)
        );

        let config = Config {
            divider: 0,
            ..Default::default()
        };
        assert_eq!(
            SignalGenerator::new(SimTimeBase::default(), config).err(),
            Some(Error::InvalidDivider)
        );

        let config = Config {
            divider: MAX_DIVIDER + 1,
            ..Default::default()
        };
        assert_eq!(
            SignalGenerator::new(SimTimeBase::default(), config).err(),
            Some(Error::InvalidDivider)
        );
    }

    #[test]
    fn rejects_degenerate_range() {
        let config = Config {
            period: 0,
            range: PeriodRange { min: 0, max: 10 },
            ..Default::default()
        };
        assert_eq!(
            SignalGenerator::new(SimTimeBase::default(), config).err(),
            Some(Error::InvalidRange)
        );

        let config = Config {
            period: 5000,
            range: PeriodRange { min: 6000, max: 4000 },
            ..Default::default()
        };
        assert_eq!(
            SignalGenerator::new(SimTimeBase::default(), config).err(),
            Some(Error::InvalidRange)
        );
    }

    #[test]
    fn longest_up_down_period() {
        let config = Config {
            period: u32::MAX,
            range: PeriodRange { min: 1, max: u32::MAX },
            mode: CounterMode::UpDown,
            divider: MAX_DIVIDER,
            ..Default::default()
        };
        let generator = SignalGenerator::new(SimTimeBase::default(), config).unwrap();

        assert_eq!(generator.rollover_ticks(), 2 * u64::from(u32::MAX));
        assert_eq!(generator.output_frequency(Hertz(u32::MAX)), Hertz(0));
    }

    #[test]
    fn set_period_within_range() {
        let mut generator = SignalGenerator::new(SimTimeBase::default(), Config::default()).unwrap();

        assert_eq!(generator.set_period(8001), Err(Error::PeriodOutOfRange));
        assert_eq!(generator.period(), 1000);

        generator.set_period(8000).unwrap();
        assert_eq!(generator.period(), 8000);
        assert_eq!(generator.config().period, 8000);

        generator.timebase_mut().run(16_000);
        assert_eq!(generator.timebase_mut().toggles, [8000, 16_000]);
    }

    #[test]
    fn output_frequency() {
        let generator = SignalGenerator::new(SimTimeBase::default(), Config::default()).unwrap();
        assert_eq!(generator.output_frequency(Hertz::mhz(12)), Hertz(6000));
    }
}
