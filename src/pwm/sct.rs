//! SCTimer timebase for the signal generator
// =====
// [UM11147] SCTimer/PWM supports 10 outputs, 16 match registers and 16 events. The generator
// runs the counter unified (32 bit), uses event 10 as the limit event and lets the selected
// output both set and clear on that event. The conflict resolution register turns the
// simultaneous set and clear into a toggle.

use embassy_hal_internal::{into_ref, Peripheral, PeripheralRef};

use super::{CounterMode, TimeBase};
use crate::clocks::{self, Hertz, FFRO_HZ};
use crate::pac;

/// Match register and event used as the period limit.
const LIMIT_EVENT: usize = 10;

/// Number of SCT outputs.
pub const OUTPUT_COUNT: u8 = 10;

// CTRL: BIDIR_L and PRE_L fields
const CTRL_BIDIR_L: u32 = 1 << 4;
const CTRL_PRE_L_SHIFT: u32 = 5;
const CTRL_PRE_L_MASK: u32 = 0xFF << CTRL_PRE_L_SHIFT;

// RES: toggle on set/clear conflict
const RES_TOGGLE: u32 = 0b11;

/// clock source indicator for selecting while powering on the `SCTimer`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SCTClockSource {
    /// main clock
    Main,

    /// `48/60m_irc`
    FFRO,
}

// non-reexported (sealed) traits
mod sealed {
    pub trait SCTimer {
        fn regs() -> &'static crate::pac::sct0::RegisterBlock;
        fn power_up(clock: super::SCTClockSource);
        fn power_down();
    }
}

/// `SCTimer` instance usable as a timebase.
pub trait Instance: sealed::SCTimer + Peripheral<P = Self> + 'static {}

impl Instance for crate::peripherals::SCT0 {}

impl sealed::SCTimer for crate::peripherals::SCT0 {
    fn regs() -> &'static pac::sct0::RegisterBlock {
        // SAFETY: the SCT0 peripheral singleton is owned by the timebase
        unsafe { &*pac::Sct0::ptr() }
    }

    fn power_up(clock: SCTClockSource) {
        // SAFETY: safe so long as executed from single executor context or during initialization only
        let clkctl0 = unsafe { pac::Clkctl0::steal() };
        // SAFETY: same constraints on safety: should only be done from single executor context or during init
        let rstctl0 = unsafe { pac::Rstctl0::steal() };

        clkctl0.pscctl0_set().write(|w| w.sct_clk().set_clock());

        match clock {
            SCTClockSource::Main => clkctl0.sctfclksel().write(|w| w.sel().main_clk()),
            SCTClockSource::FFRO => clkctl0.sctfclksel().write(|w| w.sel().ffro_clk()),
        };

        // undivided function clock; the timebase prescaler does the dividing
        clkctl0.sctfclkdiv().modify(|_, w| w.halt().set_bit().reset().set_bit());
        clkctl0.sctfclkdiv().modify(|_, w|
            // SAFETY: divider value 0 is divide by one
            unsafe { w.div().bits(0) });
        clkctl0.sctfclkdiv().modify(|_, w| w.halt().clear_bit());

        rstctl0.prstctl0_clr().write(|w| w.sct().clr_reset());
    }

    fn power_down() {
        // SAFETY: same constraints as power_up
        let clkctl0 = unsafe { pac::Clkctl0::steal() };
        // SAFETY: same constraints as power_up
        let rstctl0 = unsafe { pac::Rstctl0::steal() };

        clkctl0.sctfclksel().write(|w| w.sel().none());
        clkctl0.pscctl0_clr().write(|w| w.sct_clk().clr_clock());
        rstctl0.prstctl0_set().write(|w| w.sct().set_reset());
    }
}

/// SCTimer counter driven as a [`TimeBase`]. Consumes the `SCTimer` peripheral on construction.
pub struct Sct<'d, T: Instance> {
    _p: PeripheralRef<'d, T>,
    clock: SCTClockSource,
    mode: CounterMode,
}

impl<'d, T: Instance> Sct<'d, T> {
    /// Powers the `SCTimer` from `clock` and leaves its counter halted.
    pub fn new(sct: impl Peripheral<P = T> + 'd, clock: SCTClockSource) -> Self {
        into_ref!(sct);

        T::power_up(clock);
        T::regs().ctrl().modify(|_, w| w.halt_l().set_bit());

        debug!("SCT powered");

        Self {
            _p: sct,
            clock,
            mode: CounterMode::Up,
        }
    }

    /// Rate of the undivided counter clock.
    pub fn clock_rate(&self) -> Hertz {
        match self.clock {
            SCTClockSource::Main => clocks::main_clock(),
            SCTClockSource::FFRO => Hertz(FFRO_HZ),
        }
    }
}

impl<T: Instance> Drop for Sct<'_, T> {
    fn drop(&mut self) {
        // disable resources
        T::regs().ctrl().modify(|_, w| w.halt_l().set_bit());
        T::power_down();
    }
}

impl<T: Instance> TimeBase for Sct<'_, T> {
    fn freeze(&mut self) {
        T::regs().ctrl().modify(|_, w| w.halt_l().set_bit());
    }

    fn set_counter_mode(&mut self, mode: CounterMode) {
        let sct0 = T::regs();

        // unified (32 bit) counter mode
        sct0.config()
            .modify(|_, w| w.unify().unified_counter().clkmode().system_clock_mode());

        match mode {
            CounterMode::Up => sct0.ctrl().modify(|_, w| w.bidir_l().up()),
            CounterMode::UpDown => sct0.ctrl().modify(|r, w|
                // SAFETY: only BIDIR_L is changed
                unsafe { w.bits(r.bits() | CTRL_BIDIR_L) }),
        };

        self.mode = mode;
    }

    fn set_period(&mut self, ticks: u32) {
        let sct0 = T::regs();

        // up counting visits 0..=limit, up-down counting turns around at the limit
        let limit = match self.mode {
            CounterMode::Up => ticks.saturating_sub(1),
            CounterMode::UpDown => ticks,
        };

        sct0.ctrl().modify(|_, w| w.clrctr_l().set_bit());

        // ensure all events are in MATCH mode (0)
        sct0.regmode().modify(|_, w|
            // SAFETY: all match registers stay in match mode
            unsafe { w.regmod_l().bits(0) });

        sct0.limit().modify(|_, w|
            // SAFETY: only the limit event bit is set
            unsafe { w.limmsk_l().bits(1 << LIMIT_EVENT) });

        sct0.match10().write(|w|
            // SAFETY: any 32 bit value is a valid match
            unsafe { w.bits(limit) });
        sct0.matchrel10().write(|w|
            // SAFETY: any 32 bit value is a valid match
            unsafe { w.bits(limit) });

        // event 10 fires on match register 10 only
        sct0.ev(LIMIT_EVENT).ev_ctrl().modify(|_, w|
            // SAFETY: matchsel names match register 10
            unsafe {
                w.combmode()
                    .match_()
                    .matchmem()
                    .clear_bit()
                    .matchsel()
                    .bits(LIMIT_EVENT as u8)
            });

        sct0.ev(LIMIT_EVENT).ev_state().modify(|_, w|
            // SAFETY: event allowed in every state
            unsafe { w.statemskn().bits(0xFF) });
    }

    fn set_phase(&mut self, ticks: u32) {
        T::regs().count().write(|w|
            // SAFETY: counter is halted and any value below the limit is valid
            unsafe { w.bits(ticks) });
    }

    fn toggle_on_period(&mut self, output: u8) {
        debug_assert!(output < OUTPUT_COUNT);

        let sct0 = T::regs();
        let out = usize::from(output);

        sct0.out(out).out_set().modify(|_, w|
            // SAFETY: only the limit event is selected
            unsafe { w.set_().bits(1 << LIMIT_EVENT) });
        sct0.out(out).out_clr().modify(|_, w|
            // SAFETY: only the limit event is selected
            unsafe { w.clr().bits(1 << LIMIT_EVENT) });

        sct0.res().modify(|r, w|
            // SAFETY: only the 2 bit field of this output is changed
            unsafe { w.bits(r.bits() | (RES_TOGGLE << (2 * out))) });

        // set and clear keep their meaning when counting down
        sct0.outputdirctrl().modify(|r, w|
            // SAFETY: only the 2 bit field of this output is changed
            unsafe { w.bits(r.bits() & !(0b11 << (2 * out))) });
    }

    fn set_divider(&mut self, divider: u16) {
        let pre = u32::from(divider.saturating_sub(1)) << CTRL_PRE_L_SHIFT;

        T::regs().ctrl().modify(|r, w|
            // SAFETY: only PRE_L is changed
            unsafe { w.bits((r.bits() & !CTRL_PRE_L_MASK) | (pre & CTRL_PRE_L_MASK)) });
    }

    fn release(&mut self) {
        T::regs().ctrl().modify(|_, w| w.halt_l().clear_bit().stop_l().clear_bit());
    }
}
