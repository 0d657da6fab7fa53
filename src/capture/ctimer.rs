//! CTIMER capture backend
//!
//! Each capture channel uses one capture register of a 32 bit CTIMER clocked from the SFRO:
//!
//! | channel | timer   | capture register |
//! |---------|---------|------------------|
//! | 1       | CTIMER0 | 0                |
//! | 2       | CTIMER1 | 0                |
//! | 3       | CTIMER2 | 0                |
//! | 4       | CTIMER3 | 0                |
//! | 5       | CTIMER4 | 0                |
//! | 6       | CTIMER4 | 1                |
//!
//! Capture registers of one CTIMER share its timer counter, so a capture never clears it.
//! With reset-on-event enabled the reported interval is the wrapping difference between the
//! value latched by this capture and the one latched by the previous capture on the same
//! channel. The first capture after arming measures from the moment the channel started.
//!
//! The capture register follows every selected edge. Arming enables the capture interrupt
//! of the channel; the handler reads the register before clearing the flag.
//!
//! ```rust,ignore
//! use imxrt_edge_capture::capture::{self, ctimer};
//! use imxrt_edge_capture::{bind_interrupts, peripherals};
//!
//! bind_interrupts!(struct Irqs {
//!     CTIMER0 => ctimer::InterruptHandler<peripherals::CAP1>;
//! });
//!
//! let p = imxrt_edge_capture::init(Default::default());
//! let ch1 = ctimer::new_capture(p.CAP1, Irqs, ctimer::ct_inp(0), capture::Config::default());
//! ```

use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::{counter_interval, on_edge_captured, CaptureHw, ChannelId, Config, Edge, EdgeCapture, GroupAck, CHANNEL_COUNT};
use crate::clocks::{self, Hertz};
use crate::interrupt::typelevel::{Binding, Handler};
use crate::interrupt::{self, InterruptExt};
use crate::measurement::WATCH;
use crate::{into_ref, pac, peripherals, Peripheral, PeripheralRef};

/// Timer index and capture register of every channel.
const ROUTING: [(usize, usize); CHANNEL_COUNT] = [(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (4, 1)];

/// Counter value latched by the previous capture of each channel.
static LAST: [AtomicU32; CHANNEL_COUNT] = [const { AtomicU32::new(0) }; CHANNEL_COUNT];
static RESET_ON_EVENT: [AtomicBool; CHANNEL_COUNT] = [const { AtomicBool::new(true) }; CHANNEL_COUNT];

// CCR: CAPnRE, CAPnFE, CAPnI
const fn ccr_rising(capture: usize) -> u32 {
    1 << (3 * capture)
}

const fn ccr_falling(capture: usize) -> u32 {
    1 << (3 * capture + 1)
}

const fn ccr_interrupt(capture: usize) -> u32 {
    1 << (3 * capture + 2)
}

// IR: CRnINT
const fn ir_capture(capture: usize) -> u32 {
    1 << (4 + capture)
}

/// INPUTMUX capture source for pin function `CT_INP<n>`, `n` in 0..16.
pub const fn ct_inp(n: u8) -> u32 {
    n as u32
}

/// Tick rate of the capture counters.
pub fn tick_rate() -> Hertz {
    clocks::sfro()
}

fn ctimer(timer: usize) -> &'static pac::ctimer0::RegisterBlock {
    // SAFETY: every capture register is owned by exactly one channel singleton; shared
    // registers are only written with critical sections or write-one-to-clear accesses
    unsafe {
        match timer {
            0 => &*pac::Ctimer0::ptr(),
            1 => &*pac::Ctimer1::ptr(),
            2 => &*pac::Ctimer2::ptr(),
            3 => &*pac::Ctimer3::ptr(),
            _ => &*pac::Ctimer4::ptr(),
        }
    }
}

fn irq(timer: usize) -> interrupt::Interrupt {
    match timer {
        0 => interrupt::CTIMER0,
        1 => interrupt::CTIMER1,
        2 => interrupt::CTIMER2,
        3 => interrupt::CTIMER3,
        _ => interrupt::CTIMER4,
    }
}

/// Clock and reset sequence from the NXP TRM.
fn power_up(timer: usize) {
    // SAFETY: the set/clear registers only touch the bits of this timer
    let clkctl1 = unsafe { pac::Clkctl1::steal() };
    // SAFETY: same as above
    let rstctl1 = unsafe { pac::Rstctl1::steal() };

    // • Enable the clock to the CTIMER in the CLKCTL1_PSCCTL2 register
    match timer {
        0 => clkctl1.pscctl2_set().write(|w| w.ct32bit0_clk_set().set_clock()),
        1 => clkctl1.pscctl2_set().write(|w| w.ct32bit1_clk_set().set_clock()),
        2 => clkctl1.pscctl2_set().write(|w| w.ct32bit2_clk_set().set_clock()),
        3 => clkctl1.pscctl2_set().write(|w| w.ct32bit3_clk_set().set_clock()),
        _ => clkctl1.pscctl2_set().write(|w| w.ct32bit4_clk_set().set_clock()),
    };

    // • Select a clock source for the CTIMER using the appropriate CT32BITnFCLKSEL register
    clkctl1.ct32bitfclksel(timer).write(|w| w.sel().sfro_clk());

    // • Clear the CTIMER peripheral reset in the RSTCTL1_PRSTCTL2 register
    match timer {
        0 => rstctl1.prstctl2_clr().write(|w| w.ct32bit0_rst_clr().clr_reset()),
        1 => rstctl1.prstctl2_clr().write(|w| w.ct32bit1_rst_clr().clr_reset()),
        2 => rstctl1.prstctl2_clr().write(|w| w.ct32bit2_rst_clr().clr_reset()),
        3 => rstctl1.prstctl2_clr().write(|w| w.ct32bit3_rst_clr().clr_reset()),
        _ => rstctl1.prstctl2_clr().write(|w| w.ct32bit4_rst_clr().clr_reset()),
    };
}

/// Registers of one capture channel.
#[derive(Copy, Clone)]
struct Registers {
    index: usize,
    timer: usize,
    capture: usize,
}

impl Registers {
    const fn new(id: ChannelId) -> Self {
        let (timer, capture) = ROUTING[id.index()];
        Self {
            index: id.index(),
            timer,
            capture,
        }
    }

    fn modify_ccr(&self, clear: u32, set: u32) {
        // CTIMER4 carries two channels in one CCR
        critical_section::with(|_| {
            ctimer(self.timer)
                .ccr()
                .modify(|r, w| unsafe { w.bits((r.bits() & !clear) | set) });
        });
    }

    fn is_pending(&self) -> bool {
        let reg = ctimer(self.timer);
        reg.ir().read().bits() & ir_capture(self.capture) != 0
            && reg.ccr().read().bits() & ccr_interrupt(self.capture) != 0
    }

    fn halt(&self) {
        let c = self.capture;
        self.modify_ccr(ccr_rising(c) | ccr_falling(c) | ccr_interrupt(c), 0);
    }

    fn clear_pending(&self) {
        // write one to clear, other flags are untouched
        ctimer(self.timer)
            .ir()
            .write(|w| unsafe { w.bits(ir_capture(self.capture)) });
    }

    fn set_edge(&self, edge: Edge) {
        let c = self.capture;
        let bits = match edge {
            Edge::Rising => ccr_rising(c),
            Edge::Falling => ccr_falling(c),
            Edge::Both => ccr_rising(c) | ccr_falling(c),
        };
        self.modify_ccr(ccr_rising(c) | ccr_falling(c), bits);
    }

    fn set_reset_on_event(&self, enable: bool) {
        RESET_ON_EVENT[self.index].store(enable, Ordering::Relaxed);
    }

    fn select_input(&self, input: u32) {
        // SAFETY: the selector belongs to this channel alone
        let inputmux = unsafe { pac::Inputmux::steal() };
        inputmux
            .ct32bit_cap(self.timer)
            .ct32bit_cap_sel(self.capture)
            .write(|w| unsafe { w.bits(input) });
    }

    fn start(&self) {
        let reg = ctimer(self.timer);

        critical_section::with(|_| {
            if reg.tcr().read().cen().bit_is_clear() {
                reg.tcr().write(|w| w.crst().set_bit());
                reg.tcr().write(|w| w.crst().clear_bit());
                reg.tcr().write(|w| w.cen().set_bit());
            }
            LAST[self.index].store(reg.tc().read().bits(), Ordering::Relaxed);
        });
    }

    fn rearm(&self) {
        self.modify_ccr(0, ccr_interrupt(self.capture));
    }

    fn enable_interrupt(&self) {
        let irq = irq(self.timer);
        irq.unpend();
        // SAFETY: the handler for this line is bound through `Binding`
        unsafe { irq.enable() };
    }

    fn latched(&self) -> u32 {
        let raw = ctimer(self.timer).cr(self.capture).read().bits();
        let previous = LAST[self.index].load(Ordering::Relaxed);
        LAST[self.index].store(raw, Ordering::Relaxed);

        counter_interval(previous, raw, RESET_ON_EVENT[self.index].load(Ordering::Relaxed))
    }
}

trait SealedInstance {
    const CHANNEL: ChannelId;
}

/// Capture channel singleton.
#[allow(private_bounds)]
pub trait Instance: SealedInstance + Peripheral<P = Self> + 'static + Send {
    /// Interrupt of the CTIMER carrying the channel.
    type Interrupt: interrupt::typelevel::Interrupt;
}

macro_rules! impl_instance {
    ($cap:ident, $ch:ident, $irq:ident) => {
        impl SealedInstance for peripherals::$cap {
            const CHANNEL: ChannelId = ChannelId::$ch;
        }
        impl Instance for peripherals::$cap {
            type Interrupt = interrupt::typelevel::$irq;
        }
    };
}

impl_instance!(CAP1, Ch1, CTIMER0);
impl_instance!(CAP2, Ch2, CTIMER1);
impl_instance!(CAP3, Ch3, CTIMER2);
impl_instance!(CAP4, Ch4, CTIMER3);
impl_instance!(CAP5, Ch5, CTIMER4);
impl_instance!(CAP6, Ch6, CTIMER4);

/// Interrupt acknowledge for the CTIMER lines.
pub struct CtimerAck;

impl GroupAck for CtimerAck {
    fn acknowledge(&self) {
        // flag clear must land before exception return
        cortex_m::asm::dsb();
    }
}

/// Capture interrupt handler.
pub struct InterruptHandler<T: Instance> {
    _phantom: PhantomData<T>,
}

impl<T: Instance> Handler<T::Interrupt> for InterruptHandler<T> {
    unsafe fn on_interrupt() {
        let regs = Registers::new(T::CHANNEL);
        if !regs.is_pending() {
            return;
        }

        let mut hw = Handle(regs);
        on_edge_captured(T::CHANNEL, &mut hw, &CtimerAck, &WATCH);
    }
}

/// Register access used from the interrupt, where the singleton is not reachable.
struct Handle(Registers);

macro_rules! forward_capture_hw {
    ($($field:tt)+) => {
        fn halt(&mut self) {
            self.$($field)+.halt()
        }

        fn clear_pending(&mut self) {
            self.$($field)+.clear_pending()
        }

        fn set_edge(&mut self, edge: Edge) {
            self.$($field)+.set_edge(edge)
        }

        fn set_reset_on_event(&mut self, enable: bool) {
            self.$($field)+.set_reset_on_event(enable)
        }

        fn select_input(&mut self, input: u32) {
            self.$($field)+.select_input(input)
        }

        fn start(&mut self) {
            self.$($field)+.start()
        }

        fn rearm(&mut self) {
            self.$($field)+.rearm()
        }

        fn enable_interrupt(&mut self) {
            self.$($field)+.enable_interrupt()
        }

        fn latched(&mut self) -> u32 {
            self.$($field)+.latched()
        }
    };
}

impl CaptureHw for Handle {
    forward_capture_hw!(0);
}

/// CTIMER capture register owned by one channel singleton.
pub struct CtimerChannel<'d, T: Instance> {
    _p: PeripheralRef<'d, T>,
    regs: Registers,
}

impl<'d, T: Instance> CtimerChannel<'d, T> {
    /// Powers the CTIMER carrying `cap`.
    pub fn new(
        cap: impl Peripheral<P = T> + 'd,
        _irq: impl Binding<T::Interrupt, InterruptHandler<T>> + 'd,
    ) -> Self {
        into_ref!(cap);

        let regs = Registers::new(T::CHANNEL);
        power_up(regs.timer);

        Self { _p: cap, regs }
    }
}

impl<T: Instance> CaptureHw for CtimerChannel<'_, T> {
    forward_capture_hw!(regs);
}

/// Configures `cap` to capture from INPUTMUX source `input` into [`WATCH`] and arms it.
pub fn new_capture<'d, T: Instance>(
    cap: impl Peripheral<P = T> + 'd,
    irq: impl Binding<T::Interrupt, InterruptHandler<T>> + 'd,
    input: u32,
    config: Config,
) -> EdgeCapture<'static, CtimerChannel<'d, T>> {
    EdgeCapture::new(T::CHANNEL, CtimerChannel::new(cap, irq), input, config, &WATCH)
}
