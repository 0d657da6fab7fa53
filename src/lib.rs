#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]
#![warn(missing_docs)]

//! Edge-capture interval measurement and test-signal generation for the IMXRT600 family.
//!
//! Six capture channels latch the number of counter ticks between consecutive edges of
//! their inputs and publish the most recent interval in [`measurement::WATCH`]. A timer
//! configured as a [`pwm::SignalGenerator`] toggles an output on every period rollover
//! and can be looped back into any capture input.
//!
//! The drivers are written against the [`capture::CaptureHw`] and [`pwm::TimeBase`]
//! traits. The chip features provide register backends for the CTIMER and SCTimer
//! peripherals.
//!
//! ## Feature flags
#![doc = document_features::document_features!(feature_label = r#"<span class="stab portability"><code>{feature}</code></span>"#)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod capture;
pub mod clocks;
pub mod measurement;
pub mod pwm;

pub use capture::ChannelId;
pub use measurement::{Measurements, Monitor, WATCH};

/// Halts the core.
///
/// Nothing in this crate calls it; applications reach for it when they hit a state they
/// cannot recover from.
pub fn error() -> ! {
    cortex_m::asm::bkpt();
    loop {
        cortex_m::asm::wfi();
    }
}

// Reexports
#[cfg(feature = "_mimxrt685s")]
pub use embassy_hal_internal::{into_ref, Peripheral, PeripheralRef};
#[cfg(all(feature = "_mimxrt685s", feature = "unstable-pac"))]
pub use mimxrt685s_pac as pac;
#[cfg(all(feature = "_mimxrt685s", not(feature = "unstable-pac")))]
pub(crate) use mimxrt685s_pac as pac;

#[cfg(all(feature = "_mimxrt685s", feature = "rt"))]
pub use crate::pac::NVIC_PRIO_BITS;

#[cfg(feature = "_mimxrt685s")]
pub use interrupts::*;

#[cfg(feature = "_mimxrt685s")]
/// Wrapper module to suppress clippy warning caused by macro.
#[allow(clippy::missing_safety_doc)]
pub mod interrupts {
    embassy_hal_internal::interrupt_mod!(CTIMER0, CTIMER1, CTIMER2, CTIMER3, CTIMER4, SCT0,);
}

#[cfg(feature = "_mimxrt685s")]
/// Macro to bind interrupts to handlers.
///
/// This defines the right interrupt handlers, and creates a unit struct (like `struct Irqs;`)
/// and implements the right \[`Binding`\]s for it. You can pass this struct to drivers to
/// prove at compile-time that the right interrupts have been bound.
///
/// CTIMER4 carries two capture channels, so it gets two handlers:
///
/// ```rust,ignore
/// use imxrt_edge_capture::{bind_interrupts, capture::ctimer, peripherals};
///
/// bind_interrupts!(struct Irqs {
///     CTIMER4 => ctimer::InterruptHandler<peripherals::CAP5>, ctimer::InterruptHandler<peripherals::CAP6>;
/// });
/// ```
///
// developer note: this macro can't be in `embassy-hal-internal` due to the use of `$crate`.
#[macro_export]
macro_rules! bind_interrupts {
    ($vis:vis struct $name:ident { $($irq:ident => $($handler:ty),*;)* }) => {
            #[derive(Copy, Clone)]
            $vis struct $name;

        $(
            #[allow(non_snake_case)]
            #[no_mangle]
            unsafe extern "C" fn $irq() {
                $(
                    <$handler as $crate::interrupt::typelevel::Handler<$crate::interrupt::typelevel::$irq>>::on_interrupt();
                )*
            }

            $(
                unsafe impl $crate::interrupt::typelevel::Binding<$crate::interrupt::typelevel::$irq, $handler> for $name {}
            )*
        )*
    };
}

#[cfg(feature = "_mimxrt685s")]
embassy_hal_internal::peripherals!(
    // One singleton per capture channel, see `capture::ctimer` for the CTIMER routing.
    CAP1, CAP2, CAP3, CAP4, CAP5, CAP6, SCT0,
);

#[cfg(feature = "_mimxrt685s")]
/// HAL configuration for iMX RT600.
pub mod config {
    use crate::clocks::ClockConfig;

    /// HAL configuration passed when initializing.
    #[non_exhaustive]
    pub struct Config {
        /// Clock configuration.
        pub clocks: ClockConfig,
        /// Zero the watch slots before handing out peripherals.
        pub clear_watch: bool,
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                clocks: ClockConfig::crystal(24_000_000),
                clear_watch: true,
            }
        }
    }

    impl Config {
        /// Create a new configuration with the provided clock config.
        pub fn new(clocks: ClockConfig) -> Self {
            Self {
                clocks,
                clear_watch: true,
            }
        }
    }
}

#[cfg(feature = "_mimxrt685s")]
/// Initialize the HAL with the provided configuration.
///
/// This returns the peripheral singletons that can be used for creating drivers.
///
/// This should only be called once at startup, otherwise it panics.
pub fn init(config: config::Config) -> Peripherals {
    // Do this first, so that it panics if user is calling `init` a second time
    // before doing anything important.
    let peripherals = Peripherals::take();

    unsafe { crate::clocks::init(config.clocks) };
    if config.clear_watch {
        crate::measurement::WATCH.clear();
    }

    peripherals
}
