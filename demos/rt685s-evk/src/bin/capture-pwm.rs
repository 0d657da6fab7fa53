#![no_std]
#![no_main]

use defmt::info;
use imxrt_edge_capture::capture::{self, ctimer, ticks_to_micros};
use imxrt_edge_capture::pwm::sct::{SCTClockSource, Sct};
use imxrt_edge_capture::pwm::{self, SignalGenerator};
use imxrt_edge_capture::{bind_interrupts, peripherals, ChannelId, Monitor, WATCH};
use imxrt_edge_capture_demos as board;

bind_interrupts!(struct Irqs {
    CTIMER0 => ctimer::InterruptHandler<peripherals::CAP1>;
    CTIMER1 => ctimer::InterruptHandler<peripherals::CAP2>;
    CTIMER2 => ctimer::InterruptHandler<peripherals::CAP3>;
    CTIMER3 => ctimer::InterruptHandler<peripherals::CAP4>;
    CTIMER4 => ctimer::InterruptHandler<peripherals::CAP5>, ctimer::InterruptHandler<peripherals::CAP6>;
});

#[cortex_m_rt::entry]
fn main() -> ! {
    let p = imxrt_edge_capture::init(Default::default());

    info!("Edge capture: SCT loopback");

    board::route_generator_pin();
    board::route_capture_pins();

    let config = pwm::Config {
        output: board::GENERATOR_OUTPUT,
        ..Default::default()
    };
    let generator = match SignalGenerator::new(Sct::new(p.SCT0, SCTClockSource::Main), config) {
        Ok(generator) => generator,
        Err(e) => {
            defmt::error!("generator setup failed: {}", e);
            imxrt_edge_capture::error();
        }
    };
    info!(
        "generator running at {} Hz",
        generator.output_frequency(generator.timebase().clock_rate()).0
    );

    let cfg = capture::Config::default();
    let _ch1 = ctimer::new_capture(p.CAP1, Irqs, board::capture_input(ChannelId::Ch1), cfg);
    let _ch2 = ctimer::new_capture(p.CAP2, Irqs, board::capture_input(ChannelId::Ch2), cfg);
    let _ch3 = ctimer::new_capture(p.CAP3, Irqs, board::capture_input(ChannelId::Ch3), cfg);
    let _ch4 = ctimer::new_capture(p.CAP4, Irqs, board::capture_input(ChannelId::Ch4), cfg);
    let _ch5 = ctimer::new_capture(p.CAP5, Irqs, board::capture_input(ChannelId::Ch5), cfg);
    let _ch6 = ctimer::new_capture(p.CAP6, Irqs, board::capture_input(ChannelId::Ch6), cfg);

    let rate = ctimer::tick_rate();
    let mut monitor = Monitor::new(&WATCH);

    loop {
        cortex_m::asm::wfi();

        for id in ChannelId::ALL {
            if let Ok(ticks) = monitor.poll(id) {
                info!(
                    "{} ({}): {} ticks, {} us",
                    id.number(),
                    id.label(),
                    ticks,
                    ticks_to_micros(ticks, rate)
                );
            }
        }
    }
}
