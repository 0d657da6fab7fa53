#![no_std]
#![no_main]

use defmt::info;
use embassy_executor::Spawner;
use imxrt_edge_capture::capture::{self, ctimer, ticks_to_micros};
use imxrt_edge_capture::pwm::sct::{SCTClockSource, Sct};
use imxrt_edge_capture::pwm::{self, SignalGenerator};
use imxrt_edge_capture::{bind_interrupts, peripherals, ChannelId, WATCH};
use imxrt_edge_capture_demos as board;

bind_interrupts!(struct Irqs {
    CTIMER0 => ctimer::InterruptHandler<peripherals::CAP1>;
    CTIMER4 => ctimer::InterruptHandler<peripherals::CAP5>, ctimer::InterruptHandler<peripherals::CAP6>;
});

// Reports every interval measured on one channel
#[embassy_executor::task(pool_size = 2)]
async fn report_task(id: ChannelId) {
    loop {
        let ticks = WATCH.wait(id).await;
        info!(
            "{}: {} us",
            id.label(),
            ticks_to_micros(ticks, ctimer::tick_rate())
        );
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = imxrt_edge_capture::init(Default::default());

    board::route_generator_pin();
    board::route_capture_pins();

    let config = pwm::Config {
        output: board::GENERATOR_OUTPUT,
        ..Default::default()
    };
    let mut generator = SignalGenerator::new(Sct::new(p.SCT0, SCTClockSource::Main), config).unwrap();

    let cfg = capture::Config::default();
    let ch1 = ctimer::new_capture(p.CAP1, Irqs, board::capture_input(ChannelId::Ch1), cfg);
    let _ch5 = ctimer::new_capture(p.CAP5, Irqs, board::capture_input(ChannelId::Ch5), cfg);
    let _ch6 = ctimer::new_capture(p.CAP6, Irqs, board::capture_input(ChannelId::Ch6), cfg);

    spawner.spawn(report_task(ChannelId::Ch5)).unwrap();
    spawner.spawn(report_task(ChannelId::Ch6)).unwrap();

    // sweep the generator across its range, one step every 100 intervals on channel 1
    let range = generator.config().range;
    let mut period = range.min;
    loop {
        for _ in 0..100 {
            ch1.next_interval().await;
        }
        info!("{}: latest {} ticks at period {}", ch1.id().label(), ch1.latest(), period);

        period = if period >= range.max { range.min } else { period + 1000 };
        generator.set_period(period).unwrap();
    }
}
