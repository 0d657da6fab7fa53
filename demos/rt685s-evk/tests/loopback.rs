#![no_std]
#![no_main]

// Needs SCT0_OUT6 (PIO0_26) jumpered to CT_INP0 (PIO0_4).
#[cfg(test)]
#[embedded_test::tests(executor = embassy_executor::Executor::new())]
mod tests {
    use defmt::{assert, assert_eq, info};
    use imxrt_edge_capture::capture::{self, ctimer, EdgeCapture};
    use imxrt_edge_capture::pwm::sct::{SCTClockSource, Sct};
    use imxrt_edge_capture::pwm::{self, SignalGenerator};
    use imxrt_edge_capture::{bind_interrupts, peripherals, ChannelId, WATCH};
    use imxrt_edge_capture_demos as board;

    bind_interrupts!(struct Irqs {
        CTIMER0 => ctimer::InterruptHandler<peripherals::CAP1>;
    });

    struct Rig {
        generator: SignalGenerator<Sct<'static, peripherals::SCT0>>,
        ch1: EdgeCapture<'static, ctimer::CtimerChannel<'static, peripherals::CAP1>>,
    }

    #[init]
    fn init() -> Rig {
        let p = imxrt_edge_capture::init(Default::default());
        board::route_generator_pin();
        board::route_capture_pins();

        let config = pwm::Config {
            output: board::GENERATOR_OUTPUT,
            ..Default::default()
        };
        let generator = SignalGenerator::new(Sct::new(p.SCT0, SCTClockSource::Main), config).unwrap();

        let ch1 = ctimer::new_capture(
            p.CAP1,
            Irqs,
            board::capture_input(ChannelId::Ch1),
            capture::Config::default(),
        );

        Rig { generator, ch1 }
    }

    // one rising edge every two toggles: 2 * 1000 ticks of the 12 MHz main clock
    #[test]
    async fn interval_matches_generator(rig: Rig) {
        rig.ch1.next_interval().await;
        let ticks = rig.ch1.next_interval().await;

        let expected_us = 1_000_000 / rig.generator.output_frequency(rig.generator.timebase().clock_rate()).0;
        let measured_us = capture::ticks_to_micros(ticks, ctimer::tick_rate());
        info!("expected {} us, measured {} us", expected_us, measured_us);

        assert!(measured_us.abs_diff(expected_us) <= 2);
        assert_eq!(WATCH.latest(ChannelId::Ch1), ticks);
    }

    #[test]
    async fn other_slots_stay_empty(rig: Rig) {
        rig.ch1.next_interval().await;

        for id in &ChannelId::ALL[1..] {
            assert_eq!(WATCH.latest(*id), 0);
        }
    }
}
