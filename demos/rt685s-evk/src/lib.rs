#![no_std]

//! Board wiring for the capture demos on the RT685S-EVK.
//!
//! SCT0_OUT6 drives PIO0_26 (the blue LED). Jumper it to any of the capture pins below to
//! loop the generator back into a channel.

use defmt_rtt as _;
use imxrt_edge_capture::capture::ctimer::ct_inp;
use imxrt_edge_capture::ChannelId;
use mimxrt600_fcb::FlexSPIFlashConfigurationBlock;
use panic_probe as _;

#[link_section = ".otfad"]
#[used]
static OTFAD: [u8; 256] = [0; 256];

#[rustfmt::skip]
#[link_section = ".fcb"]
#[used]
static FCB: FlexSPIFlashConfigurationBlock = FlexSPIFlashConfigurationBlock::build();

#[link_section = ".keystore"]
#[used]
static KEYSTORE: [u8; 2048] = [0; 2048];

/// SCT output wired to PIO0_26.
pub const GENERATOR_OUTPUT: u8 = 6;

/// INPUTMUX source of every channel.
pub const CAPTURE_INPUTS: [u32; 6] = [ct_inp(0), ct_inp(1), ct_inp(2), ct_inp(3), ct_inp(4), ct_inp(5)];

/// INPUTMUX source of `id`.
pub fn capture_input(id: ChannelId) -> u32 {
    CAPTURE_INPUTS[id.index()]
}

/// Routes SCT0_OUT6 to PIO0_26.
pub fn route_generator_pin() {
    // SAFETY: safe as only executed during initialization
    let iopctl = unsafe { imxrt_edge_capture::pac::Iopctl::steal() };

    iopctl.pio0_26().modify(|_, w| {
        w.fsel()
            .function_3() // F3 = SCT0_OUT6
            .pupdena()
            .disabled()
            .ibena()
            .disabled()
            .slewrate()
            .normal()
            .fulldrive()
            .normal_drive()
            .amena()
            .disabled()
            .odena()
            .disabled()
            .iiena()
            .disabled()
    });
}

/// Routes CT_INP0 to CT_INP5 to their pins with the input buffer enabled.
pub fn route_capture_pins() {
    // SAFETY: safe as only executed during initialization
    let iopctl = unsafe { imxrt_edge_capture::pac::Iopctl::steal() };

    macro_rules! capture_pin {
        ($pin:ident) => {
            iopctl.$pin().modify(|_, w| {
                w.fsel()
                    .function_4() // F4 = CT_INPn
                    .pupdena()
                    .enabled()
                    .pupdsel()
                    .pull_down()
                    .ibena()
                    .enabled()
                    .amena()
                    .disabled()
                    .odena()
                    .disabled()
                    .iiena()
                    .disabled()
            });
        };
    }

    // CT_INP0 .. CT_INP5
    capture_pin!(pio0_4);
    capture_pin!(pio0_5);
    capture_pin!(pio0_6);
    capture_pin!(pio0_11);
    capture_pin!(pio0_12);
    capture_pin!(pio0_13);
}
