//! Hardware tests
//!
//! Need a SYN6288 wired to the port in `SYN6288_PORT` (default
//! `/dev/ttyUSB0`) at 9600 bps. Run with `cargo test -- --ignored`.

use syn6288_driver::chip::Status;
use syn6288_driver::selftest;
use syn6288_driver::{
    select_transport, DriverConfig, Speaker, StdDelay, Syn6288, TransportSelection,
};

fn config() -> DriverConfig {
    DriverConfig {
        port: std::env::var("SYN6288_PORT")
            .unwrap_or_else(|_| "/dev/ttyUSB0".to_string())
            .into(),
        ..DriverConfig::default()
    }
}

fn open() -> Syn6288<Box<dyn syn6288_driver::Uart>, StdDelay> {
    let config = config();
    let uart = select_transport(TransportSelection::Serial, &config).expect("serial port");
    let mut chip = Syn6288::new(uart, StdDelay).with_link_rate(config.link_baud_rate);
    chip.init().expect("init");
    chip
}

#[test]
#[ignore] // Requires hardware
fn test_status() {
    let mut chip = open();
    let status = chip.status().expect("status");
    println!("SYN6288 status: {status}");
    chip.deinit().expect("deinit");
}

#[test]
#[ignore] // Requires hardware
fn test_register() {
    let mut chip = open();
    selftest::register_test(&mut chip).expect("register test");
    chip.deinit().expect("deinit");
}

#[test]
#[ignore] // Requires hardware
fn test_synthesis() {
    let mut chip = open();
    selftest::synthesis_test(&mut chip).expect("synthesis test");
    assert_eq!(chip.status().expect("status"), Status::Idle);
    chip.deinit().expect("deinit");
}

#[test]
#[ignore] // Requires hardware
fn test_speaker_basic() {
    let config = DriverConfig {
        send_config: true,
        ..config()
    };
    let uart = select_transport(TransportSelection::Serial, &config).expect("serial port");
    let mut speaker = Speaker::open(uart, StdDelay, &config).expect("open");
    speaker.speak("hello world").expect("speak");
    speaker.sync().expect("sync");
    speaker.close().expect("close");
}
