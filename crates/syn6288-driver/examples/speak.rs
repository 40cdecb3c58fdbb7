//! Speak a line of text
//!
//! ```text
//! cargo run --example speak -- /dev/ttyUSB0 "hello world"
//! ```
//!
//! Falls back to the virtual chip when the port does not exist.

use std::path::PathBuf;

use syn6288_driver::chip::TextType;
use syn6288_driver::{
    select_transport, DriverConfig, Result, Speaker, StdDelay, TransportSelection, Uart,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("syn6288_driver=debug")
        .init();

    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or_else(|| syn6288_driver::DEFAULT_PORT.to_string());
    let text = args.next().unwrap_or_else(|| "hello world".to_string());

    let config = DriverConfig {
        port: PathBuf::from(port),
        text_type: if text.is_ascii() { TextType::Gb2312 } else { TextType::Unicode },
        send_config: true,
        ..DriverConfig::default()
    };

    let uart = select_transport(TransportSelection::Auto, &config)?;
    println!("Speaking over {}", uart.transport_type());

    let mut speaker = Speaker::open(uart, StdDelay, &config)?;
    speaker.speak(&text)?;
    let polls = speaker.sync()?;
    println!("Done after {polls} status polls");
    speaker.close()?;

    Ok(())
}
