//! Pure Rust driver for the YuToneWorld SYN6288 text-to-speech module.
//!
//! The chip sits on a UART and speaks whatever text frames it is sent. This
//! crate owns the link side: framing and acknowledgement handling, the
//! busy/idle status protocol, the parameter cache, and a virtual chip for
//! running all of it without hardware.
//!
//! # Layers
//!
//! ```text
//! Speaker              open with a config, busy-gated speak, sync, close
//!   └─ Syn6288<U, D>   one method per chip command, cached settings
//!        ├─ Uart       SerialUart (tty + termios) or VirtualChip
//!        └─ Delay      StdDelay (thread sleep) or NoDelay (tests)
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use syn6288_driver::{select_transport, DriverConfig, Speaker, StdDelay, TransportSelection};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DriverConfig::from_file("syn6288.toml".as_ref())?;
//! let uart = select_transport(TransportSelection::Auto, &config)?;
//!
//! let mut speaker = Speaker::open(uart, StdDelay, &config)?;
//! speaker.speak("hello world")?;
//! speaker.sync()?;
//! speaker.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Timing
//!
//! | Step | Wait |
//! |------|------|
//! | Frame written → answer read | 100 ms |
//! | Between status retries | 100 ms |
//! | Between configuration commands | 100 ms |
//! | Status polls while waiting for idle | 500 ms |

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod backends;
mod config;
mod device;
mod error;
pub mod selftest;
mod speaker;
mod transport;

/// Wire-level constants and types (re-exported from syn6288-chip).
pub mod chip {
    pub use syn6288_chip::command::{opcode, response, MAX_TEXT_LEN};
    pub use syn6288_chip::params::{MAX_BACKGROUND_VOLUME, MAX_SYNTHESIS_SPEED, MAX_SYNTHESIS_VOLUME};
    pub use syn6288_chip::{
        BaudRate, ChipInfo, Frame, FrameError, Message, Mode, Ring, Sound, Status, TextType,
    };
}

pub use backends::{SerialUart, Utterance, VirtualChip};
pub use config::{DriverConfig, DEFAULT_PORT};
pub use device::{encode_text, Syn6288};
pub use error::{Result, Syn6288Error};
pub use speaker::Speaker;
pub use transport::{
    select_transport, Delay, NoDelay, StdDelay, TransportSelection, TransportType, Uart,
};

/// Commonly used types.
pub mod prelude {
    pub use crate::chip::{BaudRate, Message, Mode, Ring, Sound, Status, TextType};
    pub use crate::{
        select_transport, DriverConfig, Result, Speaker, StdDelay, Syn6288, Syn6288Error,
        TransportSelection, Uart,
    };
}
