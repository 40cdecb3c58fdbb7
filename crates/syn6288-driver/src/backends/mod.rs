//! UART backend implementations
//!
//! Two backends available:
//! - **Serial**: a tty device node configured through termios (real hardware)
//! - **Virtual**: an in-memory SYN6288 that answers like the chip (CI, dry runs)

pub mod serial;
pub mod virtual_chip;

pub use serial::SerialUart;
pub use virtual_chip::{Utterance, VirtualChip};
