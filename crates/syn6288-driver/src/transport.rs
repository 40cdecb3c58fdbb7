//! Transport abstraction for the SYN6288 UART link
//!
//! The driver talks to the chip through two small traits: [`Uart`] for the
//! byte stream and [`Delay`] for the waits the protocol needs between a
//! command and its answer. A real serial port and the in-memory
//! [`VirtualChip`](crate::backends::VirtualChip) both implement [`Uart`].

use crate::backends::{SerialUart, VirtualChip};
use crate::config::DriverConfig;
use crate::error::Result;
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

/// UART link to a SYN6288
pub trait Uart: Debug + Send {
    /// Open and configure the link
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be opened or configured.
    fn init(&mut self) -> Result<()>;

    /// Close the link
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be released.
    fn deinit(&mut self) -> Result<()>;

    /// Read up to `buf.len()` bytes
    ///
    /// Returns the number of bytes read, which is fewer than requested when
    /// the chip stays silent past the read timeout.
    ///
    /// # Errors
    ///
    /// Returns error on an I/O failure.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write every byte of `data`
    ///
    /// # Errors
    ///
    /// Returns error on an I/O failure.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Discard any unread input
    ///
    /// # Errors
    ///
    /// Returns error if the input queue cannot be flushed.
    fn flush(&mut self) -> Result<()>;

    /// Switch the host side of the link to a new rate
    ///
    /// # Errors
    ///
    /// Returns error if the port rejects the rate.
    fn set_baud_rate(&mut self, _bps: u32) -> Result<()> {
        Ok(())
    }

    /// Transport type for logging
    fn transport_type(&self) -> TransportType;
}

impl<U: Uart + ?Sized> Uart for Box<U> {
    fn init(&mut self) -> Result<()> {
        (**self).init()
    }

    fn deinit(&mut self) -> Result<()> {
        (**self).deinit()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn set_baud_rate(&mut self, bps: u32) -> Result<()> {
        (**self).set_baud_rate(bps)
    }

    fn transport_type(&self) -> TransportType {
        (**self).transport_type()
    }
}

/// Millisecond delay source
pub trait Delay: Debug {
    /// Block for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

/// Delay backed by `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Delay that returns immediately and only counts the requested time
///
/// Pairs with [`VirtualChip`] so protocol timing can be asserted without
/// sleeping.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay {
    elapsed_ms: u64,
}

impl NoDelay {
    /// Total milliseconds requested so far
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}

impl Delay for NoDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms += u64::from(ms);
    }
}

/// Transport type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    /// tty device (`/dev/ttyS0`, `/dev/ttyUSB0`, ...)
    Serial,

    /// In-memory chip simulation, no hardware required
    Virtual,
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serial => write!(f, "Serial"),
            Self::Virtual => write!(f, "Virtual (simulated SYN6288)"),
        }
    }
}

/// Transport selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSelection {
    /// Serial port if the configured device node exists, otherwise virtual
    Auto,

    /// Force the serial port
    Serial,

    /// Force the virtual chip, for CI and dry runs
    Virtual,
}

/// Build the transport named by `selection`, using the port and timing
/// from `config`
///
/// # Errors
///
/// Returns error if `Serial` is forced and the configured port does not exist.
pub fn select_transport(
    selection: TransportSelection,
    config: &DriverConfig,
) -> Result<Box<dyn Uart>> {
    let serial = || -> Result<Box<dyn Uart>> {
        SerialUart::new(&config.port, config.link_baud_rate)
            .map(|port| Box::new(port.with_read_timeout(config.read_timeout_ms)) as Box<dyn Uart>)
    };

    match selection {
        TransportSelection::Auto => {
            if port_present(&config.port) {
                tracing::info!("Using serial transport on {}", config.port.display());
                return serial();
            }

            tracing::info!(
                "{} not present, using virtual transport",
                config.port.display()
            );
            Ok(Box::new(VirtualChip::with_baud_rate(config.link_baud_rate)))
        }

        TransportSelection::Serial => serial(),

        TransportSelection::Virtual => {
            Ok(Box::new(VirtualChip::with_baud_rate(config.link_baud_rate)))
        }
    }
}

fn port_present(path: &Path) -> bool {
    path.exists()
}
