//! Serial port backend
//!
//! Drives a SYN6288 wired to a host UART (`/dev/ttyS0`, `/dev/ttyAMA0`,
//! a USB adapter at `/dev/ttyUSB0`, ...). The port is put in raw 8N1 mode
//! through termios; reads return early once the chip has been silent for
//! the configured timeout.

use crate::error::{Result, Syn6288Error};
use crate::transport::{TransportType, Uart};
use rustix::fs::OFlags;
use rustix::termios::{self, ControlModes, OptionalActions, QueueSelector, SpecialCodeIndex};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use syn6288_chip::BaudRate;

/// Default silence after which a read gives up.
const DEFAULT_READ_TIMEOUT_MS: u32 = 500;

/// UART backed by a tty device node
#[derive(Debug)]
pub struct SerialUart {
    path: PathBuf,
    bps: u32,
    read_timeout_ms: u32,
    file: Option<File>,
}

impl SerialUart {
    /// Prepare a port at `path`, opened at `rate` on [`Uart::init`]
    ///
    /// # Errors
    ///
    /// Returns `PortNotFound` if the device node does not exist.
    pub fn new(path: impl AsRef<Path>, rate: BaudRate) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Syn6288Error::port_not_found(path));
        }

        Ok(Self {
            path: path.to_path_buf(),
            bps: rate.bps(),
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            file: None,
        })
    }

    /// Set how long a read waits for the chip before returning short
    #[must_use]
    pub fn with_read_timeout(mut self, ms: u32) -> Self {
        self.read_timeout_ms = ms;
        self
    }

    /// Device node path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current host-side rate in bits per second
    pub const fn bps(&self) -> u32 {
        self.bps
    }

    fn file(&self, op: &'static str) -> Result<&File> {
        self.file
            .as_ref()
            .ok_or_else(|| Syn6288Error::uart(op, "port is not open"))
    }

    /// Apply raw 8N1 at `bps` with the read timeout
    fn configure(&self, file: &File, bps: u32) -> Result<()> {
        let mut tio = termios::tcgetattr(file)
            .map_err(|e| Syn6288Error::uart("init", format!("tcgetattr: {e}")))?;

        tio.make_raw();
        tio.control_modes |= ControlModes::CREAD | ControlModes::CLOCAL;
        tio.control_modes &= !(ControlModes::CSTOPB | ControlModes::PARENB);
        tio.set_speed(bps)
            .map_err(|e| Syn6288Error::uart("init", format!("{bps} bps: {e}")))?;

        // VTIME is in tenths of a second and saturates at 25.5 s
        let vtime = (self.read_timeout_ms / 100).clamp(1, u32::from(u8::MAX));
        tio.special_codes[SpecialCodeIndex::VMIN] = 0;
        #[allow(clippy::cast_possible_truncation)]
        {
            tio.special_codes[SpecialCodeIndex::VTIME] = vtime as u8;
        }

        termios::tcsetattr(file, OptionalActions::Now, &tio)
            .map_err(|e| Syn6288Error::uart("init", format!("tcsetattr: {e}")))?;

        Ok(())
    }
}

impl Uart for SerialUart {
    fn init(&mut self) -> Result<()> {
        tracing::debug!("Opening {} at {} bps", self.path.display(), self.bps);

        #[allow(clippy::cast_possible_wrap)]
        let noctty = OFlags::NOCTTY.bits() as i32;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(noctty)
            .open(&self.path)
            .map_err(|e| Syn6288Error::uart("init", format!("{}: {e}", self.path.display())))?;

        self.configure(&file, self.bps)?;
        termios::tcflush(&file, QueueSelector::IOFlush)
            .map_err(|e| Syn6288Error::uart("init", format!("tcflush: {e}")))?;

        tracing::info!("Opened {} at {} bps", self.path.display(), self.bps);
        self.file = Some(file);
        Ok(())
    }

    fn deinit(&mut self) -> Result<()> {
        if self.file.take().is_none() {
            return Err(Syn6288Error::uart("deinit", "port is not open"));
        }
        tracing::info!("Closed {}", self.path.display());
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let file = self.file("read")?;
        let mut filled = 0;
        while filled < buf.len() {
            let n = rustix::io::read(file, &mut buf[filled..])
                .map_err(|e| Syn6288Error::uart("read", e.to_string()))?;
            if n == 0 {
                // VTIME elapsed with no data
                break;
            }
            filled += n;
        }
        tracing::trace!("read {:02X?}", &buf[..filled]);
        Ok(filled)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let file = self.file("write")?;
        let mut written = 0;
        while written < data.len() {
            let n = rustix::io::write(file, &data[written..])
                .map_err(|e| Syn6288Error::uart("write", e.to_string()))?;
            if n == 0 {
                return Err(Syn6288Error::uart("write", "port accepted no bytes"));
            }
            written += n;
        }
        termios::tcdrain(file).map_err(|e| Syn6288Error::uart("write", format!("tcdrain: {e}")))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let file = self.file("flush")?;
        termios::tcflush(file, QueueSelector::IFlush)
            .map_err(|e| Syn6288Error::uart("flush", e.to_string()))
    }

    fn set_baud_rate(&mut self, bps: u32) -> Result<()> {
        if let Some(file) = &self.file {
            self.configure(file, bps)?;
            tracing::info!("{} switched to {bps} bps", self.path.display());
        }
        self.bps = bps;
        Ok(())
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Serial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_port_is_reported() {
        let err = SerialUart::new("/dev/does-not-exist-syn6288", BaudRate::Bps9600).unwrap_err();
        assert!(matches!(err, Syn6288Error::PortNotFound { .. }));
    }

    #[test]
    fn io_before_init_fails() {
        // /dev/null exists everywhere; nothing is opened until init()
        let mut port = SerialUart::new("/dev/null", BaudRate::Bps19200)
            .unwrap()
            .with_read_timeout(200);
        assert_eq!(port.bps(), 19_200);
        assert!(matches!(port.write(&[0xFD]), Err(Syn6288Error::Uart { op: "write", .. })));
        assert!(matches!(port.flush(), Err(Syn6288Error::Uart { op: "flush", .. })));
        assert!(port.deinit().is_err());
        // rate changes on a closed port are only recorded
        port.set_baud_rate(38_400).unwrap();
        assert_eq!(port.bps(), 38_400);
    }

    #[test]
    fn failed_rate_switch_keeps_old_rate() {
        // /dev/null is not a tty, so tcgetattr fails
        let mut port = SerialUart::new("/dev/null", BaudRate::Bps19200).unwrap();
        port.file = Some(File::open("/dev/null").unwrap());
        assert!(matches!(port.set_baud_rate(38_400), Err(Syn6288Error::Uart { .. })));
        assert_eq!(port.bps(), 19_200);
    }

    #[test]
    #[ignore] // Requires a SYN6288 on /dev/ttyUSB0
    fn test_serial_open() {
        let mut port = SerialUart::new("/dev/ttyUSB0", BaudRate::Bps9600).expect("port");
        port.init().expect("init");
        port.flush().expect("flush");
        port.deinit().expect("deinit");
    }
}
