//! High-level speaker
//!
//! Wraps a [`Syn6288`] with the open-configure-speak-wait cycle most
//! applications need. Playback requests are refused while the chip is
//! still busy instead of cutting the current utterance off.

use syn6288_chip::command::CONFIG_GAP_MS;
use syn6288_chip::{Message, Ring, Sound, Status};

use crate::config::DriverConfig;
use crate::device::Syn6288;
use crate::error::{Result, Syn6288Error};
use crate::transport::{Delay, Uart};

/// An open SYN6288 ready to speak
#[derive(Debug)]
pub struct Speaker<U: Uart, D: Delay> {
    chip: Syn6288<U, D>,
    sync_poll_ms: u32,
    sync_max_polls: u32,
}

impl<U: Uart, D: Delay> Speaker<U, D> {
    /// Open the link and apply `config`
    ///
    /// Mode and text type are always applied. Rate, volumes and speed are
    /// only sent to the chip when `config.send_config` is set, with a short
    /// gap after each command.
    ///
    /// # Errors
    ///
    /// Returns the first failure; the link is closed again before returning.
    pub fn open(uart: U, delay: D, config: &DriverConfig) -> Result<Self> {
        config.validate()?;

        let mut chip = Syn6288::new(uart, delay).with_link_rate(config.link_baud_rate);
        chip.init()?;

        if let Err(e) = Self::configure(&mut chip, config) {
            tracing::error!("SYN6288 configuration failed: {e}");
            if let Err(close) = chip.deinit() {
                tracing::warn!("closing after failed configuration: {close}");
            }
            return Err(e);
        }

        Ok(Self {
            chip,
            sync_poll_ms: config.sync_poll_ms,
            sync_max_polls: config.sync_max_polls,
        })
    }

    fn configure(chip: &mut Syn6288<U, D>, config: &DriverConfig) -> Result<()> {
        chip.set_mode(config.mode)?;
        chip.set_text_type(config.text_type)?;

        if !config.send_config {
            return Ok(());
        }

        chip.set_baud_rate(config.baud_rate)?;
        chip.wait(CONFIG_GAP_MS);
        chip.set_synthesis_volume(config.synthesis_volume)?;
        chip.wait(CONFIG_GAP_MS);
        chip.set_background_volume(config.background_volume)?;
        chip.wait(CONFIG_GAP_MS);
        chip.set_synthesis_speed(config.synthesis_speed)?;
        chip.wait(CONFIG_GAP_MS);

        tracing::info!(
            "SYN6288 configured: {}, {}, {}, volume {}, background {}, speed {}",
            config.baud_rate,
            config.mode,
            config.text_type,
            config.synthesis_volume,
            config.background_volume,
            config.synthesis_speed
        );
        Ok(())
    }

    /// Speak `text` in the configured text type
    ///
    /// # Errors
    ///
    /// Returns `Busy` if the chip is still playing, otherwise as
    /// [`Syn6288::synthesis_str`].
    pub fn speak(&mut self, text: &str) -> Result<()> {
        self.ensure_idle()?;
        self.chip.synthesis_str(text)
    }

    /// Speak pre-encoded text
    ///
    /// # Errors
    ///
    /// Returns `Busy` if the chip is still playing, otherwise as
    /// [`Syn6288::synthesis_text`].
    pub fn speak_bytes(&mut self, text: &[u8]) -> Result<()> {
        self.ensure_idle()?;
        self.chip.synthesis_text(text)
    }

    /// Play a prompt sound
    ///
    /// # Errors
    ///
    /// Returns `Busy` if the chip is still playing, or a link error.
    pub fn sound(&mut self, sound: Sound) -> Result<()> {
        self.ensure_idle()?;
        self.chip.synthesis_sound(sound)
    }

    /// Play a message tone
    ///
    /// # Errors
    ///
    /// Returns `Busy` if the chip is still playing, or a link error.
    pub fn message(&mut self, message: Message) -> Result<()> {
        self.ensure_idle()?;
        self.chip.synthesis_message(message)
    }

    /// Play a ring tone
    ///
    /// # Errors
    ///
    /// Returns `Busy` if the chip is still playing, or a link error.
    pub fn ring(&mut self, ring: Ring) -> Result<()> {
        self.ensure_idle()?;
        self.chip.synthesis_ring(ring)
    }

    /// Block until the chip reports idle
    ///
    /// Returns the number of status polls made.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if the chip is still busy after the configured
    /// number of polls, or a link error.
    pub fn sync(&mut self) -> Result<u32> {
        for poll in 1..=self.sync_max_polls {
            self.chip.wait(self.sync_poll_ms);
            if self.chip.status()? == Status::Idle {
                tracing::debug!("idle after {poll} polls");
                return Ok(poll);
            }
        }

        tracing::error!("still busy after {} polls", self.sync_max_polls);
        Err(Syn6288Error::Timeout {
            polls: self.sync_max_polls,
        })
    }

    /// Pause playback
    ///
    /// # Errors
    ///
    /// Returns a link or response error.
    pub fn pause(&mut self) -> Result<()> {
        self.chip.pause()
    }

    /// Resume playback
    ///
    /// # Errors
    ///
    /// Returns a link or response error.
    pub fn resume(&mut self) -> Result<()> {
        self.chip.resume()
    }

    /// Stop playback
    ///
    /// # Errors
    ///
    /// Returns a link or response error.
    pub fn stop(&mut self) -> Result<()> {
        self.chip.stop()
    }

    /// Enter power-down mode
    ///
    /// # Errors
    ///
    /// Returns a link or response error.
    pub fn power_down(&mut self) -> Result<()> {
        self.chip.power_down()
    }

    /// Borrow the underlying handle
    pub const fn chip(&self) -> &Syn6288<U, D> {
        &self.chip
    }

    /// Borrow the underlying handle mutably, for settings changes
    pub fn chip_mut(&mut self) -> &mut Syn6288<U, D> {
        &mut self.chip
    }

    /// Close the link
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the UART cannot be released.
    pub fn close(mut self) -> Result<Syn6288<U, D>> {
        self.chip.deinit()?;
        Ok(self.chip)
    }

    fn ensure_idle(&mut self) -> Result<()> {
        match self.chip.status()? {
            Status::Idle => Ok(()),
            Status::Busy => {
                tracing::warn!("chip is busy, request refused");
                Err(Syn6288Error::Busy)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::VirtualChip;
    use crate::transport::{NoDelay, TransportType};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use syn6288_chip::{BaudRate, Mode, TextType};

    fn speaker(config: &DriverConfig) -> Speaker<VirtualChip, NoDelay> {
        Speaker::open(VirtualChip::new().with_play_polls(2), NoDelay::default(), config).unwrap()
    }

    #[test]
    fn open_without_send_config_is_host_only() {
        let config = DriverConfig {
            mode: Mode::Background2,
            text_type: TextType::Unicode,
            ..DriverConfig::default()
        };
        let speaker = speaker(&config);
        assert!(speaker.chip().uart().frames().is_empty());
        assert_eq!(speaker.chip().mode().unwrap(), Mode::Background2);
        assert_eq!(speaker.chip().text_type().unwrap(), TextType::Unicode);
    }

    #[test]
    fn open_with_send_config_pushes_settings() {
        let config = DriverConfig {
            send_config: true,
            baud_rate: BaudRate::Bps38400,
            synthesis_volume: 12,
            background_volume: 3,
            synthesis_speed: 2,
            ..DriverConfig::default()
        };
        let speaker = speaker(&config);
        let chip = speaker.chip().uart();
        assert_eq!(chip.frames().len(), 4);
        assert_eq!(chip.baud_rate(), BaudRate::Bps38400);
        assert_eq!(chip.synthesis_volume(), 12);
        assert_eq!(chip.background_volume(), 3);
        assert_eq!(chip.synthesis_speed(), 2);
        // four commands, each with a response wait and a gap
        assert_eq!(speaker.chip().delay().elapsed_ms(), 4 * (100 + 100));
    }

    /// Virtual chip that reports its open/close calls to the test
    #[derive(Debug)]
    struct Tracked {
        chip: VirtualChip,
        open: Arc<AtomicBool>,
    }

    impl Uart for Tracked {
        fn init(&mut self) -> Result<()> {
            self.chip.init()?;
            self.open.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn deinit(&mut self) -> Result<()> {
            self.chip.deinit()?;
            self.open.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            self.chip.read(buf)
        }

        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.chip.write(data)
        }

        fn flush(&mut self) -> Result<()> {
            self.chip.flush()
        }

        fn set_baud_rate(&mut self, bps: u32) -> Result<()> {
            self.chip.set_baud_rate(bps)
        }

        fn transport_type(&self) -> TransportType {
            self.chip.transport_type()
        }
    }

    #[test]
    fn failed_configuration_closes_link() {
        let mut chip = VirtualChip::new();
        chip.inject_response(vec![0x45]);
        let open = Arc::new(AtomicBool::new(false));
        let uart = Tracked {
            chip,
            open: Arc::clone(&open),
        };
        let config = DriverConfig {
            send_config: true,
            ..DriverConfig::default()
        };

        let err = Speaker::open(uart, NoDelay::default(), &config).unwrap_err();
        assert!(matches!(err, Syn6288Error::UnexpectedResponse { .. }));
        assert!(!open.load(Ordering::SeqCst));
    }

    #[test]
    fn successful_open_keeps_link() {
        let open = Arc::new(AtomicBool::new(false));
        let uart = Tracked {
            chip: VirtualChip::new(),
            open: Arc::clone(&open),
        };
        let speaker = Speaker::open(uart, NoDelay::default(), &DriverConfig::default()).unwrap();
        assert!(open.load(Ordering::SeqCst));
        speaker.close().unwrap();
        assert!(!open.load(Ordering::SeqCst));
    }

    #[test]
    fn busy_chip_refuses_new_requests() {
        let mut speaker = speaker(&DriverConfig::default());
        speaker.speak("hello").unwrap();
        assert!(matches!(speaker.ring(Ring::A), Err(Syn6288Error::Busy)));
        // the busy check above used one of the two busy polls
        assert_eq!(speaker.sync().unwrap(), 2);
        speaker.sound(Sound::B).unwrap();
    }

    #[test]
    fn sync_times_out_while_paused() {
        let config = DriverConfig {
            sync_max_polls: 5,
            ..DriverConfig::default()
        };
        let mut speaker = speaker(&config);
        speaker.message(Message::C).unwrap();
        speaker.pause().unwrap();
        assert!(matches!(speaker.sync(), Err(Syn6288Error::Timeout { polls: 5 })));
        speaker.resume().unwrap();
        assert!(speaker.sync().is_ok());
    }

    #[test]
    fn close_releases_link() {
        let speaker = speaker(&DriverConfig::default());
        let chip = speaker.close().unwrap();
        assert!(!chip.is_initialized());
    }
}
