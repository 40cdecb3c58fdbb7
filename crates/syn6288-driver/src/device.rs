//! SYN6288 handle and operations
//!
//! [`Syn6288`] owns a [`Uart`] and a [`Delay`] and turns each chip command
//! into one framed exchange. It also caches the settings the chip cannot
//! report back (rate, mode, text type, volumes, speed).

use syn6288_chip::command::{
    inline, opcode, opcode_name, response, MAX_TEXT_LEN, RESPONSE_DELAY_MS, STATUS_RETRIES,
};
use syn6288_chip::params::{MAX_BACKGROUND_VOLUME, MAX_SYNTHESIS_SPEED, MAX_SYNTHESIS_VOLUME};
use syn6288_chip::{BaudRate, ChipInfo, Frame, Message, Mode, Ring, Sound, Status, TextType};

use crate::error::{Result, Syn6288Error};
use crate::transport::{Delay, Uart};

/// Encode `text` for a synthesis frame in `text_type`
///
/// Unicode text is sent as UTF-16BE. The GB2312, GBK and BIG5 encodings
/// share ASCII, so ASCII text passes through unchanged; anything else must
/// be encoded by the caller and sent with [`Syn6288::synthesis_text`].
///
/// # Errors
///
/// Returns `Encoding` for non-ASCII text in a GB or BIG5 text type.
pub fn encode_text(text_type: TextType, text: &str) -> Result<Vec<u8>> {
    match text_type {
        TextType::Unicode => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
        _ if text.is_ascii() => Ok(text.as_bytes().to_vec()),
        _ => Err(Syn6288Error::encoding(
            text_type,
            "non-ASCII text must be pre-encoded and sent as bytes",
        )),
    }
}

/// SYN6288 handle
///
/// Generic over the link so the same code drives a serial port or the
/// virtual chip. Every operation except [`Syn6288::new`], [`Syn6288::info`]
/// and [`Syn6288::init`] fails with `NotInitialized` until `init` succeeds.
#[derive(Debug)]
pub struct Syn6288<U, D> {
    uart: U,
    delay: D,
    initialized: bool,
    text_type: TextType,
    mode: Mode,
    baud_rate: BaudRate,
    synthesis_volume: u8,
    background_volume: u8,
    synthesis_speed: u8,
}

impl<U: Uart, D: Delay> Syn6288<U, D> {
    /// Create a handle over `uart`
    ///
    /// The link is assumed to run at the chip's power-on rate of 9600 bps;
    /// use [`Syn6288::with_link_rate`] if the chip was left at another rate.
    pub fn new(uart: U, delay: D) -> Self {
        Self {
            uart,
            delay,
            initialized: false,
            text_type: TextType::Gb2312,
            mode: Mode::Common,
            baud_rate: BaudRate::Bps9600,
            synthesis_volume: 0,
            background_volume: 0,
            synthesis_speed: 0,
        }
    }

    /// Record the rate the link is already running at
    #[must_use]
    pub fn with_link_rate(mut self, rate: BaudRate) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Static chip information
    #[must_use]
    pub const fn info() -> ChipInfo {
        ChipInfo::SYN6288
    }

    /// Open the link
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the UART cannot be initialized.
    pub fn init(&mut self) -> Result<()> {
        self.uart.init().map_err(|e| {
            tracing::error!("UART init failed: {e}");
            e
        })?;
        self.initialized = true;
        tracing::info!("SYN6288 initialized over {}", self.uart.transport_type());
        Ok(())
    }

    /// Close the link
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if the handle is not open, or the transport's
    /// error if the UART cannot be released.
    pub fn deinit(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.uart.deinit()?;
        self.initialized = false;
        tracing::info!("SYN6288 deinitialized");
        Ok(())
    }

    /// Whether `init` has succeeded and `deinit` has not been called since
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ── Synthesis ───────────────────────────────────────────────────────────

    /// Synthesize pre-encoded text in the cached mode and text type
    ///
    /// # Errors
    ///
    /// Returns `TextTooLong` for more than 200 bytes, or a link or response
    /// error.
    pub fn synthesis_text(&mut self, text: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        if text.len() > MAX_TEXT_LEN {
            tracing::error!("text is too long: {} bytes", text.len());
            return Err(Syn6288Error::TextTooLong {
                len: text.len(),
                max: MAX_TEXT_LEN,
            });
        }
        let frame = Frame::text(self.mode, self.text_type, text)?;
        self.transact(&frame)
    }

    /// Encode `text` for the cached text type and synthesize it
    ///
    /// # Errors
    ///
    /// Returns `Encoding` if the text cannot be represented (see
    /// [`encode_text`]), then as [`Syn6288::synthesis_text`].
    pub fn synthesis_str(&mut self, text: &str) -> Result<()> {
        self.ensure_initialized()?;
        let bytes = encode_text(self.text_type, text)?;
        self.synthesis_text(&bytes)
    }

    /// Play a prompt sound
    ///
    /// # Errors
    ///
    /// Returns a link or response error.
    pub fn synthesis_sound(&mut self, sound: Sound) -> Result<()> {
        self.ensure_initialized()?;
        self.transact(&Frame::sound(sound))
    }

    /// Play a message tone
    ///
    /// # Errors
    ///
    /// Returns a link or response error.
    pub fn synthesis_message(&mut self, message: Message) -> Result<()> {
        self.ensure_initialized()?;
        self.transact(&Frame::message(message))
    }

    /// Play a ring tone
    ///
    /// # Errors
    ///
    /// Returns a link or response error.
    pub fn synthesis_ring(&mut self, ring: Ring) -> Result<()> {
        self.ensure_initialized()?;
        self.transact(&Frame::ring(ring))
    }

    // ── Playback control ────────────────────────────────────────────────────

    /// Query busy/idle status
    ///
    /// An answer other than `41 4E` or `41 4F` is retried up to three times.
    ///
    /// # Errors
    ///
    /// Returns `ShortRead` if fewer than two bytes arrive, or
    /// `UnexpectedResponse` once the retries are used up.
    pub fn status(&mut self) -> Result<Status> {
        self.ensure_initialized()?;
        let frame = Frame::control(opcode::QUERY_STATUS);
        let command = opcode_name(opcode::QUERY_STATUS);
        let mut answer = [0u8; 2];

        for attempt in 0..=STATUS_RETRIES {
            if attempt > 0 {
                tracing::warn!(
                    "status answer {answer:02X?}, retry {attempt}/{STATUS_RETRIES}"
                );
                self.delay.delay_ms(RESPONSE_DELAY_MS);
            }

            self.send(&frame)?;
            let got = self.uart.read(&mut answer)?;
            if got != answer.len() {
                tracing::error!("status answer truncated: {:02X?}", &answer[..got]);
                return Err(Syn6288Error::ShortRead {
                    command,
                    expected: answer.len(),
                    got,
                });
            }
            tracing::debug!("<- {answer:02X?}");

            if answer[0] == response::ACK {
                if let Some(status) = Status::from_response(answer[1]) {
                    return Ok(status);
                }
            }
        }

        tracing::error!("status query failed: {answer:02X?}");
        Err(Syn6288Error::UnexpectedResponse {
            command,
            got: answer.to_vec(),
        })
    }

    /// Stop the current synthesis
    ///
    /// # Errors
    ///
    /// Returns a link or response error.
    pub fn stop(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.transact(&Frame::control(opcode::STOP))
    }

    /// Pause the current synthesis
    ///
    /// # Errors
    ///
    /// Returns a link or response error.
    pub fn pause(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.transact(&Frame::control(opcode::PAUSE))
    }

    /// Resume a paused synthesis
    ///
    /// # Errors
    ///
    /// Returns a link or response error.
    pub fn resume(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.transact(&Frame::control(opcode::RESUME))
    }

    /// Put the chip in power-down mode; the next frame wakes it
    ///
    /// # Errors
    ///
    /// Returns a link or response error.
    pub fn power_down(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.transact(&Frame::control(opcode::POWER_DOWN))
    }

    // ── Settings ────────────────────────────────────────────────────────────

    /// Change the link rate
    ///
    /// The chip acknowledges at the old rate, then the host side of the
    /// link is switched to follow it.
    ///
    /// # Errors
    ///
    /// Returns a link or response error. Without an acknowledgement the
    /// cached rate is left unchanged; once the chip acknowledged, the cache
    /// follows the chip even if the host port then fails to switch.
    pub fn set_baud_rate(&mut self, rate: BaudRate) -> Result<()> {
        self.ensure_initialized()?;
        self.transact(&Frame::baud_rate(rate))?;
        tracing::info!("baud rate {} -> {}", self.baud_rate, rate);
        self.baud_rate = rate;
        self.uart.set_baud_rate(rate.bps()).map_err(|e| {
            tracing::error!("chip switched to {rate} but the host port did not: {e}");
            e
        })
    }

    /// Cached link rate
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before `init`.
    pub fn baud_rate(&self) -> Result<BaudRate> {
        self.ensure_initialized()?;
        Ok(self.baud_rate)
    }

    /// Set the background mode used by the next text synthesis
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before `init`.
    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.ensure_initialized()?;
        self.mode = mode;
        tracing::debug!("mode = {mode}");
        Ok(())
    }

    /// Cached background mode
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before `init`.
    pub fn mode(&self) -> Result<Mode> {
        self.ensure_initialized()?;
        Ok(self.mode)
    }

    /// Set the encoding used by the next text synthesis
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before `init`.
    pub fn set_text_type(&mut self, text_type: TextType) -> Result<()> {
        self.ensure_initialized()?;
        self.text_type = text_type;
        tracing::debug!("text type = {text_type}");
        Ok(())
    }

    /// Cached text encoding
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before `init`.
    pub fn text_type(&self) -> Result<TextType> {
        self.ensure_initialized()?;
        Ok(self.text_type)
    }

    /// Set synthesis volume, 0..=16
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` above 16 without sending anything, or a
    /// link or response error.
    pub fn set_synthesis_volume(&mut self, volume: u8) -> Result<()> {
        self.ensure_initialized()?;
        self.send_inline(
            inline::SYNTHESIS_VOLUME,
            "synthesis volume",
            volume,
            MAX_SYNTHESIS_VOLUME,
        )?;
        self.synthesis_volume = volume;
        Ok(())
    }

    /// Cached synthesis volume
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before `init`.
    pub fn synthesis_volume(&self) -> Result<u8> {
        self.ensure_initialized()?;
        Ok(self.synthesis_volume)
    }

    /// Set background music volume, 0..=16
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` above 16 without sending anything, or a
    /// link or response error.
    pub fn set_background_volume(&mut self, volume: u8) -> Result<()> {
        self.ensure_initialized()?;
        self.send_inline(
            inline::BACKGROUND_VOLUME,
            "background volume",
            volume,
            MAX_BACKGROUND_VOLUME,
        )?;
        self.background_volume = volume;
        Ok(())
    }

    /// Cached background music volume
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before `init`.
    pub fn background_volume(&self) -> Result<u8> {
        self.ensure_initialized()?;
        Ok(self.background_volume)
    }

    /// Set speech speed, 0..=5
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` above 5 without sending anything, or a
    /// link or response error.
    pub fn set_synthesis_speed(&mut self, speed: u8) -> Result<()> {
        self.ensure_initialized()?;
        self.send_inline(
            inline::SYNTHESIS_SPEED,
            "synthesis speed",
            speed,
            MAX_SYNTHESIS_SPEED,
        )?;
        self.synthesis_speed = speed;
        Ok(())
    }

    /// Cached speech speed
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before `init`.
    pub fn synthesis_speed(&self) -> Result<u8> {
        self.ensure_initialized()?;
        Ok(self.synthesis_speed)
    }

    /// Send a raw inline command such as `[y1]` or `[b0]`
    ///
    /// # Errors
    ///
    /// Returns `TextTooLong` for more than 200 bytes, or a link or response
    /// error.
    pub fn set_command(&mut self, command: &str) -> Result<()> {
        self.ensure_initialized()?;
        let frame = Frame::inline(command)?;
        self.transact(&frame)
    }

    // ── Access ──────────────────────────────────────────────────────────────

    /// Borrow the link
    pub const fn uart(&self) -> &U {
        &self.uart
    }

    /// Borrow the link mutably
    pub fn uart_mut(&mut self) -> &mut U {
        &mut self.uart
    }

    /// Borrow the delay source
    pub const fn delay(&self) -> &D {
        &self.delay
    }

    /// Give back the link and delay source
    pub fn into_parts(self) -> (U, D) {
        (self.uart, self.delay)
    }

    pub(crate) fn wait(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    // ── Protocol ────────────────────────────────────────────────────────────

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Syn6288Error::NotInitialized)
        }
    }

    fn send_inline(&mut self, prefix: char, name: &'static str, value: u8, max: u8) -> Result<()> {
        if value > max {
            tracing::error!("{name} {value} out of range (max {max})");
            return Err(Syn6288Error::InvalidParameter { name, value, max });
        }
        let frame = Frame::inline(&inline::format(prefix, value))?;
        self.transact(&frame)
    }

    /// Flush, write and give the chip time to answer
    fn send(&mut self, frame: &Frame) -> Result<()> {
        self.uart.flush().map_err(|e| {
            tracing::error!("UART flush failed: {e}");
            e
        })?;
        tracing::debug!("-> {} {:02X?}", opcode_name(frame.command()), frame.as_bytes());
        self.uart.write(frame.as_bytes()).map_err(|e| {
            tracing::error!("UART write failed: {e}");
            e
        })?;
        self.delay.delay_ms(RESPONSE_DELAY_MS);
        Ok(())
    }

    /// One command, one acknowledgement byte
    fn transact(&mut self, frame: &Frame) -> Result<()> {
        let command = opcode_name(frame.command());
        self.send(frame)?;

        let mut answer = [0u8; 1];
        let got = self.uart.read(&mut answer)?;
        if got == 0 {
            tracing::error!("no answer to {command}");
            return Err(Syn6288Error::ShortRead {
                command,
                expected: 1,
                got,
            });
        }
        tracing::debug!("<- {:02X}", answer[0]);

        if answer[0] != response::ACK {
            tracing::error!("{command} rejected: {:02X}", answer[0]);
            return Err(Syn6288Error::UnexpectedResponse {
                command,
                got: answer.to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::VirtualChip;
    use crate::transport::{NoDelay, TransportType};

    fn open() -> Syn6288<VirtualChip, NoDelay> {
        let mut chip = Syn6288::new(VirtualChip::new(), NoDelay::default());
        chip.init().unwrap();
        chip
    }

    #[test]
    fn everything_fails_before_init() {
        let mut chip = Syn6288::new(VirtualChip::new(), NoDelay::default());
        assert!(!chip.is_initialized());
        assert!(matches!(chip.status(), Err(Syn6288Error::NotInitialized)));
        assert!(matches!(chip.synthesis_str("hi"), Err(Syn6288Error::NotInitialized)));
        assert!(matches!(chip.mode(), Err(Syn6288Error::NotInitialized)));
        assert!(matches!(chip.set_mode(Mode::Common), Err(Syn6288Error::NotInitialized)));
        assert!(matches!(chip.baud_rate(), Err(Syn6288Error::NotInitialized)));
        assert!(matches!(chip.deinit(), Err(Syn6288Error::NotInitialized)));
        assert!(chip.uart().frames().is_empty());
    }

    #[test]
    fn info_is_static() {
        let info = Syn6288::<VirtualChip, NoDelay>::info();
        assert_eq!(info.chip_name, "YuToneWorld SYN6288");
        assert_eq!(info.driver_version, 2000);
    }

    #[test]
    fn each_command_waits_before_reading() {
        let mut chip = open();
        chip.stop().unwrap();
        assert_eq!(chip.delay().elapsed_ms(), u64::from(RESPONSE_DELAY_MS));
        assert_eq!(chip.uart().last_frame().unwrap().as_bytes(), [0xFD, 0x00, 0x02, 0x02, 0xFD]);
    }

    #[test]
    fn text_frame_carries_mode_and_type() {
        let mut chip = open();
        chip.set_mode(Mode::Background15).unwrap();
        chip.set_text_type(TextType::Big5).unwrap();
        chip.synthesis_text(&[0xA6, 0x74]).unwrap();
        let frame = chip.uart().last_frame().unwrap();
        assert_eq!(frame.param(), Some((15 << 3) | 0x02));
        assert_eq!(frame.payload(), [0xA6, 0x74]);
    }

    #[test]
    fn unicode_is_utf16_be() {
        assert_eq!(
            encode_text(TextType::Unicode, "语音").unwrap(),
            [0x8B, 0xED, 0x97, 0xF3]
        );
        assert_eq!(encode_text(TextType::Gbk, "abc").unwrap(), b"abc");
        assert!(matches!(
            encode_text(TextType::Gb2312, "语音"),
            Err(Syn6288Error::Encoding { .. })
        ));
    }

    #[test]
    fn long_text_is_rejected_unsent() {
        let mut chip = open();
        let err = chip.synthesis_text(&[b'a'; 201]).unwrap_err();
        assert!(matches!(err, Syn6288Error::TextTooLong { len: 201, max: 200 }));
        assert!(matches!(
            chip.set_command(&"x".repeat(201)),
            Err(Syn6288Error::TextTooLong { .. })
        ));
        assert!(chip.uart().frames().is_empty());
    }

    #[test]
    fn out_of_range_settings_send_nothing() {
        let mut chip = open();
        assert!(matches!(
            chip.set_synthesis_volume(17),
            Err(Syn6288Error::InvalidParameter { value: 17, max: 16, .. })
        ));
        assert!(chip.set_background_volume(17).is_err());
        assert!(chip.set_synthesis_speed(6).is_err());
        assert!(chip.uart().frames().is_empty());
        assert_eq!(chip.synthesis_volume().unwrap(), 0);
    }

    #[test]
    fn settings_reach_the_chip() {
        let mut chip = open();
        chip.set_synthesis_volume(6).unwrap();
        chip.set_background_volume(8).unwrap();
        chip.set_synthesis_speed(3).unwrap();
        assert_eq!(chip.uart().synthesis_volume(), 6);
        assert_eq!(chip.uart().background_volume(), 8);
        assert_eq!(chip.uart().synthesis_speed(), 3);
        assert_eq!(chip.uart().last_frame().unwrap().payload(), b"t[3]");
    }

    #[test]
    fn rejected_setting_keeps_cache() {
        let mut chip = open();
        chip.set_synthesis_volume(4).unwrap();
        chip.uart_mut().inject_response(vec![response::FRAME_ERROR]);
        assert!(matches!(
            chip.set_synthesis_volume(9),
            Err(Syn6288Error::UnexpectedResponse { .. })
        ));
        assert_eq!(chip.synthesis_volume().unwrap(), 4);
    }

    #[test]
    fn status_retries_then_gives_up() {
        let mut chip = open();
        for _ in 0..2 {
            chip.uart_mut().inject_response(vec![0x00, 0x00]);
        }
        assert_eq!(chip.status().unwrap(), Status::Idle);
        assert_eq!(chip.uart().frames().len(), 3);

        for _ in 0..4 {
            chip.uart_mut().inject_response(vec![response::ACK, 0x00]);
        }
        let frames_before = chip.uart().frames().len();
        let elapsed_before = chip.delay().elapsed_ms();
        assert!(matches!(
            chip.status(),
            Err(Syn6288Error::UnexpectedResponse { got, .. }) if got == [response::ACK, 0x00]
        ));

        // one try plus three retries, each retry preceded by a 100 ms gap
        let attempts = 1 + usize::from(STATUS_RETRIES);
        assert_eq!(chip.uart().frames().len() - frames_before, attempts);
        assert_eq!(attempts, 4);
        assert_eq!(chip.delay().elapsed_ms() - elapsed_before, 4 * 100 + 3 * 100);
    }

    #[test]
    fn short_answers() {
        let mut chip = open();
        chip.uart_mut().inject_response(vec![response::ACK]);
        assert!(matches!(
            chip.status(),
            Err(Syn6288Error::ShortRead { expected: 2, got: 1, .. })
        ));
        chip.uart_mut().inject_response(Vec::new());
        assert!(matches!(
            chip.pause(),
            Err(Syn6288Error::ShortRead { expected: 1, got: 0, .. })
        ));
    }

    #[test]
    fn baud_change_moves_both_ends() {
        let mut chip = open();
        chip.set_baud_rate(BaudRate::Bps19200).unwrap();
        assert_eq!(chip.baud_rate().unwrap(), BaudRate::Bps19200);
        assert_eq!(chip.uart().baud_rate(), BaudRate::Bps19200);
        assert_eq!(chip.uart().host_bps(), 19_200);
        assert_eq!(chip.status().unwrap(), Status::Idle);
    }

    /// Virtual chip whose host side refuses to change speed
    #[derive(Debug)]
    struct StuckPort(VirtualChip);

    impl Uart for StuckPort {
        fn init(&mut self) -> Result<()> {
            self.0.init()
        }

        fn deinit(&mut self) -> Result<()> {
            self.0.deinit()
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            self.0.read(buf)
        }

        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.0.write(data)
        }

        fn flush(&mut self) -> Result<()> {
            self.0.flush()
        }

        fn set_baud_rate(&mut self, _bps: u32) -> Result<()> {
            Err(Syn6288Error::uart("set_baud_rate", "speed not supported"))
        }

        fn transport_type(&self) -> TransportType {
            self.0.transport_type()
        }
    }

    #[test]
    fn acknowledged_baud_change_updates_cache_when_host_fails() {
        let mut chip = Syn6288::new(StuckPort(VirtualChip::new()), NoDelay::default());
        chip.init().unwrap();

        assert!(matches!(
            chip.set_baud_rate(BaudRate::Bps38400),
            Err(Syn6288Error::Uart { op: "set_baud_rate", .. })
        ));
        assert_eq!(chip.uart().0.baud_rate(), BaudRate::Bps38400);
        assert_eq!(chip.baud_rate().unwrap(), BaudRate::Bps38400);
        assert_eq!(chip.uart().0.host_bps(), 9_600);
    }

    #[test]
    fn rejected_baud_change_keeps_cache() {
        let mut chip = open();
        chip.uart_mut().inject_response(vec![response::FRAME_ERROR]);
        assert!(chip.set_baud_rate(BaudRate::Bps19200).is_err());
        assert_eq!(chip.baud_rate().unwrap(), BaudRate::Bps9600);
        assert_eq!(chip.uart().host_bps(), 9_600);
    }

    #[test]
    fn deinit_closes_handle() {
        let mut chip = open();
        chip.deinit().unwrap();
        assert!(!chip.is_initialized());
        assert!(matches!(chip.stop(), Err(Syn6288Error::NotInitialized)));
    }
}
