// SPDX-License-Identifier: AGPL-3.0-only

//! Virtual SYN6288 backend
//!
//! Implements [`Uart`] with an in-memory model of the chip's command
//! handling. Every frame the driver writes is decoded, checked and answered
//! the way the hardware answers it:
//!
//! - a malformed frame gets `0x45`
//! - every accepted frame gets `0x41`
//! - a status query gets `0x41` followed by `0x4E` (busy) or `0x4F` (idle)
//! - nothing at all comes back when the host and chip rates disagree
//!
//! Playback has no audio. A synthesis keeps the chip busy for a fixed number
//! of status polls, which lets the busy/idle paths of the driver run in CI.

use crate::error::{Result, Syn6288Error};
use crate::transport::{TransportType, Uart};
use std::collections::VecDeque;
use syn6288_chip::command::{inline, opcode, opcode_name, response, tone};
use syn6288_chip::{BaudRate, Frame, Message, Mode, Ring, Sound, TextType};
use tracing::{debug, info, trace, warn};

/// Status polls a synthesis stays busy for, by default.
const DEFAULT_PLAY_POLLS: u32 = 3;

/// Power-on synthesis volume of the chip.
const POWER_ON_SYNTHESIS_VOLUME: u8 = 10;

/// Power-on background volume of the chip.
const POWER_ON_BACKGROUND_VOLUME: u8 = 10;

/// Power-on speech speed of the chip.
const POWER_ON_SYNTHESIS_SPEED: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Playback {
    Idle,
    Playing { remaining: u32, paused: bool },
}

/// A text synthesis the virtual chip accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Background music mode from the param byte
    pub mode: Mode,
    /// Text encoding from the param byte
    pub text_type: TextType,
    /// Raw text bytes
    pub text: Vec<u8>,
}

/// In-memory SYN6288.
#[derive(Debug)]
pub struct VirtualChip {
    initialized: bool,
    /// Rate the chip listens at
    chip_baud: BaudRate,
    /// Rate the host side is set to
    host_bps: u32,
    /// Bytes waiting for the host to read
    rx: VecDeque<u8>,
    /// Every frame the chip accepted, in order
    frames: Vec<Frame>,
    playback: Playback,
    play_polls: u32,
    synthesis_volume: u8,
    background_volume: u8,
    synthesis_speed: u8,
    powered_down: bool,
    utterances: Vec<Utterance>,
    /// Canned answers that replace the next responses
    injected: VecDeque<Vec<u8>>,
}

impl Default for VirtualChip {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualChip {
    /// Virtual chip at its power-on rate of 9600 bps
    pub fn new() -> Self {
        Self::with_baud_rate(BaudRate::default())
    }

    /// Virtual chip that was left at `rate` by an earlier session
    pub fn with_baud_rate(rate: BaudRate) -> Self {
        Self {
            initialized: false,
            chip_baud: rate,
            host_bps: rate.bps(),
            rx: VecDeque::new(),
            frames: Vec::new(),
            playback: Playback::Idle,
            play_polls: DEFAULT_PLAY_POLLS,
            synthesis_volume: POWER_ON_SYNTHESIS_VOLUME,
            background_volume: POWER_ON_BACKGROUND_VOLUME,
            synthesis_speed: POWER_ON_SYNTHESIS_SPEED,
            powered_down: false,
            utterances: Vec::new(),
            injected: VecDeque::new(),
        }
    }

    /// Number of status polls that report busy after each synthesis
    #[must_use]
    pub fn with_play_polls(mut self, polls: u32) -> Self {
        self.play_polls = polls;
        self
    }

    /// Answer the next frame with `bytes` instead of the normal response
    ///
    /// The frame is still recorded but has no effect on the chip state.
    pub fn inject_response(&mut self, bytes: Vec<u8>) {
        self.injected.push_back(bytes);
    }

    /// Frames accepted so far
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Most recent accepted frame
    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Rate the chip currently listens at
    pub const fn baud_rate(&self) -> BaudRate {
        self.chip_baud
    }

    /// Rate the host side is currently set to
    pub const fn host_bps(&self) -> u32 {
        self.host_bps
    }

    /// Synthesis volume last set with `v[N]`
    pub const fn synthesis_volume(&self) -> u8 {
        self.synthesis_volume
    }

    /// Background volume last set with `m[N]`
    pub const fn background_volume(&self) -> u8 {
        self.background_volume
    }

    /// Speech speed last set with `t[N]`
    pub const fn synthesis_speed(&self) -> u8 {
        self.synthesis_speed
    }

    /// True while playing, paused or not
    pub const fn is_busy(&self) -> bool {
        matches!(self.playback, Playback::Playing { .. })
    }

    /// True while a playback is paused
    pub const fn is_paused(&self) -> bool {
        matches!(self.playback, Playback::Playing { paused: true, .. })
    }

    /// True after a power-down command until the next frame arrives
    pub const fn is_powered_down(&self) -> bool {
        self.powered_down
    }

    /// Text syntheses accepted so far
    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    /// Most recent text synthesis
    pub fn last_utterance(&self) -> Option<&Utterance> {
        self.utterances.last()
    }

    fn respond(&mut self, bytes: &[u8]) {
        trace!("VirtualChip: answer {bytes:02X?}");
        self.rx.extend(bytes);
    }

    fn start_playback(&mut self) {
        self.playback = Playback::Playing {
            remaining: self.play_polls,
            paused: false,
        };
    }

    fn handle(&mut self, frame: &Frame) {
        let command = frame.command();
        debug!("VirtualChip: {} frame", opcode_name(command));

        match command {
            opcode::SYNTHESIS => self.handle_synthesis(frame),

            opcode::STOP => {
                self.playback = Playback::Idle;
                self.respond(&[response::ACK]);
            }

            opcode::PAUSE => {
                if let Playback::Playing { paused, .. } = &mut self.playback {
                    *paused = true;
                }
                self.respond(&[response::ACK]);
            }

            opcode::RESUME => {
                if let Playback::Playing { paused, .. } = &mut self.playback {
                    *paused = false;
                }
                self.respond(&[response::ACK]);
            }

            opcode::QUERY_STATUS => {
                let busy = match &mut self.playback {
                    Playback::Idle => false,
                    Playback::Playing { paused: true, .. } => true,
                    Playback::Playing { remaining, .. } => {
                        *remaining = remaining.saturating_sub(1);
                        true
                    }
                };
                if let Playback::Playing {
                    remaining: 0,
                    paused: false,
                } = self.playback
                {
                    self.playback = Playback::Idle;
                }
                let status = if busy { response::BUSY } else { response::IDLE };
                self.respond(&[response::ACK, status]);
            }

            opcode::SET_BAUD_RATE => match frame.param().and_then(BaudRate::from_code) {
                Some(rate) => {
                    // acknowledged at the old rate, then the chip switches
                    self.respond(&[response::ACK]);
                    info!("VirtualChip: {} -> {}", self.chip_baud, rate);
                    self.chip_baud = rate;
                }
                None => self.respond(&[response::FRAME_ERROR]),
            },

            opcode::POWER_DOWN => {
                self.playback = Playback::Idle;
                self.powered_down = true;
                self.respond(&[response::ACK]);
            }

            _ => {
                warn!("VirtualChip: unknown opcode 0x{command:02X}");
                self.respond(&[response::FRAME_ERROR]);
            }
        }
    }

    fn handle_synthesis(&mut self, frame: &Frame) {
        let Some(param) = frame.param() else {
            self.respond(&[response::FRAME_ERROR]);
            return;
        };
        let payload = frame.payload();

        if param == 0x00 {
            if let Some((prefix, value)) = std::str::from_utf8(payload).ok().and_then(inline::parse)
            {
                match prefix {
                    inline::SYNTHESIS_VOLUME => self.synthesis_volume = value,
                    inline::BACKGROUND_VOLUME => self.background_volume = value,
                    inline::SYNTHESIS_SPEED => self.synthesis_speed = value,
                    _ => {}
                }
                self.respond(&[response::ACK]);
                return;
            }

            if is_tone(payload) {
                self.start_playback();
                self.respond(&[response::ACK]);
                return;
            }
        }

        if is_markers_only(payload) {
            self.respond(&[response::ACK]);
            return;
        }

        let (Some(mode), Some(text_type)) =
            (Mode::from_code(param & 0xF8), TextType::from_code(param & 0x07))
        else {
            self.respond(&[response::FRAME_ERROR]);
            return;
        };

        self.utterances.push(Utterance {
            mode,
            text_type,
            text: payload.to_vec(),
        });
        self.start_playback();
        self.respond(&[response::ACK]);
    }
}

/// `sound<x>`, `msg<x>` or `ring<x>` with a letter the chip knows
fn is_tone(payload: &[u8]) -> bool {
    let Some((&letter, prefix)) = payload.split_last() else {
        return false;
    };
    match prefix {
        p if p == tone::SOUND.as_bytes() => Sound::from_code(letter).is_some(),
        p if p == tone::MESSAGE.as_bytes() => Message::from_code(letter).is_some(),
        p if p == tone::RING.as_bytes() => Ring::from_code(letter).is_some(),
        _ => false,
    }
}

/// Payload made of `[x1]`-style markers and nothing to speak
fn is_markers_only(payload: &[u8]) -> bool {
    let mut rest = payload;
    while let Some((&b'[', body)) = rest.split_first() {
        let Some(end) = body.iter().position(|&b| b == b']') else {
            return false;
        };
        rest = &body[end + 1..];
    }
    !payload.is_empty() && rest.is_empty()
}

impl Uart for VirtualChip {
    fn init(&mut self) -> Result<()> {
        self.initialized = true;
        self.rx.clear();
        info!("VirtualChip: link up at {} bps", self.host_bps);
        Ok(())
    }

    fn deinit(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(Syn6288Error::uart("deinit", "virtual link is not open"));
        }
        self.initialized = false;
        info!("VirtualChip: link down");
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.initialized {
            return Err(Syn6288Error::uart("read", "virtual link is not open"));
        }
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.initialized {
            return Err(Syn6288Error::uart("write", "virtual link is not open"));
        }

        if self.host_bps != self.chip_baud.bps() {
            debug!(
                "VirtualChip: host at {} bps, chip at {}; frame lost",
                self.host_bps, self.chip_baud
            );
            return Ok(());
        }

        let frame = match Frame::decode(data) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("VirtualChip: rejected frame: {e}");
                self.respond(&[response::FRAME_ERROR]);
                return Ok(());
            }
        };

        if self.powered_down {
            debug!("VirtualChip: woken from power down");
            self.powered_down = false;
        }

        self.frames.push(frame.clone());

        if let Some(canned) = self.injected.pop_front() {
            self.respond(&canned);
            return Ok(());
        }

        self.handle(&frame);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.rx.clear();
        Ok(())
    }

    fn set_baud_rate(&mut self, bps: u32) -> Result<()> {
        self.host_bps = bps;
        Ok(())
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Virtual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_chip() -> VirtualChip {
        let mut chip = VirtualChip::new();
        chip.init().unwrap();
        chip
    }

    fn exchange(chip: &mut VirtualChip, frame: &Frame, expect: usize) -> Vec<u8> {
        chip.write(frame.as_bytes()).unwrap();
        let mut buf = vec![0u8; expect];
        let n = chip.read(&mut buf).unwrap();
        buf.truncate(n);
        buf
    }

    #[test]
    fn closed_link_rejects_io() {
        let mut chip = VirtualChip::new();
        assert!(chip.write(Frame::control(opcode::STOP).as_bytes()).is_err());
        assert!(chip.read(&mut [0u8; 1]).is_err());
        assert!(chip.deinit().is_err());
    }

    #[test]
    fn corrupted_frame_gets_frame_error() {
        let mut chip = open_chip();
        chip.write(&[0xFD, 0x00, 0x02, 0x21, 0x00]).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(chip.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], response::FRAME_ERROR);
        assert!(chip.frames().is_empty());
    }

    #[test]
    fn synthesis_stays_busy_for_play_polls() {
        let mut chip = open_chip().with_play_polls(2);
        let status = Frame::control(opcode::QUERY_STATUS);

        assert_eq!(exchange(&mut chip, &status, 2), [response::ACK, response::IDLE]);

        let text = Frame::text(Mode::Background3, TextType::Gbk, b"hello").unwrap();
        assert_eq!(exchange(&mut chip, &text, 1), [response::ACK]);
        assert_eq!(
            chip.last_utterance(),
            Some(&Utterance {
                mode: Mode::Background3,
                text_type: TextType::Gbk,
                text: b"hello".to_vec(),
            })
        );

        assert_eq!(exchange(&mut chip, &status, 2), [response::ACK, response::BUSY]);
        assert_eq!(exchange(&mut chip, &status, 2), [response::ACK, response::BUSY]);
        assert_eq!(exchange(&mut chip, &status, 2), [response::ACK, response::IDLE]);
    }

    #[test]
    fn paused_playback_never_finishes() {
        let mut chip = open_chip().with_play_polls(1);
        let status = Frame::control(opcode::QUERY_STATUS);
        exchange(&mut chip, &Frame::ring(syn6288_chip::Ring::A), 1);
        exchange(&mut chip, &Frame::control(opcode::PAUSE), 1);
        assert!(chip.is_paused());
        for _ in 0..5 {
            assert_eq!(exchange(&mut chip, &status, 2)[1], response::BUSY);
        }
        exchange(&mut chip, &Frame::control(opcode::STOP), 1);
        assert_eq!(exchange(&mut chip, &status, 2)[1], response::IDLE);
    }

    #[test]
    fn inline_commands_update_settings() {
        let mut chip = open_chip();
        exchange(&mut chip, &Frame::inline("v[3]").unwrap(), 1);
        exchange(&mut chip, &Frame::inline("m[7]").unwrap(), 1);
        exchange(&mut chip, &Frame::inline("t[1]").unwrap(), 1);
        assert_eq!(chip.synthesis_volume(), 3);
        assert_eq!(chip.background_volume(), 7);
        assert_eq!(chip.synthesis_speed(), 1);
        assert!(!chip.is_busy());
        assert!(chip.utterances().is_empty());
    }

    #[test]
    fn markers_only_configure() {
        let mut chip = open_chip();
        exchange(&mut chip, &Frame::inline("[b1][y1]").unwrap(), 1);
        assert!(!chip.is_busy());
        assert!(chip.utterances().is_empty());
    }

    #[test]
    fn markers_before_text_are_spoken() {
        let mut chip = open_chip();
        let text = Frame::text(Mode::Background1, TextType::Gbk, b"[v5]hello").unwrap();
        assert_eq!(exchange(&mut chip, &text, 1), [response::ACK]);
        assert!(chip.is_busy());
        assert_eq!(
            chip.last_utterance(),
            Some(&Utterance {
                mode: Mode::Background1,
                text_type: TextType::Gbk,
                text: b"[v5]hello".to_vec(),
            })
        );
    }

    #[test]
    fn text_starting_like_a_tone_is_spoken() {
        let mut chip = open_chip();
        for text in [&b"ring me later"[..], &b"soundz"[..], &b"msg"[..]] {
            let frame = Frame::text(Mode::Common, TextType::Gb2312, text).unwrap();
            exchange(&mut chip, &frame, 1);
            assert_eq!(chip.last_utterance().unwrap().text, text);
        }
        assert_eq!(chip.utterances().len(), 3);

        exchange(&mut chip, &Frame::ring(Ring::O), 1);
        assert_eq!(chip.utterances().len(), 3);
        assert!(chip.is_busy());
    }

    #[test]
    fn rate_mismatch_is_silent() {
        let mut chip = open_chip();
        assert_eq!(
            exchange(&mut chip, &Frame::baud_rate(BaudRate::Bps38400), 1),
            [response::ACK]
        );
        assert_eq!(chip.baud_rate(), BaudRate::Bps38400);

        // host still at 9600
        assert!(exchange(&mut chip, &Frame::control(opcode::STOP), 1).is_empty());

        chip.set_baud_rate(38_400).unwrap();
        assert_eq!(exchange(&mut chip, &Frame::control(opcode::STOP), 1), [response::ACK]);
    }

    #[test]
    fn power_down_until_next_frame() {
        let mut chip = open_chip();
        exchange(&mut chip, &Frame::control(opcode::POWER_DOWN), 1);
        assert!(chip.is_powered_down());
        exchange(&mut chip, &Frame::control(opcode::QUERY_STATUS), 2);
        assert!(!chip.is_powered_down());
    }

    #[test]
    fn injected_response_replaces_answer() {
        let mut chip = open_chip();
        chip.inject_response(vec![0x00, 0x00]);
        let status = Frame::control(opcode::QUERY_STATUS);
        assert_eq!(exchange(&mut chip, &status, 2), [0x00, 0x00]);
        assert_eq!(exchange(&mut chip, &status, 2), [response::ACK, response::IDLE]);
        assert_eq!(chip.frames().len(), 2);
    }

    #[test]
    fn flush_discards_pending_bytes() {
        let mut chip = open_chip();
        chip.write(Frame::control(opcode::QUERY_STATUS).as_bytes()).unwrap();
        chip.flush().unwrap();
        assert_eq!(chip.read(&mut [0u8; 2]).unwrap(), 0);
    }

    #[test]
    fn transport_type_is_virtual() {
        assert_eq!(VirtualChip::new().transport_type(), TransportType::Virtual);
    }
}
