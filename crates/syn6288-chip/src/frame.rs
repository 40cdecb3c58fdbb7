//! Host → chip frame format.
//!
//! ```text
//! ┌──────┬────────┬────────┬─────────┬─────────┬──────────────┬─────┐
//! │ 0xFD │ len_hi │ len_lo │ command │ [param] │ [payload...] │ xor │
//! └──────┴────────┴────────┴─────────┴─────────┴──────────────┴─────┘
//! ```
//!
//! `len` counts every byte after the length field, checksum included.
//! The checksum is the XOR of all preceding bytes, so XOR-ing a complete
//! frame yields zero.

use thiserror::Error;

use crate::command::{opcode, FRAME_BUFFER_LEN, FRAME_HEADER, FRAME_PREFIX_LEN, MAX_TEXT_LEN};
use crate::params::{BaudRate, Message, Mode, Ring, Sound, TextType};

/// XOR of every byte.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Frame construction or validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Payload longer than [`MAX_TEXT_LEN`].
    #[error("payload of {len} bytes exceeds {max}")]
    PayloadTooLong {
        /// Payload length
        len: usize,
        /// Maximum accepted
        max: usize,
    },
    /// Fewer bytes than the smallest valid frame.
    #[error("frame truncated at {len} bytes")]
    Truncated {
        /// Bytes available
        len: usize,
    },
    /// First byte is not `0xFD`.
    #[error("bad frame header 0x{0:02X}")]
    BadHeader(u8),
    /// Length field disagrees with the byte count.
    #[error("length field {declared} but {actual} bytes follow")]
    LengthMismatch {
        /// Value of the length field
        declared: usize,
        /// Bytes actually following the length field
        actual: usize,
    },
    /// Trailing XOR does not match.
    #[error("checksum 0x{found:02X}, expected 0x{expected:02X}")]
    Checksum {
        /// XOR computed over the frame
        expected: u8,
        /// XOR byte found in the frame
        found: u8,
    },
}

/// An encoded host frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Encode a frame from its command, optional param byte and payload.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PayloadTooLong`] if `payload` exceeds
    /// [`MAX_TEXT_LEN`].
    pub fn new(command: u8, param: Option<u8>, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_TEXT_LEN {
            return Err(FrameError::PayloadTooLong {
                len: payload.len(),
                max: MAX_TEXT_LEN,
            });
        }

        // command + param + payload + xor
        let body_len = 1 + usize::from(param.is_some()) + payload.len() + 1;
        let mut bytes = Vec::with_capacity(FRAME_PREFIX_LEN + body_len);
        bytes.push(FRAME_HEADER);
        // body_len <= 203, so the high byte is always zero
        #[allow(clippy::cast_possible_truncation)]
        bytes.extend_from_slice(&(body_len as u16).to_be_bytes());
        bytes.push(command);
        bytes.extend(param);
        bytes.extend_from_slice(payload);
        bytes.push(checksum(&bytes));

        debug_assert!(bytes.len() <= FRAME_BUFFER_LEN);
        Ok(Self { bytes })
    }

    /// Command with no param and no payload (stop, pause, status, ...).
    #[must_use]
    pub fn control(command: u8) -> Self {
        Self::new(command, None, &[]).unwrap_or_else(|_| unreachable!("empty payload"))
    }

    /// Text synthesis in the given mode and encoding.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PayloadTooLong`] for text over 200 bytes.
    pub fn text(mode: Mode, text_type: TextType, text: &[u8]) -> Result<Self, FrameError> {
        Self::new(opcode::SYNTHESIS, Some(mode.code() | text_type.code()), text)
    }

    /// Inline control text (`v[N]`, `t[N]`, ...) sent with param 0x00.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PayloadTooLong`] for commands over 200 bytes.
    pub fn inline(command: &str) -> Result<Self, FrameError> {
        Self::new(opcode::SYNTHESIS, Some(0x00), command.as_bytes())
    }

    /// Prompt sound `soundX`.
    #[must_use]
    pub fn sound(sound: Sound) -> Self {
        Self::tone(crate::command::tone::SOUND, sound.code())
    }

    /// Message tone `msgX`.
    #[must_use]
    pub fn message(message: Message) -> Self {
        Self::tone(crate::command::tone::MESSAGE, message.code())
    }

    /// Ring tone `ringX`.
    #[must_use]
    pub fn ring(ring: Ring) -> Self {
        Self::tone(crate::command::tone::RING, ring.code())
    }

    fn tone(prefix: &str, code: u8) -> Self {
        let mut payload = prefix.as_bytes().to_vec();
        payload.push(code);
        Self::new(opcode::SYNTHESIS, Some(0x00), &payload)
            .unwrap_or_else(|_| unreachable!("tone payloads are 6 bytes at most"))
    }

    /// Set-baud-rate command.
    #[must_use]
    pub fn baud_rate(rate: BaudRate) -> Self {
        Self::new(opcode::SET_BAUD_RATE, Some(rate.code()), &[])
            .unwrap_or_else(|_| unreachable!("empty payload"))
    }

    /// Validate and wrap raw frame bytes.
    ///
    /// # Errors
    ///
    /// Returns an error for a bad header, a length field that disagrees with
    /// the byte count, or a wrong checksum.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        // header + length + command + xor
        if bytes.len() < FRAME_PREFIX_LEN + 2 {
            return Err(FrameError::Truncated { len: bytes.len() });
        }
        if bytes[0] != FRAME_HEADER {
            return Err(FrameError::BadHeader(bytes[0]));
        }
        let declared = usize::from(u16::from_be_bytes([bytes[1], bytes[2]]));
        let actual = bytes.len() - FRAME_PREFIX_LEN;
        if declared != actual {
            return Err(FrameError::LengthMismatch { declared, actual });
        }
        let (body, xor) = bytes.split_at(bytes.len() - 1);
        let expected = checksum(body);
        if expected != xor[0] {
            return Err(FrameError::Checksum {
                expected,
                found: xor[0],
            });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Encoded bytes, ready for the UART.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total encoded length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a frame has at least header, length, command and xor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Command opcode.
    #[must_use]
    pub fn command(&self) -> u8 {
        self.bytes[FRAME_PREFIX_LEN]
    }

    /// Bytes between the command and the checksum (param, then payload).
    #[must_use]
    pub fn arguments(&self) -> &[u8] {
        &self.bytes[FRAME_PREFIX_LEN + 1..self.bytes.len() - 1]
    }

    /// Param byte, if the frame carries one.
    #[must_use]
    pub fn param(&self) -> Option<u8> {
        self.arguments().first().copied()
    }

    /// Payload after the param byte.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.arguments().get(1..).unwrap_or_default()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
