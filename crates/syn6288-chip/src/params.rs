//! Synthesis parameters: baud rate, play mode, text encoding, tones, status.
//!
//! Every enum maps to the byte the chip expects on the wire (`code()`), can
//! be rebuilt from that byte (`from_code()`), and parses from the names used
//! on the command line and in config files.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Highest synthesis volume accepted by `v[N]`.
pub const MAX_SYNTHESIS_VOLUME: u8 = 16;

/// Highest background music volume accepted by `m[N]`.
pub const MAX_BACKGROUND_VOLUME: u8 = 16;

/// Highest speech speed accepted by `t[N]`.
pub const MAX_SYNTHESIS_SPEED: u8 = 5;

/// Error returned when a parameter name does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {input:?}")]
pub struct ParseParamError {
    kind: &'static str,
    input: String,
}

impl ParseParamError {
    fn new(kind: &'static str, input: &str) -> Self {
        Self {
            kind,
            input: input.to_owned(),
        }
    }

    /// Parameter kind that failed to parse ("baud rate", "mode", ...).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }
}

/// `String` conversions used by the optional serde support.
macro_rules! string_conversions {
    ($name:ident) => {
        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.to_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseParamError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

// ── Baud rate ───────────────────────────────────────────────────────────────

/// UART baud rate between host and chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub enum BaudRate {
    /// 9600 bps, power-on default.
    #[default]
    Bps9600,
    /// 19200 bps.
    Bps19200,
    /// 38400 bps.
    Bps38400,
}

impl BaudRate {
    /// All supported rates.
    pub const ALL: [Self; 3] = [Self::Bps9600, Self::Bps19200, Self::Bps38400];

    /// Parameter byte of the set-baud-rate command.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Bps9600 => 0x00,
            Self::Bps19200 => 0x01,
            Self::Bps38400 => 0x02,
        }
    }

    /// Bits per second.
    #[must_use]
    pub const fn bps(self) -> u32 {
        match self {
            Self::Bps9600 => 9600,
            Self::Bps19200 => 19_200,
            Self::Bps38400 => 38_400,
        }
    }

    /// Rate for a parameter byte.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Bps9600),
            0x01 => Some(Self::Bps19200),
            0x02 => Some(Self::Bps38400),
            _ => None,
        }
    }

    /// Rate for a numeric bits-per-second value.
    #[must_use]
    pub const fn from_bps(bps: u32) -> Option<Self> {
        match bps {
            9600 => Some(Self::Bps9600),
            19_200 => Some(Self::Bps19200),
            38_400 => Some(Self::Bps38400),
            _ => None,
        }
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bps", self.bps())
    }
}

impl FromStr for BaudRate {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim();
        let digits = digits
            .strip_suffix("bps")
            .or_else(|| digits.strip_suffix("BPS"))
            .unwrap_or(digits)
            .trim();
        digits
            .parse::<u32>()
            .ok()
            .and_then(Self::from_bps)
            .ok_or_else(|| ParseParamError::new("baud rate", s))
    }
}

string_conversions!(BaudRate);

// ── Play mode ───────────────────────────────────────────────────────────────

/// Play mode: plain speech, or speech over one of fifteen built-in
/// background tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
#[repr(u8)]
pub enum Mode {
    /// No background music.
    #[default]
    Common = 0,
    /// Background track 1.
    Background1,
    /// Background track 2.
    Background2,
    /// Background track 3.
    Background3,
    /// Background track 4.
    Background4,
    /// Background track 5.
    Background5,
    /// Background track 6.
    Background6,
    /// Background track 7.
    Background7,
    /// Background track 8.
    Background8,
    /// Background track 9.
    Background9,
    /// Background track 10.
    Background10,
    /// Background track 11.
    Background11,
    /// Background track 12.
    Background12,
    /// Background track 13.
    Background13,
    /// Background track 14.
    Background14,
    /// Background track 15.
    Background15,
}

impl Mode {
    /// All sixteen modes, `Common` first.
    pub const ALL: [Self; 16] = [
        Self::Common,
        Self::Background1,
        Self::Background2,
        Self::Background3,
        Self::Background4,
        Self::Background5,
        Self::Background6,
        Self::Background7,
        Self::Background8,
        Self::Background9,
        Self::Background10,
        Self::Background11,
        Self::Background12,
        Self::Background13,
        Self::Background14,
        Self::Background15,
    ];

    /// Bits OR-ed into the synthesis param byte (track number in bits 3..7).
    #[must_use]
    pub const fn code(self) -> u8 {
        (self as u8) << 3
    }

    /// Background track number, `None` for `Common`.
    #[must_use]
    pub const fn background_track(self) -> Option<u8> {
        match self {
            Self::Common => None,
            other => Some(other as u8),
        }
    }

    /// Mode playing background track `track` (1..=15).
    #[must_use]
    pub fn background(track: u8) -> Option<Self> {
        if track == 0 {
            return None;
        }
        Self::ALL.get(usize::from(track)).copied()
    }

    /// Mode for a param byte; the low three bits must be clear.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        if code & 0x07 != 0 {
            return None;
        }
        Self::ALL.get(usize::from(code >> 3)).copied()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.background_track() {
            None => f.write_str("common"),
            Some(track) => write!(f, "background-{track}"),
        }
    }
}

impl FromStr for Mode {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "common" || lower == "0" {
            return Ok(Self::Common);
        }
        let track = lower
            .strip_prefix("background")
            .or_else(|| lower.strip_prefix("bg"))
            .map_or(lower.as_str(), |rest| rest.trim_start_matches(&['-', '_'][..]));
        track
            .parse::<u8>()
            .ok()
            .and_then(Self::background)
            .ok_or_else(|| ParseParamError::new("mode", s))
    }
}

string_conversions!(Mode);

// ── Text encoding ───────────────────────────────────────────────────────────

/// Encoding of the text bytes in a synthesis frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub enum TextType {
    /// GB2312 (simplified Chinese), power-on default.
    #[default]
    Gb2312,
    /// GBK.
    Gbk,
    /// BIG5 (traditional Chinese).
    Big5,
    /// UTF-16, big-endian.
    Unicode,
}

impl TextType {
    /// All encodings.
    pub const ALL: [Self; 4] = [Self::Gb2312, Self::Gbk, Self::Big5, Self::Unicode];

    /// Low bits of the synthesis param byte.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Gb2312 => 0x00,
            Self::Gbk => 0x01,
            Self::Big5 => 0x02,
            Self::Unicode => 0x03,
        }
    }

    /// Encoding for a param byte's low bits.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Gb2312),
            0x01 => Some(Self::Gbk),
            0x02 => Some(Self::Big5),
            0x03 => Some(Self::Unicode),
            _ => None,
        }
    }

    /// Name used in configs and on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gb2312 => "gb2312",
            Self::Gbk => "gbk",
            Self::Big5 => "big5",
            Self::Unicode => "unicode",
        }
    }
}

impl fmt::Display for TextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextType {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.name() == lower)
            .or(match lower.as_str() {
                "utf16" | "utf-16" | "utf-16be" => Some(Self::Unicode),
                _ => None,
            })
            .ok_or_else(|| ParseParamError::new("text type", s))
    }
}

string_conversions!(TextType);

// ── Status ──────────────────────────────────────────────────────────────────

/// Playback status reported by the status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Nothing playing; ready for a new synthesis frame.
    Idle,
    /// Synthesis or a tone is playing.
    Busy,
}

impl Status {
    /// Status for the second byte of a status answer.
    #[must_use]
    pub const fn from_response(byte: u8) -> Option<Self> {
        match byte {
            crate::command::response::IDLE => Some(Self::Idle),
            crate::command::response::BUSY => Some(Self::Busy),
            _ => None,
        }
    }

    /// Byte the chip uses to report this status.
    #[must_use]
    pub const fn response_byte(self) -> u8 {
        match self {
            Self::Idle => crate::command::response::IDLE,
            Self::Busy => crate::command::response::BUSY,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Busy => f.write_str("busy"),
        }
    }
}

// ── Built-in tones ──────────────────────────────────────────────────────────

/// Letter-indexed built-in tone. Variants must be declared `A` upward.
macro_rules! tone_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, [$($variant:ident),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
        #[repr(u8)]
        pub enum $name {
            $(
                #[doc = concat!($kind, " ", stringify!($variant), ".")]
                $variant,
            )+
        }

        impl $name {
            /// Every tone, in letter order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Uppercase letter naming this tone.
            #[must_use]
            pub const fn letter(self) -> char {
                (b'A' + self as u8) as char
            }

            /// Lowercase wire byte appended to the tone prefix.
            #[must_use]
            pub const fn code(self) -> u8 {
                b'a' + self as u8
            }

            /// Tone for a letter, either case.
            #[must_use]
            pub fn from_letter(letter: char) -> Option<Self> {
                if !letter.is_ascii_alphabetic() {
                    return None;
                }
                let index = letter.to_ascii_uppercase() as u8 - b'A';
                Self::ALL.get(usize::from(index)).copied()
            }

            /// Tone for a lowercase wire byte.
            #[must_use]
            pub fn from_code(code: u8) -> Option<Self> {
                code.checked_sub(b'a')
                    .and_then(|index| Self::ALL.get(usize::from(index)).copied())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.letter())
            }
        }

        impl FromStr for $name {
            type Err = ParseParamError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut chars = s.trim().chars();
                match (chars.next(), chars.next()) {
                    (Some(letter), None) => Self::from_letter(letter),
                    _ => None,
                }
                .ok_or_else(|| ParseParamError::new($kind, s))
            }
        }

        string_conversions!($name);
    };
}

tone_enum!(
    /// Prompt sound, `A` through `Y`.
    Sound,
    "sound",
    [A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y]
);

tone_enum!(
    /// Message tone, `A` through `H`.
    Message,
    "message",
    [A, B, C, D, E, F, G, H]
);

tone_enum!(
    /// Ring tone, `A` through `O`.
    Ring,
    "ring",
    [A, B, C, D, E, F, G, H, I, J, K, L, M, N, O]
);
