//! SYN6288 UART command set.
//!
//! Every host command is wrapped in a [`Frame`](crate::frame::Frame). The
//! chip answers each frame with one byte from [`response`]; the status query
//! is answered with two (acknowledge, then busy/idle).
//!
//! ```text
//! 0x01  synthesize      param = mode bits | text type (0x00 for tones / inline commands)
//! 0x02  stop            no param
//! 0x03  pause           no param
//! 0x04  resume          no param
//! 0x21  query status    no param, answer is two bytes
//! 0x31  set baud rate   param = baud code
//! 0x88  power down      no param
//! ```

// ── Framing ─────────────────────────────────────────────────────────────────

/// First byte of every host frame.
pub const FRAME_HEADER: u8 = 0xFD;

/// Header plus the two length bytes.
pub const FRAME_PREFIX_LEN: usize = 3;

/// Size of the driver-side frame buffer.
pub const FRAME_BUFFER_LEN: usize = 256;

/// Longest text or inline command accepted in one synthesis frame.
pub const MAX_TEXT_LEN: usize = 200;

// ── Opcodes ─────────────────────────────────────────────────────────────────

/// Command opcodes.
pub mod opcode {
    /// Synthesize text (also used for tones and inline commands).
    pub const SYNTHESIS: u8 = 0x01;
    /// Stop the current synthesis.
    pub const STOP: u8 = 0x02;
    /// Pause the current synthesis.
    pub const PAUSE: u8 = 0x03;
    /// Resume a paused synthesis.
    pub const RESUME: u8 = 0x04;
    /// Query busy/idle status.
    pub const QUERY_STATUS: u8 = 0x21;
    /// Change the UART baud rate.
    pub const SET_BAUD_RATE: u8 = 0x31;
    /// Enter power-down mode.
    pub const POWER_DOWN: u8 = 0x88;
}

/// Human-readable name of an opcode, used in logs and errors.
#[must_use]
pub const fn opcode_name(op: u8) -> &'static str {
    match op {
        opcode::SYNTHESIS => "synthesis",
        opcode::STOP => "stop",
        opcode::PAUSE => "pause",
        opcode::RESUME => "resume",
        opcode::QUERY_STATUS => "query status",
        opcode::SET_BAUD_RATE => "set baud rate",
        opcode::POWER_DOWN => "power down",
        _ => "unknown",
    }
}

// ── Chip → host bytes ───────────────────────────────────────────────────────

/// Bytes the chip sends back.
pub mod response {
    /// Frame received and accepted (`'A'`).
    pub const ACK: u8 = 0x41;
    /// Frame rejected: bad header, length or checksum (`'E'`).
    pub const FRAME_ERROR: u8 = 0x45;
    /// Chip is playing (`'N'`), second byte of a status answer.
    pub const BUSY: u8 = 0x4E;
    /// Chip is idle (`'O'`), second byte of a status answer.
    pub const IDLE: u8 = 0x4F;
}

// ── Timing ──────────────────────────────────────────────────────────────────

/// Wait between writing a frame and reading the answer.
pub const RESPONSE_DELAY_MS: u32 = 100;

/// Extra attempts for a status query that returned garbage.
pub const STATUS_RETRIES: u8 = 3;

/// Gap between configuration commands sent back to back.
pub const CONFIG_GAP_MS: u32 = 100;

/// Status poll interval while waiting for playback to finish.
pub const SYNC_POLL_MS: u32 = 500;

// ── Inline text commands ────────────────────────────────────────────────────

/// Inline control sequences, sent as synthesis payloads with param 0x00.
pub mod inline {
    /// Synthesis volume prefix: `v[N]`.
    pub const SYNTHESIS_VOLUME: char = 'v';
    /// Background music volume prefix: `m[N]`.
    pub const BACKGROUND_VOLUME: char = 'm';
    /// Speech speed prefix: `t[N]`.
    pub const SYNTHESIS_SPEED: char = 't';

    /// Format an inline command such as `v[10]`.
    #[must_use]
    pub fn format(prefix: char, value: u8) -> String {
        format!("{prefix}[{value}]")
    }

    /// Parse an inline command back into `(prefix, value)`.
    #[must_use]
    pub fn parse(text: &str) -> Option<(char, u8)> {
        let mut chars = text.chars();
        let prefix = chars.next()?;
        let rest = chars.as_str().strip_prefix('[')?.strip_suffix(']')?;
        rest.parse().ok().map(|v| (prefix, v))
    }
}

/// Tone payload prefixes. The tone letter follows in lowercase.
pub mod tone {
    /// Prompt sound: `soundA`..`soundY`.
    pub const SOUND: &str = "sound";
    /// Message tone: `msgA`..`msgH`.
    pub const MESSAGE: &str = "msg";
    /// Ring tone: `ringA`..`ringO`.
    pub const RING: &str = "ring";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_bytes_are_ascii_letters() {
        assert_eq!(response::ACK, b'A');
        assert_eq!(response::FRAME_ERROR, b'E');
        assert_eq!(response::BUSY, b'N');
        assert_eq!(response::IDLE, b'O');
    }

    #[test]
    fn inline_round_trip() {
        let cmd = inline::format(inline::SYNTHESIS_VOLUME, 16);
        assert_eq!(cmd, "v[16]");
        assert_eq!(inline::parse(&cmd), Some(('v', 16)));
        assert_eq!(inline::parse("v[16"), None);
        assert_eq!(inline::parse("t[x]"), None);
    }

    #[test]
    fn opcode_names_are_distinct() {
        let ops = [
            opcode::SYNTHESIS,
            opcode::STOP,
            opcode::PAUSE,
            opcode::RESUME,
            opcode::QUERY_STATUS,
            opcode::SET_BAUD_RATE,
            opcode::POWER_DOWN,
        ];
        let mut names: Vec<_> = ops.iter().map(|&op| opcode_name(op)).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ops.len());
        assert_eq!(opcode_name(0x77), "unknown");
    }
}
