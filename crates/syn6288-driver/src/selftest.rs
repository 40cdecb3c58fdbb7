//! On-device self tests
//!
//! Both tests take an initialized handle, leave it initialized, and return
//! the first failed check as `SelfTestFailed` (or the link error that
//! stopped them). They run unchanged against real hardware and against the
//! virtual chip.

use syn6288_chip::command::SYNC_POLL_MS;
use syn6288_chip::{BaudRate, Message, Mode, Ring, Sound, Status, TextType};

use crate::device::Syn6288;
use crate::error::{Result, Syn6288Error};
use crate::transport::{Delay, Uart};

/// "语音天下" in GB2312
pub const SAMPLE_GB2312: &[u8] = &[0xD3, 0xEE, 0xD2, 0xF4, 0xCC, 0xEC, 0xCF, 0xC2];

/// "语音天下" in GBK
pub const SAMPLE_GBK: &[u8] = &[0xD3, 0xEE, 0xD2, 0xF4, 0xCC, 0xEC, 0xCF, 0xC2];

/// "語音天下" in BIG5
pub const SAMPLE_BIG5: &[u8] = &[0xA6, 0x74, 0xAD, 0xB5, 0xA4, 0xD1, 0xA4, 0x55];

/// "语音天下" in UTF-16BE
pub const SAMPLE_UNICODE: &[u8] = &[0x8B, 0xED, 0x97, 0xF3, 0x59, 0x29, 0x4E, 0x0B];

/// Digits read by the number-reading commands
const SAMPLE_DIGITS: &str = "110,120,130";

/// Upper bound on status polls while waiting for one sample to finish
const MAX_WAIT_POLLS: u32 = 240;

/// Pause held during the pause/resume check
const PAUSE_HOLD_MS: u32 = 5_000;

fn check<T: PartialEq + std::fmt::Debug>(name: &str, got: T, want: T) -> Result<()> {
    if got == want {
        tracing::info!("check {name} ok");
        Ok(())
    } else {
        tracing::error!("check {name} error: got {got:?}, want {want:?}");
        Err(Syn6288Error::self_test_failed(format!(
            "{name}: got {got:?}, want {want:?}"
        )))
    }
}

/// Poll status until idle
fn wait_idle<U: Uart, D: Delay>(chip: &mut Syn6288<U, D>) -> Result<()> {
    for _ in 0..MAX_WAIT_POLLS {
        chip.wait(SYNC_POLL_MS);
        if chip.status()? == Status::Idle {
            return Ok(());
        }
    }
    Err(Syn6288Error::Timeout {
        polls: MAX_WAIT_POLLS,
    })
}

/// Exercise every setter and read the cached value back
///
/// # Errors
///
/// Returns `SelfTestFailed` naming the first mismatch, or a link error.
pub fn register_test<U: Uart, D: Delay>(chip: &mut Syn6288<U, D>) -> Result<()> {
    tracing::info!("register test: {}", Syn6288::<U, D>::info().chip_name);

    chip.set_baud_rate(BaudRate::Bps9600)?;
    check("baud rate", chip.baud_rate()?, BaudRate::Bps9600)?;

    chip.set_mode(Mode::Background15)?;
    check("mode", chip.mode()?, Mode::Background15)?;

    for text_type in TextType::ALL {
        chip.set_text_type(text_type)?;
        check("text type", chip.text_type()?, text_type)?;
    }

    chip.set_synthesis_volume(6)?;
    check("synthesis volume", chip.synthesis_volume()?, 6)?;

    chip.set_background_volume(8)?;
    check("background volume", chip.background_volume()?, 8)?;

    chip.set_synthesis_speed(3)?;
    check("synthesis speed", chip.synthesis_speed()?, 3)?;

    chip.set_command("[y1]")?;
    tracing::info!("check command ok");

    tracing::info!("register test finished");
    Ok(())
}

/// Play samples in every encoding, the tones, and each playback control
///
/// # Errors
///
/// Returns the first link or response error.
pub fn synthesis_test<U: Uart, D: Delay>(chip: &mut Syn6288<U, D>) -> Result<()> {
    tracing::info!("synthesis test: {}", Syn6288::<U, D>::info().chip_name);

    chip.set_baud_rate(BaudRate::Bps9600)?;
    chip.set_mode(Mode::Common)?;
    chip.set_synthesis_volume(16)?;
    chip.set_background_volume(0)?;
    chip.set_synthesis_speed(5)?;

    let samples = [
        (TextType::Gb2312, SAMPLE_GB2312),
        (TextType::Gbk, SAMPLE_GBK),
        (TextType::Big5, SAMPLE_BIG5),
        (TextType::Unicode, SAMPLE_UNICODE),
    ];
    for (text_type, text) in samples {
        tracing::info!("{text_type} synthesis");
        chip.set_text_type(text_type)?;
        chip.synthesis_text(text)?;
        wait_idle(chip)?;
    }
    chip.set_text_type(TextType::Gb2312)?;

    tracing::info!("sound, message and ring");
    chip.synthesis_sound(Sound::A)?;
    wait_idle(chip)?;
    chip.synthesis_message(Message::A)?;
    wait_idle(chip)?;
    chip.synthesis_ring(Ring::E)?;
    wait_idle(chip)?;

    tracing::info!("pause and resume");
    chip.synthesis_text(SAMPLE_GB2312)?;
    chip.wait(SYNC_POLL_MS);
    chip.pause()?;
    chip.wait(PAUSE_HOLD_MS);
    chip.resume()?;
    wait_idle(chip)?;

    tracing::info!("stop");
    chip.synthesis_text(SAMPLE_GB2312)?;
    chip.wait(SYNC_POLL_MS);
    chip.stop()?;
    check("status after stop", chip.status()?, Status::Idle)?;

    tracing::info!("synthesis volume");
    chip.set_synthesis_volume(5)?;
    chip.synthesis_text(SAMPLE_GB2312)?;
    wait_idle(chip)?;
    chip.set_synthesis_volume(16)?;

    tracing::info!("synthesis speed");
    chip.set_synthesis_speed(0)?;
    chip.synthesis_text(SAMPLE_GB2312)?;
    wait_idle(chip)?;
    chip.set_synthesis_speed(5)?;

    tracing::info!("background mode");
    chip.set_background_volume(15)?;
    chip.set_mode(Mode::Background1)?;
    chip.synthesis_text(SAMPLE_GB2312)?;
    wait_idle(chip)?;
    chip.set_mode(Mode::Common)?;

    tracing::info!("number reading commands");
    for command in ["[b0]", "[b1]"] {
        chip.set_command(command)?;
        chip.synthesis_str(SAMPLE_DIGITS)?;
        wait_idle(chip)?;
    }

    tracing::info!("synthesis test finished");
    Ok(())
}
