//! `syn6288`: command-line interface for SYN6288 speech modules.
//!
//! ```text
//! USAGE:
//!   syn6288 info                        Static chip information
//!   syn6288 test reg|syn                Run a self test
//!   syn6288 syn <text>                  Speak text and wait for the end
//!   syn6288 sound|message|ring <X>      Play a built-in tone
//!   syn6288 status                      Busy or idle
//!   syn6288 stop|pause|resume           Playback control
//!   syn6288 power-down                  Enter power-down mode
//!   syn6288 set baud|volume|background|speed <value>
//!   syn6288 command <raw>               Send an inline command such as [b1]
//!
//! OPTIONS:
//!   --port <tty>  --config <toml>  --transport auto|serial|virtual
//!   --mode <mode>  --text-type <type>
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use syn6288_chip::{BaudRate, Message, Mode, Ring, Sound, TextType};
use syn6288_driver::{
    select_transport, selftest, DriverConfig, Speaker, StdDelay, Syn6288, TransportSelection, Uart,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "syn6288", about = "YuToneWorld SYN6288 speech module CLI", version)]
struct Cli {
    /// Serial port the module is wired to (overrides the config file).
    #[arg(long, global = true)]
    port: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Link to use; `auto` falls back to the virtual chip when the port is missing.
    #[arg(long, value_enum, default_value_t = Transport::Auto, global = true)]
    transport: Transport,

    /// Background mode: `common` or `background-1` .. `background-15`.
    #[arg(long, global = true)]
    mode: Option<Mode>,

    /// Text encoding: gb2312, gbk, big5 or unicode.
    #[arg(long, global = true)]
    text_type: Option<TextType>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Clone, Copy, ValueEnum)]
enum Transport {
    Auto,
    Serial,
    Virtual,
}

impl From<Transport> for TransportSelection {
    fn from(t: Transport) -> Self {
        match t {
            Transport::Auto => Self::Auto,
            Transport::Serial => Self::Serial,
            Transport::Virtual => Self::Virtual,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Suite {
    /// Set every parameter and read it back.
    Reg,
    /// Play samples in every encoding plus tones and playback controls.
    Syn,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print static chip information.
    Info,
    /// Run a self test.
    Test {
        #[arg(value_enum)]
        suite: Suite,
    },
    /// Speak text.
    Syn {
        /// Text to speak.
        text: String,
        /// Return as soon as the chip accepted the text.
        #[arg(long)]
        no_wait: bool,
    },
    /// Play a prompt sound (A..Y).
    Sound { sound: Sound },
    /// Play a message tone (A..H).
    Message { message: Message },
    /// Play a ring tone (A..O).
    Ring { ring: Ring },
    /// Query busy/idle status.
    Status,
    /// Stop playback.
    Stop,
    /// Pause playback.
    Pause,
    /// Resume playback.
    Resume,
    /// Enter power-down mode.
    PowerDown,
    /// Change a chip setting.
    Set {
        #[command(subcommand)]
        setting: Setting,
    },
    /// Send a raw inline command, e.g. `[b1]`.
    Command { command: String },
}

#[derive(Subcommand)]
enum Setting {
    /// Link rate: 9600, 19200 or 38400.
    Baud { rate: BaudRate },
    /// Synthesis volume, 0..=16.
    Volume { volume: u8 },
    /// Background music volume, 0..=16.
    Background { volume: u8 },
    /// Speech speed, 0..=5.
    Speed { speed: u8 },
}

type Chip = Syn6288<Box<dyn Uart>, StdDelay>;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let selection = TransportSelection::from(cli.transport);

    match cli.command {
        Cmd::Info => cmd_info(),
        Cmd::Test { suite } => cmd_test(selection, &config, suite)?,
        Cmd::Syn { text, no_wait } => cmd_syn(selection, config, &text, no_wait, cli.text_type)?,
        Cmd::Sound { sound } => play(selection, &config, |s| s.sound(sound))?,
        Cmd::Message { message } => play(selection, &config, |s| s.message(message))?,
        Cmd::Ring { ring } => play(selection, &config, |s| s.ring(ring))?,
        Cmd::Status => with_chip(selection, &config, |chip| {
            println!("{}", chip.status()?);
            Ok(())
        })?,
        Cmd::Stop => with_chip(selection, &config, |chip| Ok(chip.stop()?))?,
        Cmd::Pause => with_chip(selection, &config, |chip| Ok(chip.pause()?))?,
        Cmd::Resume => with_chip(selection, &config, |chip| Ok(chip.resume()?))?,
        Cmd::PowerDown => with_chip(selection, &config, |chip| Ok(chip.power_down()?))?,
        Cmd::Set { setting } => cmd_set(selection, &config, &setting)?,
        Cmd::Command { command } => {
            with_chip(selection, &config, |chip| Ok(chip.set_command(&command)?))?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<DriverConfig> {
    let mut config = match &cli.config {
        Some(path) => DriverConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DriverConfig::default(),
    };

    if let Some(port) = &cli.port {
        config.port.clone_from(port);
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(text_type) = cli.text_type {
        config.text_type = text_type;
    }
    Ok(config)
}

/// Open a bare handle, run `f`, and close it again
fn with_chip(
    selection: TransportSelection,
    config: &DriverConfig,
    f: impl FnOnce(&mut Chip) -> Result<()>,
) -> Result<()> {
    let uart = select_transport(selection, config)?;
    let mut chip = Syn6288::new(uart, StdDelay).with_link_rate(config.link_baud_rate);
    chip.init()
        .with_context(|| format!("opening {}", config.port.display()))?;
    chip.set_mode(config.mode)?;
    chip.set_text_type(config.text_type)?;

    let result = f(&mut chip);
    if let Err(e) = chip.deinit() {
        tracing::warn!("closing link: {e}");
    }
    result
}

/// Open a speaker, start one playback, and wait for it to finish
fn play(
    selection: TransportSelection,
    config: &DriverConfig,
    f: impl FnOnce(&mut Speaker<Box<dyn Uart>, StdDelay>) -> syn6288_driver::Result<()>,
) -> Result<()> {
    let uart = select_transport(selection, config)?;
    let mut speaker = Speaker::open(uart, StdDelay, config)
        .with_context(|| format!("opening {}", config.port.display()))?;
    f(&mut speaker)?;
    speaker.sync()?;
    speaker.close()?;
    Ok(())
}

fn cmd_info() {
    let info = syn6288_chip::ChipInfo::SYN6288;
    let (major, minor) = info.driver_version_parts();

    println!("Chip         : {}", info.chip_name);
    println!("Manufacturer : {}", info.manufacturer_name);
    println!("Interface    : {}", info.interface);
    println!(
        "Supply       : {:.1} V .. {:.1} V",
        info.supply_voltage_min_v, info.supply_voltage_max_v
    );
    println!("Max current  : {:.0} mA", info.max_current_ma);
    println!(
        "Temperature  : {:.0} °C .. {:.0} °C",
        info.temperature_min_c, info.temperature_max_c
    );
    println!("Driver       : {major}.{minor}");
}

fn cmd_test(selection: TransportSelection, config: &DriverConfig, suite: Suite) -> Result<()> {
    with_chip(selection, config, |chip| {
        match suite {
            Suite::Reg => {
                println!("syn6288: start register test.");
                selftest::register_test(chip)?;
                println!("syn6288: finish register test.");
            }
            Suite::Syn => {
                println!("syn6288: start synthesis test.");
                selftest::synthesis_test(chip)?;
                println!("syn6288: finish synthesis test.");
            }
        }
        Ok(())
    })
}

fn cmd_syn(
    selection: TransportSelection,
    mut config: DriverConfig,
    text: &str,
    no_wait: bool,
    text_type: Option<TextType>,
) -> Result<()> {
    // GB and BIG5 text cannot be produced from a UTF-8 argument
    if text_type.is_none() && !text.is_ascii() && config.text_type != TextType::Unicode {
        tracing::info!("non-ASCII text, switching to unicode");
        config.text_type = TextType::Unicode;
    }

    if no_wait {
        return with_chip(selection, &config, |chip| Ok(chip.synthesis_str(text)?));
    }
    play(selection, &config, |s| s.speak(text))
}

fn cmd_set(selection: TransportSelection, config: &DriverConfig, setting: &Setting) -> Result<()> {
    with_chip(selection, config, |chip| {
        match *setting {
            Setting::Baud { rate } => {
                chip.set_baud_rate(rate)?;
                println!("Chip now at {rate}; set link_baud_rate = \"{}\" to reconnect.", rate.bps());
            }
            Setting::Volume { volume } => chip.set_synthesis_volume(volume)?,
            Setting::Background { volume } => chip.set_background_volume(volume)?,
            Setting::Speed { speed } => chip.set_synthesis_speed(speed)?,
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "syn6288", "syn", "hello", "--port", "/dev/ttyUSB1", "--mode", "background-2",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.port, PathBuf::from("/dev/ttyUSB1"));
        assert_eq!(config.mode, Mode::Background2);
    }

    #[test]
    fn parses_tones_and_settings() {
        let cli = Cli::try_parse_from(["syn6288", "ring", "e"]).unwrap();
        assert!(matches!(cli.command, Cmd::Ring { ring: Ring::E }));

        let cli = Cli::try_parse_from(["syn6288", "set", "baud", "19200"]).unwrap();
        assert!(matches!(
            cli.command,
            Cmd::Set { setting: Setting::Baud { rate: BaudRate::Bps19200 } }
        ));

        assert!(Cli::try_parse_from(["syn6288", "message", "z"]).is_err());
    }

    #[test]
    fn virtual_runs_end_to_end() {
        let config = DriverConfig::default();
        with_chip(TransportSelection::Virtual, &config, |chip| {
            selftest::register_test(chip)?;
            Ok(())
        })
        .unwrap();
        cmd_set(
            TransportSelection::Virtual,
            &config,
            &Setting::Speed { speed: 2 },
        )
        .unwrap();
        assert!(cmd_set(
            TransportSelection::Virtual,
            &config,
            &Setting::Volume { volume: 20 },
        )
        .is_err());
    }
}
