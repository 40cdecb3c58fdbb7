//! Silicon model for the YuToneWorld SYN6288 text-to-speech chip.
//!
//! This crate has **no hardware access**; its only required dependency is
//! `thiserror` for the error types. It is a pure model of the chip: command opcodes, response bytes, the frame
//! format, the synthesis parameters and the chip's ratings.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`command`] | Opcodes, response bytes, timing constants, inline commands |
//! | [`frame`] | `0xFD` frame encoder / decoder with XOR checksum |
//! | [`params`] | Baud rate, play mode, text type, tones, status |
//! | [`info`] | Chip name, supply and temperature ratings, driver version |
//!
//! Enable the `serde` feature to (de)serialize the parameter enums by name.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod command;
pub mod frame;
pub mod info;
pub mod params;

pub use frame::{Frame, FrameError};
pub use info::ChipInfo;
pub use params::{BaudRate, Message, Mode, ParseParamError, Ring, Sound, Status, TextType};
