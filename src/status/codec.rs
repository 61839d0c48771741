//! Wire format of the status channel.
//!
//! A message is the decimal ASCII digits of a mode code with no terminator
//! and no length prefix. The reader treats the bytes of one read as one
//! message, which holds on the trusted LAN the channel runs on where every
//! write is a handful of bytes.

use thiserror::Error;

use crate::mode::Mode;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid int argument: {0:?}")]
    NotAnInteger(String),

    #[error("Unknown mode code {0}")]
    UnknownCode(i64),
}

pub fn encode(mode: Mode) -> Vec<u8> {
    mode.code().to_string().into_bytes()
}

/// Parse one read's bytes into the integer it carries
pub fn decode_code(bytes: &[u8]) -> Result<i64, DecodeError> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();

    trimmed
        .parse::<i64>()
        .map_err(|_| DecodeError::NotAnInteger(trimmed.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<Mode, DecodeError> {
    let code = decode_code(bytes)?;
    Mode::try_from(code).map_err(DecodeError::UnknownCode)
}

/// The text sent back to the peer for a message that was not understood
pub fn diagnostic(text: &str) -> Vec<u8> {
    format!("{}\n", text).into_bytes()
}
