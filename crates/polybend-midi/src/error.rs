//! Error types for the core MIDI types.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid MIDI channel {0} (expected 1-16)")]
    InvalidChannel(u8),

    #[error("Invalid note time: {0:?}")]
    InvalidTime(String),

    #[error("MIDI parse error: {0}")]
    MidiParse(String),
}

impl From<midi_msg::ParseError> for Error {
    fn from(e: midi_msg::ParseError) -> Self {
        Error::MidiParse(format!("{:?}", e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
