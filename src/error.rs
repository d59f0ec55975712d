//! Error type for the polybend umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] polybend_midi::Error),

    #[error("MIDI: {0}")]
    Midi(#[from] polybend_midi_io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
