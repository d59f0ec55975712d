//! Microtonal output over a bank of pitch-bend channels.
//!
//! ## Quick Start
//!
//! ```
//! use polybend_midi_io::{MicrotonalOutput, NoteTime, RecordingPort};
//!
//! let port = RecordingPort::new();
//! let mut output = MicrotonalOutput::builder()
//!     .port(port.clone())
//!     .channels([1, 2])
//!     .build()?;
//!
//! let mut handle = output.note_on(550.0, Some(100), NoteTime::At(0.0))?;
//! assert_eq!(handle.channel().map(|c| c.get()), Some(1));
//! output.note_off(&mut handle, None, NoteTime::At(500.0))?;
//! # Ok::<(), polybend_midi_io::Error>(())
//! ```

mod builder;
mod config;
mod recording;
mod session;

pub use builder::MicrotonalOutputBuilder;
pub use config::{OutputConfig, DEFAULT_BEND_RANGE};
pub use recording::{PortCall, RecordingPort};
pub use session::{MicrotonalOutput, NoteOffHandle, SharedOutput};

use polybend_midi::ChannelId;

use crate::error::Result;

/// Per-channel sink for the messages a microtonal output produces.
///
/// Times are milliseconds on the output's clock. Implementations may send
/// immediately or hold messages until they are due.
pub trait OutputPort: Send {
    /// Sets the pitch-bend range (RPN 0) of one channel.
    fn send_pitch_bend_range(&mut self, channel: ChannelId, semitones: u8, cents: u8)
        -> Result<()>;

    /// `normalized` is in -1.0..=1.0 of the configured bend range.
    fn send_pitch_bend(&mut self, channel: ChannelId, normalized: f64, time: f64) -> Result<()>;

    fn send_note_on(&mut self, channel: ChannelId, note: u8, velocity: u8, time: f64)
        -> Result<()>;

    fn send_note_off(
        &mut self,
        channel: ChannelId,
        note: u8,
        velocity: u8,
        time: f64,
    ) -> Result<()>;

    fn send_all_notes_off(&mut self, channel: ChannelId) -> Result<()>;

    /// Drops anything queued but not yet sent.
    fn clear(&mut self);
}
