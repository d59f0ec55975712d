//! # polybend
//!
//! Free-pitch polyphony over MIDI. Every note is played on its own
//! pitch-bend channel (or shares one whose bend already matches), so any
//! frequency can sound against any other on an ordinary multitimbral synth.
//!
//! ```
//! use polybend::prelude::*;
//!
//! let port = RecordingPort::new();
//! let mut output = MicrotonalOutput::builder()
//!     .port(port.clone())
//!     .channels([1, 2, 3])
//!     .build()?;
//!
//! // A 4:5:6 triad on A3
//! output.play_notes(&[
//!     NoteRequest::new(220.0, 500.0),
//!     NoteRequest::new(275.0, 500.0),
//!     NoteRequest::new(330.0, 500.0),
//! ])?;
//! assert!(!port.is_empty());
//! # Ok::<(), polybend::Error>(())
//! ```
//!
//! ## Crates
//!
//! - [`midi`]: channels, wire messages, pitch resolution, clocks, key layout
//! - [`io`]: voice allocation, the output session, scheduling, input tracking
//!   and (with `midi-hardware`) midir devices

pub use polybend_midi as midi;
pub use polybend_midi_io as io;

pub mod error;
pub use error::{Error, Result};

pub use polybend_midi::{
    ChannelId, ChannelSet, Clock, EqualTemperament, ManualClock, MidiOutputMessage,
    NoteNotification, NoteTime, PitchResolver, ResolvedPitch, SystemClock,
};

pub use polybend_midi_io::{
    InputPort, LogBuffer, LogSink, MicrotonalOutput, MicrotonalOutputBuilder, NoteInputTracker,
    NoteListener, NoteOffHandle, NoteRequest, NoteSink, OutputConfig, OutputPort, RecordingPort,
    RetuningSink, Schedule, SharedOutput, VirtualInputPort, VoiceAllocator,
};

#[cfg(feature = "midi-hardware")]
pub use polybend_midi_io::{MidiInputManager, MidiOutputManager};

/// Convenient imports: `use polybend::prelude::*;`
pub mod prelude {
    pub use crate::{Error, Result};

    pub use crate::{
        ChannelId, ChannelSet, Clock, EqualTemperament, ManualClock, NoteTime, PitchResolver,
        SystemClock,
    };

    pub use crate::{
        InputPort, MicrotonalOutput, NoteInputTracker, NoteOffHandle, NoteRequest, NoteSink,
        OutputConfig, OutputPort, RecordingPort, RetuningSink, VirtualInputPort,
    };

    #[cfg(feature = "midi-hardware")]
    pub use crate::{MidiInputManager, MidiOutputManager};
}
