//! Microtonal MIDI I/O for polybend.
//!
//! Plays arbitrary frequencies on a fixed bank of MIDI channels by giving
//! each sounding pitch its own pitch bend, schedules batches of timed notes,
//! and tracks inbound notes so each note-off reaches the right handle.
//!
//! Feature gates: `midi-io` (hardware I/O via midir, on by default).

pub mod error;
pub use error::{Error, Result};

pub mod log;
pub use log::{LogBuffer, LogSink};

pub mod voice;
pub use voice::{Allocation, Voice, VoiceAllocator, VoiceId, CENTS_EPSILON, EXPIRED_AGE};

pub mod output;
pub use output::{
    MicrotonalOutput, MicrotonalOutputBuilder, NoteOffHandle, OutputConfig, OutputPort, PortCall,
    RecordingPort, SharedOutput, DEFAULT_BEND_RANGE,
};

pub mod scheduler;
pub use scheduler::{NoteRequest, Schedule, ScheduledEvent, ScheduledKind};

pub mod input;
pub use input::{
    InputPort, ListenerRegistry, NoteInputTracker, NoteListener, NoteSink, RetuningSink,
    VirtualInputPort,
};

#[cfg(feature = "midi-io")]
pub(crate) mod io;

#[cfg(feature = "midi-io")]
pub use io::{MidiInputDevice, MidiInputManager, MidiOutputDevice, MidiOutputManager};

pub use polybend_midi::{
    ChannelId, ChannelSet, Clock, EqualTemperament, ManualClock, MidiOutputMessage, NoteNotification,
    NoteTime, PitchResolver, ResolvedPitch, SystemClock, DEFAULT_VELOCITY,
};
