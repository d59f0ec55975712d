//! Core MIDI types for polybend.
//!
//! Channel identifiers, note identity, raw wire messages, pitch resolution,
//! clocks and the piano key layout. No I/O lives here; see `polybend-midi-io`.
//!
//! # Example
//!
//! ```
//! use polybend_midi::{ChannelId, EqualTemperament, MidiOutputMessage, PitchResolver};
//!
//! let pitch = EqualTemperament::default().resolve(550.0);
//! assert_eq!(pitch.midi_note(), Some(73));
//!
//! let channel = ChannelId::new(2).unwrap();
//! let bend = MidiOutputMessage::pitch_bend_normalized(channel, pitch.cents / 200.0);
//! assert_eq!(bend.bytes[0], 0xE1);
//! ```

pub mod error;
pub use error::{Error, Result};

pub(crate) mod channel;
pub use channel::{note_identity, ChannelId, ChannelSet};

pub(crate) mod event;
pub use event::{NoteEventKind, NoteNotification, DEFAULT_VELOCITY};

pub(crate) mod message;
pub use message::{bend_to_14bit, MidiOutputMessage, PITCH_BEND_CENTER};

pub(crate) mod pitch;
pub use pitch::{
    gain_to_velocity, hz_to_note, note_to_hz, velocity_to_gain, EqualTemperament, PitchResolver,
    ResolvedPitch,
};

pub(crate) mod time;
pub use time::{Clock, ManualClock, NoteTime, SystemClock};

pub mod keys;
pub use keys::{is_white_key, key_position, KeyPosition};
