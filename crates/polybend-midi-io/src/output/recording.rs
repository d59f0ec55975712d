//! In-memory output port.

use std::sync::Arc;

use parking_lot::Mutex;
use polybend_midi::{ChannelId, MidiOutputMessage};

use super::OutputPort;
use crate::error::Result;

/// One call made on an [`OutputPort`].
#[derive(Debug, Clone, PartialEq)]
pub enum PortCall {
    PitchBendRange {
        channel: ChannelId,
        semitones: u8,
        cents: u8,
    },
    PitchBend {
        channel: ChannelId,
        normalized: f64,
        time: f64,
    },
    NoteOn {
        channel: ChannelId,
        note: u8,
        velocity: u8,
        time: f64,
    },
    NoteOff {
        channel: ChannelId,
        note: u8,
        velocity: u8,
        time: f64,
    },
    AllNotesOff {
        channel: ChannelId,
    },
    Clear,
}

impl PortCall {
    pub fn channel(&self) -> Option<ChannelId> {
        match self {
            PortCall::PitchBendRange { channel, .. }
            | PortCall::PitchBend { channel, .. }
            | PortCall::NoteOn { channel, .. }
            | PortCall::NoteOff { channel, .. }
            | PortCall::AllNotesOff { channel } => Some(*channel),
            PortCall::Clear => None,
        }
    }

    pub fn time(&self) -> Option<f64> {
        match self {
            PortCall::PitchBend { time, .. }
            | PortCall::NoteOn { time, .. }
            | PortCall::NoteOff { time, .. } => Some(*time),
            _ => None,
        }
    }

    /// Wire encoding of the call. `Clear` has none.
    pub fn to_messages(&self) -> Vec<MidiOutputMessage> {
        match *self {
            PortCall::PitchBendRange {
                channel,
                semitones,
                cents,
            } => MidiOutputMessage::pitch_bend_range(channel, semitones, cents),
            PortCall::PitchBend {
                channel,
                normalized,
                ..
            } => vec![MidiOutputMessage::pitch_bend_normalized(channel, normalized)],
            PortCall::NoteOn {
                channel,
                note,
                velocity,
                ..
            } => vec![MidiOutputMessage::note_on(channel, note, velocity)],
            PortCall::NoteOff {
                channel,
                note,
                velocity,
                ..
            } => vec![MidiOutputMessage::note_off(channel, note, velocity)],
            PortCall::AllNotesOff { channel } => vec![MidiOutputMessage::all_notes_off(channel)],
            PortCall::Clear => Vec::new(),
        }
    }
}

/// Records every call. Clones share the same log, so a clone handed to an
/// output can be inspected from the test that built it.
#[derive(Debug, Clone, Default)]
pub struct RecordingPort {
    calls: Arc<Mutex<Vec<PortCall>>>,
}

impl RecordingPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PortCall> {
        self.calls.lock().clone()
    }

    pub fn take(&self) -> Vec<PortCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Everything recorded so far, as wire messages.
    pub fn messages(&self) -> Vec<MidiOutputMessage> {
        self.calls
            .lock()
            .iter()
            .flat_map(PortCall::to_messages)
            .collect()
    }

    fn record(&self, call: PortCall) {
        self.calls.lock().push(call);
    }
}

impl OutputPort for RecordingPort {
    fn send_pitch_bend_range(
        &mut self,
        channel: ChannelId,
        semitones: u8,
        cents: u8,
    ) -> Result<()> {
        self.record(PortCall::PitchBendRange {
            channel,
            semitones,
            cents,
        });
        Ok(())
    }

    fn send_pitch_bend(&mut self, channel: ChannelId, normalized: f64, time: f64) -> Result<()> {
        self.record(PortCall::PitchBend {
            channel,
            normalized,
            time,
        });
        Ok(())
    }

    fn send_note_on(
        &mut self,
        channel: ChannelId,
        note: u8,
        velocity: u8,
        time: f64,
    ) -> Result<()> {
        self.record(PortCall::NoteOn {
            channel,
            note,
            velocity,
            time,
        });
        Ok(())
    }

    fn send_note_off(
        &mut self,
        channel: ChannelId,
        note: u8,
        velocity: u8,
        time: f64,
    ) -> Result<()> {
        self.record(PortCall::NoteOff {
            channel,
            note,
            velocity,
            time,
        });
        Ok(())
    }

    fn send_all_notes_off(&mut self, channel: ChannelId) -> Result<()> {
        self.record(PortCall::AllNotesOff { channel });
        Ok(())
    }

    fn clear(&mut self) {
        self.record(PortCall::Clear);
    }
}
