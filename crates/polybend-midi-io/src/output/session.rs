//! Note output session: pitch resolution, voice allocation and causal order.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use polybend_midi::{ChannelId, Clock, NoteTime, PitchResolver, DEFAULT_VELOCITY};
use tracing::trace;

use super::{MicrotonalOutputBuilder, OutputPort};
use crate::error::{Error, Result};
use crate::log::LogSink;
use crate::scheduler::{NoteRequest, Schedule};
use crate::voice::{Allocation, VoiceAllocator, VoiceId};

/// An output shared between a caller and an input tracker.
pub type SharedOutput = Arc<Mutex<MicrotonalOutput>>;

#[derive(Debug, Clone, Copy, PartialEq)]
struct SoundingNote {
    note: u8,
    voice: VoiceId,
    channel: ChannelId,
}

/// Ends one started note. Pass it back to [`MicrotonalOutput::note_off`].
///
/// Notes that were never sounded (dummy output, unplayable pitch) get a
/// handle that does nothing.
#[must_use = "dropping a NoteOffHandle leaves the note sounding"]
#[derive(Debug, PartialEq)]
pub struct NoteOffHandle {
    sounding: Option<SoundingNote>,
}

impl NoteOffHandle {
    pub(crate) fn noop() -> Self {
        Self { sounding: None }
    }

    fn sounding(note: u8, allocation: Allocation) -> Self {
        Self {
            sounding: Some(SoundingNote {
                note,
                voice: allocation.voice,
                channel: allocation.channel,
            }),
        }
    }

    #[inline]
    pub fn is_noop(&self) -> bool {
        self.sounding.is_none()
    }

    pub fn note(&self) -> Option<u8> {
        self.sounding.map(|s| s.note)
    }

    pub fn channel(&self) -> Option<ChannelId> {
        self.sounding.map(|s| s.channel)
    }
}

/// Plays arbitrary frequencies on a fixed bank of pitch-bend channels.
///
/// Every note-on and note-off must carry a time no earlier than the last
/// accepted one; anything else is a [`Error::CausalOrderViolation`].
pub struct MicrotonalOutput {
    pub(super) port: Option<Box<dyn OutputPort>>,
    pub(super) allocator: VoiceAllocator,
    pub(super) bend_range: u8,
    pub(super) resolver: Arc<dyn PitchResolver>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) log: LogSink,
    pub(super) last_time: f64,
}

impl MicrotonalOutput {
    pub fn builder() -> MicrotonalOutputBuilder {
        MicrotonalOutputBuilder::default()
    }

    pub fn into_shared(self) -> SharedOutput {
        Arc::new(Mutex::new(self))
    }

    /// No port or no channels: every send is a no-op.
    #[inline]
    pub fn is_dummy(&self) -> bool {
        self.port.is_none() || self.allocator.is_empty()
    }

    pub fn channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.allocator.channels()
    }

    #[inline]
    pub fn bend_range(&self) -> u8 {
        self.bend_range
    }

    pub fn allocator(&self) -> &VoiceAllocator {
        &self.allocator
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Time of the last accepted note-on or note-off.
    pub fn last_event_time(&self) -> Option<f64> {
        self.last_time.is_finite().then_some(self.last_time)
    }

    pub fn set_log(&mut self, log: LogSink) {
        self.allocator.set_log(log.clone());
        self.log = log;
    }

    /// Starts a note at `frequency` Hz.
    ///
    /// The returned handle is the only way to end the note.
    pub fn note_on(
        &mut self,
        frequency: f64,
        raw_attack: Option<u8>,
        time: impl Into<NoteTime>,
    ) -> Result<NoteOffHandle> {
        let time = self.resolve_time(time.into());
        self.check_causal_order(time)?;

        if self.allocator.is_empty() {
            return Ok(NoteOffHandle::noop());
        }
        let Some(port) = self.port.as_mut() else {
            return Ok(NoteOffHandle::noop());
        };

        let pitch = self.resolver.resolve(frequency);
        let Some(note) = pitch.midi_note() else {
            trace!("{frequency} Hz resolves outside the MIDI range");
            return Ok(NoteOffHandle::noop());
        };
        let Some(allocation) = self.allocator.select_voice(pitch.cents) else {
            return Ok(NoteOffHandle::noop());
        };

        let bend = pitch.cents / (f64::from(self.bend_range) * 100.0);
        let velocity = raw_attack.unwrap_or(DEFAULT_VELOCITY).min(127);
        let sent = port
            .send_pitch_bend(allocation.channel, bend, time)
            .and_then(|()| port.send_note_on(allocation.channel, note, velocity, time));
        if let Err(e) = sent {
            if !allocation.reused {
                self.allocator.release(allocation.voice);
            }
            return Err(e);
        }
        self.last_time = time;

        self.log.emit(format_args!(
            "note on {} ({:.3} Hz, {:+.4} cents) channel {} velocity {} at {:.3} ms",
            note, frequency, pitch.cents, allocation.channel, velocity, time
        ));
        Ok(NoteOffHandle::sounding(note, allocation))
    }

    /// Ends the note behind `handle`, which becomes a no-op once accepted.
    ///
    /// A note-off rejected for its time leaves the handle live, so the note
    /// can still be ended later. A no-op handle returns `Ok` without touching
    /// the output.
    pub fn note_off(
        &mut self,
        handle: &mut NoteOffHandle,
        raw_release: Option<u8>,
        time: impl Into<NoteTime>,
    ) -> Result<()> {
        let Some(sounding) = handle.sounding else {
            return Ok(());
        };
        let time = self.resolve_time(time.into());
        self.check_causal_order(time)?;
        handle.sounding = None;

        self.allocator.release(sounding.voice);
        let velocity = raw_release.unwrap_or(DEFAULT_VELOCITY).min(127);
        if let Some(port) = self.port.as_mut() {
            port.send_note_off(sounding.channel, sounding.note, velocity, time)?;
        }
        self.last_time = time;

        self.log.emit(format_args!(
            "note off {} channel {} velocity {} at {:.3} ms",
            sounding.note, sounding.channel, velocity, time
        ));
        Ok(())
    }

    /// Plays a batch of notes, each held for its duration.
    ///
    /// Relative times are measured from a single "now" taken at the start of
    /// the call.
    pub fn play_notes(&mut self, notes: &[NoteRequest]) -> Result<()> {
        let schedule = Schedule::plan(notes, self.now());
        schedule.run(self)
    }

    /// Sends all-notes-off on every channel and expires every voice.
    pub fn all_notes_off(&mut self) -> Result<()> {
        if let Some(port) = self.port.as_mut() {
            for channel in self.allocator.channels() {
                port.send_all_notes_off(channel)?;
            }
        }
        self.allocator.reset();
        Ok(())
    }

    /// Drops port output that is queued but not yet sent.
    pub fn clear(&mut self) {
        if let Some(port) = self.port.as_mut() {
            port.clear();
        }
    }

    pub(crate) fn configure_bend_range(&mut self) -> Result<()> {
        if let Some(port) = self.port.as_mut() {
            for channel in self.allocator.channels() {
                port.send_pitch_bend_range(channel, self.bend_range, 0)?;
            }
        }
        Ok(())
    }

    #[inline]
    fn resolve_time(&self, time: NoteTime) -> f64 {
        match time {
            NoteTime::At(time) => time,
            other => other.resolve(self.clock.now()),
        }
    }

    pub(crate) fn check_causal_order(&self, time: f64) -> Result<()> {
        if time.is_nan() {
            return Err(polybend_midi::Error::InvalidTime("NaN".to_string()).into());
        }
        if time < self.last_time {
            return Err(Error::CausalOrderViolation {
                requested: time,
                last_accepted: self.last_time,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for MicrotonalOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrotonalOutput")
            .field("has_port", &self.port.is_some())
            .field("voices", &self.allocator.voices())
            .field("bend_range", &self.bend_range)
            .field("last_time", &self.last_event_time())
            .finish()
    }
}
