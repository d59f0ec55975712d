//! Inbound note notifications.
//!
//! Raw bytes from an input port are parsed with `midi-msg`; only note-on and
//! note-off survive as notifications, everything else is dropped.

use midi_msg::{ChannelVoiceMsg, MidiMsg};
use tracing::trace;

use crate::channel::ChannelId;
use crate::error::Result;
use crate::pitch::velocity_to_gain;

/// Velocity used when none is given, and for note-offs synthesized from
/// velocity-0 note-ons.
pub const DEFAULT_VELOCITY: u8 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteEventKind {
    On,
    Off,
}

/// A note-on or note-off as delivered by an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteNotification {
    pub kind: NoteEventKind,
    pub channel: ChannelId,
    pub note: u8,
    /// Attack velocity for note-on, release velocity for note-off.
    pub velocity: u8,
}

impl NoteNotification {
    #[inline]
    pub fn note_on(channel: ChannelId, note: u8, velocity: u8) -> Self {
        Self {
            kind: NoteEventKind::On,
            channel,
            note: note & 0x7F,
            velocity: velocity & 0x7F,
        }
    }

    #[inline]
    pub fn note_off(channel: ChannelId, note: u8, velocity: u8) -> Self {
        Self {
            kind: NoteEventKind::Off,
            channel,
            note: note & 0x7F,
            velocity: velocity & 0x7F,
        }
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        self.kind == NoteEventKind::On
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        self.kind == NoteEventKind::Off
    }

    /// Raw attack velocity; `None` for note-offs.
    #[inline]
    pub fn raw_attack(&self) -> Option<u8> {
        self.is_note_on().then_some(self.velocity)
    }

    /// Raw release velocity; `None` for note-ons.
    #[inline]
    pub fn raw_release(&self) -> Option<u8> {
        self.is_note_off().then_some(self.velocity)
    }

    /// Attack scaled to 0.0..=1.0.
    #[inline]
    pub fn attack(&self) -> Option<f32> {
        self.raw_attack().map(velocity_to_gain)
    }

    /// Release scaled to 0.0..=1.0.
    #[inline]
    pub fn release(&self) -> Option<f32> {
        self.raw_release().map(velocity_to_gain)
    }

    /// Parses one message. Non-note messages yield `Ok(None)`.
    ///
    /// A note-on with velocity 0 is reported as a note-off with the default
    /// release velocity.
    pub fn from_bytes(bytes: &[u8]) -> Result<Option<Self>> {
        let (msg, _len) = MidiMsg::from_midi(bytes)?;
        let MidiMsg::ChannelVoice { channel, msg } = msg else {
            trace!("dropping non-channel message {:02X?}", bytes);
            return Ok(None);
        };
        let channel = ChannelId::from_wire_nibble(channel as u8);
        Ok(match msg {
            ChannelVoiceMsg::NoteOn { note, velocity: 0 } => {
                Some(Self::note_off(channel, note, DEFAULT_VELOCITY))
            }
            ChannelVoiceMsg::NoteOn { note, velocity } => {
                Some(Self::note_on(channel, note, velocity))
            }
            ChannelVoiceMsg::NoteOff { note, velocity } => {
                Some(Self::note_off(channel, note, velocity))
            }
            other => {
                trace!("dropping {:?} on channel {}", other, channel);
                None
            }
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let status = match self.kind {
            NoteEventKind::On => 0x90,
            NoteEventKind::Off => 0x80,
        };
        vec![status | self.channel.wire_nibble(), self.note, self.velocity]
    }
}
