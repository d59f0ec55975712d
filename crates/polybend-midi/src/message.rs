//! Raw outbound MIDI messages.

use crate::channel::ChannelId;

/// Controller numbers used for pitch-bend-range setup.
const CC_DATA_ENTRY_MSB: u8 = 6;
const CC_DATA_ENTRY_LSB: u8 = 38;
const CC_RPN_LSB: u8 = 100;
const CC_RPN_MSB: u8 = 101;
const CC_ALL_NOTES_OFF: u8 = 123;
const RPN_NULL: u8 = 127;

/// Signed range of a 14-bit pitch bend around center.
pub const PITCH_BEND_CENTER: i16 = 8192;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiOutputMessage {
    pub bytes: Vec<u8>,
}

impl MidiOutputMessage {
    pub fn control_change(channel: ChannelId, cc_number: u8, value: u8) -> Self {
        let status = 0xB0 | channel.wire_nibble();
        Self {
            bytes: vec![status, cc_number & 0x7F, value & 0x7F],
        }
    }

    pub fn note_on(channel: ChannelId, note: u8, velocity: u8) -> Self {
        let status = 0x90 | channel.wire_nibble();
        Self {
            bytes: vec![status, note & 0x7F, velocity & 0x7F],
        }
    }

    pub fn note_off(channel: ChannelId, note: u8, velocity: u8) -> Self {
        let status = 0x80 | channel.wire_nibble();
        Self {
            bytes: vec![status, note & 0x7F, velocity & 0x7F],
        }
    }

    /// `value`: signed 14-bit (-8192 to 8191).
    pub fn pitch_bend(channel: ChannelId, value: i16) -> Self {
        let status = 0xE0 | channel.wire_nibble();
        let unsigned = (value as i32 + PITCH_BEND_CENTER as i32).clamp(0, 16383) as u16;
        let lsb = (unsigned & 0x7F) as u8;
        let msb = ((unsigned >> 7) & 0x7F) as u8;
        Self {
            bytes: vec![status, lsb, msb],
        }
    }

    /// `normalized`: -1.0 (full bend down) to 1.0 (full bend up).
    pub fn pitch_bend_normalized(channel: ChannelId, normalized: f64) -> Self {
        Self::pitch_bend(channel, bend_to_14bit(normalized))
    }

    /// RPN 0 (pitch bend sensitivity), followed by the null RPN so later
    /// data-entry messages cannot retarget it.
    pub fn pitch_bend_range(channel: ChannelId, semitones: u8, cents: u8) -> Vec<Self> {
        vec![
            Self::control_change(channel, CC_RPN_MSB, 0),
            Self::control_change(channel, CC_RPN_LSB, 0),
            Self::control_change(channel, CC_DATA_ENTRY_MSB, semitones),
            Self::control_change(channel, CC_DATA_ENTRY_LSB, cents),
            Self::control_change(channel, CC_RPN_MSB, RPN_NULL),
            Self::control_change(channel, CC_RPN_LSB, RPN_NULL),
        ]
    }

    pub fn all_notes_off(channel: ChannelId) -> Self {
        Self::control_change(channel, CC_ALL_NOTES_OFF, 0)
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.bytes.first().map(|b| b & 0xF0).unwrap_or(0)
    }

    #[inline]
    pub fn channel(&self) -> Option<ChannelId> {
        self.bytes
            .first()
            .filter(|b| (0x80..0xF0).contains(*b))
            .map(|b| ChannelId::from_wire_nibble(*b))
    }
}

/// Normalized bend to signed 14-bit, saturating at the ends.
#[inline]
pub fn bend_to_14bit(normalized: f64) -> i16 {
    if normalized.is_nan() {
        return 0;
    }
    (normalized * PITCH_BEND_CENTER as f64)
        .round()
        .clamp(-(PITCH_BEND_CENTER as f64), (PITCH_BEND_CENTER - 1) as f64) as i16
}
