//! Channel identifiers and note identity keys.
//!
//! Channels are surfaced 1-indexed (1-16). The wire nibble is 0-indexed and
//! only appears when encoding or decoding raw bytes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// MIDI channel, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ChannelId(u8);

impl ChannelId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 16;

    /// Returns `None` outside 1-16.
    pub const fn new(channel: u8) -> Option<Self> {
        if channel >= Self::MIN && channel <= Self::MAX {
            Some(Self(channel))
        } else {
            None
        }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Low nibble of a channel-voice status byte.
    #[inline]
    pub const fn wire_nibble(self) -> u8 {
        self.0 - 1
    }

    #[inline]
    pub const fn from_wire_nibble(nibble: u8) -> Self {
        Self((nibble & 0x0F) + 1)
    }

    /// All sixteen channels in ascending order.
    pub fn all() -> impl Iterator<Item = ChannelId> {
        (Self::MIN..=Self::MAX).map(ChannelId)
    }
}

impl TryFrom<u8> for ChannelId {
    type Error = Error;

    fn try_from(channel: u8) -> Result<Self, Self::Error> {
        ChannelId::new(channel).ok_or(Error::InvalidChannel(channel))
    }
}

impl From<ChannelId> for u8 {
    fn from(channel: ChannelId) -> u8 {
        channel.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Membership set of channels, one bit per channel.
///
/// Iteration is ascending. Use a `Vec<ChannelId>` where registration order
/// matters (the voice pool does).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChannelSet(u16);

impl ChannelSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(u16::MAX)
    }

    pub fn insert(&mut self, channel: ChannelId) -> bool {
        let bit = 1u16 << channel.wire_nibble();
        let added = self.0 & bit == 0;
        self.0 |= bit;
        added
    }

    pub fn remove(&mut self, channel: ChannelId) -> bool {
        let bit = 1u16 << channel.wire_nibble();
        let present = self.0 & bit != 0;
        self.0 &= !bit;
        present
    }

    #[inline]
    pub fn contains(&self, channel: ChannelId) -> bool {
        self.0 & (1u16 << channel.wire_nibble()) != 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = ChannelId> + '_ {
        ChannelId::all().filter(move |ch| self.contains(*ch))
    }
}

impl FromIterator<ChannelId> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = ChannelId>>(iter: I) -> Self {
        let mut set = ChannelSet::empty();
        for channel in iter {
            set.insert(channel);
        }
        set
    }
}

/// Identity of a sounding note on the receive side: `note + 128 * channel`.
///
/// Unique for notes 0-127 and channels 1-16.
#[inline]
pub fn note_identity(note: u8, channel: ChannelId) -> u16 {
    (note & 0x7F) as u16 + 128 * channel.get() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(n: u8) -> ChannelId {
        ChannelId::new(n).unwrap()
    }

    #[test]
    fn test_channel_bounds() {
        assert!(ChannelId::new(0).is_none());
        assert!(ChannelId::new(17).is_none());
        assert_eq!(ChannelId::new(1).map(ChannelId::get), Some(1));
        assert_eq!(ChannelId::new(16).map(ChannelId::get), Some(16));
        assert_eq!(ChannelId::try_from(0), Err(Error::InvalidChannel(0)));
    }

    #[test]
    fn test_wire_nibble() {
        assert_eq!(ch(1).wire_nibble(), 0);
        assert_eq!(ch(16).wire_nibble(), 15);
        assert_eq!(ChannelId::from_wire_nibble(0), ch(1));
        assert_eq!(ChannelId::from_wire_nibble(0x9F), ch(16));
    }

    #[test]
    fn test_channel_set_membership() {
        let mut set: ChannelSet = [ch(3), ch(1)].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(ch(1)));
        assert!(!set.contains(ch(2)));
        assert!(!set.insert(ch(3)));
        assert!(set.remove(ch(3)));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![ch(1)]);
        assert_eq!(ChannelSet::all().len(), 16);
    }

    #[test]
    fn test_note_identity_unique_across_channels() {
        let mut seen = std::collections::HashSet::new();
        for channel in ChannelId::all() {
            for note in 0..=127u8 {
                assert!(seen.insert(note_identity(note, channel)));
            }
        }
        assert_eq!(note_identity(60, ch(1)), 188);
        assert_eq!(note_identity(60, ch(2)), 316);
    }

    #[test]
    fn test_channel_serde() {
        let encoded = bincode::serialize(&ch(10)).unwrap();
        let decoded: ChannelId = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, ch(10));

        let bad = bincode::serialize(&0u8).unwrap();
        assert!(bincode::deserialize::<ChannelId>(&bad).is_err());
    }
}
