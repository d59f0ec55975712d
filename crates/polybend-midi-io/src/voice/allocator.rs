//! Pitch-bend-aware channel allocation.
//!
//! Each configured channel carries one voice. A channel can hold a single
//! pitch bend at a time, so notes share a channel only when their cents
//! offsets match; otherwise the logically oldest voice is retuned.

use polybend_midi::ChannelId;
use smallvec::SmallVec;

use crate::log::LogSink;

/// Age of a voice whose note has ended, or that has never sounded.
pub const EXPIRED_AGE: u32 = 10_000;

/// Offsets closer than this (in cents) share a channel.
pub const CENTS_EPSILON: f64 = 1e-6;

/// Index of a voice in its allocator's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub(crate) usize);

impl VoiceId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One pitch-bendable channel slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    age: u32,
    channel: ChannelId,
    /// `None` until the channel has been tuned.
    cents_offset: Option<f64>,
}

impl Voice {
    fn new(channel: ChannelId) -> Self {
        Self {
            age: EXPIRED_AGE,
            channel,
            cents_offset: None,
        }
    }

    #[inline]
    pub fn age(&self) -> u32 {
        self.age
    }

    #[inline]
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    #[inline]
    pub fn cents_offset(&self) -> Option<f64> {
        self.cents_offset
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.age >= EXPIRED_AGE
    }

    #[inline]
    fn holds(&self, cents: f64) -> bool {
        self.cents_offset
            .is_some_and(|stored| (stored - cents).abs() < CENTS_EPSILON)
    }
}

/// Result of a voice selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub voice: VoiceId,
    pub channel: ChannelId,
    /// The channel already held the requested offset.
    pub reused: bool,
}

/// Fixed pool of voices, one per channel, in registration order.
#[derive(Debug, Clone)]
pub struct VoiceAllocator {
    // at most one voice per MIDI channel
    voices: SmallVec<[Voice; 16]>,
    log: LogSink,
}

impl VoiceAllocator {
    /// Repeated channels keep their first position.
    pub fn new(channels: impl IntoIterator<Item = ChannelId>) -> Self {
        let mut voices: SmallVec<[Voice; 16]> = SmallVec::new();
        for channel in channels {
            if !voices.iter().any(|v| v.channel == channel) {
                voices.push(Voice::new(channel));
            }
        }
        Self {
            voices,
            log: LogSink::none(),
        }
    }

    pub fn with_log(mut self, log: LogSink) -> Self {
        self.log = log;
        self
    }

    pub fn set_log(&mut self, log: LogSink) {
        self.log = log;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(id.0)
    }

    pub fn channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.voices.iter().map(|v| v.channel)
    }

    /// Picks the voice for a note with the given offset.
    ///
    /// Every voice ages by one. The first voice already holding the offset is
    /// reused; otherwise the strictly oldest voice (first on ties) is retuned.
    /// Returns `None` only for an empty pool.
    pub fn select_voice(&mut self, cents_offset: f64) -> Option<Allocation> {
        if self.voices.is_empty() {
            return None;
        }

        for voice in self.voices.iter_mut() {
            voice.age = voice.age.saturating_add(1);
        }

        if let Some(index) = self.voices.iter().position(|v| v.holds(cents_offset)) {
            let voice = &mut self.voices[index];
            voice.age = 0;
            self.log.emit(format_args!(
                "reusing channel {} for {:+.4} cents",
                voice.channel, cents_offset
            ));
            return Some(Allocation {
                voice: VoiceId(index),
                channel: voice.channel,
                reused: true,
            });
        }

        let mut oldest = 0;
        for (index, voice) in self.voices.iter().enumerate().skip(1) {
            if voice.age > self.voices[oldest].age {
                oldest = index;
            }
        }

        let voice = &mut self.voices[oldest];
        voice.cents_offset = Some(cents_offset);
        voice.age = 0;
        Some(Allocation {
            voice: VoiceId(oldest),
            channel: voice.channel,
            reused: false,
        })
    }

    /// Marks a voice's note as ended, making it the first eviction candidate.
    pub fn release(&mut self, id: VoiceId) -> Option<ChannelId> {
        let voice = self.voices.get_mut(id.0)?;
        voice.age = EXPIRED_AGE;
        Some(voice.channel)
    }

    /// Forgets every tuning and expires every voice.
    pub fn reset(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.age = EXPIRED_AGE;
            voice.cents_offset = None;
        }
    }
}
