//! Frequency to (note, cents) resolution.

/// Nearest fixed pitch plus the signed deviation from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPitch {
    /// Nearest 12-TET note number. May fall outside 0-127.
    pub note: i32,
    /// Deviation from `note` in cents.
    pub cents: f64,
}

impl ResolvedPitch {
    pub const UNPLAYABLE: ResolvedPitch = ResolvedPitch {
        note: i32::MIN,
        cents: 0.0,
    };

    /// The note as a MIDI key, or `None` outside 0-127.
    #[inline]
    pub fn midi_note(&self) -> Option<u8> {
        u8::try_from(self.note).ok().filter(|n| *n <= 127)
    }
}

/// Maps a frequency in Hz to the nearest fixed pitch and its offset.
pub trait PitchResolver: Send + Sync {
    fn resolve(&self, frequency: f64) -> ResolvedPitch;
}

impl<F> PitchResolver for F
where
    F: Fn(f64) -> ResolvedPitch + Send + Sync,
{
    fn resolve(&self, frequency: f64) -> ResolvedPitch {
        self(frequency)
    }
}

/// Twelve-tone equal temperament anchored at a reference pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualTemperament {
    reference_hz: f64,
    reference_note: i32,
}

impl EqualTemperament {
    pub fn new(reference_hz: f64, reference_note: i32) -> Self {
        Self {
            reference_hz,
            reference_note,
        }
    }
}

impl Default for EqualTemperament {
    /// A4 = 440 Hz.
    fn default() -> Self {
        Self::new(440.0, 69)
    }
}

impl PitchResolver for EqualTemperament {
    fn resolve(&self, frequency: f64) -> ResolvedPitch {
        if !frequency.is_finite() || frequency <= 0.0 {
            return ResolvedPitch::UNPLAYABLE;
        }
        let exact = self.reference_note as f64 + 12.0 * (frequency / self.reference_hz).log2();
        let note = exact.round();
        ResolvedPitch {
            note: note as i32,
            cents: (exact - note) * 100.0,
        }
    }
}

#[inline]
pub fn note_to_hz(note: f64) -> f64 {
    440.0 * 2.0_f64.powf((note - 69.0) / 12.0)
}

#[inline]
pub fn hz_to_note(hz: f64) -> f64 {
    69.0 + 12.0 * (hz / 440.0).log2()
}

#[inline]
pub fn velocity_to_gain(velocity: u8) -> f32 {
    velocity.min(127) as f32 / 127.0
}

#[inline]
pub fn gain_to_velocity(gain: f32) -> u8 {
    (gain.clamp(0.0, 1.0) * 127.0).round() as u8
}
