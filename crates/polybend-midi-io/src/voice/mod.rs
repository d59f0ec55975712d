//! Channel-per-voice allocation for pitch-bend microtonality.

mod allocator;

pub use allocator::{Allocation, Voice, VoiceAllocator, VoiceId, CENTS_EPSILON, EXPIRED_AGE};
