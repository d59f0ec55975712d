//! Plays tracked input notes through a microtonal output.

use polybend_midi::{ChannelId, NoteTime};
use tracing::warn;

use super::NoteSink;
use crate::output::{NoteOffHandle, SharedOutput};

/// Maps each incoming (note, channel) to a frequency and plays it.
///
/// Turns an ordinary keyboard into a controller for any tuning.
pub struct RetuningSink<F> {
    output: SharedOutput,
    tuning: F,
}

impl<F> RetuningSink<F>
where
    F: Fn(u8, ChannelId) -> f64 + Send,
{
    pub fn new(output: SharedOutput, tuning: F) -> Self {
        Self { output, tuning }
    }

    pub fn output(&self) -> &SharedOutput {
        &self.output
    }
}

impl<F> NoteSink for RetuningSink<F>
where
    F: Fn(u8, ChannelId) -> f64 + Send,
{
    type Handle = NoteOffHandle;

    fn note_on(&mut self, note: u8, raw_attack: Option<u8>, channel: ChannelId) -> NoteOffHandle {
        let frequency = (self.tuning)(note, channel);
        match self.output.lock().note_on(frequency, raw_attack, NoteTime::Now) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Dropping input note {note} on channel {channel}: {e}");
                NoteOffHandle::noop()
            }
        }
    }

    fn note_off(&mut self, mut handle: NoteOffHandle, raw_release: Option<u8>) {
        if let Err(e) = self
            .output
            .lock()
            .note_off(&mut handle, raw_release, NoteTime::Now)
        {
            warn!("Failed to end input note: {e}");
        }
    }
}
