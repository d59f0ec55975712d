//! Batch scheduling of timed notes.
//!
//! A batch is expanded into linked on/off events, sorted by time and fired
//! in order through a [`MicrotonalOutput`]. Ordering is logical; nothing
//! here sleeps.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use polybend_midi::NoteTime;

use crate::error::Result;
use crate::output::{MicrotonalOutput, NoteOffHandle};

/// One note of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRequest {
    pub frequency: f64,
    #[serde(default)]
    pub raw_attack: Option<u8>,
    #[serde(default)]
    pub raw_release: Option<u8>,
    #[serde(default)]
    pub time: NoteTime,
    /// Milliseconds between note-on and note-off.
    pub duration: f64,
}

impl NoteRequest {
    pub fn new(frequency: f64, duration: f64) -> Self {
        Self {
            frequency,
            raw_attack: None,
            raw_release: None,
            time: NoteTime::Now,
            duration,
        }
    }

    pub fn at(mut self, time: impl Into<NoteTime>) -> Self {
        self.time = time.into();
        self
    }

    pub fn after(mut self, delta: f64) -> Self {
        self.time = NoteTime::After(delta);
        self
    }

    pub fn attack(mut self, velocity: u8) -> Self {
        self.raw_attack = Some(velocity);
        self
    }

    pub fn release(mut self, velocity: u8) -> Self {
        self.raw_release = Some(velocity);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledKind {
    On,
    Off,
}

/// An on or off event. `note` indexes the batch, linking each off to the on
/// whose handle it consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    pub time: f64,
    pub kind: ScheduledKind,
    pub note: usize,
}

/// A batch of notes expanded into time-ordered events.
#[derive(Debug, Clone)]
pub struct Schedule {
    notes: Vec<NoteRequest>,
    events: Vec<ScheduledEvent>,
}

impl Schedule {
    /// Resolves every note's time against `now` and sorts the events.
    ///
    /// Events at the same time keep batch order, and a note's on always
    /// precedes its off. Negative or NaN durations count as zero.
    pub fn plan(notes: &[NoteRequest], now: f64) -> Self {
        let mut events = Vec::with_capacity(notes.len() * 2);
        for (index, note) in notes.iter().enumerate() {
            let start = note.time.resolve(now);
            let duration = if note.duration > 0.0 { note.duration } else { 0.0 };
            events.push(ScheduledEvent {
                time: start,
                kind: ScheduledKind::On,
                note: index,
            });
            events.push(ScheduledEvent {
                time: start + duration,
                kind: ScheduledKind::Off,
                note: index,
            });
        }
        events.sort_by(|a, b| a.time.total_cmp(&b.time));

        Self {
            notes: notes.to_vec(),
            events,
        }
    }

    pub fn notes(&self) -> &[NoteRequest] {
        &self.notes
    }

    pub fn events(&self) -> &[ScheduledEvent] {
        &self.events
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn start_time(&self) -> Option<f64> {
        self.events.first().map(|e| e.time)
    }

    pub fn end_time(&self) -> Option<f64> {
        self.events.last().map(|e| e.time)
    }

    /// Fires every event through `output`.
    ///
    /// A batch that starts before the output's last accepted event is
    /// rejected before anything is sent. If a send fails partway, every
    /// note the batch already started is ended at the failing event's time
    /// and the first error is returned.
    pub fn run(&self, output: &mut MicrotonalOutput) -> Result<()> {
        if let Some(bad) = self.events.iter().find(|e| e.time.is_nan()) {
            return Err(polybend_midi::Error::InvalidTime(format!(
                "note {} has no valid start time",
                bad.note
            ))
            .into());
        }
        if let Some(start) = self.start_time() {
            output.check_causal_order(start)?;
        }

        let mut handles: Vec<Option<NoteOffHandle>> =
            std::iter::repeat_with(|| None).take(self.notes.len()).collect();

        for event in &self.events {
            if let Err(e) = self.fire(event, output, &mut handles) {
                self.release_started(output, &mut handles, event.time);
                return Err(e);
            }
        }
        Ok(())
    }

    fn fire(
        &self,
        event: &ScheduledEvent,
        output: &mut MicrotonalOutput,
        handles: &mut [Option<NoteOffHandle>],
    ) -> Result<()> {
        let request = &self.notes[event.note];
        match event.kind {
            ScheduledKind::On => {
                trace!("scheduled on #{} at {:.3} ms", event.note, event.time);
                let handle = output.note_on(request.frequency, request.raw_attack, event.time)?;
                handles[event.note] = Some(handle);
            }
            ScheduledKind::Off => match handles[event.note].as_mut() {
                Some(handle) => {
                    trace!("scheduled off #{} at {:.3} ms", event.note, event.time);
                    output.note_off(handle, request.raw_release, event.time)?;
                }
                None => warn!("note-off #{} fired before its note-on", event.note),
            },
        }
        Ok(())
    }

    fn release_started(
        &self,
        output: &mut MicrotonalOutput,
        handles: &mut [Option<NoteOffHandle>],
        time: f64,
    ) {
        for (index, slot) in handles.iter_mut().enumerate() {
            let Some(mut handle) = slot.take() else {
                continue;
            };
            if handle.is_noop() {
                continue;
            }
            if let Err(e) = output.note_off(&mut handle, self.notes[index].raw_release, time) {
                warn!("failed to end note #{index} after an aborted batch: {e}");
            }
        }
    }
}
