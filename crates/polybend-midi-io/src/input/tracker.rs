//! Note identity tracking for inbound notes.
//!
//! Notes are keyed by `note + 128 * channel`, so the same key number held on
//! two channels produces two independent pending handles.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use polybend_midi::{
    note_identity, ChannelId, ChannelSet, NoteEventKind, NoteNotification, DEFAULT_VELOCITY,
};
use tracing::{debug, trace};

use super::{InputPort, NoteListener};

/// Reacts to tracked notes.
///
/// `note_on` starts something and returns the handle that `note_off` later
/// receives for the same (note, channel).
pub trait NoteSink: Send {
    type Handle: Send;

    fn note_on(&mut self, note: u8, raw_attack: Option<u8>, channel: ChannelId) -> Self::Handle;

    fn note_off(&mut self, handle: Self::Handle, raw_release: Option<u8>);
}

struct TrackerState<S: NoteSink> {
    sink: S,
    pending: BTreeMap<u16, S::Handle>,
}

struct TrackerCore<S: NoteSink> {
    channels: ChannelSet,
    state: Mutex<TrackerState<S>>,
}

impl<S: NoteSink> TrackerCore<S> {
    fn handle(&self, notification: &NoteNotification) {
        if !self.channels.contains(notification.channel) {
            trace!(
                "ignoring note {} on unconfigured channel {}",
                notification.note,
                notification.channel
            );
            return;
        }

        let key = note_identity(notification.note, notification.channel);
        let mut state = self.state.lock();
        match notification.kind {
            NoteEventKind::On => {
                let handle = state.sink.note_on(
                    notification.note,
                    notification.raw_attack(),
                    notification.channel,
                );
                if state.pending.insert(key, handle).is_some() {
                    trace!("note {key} retriggered before its note-off");
                }
            }
            NoteEventKind::Off => {
                if let Some(handle) = state.pending.remove(&key) {
                    state.sink.note_off(handle, notification.raw_release());
                }
            }
        }
    }
}

impl<S: NoteSink> NoteListener for TrackerCore<S>
where
    S: 'static,
{
    fn on_note(&self, notification: &NoteNotification) {
        self.handle(notification);
    }
}

/// Routes note-offs from an input port to the handle their note-on produced.
pub struct NoteInputTracker<S: NoteSink> {
    core: Arc<TrackerCore<S>>,
}

impl<S: NoteSink + 'static> NoteInputTracker<S> {
    /// Notes on channels outside `channels` are ignored.
    pub fn new(channels: impl IntoIterator<Item = ChannelId>, sink: S) -> Self {
        Self {
            core: Arc::new(TrackerCore {
                channels: channels.into_iter().collect(),
                state: Mutex::new(TrackerState {
                    sink,
                    pending: BTreeMap::new(),
                }),
            }),
        }
    }

    /// Starts receiving notes from `port`. Listening to the same port twice
    /// is a no-op and returns `false`.
    pub fn listen(&self, port: &impl InputPort) -> bool {
        port.add_listener(self.listener())
    }

    /// Stops receiving notes from `port`. Pending notes stay pending.
    pub fn unlisten(&self, port: &impl InputPort) -> bool {
        port.remove_listener(&self.listener())
    }

    /// Ends every pending note with the default release velocity.
    ///
    /// Returns how many notes were ended.
    pub fn deactivate(&self) -> usize {
        let mut state = self.core.state.lock();
        let pending = std::mem::take(&mut state.pending);
        let count = pending.len();
        for (_key, handle) in pending {
            state.sink.note_off(handle, Some(DEFAULT_VELOCITY));
        }
        if count > 0 {
            debug!("Released {count} pending note(s)");
        }
        count
    }

    /// Feeds one notification directly, as a port would.
    pub fn handle(&self, notification: &NoteNotification) {
        self.core.handle(notification);
    }

    pub fn channels(&self) -> ChannelSet {
        self.core.channels
    }

    pub fn pending_count(&self) -> usize {
        self.core.state.lock().pending.len()
    }

    pub fn is_pending(&self, note: u8, channel: ChannelId) -> bool {
        self.core
            .state
            .lock()
            .pending
            .contains_key(&note_identity(note, channel))
    }

    /// Runs `f` with the sink locked.
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.core.state.lock().sink)
    }

    fn listener(&self) -> Arc<dyn NoteListener> {
        self.core.clone()
    }
}
