//! Inbound notes: listener plumbing, an in-memory input port and the note
//! identity tracker.

mod retune;
mod tracker;

pub use retune::RetuningSink;
pub use tracker::{NoteInputTracker, NoteSink};

use std::sync::Arc;

use arc_swap::ArcSwap;
use polybend_midi::{ChannelId, NoteNotification};

use crate::error::Result;

/// Receives note notifications. Called from whichever thread the port
/// delivers on.
pub trait NoteListener: Send + Sync {
    fn on_note(&self, notification: &NoteNotification);
}

/// Anything that can deliver note notifications to listeners.
pub trait InputPort {
    /// Adds a listener. Returns `false` if it was already registered.
    fn add_listener(&self, listener: Arc<dyn NoteListener>) -> bool;

    /// Removes a listener previously added. Returns whether it was found.
    fn remove_listener(&self, listener: &Arc<dyn NoteListener>) -> bool;
}

/// Listener list with lock-free dispatch.
pub struct ListenerRegistry {
    listeners: ArcSwap<Vec<Arc<dyn NoteListener>>>,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
        }
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each listener is registered at most once.
    pub fn add(&self, listener: Arc<dyn NoteListener>) -> bool {
        let mut added = false;
        self.listeners.rcu(|current| {
            let mut next: Vec<Arc<dyn NoteListener>> = current.iter().cloned().collect();
            added = !next.iter().any(|l| same_listener(l, &listener));
            if added {
                next.push(Arc::clone(&listener));
            }
            next
        });
        added
    }

    pub fn remove(&self, listener: &Arc<dyn NoteListener>) -> bool {
        let mut removed = false;
        self.listeners.rcu(|current| {
            let next: Vec<Arc<dyn NoteListener>> = current
                .iter()
                .filter(|l| !same_listener(l, listener))
                .cloned()
                .collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.load().is_empty()
    }

    pub fn dispatch(&self, notification: &NoteNotification) {
        for listener in self.listeners.load().iter() {
            listener.on_note(notification);
        }
    }

    /// Parses raw bytes and dispatches any note they carry.
    pub fn dispatch_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(notification) = NoteNotification::from_bytes(bytes)? {
            self.dispatch(&notification);
        }
        Ok(())
    }
}

#[inline]
fn same_listener(a: &Arc<dyn NoteListener>, b: &Arc<dyn NoteListener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Input port driven from code. Clones feed the same listeners.
#[derive(Clone, Default)]
pub struct VirtualInputPort {
    registry: Arc<ListenerRegistry>,
}

impl VirtualInputPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&self, notification: NoteNotification) {
        self.registry.dispatch(&notification);
    }

    pub fn send_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.registry.dispatch_bytes(bytes)
    }

    pub fn note_on(&self, channel: ChannelId, note: u8, velocity: u8) {
        self.send(NoteNotification::note_on(channel, note, velocity));
    }

    pub fn note_off(&self, channel: ChannelId, note: u8, velocity: u8) {
        self.send(NoteNotification::note_off(channel, note, velocity));
    }

    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }
}

impl InputPort for VirtualInputPort {
    fn add_listener(&self, listener: Arc<dyn NoteListener>) -> bool {
        self.registry.add(listener)
    }

    fn remove_listener(&self, listener: &Arc<dyn NoteListener>) -> bool {
        self.registry.remove(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<NoteNotification>>);

    impl NoteListener for Collect {
        fn on_note(&self, notification: &NoteNotification) {
            self.0.lock().push(*notification);
        }
    }

    fn ch(n: u8) -> ChannelId {
        ChannelId::new(n).unwrap()
    }

    #[test]
    fn test_add_dispatch_remove() {
        let port = VirtualInputPort::new();
        let collect = Arc::new(Collect::default());
        let listener: Arc<dyn NoteListener> = collect.clone();

        assert!(port.add_listener(Arc::clone(&listener)));
        assert!(!port.add_listener(Arc::clone(&listener)));
        assert_eq!(port.listener_count(), 1);
        port.note_on(ch(1), 60, 100);

        assert!(port.remove_listener(&listener));
        assert!(!port.remove_listener(&listener));
        port.note_off(ch(1), 60, 0);

        assert_eq!(
            *collect.0.lock(),
            vec![NoteNotification::note_on(ch(1), 60, 100)]
        );
    }

    #[test]
    fn test_send_bytes_parses() {
        let port = VirtualInputPort::new();
        let collect = Arc::new(Collect::default());
        port.add_listener(collect.clone());

        port.send_bytes(&[0x91, 64, 80]).unwrap();
        port.send_bytes(&[0x91, 64, 0]).unwrap();
        port.send_bytes(&[0xB1, 7, 100]).unwrap();

        let seen = collect.0.lock().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], NoteNotification::note_on(ch(2), 64, 80));
        assert!(seen[1].is_note_off());
        assert_eq!(seen[1].raw_release(), Some(64));
    }

    #[test]
    fn test_clones_share_listeners() {
        let port = VirtualInputPort::new();
        let other = port.clone();
        let collect = Arc::new(Collect::default());
        other.add_listener(collect.clone());
        port.note_on(ch(3), 1, 1);
        assert_eq!(collect.0.lock().len(), 1);
    }
}
