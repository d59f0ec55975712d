//! Hardware integration tests using a MIDI loopback port (macOS IAC Driver,
//! or any device whose name contains `POLYBEND_LOOPBACK`).
//!
//! All tests are `#[ignore]` so CI doesn't fail without hardware.
//!
//! Run with:
//!   cargo test -p polybend-midi-io --test hardware -- --ignored --test-threads=1

#![cfg(feature = "midi-io")]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use polybend_midi_io::{
    ChannelId, MicrotonalOutput, MidiInputManager, MidiOutputManager, NoteInputTracker,
    NoteRequest, NoteSink,
};

const SETTLE: Duration = Duration::from_millis(200);

fn loopback_name() -> String {
    std::env::var("POLYBEND_LOOPBACK").unwrap_or_else(|_| "IAC".to_string())
}

#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<(u8, u8, bool)>>>);

impl NoteSink for Seen {
    type Handle = (u8, u8);

    fn note_on(&mut self, note: u8, _raw_attack: Option<u8>, channel: ChannelId) -> (u8, u8) {
        self.0.lock().push((note, channel.get(), true));
        (note, channel.get())
    }

    fn note_off(&mut self, handle: (u8, u8), _raw_release: Option<u8>) {
        self.0.lock().push((handle.0, handle.1, false));
    }
}

fn setup() -> (MidiOutputManager, MidiInputManager) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let output = MidiOutputManager::new().unwrap();
    let input = MidiInputManager::new().unwrap();
    let name = loopback_name();
    output.connect_by_name(&name).unwrap();
    input.connect_by_name(&name).unwrap();
    thread::sleep(SETTLE);
    (output, input)
}

#[test]
#[ignore]
fn test_loopback_connects() {
    let (output, input) = setup();
    assert!(output.is_connected());
    assert!(input.is_connected());
    assert!(output.connected_device_name().is_some());
    assert!(input.connected_device_name().is_some());
}

#[test]
#[ignore]
fn test_scheduled_chord_round_trips() {
    let (port, input) = setup();
    let seen = Seen::default();
    let tracker = NoteInputTracker::new(ChannelId::all(), seen.clone());
    tracker.listen(&input);

    let clock = Arc::new(port.clock());
    let mut output = MicrotonalOutput::builder()
        .port(port)
        .channels([1, 2, 3])
        .clock(clock)
        .build()
        .unwrap();

    let chord = [
        NoteRequest::new(440.0, 100.0).after(50.0),
        NoteRequest::new(550.0, 100.0).after(50.0),
        NoteRequest::new(660.0, 100.0).after(50.0),
    ];
    output.play_notes(&chord).unwrap();
    thread::sleep(Duration::from_millis(400));

    let events = seen.0.lock().clone();
    let ons: Vec<(u8, u8)> = events
        .iter()
        .filter(|e| e.2)
        .map(|e| (e.0, e.1))
        .collect();
    assert_eq!(ons, vec![(69, 1), (73, 2), (76, 3)]);
    assert_eq!(events.iter().filter(|e| !e.2).count(), 3);
    assert_eq!(tracker.pending_count(), 0);
}

#[test]
#[ignore]
fn test_clear_drops_queued_notes() {
    let (port, input) = setup();
    let seen = Seen::default();
    let tracker = NoteInputTracker::new(ChannelId::all(), seen.clone());
    tracker.listen(&input);

    let clock = Arc::new(port.clock());
    let mut output = MicrotonalOutput::builder()
        .port(port)
        .channels([1])
        .clock(clock)
        .build()
        .unwrap();

    output
        .play_notes(&[NoteRequest::new(440.0, 100.0).after(300.0)])
        .unwrap();
    output.clear();
    thread::sleep(Duration::from_millis(500));

    assert!(seen.0.lock().is_empty());
}
