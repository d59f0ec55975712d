//! Plays a 4:5:6:7 chord on the first MIDI output whose name contains the
//! first argument (default: any device).
//!
//! The receiving synth must treat channels 1-4 independently and honour the
//! pitch-bend range the output sends on startup.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use polybend_midi_io::{LogSink, MicrotonalOutput, MidiOutputManager, NoteRequest};

fn main() -> polybend_midi_io::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let name = std::env::args().nth(1).unwrap_or_default();
    let port = MidiOutputManager::new()?;
    let device = port.connect_by_name(&name)?;
    println!("Playing on {device}");

    let clock = Arc::new(port.clock());
    let mut output = MicrotonalOutput::builder()
        .port(port)
        .channels([1, 2, 3, 4])
        .clock(clock)
        .log(LogSink::new(|line| println!("{line}")))
        .build()?;

    let root = 220.0;
    let chord: Vec<NoteRequest> = [4.0, 5.0, 6.0, 7.0]
        .iter()
        .enumerate()
        .map(|(i, ratio)| {
            NoteRequest::new(root * ratio / 4.0, 2000.0 - 200.0 * i as f64)
                .after(100.0 + 200.0 * i as f64)
                .attack(90)
        })
        .collect();
    output.play_notes(&chord)?;

    thread::sleep(Duration::from_millis(2500));
    output.all_notes_off()?;
    thread::sleep(Duration::from_millis(100));
    Ok(())
}
