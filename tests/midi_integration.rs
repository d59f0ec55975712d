//! Workspace-level MIDI tests through the umbrella crate.
//!
//! Run with:
//! ```bash
//! cargo test -p polybend --test midi_integration
//! ```

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use polybend::io::PortCall;
use polybend::midi::{key_position, KeyPosition};
use polybend::prelude::*;
use polybend::LogBuffer;

fn recording(channels: &[u8]) -> Result<(MicrotonalOutput, RecordingPort, LogBuffer)> {
    let port = RecordingPort::new();
    let log = LogBuffer::new();
    let output = MicrotonalOutput::builder()
        .port(port.clone())
        .channels(channels.iter().copied())
        .log(log.sink())
        .build()?;
    port.take();
    Ok((output, port, log))
}

fn note_on_channels(port: &RecordingPort) -> Vec<u8> {
    port.calls()
        .iter()
        .filter_map(|c| match c {
            PortCall::NoteOn { channel, .. } => Some(channel.get()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_two_channel_reuse_and_eviction() -> Result<()> {
    let (mut out, port, log) = recording(&[1, 2])?;

    let a = out.note_on(440.0, None, 0.0)?;
    let b = out.note_on(550.0, None, 1.0)?;
    // an octave above 550 carries the same bend
    let c = out.note_on(1100.0, None, 2.0)?;
    assert_eq!(c.channel(), b.channel());
    let reuses: Vec<String> = log
        .lines()
        .into_iter()
        .filter(|l| l.contains("reusing"))
        .collect();
    assert_eq!(reuses.len(), 1);
    assert!(reuses[0].starts_with("reusing channel 2"));

    // the oldest voice is channel 1
    let d = out.note_on(660.0, None, 3.0)?;
    assert_eq!(d.channel(), a.channel());
    assert_eq!(note_on_channels(&port), vec![1, 2, 2, 1]);

    for mut handle in [a, b, c, d] {
        out.note_off(&mut handle, None, 4.0)?;
    }
    Ok(())
}

#[test]
fn test_causal_violation_converts_to_umbrella_error() -> Result<()> {
    let (mut out, _port, _log) = recording(&[1])?;
    let _a = out.note_on(440.0, None, 10.0)?;

    let err: Error = out.note_on(440.0, None, 5.0).unwrap_err().into();
    assert!(matches!(
        err,
        Error::Midi(polybend::io::Error::CausalOrderViolation { .. })
    ));
    Ok(())
}

#[test]
fn test_bad_time_string_converts_to_umbrella_error() {
    fn parse(s: &str) -> Result<NoteTime> {
        Ok(s.parse::<NoteTime>()?)
    }
    assert!(matches!(parse("+soon"), Err(Error::Core(_))));
    assert_eq!(parse("+25").ok(), Some(NoteTime::After(25.0)));
}

#[test]
fn test_schedule_against_manual_clock() -> Result<()> {
    let port = RecordingPort::new();
    let clock = Arc::new(ManualClock::new(500.0));
    let mut out = MicrotonalOutput::builder()
        .port(port.clone())
        .config(OutputConfig::new([1, 2]).with_bend_range(12))
        .clock(clock.clone())
        .build()?;
    port.take();

    out.play_notes(&[
        NoteRequest::new(440.0, 100.0),
        NoteRequest::new(660.0, 100.0).after(50.0),
    ])?;
    assert_eq!(out.last_event_time(), Some(650.0));
    assert_eq!(note_on_channels(&port), vec![1, 2]);

    // 660 Hz is E5 + 1.955 cents, scaled by a 12-semitone range
    let bend = port
        .calls()
        .iter()
        .filter_map(|c| match c {
            PortCall::PitchBend { normalized, .. } => Some(*normalized),
            _ => None,
        })
        .nth(1);
    assert_abs_diff_eq!(bend.unwrap_or_default(), 1.955 / 1200.0, epsilon = 1e-5);

    clock.set(700.0);
    out.play_notes(&[NoteRequest::new(440.0, 10.0)])?;
    assert_eq!(out.last_event_time(), Some(710.0));
    Ok(())
}

#[test]
fn test_keyboard_retunes_through_prelude() -> Result<()> {
    let port = RecordingPort::new();
    let output = MicrotonalOutput::builder()
        .port(port.clone())
        .channels(1..=4)
        .clock(Arc::new(ManualClock::new(0.0)))
        .build()?
        .into_shared();
    port.take();

    // equal temperament except A#4, which plays a just 16/15 above A4
    let sink = RetuningSink::new(output.clone(), |note: u8, _: ChannelId| match note {
        70 => 440.0 * 16.0 / 15.0,
        n => 440.0 * 2f64.powf((f64::from(n) - 69.0) / 12.0),
    });
    let keyboard = VirtualInputPort::new();
    let tracker = NoteInputTracker::new(ChannelId::all(), sink);
    tracker.listen(&keyboard);

    let ch1 = ChannelId::try_from(1)?;
    keyboard.note_on(ch1, 69, 100);
    keyboard.note_on(ch1, 70, 100);
    keyboard.note_on(ch1, 71, 100);
    assert_eq!(tracker.pending_count(), 3);

    // 69 and 71 both need zero bend
    assert_eq!(note_on_channels(&port), vec![1, 2, 1]);

    keyboard.note_off(ch1, 70, 0);
    assert_eq!(tracker.pending_count(), 2);
    assert_eq!(tracker.deactivate(), 2);
    Ok(())
}

#[test]
fn test_key_layout_spans_octaves() {
    assert_eq!(key_position(12), KeyPosition::White(7));
    assert_eq!(key_position(-1), KeyPosition::White(-1));
    assert_eq!(
        key_position(13),
        KeyPosition::Black { below: 7, above: 8 }
    );
}
