//! MIDI output: device enumeration, connection, and timed sending via a dedicated thread.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use midir::{MidiOutput, MidiOutputConnection};
use polybend_midi::{ChannelId, MidiOutputMessage, SystemClock};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::output::OutputPort;

const IDLE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct MidiOutputDevice {
    pub index: usize,
    pub name: String,
}

enum MidiOutputCommand {
    Connect(usize, Sender<Result<String>>),
    Disconnect,
    /// `due` is milliseconds since the manager's epoch; `None` sends at once.
    Send {
        due: Option<f64>,
        message: MidiOutputMessage,
    },
    Clear,
    Shutdown,
}

/// A message waiting for its time. Ordered so the heap pops the earliest
/// first, ties in arrival order.
struct Pending {
    due: f64,
    seq: u64,
    message: MidiOutputMessage,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .total_cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Hardware MIDI output. Timed messages are held on the output thread until
/// their time on [`MidiOutputManager::clock`] comes round.
pub struct MidiOutputManager {
    command_sender: Sender<MidiOutputCommand>,
    connected_device: Arc<ArcSwap<Option<String>>>,
    is_connected: Arc<AtomicBool>,
    epoch: Instant,
}

impl MidiOutputManager {
    pub fn new() -> Result<Self> {
        let (command_sender, command_receiver) = bounded(1024);
        let connected_device = Arc::new(ArcSwap::new(Arc::new(None)));
        let is_connected = Arc::new(AtomicBool::new(false));
        let epoch = Instant::now();

        let connected_device_clone = Arc::clone(&connected_device);
        let is_connected_clone = Arc::clone(&is_connected);

        thread::Builder::new()
            .name("polybend-midi-output".to_string())
            .spawn(move || {
                Self::midi_output_thread(
                    command_receiver,
                    connected_device_clone,
                    is_connected_clone,
                    epoch,
                );
            })
            .map_err(|e| Error::MidiDevice(format!("Failed to spawn MIDI output thread: {e}")))?;

        Ok(Self {
            command_sender,
            connected_device,
            is_connected,
            epoch,
        })
    }

    fn midi_output_thread(
        command_receiver: Receiver<MidiOutputCommand>,
        connected_device: Arc<ArcSwap<Option<String>>>,
        is_connected: Arc<AtomicBool>,
        epoch: Instant,
    ) {
        let mut connection: Option<MidiOutputConnection> = None;
        let mut queue: BinaryHeap<Pending> = BinaryHeap::new();
        let mut seq: u64 = 0;
        let now_ms = || epoch.elapsed().as_secs_f64() * 1000.0;

        loop {
            let wait = match queue.peek() {
                Some(next) => {
                    let until = (next.due - now_ms()).max(0.0);
                    Duration::try_from_secs_f64(until / 1000.0)
                        .map_or(IDLE_POLL, |d| d.min(IDLE_POLL))
                }
                None => IDLE_POLL,
            };

            match command_receiver.recv_timeout(wait) {
                Ok(MidiOutputCommand::Connect(device_index, reply)) => {
                    connection = None;
                    match Self::connect_to_device(device_index) {
                        Ok((conn, name)) => {
                            connection = Some(conn);
                            is_connected.store(true, Ordering::SeqCst);
                            connected_device.store(Arc::new(Some(name.clone())));
                            debug!("Connected MIDI output '{name}'");
                            let _ = reply.send(Ok(name));
                        }
                        Err(e) => {
                            is_connected.store(false, Ordering::SeqCst);
                            connected_device.store(Arc::new(None));
                            let _ = reply.send(Err(e));
                        }
                    }
                }
                Ok(MidiOutputCommand::Disconnect) => {
                    if connection.take().is_some() {
                        is_connected.store(false, Ordering::SeqCst);
                        connected_device.store(Arc::new(None));
                    }
                }
                Ok(MidiOutputCommand::Send { due: None, message }) => {
                    Self::write(&mut connection, &message);
                }
                Ok(MidiOutputCommand::Send {
                    due: Some(due),
                    message,
                }) => {
                    seq += 1;
                    queue.push(Pending { due, seq, message });
                }
                Ok(MidiOutputCommand::Clear) => {
                    if !queue.is_empty() {
                        debug!("Dropping {} queued MIDI message(s)", queue.len());
                    }
                    queue.clear();
                }
                Ok(MidiOutputCommand::Shutdown) => break,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let now = now_ms();
            while queue.peek().is_some_and(|next| next.due <= now) {
                if let Some(pending) = queue.pop() {
                    Self::write(&mut connection, &pending.message);
                }
            }
        }
    }

    fn write(connection: &mut Option<MidiOutputConnection>, message: &MidiOutputMessage) {
        match connection {
            Some(conn) => {
                if let Err(e) = conn.send(&message.bytes) {
                    warn!("MIDI send failed: {e}");
                }
            }
            None => debug!("Cannot send MIDI message: no device connected"),
        }
    }

    fn connect_to_device(device_index: usize) -> Result<(MidiOutputConnection, String)> {
        let midi_output = MidiOutput::new("polybend-output")?;

        let ports = midi_output.ports();
        let port = ports.get(device_index).ok_or_else(|| {
            Error::MidiDevice(format!("MIDI output device {device_index} not found"))
        })?;

        let port_name = midi_output
            .port_name(port)
            .unwrap_or_else(|_| format!("Device {device_index}"));

        let connection = midi_output.connect(port, "polybend-output")?;

        Ok((connection, port_name))
    }

    pub fn list_devices() -> Vec<MidiOutputDevice> {
        let mut devices = Vec::new();
        if let Ok(midi_output) = MidiOutput::new("polybend-device-list") {
            let ports = midi_output.ports();
            for (index, port) in ports.iter().enumerate() {
                let name = midi_output
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {index}"));
                devices.push(MidiOutputDevice { index, name });
            }
        }
        devices
    }

    /// Connects to a device and returns its name once the connection is open.
    pub fn connect(&self, device_index: usize) -> Result<String> {
        let (reply_sender, reply_receiver) = bounded(1);
        self.command_sender
            .send(MidiOutputCommand::Connect(device_index, reply_sender))
            .map_err(|_| Error::MidiDevice("MIDI output thread not running".to_string()))?;
        reply_receiver
            .recv()
            .map_err(|_| Error::MidiDevice("MIDI output thread not running".to_string()))?
    }

    /// Connects to the first device whose name contains `name`, ignoring case.
    pub fn connect_by_name(&self, name: &str) -> Result<String> {
        let devices = Self::list_devices();
        let needle = name.to_lowercase();
        let device = devices
            .iter()
            .find(|d| d.name.to_lowercase().contains(&needle))
            .ok_or_else(|| {
                Error::MidiDevice(format!("No MIDI output device found matching '{name}'"))
            })?;
        self.connect(device.index)
    }

    pub fn disconnect(&self) {
        let _ = self.command_sender.send(MidiOutputCommand::Disconnect);
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    pub fn connected_device_name(&self) -> Option<String> {
        self.connected_device.load().as_ref().clone()
    }

    /// The clock timed messages are scheduled against. Give it to the
    /// output that drives this port.
    pub fn clock(&self) -> SystemClock {
        SystemClock::from_epoch(self.epoch)
    }

    /// Sends immediately, ahead of anything queued.
    pub fn send_now(&self, message: MidiOutputMessage) -> Result<()> {
        self.command(MidiOutputCommand::Send { due: None, message })
    }

    /// Sends once the clock reaches `time` milliseconds.
    pub fn send_at(&self, message: MidiOutputMessage, time: f64) -> Result<()> {
        self.command(MidiOutputCommand::Send {
            due: Some(time),
            message,
        })
    }

    fn command(&self, command: MidiOutputCommand) -> Result<()> {
        self.command_sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => Error::MidiPort("MIDI output queue full".to_string()),
            TrySendError::Disconnected(_) => {
                Error::MidiDevice("MIDI output thread not running".to_string())
            }
        })
    }
}

impl OutputPort for MidiOutputManager {
    fn send_pitch_bend_range(
        &mut self,
        channel: ChannelId,
        semitones: u8,
        cents: u8,
    ) -> Result<()> {
        for message in MidiOutputMessage::pitch_bend_range(channel, semitones, cents) {
            self.send_now(message)?;
        }
        Ok(())
    }

    fn send_pitch_bend(&mut self, channel: ChannelId, normalized: f64, time: f64) -> Result<()> {
        self.send_at(
            MidiOutputMessage::pitch_bend_normalized(channel, normalized),
            time,
        )
    }

    fn send_note_on(
        &mut self,
        channel: ChannelId,
        note: u8,
        velocity: u8,
        time: f64,
    ) -> Result<()> {
        self.send_at(MidiOutputMessage::note_on(channel, note, velocity), time)
    }

    fn send_note_off(
        &mut self,
        channel: ChannelId,
        note: u8,
        velocity: u8,
        time: f64,
    ) -> Result<()> {
        self.send_at(MidiOutputMessage::note_off(channel, note, velocity), time)
    }

    fn send_all_notes_off(&mut self, channel: ChannelId) -> Result<()> {
        self.send_now(MidiOutputMessage::all_notes_off(channel))
    }

    fn clear(&mut self) {
        if let Err(e) = self.command(MidiOutputCommand::Clear) {
            debug!("Could not clear MIDI output queue: {e}");
        }
    }
}

impl Drop for MidiOutputManager {
    fn drop(&mut self) {
        let _ = self.command_sender.send(MidiOutputCommand::Shutdown);
    }
}
