//! MIDI input manager.
//!
//! Handles device enumeration and connection on a dedicated thread, and
//! dispatches parsed note messages to registered listeners.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use midir::{Ignore, MidiInput, MidiInputConnection};
use tracing::debug;

use crate::error::{Error, Result};
use crate::input::{InputPort, ListenerRegistry, NoteListener};

#[derive(Debug, Clone)]
pub struct MidiInputDevice {
    pub index: usize,
    pub name: String,
}

enum MidiInputCommand {
    Connect(usize, Sender<Result<String>>),
    Disconnect,
    Shutdown,
}

/// Hardware MIDI input. Note-on and note-off messages reach every listener
/// added through [`InputPort`]; everything else is dropped.
pub struct MidiInputManager {
    registry: Arc<ListenerRegistry>,
    command_sender: Sender<MidiInputCommand>,
    connected_device: Arc<ArcSwap<Option<String>>>,
    is_connected: Arc<AtomicBool>,
}

impl MidiInputManager {
    pub fn new() -> Result<Self> {
        let (command_sender, command_receiver) = bounded(16);
        let registry = Arc::new(ListenerRegistry::new());
        let connected_device = Arc::new(ArcSwap::new(Arc::new(None)));
        let is_connected = Arc::new(AtomicBool::new(false));

        let registry_clone = Arc::clone(&registry);
        let connected_device_clone = Arc::clone(&connected_device);
        let is_connected_clone = Arc::clone(&is_connected);

        thread::Builder::new()
            .name("polybend-midi-input".to_string())
            .spawn(move || {
                Self::midi_thread(
                    command_receiver,
                    registry_clone,
                    connected_device_clone,
                    is_connected_clone,
                );
            })
            .map_err(|e| Error::MidiDevice(format!("Failed to spawn MIDI input thread: {e}")))?;

        Ok(Self {
            registry,
            command_sender,
            connected_device,
            is_connected,
        })
    }

    fn midi_thread(
        command_receiver: Receiver<MidiInputCommand>,
        registry: Arc<ListenerRegistry>,
        connected_device: Arc<ArcSwap<Option<String>>>,
        is_connected: Arc<AtomicBool>,
    ) {
        let mut connection: Option<MidiInputConnection<()>> = None;

        loop {
            match command_receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(MidiInputCommand::Connect(device_index, reply)) => {
                    if connection.take().is_some() {
                        is_connected.store(false, Ordering::SeqCst);
                        connected_device.store(Arc::new(None));
                    }

                    match Self::connect_to_device(device_index, Arc::clone(&registry)) {
                        Ok((conn, name)) => {
                            connection = Some(conn);
                            is_connected.store(true, Ordering::SeqCst);
                            connected_device.store(Arc::new(Some(name.clone())));
                            debug!("Connected MIDI input '{name}'");
                            let _ = reply.send(Ok(name));
                        }
                        Err(e) => {
                            let _ = reply.send(Err(e));
                        }
                    }
                }
                Ok(MidiInputCommand::Disconnect) => {
                    if connection.take().is_some() {
                        is_connected.store(false, Ordering::SeqCst);
                        connected_device.store(Arc::new(None));
                    }
                }
                Ok(MidiInputCommand::Shutdown) => break,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn connect_to_device(
        device_index: usize,
        registry: Arc<ListenerRegistry>,
    ) -> Result<(MidiInputConnection<()>, String)> {
        let mut midi_input = MidiInput::new("polybend-input")?;
        midi_input.ignore(Ignore::All);

        let ports = midi_input.ports();
        let port = ports.get(device_index).ok_or_else(|| {
            Error::MidiDevice(format!("MIDI input device {device_index} not found"))
        })?;

        let port_name = midi_input
            .port_name(port)
            .unwrap_or_else(|_| format!("Device {device_index}"));

        let connection = midi_input.connect(
            port,
            "polybend-input",
            move |_timestamp, message, _| {
                if let Err(e) = registry.dispatch_bytes(message) {
                    debug!("Failed to parse MIDI message {:02X?}: {}", message, e);
                }
            },
            (),
        )?;

        Ok((connection, port_name))
    }

    pub fn list_devices() -> Vec<MidiInputDevice> {
        let mut devices = Vec::new();
        if let Ok(midi_input) = MidiInput::new("polybend-device-list") {
            let ports = midi_input.ports();
            for (index, port) in ports.iter().enumerate() {
                let name = midi_input
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {index}"));
                devices.push(MidiInputDevice { index, name });
            }
        }
        devices
    }

    /// Connects to a device and returns its name once the connection is open.
    pub fn connect(&self, device_index: usize) -> Result<String> {
        let (reply_sender, reply_receiver) = bounded(1);
        self.command_sender
            .send(MidiInputCommand::Connect(device_index, reply_sender))
            .map_err(|_| Error::MidiDevice("MIDI input thread not running".to_string()))?;
        reply_receiver
            .recv()
            .map_err(|_| Error::MidiDevice("MIDI input thread not running".to_string()))?
    }

    /// Connects to the first device whose name contains `name`, ignoring case.
    pub fn connect_by_name(&self, name: &str) -> Result<String> {
        let devices = Self::list_devices();
        let needle = name.to_lowercase();
        let device = devices
            .iter()
            .find(|d| d.name.to_lowercase().contains(&needle))
            .ok_or_else(|| {
                Error::MidiDevice(format!("No MIDI input device found matching '{name}'"))
            })?;
        self.connect(device.index)
    }

    pub fn disconnect(&self) {
        let _ = self.command_sender.send(MidiInputCommand::Disconnect);
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    pub fn connected_device_name(&self) -> Option<String> {
        self.connected_device.load().as_ref().clone()
    }
}

impl InputPort for MidiInputManager {
    fn add_listener(&self, listener: Arc<dyn NoteListener>) -> bool {
        self.registry.add(listener)
    }

    fn remove_listener(&self, listener: &Arc<dyn NoteListener>) -> bool {
        self.registry.remove(listener)
    }
}

impl Drop for MidiInputManager {
    fn drop(&mut self) {
        let _ = self.command_sender.send(MidiInputCommand::Shutdown);
    }
}
