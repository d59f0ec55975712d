use polybend_midi_io::{MidiInputManager, MidiOutputManager};

fn main() {
    println!("=== MIDI Input Devices ===");
    let inputs = MidiInputManager::list_devices();
    if inputs.is_empty() {
        println!("  (none found)");
    }
    for dev in &inputs {
        println!("  [{}] {}", dev.index, dev.name);
    }

    println!("\n=== MIDI Output Devices ===");
    let outputs = MidiOutputManager::list_devices();
    if outputs.is_empty() {
        println!("  (none found)");
    }
    for dev in &outputs {
        println!("  [{}] {}", dev.index, dev.name);
    }
}
