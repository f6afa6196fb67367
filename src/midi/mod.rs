// MIDI note source. The midir callback runs on its own thread and
// forwards parsed events over a bounded channel; the sequencer never
// blocks on MIDI I/O, and a missing device just means no note input.

use crossbeam_channel::Sender;
use midir::{MidiInput, MidiInputConnection};

use crate::shared::{Note, NoteEvent};

/// Connect to the input port at `port_index` (falling back to the
/// first port) and start forwarding events. Returns None, with a
/// warning, when MIDI is unavailable; the caller keeps running.
pub fn start_midi(port_index: usize, tx: Sender<NoteEvent>) -> Option<MidiInputConnection<()>> {
    let midi_in = match MidiInput::new("padseq input") {
        Ok(m) => m,
        Err(e) => {
            log::warn!("MIDI init failed: {e}");
            return None;
        }
    };

    let ports = midi_in.ports();
    if ports.is_empty() {
        log::warn!("no MIDI input ports; running without note input");
        return None;
    }
    for (i, port) in ports.iter().enumerate() {
        log::info!(
            "MIDI port {i}: {}",
            midi_in.port_name(port).unwrap_or_default()
        );
    }
    let port = ports.get(port_index).unwrap_or(&ports[0]);
    let port_name = midi_in.port_name(port).unwrap_or_default();

    let connection = midi_in.connect(
        port,
        "padseq",
        move |_timestamp, message, _| {
            if let Some(event) = parse_message(message) {
                if tx.try_send(event).is_err() {
                    log::warn!("note channel full, dropping event");
                }
            }
        },
        (),
    );

    match connection {
        Ok(conn) => {
            log::info!("listening on MIDI port: {port_name}");
            Some(conn)
        }
        Err(e) => {
            log::warn!("MIDI connect failed: {e}");
            None
        }
    }
}

/// Raw bytes -> events we care about. Note-ons with velocity, and the
/// pad controller's sysex scene messages, where the scene id is the
/// byte just before the trailing 0xF7.
fn parse_message(message: &[u8]) -> Option<NoteEvent> {
    let status = *message.first()?;
    if status == 0xF0 {
        if message.len() >= 3 {
            return Some(NoteEvent::SceneChange(message[message.len() - 2]));
        }
        return None;
    }
    if status & 0xF0 == 0x90 {
        let note = *message.get(1)?;
        let velocity = *message.get(2)?;
        // velocity 0 is a note-off in disguise
        if velocity > 0 {
            return Some(NoteEvent::NoteOn(Note(note)));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_with_velocity() {
        assert_eq!(
            parse_message(&[0x90, 36, 100]),
            Some(NoteEvent::NoteOn(Note(36)))
        );
        // any channel
        assert_eq!(
            parse_message(&[0x93, 40, 1]),
            Some(NoteEvent::NoteOn(Note(40)))
        );
    }

    #[test]
    fn zero_velocity_is_ignored() {
        assert_eq!(parse_message(&[0x90, 36, 0]), None);
    }

    #[test]
    fn note_off_and_other_messages_are_ignored() {
        assert_eq!(parse_message(&[0x80, 36, 64]), None);
        assert_eq!(parse_message(&[0xB0, 1, 2]), None);
        assert_eq!(parse_message(&[]), None);
    }

    #[test]
    fn sysex_scene_change() {
        assert_eq!(
            parse_message(&[0xF0, 0x42, 0x00, 0x02, 0xF7]),
            Some(NoteEvent::SceneChange(2))
        );
        assert_eq!(parse_message(&[0xF0, 0xF7]), None);
    }
}
