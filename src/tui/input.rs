// Keypad input. Terminal keys stand in for a hardware numeric keypad;
// '*' and '/' are held modifiers, tracked through press/release
// events and resolved here into semantic control events so the
// sequencer never sees key codes.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::shared::{ControlEvent, ControlKind};

#[derive(Clone, Copy, Debug, Default)]
pub struct ModState {
    pub star: bool,
    pub slash: bool,
}

pub fn poll_input(timeout: Duration, mods: &mut ModState) -> anyhow::Result<Vec<ControlEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }
    if let Event::Key(key) = event::read()? {
        match key.kind {
            KeyEventKind::Press => return Ok(handle_press(key.code, mods)),
            KeyEventKind::Release => handle_release(key.code, mods),
            _ => {}
        }
    }
    Ok(vec![])
}

fn handle_press(code: KeyCode, mods: &mut ModState) -> Vec<ControlEvent> {
    let kind = match code {
        KeyCode::Char('*') => {
            mods.star = true;
            return vec![];
        }
        KeyCode::Char('/') => {
            mods.slash = true;
            return vec![];
        }
        KeyCode::Enter => {
            if mods.star {
                ControlKind::SaveToFile
            } else {
                ControlKind::StartStop
            }
        }
        KeyCode::Char('+') => ControlKind::IncreaseTempo,
        KeyCode::Char('-') => ControlKind::DecreaseTempo,
        KeyCode::Char('.') => ControlKind::ToggleMetronome,
        KeyCode::Char('r') => ControlKind::ToggleRecording,
        KeyCode::Backspace => {
            if mods.star {
                ControlKind::ClearSequence
            } else {
                ControlKind::DeleteLast
            }
        }
        KeyCode::Char(c @ '0'..='9') => {
            let slot = c as u8 - b'0';
            if mods.slash {
                ControlKind::SelectSample(slot)
            } else if mods.star {
                ControlKind::Store(slot)
            } else {
                ControlKind::Recall(slot)
            }
        }
        KeyCode::Esc => ControlKind::Quit,
        _ => return vec![],
    };
    vec![ControlEvent {
        kind,
        coarse: mods.star,
        fine: mods.slash,
    }]
}

fn handle_release(code: KeyCode, mods: &mut ModState) {
    match code {
        KeyCode::Char('*') => mods.star = false,
        KeyCode::Char('/') => mods.slash = false,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, mods: &mut ModState) -> Option<ControlEvent> {
        handle_press(code, mods).into_iter().next()
    }

    #[test]
    fn plain_keys_map_directly() {
        let mut mods = ModState::default();
        assert_eq!(
            press(KeyCode::Enter, &mut mods).unwrap().kind,
            ControlKind::StartStop
        );
        assert_eq!(
            press(KeyCode::Char('5'), &mut mods).unwrap().kind,
            ControlKind::Recall(5)
        );
        assert_eq!(
            press(KeyCode::Backspace, &mut mods).unwrap().kind,
            ControlKind::DeleteLast
        );
        assert_eq!(
            press(KeyCode::Esc, &mut mods).unwrap().kind,
            ControlKind::Quit
        );
    }

    #[test]
    fn star_modifier_changes_the_meaning() {
        let mut mods = ModState::default();
        assert!(press(KeyCode::Char('*'), &mut mods).is_none());
        assert!(mods.star);
        assert_eq!(
            press(KeyCode::Char('3'), &mut mods).unwrap().kind,
            ControlKind::Store(3)
        );
        assert_eq!(
            press(KeyCode::Enter, &mut mods).unwrap().kind,
            ControlKind::SaveToFile
        );
        assert_eq!(
            press(KeyCode::Backspace, &mut mods).unwrap().kind,
            ControlKind::ClearSequence
        );
        handle_release(KeyCode::Char('*'), &mut mods);
        assert!(!mods.star);
    }

    #[test]
    fn slash_modifier_selects_samples() {
        let mut mods = ModState::default();
        handle_press(KeyCode::Char('/'), &mut mods);
        assert_eq!(
            press(KeyCode::Char('2'), &mut mods).unwrap().kind,
            ControlKind::SelectSample(2)
        );
    }

    #[test]
    fn tempo_events_carry_the_modifier_flags() {
        let mut mods = ModState::default();
        handle_press(KeyCode::Char('*'), &mut mods);
        handle_press(KeyCode::Char('/'), &mut mods);
        let ev = press(KeyCode::Char('+'), &mut mods).unwrap();
        assert_eq!(ev.kind, ControlKind::IncreaseTempo);
        assert!(ev.coarse);
        assert!(ev.fine);
    }

    #[test]
    fn unmapped_keys_produce_nothing() {
        let mut mods = ModState::default();
        assert!(handle_press(KeyCode::Char('x'), &mut mods).is_empty());
        assert!(handle_press(KeyCode::Tab, &mut mods).is_empty());
    }
}
