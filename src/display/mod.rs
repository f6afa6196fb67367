// Status display collaborator: a 2x16 LCD-style panel. The sequencer
// writes positioned text fields, fire-and-forget; the TUI paints the
// resulting character grid each frame.

use crossbeam_channel::{Receiver, Sender};

pub const LCD_ROWS: usize = 2;
pub const LCD_COLS: usize = 16;

pub trait StatusDisplay: Send {
    /// Write `text` starting at (row, col). Out-of-range rows and any
    /// overflow past the end of a row are dropped silently; no status
    /// write may ever block or fail the caller.
    fn set_field(&mut self, row: usize, col: usize, text: &str);
}

#[derive(Clone, Debug)]
pub struct FieldUpdate {
    pub row: usize,
    pub col: usize,
    pub text: String,
}

/// Channel-backed display handle. Updates are forwarded to whoever
/// owns the receiving end (the TUI loop); if nobody is draining them
/// they are dropped, which is the headless behaviour we want.
pub struct LcdPanel {
    tx: Sender<FieldUpdate>,
}

impl LcdPanel {
    pub fn new() -> (Self, Receiver<FieldUpdate>) {
        let (tx, rx) = crossbeam_channel::bounded(256);
        (Self { tx }, rx)
    }
}

impl StatusDisplay for LcdPanel {
    fn set_field(&mut self, row: usize, col: usize, text: &str) {
        let _ = self.tx.try_send(FieldUpdate {
            row,
            col,
            text: text.to_string(),
        });
    }
}

/// Display stand-in for headless runs.
pub struct NullDisplay;

impl StatusDisplay for NullDisplay {
    fn set_field(&mut self, _row: usize, _col: usize, _text: &str) {}
}

/// The character cell grid the TUI renders from.
pub struct LcdScreen {
    cells: [[char; LCD_COLS]; LCD_ROWS],
}

impl LcdScreen {
    pub fn new() -> Self {
        Self {
            cells: [[' '; LCD_COLS]; LCD_ROWS],
        }
    }

    pub fn apply(&mut self, update: &FieldUpdate) {
        let Some(row) = self.cells.get_mut(update.row) else {
            return;
        };
        for (i, ch) in update.text.chars().enumerate() {
            match row.get_mut(update.col + i) {
                Some(cell) => *cell = ch,
                None => break,
            }
        }
    }

    pub fn line(&self, row: usize) -> String {
        self.cells[row].iter().collect()
    }
}

impl Default for LcdScreen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_land_at_their_position() {
        let mut screen = LcdScreen::new();
        screen.apply(&FieldUpdate {
            row: 0,
            col: 6,
            text: "bpm:".into(),
        });
        assert_eq!(screen.line(0), "      bpm:      ");
    }

    #[test]
    fn overflow_is_clipped() {
        let mut screen = LcdScreen::new();
        screen.apply(&FieldUpdate {
            row: 1,
            col: 14,
            text: "12345".into(),
        });
        assert_eq!(screen.line(1), "              12");
        // bad row: dropped, no panic
        screen.apply(&FieldUpdate {
            row: 7,
            col: 0,
            text: "x".into(),
        });
    }

    #[test]
    fn panel_forwards_updates() {
        let (mut panel, rx) = LcdPanel::new();
        panel.set_field(1, 4, "7");
        let update = rx.try_recv().unwrap();
        assert_eq!((update.row, update.col, update.text.as_str()), (1, 4, "7"));
    }
}
