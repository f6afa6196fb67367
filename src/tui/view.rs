// Renders the LCD panel and a key reference. The TUI holds no
// sequencer state of its own: it paints whatever the display channel
// delivered into the LcdScreen.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph};

use crate::display::LcdScreen;

pub fn render(frame: &mut Frame, area: Rect, lcd: &LcdScreen) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // the lcd panel
            Constraint::Min(0),    // key reference
        ])
        .split(area);

    draw_lcd(frame, sections[0], lcd);
    draw_help(frame, sections[1]);
}

fn draw_lcd(frame: &mut Frame, area: Rect, lcd: &LcdScreen) {
    let lines = vec![Line::from(lcd.line(0)), Line::from(lcd.line(1))];
    let panel = Paragraph::new(lines)
        .style(Style::default().fg(Color::Green))
        .block(Block::bordered().title("padseq"));
    frame.render_widget(panel, area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from("Enter start/stop   */Enter save to file   .  metronome"),
        Line::from("+/- tempo (5bpm, *x2, /:5)   r record   Bksp delete last"),
        Line::from("0-9 recall   *0-9 store   /0-9 sample set   Esc quit"),
    ];
    let help = Paragraph::new(lines).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, area);
}
