mod audio;
mod audio_api;
mod display;
mod error;
mod loader;
mod midi;
mod pipeline;
mod seq;
mod shared;
mod tui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use audio_api::{NullSoundBank, SoundBank};
use display::{LcdPanel, LcdScreen};
use pipeline::persistence;
use seq::clock::TimeSignature;
use seq::engine::{self, SeqEngine};
use seq::scheduler::Sequencer;
use seq::sequence::Sequence;
use shared::{
    ControlKind, DEFAULT_BEATS_PER_MEASURE, DEFAULT_BPM, DEFAULT_MEASURES, DEFAULT_SUB_BEATS,
};
use tui::input::ModState;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

struct Args {
    bpm: u32,
    measures: u32,
    beats: u32,
    sub_beats: u32,
    swing: bool,
    load: Vec<(PathBuf, usize)>,
    samples_dir: PathBuf,
    midi_port: usize,
    log_level: Option<String>,
    // whether any timing/sequence argument was given; if not, the
    // default scene is loaded and played
    explicit: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            measures: DEFAULT_MEASURES,
            beats: DEFAULT_BEATS_PER_MEASURE,
            sub_beats: DEFAULT_SUB_BEATS,
            swing: false,
            load: Vec::new(),
            samples_dir: PathBuf::from("samples"),
            midi_port: 1,
            log_level: None,
            explicit: false,
        }
    }
}

const USAGE: &str = "usage: padseq [--bpm N] [--measures N] [--beats N] [--sub-beats N] \
[--swing] [--load FILE[,SLOT]]... [--samples DIR] [--midi-port N] [--log-level LEVEL]";

fn next_value(it: &mut impl Iterator<Item = String>, name: &str) -> anyhow::Result<String> {
    it.next().ok_or_else(|| anyhow::anyhow!("{name} needs a value"))
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--bpm" => {
                args.bpm = next_value(&mut it, "--bpm")?.parse()?;
                args.explicit = true;
            }
            "--measures" => {
                args.measures = next_value(&mut it, "--measures")?.parse()?;
                args.explicit = true;
            }
            "--beats" => {
                args.beats = next_value(&mut it, "--beats")?.parse()?;
                args.explicit = true;
            }
            "--sub-beats" => {
                args.sub_beats = next_value(&mut it, "--sub-beats")?.parse()?;
                args.explicit = true;
            }
            "--swing" => {
                args.swing = true;
                args.explicit = true;
            }
            "--load" => {
                let spec = next_value(&mut it, "--load")?;
                let (file, slot) = match spec.split_once(',') {
                    Some((file, slot)) => (file.to_string(), slot.trim().parse()?),
                    None => (spec, 0),
                };
                args.load.push((PathBuf::from(file), slot));
                args.explicit = true;
            }
            "--samples" => args.samples_dir = PathBuf::from(next_value(&mut it, "--samples")?),
            "--midi-port" => args.midi_port = next_value(&mut it, "--midi-port")?.parse()?,
            "--log-level" => args.log_level = Some(next_value(&mut it, "--log-level")?),
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument: {other}\n{USAGE}"),
        }
    }
    Ok(args)
}

fn init_logging(level: Option<&str>) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = level {
        let filter: log::LevelFilter = level
            .parse()
            .map_err(|_| anyhow::anyhow!("bad log level: {level}"))?;
        builder.filter_level(filter);
    }
    builder.init();
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let args = parse_args()?;
    init_logging(args.log_level.as_deref())?;

    let time_sig = TimeSignature::new(args.measures, args.beats, args.sub_beats)?;

    // audio, degrading to silence when no output device is around
    let (_audio_guard, sound): (Option<audio::AudioOutput>, Arc<dyn SoundBank>) =
        match audio::start_audio(&args.samples_dir) {
            Ok((output, player)) => (Some(output), Arc::new(player)),
            Err(e) => {
                log::warn!("audio unavailable ({e:#}); running silent");
                (None, Arc::new(NullSoundBank))
            }
        };

    let (panel, lcd_rx) = LcdPanel::new();
    let seq_engine = SeqEngine::new(
        Sequence::new(time_sig),
        args.bpm,
        args.swing,
        Arc::clone(&sound),
        Box::new(panel),
    );
    let sequencer = Sequencer::new(seq_engine, PathBuf::from(persistence::SAVE_DIR));

    // initial sequences: explicit files, or the default scene
    if args.load.is_empty() && !args.explicit {
        if let Some(preset) = engine::scene_preset(0) {
            let path = PathBuf::from(persistence::SAVE_DIR).join(preset.file);
            if let Err(e) = sequencer.load_into_slot(&path, 0) {
                log::warn!("no default sequence ({e:#}); starting empty");
            }
        }
    } else {
        for (path, slot) in &args.load {
            sequencer.load_into_slot(path, *slot)?;
        }
    }

    // the note worker owns the receiving end of the MIDI channel and
    // drives the core; the MIDI callback thread only ever enqueues
    let (note_tx, note_rx) = crossbeam_channel::bounded(256);
    let _midi_connection = midi::start_midi(args.midi_port, note_tx);
    {
        let sequencer = sequencer.clone();
        std::thread::Builder::new()
            .name("note-worker".into())
            .spawn(move || {
                for event in note_rx.iter() {
                    sequencer.handle_note_event(event);
                }
            })?;
    }

    sequencer.start();

    terminal::enable_raw_mode()?;
    // Real press/release detection for the modifier keys.
    // Falls back gracefully if the terminal doesn't support it.
    let _ = crossterm::execute!(
        std::io::stdout(),
        crossterm::event::PushKeyboardEnhancementFlags(
            crossterm::event::KeyboardEnhancementFlags::REPORT_EVENT_TYPES
        )
    );
    let _guard = RawModeGuard; // auto drops when out of scope
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let mut lcd = LcdScreen::new();
    let mut mods = ModState::default();
    let tick_rate = Duration::from_millis(33);

    loop {
        while let Ok(update) = lcd_rx.try_recv() {
            lcd.apply(&update);
        }
        term.draw(|frame| tui::view::render(frame, frame.area(), &lcd))?;

        for event in tui::input::poll_input(tick_rate, &mut mods)? {
            if event.kind == ControlKind::Quit {
                sequencer.stop();
                drop(term);
                return Ok(());
            }
            sequencer.handle_control(event);
        }
    }
}

struct RawModeGuard;

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::event::PopKeyboardEnhancementFlags
        );
        let _ = terminal::disable_raw_mode();
    }
}
