// Drives the clock. A dedicated thread fires once per half-interval,
// anchored to an absolute schedule so execution latency never
// accumulates into drift.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::pipeline::persistence;
use crate::seq::engine::{self, SeqEngine};
use crate::shared::{ControlEvent, ControlKind, NoteEvent};

/// Monotonic deadline keeper. Each firing bumps the deadline by the
/// current interval from the *previous target*, never from "now", so
/// a slow firing is followed by a short sleep instead of a shifted
/// grid. Missed deadlines are not coalesced.
pub(crate) struct Pacer {
    next: Instant,
}

impl Pacer {
    pub(crate) fn new(start: Instant) -> Self {
        Self { next: start }
    }

    pub(crate) fn arm(&mut self, interval: Duration) -> Instant {
        self.next += interval;
        self.next
    }

    pub(crate) fn sleep_until_next(&self) {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
        }
    }
}

/// The top-level sequencer handle: owns the shared engine state and
/// the scheduler lifecycle, and dispatches control and note events
/// into it. Clones share the same engine.
#[derive(Clone)]
pub struct Sequencer {
    state: Arc<Mutex<SeqEngine>>,
    save_dir: PathBuf,
}

impl Sequencer {
    pub fn new(engine: SeqEngine, save_dir: PathBuf) -> Self {
        Self {
            state: Arc::new(Mutex::new(engine)),
            save_dir,
        }
    }

    /// Stopped -> Running: reset the clock and spawn a scheduler
    /// thread whose first firing is due immediately. No-op while
    /// already running. A spawn failure is fatal to playback and
    /// leaves the sequencer stopped.
    pub fn start(&self) {
        let epoch = {
            let mut guard = self.state.lock().unwrap();
            if guard.running {
                return;
            }
            guard.running = true;
            guard.epoch = guard.epoch.wrapping_add(1);
            guard.clock.reset();
            guard.epoch
        };
        let state = Arc::clone(&self.state);
        let spawned = thread::Builder::new()
            .name("scheduler".into())
            .spawn(move || run_loop(state, epoch));
        if let Err(e) = spawned {
            log::error!("cannot spawn scheduler thread: {e}");
            self.state.lock().unwrap().running = false;
        }
    }

    /// Running -> Stopped; idempotent. Once this returns, any firing
    /// already inside its critical section finishes, and nothing
    /// fires after it: the loop rechecks the flag under the same lock
    /// before every firing.
    pub fn stop(&self) {
        self.state.lock().unwrap().running = false;
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    pub fn handle_note_event(&self, event: NoteEvent) {
        match event {
            NoteEvent::NoteOn(note) => self.state.lock().unwrap().handle_note_on(note),
            NoteEvent::SceneChange(id) => self.apply_scene(id),
        }
    }

    pub fn handle_control(&self, event: ControlEvent) {
        use ControlKind::*;
        match event.kind {
            StartStop => {
                if self.is_running() {
                    log::info!("sequencer stopped");
                    self.stop();
                } else {
                    log::info!("sequencer started");
                    self.start();
                }
            }
            // file I/O stays outside the state lock
            SaveToFile => self.save_current(),
            Quit => {}
            kind => {
                let mut guard = self.state.lock().unwrap();
                match kind {
                    IncreaseTempo => guard.adjust_tempo(true, event.coarse, event.fine),
                    DecreaseTempo => guard.adjust_tempo(false, event.coarse, event.fine),
                    ToggleMetronome => {
                        let on = guard.toggle_metronome();
                        log::info!("metronome {}", if on { "on" } else { "off" });
                    }
                    ToggleRecording => {
                        let on = guard.toggle_recording();
                        log::info!("recording {}", if on { "on" } else { "off" });
                    }
                    DeleteLast => guard.delete_last_note(),
                    ClearSequence => {
                        log::info!("clearing current sequence");
                        guard.clear_current();
                    }
                    Store(slot) => {
                        if let Err(e) = guard.store(slot as usize) {
                            log::warn!("store: {e}");
                        }
                    }
                    Recall(slot) => {
                        if let Err(e) = guard.recall(slot as usize) {
                            log::warn!("recall: {e}");
                        }
                    }
                    SelectSample(slot) => guard.select_sample_set(slot as usize),
                    StartStop | SaveToFile | Quit => unreachable!(),
                }
            }
        }
    }

    /// Switch to a scene preset: stop, load its sequence file, apply
    /// tempo/swing/kit, restart. A failed load keeps the previous
    /// sequence and restarts anyway.
    pub fn apply_scene(&self, id: u8) {
        let Some(preset) = engine::scene_preset(id) else {
            log::info!("ignoring unknown scene {id}");
            return;
        };
        log::info!("scene {id}: {}", preset.file);
        self.stop();
        match persistence::load_sequence(&self.save_dir.join(preset.file)) {
            Ok(sequence) => {
                let mut guard = self.state.lock().unwrap();
                guard.set_current(sequence);
                guard.set_bpm(preset.bpm);
                guard.set_swing(preset.swing);
                guard.select_sample_set_by_name(preset.sample_set);
                guard.update_settings();
            }
            Err(e) => log::warn!("scene {id}: {e:#}"),
        }
        self.start();
    }

    /// Load a sequence file into a bank slot and make it current.
    pub fn load_into_slot(&self, path: &Path, slot: usize) -> anyhow::Result<()> {
        let sequence = persistence::load_sequence(path)?;
        log::info!("loaded {} into slot {slot}", path.display());
        self.state.lock().unwrap().install(sequence, slot)?;
        Ok(())
    }

    fn save_current(&self) {
        let snapshot = self.state.lock().unwrap().snapshot_current();
        match persistence::save_sequence(&self.save_dir, &snapshot) {
            Ok(path) => log::info!("saved sequence to {}", path.display()),
            Err(e) => log::warn!("save failed: {e:#}"),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_engine<R>(&self, f: impl FnOnce(&mut SeqEngine) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

fn run_loop(state: Arc<Mutex<SeqEngine>>, epoch: u64) {
    let mut pacer = Pacer::new(Instant::now());
    loop {
        {
            let mut guard = state.lock().unwrap();
            if !guard.running || guard.epoch != epoch {
                break;
            }
            guard.fire();
            // re-arm before releasing the lock: previous target plus
            // the interval for the position we just advanced to
            pacer.arm(guard.interval());
        }
        pacer.sleep_until_next();
    }
}
