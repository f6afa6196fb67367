// Sample library loading. Scans the samples directory for sample-set
// subdirectories, decodes every WAV up front, and hands back the
// buffers for registration with the audio engine.

use std::path::{Path, PathBuf};

use crate::audio::{SampleBuffer, SampleId, next_sample_id};
use crate::shared::SAMPLES_PER_SET;

// The metronome lives in its own directory and is not a playable set.
pub const METRONOME_DIR: &str = "_metronome";
const CLICK_FILE: &str = "click.wav";
const CHIME_FILE: &str = "chime.wav";

pub struct SampleSet {
    pub name: String,
    pub samples: Vec<SampleId>,
}

pub struct SampleLibrary {
    pub sets: Vec<SampleSet>,
    pub metro_click: Option<SampleId>,
    pub metro_chime: Option<SampleId>,
}

impl SampleLibrary {
    pub fn empty() -> Self {
        Self {
            sets: Vec::new(),
            metro_click: None,
            metro_chime: None,
        }
    }
}

/// Build the library from `dir`, decoding at `target_rate`. Missing
/// directories and undecodable files degrade to a smaller library
/// rather than failing startup; the sequencer must run regardless.
pub fn scan(dir: &Path, target_rate: u32) -> (SampleLibrary, Vec<(SampleId, SampleBuffer)>) {
    let mut library = SampleLibrary::empty();
    let mut buffers = Vec::new();

    let mut set_dirs = match subdirectories(dir) {
        Ok(dirs) => dirs,
        Err(e) => {
            log::warn!("cannot scan samples directory {}: {e}", dir.display());
            return (library, buffers);
        }
    };
    set_dirs.sort();

    for set_dir in set_dirs {
        let name = set_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name == METRONOME_DIR {
            library.metro_click = load_one(&set_dir.join(CLICK_FILE), target_rate, &mut buffers);
            library.metro_chime = load_one(&set_dir.join(CHIME_FILE), target_rate, &mut buffers);
            continue;
        }

        let mut wavs = match wav_files(&set_dir) {
            Ok(w) => w,
            Err(e) => {
                log::warn!("cannot read sample set {}: {e}", set_dir.display());
                continue;
            }
        };
        wavs.sort();

        let mut samples = Vec::new();
        for wav in wavs.into_iter().take(SAMPLES_PER_SET) {
            if let Some(id) = load_one(&wav, target_rate, &mut buffers) {
                samples.push(id);
            }
        }
        log::info!("sample set {name}: {} samples", samples.len());
        library.sets.push(SampleSet { name, samples });
    }

    if library.metro_click.is_none() {
        log::warn!("no metronome samples found; metronome will be silent");
    }

    (library, buffers)
}

fn load_one(
    path: &Path,
    target_rate: u32,
    buffers: &mut Vec<(SampleId, SampleBuffer)>,
) -> Option<SampleId> {
    match SampleBuffer::load_wav(path, target_rate) {
        Ok(buffer) => {
            let id = next_sample_id();
            buffers.push((id, buffer));
            Some(id)
        }
        Err(e) => {
            log::warn!("skipping {}: {e:#}", path.display());
            None
        }
    }
}

fn subdirectories(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            out.push(path);
        }
    }
    Ok(out)
}

fn wav_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_wav = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        if path.is_file() && is_wav {
            out.push(path);
        }
    }
    Ok(out)
}
