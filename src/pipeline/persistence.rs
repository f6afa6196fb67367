// Sequence files: pretty-printed JSON under the saved-sequences
// directory. Loading validates the grid against the declared time
// signature so a corrupt or foreign file is rejected instead of
// producing a sequence that indexes out of bounds.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::seq::sequence::Sequence;

pub const SAVE_DIR: &str = "savedSequences";

pub fn load_sequence(path: &Path) -> anyhow::Result<Sequence> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let sequence: Sequence =
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    sequence
        .validate()
        .with_context(|| format!("validating {}", path.display()))?;
    Ok(sequence)
}

/// Save under a timestamped name, creating the directory if needed.
/// Returns the path written.
pub fn save_sequence(dir: &Path, sequence: &Sequence) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating {}", dir.display()))?;
    let name = format!(
        "sequence{}.json",
        chrono::Local::now().format("%Y_%m_%d__%H_%M")
    );
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(sequence)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
