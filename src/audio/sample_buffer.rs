// Decoded audio data and its identifiers. All decoding happens at
// startup on the main thread; the audio callback only ever sees
// preloaded buffers.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// One stereo frame, the unit the engine mixes in.
#[derive(Clone, Copy, Debug, Default)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SampleId(pub u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

// atomic counter so ids can be handed out from any thread
pub fn next_sample_id() -> SampleId {
    SampleId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Clone, Debug)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>,
}

impl SampleBuffer {
    /// Decode a WAV file into stereo frames at `target_rate`. Mono
    /// files are duplicated onto both channels; extra channels beyond
    /// the first two are dropped.
    pub fn load_wav(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<_, _>>()?
            }
        };

        let mut frames: Vec<StereoFrame> = samples
            .chunks_exact(channels)
            .map(|frame| {
                let left = frame[0];
                let right = if channels > 1 { frame[1] } else { left };
                StereoFrame { left, right }
            })
            .collect();

        if spec.sample_rate != target_rate {
            frames = resample_linear(&frames, spec.sample_rate, target_rate);
        }

        Ok(Self { data: frames })
    }
}

// Linear-interpolation resampler. Good enough for drum hits; anything
// fancier belongs in an offline tool.
fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || frames.is_empty() {
        return frames.to_vec();
    }
    let ratio = f64::from(target_rate) / f64::from(source_rate);
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        if idx + 1 >= frames.len() {
            out.push(frames.last().copied().unwrap_or_default());
            continue;
        }
        let frac = (src_pos - idx as f64) as f32;
        let a = frames[idx];
        let b = frames[idx + 1];
        out.push(StereoFrame {
            left: a.left + (b.left - a.left) * frac,
            right: a.right + (b.right - a.right) * frac,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = next_sample_id();
        let b = next_sample_id();
        assert_ne!(a, b);
    }

    #[test]
    fn resampling_scales_the_length() {
        let frames = vec![
            StereoFrame {
                left: 0.0,
                right: 0.0
            };
            100
        ];
        let out = resample_linear(&frames, 22050, 44100);
        assert_eq!(out.len(), 200);
        let out = resample_linear(&frames, 44100, 44100);
        assert_eq!(out.len(), 100);
    }

    #[test]
    fn resampling_interpolates_between_frames() {
        let frames = vec![
            StereoFrame {
                left: 0.0,
                right: 0.0,
            },
            StereoFrame {
                left: 1.0,
                right: 1.0,
            },
        ];
        let out = resample_linear(&frames, 10, 20);
        assert_eq!(out.len(), 4);
        assert!((out[1].left - 0.5).abs() < 1e-6);
    }
}
