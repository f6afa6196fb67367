// One playback voice: plays a registered sample front to back at a
// fixed gain, then frees itself.

use super::sample_buffer::{SampleBuffer, SampleId, StereoFrame};

#[derive(Clone, Copy, Debug)]
pub struct Voice {
    pub sample: SampleId,
    pub gain: f32,
    pub active: bool,
    // monotonic trigger ordinal; the engine steals the voice with the
    // smallest one when the pool is full
    pub started: u64,
    pos: usize,
}

impl Voice {
    pub fn new(sample: SampleId, gain: f32, started: u64) -> Self {
        Self {
            sample,
            gain,
            active: true,
            started,
            pos: 0,
        }
    }

    /// Mix this voice into `out`, advancing the playback position.
    pub fn render_into(&mut self, buffer: &SampleBuffer, out: &mut [StereoFrame]) {
        if !self.active {
            return;
        }
        for frame in out.iter_mut() {
            let Some(sample) = buffer.data.get(self.pos) else {
                self.active = false;
                return;
            };
            frame.left += sample.left * self.gain;
            frame.right += sample.right * self.gain;
            self.pos += 1;
        }
        if self.pos >= buffer.data.len() {
            self.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(len: usize) -> SampleBuffer {
        SampleBuffer {
            data: vec![
                StereoFrame {
                    left: 1.0,
                    right: 1.0,
                };
                len
            ],
        }
    }

    #[test]
    fn renders_with_gain_and_finishes() {
        let buf = buffer(3);
        let mut voice = Voice::new(SampleId(0), 0.5, 1);
        let mut out = [StereoFrame::default(); 4];
        voice.render_into(&buf, &mut out);
        assert!((out[0].left - 0.5).abs() < 1e-6);
        assert!((out[2].right - 0.5).abs() < 1e-6);
        assert_eq!(out[3].left, 0.0);
        assert!(!voice.active);
    }

    #[test]
    fn accumulates_across_blocks() {
        let buf = buffer(8);
        let mut voice = Voice::new(SampleId(0), 1.0, 1);
        let mut out = [StereoFrame::default(); 4];
        voice.render_into(&buf, &mut out);
        assert!(voice.active);
        voice.render_into(&buf, &mut out);
        assert!(!voice.active);
        // both passes mixed in
        assert!((out[0].left - 2.0).abs() < 1e-6);
    }
}
