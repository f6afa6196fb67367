// The time-signature-aware tick counter. Pure data and arithmetic;
// the scheduler drives it, live input reads it.

use serde::{Deserialize, Serialize};

use crate::error::SeqError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub measures: u32,
    pub beats_per_measure: u32,
    pub sub_beats_per_beat: u32,
}

impl TimeSignature {
    pub fn new(
        measures: u32,
        beats_per_measure: u32,
        sub_beats_per_beat: u32,
    ) -> Result<Self, SeqError> {
        let sig = Self {
            measures,
            beats_per_measure,
            sub_beats_per_beat,
        };
        sig.validate()?;
        Ok(sig)
    }

    /// Also applied to signatures arriving from deserialized files,
    /// which bypass `new`.
    pub fn validate(&self) -> Result<(), SeqError> {
        if self.measures == 0 {
            return Err(SeqError::InvalidTimeSignature("measures must be at least 1"));
        }
        if self.beats_per_measure == 0 {
            return Err(SeqError::InvalidTimeSignature(
                "beats per measure must be at least 1",
            ));
        }
        if self.sub_beats_per_beat == 0 {
            return Err(SeqError::InvalidTimeSignature(
                "sub-beats per beat must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn total_ticks(&self) -> usize {
        (self.measures * self.beats_per_measure * self.sub_beats_per_beat) as usize
    }
}

/// Current position in the sequence: measure, beat, sub-beat, all
/// 0-indexed, plus the half-tick phase.
///
/// The clock runs at twice the sub-beat rate. `half_tick` toggles on
/// every `advance`; the coarse position only moves on the true→false
/// transition. The extra phase exists so that live input can be
/// rounded to the nearest coarse tick instead of always snapping
/// backwards.
#[derive(Clone, Debug)]
pub struct SeqClock {
    time_sig: TimeSignature,
    measure: u32,
    beat: u32,
    sub_beat: u32,
    half_tick: bool,
}

impl SeqClock {
    pub fn new(time_sig: TimeSignature) -> Self {
        let mut clock = Self {
            time_sig,
            measure: 0,
            beat: 0,
            sub_beat: 0,
            half_tick: true,
        };
        clock.reset();
        clock
    }

    /// Park the clock one advance before tick 0, so the next
    /// `advance` lands cleanly on the first tick.
    pub fn reset(&mut self) {
        self.measure = self.time_sig.measures - 1;
        self.beat = self.time_sig.beats_per_measure - 1;
        self.sub_beat = self.time_sig.sub_beats_per_beat - 1;
        self.half_tick = true;
    }

    /// One scheduler firing. Ripple-carries sub-beat into beat into
    /// measure, but only every other call.
    pub fn advance(&mut self) {
        self.half_tick = !self.half_tick;
        if !self.half_tick {
            self.sub_beat = (self.sub_beat + 1) % self.time_sig.sub_beats_per_beat;
            if self.sub_beat == 0 {
                self.beat = (self.beat + 1) % self.time_sig.beats_per_measure;
                if self.beat == 0 {
                    self.measure = (self.measure + 1) % self.time_sig.measures;
                }
            }
        }
    }

    /// Linear index into the note grid, in `[0, total_ticks)`.
    pub fn tick(&self) -> usize {
        (self.measure * self.time_sig.beats_per_measure * self.time_sig.sub_beats_per_beat
            + self.beat * self.time_sig.sub_beats_per_beat
            + self.sub_beat) as usize
    }

    /// The tick a live input event should be attributed to: the
    /// current tick during the first half of the interval, the
    /// upcoming one during the second half. Rounds to the nearest
    /// coarse tick, biased forward.
    pub fn quantized_tick(&self) -> usize {
        if !self.half_tick {
            self.tick()
        } else {
            (self.tick() + 1) % self.time_sig.total_ticks()
        }
    }

    pub fn is_half_tick(&self) -> bool {
        self.half_tick
    }

    pub fn measure(&self) -> u32 {
        self.measure
    }

    pub fn beat(&self) -> u32 {
        self.beat
    }

    pub fn sub_beat(&self) -> u32 {
        self.sub_beat
    }

    pub fn time_sig(&self) -> TimeSignature {
        self.time_sig
    }
}
