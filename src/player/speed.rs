// Playback speed selection
// A fixed ring of multipliers; each press moves to the next one

pub const PLAYBACK_SPEEDS: [f32; 5] = [1.0, 1.25, 1.5, 1.75, 2.0];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpeedCycler {
    index: usize,
}

impl SpeedCycler {
    pub fn new() -> Self {
        SpeedCycler::default()
    }

    pub fn current(&self) -> f32 {
        PLAYBACK_SPEEDS[self.index]
    }

    // Moves to the next speed, wrapping from 2x back to 1x
    pub fn advance(&mut self) -> f32 {
        self.index = (self.index + 1) % PLAYBACK_SPEEDS.len();
        self.current()
    }

    // "1x", "1.25x", ...
    pub fn label(&self) -> String {
        format!("{}x", self.current())
    }
}
