//! Time management utilities

/// Accumulator clock driving a fixed-timestep simulation from a
/// variable-rate outer loop.
///
/// Call [`FixedTimestep::advance`] once per frame with the wall-clock
/// delta; run one simulation tick per `true` it yields, then use
/// [`FixedTimestep::accumulator`] as the partial-tick fraction input for
/// interpolation.
pub struct FixedTimestep {
    step: f32,
    accumulator: f32,
    max_steps_per_frame: u32,
}

impl FixedTimestep {
    /// Create a clock with the given fixed step in seconds.
    pub fn new(step: f32) -> Self {
        Self {
            step,
            accumulator: 0.0,
            max_steps_per_frame: 5,
        }
    }

    /// Add frame time to the accumulator.
    ///
    /// Time beyond `max_steps_per_frame` whole steps is discarded so a
    /// stall does not trigger a spiral of catch-up ticks.
    pub fn advance(&mut self, frame_delta: f32) {
        let cap = self.step * self.max_steps_per_frame as f32;
        self.accumulator = (self.accumulator + frame_delta).min(cap);
    }

    /// Consume one fixed step if enough time has accumulated.
    pub fn tick(&mut self) -> bool {
        if self.accumulator >= self.step {
            self.accumulator -= self.step;
            true
        } else {
            false
        }
    }

    /// Remaining partial-step time in seconds.
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// The fixed step length in seconds.
    pub fn step(&self) -> f32 {
        self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_yields_whole_steps() {
        let mut clock = FixedTimestep::new(0.01);
        clock.advance(0.035);
        assert!(clock.tick());
        assert!(clock.tick());
        assert!(clock.tick());
        assert!(!clock.tick());
        assert!(clock.accumulator() < clock.step());
    }

    #[test]
    fn stall_is_clamped() {
        let mut clock = FixedTimestep::new(1.0 / 60.0);
        clock.advance(10.0);
        let mut steps = 0;
        while clock.tick() {
            steps += 1;
        }
        assert!(steps <= 5);
    }
}
