// Ramp envelope - deterministic amplitude automation
//
// Models a gain parameter that starts at a fixed value and then follows a
// short list of ramps, each ending at an absolute time after the trigger:
//
// - Linear:      v(t) = v0 + (v1 - v0) * (t - t0) / (t1 - t0)
// - Exponential: v(t) = v0 * (v1 / v0) ^ ((t - t0) / (t1 - t0))
//
// After the last ramp the value holds at the last target. An exponential
// ramp needs both ends strictly positive; otherwise the previous value holds
// until the ramp ends and then jumps to the target.

/// Ramps available to one envelope
pub const MAX_RAMPS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampKind {
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub kind: RampKind,
    pub target: f32,
    /// Seconds after the trigger at which `target` is reached
    pub end: f32,
}

/// Piecewise linear/exponential envelope evaluated by time since trigger.
///
/// Fixed-size storage, so building one in the audio callback never allocates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampEnvelope {
    start_value: f32,
    ramps: [Ramp; MAX_RAMPS],
    len: usize,
}

impl RampEnvelope {
    pub fn new(start_value: f32) -> Self {
        Self {
            start_value,
            ramps: [Ramp {
                kind: RampKind::Linear,
                target: start_value,
                end: 0.0,
            }; MAX_RAMPS],
            len: 0,
        }
    }

    /// Append a ramp. Ramps past [`MAX_RAMPS`] are ignored.
    pub fn ramp(mut self, kind: RampKind, target: f32, end: f32) -> Self {
        debug_assert!(self.len < MAX_RAMPS, "too many envelope ramps");
        if self.len < MAX_RAMPS {
            self.ramps[self.len] = Ramp { kind, target, end };
            self.len += 1;
        }
        self
    }

    pub fn linear_to(self, target: f32, end: f32) -> Self {
        self.ramp(RampKind::Linear, target, end)
    }

    pub fn exponential_to(self, target: f32, end: f32) -> Self {
        self.ramp(RampKind::Exponential, target, end)
    }

    pub fn ramps(&self) -> &[Ramp] {
        &self.ramps[..self.len]
    }

    /// Time at which the last ramp completes
    pub fn end_time(&self) -> f32 {
        self.ramps().last().map_or(0.0, |ramp| ramp.end)
    }

    /// Envelope value `t` seconds after the trigger
    pub fn value_at(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return self.start_value;
        }

        let mut from_value = self.start_value;
        let mut from_time = 0.0;

        for ramp in self.ramps() {
            if t < ramp.end {
                let span = ramp.end - from_time;
                if span <= 0.0 {
                    return ramp.target;
                }
                let progress = ((t - from_time) / span).clamp(0.0, 1.0);

                return match ramp.kind {
                    RampKind::Linear => from_value + (ramp.target - from_value) * progress,
                    RampKind::Exponential => {
                        if from_value > 0.0 && ramp.target > 0.0 {
                            from_value * (ramp.target / from_value).powf(progress)
                        } else {
                            from_value
                        }
                    }
                };
            }

            from_value = ramp.target;
            from_time = ramp.end;
        }

        from_value
    }
}
