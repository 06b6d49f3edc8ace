//! Volume and playback-rate values
//!
//! Both are validated here so the engine can mirror exactly what it handed
//! to the underlying resource.

/// Output volume, always within 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume {
    level: f32,
}

impl Volume {
    /// Create a volume, clamping into range (NaN becomes full volume)
    pub fn new(level: f32) -> Self {
        let mut volume = Self { level: 1.0 };
        volume.set_level(level);
        volume
    }

    /// Set the level, clamped to 0.0-1.0
    ///
    /// Returns `false` and keeps the old level for NaN input.
    pub fn set_level(&mut self, level: f32) -> bool {
        if level.is_nan() {
            return false;
        }
        self.level = level.clamp(0.0, 1.0);
        true
    }

    /// Current level
    pub fn level(&self) -> f32 {
        self.level
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Playback speed multiplier, always finite and positive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackRate {
    rate: f32,
}

impl PlaybackRate {
    /// Create a rate (invalid input falls back to 1.0)
    pub fn new(rate: f32) -> Self {
        let mut value = Self { rate: 1.0 };
        value.set(rate);
        value
    }

    /// Set the rate; returns `false` and keeps the old rate if `rate` is not
    /// a positive finite number
    pub fn set(&mut self, rate: f32) -> bool {
        if !(rate.is_finite() && rate > 0.0) {
            return false;
        }
        self.rate = rate;
        true
    }

    /// Current multiplier
    pub fn get(&self) -> f32 {
        self.rate
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self::new(1.0)
    }
}
