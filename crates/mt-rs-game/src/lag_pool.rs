//! Token bucket used to smooth anti-cheat timing against network lag.
//!
//! The pool fills as the client claims time (movement, digging) and drains
//! as server time passes. A claim that would overflow the maximum is refused.

/// Lower bound for the pool maximum, in seconds.
pub const LAG_POOL_MIN: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagPool {
    pool: f32,
    max: f32,
}

impl Default for LagPool {
    fn default() -> Self {
        Self {
            pool: 15.0,
            max: 15.0,
        }
    }
}

impl LagPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(&self) -> f32 {
        self.pool
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// Change the maximum, clamping the current level down to it.
    pub fn set_max(&mut self, new_max: f32) {
        self.max = new_max;
        if self.pool > new_max {
            self.pool = new_max;
        }
    }

    /// Let `dtime` seconds of server time pass. Never goes below zero.
    pub fn add(&mut self, dtime: f32) {
        self.pool = (self.pool - dtime).max(0.0);
    }

    /// Fill the pool completely, so no claim succeeds until time passes.
    pub fn empty(&mut self) {
        self.pool = self.max;
    }

    /// Try to claim `dtime` seconds.
    pub fn grab(&mut self, dtime: f32) -> bool {
        if dtime <= 0.0 {
            return true;
        }
        if self.pool + dtime > self.max {
            return false;
        }
        self.pool += dtime;
        true
    }
}

/// Server-wide estimate of the worst recent step time.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxLagEstimate {
    value: f32,
}

impl MaxLagEstimate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decay the estimate and raise it to `dtime` when that step was longer.
    pub fn update(&mut self, dtime: f32) {
        self.value *= 0.9998;
        if dtime > self.value {
            self.value = dtime;
        }
    }

    pub fn get(&self) -> f32 {
        self.value
    }

    /// Pool maximum derived from the lag estimate.
    pub fn pool_max(&self) -> f32 {
        (self.value * 2.0).max(LAG_POOL_MIN)
    }
}
