//! Adaptive low-pass filtering for a single scalar axis ("one euro" filter).
//!
//! At rest the cutoff sits at `min_cutoff`, which suppresses landmark jitter.
//! As the signal speeds up the cutoff rises with `beta * |velocity|`, trading
//! some smoothing for lower lag.

use std::f32::consts::PI;

use crate::config::FilterConfig;

/// History carried between samples once the filter has been seeded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    pub x_prev: f32,
    pub dx_prev: f32,
    pub t_prev: f64,
}

/// One filter instance per tracked axis. The first sample seeds the state and
/// is returned unfiltered.
#[derive(Debug, Clone)]
pub struct AdaptiveAxisFilter {
    params: FilterConfig,
    state: Option<FilterState>,
}

impl AdaptiveAxisFilter {
    pub fn new(params: FilterConfig) -> Self {
        Self {
            params,
            state: None,
        }
    }

    /// Creates a filter that has already consumed `(timestamp, value)`.
    pub fn seeded(params: FilterConfig, timestamp: f64, value: f32) -> Self {
        let mut filter = Self::new(params);
        filter.update(timestamp, value);
        filter
    }

    pub fn params(&self) -> &FilterConfig {
        &self.params
    }

    pub fn state(&self) -> Option<&FilterState> {
        self.state.as_ref()
    }

    /// Last smoothed value, if the filter has been seeded.
    pub fn value(&self) -> Option<f32> {
        self.state.map(|state| state.x_prev)
    }

    /// Filters one sample taken at `timestamp` (seconds).
    ///
    /// A non-increasing timestamp leaves the state untouched and returns the
    /// previous output.
    pub fn update(&mut self, timestamp: f64, raw: f32) -> f32 {
        let Some(state) = self.state.as_mut() else {
            self.state = Some(FilterState {
                x_prev: raw,
                dx_prev: 0.0,
                t_prev: timestamp,
            });
            return raw;
        };

        let dt = (timestamp - state.t_prev) as f32;
        if !(dt > 0.0) {
            return state.x_prev;
        }

        let dx = (raw - state.x_prev) / dt;
        let edx = state.dx_prev + smoothing_factor(self.params.d_cutoff, dt) * (dx - state.dx_prev);

        let cutoff = self.params.min_cutoff + self.params.beta * edx.abs();
        let filtered = state.x_prev + smoothing_factor(cutoff, dt) * (raw - state.x_prev);

        state.x_prev = filtered;
        state.dx_prev = edx;
        state.t_prev = timestamp;
        filtered
    }

    /// Discards the history so the next sample seeds the filter again.
    pub fn reset(&mut self) {
        self.state = None;
    }
}

/// Exponential smoothing weight for a first-order low-pass at `cutoff` Hz
/// sampled every `dt` seconds.
pub fn smoothing_factor(cutoff: f32, dt: f32) -> f32 {
    let tau = 1.0 / (2.0 * PI * cutoff);
    1.0 / (1.0 + tau / dt)
}
