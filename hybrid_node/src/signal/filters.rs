//! First-order filter primitives.
//!
//! Both poles use the one-pole smoothing coefficient
//! `c = 1 − e^(−2π·fc/fs)`. The high-pass is the complement of a one-pole
//! tracker, the low-pass a plain one-pole:
//!
//! ```text
//! t[n] = t[n−1] + c_hp·(x[n] − t[n−1])     hp[n] = x[n] − t[n]
//! l[n] = l[n−1] + c_lp·(hp[n] − l[n−1])    y[n]  = l[n]
//! ```
//!
//! Processing order: high-pass → low-pass.

use core::f32::consts::PI;

/// One-pole coefficient for `cutoff_hz` at `sample_rate` Hz.
///
/// Returns 1.0 (pass-through for the low-pass, full rejection for the
/// high-pass tracker) when either argument is not positive.
#[inline]
pub fn one_pole_coefficient(cutoff_hz: f32, sample_rate: f32) -> f32 {
    if cutoff_hz <= 0.0 || sample_rate <= 0.0 {
        return 1.0;
    }
    1.0 - (-2.0 * PI * cutoff_hz / sample_rate).exp()
}

/// Coefficient pair of the filter chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterCoeffs {
    pub hpf: f32,
    pub lpf: f32,
}

impl FilterCoeffs {
    pub fn new(hpf_cutoff: f32, lpf_cutoff: f32, sample_rate: f32) -> Self {
        Self {
            hpf: one_pole_coefficient(hpf_cutoff, sample_rate),
            lpf: one_pole_coefficient(lpf_cutoff, sample_rate),
        }
    }
}

/// Persistent filter state of one channel. Survives across cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelFilter {
    /// Low-frequency content tracked for the high-pass complement.
    tracker: f32,
    /// Low-pass output.
    lowpass: f32,
}

impl ChannelFilter {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Run one sample through high-pass then low-pass.
    #[inline]
    pub fn apply(&mut self, coeffs: &FilterCoeffs, input: f32) -> f32 {
        self.tracker += coeffs.hpf * (input - self.tracker);
        let hp = input - self.tracker;
        self.lowpass += coeffs.lpf * (hp - self.lowpass);
        self.lowpass
    }
}
