//! Metric analyzer.
//!
//! Keeps a sliding mono window of the most recent `analysis_size` samples
//! (channel average, zero-padded until filled) and derives per cycle:
//!
//! | Metric | Definition |
//! |--------|------------|
//! | centroid | Σ(f_k·|X_k|) / Σ|X_k| over bins `1..N/2`, 0 if Σ|X_k| = 0 |
//! | flux | \|centroid − previous centroid\| |
//! | ZCR | sign changes across the window / window length |
//! | coherence | `1 − min(flux / flux_normalizer, 1)` |
//! | ICI | `(peaks · T_cycle / peaks) · 1000` ms with ≥ 2 peaks in the flux ring, else the default |
//! | criticality | `flux / flux_normalizer` |

use hybrid_common::node::config::NodeConfig;
use hybrid_common::node::metrics::AnalysisFrame;

use super::ring::FluxRing;
use super::spectrum::Spectrum;

/// Analyzer with pre-allocated window, spectrum and flux history.
#[derive(Debug)]
pub struct MetricAnalyzer {
    channels: usize,
    sample_rate: f32,
    /// Configured cycle length [s], the ICI time base.
    cycle_duration_s: f32,
    flux_normalizer: f32,
    peak_threshold: f32,
    ici_default_ms: f32,
    enable_coherence: bool,
    enable_ici: bool,

    window: Vec<f32>,
    spectrum: Spectrum,
    ring: FluxRing,
    prev_centroid: f32,
    sequence: u64,
    last: AnalysisFrame,
}

impl MetricAnalyzer {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            channels: config.adc_channels.max(1),
            sample_rate: config.sample_rate as f32,
            cycle_duration_s: config.buffer_size as f32 / config.sample_rate as f32,
            flux_normalizer: config.flux_normalizer,
            peak_threshold: config.ici_peak_threshold,
            ici_default_ms: config.ici_default_ms,
            enable_coherence: config.enable_coherence,
            enable_ici: config.enable_ici,
            window: vec![0.0; config.analysis_size],
            spectrum: Spectrum::new(config.analysis_size),
            ring: FluxRing::new(),
            prev_centroid: 0.0,
            sequence: 0,
            last: AnalysisFrame {
                ici_ms: config.ici_default_ms,
                ..Default::default()
            },
        }
    }

    /// Clear window, flux history, previous centroid and the sequence counter.
    pub fn reset(&mut self) {
        self.window.fill(0.0);
        self.ring.clear();
        self.prev_centroid = 0.0;
        self.sequence = 0;
        self.last = AnalysisFrame {
            ici_ms: self.ici_default_ms,
            ..Default::default()
        };
    }

    /// Latest result.
    #[inline]
    pub fn last(&self) -> &AnalysisFrame {
        &self.last
    }

    #[inline]
    pub fn flux_history(&self) -> &FluxRing {
        &self.ring
    }

    /// Analyze `frames` rows of conditioned, interleaved samples.
    pub fn analyze(&mut self, conditioned: &[f32], frames: usize, timestamp_us: u64) -> AnalysisFrame {
        self.push_window(conditioned, frames);

        let centroid = self.centroid();
        let flux = (centroid - self.prev_centroid).abs();
        self.prev_centroid = centroid;

        let zcr = zero_crossing_rate(&self.window);

        let coherence = if self.enable_coherence {
            coherence(flux, self.flux_normalizer)
        } else {
            1.0
        };

        let ici_ms = if self.enable_ici {
            self.ring.push(flux);
            inter_event_interval_ms(
                self.ring.count_above(self.peak_threshold),
                self.cycle_duration_s,
                self.ici_default_ms,
            )
        } else {
            self.ici_default_ms
        };

        let criticality = if self.flux_normalizer > 0.0 {
            flux / self.flux_normalizer
        } else {
            0.0
        };

        self.last = AnalysisFrame {
            spectral_centroid: centroid,
            spectral_flux: flux,
            zero_crossing_rate: zcr,
            ici_ms,
            coherence,
            criticality,
            timestamp_us,
            sequence: self.sequence,
        };
        self.sequence += 1;
        self.last
    }

    /// Slide the mono mix of the new rows into the window.
    fn push_window(&mut self, conditioned: &[f32], frames: usize) {
        let n = self.window.len();
        let ch = self.channels;
        let frames = frames.min(conditioned.len() / ch);
        let skip = frames.saturating_sub(n);
        let fresh = frames - skip;

        self.window.copy_within(fresh.., 0);
        let scale = 1.0 / ch as f32;
        for (slot, row) in self.window[n - fresh..]
            .iter_mut()
            .zip(conditioned[skip * ch..frames * ch].chunks_exact(ch))
        {
            *slot = row.iter().sum::<f32>() * scale;
        }
    }

    fn centroid(&mut self) -> f32 {
        let size = self.spectrum.size();
        let bin_hz = self.sample_rate / size as f32;
        let mags = self.spectrum.compute(&self.window);

        let mut weighted = 0.0f32;
        let mut total = 0.0f32;
        for (k, &m) in mags.iter().enumerate().skip(1) {
            weighted += k as f32 * bin_hz * m;
            total += m;
        }
        if total > 0.0 { weighted / total } else { 0.0 }
    }
}

/// Sign changes across `window`, divided by its length.
///
/// Zero counts as positive.
pub fn zero_crossing_rate(window: &[f32]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    let crossings = window
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / window.len() as f32
}

/// `1 − min(flux / normalizer, 1)`; 1.0 for a non-positive normalizer.
#[inline]
pub fn coherence(flux: f32, normalizer: f32) -> f32 {
    if normalizer <= 0.0 {
        return 1.0;
    }
    1.0 - (flux / normalizer).min(1.0)
}

/// ICI [ms] for `peaks` ring entries above threshold.
///
/// Each peak accounts for one cycle of `cycle_duration_s`; the interval is
/// their total span divided by their count. Fewer than two peaks give
/// `default_ms`.
#[inline]
pub fn inter_event_interval_ms(peaks: usize, cycle_duration_s: f32, default_ms: f32) -> f32 {
    if peaks > 1 {
        let span_s = peaks as f32 * cycle_duration_s;
        (span_s / peaks as f32) * 1000.0
    } else {
        default_ms
    }
}
