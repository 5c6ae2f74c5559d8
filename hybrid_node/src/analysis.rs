//! Metric analysis of the conditioned signal.
//!
//! - [`ring`] - fixed-capacity flux history
//! - [`spectrum`] - planned FFT over the analysis window
//! - [`analyzer`] - centroid, flux, ZCR, coherence and ICI

pub mod analyzer;
pub mod ring;
pub mod spectrum;

pub use analyzer::MetricAnalyzer;
pub use ring::FluxRing;
pub use spectrum::Spectrum;
