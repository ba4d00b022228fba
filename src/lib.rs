//! K-weighted gated loudness metering, true-peak detection, and
//! static/dynamic gain normalization (ITU-R BS.1770-4 / EBU R128).
//!
//! This crate provides:
//! - A BS.1770-4 K-weighted gated loudness meter (integrated, short-term,
//!   momentary, loudness range).
//! - A 4x-oversampled true-peak detector (fast Catmull-Rom or accurate
//!   polyphase FIR).
//! - A static gain solver (peak/RMS/LUFS targets, true-peak-ceiling aware).
//! - A dynamic (frame-local) normalizer with Gaussian-smoothed gain
//!   envelopes and problem-spot reporting, for material with strongly
//!   varying levels (speech, meditation, podcasts).
//! - A ReplayGain 2.0 adapter built on top of the meter.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────────┐
//! │ PCM buffer  │ ──► │  analysis    │ ──► │  AudioAnalysis  │
//! └─────────────┘     └──────────────┘     └─────────────────┘
//!                            │
//!                            ▼
//!                   ┌─────────────────┐
//!                   │ gain application │
//!                   └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use loudness_engine::{analyze_static, NormalizationMethod, apply_scalar_gain};
//!
//! let analysis = analyze_static(&samples, 48_000, 2, NormalizationMethod::Peak { target_db: -0.1 })?;
//! if let loudness_engine::GainPlan::Scalar(gain) = analysis.gain {
//!     apply_scalar_gain(&mut samples, gain);
//! }
//! ```

#![deny(unsafe_code)]

mod analysis;
mod biquad;
mod dynamics;
mod error;
mod gain;
mod kweighting;
mod meter;
mod replaygain;
mod solver;
mod truepeak;

pub use analysis::{analyze_dynamic, analyze_static, AudioAnalysis, ChannelStats, GainPlan, Preview};
pub use biquad::{Biquad, Coefficients};
pub use dynamics::{
    DynamicNormalizationConfig, DynamicResult, ProblemKind, ProblemSpot,
};
pub use error::{LoudnessError, Result};
pub use gain::{apply_gain_envelope, apply_scalar_gain};
pub use kweighting::KWeightingFilter;
pub use meter::{channel_weights, measure, MeterResult};
pub use replaygain::{
    AlbumGain, ReplayGainCalculator, TrackGain, TrackMeasurement, REPLAYGAIN_REFERENCE_LUFS,
};
pub use solver::{solve, Measurements, NormalizationMethod};
pub use truepeak::{detect as detect_true_peak, TruePeakMethod, TruePeakResult};

/// EBU R128 broadcast reference level (-23 LUFS).
pub const EBU_R128_BROADCAST_LUFS: f64 = -23.0;

/// EBU R128 / common streaming-platform reference level (-14 LUFS).
pub const EBU_R128_STREAMING_LUFS: f64 = -14.0;

/// Absolute gate threshold used by the loudness meter, in LUFS.
pub const ABSOLUTE_GATE_LUFS: f64 = -70.0;
