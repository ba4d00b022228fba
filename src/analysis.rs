//! Analysis façade
//!
//! Composes the loudness meter, true-peak detector, and static/dynamic gain
//! stages into one [`AudioAnalysis`] record plus a [`Preview`] of the
//! before/after levels a caller can show without re-running the engine on
//! the output.

use tracing::debug;

use crate::dynamics::{self, DynamicNormalizationConfig, DynamicResult};
use crate::error::{LoudnessError, Result};
use crate::meter::{self, MeterResult};
use crate::solver::{self, Measurements, NormalizationMethod};
use crate::truepeak::{self, TruePeakMethod};

/// Per-channel statistics gathered in one streaming pass over the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStats {
    /// Sample peak per channel, linear.
    pub peaks: Vec<f32>,
    /// RMS per channel, linear.
    pub rms: Vec<f32>,
}

fn channel_stats(samples: &[f32], channels: usize) -> ChannelStats {
    let mut peaks = vec![0.0_f32; channels];
    let mut sum_sq = vec![0.0_f64; channels];
    let mut counts = vec![0usize; channels];

    for (i, &s) in samples.iter().enumerate() {
        let ch = i % channels;
        let a = s.abs();
        if a > peaks[ch] {
            peaks[ch] = a;
        }
        sum_sq[ch] += (s as f64) * (s as f64);
        counts[ch] += 1;
    }

    let rms = sum_sq
        .iter()
        .zip(counts.iter())
        .map(|(&sq, &n)| if n > 0 { (sq / n as f64).sqrt() as f32 } else { 0.0 })
        .collect();

    ChannelStats { peaks, rms }
}

fn linear_to_db(linear: f32) -> f32 {
    if linear > 0.0 {
        20.0 * linear.log10()
    } else {
        f32::NEG_INFINITY
    }
}

/// Preview of measured levels before and after a normalization, derived
/// purely from measurements and the chosen method without re-running the
/// engine on the normalized output.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    /// Human-readable label for the chosen method.
    pub method_label: String,
    /// Measured peak/RMS/LUFS/true-peak dB before normalization.
    pub before: Measurements,
    /// Projected peak/RMS/LUFS/true-peak dB after normalization.
    pub after: Measurements,
    /// Applied scalar gain, in dB. For the dynamic path this is the average
    /// applied gain across non-silent frames.
    pub applied_gain_db: f32,
    /// Number of frames flagged as problem spots (0 for the static path).
    pub problem_spots_count: usize,
}

/// The result of analyzing a buffer, either for static or dynamic gain.
#[derive(Debug, Clone, PartialEq)]
pub enum GainPlan {
    /// A single scalar linear gain.
    Scalar(f32),
    /// A per-frame gain envelope.
    Dynamic(DynamicResult),
}

/// Aggregate result of one analysis pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAnalysis {
    /// Aggregate sample peak (max over channels), in dBFS.
    pub peak_db: f32,
    /// Aggregate RMS (max over channels), in dBFS.
    pub rms_db: f32,
    /// Per-channel statistics.
    pub channel_stats: ChannelStats,
    /// Channel count this analysis ran with.
    pub channels: usize,
    /// Integrated, short-term, momentary LUFS and LRA.
    pub meter: MeterResult,
    /// True peak, in dBFS and linear.
    pub true_peak_db: f32,
    /// Computed gain: a scalar, or a frame envelope.
    pub gain: GainPlan,
    /// Before/after preview.
    pub preview: Preview,
}

fn validate(samples: &[f32], sample_rate: u32, channels: usize) -> Result<()> {
    if samples.is_empty() {
        return Err(LoudnessError::InvalidInput("empty sample buffer".into()));
    }
    if !(8_000..=384_000).contains(&sample_rate) {
        return Err(LoudnessError::InvalidInput(format!(
            "sample rate {sample_rate} outside [8000, 384000] Hz"
        )));
    }
    if !(1..=8).contains(&channels) {
        return Err(LoudnessError::InvalidInput(format!(
            "channel count {channels} outside [1, 8]"
        )));
    }
    if samples.len() % channels != 0 {
        return Err(LoudnessError::InvalidInput(format!(
            "buffer length {} not divisible by channel count {channels}",
            samples.len()
        )));
    }
    Ok(())
}

/// Analyze `samples` with a static [`NormalizationMethod`].
pub fn analyze_static(
    samples: &[f32],
    sample_rate: u32,
    channels: usize,
    method: NormalizationMethod,
) -> Result<AudioAnalysis> {
    validate(samples, sample_rate, channels)?;

    let stats = channel_stats(samples, channels);
    let peak_db = linear_to_db(stats.peaks.iter().cloned().fold(0.0, f32::max));
    let rms_db = linear_to_db(stats.rms.iter().cloned().fold(0.0, f32::max));

    debug!(peak_db, rms_db, channels, "computed channel statistics");

    let meter = meter::measure(samples, sample_rate, channels);
    let tp = truepeak::detect(samples, channels, TruePeakMethod::Accurate);

    debug!(
        integrated_lufs = meter.integrated_lufs,
        true_peak_db = tp.dbfs,
        "ran loudness meter and true-peak detector"
    );

    let measurements = Measurements {
        peak_db,
        rms_db,
        integrated_lufs: meter.integrated_lufs,
        true_peak_db: tp.dbfs,
    };
    let gain = solver::solve(method, measurements);
    let gain_db = linear_to_db(gain);

    let after = project_static_after(method, measurements, gain_db);
    let preview = Preview {
        method_label: method_label(method),
        before: measurements,
        after,
        applied_gain_db: gain_db,
        problem_spots_count: 0,
    };

    Ok(AudioAnalysis {
        peak_db,
        rms_db,
        channel_stats: stats,
        channels,
        meter,
        true_peak_db: tp.dbfs,
        gain: GainPlan::Scalar(gain),
        preview,
    })
}

/// Analyze `samples` and compute a dynamic (frame-local) gain envelope.
pub fn analyze_dynamic(
    samples: &[f32],
    sample_rate: u32,
    channels: usize,
    config: &DynamicNormalizationConfig,
) -> Result<AudioAnalysis> {
    validate(samples, sample_rate, channels)?;

    let stats = channel_stats(samples, channels);
    let peak_db = linear_to_db(stats.peaks.iter().cloned().fold(0.0, f32::max));
    let rms_db = linear_to_db(stats.rms.iter().cloned().fold(0.0, f32::max));

    let meter = meter::measure(samples, sample_rate, channels);
    let tp = truepeak::detect(samples, channels, TruePeakMethod::Accurate);

    let result = dynamics::normalize(samples, sample_rate, channels, config);
    debug!(
        problem_spots = result.problem_spots.len(),
        frames = result.gain_envelope.len(),
        "ran dynamic normalizer"
    );

    let before = Measurements {
        peak_db,
        rms_db,
        integrated_lufs: meter.integrated_lufs,
        true_peak_db: tp.dbfs,
    };

    let avg_gain_db = if result.gain_envelope.is_empty() {
        0.0
    } else {
        let sum: f32 = result
            .gain_envelope
            .iter()
            .map(|&g| linear_to_db(g))
            .filter(|g| g.is_finite())
            .sum();
        sum / result.gain_envelope.len() as f32
    };

    // All-silence input: every frame is pinned to unit gain by
    // `dynamics::normalize`, so the projected "after" state is just the
    // unchanged "before" state rather than a jump to the configured target.
    let is_silent = before.rms_db.is_infinite();
    let after = if is_silent {
        before
    } else {
        Measurements {
            peak_db: peak_db + avg_gain_db,
            rms_db: config.target_rms_db,
            integrated_lufs: before.integrated_lufs,
            true_peak_db: tp.dbfs + avg_gain_db,
        }
    };

    let preview = Preview {
        method_label: "dynamic".to_string(),
        before,
        after,
        applied_gain_db: avg_gain_db,
        problem_spots_count: result.problem_spots.len(),
    };

    Ok(AudioAnalysis {
        peak_db,
        rms_db,
        channel_stats: stats,
        channels,
        meter,
        true_peak_db: tp.dbfs,
        gain: GainPlan::Dynamic(result),
        preview,
    })
}

fn method_label(method: NormalizationMethod) -> String {
    match method {
        NormalizationMethod::Peak { target_db } => format!("peak({target_db})"),
        NormalizationMethod::Rms { target_db } => format!("rms({target_db})"),
        NormalizationMethod::Lufs {
            target_lufs,
            true_peak_limit_db,
        } => format!("lufs({target_lufs}, {true_peak_limit_db})"),
    }
}

fn project_static_after(method: NormalizationMethod, before: Measurements, gain_db: f32) -> Measurements {
    match method {
        NormalizationMethod::Peak { target_db } => Measurements {
            peak_db: target_db,
            rms_db: before.rms_db + gain_db,
            integrated_lufs: before.integrated_lufs + gain_db as f64,
            true_peak_db: before.true_peak_db + gain_db,
        },
        NormalizationMethod::Rms { target_db } => Measurements {
            peak_db: before.peak_db + gain_db,
            rms_db: target_db,
            integrated_lufs: before.integrated_lufs + gain_db as f64,
            true_peak_db: before.true_peak_db + gain_db,
        },
        NormalizationMethod::Lufs {
            target_lufs,
            true_peak_limit_db,
        } => Measurements {
            peak_db: before.peak_db + gain_db,
            rms_db: before.rms_db + gain_db,
            integrated_lufs: target_lufs as f64,
            true_peak_db: (before.true_peak_db + gain_db).min(true_peak_limit_db),
        },
    }
}
