//! Static gain solver
//!
//! Translates a chosen [`NormalizationMethod`] plus measured levels (sample
//! peak, RMS, integrated LUFS, true peak) into a single scalar linear gain.

/// Normalization method and its target parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizationMethod {
    /// Match sample peak to `target_db` dBFS. Default target: -0.1 dB.
    Peak {
        /// Target sample peak, in dBFS.
        target_db: f32,
    },
    /// Match RMS to `target_db` dBFS, clamped so the resulting peak does not
    /// exceed -0.1 dBFS. Default target: -20 dB.
    Rms {
        /// Target RMS level, in dBFS.
        target_db: f32,
    },
    /// Match integrated loudness to `target_lufs`, clamped so the resulting
    /// true peak does not exceed `true_peak_limit_db`.
    Lufs {
        /// Target integrated loudness, in LUFS.
        target_lufs: f32,
        /// True-peak ceiling, in dBTP. Default: -1.0.
        true_peak_limit_db: f32,
    },
}

/// Measured levels a solver needs to compute a gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    /// Sample peak, in dBFS. `-inf` for silence.
    pub peak_db: f32,
    /// RMS level, in dBFS. `-inf` for silence.
    pub rms_db: f32,
    /// Integrated loudness, in LUFS.
    pub integrated_lufs: f64,
    /// True peak, in dBTP. `-inf` for silence.
    pub true_peak_db: f32,
}

const INTRINSIC_CLIP_GUARD_DB: f32 = -0.1;

/// Solve for the scalar linear gain implied by `method` and `measurements`.
///
/// Returns unit gain (1.0) whenever the relevant measurement is `-inf`
/// (pure silence), since there is nothing to normalize against.
pub fn solve(method: NormalizationMethod, measurements: Measurements) -> f32 {
    match method {
        NormalizationMethod::Peak { target_db } => {
            if measurements.peak_db.is_infinite() {
                return 1.0;
            }
            let gain_db = target_db - measurements.peak_db;
            db_to_linear(gain_db)
        }
        NormalizationMethod::Rms { target_db } => {
            if measurements.rms_db.is_infinite() {
                return 1.0;
            }
            let mut gain_db = target_db - measurements.rms_db;
            if measurements.peak_db.is_finite() && measurements.peak_db + gain_db > INTRINSIC_CLIP_GUARD_DB {
                gain_db = INTRINSIC_CLIP_GUARD_DB - measurements.peak_db;
            }
            db_to_linear(gain_db)
        }
        NormalizationMethod::Lufs {
            target_lufs,
            true_peak_limit_db,
        } => {
            if measurements.integrated_lufs.is_infinite() {
                return 1.0;
            }
            let mut gain_db = (target_lufs as f64 - measurements.integrated_lufs) as f32;
            if measurements.true_peak_db.is_finite()
                && measurements.true_peak_db + gain_db > true_peak_limit_db
            {
                gain_db = true_peak_limit_db - measurements.true_peak_db;
            }
            db_to_linear(gain_db)
        }
    }
}

fn db_to_linear(gain_db: f32) -> f32 {
    10.0_f32.powf(gain_db / 20.0)
}

impl Default for NormalizationMethod {
    fn default() -> Self {
        NormalizationMethod::Peak { target_db: -0.1 }
    }
}
