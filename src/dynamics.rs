//! Dynamic (frame-local) normalizer
//!
//! Produces a smoothed, per-frame gain envelope instead of one scalar gain:
//! each frame is steered toward a target RMS, the resulting raw-gain
//! sequence is Gaussian-smoothed, then clamped against a true-peak ceiling
//! on a per-frame basis. Frames whose applied gain is large are surfaced as
//! "problem spots" for the caller to inspect.

/// Configuration for one dynamic-normalization pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicNormalizationConfig {
    /// Level each non-silent frame is steered toward, in dBFS.
    pub target_rms_db: f32,
    /// Seconds per frame.
    pub frame_duration: f32,
    /// Tap count of the smoothing kernel; forced odd by +1 if even.
    pub gaussian_size: usize,
    /// Sigma of the Gaussian kernel, in frame units.
    pub gaussian_sigma: f32,
    /// Upper clamp on per-frame raw gain, in dB.
    pub max_gain_db: f32,
    /// Lower clamp on per-frame raw gain, in dB.
    pub min_gain_db: f32,
    /// Per-frame peak ceiling after gain, in dBTP.
    pub true_peak_limit_db: f32,
    /// Frames with RMS below this are pinned to unit gain.
    pub silence_threshold_db: f32,
}

impl DynamicNormalizationConfig {
    /// Voice preset: tuned for speech with a wide dynamic range.
    pub fn voice() -> Self {
        Self {
            target_rms_db: -20.0,
            frame_duration: 0.5,
            gaussian_size: 31,
            gaussian_sigma: 7.0,
            max_gain_db: 20.0,
            min_gain_db: -20.0,
            true_peak_limit_db: -1.0,
            silence_threshold_db: -50.0,
        }
    }

    /// Meditation preset: gentler, slower-moving gain for ambient material.
    pub fn meditation() -> Self {
        Self {
            target_rms_db: -18.0,
            frame_duration: 0.4,
            gaussian_size: 21,
            gaussian_sigma: 5.0,
            max_gain_db: 24.0,
            min_gain_db: -15.0,
            true_peak_limit_db: -1.0,
            silence_threshold_db: -45.0,
        }
    }

    /// Music preset: longer frames, narrower clamp, for mixed program material.
    pub fn music() -> Self {
        Self {
            target_rms_db: -16.0,
            frame_duration: 1.0,
            gaussian_size: 41,
            gaussian_sigma: 10.0,
            max_gain_db: 12.0,
            min_gain_db: -12.0,
            true_peak_limit_db: -1.0,
            silence_threshold_db: -60.0,
        }
    }
}

impl Default for DynamicNormalizationConfig {
    fn default() -> Self {
        Self::voice()
    }
}

/// Whether a problem spot is too quiet (gain boosted) or too loud (gain cut).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    /// Frame required a boost larger than the 6 dB threshold.
    TooQuiet,
    /// Frame required a cut larger than the 6 dB threshold.
    TooLoud,
}

/// A frame whose applied gain magnitude exceeded the 6 dB reporting threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProblemSpot {
    /// Index of the frame in the envelope.
    pub frame_index: usize,
    /// Start time of the frame, in seconds.
    pub time_secs: f32,
    /// Original (pre-gain) frame RMS level, in dB.
    pub original_level_db: f32,
    /// Applied gain at this frame, in dB.
    pub applied_gain_db: f32,
    /// Resulting frame RMS level after applying the gain, in dB.
    pub resulting_level_db: f32,
    /// Direction of the correction.
    pub kind: ProblemKind,
}

/// Outcome of a dynamic-normalization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicResult {
    /// Number of interleaved samples per frame (`samples_per_frame * channels`).
    pub frame_samples: usize,
    /// Raw per-frame linear gain, from the RMS target only, before smoothing.
    pub raw_envelope: Vec<f32>,
    /// Per-frame linear gain after Gaussian smoothing, before peak capping.
    pub smoothed_envelope: Vec<f32>,
    /// Final per-frame linear gain, smoothed and peak-capped, in temporal order.
    pub gain_envelope: Vec<f32>,
    /// Frames flagged as requiring a large correction, sorted by descending
    /// `|applied_gain_db|`.
    pub problem_spots: Vec<ProblemSpot>,
}

const PROBLEM_SPOT_THRESHOLD_DB: f32 = 6.0;

fn linear_to_db(linear: f32) -> f32 {
    if linear > 0.0 {
        20.0 * linear.log10()
    } else {
        f32::NEG_INFINITY
    }
}

fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

fn frame_level_db(frame: &[f32]) -> (f32, f32) {
    if frame.is_empty() {
        return (f32::NEG_INFINITY, f32::NEG_INFINITY);
    }
    let sum_sq: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
    let rms = ((sum_sq / frame.len() as f64).sqrt()) as f32;
    let peak = frame.iter().fold(0.0_f32, |acc, &s| acc.max(s.abs()));
    (linear_to_db(rms), linear_to_db(peak))
}

fn gaussian_kernel(size: usize, sigma: f32) -> Vec<f32> {
    let actual_size = if size % 2 == 0 { size + 1 } else { size.max(1) };
    let half = (actual_size / 2) as isize;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|x| {
            let xf = x as f32;
            (-(xf * xf) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    if sum > 0.0 {
        for k in &mut kernel {
            *k /= sum;
        }
    }
    kernel
}

/// Convolve `signal` with `kernel`, mirror-reflecting `signal` at the edges
/// so the output length matches the input length.
fn convolve_mirrored(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let half = (kernel.len() / 2) as isize;
    let mirrored_index = |idx: isize| -> usize {
        let last = n as isize - 1;
        if n == 1 {
            return 0;
        }
        let period = 2 * last;
        let mut m = idx % period;
        if m < 0 {
            m += period;
        }
        if m > last {
            m = period - m;
        }
        m as usize
    };

    (0..n)
        .map(|i| {
            let mut acc = 0.0_f32;
            for (k, &w) in kernel.iter().enumerate() {
                let offset = k as isize - half;
                let idx = mirrored_index(i as isize + offset);
                acc += w * signal[idx];
            }
            acc
        })
        .collect()
}

/// Run the dynamic normalizer over interleaved PCM.
///
/// Returns a single unit-gain frame with no problem spots if `samples`
/// spans fewer than two frames.
pub fn normalize(
    samples: &[f32],
    sample_rate: u32,
    channels: usize,
    config: &DynamicNormalizationConfig,
) -> DynamicResult {
    if channels == 0 || sample_rate == 0 {
        return DynamicResult {
            frame_samples: 0,
            raw_envelope: vec![1.0],
            smoothed_envelope: vec![1.0],
            gain_envelope: vec![1.0],
            problem_spots: Vec::new(),
        };
    }

    let samples_per_frame = (config.frame_duration * sample_rate as f32).round().max(1.0) as usize;
    let frame_samples = samples_per_frame * channels;

    if frame_samples == 0 || samples.len() < 2 * frame_samples {
        return DynamicResult {
            frame_samples,
            raw_envelope: vec![1.0],
            smoothed_envelope: vec![1.0],
            gain_envelope: vec![1.0],
            problem_spots: Vec::new(),
        };
    }

    let frames: Vec<&[f32]> = samples.chunks(frame_samples).collect();

    let levels: Vec<(f32, f32)> = frames.iter().map(|f| frame_level_db(f)).collect();

    let raw_gains: Vec<f32> = levels
        .iter()
        .map(|&(rms_db, _)| {
            if rms_db.is_infinite() || rms_db < config.silence_threshold_db {
                1.0
            } else {
                let raw_db = (config.target_rms_db - rms_db).clamp(config.min_gain_db, config.max_gain_db);
                db_to_linear(raw_db)
            }
        })
        .collect();

    let kernel = gaussian_kernel(config.gaussian_size, config.gaussian_sigma);
    let smoothed = convolve_mirrored(&raw_gains, &kernel);

    let mut final_gains = Vec::with_capacity(smoothed.len());
    for (i, &smooth) in smoothed.iter().enumerate() {
        let (_, peak_db) = levels[i];
        let final_gain = if peak_db.is_finite() && peak_db + linear_to_db(smooth) > config.true_peak_limit_db {
            db_to_linear(config.true_peak_limit_db - peak_db)
        } else {
            smooth
        };
        final_gains.push(final_gain);
    }

    let mut problem_spots = Vec::new();
    for (i, &gain) in final_gains.iter().enumerate() {
        let (rms_db, _) = levels[i];
        if rms_db <= config.silence_threshold_db {
            continue;
        }
        let applied_gain_db = linear_to_db(gain);
        if applied_gain_db.abs() > PROBLEM_SPOT_THRESHOLD_DB {
            problem_spots.push(ProblemSpot {
                frame_index: i,
                time_secs: i as f32 * config.frame_duration,
                original_level_db: rms_db,
                applied_gain_db,
                resulting_level_db: rms_db + applied_gain_db,
                kind: if applied_gain_db > 0.0 {
                    ProblemKind::TooQuiet
                } else {
                    ProblemKind::TooLoud
                },
            });
        }
    }
    problem_spots.sort_by(|a, b| {
        b.applied_gain_db
            .abs()
            .partial_cmp(&a.applied_gain_db.abs())
            .unwrap()
    });

    DynamicResult {
        frame_samples,
        raw_envelope: raw_gains,
        smoothed_envelope: smoothed,
        gain_envelope: final_gains,
        problem_spots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(sample_rate: u32, freq: f32, amplitude: f32, secs: f32) -> Vec<f32> {
        let frames = (sample_rate as f32 * secs) as usize;
        (0..frames)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn short_input_falls_back_to_unit_gain() {
        let samples = vec![0.1_f32; 100];
        let result = normalize(&samples, 48_000, 1, &DynamicNormalizationConfig::voice());
        assert_eq!(result.raw_envelope, vec![1.0]);
        assert_eq!(result.smoothed_envelope, vec![1.0]);
        assert_eq!(result.gain_envelope, vec![1.0]);
        assert!(result.problem_spots.is_empty());
    }

    #[test]
    fn all_three_envelope_stages_are_preserved_and_same_length() {
        let mut samples = sine(48_000, 1000.0, 0.0316, 5.0);
        samples.extend(sine(48_000, 1000.0, 0.316, 5.0));
        let result = normalize(&samples, 48_000, 1, &DynamicNormalizationConfig::voice());
        assert_eq!(result.raw_envelope.len(), result.smoothed_envelope.len());
        assert_eq!(result.smoothed_envelope.len(), result.gain_envelope.len());
        // smoothing is a convolution, so the smoothed stage need not equal the
        // raw stage even where no peak cap applied; both must still be finite.
        assert!(result.raw_envelope.iter().all(|g| g.is_finite() && *g > 0.0));
        assert!(result.smoothed_envelope.iter().all(|g| g.is_finite() && *g > 0.0));
    }

    #[test]
    fn problem_spot_carries_original_and_resulting_level() {
        let mut samples = sine(48_000, 1000.0, 0.0316, 5.0); // ~ -30 dBFS
        samples.extend(sine(48_000, 1000.0, 0.316, 5.0)); // ~ -10 dBFS
        let result = normalize(&samples, 48_000, 1, &DynamicNormalizationConfig::voice());
        let spot = result
            .problem_spots
            .iter()
            .find(|s| s.kind == ProblemKind::TooQuiet)
            .expect("expected at least one too-quiet problem spot");
        assert!((spot.resulting_level_db - (spot.original_level_db + spot.applied_gain_db)).abs() < 1e-4);
        assert!(spot.original_level_db < spot.resulting_level_db);
    }

    #[test]
    fn gaussian_kernel_sums_to_one() {
        let kernel = gaussian_kernel(31, 7.0);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "sum = {sum}");
    }

    #[test]
    fn gaussian_kernel_is_forced_odd() {
        let kernel = gaussian_kernel(30, 7.0);
        assert_eq!(kernel.len() % 2, 1);
    }

    #[test]
    fn smoothing_preserves_constant_envelope() {
        let kernel = gaussian_kernel(15, 3.0);
        let constant = vec![0.5_f32; 50];
        let smoothed = convolve_mirrored(&constant, &kernel);
        for &v in &smoothed {
            assert!((v - 0.5).abs() < 1e-5, "v = {v}");
        }
    }

    #[test]
    fn quiet_half_gets_flagged_too_quiet() {
        let mut samples = sine(48_000, 1000.0, 0.0316, 5.0); // ~ -30 dBFS
        samples.extend(sine(48_000, 1000.0, 0.316, 5.0)); // ~ -10 dBFS
        let result = normalize(&samples, 48_000, 1, &DynamicNormalizationConfig::voice());
        assert!(!result.problem_spots.is_empty());
        let has_too_quiet = result
            .problem_spots
            .iter()
            .any(|s| s.kind == ProblemKind::TooQuiet);
        assert!(has_too_quiet);
    }

    #[test]
    fn problem_spots_sorted_by_descending_magnitude() {
        let mut samples = sine(48_000, 1000.0, 0.0316, 5.0);
        samples.extend(sine(48_000, 1000.0, 0.316, 5.0));
        let result = normalize(&samples, 48_000, 1, &DynamicNormalizationConfig::voice());
        for pair in result.problem_spots.windows(2) {
            assert!(pair[0].applied_gain_db.abs() >= pair[1].applied_gain_db.abs());
        }
    }

    #[test]
    fn all_silence_has_no_problem_spots() {
        let samples = vec![0.0_f32; 48_000 * 10];
        let result = normalize(&samples, 48_000, 1, &DynamicNormalizationConfig::voice());
        assert!(result.problem_spots.is_empty());
        assert!(result.gain_envelope.iter().all(|&g| (g - 1.0).abs() < 1e-6));
    }
}
