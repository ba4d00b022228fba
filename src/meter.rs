//! ITU-R BS.1770-4 / EBU R128 K-weighted gated loudness meter
//!
//! Computes integrated, short-term, and momentary loudness plus loudness
//! range (LRA) from a 400 ms / 100 ms hop block grid, K-weighted and
//! channel-weighted per BS.1770, and gated with the standard's two-stage
//! absolute/relative gating.

use crate::kweighting::KWeightingFilter;

const ABSOLUTE_GATE_LUFS: f64 = -70.0;
const RELATIVE_GATE_OFFSET_LU: f64 = 10.0;
const LRA_GATE_OFFSET_LU: f64 = 20.0;
const LRA_MIN_BLOCKS: usize = 20;
const SHORT_TERM_BLOCKS: usize = 30; // 3 s at 100 ms hop

/// BS.1770-4 channel weights for a given channel count.
///
/// Mono and stereo get unit weight per channel; 5.1 follows the standard's
/// surround weighting (with LFE excluded); every other layout is treated as
/// all channels weighted equally, since BS.1770 does not define a layout
/// for it.
pub fn channel_weights(channels: usize) -> Vec<f32> {
    match channels {
        1 => vec![1.0],
        2 => vec![1.0, 1.0],
        6 => vec![1.0, 1.0, 1.0, 0.0, 1.41, 1.41],
        n => vec![1.0; n],
    }
}

/// Outcome of a full-buffer loudness measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterResult {
    /// Integrated (gated) loudness in LUFS. `-70.0` for silence/empty input.
    pub integrated_lufs: f64,
    /// Maximum single 400 ms block loudness in LUFS, if any block exists.
    pub momentary_lufs: Option<f64>,
    /// Maximum 3 s (30-block) sliding window loudness, if >= 30 blocks exist.
    pub short_term_lufs: Option<f64>,
    /// Loudness range in LU, if >= 20 blocks survive the LRA relative gate.
    pub loudness_range_lu: Option<f64>,
    /// Per-block (400 ms window, 100 ms hop) LUFS, ungated, in temporal order.
    pub block_loudness: Vec<f32>,
}

fn block_grid(frames: usize, sample_rate: u32) -> (usize, usize) {
    let block_size = (0.4 * sample_rate as f64).round() as usize;
    let hop = (0.1 * sample_rate as f64).round() as usize;
    let _ = frames;
    (block_size, hop)
}

/// Measure BS.1770-4 loudness over an entire interleaved PCM buffer.
///
/// Returns the degenerate all-`-70`/absent result for empty input; never
/// panics or errors on numeric edge cases (silence, sub-gate-length input).
pub fn measure(samples: &[f32], sample_rate: u32, channels: usize) -> MeterResult {
    if samples.is_empty() || channels == 0 {
        return MeterResult {
            integrated_lufs: ABSOLUTE_GATE_LUFS,
            momentary_lufs: None,
            short_term_lufs: None,
            loudness_range_lu: None,
            block_loudness: Vec::new(),
        };
    }

    let frames = samples.len() / channels;
    let (block_size, hop) = block_grid(frames, sample_rate);
    if block_size == 0 || hop == 0 || frames < block_size {
        return MeterResult {
            integrated_lufs: ABSOLUTE_GATE_LUFS,
            momentary_lufs: None,
            short_term_lufs: None,
            loudness_range_lu: None,
            block_loudness: Vec::new(),
        };
    }

    let weights = channel_weights(channels);
    let mut weighted = samples.to_vec();
    let mut kfilter = KWeightingFilter::new(sample_rate, channels);
    kfilter.process(&mut weighted);

    let mut block_loudness = Vec::new();
    let mut start = 0usize;
    while start + block_size <= frames {
        let mut combined = 0.0_f64;
        for (ch, &w) in weights.iter().enumerate() {
            if w == 0.0 {
                continue;
            }
            let mut sum_sq = 0.0_f64;
            for f in start..start + block_size {
                let s = weighted[f * channels + ch] as f64;
                sum_sq += s * s;
            }
            let ms = sum_sq / block_size as f64;
            combined += w as f64 * ms;
        }
        let l_block = -0.691 + 10.0 * combined.max(1e-10).log10();
        block_loudness.push(l_block as f32);
        start += hop;
    }

    if block_loudness.is_empty() {
        return MeterResult {
            integrated_lufs: ABSOLUTE_GATE_LUFS,
            momentary_lufs: None,
            short_term_lufs: None,
            loudness_range_lu: None,
            block_loudness,
        };
    }

    let momentary_lufs = block_loudness
        .iter()
        .cloned()
        .fold(f32::NEG_INFINITY, f32::max) as f64;

    let integrated_lufs = integrated_loudness(&block_loudness);
    let short_term_lufs = short_term_loudness(&block_loudness);
    let loudness_range_lu = loudness_range(&block_loudness, integrated_lufs);

    MeterResult {
        integrated_lufs,
        momentary_lufs: Some(momentary_lufs),
        short_term_lufs,
        loudness_range_lu,
        block_loudness,
    }
}

fn power_mean_lufs(blocks: &[f64]) -> f64 {
    if blocks.is_empty() {
        return ABSOLUTE_GATE_LUFS;
    }
    let mean_power: f64 = blocks.iter().map(|l| 10.0_f64.powf(l / 10.0)).sum::<f64>() / blocks.len() as f64;
    10.0 * mean_power.log10()
}

/// Two-stage (absolute then relative) gated integrated loudness.
fn integrated_loudness(block_loudness: &[f32]) -> f64 {
    let blocks: Vec<f64> = block_loudness.iter().map(|&l| l as f64).collect();

    let above_absolute: Vec<f64> = blocks
        .iter()
        .copied()
        .filter(|&l| l > ABSOLUTE_GATE_LUFS)
        .collect();
    if above_absolute.is_empty() {
        return ABSOLUTE_GATE_LUFS;
    }

    let ungated_mean = power_mean_lufs(&above_absolute);
    let relative_threshold = ungated_mean - RELATIVE_GATE_OFFSET_LU;
    let above_relative: Vec<f64> = above_absolute
        .iter()
        .copied()
        .filter(|&l| l > relative_threshold)
        .collect();

    if above_relative.is_empty() {
        ungated_mean
    } else {
        power_mean_lufs(&above_relative)
    }
}

/// Maximum 3 s sliding-window loudness, `None` below 30 blocks.
fn short_term_loudness(block_loudness: &[f32]) -> Option<f64> {
    if block_loudness.len() < SHORT_TERM_BLOCKS {
        return None;
    }
    let blocks: Vec<f64> = block_loudness.iter().map(|&l| l as f64).collect();
    let mut best = f64::NEG_INFINITY;
    for window in blocks.windows(SHORT_TERM_BLOCKS) {
        let l = power_mean_lufs(window);
        if l > best {
            best = l;
        }
    }
    Some(best)
}

/// EBU Tech 3342 loudness range: 10th-95th percentile spread of the
/// relatively gated (integrated - 20 LU) block distribution.
fn loudness_range(block_loudness: &[f32], integrated_lufs: f64) -> Option<f64> {
    let threshold = integrated_lufs - LRA_GATE_OFFSET_LU;
    let mut gated: Vec<f64> = block_loudness
        .iter()
        .map(|&l| l as f64)
        .filter(|&l| l > ABSOLUTE_GATE_LUFS && l > threshold)
        .collect();

    if gated.len() < LRA_MIN_BLOCKS {
        return None;
    }

    gated.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = gated.len();
    let low_idx = ((n as f64) * 0.10).floor() as usize;
    let high_idx = ((n as f64) * 0.95).floor() as usize;
    let high_idx = high_idx.min(n - 1);
    Some(gated[high_idx] - gated[low_idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(sample_rate: u32, channels: usize, freq: f32, amplitude: f32, secs: f32) -> Vec<f32> {
        let frames = (sample_rate as f32 * secs) as usize;
        let mut out = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let s = amplitude * (2.0 * std::f32::consts::PI * freq * t).sin();
            for _ in 0..channels {
                out.push(s);
            }
        }
        out
    }

    #[test]
    fn empty_input_is_degenerate() {
        let result = measure(&[], 48_000, 2);
        assert_eq!(result.integrated_lufs, -70.0);
        assert!(result.momentary_lufs.is_none());
        assert!(result.short_term_lufs.is_none());
        assert!(result.loudness_range_lu.is_none());
        assert!(result.block_loudness.is_empty());
    }

    #[test]
    fn silence_reports_floor() {
        let silence = vec![0.0_f32; 48_000 * 2 * 2];
        let result = measure(&silence, 48_000, 2);
        assert_eq!(result.integrated_lufs, -70.0);
    }

    #[test]
    fn channel_weights_match_layouts() {
        assert_eq!(channel_weights(1), vec![1.0]);
        assert_eq!(channel_weights(2), vec![1.0, 1.0]);
        assert_eq!(channel_weights(6), vec![1.0, 1.0, 1.0, 0.0, 1.41, 1.41]);
        assert_eq!(channel_weights(3), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn sine_1khz_at_half_scale_is_near_minus_3_lufs() {
        let samples = sine(48_000, 1, 1000.0, 0.5, 4.0);
        let result = measure(&samples, 48_000, 1);
        assert!(
            (result.integrated_lufs - (-3.01)).abs() < 0.5,
            "got {}",
            result.integrated_lufs
        );
    }

    #[test]
    fn short_term_requires_thirty_blocks() {
        let samples = sine(48_000, 1, 1000.0, 0.5, 1.0);
        let result = measure(&samples, 48_000, 1);
        assert!(result.short_term_lufs.is_none());

        let long_samples = sine(48_000, 1, 1000.0, 0.5, 4.0);
        let long_result = measure(&long_samples, 48_000, 1);
        assert!(long_result.short_term_lufs.is_some());
    }

    #[test]
    fn short_term_is_never_below_integrated_for_constant_signal() {
        let samples = sine(48_000, 1, 1000.0, 0.5, 5.0);
        let result = measure(&samples, 48_000, 1);
        let short_term = result.short_term_lufs.unwrap();
        assert!(short_term >= result.integrated_lufs - 0.1);
    }

    #[test]
    fn lra_requires_twenty_gated_blocks() {
        let samples = sine(48_000, 1, 1000.0, 0.5, 1.0);
        let result = measure(&samples, 48_000, 1);
        assert!(result.loudness_range_lu.is_none());
    }

    #[test]
    fn lra_is_small_for_constant_level_signal() {
        let samples = sine(48_000, 1, 1000.0, 0.5, 10.0);
        let result = measure(&samples, 48_000, 1);
        let lra = result.loudness_range_lu.unwrap();
        assert!(lra < 3.0, "lra = {lra}");
    }

    #[test]
    fn gating_monotonicity_removing_quiet_blocks_does_not_raise_absolute_count() {
        let loud = sine(48_000, 1, 1000.0, 0.5, 2.0);
        let mut combined = loud.clone();
        combined.extend(vec![0.0_f32; 48_000]); // 1 s silence appended
        combined.extend(loud);

        let without_silence_result = measure(&loud, 48_000, 1);
        let with_silence_result = measure(&combined, 48_000, 1);

        // silent blocks are excluded by the absolute gate, so the gated
        // count for the combined signal cannot exceed the loud-only count
        // plus the extra loud blocks appended.
        let loud_blocks = without_silence_result.block_loudness.len();
        let combined_above_gate = with_silence_result
            .block_loudness
            .iter()
            .filter(|&&l| l as f64 > -70.0)
            .count();
        assert!(combined_above_gate <= loud_blocks * 2 + 5);
    }
}
