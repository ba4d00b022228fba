//! ITU-R BS.1770-4 K-weighting filter pair
//!
//! Two cascaded biquads approximating the frequency response of human
//! hearing as specified by BS.1770: a high-shelf "pre-filter" followed by a
//! "RLB" (revised low-frequency B-weighting) high-pass.

use crate::biquad::{Biquad, Coefficients};
use std::f32::consts::PI;

/// Pre-filter (stage 1) high-shelf parameters
const PRE_FILTER_F0: f32 = 1681.974_5;
const PRE_FILTER_Q: f32 = 0.707_175_24;
const PRE_FILTER_GAIN_DB: f32 = 3.999_843_8;

/// RLB (stage 2) high-pass parameters
const RLB_F0: f32 = 38.135_47;
const RLB_Q: f32 = 0.500_327;

fn prewarp(f0: f32, sample_rate: u32) -> f32 {
    (PI * f0 / sample_rate as f32).tan()
}

/// Build the BS.1770 pre-filter (high shelf) coefficients for `sample_rate`.
pub fn pre_filter_coefficients(sample_rate: u32) -> Coefficients {
    let k = prewarp(PRE_FILTER_F0, sample_rate);
    let vh = 10.0_f32.powf(PRE_FILTER_GAIN_DB / 20.0);
    let vb = vh.powf(0.499_666_77);
    let a0 = 1.0 + k / PRE_FILTER_Q + k * k;

    Coefficients {
        b0: (vh + vb * k / PRE_FILTER_Q + k * k) / a0,
        b1: (2.0 * (k * k - vh)) / a0,
        b2: (vh - vb * k / PRE_FILTER_Q + k * k) / a0,
        a1: (2.0 * (k * k - 1.0)) / a0,
        a2: (1.0 - k / PRE_FILTER_Q + k * k) / a0,
    }
}

/// Build the BS.1770 RLB (high pass) coefficients for `sample_rate`.
pub fn rlb_filter_coefficients(sample_rate: u32) -> Coefficients {
    let k = prewarp(RLB_F0, sample_rate);
    let a0 = 1.0 + k / RLB_Q + k * k;

    Coefficients {
        b0: 1.0 / a0,
        b1: -2.0 / a0,
        b2: 1.0 / a0,
        a1: (2.0 * (k * k - 1.0)) / a0,
        a2: (1.0 - k / RLB_Q + k * k) / a0,
    }
}

/// A K-weighting filter: the pre-filter and RLB biquads run in series.
///
/// Owned exclusively by one loudness analysis (see [`crate::meter`]); never
/// shared across analyses.
pub struct KWeightingFilter {
    pre_filter: Biquad,
    rlb_filter: Biquad,
}

impl KWeightingFilter {
    /// Build a K-weighting filter for `sample_rate` and `channels`.
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            pre_filter: Biquad::new(pre_filter_coefficients(sample_rate), channels),
            rlb_filter: Biquad::new(rlb_filter_coefficients(sample_rate), channels),
        }
    }

    /// Apply both stages, in place, to interleaved PCM.
    pub fn process(&mut self, samples: &mut [f32]) {
        self.pre_filter.process(samples);
        self.rlb_filter.process(samples);
    }

    /// Reset both stages' memory to zero.
    pub fn reset(&mut self) {
        self.pre_filter.reset();
        self.rlb_filter.reset();
    }
}
