//! Gain application
//!
//! Rewrites interleaved PCM in place with either a single scalar gain (the
//! static path) or a time-varying envelope (the dynamic path), the latter
//! interpolated to a continuous piecewise-linear curve.

/// Multiply every sample by a single scalar gain.
pub fn apply_scalar_gain(samples: &mut [f32], gain: f32) {
    for s in samples {
        *s *= gain;
    }
}

/// Apply a per-frame gain envelope to interleaved PCM, sample-accurate.
///
/// `frame_samples` is the number of interleaved samples per frame
/// (`samples_per_frame * channels`); a frame's gain value applies equally to
/// every channel within it. Between frame centers the gain is linearly
/// interpolated, so the curve is continuous (no discontinuity at frame
/// boundaries); at the ends it holds the nearest frame's value.
pub fn apply_gain_envelope(samples: &mut [f32], envelope: &[f32], frame_samples: usize) {
    if envelope.is_empty() || frame_samples == 0 {
        return;
    }
    let last = envelope.len() - 1;
    for (s, sample) in samples.iter_mut().enumerate() {
        let g = envelope_gain_at(s, frame_samples, envelope, last);
        *sample *= g;
    }
}

fn envelope_gain_at(sample_index: usize, frame_samples: usize, envelope: &[f32], last: usize) -> f32 {
    let p = sample_index as f32 / frame_samples as f32;
    let i = p.floor() as usize;
    let i = i.min(last);
    let t = (p - i as f32).clamp(0.0, 1.0);
    let next = (i + 1).min(last);
    envelope[i] + t * (envelope[next] - envelope[i])
}
