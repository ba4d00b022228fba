//! WAV-fixture-backed tests
//!
//! Writes a temporary 16-bit PCM WAV with `hound`, reads it back as
//! interleaved f32, and runs it through the analysis façade end to end —
//! exercising the full decode-shape contract a real file adapter would use.

use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempDir;

use loudness_engine::{analyze_static, GainPlan, NormalizationMethod};

fn write_test_wav(path: &std::path::Path, sample_rate: u32, duration_secs: f32, frequency: f32, amplitude: f32) {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    let num_samples = (sample_rate as f32 * duration_secs) as usize;
    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        let sample = amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin();
        writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn read_wav_as_f32(path: &std::path::Path) -> (Vec<f32>, u32, usize) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples: Vec<f32> = reader
        .samples::<i16>()
        .map(|s| s.unwrap() as f32 / i16::MAX as f32)
        .collect();
    (samples, spec.sample_rate, spec.channels as usize)
}

#[test]
fn analyzes_a_wav_fixture_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    write_test_wav(&path, 48_000, 2.0, 1000.0, 0.5);

    let (samples, sample_rate, channels) = read_wav_as_f32(&path);
    assert_eq!(sample_rate, 48_000);
    assert_eq!(channels, 1);

    let analysis = analyze_static(&samples, sample_rate, channels, NormalizationMethod::Peak { target_db: -1.0 }).unwrap();
    let GainPlan::Scalar(gain) = analysis.gain else {
        panic!("expected scalar gain plan")
    };
    assert!(gain.is_finite() && gain > 0.0);
    assert!(
        (analysis.peak_db - (-6.02)).abs() < 0.5,
        "peak_db = {}",
        analysis.peak_db
    );
}
