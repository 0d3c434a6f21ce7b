//! WAV loading for the local speech engines.

use std::path::Path;

use hound::{SampleFormat, WavReader};
use tracing::debug;

use crate::domain::DomainError;

/// Sample rate every local speech model expects.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Read a WAV file as mono f32 samples at 16 kHz.
pub fn load_wav_mono_16k(path: &Path) -> Result<Vec<f32>, DomainError> {
    let reader = WavReader::open(path)
        .map_err(|e| DomainError::Audio(format!("Failed to open {}: {}", path.display(), e)))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| DomainError::Audio(format!("Failed to decode WAV: {}", e)))?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| DomainError::Audio(format!("Failed to decode WAV: {}", e)))?
        }
    };

    let mono = downmix(&interleaved, spec.channels as usize);
    let samples = resample(&mono, spec.sample_rate, WHISPER_SAMPLE_RATE);

    debug!(
        path = ?path,
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        samples = samples.len(),
        "WAV loaded"
    );

    Ok(samples)
}

/// Average interleaved channels into one.
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
        .collect()
}

/// Linear-interpolation resampler.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = src_pos.fract() as f32;

        let sample = if src_idx + 1 < samples.len() {
            let s0 = samples[src_idx];
            let s1 = samples[src_idx + 1];
            s0 + (s1 - s0) * frac
        } else if src_idx < samples.len() {
            samples[src_idx]
        } else {
            0.0
        };
        output.push(sample);
    }
    output
}
