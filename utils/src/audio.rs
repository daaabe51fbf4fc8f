use base64::Engine;
use rubato::{FastFixedIn, PolynomialDegree};

/// Sample rate the wire protocol expects for microphone audio.
pub const CAPTURE_PCM16_SAMPLE_RATE: f64 = 16000.0;

/// Sample rate synthesized speech arrives at.
pub const TTS_PCM16_SAMPLE_RATE: f64 = 24000.0;

pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

/// Quantize float samples to 16-bit PCM and encode as base64.
///
/// `round(sample * 32768)` saturated to `[-32768, 32767]`; out-of-range
/// inputs clip, they never wrap.
pub fn encode(pcm32: &[f32]) -> String {
    let pcm16: Vec<u8> = pcm32
        .iter()
        .flat_map(|&sample| {
            let scaled = (f64::from(sample) * 32768.0).round();
            let quantized = scaled.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;
            quantized.to_le_bytes()
        })
        .collect();
    base64::engine::general_purpose::STANDARD.encode(&pcm16)
}

/// Decode one base64 fragment of 16-bit PCM into float samples.
pub fn decode(fragment: &str) -> anyhow::Result<Vec<f32>> {
    let pcm16 = base64::engine::general_purpose::STANDARD
        .decode(fragment)
        .map_err(|e| anyhow::anyhow!("invalid base64 audio: {e}"))?;
    if pcm16.len() % 2 != 0 {
        anyhow::bail!("PCM16 payload has odd byte length: {}", pcm16.len());
    }
    Ok(pcm16
        .chunks_exact(2)
        .map(|chunk| {
            let v = i16::from_le_bytes([chunk[0], chunk[1]]);
            f32::from(v) / 32768.0
        })
        .collect())
}

/// Mean absolute amplitude of a block.
pub fn level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
}
