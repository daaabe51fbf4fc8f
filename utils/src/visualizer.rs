/// Number of amplitude buckets in one visualizer frame.
pub const BAR_COUNT: usize = 32;

/// Fixed gain applied before clamping, so conversational levels fill the bars.
const BAR_SCALE: f32 = 5.0;

/// Reduce one audio block to a fixed-length amplitude histogram.
///
/// The first 31 buckets cover `len / 32` samples each and the last bucket
/// absorbs the remainder, so the output length is 32 for every input length.
/// Each bucket is the mean absolute amplitude of its range, scaled and
/// clamped to `[0, 1]`.
pub fn bars(block: &[f32]) -> [f32; BAR_COUNT] {
    let mut out = [0.0f32; BAR_COUNT];
    if block.is_empty() {
        return out;
    }

    let per_bar = block.len() / BAR_COUNT;
    for (i, bar) in out.iter_mut().enumerate() {
        let start = i * per_bar;
        let end = if i == BAR_COUNT - 1 {
            block.len()
        } else {
            (i + 1) * per_bar
        };
        let range = &block[start..end];
        if range.is_empty() {
            continue;
        }
        let mean = range.iter().map(|s| s.abs()).sum::<f32>() / range.len() as f32;
        *bar = (mean * BAR_SCALE).min(1.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_length_is_fixed_for_any_block_length() {
        for len in [0usize, 1, 7, 31, 32, 33, 1000, 1024] {
            let block = vec![0.1f32; len];
            assert_eq!(bars(&block).len(), BAR_COUNT, "len={len}");
        }
    }

    #[test]
    fn silence_yields_zero_bars() {
        assert_eq!(bars(&[0.0; 1024]), [0.0; BAR_COUNT]);
        assert_eq!(bars(&[]), [0.0; BAR_COUNT]);
    }

    #[test]
    fn bars_are_scaled_and_clamped() {
        let quiet = bars(&vec![0.1f32; 1024]);
        for bar in quiet {
            assert!((bar - 0.5).abs() < 1e-5);
        }

        let loud = bars(&vec![0.9f32; 1024]);
        assert_eq!(loud, [1.0; BAR_COUNT]);
    }

    #[test]
    fn last_bucket_absorbs_remainder() {
        // 1000 samples: buckets of 31, last bucket gets 31 + 39.
        let mut block = vec![0.0f32; 1000];
        for sample in block.iter_mut().skip(31 * 31) {
            *sample = 0.2;
        }
        let out = bars(&block);
        assert_eq!(out[30], 0.0);
        assert!(out[31] > 0.9);
    }

    #[test]
    fn negative_amplitude_counts_as_magnitude() {
        let out = bars(&vec![-0.1f32; 64]);
        for bar in out {
            assert!((bar - 0.5).abs() < 1e-5);
        }
    }
}
