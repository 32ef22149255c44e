//! Whole-buffer time shift used for the dashboard echo.

/// Shift `input` later by `delay_samples`, keeping its length.
///
/// The first `delay_samples` outputs are exact silence; the tail that would
/// fall past the end is dropped.
pub fn shift_later(input: &[f64], delay_samples: usize) -> Vec<f64> {
    let mut out = vec![0.0; input.len()];
    if delay_samples < input.len() {
        out[delay_samples..].copy_from_slice(&input[..input.len() - delay_samples]);
    }
    out
}

/// Convert a delay in steps (days) into samples for a clip where `steps`
/// share `total_samples` equally.
pub fn steps_to_samples(delay_steps: usize, steps: usize, total_samples: usize) -> usize {
    if steps == 0 {
        return 0;
    }
    let per_step = total_samples as f64 / steps as f64;
    ((delay_steps as f64 * per_step).round() as usize).min(total_samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delay_is_identity() {
        let x = vec![0.1, 0.2, 0.3];
        assert_eq!(shift_later(&x, 0), x);
    }

    #[test]
    fn delayed_signal_starts_silent() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(shift_later(&x, 2), vec![0.0, 0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn delay_past_end_is_silence() {
        let x = vec![1.0; 4];
        assert_eq!(shift_later(&x, 4), vec![0.0; 4]);
        assert_eq!(shift_later(&x, 100), vec![0.0; 4]);
    }

    #[test]
    fn steps_map_proportionally() {
        assert_eq!(steps_to_samples(2, 30, 18 * 44100), 52920);
        assert_eq!(steps_to_samples(0, 30, 1000), 0);
        assert_eq!(steps_to_samples(5, 0, 1000), 0);
        assert_eq!(steps_to_samples(50, 10, 1000), 1000);
    }
}
