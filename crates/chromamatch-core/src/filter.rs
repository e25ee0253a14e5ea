//! Smoothing filters and slope estimation over bit-error curves
//!
//! The Gaussian filter is approximated by repeated box filtering, which keeps
//! the per-alignment smoothing linear in the curve length.

/// Map a possibly out-of-range index back into `[0, len)` by mirroring at
/// both edges (`-1 -> 0`, `len -> len - 1`, and so on for larger overshoots).
pub fn reflect_index(index: isize, len: usize) -> usize {
    debug_assert!(len > 0);
    let period = 2 * len as isize;
    let folded = index.rem_euclid(period) as usize;
    if folded < len {
        folded
    } else {
        2 * len - 1 - folded
    }
}

/// Moving average over `window` samples with reflective boundaries.
///
/// Output sample `i` averages the inputs at `i - window / 2 .. i - window / 2 + window`.
/// A zero window or an empty input is returned unchanged.
pub fn box_filter(input: &[f64], window: usize) -> Vec<f64> {
    let len = input.len();
    if window == 0 || len == 0 {
        return input.to_vec();
    }

    let start = -((window / 2) as isize);
    let at = |k: isize| input[reflect_index(k, len)];

    let mut sum: f64 = (0..window as isize).map(|k| at(start + k)).sum();
    let mut output = Vec::with_capacity(len);
    for i in 0..len as isize {
        output.push(sum / window as f64);
        let first = start + i;
        sum += at(first + window as isize) - at(first);
    }
    output
}

/// Box window widths and split for approximating a Gaussian of `sigma` with
/// `passes` box filters: `(lower, upper, lower_passes)`.
pub fn box_widths(passes: usize, sigma: f64) -> (usize, usize, usize) {
    let n = passes as f64;
    let variance = 12.0 * sigma * sigma;
    let ideal = (variance / n + 1.0).sqrt().floor() as usize;
    let lower = if ideal % 2 == 0 { ideal.saturating_sub(1) } else { ideal };
    let upper = lower + 2;
    let wl = lower as f64;
    let m = ((variance - n * wl * wl - 4.0 * n * wl - 3.0 * n) / (-4.0 * wl - 4.0)).round();
    let lower_passes = m.clamp(0.0, n) as usize;
    (lower, upper, lower_passes)
}

/// Approximate Gaussian blur of standard deviation `sigma` built from
/// `pass_count` successive box filters.
pub fn gaussian_filter(input: &[f64], pass_count: f64, sigma: f64) -> Vec<f64> {
    let passes = if pass_count.is_finite() && pass_count > 0.0 {
        pass_count as usize
    } else {
        0
    };
    if passes == 0 || input.is_empty() {
        return input.to_vec();
    }

    let (lower, upper, lower_passes) = box_widths(passes, sigma);
    let mut data = input.to_vec();
    for pass in 0..passes {
        let window = if pass < lower_passes { lower } else { upper };
        data = box_filter(&data, window);
    }
    data
}

/// Slope estimate: central differences inside, one-sided at the ends.
pub fn gradient(input: &[f64]) -> Vec<f64> {
    let len = input.len();
    match len {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let mut output = Vec::with_capacity(len);
            output.push(input[1] - input[0]);
            for i in 1..len - 1 {
                output.push((input[i + 1] - input[i - 1]) / 2.0);
            }
            output.push(input[len - 1] - input[len - 2]);
            output
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_reflect_index_mirrors_edges() {
        assert_eq!(reflect_index(0, 4), 0);
        assert_eq!(reflect_index(3, 4), 3);
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        // overshoot past a whole mirror
        assert_eq!(reflect_index(8, 4), 0);
        assert_eq!(reflect_index(-5, 4), 3);
        assert_eq!(reflect_index(-3, 1), 0);
    }

    #[test]
    fn test_box_filter_preserves_length() {
        let input: Vec<f64> = (0..17).map(|i| (i * i) as f64).collect();
        for window in [0, 1, 2, 3, 5, 16, 17, 40] {
            assert_eq!(box_filter(&input, window).len(), input.len());
        }
        assert!(box_filter(&[], 3).is_empty());
    }

    #[test]
    fn test_box_filter_zero_window_is_identity() {
        let input = vec![1.0, 5.0, 2.0];
        assert_eq!(box_filter(&input, 0), input);
    }

    #[test]
    fn test_box_filter_reflects_at_edges() {
        let output = box_filter(&[1.0, 2.0, 3.0, 4.0], 3);
        // windows: [1,1,2] [1,2,3] [2,3,4] [3,4,4]
        let expected = [4.0 / 3.0, 2.0, 3.0, 11.0 / 3.0];
        for (got, want) in output.iter().zip(expected) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_box_filter_window_wider_than_input() {
        // indices -2..3 -> [6, 0, 0, 6, 6], then -1..4 -> [0, 0, 6, 6, 0]
        let output = box_filter(&[0.0, 6.0], 5);
        assert_abs_diff_eq!(output[0], 18.0 / 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(output[1], 12.0 / 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_box_widths() {
        assert_eq!(box_widths(8, 3.0), (3, 5, 5));
        assert_eq!(box_widths(3, 8.0), (15, 17, 2));
    }

    #[test]
    fn test_gaussian_filter_preserves_length_and_constants() {
        let input = vec![2.5; 30];
        let output = gaussian_filter(&input, 8.0, 3.0);
        assert_eq!(output.len(), input.len());
        for value in output {
            assert_abs_diff_eq!(value, 2.5, epsilon = 1e-9);
        }
        assert_eq!(gaussian_filter(&[1.0], 8.0, 3.0).len(), 1);
        assert!(gaussian_filter(&[], 8.0, 3.0).is_empty());
    }

    #[test]
    fn test_gaussian_filter_smooths_step() {
        let mut input = vec![0.0; 20];
        input.extend(vec![10.0; 20]);
        let output = gaussian_filter(&input, 8.0, 3.0);
        assert!(output[19] > 0.0 && output[19] < 10.0);
        assert!(output[20] > 0.0 && output[20] < 10.0);
        for pair in output.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-9);
        }
    }

    #[test]
    fn test_gradient_degenerate_lengths() {
        assert!(gradient(&[]).is_empty());
        assert_eq!(gradient(&[3.0]), vec![0.0]);
        assert_eq!(gradient(&[1.0, 4.0]), vec![3.0, 3.0]);
    }

    #[test]
    fn test_gradient_central_and_one_sided() {
        let output = gradient(&[1.0, 2.0, 4.0, 7.0]);
        assert_eq!(output, vec![1.0, 1.5, 2.5, 3.0]);
    }
}
