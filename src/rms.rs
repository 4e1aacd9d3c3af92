//! Map noise
//!
//! One-sided RMS estimate: only the samples below the median enter the
//! variance, the positive-going source emission being left out.

use crate::Image;

#[derive(thiserror::Error, Debug)]
pub enum RmsError {
    #[error("{0} samples below the median, at least 2 are required")]
    DegenerateStatistics(usize),
}
type Result<T> = std::result::Result<T, RmsError>;

/// Median of the samples, reordering them in place
pub fn median(data: &mut [f64]) -> Option<f64> {
    let n = data.len();
    if n == 0 {
        return None;
    }
    let (lower, &mut upper, _) = data.select_nth_unstable_by(n / 2, f64::total_cmp);
    if n % 2 == 1 {
        Some(upper)
    } else {
        let lower = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(0.5 * (lower + upper))
    }
}

/// Returns the image noise RMS
///
/// `rms = sqrt(2 * sum((x - median)^2) / (n - 1))` over the `n` finite samples strictly
/// below the median; the factor 2 accounts for the missing upper half of the noise.
pub fn estimate(image: &Image) -> Result<f64> {
    let mut data: Vec<f64> = image.iter().copied().filter(|x| x.is_finite()).collect();
    let mid = median(&mut data).ok_or(RmsError::DegenerateStatistics(0))?;
    let (n, sum_sq) = data
        .iter()
        .filter(|&&x| x < mid)
        .fold((0usize, 0f64), |(n, s), &x| (n + 1, s + (x - mid).powi(2)));
    if n < 2 {
        return Err(RmsError::DegenerateStatistics(n));
    }
    let rms = (2f64 * sum_sq / (n - 1) as f64).sqrt();
    log::debug!("rms: {:.3e} from {} samples below median {:.3e}", rms, n, mid);
    Ok(rms)
}
