//! Segment-difference outlier filter for ATL06 land-ice segments

use crate::types::{SimError, SimResult};
use ndarray::Array1;

/// Along-track distance between ATL06 segment centers (m)
pub const ALONG_TRACK_SPACING: f64 = 20.0;

/// Default segment-difference tolerance (m)
pub const DEFAULT_TOLERANCE: f64 = 2.0;

/// Flag segments whose elevation is consistent with their neighbors.
///
/// Each segment is extrapolated one spacing forward and backward along its
/// fitted slope. Segment `i` gets the larger of `|h[i] + d*s[i] - h[i+1]|`
/// and `|h[i-1] - (h[i] - d*s[i])|`; end segments only have one of the two.
/// Segments with a discrepancy below `tol` are kept. Fewer than three samples
/// cannot be filtered and are all kept.
pub fn segment_diff_filter(
    dh_fit_dx: &Array1<f64>,
    h_li: &Array1<f64>,
    tol: f64,
) -> SimResult<Array1<bool>> {
    if dh_fit_dx.len() != h_li.len() {
        return Err(SimError::LengthMismatch {
            field: "dh_fit_dx".to_string(),
            expected: h_li.len(),
            actual: dh_fit_dx.len(),
        });
    }

    let n = h_li.len();
    if n < 3 {
        return Ok(Array1::from_elem(n, true));
    }

    let ep_plus = h_li + &(dh_fit_dx * ALONG_TRACK_SPACING);
    let ep_minus = h_li - &(dh_fit_dx * ALONG_TRACK_SPACING);

    let mut seg_diff = Array1::<f64>::zeros(n);
    for i in 0..n - 1 {
        seg_diff[i] = (ep_plus[i] - h_li[i + 1]).abs();
    }
    for i in 1..n {
        seg_diff[i] = nan_max(seg_diff[i], (h_li[i - 1] - ep_minus[i]).abs());
    }

    Ok(seg_diff.mapv(|d| d < tol))
}

/// Maximum that propagates NaN
fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}
