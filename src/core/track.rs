//! Ascending/descending track separation

use crate::types::{SimError, SimResult};
use ndarray::Array1;

/// Label each sample as ascending (`true`) or descending (`false`).
///
/// The series is split into two pieces at the first index of maximum |lat|:
/// `[0, k)` and `[k, n)`. A piece is ascending when latitude at its latest
/// time is greater than latitude at its earliest time. Pieces with fewer than
/// two samples stay descending. Assumes at most one direction change per file.
pub fn orbit_type(time: &Array1<f64>, lat: &Array1<f64>) -> SimResult<Array1<bool>> {
    if time.len() != lat.len() {
        return Err(SimError::LengthMismatch {
            field: "lat".to_string(),
            expected: time.len(),
            actual: lat.len(),
        });
    }

    let n = lat.len();
    let mut is_asc = Array1::from_elem(n, false);
    if n == 0 {
        return Ok(is_asc);
    }

    let breakpoint = argmax(lat.iter().map(|v| v.abs()));

    for (start, end) in [(0, breakpoint), (breakpoint, n)] {
        if end - start < 2 {
            continue;
        }

        let piece_time = time.slice(ndarray::s![start..end]);
        let i_min = start + argmin(piece_time.iter().copied());
        let i_max = start + argmax(piece_time.iter().copied());

        if lat[i_max] - lat[i_min] > 0.0 {
            is_asc.slice_mut(ndarray::s![start..end]).fill(true);
        }
    }

    Ok(is_asc)
}

/// First index of the maximum; NaN wins like in a NaN-propagating reduction
fn argmax<I: Iterator<Item = f64>>(values: I) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v.is_nan() {
            return i;
        }
        if i == 0 || v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

fn argmin<I: Iterator<Item = f64>>(values: I) -> usize {
    argmax(values.map(|v| -v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_monotonic_ascending_series() {
        let time = array![0.0, 1.0, 2.0, 3.0, 4.0];
        let lat = array![60.0, 61.0, 62.0, 63.0, 64.0];
        let is_asc = orbit_type(&time, &lat).unwrap();
        // breakpoint at the last sample: [0, 4) ascends, [4, 5) is a single point
        assert_eq!(is_asc.to_vec(), vec![true, true, true, true, false]);
    }

    #[test]
    fn test_descending_series_with_southern_peak() {
        let time = array![0.0, 1.0, 2.0, 3.0];
        let lat = array![-60.0, -61.0, -62.0, -63.0];
        let is_asc = orbit_type(&time, &lat).unwrap();
        assert!(is_asc.iter().all(|&a| !a));
    }

    #[test]
    fn test_turnaround_splits_into_two_pieces() {
        let time = array![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let lat = array![80.0, 81.0, 81.9, 81.5, 80.5, 79.0];
        let is_asc = orbit_type(&time, &lat).unwrap();
        assert_eq!(is_asc.to_vec(), vec![true, true, false, false, false, false]);
    }

    #[test]
    fn test_peak_at_start_uses_single_piece() {
        let time = array![0.0, 1.0, 2.0];
        let lat = array![-70.0, -69.0, -68.0];
        // |lat| max at index 0, so the whole series is one piece and it ascends
        let is_asc = orbit_type(&time, &lat).unwrap();
        assert_eq!(is_asc.to_vec(), vec![true, true, true]);
    }

    #[test]
    fn test_short_inputs() {
        assert_eq!(orbit_type(&Array1::zeros(0), &Array1::zeros(0)).unwrap().len(), 0);
        assert_eq!(orbit_type(&array![1.0], &array![70.0]).unwrap().to_vec(), vec![false]);
        assert!(orbit_type(&array![1.0, 2.0], &array![70.0]).is_err());
    }
}
