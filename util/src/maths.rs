//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::DVector;
use num_traits::Float;

/// Return the largest absolute element-wise difference between two vectors,
/// along with the index at which it occurs.
///
/// If the vectors are empty or have different lengths `None` is returned.
pub fn max_abs_diff<T>(a: &[T], b: &[T]) -> Option<(usize, T)>
where
    T: Float,
{
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut max = (0, T::zero());

    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (*x - *y).abs();
        if diff > max.1 {
            max = (i, diff);
        }
    }

    Some(max)
}

/// Returns true if any element of `|a - b|` is strictly greater than the
/// matching element of `tolerance`.
///
/// Vectors of different lengths never exceed the tolerance.
pub fn tolerance_exceeded(a: &DVector<f64>, b: &DVector<f64>, tolerance: &DVector<f64>) -> bool {
    if a.len() != b.len() || a.len() != tolerance.len() {
        return false;
    }

    a.iter()
        .zip(b.iter())
        .zip(tolerance.iter())
        .any(|((x, y), tol)| (x - y).abs() > *tol)
}

/// Returns true if all elements are finite (not NaN or infinite).
pub fn all_finite<T>(values: &[T]) -> bool
where
    T: Float,
{
    values.iter().all(|v| v.is_finite())
}
