use std::cmp::Ordering;

use ndarray::{Array1, Array2};
use num_traits::{Float, ToPrimitive};

/// Convert a primitive number into the working float type `E`
///
/// Values which cannot be represented in `E` become NaN, which every consumer downstream treats
/// as unusable rather than as a plausible number.
pub fn to_float<E: Float, T: ToPrimitive>(value: T) -> E {
    E::from(value).unwrap_or_else(E::nan)
}

/// Generate the Vandermonde matrix for observations `x` with columns for powers `lowest` to
/// `degree` inclusive
///
/// Each row of the matrix is a geometric progression for an individual observation. A full
/// Vandermonde matrix has `lowest == 0`, a fit constrained through the origin uses `lowest == 1`
/// to drop the constant column.
///
/// # Panics
///
/// The generator panics in the event that `degree` cannot be converted to `i32`. The polynomial
/// degrees used for calibration curves are tiny, so this is not handled gracefully.
///
/// # Examples
///
/// ```
/// use colorimetry::math::vandermonde;
/// use ndarray::arr2;
///
/// let observations: Vec<f64> = vec![2., 3.];
/// let vander = vandermonde(&observations, 0, 2);
///
/// let expected = arr2(&[[1., 2., 4.], [1., 3., 9.]]);
/// assert_eq!(vander, expected);
/// ```
pub fn vandermonde<E: Float>(x: &[E], lowest: usize, degree: usize) -> Array2<E> {
    let columns = (degree + 1).saturating_sub(lowest);
    Array2::from_shape_fn((x.len(), columns), |(ii, jj)| {
        let power = lowest + jj;
        x[ii].powi(i32::try_from(power).expect("polynomial degree doesn't fit in `i32`"))
    })
}

/// Solve the square linear system `matrix . solution = rhs`
///
/// Gaussian elimination with partial pivoting. Returns `None` when a pivot vanishes relative to
/// the largest element of `matrix`, or when the solution is not finite.
///
/// # Panics
///
/// If `matrix` is not square with the same dimension as `rhs`.
pub fn solve<E: Float>(mut matrix: Array2<E>, mut rhs: Array1<E>) -> Option<Array1<E>> {
    let n = rhs.len();
    assert_eq!(matrix.dim(), (n, n), "solve requires a square system");

    let scale = matrix.iter().fold(E::zero(), |acc, value| acc.max(value.abs()));
    if scale == E::zero() || !scale.is_finite() {
        return None;
    }
    let tolerance = scale * E::epsilon() * to_float::<E, _>(64 * n);

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&a, &b| {
            matrix[[a, col]]
                .abs()
                .partial_cmp(&matrix[[b, col]].abs())
                .unwrap_or(Ordering::Equal)
        })?;
        if matrix[[pivot_row, col]].abs() <= tolerance {
            return None;
        }
        if pivot_row != col {
            for k in 0..n {
                matrix.swap([col, k], [pivot_row, k]);
            }
            rhs.swap(col, pivot_row);
        }

        for row in (col + 1)..n {
            let factor = matrix[[row, col]] / matrix[[col, col]];
            for k in col..n {
                let delta = factor * matrix[[col, k]];
                matrix[[row, k]] = matrix[[row, k]] - delta;
            }
            let delta = factor * rhs[col];
            rhs[row] = rhs[row] - delta;
        }
    }

    // Back substitution on the upper triangular system
    let mut solution: Array1<E> = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail = ((row + 1)..n).fold(E::zero(), |acc, k| acc + matrix[[row, k]] * solution[k]);
        solution[row] = (rhs[row] - tail) / matrix[[row, row]];
    }

    solution.iter().all(|value| value.is_finite()).then_some(solution)
}
