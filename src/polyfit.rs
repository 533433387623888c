use std::ops::Range;

use ndarray::{s, Array1, LinalgScalar};
use num_traits::{Float, ToPrimitive};

use crate::error::{Degeneracy, Error};
use crate::math::{solve, vandermonde};
use crate::Result;

/// Whether a fit estimates a constant term
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intercept {
    /// Fit every power from zero to the degree
    Free,
    /// Force the curve through the origin by omitting the constant term
    ThroughOrigin,
}

impl Intercept {
    const fn lowest_power(self) -> usize {
        match self {
            Self::Free => 0,
            Self::ThroughOrigin => 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FitResult<E> {
    /// Coefficient `ii` multiplies `x^ii`. For fits through the origin element zero is exactly
    /// zero.
    coefficients: Array1<E>,
    intercept: Intercept,
    /// The range of observations the fit was generated from
    window: Range<E>,
    num_points: usize,
    residual_sum_of_squares: Option<E>,
    total_sum_of_squares: E,
}

impl<E: Float> FitResult<E> {
    pub const fn coefficients(&self) -> &Array1<E> {
        &self.coefficients
    }

    pub const fn intercept(&self) -> Intercept {
        self.intercept
    }

    pub const fn window(&self) -> &Range<E> {
        &self.window
    }

    /// Whether `x` lies inside the (closed) range of observations used for the fit
    pub fn window_contains(&self, x: &E) -> bool {
        self.window.start <= *x && *x <= self.window.end
    }

    pub const fn num_points(&self) -> usize {
        self.num_points
    }

    /// Evaluate the fitted polynomial at `x`
    pub fn evaluate(&self, x: E) -> E {
        self.coefficients
            .iter()
            .rev()
            .fold(E::zero(), |acc, &coeff| acc * x + coeff)
    }

    /// The weighted sum of squared residuals
    ///
    /// Only available when there are more observations than fitted coefficients. With exactly as
    /// many points as coefficients the curve interpolates the data and the residual carries no
    /// information.
    pub fn residual_sum_of_squares(&self) -> Option<E> {
        self.residual_sum_of_squares
    }

    /// Coefficient of determination, `1 - RSS / TSS`
    ///
    /// For a fit through the origin TSS is the uncentred sum of squares of the observations,
    /// otherwise it is taken about the weighted mean.
    pub fn r_squared(&self) -> Option<E> {
        let rss = self.residual_sum_of_squares?;
        if self.total_sum_of_squares == E::zero() {
            return None;
        }
        Some(E::one() - rss / self.total_sum_of_squares)
    }
}

/// Weighted least squares polynomial fit of `y` against `x`
///
/// `weights` default to unity. They should be the inverse variances of the observations, and
/// must be non-negative.
///
/// # Errors
/// - [`Degeneracy::TooFewPoints`] when there are fewer observations than coefficients
/// - [`Degeneracy::Singular`] when the normal equations have no unique solution, for example
///   when every `x` is identical in a fit with a free intercept
///
/// # Panics
/// If `x`, `y` and `weights` differ in length, or if a fit through the origin is requested with
/// `degree == 0` (there would be nothing to fit).
pub fn polyfit<E: Float + LinalgScalar>(
    x: &[E],
    y: &[E],
    degree: usize,
    weights: Option<&[E]>,
    intercept: Intercept,
) -> Result<FitResult<E>> {
    assert_eq!(x.len(), y.len(), "observations must be paired");
    if let Some(weights) = weights {
        assert_eq!(x.len(), weights.len(), "one weight is required per observation");
    }

    let lowest = intercept.lowest_power();
    assert!(degree >= lowest, "a fit through the origin needs degree >= 1");
    let num_coefficients = degree + 1 - lowest;
    let num_points = x.len();

    if num_points < num_coefficients {
        return Err(Error::DegenerateFit(Degeneracy::TooFewPoints {
            found: num_points,
            required: num_coefficients,
        }));
    }

    let weights: Array1<E> =
        weights.map_or_else(|| Array1::ones(num_points), |w| Array1::from(w.to_vec()));
    let observed = Array1::from(y.to_vec());

    // Scale each row of the system by the root of its weight, so the normal equations minimise
    // the weighted residual
    let design = vandermonde(x, lowest, degree);
    let root_weights = weights.mapv(Float::sqrt);
    let mut weighted_design = design.clone();
    for (mut row, &w) in weighted_design.rows_mut().into_iter().zip(root_weights.iter()) {
        row.mapv_inplace(|value| value * w);
    }
    let weighted_observed = &observed * &root_weights;

    let normal_matrix = weighted_design.t().dot(&weighted_design);
    let normal_rhs = weighted_design.t().dot(&weighted_observed);
    let solution =
        solve(normal_matrix, normal_rhs).ok_or(Error::DegenerateFit(Degeneracy::Singular))?;

    let residuals = &observed - &design.dot(&solution);
    let rss = (residuals.mapv(|r| r * r) * &weights).sum();

    let total_sum_of_squares = match intercept {
        Intercept::ThroughOrigin => (observed.mapv(|v| v * v) * &weights).sum(),
        Intercept::Free => {
            let total_weight = weights.sum();
            let mean = (&observed * &weights).sum() / total_weight;
            (observed.mapv(|v| (v - mean) * (v - mean)) * &weights).sum()
        }
    };

    let mut coefficients: Array1<E> = Array1::zeros(degree + 1);
    coefficients.slice_mut(s![lowest..]).assign(&solution);

    let window = x.iter().fold(
        Range {
            start: E::infinity(),
            end: E::neg_infinity(),
        },
        |window, &xi| Range {
            start: window.start.min(xi),
            end: window.end.max(xi),
        },
    );

    tracing::trace!(
        num_points,
        degree,
        ?intercept,
        rss = rss.to_f64(),
        "polynomial fit complete"
    );

    Ok(FitResult {
        coefficients,
        intercept,
        window,
        num_points,
        residual_sum_of_squares: (num_points > num_coefficients).then_some(rss),
        total_sum_of_squares,
    })
}

#[cfg(test)]
mod tests {
    use std::ops::Range;

    use ndarray_rand::rand::{Rng, SeedableRng};
    use rand_isaac::Isaac64Rng;

    use super::{polyfit, Intercept};
    use crate::error::{Degeneracy, Error};

    struct GeneratedPolynomial<const N: usize> {
        x: Vec<f64>,
        y: Vec<f64>,
        coeffs: [f64; N],
    }

    #[allow(clippy::cast_precision_loss)]
    fn generate_polynomial<const N: usize>(
        rng: &mut impl Rng,
        num_samples: usize,
        window: Range<f64>,
    ) -> GeneratedPolynomial<N> {
        let x = (0..num_samples)
            .map(|n| window.start + (window.end - window.start) * n as f64 / num_samples as f64)
            .collect::<Vec<_>>();

        let mut coeffs = [0f64; N];
        for coeff in &mut coeffs {
            *coeff = rng.gen();
        }

        let y = x
            .iter()
            .map(|x| {
                coeffs
                    .iter()
                    .enumerate()
                    .map(|(ii, ci)| ci * x.powi(i32::try_from(ii).unwrap()))
                    .sum()
            })
            .collect::<Vec<f64>>();

        GeneratedPolynomial { x, y, coeffs }
    }

    #[test]
    fn polynomial_coefficients_are_recovered_from_exact_data() {
        const DEGREE: usize = 3;

        let seed = 40;
        let mut rng = Isaac64Rng::seed_from_u64(seed);
        let num_samples = rng.gen_range(10..100);
        let polynomial: GeneratedPolynomial<{ DEGREE + 1 }> =
            generate_polynomial(&mut rng, num_samples, 0.0..2.0);

        let fit = polyfit(&polynomial.x, &polynomial.y, DEGREE, None, Intercept::Free).unwrap();

        for (expected, calculated) in polynomial.coeffs.iter().zip(fit.coefficients()) {
            approx::assert_relative_eq!(expected, calculated, max_relative = 1e-6);
        }
        approx::assert_relative_eq!(fit.r_squared().unwrap(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn fit_through_origin_matches_closed_form_slope() {
        let seed = 40;
        let mut rng = Isaac64Rng::seed_from_u64(seed);

        let x = (1..20).map(f64::from).collect::<Vec<_>>();
        let y = x
            .iter()
            .map(|xi| 0.3 * xi + rng.gen_range(-0.05..0.05))
            .collect::<Vec<_>>();

        let fit = polyfit(&x, &y, 1, None, Intercept::ThroughOrigin).unwrap();

        let sxy: f64 = x.iter().zip(&y).map(|(xi, yi)| xi * yi).sum();
        let sxx: f64 = x.iter().map(|xi| xi * xi).sum();
        assert_eq!(fit.coefficients()[0], 0.0);
        approx::assert_relative_eq!(fit.coefficients()[1], sxy / sxx, max_relative = 1e-12);
        let r_squared = fit.r_squared().unwrap();
        assert!(r_squared > 0.99 && r_squared <= 1.0);
    }

    #[test]
    fn single_point_through_origin_has_no_residual_statistic() {
        let fit = polyfit(&[2.0], &[0.6], 1, None, Intercept::ThroughOrigin).unwrap();

        approx::assert_relative_eq!(fit.coefficients()[1], 0.3);
        assert!(fit.residual_sum_of_squares().is_none());
        assert!(fit.r_squared().is_none());
    }

    #[test]
    fn free_line_through_two_points_interpolates() {
        let fit = polyfit(&[1.0, 3.0], &[2.0, 6.0], 1, None, Intercept::Free).unwrap();

        approx::assert_relative_eq!(fit.evaluate(2.0), 4.0, epsilon = 1e-12);
        assert!(fit.r_squared().is_none());
    }

    #[test]
    fn identical_abscissae_are_singular_for_a_free_fit() {
        let result = polyfit(&[0.5, 0.5, 0.5], &[1.0, 2.0, 3.0], 1, None, Intercept::Free);
        assert!(matches!(
            result,
            Err(Error::DegenerateFit(Degeneracy::Singular))
        ));
    }

    #[test]
    fn fewer_points_than_coefficients_are_rejected() {
        let result = polyfit(&[0.5], &[1.0], 1, None, Intercept::Free);
        assert!(matches!(
            result,
            Err(Error::DegenerateFit(Degeneracy::TooFewPoints {
                found: 1,
                required: 2
            }))
        ));

        let result = polyfit::<f64>(&[], &[], 1, None, Intercept::ThroughOrigin);
        assert!(matches!(
            result,
            Err(Error::DegenerateFit(Degeneracy::TooFewPoints {
                found: 0,
                required: 1
            }))
        ));
    }

    #[test]
    fn zero_weight_removes_an_outlier() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 100.0];
        let weights = [1.0, 1.0, 1.0, 0.0];

        let fit = polyfit(&x, &y, 1, Some(&weights), Intercept::Free).unwrap();

        approx::assert_relative_eq!(fit.coefficients()[0], 0.0, epsilon = 1e-10);
        approx::assert_relative_eq!(fit.coefficients()[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn window_spans_the_observations() {
        let fit = polyfit(&[3.0, 1.0, 2.0], &[1.0, 2.0, 3.0], 1, None, Intercept::Free).unwrap();

        assert_eq!(fit.window(), &(1.0..3.0));
        assert!(fit.window_contains(&3.0));
        assert!(!fit.window_contains(&3.5));
        assert_eq!(fit.num_points(), 3);
    }
}
