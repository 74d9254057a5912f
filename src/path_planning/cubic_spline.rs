// Natural cubic spline y = f(x) through sparse anchor points
// https://github.com/AtsushiSakai/PythonRobotics/tree/master/PathPlanning/CubicSpline
// https://github.com/onlytailei/CppRobotics/blob/master/include/cubic_spline.h
//
// Author: Atsushi Sakai(@Atsushi_twi)
//         TAI Lei
//         Ryohei Sasaki(@rsasaki0109)

extern crate nalgebra as na;
use itertools::Itertools;

use crate::common::{PlanningError, PlanningResult};

/// Piecewise cubic `a + b*dx + c*dx^2 + d*dx^3` per interval, C2 at the knots
#[derive(Debug, Clone)]
pub struct CubicSpline {
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
    x: Vec<f64>,
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> PlanningResult<CubicSpline> {
        if x.len() != y.len() {
            return Err(PlanningError::NumericalError(format!(
                "spline x/y length mismatch: {} vs {}",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(PlanningError::NumericalError("spline needs at least 2 points".to_string()));
        }
        if !x.iter().tuple_windows().all(|(x0, x1)| x1 > x0) {
            return Err(PlanningError::NumericalError(
                "spline x must be strictly increasing".to_string(),
            ));
        }

        let nx = x.len();
        let h: Vec<f64> = x.iter().tuple_windows().map(|(x0, x1)| x1 - x0).collect();
        let a = y.to_vec();

        let a_mat = CubicSpline::calc_a(&h);
        let b_mat = CubicSpline::calc_b(&h, &a);
        let c_na = a_mat.lu().solve(&b_mat).ok_or_else(|| {
            PlanningError::NumericalError("singular spline system".to_string())
        })?;
        let c: Vec<f64> = c_na.iter().copied().collect();

        let mut b: Vec<f64> = Vec::with_capacity(nx - 1);
        let mut d: Vec<f64> = Vec::with_capacity(nx - 1);
        for i in 0..nx - 1 {
            d.push((c[i + 1] - c[i]) / (3. * h[i]));
            b.push((a[i + 1] - a[i]) / h[i] - h[i] * (c[i + 1] + 2.0 * c[i]) / 3.0);
        }

        Ok(CubicSpline { a, b, c, d, x: x.to_vec() })
    }

    /// Value at `t`; outside the knots the end polynomials are extended
    pub fn calc(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        self.a[i] + self.b[i] * dx + self.c[i] * dx.powi(2) + self.d[i] * dx.powi(3)
    }

    pub fn calcd(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        self.b[i] + 2. * self.c[i] * dx + 3. * self.d[i] * dx.powi(2)
    }

    pub fn calcdd(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        2. * self.c[i] + 6. * self.d[i] * dx
    }

    fn search_index(&self, t: f64) -> usize {
        let last_interval = self.x.len() - 2;
        self.x.partition_point(|&xi| xi <= t).saturating_sub(1).min(last_interval)
    }

    fn calc_a(h: &[f64]) -> na::DMatrix<f64> {
        let nx = h.len() + 1;
        let mut a = na::DMatrix::zeros(nx, nx);
        a[(0, 0)] = 1.;
        for i in 0..nx - 1 {
            if i != nx - 2 {
                a[(i + 1, i + 1)] = 2.0 * (h[i] + h[i + 1]);
            }
            a[(i + 1, i)] = h[i];
            a[(i, i + 1)] = h[i];
        }
        a[(0, 1)] = 0.;
        a[(nx - 1, nx - 2)] = 0.;
        a[(nx - 1, nx - 1)] = 1.;
        a
    }

    fn calc_b(h: &[f64], a: &[f64]) -> na::DVector<f64> {
        let nx = h.len() + 1;
        let mut b = na::DVector::zeros(nx);
        for i in 0..nx - 2 {
            b[i + 1] = 3.0 * (a[i + 2] - a[i + 1]) / h[i + 1] - 3.0 * (a[i + 1] - a[i]) / h[i];
        }
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn anchors() -> (Vec<f64>, Vec<f64>) {
        (vec![-1.0, 0.0, 30.0, 60.0, 90.0], vec![0.0, 0.0, 1.5, 3.5, 4.0])
    }

    #[test]
    fn test_passes_through_anchors() {
        let (x, y) = anchors();
        let sp = CubicSpline::new(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(y.iter()) {
            assert_relative_eq!(sp.calc(*xi), *yi, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_linear_data_stays_linear() {
        let x = vec![0.0, 1.0, 3.0, 7.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let sp = CubicSpline::new(&x, &y).unwrap();
        assert_relative_eq!(sp.calc(2.0), 5.0, epsilon = 1e-9);
        assert_relative_eq!(sp.calcd(5.5), 2.0, epsilon = 1e-9);
        assert_relative_eq!(sp.calcdd(0.5), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_derivative_continuous_at_knots() {
        let (x, y) = anchors();
        let sp = CubicSpline::new(&x, &y).unwrap();
        let eps = 1e-7;
        for &k in &x[1..x.len() - 1] {
            assert_relative_eq!(sp.calcd(k - eps), sp.calcd(k + eps), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_natural_boundary() {
        let (x, y) = anchors();
        let sp = CubicSpline::new(&x, &y).unwrap();
        assert_relative_eq!(sp.calcdd(x[0]), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_non_monotonic_x() {
        let result = CubicSpline::new(&[0.0, 2.0, 1.0], &[0.0, 1.0, 2.0]);
        assert!(matches!(result, Err(PlanningError::NumericalError(_))));
        let result = CubicSpline::new(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_too_few_points() {
        assert!(CubicSpline::new(&[0.0], &[0.0]).is_err());
        assert!(CubicSpline::new(&[0.0, 1.0], &[0.0]).is_err());
    }

    #[test]
    fn test_extrapolation_is_finite() {
        let (x, y) = anchors();
        let sp = CubicSpline::new(&x, &y).unwrap();
        assert!(sp.calc(100.0).is_finite());
        assert!(sp.calc(-5.0).is_finite());
    }
}
