//! Interpolating cubic splines on evenly spaced samples.
//!
//! Bivariate resampling is done as a tensor product: every lane along x is
//! splined onto the target x nodes, then every lane along y. Both passes use
//! not-a-knot end conditions, so cubic data is reproduced exactly.

use crate::grid::Grid;
use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};

/// Cubic spline through `values` sampled at `x0 + k·h`.
#[derive(Debug, Clone)]
pub struct UniformSpline {
    x0: f64,
    h: f64,
    values: Vec<f64>,
    second: Vec<f64>,
}

impl UniformSpline {
    pub fn new(x0: f64, h: f64, values: ArrayView1<f64>) -> Self {
        let values: Vec<f64> = values.to_vec();
        let second = second_derivatives(&values, h);
        UniformSpline {
            x0,
            h,
            values,
            second,
        }
    }

    pub fn eval(&self, t: f64) -> f64 {
        let n = self.values.len();
        if n == 1 || self.h == 0.0 {
            return self.values[0];
        }
        let s = (t - self.x0) / self.h;
        let k = (s.floor().max(0.0) as usize).min(n - 2);
        let b = s - k as f64;
        let a = 1.0 - b;
        let (m0, m1) = (self.second[k], self.second[k + 1]);
        a * self.values[k]
            + b * self.values[k + 1]
            + ((a * a * a - a) * m0 + (b * b * b - b) * m1) * self.h * self.h / 6.0
    }
}

/// Second derivatives at the knots with not-a-knot end conditions.
///
/// With uniform spacing the end conditions collapse to `M1 = r1/6` and
/// `M[n-2] = r[n-2]/6`, which leaves a tridiagonal system for the interior.
fn second_derivatives(y: &[f64], h: f64) -> Vec<f64> {
    let n = y.len();
    let mut m = vec![0.0; n];
    if n < 3 || h == 0.0 {
        return m;
    }
    let r = |i: usize| 6.0 * (y[i + 1] - 2.0 * y[i] + y[i - 1]) / (h * h);
    if n == 3 {
        m.fill(r(1) / 6.0);
        return m;
    }

    m[1] = r(1) / 6.0;
    m[n - 2] = r(n - 2) / 6.0;

    // Thomas algorithm on M[i-1] + 4 M[i] + M[i+1] = r[i], i = 2..=n-3
    if n > 4 {
        let len = n - 4;
        let mut c = vec![0.0; len];
        let mut d = vec![0.0; len];
        for k in 0..len {
            let i = k + 2;
            let mut rhs = r(i);
            if i == 2 {
                rhs -= m[1];
            }
            if i == n - 3 {
                rhs -= m[n - 2];
            }
            let (c_prev, d_prev) = if k == 0 { (0.0, 0.0) } else { (c[k - 1], d[k - 1]) };
            let denom = 4.0 - c_prev;
            c[k] = 1.0 / denom;
            d[k] = (rhs - d_prev) / denom;
        }
        for k in (0..len).rev() {
            let next = if k + 1 < len { m[k + 3] } else { 0.0 };
            m[k + 2] = d[k] - c[k] * next;
        }
    }

    m[0] = 2.0 * m[1] - m[2];
    m[n - 1] = 2.0 * m[n - 2] - m[n - 3];
    m
}

fn spacing(coords: &Array1<f64>) -> f64 {
    if coords.len() > 1 {
        (coords[coords.len() - 1] - coords[0]) / (coords.len() - 1) as f64
    } else {
        0.0
    }
}

/// Interpolate `field` defined on `from` onto the nodes of `to`.
pub fn resample(field: &Array2<f64>, from: &Grid, to: &Grid) -> Array2<f64> {
    let (hx, hy) = (spacing(&from.x), spacing(&from.y));

    let mut along_x = Array2::<f64>::zeros((to.nx, from.ny));
    Zip::from(along_x.lanes_mut(Axis(0)))
        .and(field.lanes(Axis(0)))
        .par_for_each(|mut out, lane| {
            let spline = UniformSpline::new(from.x[0], hx, lane);
            for (o, &t) in out.iter_mut().zip(to.x.iter()) {
                *o = spline.eval(t);
            }
        });

    let mut result = Array2::<f64>::zeros((to.nx, to.ny));
    Zip::from(result.lanes_mut(Axis(1)))
        .and(along_x.lanes(Axis(1)))
        .par_for_each(|mut out, lane| {
            let spline = UniformSpline::new(from.y[0], hy, lane);
            for (o, &t) in out.iter_mut().zip(to.y.iter()) {
                *o = spline.eval(t);
            }
        });

    result
}
