//! Pure grid transforms shared by the wave and sediment engines.

use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis, Zip};

// Kernel half-width in standard deviations
const TRUNCATE: f64 = 4.0;

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as isize;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k * k) as f64 / (sigma * sigma)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.iter_mut().for_each(|w| *w /= total);
    weights
}

/// Half-sample symmetric reflection (`d c b a | a b c d | d c b a`).
fn reflect(idx: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let k = idx.rem_euclid(period);
    if k >= n {
        (period - k - 1) as usize
    } else {
        k as usize
    }
}

fn convolve_lane(input: ArrayView1<f64>, mut output: ArrayViewMut1<f64>, kernel: &[f64]) {
    let n = input.len();
    let radius = (kernel.len() / 2) as isize;
    for i in 0..n {
        let mut acc = 0.0;
        for (k, w) in kernel.iter().enumerate() {
            acc += w * input[reflect(i as isize + k as isize - radius, n)];
        }
        output[i] = acc;
    }
}

/// Separable Gaussian blur with reflecting boundaries.
///
/// `sigma <= 0` returns the field unchanged.
pub fn gaussian_filter(field: &Array2<f64>, sigma: f64) -> Array2<f64> {
    if sigma <= 0.0 || field.is_empty() {
        return field.clone();
    }
    let kernel = gaussian_kernel(sigma);

    let mut along_i = Array2::<f64>::zeros(field.dim());
    Zip::from(along_i.lanes_mut(Axis(0)))
        .and(field.lanes(Axis(0)))
        .par_for_each(|out, lane| convolve_lane(lane, out, &kernel));

    let mut blurred = Array2::<f64>::zeros(field.dim());
    Zip::from(blurred.lanes_mut(Axis(1)))
        .and(along_i.lanes(Axis(1)))
        .par_for_each(|out, lane| convolve_lane(lane, out, &kernel));
    blurred
}

/// Per-axis derivative in index units, second-order accurate everywhere.
///
/// Returns `(d/di, d/dj)`. Edges use one-sided three-point stencils.
pub fn gradient(field: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let along = |axis: Axis| {
        let mut out = Array2::<f64>::zeros(field.dim());
        Zip::from(out.lanes_mut(axis))
            .and(field.lanes(axis))
            .for_each(|mut d, f| {
                let n = f.len();
                match n {
                    0 | 1 => {}
                    2 => {
                        d[0] = f[1] - f[0];
                        d[1] = d[0];
                    }
                    _ => {
                        d[0] = (-3.0 * f[0] + 4.0 * f[1] - f[2]) / 2.0;
                        for i in 1..n - 1 {
                            d[i] = (f[i + 1] - f[i - 1]) / 2.0;
                        }
                        d[n - 1] = (3.0 * f[n - 1] - 4.0 * f[n - 2] + f[n - 3]) / 2.0;
                    }
                }
            });
        out
    };
    (along(Axis(0)), along(Axis(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn reflect_folds_indices() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(9, 4), 1);
    }

    #[test]
    fn blur_spreads_a_spike_and_keeps_its_mass() {
        let mut field = Array2::<f64>::zeros((9, 7));
        field[[4, 3]] = 10.0;
        let blurred = gaussian_filter(&field, 1.0);
        assert_abs_diff_eq!(blurred.sum(), 10.0, epsilon = 1e-10);
        assert!(blurred[[4, 3]] < 10.0);
        assert!(blurred[[5, 3]] > 0.0);
        assert_abs_diff_eq!(blurred[[3, 3]], blurred[[5, 3]], epsilon = 1e-12);
    }

    #[test]
    fn blur_leaves_constant_field_untouched() {
        let field = Array2::from_elem((5, 6), 2.5);
        let blurred = gaussian_filter(&field, 2.0);
        for v in blurred.iter() {
            assert_abs_diff_eq!(*v, 2.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn gradient_is_exact_for_quadratics() {
        let field = Array2::from_shape_fn((6, 5), |(i, j)| {
            let (x, y) = (i as f64, j as f64);
            x * x + 3.0 * y
        });
        let (gx, gy) = gradient(&field);
        for ((i, j), v) in gx.indexed_iter() {
            assert_abs_diff_eq!(*v, 2.0 * i as f64, epsilon = 1e-12);
            assert_abs_diff_eq!(gy[[i, j]], 3.0, epsilon = 1e-12);
        }
    }
}
