use crate::airy::{group_ratio, PropagationOutput};
use crate::coast::Classification;
use crate::filters::{gaussian_filter, gradient};
use crate::materials::{MaterialProperties, GRAVITY, RHO_WATER};
use ndarray::{Array2, Zip};
use std::f64::consts::{PI, TAU};

/// McCowan (1894) breaking ratio H/d
pub const BREAKING_RATIO: f64 = 0.78;

/// Wave quantities over the compute grid for one scenario.
#[derive(Debug, Clone)]
pub struct WaveField {
    pub celerity: Array2<f64>,
    pub wavelength: Array2<f64>,
    pub height: Array2<f64>,
    pub travel: Array2<f64>,    // Arrival time, -1 where unreached
    pub direction: Array2<f64>, // Radians in [0, 2π)
    pub period: Array2<f64>,
    pub power: Array2<f64>,
    pub bottom_velocity: Array2<f64>,
    pub shear_stress: Array2<f64>,
    pub transport_x: Array2<f64>,
    pub transport_y: Array2<f64>,
}

/// Wrap an angle into [0, 2π).
pub fn wrap_angle(theta: f64) -> f64 {
    let wrapped = theta.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

impl WaveField {
    pub fn new(nx: usize, ny: usize) -> Self {
        WaveField {
            celerity: Array2::zeros((nx, ny)),
            wavelength: Array2::zeros((nx, ny)),
            height: Array2::zeros((nx, ny)),
            travel: Array2::zeros((nx, ny)),
            direction: Array2::zeros((nx, ny)),
            period: Array2::zeros((nx, ny)),
            power: Array2::zeros((nx, ny)),
            bottom_velocity: Array2::zeros((nx, ny)),
            shear_stress: Array2::zeros((nx, ny)),
            transport_x: Array2::zeros((nx, ny)),
            transport_y: Array2::zeros((nx, ny)),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.height.dim()
    }

    /// Derive the full wave field from raw kernel output.
    ///
    /// `elevation` is the compute-grid elevation the classification was
    /// built from; its gradient gives the bathymetric contour direction
    /// used for longshore transport inside half the wave base.
    pub fn from_propagation(
        raw: PropagationOutput,
        class: &Classification,
        elevation: &Array2<f64>,
        materials: &MaterialProperties,
        wavebase: f64,
        sigma: f64,
    ) -> Self {
        let (nx, ny) = class.depth.dim();
        let mut field = WaveField::new(nx, ny);
        let depth = &class.depth;
        let land = &class.land;

        field.celerity = raw.celerity;
        field.wavelength = raw.wavelength;
        field.travel = raw.travel;

        // Smoothed height, land dry, broken where too steep
        field.height = gaussian_filter(&raw.height, sigma);
        Zip::from(&mut field.height)
            .and(depth)
            .and(land)
            .for_each(|h, &d, &is_land| {
                *h = if is_land {
                    0.0
                } else {
                    h.min(BREAKING_RATIO * d).max(0.0)
                };
            });

        // Fronts move down the travel-time gradient's normal
        let max_travel = field.travel.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let filled = field
            .travel
            .mapv(|t| if t < 0.0 { max_travel + 10.0 } else { t });
        let (gx, gy) = gradient(&filled);
        Zip::from(&mut field.direction)
            .and(&gx)
            .and(&gy)
            .for_each(|dir, &tx, &ty| *dir = wrap_angle(ty.atan2(tx)));

        Zip::from(&mut field.period)
            .and(&field.wavelength)
            .for_each(|t, &l| *t = if l > 0.0 { (TAU * l / GRAVITY).sqrt() } else { 0.0 });

        Zip::from(&mut field.power)
            .and(&field.celerity)
            .and(&field.wavelength)
            .and(&field.height)
            .and(depth)
            .for_each(|p, &c, &l, &h, &d| {
                *p = if l > 0.0 && d > 0.0 {
                    let k = TAU / l;
                    let n = group_ratio(k, d);
                    RHO_WATER * GRAVITY * c * n * h * h / 8.0
                } else {
                    0.0
                };
            });

        Zip::from(&mut field.bottom_velocity)
            .and(&field.height)
            .and(&field.period)
            .and(&field.wavelength)
            .and(depth)
            .for_each(|u, &h, &t, &l, &d| {
                *u = if t > 0.0 && l > 0.0 && d > 0.0 {
                    let s = (TAU * d / l).sinh();
                    if s.is_finite() && s > 0.0 {
                        PI * h / (t * s)
                    } else {
                        0.0
                    }
                } else {
                    0.0
                };
            });

        // Bathymetric contour heading, turned to follow the waves
        let (zx, zy) = gradient(elevation);
        let shallow = 0.5 * wavebase;
        Zip::from(&mut field.transport_x)
            .and(&mut field.transport_y)
            .and(&field.direction)
            .and(&zx)
            .and(&zy)
            .and(depth)
            .for_each(|tx, ty, &wd, &sx, &sy, &d| {
                let heading = if d > 0.0 && d < shallow {
                    let mut contour = wrap_angle(sy.atan2(sx) + 0.5 * PI);
                    if (wd - contour).abs() > 0.5 * PI {
                        contour += PI;
                    }
                    contour
                } else {
                    wd
                };
                *tx = heading.cos();
                *ty = heading.sin();
            });

        Zip::from(&mut field.shear_stress)
            .and(&field.bottom_velocity)
            .and(depth)
            .for_each(|s, &u, &d| {
                *s = 0.5 * RHO_WATER * materials.friction_factor(d) * u * u;
            });

        field.clear_land(land);
        field
    }

    fn clear_land(&mut self, land: &Array2<bool>) {
        let fields = [
            &mut self.wavelength,
            &mut self.height,
            &mut self.direction,
            &mut self.period,
            &mut self.power,
            &mut self.bottom_velocity,
            &mut self.shear_stress,
            &mut self.transport_x,
            &mut self.transport_y,
        ];
        for f in fields {
            Zip::from(f).and(land).for_each(|v, &is_land| {
                if is_land {
                    *v = 0.0;
                }
            });
        }
    }

    pub fn max_height(&self) -> f64 {
        self.height.iter().cloned().fold(0.0, f64::max)
    }

    pub fn max_shear(&self) -> f64 {
        self.shear_stress.iter().cloned().fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airy::{HuygensPropagator, PropagationInput, WavePropagator};
    use crate::source::SourceMask;
    use approx::assert_abs_diff_eq;

    fn waves(elevation: &Array2<f64>, h0: f64, direction: f64) -> (Classification, WaveField) {
        let class = Classification::new(elevation, 0.0);
        let sources = SourceMask::from_direction(direction, &class.land);
        let raw = HuygensPropagator::default().propagate(&PropagationInput {
            dx: 25.0,
            shoal_coeff: 0.99,
            h0,
            depth: &class.depth,
            sources: &sources,
            land: &class.land,
            shadow: false,
        });
        let field = WaveField::from_propagation(
            raw,
            &class,
            elevation,
            &MaterialProperties::default(),
            10.0,
            1.0,
        );
        (class, field)
    }

    fn ramp() -> Array2<f64> {
        // Beach rising toward i = 0
        Array2::from_shape_fn((20, 8), |(i, _)| 3.0 - 1.5 * i as f64)
    }

    #[test]
    fn all_land_gives_a_quiet_field() {
        let elevation = Array2::from_elem((6, 6), 2.0);
        let (_, field) = waves(&elevation, 2.0, 0.0);
        for arr in [
            &field.height,
            &field.wavelength,
            &field.power,
            &field.bottom_velocity,
            &field.shear_stress,
            &field.transport_x,
            &field.transport_y,
        ] {
            assert!(arr.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn height_respects_breaking_limit() {
        let (class, field) = waves(&ramp(), 3.0, 0.0);
        for ((i, j), &h) in field.height.indexed_iter() {
            if class.is_wet(i, j) {
                assert!(h <= BREAKING_RATIO * class.depth[[i, j]] + 1e-12);
            } else {
                assert_eq!(h, 0.0);
            }
        }
        assert!(field.max_height() > 0.0);
    }

    #[test]
    fn direction_is_normalised() {
        let (_, field) = waves(&ramp(), 1.0, 45.0);
        assert!(field.direction.iter().all(|&d| (0.0..TAU).contains(&d)));
        assert_eq!(wrap_angle(-1e-18), 0.0);
        assert_abs_diff_eq!(wrap_angle(-0.5 * PI), 1.5 * PI);
    }

    #[test]
    fn deep_water_transport_follows_the_waves() {
        let (class, field) = waves(&ramp(), 1.0, 0.0);
        // Waves from the east head west
        let (i, j) = (18, 4);
        assert!(class.depth[[i, j]] >= 5.0);
        assert_abs_diff_eq!(field.direction[[i, j]], PI, epsilon = 1e-9);
        assert_abs_diff_eq!(field.transport_x[[i, j]], -1.0, epsilon = 1e-9);
        assert!(field.shear_stress.iter().all(|&s| s >= 0.0 && s.is_finite()));
        assert!(field.power.iter().all(|&p| p >= 0.0 && p.is_finite()));
    }
}
