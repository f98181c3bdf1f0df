//! Wave-driven entrainment, advection and diffusion of bed sediment.
//!
//! All thicknesses are in metres of bed. The pieces are free functions over
//! grids so they can be exercised on their own; [`SedimentField::compute`]
//! chains them for one scenario.

use crate::coast::Classification;
use crate::filters::gaussian_filter;
use crate::materials::MaterialProperties;
use crate::wavefield::WaveField;
use ndarray::{Array2, Zip};
use rayon::prelude::*;
use tracing::debug;

/// Shear stresses below this are treated as still water (N/m²)
pub const SHEAR_FLOOR: f64 = 1.0e-4;
/// Entrained thickness never exceeds this share of the local depth
pub const MAX_ENTRAINED_FRACTION: f64 = 0.25;
/// Thickest layer a cell may shed in one diffusion step (m)
pub const MAX_DIFFUSED_THICKNESS: f64 = 0.5;
/// Diffusion stops once no cell changes by more than this (m)
pub const DIFFUSION_TOLERANCE: f64 = 1.0e-6;
/// Deposits on cells this far above sea level are dropped (m of depth)
pub const EMERGED_DEPTH: f64 = -2.0;

const NEIGHBOURS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Sediment response to one wave scenario.
#[derive(Debug, Clone)]
pub struct SedimentField {
    pub entrainment: Array2<f64>,
    pub fraction_x: Array2<f64>,
    pub fraction_y: Array2<f64>,
    pub erodep: Array2<f64>, // Net erosion (<0) / deposition (>0)
}

impl SedimentField {
    pub fn new(nx: usize, ny: usize) -> Self {
        SedimentField {
            entrainment: Array2::zeros((nx, ny)),
            fraction_x: Array2::zeros((nx, ny)),
            fraction_y: Array2::zeros((nx, ny)),
            erodep: Array2::zeros((nx, ny)),
        }
    }

    /// Erode, carry, diffuse and smooth sediment under `waves`.
    ///
    /// `dx` is the compute-grid spacing. `waves.shear_stress` is floored at
    /// [`SHEAR_FLOOR`] in place.
    pub fn compute(
        waves: &mut WaveField,
        class: &Classification,
        materials: &MaterialProperties,
        dx: f64,
        sigma: f64,
        tsteps: usize,
        dsteps: usize,
    ) -> Self {
        waves.shear_stress.mapv_inplace(|s| if s < SHEAR_FLOOR { 0.0 } else { s });

        let entrainment = entrainment(
            &waves.shear_stress,
            &class.depth,
            &class.land,
            materials,
            sigma,
        );
        let (fraction_x, fraction_y) = transport_fractions(&waves.transport_x, &waves.transport_y);

        let (deposit, overflow) = advect(tsteps, &entrainment, &fraction_x, &fraction_y);

        let area = dx * dx;
        let cfl = area * area / (4.0 * materials.diffusion_coeff * area);
        let cdiff = materials.diffusion_coeff / area;
        let mut elev = &deposit - &class.depth;
        elev -= &entrainment;
        let diffused = diffuse(&elev, &deposit, cdiff, MAX_DIFFUSED_THICKNESS, cfl, dsteps);

        let mut erodep = redistribute(&(&diffused + &overflow), sigma);
        erodep -= &entrainment;
        Zip::from(&mut erodep).and(&class.depth).for_each(|dz, &d| {
            if *dz > 0.0 && d < EMERGED_DEPTH {
                *dz = 0.0;
            }
        });

        debug!(
            "Entrained {:.3} m, overflow {:.3} m, net change {:.3} m",
            entrainment.sum(),
            overflow.sum(),
            erodep.sum()
        );

        SedimentField {
            entrainment,
            fraction_x,
            fraction_y,
            erodep,
        }
    }
}

/// Thickness entrained by wave shear, `Ce·ln(τ/τcr)`.
///
/// Clamped to be non-negative and at most a quarter of the depth, then
/// smoothed when `sigma > 0`. Land stays at zero.
pub fn entrainment(
    shear: &Array2<f64>,
    depth: &Array2<f64>,
    land: &Array2<bool>,
    materials: &MaterialProperties,
    sigma: f64,
) -> Array2<f64> {
    let tau_cr = materials.critical_shear();
    let mut ent = Array2::<f64>::zeros(shear.dim());
    Zip::from(&mut ent)
        .and(shear)
        .and(depth)
        .for_each(|h, &tau, &d| {
            if tau > 0.0 && tau_cr > 0.0 {
                let raw = (materials.entrainment_coeff * (tau / tau_cr).ln()).max(0.0);
                *h = if raw > 0.0 && raw > MAX_ENTRAINED_FRACTION * d {
                    MAX_ENTRAINED_FRACTION * d
                } else {
                    raw
                };
            }
        });

    let mut ent = if sigma > 0.0 {
        gaussian_filter(&ent, sigma)
    } else {
        ent
    };
    Zip::from(&mut ent).and(land).for_each(|h, &is_land| {
        if is_land {
            *h = 0.0;
        }
    });
    ent
}

/// Split a transport vector into x/y shares with `|fx| + |fy| = 1`.
pub fn transport_fractions(tx: &Array2<f64>, ty: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let mut fx = Array2::<f64>::zeros(tx.dim());
    let mut fy = Array2::<f64>::zeros(tx.dim());
    Zip::from(&mut fx)
        .and(&mut fy)
        .and(tx)
        .and(ty)
        .for_each(|fx, fy, &tx, &ty| {
            let total = tx.abs() + ty.abs();
            if total > 0.0 {
                *fx = tx / total;
                *fy = ty / total;
            }
        });
    (fx, fy)
}

fn step_of(f: f64) -> isize {
    if f > 0.0 {
        1
    } else if f < 0.0 {
        -1
    } else {
        0
    }
}

/// Carry entrained sediment along the transport fractions.
///
/// Every cell starts with its entrained load. A load sitting on a cell that
/// can carry it (positive entrainment and a transport direction) moves a
/// `|fx|` share one cell along x and a `|fy|` share one cell along y;
/// anywhere else it settles. Loads pushed off the grid are lost.
///
/// Returns `(deposit, overflow)`, where `overflow` holds the loads still in
/// motion after `tsteps` moves.
pub fn advect(
    tsteps: usize,
    entrained: &Array2<f64>,
    fx: &Array2<f64>,
    fy: &Array2<f64>,
) -> (Array2<f64>, Array2<f64>) {
    let (nx, ny) = entrained.dim();
    let carries = |i: usize, j: usize| {
        entrained[[i, j]] > 0.0 && (fx[[i, j]] != 0.0 || fy[[i, j]] != 0.0)
    };

    let mut deposit = Array2::<f64>::zeros((nx, ny));
    let mut load = entrained.clone();

    for _ in 0..tsteps {
        let mut next = Array2::<f64>::zeros((nx, ny));
        let mut moving = false;

        for ((i, j), &amount) in load.indexed_iter() {
            if amount <= 0.0 {
                continue;
            }
            if !carries(i, j) {
                deposit[[i, j]] += amount;
                continue;
            }
            moving = true;
            let shares = [
                (step_of(fx[[i, j]]), 0, fx[[i, j]].abs()),
                (0, step_of(fy[[i, j]]), fy[[i, j]].abs()),
            ];
            for (di, dj, share) in shares {
                if share == 0.0 {
                    continue;
                }
                let (ni, nj) = (i as isize + di, j as isize + dj);
                if ni >= 0 && nj >= 0 && (ni as usize) < nx && (nj as usize) < ny {
                    next[[ni as usize, nj as usize]] += amount * share;
                }
            }
        }

        load = next;
        if !moving {
            break;
        }
    }

    // Whatever reached a resting cell on the last move has settled too
    let mut overflow = Array2::<f64>::zeros((nx, ny));
    for ((i, j), &amount) in load.indexed_iter() {
        if amount <= 0.0 {
            continue;
        }
        if carries(i, j) {
            overflow[[i, j]] = amount;
        } else {
            deposit[[i, j]] += amount;
        }
    }
    (deposit, overflow)
}

/// Explicit downhill diffusion of `layer` over the surface `elev`.
///
/// Each step a cell sheds `cdiff·cfl·Δz` towards every lower 4-neighbour,
/// with the total limited by its own layer thickness and `max_thickness`.
/// The outer edges are closed. Stops after `steps` iterations or once the
/// largest change falls below [`DIFFUSION_TOLERANCE`]. Returns the new layer.
pub fn diffuse(
    elev: &Array2<f64>,
    layer: &Array2<f64>,
    cdiff: f64,
    max_thickness: f64,
    cfl: f64,
    steps: usize,
) -> Array2<f64> {
    let (nx, ny) = layer.dim();
    let mut surface = elev.clone();
    let mut layer = layer.clone();
    let rate = cdiff * cfl;

    let indices: Vec<(usize, usize)> = (0..nx)
        .flat_map(|i| (0..ny).map(move |j| (i, j)))
        .collect();

    for step in 0..steps {
        let outflows: Vec<(usize, usize, [f64; 4])> = indices
            .par_iter()
            .filter(|&&(i, j)| layer[[i, j]] > 0.0)
            .map(|&(i, j)| {
                let here = surface[[i, j]];
                let mut flux = [0.0; 4];
                for (k, (di, dj)) in NEIGHBOURS.iter().enumerate() {
                    let (ni, nj) = (i as isize + di, j as isize + dj);
                    if ni < 0 || nj < 0 || ni as usize >= nx || nj as usize >= ny {
                        continue;
                    }
                    let drop = here - surface[[ni as usize, nj as usize]];
                    if drop > 0.0 {
                        flux[k] = rate * drop;
                    }
                }
                let total: f64 = flux.iter().sum();
                let available = layer[[i, j]].min(max_thickness);
                if total > available && total > 0.0 {
                    let scale = available / total;
                    flux.iter_mut().for_each(|f| *f *= scale);
                }
                (i, j, flux)
            })
            .collect();

        let mut change = Array2::<f64>::zeros((nx, ny));
        for (i, j, flux) in outflows {
            for (k, (di, dj)) in NEIGHBOURS.iter().enumerate() {
                if flux[k] > 0.0 {
                    let n = ((i as isize + di) as usize, (j as isize + dj) as usize);
                    change[[i, j]] -= flux[k];
                    change[n] += flux[k];
                }
            }
        }

        layer += &change;
        surface += &change;

        let largest = change.iter().fold(0.0_f64, |m, &c| m.max(c.abs()));
        if largest < DIFFUSION_TOLERANCE {
            debug!("Diffusion settled after {} steps", step + 1);
            break;
        }
    }
    layer
}

/// Gaussian smoothing rescaled to keep the field's total volume.
pub fn redistribute(field: &Array2<f64>, sigma: f64) -> Array2<f64> {
    if sigma <= 0.0 {
        return field.clone();
    }
    let smoothed = gaussian_filter(field, sigma);
    let total = smoothed.sum();
    if total == 0.0 {
        return smoothed;
    }
    let frac = field.sum() / total;
    smoothed * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn weak_shear_entrains_nothing() {
        let sand = MaterialProperties::default();
        let tau_cr = sand.critical_shear();
        let shear = Array2::from_elem((4, 4), 0.5 * tau_cr);
        let depth = Array2::from_elem((4, 4), 5.0);
        let land = Array2::from_elem((4, 4), false);
        let ent = entrainment(&shear, &depth, &land, &sand, 0.0);
        assert!(ent.iter().all(|&h| h == 0.0));
    }

    #[test]
    fn entrainment_is_capped_by_depth() {
        let sand = MaterialProperties::default();
        let shear = Array2::from_elem((3, 3), 1.0e3 * sand.critical_shear());
        let depth = Array2::from_shape_fn((3, 3), |(i, _)| 0.4 + i as f64 * 40.0);
        let mut land = Array2::from_elem((3, 3), false);
        land[[2, 2]] = true;
        let ent = entrainment(&shear, &depth, &land, &sand, 0.0);
        assert_relative_eq!(ent[[0, 0]], 0.1);
        assert_relative_eq!(ent[[2, 0]], 1000f64.ln());
        assert_eq!(ent[[2, 2]], 0.0);
    }

    #[test]
    fn fractions_split_the_vector() {
        let tx = Array2::from_shape_vec((1, 3), vec![3.0, 0.0, -1.0]).unwrap();
        let ty = Array2::from_shape_vec((1, 3), vec![1.0, 0.0, -1.0]).unwrap();
        let (fx, fy) = transport_fractions(&tx, &ty);
        assert_relative_eq!(fx[[0, 0]], 0.75);
        assert_relative_eq!(fy[[0, 0]], 0.25);
        assert_eq!((fx[[0, 1]], fy[[0, 1]]), (0.0, 0.0));
        assert_relative_eq!(fx[[0, 2]], -0.5);
    }

    #[test]
    fn advected_load_settles_downstream() {
        let mut ent = Array2::<f64>::zeros((6, 3));
        ent[[4, 1]] = 1.0;
        ent[[3, 1]] = 0.5;
        let fx = Array2::from_elem((6, 3), -1.0);
        let fy = Array2::<f64>::zeros((6, 3));
        let (deposit, overflow) = advect(100, &ent, &fx, &fy);
        assert_relative_eq!(deposit[[2, 1]], 1.5);
        assert_relative_eq!(deposit.sum(), 1.5);
        assert_eq!(overflow.sum(), 0.0);
    }

    #[test]
    fn unfinished_loads_overflow() {
        let ent = Array2::from_elem((8, 1), 1.0);
        let fx = Array2::from_elem((8, 1), -1.0);
        let fy = Array2::<f64>::zeros((8, 1));
        let (deposit, overflow) = advect(2, &ent, &fx, &fy);
        // Loads leaving i = 0 are lost; the rest are still moving
        assert_eq!(deposit.sum(), 0.0);
        assert_relative_eq!(overflow.sum(), 6.0);
        assert_relative_eq!(overflow[[0, 0]], 1.0);
    }

    #[test]
    fn diffusion_conserves_the_layer() {
        let elev = Array2::from_shape_fn((7, 7), |(i, j)| -10.0 + 0.1 * (i + j) as f64);
        let mut layer = Array2::<f64>::zeros((7, 7));
        layer[[3, 3]] = 2.0;
        layer[[6, 6]] = 0.3;
        let out = diffuse(&(&elev + &layer), &layer, 30.0 / 100.0, 0.5, 100.0 / 120.0, 500);
        assert_relative_eq!(out.sum(), layer.sum(), epsilon = 1e-9);
        assert!(out.iter().all(|&h| h >= -1e-12));
        assert!(out[[3, 3]] < 2.0);
    }

    #[test]
    fn redistribution_preserves_volume() {
        let mut field = Array2::<f64>::zeros((9, 9));
        field[[0, 0]] = 1.0;
        field[[4, 5]] = -0.4;
        field[[8, 2]] = 0.7;
        let out = redistribute(&field, 1.0);
        assert_relative_eq!(out.sum(), field.sum(), epsilon = 1e-12);
        assert_eq!(redistribute(&field, 0.0), field);
    }
}
