//! Rasterise a digitised shoreline into a synthetic Dean-profile bathymetry.

use crate::contour::point_in_polygon;
use crate::error::{Result, WaveSedError};
use ndarray::{Array1, Array2, Zip};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Dean profile scale parameter (m^(1/3))
pub const DEAN_A: f64 = 0.1;
/// Shoreline vertices further than this along either axis are ignored (m)
pub const SEARCH_RANGE: f64 = 100_000.0;
/// Open water added beyond the shoreline's y extent (m)
pub const OFFSHORE_EXTENT: f64 = 5000.0;

/// Gridded water depth, positive offshore and negative on land.
#[derive(Debug, Clone)]
pub struct ShorelineGrid {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub depth: Array2<f64>,
}

fn axis(start: f64, end: f64, step: f64) -> Array1<f64> {
    let n = ((end - start) / step).ceil().max(0.0) as usize;
    Array1::from_iter((0..n).map(|k| start + step * k as f64))
}

fn bounds(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Build a depth grid from shoreline vertices `(x, y)` with spacing `dx`, `dy`.
///
/// The grid starts at the shoreline minimum rounded up to the spacing, stops
/// two cells short of the x extent and runs [`OFFSHORE_EXTENT`] past the
/// y extent. Depth follows `A·dist^(2/3)` from the nearest vertex; cells
/// inside the shoreline polygon are land, one metre above the shallowest
/// profile value found inside it.
pub fn shoreline_to_grid(x: &[f64], y: &[f64], dx: f64, dy: f64) -> Result<ShorelineGrid> {
    if x.len() != y.len() || x.len() < 2 {
        return Err(WaveSedError::InvalidGrid(format!(
            "shoreline needs matching x/y with at least two vertices (got {} and {})",
            x.len(),
            y.len()
        )));
    }
    if dx <= 0.0 || dy <= 0.0 {
        return Err(WaveSedError::InvalidGrid(format!(
            "spacing must be positive (dx={}, dy={})",
            dx, dy
        )));
    }

    let (min_x, max_x) = bounds(x);
    let (min_y, max_y) = bounds(y);
    let x0 = ((min_x / dx).ceil() * dx).trunc();
    let y0 = ((min_y / dy).ceil() * dy).trunc();
    let x1 = x0 + ((((max_x - min_x) / dx).ceil() * dx) - 2.0 * dx).trunc();
    let y1 = y0 + ((((max_y - min_y) / dy).ceil() * dy) + OFFSHORE_EXTENT).trunc();

    let xs = axis(x0, x1, dx);
    let ys = axis(y0, y1, dy);
    let (nx, ny) = (xs.len(), ys.len());
    if nx == 0 || ny == 0 {
        return Err(WaveSedError::InvalidGrid(format!(
            "shoreline extent too small for spacing ({}x{} cells)",
            nx, ny
        )));
    }

    let polygon: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();

    let mut dist = Array2::<f64>::zeros((nx, ny));
    Zip::indexed(&mut dist).par_for_each(|(i, j), d| {
        let (gx, gy) = (xs[i], ys[j]);
        let nearest = polygon
            .iter()
            .map(|&(px, py)| {
                if (px - gx).abs() < SEARCH_RANGE && (py - gy).abs() < SEARCH_RANGE {
                    (px - gx).powi(2) + (py - gy).powi(2)
                } else {
                    1.0e10
                }
            })
            .fold(f64::INFINITY, f64::min);
        *d = nearest.sqrt();
    });

    let inside = Array2::from_shape_fn((nx, ny), |(i, j)| point_in_polygon(xs[i], ys[j], &polygon));
    let mut depth = dist.mapv(|d| DEAN_A * d.powf(2.0 / 3.0));

    let shallowest_inside = Zip::from(&depth)
        .and(&inside)
        .fold(f64::INFINITY, |m, &z, &is_in| if is_in { m.min(z) } else { m });
    if shallowest_inside.is_finite() {
        let land = -(shallowest_inside + 1.0);
        Zip::from(&mut depth).and(&inside).for_each(|z, &is_in| {
            if is_in {
                *z = land;
            }
        });
    }

    debug!("Shoreline grid {}x{} from {} vertices", nx, ny, x.len());
    Ok(ShorelineGrid { x: xs, y: ys, depth })
}

/// Read `x y` vertex pairs, one per line.
pub fn read_shoreline<P: AsRef<Path>>(path: P) -> Result<(Vec<f64>, Vec<f64>)> {
    let content = fs::read_to_string(path)?;
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (n, line) in content.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() < 2 {
            return Err(WaveSedError::Parse {
                line: n + 1,
                message: format!("expected 2 values, found {}", tokens.len()),
            });
        }
        let parse = |t: &str| {
            t.parse::<f64>().map_err(|e| WaveSedError::Parse {
                line: n + 1,
                message: format!("'{}': {}", t, e),
            })
        };
        xs.push(parse(tokens[0])?);
        ys.push(parse(tokens[1])?);
    }
    Ok((xs, ys))
}

impl ShorelineGrid {
    /// Write `x y z` lines, x fastest, with `z` as elevation (negated depth)
    /// so the file loads straight back as a bathymetry.
    pub fn save_xyz<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for (j, &y) in self.y.iter().enumerate() {
            for (i, &x) in self.x.iter().enumerate() {
                writeln!(out, "{} {} {}", x, y, -self.depth[[i, j]])?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Bathymetry;
    use approx::assert_relative_eq;

    fn headland() -> (Vec<f64>, Vec<f64>) {
        // Closed rectangle of land from x 0..2000, y 0..1000
        let x = vec![0.0, 2000.0, 2000.0, 0.0, 0.0];
        let y = vec![0.0, 0.0, 1000.0, 1000.0, 0.0];
        (x, y)
    }

    #[test]
    fn grid_extents_follow_the_shoreline() {
        let (x, y) = headland();
        let grid = shoreline_to_grid(&x, &y, 100.0, 100.0).unwrap();
        assert_eq!(grid.x.len(), 18);
        assert_eq!(grid.y.len(), 60);
        assert_eq!(grid.x[0], 0.0);
        assert_eq!(grid.y[59], 5900.0);
    }

    #[test]
    fn depth_follows_dean_profile_offshore() {
        let (x, y) = headland();
        let grid = shoreline_to_grid(&x, &y, 100.0, 100.0).unwrap();
        // (1000, 3000) is equally far from both northern corners
        let d = ((1000.0f64).powi(2) + 2000.0f64.powi(2)).sqrt();
        assert_relative_eq!(grid.depth[[10, 30]], DEAN_A * d.powf(2.0 / 3.0), max_relative = 1e-12);
    }

    #[test]
    fn land_sits_above_the_shallowest_inside_profile() {
        let (x, y) = headland();
        let grid = shoreline_to_grid(&x, &y, 100.0, 100.0).unwrap();
        let land = grid.depth[[5, 5]];
        assert!(land <= -1.0);
        assert_eq!(grid.depth[[10, 5]], land);
        assert!(grid.depth[[5, 20]] > 0.0);
    }

    #[test]
    fn xyz_file_loads_as_bathymetry() {
        let (x, y) = headland();
        let grid = shoreline_to_grid(&x, &y, 100.0, 100.0).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shore.xyz");
        grid.save_xyz(&path).unwrap();

        let bathy = Bathymetry::from_file(&path).unwrap();
        assert_eq!(bathy.grid.shape(), (18, 60));
        assert_relative_eq!(bathy.elevation[[5, 20]], -grid.depth[[5, 20]]);
    }

    #[test]
    fn mismatched_vertices_are_rejected() {
        assert!(shoreline_to_grid(&[0.0, 1.0], &[0.0], 10.0, 10.0).is_err());
        assert!(shoreline_to_grid(&[0.0, 100.0], &[0.0, 100.0], 0.0, 10.0).is_err());
    }
}
