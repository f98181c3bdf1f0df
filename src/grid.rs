use crate::error::{Result, WaveSedError};
use crate::spline;
use ndarray::{Array1, Array2};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Uniform Cartesian grid. Index `i` runs along x, `j` along y.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub nx: usize, // Number of points in x direction
    pub ny: usize, // Number of points in y direction
    pub dx: f64,   // Nominal spacing (meters), identical in x and y
    pub x: Array1<f64>,
    pub y: Array1<f64>,
}

impl Grid {
    /// Grid of `nx × ny` nodes anchored at `(x0, y0)`.
    pub fn new(nx: usize, ny: usize, dx: f64, x0: f64, y0: f64) -> Self {
        let x = Array1::from_iter((0..nx).map(|i| x0 + dx * i as f64));
        let y = Array1::from_iter((0..ny).map(|j| y0 + dx * j as f64));
        Grid { nx, ny, dx, x, y }
    }

    /// Grid covering `[min_x, max_x] × [min_y, max_y]` with evenly spaced
    /// nodes as close to `dx` apart as the extents allow.
    pub fn spanning(min_x: f64, max_x: f64, min_y: f64, max_y: f64, dx: f64) -> Self {
        let nx = ((max_x - min_x) / dx + 1.0).round().max(1.0) as usize;
        let ny = ((max_y - min_y) / dx + 1.0).round().max(1.0) as usize;
        Grid {
            nx,
            ny,
            dx,
            x: Array1::linspace(min_x, max_x, nx),
            y: Array1::linspace(min_y, max_y, ny),
        }
    }

    /// Coarser grid over the same extents with spacing `dx × factor`.
    pub fn coarsened(&self, factor: usize) -> Self {
        Grid::spanning(
            self.x[0],
            self.x[self.nx - 1],
            self.y[0],
            self.y[self.ny - 1],
            self.dx * factor as f64,
        )
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }
}

/// Elevation on a uniform grid.
#[derive(Debug, Clone)]
pub struct Bathymetry {
    pub grid: Grid,
    pub elevation: Array2<f64>,
}

impl Bathymetry {
    pub fn new(grid: Grid, elevation: Array2<f64>) -> Result<Self> {
        if elevation.dim() != grid.shape() {
            return Err(WaveSedError::InvalidGrid(format!(
                "elevation shape {:?} does not match grid shape {:?}",
                elevation.dim(),
                grid.shape()
            )));
        }
        Ok(Bathymetry { grid, elevation })
    }

    /// Load a whitespace separated `x y z` point file without header.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(WaveSedError::BathymetryNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let points = parse_points(&content)?;
        let bathy = Self::from_points(&points)?;
        debug!(
            "Loaded {} points from {} ({}x{}, dx={})",
            points.len(),
            path.display(),
            bathy.grid.nx,
            bathy.grid.ny,
            bathy.grid.dx
        );
        Ok(bathy)
    }

    /// Build the grid from points ordered x-fastest (column-major fill).
    pub fn from_points(points: &[[f64; 3]]) -> Result<Self> {
        if points.is_empty() {
            return Err(WaveSedError::InvalidGrid("no points".to_string()));
        }

        let x0 = points[0][0];
        let dx = points
            .iter()
            .map(|p| p[0] - x0)
            .find(|d| *d != 0.0)
            .ok_or_else(|| {
                WaveSedError::InvalidGrid("cannot infer spacing from a single x value".to_string())
            })?;
        if dx <= 0.0 {
            return Err(WaveSedError::InvalidGrid(format!(
                "x must increase along the first row (dx={})",
                dx
            )));
        }

        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p[0]);
            max_x = max_x.max(p[0]);
            min_y = min_y.min(p[1]);
            max_y = max_y.max(p[1]);
        }

        let grid = Grid::spanning(min_x, max_x, min_y, max_y, dx);
        if grid.nx * grid.ny != points.len() {
            return Err(WaveSedError::InvalidGrid(format!(
                "{} points cannot fill a {}x{} grid",
                points.len(),
                grid.nx,
                grid.ny
            )));
        }

        let nx = grid.nx;
        let elevation = Array2::from_shape_fn(grid.shape(), |(i, j)| points[j * nx + i][2]);
        Ok(Bathymetry { grid, elevation })
    }

    /// Coarser copy interpolated with a bivariate cubic spline.
    pub fn resampled(&self, factor: usize) -> Self {
        let grid = self.grid.coarsened(factor);
        let elevation = spline::resample(&self.elevation, &self.grid, &grid);
        Bathymetry { grid, elevation }
    }
}

fn parse_points(content: &str) -> Result<Vec<[f64; 3]>> {
    let mut points = Vec::new();
    for (n, line) in content.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() < 3 {
            return Err(WaveSedError::Parse {
                line: n + 1,
                message: format!("expected 3 columns, found {}", tokens.len()),
            });
        }
        let mut p = [0.0; 3];
        for (value, token) in p.iter_mut().zip(&tokens) {
            *value = token.parse().map_err(|_| WaveSedError::Parse {
                line: n + 1,
                message: format!("'{}' is not a number", token),
            })?;
        }
        points.push(p);
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    fn write_points(nx: usize, ny: usize, dx: f64) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for j in 0..ny {
            for i in 0..nx {
                let (x, y) = (100.0 + i as f64 * dx, 50.0 + j as f64 * dx);
                writeln!(file, "{} {}   {}", x, y, i as f64 + 10.0 * j as f64).unwrap();
            }
        }
        file
    }

    #[test]
    fn loads_column_major_grid() {
        let file = write_points(4, 3, 25.0);
        let bathy = Bathymetry::from_file(file.path()).unwrap();
        assert_eq!(bathy.grid.shape(), (4, 3));
        assert_relative_eq!(bathy.grid.dx, 25.0);
        assert_relative_eq!(bathy.elevation[[3, 0]], 3.0);
        assert_relative_eq!(bathy.elevation[[1, 2]], 21.0);
        assert_relative_eq!(bathy.grid.x[3], 175.0);
        assert_relative_eq!(bathy.grid.y[2], 100.0);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = Bathymetry::from_file("/definitely/not/here.xyz").unwrap_err();
        assert!(matches!(err, WaveSedError::BathymetryNotFound(_)));
    }

    #[test]
    fn malformed_line_names_its_number() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 0 1\n1 0 abc").unwrap();
        let err = Bathymetry::from_file(file.path()).unwrap_err();
        assert!(matches!(err, WaveSedError::Parse { line: 2, .. }));
    }

    #[test]
    fn incomplete_grid_is_rejected() {
        let points = [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]];
        assert!(matches!(
            Bathymetry::from_points(&points),
            Err(WaveSedError::InvalidGrid(_))
        ));
    }

    #[test]
    fn coarsened_grid_keeps_extents() {
        let grid = Grid::new(21, 11, 10.0, 0.0, 0.0);
        let coarse = grid.coarsened(2);
        assert_eq!(coarse.shape(), (11, 6));
        assert_relative_eq!(coarse.dx, 20.0);
        assert_relative_eq!(coarse.x[10], 200.0);
        assert_relative_eq!(coarse.y[5], 100.0);
    }
}
