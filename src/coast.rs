use crate::contour::{find_contours, Contour};
use ndarray::{Array2, Zip};
use tracing::debug;

/// Sea/land partition of the compute grid for one sea level.
#[derive(Debug, Clone)]
pub struct Classification {
    pub sea_level: f64,
    pub depth: Array2<f64>, // sea_level - elevation
    pub land: Array2<bool>, // dry cells and enclosed lakes
}

impl Classification {
    /// Classify `elevation` against `sea_level`.
    ///
    /// Cells with non-positive depth are land. Cells below sea level that
    /// sit inside a closed sea-level contour are lakes and also count as land.
    pub fn new(elevation: &Array2<f64>, sea_level: f64) -> Self {
        let depth = elevation.mapv(|z| sea_level - z);
        let mut land = depth.mapv(|d| d <= 0.0);

        let mut lakes = 0usize;
        for contour in shoreline_contours(elevation, sea_level, 0.0) {
            if contour.closed {
                lakes += mark_enclosed(&contour, elevation, sea_level, &mut land);
            }
        }
        if lakes > 0 {
            debug!("Reclassified {} enclosed cells as land", lakes);
        }

        Classification {
            sea_level,
            depth,
            land,
        }
    }

    /// Depth after an elevation update; the partition itself is kept.
    pub fn update_depth(&mut self, elevation: &Array2<f64>) {
        let sea_level = self.sea_level;
        Zip::from(&mut self.depth)
            .and(elevation)
            .for_each(|d, &z| *d = sea_level - z);
    }

    /// Sea cell that also holds water.
    pub fn is_wet(&self, i: usize, j: usize) -> bool {
        !self.land[[i, j]] && self.depth[[i, j]] > 0.0
    }

    pub fn sea_count(&self) -> usize {
        self.land.iter().filter(|&&l| !l).count()
    }

    pub fn land_count(&self) -> usize {
        self.land.iter().filter(|&&l| l).count()
    }
}

/// Sea-level contours of `elevation`.
///
/// Contours with two points or fewer are dropped, as are closed contours
/// whose perimeter (index units) does not exceed `min_length`. Open
/// contours are always kept.
pub fn shoreline_contours(elevation: &Array2<f64>, sea_level: f64, min_length: f64) -> Vec<Contour> {
    find_contours(elevation, sea_level)
        .into_iter()
        .filter(|c| c.points.len() > 2 && (!c.closed || c.length() > min_length))
        .collect()
}

fn mark_enclosed(
    contour: &Contour,
    elevation: &Array2<f64>,
    sea_level: f64,
    land: &mut Array2<bool>,
) -> usize {
    let (nx, ny) = elevation.dim();
    let (min_i, max_i, min_j, max_j) = contour.bounds();
    let i_range = (min_i.ceil().max(0.0) as usize)..=(max_i.floor().min((nx - 1) as f64) as usize);
    let j_range = (min_j.ceil().max(0.0) as usize)..=(max_j.floor().min((ny - 1) as f64) as usize);

    let mut marked = 0;
    for i in i_range {
        for j in j_range.clone() {
            if !land[[i, j]]
                && elevation[[i, j]] < sea_level
                && contour.contains(i as f64, j as f64)
            {
                land[[i, j]] = true;
                marked += 1;
            }
        }
    }
    marked
}
