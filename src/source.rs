use ndarray::Array2;

/// Role of a cell in the wave front march.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCell {
    Source,
    Interior,
    Land,
}

/// Boundary cells where waves enter the domain for one direction.
#[derive(Debug, Clone)]
pub struct SourceMask {
    pub cells: Array2<SourceCell>,
    pub direction: f64, // Degrees counter-clockwise from +x, in [0, 360)
}

impl SourceMask {
    /// Place the source on the boundary facing `direction`.
    ///
    /// Axis-aligned directions select a whole edge (0° east, 90° north,
    /// 180° west, 270° south); any other angle selects the corner of the
    /// quadrant it falls in. Land cells are never sources.
    pub fn from_direction(direction: f64, land: &Array2<bool>) -> Self {
        let direction = direction.rem_euclid(360.0);
        let (nx, ny) = land.dim();
        let mut cells = Array2::from_elem((nx, ny), SourceCell::Interior);

        if nx > 0 && ny > 0 {
            let (last_i, last_j) = (nx - 1, ny - 1);
            if direction == 0.0 {
                cells.row_mut(last_i).fill(SourceCell::Source);
            } else if direction == 90.0 {
                cells.column_mut(last_j).fill(SourceCell::Source);
            } else if direction == 180.0 {
                cells.row_mut(0).fill(SourceCell::Source);
            } else if direction == 270.0 {
                cells.column_mut(0).fill(SourceCell::Source);
            } else if direction < 90.0 {
                cells[[last_i, last_j]] = SourceCell::Source;
            } else if direction < 180.0 {
                cells[[0, last_j]] = SourceCell::Source;
            } else if direction < 270.0 {
                cells[[0, 0]] = SourceCell::Source;
            } else {
                cells[[last_i, 0]] = SourceCell::Source;
            }
        }

        cells.zip_mut_with(land, |c, &is_land| {
            if is_land {
                *c = SourceCell::Land;
            }
        });

        SourceMask { cells, direction }
    }

    pub fn sources(&self) -> Vec<(usize, usize)> {
        self.cells
            .indexed_iter()
            .filter(|(_, c)| **c == SourceCell::Source)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Unit vector along which waves travel into the domain.
    pub fn propagation(&self) -> (f64, f64) {
        let theta = self.direction.to_radians();
        (-theta.cos(), -theta.sin())
    }
}
