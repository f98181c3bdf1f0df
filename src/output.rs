//! CSV export of model fields.
//!
//! Rows run y-outer, x-inner, one row per grid node.

use crate::error::{Result, WaveSedError};
use crate::grid::Grid;
use crate::simulation::Simulation;
use ndarray::Array2;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

pub const COARSE_COLUMNS: [&str; 12] = [
    "X", "Y", "Z", "wH", "wLght", "wDir", "wPer", "wPow", "uBot", "Shear", "ent", "dz",
];

pub const FINE_COLUMNS: [&str; 6] = ["X", "Y", "Z", "wH", "wS", "erodep"];

fn write_table<W: Write>(
    out: &mut W,
    grid: &Grid,
    columns: &[&str],
    fields: &[&Array2<f64>],
) -> Result<()> {
    for field in fields {
        if field.dim() != grid.shape() {
            return Err(WaveSedError::InvalidGrid(format!(
                "field shape {:?} does not match grid shape {:?}",
                field.dim(),
                grid.shape()
            )));
        }
    }

    writeln!(out, "{}", columns.join(","))?;
    for j in 0..grid.ny {
        for i in 0..grid.nx {
            write!(out, "{},{}", grid.x[i], grid.y[j])?;
            for field in fields {
                write!(out, ",{}", field[[i, j]])?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Wave and sediment fields on the compute grid.
pub fn write_coarse_csv<W: Write>(out: &mut W, sim: &Simulation) -> Result<()> {
    let compute = sim.compute_bathymetry();
    let waves = &sim.waves;
    write_table(
        out,
        &compute.grid,
        &COARSE_COLUMNS,
        &[
            &compute.elevation,
            &waves.height,
            &waves.wavelength,
            &waves.direction,
            &waves.period,
            &waves.power,
            &waves.bottom_velocity,
            &waves.shear_stress,
            &sim.sediment.entrainment,
            &sim.sediment.erodep,
        ],
    )
}

/// Elevation, wave height, shear and erosion/deposition on the bathymetry grid.
pub fn write_fine_csv<W: Write>(
    out: &mut W,
    grid: &Grid,
    elevation: &Array2<f64>,
    wave_height: &Array2<f64>,
    shear_stress: &Array2<f64>,
    erodep: &Array2<f64>,
) -> Result<()> {
    write_table(
        out,
        grid,
        &FINE_COLUMNS,
        &[elevation, wave_height, shear_stress, erodep],
    )
}

pub fn save_coarse_csv<P: AsRef<Path>>(path: P, sim: &Simulation) -> Result<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    write_coarse_csv(&mut out, sim)?;
    out.flush()?;
    info!("Wrote {}", path.as_ref().display());
    Ok(())
}

pub fn save_fine_csv<P: AsRef<Path>>(
    path: P,
    grid: &Grid,
    elevation: &Array2<f64>,
    wave_height: &Array2<f64>,
    shear_stress: &Array2<f64>,
    erodep: &Array2<f64>,
) -> Result<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    write_fine_csv(&mut out, grid, elevation, wave_height, shear_stress, erodep)?;
    out.flush()?;
    info!("Wrote {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fine_rows_run_x_fastest() {
        let grid = Grid::new(3, 2, 10.0, 100.0, 50.0);
        let z = Array2::from_shape_fn((3, 2), |(i, j)| (10 * j + i) as f64);
        let zero = Array2::zeros((3, 2));
        let mut buf = Vec::new();
        write_fine_csv(&mut buf, &grid, &z, &zero, &zero, &zero).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "X,Y,Z,wH,wS,erodep");
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[1], "100,50,0,0,0,0");
        assert_eq!(lines[2], "110,50,1,0,0,0");
        assert_eq!(lines[4], "100,60,10,0,0,0");
    }

    #[test]
    fn mismatched_field_is_rejected() {
        let grid = Grid::new(3, 2, 10.0, 0.0, 0.0);
        let z = Array2::zeros((3, 2));
        let wrong = Array2::zeros((2, 3));
        let mut buf = Vec::new();
        let err = write_fine_csv(&mut buf, &grid, &z, &wrong, &z, &z);
        assert!(matches!(err, Err(WaveSedError::InvalidGrid(_))));
    }
}
