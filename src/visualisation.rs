use crate::coast::shoreline_contours;
use crate::contour::{find_contours, Contour};
use crate::error::{Result, WaveSedError};
use crate::grid::Grid;
use crate::simulation::Simulation;
use ndarray::{Array1, Array2};
use plotters::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Fields that can be rendered as a map.
///
/// The first group lives on the compute grid, the last four on the
/// bathymetry grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotField {
    Bathy,
    WaveLength,
    Travel,
    WaveCelerity,
    WaveHeight,
    WavePower,
    BottomVelocity,
    Shear,
    Entrainment,
    Dz,
    FineBathy,
    Erodep,
    FineWaveHeight,
    FineShear,
}

impl PlotField {
    pub const ALL: [PlotField; 14] = [
        PlotField::Bathy,
        PlotField::WaveLength,
        PlotField::Travel,
        PlotField::WaveCelerity,
        PlotField::WaveHeight,
        PlotField::WavePower,
        PlotField::BottomVelocity,
        PlotField::Shear,
        PlotField::Entrainment,
        PlotField::Dz,
        PlotField::FineBathy,
        PlotField::Erodep,
        PlotField::FineWaveHeight,
        PlotField::FineShear,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PlotField::Bathy => "bathy",
            PlotField::WaveLength => "wlength",
            PlotField::Travel => "travel",
            PlotField::WaveCelerity => "wcelerity",
            PlotField::WaveHeight => "wheight",
            PlotField::WavePower => "wpower",
            PlotField::BottomVelocity => "ubot",
            PlotField::Shear => "shear",
            PlotField::Entrainment => "ent",
            PlotField::Dz => "dz",
            PlotField::FineBathy => "fbathy",
            PlotField::Erodep => "erodep",
            PlotField::FineWaveHeight => "wH",
            PlotField::FineShear => "wS",
        }
    }

    /// Comma separated list of every selector.
    pub fn usage() -> String {
        PlotField::ALL
            .iter()
            .map(|f| f.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn is_fine(&self) -> bool {
        matches!(
            self,
            PlotField::FineBathy | PlotField::Erodep | PlotField::FineWaveHeight | PlotField::FineShear
        )
    }

    /// Signed fields get a colour scale centred on zero.
    fn is_signed(&self) -> bool {
        matches!(
            self,
            PlotField::Bathy | PlotField::FineBathy | PlotField::Dz | PlotField::Erodep
        )
    }

    /// Pull the field out of the model.
    pub fn data(&self, sim: &Simulation) -> Array2<f64> {
        match self {
            PlotField::Bathy => sim.compute_bathymetry().elevation.clone(),
            PlotField::WaveLength => sim.waves.wavelength.clone(),
            PlotField::Travel => sim.waves.travel.clone(),
            PlotField::WaveCelerity => sim.waves.celerity.clone(),
            PlotField::WaveHeight => sim.waves.height.clone(),
            PlotField::WavePower => sim.waves.power.clone(),
            PlotField::BottomVelocity => sim.waves.bottom_velocity.clone(),
            PlotField::Shear => sim.waves.shear_stress.clone(),
            PlotField::Entrainment => sim.sediment.entrainment.clone(),
            PlotField::Dz => sim.sediment.erodep.clone(),
            PlotField::FineBathy => sim.bathymetry.elevation.clone(),
            PlotField::Erodep => sim.erodep.clone(),
            PlotField::FineWaveHeight => sim.wave_height.clone(),
            PlotField::FineShear => sim.shear_stress.clone(),
        }
    }
}

impl fmt::Display for PlotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlotField {
    type Err = WaveSedError;

    fn from_str(s: &str) -> Result<Self> {
        PlotField::ALL
            .iter()
            .find(|f| f.name() == s)
            .copied()
            .ok_or_else(|| WaveSedError::UnknownField(s.to_string()))
    }
}

/// Travel-time levels `step, 2·step, ...` up to `max_travel`.
///
/// A non-positive step gives no levels.
pub fn isochrone_levels(max_travel: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || !max_travel.is_finite() {
        return Vec::new();
    }
    let count = (max_travel / step).floor().max(0.0) as usize;
    (1..=count).map(|k| k as f64 * step).collect()
}

/// Colour scale limits: `fixed` when given, symmetric about zero for
/// signed fields, the data range otherwise.
pub fn value_range(data: &Array2<f64>, signed: bool, fixed: Option<(f64, f64)>) -> (f64, f64) {
    if let Some(range) = fixed {
        return range;
    }
    if signed {
        let max_abs = data.iter().map(|&v| v.abs()).fold(0.0_f64, f64::max);
        (-max_abs, max_abs)
    } else {
        data.iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }
}

fn node_spacing(coords: &Array1<f64>) -> f64 {
    if coords.len() > 1 {
        (coords[coords.len() - 1] - coords[0]) / (coords.len() - 1) as f64
    } else {
        0.0
    }
}

/// Contour polyline in index space mapped onto grid coordinates.
fn to_physical(contour: &Contour, grid: &Grid) -> Vec<(f64, f64)> {
    let (hx, hy) = (node_spacing(&grid.x), node_spacing(&grid.y));
    contour
        .points
        .iter()
        .map(|&(i, j)| (grid.x[0] + i * hx, grid.y[0] + j * hy))
        .collect()
}

pub struct FieldVisualiser {
    output_dir: PathBuf,
    width: u32,
    height: u32,
    range: Option<(f64, f64)>, // Fixed colour scale, automatic when None
    isochrone_step: f64,       // Seconds between travel-time contours
    diverging: Box<dyn colorgrad::Gradient>,
    sequential: Box<dyn colorgrad::Gradient>,
}

impl FieldVisualiser {
    pub fn new<P: AsRef<Path>>(output_dir: P, width: u32, height: u32) -> Result<Self> {
        std::fs::create_dir_all(output_dir.as_ref())?;

        Ok(Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            width,
            height,
            range: None,
            isochrone_step: 10.0,
            diverging: Box::new(colorgrad::preset::rd_yl_bu()),
            sequential: Box::new(colorgrad::preset::viridis()),
        })
    }

    /// Use `[vmin, vmax]` for every map instead of the data range.
    pub fn with_range(mut self, vmin: f64, vmax: f64) -> Self {
        self.range = Some((vmin, vmax));
        self
    }

    pub fn with_isochrone_step(mut self, step: f64) -> Self {
        self.isochrone_step = step;
        self
    }

    /// Render every selector in `names`, skipping unknown ones.
    ///
    /// Returns the number of images written.
    pub fn plot_selected(&self, sim: &Simulation, names: &[String]) -> usize {
        let mut written = 0;
        for name in names {
            let field = match name.parse::<PlotField>() {
                Ok(field) => field,
                Err(e) => {
                    warn!("{}. Available fields: {}", e, PlotField::usage());
                    continue;
                }
            };
            match self.plot(sim, field) {
                Ok(path) => {
                    info!("Saved {} map: {}", field, path.display());
                    written += 1;
                }
                Err(e) => warn!("Failed to plot {}: {}", field, e),
            }
        }
        written
    }

    pub fn plot(&self, sim: &Simulation, field: PlotField) -> Result<PathBuf> {
        let bathy = if field.is_fine() {
            &sim.bathymetry
        } else {
            sim.compute_bathymetry()
        };
        let data = field.data(sim);

        let shoreline: Vec<Vec<(f64, f64)>> =
            shoreline_contours(&bathy.elevation, sim.classification.sea_level, 0.0)
                .iter()
                .map(|c| to_physical(c, &bathy.grid))
                .collect();
        let mut isochrones = Vec::new();
        if field == PlotField::Travel {
            // Unreached cells sit beyond the last front
            let max_travel = data.fold(0.0_f64, |m, &t| m.max(t));
            let travel = data.mapv(|t| if t < 0.0 { max_travel + self.isochrone_step } else { t });
            for level in isochrone_levels(max_travel, self.isochrone_step) {
                isochrones.extend(
                    find_contours(&travel, level)
                        .iter()
                        .map(|c| to_physical(c, &bathy.grid)),
                );
            }
        }

        let path = self.output_dir.join(format!("{}.png", field.name()));
        self.plot_field(&data, &bathy.grid, field, &shoreline, &isochrones, &path)
            .map_err(|e| WaveSedError::Plot(e.to_string()))?;
        Ok(path)
    }

    fn plot_field(
        &self,
        data: &Array2<f64>,
        grid: &Grid,
        field: PlotField,
        shoreline: &[Vec<(f64, f64)>],
        isochrones: &[Vec<(f64, f64)>],
        path: &Path,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let (nx, ny) = data.dim();
        let (min_val, max_val) = value_range(data, field.is_signed(), self.range);

        let half = 0.5 * grid.dx;
        let x_range = (grid.x[0] - half)..(grid.x[nx - 1] + half);
        let y_range = (grid.y[0] - half)..(grid.y[ny - 1] + half);

        let mut chart = ChartBuilder::on(&root)
            .caption(field.name(), ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("X (m)")
            .y_desc("Y (m)")
            .draw()?;

        chart.draw_series(data.indexed_iter().map(|((i, j), &value)| {
            let (x, y) = (grid.x[i], grid.y[j]);
            let color = self.value_to_color(value, min_val, max_val, field.is_signed());
            Rectangle::new([(x - half, y - half), (x + half, y + half)], color.filled())
        }))?;

        chart.draw_series(
            isochrones
                .iter()
                .map(|line| PathElement::new(line.clone(), WHITE.stroke_width(1))),
        )?;
        chart.draw_series(
            shoreline
                .iter()
                .map(|line| PathElement::new(line.clone(), BLACK.stroke_width(2))),
        )?;

        root.present()?;
        Ok(())
    }

    fn value_to_color(&self, value: f64, min_val: f64, max_val: f64, signed: bool) -> RGBColor {
        let normalized = if max_val > min_val {
            (value - min_val) / (max_val - min_val)
        } else {
            0.5
        };
        let normalized = normalized.clamp(0.0, 1.0);
        let gradient = if signed {
            &self.diverging
        } else {
            &self.sequential
        };
        let color_rgba = gradient.at(normalized as f32).to_rgba8();
        RGBColor(color_rgba[0], color_rgba[1], color_rgba[2])
    }
}
