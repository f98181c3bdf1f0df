use crate::airy::{HuygensPropagator, PropagationInput, WavePropagator};
use crate::coast::{shoreline_contours, Classification};
use crate::contour::Contour;
use crate::error::Result;
use crate::grid::Bathymetry;
use crate::materials::MaterialProperties;
use crate::sediment::SedimentField;
use crate::source::SourceMask;
use crate::spline;
use crate::wavefield::WaveField;
use ndarray::{Array2, Zip};
use std::path::Path;
use tracing::{debug, info};

/// Model-wide settings fixed at construction.
#[derive(Debug, Clone)]
pub struct ModelParams {
    pub resolution_factor: usize, // Compute grid spacing = dx × factor
    pub wavebase: f64,            // Maximum depth of wave influence (m)
    pub sea_level: f64,
    pub materials: MaterialProperties,
}

impl Default for ModelParams {
    fn default() -> Self {
        ModelParams {
            resolution_factor: 1,
            wavebase: 10.0,
            sea_level: 0.0,
            materials: MaterialProperties::default(),
        }
    }
}

/// Per-scenario solver controls.
#[derive(Debug, Clone)]
pub struct SolverParams {
    pub sigma: f64,       // Gaussian smoothing of heights and sediment
    pub tsteps: usize,    // Advection iteration bound
    pub dsteps: usize,    // Diffusion iteration bound
    pub shoal_coeff: f64, // Shallow-water attenuation per front step
    pub shadow: bool,
    pub period_coeff: f64, // Deep-water period T = period_coeff · √h0
}

impl Default for SolverParams {
    fn default() -> Self {
        SolverParams {
            sigma: 1.0,
            tsteps: 1000,
            dsteps: 1000,
            shoal_coeff: 0.99,
            shadow: false,
            period_coeff: 3.55,
        }
    }
}

/// Wave and sediment model over one bathymetry.
///
/// Waves and sediment are computed on the compute grid, which is a spline
/// resampling of the bathymetry when `resolution_factor > 1` and the
/// bathymetry itself otherwise. Erosion/deposition, wave height and shear
/// are always reported on the bathymetry grid.
pub struct Simulation {
    pub bathymetry: Bathymetry,
    pub compute: Option<Bathymetry>,
    pub params: ModelParams,
    pub classification: Classification,
    pub waves: WaveField,
    pub sediment: SedimentField,
    pub erodep: Array2<f64>,
    pub wave_height: Array2<f64>,
    pub shear_stress: Array2<f64>,
    propagator: Option<Box<dyn WavePropagator>>, // None: Huygens kernel from the solver controls
}

impl Simulation {
    pub fn new(bathymetry: Bathymetry, mut params: ModelParams) -> Self {
        params.resolution_factor = params.resolution_factor.max(1);

        let compute = if params.resolution_factor > 1 {
            let coarse = bathymetry.resampled(params.resolution_factor);
            debug!(
                "Compute grid {}x{} at dx={}",
                coarse.grid.nx, coarse.grid.ny, coarse.grid.dx
            );
            Some(coarse)
        } else {
            None
        };

        let fine_shape = bathymetry.grid.shape();
        let (nx, ny) = compute.as_ref().unwrap_or(&bathymetry).grid.shape();
        let classification = Classification::new(
            &compute.as_ref().unwrap_or(&bathymetry).elevation,
            params.sea_level,
        );

        info!(
            "Model on {}x{} grid (dx={}), compute grid {}x{}",
            fine_shape.0, fine_shape.1, bathymetry.grid.dx, nx, ny
        );

        Simulation {
            bathymetry,
            compute,
            params,
            classification,
            waves: WaveField::new(nx, ny),
            sediment: SedimentField::new(nx, ny),
            erodep: Array2::zeros(fine_shape),
            wave_height: Array2::zeros(fine_shape),
            shear_stress: Array2::zeros(fine_shape),
            propagator: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P, params: ModelParams) -> Result<Self> {
        let bathymetry = Bathymetry::from_file(path)?;
        Ok(Self::new(bathymetry, params))
    }

    /// Swap the front-propagation kernel. A custom kernel ignores
    /// [`SolverParams::period_coeff`].
    pub fn with_propagator(mut self, propagator: Box<dyn WavePropagator>) -> Self {
        self.propagator = Some(propagator);
        self
    }

    /// Grid the waves and sediment are computed on.
    pub fn compute_bathymetry(&self) -> &Bathymetry {
        self.compute.as_ref().unwrap_or(&self.bathymetry)
    }

    fn compute_bathymetry_mut(&mut self) -> &mut Bathymetry {
        match &mut self.compute {
            Some(coarse) => coarse,
            None => &mut self.bathymetry,
        }
    }

    /// Classify the compute grid against `sea_level`.
    pub fn find_land(&mut self, sea_level: f64) {
        self.params.sea_level = sea_level;
        self.classification = Classification::new(&self.compute_bathymetry().elevation, sea_level);
        info!(
            "Sea level {}: {} sea cells, {} land cells",
            sea_level,
            self.classification.sea_count(),
            self.classification.land_count()
        );
    }

    /// Sea-level contours of the compute grid, dropping closed ones not
    /// longer than `min_length`.
    pub fn compute_shoreline(&self, min_length: f64) -> Vec<Contour> {
        shoreline_contours(
            &self.compute_bathymetry().elevation,
            self.classification.sea_level,
            min_length,
        )
    }

    pub fn wave_source(&self, direction: f64) -> SourceMask {
        SourceMask::from_direction(direction, &self.classification.land)
    }

    pub fn compute_waves(&mut self, source: &SourceMask, h0: f64, solver: &SolverParams) {
        let huygens;
        let propagator: &dyn WavePropagator = match &self.propagator {
            Some(custom) => custom.as_ref(),
            None => {
                huygens = HuygensPropagator::new(solver.period_coeff);
                &huygens
            }
        };

        let compute = self.compute_bathymetry();
        let raw = propagator.propagate(&PropagationInput {
            dx: compute.grid.dx,
            shoal_coeff: solver.shoal_coeff,
            h0,
            depth: &self.classification.depth,
            sources: source,
            land: &self.classification.land,
            shadow: solver.shadow,
        });
        let waves = WaveField::from_propagation(
            raw,
            &self.classification,
            &compute.elevation,
            &self.params.materials,
            self.params.wavebase,
            solver.sigma,
        );
        self.waves = waves;
        debug!(
            "Waves from {}°: max height {:.3} m, max shear {:.4} N/m²",
            source.direction,
            self.waves.max_height(),
            self.waves.max_shear()
        );
    }

    /// Erosion and deposition under the current waves. Updates the
    /// elevation and depth, then projects results onto the bathymetry grid.
    pub fn compute_sediment(&mut self, sigma: f64, tsteps: usize, dsteps: usize) {
        let dx = self.compute_bathymetry().grid.dx;
        self.sediment = SedimentField::compute(
            &mut self.waves,
            &self.classification,
            &self.params.materials,
            dx,
            sigma,
            tsteps,
            dsteps,
        );

        let erodep = self.sediment.erodep.clone();
        let compute = self.compute_bathymetry_mut();
        compute.elevation += &erodep;
        let elevation = compute.elevation.clone();
        self.classification.update_depth(&elevation);

        if self.compute.is_some() {
            self.interpolate();
        } else {
            self.erodep = erodep;
            self.wave_height = self.waves.height.clone();
            self.shear_stress = self.waves.shear_stress.clone();
        }
    }

    /// Run one scenario with the given solver controls.
    pub fn run_scenario(&mut self, direction: f64, h0: f64, solver: &SolverParams) {
        let source = self.wave_source(direction);
        self.compute_waves(&source, h0, solver);
        self.compute_sediment(solver.sigma, solver.tsteps, solver.dsteps);
    }

    /// Project erosion/deposition, height and shear back to the bathymetry
    /// grid and update the fine elevation.
    fn interpolate(&mut self) {
        let Some(coarse) = self.compute.as_ref() else {
            return;
        };
        let fine = &self.bathymetry.grid;
        let erodep = spline::resample(&self.sediment.erodep, &coarse.grid, fine);
        let mut height = spline::resample(&self.waves.height, &coarse.grid, fine);
        let mut shear = spline::resample(&self.waves.shear_stress, &coarse.grid, fine);

        self.bathymetry.elevation += &erodep;
        let sea_level = self.classification.sea_level;
        Zip::from(&mut height)
            .and(&mut shear)
            .and(&self.bathymetry.elevation)
            .for_each(|h, s, &z| {
                if z > sea_level {
                    *h = 0.0;
                    *s = 0.0;
                }
                *h = h.max(0.0);
            });

        self.erodep = erodep;
        self.wave_height = height;
        self.shear_stress = shear;
    }
}
