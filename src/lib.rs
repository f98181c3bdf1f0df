//! Regional wave refraction and wave-induced sediment transport.
//!
//! Waves are transformed from deep to shallow water with linear (Airy)
//! theory, fronts are refracted by a Huygens travel-time march, and the
//! resulting bed shear drives entrainment, transport and diffusion of
//! sediment. Several wave-climate scenarios can be combined into
//! percentage-weighted averages.

pub mod airy;
pub mod coast;
pub mod config;
pub mod contour;
pub mod error;
pub mod filters;
pub mod grid;
pub mod materials;
pub mod output;
pub mod scenario;
pub mod sediment;
pub mod shoreline;
pub mod simulation;
pub mod source;
pub mod spline;
pub mod visualisation;
pub mod wavefield;

pub use error::{Result, WaveSedError};
pub use grid::{Bathymetry, Grid};
pub use scenario::{run_scenarios, run_wave_sed, Scenario, ScenarioAccumulator, WaveSedRun};
pub use simulation::{ModelParams, Simulation, SolverParams};
