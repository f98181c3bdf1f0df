use crate::error::Result;
use crate::simulation::{ModelParams, Simulation, SolverParams};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// One wave-climate condition and its share of the time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub direction: f64, // Degrees counter-clockwise from +x
    pub height: f64,    // Boundary wave height (m)
    pub percent: f64,   // Share of activity (%)
}

impl Scenario {
    pub fn new(direction: f64, height: f64, percent: f64) -> Self {
        Scenario {
            direction,
            height,
            percent,
        }
    }
}

/// Percentage-weighted sums over scenarios on the bathymetry grid.
#[derive(Debug, Clone)]
pub struct ScenarioAccumulator {
    pub wave_height: Array2<f64>,
    pub shear_stress: Array2<f64>,
    pub erodep: Array2<f64>,
    pub scenarios: usize,
}

impl ScenarioAccumulator {
    pub fn new(shape: (usize, usize)) -> Self {
        ScenarioAccumulator {
            wave_height: Array2::zeros(shape),
            shear_stress: Array2::zeros(shape),
            erodep: Array2::zeros(shape),
            scenarios: 0,
        }
    }

    /// Add the model's latest fine-grid outputs weighted by `percent`.
    pub fn accumulate(&mut self, sim: &Simulation, percent: f64) {
        let frac = percent / 100.0;
        self.wave_height.scaled_add(frac, &sim.wave_height);
        self.shear_stress.scaled_add(frac, &sim.shear_stress);
        self.erodep.scaled_add(frac, &sim.erodep);
        self.scenarios += 1;
    }
}

/// Result of a multi-scenario run: averaged fields and the final model.
pub struct WaveSedRun {
    pub averages: ScenarioAccumulator,
    pub model: Simulation,
}

/// Run `scenarios` in order on an already built model.
///
/// Elevation changes carry over from one scenario to the next. Percentages
/// are used as given; they are expected to sum to 100.
pub fn run_scenarios(
    mut model: Simulation,
    sea_level: f64,
    solver: &SolverParams,
    scenarios: &[Scenario],
) -> WaveSedRun {
    let total: f64 = scenarios.iter().map(|s| s.percent).sum();
    if !scenarios.is_empty() && (total - 100.0).abs() > 1e-6 {
        warn!("Scenario percentages sum to {}%, not 100%", total);
    }

    model.find_land(sea_level);
    let mut averages = ScenarioAccumulator::new(model.bathymetry.grid.shape());

    for (s, scenario) in scenarios.iter().enumerate() {
        model.run_scenario(scenario.direction, scenario.height, solver);
        info!("Finished wave and sediment computation for scenario {}", s);

        averages.accumulate(&model, scenario.percent);
    }

    WaveSedRun { averages, model }
}

/// Load the bathymetry at `path`, build the model and run every scenario.
pub fn run_wave_sed<P: AsRef<Path>>(
    path: P,
    params: ModelParams,
    solver: &SolverParams,
    scenarios: &[Scenario],
) -> Result<WaveSedRun> {
    let sea_level = params.sea_level;
    let model = Simulation::from_file(path, params)?;
    info!("Preparation of model initial setting completed");
    Ok(run_scenarios(model, sea_level, solver, scenarios))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Bathymetry, Grid};

    fn model() -> Simulation {
        let grid = Grid::new(12, 6, 25.0, 0.0, 0.0);
        let elevation = Array2::from_shape_fn((12, 6), |(i, _)| 2.0 - 0.8 * i as f64);
        Simulation::new(Bathymetry::new(grid, elevation).unwrap(), ModelParams::default())
    }

    #[test]
    fn accumulator_weights_by_percent() {
        let mut sim = model();
        sim.wave_height.fill(2.0);
        sim.shear_stress.fill(0.4);
        sim.erodep.fill(-0.1);

        let mut acc = ScenarioAccumulator::new((12, 6));
        acc.accumulate(&sim, 25.0);
        acc.accumulate(&sim, 75.0);
        assert_eq!(acc.scenarios, 2);
        assert!(acc.wave_height.iter().all(|&h| (h - 2.0).abs() < 1e-12));
        assert!(acc.erodep.iter().all(|&e| (e + 0.1).abs() < 1e-12));
    }

    #[test]
    fn single_full_scenario_matches_the_model() {
        let run = run_scenarios(
            model(),
            0.0,
            &SolverParams::default(),
            &[Scenario::new(0.0, 1.5, 100.0)],
        );
        assert_eq!(run.averages.wave_height, run.model.wave_height);
        assert_eq!(run.averages.erodep, run.model.erodep);
    }

    #[test]
    fn no_scenarios_leave_zero_averages() {
        let run = run_scenarios(model(), 0.0, &SolverParams::default(), &[]);
        assert_eq!(run.averages.scenarios, 0);
        assert!(run.averages.wave_height.iter().all(|&h| h == 0.0));
    }
}
