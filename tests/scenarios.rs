use ndarray::Array2;
use std::f64::consts::TAU;
use std::fs;
use std::path::Path;
use wavesed::config::Config;
use wavesed::output::save_fine_csv;
use wavesed::wavefield::BREAKING_RATIO;
use wavesed::{run_scenarios, run_wave_sed, Bathymetry, ModelParams, Scenario, Simulation, SolverParams};

/// Write an `nx × ny` point file, x fastest, with elevation from `z(i, j)`.
fn write_grid(path: &Path, nx: usize, ny: usize, dx: f64, z: impl Fn(usize, usize) -> f64) {
    let mut text = String::new();
    for j in 0..ny {
        for i in 0..nx {
            text.push_str(&format!("{} {} {}\n", i as f64 * dx, j as f64 * dx, z(i, j)));
        }
    }
    fs::write(path, text).unwrap();
}

fn flat_model(dir: &Path) -> Simulation {
    let path = dir.join("flat.xyz");
    write_grid(&path, 10, 10, 50.0, |_, _| -5.0);
    Simulation::from_file(&path, ModelParams::default()).unwrap()
}

#[test]
fn calm_flat_bottom_leaves_the_bed_alone() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_scenarios(
        flat_model(dir.path()),
        0.0,
        &SolverParams::default(),
        &[Scenario::new(0.0, 0.5, 100.0)],
    );
    let tau_cr = run.model.params.materials.critical_shear();
    assert!(run.model.waves.max_shear() < tau_cr);
    assert!(run.model.sediment.entrainment.iter().all(|&h| h == 0.0));
    assert!(run.averages.erodep.iter().all(|&dz| dz == 0.0));
    assert!(run.model.bathymetry.elevation.iter().all(|&z| z == -5.0));
    assert!(run.averages.wave_height.iter().all(|&h| h > 0.0));
}

#[test]
fn stronger_waves_entrain_sediment() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_scenarios(
        flat_model(dir.path()),
        0.0,
        &SolverParams::default(),
        &[Scenario::new(0.0, 3.0, 100.0)],
    );
    let tau_cr = run.model.params.materials.critical_shear();
    assert!(run.model.waves.max_shear() > tau_cr);
    assert!(run.model.sediment.entrainment.sum() > 0.0);
    assert!(run.averages.erodep.iter().any(|&dz| dz != 0.0));
}

#[test]
fn unit_height_waves_already_entrain() {
    // T = 3.55·√h0 puts a 1 m swell just past the fine-sand threshold
    let dir = tempfile::tempdir().unwrap();
    let run = run_scenarios(
        flat_model(dir.path()),
        0.0,
        &SolverParams::default(),
        &[Scenario::new(0.0, 1.0, 100.0)],
    );
    let tau_cr = run.model.params.materials.critical_shear();
    assert!(run.model.waves.max_shear() > tau_cr);
    assert!(run.averages.erodep.iter().any(|&dz| dz != 0.0));
}

#[test]
fn period_coefficient_sets_the_wavelength() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flat.xyz");
    write_grid(&path, 10, 10, 50.0, |_, _| -5.0);
    let scenarios = [Scenario::new(0.0, 0.5, 100.0)];

    let wavelength = |period_coeff: f64| {
        let solver = SolverParams {
            period_coeff,
            ..SolverParams::default()
        };
        let run = run_wave_sed(&path, ModelParams::default(), &solver, &scenarios).unwrap();
        run.model.waves.wavelength[[5, 5]]
    };
    let short = wavelength(3.55);
    let long = wavelength(8.0);
    assert!(short > 0.0);
    assert!(long > 1.5 * short);
}

#[test]
fn elevation_changes_carry_between_scenarios() {
    let dir = tempfile::tempdir().unwrap();
    let solver = SolverParams::default();
    let strong = Scenario::new(0.0, 3.0, 100.0);

    let mut fresh = flat_model(dir.path());
    fresh.find_land(0.0);
    fresh.run_scenario(strong.direction, strong.height, &solver);

    let run = run_scenarios(flat_model(dir.path()), 0.0, &solver, &[strong.clone(), strong]);
    // Both weights are 100%, so the accumulated erodep is the sum of both scenarios
    for (&z, &dz) in run.model.bathymetry.elevation.iter().zip(run.averages.erodep.iter()) {
        assert!((z - (-5.0 + dz)).abs() < 1e-9);
    }
    assert!(run.model.bathymetry.elevation.iter().any(|&z| z != -5.0));

    // The second scenario sees the bed left by the first
    assert_ne!(run.model.erodep, fresh.erodep);
    assert_ne!(run.model.waves.shear_stress, fresh.waves.shear_stress);
    let first = &run.averages.erodep - &run.model.erodep;
    for (a, b) in first.iter().zip(fresh.erodep.iter()) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn identical_half_scenarios_average_to_either() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_scenarios(
        flat_model(dir.path()),
        0.0,
        &SolverParams::default(),
        &[Scenario::new(0.0, 0.5, 50.0), Scenario::new(0.0, 0.5, 50.0)],
    );
    assert_eq!(run.averages.scenarios, 2);
    assert_eq!(run.averages.wave_height, run.model.wave_height);
    assert_eq!(run.averages.shear_stress, run.model.shear_stress);
    assert_eq!(run.averages.erodep, run.model.erodep);
}

#[test]
fn all_land_produces_nothing() {
    let grid = wavesed::Grid::new(8, 8, 20.0, 0.0, 0.0);
    let bathy = Bathymetry::new(grid, Array2::from_elem((8, 8), 3.0)).unwrap();
    let run = run_scenarios(
        Simulation::new(bathy, ModelParams::default()),
        0.0,
        &SolverParams::default(),
        &[Scenario::new(90.0, 2.0, 100.0)],
    );
    let model = &run.model;
    for field in [
        &model.waves.height,
        &model.waves.power,
        &model.waves.shear_stress,
        &model.sediment.entrainment,
        &model.sediment.erodep,
        &run.averages.wave_height,
        &run.averages.erodep,
    ] {
        assert!(field.iter().all(|&v| v == 0.0));
    }
}

#[test]
fn sloping_beach_obeys_wave_invariants() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("beach.xyz");
    // Land at low i, deepening toward the east edge
    write_grid(&path, 30, 12, 25.0, |i, j| 4.0 - 0.6 * i as f64 + 0.05 * j as f64);
    let params = ModelParams {
        resolution_factor: 2,
        ..ModelParams::default()
    };
    let mut model = Simulation::from_file(&path, params).unwrap();
    model.find_land(0.0);
    let first = model.classification.land.clone();
    model.find_land(0.0);
    assert_eq!(first, model.classification.land);

    let source = model.wave_source(30.0);
    model.compute_waves(&source, 2.5, &SolverParams::default());
    let class = &model.classification;
    for ((i, j), &h) in model.waves.height.indexed_iter() {
        if class.is_wet(i, j) {
            assert!(h <= BREAKING_RATIO * class.depth[[i, j]] + 1e-12);
        }
    }
    assert!(model.waves.direction.iter().all(|&d| (0.0..TAU).contains(&d)));

    model.compute_sediment(1.0, 500, 500);
    assert_eq!(model.erodep.dim(), (30, 12));
    assert!(model.wave_height.iter().all(|&h| h >= 0.0));
}

#[test]
fn config_driven_run_writes_fine_csv() {
    let dir = tempfile::tempdir().unwrap();
    write_grid(&dir.path().join("flat.xyz"), 10, 10, 50.0, |_, _| -5.0);
    let config_path = dir.path().join("run.toml");
    fs::write(
        &config_path,
        r#"
[model]
bathymetry = "flat.xyz"

[solver]
tsteps = 200
dsteps = 200

[[scenarios]]
direction = 180.0
height = 0.5
percent = 100.0
"#,
    )
    .unwrap();

    let config = Config::from_file(&config_path).unwrap();
    let run = run_wave_sed(
        &config.model.bathymetry,
        config.model.params(),
        &config.solver.params(),
        &config.scenarios,
    )
    .unwrap();

    let csv = dir.path().join("out.csv");
    save_fine_csv(
        &csv,
        &run.model.bathymetry.grid,
        &run.model.bathymetry.elevation,
        &run.averages.wave_height,
        &run.averages.shear_stress,
        &run.averages.erodep,
    )
    .unwrap();
    let text = fs::read_to_string(&csv).unwrap();
    assert_eq!(text.lines().next(), Some("X,Y,Z,wH,wS,erodep"));
    assert_eq!(text.lines().count(), 101);
}

#[test]
fn missing_bathymetry_is_reported() {
    let err = run_wave_sed(
        "/definitely/not/here.xyz",
        ModelParams::default(),
        &SolverParams::default(),
        &[],
    );
    assert!(matches!(err, Err(wavesed::WaveSedError::BathymetryNotFound(_))));
}
