use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};
use wavesed::config::Config;
use wavesed::output::{save_coarse_csv, save_fine_csv};
use wavesed::scenario::run_wave_sed;
use wavesed::shoreline::{read_shoreline, shoreline_to_grid};
use wavesed::visualisation::FieldVisualiser;

/// Wave refraction and wave-induced sediment transport over a bathymetry grid
#[derive(Parser)]
#[command(name = "wavesed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every scenario in a config file and write the outputs
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Check a config file without running it
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Turn a digitised `x y` shoreline into an `x y z` bathymetry file
    Shoreline {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, default_value = "100")]
        dx: f64,

        #[arg(long, default_value = "100")]
        dy: f64,

        #[arg(short, long)]
        output: PathBuf,
    },
}

fn run(config_path: PathBuf) -> Result<()> {
    let config = Config::from_file(&config_path)?;
    config.print_summary();

    let run = run_wave_sed(
        &config.model.bathymetry,
        config.model.params(),
        &config.solver.params(),
        &config.scenarios,
    )
    .with_context(|| format!("Failed to load {}", config.model.bathymetry.display()))?;

    let out_dir = &config.output.directory;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    if config.output.csv_fine {
        let model = &run.model;
        save_fine_csv(
            out_dir.join("wavesed_average.csv"),
            &model.bathymetry.grid,
            &model.bathymetry.elevation,
            &run.averages.wave_height,
            &run.averages.shear_stress,
            &run.averages.erodep,
        )?;
    }
    if config.output.csv_coarse {
        save_coarse_csv(out_dir.join("wavesed_last.csv"), &run.model)?;
    }
    if !config.output.plots.is_empty() {
        let mut visualiser = FieldVisualiser::new(
            out_dir,
            config.output.image_width,
            config.output.image_height,
        )?
        .with_isochrone_step(config.output.isochrone_step);
        if let Some((vmin, vmax)) = config.output.range() {
            visualiser = visualiser.with_range(vmin, vmax);
        }
        let written = visualiser.plot_selected(&run.model, &config.output.plots);
        info!("{} of {} maps written", written, config.output.plots.len());
    }

    info!("Run complete");
    Ok(())
}

fn shoreline(input: PathBuf, dx: f64, dy: f64, output: PathBuf) -> Result<()> {
    let (x, y) = read_shoreline(&input)
        .with_context(|| format!("Failed to read shoreline {}", input.display()))?;
    let grid = shoreline_to_grid(&x, &y, dx, dy)?;
    grid.save_xyz(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(
        "Wrote {}x{} bathymetry to {}",
        grid.x.len(),
        grid.y.len(),
        output.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_max_level(cli.log_level).init();

    match cli.command {
        Commands::Run { config } => run(config),
        Commands::Validate { config } => {
            let config = Config::from_file(&config)?;
            config.print_summary();
            info!("Configuration is valid");
            Ok(())
        }
        Commands::Shoreline {
            input,
            dx,
            dy,
            output,
        } => shoreline(input, dx, dy, output),
    }
}
