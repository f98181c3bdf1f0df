use crate::materials::MaterialProperties;
use crate::scenario::Scenario;
use crate::simulation::{ModelParams, SolverParams};
use crate::visualisation::PlotField;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Bathymetry and sediment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub bathymetry: PathBuf,
    #[serde(default = "default_resolution_factor")]
    pub resolution_factor: usize,
    #[serde(default = "default_wavebase")]
    pub wavebase: f64, // Maximum depth of wave influence (m)
    #[serde(default)]
    pub sea_level: f64,
    #[serde(default = "default_d50")]
    pub d50: f64, // Median grain diameter (m)
    #[serde(default = "default_entrainment_coeff")]
    pub entrainment_coeff: f64,
    #[serde(default = "default_diffusion_coeff")]
    pub diffusion_coeff: f64,
}

fn default_resolution_factor() -> usize {
    1
}

fn default_wavebase() -> f64 {
    10.0
}

fn default_d50() -> f64 {
    1.0e-4
}

fn default_entrainment_coeff() -> f64 {
    1.0
}

fn default_diffusion_coeff() -> f64 {
    30.0
}

impl ModelConfig {
    fn validate(&self) -> Result<()> {
        if self.wavebase <= 0.0 {
            return Err(anyhow!("wavebase must be positive, got {}", self.wavebase));
        }
        if self.d50 <= 0.0 {
            return Err(anyhow!("d50 must be positive, got {}", self.d50));
        }
        if self.entrainment_coeff < 0.0 || self.diffusion_coeff <= 0.0 {
            return Err(anyhow!(
                "Sediment coefficients out of range (entrainment_coeff={}, diffusion_coeff={})",
                self.entrainment_coeff,
                self.diffusion_coeff
            ));
        }
        Ok(())
    }

    pub fn params(&self) -> ModelParams {
        ModelParams {
            resolution_factor: self.resolution_factor.max(1),
            wavebase: self.wavebase,
            sea_level: self.sea_level,
            materials: MaterialProperties::new(
                self.d50,
                self.entrainment_coeff,
                self.diffusion_coeff,
            ),
        }
    }
}

/// Numerical controls shared by every scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_steps")]
    pub tsteps: usize,
    #[serde(default = "default_steps")]
    pub dsteps: usize,
    #[serde(default = "default_sigma")]
    pub sigma: f64,
    #[serde(default = "default_shoal_coeff")]
    pub shoal_coeff: f64,
    #[serde(default)]
    pub shadow: bool,
    #[serde(default = "default_period_coeff")]
    pub period_coeff: f64, // T = period_coeff · √h0
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            tsteps: default_steps(),
            dsteps: default_steps(),
            sigma: default_sigma(),
            shoal_coeff: default_shoal_coeff(),
            shadow: false,
            period_coeff: default_period_coeff(),
        }
    }
}

fn default_steps() -> usize {
    1000
}

fn default_sigma() -> f64 {
    1.0
}

fn default_shoal_coeff() -> f64 {
    0.99
}

fn default_period_coeff() -> f64 {
    3.55
}

impl SolverConfig {
    fn validate(&self) -> Result<()> {
        if self.sigma < 0.0 {
            return Err(anyhow!("sigma must be non-negative, got {}", self.sigma));
        }
        if self.shoal_coeff <= 0.0 || self.shoal_coeff > 1.0 {
            return Err(anyhow!(
                "shoal_coeff must be in (0, 1], got {}",
                self.shoal_coeff
            ));
        }
        if self.period_coeff <= 0.0 {
            return Err(anyhow!(
                "period_coeff must be positive, got {}",
                self.period_coeff
            ));
        }
        Ok(())
    }

    pub fn params(&self) -> SolverParams {
        SolverParams {
            sigma: self.sigma,
            tsteps: self.tsteps,
            dsteps: self.dsteps,
            shoal_coeff: self.shoal_coeff,
            shadow: self.shadow,
            period_coeff: self.period_coeff,
        }
    }
}

fn validate_scenario(index: usize, scenario: &Scenario) -> Result<()> {
    if !scenario.direction.is_finite() {
        return Err(anyhow!("Scenario {} has no valid direction", index));
    }
    if scenario.height < 0.0 {
        return Err(anyhow!(
            "Scenario {} wave height must be non-negative, got {}",
            index,
            scenario.height
        ));
    }
    if scenario.percent < 0.0 {
        return Err(anyhow!(
            "Scenario {} percent must be non-negative, got {}",
            index,
            scenario.percent
        ));
    }
    Ok(())
}

/// Output files configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_true")]
    pub csv_fine: bool,
    #[serde(default)]
    pub csv_coarse: bool,
    #[serde(default)]
    pub plots: Vec<String>,
    #[serde(default = "default_image_width")]
    pub image_width: u32,
    #[serde(default = "default_image_height")]
    pub image_height: u32,
    #[serde(default)]
    pub vmin: Option<f64>,
    #[serde(default)]
    pub vmax: Option<f64>,
    #[serde(default = "default_isochrone_step")]
    pub isochrone_step: f64, // Seconds between travel-time contours, 0 disables
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: default_directory(),
            csv_fine: true,
            csv_coarse: false,
            plots: Vec::new(),
            image_width: default_image_width(),
            image_height: default_image_height(),
            vmin: None,
            vmax: None,
            isochrone_step: default_isochrone_step(),
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("output")
}

fn default_true() -> bool {
    true
}

fn default_image_width() -> u32 {
    1200
}

fn default_image_height() -> u32 {
    1000
}

fn default_isochrone_step() -> f64 {
    10.0
}

impl OutputConfig {
    /// Fixed colour scale when both limits are set.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.vmin.zip(self.vmax)
    }

    fn validate(&self) -> Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(anyhow!(
                "Image dimensions must be positive (width={}, height={})",
                self.image_width,
                self.image_height
            ));
        }
        if let (Some(vmin), Some(vmax)) = (self.vmin, self.vmax) {
            if vmin >= vmax {
                return Err(anyhow!("vmin ({}) must be below vmax ({})", vmin, vmax));
            }
        }
        if self.isochrone_step < 0.0 {
            return Err(anyhow!(
                "isochrone_step must be non-negative, got {}",
                self.isochrone_step
            ));
        }
        // Unknown selectors are reported and skipped at plot time
        for name in &self.plots {
            if name.parse::<PlotField>().is_err() {
                warn!(
                    "Unknown plot field '{}'. Available: {}",
                    name,
                    PlotField::usage()
                );
            }
        }
        Ok(())
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

        let mut config = Self::from_toml(&content)?;

        // Relative bathymetry paths are taken from the config's directory
        if config.model.bathymetry.is_relative() {
            if let Some(dir) = path.parent() {
                config.model.bathymetry = dir.join(&config.model.bathymetry);
            }
        }
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse TOML config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.solver.validate()?;
        self.output.validate()?;

        if self.scenarios.is_empty() {
            return Err(anyhow!("At least one scenario must be defined"));
        }
        for (i, scenario) in self.scenarios.iter().enumerate() {
            validate_scenario(i, scenario)?;
        }
        Ok(())
    }

    /// Log configuration summary
    pub fn print_summary(&self) {
        info!("=== Wave/sediment configuration ===");
        info!(
            "Bathymetry: {} (resolution factor {})",
            self.model.bathymetry.display(),
            self.model.resolution_factor
        );
        info!(
            "Sea level {} m, wave base {} m",
            self.model.sea_level, self.model.wavebase
        );
        info!(
            "Sediment: d50={} m, Ce={}, Cd={}",
            self.model.d50, self.model.entrainment_coeff, self.model.diffusion_coeff
        );
        info!(
            "Solver: sigma={}, tsteps={}, dsteps={}, shoal={}, shadow={}",
            self.solver.sigma,
            self.solver.tsteps,
            self.solver.dsteps,
            self.solver.shoal_coeff,
            self.solver.shadow
        );
        info!("Scenarios: {}", self.scenarios.len());
        for (i, s) in self.scenarios.iter().enumerate() {
            info!(
                "  Scenario {}: direction {}°, height {} m, {}%",
                i, s.direction, s.height, s.percent
            );
        }
        info!("Output: {}", self.output.directory.display());
    }
}
