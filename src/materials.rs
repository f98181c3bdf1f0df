/// Gravity (m/s²)
pub const GRAVITY: f64 = 9.81;
/// Sea water density (kg/m³)
pub const RHO_WATER: f64 = 1027.0;
/// Quartz sediment density (kg/m³)
pub const RHO_SEDIMENT: f64 = 2650.0;
/// Kinematic viscosity of water at 20°C (m²/s)
pub const VISCOSITY: f64 = 1.004e-6;

/// Van Rijn critical Shields parameter as `(upper D*, a, b)` rows,
/// `θcr = a · D*^b`. Bounds are inclusive and scanned in order.
pub const CRITICAL_SHEAR_TABLE: [(f64, f64, f64); 5] = [
    (4.0, 0.24, -1.0),
    (10.0, 0.14, -0.64),
    (20.0, 0.04, -0.1),
    (150.0, 0.013, 0.29),
    (f64::INFINITY, 0.045, 0.0),
];

/// Critical threshold for a given non-dimensional grain diameter.
pub fn critical_shear(ds: f64) -> f64 {
    CRITICAL_SHEAR_TABLE
        .iter()
        .find(|(upper, _, _)| ds <= *upper)
        .map(|&(_, a, b)| a * ds.powf(b))
        .unwrap_or(0.045)
}

/// Bed sediment and its transport coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialProperties {
    pub d50: f64,               // Median grain diameter (m)
    pub entrainment_coeff: f64, // Ce
    pub diffusion_coeff: f64,   // Cd
}

impl Default for MaterialProperties {
    fn default() -> Self {
        MaterialProperties::new(1.0e-4, 1.0, 30.0)
    }
}

impl MaterialProperties {
    pub fn new(d50: f64, entrainment_coeff: f64, diffusion_coeff: f64) -> Self {
        Self {
            d50,
            entrainment_coeff,
            diffusion_coeff,
        }
    }

    /// D* = d50 · (g (ρs/ρw − 1) / ν²)^(1/3)
    pub fn nondimensional_diameter(&self) -> f64 {
        let submerged = GRAVITY * (RHO_SEDIMENT / RHO_WATER - 1.0);
        self.d50 * (submerged / (VISCOSITY * VISCOSITY)).cbrt()
    }

    pub fn critical_shear(&self) -> f64 {
        critical_shear(self.nondimensional_diameter())
    }

    /// Wave friction factor over a rough bed (Sleath, 1984).
    ///
    /// Only meaningful for positive depth; returns zero otherwise.
    pub fn friction_factor(&self, depth: f64) -> f64 {
        if depth <= 0.0 {
            return 0.0;
        }
        let r = 1.0 + (self.d50 / (15.0 * depth)).ln();
        if r == 0.0 {
            return 0.0;
        }
        8.0 / 25.0 / (r * r)
    }
}
