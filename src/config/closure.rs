//! Settings for the vertical turbulence closures (TKE and IDEMIX).

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Seconds per day, for the IDEMIX time scales.
const DAY: f64 = 86400.0;

/// Which face the horizontal diffusion of TKE/IDEMIX energy zeroes at the
/// eastern end of the domain.
///
/// The observed scheme zeroes the zonal flux at the fifth face from the end of
/// the padded array, which is an interior face. `Outermost` zeroes the last
/// face instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EastFluxEdge {
    /// Zero the flux at padded index `len - 5`.
    #[default]
    AsObserved,
    /// Zero the flux at the last padded index only.
    Outermost,
}

impl EastFluxEdge {
    /// Padded x index whose zonal flux is forced to zero.
    pub fn zeroed_face(self, padded_len: usize) -> Option<usize> {
        match self {
            EastFluxEdge::AsObserved => padded_len.checked_sub(5),
            EastFluxEdge::Outermost => padded_len.checked_sub(1),
        }
    }
}

/// Mixing-length limiter of the TKE closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixingLength {
    /// Limit by the distance to the surface and the bottom (choice 1).
    BoundaryDistance,
    /// Blanke and Delecluse: limit the vertical gradient of the length (choice 2).
    Blanke,
}

impl TryFrom<u8> for MixingLength {
    type Error = ConfigError;

    fn try_from(choice: u8) -> Result<Self, Self::Error> {
        match choice {
            1 => Ok(MixingLength::BoundaryDistance),
            2 => Ok(MixingLength::Blanke),
            other => Err(ConfigError::UnsupportedMixingLength(other)),
        }
    }
}

/// Turbulent kinetic energy closure parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TkeConfig {
    pub enable_tke: bool,
    pub c_k: f64,
    pub c_eps: f64,
    pub alpha_tke: f64,
    pub mxl_min: f64,
    pub kappa_m_min: f64,
    pub kappa_m_max: f64,
    /// 1 = boundary distance, 2 = Blanke.
    pub mxl_choice: u8,
    /// Constant viscosity used when TKE is off.
    pub kappa_m_0: f64,
    /// Constant diffusivity used when TKE is off.
    pub kappa_h_0: f64,
    pub enable_hor_diffusion: bool,
    /// Lateral diffusivity for TKE (m^2/s).
    pub k_h_tke: f64,
    pub east_flux_edge: EastFluxEdge,
    /// Hydrostatic model: unstable stratification is mixed by convective
    /// adjustment when TKE is off.
    pub enable_hydrostatic: bool,
}

impl Default for TkeConfig {
    fn default() -> Self {
        Self {
            enable_tke: false,
            c_k: 0.1,
            c_eps: 0.7,
            alpha_tke: 1.0,
            mxl_min: 1e-12,
            kappa_m_min: 0.0,
            kappa_m_max: 100.0,
            mxl_choice: 1,
            kappa_m_0: 0.0,
            kappa_h_0: 0.0,
            enable_hor_diffusion: false,
            k_h_tke: 2000.0,
            east_flux_edge: EastFluxEdge::AsObserved,
            enable_hydrostatic: true,
        }
    }
}

impl TkeConfig {
    /// Enable or disable the TKE closure.
    pub fn with_tke(mut self, enable: bool) -> Self {
        self.enable_tke = enable;
        self
    }

    /// Switch convective adjustment of the constant diffusivities.
    pub fn with_hydrostatic(mut self, enable: bool) -> Self {
        self.enable_hydrostatic = enable;
        self
    }

    /// Set the mixing-length choice (1 or 2).
    pub fn with_mxl_choice(mut self, choice: u8) -> Self {
        self.mxl_choice = choice;
        self
    }

    /// Set the dissipation constant `c_eps`.
    pub fn with_c_eps(mut self, c_eps: f64) -> Self {
        self.c_eps = c_eps;
        self
    }

    /// Set the viscosity constant `c_k`.
    pub fn with_c_k(mut self, c_k: f64) -> Self {
        self.c_k = c_k;
        self
    }

    /// Enable lateral TKE diffusion with diffusivity `k_h`.
    pub fn with_hor_diffusion(mut self, k_h: f64) -> Self {
        self.enable_hor_diffusion = true;
        self.k_h_tke = k_h;
        self
    }

    /// Choose the east-edge flux treatment of the lateral diffusion.
    pub fn with_east_flux_edge(mut self, edge: EastFluxEdge) -> Self {
        self.east_flux_edge = edge;
        self
    }

    /// Parsed mixing-length choice.
    pub fn mixing_length(&self) -> Result<MixingLength, ConfigError> {
        MixingLength::try_from(self.mxl_choice)
    }

    /// Check ranges and the mixing-length choice.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mixing_length()?;
        non_negative("tke.c_k", self.c_k)?;
        non_negative("tke.c_eps", self.c_eps)?;
        non_negative("tke.alpha_tke", self.alpha_tke)?;
        positive("tke.mxl_min", self.mxl_min)?;
        if self.kappa_m_max < self.kappa_m_min {
            return Err(ConfigError::InvalidParameter {
                name: "tke.kappa_m_max",
                value: self.kappa_m_max,
                reason: "must not be below kappa_m_min",
            });
        }
        non_negative("tke.k_h_tke", self.k_h_tke)
    }
}

/// Internal-wave energy (IDEMIX) closure parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdemixConfig {
    pub enable_idemix: bool,
    /// Time scale for vertical symmetrisation (s).
    pub tau_v: f64,
    /// Time scale for horizontal symmetrisation (s).
    pub tau_h: f64,
    pub gamma: f64,
    /// Spectral bandwidth in modes.
    pub jstar: f64,
    /// Dissipation parameter.
    pub mu0: f64,
    pub enable_hor_diffusion: bool,
    pub east_flux_edge: EastFluxEdge,
}

impl Default for IdemixConfig {
    fn default() -> Self {
        Self {
            enable_idemix: false,
            tau_v: DAY,
            tau_h: 15.0 * DAY,
            gamma: 1.57,
            jstar: 10.0,
            mu0: 4.0 / 3.0,
            enable_hor_diffusion: false,
            east_flux_edge: EastFluxEdge::AsObserved,
        }
    }
}

impl IdemixConfig {
    /// Enable or disable IDEMIX.
    pub fn with_idemix(mut self, enable: bool) -> Self {
        self.enable_idemix = enable;
        self
    }

    /// Enable horizontal symmetrisation.
    pub fn with_hor_diffusion(mut self, enable: bool) -> Self {
        self.enable_hor_diffusion = enable;
        self
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("idemix.tau_v", self.tau_v)?;
        positive("idemix.tau_h", self.tau_h)?;
        positive("idemix.jstar", self.jstar)?;
        non_negative("idemix.gamma", self.gamma)?;
        non_negative("idemix.mu0", self.mu0)
    }
}

pub(super) fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value,
            reason: "must be positive and finite",
        })
    }
}

pub(super) fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value,
            reason: "must be non-negative and finite",
        })
    }
}
