use std::fs::File;
use std::io::BufReader;

use serde::{
    Deserialize,
    Serialize
};

use crate::math::curve::segmentfunction::InterpolationMode;
use crate::stitching::stitcherror::StitchError;

/// Which points enter the aggregate chi-square of a stitching pass.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregatePoints {
    /// Every pending segment's samples as added, offsets ignored.
    #[default]
    Raw,
    /// Every segment's samples after applying its fitted offset.
    Shifted,
}

/// Tunables of the stitching engine.
///
/// Every field has a default, so a JSON document only needs to name the
/// values it overrides:
///
/// ```json
/// { "pixel_size": 0.25, "restarts": 30 }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Bound on the x-offset magnitude, in x units.
    pub pixel_size: f64,
    /// Boundary slack of the containment test that supersedes re-scans.
    pub overlap_tolerance: f64,
    /// A fitted |x-offset| within this distance of `pixel_size` is railed.
    pub railing_tolerance: f64,
    pub restarts: usize,
    pub restart_step: f64,
    /// Where a restart lands after wrapping: `-pixel_size + restart_wrap_inset`.
    pub restart_wrap_inset: f64,
    pub initial_x_offset: f64,
    pub initial_y_offset: f64,
    /// Nelder-Mead iteration cap per restart.
    pub max_iters: u64,
    /// Nelder-Mead stops once the simplex costs' standard deviation drops below this.
    pub sd_tolerance: f64,
    pub interpolation: InterpolationMode,
    pub aggregate_points: AggregatePoints,
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            pixel_size: 0.5,
            overlap_tolerance: 1.0,
            railing_tolerance: 0.005,
            restarts: 20,
            restart_step: 0.1,
            restart_wrap_inset: 0.05,
            initial_x_offset: 0.01,
            initial_y_offset: 0.0,
            max_iters: 400,
            sd_tolerance: 1e-12,
            interpolation: InterpolationMode::Linear,
            aggregate_points: AggregatePoints::Raw,
        }
    }
}

impl Configuration {
    pub fn new() -> Configuration {
        Configuration::default()
    }

    pub fn from_reader(file_path: String) -> Result<Configuration, StitchError> {
        let file = File::open(file_path)?;
        let reader = BufReader::new(file);
        let configuration: Configuration = serde_json::from_reader(reader)?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn from_json_str(json: &str) -> Result<Configuration, StitchError> {
        let configuration: Configuration = serde_json::from_str(json)?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), StitchError> {
        validate_pixel_size(self.pixel_size)?;
        let non_negative = [
            ("overlap_tolerance", self.overlap_tolerance),
            ("railing_tolerance", self.railing_tolerance),
            ("restart_step", self.restart_step),
            ("restart_wrap_inset", self.restart_wrap_inset),
            ("sd_tolerance", self.sd_tolerance),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(StitchError::invalid_configuration(name, value));
            }
        }
        for (name, value) in [("initial_x_offset", self.initial_x_offset), ("initial_y_offset", self.initial_y_offset)] {
            if !value.is_finite() {
                return Err(StitchError::invalid_configuration(name, value));
            }
        }
        if self.restarts == 0 {
            return Err(StitchError::invalid_configuration("restarts", 0.0));
        }
        if self.max_iters == 0 {
            return Err(StitchError::invalid_configuration("max_iters", 0.0));
        }
        Ok(())
    }
}

pub fn validate_pixel_size(pixel_size: f64) -> Result<(), StitchError> {
    if !pixel_size.is_finite() || pixel_size <= 0.0 {
        return Err(StitchError::invalid_configuration("pixel_size", pixel_size));
    }
    Ok(())
}
