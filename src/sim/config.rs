use crate::constants::{
    AVALANCHE_REPORT_THRESHOLD, DEFAULT_GRID_SIZE, DEFAULT_PRE_STEPS, DEFAULT_REPORT_INTERVAL, DEFAULT_STEPS,
    SLOWLY_DRIVEN_FREQUENCY,
};
use crate::dynamics::DynamicsKind;
use crate::error::{SimError, SimResult};
use crate::lattice::Boundary;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How grains are fed into the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DrivingMode {
    /// A grain is added only when no site is critical.
    SlowlyDriven,
    /// `steps * frequency` grains arrive at random times whatever the lattice is doing.
    ContinuouslyDriven { frequency: f64 },
}

impl DrivingMode {
    /// Negative frequencies select slow driving; anything above 1 is rejected.
    pub fn from_frequency(frequency: f64) -> SimResult<DrivingMode> {
        if frequency.is_nan() || frequency > 1.0 {
            return Err(SimError::InvalidFrequency(frequency));
        }
        if frequency < 0.0 {
            Ok(DrivingMode::SlowlyDriven)
        } else {
            Ok(DrivingMode::ContinuouslyDriven { frequency })
        }
    }
}

/// Settings for one run. Every field has a default, so a JSON file only needs
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub grid_size: usize,
    /// Unrecorded warm-up time units.
    pub pre_steps: u64,
    /// Recorded time units.
    pub steps: u64,
    pub frequency_grains: f64,
    pub dynamics: DynamicsKind,
    pub boundary: Boundary,
    pub fill_bias: Option<f64>,
    pub avalanche_threshold: u64,
    pub flush_trailing_avalanche: bool,
    pub report_interval: u64,
    pub seed: Option<u64>,
    /// Grain map to start from instead of a random fill; its row count
    /// replaces `grid_size`.
    pub input_map: Option<PathBuf>,
    /// Where the final grain map is written.
    pub save_map: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            pre_steps: DEFAULT_PRE_STEPS,
            steps: DEFAULT_STEPS,
            frequency_grains: SLOWLY_DRIVEN_FREQUENCY,
            dynamics: DynamicsKind::Classical,
            boundary: Boundary::Open,
            fill_bias: None,
            avalanche_threshold: AVALANCHE_REPORT_THRESHOLD,
            flush_trailing_avalanche: false,
            report_interval: DEFAULT_REPORT_INTERVAL,
            seed: None,
            input_map: None,
            save_map: None,
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> SimResult<SimConfig> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> SimResult<SimConfig> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the settings and derives the driving mode.
    pub fn validate(&self) -> SimResult<DrivingMode> {
        if self.grid_size == 0 {
            return Err(SimError::InvalidGridSize(self.grid_size));
        }
        if let Some(bias) = self.fill_bias {
            if !(0.0..=1.0).contains(&bias) {
                return Err(SimError::InvalidFillBias(bias));
            }
        }
        if self.report_interval == 0 {
            return Err(SimError::InvalidSetting("report_interval must be positive".to_string()));
        }
        DrivingMode::from_frequency(self.frequency_grains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_slowly_driven_classical() {
        let config = SimConfig::default();
        assert_eq!(config.grid_size, 1024);
        assert_eq!(config.steps, 10_000);
        assert_eq!(config.avalanche_threshold, 63);
        assert_eq!(config.validate().unwrap(), DrivingMode::SlowlyDriven);
    }

    #[test]
    fn frequency_selects_mode() {
        assert_eq!(DrivingMode::from_frequency(-1.0).unwrap(), DrivingMode::SlowlyDriven);
        assert_eq!(
            DrivingMode::from_frequency(0.0).unwrap(),
            DrivingMode::ContinuouslyDriven { frequency: 0.0 }
        );
        assert_eq!(
            DrivingMode::from_frequency(1.0).unwrap(),
            DrivingMode::ContinuouslyDriven { frequency: 1.0 }
        );
        assert!(matches!(DrivingMode::from_frequency(1.01), Err(SimError::InvalidFrequency(_))));
        assert!(matches!(DrivingMode::from_frequency(f64::NAN), Err(SimError::InvalidFrequency(_))));
    }

    #[test]
    fn invalid_settings_are_configuration_errors() {
        let cases = [
            SimConfig { grid_size: 0, ..SimConfig::default() },
            SimConfig { frequency_grains: 2.0, ..SimConfig::default() },
            SimConfig { fill_bias: Some(-0.1), ..SimConfig::default() },
            SimConfig { report_interval: 0, ..SimConfig::default() },
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert!(err.is_configuration(), "{err}");
        }
    }

    #[test]
    fn json_overrides_only_given_fields() {
        let config = SimConfig::from_json_str(
            r#"{ "grid_size": 64, "dynamics": "random2", "boundary": "periodic", "seed": 9 }"#,
        )
        .unwrap();
        assert_eq!(config.grid_size, 64);
        assert_eq!(config.dynamics, DynamicsKind::Random2);
        assert_eq!(config.boundary, Boundary::Periodic);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.steps, DEFAULT_STEPS);
        assert_eq!(config.input_map, None);

        let config = SimConfig::from_json_str(r#"{ "input_map": "start.map", "save_map": "end.map" }"#).unwrap();
        assert_eq!(config.input_map, Some(PathBuf::from("start.map")));
        assert_eq!(config.save_map, Some(PathBuf::from("end.map")));
    }

    #[test]
    fn unknown_dynamics_in_json_is_rejected() {
        let err = SimConfig::from_json_str(r#"{ "dynamics": "forest_fire" }"#).unwrap_err();
        assert!(matches!(err, SimError::Json(_)));
        assert!(err.to_string().contains("unsupported dynamics"));
    }

    #[test]
    fn json_round_trip() {
        let config = SimConfig {
            grid_size: 32,
            frequency_grains: 0.25,
            seed: Some(1),
            ..SimConfig::default()
        };
        let json = config.to_json_pretty().unwrap();
        assert_eq!(SimConfig::from_json_str(&json).unwrap(), config);
    }
}
