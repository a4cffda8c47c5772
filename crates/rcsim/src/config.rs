//! Run configuration.
//!
//! A single immutable [`RcsConfig`] is built once (defaults, JSON file, CLI
//! overrides) and handed by reference to every component of the sweep.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::ArrayGeometry;
use crate::units::parse_value;

/// Time window over which supply power is integrated into energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyWindow {
    /// Integration start (SPICE time string).
    pub start: String,
    /// Integration stop (SPICE time string, must not exceed the `.tran` stop).
    pub stop: String,
}

impl Default for EnergyWindow {
    fn default() -> Self {
        Self {
            start: "200p".to_string(),
            stop: "1400p".to_string(),
        }
    }
}

/// Input and output file locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLayout {
    /// Bit pattern, one row per line.
    pub pattern: PathBuf,
    /// Top-level circuit template containing the marker lines.
    pub template: PathBuf,
    /// Generated cell/source/IC netlist (included by the template).
    pub instances: PathBuf,
    /// Generated top-level simulator input.
    pub top: PathBuf,
    /// Digital results, one bit string per completed iteration.
    pub output: PathBuf,
    /// Directory receiving the per-iteration ngspice logs.
    pub log_dir: PathBuf,
}

impl Default for FileLayout {
    fn default() -> Self {
        Self {
            pattern: PathBuf::from("data_in.txt"),
            template: PathBuf::from("sram_8t_template.cir"),
            instances: PathBuf::from("sram_8t_helper.cir"),
            top: PathBuf::from("sram_8t_run.cir"),
            output: PathBuf::from("data_out.txt"),
            log_dir: PathBuf::from("."),
        }
    }
}

impl FileLayout {
    /// Log file written by ngspice for one sweep iteration.
    pub fn log_file(&self, row_in2: usize) -> PathBuf {
        self.log_dir.join(format!("ngspice_row_in2_{}.log", row_in2))
    }
}

/// Configuration for the ngspice runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Path to ngspice executable (default: "ngspice" in PATH).
    pub executable: String,
    /// Optional wall-clock limit per iteration; `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            executable: "ngspice".to_string(),
            timeout_secs: None,
        }
    }
}

/// Complete sweep configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RcsConfig {
    /// Operand width; the array has `bit_width + 2` rows and `bit_width` columns.
    pub bit_width: usize,
    /// Time at which the written row is sampled.
    pub sample_time: String,
    /// Voltage at or above which a sampled node reads as `1`.
    pub digital_threshold: f64,
    /// Supply voltage, also the high level of every pulse source.
    pub supply_voltage: f64,
    /// Energy integration window.
    pub energy_window: EnergyWindow,
    /// File locations.
    pub files: FileLayout,
    /// Simulator invocation.
    pub simulator: SimulatorConfig,
}

impl Default for RcsConfig {
    fn default() -> Self {
        Self {
            bit_width: 16,
            sample_time: "800p".to_string(),
            digital_threshold: 0.9,
            supply_voltage: 1.8,
            energy_window: EnergyWindow::default(),
            files: FileLayout::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl RcsConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_access(path, e))?;
        let config: RcsConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Set the operand width.
    pub fn with_bit_width(mut self, bit_width: usize) -> Self {
        self.bit_width = bit_width;
        self
    }

    /// Set the sample time.
    pub fn with_sample_time(mut self, sample_time: impl Into<String>) -> Self {
        self.sample_time = sample_time.into();
        self
    }

    /// Set the digital decision threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.digital_threshold = threshold;
        self
    }

    /// Replace the file layout.
    pub fn with_files(mut self, files: FileLayout) -> Self {
        self.files = files;
        self
    }

    /// Array geometry implied by `bit_width`.
    pub fn geometry(&self) -> Result<ArrayGeometry> {
        ArrayGeometry::from_bit_width(self.bit_width)
    }

    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.bit_width == 0 {
            return Err(Error::InvalidConfig("bit_width must be at least 1".into()));
        }

        if !(self.supply_voltage > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "supply_voltage must be positive, got {}",
                self.supply_voltage
            )));
        }

        // Both encoded levels (0 and vdd) must land on opposite sides.
        if !(self.digital_threshold > 0.0 && self.digital_threshold < self.supply_voltage) {
            return Err(Error::InvalidConfig(format!(
                "digital_threshold {} must lie strictly between 0 and {}",
                self.digital_threshold, self.supply_voltage
            )));
        }

        parse_time("sample_time", &self.sample_time)?;
        let start = parse_time("energy_window.start", &self.energy_window.start)?;
        let stop = parse_time("energy_window.stop", &self.energy_window.stop)?;
        if start >= stop {
            return Err(Error::InvalidConfig(format!(
                "energy window start {} is not before stop {}",
                self.energy_window.start, self.energy_window.stop
            )));
        }

        Ok(())
    }
}

fn parse_time(field: &str, value: &str) -> Result<f64> {
    match parse_value(value) {
        Some(t) if t >= 0.0 => Ok(t),
        _ => Err(Error::InvalidConfig(format!(
            "{} is not a valid SPICE time: {:?}",
            field, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RcsConfig::default();
        assert_eq!(config.bit_width, 16);
        assert_eq!(config.sample_time, "800p");
        assert_eq!(config.simulator.executable, "ngspice");
        assert!(config.simulator.timeout_secs.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RcsConfig =
            serde_json::from_str(r#"{"bit_width": 4, "files": {"output": "bits.txt"}}"#).unwrap();
        assert_eq!(config.bit_width, 4);
        assert_eq!(config.files.output, PathBuf::from("bits.txt"));
        assert_eq!(config.files.template, PathBuf::from("sram_8t_template.cir"));
        assert_eq!(config.digital_threshold, 0.9);
    }

    #[test]
    fn test_partial_energy_window() {
        let config: RcsConfig =
            serde_json::from_str(r#"{"energy_window": {"start": "100p"}}"#).unwrap();
        assert_eq!(config.energy_window.start, "100p");
        assert_eq!(config.energy_window.stop, "1400p");
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(RcsConfig::default().with_bit_width(0).validate().is_err());
        assert!(RcsConfig::default().with_threshold(0.0).validate().is_err());
        assert!(RcsConfig::default().with_threshold(1.8).validate().is_err());
        assert!(RcsConfig::default().with_sample_time("soon").validate().is_err());

        let mut config = RcsConfig::default();
        config.energy_window.start = "2n".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_demo_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/rcsim.json");
        let config = RcsConfig::load(&path).unwrap();
        assert_eq!(config.bit_width, 4);
        assert_eq!(config.sample_time, "1100p");
        config.validate().unwrap();

        let geometry = config.geometry().unwrap();
        assert_eq!((geometry.rows, geometry.cols), (6, 4));
    }

    #[test]
    fn test_load_missing_config() {
        let err = RcsConfig::load(Path::new("/nonexistent/rcsim.json")).unwrap_err();
        assert!(matches!(err, Error::FileAccess { .. }));
    }

    #[test]
    fn test_log_file_name() {
        let files = FileLayout {
            log_dir: PathBuf::from("logs"),
            ..FileLayout::default()
        };
        assert_eq!(
            files.log_file(3),
            PathBuf::from("logs").join("ngspice_row_in2_3.log")
        );
    }
}
