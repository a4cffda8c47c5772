//! Decoding of ngspice measurement output.
//!
//! `.measure` results appear in the batch log as `name = value` lines.
//! Missing measurements decode as 0.0 rather than failing: whether the
//! simulator itself failed is known from its exit status, not from the log.

use std::collections::HashMap;
use std::path::Path;

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};
use crate::netlist::ENERGY_MEASURE;

/// Signed fixed-point or exponential number.
const NUMBER: &str = r"([+-]?\d+(?:\.\d*)?(?:[eE][+-]?\d+)?)";

/// Decoded measurements of one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurements {
    /// Sampled storage-node voltage per column, 0.0 when not reported.
    pub analog: Vec<f64>,
    /// Integrated supply energy in joules, 0.0 when not reported.
    pub energy: f64,
}

/// Extracts the written row's voltages and the supply energy from a log.
#[derive(Debug, Clone)]
pub struct LogDecoder {
    voltage: Regex,
    energy: Regex,
    cols: usize,
}

impl LogDecoder {
    pub fn new(row_out: usize, cols: usize) -> Result<Self> {
        let voltage = Regex::new(&format!(r"v_q_r{}_c(\d+)\s*=\s*{}", row_out, NUMBER))?;
        // The log does not necessarily keep the declared case of E_VDD.
        let energy = RegexBuilder::new(&format!(r"{}\s*=\s*{}", ENERGY_MEASURE, NUMBER))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            voltage,
            energy,
            cols,
        })
    }

    /// Decode log text. The last occurrence of a measurement wins.
    pub fn decode(&self, log: &str) -> Measurements {
        let mut values: HashMap<usize, f64> = HashMap::new();
        let mut energy = 0.0;

        for line in log.lines() {
            if let Some(caps) = self.voltage.captures(line) {
                if let (Ok(col), Ok(val)) = (caps[1].parse::<usize>(), caps[2].parse::<f64>()) {
                    values.insert(col, val);
                }
            }
            if let Some(caps) = self.energy.captures(line) {
                if let Ok(val) = caps[1].parse::<f64>() {
                    energy = val;
                }
            }
        }

        let analog = (1..=self.cols)
            .map(|c| values.get(&c).copied().unwrap_or(0.0))
            .collect();

        Measurements { analog, energy }
    }

    /// Read and decode a log file.
    pub fn decode_file(&self, path: &Path) -> Result<Measurements> {
        let bytes = std::fs::read(path).map_err(|e| Error::file_access(path, e))?;
        Ok(self.decode(&String::from_utf8_lossy(&bytes)))
    }
}

/// Parse a simulator log for the measurements of `row_out`.
pub fn parse_measures(log_file: &Path, row_out: usize, cols: usize) -> Result<Measurements> {
    LogDecoder::new(row_out, cols)?.decode_file(log_file)
}

/// Threshold analog values into bits: `value >= threshold` reads as 1.
pub fn analog_to_bits(values: &[f64], threshold: f64) -> Vec<bool> {
    values.iter().map(|&v| v >= threshold).collect()
}

/// Render bits as a `'0'`/`'1'` string.
pub fn bit_string(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}
