//! Sweep results and the human-readable summary table.

use serde::{Deserialize, Serialize};

use crate::decode::bit_string;

/// Result of one completed sweep iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    /// Second read row used in this iteration.
    pub row_in2: usize,
    /// Sampled voltage per column of the written row (V).
    pub analog: Vec<f64>,
    /// Thresholded bits, column 1 first.
    pub bits: Vec<bool>,
    /// Supply energy over the measurement window (J).
    pub energy: f64,
}

impl IterationResult {
    pub fn bit_string(&self) -> String {
        bit_string(&self.bits)
    }
}

/// Why a sweep stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepTermination {
    /// Every `row_in2` value was attempted.
    Completed,
    /// The simulator executable could not be started.
    SimulatorMissing,
    /// The user interrupted the sweep.
    Interrupted,
}

/// Everything a sweep produced, possibly partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub bit_width: usize,
    pub iterations: Vec<IterationResult>,
    pub termination: SweepTermination,
}

impl SweepReport {
    pub fn new(bit_width: usize) -> Self {
        Self {
            bit_width,
            iterations: Vec::new(),
            termination: SweepTermination::Completed,
        }
    }

    /// True when no iteration was cut short by an abort.
    pub fn is_complete(&self) -> bool {
        self.termination == SweepTermination::Completed
    }

    /// Sum of per-iteration energies (J).
    pub fn total_energy(&self) -> f64 {
        self.iterations.iter().map(|it| it.energy).sum()
    }

    /// Bit strings in iteration order, as persisted in the output file.
    pub fn digital_matrix(&self) -> Vec<String> {
        self.iterations.iter().map(|it| it.bit_string()).collect()
    }

    /// Format as human-readable text.
    pub fn to_text(&self) -> String {
        let rule = "-".repeat(80);
        let mut out = String::new();

        out.push_str("===== RCS RESULT SUMMARY =====\n");
        out.push_str(&format!(
            "{:>7} | {:<40} | {:<6} | {:>12}\n",
            "row_in2", "Analog values (V)", "Bits", "Energy [pJ]"
        ));
        out.push_str(&rule);
        out.push('\n');

        for it in &self.iterations {
            let analog = it
                .analog
                .iter()
                .map(|v| format!("{:.3}", v))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "{:>7} | {:<40} | {:<6} | {:>12.3}\n",
                it.row_in2,
                analog,
                it.bit_string(),
                it.energy * 1e12
            ));
        }

        out.push_str(&rule);
        out.push('\n');
        out.push_str(&format!(
            "Total Energy per multiplication [pJ]: {:.3}\n",
            self.total_energy() * 1e12
        ));

        match self.termination {
            SweepTermination::Completed => {}
            SweepTermination::SimulatorMissing => {
                out.push_str("Sweep aborted: ngspice not found.\n");
            }
            SweepTermination::Interrupted => {
                out.push_str("Sweep aborted: interrupted by user.\n");
            }
        }

        out
    }
}
