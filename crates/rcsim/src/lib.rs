//! Read-compute-store emulation on an 8T SRAM array through ngspice.
//!
//! This crate provides:
//! - Loading of the stored bit pattern ([`BitMatrix`])
//! - Synthesis of the array netlist and its measurement directives
//! - Injection of those directives into a top-level circuit template
//! - Running ngspice and decoding its measurement log into bits and energy
//! - The sweep over every second-operand row, with incremental persistence
//!
//! ```no_run
//! use rcsim::{CancelFlag, Ngspice, RcsConfig, run_sweep};
//!
//! let config = RcsConfig::default().with_bit_width(4);
//! let ngspice = Ngspice::new(config.simulator.clone());
//! let report = run_sweep(&config, &ngspice, CancelFlag::new())?;
//! println!("{}", report.to_text());
//! # Ok::<(), rcsim::Error>(())
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod geometry;
pub mod netlist;
pub mod pattern;
pub mod report;
pub mod runner;
pub mod sweep;
pub mod template;
pub mod units;

pub use config::{EnergyWindow, FileLayout, RcsConfig, SimulatorConfig};
pub use decode::{LogDecoder, Measurements, analog_to_bits, bit_string, parse_measures};
pub use error::{Error, Result};
pub use geometry::{ArrayGeometry, RowRole, RowSelection};
pub use netlist::{
    AnalysisDirectives, Measure, NetlistDocument, PlotCommand, Statement, Synthesis,
    generate_instances, synthesize,
};
pub use pattern::BitMatrix;
pub use report::{IterationResult, SweepReport, SweepTermination};
pub use runner::{
    CancelFlag, CircuitSimulator, Ngspice, SimulationOutcome, is_ngspice_available,
    ngspice_version,
};
pub use sweep::{IterationOutcome, Sweep, run_sweep};
pub use template::{Marker, Template, TemplateLine, inject_directives};
