//! The read-compute-store sweep.
//!
//! For every second read row in `2..=M-1` the sweep synthesizes the array
//! netlist, expands the template, runs the simulator and decodes the
//! written row. Digital results are appended to the output file as each
//! iteration completes, so an aborted sweep leaves a valid prefix behind.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::RcsConfig;
use crate::decode::{analog_to_bits, bit_string, LogDecoder};
use crate::error::{Error, Result};
use crate::geometry::ArrayGeometry;
use crate::netlist::generate_instances;
use crate::pattern::BitMatrix;
use crate::report::{IterationResult, SweepReport, SweepTermination};
use crate::runner::{CancelFlag, CircuitSimulator, SimulationOutcome};
use crate::template::Template;
use crate::units::format_value;

/// Outcome of a single iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum IterationOutcome {
    /// Results decoded and persisted.
    Recorded(IterationResult),
    /// The simulator failed for this row; nothing recorded.
    Skipped(String),
    /// The sweep must stop.
    Abort(SweepTermination),
}

/// Incrementally written digital output file.
struct OutputFile<'a> {
    path: &'a Path,
    writer: BufWriter<File>,
}

impl<'a> OutputFile<'a> {
    fn create(path: &'a Path, bit_width: usize) -> Result<Self> {
        let file = File::create(path).map_err(|e| Error::file_access(path, e))?;
        let mut out = Self {
            path,
            writer: BufWriter::new(file),
        };
        out.write_line(&bit_width.to_string())?;
        Ok(out)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|e| Error::file_access(self.path, e))
    }
}

/// State shared by every iteration of one sweep.
pub struct Sweep<'a, S: CircuitSimulator + ?Sized> {
    config: &'a RcsConfig,
    geometry: ArrayGeometry,
    pattern: BitMatrix,
    template: Template,
    decoder: LogDecoder,
    simulator: &'a S,
    cancel: CancelFlag,
}

impl<'a, S: CircuitSimulator + ?Sized> Sweep<'a, S> {
    /// Validate the configuration and load the pattern and template.
    pub fn prepare(config: &'a RcsConfig, simulator: &'a S, cancel: CancelFlag) -> Result<Self> {
        config.validate()?;
        let geometry = config.geometry()?;
        let pattern = BitMatrix::load(&config.files.pattern, geometry.rows, geometry.cols)?;
        let template = Template::load(&config.files.template)?;
        let decoder = LogDecoder::new(geometry.row_out, geometry.cols)?;

        log::info!(
            "array {}x{}: row_in1={}, row_out={}, row_in2 in {:?}",
            geometry.rows,
            geometry.cols,
            geometry.row_in1,
            geometry.row_out,
            geometry.row_in2_range()
        );

        Ok(Self {
            config,
            geometry,
            pattern,
            template,
            decoder,
            simulator,
            cancel,
        })
    }

    /// Run one iteration. Only file errors are returned as `Err`.
    pub fn run_iteration(&self, row_in2: usize) -> Result<IterationOutcome> {
        let files = &self.config.files;
        let selection = self.geometry.select(row_in2)?;

        let directives = generate_instances(
            self.config,
            &self.geometry,
            &selection,
            &self.pattern,
            &files.instances,
        )?;
        self.template.write_expanded(&directives, &files.top)?;

        let log_file = files.log_file(row_in2);
        // A stale log from an earlier run must not be decoded as this one.
        match std::fs::remove_file(&log_file) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::file_access(&log_file, e)),
        }

        match self.simulator.simulate(&files.top, &log_file, &self.cancel) {
            SimulationOutcome::Completed => {}
            SimulationOutcome::ExecutionFailed(reason) => {
                let err = Error::SimulatorFailed { row_in2, reason };
                log::warn!("{}; skipping iteration", err);
                return Ok(IterationOutcome::Skipped(err.to_string()));
            }
            SimulationOutcome::ToolMissing(reason) => {
                log::error!(
                    "{}; make sure it is installed and in your PATH",
                    Error::SimulatorNotFound(reason)
                );
                return Ok(IterationOutcome::Abort(SweepTermination::SimulatorMissing));
            }
            SimulationOutcome::Cancelled => {
                log::error!("{} during row_in2={}", Error::Interrupted, row_in2);
                return Ok(IterationOutcome::Abort(SweepTermination::Interrupted));
            }
        }

        let measured = self.decoder.decode_file(&log_file)?;
        let bits = analog_to_bits(&measured.analog, self.config.digital_threshold);
        log::info!(
            "row_in2={}: bits {} energy {}",
            row_in2,
            bit_string(&bits),
            format_value(measured.energy, "J")
        );

        Ok(IterationOutcome::Recorded(IterationResult {
            row_in2,
            analog: measured.analog,
            bits,
            energy: measured.energy,
        }))
    }

    /// Run every iteration, persisting bit rows to the output file.
    pub fn run(&self) -> Result<SweepReport> {
        let output_path = &self.config.files.output;
        let mut output = OutputFile::create(output_path, self.geometry.bit_width())?;
        let mut report = SweepReport::new(self.geometry.bit_width());

        for row_in2 in self.geometry.row_in2_range() {
            if self.cancel.is_cancelled() {
                log::error!("{} before row_in2={}", Error::Interrupted, row_in2);
                report.termination = SweepTermination::Interrupted;
                break;
            }

            log::info!("=== RCS iteration with row_in2 = {} ===", row_in2);
            match self.run_iteration(row_in2)? {
                IterationOutcome::Recorded(result) => {
                    output.write_line(&result.bit_string())?;
                    report.iterations.push(result);
                }
                IterationOutcome::Skipped(_) => continue,
                IterationOutcome::Abort(termination) => {
                    report.termination = termination;
                    break;
                }
            }
        }

        log::info!(
            "sweep finished ({:?}): {} of {} iterations recorded in {}",
            report.termination,
            report.iterations.len(),
            self.geometry.row_in2_range().count(),
            output_path.display()
        );
        Ok(report)
    }
}

/// Prepare and run a full sweep.
pub fn run_sweep<S: CircuitSimulator + ?Sized>(
    config: &RcsConfig,
    simulator: &S,
    cancel: CancelFlag,
) -> Result<SweepReport> {
    Sweep::prepare(config, simulator, cancel)?.run()
}
