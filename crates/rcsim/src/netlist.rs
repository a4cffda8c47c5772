//! Netlist synthesis for one read-compute-store iteration.
//!
//! The generated document is included by the top-level template and holds
//! every bitcell instance, the per-column read/write circuitry, the
//! wordline and precharge sources, and the initial conditions that load the
//! bit pattern into the array. Alongside it, [`synthesize`] returns the
//! plot and measurement directives that the template injector splices into
//! the top-level file.
//!
//! Node names are part of the contract with the result decoder:
//!
//! | node                  | meaning                          |
//! |-----------------------|----------------------------------|
//! | `q_r{r}_c{c}`         | cell storage node                |
//! | `q_bar_r{r}_c{c}`     | complementary storage node       |
//! | `wwl_{r}` / `rwl_{r}` | write / read wordline of row `r` |
//! | `wbl_{c}` / `wbl_bar_{c}` | write bitline pair of column `c` |
//! | `rbl_{c}`             | read bitline of column `c`       |

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::{EnergyWindow, RcsConfig};
use crate::error::{Error, Result};
use crate::geometry::{ArrayGeometry, RowRole, RowSelection};
use crate::pattern::BitMatrix;

/// Name of the energy measurement. ngspice reports it in lower case.
pub const ENERGY_MEASURE: &str = "E_VDD";

/// Instantaneous supply power integrated by the energy measurement.
const SUPPLY_POWER_EXPR: &str = "-I(Vdd) * V(vdd)";

/// Shared precharge-enable node.
const PRECHARGE_NODE: &str = "pch";

/// Fixed read-bitline load.
const BITLINE_CAPACITANCE: &str = "50fF";

/// Vertical spacing between plotted storage nodes.
const PLOT_OFFSET_STEP: usize = 2;

pub fn q_node(row: usize, col: usize) -> String {
    format!("q_r{}_c{}", row, col)
}

pub fn q_bar_node(row: usize, col: usize) -> String {
    format!("q_bar_r{}_c{}", row, col)
}

pub fn write_wordline(row: usize) -> String {
    format!("wwl_{}", row)
}

pub fn read_wordline(row: usize) -> String {
    format!("rwl_{}", row)
}

pub fn read_bitline(col: usize) -> String {
    format!("rbl_{}", col)
}

/// Measurement name for the storage node of `(row_out, col)`.
pub fn measure_name(row_out: usize, col: usize) -> String {
    format!("v_{}", q_node(row_out, col))
}

/// Initial voltages `(q, q_bar)` for a stored bit.
///
/// A `1` puts the full supply on the primary node and 0V on its complement;
/// a `0` does the reverse. The netlist writes the same values as
/// `{b*vdd}` / `{vdd - b*vdd}` parameter expressions.
pub fn initial_voltages(bit: bool, vdd: f64) -> (f64, f64) {
    let b = if bit { 1.0 } else { 0.0 };
    (b * vdd, vdd - b * vdd)
}

/// Shape of an independent voltage source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    /// Periodic pulse from 0 to `high` using the template's timing parameters.
    Pulse { high: f64 },
    /// Constant level.
    Dc(f64),
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waveform::Pulse { high } => write!(
                f,
                "pulse 0 {} init_time taper_time taper_time wl_dur wl_period",
                high
            ),
            Waveform::Dc(level) => write!(f, "dc {}", level),
        }
    }
}

/// Which wordline of a row a source drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wordline {
    Read,
    Write,
}

/// One line of the generated netlist.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Comment(String),
    Blank,
    /// 8T bitcell at `(row, col)`.
    Cell { row: usize, col: usize },
    /// Read-bitline precharge of a column.
    Precharge { col: usize },
    /// Read-bitline capacitance to ground.
    BitlineCap { col: usize },
    /// Write driver sensing `rbl_{col}` and writing through `wwl_{row_out}`.
    WriteDriver { col: usize, row_out: usize },
    /// Global precharge enable.
    PrechargeControl(Waveform),
    /// One wordline source of a row.
    WordlineSource {
        row: usize,
        line: Wordline,
        waveform: Waveform,
    },
    /// Read bitline starts discharged.
    BitlineIc { col: usize },
    /// Storage node pair loaded from the pattern.
    CellIc { row: usize, col: usize, bit: bool },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Statement::Comment(ref text) => write!(f, "* {}", text),
            Statement::Blank => Ok(()),
            Statement::Cell { row, col } => write!(
                f,
                "Xcell_r{r}_c{c} wbl_{c} wbl_bar_{c} {q} {qb} {wwl} {rwl} {rbl} 8t_sram \
                 width_N={{1.5*width_N}} width_N_acc={{width_N}} width_P={{width_N}} \
                 width_N_read_1={{20*LAMBDA}} width_N_read_2={{20*LAMBDA}}",
                r = row,
                c = col,
                q = q_node(row, col),
                qb = q_bar_node(row, col),
                wwl = write_wordline(row),
                rwl = read_wordline(row),
                rbl = read_bitline(col),
            ),
            Statement::Precharge { col } => write!(
                f,
                "Xpc_c{} {} {} pre_charge_single width_P={{width_pc}}",
                col,
                read_bitline(col),
                PRECHARGE_NODE
            ),
            Statement::BitlineCap { col } => write!(
                f,
                "C_rbl_{} {} gnd {}",
                col,
                read_bitline(col),
                BITLINE_CAPACITANCE
            ),
            Statement::WriteDriver { col, row_out } => write!(
                f,
                "Xwd_c{c} {rbl} {wwl} wbl_{c} wbl_bar_{c} write_driver width_N={{width_N}} width_P={{width_P}}",
                c = col,
                rbl = read_bitline(col),
                wwl = write_wordline(row_out),
            ),
            Statement::PrechargeControl(waveform) => {
                write!(f, "V_pc {} gnd {}", PRECHARGE_NODE, waveform)
            }
            Statement::WordlineSource {
                row,
                line,
                waveform,
            } => {
                let node = match line {
                    Wordline::Read => read_wordline(row),
                    Wordline::Write => write_wordline(row),
                };
                write!(f, "V_{} {} gnd {}", node, node, waveform)
            }
            Statement::BitlineIc { col } => write!(f, ".ic V({}) = 0", read_bitline(col)),
            Statement::CellIc { row, col, bit } => {
                let b = u8::from(bit);
                write!(
                    f,
                    ".ic V({}) = {{{b}*vdd}}  V({}) = {{vdd - {b}*vdd}}",
                    q_node(row, col),
                    q_bar_node(row, col),
                    b = b
                )
            }
        }
    }
}

/// Generated netlist for one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct NetlistDocument {
    statements: Vec<Statement>,
}

impl NetlistDocument {
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Render the document as netlist text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for stmt in &self.statements {
            out.push_str(&stmt.to_string());
            out.push('\n');
        }
        out
    }

    /// Write the document to `path`, replacing any previous contents.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::file_access(path, e))?;
        let mut writer = BufWriter::new(file);
        for stmt in &self.statements {
            writeln!(writer, "{}", stmt).map_err(|e| Error::file_access(path, e))?;
        }
        writer.flush().map_err(|e| Error::file_access(path, e))
    }
}

/// Plot command listing the written row's storage nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotCommand {
    pub terms: Vec<String>,
}

impl fmt::Display for PlotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gnuplot {}", self.terms.join(", "))
    }
}

/// A `.measure tran` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Measure {
    /// Sample a node voltage at a fixed time.
    FindAt {
        name: String,
        node: String,
        at: String,
    },
    /// Integrate an expression over a window.
    Integral {
        name: String,
        expression: String,
        from: String,
        to: String,
    },
}

impl Measure {
    pub fn name(&self) -> &str {
        match self {
            Measure::FindAt { name, .. } | Measure::Integral { name, .. } => name,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::FindAt { name, node, at } => {
                write!(f, ".measure tran {} FIND v({}) AT={}", name, node, at)
            }
            Measure::Integral {
                name,
                expression,
                from,
                to,
            } => write!(
                f,
                ".measure tran {} INTEG par('{}') FROM={} TO={}",
                name, expression, from, to
            ),
        }
    }
}

/// Plot and measurement commands for the top-level file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisDirectives {
    pub plot: PlotCommand,
    pub measures: Vec<Measure>,
}

impl AnalysisDirectives {
    pub fn plot_line(&self) -> String {
        self.plot.to_string()
    }

    pub fn measure_lines(&self) -> Vec<String> {
        self.measures.iter().map(|m| m.to_string()).collect()
    }
}

/// Output of [`synthesize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub netlist: NetlistDocument,
    pub directives: AnalysisDirectives,
}

/// Build the netlist and analysis directives for one row selection.
pub fn synthesize(
    config: &RcsConfig,
    geometry: &ArrayGeometry,
    selection: &RowSelection,
    pattern: &BitMatrix,
) -> Result<Synthesis> {
    selection.validate(geometry.rows)?;
    if pattern.num_rows() != geometry.rows || pattern.num_cols() != geometry.cols {
        return Err(Error::InvalidPattern(format!(
            "pattern is {}x{}, array is {}x{}",
            pattern.num_rows(),
            pattern.num_cols(),
            geometry.rows,
            geometry.cols
        )));
    }

    let (m, n) = (geometry.rows, geometry.cols);
    let pulse = Waveform::Pulse {
        high: config.supply_voltage,
    };
    let low = Waveform::Dc(0.0);

    let mut stmts = Vec::with_capacity(m * n * 2 + n * 4 + m * 2 + 16);
    stmts.push(Statement::Comment("Auto-generated SRAM array instances".into()));
    stmts.push(Statement::Comment(format!(
        "M={}, N={}, row_in1={}, row_in2={}, row_out={}",
        m, n, selection.row_in1, selection.row_in2, selection.row_out
    )));
    stmts.push(Statement::Blank);

    for row in 1..=m {
        for col in 1..=n {
            stmts.push(Statement::Cell { row, col });
        }
    }
    stmts.push(Statement::Blank);

    for col in 1..=n {
        stmts.push(Statement::Precharge { col });
        stmts.push(Statement::BitlineCap { col });
        stmts.push(Statement::WriteDriver {
            col,
            row_out: selection.row_out,
        });
    }
    stmts.push(Statement::Blank);

    stmts.push(Statement::PrechargeControl(pulse));
    stmts.push(Statement::Blank);

    for row in 1..=m {
        let role = selection.role(row);
        let (read, write) = match role {
            RowRole::Read => (pulse, low),
            RowRole::Write => (low, pulse),
            RowRole::Idle => (low, low),
        };
        stmts.push(Statement::WordlineSource {
            row,
            line: Wordline::Read,
            waveform: read,
        });
        stmts.push(Statement::WordlineSource {
            row,
            line: Wordline::Write,
            waveform: write,
        });
    }
    stmts.push(Statement::Blank);

    stmts.push(Statement::Comment(
        "Initial conditions for all cells and read bitlines".into(),
    ));
    for col in 1..=n {
        stmts.push(Statement::BitlineIc { col });
    }
    for row in 1..=m {
        for col in 1..=n {
            stmts.push(Statement::CellIc {
                row,
                col,
                bit: pattern.bit(row, col),
            });
        }
    }

    let directives = analysis_directives(
        selection.row_out,
        n,
        &config.sample_time,
        &config.energy_window,
    );

    Ok(Synthesis {
        netlist: NetlistDocument { statements: stmts },
        directives,
    })
}

/// Synthesize and write the netlist to `sink`, returning the directives.
pub fn generate_instances(
    config: &RcsConfig,
    geometry: &ArrayGeometry,
    selection: &RowSelection,
    pattern: &BitMatrix,
    sink: &Path,
) -> Result<AnalysisDirectives> {
    let synthesis = synthesize(config, geometry, selection, pattern)?;
    synthesis.netlist.write_to(sink)?;
    log::debug!(
        "wrote {} netlist statements to {}",
        synthesis.netlist.statements().len(),
        sink.display()
    );
    Ok(synthesis.directives)
}

fn analysis_directives(
    row_out: usize,
    cols: usize,
    sample_time: &str,
    energy_window: &EnergyWindow,
) -> AnalysisDirectives {
    let mut terms = vec![write_wordline(row_out)];
    let mut offset = PLOT_OFFSET_STEP;
    for col in (1..=cols).rev() {
        terms.push(format!("{}+{}", q_node(row_out, col), offset));
        offset += PLOT_OFFSET_STEP;
    }
    // Wordline again on top so it is drawn over the offset traces.
    terms.push(write_wordline(row_out));

    let mut measures: Vec<Measure> = (1..=cols)
        .map(|col| Measure::FindAt {
            name: measure_name(row_out, col),
            node: q_node(row_out, col),
            at: sample_time.to_string(),
        })
        .collect();
    measures.push(Measure::Integral {
        name: ENERGY_MEASURE.to_string(),
        expression: SUPPLY_POWER_EXPR.to_string(),
        from: energy_window.start.clone(),
        to: energy_window.stop.clone(),
    });

    AnalysisDirectives {
        plot: PlotCommand { terms },
        measures,
    }
}
