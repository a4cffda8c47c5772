//! Top-level circuit template with directive placeholders.
//!
//! The template is an ordinary ngspice deck in which two lines carry the
//! markers `@PLOT_CMD@` and `@MEAS_CMD@`. It is parsed once into typed
//! lines; expansion replaces each marker line with the corresponding
//! directives and leaves every other line untouched.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::netlist::AnalysisDirectives;

pub const PLOT_MARKER: &str = "@PLOT_CMD@";
pub const MEASURE_MARKER: &str = "@MEAS_CMD@";

/// Placeholder kinds recognized in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Plot,
    Measure,
}

/// One line of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateLine {
    Literal(String),
    Marker(Marker),
}

impl TemplateLine {
    fn parse(line: &str) -> Self {
        let token = line.trim();
        if token == PLOT_MARKER {
            TemplateLine::Marker(Marker::Plot)
        } else if token == MEASURE_MARKER {
            TemplateLine::Marker(Marker::Measure)
        } else {
            TemplateLine::Literal(line.to_string())
        }
    }
}

/// A parsed circuit template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    lines: Vec<TemplateLine>,
}

impl Template {
    /// Parse template text. A line consisting of a marker token, ignoring
    /// surrounding whitespace, becomes that marker.
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(TemplateLine::parse).collect(),
        }
    }

    /// Read and parse a template file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::file_access(path, e))?;
        let template = Self::parse(&text);
        for (marker, token) in [(Marker::Plot, PLOT_MARKER), (Marker::Measure, MEASURE_MARKER)] {
            let count = template.marker_count(marker);
            if count != 1 {
                log::warn!(
                    "template {} has {} {} lines, expected exactly one",
                    path.display(),
                    count,
                    token
                );
            }
        }
        Ok(template)
    }

    pub fn lines(&self) -> &[TemplateLine] {
        &self.lines
    }

    pub fn marker_count(&self, marker: Marker) -> usize {
        self.lines
            .iter()
            .filter(|l| **l == TemplateLine::Marker(marker))
            .count()
    }

    /// Substitute directives for the markers, preserving line order.
    pub fn expand(&self, directives: &AnalysisDirectives) -> Vec<String> {
        let mut out = Vec::with_capacity(self.lines.len() + directives.measures.len());
        for line in &self.lines {
            match line {
                TemplateLine::Literal(text) => out.push(text.clone()),
                TemplateLine::Marker(Marker::Plot) => out.push(directives.plot_line()),
                TemplateLine::Marker(Marker::Measure) => out.extend(directives.measure_lines()),
            }
        }
        out
    }

    /// Expand into `sink`, replacing any previous contents.
    pub fn write_expanded(&self, directives: &AnalysisDirectives, sink: &Path) -> Result<()> {
        let file = File::create(sink).map_err(|e| Error::file_access(sink, e))?;
        let mut writer = BufWriter::new(file);
        for line in self.expand(directives) {
            writeln!(writer, "{}", line).map_err(|e| Error::file_access(sink, e))?;
        }
        writer.flush().map_err(|e| Error::file_access(sink, e))
    }
}

/// Load `template`, expand it with `directives` and write it to `sink`.
pub fn inject_directives(
    template: &Path,
    sink: &Path,
    directives: &AnalysisDirectives,
) -> Result<()> {
    Template::load(template)?.write_expanded(directives, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{Measure, PlotCommand};

    fn directives() -> AnalysisDirectives {
        AnalysisDirectives {
            plot: PlotCommand {
                terms: vec!["wwl_3".into(), "q_r3_c1+2".into(), "wwl_3".into()],
            },
            measures: vec![
                Measure::FindAt {
                    name: "v_q_r3_c1".into(),
                    node: "q_r3_c1".into(),
                    at: "800p".into(),
                },
                Measure::Integral {
                    name: "E_VDD".into(),
                    expression: "-I(Vdd) * V(vdd)".into(),
                    from: "200p".into(),
                    to: "1400p".into(),
                },
            ],
        }
    }

    const DECK: &str = "* deck\n.include sram_8t_helper.cir\n.control\nrun\n  @PLOT_CMD@\n.endc\n@MEAS_CMD@\n.end\n";

    #[test]
    fn test_parse_markers() {
        let t = Template::parse(DECK);
        assert_eq!(t.lines().len(), 8);
        assert_eq!(t.lines()[4], TemplateLine::Marker(Marker::Plot));
        assert_eq!(t.lines()[6], TemplateLine::Marker(Marker::Measure));
        assert_eq!(t.marker_count(Marker::Plot), 1);
        assert_eq!(t.marker_count(Marker::Measure), 1);
    }

    #[test]
    fn test_expand_replaces_marker_lines() {
        let out = Template::parse(DECK).expand(&directives());
        assert_eq!(
            out,
            vec![
                "* deck",
                ".include sram_8t_helper.cir",
                ".control",
                "run",
                "gnuplot wwl_3, q_r3_c1+2, wwl_3",
                ".endc",
                ".measure tran v_q_r3_c1 FIND v(q_r3_c1) AT=800p",
                ".measure tran E_VDD INTEG par('-I(Vdd) * V(vdd)') FROM=200p TO=1400p",
                ".end",
            ]
        );
    }

    #[test]
    fn test_every_marker_occurrence_expands_once() {
        let t = Template::parse("@MEAS_CMD@\nx\n\t@MEAS_CMD@  \n");
        let out = t.expand(&directives());
        assert_eq!(out.len(), 5);
        assert_eq!(out[2], "x");
        assert!(out.iter().all(|l| !l.contains(MEASURE_MARKER)));
    }

    #[test]
    fn test_marker_inside_text_is_literal() {
        let text = "* replaces the @PLOT_CMD@ / @MEAS_CMD@ lines\n@PLOT_CMD@ extra\n";
        let t = Template::parse(text);
        assert_eq!(t.marker_count(Marker::Plot), 0);
        assert_eq!(t.marker_count(Marker::Measure), 0);
        assert_eq!(
            t.expand(&directives()),
            vec!["* replaces the @PLOT_CMD@ / @MEAS_CMD@ lines", "@PLOT_CMD@ extra"]
        );
    }

    #[test]
    fn test_demo_template_expands_inside_control_block() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/sram_8t_template.cir");
        let t = Template::load(&path).unwrap();
        assert_eq!(t.marker_count(Marker::Plot), 1);
        assert_eq!(t.marker_count(Marker::Measure), 1);

        let out = t.expand(&directives());
        let plots: Vec<usize> = out
            .iter()
            .enumerate()
            .filter(|(_, l)| l.trim_start().starts_with("gnuplot"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(plots.len(), 1);

        let control = out.iter().position(|l| l.trim() == ".control").unwrap();
        let endc = out.iter().position(|l| l.trim() == ".endc").unwrap();
        assert!(control < plots[0] && plots[0] < endc);
        assert!(out.iter().all(|l| !l.contains(PLOT_MARKER) && !l.contains(MEASURE_MARKER)));
    }

    #[test]
    fn test_inject_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.cir");
        let sink = dir.path().join("run.cir");
        assert!(matches!(
            inject_directives(&missing, &sink, &directives()),
            Err(Error::FileAccess { .. })
        ));

        let template = dir.path().join("template.cir");
        std::fs::write(&template, DECK).unwrap();
        inject_directives(&template, &sink, &directives()).unwrap();
        let written = std::fs::read_to_string(&sink).unwrap();
        assert_eq!(written.lines().count(), 9);
    }
}
