//! Bit pattern loading.
//!
//! The pattern file holds one array row per line. A `0` character in the
//! file stands for a stored logical 1 and vice versa, so every bit is
//! inverted on load. Downstream initial-condition encoding relies on this
//! convention.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};

/// An M x N matrix of stored bits, normalized at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    rows: Vec<Vec<bool>>,
    cols: usize,
}

impl BitMatrix {
    /// All-zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows: vec![vec![false; cols]; rows],
            cols,
        }
    }

    /// Load a pattern file, normalized to `rows` x `cols`.
    pub fn load(path: &Path, rows: usize, cols: usize) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::file_access(path, e))?;
        Self::from_reader(BufReader::new(file), rows, cols)
            .map_err(|e| Error::file_access(path, e))
    }

    /// Normalize text lines into a matrix.
    ///
    /// Blank lines are skipped, lines are trimmed and inner spaces removed,
    /// characters other than `0`/`1` read as `0`, every bit is inverted,
    /// rows are padded with `0` or truncated to `cols`, and missing rows are
    /// filled with zeros.
    /// Only IO failures are errors; content is never rejected.
    pub fn from_reader<R: BufRead>(reader: R, rows: usize, cols: usize) -> std::io::Result<Self> {
        let mut matrix = Vec::with_capacity(rows);

        // Split on raw bytes so that non-UTF-8 garbage is coerced, not rejected.
        for line in reader.split(b'\n') {
            if matrix.len() >= rows {
                break;
            }
            let line = line?;
            // Only the ends are trimmed; inner whitespace other than spaces
            // stays and reads as an unknown symbol.
            let compact: String = String::from_utf8_lossy(&line)
                .trim()
                .chars()
                .filter(|&c| c != ' ')
                .collect();
            if compact.is_empty() {
                continue;
            }

            let mut bits: Vec<bool> = compact.chars().map(|ch| ch != '1').collect();
            bits.resize(cols, false);

            log::debug!("pattern row {}: {} -> {}", matrix.len() + 1, compact, render(&bits));
            matrix.push(bits);
        }

        matrix.resize(rows, vec![false; cols]);
        Ok(Self { rows: matrix, cols })
    }

    /// Number of rows (M).
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns (N).
    pub fn num_cols(&self) -> usize {
        self.cols
    }

    /// Bit at 1-based `(row, col)`.
    ///
    /// # Panics
    /// Panics if the position is outside the matrix.
    pub fn bit(&self, row: usize, col: usize) -> bool {
        self.rows[row - 1][col - 1]
    }

    /// Rows as `'0'`/`'1'` strings.
    pub fn row_strings(&self) -> Vec<String> {
        self.rows.iter().map(|r| render(r)).collect()
    }

    /// Bitwise complement.
    pub fn inverted(&self) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .map(|r| r.iter().map(|b| !b).collect())
                .collect(),
            cols: self.cols,
        }
    }
}

impl fmt::Display for BitMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{}", render(row))?;
        }
        Ok(())
    }
}

fn render(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load_str(text: &str, rows: usize, cols: usize) -> BitMatrix {
        BitMatrix::from_reader(Cursor::new(text), rows, cols).unwrap()
    }

    #[test]
    fn test_inverts_and_pads() {
        let m = load_str("1010\n0101\n", 6, 4);
        assert_eq!(m.num_rows(), 6);
        assert_eq!(m.num_cols(), 4);
        assert_eq!(
            m.row_strings(),
            vec!["0101", "1010", "0000", "0000", "0000", "0000"]
        );
        assert!(m.bit(1, 2));
        assert!(!m.bit(1, 1));
    }

    #[test]
    fn test_normalizes_messy_lines() {
        let m = load_str("\n  1 1x\t\n\n10111\n1\n", 3, 4);
        // "11x" -> inverted "001", padded with 0
        // "10111" -> inverted "01000", truncated
        // "1" -> inverted "0", padded
        assert_eq!(m.row_strings(), vec!["0010", "0100", "0000"]);
    }

    #[test]
    fn test_inner_tab_is_unknown_symbol() {
        let m = load_str("1\t0\n", 1, 4);
        // "1\t0" -> inverted "011", padded with 0
        assert_eq!(m.row_strings(), vec!["0110"]);

        let m = load_str("\t1 0 1\r\n", 1, 3);
        assert_eq!(m.row_strings(), vec!["010"]);
    }

    #[test]
    fn test_stops_after_row_count() {
        let m = load_str("0\n0\n0\n0\n", 2, 1);
        assert_eq!(m.row_strings(), vec!["1", "1"]);
    }

    #[test]
    fn test_reload_is_complement() {
        let first = load_str("1010\n0111\n  \n001", 5, 4);
        let second = load_str(&first.to_string(), 5, 4);
        assert_eq!(second.num_rows(), first.num_rows());
        assert_eq!(second.num_cols(), first.num_cols());
        assert_eq!(second, first.inverted());
        assert_eq!(second.inverted(), first);
    }

    #[test]
    fn test_missing_file() {
        let err = BitMatrix::load(Path::new("/nonexistent/pattern.txt"), 3, 1).unwrap_err();
        assert!(matches!(err, Error::FileAccess { .. }));
    }
}
