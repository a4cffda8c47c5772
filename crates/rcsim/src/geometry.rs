//! Array geometry, row selection and per-row roles.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Shape of the bitcell array and its fixed row assignments.
///
/// Rows and columns are 1-based throughout, matching the node names in the
/// generated netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayGeometry {
    /// Row count M.
    pub rows: usize,
    /// Column count N.
    pub cols: usize,
    /// Fixed first read row.
    pub row_in1: usize,
    /// Fixed write row.
    pub row_out: usize,
}

impl ArrayGeometry {
    /// Geometry for a given operand width: M = W + 2, N = W, row_in1 = 1, row_out = M.
    pub fn from_bit_width(bit_width: usize) -> Result<Self> {
        if bit_width == 0 {
            return Err(Error::InvalidConfig("bit_width must be at least 1".into()));
        }
        let rows = bit_width + 2;
        Ok(Self {
            rows,
            cols: bit_width,
            row_in1: 1,
            row_out: rows,
        })
    }

    /// Bit width of one row (N).
    pub fn bit_width(&self) -> usize {
        self.cols
    }

    /// Values taken by the second read row during a sweep: `2..=M-1`.
    pub fn row_in2_range(&self) -> RangeInclusive<usize> {
        2..=self.rows - 1
    }

    /// Selection for one sweep iteration, validated against this geometry.
    pub fn select(&self, row_in2: usize) -> Result<RowSelection> {
        let selection = RowSelection {
            row_in1: self.row_in1,
            row_in2,
            row_out: self.row_out,
        };
        selection.validate(self.rows)?;
        Ok(selection)
    }
}

/// Rows taking part in one read-compute-store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSelection {
    pub row_in1: usize,
    pub row_in2: usize,
    pub row_out: usize,
}

impl RowSelection {
    /// All three rows must lie in `1..=rows` and be pairwise distinct.
    pub fn validate(&self, rows: usize) -> Result<()> {
        let in_range = |r: usize| (1..=rows).contains(&r);
        let distinct = self.row_in1 != self.row_in2
            && self.row_in1 != self.row_out
            && self.row_in2 != self.row_out;

        if in_range(self.row_in1) && in_range(self.row_in2) && in_range(self.row_out) && distinct
        {
            Ok(())
        } else {
            Err(Error::InvalidRowSelection {
                row_in1: self.row_in1,
                row_in2: self.row_in2,
                row_out: self.row_out,
                rows,
            })
        }
    }

    /// Role of `row` in this operation. The write row wins over a read row.
    pub fn role(&self, row: usize) -> RowRole {
        if row == self.row_out {
            RowRole::Write
        } else if row == self.row_in1 || row == self.row_in2 {
            RowRole::Read
        } else {
            RowRole::Idle
        }
    }
}

/// What a row's wordlines do during one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRole {
    /// Read wordline pulses, write wordline held low.
    Read,
    /// Write wordline pulses, read wordline held low.
    Write,
    /// Both wordlines held low.
    Idle,
}
