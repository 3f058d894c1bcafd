//! Named bindings of the transfer protocol to one simulated line each.

use super::state_cell::StateCell;
use super::transfer::{UserSink, UserSource};
use crate::error::Result;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The simulated lines and their externally visible path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Line {
    /// Output line.
    Led,
    /// Input line.
    Button,
}

impl Line {
    /// Path name the line is registered under.
    pub fn path_name(self) -> &'static str {
        self.into()
    }

    /// Label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Led => "LED",
            Self::Button => "Button",
        }
    }
}

/// A pseudo-file bound to exactly one [`StateCell`].
///
/// Holds no state of its own beyond the cell; reads and writes are handed to
/// the cell unchanged.
#[derive(Debug)]
pub struct Endpoint {
    line: Line,
    cell: StateCell,
}

impl Endpoint {
    pub fn new(line: Line, cell: StateCell) -> Self {
        Self { line, cell }
    }

    /// Create an endpoint with a fresh OFF / RELEASED cell labelled for the line.
    pub fn for_line(line: Line) -> Self {
        Self::new(line, StateCell::new(line.label()))
    }

    pub fn path_name(&self) -> &'static str {
        self.line.path_name()
    }

    pub fn cell(&self) -> &StateCell {
        &self.cell
    }

    pub fn read<K: UserSink + ?Sized>(&self, sink: &mut K, position: &mut u64) -> Result<usize> {
        self.cell.read_into(sink, position)
    }

    pub fn write<S: UserSource + ?Sized>(&self, src: &S) -> Result<usize> {
        self.cell.write_from(src)
    }
}
