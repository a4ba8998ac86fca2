//! `celldsl-core` - grid coordinates, range addresses and style descriptions
//! shared by the resolution engine and the output surfaces.

pub mod coord;
pub mod style;

pub use coord::{Coord, MAX_COLS, MAX_ROWS};
pub use style::{presets, Style, StyleValue};
