//! What a session did: where it started, what it wrote and where.

use celldsl_core::Coord;

use crate::command::Command;
use crate::movement::Bookmarks;
use crate::references::ForwardRefs;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    pub start: Coord,
    /// Executed commands in execution order.
    pub pairs: Vec<(Coord, Command)>,
    pub bookmarks: Bookmarks,
    pub forward_refs: ForwardRefs,
    pub warnings: Vec<String>,
}

impl SessionStats {
    /// No command reached the surface.
    pub fn is_null(&self) -> bool {
        self.pairs.is_empty()
    }

    fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        std::iter::once(self.start).chain(self.pairs.iter().map(|(at, _)| *at))
    }

    pub fn max_row(&self) -> u32 {
        self.coords().map(|c| c.row).max().unwrap_or(self.start.row)
    }

    pub fn max_col(&self) -> u16 {
        self.coords().map(|c| c.col).max().unwrap_or(self.start.col)
    }

    /// Bottom-most row among cells in the right-most column.
    pub fn max_row_at_max_col(&self) -> u32 {
        let col = self.max_col();
        self.coords()
            .filter(|c| c.col == col)
            .map(|c| c.row)
            .max()
            .unwrap_or(self.start.row)
    }

    /// Right-most column among cells in the bottom-most row.
    pub fn max_col_at_max_row(&self) -> u16 {
        let row = self.max_row();
        self.coords()
            .filter(|c| c.row == row)
            .map(|c| c.col)
            .max()
            .unwrap_or(self.start.col)
    }

    pub fn max_coords(&self) -> Coord {
        Coord::new(self.max_row(), self.max_col())
    }
}
