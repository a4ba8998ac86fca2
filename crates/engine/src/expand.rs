//! Pass 3: box borders become per-cell style impositions.
//!
//! Each edge of a box imposes its own style on the cells along it. Merged
//! cells hide the borders of the cells they cover, so a box touching a
//! merge also borders the neighbours of the merged region.

use std::collections::BTreeMap;

use celldsl_core::{presets, Coord, Style};

use crate::command::{BoxBorder, Command, Write};
use crate::error::Result;
use crate::movement::{CellMap, Placed};
use crate::references::placed_rect;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    pub cells: CellMap,
    /// Non-fatal conditions met while expanding.
    pub warnings: Vec<String>,
}

struct Imposition {
    style: Style,
    single_row: bool,
    origin: Placed,
}

/// Cells and edge styles along the perimeter of `first..=last`.
fn perimeter(first: Coord, last: Coord, border: &BoxBorder) -> Vec<(Coord, Style)> {
    let mut out = Vec::new();
    for col in first.col..=last.col {
        out.push((Coord::new(first.row, col), border.top.clone()));
        out.push((Coord::new(last.row, col), border.bottom.clone()));
    }
    for row in first.row..=last.row {
        out.push((Coord::new(row, first.col), border.left.clone()));
        out.push((Coord::new(row, last.col), border.right.clone()));
    }
    out
}

/// Make sure `at` holds a content command, adding a placeholder if not.
fn ensure_content(cells: &mut CellMap, at: Coord, origin: &Placed) {
    let list = cells.entry(at).or_default();
    if !list.iter().any(|p| p.command.is_content()) {
        list.insert(0, Placed::derived(Write::placeholder().into(), origin));
    }
}

fn impose(cells: &mut CellMap, at: Coord, style: Style, origin: &Placed) {
    ensure_content(cells, at, origin);
    cells
        .entry(at)
        .or_default()
        .push(Placed::derived(Command::ImposeStyle(style), origin));
}

fn warn(warnings: &mut Vec<String>, at: Coord, message: &str) {
    tracing::warn!(target: "celldsl.expand", %at, "{message}");
    warnings.push(format!("{message} at {at}"));
}

/// Expand every `DrawBoxBorder` into impositions.
pub fn expand_structures(cells: CellMap) -> Result<Expansion> {
    let mut out = CellMap::new();
    let mut impositions: BTreeMap<Coord, Vec<Imposition>> = BTreeMap::new();
    let mut boxes = 0usize;

    for (at, list) in cells {
        for placed in list {
            if let Command::DrawBoxBorder(border) = &placed.command {
                let (first, last) = placed_rect(&placed, at)?;
                let single_row = first.row == last.row;
                for (cell, style) in perimeter(first, last, border) {
                    impositions.entry(cell).or_default().push(Imposition {
                        style,
                        single_row,
                        origin: placed.clone(),
                    });
                }
                boxes += 1;
            } else {
                out.entry(at).or_default().push(placed);
            }
        }
    }

    let mut warnings = Vec::new();
    let imposed_cells = impositions.len();

    for (at, imps) in impositions {
        let Some(first) = imps.first() else {
            continue;
        };
        let origin = first.origin.clone();
        ensure_content(&mut out, at, &origin);

        let merge_width = out
            .get(&at)
            .into_iter()
            .flatten()
            .filter_map(|p| match &p.command {
                Command::MergeWrite(m) => Some(m.width),
                _ => None,
            })
            .max();

        if let Some(width) = merge_width {
            let single_row = imps.iter().any(|i| i.single_row);
            compensate_merge(&mut out, &mut warnings, at, width, single_row, &origin);
        }

        for imp in imps {
            out.entry(at)
                .or_default()
                .push(Placed::derived(Command::ImposeStyle(imp.style), &imp.origin));
        }
    }

    tracing::debug!(
        target: "celldsl.expand",
        boxes,
        imposed_cells,
        warnings = warnings.len(),
        "structures expanded"
    );

    Ok(Expansion { cells: out, warnings })
}

fn compensate_merge(
    cells: &mut CellMap,
    warnings: &mut Vec<String>,
    at: Coord,
    width: u16,
    single_row: bool,
    origin: &Placed,
) {
    match at.offset(0, i64::from(width) + 1) {
        Some(right) => impose(cells, right, presets::left_border(), origin),
        None => warn(warnings, at, "merged region reaches the last column, right border skipped"),
    }

    if at.row == 0 {
        warn(warnings, at, "merged region is on the first row, border above skipped");
    }
    for dc in 0..=i64::from(width) {
        if let Some(above) = at.offset(-1, dc) {
            impose(cells, above, presets::bottom_border(), origin);
        }
        if single_row {
            if let Some(below) = at.offset(1, dc) {
                impose(cells, below, presets::top_border(), origin);
            }
        }
    }
}
