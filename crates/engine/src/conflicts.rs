//! Pass 4: per-cell style conflicts and final ordering.

use celldsl_core::{Coord, Style};

use crate::command::{Command, Write};
use crate::error::{Error, Result, StructuralError};
use crate::movement::{CellMap, Placed};

fn layered(base: Option<Style>, top: &Style) -> Style {
    match base {
        Some(base) => &base | top,
        None => top.clone(),
    }
}

/// Apply an override or imposition to a content command.
fn restyle(command: &mut Command, imposition: &Style, overriding: Option<&Style>) {
    match command {
        Command::Write(w) => match overriding {
            Some(s) => {
                w.style = Some(s.clone());
                w.overridden = true;
            }
            None => w.style = Some(layered(w.style.take(), imposition)),
        },
        Command::MergeWrite(m) => match overriding {
            Some(s) => {
                m.style = Some(s.clone());
                m.overridden = true;
            }
            None => m.style = Some(layered(m.style.take(), imposition)),
        },
        Command::RichWrite(r) => match overriding {
            Some(s) => {
                r.cell_style = Some(s.clone());
                r.overridden = true;
            }
            None => r.cell_style = Some(layered(r.cell_style.take(), imposition)),
        },
        _ => {}
    }
}

/// Fold impositions and overrides into the content of each cell and return
/// the commands sorted row-major, placement order kept within a cell.
pub fn resolve_conflicts(cells: CellMap) -> Result<Vec<(Coord, Placed)>> {
    let mut pairs = Vec::new();
    let mut restyled = 0usize;

    for (at, list) in cells {
        let mut imposition = Style::new();
        let mut overriding: Option<Style> = None;
        let mut rest: Vec<Placed> = Vec::with_capacity(list.len());
        let mut origin: Option<Placed> = None;

        for placed in list {
            match &placed.command {
                Command::ImposeStyle(style) => {
                    imposition.merge(style);
                    origin.get_or_insert_with(|| placed.clone());
                }
                Command::OverrideStyle(style) => {
                    if overriding.is_some() {
                        return Err(Error::new(StructuralError::DuplicateOverride(at), placed.context()));
                    }
                    overriding = Some(style.clone());
                    origin.get_or_insert_with(|| placed.clone());
                }
                _ => rest.push(placed),
            }
        }

        if imposition.is_empty() && overriding.is_none() {
            pairs.extend(rest.into_iter().map(|p| (at, p)));
            continue;
        }

        if !rest.iter().any(|p| p.command.is_content()) {
            if let Some(origin) = &origin {
                rest.insert(0, Placed::derived(Write::placeholder().into(), origin));
            }
        }
        for placed in rest.iter_mut().filter(|p| p.command.is_content()) {
            restyle(&mut placed.command, &imposition, overriding.as_ref());
            restyled += 1;
        }
        pairs.extend(rest.into_iter().map(|p| (at, p)));
    }

    // BTreeMap iteration is already row-major; the stable sort keeps
    // placement order for commands sharing a cell.
    pairs.sort_by_key(|(at, _)| *at);

    tracing::debug!(target: "celldsl.conflicts", pairs = pairs.len(), restyled, "styles resolved");
    Ok(pairs)
}
