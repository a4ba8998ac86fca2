//! Pass 2: named range corners and forward references.
//!
//! Bookmarks are forward-visible to range commands, so named corners can only
//! be resolved once traversal has seen the whole stream. Forward-reference
//! markers are reduced to absolute addresses here and removed from the map;
//! chart commands then pick the addresses up by name.

use std::collections::BTreeMap;

use celldsl_core::coord::range_abs;
use celldsl_core::Coord;

use crate::command::{CellPointer, Command};
use crate::error::{Corner, Error, ReferenceError, Result, StructuralError};
use crate::movement::{Bookmarks, CellMap, Placed};

/// Forward-reference name to absolute address (`$A$1:$C$1`).
pub type ForwardRefs = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct References {
    pub cells: CellMap,
    pub forward_refs: ForwardRefs,
}

fn resolve_corner(
    pointer: &mut CellPointer,
    corner: Corner,
    bookmarks: &Bookmarks,
) -> std::result::Result<(), ReferenceError> {
    if let CellPointer::Named(name) = pointer {
        let at = bookmarks
            .get(name.as_str())
            .copied()
            .ok_or_else(|| ReferenceError::MissingBookmark {
                corner,
                name: name.clone(),
            })?;
        *pointer = CellPointer::At(at);
    }
    Ok(())
}

/// Resolve every named corner and extract forward-reference markers.
pub fn resolve_references(cells: CellMap, bookmarks: &Bookmarks) -> Result<References> {
    let mut out = References::default();

    for (at, list) in cells {
        let mut kept = Vec::with_capacity(list.len());
        for mut placed in list {
            let context = placed.context().with_bookmarks(bookmarks);
            if let Some(span) = placed.command.span_mut() {
                resolve_corner(&mut span.top_left, Corner::TopLeft, bookmarks)
                    .and_then(|()| resolve_corner(&mut span.bottom_right, Corner::BottomRight, bookmarks))
                    .map_err(|e| Error::new(e, context.clone()))?;
            }

            if let Command::ForwardRefMarker(marker) = &placed.command {
                let (first, last) = marker.span.rect().ok_or_else(|| {
                    Error::new(
                        StructuralError::UnresolvedRange {
                            command: "ForwardRefMarker",
                            at,
                        },
                        context.clone(),
                    )
                })?;
                out.forward_refs.insert(marker.name.clone(), range_abs(first, last));
                continue;
            }
            kept.push(placed);
        }
        if !kept.is_empty() {
            out.cells.insert(at, kept);
        }
    }

    tracing::debug!(
        target: "celldsl.references",
        forward_refs = out.forward_refs.len(),
        "range corners resolved"
    );
    Ok(out)
}

/// Substitute forward-reference addresses into chart configurations.
pub fn substitute_forward_refs(cells: &mut CellMap, refs: &ForwardRefs) -> Result<()> {
    for placed in cells.values_mut().flat_map(|list| list.iter_mut()) {
        let context = placed.context();
        if let Command::AddChart(chart) = &mut placed.command {
            chart
                .resolve_refs(refs)
                .map_err(|name| Error::new(ReferenceError::MissingForwardRef(name), context))?;
        }
    }
    Ok(())
}

/// Resolved rectangle of a range command placed at `at`.
pub(crate) fn placed_rect(placed: &Placed, at: Coord) -> Result<(Coord, Coord)> {
    placed
        .command
        .span()
        .and_then(|span| span.rect())
        .ok_or_else(|| {
            Error::new(
                StructuralError::UnresolvedRange {
                    command: placed.command.name(),
                    at,
                },
                placed.context(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartDef, ChartKind, ChartOp, ChartValue, RangeSource, Series};
    use crate::command::Write;
    use crate::error::ErrorKind;
    use crate::movement::resolve_movement;

    fn run(cmds: &[Command]) -> Result<References> {
        let t = resolve_movement(cmds, Coord::ORIGIN)?;
        resolve_references(t.cells, &t.bookmarks)
    }

    #[test]
    fn test_named_range_from_bookmark() {
        let cmds = vec![
            Command::bookmark("x"),
            Command::next_col(),
            Command::named_range("r", "x", 0),
        ];
        let refs = run(&cmds).unwrap();
        let placed = &refs.cells[&Coord::new(0, 1)][0];
        assert_eq!(
            placed.command.span().and_then(|s| s.rect()),
            Some((Coord::new(0, 0), Coord::new(0, 1)))
        );
    }

    #[test]
    fn test_bookmarks_are_forward_visible() {
        let cmds = vec![
            Command::named_range("r", "start", "end"),
            Command::move_by(2, 2),
            Command::bookmark("end"),
            Command::jump(1, 1),
            Command::bookmark("start"),
        ];
        let refs = run(&cmds).unwrap();
        let placed = &refs.cells[&Coord::ORIGIN][0];
        assert_eq!(
            placed.command.span().and_then(|s| s.rect()),
            Some((Coord::new(1, 1), Coord::new(2, 2)))
        );
    }

    #[test]
    fn test_missing_bookmark_names_corner() {
        let err = run(&[Command::named_range("r", 0, "nowhere")]).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::Reference(ReferenceError::MissingBookmark {
                corner: Corner::BottomRight,
                name: "nowhere".into()
            })
        );
        assert!(err.to_string().contains("bottom right"));
    }

    #[test]
    fn test_forward_ref_extracted_and_dropped() {
        let cmds = vec![
            Write::new("a").into(),
            Command::next_col(),
            Command::next_col(),
            Command::forward_ref("row", 2, 0),
        ];
        let refs = run(&cmds).unwrap();
        assert_eq!(refs.forward_refs.get("row").map(String::as_str), Some("$A$1:$C$1"));
        assert!(!refs.cells.contains_key(&Coord::new(0, 2)));
    }

    #[test]
    fn test_substitution_into_charts() {
        let chart = ChartDef::new(ChartKind::Column).add_series(Series::new().values(RangeSource::forward("data")));
        let cmds = vec![
            Command::AddChart(chart),
            Command::next_row(),
            Command::forward_ref("data", 0, 0),
        ];
        let mut refs = run(&cmds).unwrap();
        substitute_forward_refs(&mut refs.cells, &refs.forward_refs).unwrap();
        let Command::AddChart(chart) = &refs.cells[&Coord::ORIGIN][0].command else {
            panic!("expected chart");
        };
        let ChartOp::AddSeries(series) = &chart.ops[0] else {
            panic!("expected series");
        };
        assert_eq!(
            series.get("values"),
            Some(&ChartValue::Range(RangeSource::Resolved("$A$2".into())))
        );
    }

    #[test]
    fn test_missing_forward_ref() {
        let chart = ChartDef::new(ChartKind::Pie).add_series(Series::new().values(RangeSource::forward("gone")));
        let mut refs = run(&[Command::AddChart(chart)]).unwrap();
        let err = substitute_forward_refs(&mut refs.cells, &refs.forward_refs).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::Reference(ReferenceError::MissingForwardRef("gone".into()))
        );
    }
}
