//! Pass 1: cursor traversal.
//!
//! Walks the canonical command list, moving the cursor and assigning every
//! non-movement command to the cell the cursor is on. Integer range corners
//! are resolved here because they depend on the traversal state at the
//! moment the command is reached. Named corners wait for pass 2, once every
//! bookmark is known.

use std::collections::BTreeMap;

use celldsl_core::Coord;

use crate::command::{CellPointer, Command};
use crate::error::{Corner, Error, ErrorContext, MovementError, Result};

pub type Bookmarks = BTreeMap<String, Coord>;

/// A command assigned to a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub command: Command,
    /// Open sections when the command was reached, outermost first.
    pub sections: Vec<String>,
    /// Position in the canonical list; `None` for commands synthesised by
    /// later passes.
    pub index: Option<usize>,
}

impl Placed {
    pub fn new(command: Command, sections: Vec<String>, index: Option<usize>) -> Self {
        Self {
            command,
            sections,
            index,
        }
    }

    /// A command created by a later pass on behalf of `origin`.
    pub fn derived(command: Command, origin: &Placed) -> Self {
        Self {
            command,
            sections: origin.sections.clone(),
            index: None,
        }
    }

    /// Error context pointing at this command.
    pub fn context(&self) -> ErrorContext {
        ErrorContext {
            index: self.index,
            command: Some(self.command.clone()),
            sections: self.sections.clone(),
            ..ErrorContext::default()
        }
    }
}

/// Commands per cell, in placement order.
pub type CellMap = BTreeMap<Coord, Vec<Placed>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub cells: CellMap,
    pub bookmarks: Bookmarks,
    /// Where the cursor ended up.
    pub cursor: Coord,
}

struct Walker<'a> {
    commands: &'a [Command],
    cursor: Coord,
    visited: Vec<Coord>,
    stack: Vec<Coord>,
    bookmarks: Bookmarks,
    sections: Vec<String>,
    cells: CellMap,
}

impl Walker<'_> {
    fn fail(&self, index: Option<usize>, kind: MovementError) -> Error {
        let context = match index {
            Some(i) => ErrorContext::at_index(self.commands, i),
            None => ErrorContext::default(),
        };
        Error::new(kind, context.with_sections(&self.sections).with_bookmarks(&self.bookmarks))
    }

    fn enter(&mut self, index: usize, row: i64, col: i64) -> Result<()> {
        let at = Coord::checked(row, col).ok_or_else(|| self.fail(Some(index), MovementError::OutOfBounds { row, col }))?;
        self.cursor = at;
        self.visited.push(at);
        Ok(())
    }

    fn step(&mut self, index: usize, command: &Command) -> Result<()> {
        let row = i64::from(self.cursor.row);
        let col = i64::from(self.cursor.col);
        match command {
            Command::RelativeMove { rows, cols } => {
                self.enter(index, row.saturating_add(*rows), col.saturating_add(*cols))?;
            }
            Command::AbsoluteJump { row, col } => self.enter(index, *row, *col)?,
            Command::GotoBookmark(name) => {
                let at = self
                    .bookmarks
                    .get(name)
                    .copied()
                    .ok_or_else(|| self.fail(Some(index), MovementError::MissingBookmark(name.clone())))?;
                self.enter(index, i64::from(at.row), i64::from(at.col))?;
            }
            Command::StackPop => {
                let at = self
                    .stack
                    .pop()
                    .ok_or_else(|| self.fail(Some(index), MovementError::EmptyStack))?;
                self.enter(index, i64::from(at.row), i64::from(at.col))?;
            }
            Command::StackPush => self.stack.push(self.cursor),
            Command::Bookmark(name) => {
                self.bookmarks.insert(name.clone(), self.cursor);
            }
            Command::Backtrack(n) => {
                let available = self.visited.len();
                let keep = available
                    .checked_sub(n.saturating_add(1))
                    .ok_or_else(|| {
                        self.fail(
                            Some(index),
                            MovementError::HistoryUnderflow {
                                requested: *n,
                                available,
                            },
                        )
                    })?;
                self.cursor = self.visited[keep];
                self.visited.truncate(keep);
            }
            Command::SectionBegin(name) => self.sections.push(name.clone()),
            Command::SectionEnd => {
                if self.sections.pop().is_none() {
                    return Err(self.fail(Some(index), MovementError::UnmatchedSectionEnd));
                }
            }
            Command::Write(_)
            | Command::MergeWrite(_)
            | Command::RichWrite(_)
            | Command::ImposeStyle(_)
            | Command::OverrideStyle(_)
            | Command::DrawBoxBorder(_)
            | Command::DefineNamedRange(_)
            | Command::ForwardRefMarker(_)
            | Command::SetPrintArea(_)
            | Command::AddConditionalFormat(_)
            | Command::SetRowSize(_)
            | Command::SetColSize(_)
            | Command::SubmitRowBreak
            | Command::SubmitColBreak
            | Command::ApplyBreaks
            | Command::AddComment(_)
            | Command::AddImage(_)
            | Command::AddChart(_) => self.place(index, command)?,
        }
        Ok(())
    }

    fn place(&mut self, index: usize, command: &Command) -> Result<()> {
        let mut command = command.clone();
        if let Some(span) = command.span_mut() {
            self.resolve_pointer(index, &mut span.top_left, Corner::TopLeft)?;
            self.resolve_pointer(index, &mut span.bottom_right, Corner::BottomRight)?;
        }
        self.cells
            .entry(self.cursor)
            .or_default()
            .push(Placed::new(command, self.sections.clone(), Some(index)));
        Ok(())
    }

    fn resolve_pointer(&self, index: usize, pointer: &mut CellPointer, corner: Corner) -> Result<()> {
        let at = match pointer {
            CellPointer::Named(_) => return Ok(()),
            CellPointer::At(at) => {
                if !at.in_bounds() {
                    return Err(self.fail(Some(index), MovementError::PointerOutOfBounds { corner, at: *at }));
                }
                return Ok(());
            }
            CellPointer::Offset(0) => self.cursor,
            CellPointer::Offset(n) if *n > 0 => {
                let back = usize::try_from(*n).unwrap_or(usize::MAX);
                self.visited
                    .len()
                    .checked_sub(back)
                    .and_then(|i| i.checked_sub(1))
                    .and_then(|i| self.visited.get(i))
                    .copied()
                    .ok_or_else(|| {
                        self.fail(
                            Some(index),
                            MovementError::HistoryPointer {
                                corner,
                                back: *n,
                                visited: self.visited.len(),
                            },
                        )
                    })?
            }
            CellPointer::Offset(n) => {
                let depth = usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX);
                self.stack
                    .len()
                    .checked_sub(depth)
                    .and_then(|i| self.stack.get(i))
                    .copied()
                    .ok_or_else(|| {
                        self.fail(
                            Some(index),
                            MovementError::StackPointer {
                                corner,
                                depth: *n,
                                len: self.stack.len(),
                            },
                        )
                    })?
            }
        };
        *pointer = CellPointer::At(at);
        Ok(())
    }
}

/// Assign every command to a cell, starting at `start`.
pub fn resolve_movement(commands: &[Command], start: Coord) -> Result<Traversal> {
    let mut walker = Walker {
        commands,
        cursor: start,
        visited: vec![start],
        stack: Vec::new(),
        bookmarks: Bookmarks::new(),
        sections: Vec::new(),
        cells: CellMap::new(),
    };
    if !start.in_bounds() {
        return Err(walker.fail(
            None,
            MovementError::OutOfBounds {
                row: i64::from(start.row),
                col: i64::from(start.col),
            },
        ));
    }

    for (index, command) in commands.iter().enumerate() {
        walker.step(index, command)?;
    }

    if let Some(open) = walker.sections.last() {
        let open = open.clone();
        return Err(walker.fail(None, MovementError::UnclosedSection { open }));
    }

    tracing::debug!(
        target: "celldsl.movement",
        commands = commands.len(),
        cells = walker.cells.len(),
        bookmarks = walker.bookmarks.len(),
        "movement resolved"
    );

    Ok(Traversal {
        cells: walker.cells,
        bookmarks: walker.bookmarks,
        cursor: walker.cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Write;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    fn placed_at(t: &Traversal) -> Vec<(Coord, Command)> {
        t.cells
            .iter()
            .flat_map(|(at, list)| list.iter().map(move |p| (*at, p.command.clone())))
            .collect()
    }

    fn movement_error(err: &Error) -> &MovementError {
        match err.kind() {
            ErrorKind::Movement(m) => m,
            other => panic!("expected movement error, got {other:?}"),
        }
    }

    #[test]
    fn test_no_movement_writes_origin() {
        let t = resolve_movement(&[Write::new("x").into()], Coord::ORIGIN).unwrap();
        assert_eq!(placed_at(&t), vec![(Coord::ORIGIN, Write::new("x").into())]);
    }

    #[test]
    fn test_start_offset() {
        let t = resolve_movement(&[Write::new("x").into()], Coord::new(3, 2)).unwrap();
        assert_eq!(placed_at(&t)[0].0, Coord::new(3, 2));
    }

    #[test]
    fn test_moves_and_jumps() {
        let cmds = vec![
            Command::move_by(2, 3),
            Write::new("a").into(),
            Command::jump(10, 0),
            Write::new("b").into(),
        ];
        let t = resolve_movement(&cmds, Coord::ORIGIN).unwrap();
        let placed = placed_at(&t);
        assert_eq!(placed[0].0, Coord::new(2, 3));
        assert_eq!(placed[1].0, Coord::new(10, 0));
        assert_eq!(t.cursor, Coord::new(10, 0));
    }

    #[test]
    fn test_out_of_bounds() {
        let err = resolve_movement(&[Command::move_by(-1, 0)], Coord::ORIGIN).unwrap_err();
        assert_eq!(movement_error(&err), &MovementError::OutOfBounds { row: -1, col: 0 });
        assert_eq!(err.context().index, Some(0));

        let err = resolve_movement(&[Command::jump(0, 1 << 14)], Coord::ORIGIN).unwrap_err();
        assert!(matches!(movement_error(&err), MovementError::OutOfBounds { .. }));
    }

    #[test]
    fn test_stack_push_pop() {
        let cmds = vec![
            Command::move_by(1, 1),
            Command::StackPush,
            Command::move_by(5, 5),
            Command::StackPop,
            Write::new("x").into(),
        ];
        let t = resolve_movement(&cmds, Coord::ORIGIN).unwrap();
        assert_eq!(placed_at(&t)[0].0, Coord::new(1, 1));

        let err = resolve_movement(&[Command::StackPop], Coord::ORIGIN).unwrap_err();
        assert_eq!(movement_error(&err), &MovementError::EmptyStack);
    }

    #[test]
    fn test_goto_bookmark() {
        let cmds = vec![
            Command::move_by(2, 0),
            Command::bookmark("here"),
            Command::move_by(3, 3),
            Command::goto("here"),
            Write::new("x").into(),
        ];
        let t = resolve_movement(&cmds, Coord::ORIGIN).unwrap();
        assert_eq!(placed_at(&t)[0].0, Coord::new(2, 0));
        assert_eq!(t.bookmarks.get("here"), Some(&Coord::new(2, 0)));

        let err = resolve_movement(&[Command::goto("later"), Command::bookmark("later")], Coord::ORIGIN).unwrap_err();
        assert_eq!(movement_error(&err), &MovementError::MissingBookmark("later".into()));
    }

    #[test]
    fn test_bookmark_resave_overwrites() {
        let cmds = vec![
            Command::bookmark("b"),
            Command::move_by(1, 0),
            Command::bookmark("b"),
        ];
        let t = resolve_movement(&cmds, Coord::ORIGIN).unwrap();
        assert_eq!(t.bookmarks.get("b"), Some(&Coord::new(1, 0)));
    }

    #[test]
    fn test_backtrack() {
        // visited: (0,0) (1,0) (2,0) (3,0)
        let cmds = vec![
            Command::next_row(),
            Command::next_row(),
            Command::next_row(),
            Command::backtrack(1),
            Write::new("x").into(),
        ];
        let t = resolve_movement(&cmds, Coord::ORIGIN).unwrap();
        assert_eq!(placed_at(&t)[0].0, Coord::new(2, 0));

        let cmds = vec![Command::next_row(), Command::backtrack(1), Write::new("x").into()];
        let t = resolve_movement(&cmds, Coord::ORIGIN).unwrap();
        assert_eq!(placed_at(&t)[0].0, Coord::ORIGIN);
    }

    #[test]
    fn test_backtrack_underflow() {
        let cmds = vec![Command::next_row(), Command::backtrack(2)];
        let err = resolve_movement(&cmds, Coord::ORIGIN).unwrap_err();
        assert_eq!(
            movement_error(&err),
            &MovementError::HistoryUnderflow {
                requested: 2,
                available: 2
            }
        );
    }

    #[test]
    fn test_integer_pointers() {
        let cmds = vec![
            Command::StackPush,
            Command::next_row(),
            Command::next_col(),
            Command::named_range("history", 2, 0),
            Command::named_range("stack", -1, 0),
        ];
        let t = resolve_movement(&cmds, Coord::ORIGIN).unwrap();
        let list = &t.cells[&Coord::new(1, 1)];
        let spans: Vec<_> = list.iter().filter_map(|p| p.command.span().cloned()).collect();
        // visited: (0,0) (1,0) (1,1); 2 back from the end is (0,0)
        assert_eq!(spans[0].top_left, CellPointer::At(Coord::ORIGIN));
        assert_eq!(spans[0].bottom_right, CellPointer::At(Coord::new(1, 1)));
        assert_eq!(spans[1].top_left, CellPointer::At(Coord::ORIGIN));
    }

    #[test]
    fn test_named_pointers_left_for_later() {
        let cmds = vec![Command::named_range("r", "start", 0)];
        let t = resolve_movement(&cmds, Coord::ORIGIN).unwrap();
        let span = t.cells[&Coord::ORIGIN][0].command.span().cloned().unwrap();
        assert_eq!(span.top_left, CellPointer::Named("start".into()));
        assert_eq!(span.bottom_right, CellPointer::At(Coord::ORIGIN));
    }

    #[test]
    fn test_pointer_errors() {
        let err = resolve_movement(&[Command::named_range("r", 5, 0)], Coord::ORIGIN).unwrap_err();
        assert!(matches!(
            movement_error(&err),
            MovementError::HistoryPointer {
                corner: Corner::TopLeft,
                back: 5,
                ..
            }
        ));
        let err = resolve_movement(&[Command::named_range("r", 0, -1)], Coord::ORIGIN).unwrap_err();
        assert!(matches!(
            movement_error(&err),
            MovementError::StackPointer {
                corner: Corner::BottomRight,
                ..
            }
        ));
    }

    #[test]
    fn test_sections() {
        let cmds = vec![
            Command::section("outer"),
            Command::section("inner"),
            Write::new("x").into(),
            Command::SectionEnd,
            Command::SectionEnd,
        ];
        let t = resolve_movement(&cmds, Coord::ORIGIN).unwrap();
        assert_eq!(t.cells[&Coord::ORIGIN][0].sections, vec!["outer", "inner"]);
        assert_eq!(t.cells.len(), 1);
    }

    #[test]
    fn test_unclosed_section() {
        let err = resolve_movement(&[Command::section("header"), Command::next_row()], Coord::ORIGIN).unwrap_err();
        assert_eq!(
            movement_error(&err),
            &MovementError::UnclosedSection { open: "header".into() }
        );
        assert!(err.to_string().contains("Name stack: [header]"));

        let err = resolve_movement(&[Command::SectionEnd], Coord::ORIGIN).unwrap_err();
        assert_eq!(movement_error(&err), &MovementError::UnmatchedSectionEnd);
    }

    #[test]
    fn test_error_context_carries_bookmarks() {
        let cmds = vec![Command::bookmark("a"), Command::section("s"), Command::move_by(0, -1)];
        let err = resolve_movement(&cmds, Coord::ORIGIN).unwrap_err();
        let ctx = err.context();
        assert_eq!(ctx.sections, vec!["s"]);
        assert_eq!(ctx.bookmarks.as_ref().and_then(|b| b.get("a")), Some(&Coord::ORIGIN));
        assert_eq!(ctx.command, Some(Command::move_by(0, -1)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_writes_land_on_prefix_sums(steps in prop::collection::vec((0i64..4, 0i64..4), 1..30)) {
            let mut cmds = Vec::new();
            let (mut r, mut c) = (0i64, 0i64);
            let mut expected = Vec::new();
            for (i, (dr, dc)) in steps.iter().enumerate() {
                cmds.push(Command::move_by(*dr, *dc));
                r += dr;
                c += dc;
                cmds.push(Write::new(i as i64).into());
                expected.push(Coord::checked(r, c).unwrap());
            }
            let t = resolve_movement(&cmds, Coord::ORIGIN).unwrap();
            let mut placed: Vec<(usize, Coord)> = t
                .cells
                .iter()
                .flat_map(|(at, list)| list.iter().map(move |p| (p.index.unwrap(), *at)))
                .collect();
            placed.sort();
            let got: Vec<Coord> = placed.into_iter().map(|(_, at)| at).collect();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn prop_push_pop_restores_cursor(dr in 0i64..100, dc in 0i64..100, start_r in 0u32..50, start_c in 0u16..50) {
            let start = Coord::new(start_r, start_c);
            let cmds = vec![Command::StackPush, Command::move_by(dr, dc), Command::StackPop];
            let t = resolve_movement(&cmds, start).unwrap();
            prop_assert_eq!(t.cursor, start);
        }
    }
}
