//! Pass 5: dispatch resolved commands to the surface.

use std::collections::{BTreeSet, HashMap};

use celldsl_core::{Coord, Style};

use crate::command::{CellData, Command, DataKind, RichRun};
use crate::error::{Error, ExecutionError, Result};
use crate::movement::{Bookmarks, Placed};
use crate::references::placed_rect;
use crate::surface::{Binding, OutputSurface, SurfaceError, SurfaceResult};

/// Page breaks collected across sessions until applied.
///
/// Owned by the caller so that several sessions writing to one sheet can
/// submit breaks and flush them together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageBreaks {
    rows: BTreeSet<u32>,
    cols: BTreeSet<u16>,
}

impl PageBreaks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_row(&mut self, row: u32) {
        self.rows.insert(row);
    }

    pub fn submit_col(&mut self, col: u16) {
        self.cols.insert(col);
    }

    pub fn rows(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.iter().copied()
    }

    pub fn cols(&self) -> impl Iterator<Item = u16> + '_ {
        self.cols.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.cols.is_empty()
    }

    /// Send the collected breaks to `surface` and clear them.
    pub fn apply<S: OutputSurface + ?Sized>(&mut self, surface: &mut S) -> SurfaceResult<()> {
        let rows: Vec<u32> = self.rows.iter().copied().collect();
        let cols: Vec<u16> = self.cols.iter().copied().collect();
        surface.set_page_breaks(&rows, &cols)?;
        self.rows.clear();
        self.cols.clear();
        Ok(())
    }
}

/// Knobs for one execution.
#[derive(Debug, Clone)]
pub struct ExecOptions<'a> {
    pub default_style: &'a Style,
    pub overwrites_ok: bool,
    pub bookmarks: &'a Bookmarks,
}

fn effective(default: &Style, style: Option<&Style>) -> Style {
    match style {
        Some(s) => default | s,
        None => default.clone(),
    }
}

fn rich_run_style(default: &Style, run: &RichRun) -> Style {
    effective(default, run.style.as_ref())
}

struct Executor<'a, 'b, S: OutputSurface> {
    binding: &'a mut Binding<S>,
    breaks: &'a mut PageBreaks,
    options: &'a ExecOptions<'b>,
    written: HashMap<Coord, Command>,
    warnings: Vec<String>,
}

impl<S: OutputSurface> Executor<'_, '_, S> {
    fn fail(&self, placed: &Placed, error: ExecutionError) -> Error {
        Error::new(error, placed.context().with_bookmarks(self.options.bookmarks))
    }

    fn surface_fail(&self, at: Coord, placed: &Placed, source: SurfaceError) -> Error {
        self.fail(
            placed,
            ExecutionError::Surface {
                command: placed.command.name(),
                at,
                source,
            },
        )
    }

    /// Register a content style. An overridden style replaces the default
    /// instead of layering on it.
    fn register(&mut self, style: Option<&Style>, overridden: bool) -> SurfaceResult<S::Handle> {
        let style = if overridden {
            style.cloned().unwrap_or_default()
        } else {
            effective(self.options.default_style, style)
        };
        self.binding.register(&style)
    }

    /// Overwrite check. Returns `false` when an identical command already ran.
    fn claim(&mut self, at: Coord, placed: &Placed) -> Result<bool> {
        if self.options.overwrites_ok {
            return Ok(true);
        }
        match self.written.get(&at) {
            Some(previous) if previous == &placed.command => {
                tracing::debug!(target: "celldsl.execute", %at, "identical write skipped");
                Ok(false)
            }
            Some(_) => Err(self.fail(placed, ExecutionError::Overwrite(at))),
            None => {
                self.written.insert(at, placed.command.clone());
                Ok(true)
            }
        }
    }

    fn run(&mut self, at: Coord, placed: &Placed) -> Result<()> {
        if placed.command.is_content() && !self.claim(at, placed)? {
            return Ok(());
        }
        self.dispatch(at, placed).map_err(|e| match e {
            Dispatch::Surface(source) => self.surface_fail(at, placed, source),
            Dispatch::Engine(error) => error,
        })
    }

    fn dispatch(&mut self, at: Coord, placed: &Placed) -> std::result::Result<(), Dispatch> {
        match &placed.command {
            Command::Write(w) => {
                let handle = self.register(w.style.as_ref(), w.overridden)?;
                self.binding.surface_mut().write(at, &w.data, w.kind, &handle)?;
            }
            Command::MergeWrite(m) => {
                let last = at.offset(0, i64::from(m.width)).ok_or_else(|| {
                    SurfaceError::InvalidParameter(format!("merge of width {} leaves the grid", m.width))
                })?;
                let handle = self.register(m.style.as_ref(), m.overridden)?;
                self.binding
                    .surface_mut()
                    .merge_write(at, last, &m.data, m.kind, &handle)?;
            }
            Command::RichWrite(r) => {
                let runs = r.resolved_runs();
                match runs.as_slice() {
                    [] => {
                        return Err(SurfaceError::InvalidParameter("rich write without runs".to_string()).into());
                    }
                    [only] => {
                        let message = "rich write with a single run written as a plain string";
                        tracing::warn!(target: "celldsl.execute", %at, "{message}");
                        self.warnings.push(format!("{message} at {at}"));
                        let style = match (&only.style, &r.cell_style) {
                            (Some(run), Some(cell)) => Some(run | cell),
                            (run, cell) => run.clone().or_else(|| cell.clone()),
                        };
                        let handle = self.register(style.as_ref(), r.overridden)?;
                        self.binding.surface_mut().write(
                            at,
                            &CellData::Text(only.text.clone()),
                            Some(DataKind::String),
                            &handle,
                        )?;
                    }
                    _ => {
                        let mut handles = Vec::with_capacity(runs.len());
                        for run in &runs {
                            let style = rich_run_style(self.options.default_style, run);
                            handles.push((self.binding.register(&style)?, run.text.clone()));
                        }
                        let cell = match &r.cell_style {
                            Some(s) => Some(self.register(Some(s), r.overridden)?),
                            None => None,
                        };
                        self.binding.surface_mut().write_rich(at, &handles, cell.as_ref())?;
                    }
                }
            }
            Command::DefineNamedRange(n) => {
                let (first, last) = placed_rect(placed, at)?;
                self.binding.surface_mut().define_name(&n.name, first, last)?;
            }
            Command::SetPrintArea(_) => {
                let (first, last) = placed_rect(placed, at)?;
                self.binding.surface_mut().set_print_area(first, last)?;
            }
            Command::AddConditionalFormat(c) => {
                let (first, last) = placed_rect(placed, at)?;
                let handle = match &c.style {
                    Some(s) => Some(self.register(Some(s), false)?),
                    None => None,
                };
                self.binding
                    .surface_mut()
                    .add_conditional_format(first, last, &c.rule, handle.as_ref())?;
            }
            Command::SetRowSize(size) => self.binding.surface_mut().set_row_size(at.row, *size)?,
            Command::SetColSize(size) => self.binding.surface_mut().set_col_size(at.col, *size)?,
            Command::SubmitRowBreak => self.breaks.submit_row(at.row),
            Command::SubmitColBreak => self.breaks.submit_col(at.col),
            Command::ApplyBreaks => self.breaks.apply(self.binding.surface_mut())?,
            Command::AddComment(c) => self.binding.surface_mut().add_comment(at, c)?,
            Command::AddImage(i) => self.binding.surface_mut().insert_image(at, i)?,
            Command::AddChart(c) => self.binding.surface_mut().insert_chart(at, c)?,
            Command::RelativeMove { .. }
            | Command::AbsoluteJump { .. }
            | Command::Backtrack(_)
            | Command::StackPush
            | Command::StackPop
            | Command::Bookmark(_)
            | Command::GotoBookmark(_)
            | Command::SectionBegin(_)
            | Command::SectionEnd
            | Command::ImposeStyle(_)
            | Command::OverrideStyle(_)
            | Command::DrawBoxBorder(_)
            | Command::ForwardRefMarker(_) => {
                return Err(Dispatch::Engine(self.fail(
                    placed,
                    ExecutionError::Unexecutable {
                        command: placed.command.name(),
                        at,
                    },
                )));
            }
        }
        Ok(())
    }
}

enum Dispatch {
    Surface(SurfaceError),
    Engine(Error),
}

impl From<SurfaceError> for Dispatch {
    fn from(e: SurfaceError) -> Self {
        Dispatch::Surface(e)
    }
}

impl From<Error> for Dispatch {
    fn from(e: Error) -> Self {
        Dispatch::Engine(e)
    }
}

/// Execute row-major `(coordinate, command)` pairs against `binding`.
///
/// Returns the warnings raised while executing.
pub fn execute<S: OutputSurface>(
    pairs: &[(Coord, Placed)],
    binding: &mut Binding<S>,
    breaks: &mut PageBreaks,
    options: &ExecOptions<'_>,
) -> Result<Vec<String>> {
    let mut executor = Executor {
        binding,
        breaks,
        options,
        written: HashMap::new(),
        warnings: Vec::new(),
    };
    for (at, placed) in pairs {
        executor.run(*at, placed)?;
    }
    tracing::debug!(
        target: "celldsl.execute",
        pairs = pairs.len(),
        styles = executor.binding.styles().len(),
        "commands executed"
    );
    Ok(executor.warnings)
}
