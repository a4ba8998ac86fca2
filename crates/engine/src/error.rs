//! Error taxonomy.
//!
//! Each pipeline stage has its own error enum. They are wrapped in [`Error`]
//! together with an [`ErrorContext`] describing where in the command stream
//! the failure happened: the command, its neighbours, the section names that
//! were open and the bookmarks known at that point.

use std::collections::BTreeMap;
use std::fmt;

use celldsl_core::{Coord, Style};

use crate::command::Command;
use crate::surface::SurfaceError;

pub type Result<T> = std::result::Result<T, Error>;

/// Which corner of a range a pointer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    BottomRight,
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Corner::TopLeft => write!(f, "top left"),
            Corner::BottomRight => write!(f, "bottom right"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuilderError {
    #[error("style fragment must be followed by another style fragment or text, found {found} after {pending}")]
    DanglingStyle { pending: Style, found: String },

    #[error("cannot process this token: {type_name}, {value}")]
    UnsupportedToken { type_name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MovementError {
    #[error("illegal coordinates reached: ({row}, {col}) is outside the grid")]
    OutOfBounds { row: i64, col: i64 },

    #[error("bookmark {0} does not exist")]
    MissingBookmark(String),

    #[error("position stack is empty")]
    EmptyStack,

    #[error("cannot backtrack {requested} cells, only {available} visited")]
    HistoryUnderflow { requested: usize, available: usize },

    #[error("{corner} corner points {back} cells back but only {visited} cells have been visited")]
    HistoryPointer { corner: Corner, back: i64, visited: usize },

    #[error("{corner} corner points {depth} entries down the position stack but it holds {len}")]
    StackPointer { corner: Corner, depth: i64, len: usize },

    #[error("{corner} corner at {at} is outside the grid")]
    PointerOutOfBounds { corner: Corner, at: Coord },

    #[error("SectionEnd without a matching SectionBegin")]
    UnmatchedSectionEnd,

    #[error("name stack is not empty, section {open} was never closed")]
    UnclosedSection { open: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReferenceError {
    #[error("tried to use a bookmark named {name} for the {corner} corner, but it was never saved")]
    MissingBookmark { corner: Corner, name: String },

    #[error("forward reference {0} is never defined")]
    MissingForwardRef(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StructuralError {
    #[error("there is already an OverrideStyle for cell {0}")]
    DuplicateOverride(Coord),

    #[error("{command} at {at} has an unresolved range corner")]
    UnresolvedRange { command: &'static str, at: Coord },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    #[error("overwrite has occurred at {0}")]
    Overwrite(Coord),

    #[error("{command} cannot be executed at {at}; it should have been consumed during resolution")]
    Unexecutable { command: &'static str, at: Coord },

    #[error("surface rejected {command} at {at}: {source}")]
    Surface {
        command: &'static str,
        at: Coord,
        #[source]
        source: SurfaceError,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error(transparent)]
    Builder(#[from] BuilderError),
    #[error(transparent)]
    Movement(#[from] MovementError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Where in the command stream an error happened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// Position of the command in the canonical list, when known.
    pub index: Option<usize>,
    pub command: Option<Command>,
    /// Commands around `index`, up to ten on either side.
    pub adjacent: Vec<Command>,
    /// Open sections, outermost first.
    pub sections: Vec<String>,
    pub bookmarks: Option<BTreeMap<String, Coord>>,
}

/// How far around the failing command the context reaches.
pub const ADJACENT_SPAN: usize = 10;

impl ErrorContext {
    pub fn is_empty(&self) -> bool {
        self.index.is_none()
            && self.command.is_none()
            && self.adjacent.is_empty()
            && self.sections.is_empty()
            && self.bookmarks.is_none()
    }

    /// Context for the command at `index` of `commands`.
    pub fn at_index(commands: &[Command], index: usize) -> Self {
        let lo = index.saturating_sub(ADJACENT_SPAN);
        let hi = (index + ADJACENT_SPAN + 1).min(commands.len());
        Self {
            index: Some(index),
            command: commands.get(index).cloned(),
            adjacent: commands.get(lo..hi).map(<[Command]>::to_vec).unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn with_command(mut self, command: &Command) -> Self {
        self.command = Some(command.clone());
        self
    }

    pub fn with_sections(mut self, sections: &[String]) -> Self {
        self.sections = sections.to_vec();
        self
    }

    pub fn with_bookmarks(mut self, bookmarks: &BTreeMap<String, Coord>) -> Self {
        self.bookmarks = Some(bookmarks.clone());
        self
    }

    /// Section names innermost first, consecutive repeats collapsed to `namexN`.
    pub fn name_stack(&self) -> Vec<String> {
        let mut out: Vec<(String, usize)> = Vec::new();
        for name in self.sections.iter().rev() {
            match out.last_mut() {
                Some((last, count)) if last == name => *count += 1,
                _ => out.push((name.clone(), 1)),
            }
        }
        out.into_iter()
            .map(|(name, count)| if count > 1 { format!("{name}x{count}") } else { name })
            .collect()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(f, "\nAdditional info:")?;
        write!(f, "\n  Name stack: [{}]", self.name_stack().join(", "))?;
        if let Some(index) = self.index {
            write!(f, "\n  Command number: {index}")?;
        }
        if let Some(command) = &self.command {
            write!(f, "\n  Triggered by: {command:?}")?;
        }
        if !self.adjacent.is_empty() {
            write!(f, "\n  Adjacent commands:")?;
            for command in &self.adjacent {
                write!(f, "\n    {command:?}")?;
            }
        }
        if let Some(bookmarks) = &self.bookmarks {
            let listed: Vec<String> = bookmarks.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            write!(f, "\n  Bookmarks already present: {{{}}}", listed.join(", "))?;
        }
        Ok(())
    }
}

/// Any failure of a session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}{context}")]
pub struct Error {
    kind: ErrorKind,
    context: Box<ErrorContext>,
}

impl Error {
    pub fn new(kind: impl Into<ErrorKind>, context: ErrorContext) -> Self {
        Self {
            kind: kind.into(),
            context: Box::new(context),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// Attach the bookmark table unless one is already present.
    pub fn with_bookmarks(mut self, bookmarks: &BTreeMap<String, Coord>) -> Self {
        if self.context.bookmarks.is_none() {
            self.context.bookmarks = Some(bookmarks.clone());
        }
        self
    }
}

macro_rules! error_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Error {
                fn from(e: $ty) -> Self {
                    Error::new(e, ErrorContext::default())
                }
            }
        )*
    };
}

error_from!(BuilderError, MovementError, ReferenceError, StructuralError, ExecutionError);
