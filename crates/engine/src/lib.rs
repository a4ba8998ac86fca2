//! `celldsl-engine` - turns relative layout commands into per-cell
//! operations on an output surface.
//!
//! ```text
//! tokens ──builder──▶ commands ──movement──▶ cell map + bookmarks
//!        ──references──▶ ranges resolved, forward refs extracted
//!        ──expand──▶ box borders as impositions
//!        ──conflicts──▶ row-major (coord, command) pairs
//!        ──execute──▶ OutputSurface
//! ```

pub mod builder;
pub mod chains;
pub mod chart;
pub mod command;
pub mod conflicts;
pub mod error;
pub mod execute;
pub mod expand;
pub mod movement;
pub mod recording;
pub mod references;
pub mod session;
pub mod stats;
pub mod surface;

pub use builder::{Script, Token};
pub use chart::{ChartDef, ChartKind, ChartOp, ChartValue, RangeSource, Series};
pub use command::{
    BoxBorder, CellData, CellPointer, Command, Comment, ConditionalFormat, ConditionalRule, Criteria, DataKind, Image,
    ImageSource, MergeWrite, RichRun, RichWrite, Span, Write,
};
pub use error::{Error, ErrorKind, Result};
pub use execute::PageBreaks;
pub use recording::{RecordingSurface, SurfaceOp};
pub use session::{resolve, Resolution, Session, SessionOptions};
pub use stats::SessionStats;
pub use surface::{Binding, OutputSurface, StyleCache, SurfaceError};
