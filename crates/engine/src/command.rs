//! The closed command set.
//!
//! Every layout instruction is a [`Command`]. Builder-style helpers consume
//! the value and return a new one, so a command can be shared as a template
//! (`let header = Write::text("x").with_style(bold())`) and refined per use.

use std::path::PathBuf;

use celldsl_core::{presets, Coord, Style};

use crate::chart::ChartDef;

// ============================================================================
// Cell data
// ============================================================================

/// Payload of a write.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellData {
    #[default]
    Blank,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellData {
    pub fn is_blank(&self) -> bool {
        matches!(self, CellData::Blank)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellData::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for CellData {
    fn from(s: &str) -> Self {
        CellData::Text(s.to_string())
    }
}

impl From<String> for CellData {
    fn from(s: String) -> Self {
        CellData::Text(s)
    }
}

impl From<f64> for CellData {
    fn from(n: f64) -> Self {
        CellData::Number(n)
    }
}

impl From<i64> for CellData {
    fn from(n: i64) -> Self {
        CellData::Number(n as f64)
    }
}

impl From<i32> for CellData {
    fn from(n: i32) -> Self {
        CellData::Number(f64::from(n))
    }
}

impl From<bool> for CellData {
    fn from(b: bool) -> Self {
        CellData::Bool(b)
    }
}

/// Forces a particular write flavour on the surface.
///
/// Without a kind, text starting with `=` is a formula and everything else
/// is written according to its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Number,
    String,
    Blank,
    Formula,
    /// Number payload read as a serial date.
    Datetime,
    Boolean,
    Url,
}

// ============================================================================
// Content commands
// ============================================================================

/// Write one value into the current cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Write {
    pub data: CellData,
    pub style: Option<Style>,
    pub kind: Option<DataKind>,
    /// `style` came from an override and replaces the session default.
    pub overridden: bool,
}

impl Write {
    pub fn new(data: impl Into<CellData>) -> Self {
        Self {
            data: data.into(),
            style: None,
            kind: None,
            overridden: false,
        }
    }

    /// Content-less write, used to host impositions on otherwise empty cells.
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: impl Into<CellData>) -> Self {
        self.data = data.into();
        self
    }

    /// Layer `style` over whatever style the write already carries.
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(layer(self.style.take(), &style));
        self
    }

    pub fn with_kind(mut self, kind: DataKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Merge the current cell with the next `width` cells to the right and
/// write into the merged region.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeWrite {
    pub data: CellData,
    pub style: Option<Style>,
    pub kind: Option<DataKind>,
    pub width: u16,
    /// `style` came from an override and replaces the session default.
    pub overridden: bool,
}

impl MergeWrite {
    pub fn new(data: impl Into<CellData>, width: u16) -> Self {
        Self {
            data: data.into(),
            style: None,
            kind: None,
            width,
            overridden: false,
        }
    }

    pub fn with_data(mut self, data: impl Into<CellData>) -> Self {
        self.data = data.into();
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(layer(self.style.take(), &style));
        self
    }

    pub fn with_kind(mut self, kind: DataKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }
}

/// One styled fragment of a rich string.
#[derive(Debug, Clone, PartialEq)]
pub struct RichRun {
    pub text: String,
    pub style: Option<Style>,
}

/// Multi-run text in a single cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RichWrite {
    pub runs: Vec<RichRun>,
    /// Style for runs that carry none of their own.
    pub run_default: Option<Style>,
    pub cell_style: Option<Style>,
    /// `cell_style` came from an override and replaces the session default.
    pub overridden: bool,
}

impl RichWrite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unstyled run.
    pub fn then(mut self, text: impl Into<String>) -> Self {
        self.runs.push(RichRun {
            text: text.into(),
            style: None,
        });
        self
    }

    /// Append a run with its own style.
    pub fn then_styled(mut self, text: impl Into<String>, style: Style) -> Self {
        self.runs.push(RichRun {
            text: text.into(),
            style: Some(style),
        });
        self
    }

    pub fn with_run_default(mut self, style: Style) -> Self {
        self.run_default = Some(style);
        self
    }

    pub fn with_cell_style(mut self, style: Style) -> Self {
        self.cell_style = Some(layer(self.cell_style.take(), &style));
        self
    }

    /// Concatenate two rich writes. Runs keep their resolved styles; the cell
    /// style of `other` is layered over ours.
    pub fn chain(self, other: RichWrite) -> RichWrite {
        let mut runs = self.resolved_runs();
        runs.extend(other.resolved_runs());
        let cell_style = match (self.cell_style, other.cell_style) {
            (Some(a), Some(b)) => Some(a | b),
            (a, b) => a.or(b),
        };
        RichWrite {
            runs,
            run_default: None,
            cell_style,
            overridden: false,
        }
    }

    /// Runs with the run default applied where a run has no style.
    pub fn resolved_runs(&self) -> Vec<RichRun> {
        self.runs
            .iter()
            .map(|run| RichRun {
                text: run.text.clone(),
                style: run.style.clone().or_else(|| self.run_default.clone()),
            })
            .collect()
    }
}

fn layer(base: Option<Style>, top: &Style) -> Style {
    match base {
        Some(mut s) => {
            s.merge(top);
            s
        }
        None => top.clone(),
    }
}

// ============================================================================
// Range commands
// ============================================================================

/// One corner of a range command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellPointer {
    /// A bookmark name, resolved once every bookmark is known.
    Named(String),
    /// Positive: n-th last visited cell. Negative: n-th entry from the top
    /// of the position stack. Zero: the current cell.
    Offset(i64),
    At(Coord),
}

impl Default for CellPointer {
    fn default() -> Self {
        CellPointer::Offset(0)
    }
}

impl CellPointer {
    pub fn coord(&self) -> Option<Coord> {
        match self {
            CellPointer::At(c) => Some(*c),
            _ => None,
        }
    }
}

impl From<&str> for CellPointer {
    fn from(s: &str) -> Self {
        CellPointer::Named(s.to_string())
    }
}

impl From<String> for CellPointer {
    fn from(s: String) -> Self {
        CellPointer::Named(s)
    }
}

impl From<i64> for CellPointer {
    fn from(n: i64) -> Self {
        CellPointer::Offset(n)
    }
}

impl From<i32> for CellPointer {
    fn from(n: i32) -> Self {
        CellPointer::Offset(i64::from(n))
    }
}

impl From<Coord> for CellPointer {
    fn from(c: Coord) -> Self {
        CellPointer::At(c)
    }
}

/// Two corners of a rectangular region. Both default to the current cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub top_left: CellPointer,
    pub bottom_right: CellPointer,
}

impl Span {
    pub fn new(top_left: impl Into<CellPointer>, bottom_right: impl Into<CellPointer>) -> Self {
        Self {
            top_left: top_left.into(),
            bottom_right: bottom_right.into(),
        }
    }

    pub fn top_left(mut self, pointer: impl Into<CellPointer>) -> Self {
        self.top_left = pointer.into();
        self
    }

    pub fn bottom_right(mut self, pointer: impl Into<CellPointer>) -> Self {
        self.bottom_right = pointer.into();
        self
    }

    /// Normalised rectangle `(first, last)` once both corners are resolved.
    pub fn rect(&self) -> Option<(Coord, Coord)> {
        let a = self.top_left.coord()?;
        let b = self.bottom_right.coord()?;
        Some((
            Coord::new(a.row.min(b.row), a.col.min(b.col)),
            Coord::new(a.row.max(b.row), a.col.max(b.col)),
        ))
    }
}

/// Border around a rectangular region, one style per edge.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxBorder {
    pub span: Span,
    pub top: Style,
    pub right: Style,
    pub bottom: Style,
    pub left: Style,
}

impl BoxBorder {
    pub fn new(span: Span) -> Self {
        Self {
            span,
            top: presets::top_border(),
            right: presets::right_border(),
            bottom: presets::bottom_border(),
            left: presets::left_border(),
        }
    }

    pub fn with_top(mut self, style: Style) -> Self {
        self.top = style;
        self
    }

    pub fn with_right(mut self, style: Style) -> Self {
        self.right = style;
        self
    }

    pub fn with_bottom(mut self, style: Style) -> Self {
        self.bottom = style;
        self
    }

    pub fn with_left(mut self, style: Style) -> Self {
        self.left = style;
        self
    }

    /// Same style on all four edges.
    pub fn with_all(self, style: Style) -> Self {
        Self {
            top: style.clone(),
            right: style.clone(),
            bottom: style.clone(),
            left: style,
            ..self
        }
    }
}

impl Default for BoxBorder {
    fn default() -> Self {
        Self::new(Span::default())
    }
}

/// A workbook-level name for a region.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedRange {
    pub name: String,
    pub span: Span,
}

/// Marks a region whose absolute address later chart commands refer to by name.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardRef {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criteria {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalRule {
    Cell { criteria: Criteria, value: f64 },
    Between { low: f64, high: f64 },
    NotBetween { low: f64, high: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalFormat {
    pub span: Span,
    pub rule: ConditionalRule,
    pub style: Option<Style>,
}

// ============================================================================
// Attachments
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Comment {
    pub text: String,
    pub author: Option<String>,
    pub visible: bool,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn visible(mut self) -> Self {
        self.visible = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub source: ImageSource,
    pub scale: Option<(f64, f64)>,
    /// Pixel offset from the top-left of the anchor cell.
    pub offset: Option<(u32, u32)>,
}

impl Image {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ImageSource::Path(path.into()),
            scale: None,
            offset: None,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            source: ImageSource::Bytes(bytes),
            scale: None,
            offset: None,
        }
    }

    pub fn with_scale(mut self, width: f64, height: f64) -> Self {
        self.scale = Some((width, height));
        self
    }

    pub fn with_offset(mut self, x: u32, y: u32) -> Self {
        self.offset = Some((x, y));
        self
    }
}

// ============================================================================
// Command
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Cursor movement
    RelativeMove { rows: i64, cols: i64 },
    AbsoluteJump { row: i64, col: i64 },
    Backtrack(usize),
    StackPush,
    StackPop,
    Bookmark(String),
    GotoBookmark(String),

    // Diagnostics scoping
    SectionBegin(String),
    SectionEnd,

    // Content
    Write(Write),
    MergeWrite(MergeWrite),
    RichWrite(RichWrite),

    // Styling
    ImposeStyle(Style),
    OverrideStyle(Style),
    DrawBoxBorder(BoxBorder),

    // Regions
    DefineNamedRange(NamedRange),
    ForwardRefMarker(ForwardRef),
    SetPrintArea(Span),
    AddConditionalFormat(ConditionalFormat),

    // Sheet layout
    SetRowSize(f64),
    SetColSize(f64),
    SubmitRowBreak,
    SubmitColBreak,
    ApplyBreaks,

    // Attachments
    AddComment(Comment),
    AddImage(Image),
    AddChart(ChartDef),
}

impl Command {
    pub fn move_by(rows: i64, cols: i64) -> Self {
        Command::RelativeMove { rows, cols }
    }

    pub fn jump(row: i64, col: i64) -> Self {
        Command::AbsoluteJump { row, col }
    }

    pub fn next_row() -> Self {
        Self::move_by(1, 0)
    }

    pub fn next_col() -> Self {
        Self::move_by(0, 1)
    }

    pub fn backtrack(n: usize) -> Self {
        Command::Backtrack(n)
    }

    pub fn bookmark(name: impl Into<String>) -> Self {
        Command::Bookmark(name.into())
    }

    pub fn goto(name: impl Into<String>) -> Self {
        Command::GotoBookmark(name.into())
    }

    pub fn section(name: impl Into<String>) -> Self {
        Command::SectionBegin(name.into())
    }

    pub fn impose(style: Style) -> Self {
        Command::ImposeStyle(style)
    }

    pub fn override_with(style: Style) -> Self {
        Command::OverrideStyle(style)
    }

    pub fn draw_box(top_left: impl Into<CellPointer>, bottom_right: impl Into<CellPointer>) -> Self {
        Command::DrawBoxBorder(BoxBorder::new(Span::new(top_left, bottom_right)))
    }

    pub fn named_range(
        name: impl Into<String>,
        top_left: impl Into<CellPointer>,
        bottom_right: impl Into<CellPointer>,
    ) -> Self {
        Command::DefineNamedRange(NamedRange {
            name: name.into(),
            span: Span::new(top_left, bottom_right),
        })
    }

    pub fn forward_ref(
        name: impl Into<String>,
        top_left: impl Into<CellPointer>,
        bottom_right: impl Into<CellPointer>,
    ) -> Self {
        Command::ForwardRefMarker(ForwardRef {
            name: name.into(),
            span: Span::new(top_left, bottom_right),
        })
    }

    pub fn print_area(top_left: impl Into<CellPointer>, bottom_right: impl Into<CellPointer>) -> Self {
        Command::SetPrintArea(Span::new(top_left, bottom_right))
    }

    /// Whether this command puts content into its cell.
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            Command::Write(_) | Command::MergeWrite(_) | Command::RichWrite(_)
        )
    }

    /// The region of a range command.
    pub fn span(&self) -> Option<&Span> {
        match self {
            Command::DrawBoxBorder(b) => Some(&b.span),
            Command::DefineNamedRange(n) => Some(&n.span),
            Command::ForwardRefMarker(f) => Some(&f.span),
            Command::SetPrintArea(s) => Some(s),
            Command::AddConditionalFormat(c) => Some(&c.span),
            _ => None,
        }
    }

    pub fn span_mut(&mut self) -> Option<&mut Span> {
        match self {
            Command::DrawBoxBorder(b) => Some(&mut b.span),
            Command::DefineNamedRange(n) => Some(&mut n.span),
            Command::ForwardRefMarker(f) => Some(&mut f.span),
            Command::SetPrintArea(s) => Some(s),
            Command::AddConditionalFormat(c) => Some(&mut c.span),
            _ => None,
        }
    }

    /// Variant name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Command::RelativeMove { .. } => "RelativeMove",
            Command::AbsoluteJump { .. } => "AbsoluteJump",
            Command::Backtrack(_) => "Backtrack",
            Command::StackPush => "StackPush",
            Command::StackPop => "StackPop",
            Command::Bookmark(_) => "Bookmark",
            Command::GotoBookmark(_) => "GotoBookmark",
            Command::SectionBegin(_) => "SectionBegin",
            Command::SectionEnd => "SectionEnd",
            Command::Write(_) => "Write",
            Command::MergeWrite(_) => "MergeWrite",
            Command::RichWrite(_) => "RichWrite",
            Command::ImposeStyle(_) => "ImposeStyle",
            Command::OverrideStyle(_) => "OverrideStyle",
            Command::DrawBoxBorder(_) => "DrawBoxBorder",
            Command::DefineNamedRange(_) => "DefineNamedRange",
            Command::ForwardRefMarker(_) => "ForwardRefMarker",
            Command::SetPrintArea(_) => "SetPrintArea",
            Command::AddConditionalFormat(_) => "AddConditionalFormat",
            Command::SetRowSize(_) => "SetRowSize",
            Command::SetColSize(_) => "SetColSize",
            Command::SubmitRowBreak => "SubmitRowBreak",
            Command::SubmitColBreak => "SubmitColBreak",
            Command::ApplyBreaks => "ApplyBreaks",
            Command::AddComment(_) => "AddComment",
            Command::AddImage(_) => "AddImage",
            Command::AddChart(_) => "AddChart",
        }
    }
}

impl From<Write> for Command {
    fn from(w: Write) -> Self {
        Command::Write(w)
    }
}

impl From<MergeWrite> for Command {
    fn from(w: MergeWrite) -> Self {
        Command::MergeWrite(w)
    }
}

impl From<RichWrite> for Command {
    fn from(w: RichWrite) -> Self {
        Command::RichWrite(w)
    }
}

impl From<BoxBorder> for Command {
    fn from(b: BoxBorder) -> Self {
        Command::DrawBoxBorder(b)
    }
}

impl From<ConditionalFormat> for Command {
    fn from(c: ConditionalFormat) -> Self {
        Command::AddConditionalFormat(c)
    }
}

impl From<Comment> for Command {
    fn from(c: Comment) -> Self {
        Command::AddComment(c)
    }
}

impl From<Image> for Command {
    fn from(i: Image) -> Self {
        Command::AddImage(i)
    }
}

impl From<ChartDef> for Command {
    fn from(c: ChartDef) -> Self {
        Command::AddChart(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use celldsl_core::presets::{bold, italic, wrapped};

    #[test]
    fn test_builders_return_new_values() {
        let template = Write::new("x").with_style(bold());
        let refined = template.clone().with_style(italic());
        assert_eq!(template.style, Some(bold()));
        assert_eq!(refined.style, Some(bold() | italic()));
        assert_eq!(refined.data, CellData::Text("x".into()));
    }

    #[test]
    fn test_placeholder_is_blank() {
        let p = Write::placeholder();
        assert!(p.data.is_blank());
        assert!(p.style.is_none());
        assert!(p.kind.is_none());
    }

    #[test]
    fn test_span_rect_normalises() {
        let span = Span::new(Coord::new(4, 1), Coord::new(2, 3));
        assert_eq!(span.rect(), Some((Coord::new(2, 1), Coord::new(4, 3))));
        assert_eq!(Span::new("x", 0).rect(), None);
    }

    #[test]
    fn test_default_pointer_is_current_cell() {
        assert_eq!(Span::default().top_left, CellPointer::Offset(0));
        assert_eq!(Span::default().bottom_right, CellPointer::Offset(0));
    }

    #[test]
    fn test_rich_chain() {
        let a = RichWrite::new()
            .then("a")
            .with_run_default(bold())
            .with_cell_style(wrapped());
        let b = RichWrite::new().then_styled("b", italic());
        let c = a.chain(b);
        assert_eq!(c.runs.len(), 2);
        assert_eq!(c.runs[0].style, Some(bold()));
        assert_eq!(c.runs[1].style, Some(italic()));
        assert_eq!(c.cell_style, Some(wrapped()));
        assert!(c.run_default.is_none());
    }

    #[test]
    fn test_span_access() {
        let mut cmd = Command::named_range("r", "start", 0);
        assert!(cmd.span().is_some());
        if let Some(span) = cmd.span_mut() {
            span.top_left = CellPointer::At(Coord::ORIGIN);
        }
        assert_eq!(cmd.span().and_then(|s| s.top_left.coord()), Some(Coord::ORIGIN));
        assert!(Command::next_row().span().is_none());
    }

    #[test]
    fn test_box_border_defaults() {
        let b = BoxBorder::default();
        assert_eq!(b.top, presets::top_border());
        assert_eq!(b.left, presets::left_border());
        let all = b.with_all(presets::highlight_border());
        assert_eq!(all.bottom, presets::highlight_border());
        assert_eq!(all.right, presets::highlight_border());
    }
}
