// Excel workbook output surface.
//
// Each registered style becomes one rust_xlsxwriter Format; handles index
// into that list. Merged regions are written blank first and the origin cell
// is then overwritten with typed data, as merge_range only takes strings.

use std::path::Path;

use celldsl_core::coord::range_formula;
use celldsl_config::Settings;
use celldsl_core::{Coord, Style};
use celldsl_engine::command::Criteria;
use celldsl_engine::{
    CellData, ChartDef, Comment, ConditionalRule, DataKind, Image, ImageSource, OutputSurface, SurfaceError,
};
use celldsl_engine::surface::SurfaceResult;
use rust_xlsxwriter::{
    ConditionalFormatCell, ConditionalFormatCellRule, Format, Image as XlsxImage, Note, Workbook, Worksheet,
    XlsxError,
};

use crate::xlsx_chart::build_chart;
use crate::xlsx_styles::build_format;

/// Map writer failures onto the surface error categories.
fn map_xlsx(err: XlsxError) -> SurfaceError {
    match err {
        XlsxError::MaxStringLengthExceeded { .. } => SurfaceError::ContentLengthExceeded(err.to_string()),
        XlsxError::ParameterError(message) => SurfaceError::InvalidParameter(message),
        other => SurfaceError::Backend(other.to_string()),
    }
}

fn sheet(workbook: &mut Workbook, index: usize) -> SurfaceResult<&mut Worksheet> {
    workbook.worksheet_from_index(index).map_err(map_xlsx)
}

/// A worksheet inside an in-memory workbook.
pub struct XlsxSurface {
    workbook: Workbook,
    sheet_index: usize,
    sheet_name: String,
    formats: Vec<Format>,
}

impl XlsxSurface {
    /// New workbook with one worksheet called `sheet_name`.
    pub fn new(sheet_name: &str) -> SurfaceResult<Self> {
        let mut workbook = Workbook::new();
        workbook.add_worksheet().set_name(sheet_name).map_err(map_xlsx)?;
        Ok(Self {
            workbook,
            sheet_index: 0,
            sheet_name: sheet_name.to_string(),
            formats: Vec::new(),
        })
    }

    /// New workbook whose first worksheet is named by `settings`.
    pub fn from_settings(settings: &Settings) -> SurfaceResult<Self> {
        tracing::debug!(target: "celldsl.xlsx", sheet = %settings.sheet_name, "workbook from settings");
        Self::new(&settings.sheet_name)
    }

    /// Add a worksheet and direct further writes to it.
    ///
    /// Registered styles stay valid; formats are workbook-wide.
    pub fn add_sheet(&mut self, sheet_name: &str) -> SurfaceResult<()> {
        self.workbook.add_worksheet().set_name(sheet_name).map_err(map_xlsx)?;
        self.sheet_index += 1;
        self.sheet_name = sheet_name.to_string();
        tracing::debug!(target: "celldsl.xlsx", sheet = sheet_name, "worksheet added");
        Ok(())
    }

    pub fn save(&mut self, path: &Path) -> SurfaceResult<()> {
        self.workbook.save(path).map_err(map_xlsx)?;
        tracing::info!(target: "celldsl.xlsx", path = %path.display(), "workbook saved");
        Ok(())
    }

    pub fn save_to_buffer(&mut self) -> SurfaceResult<Vec<u8>> {
        self.workbook.save_to_buffer().map_err(map_xlsx)
    }

    fn format(&self, handle: usize) -> SurfaceResult<&Format> {
        self.formats
            .get(handle)
            .ok_or_else(|| SurfaceError::InvalidParameter(format!("unknown style handle {handle}")))
    }

    fn worksheet(&mut self) -> SurfaceResult<&mut Worksheet> {
        sheet(&mut self.workbook, self.sheet_index)
    }
}

/// Write one typed value. With no explicit kind the payload decides; text
/// starting with `=` is a formula.
fn write_typed(
    ws: &mut Worksheet,
    at: Coord,
    data: &CellData,
    kind: Option<DataKind>,
    format: &Format,
) -> SurfaceResult<()> {
    let (row, col) = (at.row, at.col);
    let mismatch = |kind: DataKind| {
        SurfaceError::InvalidParameter(format!("{kind:?} cannot be written from {data:?} at {at}"))
    };
    match (kind, data) {
        (Some(DataKind::Blank), _) | (None, CellData::Blank) => ws.write_blank(row, col, format),
        (Some(DataKind::Formula), CellData::Text(text)) => ws.write_formula_with_format(row, col, text.as_str(), format),
        (Some(DataKind::Url), CellData::Text(text)) => ws.write_url_with_format(row, col, text.as_str(), format),
        (None, CellData::Text(text)) if text.starts_with('=') => {
            ws.write_formula_with_format(row, col, text.as_str(), format)
        }
        (Some(DataKind::String) | None, CellData::Text(text)) => ws.write_string_with_format(row, col, text, format),
        (Some(DataKind::String), CellData::Number(n)) => {
            ws.write_string_with_format(row, col, n.to_string(), format)
        }
        // Datetime payloads are serial numbers; the style carries the date format.
        (Some(DataKind::Number | DataKind::Datetime) | None, CellData::Number(n)) => {
            ws.write_number_with_format(row, col, *n, format)
        }
        (Some(DataKind::Boolean) | None, CellData::Bool(b)) => ws.write_boolean_with_format(row, col, *b, format),
        (Some(kind), _) => return Err(mismatch(kind)),
    }
    .map_err(map_xlsx)?;
    Ok(())
}

fn cell_rule(rule: &ConditionalRule) -> ConditionalFormatCellRule<f64> {
    match *rule {
        ConditionalRule::Cell { criteria, value } => match criteria {
            Criteria::EqualTo => ConditionalFormatCellRule::EqualTo(value),
            Criteria::NotEqualTo => ConditionalFormatCellRule::NotEqualTo(value),
            Criteria::GreaterThan => ConditionalFormatCellRule::GreaterThan(value),
            Criteria::GreaterThanOrEqualTo => ConditionalFormatCellRule::GreaterThanOrEqualTo(value),
            Criteria::LessThan => ConditionalFormatCellRule::LessThan(value),
            Criteria::LessThanOrEqualTo => ConditionalFormatCellRule::LessThanOrEqualTo(value),
        },
        ConditionalRule::Between { low, high } => ConditionalFormatCellRule::Between(low, high),
        ConditionalRule::NotBetween { low, high } => ConditionalFormatCellRule::NotBetween(low, high),
    }
}

impl OutputSurface for XlsxSurface {
    type Handle = usize;

    fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    fn register_style(&mut self, style: &Style) -> SurfaceResult<usize> {
        self.formats.push(build_format(style)?);
        Ok(self.formats.len() - 1)
    }

    fn write(&mut self, at: Coord, data: &CellData, kind: Option<DataKind>, style: &usize) -> SurfaceResult<()> {
        let format = self.format(*style)?.clone();
        write_typed(self.worksheet()?, at, data, kind, &format)
    }

    fn merge_write(
        &mut self,
        first: Coord,
        last: Coord,
        data: &CellData,
        kind: Option<DataKind>,
        style: &usize,
    ) -> SurfaceResult<()> {
        let format = self.format(*style)?.clone();
        let ws = self.worksheet()?;
        ws.merge_range(first.row, first.col, last.row, last.col, "", &format)
            .map_err(map_xlsx)?;
        // Overwrite the blank merge_range left at the origin with typed data
        write_typed(ws, first, data, kind, &format)
    }

    fn write_rich(&mut self, at: Coord, runs: &[(usize, String)], cell_style: Option<&usize>) -> SurfaceResult<()> {
        let mut formats = Vec::with_capacity(runs.len());
        for (handle, _) in runs {
            formats.push(self.format(*handle)?.clone());
        }
        let cell_format = cell_style.map(|h| self.format(*h).cloned()).transpose()?;
        let segments: Vec<(&Format, &str)> = formats
            .iter()
            .zip(runs)
            .map(|(format, (_, text))| (format, text.as_str()))
            .collect();

        let ws = self.worksheet()?;
        match &cell_format {
            Some(format) => ws.write_rich_string_with_format(at.row, at.col, &segments, format),
            None => ws.write_rich_string(at.row, at.col, &segments),
        }
        .map_err(map_xlsx)?;
        Ok(())
    }

    fn define_name(&mut self, name: &str, first: Coord, last: Coord) -> SurfaceResult<()> {
        let formula = format!("={}", range_formula(&self.sheet_name, first, last));
        self.workbook.define_name(name, &formula).map_err(map_xlsx)?;
        Ok(())
    }

    fn set_print_area(&mut self, first: Coord, last: Coord) -> SurfaceResult<()> {
        self.worksheet()?
            .set_print_area(first.row, first.col, last.row, last.col)
            .map_err(map_xlsx)?;
        Ok(())
    }

    fn add_conditional_format(
        &mut self,
        first: Coord,
        last: Coord,
        rule: &ConditionalRule,
        style: Option<&usize>,
    ) -> SurfaceResult<()> {
        let mut conditional = ConditionalFormatCell::new().set_rule(cell_rule(rule));
        if let Some(handle) = style {
            conditional = conditional.set_format(self.format(*handle)?);
        }
        self.worksheet()?
            .add_conditional_format(first.row, first.col, last.row, last.col, &conditional)
            .map_err(map_xlsx)?;
        Ok(())
    }

    fn insert_image(&mut self, at: Coord, image: &Image) -> SurfaceResult<()> {
        let mut picture = match &image.source {
            ImageSource::Path(path) => XlsxImage::new(path),
            ImageSource::Bytes(bytes) => XlsxImage::new_from_buffer(bytes),
        }
        .map_err(map_xlsx)?;
        if let Some((x, y)) = image.scale {
            picture = picture.set_scale_width(x).set_scale_height(y);
        }
        let ws = self.worksheet()?;
        match image.offset {
            Some((x, y)) => ws.insert_image_with_offset(at.row, at.col, &picture, x, y),
            None => ws.insert_image(at.row, at.col, &picture),
        }
        .map_err(map_xlsx)?;
        Ok(())
    }

    fn insert_chart(&mut self, at: Coord, chart: &ChartDef) -> SurfaceResult<()> {
        let built = build_chart(chart, &self.sheet_name)?;
        self.worksheet()?
            .insert_chart(at.row, at.col, &built)
            .map_err(map_xlsx)?;
        Ok(())
    }

    fn add_comment(&mut self, at: Coord, comment: &Comment) -> SurfaceResult<()> {
        let mut note = Note::new(&comment.text);
        if let Some(author) = &comment.author {
            note = note.set_author(author);
        }
        if comment.visible {
            note = note.set_visible(true);
        }
        self.worksheet()?
            .insert_note(at.row, at.col, &note)
            .map_err(map_xlsx)?;
        Ok(())
    }

    fn set_row_size(&mut self, row: u32, size: f64) -> SurfaceResult<()> {
        self.worksheet()?.set_row_height(row, size).map_err(map_xlsx)?;
        Ok(())
    }

    fn set_col_size(&mut self, col: u16, size: f64) -> SurfaceResult<()> {
        self.worksheet()?.set_column_width(col, size).map_err(map_xlsx)?;
        Ok(())
    }

    fn set_page_breaks(&mut self, rows: &[u32], cols: &[u16]) -> SurfaceResult<()> {
        let cols: Vec<u32> = cols.iter().map(|&c| u32::from(c)).collect();
        let ws = self.worksheet()?;
        if !rows.is_empty() {
            ws.set_page_breaks(rows).map_err(map_xlsx)?;
        }
        if !cols.is_empty() {
            ws.set_vertical_page_breaks(&cols).map_err(map_xlsx)?;
        }
        Ok(())
    }
}
