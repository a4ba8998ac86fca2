//! In-memory surface that records every operation.
//!
//! Used for dry runs and for asserting on what the engine would write.
//! Styles are stored resolved so assertions can compare style content
//! instead of handles.

use celldsl_core::coord::range_formula;
use celldsl_core::{Coord, Style};

use crate::chart::{ChartDef, ChartOp, ChartValue, RangeSource};
use crate::command::{CellData, Comment, ConditionalRule, DataKind, Image};
use crate::surface::{OutputSurface, SurfaceError, SurfaceResult};

/// Longest string a cell may hold.
pub const MAX_STRING_LEN: usize = 32_767;

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    Write {
        at: Coord,
        data: CellData,
        kind: Option<DataKind>,
        style: Style,
    },
    MergeWrite {
        first: Coord,
        last: Coord,
        data: CellData,
        kind: Option<DataKind>,
        style: Style,
    },
    WriteRich {
        at: Coord,
        runs: Vec<(Style, String)>,
        cell_style: Option<Style>,
    },
    DefineName {
        name: String,
        formula: String,
    },
    PrintArea {
        first: Coord,
        last: Coord,
    },
    ConditionalFormat {
        first: Coord,
        last: Coord,
        rule: ConditionalRule,
        style: Option<Style>,
    },
    InsertImage {
        at: Coord,
        image: Image,
    },
    /// Chart with every range qualified into a formula.
    InsertChart {
        at: Coord,
        chart: ChartDef,
    },
    AddComment {
        at: Coord,
        comment: Comment,
    },
    RowSize {
        row: u32,
        size: f64,
    },
    ColSize {
        col: u16,
        size: f64,
    },
    PageBreaks {
        rows: Vec<u32>,
        cols: Vec<u16>,
    },
}

impl SurfaceOp {
    /// Anchor cell of the operation, when it has one.
    pub fn at(&self) -> Option<Coord> {
        match self {
            SurfaceOp::Write { at, .. }
            | SurfaceOp::WriteRich { at, .. }
            | SurfaceOp::InsertImage { at, .. }
            | SurfaceOp::InsertChart { at, .. }
            | SurfaceOp::AddComment { at, .. } => Some(*at),
            SurfaceOp::MergeWrite { first, .. }
            | SurfaceOp::PrintArea { first, .. }
            | SurfaceOp::ConditionalFormat { first, .. } => Some(*first),
            SurfaceOp::DefineName { .. }
            | SurfaceOp::RowSize { .. }
            | SurfaceOp::ColSize { .. }
            | SurfaceOp::PageBreaks { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordingSurface {
    sheet: String,
    styles: Vec<Style>,
    ops: Vec<SurfaceOp>,
    max_string_len: usize,
    names: usize,
    max_names: Option<usize>,
}

impl RecordingSurface {
    pub fn new(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            styles: Vec::new(),
            ops: Vec::new(),
            max_string_len: MAX_STRING_LEN,
            names: 0,
            max_names: None,
        }
    }

    pub fn with_max_string_len(mut self, len: usize) -> Self {
        self.max_string_len = len;
        self
    }

    /// Fail named-range definitions past `limit`.
    pub fn with_max_names(mut self, limit: usize) -> Self {
        self.max_names = Some(limit);
        self
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<SurfaceOp> {
        self.ops
    }

    /// Number of style registrations seen.
    pub fn registrations(&self) -> usize {
        self.styles.len()
    }

    pub fn registered_styles(&self) -> &[Style] {
        &self.styles
    }

    fn style(&self, handle: usize) -> SurfaceResult<Style> {
        self.styles
            .get(handle)
            .cloned()
            .ok_or_else(|| SurfaceError::InvalidParameter(format!("unknown style handle {handle}")))
    }

    fn check_len(&self, text: &str) -> SurfaceResult<()> {
        let len = text.chars().count();
        if len > self.max_string_len {
            return Err(SurfaceError::ContentLengthExceeded(format!(
                "{len} characters, limit is {}",
                self.max_string_len
            )));
        }
        Ok(())
    }

    fn check_data(&self, data: &CellData) -> SurfaceResult<()> {
        match data {
            CellData::Text(s) => self.check_len(s),
            _ => Ok(()),
        }
    }

    fn qualify_chart(&self, chart: &ChartDef) -> SurfaceResult<ChartDef> {
        let mut out = chart.clone();
        out.ops = Vec::with_capacity(chart.ops.len());
        for op in &chart.ops {
            let op = match op {
                ChartOp::AddSeries(series) => {
                    let mut series = series.clone();
                    for value in series.0.values_mut() {
                        self.qualify_value(value)?;
                    }
                    ChartOp::AddSeries(series)
                }
                ChartOp::Combine(inner) => ChartOp::Combine(Box::new(self.qualify_chart(inner)?)),
                other => other.clone(),
            };
            out.ops.push(op);
        }
        Ok(out)
    }

    fn qualify_value(&self, value: &mut ChartValue) -> SurfaceResult<()> {
        match value {
            ChartValue::Range(source) => {
                let formula = source.formula(&self.sheet).ok_or_else(|| {
                    SurfaceError::InvalidParameter(format!("unresolved chart range {source:?}"))
                })?;
                *source = RangeSource::Literal(formula);
            }
            ChartValue::Map(map) => {
                for v in map.values_mut() {
                    self.qualify_value(v)?;
                }
            }
            ChartValue::List(items) => {
                for v in items {
                    self.qualify_value(v)?;
                }
            }
            ChartValue::Text(_) | ChartValue::Number(_) | ChartValue::Bool(_) => {}
        }
        Ok(())
    }
}

impl OutputSurface for RecordingSurface {
    type Handle = usize;

    fn sheet_name(&self) -> &str {
        &self.sheet
    }

    fn register_style(&mut self, style: &Style) -> SurfaceResult<usize> {
        self.styles.push(style.clone());
        Ok(self.styles.len() - 1)
    }

    fn write(&mut self, at: Coord, data: &CellData, kind: Option<DataKind>, style: &usize) -> SurfaceResult<()> {
        self.check_data(data)?;
        let style = self.style(*style)?;
        self.ops.push(SurfaceOp::Write {
            at,
            data: data.clone(),
            kind,
            style,
        });
        Ok(())
    }

    fn merge_write(
        &mut self,
        first: Coord,
        last: Coord,
        data: &CellData,
        kind: Option<DataKind>,
        style: &usize,
    ) -> SurfaceResult<()> {
        self.check_data(data)?;
        let style = self.style(*style)?;
        self.ops.push(SurfaceOp::MergeWrite {
            first,
            last,
            data: data.clone(),
            kind,
            style,
        });
        Ok(())
    }

    fn write_rich(&mut self, at: Coord, runs: &[(usize, String)], cell_style: Option<&usize>) -> SurfaceResult<()> {
        if runs.len() < 2 {
            return Err(SurfaceError::InvalidParameter(
                "rich string needs at least two runs".to_string(),
            ));
        }
        let total: String = runs.iter().map(|(_, text)| text.as_str()).collect();
        self.check_len(&total)?;
        let runs = runs
            .iter()
            .map(|(h, text)| Ok((self.style(*h)?, text.clone())))
            .collect::<SurfaceResult<Vec<_>>>()?;
        let cell_style = cell_style.map(|h| self.style(*h)).transpose()?;
        self.ops.push(SurfaceOp::WriteRich { at, runs, cell_style });
        Ok(())
    }

    fn define_name(&mut self, name: &str, first: Coord, last: Coord) -> SurfaceResult<()> {
        if self.max_names.is_some_and(|limit| self.names >= limit) {
            return Err(SurfaceError::ReferenceCountExceeded(format!(
                "cannot define {name}, name limit reached"
            )));
        }
        self.names += 1;
        self.ops.push(SurfaceOp::DefineName {
            name: name.to_string(),
            formula: format!("={}", range_formula(&self.sheet, first, last)),
        });
        Ok(())
    }

    fn set_print_area(&mut self, first: Coord, last: Coord) -> SurfaceResult<()> {
        self.ops.push(SurfaceOp::PrintArea { first, last });
        Ok(())
    }

    fn add_conditional_format(
        &mut self,
        first: Coord,
        last: Coord,
        rule: &ConditionalRule,
        style: Option<&usize>,
    ) -> SurfaceResult<()> {
        let style = style.map(|h| self.style(*h)).transpose()?;
        self.ops.push(SurfaceOp::ConditionalFormat {
            first,
            last,
            rule: rule.clone(),
            style,
        });
        Ok(())
    }

    fn insert_image(&mut self, at: Coord, image: &Image) -> SurfaceResult<()> {
        self.ops.push(SurfaceOp::InsertImage {
            at,
            image: image.clone(),
        });
        Ok(())
    }

    fn insert_chart(&mut self, at: Coord, chart: &ChartDef) -> SurfaceResult<()> {
        let chart = self.qualify_chart(chart)?;
        self.ops.push(SurfaceOp::InsertChart { at, chart });
        Ok(())
    }

    fn add_comment(&mut self, at: Coord, comment: &Comment) -> SurfaceResult<()> {
        self.check_len(&comment.text)?;
        self.ops.push(SurfaceOp::AddComment {
            at,
            comment: comment.clone(),
        });
        Ok(())
    }

    fn set_row_size(&mut self, row: u32, size: f64) -> SurfaceResult<()> {
        self.ops.push(SurfaceOp::RowSize { row, size });
        Ok(())
    }

    fn set_col_size(&mut self, col: u16, size: f64) -> SurfaceResult<()> {
        self.ops.push(SurfaceOp::ColSize { col, size });
        Ok(())
    }

    fn set_page_breaks(&mut self, rows: &[u32], cols: &[u16]) -> SurfaceResult<()> {
        self.ops.push(SurfaceOp::PageBreaks {
            rows: rows.to_vec(),
            cols: cols.to_vec(),
        });
        Ok(())
    }
}
