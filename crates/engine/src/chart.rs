//! Chart descriptions.
//!
//! A chart is a kind, an optional subtype and an ordered list of
//! configuration operations. Range values inside the operations may name a
//! forward reference; those are substituted with absolute addresses before
//! execution and qualified with the sheet name by the surface.

use std::collections::BTreeMap;

use celldsl_core::coord::quote_sheet_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Area,
    Bar,
    Column,
    Line,
    Pie,
    Doughnut,
    Scatter,
    Radar,
    Stock,
}

/// Where a series range comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSource {
    /// A formula written by the caller, e.g. `=Sheet1!$A$1:$A$5`.
    Literal(String),
    /// A forward-reference name, not yet substituted.
    Forward(String),
    /// Absolute address on the current sheet, e.g. `$A$1:$C$1`.
    Resolved(String),
}

impl RangeSource {
    pub fn forward(name: impl Into<String>) -> Self {
        RangeSource::Forward(name.into())
    }

    pub fn literal(formula: impl Into<String>) -> Self {
        RangeSource::Literal(formula.into())
    }

    /// Sheet-qualified formula text, `None` while still a forward name.
    pub fn formula(&self, sheet: &str) -> Option<String> {
        match self {
            RangeSource::Literal(s) => Some(s.clone()),
            RangeSource::Resolved(addr) => Some(format!("{}!{}", quote_sheet_name(sheet), addr)),
            RangeSource::Forward(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Range(RangeSource),
    Map(BTreeMap<String, ChartValue>),
    List(Vec<ChartValue>),
}

impl From<&str> for ChartValue {
    fn from(s: &str) -> Self {
        ChartValue::Text(s.to_string())
    }
}

impl From<String> for ChartValue {
    fn from(s: String) -> Self {
        ChartValue::Text(s)
    }
}

impl From<f64> for ChartValue {
    fn from(n: f64) -> Self {
        ChartValue::Number(n)
    }
}

impl From<bool> for ChartValue {
    fn from(b: bool) -> Self {
        ChartValue::Bool(b)
    }
}

impl From<RangeSource> for ChartValue {
    fn from(r: RangeSource) -> Self {
        ChartValue::Range(r)
    }
}

/// Options of one data series, keyed like the xlsx series options
/// (`values`, `categories`, `name`, `smooth`, ...).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series(pub BTreeMap<String, ChartValue>);

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<ChartValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn values(self, source: RangeSource) -> Self {
        self.set("values", source)
    }

    pub fn categories(self, source: RangeSource) -> Self {
        self.set("categories", source)
    }

    pub fn name(self, value: impl Into<ChartValue>) -> Self {
        self.set("name", value)
    }

    pub fn get(&self, key: &str) -> Option<&ChartValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChartValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlanksAs {
    Gap,
    Zero,
    Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartOp {
    AddSeries(Series),
    SetTitle(String),
    SetStyle(u8),
    ShowBlanksAs(BlanksAs),
    ShowHiddenData,
    Combine(Box<ChartDef>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartDef {
    pub kind: ChartKind,
    pub subtype: Option<String>,
    pub ops: Vec<ChartOp>,
}

impl ChartDef {
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            subtype: None,
            ops: Vec::new(),
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn then(mut self, op: ChartOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn add_series(self, series: Series) -> Self {
        self.then(ChartOp::AddSeries(series))
    }

    pub fn combine(self, other: ChartDef) -> Self {
        self.then(ChartOp::Combine(Box::new(other)))
    }

    /// Replace forward names with addresses from `table`, recursing into
    /// nested values and combined charts. Returns the first unknown name.
    pub fn resolve_refs(&mut self, table: &BTreeMap<String, String>) -> Result<(), String> {
        for op in &mut self.ops {
            match op {
                ChartOp::AddSeries(series) => {
                    for value in series.0.values_mut() {
                        resolve_value(value, table)?;
                    }
                }
                ChartOp::Combine(inner) => inner.resolve_refs(table)?,
                ChartOp::SetTitle(_)
                | ChartOp::SetStyle(_)
                | ChartOp::ShowBlanksAs(_)
                | ChartOp::ShowHiddenData => {}
            }
        }
        Ok(())
    }
}

fn resolve_value(value: &mut ChartValue, table: &BTreeMap<String, String>) -> Result<(), String> {
    match value {
        ChartValue::Range(source) => {
            if let RangeSource::Forward(name) = source {
                let addr = table.get(name.as_str()).ok_or_else(|| name.clone())?;
                *source = RangeSource::Resolved(addr.clone());
            }
        }
        ChartValue::Map(map) => {
            for v in map.values_mut() {
                resolve_value(v, table)?;
            }
        }
        ChartValue::List(items) => {
            for v in items {
                resolve_value(v, table)?;
            }
        }
        ChartValue::Text(_) | ChartValue::Number(_) | ChartValue::Bool(_) => {}
    }
    Ok(())
}
