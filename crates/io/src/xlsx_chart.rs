// Chart descriptions to rust_xlsxwriter charts.
//
// Series ranges arrive resolved (absolute addresses on the current sheet) or
// as literal formulas. Anything still naming a forward reference is an error.

use celldsl_engine::chart::BlanksAs;
use celldsl_engine::{ChartDef, ChartKind, ChartOp, ChartValue, RangeSource, Series, SurfaceError};
use rust_xlsxwriter::{Chart, ChartEmptyCells, ChartSeries, ChartType};

fn invalid(message: String) -> SurfaceError {
    SurfaceError::InvalidParameter(message)
}

/// Writer chart type for a kind and optional subtype.
pub fn chart_type(kind: ChartKind, subtype: Option<&str>) -> Result<ChartType, SurfaceError> {
    use ChartKind as K;
    let chart_type = match (kind, subtype) {
        (K::Area, None) => ChartType::Area,
        (K::Area, Some("stacked")) => ChartType::AreaStacked,
        (K::Area, Some("percent_stacked")) => ChartType::AreaPercentStacked,
        (K::Bar, None) => ChartType::Bar,
        (K::Bar, Some("stacked")) => ChartType::BarStacked,
        (K::Bar, Some("percent_stacked")) => ChartType::BarPercentStacked,
        (K::Column, None) => ChartType::Column,
        (K::Column, Some("stacked")) => ChartType::ColumnStacked,
        (K::Column, Some("percent_stacked")) => ChartType::ColumnPercentStacked,
        (K::Line, None) => ChartType::Line,
        (K::Line, Some("stacked")) => ChartType::LineStacked,
        (K::Line, Some("percent_stacked")) => ChartType::LinePercentStacked,
        (K::Pie, None) => ChartType::Pie,
        (K::Doughnut, None) => ChartType::Doughnut,
        (K::Scatter, None | Some("marker_only")) => ChartType::Scatter,
        (K::Scatter, Some("straight")) => ChartType::ScatterStraight,
        (K::Scatter, Some("straight_with_markers")) => ChartType::ScatterStraightWithMarkers,
        (K::Scatter, Some("smooth")) => ChartType::ScatterSmooth,
        (K::Scatter, Some("smooth_with_markers")) => ChartType::ScatterSmoothWithMarkers,
        (K::Radar, None) => ChartType::Radar,
        (K::Radar, Some("with_markers")) => ChartType::RadarWithMarkers,
        (K::Radar, Some("filled")) => ChartType::RadarFilled,
        (K::Stock, None) => ChartType::Stock,
        (kind, Some(other)) => return Err(invalid(format!("{kind:?} chart has no subtype {other:?}"))),
    };
    Ok(chart_type)
}

/// Formula text for a range option, without the leading `=`.
fn range_formula(key: &str, value: &ChartValue, sheet: &str) -> Result<String, SurfaceError> {
    let formula = match value {
        ChartValue::Range(source) => source.formula(sheet).ok_or_else(|| match source {
            RangeSource::Forward(name) => invalid(format!("series {key}: forward reference {name} was never resolved")),
            _ => invalid(format!("series {key}: no formula")),
        })?,
        ChartValue::Text(text) => text.clone(),
        other => return Err(invalid(format!("series {key}: expected a range, got {other:?}"))),
    };
    Ok(formula.trim_start_matches('=').to_string())
}

fn apply_series(target: &mut ChartSeries, series: &Series, sheet: &str) -> Result<(), SurfaceError> {
    for (key, value) in series.iter() {
        match key {
            "values" => {
                target.set_values(range_formula(key, value, sheet)?.as_str());
            }
            "categories" => {
                target.set_categories(range_formula(key, value, sheet)?.as_str());
            }
            // A plain text name is literal; a range name is a formula.
            "name" => match value {
                ChartValue::Text(text) => {
                    target.set_name(text.as_str());
                }
                _ => {
                    target.set_name(format!("={}", range_formula(key, value, sheet)?).as_str());
                }
            },
            "smooth" => match value {
                ChartValue::Bool(on) => {
                    target.set_smooth(*on);
                }
                other => return Err(invalid(format!("series smooth: expected a boolean, got {other:?}"))),
            },
            _ => tracing::warn!(target: "celldsl.xlsx", key, "unknown series option ignored"),
        }
    }
    Ok(())
}

/// Build a writer chart, recursing into combined charts.
pub fn build_chart(def: &ChartDef, sheet: &str) -> Result<Chart, SurfaceError> {
    let mut chart = Chart::new(chart_type(def.kind, def.subtype.as_deref())?);
    for op in &def.ops {
        match op {
            ChartOp::AddSeries(series) => apply_series(chart.add_series(), series, sheet)?,
            ChartOp::SetTitle(title) => {
                chart.title().set_name(title.as_str());
            }
            ChartOp::SetStyle(style) => {
                chart.set_style(*style);
            }
            ChartOp::ShowBlanksAs(blanks) => {
                chart.show_empty_cells_as(match blanks {
                    BlanksAs::Gap => ChartEmptyCells::Gaps,
                    BlanksAs::Zero => ChartEmptyCells::Zero,
                    BlanksAs::Span => ChartEmptyCells::Connected,
                });
            }
            ChartOp::ShowHiddenData => {
                chart.show_hidden_data();
            }
            ChartOp::Combine(inner) => {
                let secondary = build_chart(inner, sheet)?;
                chart.combine(&secondary);
            }
        }
    }
    Ok(chart)
}
