//! End-to-end scenarios: tokens in, recorded surface operations out.

use celldsl_core::presets::{
    bold, bottom_border, center, default_font, default_font_bold, default_font_centered, italic, left_border,
    right_border, rotated_90, top_border, wrapped,
};
use celldsl_core::{Coord, Style};
use celldsl_engine::chains::{row_chain, ChainOptions};
use celldsl_engine::error::{ExecutionError, MovementError};
use celldsl_engine::{
    tokens, Binding, CellData, ChartDef, ChartKind, ChartOp, ChartValue, Command, ErrorKind, MergeWrite,
    PageBreaks, RangeSource, RecordingSurface, RichWrite, Series, Session, SessionOptions, SurfaceOp, Token, Write,
};

fn run(session: &Session) -> celldsl_engine::Result<Vec<SurfaceOp>> {
    let mut binding = Binding::new(RecordingSurface::new("TestSheet"));
    session.execute(&mut binding, &mut PageBreaks::new())?;
    Ok(binding.into_surface().into_ops())
}

fn session(tokens: impl Into<Token>) -> Session {
    let mut s = Session::default();
    s.commit(tokens).unwrap();
    s
}

fn writes(ops: &[SurfaceOp]) -> Vec<(Coord, String)> {
    ops.iter()
        .filter_map(|op| match op {
            SurfaceOp::Write {
                at,
                data: CellData::Text(t),
                ..
            } => Some((*at, t.clone())),
            _ => None,
        })
        .collect()
}

fn write_style(ops: &[SurfaceOp], cell: Coord) -> Option<Style> {
    ops.iter().find_map(|op| match op {
        SurfaceOp::Write { at, style, .. } if *at == cell => Some(style.clone()),
        _ => None,
    })
}

#[test]
fn moves_then_writes_land_row_major() {
    let s = session(tokens![6, Write::new("A"), 6, Write::new("B")]);
    let ops = run(&s).unwrap();
    assert_eq!(
        writes(&ops),
        vec![(Coord::new(0, 1), "A".to_string()), (Coord::new(0, 2), "B".to_string())]
    );
}

#[test]
fn full_movement_tour() {
    let mut s = Session::new(SessionOptions {
        start: Coord::new(10, 10),
        overwrites_ok: true,
        ..SessionOptions::default()
    });
    s.commit(tokens![
        Write::new("10, 10"),
        6,
        Write::new("10, 11"),
        44,
        Write::new("10, 9"),
        8,
        Write::new("9, 9"),
        Command::StackPush,
        6666,
        Write::new("9, 13"),
        6666,
        Command::StackPop,
        Write::new("9, 9"),
        Command::bookmark("Alpha"),
        6,
        Command::bookmark("Beta"),
        44444,
        Write::new("9, 5"),
        Command::goto("Alpha"),
        Write::new("9, 9"),
        Command::goto("Beta"),
        Write::new("9, 10"),
        Command::backtrack(2),
        Write::new("9, 5"),
        Command::jump(256, 100),
        Write::new("256, 100"),
    ])
    .unwrap();

    let ops = run(&s).unwrap();
    for (at, text) in writes(&ops) {
        let expected = format!("{}, {}", at.row, at.col);
        assert_eq!(text, expected);
    }
    assert_eq!(writes(&ops).len(), 11);
    assert!(ops.iter().all(|op| match op {
        SurfaceOp::Write { style, .. } => style == &default_font(),
        _ => true,
    }));
}

#[test]
fn named_ranges_from_history_stack_and_bookmarks() {
    let s = session(tokens![
        666,
        Command::named_range("A1_D1", 1, 0),
        Command::jump(10, 10),
        Command::StackPush,
        Command::jump(0, 0),
        Command::named_range("A1_K11", 0, -1),
        Command::jump(5, 5),
        Command::bookmark("TestRange"),
        Command::jump(0, 0),
        Command::named_range("A1_F6", 0, "TestRange"),
    ]);
    let ops = run(&s).unwrap();
    let names: Vec<(String, String)> = ops
        .iter()
        .filter_map(|op| match op {
            SurfaceOp::DefineName { name, formula } => Some((name.clone(), formula.clone())),
            _ => None,
        })
        .collect();
    assert!(names.contains(&("A1_D1".into(), "=TestSheet!$A$1:$D$1".into())));
    assert!(names.contains(&("A1_K11".into(), "=TestSheet!$A$1:$K$11".into())));
    assert!(names.contains(&("A1_F6".into(), "=TestSheet!$A$1:$F$6".into())));
}

#[test]
fn bookmark_then_range_to_current_cell() {
    let s = session(tokens![
        Command::bookmark("x"),
        6,
        Command::named_range("r", "x", 0)
    ]);
    let ops = run(&s).unwrap();
    assert_eq!(
        ops,
        vec![SurfaceOp::DefineName {
            name: "r".into(),
            formula: "=TestSheet!$A$1:$B$1".into()
        }]
    );
}

#[test]
fn impose_and_override() {
    let s = session(tokens![
        Write::new("Test").with_style(default_font_bold()),
        Command::impose(center()),
    ]);
    let ops = run(&s).unwrap();
    assert_eq!(write_style(&ops, Coord::ORIGIN), Some(default_font_bold() | center()));

    let s = session(tokens![
        Write::new("Test").with_style(default_font_bold()),
        Command::override_with(default_font_centered()),
    ]);
    let ops = run(&s).unwrap();
    assert_eq!(write_style(&ops, Coord::ORIGIN), Some(default_font_centered()));
}

#[test]
fn rich_write_impose_and_override() {
    let rich = RichWrite::new().then("a").then("b").with_cell_style(wrapped());
    let s = session(tokens![rich.clone(), Command::impose(rotated_90())]);
    let ops = run(&s).unwrap();
    let SurfaceOp::WriteRich { cell_style, .. } = &ops[0] else {
        panic!("expected rich write");
    };
    assert_eq!(cell_style, &Some(default_font() | wrapped() | rotated_90()));

    let s = session(tokens![rich, Command::override_with(rotated_90())]);
    let ops = run(&s).unwrap();
    let SurfaceOp::WriteRich { cell_style, .. } = &ops[0] else {
        panic!("expected rich write");
    };
    assert_eq!(cell_style, &Some(rotated_90()));
}

#[test]
fn override_drops_default_font() {
    let s = session(tokens![
        Write::new("x").with_style(bold()),
        Command::override_with(italic()),
    ]);
    let ops = run(&s).unwrap();
    assert_eq!(write_style(&ops, Coord::ORIGIN), Some(italic()));

    let s = session(tokens![
        MergeWrite::new("m", 1).with_style(bold()),
        Command::override_with(italic()),
    ]);
    let ops = run(&s).unwrap();
    let merged = ops.iter().find_map(|op| match op {
        SurfaceOp::MergeWrite { style, .. } => Some(style.clone()),
        _ => None,
    });
    assert_eq!(merged, Some(italic()));
}

#[test]
fn boxed_table_borders() {
    let s = session(tokens![
        Command::StackPush,
        row_chain(vec!["h1", "h2", "h3"], &ChainOptions::default()),
        2,
        row_chain(vec!["v1", "v2", "v3"], &ChainOptions::default()),
        66,
        Command::draw_box(-1, 0),
        Command::StackPop,
    ]);
    let ops = run(&s).unwrap();
    assert_eq!(writes(&ops).len(), 6);
    assert_eq!(
        write_style(&ops, Coord::new(0, 0)),
        Some(default_font() | top_border() | left_border())
    );
    assert_eq!(
        write_style(&ops, Coord::new(1, 2)),
        Some(default_font() | bottom_border() | right_border())
    );
    assert_eq!(write_style(&ops, Coord::new(0, 1)), Some(default_font() | top_border()));
}

#[test]
fn merged_header_in_box() {
    let s = session(tokens![
        2,
        MergeWrite::new("Title", 2),
        Command::draw_box(0, 0),
    ]);
    let ops = run(&s).unwrap();
    // placeholders carry the compensation borders
    assert_eq!(write_style(&ops, Coord::new(1, 3)), Some(default_font() | left_border()));
    assert_eq!(write_style(&ops, Coord::new(0, 1)), Some(default_font() | bottom_border()));
    assert_eq!(write_style(&ops, Coord::new(2, 2)), Some(default_font() | top_border()));
}

#[test]
fn identical_overwrite_tolerated_different_rejected() {
    let ok = session(tokens![
        "0, 0",
        6,
        default_font(),
        "0, 1",
        6,
        "0, 2",
        4,
        default_font(),
        "0, 1"
    ]);
    assert_eq!(writes(&run(&ok).unwrap()).len(), 3);

    let bad = session(tokens![
        "0, 0",
        6,
        default_font_centered(),
        "0, 1",
        6,
        "0, 2",
        4,
        default_font(),
        "0, 1"
    ]);
    let err = run(&bad).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::Execution(ExecutionError::Overwrite(Coord::new(0, 1)))
    );
    assert!(err.to_string().contains("overwrite has occurred at (0, 1)"));
}

#[test]
fn name_stack_reported_innermost_first() {
    let s = session(tokens![
        Command::section("Section1"),
        tokens![
            Command::section("Section2"),
            tokens![Command::section("Section3"), Command::SectionEnd],
            7
        ]
    ]);
    let err = run(&s).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Movement(MovementError::OutOfBounds { .. })));
    assert!(err.to_string().contains("Name stack: [Section2, Section1]"));
}

#[test]
fn unclosed_section_names_it() {
    let s = session(tokens![
        Command::section("Section1"),
        tokens![Command::section("Section2"), 66, Command::SectionEnd]
    ]);
    let err = run(&s).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::Movement(MovementError::UnclosedSection {
            open: "Section1".into()
        })
    );
    assert!(err.to_string().contains("Name stack: [Section1]"));
}

#[test]
fn chart_with_forward_reference() {
    let chart = ChartDef::new(ChartKind::Column)
        .with_subtype("stacked")
        .add_series(
            Series::new()
                .values(RangeSource::forward("data"))
                .name("Totals"),
        );
    let s = session(tokens![
        Command::AddChart(chart),
        2,
        row_chain(vec!["1", "2", "3"], &ChainOptions::default().forward_ref("data")),
    ]);
    let ops = run(&s).unwrap();
    let chart = ops
        .iter()
        .find_map(|op| match op {
            SurfaceOp::InsertChart { chart, .. } => Some(chart.clone()),
            _ => None,
        })
        .unwrap();
    let ChartOp::AddSeries(series) = &chart.ops[0] else {
        panic!("expected series");
    };
    assert_eq!(
        series.get("values"),
        Some(&ChartValue::Range(RangeSource::Literal("TestSheet!$A$2:$C$2".into())))
    );
}

#[test]
fn page_breaks_persist_across_sessions() {
    let mut binding = Binding::new(RecordingSurface::new("TestSheet"));
    let mut breaks = PageBreaks::new();

    session(tokens![22, Command::SubmitRowBreak])
        .execute(&mut binding, &mut breaks)
        .unwrap();
    assert!(binding.surface().ops().is_empty());

    session(tokens![666, Command::SubmitColBreak, Command::ApplyBreaks])
        .execute(&mut binding, &mut breaks)
        .unwrap();
    assert_eq!(
        binding.surface().ops(),
        &[SurfaceOp::PageBreaks {
            rows: vec![2],
            cols: vec![3]
        }]
    );
    assert!(breaks.is_empty());
}

#[test]
fn style_registered_once_across_sessions() {
    let mut binding = Binding::new(RecordingSurface::new("TestSheet"));
    let mut breaks = PageBreaks::new();
    session(tokens!["a", 6, "b"]).execute(&mut binding, &mut breaks).unwrap();
    session(tokens![2, "c"]).execute(&mut binding, &mut breaks).unwrap();
    assert_eq!(binding.surface().registrations(), 1);
}
