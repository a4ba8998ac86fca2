//! Property tests over the resolution pipeline.

use std::collections::BTreeMap;

use celldsl_core::presets::{bottom_border, left_border, right_border, top_border};
use celldsl_core::{Coord, Style};
use celldsl_engine::{resolve, Command};
use proptest::prelude::*;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    }
}

fn expected_perimeter(first: Coord, last: Coord) -> BTreeMap<Coord, Style> {
    let mut out: BTreeMap<Coord, Style> = BTreeMap::new();
    for row in first.row..=last.row {
        for col in first.col..=last.col {
            let mut style = Style::new();
            if row == first.row {
                style |= &top_border();
            }
            if row == last.row {
                style |= &bottom_border();
            }
            if col == first.col {
                style |= &left_border();
            }
            if col == last.col {
                style |= &right_border();
            }
            if !style.is_empty() {
                out.insert(Coord::new(row, col), style);
            }
        }
    }
    out
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn box_touches_exactly_its_perimeter(r1 in 0u32..20, c1 in 0u16..20, h in 0u32..6, w in 0u16..6) {
        let first = Coord::new(r1, c1);
        let last = Coord::new(r1 + h, c1 + w);
        let cmds = vec![
            Command::jump(i64::from(first.row), i64::from(first.col)),
            Command::bookmark("tl"),
            Command::jump(i64::from(last.row), i64::from(last.col)),
            Command::draw_box("tl", 0),
        ];
        let res = resolve(&cmds, Coord::ORIGIN).unwrap();

        let mut got: BTreeMap<Coord, Style> = BTreeMap::new();
        for (at, placed) in &res.pairs {
            if let Command::Write(write) = &placed.command {
                prop_assert!(write.data.is_blank());
                got.insert(*at, write.style.clone().unwrap_or_default());
            }
        }
        prop_assert_eq!(got, expected_perimeter(first, last));
    }

    #[test]
    fn bookmark_position_in_stream_does_not_matter(
        row in 0i64..50,
        col in 0i64..50,
        before in any::<bool>(),
    ) {
        let range = Command::named_range("r", "mark", 0);
        let mark = vec![Command::jump(row, col), Command::bookmark("mark"), Command::jump(0, 0)];
        let cmds: Vec<Command> = if before {
            mark.into_iter().chain(std::iter::once(range)).collect()
        } else {
            std::iter::once(range).chain(mark).collect()
        };
        let res = resolve(&cmds, Coord::ORIGIN).unwrap();
        let span = res.pairs[0].1.command.span().and_then(|s| s.rect());
        let mark = Coord::checked(row, col).unwrap();
        prop_assert_eq!(span, Some((Coord::ORIGIN, mark)));
    }

    #[test]
    fn pairs_are_row_major(cells in prop::collection::vec((0i64..30, 0i64..30), 1..40)) {
        let mut cmds = Vec::new();
        for (i, (r, c)) in cells.iter().enumerate() {
            cmds.push(Command::jump(*r, *c));
            cmds.push(Command::Write(celldsl_engine::Write::new(i as i64)));
        }
        let res = resolve(&cmds, Coord::ORIGIN).unwrap();
        let order: Vec<Coord> = res.pairs.iter().map(|(at, _)| *at).collect();
        let mut sorted = order.clone();
        sorted.sort();
        prop_assert_eq!(order, sorted);
        prop_assert_eq!(res.pairs.len(), cells.len());
    }
}
