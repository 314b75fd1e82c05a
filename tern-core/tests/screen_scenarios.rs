//! End-to-end scenarios: PTY byte streams through parser, sequencer and
//! screen, checked against the resulting grid state.

use tern_core::{BufferType, Color, Coordinate, LineFlags, Size, TermEvent, Terminal};

fn term() -> Terminal {
    Terminal::new(Size::new(80, 24), Some(1000))
}

#[test]
fn sgr_colors_between_characters() {
    let mut term = term();
    term.write(b"A\x1b[31mB\x1b[0mC");

    let grid = term.screen().grid();
    assert_eq!(grid.at(Coordinate::new(1, 1)).text(), "A");
    assert_eq!(
        grid.at(Coordinate::new(1, 1)).attributes().foreground,
        Color::Default
    );
    assert_eq!(grid.at(Coordinate::new(1, 2)).text(), "B");
    assert_eq!(
        grid.at(Coordinate::new(1, 2)).attributes().foreground,
        Color::Indexed(1)
    );
    assert_eq!(grid.at(Coordinate::new(1, 3)).text(), "C");
    assert_eq!(
        grid.at(Coordinate::new(1, 3)).attributes().foreground,
        Color::Default
    );
    assert_eq!(term.screen().cursor().position, Coordinate::new(1, 4));
}

#[test]
fn clear_screen_and_home() {
    let mut term = term();
    term.write(b"some text\r\nmore text");
    term.write(b"\x1b[2J\x1b[H");

    let snapshot = term.snapshot();
    assert_eq!(snapshot.text().trim_end(), "");
    assert_eq!(term.screen().cursor().position, Coordinate::new(1, 1));
    for line in &snapshot.lines {
        for cell in &line.cells {
            assert!(cell.text.is_empty());
            assert_eq!(cell.attributes, Default::default());
        }
    }
}

#[test]
fn autowrap_at_column_80() {
    let mut term = term();
    term.write(&[b'X'; 81]);

    let grid = term.screen().grid();
    for column in 1..=80 {
        assert_eq!(grid.at(Coordinate::new(1, column)).text(), "X");
    }
    assert!(grid.line(1).flags().contains(LineFlags::WRAPPED));
    assert_eq!(grid.at(Coordinate::new(2, 1)).text(), "X");
    assert_eq!(term.screen().cursor().position, Coordinate::new(2, 2));
}

#[test]
fn alternate_screen_leaves_primary_untouched() {
    let mut term = term();
    term.write(b"primary content");
    let before = term.snapshot();

    term.write(b"\x1b[?1049h");
    assert_eq!(term.screen().active_buffer(), BufferType::Alternate);
    term.write(b"hello");
    assert_eq!(term.snapshot().text().trim_end(), "hello");

    term.write(b"\x1b[?1049l");
    assert_eq!(term.screen().active_buffer(), BufferType::Primary);
    let after = term.snapshot();
    assert_eq!(after.lines, before.lines);
    assert_eq!(after.cursor, before.cursor);
}

#[test]
fn osc8_hyperlink_covers_cells() {
    let mut term = term();
    term.write(b"\x1b]8;;https://example.com\x1b\\link\x1b]8;;\x1b\\");

    let grid = term.screen().grid();
    for (column, c) in "link".chars().enumerate() {
        let cell = grid.at(Coordinate::new(1, column as i32 + 1));
        assert_eq!(cell.text(), c.to_string());
        let link = cell.hyperlink().expect("cell carries a hyperlink");
        assert_eq!(link.uri, "https://example.com");
    }
    // After the closing OSC 8, new text is plain
    term.write(b"x");
    assert!(grid_cell_plain(&mut term, 1, 5));
}

fn grid_cell_plain(term: &mut Terminal, row: i32, column: i32) -> bool {
    term.screen()
        .grid()
        .at(Coordinate::new(row, column))
        .hyperlink()
        .is_none()
}

#[test]
fn sgr_subparameter_rgb() {
    let mut term = term();
    term.write(b"\x1b[38:2::10:20:30mX");
    let cell = term.screen().grid().at(Coordinate::new(1, 1));
    assert_eq!(cell.text(), "X");
    assert_eq!(cell.attributes().foreground, Color::Rgb(10, 20, 30));
}

#[test]
fn streaming_equivalence_across_split_points() {
    let input: &[u8] =
        b"ls\r\n\x1b[1;34mdir\x1b[0m  file\r\n\x1b]2;title\x07\x1b[5;10Hdeep\x1b[38;5;42mgreen";
    let mut whole = term();
    whole.write(input);
    let expected = whole.snapshot();

    for split in 1..input.len() {
        let mut parts = term();
        parts.write(&input[..split]);
        parts.write(&input[split..]);
        assert_eq!(parts.snapshot(), expected, "split at byte {split}");
    }
}

#[test]
fn hard_reset_matches_fresh_construction() {
    let mut dirty = term();
    dirty.write(b"\x1b[31mtext\x1b[4;10r\x1b[?6h\x1b[?25l\x1b]2;t\x07\x1b(0lots of state");
    dirty.write(b"\x1bc");
    while dirty.poll_event().is_some() {}

    let fresh = term();
    assert_eq!(dirty.snapshot(), fresh.snapshot());
    assert_eq!(dirty.screen().cursor(), fresh.screen().cursor());
    assert_eq!(dirty.screen().modes(), fresh.screen().modes());
    assert_eq!(dirty.screen().margin(), fresh.screen().margin());
}

#[test]
fn resize_round_trip_restores_wrappable_lines() {
    let mut term = Terminal::new(Size::new(10, 4), Some(100));
    term.write(b"0123456789");
    term.write(b"\r\nshort");
    let before = term.snapshot();

    term.resize(Size::new(6, 4));
    term.resize(Size::new(10, 4));
    let after = term.snapshot();
    assert_eq!(after.text(), before.text());
}

#[test]
fn scrollback_accumulates_and_is_bounded() {
    let mut term = Terminal::new(Size::new(10, 3), Some(5));
    for i in 0..20 {
        term.write(format!("line{i}\r\n").as_bytes());
    }
    let grid = term.screen().grid();
    assert_eq!(grid.history_line_count(), 5);
    assert!(grid.total_line_count() >= 3);
    // Row 0 addresses the newest scrollback line
    assert_eq!(grid.line(0).to_utf8_trimmed(), "line17");
}

#[test]
fn erase_scrollback_only() {
    let mut term = Terminal::new(Size::new(10, 3), Some(50));
    for i in 0..10 {
        term.write(format!("line{i}\r\n").as_bytes());
    }
    let visible = term.snapshot().text();
    term.write(b"\x1b[3J");
    assert_eq!(term.screen().grid().history_line_count(), 0);
    assert_eq!(term.snapshot().text(), visible);
}

#[test]
fn device_attribute_queries_reply() {
    let mut term = term();
    term.write(b"\x1b[c");
    assert_eq!(term.take_replies(), b"\x1b[?64;1;4;6;22c");

    term.write(b"\x1b[>c");
    assert_eq!(term.take_replies(), b"\x1b[>61;0;0c");

    term.write(b"\x1b[5n");
    assert_eq!(term.take_replies(), b"\x1b[0n");
}

#[test]
fn cursor_position_report() {
    let mut term = term();
    term.write(b"\x1b[12;40H\x1b[6n");
    assert_eq!(term.take_replies(), b"\x1b[12;40R");
}

#[test]
fn title_and_bell_events() {
    let mut term = term();
    term.write(b"\x1b]0;build ok\x07\x07");
    assert_eq!(
        term.poll_event(),
        Some(TermEvent::TitleChanged("build ok".into()))
    );
    assert_eq!(
        term.poll_event(),
        Some(TermEvent::IconNameChanged("build ok".into()))
    );
    assert_eq!(term.poll_event(), Some(TermEvent::Bell));
}

#[test]
fn clipboard_write_event() {
    let mut term = term();
    term.write(b"\x1b]52;c;aGVsbG8=\x1b\\");
    assert_eq!(
        term.poll_event(),
        Some(TermEvent::ClipboardWrite {
            selection: "c".into(),
            data: "aGVsbG8=".into()
        })
    );
}

#[test]
fn dynamic_color_set_and_query() {
    let mut term = term();
    term.write(b"\x1b]10;rgb:ff/00/00\x1b\\\x1b]10;?\x1b\\");
    assert_eq!(term.take_replies(), b"\x1b]10;rgb:ffff/0000/0000\x1b\\");

    term.write(b"\x1b]110;\x1b\\\x1b]10;?\x1b\\");
    assert_eq!(term.take_replies(), b"\x1b]10;rgb:e5e5/e5e5/e5e5\x1b\\");
}

#[test]
fn scroll_region_with_margins() {
    let mut term = Terminal::new(Size::new(10, 6), None);
    for row in 1..=6 {
        term.write(format!("\x1b[{row};1Hrow{row}").as_bytes());
    }
    term.write(b"\x1b[2;5r");
    term.write(b"\x1b[5;1H\nnew");

    let grid = term.screen().grid();
    // Rows 2-5 scrolled; rows 1 and 6 are pinned
    assert_eq!(grid.line(1).to_utf8_trimmed(), "row1");
    assert_eq!(grid.line(2).to_utf8_trimmed(), "row3");
    assert_eq!(grid.line(4).to_utf8_trimmed(), "row5");
    assert_eq!(grid.line(5).to_utf8_trimmed(), "new");
    assert_eq!(grid.line(6).to_utf8_trimmed(), "row6");
}

#[test]
fn wide_characters_and_erase() {
    let mut term = term();
    term.write("漢字".as_bytes());
    let grid = term.screen().grid();
    assert_eq!(grid.at(Coordinate::new(1, 1)).width(), 2);
    assert_eq!(grid.at(Coordinate::new(1, 2)).width(), 0);
    assert_eq!(grid.at(Coordinate::new(1, 3)).text(), "字");

    // Erasing one half of a pair blanks the whole character
    term.write(b"\x1b[1;1H\x1b[1X");
    let grid = term.screen().grid();
    assert!(grid.at(Coordinate::new(1, 1)).is_empty());
    assert!(grid.at(Coordinate::new(1, 2)).is_empty());
    assert_eq!(grid.at(Coordinate::new(1, 2)).width(), 1);
}

#[test]
fn insert_and_delete_characters() {
    let mut term = Terminal::new(Size::new(10, 2), None);
    term.write(b"ABCDE\x1b[1;2H\x1b[2@");
    assert_eq!(term.screen().grid().line(1).to_utf8(), "A  BCDE   ");

    term.write(b"\x1b[1;2H\x1b[2P");
    assert_eq!(term.screen().grid().line(1).to_utf8(), "ABCDE     ");
}

#[test]
fn batched_rendering_applies_atomically() {
    let mut term = term();
    term.write(b"\x1b[?2026hqueued text\x1b[3;3Hmore");
    assert_eq!(term.snapshot().text().trim_end(), "");

    term.write(b"\x1b[?2026l");
    let text = term.snapshot().text();
    assert!(text.contains("queued text"));
    assert!(text.contains("more"));
}

#[test]
fn malformed_input_never_disturbs_later_output() {
    let mut term = term();
    term.write(b"\x1b[999;999;999;1;2;3;4;5;6;7;8;9;10;11;12;13;14X");
    term.write(b"\x1b]this osc never terminates properly\x18");
    term.write(&[0xFF, 0xFE, 0x80, 0x1B, b'[', 0x07, b'm']);
    term.write(b"\x1b[Hstill works");
    assert!(term.snapshot().text().starts_with("still works"));
}

#[test]
fn vs16_does_not_change_cell_width() {
    let mut term = term();
    term.write("☂\u{FE0F}x".as_bytes());
    let grid = term.screen().grid();
    let cell = grid.at(Coordinate::new(1, 1));
    assert_eq!(cell.codepoint_count(), 2);
    assert_eq!(cell.width(), 1);
    // The next character lands right after; no width change happened
    assert_eq!(grid.at(Coordinate::new(1, 2)).text(), "x");
}
