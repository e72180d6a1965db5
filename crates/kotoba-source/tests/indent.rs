use kotoba_core::position::PositionMap;
use kotoba_source::indent::{self, LineEditKind, TERMINATOR, convert};
use kotoba_source::{Prepare, WidthFold};
use proptest::prelude::*;

const DIRECTIVE: &str = "!インデント構文";

fn program(lines: &[(usize, &str)]) -> String {
    let mut source = String::from(DIRECTIVE);
    for (depth, text) in lines {
        source.push('\n');
        source.push_str(&" ".repeat(*depth));
        source.push_str(text);
    }
    source
}

#[test]
fn test_if_block_terminator_follows_body() {
    let output = convert("!インデント構文\nもしA=1ならば\n  1を表示\n");
    let lines: Vec<&str> = output.code.lines().collect();

    assert_eq!(lines, [DIRECTIVE, "もしA=1ならば", "  1を表示", "ここまで"]);
}

#[test]
fn test_two_level_dedent_closes_in_order() {
    let source = program(&[(0, "3回"), (2, "2回"), (4, "1を表示"), (0, "終わり")]);
    let output = convert(&source);
    let lines: Vec<&str> = output.code.lines().collect();

    assert_eq!(
        lines,
        [DIRECTIVE, "3回", "  2回", "    1を表示", "  ここまで", "ここまで", "終わり"]
    );
    let kinds: Vec<LineEditKind> = output.inserted_lines.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, [LineEditKind::Inserted, LineEditKind::Inserted]);
}

#[test]
fn test_end_of_input_closes_innermost_first() {
    let output = convert(&program(&[(2, "あ"), (4, "う")]));

    assert!(output.code.ends_with("\n    う\n  ここまで\nここまで"));
    assert_eq!(output.inserted_lines.len(), 2);
}

#[test]
fn test_alternate_directive_and_full_width_bang() {
    let output = convert("！ここまでだるい\nもしAならば\n　Bを表示");
    assert!(output.code.ends_with("\n　Bを表示\nここまで"));
}

#[test]
fn test_comment_lines_do_not_open_blocks() {
    let output = convert("!インデント構文\nA\n/* x\n    y */\nB");
    assert_eq!(output.code, "!インデント構文\nA\n/* x\n    y */\nB");
    assert!(output.inserted_lines.is_empty());
}

#[test]
fn test_switch_arms_with_else() {
    let source = program(&[
        (0, "Aで条件分岐"),
        (2, "1ならば"),
        (4, "「一」を表示"),
        (2, "違えば"),
        (4, "「他」を表示"),
    ]);
    let output = convert(&source);
    let terminators = output.code.lines().filter(|l| l.trim() == TERMINATOR).count();

    // The else line suppresses the first arm's terminator.
    assert_eq!(terminators, 2);
    assert!(output.code.ends_with("「他」を表示\n  ここまで\nここまで"));
}

#[test]
fn test_map_composes_with_prepare() {
    let original = "!インデント構文\nもしＡ=1ならば\n\n  Ａを表示";
    let output = convert(original);
    let prepared = WidthFold.prepare(&output.code);
    let text = prepared.text();
    let map = prepared.map().then(output.map(original));

    let prepared_a = text.rfind('A').unwrap();
    let mapped = map.map(prepared_a).unwrap();
    assert_eq!(&original[mapped..mapped + 3], "Ａ");

    let terminator = text.find(TERMINATOR).unwrap();
    assert_eq!(map.map(terminator), None);
}

mod proptest_tests {
    use super::*;

    // ===================
    // Strategies
    // ===================

    /// Lines of a program: an indentation depth and a short statement.
    fn lines_strategy() -> impl Strategy<Value = Vec<(usize, String)>> {
        prop::collection::vec(
            (
                prop::sample::select(vec![0usize, 2, 4, 6]),
                "[A-Dあいう]{1,4}",
            ),
            0..20,
        )
    }

    /// Free text possibly containing newlines and indentation.
    fn literal_body_strategy() -> impl Strategy<Value = String> {
        "[a-c \\n]{0,12}"
    }

    fn build(lines: &[(usize, String)]) -> String {
        let borrowed: Vec<(usize, &str)> = lines.iter().map(|(d, t)| (*d, t.as_str())).collect();
        program(&borrowed)
    }

    fn increases(lines: &[(usize, String)]) -> usize {
        let mut depth = 0;
        let mut count = 0;
        for (width, _) in lines {
            if *width > depth {
                count += 1;
            }
            depth = *width;
        }
        count
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Without a directive the text and edit lists are untouched.
    fn check_identity_without_directive(lines: &[(usize, String)]) -> Result<(), TestCaseError> {
        let source = build(lines).replacen(DIRECTIVE, "A", 1);
        let output = convert(&source);

        prop_assert_eq!(&output.code, &source);
        prop_assert!(output.inserted_lines.is_empty());
        prop_assert!(output.deleted_lines.is_empty());
        Ok(())
    }

    /// Every indentation increase gets exactly one terminator, and the
    /// terminators emitted at end of input close the innermost level first.
    fn check_levels_closed_once(lines: &[(usize, String)]) -> Result<(), TestCaseError> {
        let output = convert(&build(lines));
        prop_assert_eq!(output.inserted_lines.len(), increases(lines));

        let code_lines: Vec<&str> = output.code.split('\n').collect();
        // Walked from the end, so the outermost terminator comes first.
        let trailing: Vec<usize> = code_lines
            .iter()
            .rev()
            .take_while(|line| line.trim() == TERMINATOR)
            .map(|line| indent::indent_width(line))
            .collect();
        prop_assert!(trailing.windows(2).all(|pair| pair[0] < pair[1]));
        Ok(())
    }

    /// Newlines inside a string literal never change the inserted lines.
    fn check_literal_newlines_ignored(
        lines: &[(usize, String)],
        body: &str,
    ) -> Result<(), TestCaseError> {
        let mut with_newlines = lines.to_vec();
        let mut flattened = lines.to_vec();
        let position = lines.len() / 2;
        with_newlines.insert(position, (2, format!("「{body}」を表示")));
        flattened.insert(position, (2, format!("「{}」を表示", body.replace('\n', " "))));

        let a = convert(&build(&with_newlines));
        let b = convert(&build(&flattened));
        prop_assert_eq!(a.inserted_lines.len(), b.inserted_lines.len());
        Ok(())
    }

    /// Every kept line maps back to the same bytes of the original text.
    fn check_kept_lines_round_trip(
        lines: &[(usize, String)],
        blank_every: usize,
    ) -> Result<(), TestCaseError> {
        let mut source = String::from(DIRECTIVE);
        for (i, (depth, text)) in lines.iter().enumerate() {
            if i % blank_every == 0 {
                source.push_str("\n   ");
            }
            source.push('\n');
            source.push_str(&" ".repeat(*depth));
            source.push_str(text);
        }
        let output = convert(&source);
        let map = output.map(&source);

        let mut start = 0;
        for (index, line) in output.code.split('\n').enumerate() {
            if !map.is_inserted_line(index) {
                let mapped = map.map(start);
                prop_assert!(mapped.is_some(), "line {index} has no origin");
                let mapped = mapped.unwrap_or_default();
                prop_assert!(
                    source[mapped..].starts_with(line),
                    "line {index} `{line}` maps to {mapped}"
                );
            } else {
                prop_assert_eq!(map.map(start), None);
            }
            start += line.len() + 1;
        }
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn identity_without_directive(lines in lines_strategy()) {
            check_identity_without_directive(&lines)?;
        }

        #[test]
        fn levels_closed_once(lines in lines_strategy()) {
            check_levels_closed_once(&lines)?;
        }

        #[test]
        fn literal_newlines_ignored(lines in lines_strategy(), body in literal_body_strategy()) {
            check_literal_newlines_ignored(&lines, &body)?;
        }

        #[test]
        fn kept_lines_round_trip(lines in lines_strategy(), blank_every in 1usize..5) {
            check_kept_lines_round_trip(&lines, blank_every)?;
        }
    }
}
