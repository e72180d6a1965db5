//! Character folding shared by the prepare stage and the literal scanner.

/// First full-width ASCII variant (`！`).
const FULL_WIDTH_FIRST: char = '\u{FF01}';
/// Last full-width ASCII variant (`～`).
const FULL_WIDTH_LAST: char = '\u{FF5E}';
/// Distance from a full-width variant to its ASCII counterpart.
const FULL_WIDTH_OFFSET: u32 = 0xFEE0;

/// Fold one character to the form the lexer expects.
///
/// Full-width ASCII variants become ASCII, the ideographic space becomes a
/// space and the reference mark `※` becomes the comment marker `#`.
pub fn fold_char(c: char) -> char {
    match c {
        FULL_WIDTH_FIRST..=FULL_WIDTH_LAST => {
            char::from_u32(c as u32 - FULL_WIDTH_OFFSET).unwrap_or(c)
        }
        '\u{3000}' => ' ',
        '※' => '#',
        _ => c,
    }
}

/// Fold every character of `text`.
pub fn fold_str(text: &str) -> String {
    text.chars().map(fold_char).collect()
}
