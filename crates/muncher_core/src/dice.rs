use std::sync::OnceLock;

use regex::Regex;

static DICE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn dice_pattern() -> Option<&'static Regex> {
    DICE_PATTERN
        .get_or_init(|| Regex::new(r"\d*d\d+(\s*[+-]?\s*\d*)?").ok())
        .as_ref()
}

fn is_dash(c: char) -> bool {
    matches!(
        c,
        '-' | '\u{00AD}'
            | '\u{2010}'
            | '\u{2011}'
            | '\u{2012}'
            | '\u{2013}'
            | '\u{2014}'
            | '\u{2015}'
            | '\u{2212}'
            | '\u{FE63}'
            | '\u{FF0D}'
    )
}

/// Replace every dash-like character with an ASCII hyphen and collapse runs of hyphens.
pub fn normalize_dashes(input: &str) -> String {
    let mut normalized = String::with_capacity(input.len());
    for c in input.chars() {
        if !is_dash(c) {
            normalized.push(c);
        } else if !normalized.ends_with('-') {
            normalized.push('-');
        }
    }
    normalized
}

/// True when a column header looks like a dice expression (`d20`, `2d6+1`, `d8 - 2`).
pub fn is_dice_header(header: &str) -> bool {
    dice_pattern().is_some_and(|pattern| pattern.is_match(&normalize_dashes(header)))
}
